use std::time::Duration;

/// Environment variable holding the backend base URL.
pub const API_URL_ENV: &str = "GOSZAKUP_API_URL";

pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";

/// Client configuration, built once at startup and passed explicitly.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientConfig {
    /// Backend base URL; a trailing slash is tolerated
    pub base_url: String,
    /// Limit on a single attempt
    pub timeout: Duration,
    /// Retries after the first attempt (0 = run once)
    pub retry_attempts: u32,
    /// Delay before the first retry; doubles on every further retry
    pub backoff_base: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            retry_attempts: 3,
            backoff_base: Duration::from_secs(1),
        }
    }
}

impl ClientConfig {
    /// Defaults, with the base URL taken from `GOSZAKUP_API_URL` when set.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(url) = lookup(API_URL_ENV).filter(|u| !u.trim().is_empty()) {
            config.base_url = url.trim().to_string();
        }
        config
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_attempts(mut self, retry_attempts: u32) -> Self {
        self.retry_attempts = retry_attempts;
        self
    }

    pub fn with_backoff_base(mut self, backoff_base: Duration) -> Self {
        self.backoff_base = backoff_base;
        self
    }

    /// Delay before retry number `attempt + 1`: `backoff_base * 2^attempt`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        self.backoff_base
            .saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retry_attempts, 3);
    }

    #[test]
    fn test_env_override() {
        let config = ClientConfig::from_lookup(|key| {
            (key == API_URL_ENV).then(|| " http://77.42.43.153:8080/ ".to_string())
        });
        assert_eq!(config.base_url, "http://77.42.43.153:8080/");

        let config = ClientConfig::from_lookup(|_| Some(String::new()));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_backoff_doubles() {
        let config = ClientConfig::default();
        assert_eq!(config.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(config.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(config.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(config.backoff_delay(64), Duration::from_secs(u32::MAX as u64));
    }
}
