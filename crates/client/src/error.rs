use std::time::Duration;

use goszakup_query::QueryError;
use thiserror::Error;

/// Errors surfaced by `ApiClient`.
///
/// Every variant renders to the message shown to users; `status_code`
/// exposes the HTTP status where one exists.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-success HTTP response
    #[error("{message}")]
    Http { status: u16, message: String },

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Connection failed: {0}")]
    Connection(String),

    /// A success response whose body does not match the expected shape
    #[error("Malformed response body: {0}")]
    Decode(String),

    /// Rejected before any network call
    #[error(transparent)]
    InvalidRequest(#[from] QueryError),

    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// Build the error for a non-success response.
    ///
    /// The message is the `detail` field of a JSON error body. Anything else
    /// (empty body, HTML, a body without `detail`) gives `HTTP <status>`.
    pub fn from_response(status: u16, body: &[u8]) -> Self {
        let detail = serde_json::from_slice::<serde_json::Value>(body)
            .ok()
            .and_then(|value| value.get("detail").cloned());

        let message = match detail {
            Some(serde_json::Value::String(text)) if !text.is_empty() => text,
            Some(serde_json::Value::Null) | Some(serde_json::Value::String(_)) | None => {
                format!("HTTP {status}")
            }
            // Validation errors arrive as a list of objects
            Some(other) => other.to_string(),
        };

        Self::Http { status, message }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether another attempt may succeed.
    ///
    /// Client errors (4xx) are final, except 503 which the backend sends
    /// while its analyzer is still loading.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => !((400..500).contains(status) && *status != 503),
            Self::Timeout(_) | Self::Connection(_) => true,
            Self::Decode(_) | Self::InvalidRequest(_) | Self::Config(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(status: u16, body: &str) -> String {
        ApiError::from_response(status, body.as_bytes()).to_string()
    }

    #[test]
    fn test_detail_message() {
        assert_eq!(message(404, r#"{"detail":"Lot LOT-1 not found"}"#), "Lot LOT-1 not found");
    }

    #[test]
    fn test_fallback_messages() {
        assert_eq!(message(500, ""), "HTTP 500");
        assert_eq!(message(502, "<html>Bad Gateway</html>"), "HTTP 502");
        assert_eq!(message(400, r#"{"error":"x"}"#), "HTTP 400");
        assert_eq!(message(400, r#"{"detail":""}"#), "HTTP 400");
        assert_eq!(message(400, r#"{"detail":null}"#), "HTTP 400");
        assert_eq!(message(400, "[1,2]"), "HTTP 400");
    }

    #[test]
    fn test_structured_detail() {
        let msg = message(422, r#"{"detail":[{"loc":["body","text"],"msg":"field required"}]}"#);
        assert!(msg.contains("field required"));
    }

    #[test]
    fn test_retry_classification() {
        let http = |status| ApiError::Http {
            status,
            message: String::new(),
        };
        assert!(!http(400).is_retryable());
        assert!(!http(404).is_retryable());
        assert!(!http(429).is_retryable());
        assert!(http(503).is_retryable());
        assert!(http(500).is_retryable());
        assert!(http(502).is_retryable());
        assert!(ApiError::Timeout(Duration::from_secs(30)).is_retryable());
        assert!(ApiError::Connection("refused".into()).is_retryable());
        assert!(!ApiError::Decode("eof".into()).is_retryable());
        assert!(!ApiError::InvalidRequest(QueryError::EmptyText).is_retryable());
    }

    #[test]
    fn test_status_code() {
        assert_eq!(ApiError::from_response(418, b"").status_code(), Some(418));
        assert_eq!(ApiError::Connection("x".into()).status_code(), None);
    }
}
