//! Retry state machine.
//!
//! `Attempting(n) -> Success | Retryable -> Attempting(n + 1) | Terminal`

use std::time::Duration;

use crate::transport::{HttpResponse, TransportError};
use crate::{ApiError, ClientConfig};

/// Classified outcome of one attempt.
#[derive(Debug)]
pub(crate) enum Attempt {
    Success(HttpResponse),
    Retryable(ApiError),
    Terminal(ApiError),
}

impl Attempt {
    /// `outcome` is `None` when the attempt hit the client timeout.
    pub(crate) fn classify(
        outcome: Option<Result<HttpResponse, TransportError>>,
        timeout: Duration,
    ) -> Self {
        let error = match outcome {
            Some(Ok(response)) if response.is_success() => return Self::Success(response),
            Some(Ok(response)) => ApiError::from_response(response.status, &response.body),
            Some(Err(TransportError::Connection(reason))) => ApiError::Connection(reason),
            Some(Err(TransportError::TimedOut)) | None => ApiError::Timeout(timeout),
        };

        if error.is_retryable() {
            Self::Retryable(error)
        } else {
            Self::Terminal(error)
        }
    }
}

/// What the loop does after attempt number `attempt` (0-based).
#[derive(Debug)]
pub(crate) enum Step {
    Done(Result<HttpResponse, ApiError>),
    Retry { delay: Duration, error: ApiError },
}

pub(crate) fn next_step(outcome: Attempt, attempt: u32, config: &ClientConfig) -> Step {
    match outcome {
        Attempt::Success(response) => Step::Done(Ok(response)),
        Attempt::Terminal(error) => Step::Done(Err(error)),
        Attempt::Retryable(error) if attempt >= config.retry_attempts => Step::Done(Err(error)),
        Attempt::Retryable(error) => Step::Retry {
            delay: config.backoff_delay(attempt),
            error,
        },
    }
}
