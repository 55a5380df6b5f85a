//! Retry logic for network operations with error classification.

use reqwest::StatusCode;

/// Maximum number of retry attempts for network operations.
pub const MAX_RETRIES: usize = 3;

/// Delay between retry attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// Errors that should not be retried.
#[derive(Debug)]
pub enum NonRetryableError {
    /// Rate limit exceeded (HTTP 429)
    RateLimited(String),
    /// Resource not found (HTTP 404)
    NotFound(String),
    /// Forbidden access (HTTP 403)
    Forbidden(String),
    /// Other client errors that won't succeed on retry
    ClientError(String),
}

impl std::fmt::Display for NonRetryableError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NonRetryableError::RateLimited(msg) => {
                write!(f, "Rate limit exceeded: {}. Try again later.", msg)
            }
            NonRetryableError::NotFound(msg) => {
                write!(f, "Not found: {}", msg)
            }
            NonRetryableError::Forbidden(msg) => {
                write!(f, "Access forbidden: {}", msg)
            }
            NonRetryableError::ClientError(msg) => {
                write!(f, "Request error: {}", msg)
            }
        }
    }
}

impl std::error::Error for NonRetryableError {}

/// Classifies an error as retryable or non-retryable.
/// Returns Ok(()) if the error is retryable, Err with a user-friendly message if not.
pub fn classify_error(error: &reqwest::Error) -> Result<(), NonRetryableError> {
    if let Some(status) = error.status() {
        match status {
            StatusCode::TOO_MANY_REQUESTS => {
                return Err(NonRetryableError::RateLimited(
                    "Too many requests".to_string(),
                ));
            }
            StatusCode::NOT_FOUND => {
                return Err(NonRetryableError::NotFound(
                    "The requested resource was not found".to_string(),
                ));
            }
            StatusCode::FORBIDDEN => {
                return Err(NonRetryableError::Forbidden(
                    "Access to this resource is forbidden".to_string(),
                ));
            }
            // Other 4xx client errors are generally not retryable
            s if s.is_client_error() => {
                return Err(NonRetryableError::ClientError(format!(
                    "HTTP {} error",
                    s.as_u16()
                )));
            }
            // 5xx server errors are retryable
            _ => {}
        }
    }

    // Connection errors, timeouts, etc. are retryable
    Ok(())
}

/// Checks if an error from `error_for_status()` should be retried.
/// Returns the original error if retryable, or a user-friendly NonRetryableError if not.
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    match classify_error(&error) {
        Ok(()) => anyhow::Error::from(error),
        Err(non_retryable) => anyhow::Error::from(non_retryable),
    }
}
