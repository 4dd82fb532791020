//! Error types for the Mandata SDK.
//!
//! Two failure taxonomies cover the whole API surface: transport-level
//! failures (unexpected HTTP status, connection errors) and precondition
//! violations caught before any request is issued. An operation that
//! reaches the terminal `error` status is *not* an error here — it is
//! returned to the caller as a normal status document.

use thiserror::Error;

/// Result type for Mandata operations.
pub type Result<T> = std::result::Result<T, MandataError>;

/// Errors that can occur when using the Mandata SDK.
#[derive(Error, Debug)]
pub enum MandataError {
    /// The server answered with a status code other than the one the
    /// endpoint documents. Carries the raw response body.
    #[error("unexpected HTTP status {status}: {body}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Raw response body text.
        body: String,
    },

    /// A precondition violation detected before any network call was made.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The organization listing came back empty; the API key has no
    /// usable account.
    #[error("empty result: {0}")]
    EmptyResult(String),

    /// Connection-level HTTP failure.
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Local file I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Response body could not be decoded (JSON, base64).
    #[error("decode error: {0}")]
    Decode(String),

    /// The external signing utility failed or is missing.
    #[error("signing error: {0}")]
    Signing(String),

    /// A bounded poll policy ran out of budget before the operation
    /// reached a terminal status.
    #[error("poll budget exhausted after {attempts} attempts")]
    PollBudgetExhausted {
        /// Number of poll attempts issued.
        attempts: u64,
    },
}

impl MandataError {
    /// Returns the HTTP status code if this error carries one.
    pub fn status(&self) -> Option<u16> {
        match self {
            MandataError::Http { status, .. } => Some(*status),
            MandataError::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true if this error was raised before any HTTP request
    /// was issued.
    pub fn is_precondition(&self) -> bool {
        matches!(self, MandataError::InvalidArgument(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_error_display() {
        let err = MandataError::Http {
            status: 500,
            body: "{\"error\": \"boom\"}".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "unexpected HTTP status 500: {\"error\": \"boom\"}"
        );
        assert_eq!(err.status(), Some(500));
    }

    #[test]
    fn test_invalid_argument_is_precondition() {
        let err = MandataError::InvalidArgument("polling interval must be positive".into());
        assert!(err.is_precondition());
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_poll_budget_display() {
        let err = MandataError::PollBudgetExhausted { attempts: 12 };
        assert_eq!(err.to_string(), "poll budget exhausted after 12 attempts");
    }
}
