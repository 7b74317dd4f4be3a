//! Error types for the docstruct library.

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for docstruct operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while reconstructing document structure.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error when reading fixtures or writing artifacts.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Page image could not be decoded, cropped, or written.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// A configuration value violates a precondition. Never retried.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A reading order is not a permutation of the region indices.
    #[error("Invalid reading order: {0}")]
    InvalidReadingOrder(String),

    /// An external provider call failed.
    #[error("{provider} provider error: {message}")]
    Provider {
        /// Provider name (ocr, layout, reading-order, table)
        provider: &'static str,
        /// Failure description
        message: String,
        /// Whether retrying the call may succeed
        transient: bool,
    },

    /// An external provider call did not finish in time.
    #[error("{provider} provider timed out after {timeout:?}")]
    Timeout {
        /// Provider name
        provider: &'static str,
        /// The timeout that elapsed
        timeout: Duration,
    },

    /// Work was cancelled before it completed.
    #[error("Operation cancelled")]
    Cancelled,

    /// Table extraction produced output that is not a well-formed table.
    #[error("Malformed table output: {0}")]
    MalformedTable(String),

    /// Every attempt of a retried operation failed.
    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// The error from the final attempt
        last: Box<Error>,
    },

    /// Error while writing output artifacts.
    #[error("Rendering error: {0}")]
    Render(String),

    /// Generic error with message.
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a provider error that is worth retrying.
    pub fn transient(provider: &'static str, message: impl Into<String>) -> Self {
        Error::Provider {
            provider,
            message: message.into(),
            transient: true,
        }
    }

    /// Create a provider error that retrying cannot fix.
    pub fn permanent(provider: &'static str, message: impl Into<String>) -> Self {
        Error::Provider {
            provider,
            message: message.into(),
            transient: false,
        }
    }

    /// Whether the retry layer may attempt the failed call again.
    pub fn is_transient(&self) -> bool {
        match self {
            Error::Provider { transient, .. } => *transient,
            Error::Timeout { .. } => true,
            Error::Io(e) => matches!(
                e.kind(),
                io::ErrorKind::Interrupted
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::WouldBlock
                    | io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
            ),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidConfig("num_columns must be >= 1".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: num_columns must be >= 1"
        );

        let err = Error::transient("ocr", "rate limited");
        assert_eq!(err.to_string(), "ocr provider error: rate limited");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn test_transient_classification() {
        assert!(Error::transient("table", "429").is_transient());
        assert!(!Error::permanent("table", "bad request").is_transient());
        assert!(Error::Timeout {
            provider: "reading-order",
            timeout: Duration::from_secs(1)
        }
        .is_transient());
        assert!(!Error::InvalidConfig("x".into()).is_transient());
        assert!(!Error::Cancelled.is_transient());
    }
}
