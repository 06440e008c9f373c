//! Error types for interactive-recsim
//!
//! This module defines all error types used throughout the library.

use thiserror::Error;

/// Top-level error type for simulation operations
#[derive(Debug, Error)]
pub enum SimError {
    /// A collaborator was used before it was configured (e.g. an algorithm
    /// name that was never registered)
    #[error("Unconfigured: {0}")]
    Unconfigured(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// IO error while reading a log or writing a trace
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Trace data that cannot be decoded
    #[error("Malformed trace: {0}")]
    MalformedTrace(String),

    /// Numerical instability
    #[error("Numerical instability: {0}")]
    Numerical(String),

    /// Operation not allowed in the current state
    #[error("Invalid state: {0}")]
    InvalidState(&'static str),
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}

/// Result type alias for simulation operations
pub type SimResult<T> = Result<T, SimError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SimError::Unconfigured("knn-item".to_string());
        assert_eq!(err.to_string(), "Unconfigured: knn-item");

        let err = SimError::Configuration("cutoff must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Invalid configuration: cutoff must be positive"
        );

        let err = SimError::InvalidState("loop not initialized");
        assert_eq!(err.to_string(), "Invalid state: loop not initialized");
    }

    #[test]
    fn test_error_from_io() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let err: SimError = io.into();
        assert!(matches!(err, SimError::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let err: SimError = serde_json::from_str::<u32>("not json").unwrap_err().into();
        assert!(matches!(err, SimError::Configuration(_)));
    }
}
