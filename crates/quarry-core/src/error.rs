//! Error types and result aliases for Quarry.
//!
//! This module defines the shared error types used across all Quarry crates.
//! Errors are structured for programmatic handling and include context for debugging.

/// The result type used throughout Quarry.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Quarry operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// Invalid input was provided.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new serialization error with the given message.
    #[must_use]
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<crate::canonical_json::CanonicalJsonError> for Error {
    fn from(err: crate::canonical_json::CanonicalJsonError) -> Self {
        Self::serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialization_error_display() {
        let err = Error::serialization("unexpected token");
        assert_eq!(err.to_string(), "serialization error: unexpected token");
    }

    #[test]
    fn invalid_input_display() {
        let err = Error::InvalidInput("empty name".to_string());
        assert_eq!(err.to_string(), "invalid input: empty name");
    }

    #[test]
    fn internal_error_display() {
        let err = Error::internal("lock poisoned");
        assert_eq!(err.to_string(), "internal error: lock poisoned");
    }
}
