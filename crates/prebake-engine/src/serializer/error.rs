//! Serializer error types.

use thiserror::Error;

/// Errors that abort a serialization.
///
/// Recoverable problems do not appear here: they are logged as
/// diagnostics and the pipeline returns `Ok(None)`.
#[derive(Debug, Error)]
pub enum SerializerError {
    /// A fatal user-facing error, already logged as a diagnostic
    #[error("{code}: {message}")]
    Fatal {
        /// Stable error code
        code: &'static str,
        /// Description
        message: String,
    },

    /// Two additional functions share mutable state
    #[error("additional function `{function}` conflicts with `{other}` on {location}")]
    IndependenceViolation {
        /// Function whose effects were checked
        function: String,
        /// Function it conflicts with
        other: String,
        /// The shared state
        location: String,
    },

    /// Broken orchestration invariant
    #[error("internal error: {0}")]
    Internal(String),

    /// Output could not be encoded
    #[error("failed to encode output: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl SerializerError {
    /// Internal invariant violation
    pub fn internal(message: impl Into<String>) -> Self {
        SerializerError::Internal(message.into())
    }
}

/// Result type for serializer phases.
pub type SerializerResult<T> = Result<T, SerializerError>;
