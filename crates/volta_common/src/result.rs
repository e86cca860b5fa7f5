//! Common result and error types for the Volta compiler.

/// The standard result type for fallible internal operations.
///
/// `Ok` contains the result value, which may be partial after error recovery.
/// `Err` indicates an unrecoverable internal error (a bug in Volta), not a
/// problem with the user's design. Design errors are reported through the
/// diagnostic sink and the operation still returns `Ok`.
pub type VoltaResult<T> = Result<T, InternalError>;

/// An internal compiler error indicating a bug in Volta, not a design problem.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal compiler error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
