use std::error::Error;
use thiserror::Error;

use crate::state::quiz::{AnswerId, QuestionId};

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying implementation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// A unique index rejected the write.
    #[error("unique constraint `{constraint}` violated")]
    UniqueViolation { constraint: &'static str },
    #[error("question `{0}` not found")]
    QuestionNotFound(QuestionId),
    #[error("answer `{0}` not found")]
    AnswerNotFound(AnswerId),
    #[error("contestant `{0}` not found")]
    ContestantNotFound(String),
    /// The contestant exists but the PIN does not match.
    #[error("wrong pin for contestant `{0}`")]
    PinMismatch(String),
    /// New names are refused while registrations are closed.
    #[error("registrations are closed")]
    RegistrationsClosed,
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}
