use thiserror::Error;

use lingkod_common::domain::status::InvalidStatus;

use crate::domain::files::StorageError;
use crate::domain::repository::RepositoryError;

/// Everything that can go wrong while creating, transitioning or revising
/// a submission. Each variant maps to one stable, machine-checkable HTTP
/// outcome; internal causes never leak to callers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("submission not found")]
    NotFound,
    #[error(transparent)]
    InvalidStatus(#[from] InvalidStatus),
    #[error("approving a submission requires a signature on file or in the request")]
    SignatureRequired,
    #[error("submission was modified concurrently; retry with fresh data")]
    ConflictingTransition,
    #[error("file storage failed: {0}")]
    Storage(String),
    #[error("persistence failed: {0}")]
    Internal(String),
}

impl From<RepositoryError> for TransitionError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::VersionConflict => Self::ConflictingTransition,
            RepositoryError::UniqueViolation(cause) | RepositoryError::DatabaseError(cause) => {
                Self::Internal(cause)
            }
        }
    }
}

impl From<StorageError> for TransitionError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value.to_string())
    }
}
