//! Typed failures surfaced by project and catalog repositories.

use shared::error::{ApiError, ErrorCode};
use storage::StorageError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
    #[error("internal repository error: {0}")]
    Internal(String),
}

impl RepositoryError {
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::NotFound { .. } => ErrorCode::NotFound,
            Self::Validation(_) => ErrorCode::Validation,
            Self::Conflict(_) => ErrorCode::Conflict,
            Self::Unavailable(_) => ErrorCode::Unavailable,
            Self::Internal(_) => ErrorCode::Internal,
        }
    }

    pub fn to_api_error(&self) -> ApiError {
        ApiError::new(self.code(), self.to_string())
    }

    /// Classifies an untyped failure by its rendered chain.
    pub fn from_message(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        if lower.contains("timed out")
            || lower.contains("pool closed")
            || lower.contains("unable to open database")
            || lower.contains("database is locked")
            || lower.contains("connection")
        {
            Self::Unavailable(message)
        } else {
            Self::Internal(message)
        }
    }
}

impl From<&RepositoryError> for ApiError {
    fn from(error: &RepositoryError) -> Self {
        error.to_api_error()
    }
}

impl From<anyhow::Error> for RepositoryError {
    fn from(error: anyhow::Error) -> Self {
        match error.downcast_ref::<StorageError>() {
            Some(StorageError::NotFound { entity, id }) => Self::NotFound {
                entity: *entity,
                id: *id,
            },
            Some(StorageError::Invalid(message)) => Self::Validation(message.clone()),
            Some(StorageError::Conflict(message)) => Self::Conflict(message.clone()),
            None => Self::from_message(format!("{error:#}")),
        }
    }
}
