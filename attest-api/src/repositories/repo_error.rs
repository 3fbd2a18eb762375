use thiserror::Error;

use crate::domain::error::WorkflowError;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
    #[error("Corrupt row: {0}")]
    Decode(String),
}

impl From<RepositoryError> for WorkflowError {
    fn from(err: RepositoryError) -> Self {
        tracing::error!("repository failure: {:?}", err);
        WorkflowError::Storage(err.to_string())
    }
}

impl From<sqlx::Error> for WorkflowError {
    fn from(err: sqlx::Error) -> Self {
        RepositoryError::from(err).into()
    }
}
