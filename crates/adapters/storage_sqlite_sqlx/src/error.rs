//! Storage-specific error type wrapping sqlx errors.

use catpoint_domain::error::{CatpointError, ValidationError};

/// Errors originating from the `SQLite` storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A query or connection failed.
    #[error("database error")]
    Database(#[from] sqlx::Error),

    /// Failed to run migrations.
    #[error("migration error")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A stored value does not map onto a domain value.
    #[error("corrupt stored value")]
    Corrupt(#[from] ValidationError),
}

impl From<StorageError> for CatpointError {
    fn from(err: StorageError) -> Self {
        Self::Storage(Box::new(err))
    }
}
