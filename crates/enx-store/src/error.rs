//! # Store Errors

use enx_core::EnxError;
use thiserror::Error;

/// Failures raised by the diagnosis key store. All of them are fatal to the
/// current distribution run.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A caller contract was violated (negative day offsets).
    #[error(transparent)]
    Domain(#[from] EnxError),

    /// The database rejected a query or the connection failed.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedded migrations could not be applied.
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// `DATABASE_URL` is not set.
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,

    /// A stored row could not be mapped back into a diagnosis key.
    #[error("corrupt diagnosis key row: {0}")]
    CorruptRow(String),
}

impl StoreError {
    /// Whether this error is a caller contract violation rather than an
    /// infrastructure failure.
    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::Domain(EnxError::InvalidArgument(_)))
    }
}
