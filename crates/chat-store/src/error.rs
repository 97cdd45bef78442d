use thiserror::Error;

/// Failures opening or configuring the table store.
///
/// Once a [`TableRegistry`](crate::TableRegistry) is open, per-operation
/// failures are reported as `chat_core::RegistryError::Backend`.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid connection string: {0}")]
    InvalidConnectionString(String),

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("schema migration: {0}")]
    Migration(#[from] rusqlite_migration::Error),
}
