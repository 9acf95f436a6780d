//! Error types for the local store.

use std::path::PathBuf;
use thiserror::Error;

/// Errors from [`LocalStore`](super::LocalStore) operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite reported an error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The directory holding the database file could not be created.
    #[error("Failed to create store directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A JSON payload could not be encoded or decoded.
    #[error("Invalid payload: {0}")]
    Payload(#[from] serde_json::Error),

    /// A row holds a value the store cannot interpret.
    #[error("Corrupt record in {table}: {reason}")]
    Corrupt { table: &'static str, reason: String },
}
