//! Error types for the scan log sinks.

use thiserror::Error;

/// Errors that can occur while recording or querying scan logs.
#[derive(Error, Debug)]
pub enum StoreError {
    /// SQLite query or connection failure
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failure on the embedded backend
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// HTTP failure against the hosted backend
    #[error("backend request error: {0}")]
    Http(#[from] reqwest::Error),

    /// The hosted backend answered outside its contract
    #[error("backend error: {reason}")]
    Backend {
        /// What the backend did wrong
        reason: String,
    },

    /// Serialization of a log row failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The sink configuration is unusable
    #[error("sink configuration error: {reason}")]
    Config {
        /// What is missing or invalid
        reason: String,
    },
}

/// Result type alias using `StoreError`.
pub type Result<T> = std::result::Result<T, StoreError>;
