//! Error types for the municipality registry.

use thiserror::Error;

/// Errors that can occur loading or querying the municipality table.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// Definitions file not found
    #[error("municipality definitions file not found at {path}")]
    FileNotFound {
        /// Path that was checked
        path: String,
    },

    /// TOML parse failure
    #[error("failed to parse municipality definitions: {0}")]
    Parse(#[from] toml::de::Error),

    /// A definition failed validation
    #[error("invalid municipality definition '{name}': {reason}")]
    Validation {
        /// Display name of the offending entry (may be empty)
        name: String,
        /// Reason for invalidity
        reason: String,
    },

    /// Requested municipality not present in the table
    #[error("municipality not found: {authority_code}")]
    NotFound {
        /// Authority code that was looked up
        authority_code: String,
    },

    /// I/O error reading the definitions file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using `RegistryError`.
pub type Result<T> = std::result::Result<T, RegistryError>;
