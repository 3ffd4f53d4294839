//! Error types for scan orchestration and the service surface.

use thiserror::Error;

/// Errors that can occur at the scan service boundary.
///
/// Note what is absent: a single municipality failing is never an
/// error here. Per-municipality failures degrade to `failed` results;
/// only whole-request problems surface as `ScanError`.
#[derive(Error, Debug)]
pub enum ScanError {
    /// The request was rejected before any dispatch
    #[error("validation error: {reason}")]
    Validation {
        /// Why the request is unusable
        reason: String,
    },

    /// The municipality registry could not be loaded
    #[error("registry error: {0}")]
    Registry(#[from] knas_registry::RegistryError),

    /// The scan log sink could not be opened
    #[error("store error: {0}")]
    Store(#[from] knas_db::StoreError),
}

/// Result type alias using `ScanError`.
pub type Result<T> = std::result::Result<T, ScanError>;
