//! Knas Core - Foundation crate for the parking-fine scan service.
//!
//! This crate provides the shared result model, error handling and
//! configuration management that all other Knas crates depend on.
//!
//! # Modules
//!
//! - [`error`] - Central error types using thiserror
//! - [`config`] - TOML-based configuration with XDG paths
//! - [`types`] - The scan result model (`ScanStatus`, `FineItem`,
//!   `MunicipalityResult`, `ScanSummary`)
//! - [`request`] - Scan inputs (`ScanRequest`) and caller context
//!   (`ScanContext`)
//!
//! # Example
//!
//! ```rust
//! use knas_core::{MunicipalityResult, ScanSummary};
//!
//! let mut summary = ScanSummary::default();
//! let result = MunicipalityResult::clean("Ramat Gan");
//! summary.record(result.status);
//! assert_eq!(summary.total(), 1);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod config;
pub mod error;
pub mod request;
pub mod types;

// Re-export commonly used types
pub use config::{AppConfig, LogSinkBackend, LogSinkConfig, PortalConfig, ScanningConfig};
pub use error::{ConfigError, ConfigResult, KnasError, Result};
pub use request::{ScanContext, ScanRequest};
pub use types::{FineItem, MunicipalityResult, ScanStatus, ScanSummary};
