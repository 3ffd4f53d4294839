//! Knas Scanner - Scan orchestration and the service surface.
//!
//! A scan takes one identity/vehicle pair and checks it against every
//! registered municipality concurrently, with bounded fan-out and a
//! per-check deadline. Individual municipality failures degrade to
//! `failed` results; the scan as a whole always completes.
//!
//! # Architecture
//!
//! - [`MunicipalityChecker`] - the seam to the portal protocol,
//!   implemented by `knas_portal::PortalClient`
//! - [`ScanOrchestrator`] - bounded concurrent fan-out with a ceiling
//!   deadline per check
//! - [`ScanEvent`] - progressive events for streaming consumers
//! - [`ScanService`] - the validated surface an outer transport maps
//!   its endpoints onto, with best-effort scan logging
//!
//! # Example
//!
//! ```rust,ignore
//! use knas_core::{AppConfig, ScanContext, ScanRequest};
//! use knas_scanner::ScanService;
//!
//! let config = AppConfig::load_with_env()?;
//! let service = ScanService::from_config(&config).await?;
//! let response = service
//!     .check(&ScanRequest::new("207089616", "6185313"), &ScanContext::default())
//!     .await?;
//! println!("{} fines", response.summary.fine);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod checker;
pub mod error;
pub mod events;
pub mod orchestrator;
pub mod service;

// Re-export commonly used types
pub use checker::MunicipalityChecker;
pub use error::{Result, ScanError};
pub use events::ScanEvent;
pub use orchestrator::ScanOrchestrator;
pub use service::{CheckResponse, MunicipalityInfo, ScanService};
