//! Knas Registry - The static municipality endpoint table.
//!
//! Every municipality in the scan set is one tenant of the same legacy
//! portal system, configured here with its tenant-specific quirks: an
//! authority code and report-type code, or a pre-resolved access code
//! that bypasses the negotiation step.
//!
//! The table is data-driven: it is loaded from a TOML document (a file
//! path, or the default table embedded at compile time), validated, and
//! frozen. Nothing mutates it after process start.
//!
//! # Example
//!
//! ```rust
//! use knas_registry::MunicipalityRegistry;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = MunicipalityRegistry::embedded()?;
//! assert!(registry.count() > 0);
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod definition;
pub mod error;
pub mod loader;
pub mod registry;

// Re-export commonly used types
pub use definition::MunicipalityEndpoint;
pub use error::{RegistryError, Result};
pub use loader::RegistryLoader;
pub use registry::MunicipalityRegistry;
