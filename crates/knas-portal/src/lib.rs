//! Knas Portal - The multi-step portal session protocol client.
//!
//! Every municipality in the scan set runs the same legacy ASP.NET
//! fine-lookup flow. Checking one municipality means driving a 4-5 step
//! stateful handshake over an isolated cookie session: bootstrap the
//! session, negotiate tenant parameters, advance the session, search,
//! and - when the search answer is ambiguous - scrape the HTML detail
//! page for itemized fines.
//!
//! The client never lets an error escape its boundary: every failure
//! path folds into a `failed` [`knas_core::MunicipalityResult`].
//!
//! # Example
//!
//! ```rust,ignore
//! use knas_core::PortalConfig;
//! use knas_portal::PortalClient;
//!
//! let client = PortalClient::new(PortalConfig::default());
//! let result = client.check(&endpoint, "207089616", "6185313").await;
//! println!("{}: {}", result.name, result.status);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]

pub mod client;
pub mod error;
pub mod extractor;
pub mod session;

// Re-export commonly used types
pub use client::PortalClient;
pub use error::{PortalError, Result};
pub use extractor::{extract_fines, ExtractedFines};
pub use session::{SearchResponse, SessionParameters};
