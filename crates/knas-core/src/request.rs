//! Scan request inputs and caller context.
//!
//! `ScanRequest` is the pair being checked; `ScanContext` is opaque
//! caller metadata that rides along to the scan log sink and never
//! influences the scan itself.

use serde::{Deserialize, Serialize};

/// The identity/vehicle pair one scan checks against every
/// municipality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRequest {
    /// Israeli identity number of the person
    pub id_number: String,
    /// Vehicle registration number
    pub vehicle_number: String,
}

impl ScanRequest {
    /// Build a request from raw inputs, trimming surrounding
    /// whitespace.
    #[must_use]
    pub fn new(id_number: impl Into<String>, vehicle_number: impl Into<String>) -> Self {
        Self {
            id_number: id_number.into().trim().to_string(),
            vehicle_number: vehicle_number.into().trim().to_string(),
        }
    }

    /// Whether both fields survive trimming non-empty.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.id_number.trim().is_empty() && !self.vehicle_number.trim().is_empty()
    }
}

/// Caller metadata forwarded to the scan log sink.
///
/// Every field is optional; an absent field is logged as absent, never
/// guessed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScanContext {
    /// Caller IP address, as the outer transport saw it
    pub ip: Option<String>,
    /// Caller User-Agent string
    pub user_agent: Option<String>,
    /// Self-reported latitude
    pub latitude: Option<f64>,
    /// Self-reported longitude
    pub longitude: Option<f64>,
}
