//! The scan result model shared across the Knas crates.
//!
//! One scan checks one `(identity number, vehicle number)` pair against
//! every registered municipality. Each municipality check produces exactly
//! one [`MunicipalityResult`]; a [`ScanSummary`] counts results by status
//! across the whole scan. Nothing in this model outlives a single scan.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome status of checking a single municipality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    /// No fines registered for this identity/vehicle pair
    Clean,
    /// At least one fine was found
    Fine,
    /// The check could not be completed (transport or protocol failure)
    Failed,
}

impl fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Clean => "clean",
            Self::Fine => "fine",
            Self::Failed => "failed",
        };
        write!(f, "{s}")
    }
}

/// One itemized fine, extracted from a portal detail page.
///
/// Every field is best-effort: a field the page did not yield (or that
/// failed to parse) is `None`. `price_display` keeps the raw display
/// text when the numeric amount could not be parsed. Immutable once
/// produced.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FineItem {
    /// Fine (report) number as displayed by the portal
    #[serde(skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,

    /// Parsed monetary amount, when the price attribute was numeric
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,

    /// Raw display price text, kept as fallback when parsing failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_display: Option<String>,

    /// Violation date in `DD/MM/YYYY` form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,

    /// Violation time in `HH:MM` form
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,

    /// Violation address, when the portal lists one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl FineItem {
    /// Whether the extractor found anything at all for this row.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.number.is_none()
            && self.amount.is_none()
            && self.price_display.is_none()
            && self.date.is_none()
            && self.time.is_none()
            && self.location.is_none()
    }
}

/// Outcome of checking one municipality for one identity/vehicle pair.
///
/// Invariants, enforced by the constructors:
/// - exactly one status;
/// - `fine` always carries `count >= 1`;
/// - `clean` carries no amount, fines or error fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MunicipalityResult {
    /// Municipality display name
    pub name: String,

    /// Outcome status
    pub status: ScanStatus,

    /// Number of fines found (present only for `fine`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub count: Option<u32>,

    /// Total amount: a decimal rendering, the portal's own aggregate,
    /// or a human-readable fallback text (present only for `fine`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,

    /// Person name as echoed by the portal (present only for `fine`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub person_name: Option<String>,

    /// Itemized fines from the detail page, when that path was taken
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fines: Option<Vec<FineItem>>,

    /// Error description (present only for `failed`)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MunicipalityResult {
    /// A clean result: no fines for this pair in this municipality.
    #[must_use]
    pub fn clean(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ScanStatus::Clean,
            count: None,
            amount: None,
            person_name: None,
            fines: None,
            error: None,
        }
    }

    /// A fine result from the portal's own aggregate (search step).
    ///
    /// `count` must be at least 1; the protocol only reaches this
    /// branch when the portal reported a positive count.
    #[must_use]
    pub fn fine(
        name: impl Into<String>,
        count: u32,
        amount: impl Into<String>,
        person_name: Option<String>,
    ) -> Self {
        debug_assert!(count >= 1, "fine result requires count >= 1");
        Self {
            name: name.into(),
            status: ScanStatus::Fine,
            count: Some(count),
            amount: Some(amount.into()),
            person_name,
            fines: None,
            error: None,
        }
    }

    /// A fine result built from extracted detail-page rows.
    #[must_use]
    pub fn fine_with_items(
        name: impl Into<String>,
        amount: impl Into<String>,
        fines: Vec<FineItem>,
    ) -> Self {
        debug_assert!(!fines.is_empty(), "fine result requires at least one item");
        Self {
            name: name.into(),
            status: ScanStatus::Fine,
            count: Some(fines.len() as u32),
            amount: Some(amount.into()),
            person_name: None,
            fines: Some(fines),
            error: None,
        }
    }

    /// A failed result carrying an error description.
    #[must_use]
    pub fn failed(name: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status: ScanStatus::Failed,
            count: None,
            amount: None,
            person_name: None,
            fines: None,
            error: Some(error.into()),
        }
    }

    /// Number of itemized fines carried by this result (0 when none).
    #[must_use]
    pub fn fine_count(&self) -> u32 {
        self.count.unwrap_or(0)
    }
}

/// Counts of results by status across one whole scan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanSummary {
    /// Municipalities with no fines
    pub clean: u32,
    /// Municipalities with at least one fine
    pub fine: u32,
    /// Municipalities whose check failed
    pub failed: u32,
}

impl ScanSummary {
    /// Record one completed municipality check.
    pub fn record(&mut self, status: ScanStatus) {
        match status {
            ScanStatus::Clean => self.clean += 1,
            ScanStatus::Fine => self.fine += 1,
            ScanStatus::Failed => self.failed += 1,
        }
    }

    /// Build a summary from a slice of results.
    #[must_use]
    pub fn from_results(results: &[MunicipalityResult]) -> Self {
        let mut summary = Self::default();
        for result in results {
            summary.record(result.status);
        }
        summary
    }

    /// Total number of municipality checks counted.
    #[must_use]
    pub fn total(&self) -> u32 {
        self.clean + self.fine + self.failed
    }
}
