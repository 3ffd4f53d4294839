//! Progressive scan events, for consumers that render results as they
//! arrive instead of waiting for the aggregate.

use knas_core::{MunicipalityResult, ScanSummary};
use serde::{Deserialize, Serialize};

/// One event in a streamed scan.
///
/// A stream is always `Start`, then one `Result` per municipality in
/// completion order, then `Done`. Completion order is not registry
/// order: fast municipalities arrive first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScanEvent {
    /// The scan started; `total` municipality checks will follow
    Start {
        /// Number of municipalities being checked
        total: u32,
    },
    /// One municipality check completed
    Result {
        /// The completed check's result
        result: MunicipalityResult,
    },
    /// The scan finished; no further events follow
    Done {
        /// Counts of results by status
        summary: ScanSummary,
    },
}
