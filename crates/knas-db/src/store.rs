//! The scan log sink abstraction and the flat row derivation shared by
//! every backend.
//!
//! Recording a scan flattens the full result set into one analytics row
//! plus a complete JSON dump. The flat columns exist for cheap querying;
//! `results_json` remains the authoritative record.

use crate::error::Result;
use async_trait::async_trait;
use knas_core::{MunicipalityResult, ScanContext, ScanRequest, ScanStatus, ScanSummary};
use serde::{Deserialize, Serialize};

/// A scan log sink. Implemented by the embedded SQLite backend and the
/// hosted Supabase backend; the caller never branches on which.
#[async_trait]
pub trait ScanLogStore: Send + Sync {
    /// Record one completed scan. Returns the new entry's id.
    async fn record(
        &self,
        context: &ScanContext,
        request: &ScanRequest,
        results: &[MunicipalityResult],
        summary: &ScanSummary,
    ) -> Result<i64>;

    /// Fetch recorded scans, newest first.
    async fn query(&self, limit: u32, offset: u32) -> Result<Vec<ScanLogEntry>>;

    /// Fetch a single entry by id.
    async fn get(&self, id: i64) -> Result<Option<ScanLogEntry>>;

    /// Aggregate statistics over every recorded scan.
    async fn stats(&self) -> Result<ScanStats>;
}

/// Aggregate statistics over the scan log.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanStats {
    /// Number of recorded scans
    pub total_scans: i64,
    /// Number of distinct vehicle numbers seen
    pub unique_cars: i64,
    /// Number of scans that found at least one fine
    pub total_with_fines: i64,
    /// Sum of fine counts across all scans
    pub total_fine_items: i64,
}

/// One stored scan log entry, as read back from a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanLogEntry {
    /// Backend-assigned row id
    pub id: i64,
    /// Flattened row columns
    #[serde(flatten)]
    pub row: ScanLogRow,
}

/// The flat analytics row derived from one completed scan.
///
/// Field names match the storage columns on both backends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanLogRow {
    /// UTC timestamp, RFC 3339
    pub timestamp: String,
    /// Caller IP, when the context carried one
    pub ip: Option<String>,
    /// Identity number that was scanned
    pub id_number: String,
    /// Vehicle number that was scanned
    pub car_number: String,
    /// Municipalities that came back clean
    pub clean: i64,
    /// Municipalities with at least one fine
    pub fine: i64,
    /// Municipalities whose check failed
    pub failed: i64,
    /// Total fine count across all municipalities
    pub total_fines: i64,
    /// Sum of parseable amounts rendered to two decimals, empty when zero
    pub total_amount: String,
    /// Comma-joined names of municipalities with fines
    pub fine_munis: String,
    /// Pipe-joined `"{municipality}: {location}"` pairs
    pub fine_addresses: String,
    /// Caller User-Agent, when the context carried one
    pub user_agent: Option<String>,
    /// Platform classified from the user agent
    pub platform: String,
    /// Self-reported latitude
    pub latitude: Option<f64>,
    /// Self-reported longitude
    pub longitude: Option<f64>,
    /// Full result set as JSON, the authoritative record
    pub results_json: String,
}

impl ScanLogRow {
    /// Flatten one completed scan into an analytics row.
    ///
    /// Amounts that do not parse as decimals (textual fallbacks like
    /// "see details") are excluded from the total; the JSON dump still
    /// carries them.
    pub fn derive(
        context: &ScanContext,
        request: &ScanRequest,
        results: &[MunicipalityResult],
        summary: &ScanSummary,
    ) -> Result<Self> {
        let mut total_fines: i64 = 0;
        let mut total_amount = 0.0_f64;
        let mut fine_munis = Vec::new();
        let mut fine_addresses = Vec::new();

        for result in results {
            if result.status != ScanStatus::Fine {
                continue;
            }
            total_fines += i64::from(result.fine_count());
            fine_munis.push(result.name.clone());

            if let Some(amount) = &result.amount {
                if let Ok(value) = amount.trim().parse::<f64>() {
                    total_amount += value;
                }
            }

            for item in result.fines.iter().flatten() {
                if let Some(location) = &item.location {
                    fine_addresses.push(format!("{}: {}", result.name, location));
                }
            }
        }

        let rendered_amount = if total_amount > 0.0 {
            format!("{total_amount:.2}")
        } else {
            String::new()
        };

        Ok(Self {
            timestamp: chrono::Utc::now().to_rfc3339(),
            ip: context.ip.clone(),
            id_number: request.id_number.clone(),
            car_number: request.vehicle_number.clone(),
            clean: i64::from(summary.clean),
            fine: i64::from(summary.fine),
            failed: i64::from(summary.failed),
            total_fines,
            total_amount: rendered_amount,
            fine_munis: fine_munis.join(","),
            fine_addresses: fine_addresses.join("|"),
            user_agent: context.user_agent.clone(),
            platform: classify_platform(context.user_agent.as_deref()).to_string(),
            latitude: context.latitude,
            longitude: context.longitude,
            results_json: serde_json::to_string(results)?,
        })
    }
}

/// Classify a user-agent string into a coarse platform label.
///
/// Android is checked before Linux: Android user agents contain the
/// "linux" substring.
#[must_use]
pub fn classify_platform(user_agent: Option<&str>) -> &'static str {
    let Some(ua) = user_agent else {
        return "Unknown";
    };
    if ua.trim().is_empty() {
        return "Unknown";
    }

    let ua = ua.to_lowercase();
    if ua.contains("iphone") || ua.contains("ipad") {
        "iOS"
    } else if ua.contains("android") {
        "Android"
    } else if ua.contains("macintosh") || ua.contains("mac os") {
        "macOS"
    } else if ua.contains("windows") {
        "Windows"
    } else if ua.contains("cros") {
        "ChromeOS"
    } else if ua.contains("linux") {
        "Linux"
    } else {
        "Other"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knas_core::FineItem;

    fn context() -> ScanContext {
        ScanContext {
            ip: Some("203.0.113.7".to_string()),
            user_agent: Some("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)".to_string()),
            latitude: Some(31.75),
            longitude: Some(35.0),
        }
    }

    fn request() -> ScanRequest {
        ScanRequest::new("207089616", "6185313")
    }

    #[test]
    fn test_platform_classification_table() {
        let cases = [
            (Some("Mozilla/5.0 (iPhone; CPU iPhone OS 17_0)"), "iOS"),
            (Some("Mozilla/5.0 (iPad; CPU OS 16_5)"), "iOS"),
            (Some("Mozilla/5.0 (Linux; Android 14; Pixel 8)"), "Android"),
            (Some("Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7)"), "macOS"),
            (Some("Mozilla/5.0 (Windows NT 10.0; Win64; x64)"), "Windows"),
            (Some("Mozilla/5.0 (X11; Linux x86_64)"), "Linux"),
            (Some("Mozilla/5.0 (X11; CrOS x86_64 14541.0.0)"), "ChromeOS"),
            (Some("curl/8.4.0"), "Other"),
            (Some(""), "Unknown"),
            (None, "Unknown"),
        ];

        for (ua, expected) in cases {
            assert_eq!(classify_platform(ua), expected, "ua: {ua:?}");
        }
    }

    #[test]
    fn test_derive_flattens_fine_results() {
        let results = vec![
            MunicipalityResult::clean("עיריית גבעתיים"),
            MunicipalityResult::fine("עיריית רמת גן", 2, "350.50", None),
            MunicipalityResult::fine_with_items(
                "עיריית הרצליה",
                "100.00",
                vec![FineItem {
                    number: Some("9001".to_string()),
                    amount: Some(100.0),
                    location: Some("סוקולוב 5".to_string()),
                    ..FineItem::default()
                }],
            ),
            MunicipalityResult::failed("עיריית ערד", "HTTP 500"),
        ];
        let summary = ScanSummary::from_results(&results);

        let row = ScanLogRow::derive(&context(), &request(), &results, &summary).expect("derive");

        assert_eq!(row.clean, 1);
        assert_eq!(row.fine, 2);
        assert_eq!(row.failed, 1);
        assert_eq!(row.total_fines, 3);
        assert_eq!(row.total_amount, "450.50");
        assert_eq!(row.fine_munis, "עיריית רמת גן,עיריית הרצליה");
        assert_eq!(row.fine_addresses, "עיריית הרצליה: סוקולוב 5");
        assert_eq!(row.platform, "iOS");
        assert_eq!(row.car_number, "6185313");

        // The JSON dump round-trips the full result set
        let parsed: Vec<MunicipalityResult> =
            serde_json::from_str(&row.results_json).expect("results json");
        assert_eq!(parsed, results);
    }

    #[test]
    fn test_derive_unparseable_amount_is_excluded() {
        let results = vec![MunicipalityResult::fine(
            "עיריית חולון",
            1,
            "see details",
            None,
        )];
        let summary = ScanSummary::from_results(&results);

        let row = ScanLogRow::derive(&context(), &request(), &results, &summary).expect("derive");
        assert_eq!(row.total_amount, "");
        assert_eq!(row.total_fines, 1);
    }

    #[test]
    fn test_derive_all_clean_scan() {
        let results = vec![
            MunicipalityResult::clean("a"),
            MunicipalityResult::clean("b"),
        ];
        let summary = ScanSummary::from_results(&results);

        let row = ScanLogRow::derive(&ScanContext::default(), &request(), &results, &summary)
            .expect("derive");
        assert_eq!(row.fine_munis, "");
        assert_eq!(row.fine_addresses, "");
        assert_eq!(row.total_amount, "");
        assert_eq!(row.platform, "Unknown");
        assert!(row.ip.is_none());
    }
}
