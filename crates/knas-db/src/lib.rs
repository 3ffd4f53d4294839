//! Knas DB - Scan log sinks.
//!
//! Every completed scan is recorded to a sink for analytics: one flat
//! row with aggregate columns plus the full result set as JSON. Two
//! backends implement the same [`ScanLogStore`] trait:
//!
//! - [`SqliteScanLog`] - embedded `SQLite` with `SQLx` migrations
//! - [`SupabaseScanLog`] - a hosted Supabase project via PostgREST
//!
//! The backend is chosen once from configuration by [`connect`];
//! callers hold an `Arc<dyn ScanLogStore>` and never branch on which.
//!
//! Recording is best-effort by contract: callers log a failed `record`
//! and move on, a sink outage must never fail a scan.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::cast_possible_wrap)]

pub mod error;
pub mod sqlite;
pub mod store;
pub mod supabase;

// Re-export commonly used types
pub use error::{Result, StoreError};
pub use sqlite::SqliteScanLog;
pub use store::{classify_platform, ScanLogEntry, ScanLogRow, ScanLogStore, ScanStats};
pub use supabase::SupabaseScanLog;

use knas_core::{AppConfig, LogSinkBackend, LogSinkConfig};
use std::path::PathBuf;
use std::sync::Arc;

/// Open the scan log sink named by configuration.
///
/// A relative `SQLite` path is resolved under the application data
/// directory, which is created if missing.
pub async fn connect(config: &LogSinkConfig) -> Result<Arc<dyn ScanLogStore>> {
    match config.backend {
        LogSinkBackend::Sqlite => {
            let path = resolve_sqlite_path(&config.sqlite_path)?;
            tracing::info!(path = %path.display(), "using embedded scan log");
            Ok(Arc::new(SqliteScanLog::open(&path).await?))
        }
        LogSinkBackend::Supabase => {
            tracing::info!("using hosted scan log");
            Ok(Arc::new(SupabaseScanLog::new(
                &config.supabase_url,
                &config.supabase_service_key,
            )?))
        }
    }
}

fn resolve_sqlite_path(configured: &str) -> Result<PathBuf> {
    let path = PathBuf::from(configured);
    if path.is_absolute() || configured == ":memory:" {
        return Ok(path);
    }

    let data_dir = AppConfig::data_dir().map_err(|e| StoreError::Config {
        reason: format!("cannot resolve data directory: {e}"),
    })?;
    std::fs::create_dir_all(&data_dir).map_err(|e| StoreError::Config {
        reason: format!("cannot create data directory: {e}"),
    })?;
    Ok(data_dir.join(path))
}
