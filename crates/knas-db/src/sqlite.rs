//! Embedded SQLite scan log backend.
//!
//! Uses a `SQLx` pool with embedded migrations. The database file is
//! created on first use.

use crate::error::Result;
use crate::store::{ScanLogEntry, ScanLogRow, ScanLogStore, ScanStats};
use async_trait::async_trait;
use knas_core::{MunicipalityResult, ScanContext, ScanRequest, ScanSummary};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Pool, Row, Sqlite};
use std::path::Path;
use std::str::FromStr;

/// Scan log sink backed by an embedded SQLite database.
#[derive(Debug)]
pub struct SqliteScanLog {
    pool: Pool<Sqlite>,
}

impl SqliteScanLog {
    /// Open (creating if missing) the database at `path` and run
    /// migrations. `:memory:` is accepted for tests.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy();
        let options = SqliteConnectOptions::from_str(&path_str)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::debug!("scan log database ready at {}", path_str);

        Ok(Self { pool })
    }

    /// The underlying pool, for callers that need raw queries.
    #[must_use]
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

fn entry_from_row(row: &SqliteRow) -> ScanLogEntry {
    ScanLogEntry {
        id: row.get("id"),
        row: ScanLogRow {
            timestamp: row.get("timestamp"),
            ip: row.get("ip"),
            id_number: row.get("id_number"),
            car_number: row.get("car_number"),
            clean: row.get("clean"),
            fine: row.get("fine"),
            failed: row.get("failed"),
            total_fines: row.get("total_fines"),
            total_amount: row.get("total_amount"),
            fine_munis: row.get("fine_munis"),
            fine_addresses: row.get("fine_addresses"),
            user_agent: row.get("user_agent"),
            platform: row.get("platform"),
            latitude: row.get("latitude"),
            longitude: row.get("longitude"),
            results_json: row.get("results_json"),
        },
    }
}

#[async_trait]
impl ScanLogStore for SqliteScanLog {
    async fn record(
        &self,
        context: &ScanContext,
        request: &ScanRequest,
        results: &[MunicipalityResult],
        summary: &ScanSummary,
    ) -> Result<i64> {
        let row = ScanLogRow::derive(context, request, results, summary)?;

        let inserted = sqlx::query(
            "INSERT INTO scan_logs (
                timestamp, ip, id_number, car_number,
                clean, fine, failed, total_fines, total_amount,
                fine_munis, fine_addresses, user_agent, platform,
                latitude, longitude, results_json
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&row.timestamp)
        .bind(&row.ip)
        .bind(&row.id_number)
        .bind(&row.car_number)
        .bind(row.clean)
        .bind(row.fine)
        .bind(row.failed)
        .bind(row.total_fines)
        .bind(&row.total_amount)
        .bind(&row.fine_munis)
        .bind(&row.fine_addresses)
        .bind(&row.user_agent)
        .bind(&row.platform)
        .bind(row.latitude)
        .bind(row.longitude)
        .bind(&row.results_json)
        .execute(&self.pool)
        .await?;

        Ok(inserted.last_insert_rowid())
    }

    async fn query(&self, limit: u32, offset: u32) -> Result<Vec<ScanLogEntry>> {
        let rows = sqlx::query("SELECT * FROM scan_logs ORDER BY id DESC LIMIT ? OFFSET ?")
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.iter().map(entry_from_row).collect())
    }

    async fn get(&self, id: i64) -> Result<Option<ScanLogEntry>> {
        let row = sqlx::query("SELECT * FROM scan_logs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(entry_from_row))
    }

    async fn stats(&self) -> Result<ScanStats> {
        let row = sqlx::query(
            "SELECT
                COUNT(*) AS total_scans,
                COUNT(DISTINCT car_number) AS unique_cars,
                COALESCE(SUM(CASE WHEN fine > 0 THEN 1 ELSE 0 END), 0) AS total_with_fines,
                COALESCE(SUM(total_fines), 0) AS total_fine_items
            FROM scan_logs",
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(ScanStats {
            total_scans: row.get("total_scans"),
            unique_cars: row.get("unique_cars"),
            total_with_fines: row.get("total_with_fines"),
            total_fine_items: row.get("total_fine_items"),
        })
    }
}
