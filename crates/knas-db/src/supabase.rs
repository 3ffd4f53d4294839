//! Hosted Supabase scan log backend, speaking PostgREST.
//!
//! Same table shape as the embedded backend. PostgREST exposes no raw
//! aggregates, so statistics are computed client-side from a narrow
//! column fetch.

use crate::error::{Result, StoreError};
use crate::store::{ScanLogEntry, ScanLogRow, ScanLogStore, ScanStats};
use async_trait::async_trait;
use knas_core::{MunicipalityResult, ScanContext, ScanRequest, ScanSummary};
use serde::Deserialize;
use std::collections::HashSet;

/// Scan log sink backed by a Supabase project's REST API.
pub struct SupabaseScanLog {
    http: reqwest::Client,
    table_url: String,
    service_key: String,
}

/// Narrow row used for the client-side stats computation.
#[derive(Debug, Deserialize)]
struct StatsRow {
    car_number: String,
    fine: i64,
    total_fines: i64,
}

impl SupabaseScanLog {
    /// Build a sink against a Supabase project.
    pub fn new(project_url: &str, service_key: &str) -> Result<Self> {
        if project_url.trim().is_empty() || service_key.trim().is_empty() {
            return Err(StoreError::Config {
                reason: "supabase url and service key are required".to_string(),
            });
        }

        Ok(Self {
            http: reqwest::Client::new(),
            table_url: format!("{}/rest/v1/scan_logs", project_url.trim_end_matches('/')),
            service_key: service_key.to_string(),
        })
    }

    fn authed(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .header("Authorization", format!("Bearer {}", self.service_key))
    }

    async fn expect_success(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Backend {
            reason: format!("HTTP {}: {}", status.as_u16(), body.chars().take(200).collect::<String>()),
        })
    }
}

#[async_trait]
impl ScanLogStore for SupabaseScanLog {
    async fn record(
        &self,
        context: &ScanContext,
        request: &ScanRequest,
        results: &[MunicipalityResult],
        summary: &ScanSummary,
    ) -> Result<i64> {
        let row = ScanLogRow::derive(context, request, results, summary)?;

        let response = self
            .authed(self.http.post(&self.table_url))
            .header("Prefer", "return=representation")
            .json(&row)
            .send()
            .await?;
        let response = Self::expect_success(response).await?;

        let inserted: Vec<ScanLogEntry> = response.json().await?;
        inserted
            .first()
            .map(|entry| entry.id)
            .ok_or_else(|| StoreError::Backend {
                reason: "insert returned no representation".to_string(),
            })
    }

    async fn query(&self, limit: u32, offset: u32) -> Result<Vec<ScanLogEntry>> {
        let response = self
            .authed(self.http.get(&self.table_url))
            .query(&[
                ("select", "*".to_string()),
                ("order", "id.desc".to_string()),
                ("limit", limit.to_string()),
                ("offset", offset.to_string()),
            ])
            .send()
            .await?;
        let response = Self::expect_success(response).await?;

        Ok(response.json().await?)
    }

    async fn get(&self, id: i64) -> Result<Option<ScanLogEntry>> {
        let response = self
            .authed(self.http.get(&self.table_url))
            .query(&[("select", "*".to_string()), ("id", format!("eq.{id}"))])
            .send()
            .await?;
        let response = Self::expect_success(response).await?;

        let mut rows: Vec<ScanLogEntry> = response.json().await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    async fn stats(&self) -> Result<ScanStats> {
        let response = self
            .authed(self.http.get(&self.table_url))
            .query(&[("select", "car_number,fine,total_fines")])
            .send()
            .await?;
        let response = Self::expect_success(response).await?;

        let rows: Vec<StatsRow> = response.json().await?;
        let unique_cars = rows
            .iter()
            .map(|r| r.car_number.as_str())
            .collect::<HashSet<_>>()
            .len();

        Ok(ScanStats {
            total_scans: rows.len() as i64,
            unique_cars: unique_cars as i64,
            total_with_fines: rows.iter().filter(|r| r.fine > 0).count() as i64,
            total_fine_items: rows.iter().map(|r| r.total_fines).sum(),
        })
    }
}
