//! The scan service: the library surface an outer transport exposes.
//!
//! Validation happens here and only here. Once a request is past
//! validation nothing can fail it wholesale - municipality failures
//! degrade to `failed` results, sink failures are logged and dropped.

use crate::checker::MunicipalityChecker;
use crate::error::{Result, ScanError};
use crate::events::ScanEvent;
use crate::orchestrator::ScanOrchestrator;
use knas_core::{
    AppConfig, MunicipalityResult, ScanContext, ScanRequest, ScanSummary, ScanningConfig,
};
use knas_db::ScanLogStore;
use knas_portal::PortalClient;
use knas_registry::MunicipalityRegistry;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Avatar colors assigned to municipalities by registry position.
const AVATAR_PALETTE: [&str; 22] = [
    "#e57373", "#f06292", "#ba68c8", "#9575cd", "#7986cb", "#64b5f6", "#4fc3f7", "#4dd0e1",
    "#4db6ac", "#81c784", "#aed581", "#dce775", "#fff176", "#ffd54f", "#ffb74d", "#ff8a65",
    "#a1887f", "#90a4ae", "#f44336", "#26a69a", "#5c6bc0", "#8d6e63",
];

/// Display card for one municipality in the scan set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MunicipalityInfo {
    /// Municipality display name
    pub name: String,
    /// Authority code identifying the portal tenant
    pub authority_code: String,
    /// Two-character avatar initials
    pub initials: String,
    /// Avatar color, fixed per registry position
    pub color: String,
}

/// Aggregate answer of a completed scan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CheckResponse {
    /// One result per registered municipality, completion order
    pub results: Vec<MunicipalityResult>,
    /// Counts of results by status
    pub summary: ScanSummary,
}

/// The scan service.
///
/// Owns the registry, the orchestrator and (optionally) a scan log
/// sink. An outer transport maps its endpoints onto
/// [`municipalities`](Self::municipalities), [`check`](Self::check) and
/// [`check_stream`](Self::check_stream).
pub struct ScanService {
    registry: Arc<MunicipalityRegistry>,
    orchestrator: ScanOrchestrator,
    store: Option<Arc<dyn ScanLogStore>>,
}

impl ScanService {
    /// Build a service over a registry and checker with the given
    /// orchestration settings.
    #[must_use]
    pub fn new(
        registry: Arc<MunicipalityRegistry>,
        checker: Arc<dyn MunicipalityChecker>,
        scanning: &ScanningConfig,
    ) -> Self {
        let orchestrator = ScanOrchestrator::new(Arc::clone(&registry), checker)
            .with_max_concurrent(scanning.max_concurrent_scans)
            .with_check_timeout(scanning.check_timeout());
        Self {
            registry,
            orchestrator,
            store: None,
        }
    }

    /// Attach a scan log sink. Recording is best-effort: a failing
    /// sink is logged, never surfaced to the caller.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn ScanLogStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Wire the full production service from configuration: embedded
    /// registry, portal client, configured scan log sink.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let registry = Arc::new(MunicipalityRegistry::embedded()?);
        let checker = Arc::new(PortalClient::new(config.portal.clone()));
        let store = knas_db::connect(&config.log_sink).await?;
        Ok(Self::new(registry, checker, &config.scanning).with_store(store))
    }

    /// The municipalities this service scans, with their display
    /// attributes.
    #[must_use]
    pub fn municipalities(&self) -> Vec<MunicipalityInfo> {
        self.registry
            .endpoints()
            .iter()
            .enumerate()
            .map(|(index, endpoint)| MunicipalityInfo {
                name: endpoint.name.clone(),
                authority_code: endpoint.authority_code.clone(),
                initials: endpoint.initials(),
                color: AVATAR_PALETTE[index % AVATAR_PALETTE.len()].to_string(),
            })
            .collect()
    }

    /// Run one scan to completion and return the aggregate answer.
    pub async fn check(
        &self,
        request: &ScanRequest,
        context: &ScanContext,
    ) -> Result<CheckResponse> {
        let request = normalize(request)?;

        let (results, summary) = self
            .orchestrator
            .scan(&request.id_number, &request.vehicle_number)
            .await;

        record_scan(self.store.clone(), context, &request, &results, &summary).await;
        Ok(CheckResponse { results, summary })
    }

    /// Run one scan, delivering progressive events.
    ///
    /// The completed scan is recorded to the sink even if the caller
    /// stops consuming events mid-stream.
    pub fn check_stream(
        &self,
        request: &ScanRequest,
        context: &ScanContext,
    ) -> Result<mpsc::Receiver<ScanEvent>> {
        let request = normalize(request)?;

        let inner = self
            .orchestrator
            .scan_stream(&request.id_number, &request.vehicle_number);
        Ok(self.relay_and_record(inner, request, context.clone()))
    }

    /// Relay events from the orchestrator to the consumer while
    /// accumulating results for the sink. The relay drains the scan to
    /// completion regardless of the consumer, so the record at `Done`
    /// always happens.
    fn relay_and_record(
        &self,
        mut inner: mpsc::Receiver<ScanEvent>,
        request: ScanRequest,
        context: ScanContext,
    ) -> mpsc::Receiver<ScanEvent> {
        let (tx, rx) = mpsc::channel(32);
        let store = self.store.clone();

        tokio::spawn(async move {
            let mut results = Vec::new();
            let mut consumer_attached = true;

            while let Some(event) = inner.recv().await {
                match &event {
                    ScanEvent::Result { result } => results.push(result.clone()),
                    ScanEvent::Done { summary } => {
                        record_scan(store.clone(), &context, &request, &results, summary).await;
                    }
                    ScanEvent::Start { .. } => {}
                }

                if consumer_attached && tx.send(event).await.is_err() {
                    tracing::debug!("stream consumer went away, draining scan for the log");
                    consumer_attached = false;
                }
            }
        });

        rx
    }
}

/// Reject a request whose fields are empty after trimming - the only
/// whole-request failure a scan can have - and return it with the
/// trimming applied. Requests arrive from deserialization as well as
/// from `ScanRequest::new`, so padding cannot be assumed gone; the
/// portal and the log sink both get the trimmed values.
fn normalize(request: &ScanRequest) -> Result<ScanRequest> {
    if request.id_number.trim().is_empty() {
        return Err(ScanError::Validation {
            reason: "id number must not be empty".to_string(),
        });
    }
    if request.vehicle_number.trim().is_empty() {
        return Err(ScanError::Validation {
            reason: "vehicle number must not be empty".to_string(),
        });
    }
    Ok(ScanRequest::new(
        &request.id_number,
        &request.vehicle_number,
    ))
}

/// Best-effort forward of a completed scan to the sink.
async fn record_scan(
    store: Option<Arc<dyn ScanLogStore>>,
    context: &ScanContext,
    request: &ScanRequest,
    results: &[MunicipalityResult],
    summary: &ScanSummary,
) {
    let Some(store) = store else {
        return;
    };

    if let Err(err) = store.record(context, request, results, summary).await {
        tracing::warn!(error = %err, "failed to record scan, continuing");
    }
}
