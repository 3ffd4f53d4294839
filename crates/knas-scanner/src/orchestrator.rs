//! Scan orchestrator: fan one request out across every registered
//! municipality with bounded concurrency.
//!
//! Isolation is the load-bearing property here. Every municipality
//! check runs in its own portal session under its own deadline; one
//! municipality hanging or failing never delays, cancels or corrupts
//! its siblings.

use crate::checker::MunicipalityChecker;
use crate::events::ScanEvent;
use futures::stream::{FuturesUnordered, StreamExt};
use knas_core::{MunicipalityResult, ScanSummary};
use knas_registry::{MunicipalityEndpoint, MunicipalityRegistry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Error text for a check that exceeded the per-check ceiling.
const CEILING_ERROR: &str = "scan timed out";

/// Buffered events between the scan task and a streaming consumer.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Orchestrates one scan across all registered municipalities.
pub struct ScanOrchestrator {
    registry: Arc<MunicipalityRegistry>,
    checker: Arc<dyn MunicipalityChecker>,
    max_concurrent: usize,
    check_timeout: Duration,
}

impl ScanOrchestrator {
    /// Create an orchestrator over a registry and a checker.
    #[must_use]
    pub fn new(registry: Arc<MunicipalityRegistry>, checker: Arc<dyn MunicipalityChecker>) -> Self {
        Self {
            registry,
            checker,
            max_concurrent: 5,
            check_timeout: Duration::from_secs(60),
        }
    }

    /// Set the number of checks allowed to run concurrently.
    #[must_use]
    pub fn with_max_concurrent(mut self, max: usize) -> Self {
        self.max_concurrent = max.max(1);
        self
    }

    /// Set the ceiling deadline for one municipality check. This is
    /// independent of the portal's per-step timeouts: it bounds the
    /// whole check, however many steps it takes.
    #[must_use]
    pub fn with_check_timeout(mut self, timeout: Duration) -> Self {
        self.check_timeout = timeout;
        self
    }

    /// Run one full scan, returning every municipality's result and
    /// the status summary.
    ///
    /// Always returns exactly one result per registered municipality.
    /// Results arrive in completion order.
    pub async fn scan(
        &self,
        id_number: &str,
        vehicle_number: &str,
    ) -> (Vec<MunicipalityResult>, ScanSummary) {
        tracing::info!(
            municipalities = self.registry.count(),
            "starting scan"
        );

        let mut futures = FuturesUnordered::new();
        let mut results = Vec::with_capacity(self.registry.count());

        for endpoint in self.registry.endpoints() {
            futures.push(self.check_one(endpoint.clone(), id_number, vehicle_number));

            // Respect the concurrency limit
            while futures.len() >= self.max_concurrent {
                if let Some(result) = futures.next().await {
                    results.push(result);
                }
            }
        }

        while let Some(result) = futures.next().await {
            results.push(result);
        }

        let summary = ScanSummary::from_results(&results);
        tracing::info!(
            clean = summary.clean,
            fine = summary.fine,
            failed = summary.failed,
            "scan finished"
        );
        (results, summary)
    }

    /// Run one full scan, delivering progressive [`ScanEvent`]s.
    ///
    /// Emits `Start`, then one `Result` per completion in completion
    /// order, then `Done`. The scan keeps running under the same
    /// per-check ceiling whether or not the receiver keeps up; a
    /// dropped receiver abandons the scan.
    #[must_use]
    pub fn scan_stream(&self, id_number: &str, vehicle_number: &str) -> mpsc::Receiver<ScanEvent> {
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);

        let registry = Arc::clone(&self.registry);
        let checker = Arc::clone(&self.checker);
        let max_concurrent = self.max_concurrent;
        let check_timeout = self.check_timeout;
        let id_number = id_number.to_string();
        let vehicle_number = vehicle_number.to_string();

        tokio::spawn(async move {
            #[allow(clippy::cast_possible_truncation)]
            let total = registry.count() as u32;
            if tx.send(ScanEvent::Start { total }).await.is_err() {
                return;
            }

            let mut summary = ScanSummary::default();
            let mut futures = FuturesUnordered::new();

            for endpoint in registry.endpoints().iter().cloned() {
                let checker = Arc::clone(&checker);
                let id = id_number.clone();
                let vehicle = vehicle_number.clone();
                futures.push(async move {
                    run_with_ceiling(&*checker, endpoint, &id, &vehicle, check_timeout).await
                });

                while futures.len() >= max_concurrent {
                    if let Some(result) = futures.next().await {
                        summary.record(result.status);
                        if tx.send(ScanEvent::Result { result }).await.is_err() {
                            return;
                        }
                    }
                }
            }

            while let Some(result) = futures.next().await {
                summary.record(result.status);
                if tx.send(ScanEvent::Result { result }).await.is_err() {
                    return;
                }
            }

            let _ = tx.send(ScanEvent::Done { summary }).await;
        });

        rx
    }

    async fn check_one(
        &self,
        endpoint: MunicipalityEndpoint,
        id_number: &str,
        vehicle_number: &str,
    ) -> MunicipalityResult {
        run_with_ceiling(
            &*self.checker,
            endpoint,
            id_number,
            vehicle_number,
            self.check_timeout,
        )
        .await
    }
}

/// One municipality check under the ceiling deadline. Exceeding the
/// ceiling degrades this municipality to failed; siblings continue.
async fn run_with_ceiling(
    checker: &dyn MunicipalityChecker,
    endpoint: MunicipalityEndpoint,
    id_number: &str,
    vehicle_number: &str,
    ceiling: Duration,
) -> MunicipalityResult {
    match tokio::time::timeout(ceiling, checker.check(&endpoint, id_number, vehicle_number)).await
    {
        Ok(result) => result,
        Err(_) => {
            tracing::warn!(
                municipality = %endpoint.name,
                ceiling_secs = ceiling.as_secs(),
                "municipality check exceeded ceiling"
            );
            MunicipalityResult::failed(&endpoint.name, CEILING_ERROR)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use knas_core::ScanStatus;

    /// Stub checker: clean everywhere except a fixed set of slow or
    /// fined municipalities.
    struct StubChecker {
        fine_at: Vec<String>,
        hang_at: Vec<String>,
        delay: Duration,
    }

    impl StubChecker {
        fn clean() -> Self {
            Self {
                fine_at: Vec::new(),
                hang_at: Vec::new(),
                delay: Duration::ZERO,
            }
        }
    }

    #[async_trait]
    impl MunicipalityChecker for StubChecker {
        async fn check(
            &self,
            endpoint: &MunicipalityEndpoint,
            _id_number: &str,
            _vehicle_number: &str,
        ) -> MunicipalityResult {
            if self.hang_at.contains(&endpoint.name) {
                std::future::pending::<()>().await;
            }
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fine_at.contains(&endpoint.name) {
                MunicipalityResult::fine(&endpoint.name, 2, "350.50", None)
            } else {
                MunicipalityResult::clean(&endpoint.name)
            }
        }
    }

    fn registry(names: &[&str]) -> Arc<MunicipalityRegistry> {
        Arc::new(MunicipalityRegistry::new(
            names
                .iter()
                .map(|name| MunicipalityEndpoint {
                    name: (*name).to_string(),
                    authority_code: format!("{:04}", name.len()),
                    report_type_code: "1".to_string(),
                    access_code: None,
                })
                .collect(),
        ))
    }

    #[tokio::test]
    async fn test_scan_yields_one_result_per_municipality() {
        let registry = registry(&["alef", "bet", "gimel", "dalet"]);
        let checker = Arc::new(StubChecker {
            fine_at: vec!["bet".to_string()],
            hang_at: Vec::new(),
            delay: Duration::ZERO,
        });

        let orchestrator = ScanOrchestrator::new(Arc::clone(&registry), checker);
        let (results, summary) = orchestrator.scan("207089616", "6185313").await;

        assert_eq!(results.len(), 4);
        assert_eq!(summary.total(), 4);
        assert_eq!(summary.fine, 1);
        assert_eq!(summary.clean, 3);

        // Every registered municipality is present exactly once
        let mut names: Vec<_> = results.iter().map(|r| r.name.as_str()).collect();
        names.sort_unstable();
        assert_eq!(names, vec!["alef", "bet", "dalet", "gimel"]);
    }

    #[tokio::test]
    async fn test_scan_is_idempotent_with_stubbed_portal() {
        let registry = registry(&["alef", "bet", "gimel"]);
        let checker = Arc::new(StubChecker {
            fine_at: vec!["gimel".to_string()],
            hang_at: Vec::new(),
            delay: Duration::ZERO,
        });
        let orchestrator = ScanOrchestrator::new(registry, checker);

        let (mut first, first_summary) = orchestrator.scan("207089616", "6185313").await;
        let (mut second, second_summary) = orchestrator.scan("207089616", "6185313").await;

        first.sort_by(|a, b| a.name.cmp(&b.name));
        second.sort_by(|a, b| a.name.cmp(&b.name));
        assert_eq!(first, second);
        assert_eq!(first_summary, second_summary);
    }

    #[tokio::test]
    async fn test_ceiling_degrades_to_failed_without_cancelling_siblings() {
        let registry = registry(&["fast", "stuck", "quick"]);
        let checker = Arc::new(StubChecker {
            fine_at: Vec::new(),
            hang_at: vec!["stuck".to_string()],
            delay: Duration::ZERO,
        });

        let orchestrator = ScanOrchestrator::new(registry, checker)
            .with_check_timeout(Duration::from_millis(50));
        let (results, summary) = orchestrator.scan("207089616", "6185313").await;

        assert_eq!(results.len(), 3);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.clean, 2);

        let stuck = results.iter().find(|r| r.name == "stuck").expect("stuck result");
        assert_eq!(stuck.status, ScanStatus::Failed);
        assert_eq!(stuck.error.as_deref(), Some("scan timed out"));
    }

    #[tokio::test]
    async fn test_stream_emits_start_results_done() {
        let registry = registry(&["alef", "bet"]);
        let orchestrator = ScanOrchestrator::new(registry, Arc::new(StubChecker::clean()));

        let mut rx = orchestrator.scan_stream("207089616", "6185313");
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }

        assert_eq!(events.len(), 4);
        assert_eq!(events[0], ScanEvent::Start { total: 2 });
        assert!(matches!(events[1], ScanEvent::Result { .. }));
        assert!(matches!(events[2], ScanEvent::Result { .. }));
        assert_eq!(
            events[3],
            ScanEvent::Done {
                summary: ScanSummary {
                    clean: 2,
                    fine: 0,
                    failed: 0
                }
            }
        );
    }

    #[tokio::test]
    async fn test_stream_delivery_unaffected_by_one_slow_municipality() {
        let registry = registry(&["slowest", "a", "b", "c"]);
        let checker = Arc::new(StubChecker {
            fine_at: Vec::new(),
            hang_at: vec!["slowest".to_string()],
            delay: Duration::ZERO,
        });

        let orchestrator = ScanOrchestrator::new(registry, checker)
            .with_check_timeout(Duration::from_millis(200));
        let mut rx = orchestrator.scan_stream("207089616", "6185313");

        let mut result_names = Vec::new();
        while let Some(event) = rx.recv().await {
            if let ScanEvent::Result { result } = event {
                result_names.push(result.name);
            }
        }

        // The fast municipalities complete before the stuck one is
        // timed out, even though it was dispatched first.
        assert_eq!(result_names.len(), 4);
        assert_eq!(result_names.last().map(String::as_str), Some("slowest"));
    }
}
