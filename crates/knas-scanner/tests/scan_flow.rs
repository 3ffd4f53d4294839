//! End-to-end scan flow against a stubbed portal: service validation,
//! orchestration, streaming, and the scan log sink.

use async_trait::async_trait;
use knas_core::{
    MunicipalityResult, ScanContext, ScanRequest, ScanStatus, ScanningConfig,
};
use knas_db::{ScanLogStore, SqliteScanLog};
use knas_registry::{MunicipalityEndpoint, MunicipalityRegistry};
use knas_scanner::{MunicipalityChecker, ScanError, ScanEvent, ScanService};
use std::sync::Arc;

/// Stub portal: fines in Ramat Gan, a failure in Arad, clean elsewhere.
struct StubPortal;

#[async_trait]
impl MunicipalityChecker for StubPortal {
    async fn check(
        &self,
        endpoint: &MunicipalityEndpoint,
        _id_number: &str,
        _vehicle_number: &str,
    ) -> MunicipalityResult {
        match endpoint.authority_code.as_str() {
            "186111" => MunicipalityResult::fine(&endpoint.name, 2, "350.50", None),
            "240400" => MunicipalityResult::failed(&endpoint.name, "HTTP 500"),
            _ => MunicipalityResult::clean(&endpoint.name),
        }
    }
}

fn registry() -> Arc<MunicipalityRegistry> {
    let endpoint = |name: &str, code: &str| MunicipalityEndpoint {
        name: name.to_string(),
        authority_code: code.to_string(),
        report_type_code: "1".to_string(),
        access_code: None,
    };
    Arc::new(MunicipalityRegistry::new(vec![
        endpoint("עיריית רמת גן", "186111"),
        endpoint("עיריית ערד", "240400"),
        endpoint("עיריית גבעתיים", "630100"),
        endpoint("עיריית חולון", "660000"),
    ]))
}

async fn service_with_store() -> (ScanService, Arc<SqliteScanLog>) {
    let store = Arc::new(SqliteScanLog::open(":memory:").await.expect("open store"));
    let service = ScanService::new(
        registry(),
        Arc::new(StubPortal),
        &ScanningConfig::default(),
    )
    .with_store(Arc::clone(&store) as Arc<dyn ScanLogStore>);
    (service, store)
}

fn context() -> ScanContext {
    ScanContext {
        ip: Some("203.0.113.7".to_string()),
        user_agent: Some("Mozilla/5.0 (Linux; Android 14; Pixel 8)".to_string()),
        latitude: None,
        longitude: None,
    }
}

#[tokio::test]
async fn test_check_returns_aggregate_and_records_to_sink() {
    let (service, store) = service_with_store().await;

    let response = service
        .check(&ScanRequest::new("207089616", "6185313"), &context())
        .await
        .expect("check");

    assert_eq!(response.results.len(), 4);
    assert_eq!(response.summary.clean, 2);
    assert_eq!(response.summary.fine, 1);
    assert_eq!(response.summary.failed, 1);

    let fined = response
        .results
        .iter()
        .find(|r| r.status == ScanStatus::Fine)
        .expect("fine result");
    assert_eq!(fined.name, "עיריית רמת גן");
    assert_eq!(fined.amount.as_deref(), Some("350.50"));

    let entries = store.query(10, 0).await.expect("query");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].row.car_number, "6185313");
    assert_eq!(entries[0].row.fine, 1);
    assert_eq!(entries[0].row.fine_munis, "עיריית רמת גן");
    assert_eq!(entries[0].row.platform, "Android");
}

#[tokio::test]
async fn test_check_stream_emits_full_event_sequence_and_records() {
    let (service, store) = service_with_store().await;

    let mut rx = service
        .check_stream(&ScanRequest::new("207089616", "6185313"), &context())
        .expect("stream");

    let mut events = Vec::new();
    while let Some(event) = rx.recv().await {
        events.push(event);
    }

    assert_eq!(events.first(), Some(&ScanEvent::Start { total: 4 }));
    let result_count = events
        .iter()
        .filter(|e| matches!(e, ScanEvent::Result { .. }))
        .count();
    assert_eq!(result_count, 4);
    let Some(ScanEvent::Done { summary }) = events.last() else {
        panic!("stream must end with Done");
    };
    assert_eq!(summary.total(), 4);

    // Recording happens before Done is forwarded, so the sink already
    // holds the scan.
    let entries = store.query(10, 0).await.expect("query");
    assert_eq!(entries.len(), 1);
}

#[tokio::test]
async fn test_invalid_request_is_rejected_before_dispatch() {
    let (service, store) = service_with_store().await;

    let err = service
        .check(
            &ScanRequest {
                id_number: "  ".to_string(),
                vehicle_number: "6185313".to_string(),
            },
            &ScanContext::default(),
        )
        .await
        .expect_err("must reject");
    assert!(matches!(err, ScanError::Validation { .. }));

    let stream_err = service
        .check_stream(
            &ScanRequest {
                id_number: "207089616".to_string(),
                vehicle_number: String::new(),
            },
            &ScanContext::default(),
        )
        .err()
        .expect("must reject");
    assert!(matches!(stream_err, ScanError::Validation { .. }));

    // Nothing reached the sink
    let stats = store.stats().await.expect("stats");
    assert_eq!(stats.total_scans, 0);
}

#[tokio::test]
async fn test_sink_failure_never_fails_a_scan() {
    // A service with no sink at all behaves identically
    let service = ScanService::new(
        registry(),
        Arc::new(StubPortal),
        &ScanningConfig::default(),
    );

    let response = service
        .check(&ScanRequest::new("207089616", "6185313"), &ScanContext::default())
        .await
        .expect("check");
    assert_eq!(response.summary.total(), 4);
}

#[tokio::test]
async fn test_padded_request_is_trimmed_before_dispatch() {
    // Capture what the portal seam actually receives
    struct CapturingPortal {
        seen: std::sync::Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl MunicipalityChecker for CapturingPortal {
        async fn check(
            &self,
            endpoint: &MunicipalityEndpoint,
            id_number: &str,
            vehicle_number: &str,
        ) -> MunicipalityResult {
            self.seen
                .lock()
                .expect("lock")
                .push((id_number.to_string(), vehicle_number.to_string()));
            MunicipalityResult::clean(&endpoint.name)
        }
    }

    let portal = Arc::new(CapturingPortal {
        seen: std::sync::Mutex::new(Vec::new()),
    });
    let store = Arc::new(SqliteScanLog::open(":memory:").await.expect("open store"));
    let service = ScanService::new(
        registry(),
        Arc::clone(&portal) as Arc<dyn MunicipalityChecker>,
        &ScanningConfig::default(),
    )
        .with_store(Arc::clone(&store) as Arc<dyn ScanLogStore>);

    // Deserialized requests carry their padding; new() is not the
    // only way in
    let padded = ScanRequest {
        id_number: " 207089616 ".to_string(),
        vehicle_number: "\t6185313\n".to_string(),
    };
    service
        .check(&padded, &ScanContext::default())
        .await
        .expect("check");

    for (id, vehicle) in portal.seen.lock().expect("lock").iter() {
        assert_eq!(id, "207089616");
        assert_eq!(vehicle, "6185313");
    }

    // The sink gets the trimmed values too
    let entries = store.query(10, 0).await.expect("query");
    assert_eq!(entries[0].row.id_number, "207089616");
    assert_eq!(entries[0].row.car_number, "6185313");
}

#[tokio::test]
async fn test_municipality_cards() {
    let (service, _store) = service_with_store().await;
    let cards = service.municipalities();

    assert_eq!(cards.len(), 4);
    assert_eq!(cards[0].name, "עיריית רמת גן");
    assert_eq!(cards[0].initials, "רמ");
    assert!(cards[0].color.starts_with('#'));
    // Colors are assigned by position and differ within a palette span
    assert_ne!(cards[0].color, cards[1].color);
}
