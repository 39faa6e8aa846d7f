//! Synchronization loop: per-source degradation and the in-flight merge
//! rule.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{watch, Mutex, RwLock};

use common::{collect_until, default_policy, FailingEngine, MockBackend};
use triagedeck::adapters::{PlaybookEngine, StageEngine};
use triagedeck::backend::{Backend, SignalFilter};
use triagedeck::core::{HilGate, NotificationQueue, Orchestrator, Snapshot, SyncLoop};
use triagedeck::domain::{
    ProcessEventKind, RequestOrigin, Severity, Signal, SignalStatus, Stage,
};

struct Harness {
    backend: Arc<MockBackend>,
    orchestrator: Arc<Orchestrator>,
    snapshot: Arc<RwLock<Snapshot>>,
    filters: watch::Sender<SignalFilter>,
    sync: SyncLoop,
}

fn harness(engine: Arc<dyn StageEngine>) -> Harness {
    let backend = Arc::new(MockBackend::new());
    let gate = Arc::new(HilGate::new());
    let notifications = Arc::new(Mutex::new(NotificationQueue::new(100)));
    let orchestrator = Arc::new(Orchestrator::new(
        engine,
        Arc::clone(&gate),
        notifications,
        Arc::clone(&backend) as Arc<dyn Backend>,
        None,
    ));
    let snapshot = Arc::new(RwLock::new(Snapshot::default()));
    let (filters, filters_rx) = watch::channel(SignalFilter::default());

    let sync = SyncLoop::new(
        Arc::clone(&backend) as Arc<dyn Backend>,
        Arc::clone(&orchestrator),
        gate,
        Arc::clone(&snapshot),
        filters_rx,
        Duration::from_secs(3),
    );

    Harness {
        backend,
        orchestrator,
        snapshot,
        filters,
        sync,
    }
}

fn signal(id: &str, severity: Severity) -> Signal {
    Signal {
        id: id.to_string(),
        signal_type: "404_SPIKE_DETECTED".to_string(),
        severity,
        source: "test".to_string(),
        endpoint: None,
        entity_id: Some("m1".to_string()),
        metadata: serde_json::Value::Null,
        status: SignalStatus::Active,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_refresh_populates_snapshot() {
    let h = harness(Arc::new(PlaybookEngine::new(default_policy())));
    h.backend.seed_signal(signal("s1", Severity::Critical));

    h.sync.refresh().await;

    let snapshot = h.snapshot.read().await;
    assert_eq!(snapshot.signals.len(), 1);
    assert!(snapshot.refreshed_at.is_some());
    assert_eq!(
        snapshot.entity_tiers.get("m1"),
        Some(&triagedeck::Tier::Critical)
    );
}

#[tokio::test]
async fn test_failed_source_keeps_previous_slice() {
    let h = harness(Arc::new(PlaybookEngine::new(default_policy())));
    h.backend.seed_signal(signal("s1", Severity::Warn));

    h.sync.refresh().await;
    assert_eq!(h.snapshot.read().await.signals.len(), 1);

    h.backend.fail_signal_reads.store(true, Ordering::SeqCst);
    h.sync.refresh().await;

    // Degraded, not emptied; the loop carried on and re-stamped
    let snapshot = h.snapshot.read().await;
    assert_eq!(snapshot.signals.len(), 1);
    assert_eq!(snapshot.signals[0].id, "s1");
    assert!(snapshot.refreshed_at.is_some());
}

#[tokio::test]
async fn test_in_flight_process_survives_stale_remote_reads() {
    // Observe stalls, so the process stays in flight indefinitely
    let h = harness(Arc::new(FailingEngine::new(Stage::Observe)) as Arc<dyn StageEngine>);
    let s = signal("s1", Severity::Critical);
    h.backend.seed_signal(s.clone());

    h.sync.refresh().await;

    let mut events = h.orchestrator.subscribe();
    let process_id = h.orchestrator.start(s.clone()).await.unwrap();
    collect_until(&mut events, process_id, |e| {
        e.kind == ProcessEventKind::StageStalled
    })
    .await;

    // Remote flips the signal while the process is still running
    h.backend
        .signals
        .lock()
        .unwrap()
        .get_mut("s1")
        .unwrap()
        .status = SignalStatus::Resolved;
    h.sync.refresh().await;

    let snapshot = h.snapshot.read().await;
    assert_eq!(snapshot.signals[0].status, SignalStatus::Active);
    let process = snapshot
        .processes
        .iter()
        .find(|p| p.id == process_id)
        .unwrap();
    assert!(process.outcome.is_none());
    drop(snapshot);

    // Remote drops the signal entirely; the local row is still retained
    h.backend.signals.lock().unwrap().remove("s1");
    h.sync.refresh().await;

    let snapshot = h.snapshot.read().await;
    assert!(snapshot.signals.iter().any(|s| s.id == "s1"));
}

#[tokio::test]
async fn test_filter_change_applies_on_next_refresh() {
    let h = harness(Arc::new(PlaybookEngine::new(default_policy())));

    h.filters.send_replace(SignalFilter {
        time_period: "7d".to_string(),
        phase: "migration".to_string(),
        tiers: vec!["enterprise".to_string()],
        limit: 10,
        ..Default::default()
    });

    h.sync.refresh().await;

    let seen = h.backend.last_filter.lock().unwrap().clone().unwrap();
    assert_eq!(seen.time_period, "7d");
    assert_eq!(seen.phase, "migration");
    assert_eq!(seen.tiers, vec!["enterprise".to_string()]);
    assert_eq!(seen.limit, 10);
}

#[tokio::test]
async fn test_local_pending_gates_appear_in_snapshot() {
    let h = harness(Arc::new(PlaybookEngine::new(default_policy())));
    let s = signal("s1", Severity::Critical);
    h.backend.seed_signal(s.clone());

    let mut events = h.orchestrator.subscribe();
    let process_id = h.orchestrator.start(s).await.unwrap();
    collect_until(&mut events, process_id, |e| {
        e.kind == ProcessEventKind::ApprovalRequested
    })
    .await;

    h.sync.refresh().await;

    let snapshot = h.snapshot.read().await;
    assert_eq!(snapshot.hil_requests.len(), 1);
    assert_eq!(snapshot.hil_requests[0].origin, RequestOrigin::Local);
    assert_eq!(snapshot.hil_requests[0].process_id, Some(process_id));
}
