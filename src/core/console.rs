//! Console facade: the single surface a presentation layer talks to.
//!
//! Owns the orchestrator, the gate, the notification queue, and the
//! shared snapshot, and wires the synchronization loop over them.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::adapters::StageEngine;
use crate::backend::{Backend, SignalFilter};
use crate::config::ConsoleConfig;
use crate::domain::{
    HilDecision, ProcessError, ProcessEvent, RequestOrigin, Severity, Signal, SignalDraft,
};

use super::gate::{GateError, HilGate};
use super::notify::{NotificationCategory, NotificationEvent, NotificationQueue};
use super::orchestrator::Orchestrator;
use super::severity;
use super::sync::{merge_hil_requests, Snapshot, SyncLoop};

/// The incident-response console.
pub struct Console {
    config: ConsoleConfig,
    backend: Arc<dyn Backend>,
    orchestrator: Arc<Orchestrator>,
    gate: Arc<HilGate>,
    notifications: Arc<Mutex<NotificationQueue>>,
    snapshot: Arc<RwLock<Snapshot>>,
    filters: watch::Sender<SignalFilter>,
}

impl Console {
    pub fn new(
        config: ConsoleConfig,
        backend: Arc<dyn Backend>,
        engine: Arc<dyn StageEngine>,
    ) -> Self {
        let gate = Arc::new(HilGate::new());
        let notifications = Arc::new(Mutex::new(NotificationQueue::new(
            config.notifications_retain,
        )));
        let orchestrator = Arc::new(Orchestrator::new(
            engine,
            Arc::clone(&gate),
            Arc::clone(&notifications),
            Arc::clone(&backend),
            Some(config.home.clone()),
        ));

        let (filters, _) = watch::channel(SignalFilter {
            limit: config.page_limit,
            ..Default::default()
        });

        Self {
            config,
            backend,
            orchestrator,
            gate,
            notifications,
            snapshot: Arc::new(RwLock::new(Snapshot::default())),
            filters,
        }
    }

    pub fn config(&self) -> &ConsoleConfig {
        &self.config
    }

    /// Start the synchronization loop on its own task.
    pub fn spawn_sync(&self) -> JoinHandle<()> {
        SyncLoop::new(
            Arc::clone(&self.backend),
            Arc::clone(&self.orchestrator),
            Arc::clone(&self.gate),
            Arc::clone(&self.snapshot),
            self.filters.subscribe(),
            Duration::from_secs(self.config.sync_interval_seconds),
        )
        .spawn()
    }

    /// Subscribe to live stage-transition events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ProcessEvent> {
        self.orchestrator.subscribe()
    }

    /// Ingest a synthetic signal and start triaging it.
    pub async fn inject_signal(&self, draft: SignalDraft) -> Result<(Signal, Uuid)> {
        let signal = self.backend.create_signal(&draft).await?;
        self.admit(signal).await
    }

    /// Trigger a named simulation scenario on the backend and triage the
    /// synthesized signal.
    pub async fn trigger_simulation(&self, scenario_type: &str) -> Result<(Signal, Uuid)> {
        let severity = self
            .config
            .scenario(scenario_type)
            .map(|s| s.severity)
            .unwrap_or(Severity::Critical);

        let signal = self
            .backend
            .trigger_simulation(scenario_type, severity)
            .await?;
        self.admit(signal).await
    }

    /// Start a process for an already-known signal (operator click).
    pub async fn click_signal(&self, signal: Signal) -> Result<Uuid, ProcessError> {
        self.orchestrator.start(signal).await
    }

    /// Approve a pending approval request.
    pub async fn approve_hil(&self, request_id: &str) -> Result<()> {
        self.resolve_hil(request_id, HilDecision::Approve).await
    }

    /// Reject a pending approval request. The owning process is
    /// cancelled and the signal stays active.
    pub async fn reject_hil(&self, request_id: &str) -> Result<()> {
        self.resolve_hil(request_id, HilDecision::Reject).await
    }

    /// Replace the operator filter set; the next sync tick uses it.
    pub fn change_filter(&self, filter: SignalFilter) {
        self.filters.send_replace(filter);
    }

    /// Consistent view of the console's world: the last synced remote
    /// slices overlaid with live local orchestration state.
    pub async fn snapshot(&self) -> Snapshot {
        let mut snapshot = self.snapshot.read().await.clone();
        snapshot.processes = self.orchestrator.processes().await;

        // The gate is the live authority for local rows; the synced
        // slice may lag it by one cycle.
        let backend_rows: Vec<_> = std::mem::take(&mut snapshot.hil_requests)
            .into_iter()
            .filter(|r| r.origin == RequestOrigin::Backend)
            .collect();
        snapshot.hil_requests =
            merge_hil_requests(self.gate.pending_requests().await, backend_rows);
        snapshot
    }

    /// Current notifications, newest first.
    pub async fn notifications(&self) -> Vec<NotificationEvent> {
        self.notifications.lock().await.items().cloned().collect()
    }

    pub async fn unread_notifications(&self) -> usize {
        self.notifications.lock().await.unread_count()
    }

    pub async fn mark_notifications_read(&self) {
        self.notifications.lock().await.mark_all_read();
    }

    /// Admit a freshly created signal: surface it locally ahead of the
    /// next sync cycle and start its process.
    async fn admit(&self, signal: Signal) -> Result<(Signal, Uuid)> {
        self.notifications.lock().await.push(NotificationEvent::new(
            category_for(signal.severity),
            format!("New signal: {}", signal.signal_type),
            &signal.id,
        ));

        {
            // Prepend so the signal is visible regardless of the current
            // filter window; the merge rule keeps it while in flight.
            let mut snapshot = self.snapshot.write().await;
            if !snapshot.signals.iter().any(|s| s.id == signal.id) {
                snapshot.signals.insert(0, signal.clone());
                snapshot.entity_tiers = severity::aggregate(&snapshot.signals);
            }
        }

        let process_id = self.orchestrator.start(signal.clone()).await?;
        Ok((signal, process_id))
    }

    /// Local gates resolve in-process; anything the gate does not know
    /// falls through to the backend endpoint.
    async fn resolve_hil(&self, request_id: &str, decision: HilDecision) -> Result<()> {
        match self.gate.resolve(request_id, decision).await {
            Ok(_) => Ok(()),
            Err(GateError::NotFound(_)) => {
                self.backend.resolve_hil(request_id, decision, None).await?;
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn category_for(severity: Severity) -> NotificationCategory {
    match severity {
        Severity::Critical => NotificationCategory::Critical,
        Severity::Error | Severity::Warn => NotificationCategory::Warning,
        Severity::Info | Severity::System => NotificationCategory::Info,
    }
}
