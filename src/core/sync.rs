//! Synchronization loop: fixed-cadence reconciliation with the backend.
//!
//! Every tick fetches the four remote collections concurrently, degrades
//! per source on failure, and swaps the local snapshot atomically. Local
//! orchestration state always wins over a stale remote read while a
//! process is in flight.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::backend::{Backend, SignalFilter};
use crate::domain::{Agent, Entity, HilRequest, OodaProcess, RequestOrigin, Signal, Tier};

use super::gate::HilGate;
use super::orchestrator::Orchestrator;
use super::severity;

/// Consistent view of the console's world at one refresh.
///
/// Replaced wholesale under a single write lock; readers never observe
/// a torn mix of two refreshes.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub signals: Vec<Signal>,
    pub agents: Vec<Agent>,
    pub hil_requests: Vec<HilRequest>,
    pub entities: Vec<Entity>,

    /// Derived per-entity severity, recomputed from the signal slice
    pub entity_tiers: HashMap<String, Tier>,

    /// Local process arena view; never sourced from the remote
    pub processes: Vec<OodaProcess>,

    pub refreshed_at: Option<DateTime<Utc>>,
}

/// The fixed-interval refresh loop.
pub struct SyncLoop {
    backend: Arc<dyn Backend>,
    orchestrator: Arc<Orchestrator>,
    gate: Arc<HilGate>,
    snapshot: Arc<RwLock<Snapshot>>,
    filters: watch::Receiver<SignalFilter>,
    interval: Duration,
}

impl SyncLoop {
    pub fn new(
        backend: Arc<dyn Backend>,
        orchestrator: Arc<Orchestrator>,
        gate: Arc<HilGate>,
        snapshot: Arc<RwLock<Snapshot>>,
        filters: watch::Receiver<SignalFilter>,
        interval: Duration,
    ) -> Self {
        Self {
            backend,
            orchestrator,
            gate,
            snapshot,
            filters,
            interval,
        }
    }

    /// Run the loop forever on its own task.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                self.refresh().await;
            }
        })
    }

    /// One refresh cycle. Public so callers (and tests) can force a
    /// reconciliation outside the cadence.
    pub async fn refresh(&self) {
        let filter = self.filters.borrow().clone();

        let (signals, agents, hil_requests, entities) = tokio::join!(
            self.backend.list_signals(&filter),
            self.backend.list_agents(),
            self.backend.list_hil_requests(),
            self.backend.list_entities(),
        );

        let previous = self.snapshot.read().await.clone();

        let signals = fallback("signals", signals, &previous.signals);
        let agents = fallback("agents", agents, &previous.agents);
        let mut backend_hil = fallback("hil-requests", hil_requests, &previous.hil_requests);
        let entities = fallback("entities", entities, &previous.entities);

        // A fallback slice can carry local rows from an earlier merge;
        // the gate is the live authority for those.
        backend_hil.retain(|r| r.origin == RequestOrigin::Backend);

        let in_flight = self.orchestrator.in_flight_signal_ids().await;
        let signals = merge_signals(signals, &previous.signals, &in_flight);
        let hil_requests = merge_hil_requests(self.gate.pending_requests().await, backend_hil);
        let processes = self.orchestrator.processes().await;
        let entity_tiers = severity::aggregate(&signals);

        debug!(
            signals = signals.len(),
            agents = agents.len(),
            hil = hil_requests.len(),
            entities = entities.len(),
            "snapshot refreshed"
        );

        let mut snapshot = self.snapshot.write().await;
        *snapshot = Snapshot {
            signals,
            agents,
            hil_requests,
            entities,
            entity_tiers,
            processes,
            refreshed_at: Some(Utc::now()),
        };
    }
}

/// Per-source degradation: a failed fetch keeps the previous slice so
/// one slow or broken source never aborts the whole refresh.
fn fallback<T: Clone>(source: &str, result: Result<Vec<T>>, previous: &[T]) -> Vec<T> {
    match result {
        Ok(items) => items,
        Err(e) => {
            warn!(source, error = %e, "refresh source failed, keeping previous slice");
            previous.to_vec()
        }
    }
}

/// Merge fetched signals with the in-flight carve-out: a signal owned by
/// a running local process keeps its previously known row (the remote
/// read may be stale), and is retained even when the remote read dropped
/// it. Once the process is terminal the remote becomes authoritative
/// again on the next cycle.
fn merge_signals(
    fetched: Vec<Signal>,
    previous: &[Signal],
    in_flight: &HashSet<String>,
) -> Vec<Signal> {
    let mut merged = Vec::with_capacity(fetched.len());
    let mut seen: HashSet<String> = HashSet::new();

    for signal in fetched {
        if in_flight.contains(&signal.id) {
            if let Some(local) = previous.iter().find(|s| s.id == signal.id) {
                seen.insert(local.id.clone());
                merged.push(local.clone());
                continue;
            }
        }
        seen.insert(signal.id.clone());
        merged.push(signal);
    }

    for signal in previous {
        if in_flight.contains(&signal.id) && !seen.contains(&signal.id) {
            merged.push(signal.clone());
        }
    }

    merged
}

/// Locally registered gates come first; backend rows with the same id
/// are dropped rather than duplicated.
pub(crate) fn merge_hil_requests(local: Vec<HilRequest>, backend: Vec<HilRequest>) -> Vec<HilRequest> {
    let local_ids: HashSet<String> = local.iter().map(|r| r.id.clone()).collect();

    let mut merged = local;
    merged.extend(backend.into_iter().filter(|r| !local_ids.contains(&r.id)));
    merged
}
