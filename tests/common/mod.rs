//! Shared test doubles: an in-memory backend and scripted stage engines.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use triagedeck::adapters::{Decision, PlaybookEngine, RiskPolicy, StageEngine};
use triagedeck::backend::{Backend, SignalFilter};
use triagedeck::domain::{
    ActionTaken, Agent, Entity, HilDecision, HilRequest, HilStatus, ProposedSolution, Severity,
    Signal, SignalDraft, SignalStatus, Stage,
};
use triagedeck::ProcessEvent;

/// In-memory stand-in for the backend collaborator.
#[derive(Default)]
pub struct MockBackend {
    pub signals: Mutex<HashMap<String, Signal>>,
    pub agents: Mutex<Vec<Agent>>,
    pub hil_requests: Mutex<Vec<HilRequest>>,
    pub entities: Mutex<Vec<Entity>>,

    /// When set, signal reads fail (transient-failure simulation)
    pub fail_signal_reads: AtomicBool,

    /// Last filter seen by a signal read
    pub last_filter: Mutex<Option<SignalFilter>>,

    counter: AtomicUsize,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&self) -> String {
        format!("sig_{}", self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }

    pub fn signal_status(&self, signal_id: &str) -> Option<SignalStatus> {
        self.signals
            .lock()
            .unwrap()
            .get(signal_id)
            .map(|s| s.status)
    }

    pub fn seed_signal(&self, signal: Signal) {
        self.signals
            .lock()
            .unwrap()
            .insert(signal.id.clone(), signal);
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn list_signals(&self, filter: &SignalFilter) -> Result<Vec<Signal>> {
        *self.last_filter.lock().unwrap() = Some(filter.clone());

        if self.fail_signal_reads.load(Ordering::SeqCst) {
            bail!("connection refused");
        }

        Ok(self.signals.lock().unwrap().values().cloned().collect())
    }

    async fn list_agents(&self) -> Result<Vec<Agent>> {
        Ok(self.agents.lock().unwrap().clone())
    }

    async fn list_hil_requests(&self) -> Result<Vec<HilRequest>> {
        Ok(self
            .hil_requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.status == HilStatus::Pending)
            .cloned()
            .collect())
    }

    async fn list_entities(&self) -> Result<Vec<Entity>> {
        Ok(self.entities.lock().unwrap().clone())
    }

    async fn create_signal(&self, draft: &SignalDraft) -> Result<Signal> {
        let signal = Signal {
            id: self.next_id(),
            signal_type: draft.signal_type.clone(),
            severity: draft.severity,
            source: draft.source.clone(),
            endpoint: draft.endpoint.clone(),
            entity_id: draft.entity_id.clone(),
            metadata: draft.metadata.clone(),
            status: SignalStatus::Active,
            created_at: Utc::now(),
        };

        self.seed_signal(signal.clone());
        Ok(signal)
    }

    async fn update_signal_status(&self, signal_id: &str, status: SignalStatus) -> Result<Signal> {
        let mut signals = self.signals.lock().unwrap();
        let Some(signal) = signals.get_mut(signal_id) else {
            bail!("signal {} not found", signal_id);
        };
        signal.status = status;
        Ok(signal.clone())
    }

    async fn resolve_hil(
        &self,
        request_id: &str,
        decision: HilDecision,
        _notes: Option<&str>,
    ) -> Result<HilRequest> {
        let mut requests = self.hil_requests.lock().unwrap();
        let Some(request) = requests.iter_mut().find(|r| r.id == request_id) else {
            bail!("hil request {} not found", request_id);
        };

        request.status = match decision {
            HilDecision::Approve => HilStatus::Approved,
            HilDecision::Reject => HilStatus::Rejected,
        };
        Ok(request.clone())
    }

    async fn trigger_simulation(&self, scenario: &str, severity: Severity) -> Result<Signal> {
        self.create_signal(&SignalDraft {
            signal_type: scenario.to_string(),
            severity,
            source: "SimulationEngine".to_string(),
            endpoint: None,
            entity_id: None,
            metadata: serde_json::Value::Null,
        })
        .await
    }

    async fn metrics(&self, _filter: &SignalFilter) -> Result<serde_json::Value> {
        Ok(serde_json::json!({}))
    }

    async fn revenue_at_risk(&self, _hours: u32) -> Result<serde_json::Value> {
        Ok(serde_json::json!({ "data": [] }))
    }

    async fn resolution_stats(&self, _days: u32) -> Result<serde_json::Value> {
        Ok(serde_json::json!({}))
    }

    async fn friction_leaderboard(&self, _limit: u32) -> Result<serde_json::Value> {
        Ok(serde_json::json!({ "data": [] }))
    }

    async fn brief(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({ "status": "ok" }))
    }

    async fn audit_log(&self, _limit: u32) -> Result<serde_json::Value> {
        Ok(serde_json::json!({ "data": [] }))
    }

    async fn health_check(&self) -> Result<()> {
        Ok(())
    }
}

pub fn default_policy() -> RiskPolicy {
    RiskPolicy::new(vec!["DB_SCHEMA_*".to_string(), "*_CORRUPTION".to_string()])
}

/// Engine that fails at one scripted stage and otherwise behaves like
/// the built-in playbook.
pub struct FailingEngine {
    fail_at: Stage,
    inner: PlaybookEngine,
}

impl FailingEngine {
    pub fn new(fail_at: Stage) -> Self {
        Self {
            fail_at,
            inner: PlaybookEngine::new(default_policy()),
        }
    }
}

#[async_trait]
impl StageEngine for FailingEngine {
    fn name(&self) -> &str {
        "failing"
    }

    async fn observe(&self, signal: &Signal) -> Result<Vec<String>> {
        if self.fail_at == Stage::Observe {
            bail!("scripted observe failure");
        }
        self.inner.observe(signal).await
    }

    async fn orient(&self, signal: &Signal, findings: &[String]) -> Result<String> {
        if self.fail_at == Stage::Orient {
            bail!("scripted orient failure");
        }
        self.inner.orient(signal, findings).await
    }

    async fn decide(&self, signal: &Signal, context: &str) -> Result<Decision> {
        if self.fail_at == Stage::Decide {
            bail!("scripted decide failure");
        }
        self.inner.decide(signal, context).await
    }

    async fn act(&self, signal: &Signal, solution: &ProposedSolution) -> Result<Vec<ActionTaken>> {
        if self.fail_at == Stage::Act {
            bail!("scripted act failure");
        }
        self.inner.act(signal, solution).await
    }
}

/// Collect events for one process until it resolves, cancels, stalls,
/// or suspends for approval.
pub async fn collect_until(
    events: &mut tokio::sync::broadcast::Receiver<ProcessEvent>,
    process_id: Uuid,
    stop: impl Fn(&ProcessEvent) -> bool,
) -> Vec<ProcessEvent> {
    let mut collected = Vec::new();

    let deadline = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(event) => {
                    if event.process_id != process_id {
                        continue;
                    }
                    let done = stop(&event);
                    collected.push(event);
                    if done {
                        break;
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
    .await;

    assert!(deadline.is_ok(), "timed out waiting for process events");
    collected
}
