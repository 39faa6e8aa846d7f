//! Human-in-the-loop gate: pending approvals keyed by process.
//!
//! A process that proposes a high-risk remedy suspends here until an
//! operator decides. Registration hands back a receiver the process
//! awaits; resolution is exactly-once, and a second resolve on the same
//! request is observably rejected rather than ignored.

use std::collections::HashMap;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{oneshot, Mutex};
use tracing::warn;
use uuid::Uuid;

use crate::domain::{
    HilDecision, HilMetrics, HilRequest, HilStatus, ProposedSolution, RequestOrigin, Signal,
};

/// Gate consistency failures. Each one signals a caller bug or a race,
/// never a recoverable condition.
#[derive(Debug, Clone, Error)]
pub enum GateError {
    #[error("approval request {0} not found")]
    NotFound(String),

    #[error("approval request {0} already resolved")]
    AlreadyResolved(String),

    #[error("process {0} already has a pending approval request")]
    AlreadyPending(Uuid),
}

struct PendingGate {
    request: HilRequest,
    decision_tx: oneshot::Sender<HilDecision>,
}

#[derive(Default)]
struct GateState {
    /// Pending requests by request id
    pending: HashMap<String, PendingGate>,

    /// Active request id per process, enforcing one pending per process
    by_process: HashMap<Uuid, String>,

    /// Terminal statuses, kept so repeat resolves fail distinctly
    resolved: HashMap<String, HilStatus>,
}

/// The approval gate.
pub struct HilGate {
    state: Mutex<GateState>,
}

impl Default for HilGate {
    fn default() -> Self {
        Self::new()
    }
}

impl HilGate {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(GateState::default()),
        }
    }

    /// Register a pending approval for a suspended process.
    ///
    /// Returns the request and the receiver the process awaits its
    /// decision on. Fails with `AlreadyPending` if the process already
    /// has an open gate.
    pub async fn register(
        &self,
        process_id: Uuid,
        signal: &Signal,
        solution: ProposedSolution,
    ) -> Result<(HilRequest, oneshot::Receiver<HilDecision>), GateError> {
        let mut state = self.state.lock().await;

        if state.by_process.contains_key(&process_id) {
            return Err(GateError::AlreadyPending(process_id));
        }

        let metrics = HilMetrics {
            revenue_at_risk: signal
                .metadata
                .get("revenue_at_risk")
                .and_then(|v| v.as_u64()),
            stability_index: None,
            confidence: Some(solution.confidence),
        };

        let request = HilRequest {
            id: Uuid::new_v4().to_string(),
            process_id: Some(process_id),
            signal_id: signal.id.clone(),
            title: format!("Approve high-risk remedy: {}", signal.signal_type),
            risk_level: solution.risk_level,
            proposed_action: solution,
            metrics,
            origin: RequestOrigin::Local,
            created_at: Utc::now(),
            status: HilStatus::Pending,
        };

        let (decision_tx, decision_rx) = oneshot::channel();

        state.by_process.insert(process_id, request.id.clone());
        state.pending.insert(
            request.id.clone(),
            PendingGate {
                request: request.clone(),
                decision_tx,
            },
        );

        Ok((request, decision_rx))
    }

    /// Resolve a pending request. Exactly-once: the first call decides,
    /// any later call on the same id fails without effect.
    pub async fn resolve(
        &self,
        request_id: &str,
        decision: HilDecision,
    ) -> Result<HilRequest, GateError> {
        let mut state = self.state.lock().await;

        let Some(gate) = state.pending.remove(request_id) else {
            if state.resolved.contains_key(request_id) {
                return Err(GateError::AlreadyResolved(request_id.to_string()));
            }
            return Err(GateError::NotFound(request_id.to_string()));
        };

        let mut request = gate.request;
        request.status = match decision {
            HilDecision::Approve => HilStatus::Approved,
            HilDecision::Reject => HilStatus::Rejected,
        };

        if let Some(process_id) = request.process_id {
            state.by_process.remove(&process_id);
        }
        state.resolved.insert(request.id.clone(), request.status);

        if gate.decision_tx.send(decision).is_err() {
            // Process task is gone; the resolution still stands.
            warn!(request_id = %request.id, "resolved a gate whose process is no longer waiting");
        }

        Ok(request)
    }

    /// Whether a request id is currently pending here.
    pub async fn is_pending(&self, request_id: &str) -> bool {
        self.state.lock().await.pending.contains_key(request_id)
    }

    /// All pending requests, for the snapshot merge.
    pub async fn pending_requests(&self) -> Vec<HilRequest> {
        let state = self.state.lock().await;
        let mut requests: Vec<_> = state.pending.values().map(|g| g.request.clone()).collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RiskLevel, Severity, SignalStatus};

    fn test_signal() -> Signal {
        Signal {
            id: "sig_1".to_string(),
            signal_type: "DB_SCHEMA_CORRUPTION".to_string(),
            severity: Severity::Critical,
            source: "DatabaseGuard".to_string(),
            endpoint: None,
            entity_id: Some("m1".to_string()),
            metadata: serde_json::json!({ "revenue_at_risk": 45000 }),
            status: SignalStatus::Active,
            created_at: Utc::now(),
        }
    }

    fn test_solution() -> ProposedSolution {
        ProposedSolution {
            solution_type: "schema_change".to_string(),
            description: "Rebuild the corrupted table".to_string(),
            confidence: 88,
            risk_level: RiskLevel::High,
        }
    }

    #[tokio::test]
    async fn test_register_and_approve() {
        let gate = HilGate::new();
        let process_id = Uuid::new_v4();

        let (request, rx) = gate
            .register(process_id, &test_signal(), test_solution())
            .await
            .unwrap();
        assert_eq!(request.status, HilStatus::Pending);
        assert_eq!(request.origin, RequestOrigin::Local);
        assert_eq!(request.metrics.revenue_at_risk, Some(45000));

        let resolved = gate.resolve(&request.id, HilDecision::Approve).await.unwrap();
        assert_eq!(resolved.status, HilStatus::Approved);
        assert_eq!(rx.await.unwrap(), HilDecision::Approve);
    }

    #[tokio::test]
    async fn test_duplicate_registration_fails() {
        let gate = HilGate::new();
        let process_id = Uuid::new_v4();

        let _first = gate
            .register(process_id, &test_signal(), test_solution())
            .await
            .unwrap();

        let second = gate
            .register(process_id, &test_signal(), test_solution())
            .await;
        assert!(matches!(second, Err(GateError::AlreadyPending(id)) if id == process_id));
    }

    #[tokio::test]
    async fn test_resolve_is_exactly_once() {
        let gate = HilGate::new();
        let (request, _rx) = gate
            .register(Uuid::new_v4(), &test_signal(), test_solution())
            .await
            .unwrap();

        gate.resolve(&request.id, HilDecision::Reject).await.unwrap();

        let again = gate.resolve(&request.id, HilDecision::Approve).await;
        assert!(matches!(again, Err(GateError::AlreadyResolved(_))));
    }

    #[tokio::test]
    async fn test_resolve_unknown_id() {
        let gate = HilGate::new();
        let result = gate.resolve("nope", HilDecision::Approve).await;
        assert!(matches!(result, Err(GateError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_pending_set_shrinks_on_resolution() {
        let gate = HilGate::new();
        let (request, _rx) = gate
            .register(Uuid::new_v4(), &test_signal(), test_solution())
            .await
            .unwrap();

        assert_eq!(gate.pending_requests().await.len(), 1);
        assert!(gate.is_pending(&request.id).await);

        gate.resolve(&request.id, HilDecision::Approve).await.unwrap();
        assert!(gate.pending_requests().await.is_empty());
        assert!(!gate.is_pending(&request.id).await);
    }
}
