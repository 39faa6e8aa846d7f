//! Backend boundary: the HTTP-shaped source of truth for signals,
//! agents, approval requests, and entities.
//!
//! The console consumes this contract; it never owns the data behind
//! it. Reporting endpoints are passed through untyped, since they feed
//! read-only views and carry no orchestration state.

pub mod http;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use http::HttpBackend;

use crate::domain::{Agent, Entity, HilDecision, HilRequest, Severity, Signal, SignalDraft, SignalStatus};

/// Operator-selected filters applied to signal reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalFilter {
    /// Time window key (e.g. "24h", "7d")
    pub time_period: String,

    /// Lifecycle phase key ("all", "pre", "migration", "post")
    pub phase: String,

    /// Entity segment values, passed through verbatim
    pub tiers: Vec<String>,

    /// Restrict to one lifecycle status; both when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<SignalStatus>,

    /// Restrict to one severity; all when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,

    /// Page size for the signal read
    pub limit: usize,
}

impl Default for SignalFilter {
    fn default() -> Self {
        Self {
            time_period: "24h".to_string(),
            phase: "all".to_string(),
            tiers: vec![
                "enterprise".to_string(),
                "mid_market".to_string(),
                "sme".to_string(),
            ],
            status: None,
            severity: None,
            limit: 50,
        }
    }
}

/// The backend collaborator contract.
#[async_trait]
pub trait Backend: Send + Sync {
    /// List signals matching the operator filter set.
    async fn list_signals(&self, filter: &SignalFilter) -> Result<Vec<Signal>>;

    /// List automated agents with their current task, if any.
    async fn list_agents(&self) -> Result<Vec<Agent>>;

    /// List pending approval requests issued by the backend.
    async fn list_hil_requests(&self) -> Result<Vec<HilRequest>>;

    /// List named entities.
    async fn list_entities(&self) -> Result<Vec<Entity>>;

    /// Ingest a signal.
    async fn create_signal(&self, draft: &SignalDraft) -> Result<Signal>;

    /// Update a signal's lifecycle status.
    async fn update_signal_status(&self, signal_id: &str, status: SignalStatus) -> Result<Signal>;

    /// Resolve a backend-issued approval request.
    async fn resolve_hil(
        &self,
        request_id: &str,
        decision: HilDecision,
        notes: Option<&str>,
    ) -> Result<HilRequest>;

    /// Trigger a named simulation scenario; returns the synthesized signal.
    async fn trigger_simulation(&self, scenario: &str, severity: Severity) -> Result<Signal>;

    // Read-only reporting, consumed but not owned.

    /// Aggregate metrics summary.
    async fn metrics(&self, filter: &SignalFilter) -> Result<serde_json::Value>;

    /// Time-series of at-risk value over the trailing window.
    async fn revenue_at_risk(&self, hours: u32) -> Result<serde_json::Value>;

    /// Resolution-rate breakdown over the trailing window.
    async fn resolution_stats(&self, days: u32) -> Result<serde_json::Value>;

    /// Ranked list of high-friction entities.
    async fn friction_leaderboard(&self, limit: u32) -> Result<serde_json::Value>;

    /// Executive summary.
    async fn brief(&self) -> Result<serde_json::Value>;

    /// Audit log tail.
    async fn audit_log(&self, limit: u32) -> Result<serde_json::Value>;

    /// Liveness probe.
    async fn health_check(&self) -> Result<()>;
}
