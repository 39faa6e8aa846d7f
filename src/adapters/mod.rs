//! Stage engine interfaces for the reasoning pipeline.
//!
//! Engines are the opaque capabilities behind the four stages: the
//! orchestrator invokes them and records their outputs without knowing
//! how a diagnosis or remedy is computed.

pub mod playbook;

use anyhow::Result;
use async_trait::async_trait;

pub use playbook::{PlaybookEngine, RiskPolicy};

use crate::domain::{ActionTaken, ProposedSolution, Signal};

/// Output of the decide stage.
#[derive(Debug, Clone)]
pub struct Decision {
    /// Ordered reasoning steps
    pub chain_of_thought: Vec<String>,

    /// The remedy, carrying the risk classification
    pub solution: ProposedSolution,
}

/// Trait for the opaque stage capabilities.
///
/// Each method is one stage step. A returned error means the step
/// failed; the caller leaves the stage active and surfaces the stall.
/// Engines are never retried automatically.
#[async_trait]
pub trait StageEngine: Send + Sync {
    /// Human-readable engine name
    fn name(&self) -> &str;

    /// Collect descriptive findings about the signal
    async fn observe(&self, signal: &Signal) -> Result<Vec<String>>;

    /// Produce a single contextual summary from the findings
    async fn orient(&self, signal: &Signal, findings: &[String]) -> Result<String>;

    /// Produce a reasoning chain and a proposed remedy
    async fn decide(&self, signal: &Signal, context: &str) -> Result<Decision>;

    /// Apply the proposed remedy, returning the actions taken
    async fn act(&self, signal: &Signal, solution: &ProposedSolution) -> Result<Vec<ActionTaken>>;
}
