//! OODA process state: the staged execution of one signal.
//!
//! Stage statuses are monotonic. A stage can only activate once every
//! earlier stage is complete, and can never regress; the transition
//! methods here are the single place that invariant is enforced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// The four pipeline stages, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Observe,
    Orient,
    Decide,
    Act,
}

impl Stage {
    /// Pipeline order, first to last.
    pub const PIPELINE: [Stage; 4] = [Stage::Observe, Stage::Orient, Stage::Decide, Stage::Act];

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Observe => "observe",
            Stage::Orient => "orient",
            Stage::Decide => "decide",
            Stage::Act => "act",
        }
    }

    /// The stage after this one, if any.
    pub fn next(&self) -> Option<Stage> {
        match self {
            Stage::Observe => Some(Stage::Orient),
            Stage::Orient => Some(Stage::Decide),
            Stage::Decide => Some(Stage::Act),
            Stage::Act => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status of a single stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Pending,
    Active,
    Complete,
}

impl Default for StageStatus {
    fn default() -> Self {
        Self::Pending
    }
}

/// Risk classification attached to a proposed solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Remedy proposed at decide-complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProposedSolution {
    /// Kind of remedy (e.g. "config_change", "schema_change")
    #[serde(rename = "type")]
    pub solution_type: String,

    /// Human-readable description of the remedy
    pub description: String,

    /// Confidence 0-100
    pub confidence: u8,

    /// Risk classification; high suspends the pipeline at the gate
    pub risk_level: RiskLevel,
}

/// A single remediation step recorded at act-complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionTaken {
    #[serde(rename = "type")]
    pub action_type: String,

    pub description: String,
}

/// Terminal outcome of a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessOutcome {
    /// Act completed; the owning signal was marked resolved
    Resolved,

    /// Approval was rejected; the signal stays active for out-of-band handling
    Cancelled,
}

/// Invalid process operations.
#[derive(Debug, Clone, Error)]
pub enum ProcessError {
    #[error("stage {stage} cannot activate from {status:?}")]
    NotPending { stage: Stage, status: StageStatus },

    #[error("stage {stage} cannot activate before {blocking} is complete")]
    EarlierIncomplete { stage: Stage, blocking: Stage },

    #[error("stage {stage} cannot complete from {status:?}")]
    NotActive { stage: Stage, status: StageStatus },

    #[error("signal {signal_id} already owns an active process")]
    SignalOwned { signal_id: String },

    #[error("process {0} not found")]
    NotFound(Uuid),
}

/// The staged execution of one signal.
///
/// Findings and chain-of-thought are append-only: entries are never
/// rewritten once recorded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OodaProcess {
    pub id: Uuid,

    /// The signal this process owns for the duration of its run
    pub signal_id: String,

    pub observe_status: StageStatus,
    pub orient_status: StageStatus,
    pub decide_status: StageStatus,
    pub act_status: StageStatus,

    /// Descriptive findings collected at observe-complete
    #[serde(default)]
    pub observe_findings: Vec<String>,

    /// Contextual summary produced at orient-complete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orient_context: Option<String>,

    /// Ordered reasoning recorded at decide-complete
    #[serde(default)]
    pub decide_chain_of_thought: Vec<String>,

    /// Remedy proposed at decide-complete
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proposed_solution: Option<ProposedSolution>,

    /// Remediation steps recorded at act-complete
    #[serde(default)]
    pub actions_taken: Vec<ActionTaken>,

    /// Terminal outcome, once reached
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<ProcessOutcome>,

    /// Stall marker: a stage capability failed and the stage stays active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl OodaProcess {
    /// Create a process for a signal with all stages pending.
    pub fn new(signal_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            signal_id: signal_id.into(),
            observe_status: StageStatus::Pending,
            orient_status: StageStatus::Pending,
            decide_status: StageStatus::Pending,
            act_status: StageStatus::Pending,
            observe_findings: Vec::new(),
            orient_context: None,
            decide_chain_of_thought: Vec::new(),
            proposed_solution: None,
            actions_taken: Vec::new(),
            outcome: None,
            error: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn stage_status(&self, stage: Stage) -> StageStatus {
        match stage {
            Stage::Observe => self.observe_status,
            Stage::Orient => self.orient_status,
            Stage::Decide => self.decide_status,
            Stage::Act => self.act_status,
        }
    }

    fn set_stage_status(&mut self, stage: Stage, status: StageStatus) {
        match stage {
            Stage::Observe => self.observe_status = status,
            Stage::Orient => self.orient_status = status,
            Stage::Decide => self.decide_status = status,
            Stage::Act => self.act_status = status,
        }
    }

    /// Move a stage pending -> active.
    ///
    /// Fails unless the stage is pending and every earlier stage is
    /// complete; stage statuses never regress.
    pub fn activate(&mut self, stage: Stage) -> Result<(), ProcessError> {
        let status = self.stage_status(stage);
        if status != StageStatus::Pending {
            return Err(ProcessError::NotPending { stage, status });
        }

        for earlier in Stage::PIPELINE.iter().take_while(|s| **s != stage) {
            if self.stage_status(*earlier) != StageStatus::Complete {
                return Err(ProcessError::EarlierIncomplete {
                    stage,
                    blocking: *earlier,
                });
            }
        }

        self.set_stage_status(stage, StageStatus::Active);
        Ok(())
    }

    /// Move a stage active -> complete.
    pub fn complete(&mut self, stage: Stage) -> Result<(), ProcessError> {
        let status = self.stage_status(stage);
        if status != StageStatus::Active {
            return Err(ProcessError::NotActive { stage, status });
        }

        self.set_stage_status(stage, StageStatus::Complete);
        Ok(())
    }

    /// Whether the process has reached a terminal outcome and released
    /// its signal.
    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    /// Record the terminal outcome.
    pub fn finish(&mut self, outcome: ProcessOutcome) {
        self.outcome = Some(outcome);
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stages_start_pending() {
        let process = OodaProcess::new("sig_1");
        for stage in Stage::PIPELINE {
            assert_eq!(process.stage_status(stage), StageStatus::Pending);
        }
        assert!(!process.is_terminal());
    }

    #[test]
    fn test_activate_requires_earlier_complete() {
        let mut process = OodaProcess::new("sig_1");

        let result = process.activate(Stage::Act);
        assert!(matches!(
            result,
            Err(ProcessError::EarlierIncomplete {
                stage: Stage::Act,
                blocking: Stage::Observe,
            })
        ));
    }

    #[test]
    fn test_full_pipeline_order() {
        let mut process = OodaProcess::new("sig_1");

        for stage in Stage::PIPELINE {
            process.activate(stage).unwrap();
            process.complete(stage).unwrap();
        }

        assert_eq!(process.act_status, StageStatus::Complete);
    }

    #[test]
    fn test_no_regress_from_complete() {
        let mut process = OodaProcess::new("sig_1");
        process.activate(Stage::Observe).unwrap();
        process.complete(Stage::Observe).unwrap();

        let result = process.activate(Stage::Observe);
        assert!(matches!(
            result,
            Err(ProcessError::NotPending {
                stage: Stage::Observe,
                status: StageStatus::Complete,
            })
        ));
    }

    #[test]
    fn test_complete_requires_active() {
        let mut process = OodaProcess::new("sig_1");
        let result = process.complete(Stage::Observe);
        assert!(matches!(result, Err(ProcessError::NotActive { .. })));
    }

    #[test]
    fn test_stage_next_chain() {
        assert_eq!(Stage::Observe.next(), Some(Stage::Orient));
        assert_eq!(Stage::Decide.next(), Some(Stage::Act));
        assert_eq!(Stage::Act.next(), None);
    }
}
