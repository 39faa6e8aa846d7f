//! Process events: the observable record of stage transitions.
//!
//! Every transition a process makes is emitted as an event, in exact
//! per-process order (pending -> active -> complete per stage, stages in
//! pipeline order). Events feed the live broadcast channel and the
//! append-only journal.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::process::Stage;

/// A single observation in a process's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessEvent {
    /// Unique identifier for this event
    pub id: Uuid,

    /// When this event occurred
    pub timestamp: DateTime<Utc>,

    /// The process this event belongs to
    pub process_id: Uuid,

    /// The signal the process owns
    pub signal_id: String,

    /// Stage concerned, when applicable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,

    /// Type of event
    pub kind: ProcessEventKind,

    /// Human-readable summary
    pub detail: String,

    /// Error message for stalled stages
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessEvent {
    /// Create a new event with the current timestamp.
    pub fn new(
        process_id: Uuid,
        signal_id: &str,
        stage: Option<Stage>,
        kind: ProcessEventKind,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            process_id,
            signal_id: signal_id.to_string(),
            stage,
            kind,
            detail: detail.into(),
            error: None,
        }
    }

    /// Attach an error message.
    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }
}

/// Types of events a process can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessEventKind {
    /// A process was created for a signal
    ProcessStarted,

    /// A stage moved pending -> active
    StageActivated,

    /// A stage moved active -> complete
    StageCompleted,

    /// A stage capability failed; the stage stays active
    StageStalled,

    /// A high-risk remedy was registered at the gate
    ApprovalRequested,

    /// The operator approved; the process resumes at act
    ApprovalGranted,

    /// The operator rejected; the process is cancelled
    ApprovalDenied,

    /// Act completed and the signal was marked resolved
    ProcessResolved,

    /// The process ended without resolving its signal
    ProcessCancelled,
}
