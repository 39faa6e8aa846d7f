//! Domain types for the incident-response console.

pub mod agent;
pub mod entity;
pub mod events;
pub mod hil;
pub mod process;
pub mod signal;

pub use agent::{Agent, AgentStatus};
pub use entity::{Entity, Tier};
pub use events::{ProcessEvent, ProcessEventKind};
pub use hil::{HilDecision, HilMetrics, HilRequest, HilStatus, RequestOrigin};
pub use process::{
    ActionTaken, OodaProcess, ProcessError, ProcessOutcome, ProposedSolution, RiskLevel, Stage,
    StageStatus,
};
pub use signal::{Severity, Signal, SignalDraft, SignalStatus};
