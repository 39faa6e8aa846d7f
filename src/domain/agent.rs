//! Remote agent records, read from the backend during sync.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    Idle,
    Processing,
}

/// An automated worker as the backend reports it. The console never
/// mutates agents; they exist so the snapshot can show which signal an
/// agent is working.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: String,

    pub name: String,

    #[serde(rename = "type")]
    pub agent_type: String,

    pub status: AgentStatus,

    /// Signal currently being processed, when status is processing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task_signal_id: Option<String>,

    /// Stage the agent reports being in, when processing
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_task_stage: Option<String>,
}

impl Agent {
    pub fn is_processing(&self) -> bool {
        self.status == AgentStatus::Processing
    }
}
