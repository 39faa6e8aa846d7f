//! Signal types: observed anomalies entering the console.
//!
//! A Signal is immutable after ingestion except for its status, which
//! moves active -> resolved exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Severity levels as emitted by upstream monitors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    Error,
    Warn,
    Info,
    System,
}

impl Severity {
    /// All severities accepted at ingestion.
    pub const ALL: [Severity; 5] = [
        Severity::Critical,
        Severity::Error,
        Severity::Warn,
        Severity::Info,
        Severity::System,
    ];
}

/// Lifecycle status of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalStatus {
    /// Requires triage; visible in active views.
    Active,

    /// Handled; filtered from active views, never deleted.
    Resolved,
}

impl Default for SignalStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// An observed anomaly requiring triage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Unique identifier assigned at ingestion
    pub id: String,

    /// Category tag (e.g. "404_SPIKE_DETECTED")
    #[serde(rename = "type")]
    pub signal_type: String,

    /// Severity as reported by the emitting monitor
    pub severity: Severity,

    /// System that emitted the signal
    pub source: String,

    /// Affected endpoint, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Named entity the signal is attributed to, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    /// Open key/value bag from the emitter
    #[serde(default)]
    pub metadata: serde_json::Value,

    /// Lifecycle status
    #[serde(default)]
    pub status: SignalStatus,

    /// When the signal was ingested
    pub created_at: DateTime<Utc>,
}

impl Signal {
    /// Check whether the signal still requires triage.
    pub fn is_active(&self) -> bool {
        self.status == SignalStatus::Active
    }
}

/// Payload for creating a signal (ingestion or synthetic injection).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalDraft {
    #[serde(rename = "type")]
    pub signal_type: String,

    pub severity: Severity,

    pub source: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_id: Option<String>,

    #[serde(default)]
    pub metadata: serde_json::Value,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_wire_format() {
        let json = serde_json::to_string(&Severity::Critical).unwrap();
        assert_eq!(json, "\"CRITICAL\"");

        let parsed: Severity = serde_json::from_str("\"WARN\"").unwrap();
        assert_eq!(parsed, Severity::Warn);
    }

    #[test]
    fn test_signal_defaults_to_active() {
        let json = r#"{
            "id": "sig_1",
            "type": "TOKEN_INVALID",
            "severity": "ERROR",
            "source": "AuthService",
            "created_at": "2026-01-15T10:00:00Z"
        }"#;

        let signal: Signal = serde_json::from_str(json).unwrap();
        assert!(signal.is_active());
        assert_eq!(signal.endpoint, None);
        assert!(signal.metadata.is_null());
    }
}
