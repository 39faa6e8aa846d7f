//! Human-in-the-loop approval requests.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::process::{ProposedSolution, RiskLevel};

/// Resolution state of an approval request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HilStatus {
    Pending,
    Approved,
    Rejected,
}

/// Operator decision on a pending request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HilDecision {
    Approve,
    Reject,
}

/// Where the request was issued.
///
/// Locally registered gates resolve through the in-process gate;
/// backend-issued rows resolve through the HTTP endpoint. The tag is
/// explicit rather than inferred from id formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestOrigin {
    Local,
    Backend,
}

/// Impact estimates shown alongside a pending request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HilMetrics {
    /// Revenue at risk while the remedy waits, when estimated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revenue_at_risk: Option<u64>,

    /// Stability estimate 0-100, when estimated
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stability_index: Option<f32>,

    /// Confidence carried over from the proposed solution
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<u8>,
}

/// A pending approval gate instance.
///
/// Exactly one may be pending per process; resolution is terminal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HilRequest {
    pub id: String,

    /// Owning process; absent on rows issued by the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process_id: Option<Uuid>,

    pub signal_id: String,

    pub title: String,

    /// Mirror of the process's proposed solution
    pub proposed_action: ProposedSolution,

    pub risk_level: RiskLevel,

    #[serde(default)]
    pub metrics: HilMetrics,

    #[serde(default = "RequestOrigin::backend")]
    pub origin: RequestOrigin,

    pub created_at: DateTime<Utc>,

    #[serde(default = "HilStatus::pending")]
    pub status: HilStatus,
}

impl RequestOrigin {
    // serde default: rows deserialized off the wire are backend-issued
    fn backend() -> Self {
        Self::Backend
    }
}

impl HilStatus {
    fn pending() -> Self {
        Self::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_rows_default_to_backend_origin() {
        let json = r#"{
            "id": "hil_42",
            "signal_id": "sig_1",
            "title": "Approve High-Risk Fix: 404_SPIKE_DETECTED",
            "proposed_action": {
                "type": "schema_change",
                "description": "Recreate session mapping table",
                "confidence": 88,
                "risk_level": "high"
            },
            "risk_level": "high",
            "created_at": "2026-01-15T10:00:00Z"
        }"#;

        let request: HilRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.origin, RequestOrigin::Backend);
        assert_eq!(request.status, HilStatus::Pending);
        assert_eq!(request.process_id, None);
        assert_eq!(request.risk_level, RiskLevel::High);
    }
}
