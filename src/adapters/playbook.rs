//! Built-in rule-driven stage engine.
//!
//! Produces deterministic diagnostic text from the signal's own fields
//! and classifies risk against a configured list of high-impact signal
//! types. Stands in wherever no external reasoning service is wired up.

use anyhow::Result;
use async_trait::async_trait;
use glob::Pattern;

use super::{Decision, StageEngine};
use crate::domain::{ActionTaken, ProposedSolution, RiskLevel, Severity, Signal};

/// Risk classification policy.
///
/// A signal is high-risk when its severity is CRITICAL or its type
/// matches one of the high-impact glob patterns.
#[derive(Debug, Clone)]
pub struct RiskPolicy {
    high_impact_patterns: Vec<String>,
}

impl RiskPolicy {
    pub fn new(high_impact_patterns: Vec<String>) -> Self {
        Self {
            high_impact_patterns,
        }
    }

    /// Check a signal type against the high-impact patterns.
    pub fn is_high_impact(&self, signal_type: &str) -> bool {
        for pattern_str in &self.high_impact_patterns {
            if let Ok(pattern) = Pattern::new(pattern_str) {
                if pattern.matches(signal_type) {
                    return true;
                }
            }
        }
        false
    }

    /// Classify the risk of acting on a signal.
    pub fn classify(&self, signal: &Signal) -> RiskLevel {
        if signal.severity == Severity::Critical || self.is_high_impact(&signal.signal_type) {
            return RiskLevel::High;
        }
        match signal.severity {
            Severity::Error | Severity::Warn => RiskLevel::Medium,
            _ => RiskLevel::Low,
        }
    }
}

/// Deterministic stage engine driven by the risk policy.
pub struct PlaybookEngine {
    policy: RiskPolicy,
}

impl PlaybookEngine {
    pub fn new(policy: RiskPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl StageEngine for PlaybookEngine {
    fn name(&self) -> &str {
        "playbook"
    }

    async fn observe(&self, signal: &Signal) -> Result<Vec<String>> {
        let mut findings = vec![
            format!("Detected {:?} signal: {}", signal.severity, signal.signal_type),
            format!("Source: {}", signal.source),
        ];

        if let Some(endpoint) = &signal.endpoint {
            findings.push(format!("Endpoint affected: {}", endpoint));
        }
        findings.push("Correlating pattern against recent history".to_string());

        Ok(findings)
    }

    async fn orient(&self, signal: &Signal, _findings: &[String]) -> Result<String> {
        let context = if self.policy.classify(signal) == RiskLevel::High {
            format!(
                "{} points at data integrity on the critical path; intervention needed before the next traffic peak.",
                signal.signal_type
            )
        } else {
            format!(
                "{} indicates a degraded flow on {}; recoverable with a configuration-level correction.",
                signal.signal_type,
                signal.endpoint.as_deref().unwrap_or("an internal path")
            )
        };

        Ok(context)
    }

    async fn decide(&self, signal: &Signal, context: &str) -> Result<Decision> {
        let risk_level = self.policy.classify(signal);

        let mut chain_of_thought = vec![
            format!(
                "Abnormal pattern in responses from {}.",
                signal.endpoint.as_deref().unwrap_or("the gateway")
            ),
            format!("Working context: {}", context),
            format!("Root-cause candidate isolated from {} emissions.", signal.source),
        ];

        let solution = if risk_level == RiskLevel::High {
            chain_of_thought.push(
                "Remedy requires a destructive rebuild of the affected store.".to_string(),
            );
            chain_of_thought.push("Risk assessment: HIGH. Holding for operator approval.".to_string());

            ProposedSolution {
                solution_type: "schema_change".to_string(),
                description: "Quarantine and rebuild the affected session store".to_string(),
                confidence: 88,
                risk_level,
            }
        } else {
            chain_of_thought.push("Remedy is reversible at the configuration layer.".to_string());

            ProposedSolution {
                solution_type: "config_change".to_string(),
                description: "Tighten session mapping and re-sign legacy tokens".to_string(),
                confidence: 94,
                risk_level,
            }
        };

        Ok(Decision {
            chain_of_thought,
            solution,
        })
    }

    async fn act(&self, _signal: &Signal, solution: &ProposedSolution) -> Result<Vec<ActionTaken>> {
        let actions = if solution.solution_type == "schema_change" {
            vec![
                ActionTaken {
                    action_type: "schema_change".to_string(),
                    description: solution.description.clone(),
                },
                ActionTaken {
                    action_type: "verify".to_string(),
                    description: "Post-change integrity check passed".to_string(),
                },
            ]
        } else {
            vec![
                ActionTaken {
                    action_type: "config_update".to_string(),
                    description: solution.description.clone(),
                },
                ActionTaken {
                    action_type: "verify".to_string(),
                    description: "Affected endpoint returned to baseline".to_string(),
                },
            ]
        };

        Ok(actions)
    }
}
