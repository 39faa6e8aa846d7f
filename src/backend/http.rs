//! HTTP client for the backend contract.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use super::{Backend, SignalFilter};
use crate::domain::{
    Agent, Entity, HilDecision, HilRequest, Severity, Signal, SignalDraft, SignalStatus,
};

/// List responses arrive wrapped in a data envelope.
#[derive(Debug, Deserialize)]
struct ListEnvelope<T> {
    data: Vec<T>,
}

/// Render a serde enum as its bare wire token (e.g. `CRITICAL`).
fn wire_value<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_value(value)
        .ok()
        .and_then(|v| v.as_str().map(String::from))
        .unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct SimulationResponse {
    signal: Signal,
}

/// reqwest-based backend client.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBackend {
    /// Create a client against `base_url` (no trailing slash).
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}", self.base_url, path)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        Self::parse(response, url).await
    }

    async fn parse<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
        url: &str,
    ) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} returned {}: {}", url, status, body.trim());
        }

        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", url))
    }

    fn signal_query(filter: &SignalFilter) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("limit", filter.limit.to_string()),
            ("tier", filter.tiers.join(",")),
            ("phase", filter.phase.clone()),
            ("time_period", filter.time_period.clone()),
        ];

        if let Some(status) = filter.status {
            query.push(("status", wire_value(&status)));
        }
        if let Some(severity) = filter.severity {
            query.push(("severity", wire_value(&severity)));
        }

        query
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn list_signals(&self, filter: &SignalFilter) -> Result<Vec<Signal>> {
        let url = self.api_url("signals");
        let response = self
            .client
            .get(&url)
            .query(&Self::signal_query(filter))
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        let envelope: ListEnvelope<Signal> = Self::parse(response, &url).await?;
        Ok(envelope.data)
    }

    async fn list_agents(&self) -> Result<Vec<Agent>> {
        let envelope: ListEnvelope<Agent> = self.get_json(&self.api_url("agents")).await?;
        Ok(envelope.data)
    }

    async fn list_hil_requests(&self) -> Result<Vec<HilRequest>> {
        let url = format!("{}?status=pending", self.api_url("hil-requests"));
        let envelope: ListEnvelope<HilRequest> = self.get_json(&url).await?;
        Ok(envelope.data)
    }

    async fn list_entities(&self) -> Result<Vec<Entity>> {
        let envelope: ListEnvelope<Entity> = self.get_json(&self.api_url("merchants")).await?;
        Ok(envelope.data)
    }

    async fn create_signal(&self, draft: &SignalDraft) -> Result<Signal> {
        let url = self.api_url("signals");
        let response = self
            .client
            .post(&url)
            .json(draft)
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        Self::parse(response, &url).await
    }

    async fn update_signal_status(&self, signal_id: &str, status: SignalStatus) -> Result<Signal> {
        let url = self.api_url(&format!("signals/{}", signal_id));
        let response = self
            .client
            .put(&url)
            .json(&serde_json::json!({ "status": status }))
            .send()
            .await
            .with_context(|| format!("PUT {} failed", url))?;

        Self::parse(response, &url).await
    }

    async fn resolve_hil(
        &self,
        request_id: &str,
        decision: HilDecision,
        notes: Option<&str>,
    ) -> Result<HilRequest> {
        let url = self.api_url(&format!("hil-requests/{}/resolve", request_id));
        let action = match decision {
            HilDecision::Approve => "approved",
            HilDecision::Reject => "rejected",
        };

        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "action": action, "notes": notes }))
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        Self::parse(response, &url).await
    }

    async fn trigger_simulation(&self, scenario: &str, severity: Severity) -> Result<Signal> {
        let url = self.api_url("simulations/trigger");
        let response = self
            .client
            .post(&url)
            .json(&serde_json::json!({ "type": scenario, "severity": severity }))
            .send()
            .await
            .with_context(|| format!("POST {} failed", url))?;

        let parsed: SimulationResponse = Self::parse(response, &url).await?;
        Ok(parsed.signal)
    }

    async fn metrics(&self, filter: &SignalFilter) -> Result<serde_json::Value> {
        let url = self.api_url("system/metrics");
        let response = self
            .client
            .get(&url)
            .query(&Self::signal_query(filter))
            .send()
            .await
            .with_context(|| format!("GET {} failed", url))?;

        Self::parse(response, &url).await
    }

    async fn revenue_at_risk(&self, hours: u32) -> Result<serde_json::Value> {
        self.get_json(&format!(
            "{}?hours={}",
            self.api_url("analytics/revenue-at-risk"),
            hours
        ))
        .await
    }

    async fn resolution_stats(&self, days: u32) -> Result<serde_json::Value> {
        self.get_json(&format!(
            "{}?days={}",
            self.api_url("analytics/resolution-stats"),
            days
        ))
        .await
    }

    async fn friction_leaderboard(&self, limit: u32) -> Result<serde_json::Value> {
        self.get_json(&format!(
            "{}?limit={}",
            self.api_url("analytics/friction-leaderboard"),
            limit
        ))
        .await
    }

    async fn brief(&self) -> Result<serde_json::Value> {
        self.get_json(&self.api_url("brief")).await
    }

    async fn audit_log(&self, limit: u32) -> Result<serde_json::Value> {
        self.get_json(&format!("{}?limit={}", self.api_url("audit-log"), limit))
            .await
    }

    async fn health_check(&self) -> Result<()> {
        let _: serde_json::Value = self.get_json(&self.api_url("health")).await?;
        Ok(())
    }
}
