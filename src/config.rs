//! Console configuration.
//!
//! Configuration sources (highest priority first):
//! 1. Environment variables (TRIAGEDECK_HOME, TRIAGEDECK_BACKEND)
//! 2. Config file (.triagedeck/config.yaml, discovered by walking up
//!    from the current directory)
//! 3. Defaults (~/.triagedeck, local backend)
//!
//! The resolved config is an immutable struct handed to the console at
//! startup; nothing reads configuration ambiently after that.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::domain::{Severity, SignalDraft};

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigFile {
    pub version: String,
    #[serde(default)]
    pub home: Option<String>,
    #[serde(default)]
    pub backend: Option<BackendSection>,
    #[serde(default)]
    pub sync: Option<SyncSection>,
    #[serde(default)]
    pub risk: Option<RiskSection>,
    #[serde(default)]
    pub notifications: Option<NotificationsSection>,
    #[serde(default)]
    pub scenarios: Option<Vec<Scenario>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendSection {
    pub base_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SyncSection {
    pub interval_seconds: Option<u64>,
    pub page_limit: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RiskSection {
    pub high_impact_types: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationsSection {
    pub retain: Option<usize>,
}

/// A named injection scenario for demos and drills.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
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

impl Scenario {
    /// Build the ingestion payload for this scenario.
    pub fn draft(&self) -> SignalDraft {
        SignalDraft {
            signal_type: self.signal_type.clone(),
            severity: self.severity,
            source: self.source.clone(),
            endpoint: self.endpoint.clone(),
            entity_id: self.entity_id.clone(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Resolved, immutable console configuration.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    /// State directory (journals live under here)
    pub home: PathBuf,

    /// Backend base URL (no trailing slash)
    pub backend_url: String,

    /// Backend request timeout
    pub backend_timeout_seconds: u64,

    /// Refresh cadence for the synchronization loop
    pub sync_interval_seconds: u64,

    /// Page size for signal reads
    pub page_limit: usize,

    /// Glob patterns for signal types that force high-risk classification
    pub high_impact_types: Vec<String>,

    /// Maximum retained notifications
    pub notifications_retain: usize,

    /// Injection scenario catalog
    pub scenarios: Vec<Scenario>,

    /// Path to config file (if found)
    pub config_file: Option<PathBuf>,
}

fn default_backend_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_high_impact_types() -> Vec<String> {
    vec!["DB_SCHEMA_*".to_string(), "*_CORRUPTION".to_string()]
}

/// Built-in scenario catalog used when the config file defines none.
pub fn default_scenarios() -> Vec<Scenario> {
    vec![
        Scenario {
            signal_type: "404_SPIKE_DETECTED".to_string(),
            severity: Severity::Critical,
            source: "Shopify_webhook".to_string(),
            endpoint: Some("/api/v1/checkout/payment".to_string()),
            entity_id: None,
            metadata: serde_json::json!({ "error": "NOT_FOUND", "revenue_at_risk": 45000 }),
        },
        Scenario {
            signal_type: "STRIPE_LATENCY_HIGH".to_string(),
            severity: Severity::Warn,
            source: "PaymentGateway".to_string(),
            endpoint: Some("/api/v1/payments/process".to_string()),
            entity_id: None,
            metadata: serde_json::json!({ "latency": "847ms", "threshold": "200ms" }),
        },
        Scenario {
            signal_type: "TOKEN_INVALID".to_string(),
            severity: Severity::Error,
            source: "AuthService".to_string(),
            endpoint: Some("/api/v1/auth/verify".to_string()),
            entity_id: None,
            metadata: serde_json::json!({ "error": "JWT_EXPIRED" }),
        },
        Scenario {
            signal_type: "INVENTORY_SYNC_FAILED".to_string(),
            severity: Severity::Critical,
            source: "InventoryService".to_string(),
            endpoint: Some("/api/v1/inventory/sync".to_string()),
            entity_id: None,
            metadata: serde_json::json!({ "error": "DB_CONNECTION_LOST" }),
        },
        Scenario {
            signal_type: "CART_ABANDONMENT_SPIKE".to_string(),
            severity: Severity::Warn,
            source: "AnalyticsEngine".to_string(),
            endpoint: Some("/api/v1/cart/status".to_string()),
            entity_id: None,
            metadata: serde_json::json!({ "abandonment_rate": "34%", "baseline": "12%" }),
        },
        Scenario {
            signal_type: "DB_SCHEMA_CORRUPTION".to_string(),
            severity: Severity::Critical,
            source: "DatabaseGuard".to_string(),
            endpoint: Some("/internal/db/migration".to_string()),
            entity_id: None,
            metadata: serde_json::json!({ "error": "TABLE_MISMATCH", "table": "legacy_sessions" }),
        },
    ]
}

impl ConsoleConfig {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self> {
        let default_home = dirs::home_dir()
            .context("Failed to determine home directory")?
            .join(".triagedeck");

        let config_file = find_config_file();
        let file = match &config_file {
            Some(path) => Some(load_config_file(path)?),
            None => None,
        };

        let home = if let Ok(env_home) = std::env::var("TRIAGEDECK_HOME") {
            PathBuf::from(env_home)
        } else if let Some(home) = file.as_ref().and_then(|f| f.home.clone()) {
            let base = config_file
                .as_ref()
                .and_then(|p| p.parent())
                .unwrap_or(Path::new("."));
            resolve_path(base, &home)
        } else {
            default_home
        };

        let backend_url = if let Ok(env_url) = std::env::var("TRIAGEDECK_BACKEND") {
            env_url
        } else {
            file.as_ref()
                .and_then(|f| f.backend.as_ref())
                .and_then(|b| b.base_url.clone())
                .unwrap_or_else(default_backend_url)
        };

        let backend = file.as_ref().and_then(|f| f.backend.clone()).unwrap_or_default();
        let sync = file.as_ref().and_then(|f| f.sync.clone()).unwrap_or_default();
        let risk = file.as_ref().and_then(|f| f.risk.clone()).unwrap_or_default();
        let notifications = file
            .as_ref()
            .and_then(|f| f.notifications.clone())
            .unwrap_or_default();
        let scenarios = file
            .as_ref()
            .and_then(|f| f.scenarios.clone())
            .unwrap_or_else(default_scenarios);

        Ok(Self {
            home,
            backend_url: backend_url.trim_end_matches('/').to_string(),
            backend_timeout_seconds: backend.timeout_seconds.unwrap_or(10),
            sync_interval_seconds: sync.interval_seconds.unwrap_or(3),
            page_limit: sync.page_limit.unwrap_or(50),
            high_impact_types: risk
                .high_impact_types
                .unwrap_or_else(default_high_impact_types),
            notifications_retain: notifications.retain.unwrap_or(100),
            scenarios,
            config_file,
        })
    }

    /// Defaults rooted at an explicit home directory (used by tests and
    /// embedders that skip file discovery).
    pub fn with_home(home: PathBuf) -> Self {
        Self {
            home,
            backend_url: default_backend_url(),
            backend_timeout_seconds: 10,
            sync_interval_seconds: 3,
            page_limit: 50,
            high_impact_types: default_high_impact_types(),
            notifications_retain: 100,
            scenarios: default_scenarios(),
            config_file: None,
        }
    }

    /// Find a scenario by signal type.
    pub fn scenario(&self, signal_type: &str) -> Option<&Scenario> {
        self.scenarios
            .iter()
            .find(|s| s.signal_type.eq_ignore_ascii_case(signal_type))
    }
}

/// Find config file by searching current directory and parents
fn find_config_file() -> Option<PathBuf> {
    let mut current = std::env::current_dir().ok()?;

    loop {
        let config_path = current.join(".triagedeck").join("config.yaml");
        if config_path.exists() {
            return Some(config_path);
        }

        if !current.pop() {
            break;
        }
    }

    None
}

/// Load and parse config file
fn load_config_file(path: &Path) -> Result<ConfigFile> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    serde_yaml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))
}

/// Resolve a path that may be relative to the config file's directory
fn resolve_path(base: &Path, path_str: &str) -> PathBuf {
    let path = PathBuf::from(path_str);
    if path.is_absolute() {
        path
    } else {
        base.join(path)
            .canonicalize()
            .unwrap_or_else(|_| base.join(path_str))
    }
}
