//! Command-line interface for triagedeck.
//!
//! Provides commands for running the live console, injecting drill
//! scenarios, listing signals, resolving approval requests, and pulling
//! the reporting views.

use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use uuid::Uuid;

use crate::adapters::{PlaybookEngine, RiskPolicy, StageEngine};
use crate::backend::{Backend, HttpBackend, SignalFilter};
use crate::config::ConsoleConfig;
use crate::core::Console;
use crate::domain::{HilDecision, ProcessEventKind};

/// triagedeck - Incident-response console core
#[derive(Parser, Debug)]
#[command(name = "triagedeck")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the live console: sync loop plus event feed
    Watch,

    /// Inject a scenario signal and follow it through the pipeline
    Inject {
        /// Scenario signal type (defaults to the first catalog entry)
        #[arg(short, long)]
        scenario: Option<String>,

        /// What to do when the pipeline suspends for approval
        #[arg(short, long, value_enum, default_value = "ask")]
        decision: DecisionMode,
    },

    /// Trigger a named simulation on the backend and follow the result
    Simulate {
        /// Scenario signal type (e.g. "404_SPIKE_DETECTED")
        scenario: String,

        #[arg(short, long, value_enum, default_value = "ask")]
        decision: DecisionMode,
    },

    /// List signals from the backend
    Signals {
        /// Maximum number of signals to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Lifecycle phase filter
        #[arg(long, default_value = "all")]
        phase: String,

        /// Time window filter
        #[arg(long, default_value = "24h")]
        time_period: String,
    },

    /// Resolve an approval request on the backend
    Resolve {
        /// Request id
        request_id: String,

        /// approve or reject
        #[arg(short, long, value_enum)]
        action: ResolveAction,

        /// Optional operator notes
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Print the executive brief
    Brief,

    /// Print the audit log tail
    Audit {
        #[arg(short, long, default_value = "50")]
        limit: u32,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Behavior at the approval gate when following a pipeline.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum DecisionMode {
    /// Prompt on stdin
    Ask,

    /// Approve automatically
    Approve,

    /// Reject automatically
    Reject,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ResolveAction {
    Approve,
    Reject,
}

impl From<ResolveAction> for HilDecision {
    fn from(action: ResolveAction) -> Self {
        match action {
            ResolveAction::Approve => HilDecision::Approve,
            ResolveAction::Reject => HilDecision::Reject,
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Watch => watch().await,
            Commands::Inject { scenario, decision } => inject(scenario, decision).await,
            Commands::Simulate { scenario, decision } => simulate(&scenario, decision).await,
            Commands::Signals {
                limit,
                phase,
                time_period,
            } => list_signals(limit, phase, time_period).await,
            Commands::Resolve {
                request_id,
                action,
                notes,
            } => resolve(&request_id, action, notes).await,
            Commands::Brief => brief().await,
            Commands::Audit { limit } => audit(limit).await,
            Commands::Config => show_config(),
        }
    }
}

/// Build the console from the resolved configuration.
fn build_console() -> Result<Console> {
    let config = ConsoleConfig::load()?;

    let backend: Arc<dyn Backend> = Arc::new(HttpBackend::new(
        config.backend_url.clone(),
        Duration::from_secs(config.backend_timeout_seconds),
    )?);
    let engine: Arc<dyn StageEngine> = Arc::new(PlaybookEngine::new(RiskPolicy::new(
        config.high_impact_types.clone(),
    )));

    Ok(Console::new(config, backend, engine))
}

fn build_backend() -> Result<(ConsoleConfig, HttpBackend)> {
    let config = ConsoleConfig::load()?;
    let backend = HttpBackend::new(
        config.backend_url.clone(),
        Duration::from_secs(config.backend_timeout_seconds),
    )?;
    Ok((config, backend))
}

/// Run the sync loop and print events and periodic summaries until
/// interrupted.
async fn watch() -> Result<()> {
    let console = build_console()?;
    let mut events = console.subscribe_events();
    let _sync = console.spawn_sync();

    println!("Watching {} (Ctrl-C to exit)", console.config().backend_url);

    let mut summary = tokio::time::interval(Duration::from_secs(5));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!("\nbye");
                return Ok(());
            }
            event = events.recv() => {
                if let Ok(event) = event {
                    let stage = event.stage.map(|s| s.to_string()).unwrap_or_default();
                    println!("[{}] {:24} {:8} {}", event.timestamp.format("%H:%M:%S"), format!("{:?}", event.kind), stage, event.detail);
                }
            }
            _ = summary.tick() => {
                let snapshot = console.snapshot().await;
                let critical: Vec<_> = snapshot
                    .entity_tiers
                    .iter()
                    .filter(|(_, tier)| **tier == crate::domain::Tier::Critical)
                    .map(|(id, _)| id.as_str())
                    .collect();

                println!(
                    "-- {} signals | {} agents | {} pending approvals | {} unread | critical entities: {}",
                    snapshot.signals.len(),
                    snapshot.agents.len(),
                    snapshot.hil_requests.len(),
                    console.unread_notifications().await,
                    if critical.is_empty() { "none".to_string() } else { critical.join(", ") },
                );
            }
        }
    }
}

/// Inject a scenario signal and follow its pipeline to a terminal state.
async fn inject(scenario: Option<String>, decision: DecisionMode) -> Result<()> {
    let console = build_console()?;

    let scenario = match scenario {
        Some(name) => console
            .config()
            .scenario(&name)
            .with_context(|| format!("Unknown scenario '{}'", name))?
            .clone(),
        None => console
            .config()
            .scenarios
            .first()
            .context("Scenario catalog is empty")?
            .clone(),
    };

    let mut events = console.subscribe_events();
    let (signal, process_id) = console.inject_signal(scenario.draft()).await?;

    println!(
        "Injected {} ({:?}) as signal {}",
        signal.signal_type, signal.severity, signal.id
    );

    follow_process(&console, process_id, decision, &mut events).await
}

/// Trigger a backend simulation and follow its pipeline.
async fn simulate(scenario: &str, decision: DecisionMode) -> Result<()> {
    let console = build_console()?;

    let mut events = console.subscribe_events();
    let (signal, process_id) = console.trigger_simulation(scenario).await?;

    println!("Simulation synthesized signal {} ({})", signal.id, signal.signal_type);

    follow_process(&console, process_id, decision, &mut events).await
}

/// Print the event stream for one process until it resolves, cancels,
/// or stalls; answer the gate according to the decision mode.
async fn follow_process(
    console: &Console,
    process_id: Uuid,
    decision: DecisionMode,
    events: &mut tokio::sync::broadcast::Receiver<crate::domain::ProcessEvent>,
) -> Result<()> {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
            Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
        };

        if event.process_id != process_id {
            continue;
        }

        match event.stage {
            Some(stage) => println!("  {:8} {}", stage.to_string(), event.detail),
            None => println!("  {}", event.detail),
        }
        if let Some(error) = &event.error {
            println!("  error: {}", error);
        }

        match event.kind {
            ProcessEventKind::ApprovalRequested => {
                let request_id = console
                    .snapshot()
                    .await
                    .hil_requests
                    .iter()
                    .find(|r| r.process_id == Some(process_id))
                    .map(|r| r.id.clone())
                    .context("Approval requested but no pending request found")?;

                let approve = match decision {
                    DecisionMode::Approve => true,
                    DecisionMode::Reject => false,
                    DecisionMode::Ask => prompt_yes_no("Approve high-risk remedy? [y/N] ")?,
                };

                if approve {
                    console.approve_hil(&request_id).await?;
                } else {
                    console.reject_hil(&request_id).await?;
                }
            }
            ProcessEventKind::ProcessResolved
            | ProcessEventKind::ProcessCancelled
            | ProcessEventKind::StageStalled => break,
            _ => {}
        }
    }

    Ok(())
}

fn prompt_yes_no(prompt: &str) -> Result<bool> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read stdin")?;

    Ok(matches!(line.trim().to_lowercase().as_str(), "y" | "yes"))
}

async fn list_signals(limit: usize, phase: String, time_period: String) -> Result<()> {
    let (_, backend) = build_backend()?;

    let filter = SignalFilter {
        limit,
        phase,
        time_period,
        ..Default::default()
    };

    let signals = backend.list_signals(&filter).await?;
    if signals.is_empty() {
        println!("No signals match the current filters");
        return Ok(());
    }

    for signal in signals {
        println!(
            "{:10} {:8?} {:28} {:20} {:?}",
            signal.id, signal.severity, signal.signal_type, signal.source, signal.status
        );
    }

    Ok(())
}

async fn resolve(request_id: &str, action: ResolveAction, notes: Option<String>) -> Result<()> {
    let (_, backend) = build_backend()?;

    let resolved = backend
        .resolve_hil(request_id, action.into(), notes.as_deref())
        .await?;

    println!("Request {} is now {:?}", resolved.id, resolved.status);
    Ok(())
}

async fn brief() -> Result<()> {
    let (_, backend) = build_backend()?;
    let brief = backend.brief().await?;
    println!("{}", serde_json::to_string_pretty(&brief)?);
    Ok(())
}

async fn audit(limit: u32) -> Result<()> {
    let (_, backend) = build_backend()?;
    let log = backend.audit_log(limit).await?;
    println!("{}", serde_json::to_string_pretty(&log)?);
    Ok(())
}

fn show_config() -> Result<()> {
    let config = ConsoleConfig::load()?;
    println!("{:#?}", config);
    Ok(())
}
