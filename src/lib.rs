//! triagedeck - Incident-response console core
//!
//! Signals describing platform anomalies enter the console, an
//! orchestration engine drives each one through a four-stage
//! Observe-Orient-Decide-Act pipeline, and high-risk remedies pause at
//! a human approval gate before anything is executed.
//!
//! # Architecture
//!
//! - Each signal is triaged by its own process, held in an arena keyed
//!   by process id; stage transitions are strictly ordered per process
//!   and every transition is observable as an event
//! - High-risk decisions suspend at the gate and resume (or cancel) on
//!   an explicit operator decision delivered over a channel
//! - A fixed-cadence synchronization loop reconciles the local snapshot
//!   against the backend without clobbering in-flight processes
//!
//! # Modules
//!
//! - `adapters`: opaque stage capabilities (diagnosis and remediation)
//! - `backend`: the HTTP-shaped source-of-truth contract
//! - `core`: orchestrator, gate, severity reducer, sync loop, journal
//! - `domain`: data structures (Signal, OodaProcess, HilRequest, ...)
//! - `cli`: command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Live console against a local backend
//! triagedeck watch
//!
//! # Inject a drill scenario and follow it through the pipeline
//! triagedeck inject --scenario DB_SCHEMA_CORRUPTION
//! ```

pub mod adapters;
pub mod backend;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use crate::backend::{Backend, HttpBackend, SignalFilter};
pub use crate::config::{ConsoleConfig, Scenario};
pub use crate::core::{Console, HilGate, Orchestrator, Snapshot};
pub use crate::domain::{
    HilDecision, HilRequest, OodaProcess, ProcessEvent, ProcessEventKind, Severity, Signal,
    SignalDraft, Stage, StageStatus, Tier,
};
