//! Orchestrator: drives signals through the four-stage pipeline.
//!
//! Owns the process arena (processes addressable by id, independent of
//! any view), invokes the opaque stage engine, suspends at the gate for
//! high-risk remedies, and emits every stage transition in order on the
//! event channel and the journal.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::{broadcast, Mutex, RwLock};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::StageEngine;
use crate::backend::Backend;
use crate::domain::{
    HilDecision, OodaProcess, ProcessError, ProcessEvent, ProcessEventKind, ProcessOutcome,
    ProposedSolution, RiskLevel, Signal, SignalStatus, Stage,
};

use super::gate::HilGate;
use super::journal::ProcessJournal;
use super::notify::{NotificationCategory, NotificationEvent, NotificationQueue};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// The incident orchestration engine.
pub struct Orchestrator {
    engine: Arc<dyn StageEngine>,
    gate: Arc<HilGate>,
    notifications: Arc<Mutex<NotificationQueue>>,
    backend: Arc<dyn Backend>,

    /// Process arena, keyed by process id
    arena: RwLock<HashMap<Uuid, OodaProcess>>,

    /// Active process per signal; entries removed at terminal state
    owners: RwLock<HashMap<String, Uuid>>,

    events: broadcast::Sender<ProcessEvent>,

    /// Journal root directory; no journaling when unset
    journal_root: Option<PathBuf>,
}

impl Orchestrator {
    pub fn new(
        engine: Arc<dyn StageEngine>,
        gate: Arc<HilGate>,
        notifications: Arc<Mutex<NotificationQueue>>,
        backend: Arc<dyn Backend>,
        journal_root: Option<PathBuf>,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            engine,
            gate,
            notifications,
            backend,
            arena: RwLock::new(HashMap::new()),
            owners: RwLock::new(HashMap::new()),
            events,
            journal_root,
        }
    }

    /// Subscribe to stage-transition events.
    pub fn subscribe(&self) -> broadcast::Receiver<ProcessEvent> {
        self.events.subscribe()
    }

    /// Start a process for a signal and drive it in the background.
    ///
    /// Fails if the signal already owns an active process; a signal is
    /// owned from start until the process reaches a terminal state.
    pub async fn start(self: &Arc<Self>, signal: Signal) -> Result<Uuid, ProcessError> {
        let process = OodaProcess::new(signal.id.clone());
        let process_id = process.id;

        {
            let mut owners = self.owners.write().await;
            if owners.contains_key(&signal.id) {
                return Err(ProcessError::SignalOwned {
                    signal_id: signal.id,
                });
            }
            owners.insert(signal.id.clone(), process_id);
        }

        self.arena.write().await.insert(process_id, process);

        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            if let Err(e) = orchestrator.run_pipeline(process_id, signal).await {
                error!(%process_id, error = %e, "pipeline run failed");
            }
        });

        Ok(process_id)
    }

    /// Current state of one process.
    pub async fn process(&self, process_id: Uuid) -> Option<OodaProcess> {
        self.arena.read().await.get(&process_id).cloned()
    }

    /// All processes, newest first.
    pub async fn processes(&self) -> Vec<OodaProcess> {
        let mut processes: Vec<_> = self.arena.read().await.values().cloned().collect();
        processes.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        processes
    }

    /// Signals currently owned by an in-flight process.
    pub async fn in_flight_signal_ids(&self) -> HashSet<String> {
        self.owners.read().await.keys().cloned().collect()
    }

    #[instrument(skip(self, signal), fields(process = %process_id, signal = %signal.id))]
    async fn run_pipeline(&self, process_id: Uuid, signal: Signal) -> Result<()> {
        info!(signal_type = %signal.signal_type, "starting triage pipeline");

        let journal = match &self.journal_root {
            Some(root) => match ProcessJournal::open(root, process_id).await {
                Ok(journal) => Some(journal),
                Err(e) => {
                    warn!(error = %e, "journal unavailable, continuing without it");
                    None
                }
            },
            None => None,
        };

        self.emit(
            &journal,
            ProcessEvent::new(
                process_id,
                &signal.id,
                None,
                ProcessEventKind::ProcessStarted,
                format!("Triage started for {}", signal.signal_type),
            ),
        )
        .await;

        // Observe
        self.activate_stage(process_id, &signal, Stage::Observe, &journal)
            .await?;
        let findings = match self.engine.observe(&signal).await {
            Ok(findings) => findings,
            Err(e) => return self.stall(process_id, &signal, Stage::Observe, e, &journal).await,
        };
        self.with_process(process_id, |p| {
            p.observe_findings.extend(findings.iter().cloned());
            Ok(())
        })
        .await?;
        self.complete_stage(process_id, &signal, Stage::Observe, &journal)
            .await?;

        // Orient
        self.activate_stage(process_id, &signal, Stage::Orient, &journal)
            .await?;
        let context = match self.engine.orient(&signal, &findings).await {
            Ok(context) => context,
            Err(e) => return self.stall(process_id, &signal, Stage::Orient, e, &journal).await,
        };
        self.with_process(process_id, |p| {
            p.orient_context = Some(context.clone());
            Ok(())
        })
        .await?;
        self.complete_stage(process_id, &signal, Stage::Orient, &journal)
            .await?;

        // Decide
        self.activate_stage(process_id, &signal, Stage::Decide, &journal)
            .await?;
        let decision = match self.engine.decide(&signal, &context).await {
            Ok(decision) => decision,
            Err(e) => return self.stall(process_id, &signal, Stage::Decide, e, &journal).await,
        };
        let solution = decision.solution.clone();
        self.with_process(process_id, |p| {
            p.decide_chain_of_thought
                .extend(decision.chain_of_thought.iter().cloned());
            p.proposed_solution = Some(decision.solution);
            Ok(())
        })
        .await?;
        self.complete_stage(process_id, &signal, Stage::Decide, &journal)
            .await?;

        // High-risk remedies suspend at the gate; act stays pending.
        if solution.risk_level == RiskLevel::High {
            let (request, decision_rx) = self
                .gate
                .register(process_id, &signal, solution.clone())
                .await?;

            self.emit(
                &journal,
                ProcessEvent::new(
                    process_id,
                    &signal.id,
                    None,
                    ProcessEventKind::ApprovalRequested,
                    format!("Suspended for approval: {}", request.title),
                ),
            )
            .await;
            self.notify(
                NotificationCategory::Hil,
                format!("Approval needed: {}", signal.signal_type),
                &request.id,
            )
            .await;

            match decision_rx.await {
                Ok(HilDecision::Approve) => {
                    self.emit(
                        &journal,
                        ProcessEvent::new(
                            process_id,
                            &signal.id,
                            None,
                            ProcessEventKind::ApprovalGranted,
                            "Operator approved; resuming at act",
                        ),
                    )
                    .await;
                    self.run_act(process_id, &signal, &solution, &journal).await?;
                }
                Ok(HilDecision::Reject) => {
                    self.emit(
                        &journal,
                        ProcessEvent::new(
                            process_id,
                            &signal.id,
                            None,
                            ProcessEventKind::ApprovalDenied,
                            "Operator rejected; cancelling",
                        ),
                    )
                    .await;
                    self.finish(process_id, &signal, ProcessOutcome::Cancelled, &journal)
                        .await?;
                }
                Err(_) => {
                    // Gate dropped without a decision (shutdown); the
                    // process stays suspended in the arena.
                    warn!("gate closed before a decision arrived");
                }
            }

            return Ok(());
        }

        self.run_act(process_id, &signal, &solution, &journal).await
    }

    /// Execute the act stage and close out the process.
    async fn run_act(
        &self,
        process_id: Uuid,
        signal: &Signal,
        solution: &ProposedSolution,
        journal: &Option<ProcessJournal>,
    ) -> Result<()> {
        self.activate_stage(process_id, signal, Stage::Act, journal)
            .await?;

        let actions = match self.engine.act(signal, solution).await {
            Ok(actions) => actions,
            Err(e) => return self.stall(process_id, signal, Stage::Act, e, journal).await,
        };

        self.with_process(process_id, |p| {
            p.actions_taken.extend(actions.iter().cloned());
            Ok(())
        })
        .await?;
        self.complete_stage(process_id, signal, Stage::Act, journal)
            .await?;

        if let Err(e) = self
            .backend
            .update_signal_status(&signal.id, SignalStatus::Resolved)
            .await
        {
            // The next sync cycle reconciles; the process still counts
            // as resolved locally.
            warn!(error = %e, "failed to mark signal resolved upstream");
        }

        self.finish(process_id, signal, ProcessOutcome::Resolved, journal)
            .await
    }

    async fn finish(
        &self,
        process_id: Uuid,
        signal: &Signal,
        outcome: ProcessOutcome,
        journal: &Option<ProcessJournal>,
    ) -> Result<()> {
        self.with_process(process_id, |p| {
            p.finish(outcome);
            Ok(())
        })
        .await?;
        self.owners.write().await.remove(&signal.id);

        let (kind, detail) = match outcome {
            ProcessOutcome::Resolved => (
                ProcessEventKind::ProcessResolved,
                format!("Signal {} resolved", signal.id),
            ),
            ProcessOutcome::Cancelled => (
                ProcessEventKind::ProcessCancelled,
                format!("Signal {} left active for out-of-band handling", signal.id),
            ),
        };
        self.emit(
            journal,
            ProcessEvent::new(process_id, &signal.id, None, kind, detail),
        )
        .await;

        if outcome == ProcessOutcome::Resolved {
            self.notify(
                NotificationCategory::Info,
                format!("Remediation complete: {}", signal.signal_type),
                &process_id.to_string(),
            )
            .await;
        }

        Ok(())
    }

    /// Record a stage-step failure: the stage stays active, the error is
    /// recorded on the process, and the stall is surfaced to the
    /// operator. No retry.
    async fn stall(
        &self,
        process_id: Uuid,
        signal: &Signal,
        stage: Stage,
        cause: anyhow::Error,
        journal: &Option<ProcessJournal>,
    ) -> Result<()> {
        error!(%stage, error = %cause, "stage capability failed, process stalled");

        self.with_process(process_id, |p| {
            p.error = Some(cause.to_string());
            Ok(())
        })
        .await?;

        self.emit(
            journal,
            ProcessEvent::new(
                process_id,
                &signal.id,
                Some(stage),
                ProcessEventKind::StageStalled,
                format!("Stalled at {}", stage),
            )
            .with_error(cause.to_string()),
        )
        .await;

        self.notify(
            NotificationCategory::Critical,
            format!("Process stalled at {}: {}", stage, signal.signal_type),
            &process_id.to_string(),
        )
        .await;

        Ok(())
    }

    async fn activate_stage(
        &self,
        process_id: Uuid,
        signal: &Signal,
        stage: Stage,
        journal: &Option<ProcessJournal>,
    ) -> Result<()> {
        self.with_process(process_id, |p| p.activate(stage)).await?;
        self.emit(
            journal,
            ProcessEvent::new(
                process_id,
                &signal.id,
                Some(stage),
                ProcessEventKind::StageActivated,
                format!("{} active", stage),
            ),
        )
        .await;
        Ok(())
    }

    async fn complete_stage(
        &self,
        process_id: Uuid,
        signal: &Signal,
        stage: Stage,
        journal: &Option<ProcessJournal>,
    ) -> Result<()> {
        self.with_process(process_id, |p| p.complete(stage)).await?;
        self.emit(
            journal,
            ProcessEvent::new(
                process_id,
                &signal.id,
                Some(stage),
                ProcessEventKind::StageCompleted,
                format!("{} complete", stage),
            ),
        )
        .await;
        Ok(())
    }

    async fn with_process<F>(&self, process_id: Uuid, f: F) -> Result<(), ProcessError>
    where
        F: FnOnce(&mut OodaProcess) -> Result<(), ProcessError>,
    {
        let mut arena = self.arena.write().await;
        let process = arena
            .get_mut(&process_id)
            .ok_or(ProcessError::NotFound(process_id))?;
        f(process)
    }

    async fn emit(&self, journal: &Option<ProcessJournal>, event: ProcessEvent) {
        if let Some(journal) = journal {
            if let Err(e) = journal.append(&event).await {
                warn!(error = %e, "failed to journal process event");
            }
        }

        // No receivers is fine; the channel only serves live observers.
        let _ = self.events.send(event);
    }

    async fn notify(&self, category: NotificationCategory, title: String, source: &str) {
        self.notifications
            .lock()
            .await
            .push(NotificationEvent::new(category, title, source));
    }
}
