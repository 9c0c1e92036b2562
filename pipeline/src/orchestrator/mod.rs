//! Pipeline Orchestrator
//!
//! Sequences every stage of one candidate evaluation:
//!
//! ```text
//! INIT → PARSING (job ∥ resume) → INTERSECTION → DEBATE (≤ 6 turns) → DECISION → COMPLETE
//!                                                   │
//!                                                   └─ breaker open → ABORTED
//! any waiting phase ── deadline ──► TIMED_OUT
//! ```
//!
//! Stage calls run on spawned tasks so the deadline can be honoured even
//! when a call never returns; on expiry the orchestrator stops waiting and
//! detaches the task. Every run yields a [`FinalResult`], degraded or not.

pub mod config;
pub mod state;

use std::future::Future;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinError;
use tokio::time::{sleep_until, timeout_at, Instant};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::debate::{DebateEngine, NextTurn};
use crate::events::{
    NoopNotifier, ProgressEvent, ProgressNotifier, ProgressStage, ProgressTag, SYSTEM_ROLE,
};
use crate::persistence::{self, EvaluationStore, PersistReceipt, PersistenceError};
use crate::resilience::BreakerState;
use crate::result::{FinalResult, ResultAssembler};
use crate::stage::{
    fallback, Decision, DebateRequest, DecisionRequest, LanguageModel, Position, StageExecutor,
    StageFailure, StageKind, StageResult,
};

pub use config::PipelineConfig;
pub use state::{
    DecisionError, IllegalTransition, PipelinePhase, PipelineState, StateError, TransitionRecord,
};

/// Failure surfaced by [`Orchestrator::run_and_persist`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Storage failed after the decision pipeline finished. The result is intact.
    #[error("failed to persist evaluation: {source}")]
    Persistence {
        result: Box<FinalResult>,
        #[source]
        source: PersistenceError,
    },
}

impl PipelineError {
    /// The already-computed result carried by the error.
    pub fn result(&self) -> &FinalResult {
        match self {
            Self::Persistence { result, .. } => result,
        }
    }
}

/// Why the run stopped before `COMPLETE`.
enum Halt {
    Deadline(StageKind),
    Broken(StateError),
}

impl From<StateError> for Halt {
    fn from(e: StateError) -> Self {
        Self::Broken(e)
    }
}

impl From<IllegalTransition> for Halt {
    fn from(e: IllegalTransition) -> Self {
        Self::Broken(e.into())
    }
}

/// Inputs of one evaluation.
struct RunInputs<'a> {
    resume_text: &'a str,
    job_description: &'a str,
}

/// Drives one pipeline run per call. Holds no per-run state, so one
/// orchestrator can serve many concurrent runs.
#[derive(Clone)]
pub struct Orchestrator {
    executor: StageExecutor,
    notifier: Arc<dyn ProgressNotifier>,
    engine: DebateEngine,
    config: PipelineConfig,
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("executor", &self.executor)
            .field("config", &self.config)
            .finish()
    }
}

impl Orchestrator {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            executor: StageExecutor::new(model),
            notifier: Arc::new(NoopNotifier),
            engine: DebateEngine::new(),
            config: PipelineConfig::default(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn ProgressNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Evaluate one candidate. Never fails: degraded runs return a
    /// zero-confidence `no_hire` result.
    pub async fn run(
        &self,
        resume_text: &str,
        job_description: &str,
        candidate_name: &str,
        job_title: &str,
    ) -> FinalResult {
        let state = self
            .evaluate(resume_text, job_description, candidate_name, job_title)
            .await;
        ResultAssembler::assemble(&state)
    }

    /// [`run`](Self::run), then hand the result to `store`.
    pub async fn run_and_persist(
        &self,
        resume_text: &str,
        job_description: &str,
        candidate_name: &str,
        job_title: &str,
        store: &dyn EvaluationStore,
    ) -> Result<(FinalResult, PersistReceipt), PipelineError> {
        let result = self
            .run(resume_text, job_description, candidate_name, job_title)
            .await;
        match persistence::persist(store, &result).await {
            Ok(receipt) => Ok((result, receipt)),
            Err(source) => {
                error!(run_id = %result.run_id, error = %source, "Persisting evaluation failed");
                Err(PipelineError::Persistence {
                    result: Box::new(result),
                    source,
                })
            }
        }
    }

    /// Run the state machine to a terminal phase and return the state.
    pub async fn evaluate(
        &self,
        resume_text: &str,
        job_description: &str,
        candidate_name: &str,
        job_title: &str,
    ) -> PipelineState {
        let run_id = Uuid::new_v4();
        let deadline = self.config.deadline_from(Instant::now());
        let mut state = PipelineState::new(
            run_id,
            candidate_name,
            job_title,
            self.config.breaker_threshold,
        );

        info!(%run_id, candidate = candidate_name, job_title, "Starting evaluation");
        self.emit(
            run_id,
            SYSTEM_ROLE,
            format!("Starting evaluation of {} for {}", candidate_name, job_title),
            ProgressStage::Initialization,
            ProgressTag::Info,
        );

        let inputs = RunInputs {
            resume_text,
            job_description,
        };
        match self.drive(&mut state, &inputs, deadline).await {
            Ok(()) => {}
            Err(Halt::Deadline(stage)) => self.time_out(&mut state, stage),
            Err(Halt::Broken(e)) => {
                error!(%run_id, error = %e, "Pipeline invariant violated");
                self.abort(
                    &mut state,
                    format!("Pipeline invariant violated: {}", e),
                    "Internal error",
                );
            }
        }

        info!(
            %run_id,
            phase = %state.phase(),
            fallbacks = state.fallbacks_used(),
            elapsed_ms = state.elapsed_ms(),
            "Evaluation finished"
        );
        state
    }

    async fn drive(
        &self,
        state: &mut PipelineState,
        inputs: &RunInputs<'_>,
        deadline: Instant,
    ) -> Result<(), Halt> {
        self.parse(state, inputs, deadline).await?;
        self.intersect(state, deadline).await?;
        if !self.debate(state, deadline).await? {
            return Ok(());
        }
        self.decide(state, deadline).await
    }

    /// PARSING: job and resume concurrently; both must land before moving on.
    async fn parse(
        &self,
        state: &mut PipelineState,
        inputs: &RunInputs<'_>,
        deadline: Instant,
    ) -> Result<(), Halt> {
        state.advance(PipelinePhase::Parsing, None)?;
        let run_id = state.run_id();
        self.emit(
            run_id,
            SYSTEM_ROLE,
            "Parsing job description and resume",
            ProgressStage::Parsing,
            ProgressTag::Info,
        );
        if Instant::now() >= deadline {
            return Err(Halt::Deadline(StageKind::JobParse));
        }

        let job_title = state.job_title().to_string();
        let candidate = state.candidate_name().to_string();

        let mut job_task = {
            let exec = self.executor.clone();
            let title = job_title.clone();
            let description = inputs.job_description.to_string();
            tokio::spawn(async move { exec.parse_job(&title, &description).await })
        };
        let mut resume_task = {
            let exec = self.executor.clone();
            let name = candidate.clone();
            let text = inputs.resume_text.to_string();
            tokio::spawn(async move { exec.parse_resume(&name, &text).await })
        };

        let expiry = sleep_until(deadline);
        tokio::pin!(expiry);
        let (mut job_done, mut resume_done) = (false, false);

        while !(job_done && resume_done) {
            tokio::select! {
                joined = &mut job_task, if !job_done => {
                    job_done = true;
                    let result = settle(joined, StageKind::JobParse, || fallback::job(&job_title));
                    let message = format!(
                        "{} required skills, {} level",
                        result.data.required_skills.len(),
                        result.data.experience_level
                    );
                    let used_fallback = result.used_fallback;
                    state.record_job(result)?;
                    self.emit_stage(run_id, StageKind::JobParse, message, used_fallback);
                }
                joined = &mut resume_task, if !resume_done => {
                    resume_done = true;
                    let result = settle(joined, StageKind::ResumeParse, || fallback::resume(&candidate));
                    let message = format!(
                        "{} years experience, {} level, {} skills identified",
                        result.data.experience_years,
                        result.data.experience_level,
                        result.data.skills.len()
                    );
                    let used_fallback = result.used_fallback;
                    state.record_resume(result)?;
                    self.emit_stage(run_id, StageKind::ResumeParse, message, used_fallback);
                }
                _ = &mut expiry => {
                    let pending = if !job_done { StageKind::JobParse } else { StageKind::ResumeParse };
                    return Err(Halt::Deadline(pending));
                }
            }
        }

        state.advance(PipelinePhase::Intersection, None)?;
        Ok(())
    }

    /// INTERSECTION: one call combining both analyses.
    async fn intersect(&self, state: &mut PipelineState, deadline: Instant) -> Result<(), Halt> {
        let run_id = state.run_id();
        let (job, resume) = match (state.job(), state.resume()) {
            (Some(job), Some(resume)) => (job.clone(), resume.clone()),
            _ => {
                return Err(StateError::MissingInput {
                    stage: StageKind::Intersection,
                    missing: "parsed analyses",
                }
                .into())
            }
        };
        self.emit(
            run_id,
            StageKind::Intersection.agent_name(),
            "Evaluating fit between job requirements and candidate profile",
            ProgressStage::Intersection,
            ProgressTag::Info,
        );

        let exec = self.executor.clone();
        let result = call_stage(
            deadline,
            StageKind::Intersection,
            async move { exec.intersect(&job, &resume).await },
            fallback::intersection,
        )
        .await?;

        let message = format!(
            "Compatibility {:.0}%, experience match {}",
            result.data.overall_compatibility * 100.0,
            result.data.experience_match
        );
        let used_fallback = result.used_fallback;
        state.record_intersection(result)?;
        self.emit_stage(run_id, StageKind::Intersection, message, used_fallback);

        state.advance(PipelinePhase::Debate, None)?;
        Ok(())
    }

    /// DEBATE: alternate sides until the engine says stop or the breaker
    /// opens. Returns `false` when the run was aborted.
    async fn debate(&self, state: &mut PipelineState, deadline: Instant) -> Result<bool, Halt> {
        let run_id = state.run_id();
        let intersection = state.intersection().cloned().ok_or(StateError::MissingInput {
            stage: StageKind::DebateTurn,
            missing: "intersection analysis",
        })?;
        self.emit(
            run_id,
            SYSTEM_ROLE,
            "Starting pro/anti debate",
            ProgressStage::Debate,
            ProgressTag::Info,
        );

        while let NextTurn::Turn(plan) = self.engine.next_turn(state.transcript()) {
            let side = plan.side;
            let round = plan.round;
            let request = DebateRequest {
                position: side,
                round,
                previous_argument: plan.previous_argument,
                intersection: intersection.clone(),
            };

            let exec = self.executor.clone();
            let result = call_stage(
                deadline,
                StageKind::DebateTurn,
                async move { exec.debate_turn(&request).await },
                move || fallback::debate_turn(side, round),
            )
            .await?;

            let used_fallback = result.used_fallback;
            let argument = result.data.argument.clone();
            let breaker = state.record_turn(result)?;
            tracing::debug!(%run_id, side = %side, round, used_fallback, "Debate turn recorded");
            self.emit(
                run_id,
                side.agent_name(),
                format!("Round {}: {}", round, argument),
                ProgressStage::Debate,
                side_tag(side),
            );

            if breaker == BreakerState::Open {
                let stats = state.breaker();
                let failures = stats.failures();
                warn!(
                    %run_id,
                    failures,
                    threshold = stats.threshold(),
                    failure_rate = stats.failure_rate(),
                    "Circuit breaker open, aborting"
                );
                let reason = format!(
                    "Aborted after {} failed debate turns: the language model is unavailable or returning unusable output",
                    failures
                );
                self.abort(state, reason, "Circuit breaker tripped");
                return Ok(false);
            }
        }

        state.finish_debate()?;
        Ok(true)
    }

    /// DECISION: one call, then COMPLETE.
    async fn decide(&self, state: &mut PipelineState, deadline: Instant) -> Result<(), Halt> {
        let run_id = state.run_id();
        let intersection = state.intersection().cloned().ok_or(StateError::MissingInput {
            stage: StageKind::Decision,
            missing: "intersection analysis",
        })?;
        let request = DecisionRequest {
            pro_arguments: state.transcript().side(Position::Pro),
            anti_arguments: state.transcript().side(Position::Anti),
            intersection,
            candidate_name: state.candidate_name().to_string(),
            job_title: state.job_title().to_string(),
        };
        self.emit(
            run_id,
            StageKind::Decision.agent_name(),
            "Weighing the debate",
            ProgressStage::Decision,
            ProgressTag::Info,
        );

        let exec = self.executor.clone();
        let result = call_stage(
            deadline,
            StageKind::Decision,
            async move { exec.decide(&request).await },
            fallback::decision,
        )
        .await?;

        if result.used_fallback {
            warn!(%run_id, "Decision stage fell back");
        }
        let message = format!(
            "Decision: {} ({:.0}% confidence)",
            result.data.outcome.as_record_label(),
            result.data.score_percent()
        );
        state.record_decision(result)?;
        self.emit(
            run_id,
            StageKind::Decision.agent_name(),
            message,
            ProgressStage::Decision,
            ProgressTag::Decision,
        );

        state.advance(PipelinePhase::Complete, None)?;
        self.emit(
            run_id,
            SYSTEM_ROLE,
            "Evaluation complete",
            ProgressStage::Completed,
            ProgressTag::Info,
        );
        Ok(())
    }

    fn abort(&self, state: &mut PipelineState, reason: String, factor: &str) {
        let decision = Decision::degraded(reason.clone(), factor);
        self.terminate(state, PipelinePhase::Aborted, decision, reason);
    }

    fn time_out(&self, state: &mut PipelineState, waiting_on: StageKind) {
        let reason = format!(
            "Timed out after {}s waiting on {}",
            self.config.deadline_secs, waiting_on
        );
        warn!(run_id = %state.run_id(), stage = %waiting_on, "Deadline exceeded");
        let decision = Decision::degraded(reason.clone(), "Deadline exceeded");
        self.terminate(state, PipelinePhase::TimedOut, decision, reason);
    }

    fn terminate(
        &self,
        state: &mut PipelineState,
        phase: PipelinePhase,
        decision: Decision,
        reason: String,
    ) {
        if let Err(e) = state.terminate(phase, decision, &reason) {
            error!(run_id = %state.run_id(), error = %e, "Could not record terminal phase");
        }
        self.emit(
            state.run_id(),
            SYSTEM_ROLE,
            reason,
            ProgressStage::Error,
            ProgressTag::Error,
        );
    }

    fn emit_stage(&self, run_id: Uuid, stage: StageKind, message: String, used_fallback: bool) {
        let progress_stage = match stage {
            StageKind::JobParse | StageKind::ResumeParse => ProgressStage::Parsing,
            StageKind::Intersection => ProgressStage::Intersection,
            StageKind::DebateTurn => ProgressStage::Debate,
            StageKind::Decision => ProgressStage::Decision,
        };
        let message = if used_fallback {
            format!("{} (defaults used)", message)
        } else {
            message
        };
        self.emit(run_id, stage.agent_name(), message, progress_stage, ProgressTag::Evaluation);
    }

    fn emit(
        &self,
        run_id: Uuid,
        role: &str,
        message: impl Into<String>,
        stage: ProgressStage,
        tag: ProgressTag,
    ) {
        self.notifier
            .emit(ProgressEvent::new(run_id, role, message, stage, tag));
    }
}

fn side_tag(side: Position) -> ProgressTag {
    match side {
        Position::Pro => ProgressTag::Pro,
        Position::Anti => ProgressTag::Anti,
    }
}

/// Turn a joined stage task into a result, substituting the fallback if
/// the task died.
fn settle<T>(
    joined: Result<StageResult<T>, JoinError>,
    stage: StageKind,
    fallback: impl FnOnce() -> T,
) -> StageResult<T> {
    match joined {
        Ok(result) => result,
        Err(e) => {
            error!(stage = %stage, error = %e, "Stage task failed");
            StageResult::fallback(fallback(), StageFailure::Crashed(e.to_string()))
        }
    }
}

/// Spawn a stage call and wait for it until `deadline`.
///
/// On expiry the task is detached, not aborted.
async fn call_stage<T, F>(
    deadline: Instant,
    stage: StageKind,
    call: F,
    fallback: impl FnOnce() -> T,
) -> Result<StageResult<T>, Halt>
where
    F: Future<Output = StageResult<T>> + Send + 'static,
    T: Send + 'static,
{
    if Instant::now() >= deadline {
        return Err(Halt::Deadline(stage));
    }
    let handle = tokio::spawn(call);
    match timeout_at(deadline, handle).await {
        Ok(joined) => Ok(settle(joined, stage, fallback)),
        Err(_) => Err(Halt::Deadline(stage)),
    }
}
