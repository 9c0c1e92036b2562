//! Pipeline state machine: phases, legal transitions, and the per-run
//! state object the orchestrator owns exclusively.
//!
//! ```text
//! Init → Parsing → Intersection → Debate → Decision → Complete
//!           │            │           │         │
//!           └────────────┴─────┬─────┴─────────┘
//!                              ├─ deadline → TimedOut
//!                              └─ breaker / invariant → Aborted
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::time::Instant;
use uuid::Uuid;

use crate::debate::{Transcript, TranscriptError};
use crate::resilience::{BreakerState, CircuitBreaker};
use crate::stage::{
    Decision, DebateTurn, IntersectionAnalysis, JobAnalysis, ResumeAnalysis, StageKind, StageResult,
};

/// Phases of one pipeline run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelinePhase {
    Init,
    Parsing,
    Intersection,
    Debate,
    Decision,
    Complete,
    Aborted,
    TimedOut,
}

impl PipelinePhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Aborted | Self::TimedOut)
    }

    /// Phases that wait on a stage call.
    pub fn is_waiting(self) -> bool {
        matches!(
            self,
            Self::Parsing | Self::Intersection | Self::Debate | Self::Decision
        )
    }
}

impl fmt::Display for PipelinePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init => write!(f, "INIT"),
            Self::Parsing => write!(f, "PARSING"),
            Self::Intersection => write!(f, "INTERSECTION"),
            Self::Debate => write!(f, "DEBATE"),
            Self::Decision => write!(f, "DECISION"),
            Self::Complete => write!(f, "COMPLETE"),
            Self::Aborted => write!(f, "ABORTED"),
            Self::TimedOut => write!(f, "TIMED_OUT"),
        }
    }
}

/// Legal edges of the phase graph.
///
/// Any non-terminal phase may abort; only waiting phases may time out.
fn is_legal_transition(from: PipelinePhase, to: PipelinePhase) -> bool {
    use PipelinePhase::*;

    if to == Aborted && !from.is_terminal() {
        return true;
    }
    if to == TimedOut && from.is_waiting() {
        return true;
    }

    matches!(
        (from, to),
        (Init, Parsing)
            | (Parsing, Intersection)
            | (Intersection, Debate)
            | (Debate, Decision)
            | (Decision, Complete)
    )
}

/// Error returned when an illegal transition is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("illegal phase transition: {from} → {to}")]
pub struct IllegalTransition {
    pub from: PipelinePhase,
    pub to: PipelinePhase,
}

/// Rejected attempt to record the decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecisionError {
    #[error("decision already recorded for this run")]
    AlreadyRecorded,

    #[error("decision not accepted in phase {0}")]
    NotReady(PipelinePhase),
}

/// Any violation of the state object's invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error(transparent)]
    Transition(#[from] IllegalTransition),

    #[error(transparent)]
    Transcript(#[from] TranscriptError),

    #[error(transparent)]
    Decision(#[from] DecisionError),

    #[error("{stage} result not accepted in phase {phase}")]
    OutOfPhase {
        stage: StageKind,
        phase: PipelinePhase,
    },

    #[error("{stage} requested before {missing} was available")]
    MissingInput {
        stage: StageKind,
        missing: &'static str,
    },
}

/// A single recorded phase transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: PipelinePhase,
    pub to: PipelinePhase,
    /// Milliseconds since the run started.
    pub elapsed_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Per-stage completion flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageFlags {
    pub job_parsed: bool,
    pub resume_parsed: bool,
    pub intersection_done: bool,
    pub debate_done: bool,
    pub decision_done: bool,
}

/// Everything one run has accumulated.
///
/// Owned by a single orchestrator; stage results are applied through the
/// `record_*` methods, which enforce ordering invariants.
#[derive(Debug, Clone)]
pub struct PipelineState {
    run_id: Uuid,
    candidate_name: String,
    job_title: String,
    phase: PipelinePhase,
    job: Option<JobAnalysis>,
    resume: Option<ResumeAnalysis>,
    intersection: Option<IntersectionAnalysis>,
    transcript: Transcript,
    decision: Option<Decision>,
    flags: StageFlags,
    breaker: CircuitBreaker,
    fallbacks_used: u32,
    started_at: Instant,
    transitions: Vec<TransitionRecord>,
}

impl PipelineState {
    pub fn new(
        run_id: Uuid,
        candidate_name: impl Into<String>,
        job_title: impl Into<String>,
        breaker_threshold: u32,
    ) -> Self {
        Self {
            run_id,
            candidate_name: candidate_name.into(),
            job_title: job_title.into(),
            phase: PipelinePhase::Init,
            job: None,
            resume: None,
            intersection: None,
            transcript: Transcript::new(),
            decision: None,
            flags: StageFlags::default(),
            breaker: CircuitBreaker::new(breaker_threshold),
            fallbacks_used: 0,
            started_at: Instant::now(),
            transitions: Vec::new(),
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn candidate_name(&self) -> &str {
        &self.candidate_name
    }

    pub fn job_title(&self) -> &str {
        &self.job_title
    }

    pub fn phase(&self) -> PipelinePhase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn job(&self) -> Option<&JobAnalysis> {
        self.job.as_ref()
    }

    pub fn resume(&self) -> Option<&ResumeAnalysis> {
        self.resume.as_ref()
    }

    pub fn intersection(&self) -> Option<&IntersectionAnalysis> {
        self.intersection.as_ref()
    }

    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn decision(&self) -> Option<&Decision> {
        self.decision.as_ref()
    }

    pub fn flags(&self) -> StageFlags {
        self.flags
    }

    /// Debate failures seen by the circuit breaker.
    pub fn failures(&self) -> u32 {
        self.breaker.failures()
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Stage results of any kind that were fallbacks.
    pub fn fallbacks_used(&self) -> u32 {
        self.fallbacks_used
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Move to `to` if the phase graph allows it.
    pub fn advance(&mut self, to: PipelinePhase, reason: Option<&str>) -> Result<(), IllegalTransition> {
        if !is_legal_transition(self.phase, to) {
            return Err(IllegalTransition {
                from: self.phase,
                to,
            });
        }

        tracing::debug!(
            run_id = %self.run_id,
            from = %self.phase,
            to = %to,
            "Phase transition"
        );

        self.transitions.push(TransitionRecord {
            from: self.phase,
            to,
            elapsed_ms: self.started_at.elapsed().as_millis() as u64,
            reason: reason.map(String::from),
        });
        self.phase = to;
        Ok(())
    }

    fn expect_phase(&self, stage: StageKind, phase: PipelinePhase) -> Result<(), StateError> {
        if self.phase != phase {
            return Err(StateError::OutOfPhase {
                stage,
                phase: self.phase,
            });
        }
        Ok(())
    }

    fn count_fallback<T>(&mut self, result: &StageResult<T>) {
        if result.used_fallback {
            self.fallbacks_used += 1;
        }
    }

    pub fn record_job(&mut self, result: StageResult<JobAnalysis>) -> Result<(), StateError> {
        self.expect_phase(StageKind::JobParse, PipelinePhase::Parsing)?;
        self.count_fallback(&result);
        self.job = Some(result.data);
        self.flags.job_parsed = true;
        Ok(())
    }

    pub fn record_resume(&mut self, result: StageResult<ResumeAnalysis>) -> Result<(), StateError> {
        self.expect_phase(StageKind::ResumeParse, PipelinePhase::Parsing)?;
        self.count_fallback(&result);
        self.resume = Some(result.data);
        self.flags.resume_parsed = true;
        Ok(())
    }

    pub fn record_intersection(
        &mut self,
        result: StageResult<IntersectionAnalysis>,
    ) -> Result<(), StateError> {
        self.expect_phase(StageKind::Intersection, PipelinePhase::Intersection)?;
        if self.job.is_none() {
            return Err(StateError::MissingInput {
                stage: StageKind::Intersection,
                missing: "job analysis",
            });
        }
        if self.resume.is_none() {
            return Err(StateError::MissingInput {
                stage: StageKind::Intersection,
                missing: "resume analysis",
            });
        }
        self.count_fallback(&result);
        self.intersection = Some(result.data);
        self.flags.intersection_done = true;
        Ok(())
    }

    /// Append a debate turn and feed its outcome to the circuit breaker.
    pub fn record_turn(&mut self, result: StageResult<DebateTurn>) -> Result<BreakerState, StateError> {
        self.expect_phase(StageKind::DebateTurn, PipelinePhase::Debate)?;
        if self.intersection.is_none() {
            return Err(StateError::MissingInput {
                stage: StageKind::DebateTurn,
                missing: "intersection analysis",
            });
        }
        self.transcript.push(result.data.clone())?;
        self.count_fallback(&result);
        Ok(self.breaker.observe(result.used_fallback))
    }

    /// Mark the debate finished. The transcript is frozen from here on.
    pub fn finish_debate(&mut self) -> Result<(), IllegalTransition> {
        self.advance(PipelinePhase::Decision, Some("debate complete"))?;
        self.flags.debate_done = true;
        Ok(())
    }

    /// Record the decision stage's output. At most once per run.
    pub fn record_decision(&mut self, result: StageResult<Decision>) -> Result<(), StateError> {
        if self.decision.is_some() {
            return Err(DecisionError::AlreadyRecorded.into());
        }
        if self.phase != PipelinePhase::Decision {
            return Err(DecisionError::NotReady(self.phase).into());
        }
        self.count_fallback(&result);
        self.decision = Some(result.data);
        self.flags.decision_done = true;
        Ok(())
    }

    /// End the run early in `phase` with a degraded decision.
    pub fn terminate(
        &mut self,
        phase: PipelinePhase,
        decision: Decision,
        reason: &str,
    ) -> Result<(), StateError> {
        if self.decision.is_some() {
            return Err(DecisionError::AlreadyRecorded.into());
        }
        self.advance(phase, Some(reason))?;
        self.decision = Some(decision);
        Ok(())
    }

    /// Milliseconds since the run started.
    pub fn elapsed_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }
}
