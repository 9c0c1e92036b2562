//! Hiring Pipeline Library
//!
//! Evaluates a job candidate by running a fixed multi-stage analysis
//! pipeline against a language model:
//!
//! - **Stage executor** (`stage`): job parsing, resume parsing, intersection
//!   evaluation, debate turns and the final decision, each a single model
//!   call with a canonical fallback on failure
//! - **Debate engine** (`debate`): strict pro/anti alternation, at most
//!   three turns per side
//! - **Circuit breaker** (`resilience`): aborts when debate stages keep
//!   falling back
//! - **Orchestrator** (`orchestrator`): the state machine that sequences
//!   everything under one wall-clock deadline
//! - **Progress notifier** (`events`): best-effort progress events
//! - **Result assembler** (`result`) and the storage contract
//!   (`persistence`)
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use hiring_pipeline::{Orchestrator, ProgressBus};
//!
//! let bus = ProgressBus::new().shared();
//! let orchestrator = Orchestrator::new(Arc::new(my_model)).with_notifier(bus.clone());
//!
//! let result = orchestrator
//!     .run(&resume_text, &job_description, "Ada Lovelace", "Backend Engineer")
//!     .await;
//! println!("{}: {}", result.status, result.decision.outcome);
//! ```

#![allow(clippy::uninlined_format_args)]

pub mod debate;
pub mod events;
pub mod orchestrator;
pub mod persistence;
pub mod resilience;
pub mod result;
pub mod stage;

pub use debate::{DebateEngine, NextTurn, Transcript, TranscriptError, TurnPlan, MAX_TURNS_PER_SIDE};
pub use events::{
    EventFilter, FilteredReceiver, NoopNotifier, ProgressBus, ProgressEvent, ProgressNotifier,
    ProgressStage, ProgressTag, SharedProgressBus,
};
pub use orchestrator::{
    DecisionError, IllegalTransition, Orchestrator, PipelineConfig, PipelineError, PipelinePhase,
    PipelineState, StateError,
};
pub use persistence::{
    persist, qualifies_for_top_candidate, EvaluationRecord, EvaluationStore, InMemoryStore,
    PersistReceipt, PersistenceError, RecordId, TopCandidateOutcome, TopCandidateRecord,
    TOP_CANDIDATE_MIN_SCORE, TOP_CANDIDATE_THRESHOLD,
};
pub use resilience::{BreakerState, CircuitBreaker};
pub use result::{EntryPosition, FinalResult, ResultAssembler, RunStatus, TranscriptEntry};
pub use stage::{
    Decision, DebateTurn, ExperienceLevel, ExperienceMatch, IntersectionAnalysis, JobAnalysis,
    LanguageModel, ModelError, Outcome, Position, Reasoning, ResumeAnalysis, StageExecutor,
    StageKind, StageResult,
};
