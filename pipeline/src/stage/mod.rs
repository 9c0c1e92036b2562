//! Stage Executor
//!
//! Each analysis step (job parse, resume parse, intersection, debate turn,
//! decision) is one language-model call behind a request/response contract.
//! Failures never propagate: the executor substitutes a canonical fallback
//! value and flags it with `used_fallback`.

pub mod executor;
pub mod fallback;
pub mod model;
pub mod parse;
pub mod prompts;
pub mod request;
pub mod types;

pub use executor::StageExecutor;
pub use model::{LanguageModel, ModelError};
pub use request::{
    DebateRequest, DecisionRequest, StageData, StageFailure, StageKind, StageRequest, StageResult,
};
pub use types::{
    Decision, DebateTurn, ExperienceLevel, ExperienceMatch, IntersectionAnalysis, JobAnalysis,
    Outcome, Position, Reasoning, ResumeAnalysis,
};
