//! Result Assembler: immutable final record of a run.
//!
//! Assembly is a pure function of [`PipelineState`]: no clocks, no ids
//! minted here, so assembling the same state twice serializes identically.

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::orchestrator::state::{PipelinePhase, PipelineState};
use crate::stage::{
    Decision, DebateTurn, IntersectionAnalysis, JobAnalysis, Position, ResumeAnalysis,
};

/// Terminal status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStatus {
    Complete,
    Aborted,
    TimedOut,
}

impl RunStatus {
    /// Maps a terminal phase; anything else reads as aborted.
    pub fn from_phase(phase: PipelinePhase) -> Self {
        match phase {
            PipelinePhase::Complete => Self::Complete,
            PipelinePhase::TimedOut => Self::TimedOut,
            _ => Self::Aborted,
        }
    }

    pub fn is_degraded(self) -> bool {
        self != Self::Complete
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete => write!(f, "COMPLETE"),
            Self::Aborted => write!(f, "ABORTED"),
            Self::TimedOut => write!(f, "TIMED_OUT"),
        }
    }
}

/// Speaker category of a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryPosition {
    Evaluation,
    Pro,
    Anti,
    Decision,
}

impl From<Position> for EntryPosition {
    fn from(position: Position) -> Self {
        match position {
            Position::Pro => Self::Pro,
            Position::Anti => Self::Anti,
        }
    }
}

/// One line of the human-readable transcript.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub agent_name: String,
    pub position: EntryPosition,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Everything a caller gets back from a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalResult {
    pub run_id: Uuid,
    pub candidate_name: String,
    pub job_title: String,
    pub status: RunStatus,
    pub job_analysis: Option<JobAnalysis>,
    pub resume_analysis: Option<ResumeAnalysis>,
    pub intersection_analysis: Option<IntersectionAnalysis>,
    /// Debate turns in round order, pro before anti.
    pub debate: Vec<DebateTurn>,
    pub decision: Decision,
    pub transcript: Vec<TranscriptEntry>,
    /// Stage results that were canonical fallbacks.
    pub fallbacks_used: u32,
}

impl FinalResult {
    pub fn arguments(&self, side: Position) -> impl Iterator<Item = &DebateTurn> {
        self.debate.iter().filter(move |t| t.position == side)
    }
}

/// Builds a [`FinalResult`] from accumulated state.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultAssembler;

impl ResultAssembler {
    pub fn assemble(state: &PipelineState) -> FinalResult {
        let status = RunStatus::from_phase(state.phase());

        let mut debate = state.transcript().turns().to_vec();
        debate.sort_by_key(|t| (t.round, t.position));

        let decision = state.decision().cloned().unwrap_or_else(|| {
            Decision::degraded(
                format!("Run ended in phase {} without a decision", state.phase()),
                "No decision recorded",
            )
        });

        let mut transcript = Vec::with_capacity(debate.len() + 2);
        if let Some(intersection) = state.intersection() {
            transcript.push(intersection_entry(intersection));
        }
        transcript.extend(debate.iter().map(turn_entry));
        transcript.push(decision_entry(&decision));

        FinalResult {
            run_id: state.run_id(),
            candidate_name: state.candidate_name().to_string(),
            job_title: state.job_title().to_string(),
            status,
            job_analysis: state.job().cloned(),
            resume_analysis: state.resume().cloned(),
            intersection_analysis: state.intersection().cloned(),
            debate,
            decision,
            transcript,
            fallbacks_used: state.fallbacks_used(),
        }
    }
}

fn intersection_entry(intersection: &IntersectionAnalysis) -> TranscriptEntry {
    TranscriptEntry {
        agent_name: "Intersection Evaluator".to_string(),
        position: EntryPosition::Evaluation,
        content: intersection.analysis.clone(),
        details: Some(json!({
            "overall_compatibility": intersection.overall_compatibility,
            "skill_matches": intersection.skill_matches,
            "skill_gaps": intersection.skill_gaps,
            "experience_match": intersection.experience_match,
        })),
    }
}

fn turn_entry(turn: &DebateTurn) -> TranscriptEntry {
    TranscriptEntry {
        agent_name: turn.position.agent_name().to_string(),
        position: turn.position.into(),
        content: turn.argument.clone(),
        details: Some(json!({
            "round": turn.round,
            "confidence": turn.confidence,
            "key_points": turn.key_points,
        })),
    }
}

fn decision_entry(decision: &Decision) -> TranscriptEntry {
    TranscriptEntry {
        agent_name: "Decision Maker".to_string(),
        position: EntryPosition::Decision,
        content: decision.reasoning.summary.clone(),
        details: Some(json!({
            "decision": decision.outcome,
            "confidence": decision.confidence,
            "reasoning": decision.reasoning,
            "key_factors": decision.key_factors,
        })),
    }
}
