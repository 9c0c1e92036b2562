//! Request/response contract of the stage executor.

use serde::{Deserialize, Serialize};

use super::types::{
    Decision, DebateTurn, IntersectionAnalysis, JobAnalysis, Position, ResumeAnalysis,
};

/// The five kinds of analysis call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    JobParse,
    ResumeParse,
    Intersection,
    DebateTurn,
    Decision,
}

impl StageKind {
    /// Agent label shown to observers.
    pub fn agent_name(self) -> &'static str {
        match self {
            Self::JobParse => "Job Parser",
            Self::ResumeParse => "Resume Parser",
            Self::Intersection => "Intersection Evaluator",
            Self::DebateTurn => "Debate",
            Self::Decision => "Decision Maker",
        }
    }
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::JobParse => write!(f, "job_parse"),
            Self::ResumeParse => write!(f, "resume_parse"),
            Self::Intersection => write!(f, "intersection"),
            Self::DebateTurn => write!(f, "debate_turn"),
            Self::Decision => write!(f, "decision"),
        }
    }
}

/// Input for one debate turn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DebateRequest {
    pub position: Position,
    pub round: u32,
    /// Opponent's most recent argument; empty when there is none yet.
    pub previous_argument: String,
    pub intersection: IntersectionAnalysis,
}

/// Input for the final decision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionRequest {
    pub pro_arguments: Vec<DebateTurn>,
    pub anti_arguments: Vec<DebateTurn>,
    pub intersection: IntersectionAnalysis,
    pub candidate_name: String,
    pub job_title: String,
}

/// Payload for one stage call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StageRequest {
    ParseJob {
        job_title: String,
        job_description: String,
    },
    ParseResume {
        candidate_name: String,
        resume_text: String,
    },
    Intersect {
        job: JobAnalysis,
        resume: ResumeAnalysis,
    },
    Debate(DebateRequest),
    Decide(DecisionRequest),
}

impl StageRequest {
    pub fn kind(&self) -> StageKind {
        match self {
            Self::ParseJob { .. } => StageKind::JobParse,
            Self::ParseResume { .. } => StageKind::ResumeParse,
            Self::Intersect { .. } => StageKind::Intersection,
            Self::Debate(_) => StageKind::DebateTurn,
            Self::Decide(_) => StageKind::Decision,
        }
    }
}

/// Output of one stage call, by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StageData {
    Job(JobAnalysis),
    Resume(ResumeAnalysis),
    Intersection(IntersectionAnalysis),
    Turn(DebateTurn),
    Decision(Decision),
}

/// Why a stage fell back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum StageFailure {
    /// Transport or API failure from the model client.
    Upstream(String),
    /// The model answered but the answer did not fit the stage's shape.
    Unparsable(String),
    /// The stage task died before producing anything.
    Crashed(String),
}

impl std::fmt::Display for StageFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Upstream(msg) => write!(f, "upstream failure: {}", msg),
            Self::Unparsable(msg) => write!(f, "unparsable response: {}", msg),
            Self::Crashed(msg) => write!(f, "stage crashed: {}", msg),
        }
    }
}

/// Result of a stage call. Always carries usable data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult<T> {
    pub data: T,
    /// True when `data` is the stage's canonical fallback.
    pub used_fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<StageFailure>,
}

impl<T> StageResult<T> {
    pub fn parsed(data: T) -> Self {
        Self {
            data,
            used_fallback: false,
            failure: None,
        }
    }

    pub fn fallback(data: T, failure: StageFailure) -> Self {
        Self {
            data,
            used_fallback: true,
            failure: Some(failure),
        }
    }

    /// Whether the model produced this result.
    pub fn ok(&self) -> bool {
        !self.used_fallback
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> StageResult<U> {
        StageResult {
            data: f(self.data),
            used_fallback: self.used_fallback,
            failure: self.failure,
        }
    }
}
