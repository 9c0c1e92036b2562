//! Progress event types streamed to observers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Agent label used by the pipeline itself.
pub const SYSTEM_ROLE: &str = "System";

/// Pipeline step an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressStage {
    Initialization,
    Parsing,
    Intersection,
    Debate,
    Decision,
    Completed,
    Error,
}

impl ProgressStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initialization => "initialization",
            Self::Parsing => "parsing",
            Self::Intersection => "intersection",
            Self::Debate => "debate",
            Self::Decision => "decision",
            Self::Completed => "completed",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for ProgressStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Position tag used by the UI feed to colour an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProgressTag {
    Info,
    Evaluation,
    Pro,
    Anti,
    Decision,
    Error,
}

impl std::fmt::Display for ProgressTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "info"),
            Self::Evaluation => write!(f, "evaluation"),
            Self::Pro => write!(f, "pro"),
            Self::Anti => write!(f, "anti"),
            Self::Decision => write!(f, "decision"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// One observability event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Run that emitted the event.
    pub run_id: Uuid,
    /// Agent label, e.g. "Pro-Hire Advocate".
    pub role: String,
    pub message: String,
    pub stage: ProgressStage,
    pub tag: ProgressTag,
    pub timestamp: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(
        run_id: Uuid,
        role: impl Into<String>,
        message: impl Into<String>,
        stage: ProgressStage,
        tag: ProgressTag,
    ) -> Self {
        Self {
            run_id,
            role: role.into(),
            message: message.into(),
            stage,
            tag,
            timestamp: Utc::now(),
        }
    }

    /// Whether this event ends the run's feed.
    pub fn is_terminal(&self) -> bool {
        matches!(self.stage, ProgressStage::Completed | ProgressStage::Error)
    }
}
