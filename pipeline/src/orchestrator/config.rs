//! Pipeline tunables.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::resilience::DEFAULT_BREAKER_THRESHOLD;

/// Default wall-clock budget for one run.
pub const DEFAULT_DEADLINE_SECS: u64 = 120;

/// Budgets beyond this are treated as "no deadline".
pub const MAX_DEADLINE: Duration = Duration::from_secs(86_400 * 365 * 30);

/// Knobs for one orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Overall deadline for a run, measured from `run()` entry.
    pub deadline_secs: u64,
    /// Debate fallbacks tolerated before the run aborts.
    pub breaker_threshold: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            deadline_secs: DEFAULT_DEADLINE_SECS,
            breaker_threshold: DEFAULT_BREAKER_THRESHOLD,
        }
    }
}

impl PipelineConfig {
    /// Budget for one run, capped at [`MAX_DEADLINE`].
    pub fn deadline(&self) -> Duration {
        Duration::from_secs(self.deadline_secs).min(MAX_DEADLINE)
    }

    /// Absolute deadline for a run starting at `start`.
    pub fn deadline_from(&self, start: Instant) -> Instant {
        start
            .checked_add(self.deadline())
            .unwrap_or_else(|| start + Duration::from_secs(86_400))
    }
}
