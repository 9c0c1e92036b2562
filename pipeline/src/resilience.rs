//! Resilience: Failure Detector / Circuit Breaker
//!
//! Watches stage outcomes for systemic upstream failure. The stage executor
//! masks every failure behind a fallback value, so the only signal is the
//! `used_fallback` flag it threads through.
//!
//! ```text
//! observe(false) ──► Closed (count unchanged)
//! observe(true)  ──► failures += 1
//!                      ├─ failures <  threshold → Closed
//!                      └─ failures >= threshold → Open (stays open)
//! ```
//!
//! Failures accumulate for the lifetime of the breaker; successes do not
//! reset the count.

use serde::{Deserialize, Serialize};

/// Default number of failures that opens the breaker.
pub const DEFAULT_BREAKER_THRESHOLD: u32 = 3;

/// Whether the pipeline may continue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    /// Keep going.
    Closed,
    /// Threshold reached; abort.
    Open,
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Open => write!(f, "open"),
        }
    }
}

/// Counter-based breaker over stage outcomes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreaker {
    threshold: u32,
    failures: u32,
    observed: u32,
    state: BreakerState,
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(DEFAULT_BREAKER_THRESHOLD)
    }
}

impl CircuitBreaker {
    /// A threshold of 0 is treated as 1.
    pub fn new(threshold: u32) -> Self {
        Self {
            threshold: threshold.max(1),
            failures: 0,
            observed: 0,
            state: BreakerState::Closed,
        }
    }

    /// Record one stage outcome and return the resulting state.
    pub fn observe(&mut self, used_fallback: bool) -> BreakerState {
        self.observed += 1;
        if used_fallback {
            self.failures += 1;
            if self.failures >= self.threshold {
                self.state = BreakerState::Open;
            }
        }
        self.state
    }

    pub fn failures(&self) -> u32 {
        self.failures
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Fraction of observed outcomes that were failures (0.0–1.0).
    pub fn failure_rate(&self) -> f64 {
        if self.observed == 0 {
            0.0
        } else {
            f64::from(self.failures) / f64::from(self.observed)
        }
    }
}
