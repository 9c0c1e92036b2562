//! Debate Engine: pro/anti advocacy with bounded alternation
//!
//! ```text
//! Pro r1 → Anti r1 → Pro r2 → Anti r2 → Pro r3 → Anti r3 → Complete
//! ```
//!
//! Each turn quotes the opponent's latest argument. The debate always runs
//! to the per-side cap; content never shortens or extends it.

pub mod engine;
pub mod transcript;

pub use engine::{DebateEngine, NextTurn, TurnPlan, MAX_TURNS_PER_SIDE};
pub use transcript::{Transcript, TranscriptError};
