//! Ordered record of debate turns with alternation enforced on append.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stage::{DebateTurn, Position};

use super::engine::MAX_TURNS_PER_SIDE;

/// Rejected append.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranscriptError {
    #[error("{side} cannot speak next: expected {expected}")]
    OutOfTurn { side: Position, expected: Position },

    #[error("{side} turn carries round {got}, expected round {expected}")]
    WrongRound {
        side: Position,
        got: u32,
        expected: u32,
    },

    #[error("{side} already has {cap} turns")]
    CapReached { side: Position, cap: u32 },
}

/// Debate turns in the order they were requested.
///
/// Pro opens every round; a side never leads by more than one turn and
/// neither side exceeds [`MAX_TURNS_PER_SIDE`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    turns: Vec<DebateTurn>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of turns produced by `side`.
    pub fn count(&self, side: Position) -> u32 {
        self.turns.iter().filter(|t| t.position == side).count() as u32
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Most recent turn of `side`, if any.
    pub fn latest(&self, side: Position) -> Option<&DebateTurn> {
        self.turns.iter().rev().find(|t| t.position == side)
    }

    /// All turns, pro before anti within each round.
    pub fn turns(&self) -> &[DebateTurn] {
        &self.turns
    }

    /// Turns of one side, in round order.
    pub fn side(&self, side: Position) -> Vec<DebateTurn> {
        self.turns
            .iter()
            .filter(|t| t.position == side)
            .cloned()
            .collect()
    }

    /// Side expected to speak next.
    pub fn expected_side(&self) -> Position {
        if self.count(Position::Pro) > self.count(Position::Anti) {
            Position::Anti
        } else {
            Position::Pro
        }
    }

    /// Append a turn, rejecting anything that breaks alternation.
    pub fn push(&mut self, turn: DebateTurn) -> Result<(), TranscriptError> {
        let side = turn.position;
        let expected = self.expected_side();
        if side != expected {
            return Err(TranscriptError::OutOfTurn { side, expected });
        }

        let count = self.count(side);
        if count >= MAX_TURNS_PER_SIDE {
            return Err(TranscriptError::CapReached {
                side,
                cap: MAX_TURNS_PER_SIDE,
            });
        }

        let round = count + 1;
        if turn.round != round {
            return Err(TranscriptError::WrongRound {
                side,
                got: turn.round,
                expected: round,
            });
        }

        self.turns.push(turn);
        Ok(())
    }
}
