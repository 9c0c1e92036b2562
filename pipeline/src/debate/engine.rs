//! Turn selection and termination for the adversarial debate.
//!
//! Pure with respect to I/O: inspects a [`Transcript`] and says what should
//! happen next. The orchestrator performs the actual stage call.

use serde::{Deserialize, Serialize};

use crate::stage::Position;

use super::transcript::Transcript;

/// Hard cap on turns per side.
pub const MAX_TURNS_PER_SIDE: u32 = 3;

/// The turn the orchestrator should request next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnPlan {
    pub side: Position,
    /// 1-indexed.
    pub round: u32,
    /// Opponent's most recent argument, empty when the opponent has not spoken.
    pub previous_argument: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextTurn {
    Turn(TurnPlan),
    Complete,
}

/// Decides whose turn it is and when the debate ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebateEngine;

impl DebateEngine {
    pub fn new() -> Self {
        Self
    }

    /// Total turns after which the debate is over.
    pub fn max_turns(&self) -> u32 {
        MAX_TURNS_PER_SIDE * 2
    }

    /// Next action given the turns so far.
    ///
    /// Argument content and confidence never influence the result.
    pub fn next_turn(&self, transcript: &Transcript) -> NextTurn {
        let pro = transcript.count(Position::Pro);
        let anti = transcript.count(Position::Anti);

        if pro + anti >= self.max_turns() {
            return NextTurn::Complete;
        }

        let side = if pro > anti {
            Position::Anti
        } else {
            Position::Pro
        };
        let spoken = transcript.count(side);
        if spoken >= MAX_TURNS_PER_SIDE {
            return NextTurn::Complete;
        }

        let previous_argument = transcript
            .latest(side.opponent())
            .map(|t| t.argument.clone())
            .unwrap_or_default();

        NextTurn::Turn(TurnPlan {
            side,
            round: spoken + 1,
            previous_argument,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::fallback;

    fn plan(next: NextTurn) -> TurnPlan {
        match next {
            NextTurn::Turn(plan) => plan,
            NextTurn::Complete => panic!("debate ended early"),
        }
    }

    #[test]
    fn test_pro_opens_with_empty_rebuttal() {
        let p = plan(DebateEngine::new().next_turn(&Transcript::new()));
        assert_eq!(p.side, Position::Pro);
        assert_eq!(p.round, 1);
        assert!(p.previous_argument.is_empty());
    }

    #[test]
    fn test_anti_rebuts_latest_pro() {
        let mut t = Transcript::new();
        let mut opening = fallback::debate_turn(Position::Pro, 1);
        opening.argument = "Ten years of Python".to_string();
        t.push(opening).unwrap();

        let p = plan(DebateEngine::new().next_turn(&t));
        assert_eq!(p.side, Position::Anti);
        assert_eq!(p.round, 1);
        assert_eq!(p.previous_argument, "Ten years of Python");
    }

    #[test]
    fn test_full_debate_order_and_termination() {
        let engine = DebateEngine::new();
        let mut t = Transcript::new();
        let mut order = Vec::new();
        while let NextTurn::Turn(p) = engine.next_turn(&t) {
            order.push((p.side, p.round));
            t.push(fallback::debate_turn(p.side, p.round)).unwrap();
            assert!(order.len() <= 6, "debate did not terminate");
        }
        assert_eq!(
            order,
            vec![
                (Position::Pro, 1),
                (Position::Anti, 1),
                (Position::Pro, 2),
                (Position::Anti, 2),
                (Position::Pro, 3),
                (Position::Anti, 3),
            ]
        );
        assert_eq!(engine.next_turn(&t), NextTurn::Complete);
    }
}
