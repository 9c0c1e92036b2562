//! Canonical fallback values, one per stage kind.
//!
//! Substituted whenever the language model fails or returns something that
//! does not parse into the stage's shape. All numeric values are in [0, 1].

use std::collections::BTreeSet;

use super::types::{
    Decision, DebateTurn, ExperienceLevel, ExperienceMatch, IntersectionAnalysis, JobAnalysis,
    Outcome, Position, Reasoning, ResumeAnalysis,
};

pub const PRO_FALLBACK_ARGUMENT: &str =
    "Candidate has strong technical skills and relevant experience";
pub const ANTI_FALLBACK_ARGUMENT: &str = "Candidate has significant skill gaps";

pub const INTERSECTION_FALLBACK_COMPATIBILITY: f64 = 0.7;
pub const PRO_FALLBACK_CONFIDENCE: f64 = 0.8;
pub const ANTI_FALLBACK_CONFIDENCE: f64 = 0.6;

/// Defaults for fields a parsed decision leaves out. Distinct from
/// [`decision`], which replaces a decision that did not parse at all.
pub const DECISION_DEFAULT_CONFIDENCE: f64 = 0.7;
pub const DECISION_DEFAULT_SUMMARY: &str = "Analysis incomplete.";
pub const DECISION_DEFAULT_KEY_FACTOR: &str = "N/A";

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

pub fn job(job_title: &str) -> JobAnalysis {
    JobAnalysis {
        job_title: job_title.to_string(),
        required_skills: set(&["python", "javascript"]),
        preferred_skills: set(&["react"]),
        experience_level: ExperienceLevel::Mid,
        key_requirements: list(&["web development"]),
        analysis: "Failed to parse job description, using defaults".to_string(),
    }
}

pub fn resume(candidate_name: &str) -> ResumeAnalysis {
    ResumeAnalysis {
        candidate_name: candidate_name.to_string(),
        skills: set(&["python", "javascript", "react"]),
        experience_years: 3,
        experience_level: ExperienceLevel::Mid,
        achievements: list(&["Led development team"]),
        analysis: "Failed to parse resume, using defaults".to_string(),
    }
}

pub fn intersection() -> IntersectionAnalysis {
    IntersectionAnalysis {
        analysis: "Default intersection analysis".to_string(),
        overall_compatibility: INTERSECTION_FALLBACK_COMPATIBILITY,
        skill_matches: set(&["python", "javascript"]),
        skill_gaps: set(&["microservices"]),
        experience_match: ExperienceMatch::Good,
    }
}

pub fn debate_turn(position: Position, round: u32) -> DebateTurn {
    match position {
        Position::Pro => DebateTurn {
            position,
            argument: PRO_FALLBACK_ARGUMENT.to_string(),
            confidence: PRO_FALLBACK_CONFIDENCE,
            key_points: list(&["Technical skills", "Experience level"]),
            round,
        },
        Position::Anti => DebateTurn {
            position,
            argument: ANTI_FALLBACK_ARGUMENT.to_string(),
            confidence: ANTI_FALLBACK_CONFIDENCE,
            key_points: list(&["Missing skills", "Experience concerns"]),
            round,
        },
    }
}

pub fn decision() -> Decision {
    Decision {
        outcome: Outcome::NoHire,
        confidence: 0.0,
        reasoning: Reasoning {
            summary: "Failed to obtain a decision from the language model.".to_string(),
            pros: Vec::new(),
            cons: list(&["Could not generate analysis from AI."]),
        },
        key_factors: list(&["Decision stage unavailable"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::types::is_unit_interval;

    #[test]
    fn test_fallbacks_stay_in_range() {
        assert!(is_unit_interval(intersection().overall_compatibility));
        assert!(is_unit_interval(debate_turn(Position::Pro, 1).confidence));
        assert!(is_unit_interval(debate_turn(Position::Anti, 1).confidence));
        assert!(is_unit_interval(decision().confidence));
        assert!(is_unit_interval(DECISION_DEFAULT_CONFIDENCE));
    }

    #[test]
    fn test_debate_fallback_carries_round_and_side() {
        let turn = debate_turn(Position::Anti, 2);
        assert_eq!(turn.position, Position::Anti);
        assert_eq!(turn.round, 2);
        assert_eq!(turn.argument, ANTI_FALLBACK_ARGUMENT);
    }

    #[test]
    fn test_identity_fields_follow_request() {
        assert_eq!(job("Backend Engineer").job_title, "Backend Engineer");
        assert_eq!(resume("Ada").candidate_name, "Ada");
    }
}
