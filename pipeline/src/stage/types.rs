//! Analysis records produced by the stages.
//!
//! Every record is produced once by its stage and never mutated afterwards.
//! Skill collections are sets (`BTreeSet`) so serialized output is stable.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Seniority bucket shared by job and resume analyses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceLevel {
    Junior,
    Mid,
    Senior,
}

impl ExperienceLevel {
    /// Parse the loose vocabulary language models tend to emit.
    pub fn parse(raw: &str) -> Option<Self> {
        let lowered = raw.trim().to_ascii_lowercase();
        let head = lowered
            .split(|c: char| !c.is_ascii_alphabetic())
            .find(|s| !s.is_empty())?;
        match head {
            "junior" | "entry" => Some(Self::Junior),
            "mid" | "middle" | "intermediate" => Some(Self::Mid),
            "senior" | "lead" | "principal" | "staff" => Some(Self::Senior),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Junior => write!(f, "Junior"),
            Self::Mid => write!(f, "Mid-level"),
            Self::Senior => write!(f, "Senior"),
        }
    }
}

/// How well the candidate's experience lines up with the role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExperienceMatch {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl ExperienceMatch {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "excellent" => Some(Self::Excellent),
            "good" => Some(Self::Good),
            "fair" => Some(Self::Fair),
            "poor" => Some(Self::Poor),
            _ => None,
        }
    }
}

impl std::fmt::Display for ExperienceMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Excellent => write!(f, "excellent"),
            Self::Good => write!(f, "good"),
            Self::Fair => write!(f, "fair"),
            Self::Poor => write!(f, "poor"),
        }
    }
}

/// Structured view of a job description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobAnalysis {
    pub job_title: String,
    pub required_skills: BTreeSet<String>,
    pub preferred_skills: BTreeSet<String>,
    pub experience_level: ExperienceLevel,
    /// Ordered as the model listed them.
    pub key_requirements: Vec<String>,
    pub analysis: String,
}

/// Structured view of a resume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResumeAnalysis {
    pub candidate_name: String,
    pub skills: BTreeSet<String>,
    pub experience_years: u32,
    pub experience_level: ExperienceLevel,
    pub achievements: Vec<String>,
    pub analysis: String,
}

/// Fit between a job analysis and a resume analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntersectionAnalysis {
    pub analysis: String,
    /// Always within [0.0, 1.0].
    pub overall_compatibility: f64,
    pub skill_matches: BTreeSet<String>,
    pub skill_gaps: BTreeSet<String>,
    pub experience_match: ExperienceMatch,
}

/// Side of the adversarial debate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Pro,
    Anti,
}

impl Position {
    /// The side this one argues against.
    pub fn opponent(self) -> Self {
        match self {
            Self::Pro => Self::Anti,
            Self::Anti => Self::Pro,
        }
    }

    /// Agent label used in transcripts and progress events.
    pub fn agent_name(self) -> &'static str {
        match self {
            Self::Pro => "Pro-Hire Advocate",
            Self::Anti => "Anti-Hire Advocate",
        }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pro => write!(f, "pro"),
            Self::Anti => write!(f, "anti"),
        }
    }
}

/// One argument in the debate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebateTurn {
    pub position: Position,
    pub argument: String,
    /// Always within [0.0, 1.0].
    pub confidence: f64,
    pub key_points: Vec<String>,
    /// 1-indexed round this turn belongs to.
    pub round: u32,
}

/// Final hiring verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Hire,
    NoHire,
}

impl Outcome {
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized: String = raw
            .trim()
            .to_ascii_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        match normalized.as_str() {
            "hire" => Some(Self::Hire),
            "nohire" | "reject" => Some(Self::NoHire),
            _ => None,
        }
    }

    /// Upper-case label used by storage records.
    pub fn as_record_label(self) -> &'static str {
        match self {
            Self::Hire => "HIRE",
            Self::NoHire => "NO_HIRE",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hire => write!(f, "hire"),
            Self::NoHire => write!(f, "no_hire"),
        }
    }
}

/// Structured rationale behind a decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reasoning {
    pub summary: String,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
}

/// Terminal output of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub outcome: Outcome,
    /// Always within [0.0, 1.0].
    pub confidence: f64,
    pub reasoning: Reasoning,
    pub key_factors: Vec<String>,
}

impl Decision {
    /// Zero-confidence rejection used when the pipeline cannot finish normally.
    pub fn degraded(summary: impl Into<String>, factor: impl Into<String>) -> Self {
        let summary = summary.into();
        Self {
            outcome: Outcome::NoHire,
            confidence: 0.0,
            reasoning: Reasoning {
                summary: summary.clone(),
                pros: Vec::new(),
                cons: vec![summary],
            },
            key_factors: vec![factor.into()],
        }
    }

    /// Confidence mapped onto the 0–100 leaderboard scale.
    pub fn score_percent(&self) -> f64 {
        // Two decimals, so 0.85 maps to exactly 85.0.
        (self.confidence * 10_000.0).round() / 100.0
    }
}

/// Whether a float is usable as a confidence/compatibility value.
pub fn is_unit_interval(value: f64) -> bool {
    value.is_finite() && (0.0..=1.0).contains(&value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_experience_level_parse() {
        assert_eq!(ExperienceLevel::parse("Junior"), Some(ExperienceLevel::Junior));
        assert_eq!(ExperienceLevel::parse("Mid-level"), Some(ExperienceLevel::Mid));
        assert_eq!(ExperienceLevel::parse(" senior "), Some(ExperienceLevel::Senior));
        assert_eq!(ExperienceLevel::parse("Lead engineer"), Some(ExperienceLevel::Senior));
        assert_eq!(ExperienceLevel::parse("wizard"), None);
        assert_eq!(ExperienceLevel::parse(""), None);
    }

    #[test]
    fn test_experience_match_parse() {
        assert_eq!(ExperienceMatch::parse("Excellent"), Some(ExperienceMatch::Excellent));
        assert_eq!(ExperienceMatch::parse("poor"), Some(ExperienceMatch::Poor));
        assert_eq!(ExperienceMatch::parse("great"), None);
    }

    #[test]
    fn test_outcome_parse() {
        assert_eq!(Outcome::parse("hire"), Some(Outcome::Hire));
        assert_eq!(Outcome::parse("NO_HIRE"), Some(Outcome::NoHire));
        assert_eq!(Outcome::parse("no hire"), Some(Outcome::NoHire));
        assert_eq!(Outcome::parse("maybe"), None);
    }

    #[test]
    fn test_position_opponent() {
        assert_eq!(Position::Pro.opponent(), Position::Anti);
        assert_eq!(Position::Anti.opponent(), Position::Pro);
        assert_eq!(Position::Pro.to_string(), "pro");
    }

    #[test]
    fn test_degraded_decision() {
        let decision = Decision::degraded("aborted", "Circuit breaker");
        assert_eq!(decision.outcome, Outcome::NoHire);
        assert_eq!(decision.confidence, 0.0);
        assert_eq!(decision.reasoning.cons, vec!["aborted".to_string()]);
        assert_eq!(decision.key_factors, vec!["Circuit breaker".to_string()]);
    }

    #[test]
    fn test_unit_interval() {
        assert!(is_unit_interval(0.0));
        assert!(is_unit_interval(1.0));
        assert!(!is_unit_interval(1.01));
        assert!(!is_unit_interval(-0.1));
        assert!(!is_unit_interval(f64::NAN));
    }

    #[test]
    fn test_score_percent() {
        let mut decision = Decision::degraded("x", "y");
        decision.confidence = 0.9;
        assert!((decision.score_percent() - 90.0).abs() < 1e-9);
    }
}
