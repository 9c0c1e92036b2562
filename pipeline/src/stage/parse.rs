//! Response-shape parsing for stage completions.
//!
//! Models wrap JSON in Markdown fences or chatter around it, so extraction
//! tries the fenced body first and then the outermost `{...}` span. Each
//! stage has one primary field; without it the response is unparsable.
//! Missing secondary fields take the stage fallback's value.

use std::collections::BTreeSet;
use std::sync::LazyLock;

use regex::Regex;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use super::fallback;
use super::types::{
    is_unit_interval, Decision, DebateTurn, ExperienceLevel, ExperienceMatch,
    IntersectionAnalysis, JobAnalysis, Outcome, Position, Reasoning, ResumeAnalysis,
};

static FENCE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*\s*(.*?)\s*```").expect("FENCE_RE regex should compile")
});

/// Pull the JSON body out of a raw completion.
pub fn extract_json(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    let body = FENCE_RE
        .captures(trimmed)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
        .unwrap_or(trimmed);

    if body.starts_with('{') && body.ends_with('}') {
        return Some(body);
    }
    let start = body.find('{')?;
    let end = body.rfind('}')?;
    (start < end).then(|| &body[start..=end])
}

fn decode<T: DeserializeOwned>(raw: &str) -> Result<T, String> {
    let body = extract_json(raw).ok_or_else(|| "no JSON object in completion".to_string())?;
    serde_json::from_str(body).map_err(|e| e.to_string())
}

fn unit(field: &str, value: Option<f64>, default: f64) -> Result<f64, String> {
    match value {
        None => Ok(default),
        Some(v) if is_unit_interval(v) => Ok(v),
        Some(v) => Err(format!("{field} out of range: {v}")),
    }
}

fn skills(values: Vec<String>) -> BTreeSet<String> {
    values
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[derive(Debug, Deserialize)]
struct JobWire {
    required_skills: Option<Vec<String>>,
    #[serde(default)]
    preferred_skills: Option<Vec<String>>,
    #[serde(default)]
    experience_level: Option<String>,
    #[serde(default)]
    key_requirements: Option<Vec<String>>,
    #[serde(default)]
    analysis: Option<String>,
}

pub fn job(raw: &str, job_title: &str) -> Result<JobAnalysis, String> {
    let wire: JobWire = decode(raw)?;
    let required = wire
        .required_skills
        .ok_or_else(|| "missing required_skills".to_string())?;
    let defaults = fallback::job(job_title);

    Ok(JobAnalysis {
        job_title: job_title.to_string(),
        required_skills: skills(required),
        preferred_skills: wire
            .preferred_skills
            .map(skills)
            .unwrap_or(defaults.preferred_skills),
        experience_level: wire
            .experience_level
            .as_deref()
            .and_then(ExperienceLevel::parse)
            .unwrap_or(defaults.experience_level),
        key_requirements: wire.key_requirements.unwrap_or(defaults.key_requirements),
        analysis: wire.analysis.unwrap_or(defaults.analysis),
    })
}

#[derive(Debug, Deserialize)]
struct ResumeWire {
    skills: Option<Vec<String>>,
    #[serde(default)]
    experience_years: Option<f64>,
    #[serde(default)]
    experience_level: Option<String>,
    #[serde(default, alias = "key_achievements")]
    achievements: Option<Vec<String>>,
    #[serde(default)]
    analysis: Option<String>,
}

pub fn resume(raw: &str, candidate_name: &str) -> Result<ResumeAnalysis, String> {
    let wire: ResumeWire = decode(raw)?;
    let found = wire.skills.ok_or_else(|| "missing skills".to_string())?;
    let defaults = fallback::resume(candidate_name);

    let experience_years = match wire.experience_years {
        None => defaults.experience_years,
        Some(y) if y.is_finite() && y >= 0.0 && y <= f64::from(u32::MAX) => y.floor() as u32,
        Some(y) => return Err(format!("experience_years invalid: {y}")),
    };

    Ok(ResumeAnalysis {
        candidate_name: candidate_name.to_string(),
        skills: skills(found),
        experience_years,
        experience_level: wire
            .experience_level
            .as_deref()
            .and_then(ExperienceLevel::parse)
            .unwrap_or(defaults.experience_level),
        achievements: wire.achievements.unwrap_or(defaults.achievements),
        analysis: wire.analysis.unwrap_or(defaults.analysis),
    })
}

#[derive(Debug, Deserialize)]
struct IntersectionWire {
    overall_compatibility: Option<f64>,
    #[serde(default)]
    analysis: Option<String>,
    #[serde(default)]
    skill_matches: Option<Vec<String>>,
    #[serde(default)]
    skill_gaps: Option<Vec<String>>,
    #[serde(default)]
    experience_match: Option<String>,
}

pub fn intersection(raw: &str) -> Result<IntersectionAnalysis, String> {
    let wire: IntersectionWire = decode(raw)?;
    let score = wire
        .overall_compatibility
        .ok_or_else(|| "missing overall_compatibility".to_string())?;
    let defaults = fallback::intersection();

    Ok(IntersectionAnalysis {
        analysis: wire.analysis.unwrap_or(defaults.analysis),
        overall_compatibility: unit("overall_compatibility", Some(score), 0.0)?,
        skill_matches: wire.skill_matches.map(skills).unwrap_or(defaults.skill_matches),
        skill_gaps: wire.skill_gaps.map(skills).unwrap_or(defaults.skill_gaps),
        experience_match: wire
            .experience_match
            .as_deref()
            .and_then(ExperienceMatch::parse)
            .unwrap_or(defaults.experience_match),
    })
}

#[derive(Debug, Deserialize)]
struct TurnWire {
    argument: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    key_points: Option<Vec<String>>,
}

pub fn debate_turn(raw: &str, position: Position, round: u32) -> Result<DebateTurn, String> {
    let wire: TurnWire = decode(raw)?;
    let argument = wire
        .argument
        .filter(|a| !a.trim().is_empty())
        .ok_or_else(|| "missing argument".to_string())?;
    let defaults = fallback::debate_turn(position, round);

    Ok(DebateTurn {
        position,
        argument,
        confidence: unit("confidence", wire.confidence, defaults.confidence)?,
        key_points: wire.key_points.unwrap_or(defaults.key_points),
        round,
    })
}

/// Older prompts asked for a plain-text reasoning string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ReasoningWire {
    Structured {
        #[serde(default)]
        summary: Option<String>,
        #[serde(default)]
        pros: Vec<String>,
        #[serde(default)]
        cons: Vec<String>,
    },
    Text(String),
}

impl From<ReasoningWire> for Reasoning {
    fn from(wire: ReasoningWire) -> Self {
        match wire {
            ReasoningWire::Structured { summary, pros, cons } => Reasoning {
                summary: summary.unwrap_or_else(|| fallback::DECISION_DEFAULT_SUMMARY.to_string()),
                pros,
                cons,
            },
            ReasoningWire::Text(summary) => Reasoning {
                summary,
                pros: Vec::new(),
                cons: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct DecisionWire {
    decision: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    reasoning: Option<ReasoningWire>,
    #[serde(default)]
    key_factors: Option<Vec<String>>,
}

pub fn decision(raw: &str) -> Result<Decision, String> {
    let wire: DecisionWire = decode(raw)?;
    let label = wire.decision.ok_or_else(|| "missing decision".to_string())?;
    let outcome = Outcome::parse(&label).ok_or_else(|| format!("unknown decision: {label}"))?;

    Ok(Decision {
        outcome,
        confidence: unit("confidence", wire.confidence, fallback::DECISION_DEFAULT_CONFIDENCE)?,
        reasoning: wire.reasoning.map(Reasoning::from).unwrap_or_else(|| Reasoning {
            summary: fallback::DECISION_DEFAULT_SUMMARY.to_string(),
            pros: Vec::new(),
            cons: Vec::new(),
        }),
        key_factors: wire
            .key_factors
            .unwrap_or_else(|| vec![fallback::DECISION_DEFAULT_KEY_FACTOR.to_string()]),
    })
}
