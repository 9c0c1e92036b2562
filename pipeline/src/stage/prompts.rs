//! Prompt templates for each stage kind.
//!
//! Every template ends with an explicit JSON schema so the parser has a
//! single shape to look for.

use std::collections::BTreeSet;

use super::request::{DebateRequest, DecisionRequest, StageRequest};
use super::types::{DebateTurn, IntersectionAnalysis, JobAnalysis, Position, ResumeAnalysis};

const JSON_ONLY: &str = "Respond with ONLY a JSON object in this exact format:";

/// Render the prompt for any stage request.
pub fn render(request: &StageRequest) -> String {
    match request {
        StageRequest::ParseJob {
            job_title,
            job_description,
        } => job_prompt(job_title, job_description),
        StageRequest::ParseResume {
            candidate_name,
            resume_text,
        } => resume_prompt(candidate_name, resume_text),
        StageRequest::Intersect { job, resume } => intersection_prompt(job, resume),
        StageRequest::Debate(req) => debate_prompt(req),
        StageRequest::Decide(req) => decision_prompt(req),
    }
}

fn joined(items: &BTreeSet<String>) -> String {
    items.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

pub fn job_prompt(job_title: &str, job_description: &str) -> String {
    format!(
        "Analyze the following job description and extract key information.\n\n\
         Job Title: {job_title}\n\
         Job Description:\n{job_description}\n\n\
         Extract and analyze:\n\
         1. Required skills (must-have technical skills)\n\
         2. Preferred skills (nice-to-have skills)\n\
         3. Experience level (Junior, Mid-level, Senior)\n\
         4. Key requirements and responsibilities\n\n\
         {JSON_ONLY}\n\
         {{\n  \"required_skills\": [\"skill1\", \"skill2\"],\n  \
         \"preferred_skills\": [\"skill3\", \"skill4\"],\n  \
         \"experience_level\": \"<Junior/Mid-level/Senior>\",\n  \
         \"key_requirements\": [\"req1\", \"req2\"],\n  \
         \"analysis\": \"<brief analysis of the job requirements>\"\n}}\n"
    )
}

pub fn resume_prompt(candidate_name: &str, resume_text: &str) -> String {
    format!(
        "Analyze the following resume and extract key information.\n\n\
         Candidate Name: {candidate_name}\n\
         Resume Content:\n{resume_text}\n\n\
         Extract and analyze:\n\
         1. Technical skills (programming languages, frameworks, tools)\n\
         2. Years of experience\n\
         3. Experience level (Junior, Mid-level, Senior)\n\
         4. Key achievements and accomplishments\n\n\
         {JSON_ONLY}\n\
         {{\n  \"skills\": [\"skill1\", \"skill2\", \"skill3\"],\n  \
         \"experience_years\": <number>,\n  \
         \"experience_level\": \"<Junior/Mid-level/Senior>\",\n  \
         \"key_achievements\": [\"achievement1\", \"achievement2\"],\n  \
         \"analysis\": \"<brief analysis of the candidate's profile>\"\n}}\n"
    )
}

pub fn intersection_prompt(job: &JobAnalysis, resume: &ResumeAnalysis) -> String {
    format!(
        "Evaluate the intersection between job requirements and candidate profile.\n\n\
         Job Analysis:\n{}\n\
         Required Skills: {}\n\
         Preferred Skills: {}\n\
         Experience Level: {}\n\n\
         Resume Analysis:\n{}\n\
         Skills: {}\n\
         Experience: {} years ({})\n\n\
         Evaluate:\n\
         1. Skill matches and gaps\n\
         2. Experience level compatibility\n\
         3. Overall compatibility score (0.0 to 1.0)\n\n\
         {JSON_ONLY}\n\
         {{\n  \"analysis\": \"<detailed analysis of the intersection>\",\n  \
         \"overall_compatibility\": <0.0 to 1.0>,\n  \
         \"skill_matches\": [\"match1\", \"match2\"],\n  \
         \"skill_gaps\": [\"gap1\", \"gap2\"],\n  \
         \"experience_match\": \"<excellent/good/fair/poor>\"\n}}\n",
        job.analysis,
        joined(&job.required_skills),
        joined(&job.preferred_skills),
        job.experience_level,
        resume.analysis,
        joined(&resume.skills),
        resume.experience_years,
        resume.experience_level,
    )
}

fn intersection_summary(intersection: &IntersectionAnalysis) -> String {
    format!(
        "Intersection Analysis:\n{}\n\
         Overall Compatibility: {}\n\
         Skill Matches: {}\n\
         Skill Gaps: {}\n",
        intersection.analysis,
        intersection.overall_compatibility,
        joined(&intersection.skill_matches),
        joined(&intersection.skill_gaps),
    )
}

pub fn debate_prompt(req: &DebateRequest) -> String {
    let (stance, opponent_label, focus) = match req.position {
        Position::Pro => (
            "You are a pro-hire advocate. Build a compelling argument for hiring this candidate.",
            "Previous Anti-Hire Argument",
            "Focus on the candidate's strengths and how they outweigh any concerns.",
        ),
        Position::Anti => (
            "You are an anti-hire advocate. Build a compelling argument against hiring this candidate.",
            "Previous Pro-Hire Argument",
            "Focus on the candidate's weaknesses and potential risks.",
        ),
    };
    let previous = if req.previous_argument.is_empty() {
        "(none yet, you are opening the debate)"
    } else {
        req.previous_argument.as_str()
    };

    format!(
        "{stance}\n\n\
         {}\n\
         {opponent_label}: {previous}\n\n\
         Build a strong {}-hire argument for round {}.\n\
         {focus}\n\n\
         {JSON_ONLY}\n\
         {{\n  \"argument\": \"<your {}-hire argument>\",\n  \
         \"confidence\": <0.0 to 1.0>,\n  \
         \"key_points\": [\"point1\", \"point2\", \"point3\"]\n}}\n",
        intersection_summary(&req.intersection),
        req.position,
        req.round,
        req.position,
    )
}

fn rounds(turns: &[DebateTurn]) -> String {
    if turns.is_empty() {
        return "(no arguments)".to_string();
    }
    turns
        .iter()
        .map(|t| format!("Round {}: {}", t.round, t.argument))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn decision_prompt(req: &DecisionRequest) -> String {
    format!(
        "You are the final decision maker for a hiring decision on {} for the role of {}. \
         Evaluate all the arguments and make a final decision.\n\n\
         Intersection Analysis:\n{}\n\
         Overall Compatibility: {}\n\n\
         Pro-Hire Arguments:\n{}\n\n\
         Anti-Hire Arguments:\n{}\n\n\
         Evaluate the strength of each side's arguments and make a final decision.\n\
         Consider:\n\
         1. Which side made stronger arguments\n\
         2. The overall compatibility score\n\
         3. The confidence levels of each argument\n\
         4. The key factors that matter most for this role\n\n\
         {JSON_ONLY} The reasoning MUST be broken down into a summary \
         and lists of pros and cons.\n\
         {{\n  \"decision\": \"<hire/no_hire>\",\n  \
         \"confidence\": <0.0 to 1.0>,\n  \
         \"reasoning\": {{\n    \"summary\": \"<overall explanation>\",\n    \
         \"pros\": [\"pro1\", \"pro2\"],\n    \
         \"cons\": [\"con1\", \"con2\"]\n  }},\n  \
         \"key_factors\": [\"factor1\", \"factor2\", \"factor3\"]\n}}\n",
        req.candidate_name,
        req.job_title,
        req.intersection.analysis,
        req.intersection.overall_compatibility,
        rounds(&req.pro_arguments),
        rounds(&req.anti_arguments),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::fallback;

    #[test]
    fn test_job_prompt_embeds_inputs() {
        let prompt = job_prompt("Backend Engineer", "Build APIs in Rust");
        assert!(prompt.contains("Job Title: Backend Engineer"));
        assert!(prompt.contains("Build APIs in Rust"));
        assert!(prompt.contains("\"required_skills\""));
    }

    #[test]
    fn test_debate_prompt_quotes_opponent() {
        let req = DebateRequest {
            position: Position::Anti,
            round: 2,
            previous_argument: "Strong Rust background".to_string(),
            intersection: fallback::intersection(),
        };
        let prompt = debate_prompt(&req);
        assert!(prompt.contains("anti-hire advocate"));
        assert!(prompt.contains("Previous Pro-Hire Argument: Strong Rust background"));
        assert!(prompt.contains("round 2"));
    }

    #[test]
    fn test_opening_turn_has_placeholder() {
        let req = DebateRequest {
            position: Position::Pro,
            round: 1,
            previous_argument: String::new(),
            intersection: fallback::intersection(),
        };
        assert!(debate_prompt(&req).contains("opening the debate"));
    }

    #[test]
    fn test_decision_prompt_lists_rounds() {
        let req = DecisionRequest {
            pro_arguments: vec![
                fallback::debate_turn(Position::Pro, 1),
                fallback::debate_turn(Position::Pro, 2),
            ],
            anti_arguments: vec![fallback::debate_turn(Position::Anti, 1)],
            intersection: fallback::intersection(),
            candidate_name: "Ada".to_string(),
            job_title: "Backend Engineer".to_string(),
        };
        let prompt = decision_prompt(&req);
        assert!(prompt.contains(&format!("Round 2: {}", fallback::PRO_FALLBACK_ARGUMENT)));
        assert!(prompt.contains(&format!("Round 1: {}", fallback::ANTI_FALLBACK_ARGUMENT)));
        assert!(prompt.contains("\"summary\""));
    }
}
