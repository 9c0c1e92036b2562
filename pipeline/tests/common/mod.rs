//! Scripted language model shared by the integration tests.
//!
//! Routes each prompt to a canned reply by recognising the stage template,
//! and records every prompt it saw.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hiring_pipeline::{LanguageModel, ModelError};

/// How the model answers one stage.
#[derive(Debug, Clone)]
pub enum Reply {
    Text(String),
    Fail,
    Hang,
}

impl Reply {
    pub fn json(value: serde_json::Value) -> Self {
        Self::Text(value.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Job,
    Resume,
    Intersection,
    Pro,
    Anti,
    Decision,
}

fn route(prompt: &str) -> Option<Route> {
    if prompt.contains("Analyze the following job description") {
        Some(Route::Job)
    } else if prompt.contains("Analyze the following resume") {
        Some(Route::Resume)
    } else if prompt.contains("Evaluate the intersection") {
        Some(Route::Intersection)
    } else if prompt.contains("You are a pro-hire advocate") {
        Some(Route::Pro)
    } else if prompt.contains("You are an anti-hire advocate") {
        Some(Route::Anti)
    } else if prompt.contains("final decision maker") {
        Some(Route::Decision)
    } else {
        None
    }
}

pub struct ScriptedModel {
    pub job: Reply,
    pub resume: Reply,
    pub intersection: Reply,
    pub pro: Reply,
    pub anti: Reply,
    pub decision: Reply,
    seen: Mutex<Vec<(Route, String)>>,
}

impl ScriptedModel {
    /// A model that answers every stage well: the Backend Engineer hire.
    pub fn backend_engineer_hire() -> Self {
        Self {
            job: Reply::json(serde_json::json!({
                "required_skills": ["Python", "SQL"],
                "preferred_skills": ["AWS"],
                "experience_level": "Mid-level",
                "key_requirements": ["Build REST APIs", "Own the database schema"],
                "analysis": "Backend role centred on Python services and SQL."
            })),
            resume: Reply::json(serde_json::json!({
                "skills": ["Python", "SQL", "AWS"],
                "experience_years": 5,
                "experience_level": "Senior",
                "key_achievements": ["Migrated monolith to services"],
                "analysis": "Experienced backend engineer."
            })),
            intersection: Reply::json(serde_json::json!({
                "analysis": "All required skills present, plus AWS.",
                "overall_compatibility": 0.9,
                "skill_matches": ["Python", "SQL"],
                "skill_gaps": [],
                "experience_match": "excellent"
            })),
            pro: Reply::json(serde_json::json!({
                "argument": "Covers every required skill with five years of practice",
                "confidence": 0.9,
                "key_points": ["Python and SQL", "AWS bonus"]
            })),
            anti: Reply::json(serde_json::json!({
                "argument": "No evidence of on-call ownership",
                "confidence": 0.3,
                "key_points": ["On-call experience unclear"]
            })),
            decision: Reply::json(serde_json::json!({
                "decision": "hire",
                "confidence": 0.9,
                "reasoning": {
                    "summary": "Strong match on every required skill.",
                    "pros": ["Python", "SQL", "AWS"],
                    "cons": ["On-call experience unclear"]
                },
                "key_factors": ["Skill match", "Experience"]
            })),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn with(mut self, route: Route, reply: Reply) -> Self {
        match route {
            Route::Job => self.job = reply,
            Route::Resume => self.resume = reply,
            Route::Intersection => self.intersection = reply,
            Route::Pro => self.pro = reply,
            Route::Anti => self.anti = reply,
            Route::Decision => self.decision = reply,
        }
        self
    }

    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn calls(&self, route: Route) -> usize {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| *r == route)
            .count()
    }

    pub fn prompts(&self, route: Route) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| *r == route)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn query(&self, prompt: &str) -> Result<String, ModelError> {
        let route = route(prompt).ok_or_else(|| ModelError::ParseError("unknown prompt".into()))?;
        self.seen.lock().unwrap().push((route, prompt.to_string()));

        let reply = match route {
            Route::Job => &self.job,
            Route::Resume => &self.resume,
            Route::Intersection => &self.intersection,
            Route::Pro => &self.pro,
            Route::Anti => &self.anti,
            Route::Decision => &self.decision,
        };
        match reply.clone() {
            Reply::Text(text) => Ok(text),
            Reply::Fail => Err(ModelError::Api {
                status: 503,
                body: "service unavailable".into(),
            }),
            Reply::Hang => std::future::pending().await,
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
