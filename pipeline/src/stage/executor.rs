//! Stage executor: one language-model call per stage, never raising.

use std::sync::Arc;

use tracing::{debug, warn};

use super::fallback;
use super::model::LanguageModel;
use super::parse;
use super::prompts;
use super::request::{
    DebateRequest, DecisionRequest, StageData, StageFailure, StageKind, StageRequest, StageResult,
};
use super::types::{Decision, DebateTurn, IntersectionAnalysis, JobAnalysis, ResumeAnalysis};

/// Wraps a [`LanguageModel`] with prompt rendering, parsing and fallbacks.
///
/// Cheap to clone; clones share the model client.
#[derive(Clone)]
pub struct StageExecutor {
    model: Arc<dyn LanguageModel>,
}

impl std::fmt::Debug for StageExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageExecutor")
            .field("model", &self.model.name())
            .finish()
    }
}

impl StageExecutor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Run any stage request.
    pub async fn execute(&self, request: StageRequest) -> StageResult<StageData> {
        match request {
            StageRequest::ParseJob {
                job_title,
                job_description,
            } => self
                .parse_job(&job_title, &job_description)
                .await
                .map(StageData::Job),
            StageRequest::ParseResume {
                candidate_name,
                resume_text,
            } => self
                .parse_resume(&candidate_name, &resume_text)
                .await
                .map(StageData::Resume),
            StageRequest::Intersect { job, resume } => {
                self.intersect(&job, &resume).await.map(StageData::Intersection)
            }
            StageRequest::Debate(req) => self.debate_turn(&req).await.map(StageData::Turn),
            StageRequest::Decide(req) => self.decide(&req).await.map(StageData::Decision),
        }
    }

    pub async fn parse_job(&self, job_title: &str, job_description: &str) -> StageResult<JobAnalysis> {
        let prompt = prompts::job_prompt(job_title, job_description);
        self.call(StageKind::JobParse, &prompt, |raw| parse::job(raw, job_title), || {
            fallback::job(job_title)
        })
        .await
    }

    pub async fn parse_resume(
        &self,
        candidate_name: &str,
        resume_text: &str,
    ) -> StageResult<ResumeAnalysis> {
        let prompt = prompts::resume_prompt(candidate_name, resume_text);
        self.call(
            StageKind::ResumeParse,
            &prompt,
            |raw| parse::resume(raw, candidate_name),
            || fallback::resume(candidate_name),
        )
        .await
    }

    pub async fn intersect(
        &self,
        job: &JobAnalysis,
        resume: &ResumeAnalysis,
    ) -> StageResult<IntersectionAnalysis> {
        let prompt = prompts::intersection_prompt(job, resume);
        self.call(StageKind::Intersection, &prompt, parse::intersection, fallback::intersection)
            .await
    }

    pub async fn debate_turn(&self, req: &DebateRequest) -> StageResult<DebateTurn> {
        let prompt = prompts::debate_prompt(req);
        self.call(
            StageKind::DebateTurn,
            &prompt,
            |raw| parse::debate_turn(raw, req.position, req.round),
            || fallback::debate_turn(req.position, req.round),
        )
        .await
    }

    pub async fn decide(&self, req: &DecisionRequest) -> StageResult<Decision> {
        let prompt = prompts::decision_prompt(req);
        self.call(StageKind::Decision, &prompt, parse::decision, fallback::decision)
            .await
    }

    async fn call<T>(
        &self,
        kind: StageKind,
        prompt: &str,
        parse: impl FnOnce(&str) -> Result<T, String>,
        fallback: impl FnOnce() -> T,
    ) -> StageResult<T> {
        let raw = match self.model.query(prompt).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!(stage = %kind, model = self.model.name(), error = %e, "Stage call failed, using fallback");
                return StageResult::fallback(fallback(), StageFailure::Upstream(e.to_string()));
            }
        };

        match parse(&raw) {
            Ok(data) => {
                debug!(stage = %kind, "Stage response parsed");
                StageResult::parsed(data)
            }
            Err(reason) => {
                warn!(stage = %kind, reason = %reason, "Unparsable stage response, using fallback");
                StageResult::fallback(fallback(), StageFailure::Unparsable(reason))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stage::model::ModelError;
    use crate::stage::types::{Outcome, Position};
    use async_trait::async_trait;

    struct Canned(Result<String, ModelError>);

    #[async_trait]
    impl LanguageModel for Canned {
        async fn query(&self, _prompt: &str) -> Result<String, ModelError> {
            self.0.clone()
        }
    }

    fn executor(reply: Result<&str, ModelError>) -> StageExecutor {
        StageExecutor::new(Arc::new(Canned(reply.map(str::to_string))))
    }

    #[tokio::test]
    async fn test_parsed_job() {
        let exec = executor(Ok(r#"{"required_skills": ["Python", "SQL"], "analysis": "ok"}"#));
        let result = exec.parse_job("Backend Engineer", "...").await;
        assert!(result.ok());
        assert!(result.failure.is_none());
        assert_eq!(result.data.required_skills.len(), 2);
    }

    #[tokio::test]
    async fn test_upstream_error_uses_fallback() {
        let exec = executor(Err(ModelError::Api {
            status: 503,
            body: "unavailable".to_string(),
        }));
        let result = exec.intersect(&fallback::job("x"), &fallback::resume("y")).await;
        assert!(result.used_fallback);
        assert!(matches!(result.failure, Some(StageFailure::Upstream(_))));
        assert_eq!(result.data, fallback::intersection());
    }

    #[tokio::test]
    async fn test_garbage_uses_fallback() {
        let exec = executor(Ok("I cannot help with that."));
        let req = DebateRequest {
            position: Position::Anti,
            round: 2,
            previous_argument: String::new(),
            intersection: fallback::intersection(),
        };
        let result = exec.debate_turn(&req).await;
        assert!(result.used_fallback);
        assert!(matches!(result.failure, Some(StageFailure::Unparsable(_))));
        assert_eq!(result.data, fallback::debate_turn(Position::Anti, 2));
    }

    #[tokio::test]
    async fn test_fallback_text_from_model_is_not_a_failure() {
        let exec = executor(Ok(r#"{"argument": "Candidate has significant skill gaps"}"#));
        let req = DebateRequest {
            position: Position::Anti,
            round: 1,
            previous_argument: "Great".to_string(),
            intersection: fallback::intersection(),
        };
        assert!(exec.debate_turn(&req).await.ok());
    }

    #[tokio::test]
    async fn test_execute_dispatches_by_kind() {
        let exec = executor(Ok(r#"{"decision": "hire", "confidence": 0.9}"#));
        let req = StageRequest::Decide(DecisionRequest {
            pro_arguments: Vec::new(),
            anti_arguments: Vec::new(),
            intersection: fallback::intersection(),
            candidate_name: "Ada".to_string(),
            job_title: "Backend Engineer".to_string(),
        });
        assert_eq!(req.kind(), StageKind::Decision);
        match exec.execute(req).await.data {
            StageData::Decision(d) => assert_eq!(d.outcome, Outcome::Hire),
            other => panic!("unexpected stage data: {:?}", other),
        }
    }
}
