//! Persistence contract for finished evaluations.
//!
//! The pipeline never talks to storage directly: it hands finished records
//! to an [`EvaluationStore`]. Every run that started produces an evaluation
//! record; runs whose decision confidence reaches
//! [`TOP_CANDIDATE_THRESHOLD`] are also promoted to the top-candidate
//! leaderboard unless the candidate is already listed for that job.

use std::collections::BTreeSet;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info};
use uuid::Uuid;

use crate::result::{FinalResult, RunStatus};
use crate::stage::{Decision, ExperienceLevel, ExperienceMatch, Position, Reasoning};

/// Minimum decision confidence for promotion.
pub const TOP_CANDIDATE_THRESHOLD: f64 = 0.85;

/// Minimum leaderboard score (confidence × 100) a store accepts.
pub const TOP_CANDIDATE_MIN_SCORE: f64 = 85.0;

pub type RecordId = String;

/// Errors from the storage collaborator.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PersistenceError {
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    #[error("record rejected: {0}")]
    Rejected(String),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// One row per evaluated candidate/job pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationRecord {
    pub run_id: Uuid,
    pub candidate_name: String,
    pub job_title: String,
    pub status: RunStatus,
    pub resume_summary: Option<String>,
    pub job_summary: Option<String>,
    pub intersection_score: Option<f64>,
    pub intersection_notes: Option<String>,
    pub pro_arguments: Vec<String>,
    pub anti_arguments: Vec<String>,
    /// `HIRE` or `NO_HIRE`.
    pub decision: String,
    pub confidence: f64,
    pub reasoning: Reasoning,
    pub key_factors: Vec<String>,
}

impl EvaluationRecord {
    pub fn from_result(result: &FinalResult) -> Self {
        let arguments = |side| {
            result
                .arguments(side)
                .map(|t| t.argument.clone())
                .collect::<Vec<_>>()
        };
        Self {
            run_id: result.run_id,
            candidate_name: result.candidate_name.clone(),
            job_title: result.job_title.clone(),
            status: result.status,
            resume_summary: result.resume_analysis.as_ref().map(|r| r.analysis.clone()),
            job_summary: result.job_analysis.as_ref().map(|j| j.analysis.clone()),
            intersection_score: result
                .intersection_analysis
                .as_ref()
                .map(|i| i.overall_compatibility),
            intersection_notes: result.intersection_analysis.as_ref().map(|i| i.analysis.clone()),
            pro_arguments: arguments(Position::Pro),
            anti_arguments: arguments(Position::Anti),
            decision: result.decision.outcome.as_record_label().to_string(),
            confidence: result.decision.confidence,
            reasoning: result.decision.reasoning.clone(),
            key_factors: result.decision.key_factors.clone(),
        }
    }
}

/// Leaderboard entry for a strong candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopCandidateRecord {
    pub candidate_name: String,
    pub job_title: String,
    pub position: String,
    /// Decision confidence on a 0–100 scale.
    pub overall_score: f64,
    pub confidence: f64,
    pub decision: String,
    pub summary: String,
    /// Key points raised by the pro side.
    pub strengths: Vec<String>,
    /// Key points raised by the anti side.
    pub concerns: Vec<String>,
    pub key_factors: Vec<String>,
    pub skill_matches: BTreeSet<String>,
    pub skill_gaps: BTreeSet<String>,
    pub experience_match: Option<ExperienceMatch>,
    pub intersection_analysis: Option<String>,
    pub experience_years: Option<u32>,
    pub experience_level: Option<ExperienceLevel>,
    pub achievements: Vec<String>,
    pub evaluation_id: RecordId,
}

impl TopCandidateRecord {
    pub fn from_result(result: &FinalResult, evaluation_id: &str) -> Self {
        let points = |side| {
            result
                .arguments(side)
                .flat_map(|t| t.key_points.iter().cloned())
                .collect::<Vec<_>>()
        };
        let intersection = result.intersection_analysis.as_ref();
        let resume = result.resume_analysis.as_ref();

        Self {
            candidate_name: result.candidate_name.clone(),
            job_title: result.job_title.clone(),
            position: result.job_title.clone(),
            overall_score: result.decision.score_percent(),
            confidence: result.decision.confidence,
            decision: result.decision.outcome.as_record_label().to_string(),
            summary: result.decision.reasoning.summary.clone(),
            strengths: points(Position::Pro),
            concerns: points(Position::Anti),
            key_factors: result.decision.key_factors.clone(),
            skill_matches: intersection.map(|i| i.skill_matches.clone()).unwrap_or_default(),
            skill_gaps: intersection.map(|i| i.skill_gaps.clone()).unwrap_or_default(),
            experience_match: intersection.map(|i| i.experience_match),
            intersection_analysis: intersection.map(|i| i.analysis.clone()),
            experience_years: resume.map(|r| r.experience_years),
            experience_level: resume.map(|r| r.experience_level),
            achievements: resume.map(|r| r.achievements.clone()).unwrap_or_default(),
            evaluation_id: evaluation_id.to_string(),
        }
    }
}

/// Whether a decision is strong enough for the leaderboard.
pub fn qualifies_for_top_candidate(decision: &Decision) -> bool {
    decision.confidence >= TOP_CANDIDATE_THRESHOLD
}

/// Storage collaborator. Must tolerate concurrent calls from independent runs.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EvaluationStore: Send + Sync {
    async fn create_evaluation(&self, record: &EvaluationRecord) -> Result<RecordId, PersistenceError>;

    async fn top_candidate_exists(
        &self,
        candidate_name: &str,
        job_title: &str,
    ) -> Result<bool, PersistenceError>;

    /// Insert unless the (candidate, job) pair is already listed. The
    /// existence check and the insert must be atomic; `Ok(None)` means
    /// another run got there first.
    async fn create_top_candidate(
        &self,
        record: &TopCandidateRecord,
    ) -> Result<Option<RecordId>, PersistenceError>;
}

/// What happened to the leaderboard during persistence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "id", rename_all = "snake_case")]
pub enum TopCandidateOutcome {
    NotQualified,
    AlreadyListed,
    Created(RecordId),
}

/// Ids written by one persistence step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistReceipt {
    pub evaluation_id: RecordId,
    pub top_candidate: TopCandidateOutcome,
}

/// Write the evaluation record, then promote to the leaderboard if eligible.
pub async fn persist(
    store: &dyn EvaluationStore,
    result: &FinalResult,
) -> Result<PersistReceipt, PersistenceError> {
    let record = EvaluationRecord::from_result(result);
    let evaluation_id = store.create_evaluation(&record).await?;
    debug!(run_id = %result.run_id, evaluation_id = %evaluation_id, "Evaluation record stored");

    if !qualifies_for_top_candidate(&result.decision) {
        return Ok(PersistReceipt {
            evaluation_id,
            top_candidate: TopCandidateOutcome::NotQualified,
        });
    }

    let already_listed = PersistReceipt {
        evaluation_id: evaluation_id.clone(),
        top_candidate: TopCandidateOutcome::AlreadyListed,
    };
    if store
        .top_candidate_exists(&result.candidate_name, &result.job_title)
        .await?
    {
        info!(
            candidate = %result.candidate_name,
            job_title = %result.job_title,
            "Top candidate already listed, skipping"
        );
        return Ok(already_listed);
    }

    let top = TopCandidateRecord::from_result(result, &evaluation_id);
    match store.create_top_candidate(&top).await? {
        Some(id) => {
            info!(
                candidate = %result.candidate_name,
                score = top.overall_score,
                "Top candidate recorded"
            );
            Ok(PersistReceipt {
                evaluation_id,
                top_candidate: TopCandidateOutcome::Created(id),
            })
        }
        None => {
            info!(
                candidate = %result.candidate_name,
                job_title = %result.job_title,
                "Top candidate listed by a concurrent run"
            );
            Ok(already_listed)
        }
    }
}

#[derive(Debug, Default)]
struct Tables {
    evaluations: Vec<(RecordId, EvaluationRecord)>,
    top_candidates: Vec<(RecordId, TopCandidateRecord)>,
}

/// Process-local store, for tests and dry runs.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn evaluations(&self) -> Vec<EvaluationRecord> {
        let tables = self.tables.lock().await;
        tables.evaluations.iter().map(|(_, r)| r.clone()).collect()
    }

    /// Leaderboard entries at or above `min_score`, best first.
    pub async fn top_candidates(&self, min_score: f64) -> Vec<TopCandidateRecord> {
        let tables = self.tables.lock().await;
        let mut out: Vec<_> = tables
            .top_candidates
            .iter()
            .map(|(_, r)| r.clone())
            .filter(|r| r.overall_score >= min_score)
            .collect();
        out.sort_by(|a, b| b.overall_score.total_cmp(&a.overall_score));
        out
    }
}

#[async_trait]
impl EvaluationStore for InMemoryStore {
    async fn create_evaluation(&self, record: &EvaluationRecord) -> Result<RecordId, PersistenceError> {
        let id = Uuid::new_v4().to_string();
        self.tables
            .lock()
            .await
            .evaluations
            .push((id.clone(), record.clone()));
        Ok(id)
    }

    async fn top_candidate_exists(
        &self,
        candidate_name: &str,
        job_title: &str,
    ) -> Result<bool, PersistenceError> {
        let tables = self.tables.lock().await;
        Ok(tables
            .top_candidates
            .iter()
            .any(|(_, r)| r.candidate_name == candidate_name && r.job_title == job_title))
    }

    async fn create_top_candidate(
        &self,
        record: &TopCandidateRecord,
    ) -> Result<Option<RecordId>, PersistenceError> {
        if record.overall_score < TOP_CANDIDATE_MIN_SCORE {
            return Err(PersistenceError::Rejected(format!(
                "overall score must be >= {}, got {}",
                TOP_CANDIDATE_MIN_SCORE, record.overall_score
            )));
        }
        let mut tables = self.tables.lock().await;
        if tables.top_candidates.iter().any(|(_, r)| {
            r.candidate_name == record.candidate_name && r.job_title == record.job_title
        }) {
            return Ok(None);
        }
        let id = Uuid::new_v4().to_string();
        tables.top_candidates.push((id.clone(), record.clone()));
        Ok(Some(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::TranscriptEntry;
    use crate::stage::{fallback, Outcome};
    use mockall::predicate::eq;
    use std::sync::Arc;

    fn result_with_confidence(confidence: f64) -> FinalResult {
        let mut decision = fallback::decision();
        decision.outcome = Outcome::Hire;
        decision.confidence = confidence;
        FinalResult {
            run_id: Uuid::new_v4(),
            candidate_name: "Ada".to_string(),
            job_title: "Backend Engineer".to_string(),
            status: RunStatus::Complete,
            job_analysis: Some(fallback::job("Backend Engineer")),
            resume_analysis: Some(fallback::resume("Ada")),
            intersection_analysis: Some(fallback::intersection()),
            debate: vec![
                fallback::debate_turn(Position::Pro, 1),
                fallback::debate_turn(Position::Anti, 1),
            ],
            decision,
            transcript: Vec::<TranscriptEntry>::new(),
            fallbacks_used: 0,
        }
    }

    #[test]
    fn test_evaluation_record_contents() {
        let record = EvaluationRecord::from_result(&result_with_confidence(0.9));
        assert_eq!(record.decision, "HIRE");
        assert_eq!(record.intersection_score, Some(0.7));
        assert_eq!(record.pro_arguments, vec![fallback::PRO_FALLBACK_ARGUMENT.to_string()]);
        assert_eq!(record.anti_arguments, vec![fallback::ANTI_FALLBACK_ARGUMENT.to_string()]);
    }

    #[test]
    fn test_top_candidate_strengths_and_concerns() {
        let record = TopCandidateRecord::from_result(&result_with_confidence(0.9), "eval-1");
        assert!((record.overall_score - 90.0).abs() < 1e-9);
        assert_eq!(record.position, "Backend Engineer");
        assert_eq!(record.strengths, vec!["Technical skills", "Experience level"]);
        assert_eq!(record.concerns, vec!["Missing skills", "Experience concerns"]);
        assert_eq!(record.evaluation_id, "eval-1");
        assert_eq!(record.experience_years, Some(3));
    }

    #[tokio::test]
    async fn test_below_threshold_skips_leaderboard() {
        let mut store = MockEvaluationStore::new();
        store
            .expect_create_evaluation()
            .times(1)
            .returning(|_| Ok("eval-1".to_string()));
        store.expect_top_candidate_exists().times(0);
        store.expect_create_top_candidate().times(0);

        let receipt = persist(&store, &result_with_confidence(0.84)).await.unwrap();
        assert_eq!(receipt.top_candidate, TopCandidateOutcome::NotQualified);
    }

    #[tokio::test]
    async fn test_existing_top_candidate_not_duplicated() {
        let mut store = MockEvaluationStore::new();
        store
            .expect_create_evaluation()
            .returning(|_| Ok("eval-1".to_string()));
        store
            .expect_top_candidate_exists()
            .with(eq("Ada"), eq("Backend Engineer"))
            .times(1)
            .returning(|_, _| Ok(true));
        store.expect_create_top_candidate().times(0);

        let receipt = persist(&store, &result_with_confidence(0.9)).await.unwrap();
        assert_eq!(receipt.top_candidate, TopCandidateOutcome::AlreadyListed);
    }

    #[tokio::test]
    async fn test_qualifying_run_promoted() {
        let mut store = MockEvaluationStore::new();
        store
            .expect_create_evaluation()
            .returning(|_| Ok("eval-1".to_string()));
        store
            .expect_top_candidate_exists()
            .returning(|_, _| Ok(false));
        store
            .expect_create_top_candidate()
            .withf(|r| r.evaluation_id == "eval-1" && r.overall_score >= 85.0)
            .times(1)
            .returning(|_| Ok(Some("top-1".to_string())));

        let receipt = persist(&store, &result_with_confidence(0.85)).await.unwrap();
        assert_eq!(receipt.evaluation_id, "eval-1");
        assert_eq!(receipt.top_candidate, TopCandidateOutcome::Created("top-1".to_string()));
    }

    #[tokio::test]
    async fn test_lost_insert_race_reported_as_listed() {
        let mut store = MockEvaluationStore::new();
        store
            .expect_create_evaluation()
            .returning(|_| Ok("eval-2".to_string()));
        store
            .expect_top_candidate_exists()
            .returning(|_, _| Ok(false));
        store
            .expect_create_top_candidate()
            .times(1)
            .returning(|_| Ok(None));

        let receipt = persist(&store, &result_with_confidence(0.9)).await.unwrap();
        assert_eq!(receipt.evaluation_id, "eval-2");
        assert_eq!(receipt.top_candidate, TopCandidateOutcome::AlreadyListed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_promotions_list_once() {
        let store = Arc::new(InMemoryStore::new());
        let result = Arc::new(result_with_confidence(0.95));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                let result = Arc::clone(&result);
                tokio::spawn(async move { persist(store.as_ref(), &result).await })
            })
            .collect();

        let mut created = 0;
        for handle in handles {
            if let TopCandidateOutcome::Created(_) = handle.await.unwrap().unwrap().top_candidate {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        assert_eq!(store.evaluations().await.len(), 8);
        assert_eq!(store.top_candidates(0.0).await.len(), 1);
    }

    #[tokio::test]
    async fn test_storage_error_propagates() {
        let mut store = MockEvaluationStore::new();
        store
            .expect_create_evaluation()
            .returning(|_| Err(PersistenceError::Unavailable("down".to_string())));

        let err = persist(&store, &result_with_confidence(0.9)).await.unwrap_err();
        assert_eq!(err, PersistenceError::Unavailable("down".to_string()));
    }

    #[tokio::test]
    async fn test_in_memory_store_rejects_low_score() {
        let store = InMemoryStore::new();
        let mut record = TopCandidateRecord::from_result(&result_with_confidence(0.5), "eval-1");
        record.overall_score = 50.0;
        assert!(matches!(
            store.create_top_candidate(&record).await,
            Err(PersistenceError::Rejected(_))
        ));
        assert!(store.top_candidates(0.0).await.is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_round_trip() {
        let store = InMemoryStore::new();
        let result = result_with_confidence(0.95);
        persist(&store, &result).await.unwrap();
        let second = persist(&store, &result).await.unwrap();

        assert_eq!(store.evaluations().await.len(), 2);
        assert_eq!(store.top_candidates(85.0).await.len(), 1);
        assert_eq!(second.top_candidate, TopCandidateOutcome::AlreadyListed);
    }
}
