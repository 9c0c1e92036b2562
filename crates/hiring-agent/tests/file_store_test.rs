//! FileStore against a real directory, driven through the pipeline.

use std::sync::Arc;

use async_trait::async_trait;
use hiring_agent::FileStore;
use hiring_pipeline::{
    persist, EvaluationStore, LanguageModel, ModelError, Orchestrator, Outcome, PersistenceError,
    RunStatus, TopCandidateOutcome,
};
use serde_json::json;

/// Answers every stage with a strong hire.
struct HireModel;

#[async_trait]
impl LanguageModel for HireModel {
    async fn query(&self, prompt: &str) -> Result<String, ModelError> {
        let reply = if prompt.contains("Analyze the following job description") {
            json!({"required_skills": ["Rust"], "analysis": "Systems role."})
        } else if prompt.contains("Analyze the following resume") {
            json!({"skills": ["Rust", "Tokio"], "experience_years": 6, "analysis": "Solid."})
        } else if prompt.contains("Evaluate the intersection") {
            json!({"analysis": "Good fit.", "overall_compatibility": 0.92, "skill_matches": ["Rust"]})
        } else if prompt.contains("final decision maker") {
            json!({
                "decision": "hire",
                "confidence": 0.91,
                "reasoning": {"summary": "Clear fit.", "pros": ["Rust"], "cons": []},
                "key_factors": ["Rust depth"]
            })
        } else {
            json!({"argument": "Six years of production Rust", "confidence": 0.8, "key_points": ["Rust"]})
        };
        Ok(reply.to_string())
    }

    fn name(&self) -> &str {
        "hire"
    }
}

async fn hire_result() -> hiring_pipeline::FinalResult {
    Orchestrator::new(Arc::new(HireModel))
        .run("Rust engineer, 6 years", "We need Rust", "Grace Hopper", "Systems Engineer")
        .await
}

#[tokio::test]
async fn test_hire_is_written_to_both_files() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("records"));

    let result = hire_result().await;
    assert_eq!(result.status, RunStatus::Complete);
    assert_eq!(result.decision.outcome, Outcome::Hire);

    let receipt = persist(&store, &result).await.unwrap();
    assert!(matches!(receipt.top_candidate, TopCandidateOutcome::Created(_)));

    let evaluations = store.evaluations().await.unwrap();
    assert_eq!(evaluations.len(), 1);
    assert_eq!(evaluations[0].id, receipt.evaluation_id);
    assert_eq!(evaluations[0].record.candidate_name, "Grace Hopper");

    let top = store.top_candidates(0.0).await.unwrap();
    assert_eq!(top.len(), 1);
    assert_eq!(top[0].record.overall_score, 91.0);
    assert_eq!(top[0].record.evaluation_id, receipt.evaluation_id);
}

#[tokio::test]
async fn test_second_run_not_relisted() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());

    let result = hire_result().await;
    persist(&store, &result).await.unwrap();
    let second = persist(&store, &result).await.unwrap();

    assert_eq!(second.top_candidate, TopCandidateOutcome::AlreadyListed);
    assert_eq!(store.evaluations().await.unwrap().len(), 2);
    assert_eq!(store.top_candidates(0.0).await.unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_runs_list_candidate_once() {
    let dir = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(dir.path()));
    let result = Arc::new(hire_result().await);

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let store = Arc::clone(&store);
            let result = Arc::clone(&result);
            tokio::spawn(async move { persist(store.as_ref(), &result).await })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        let receipt = handle.await.unwrap().unwrap();
        match receipt.top_candidate {
            TopCandidateOutcome::Created(_) => created += 1,
            TopCandidateOutcome::AlreadyListed => {}
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    assert_eq!(created, 1);
    assert_eq!(store.evaluations().await.unwrap().len(), 8);
    assert_eq!(store.top_candidates(0.0).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_skips_listed_pair() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());

    let result = hire_result().await;
    let record = hiring_pipeline::TopCandidateRecord::from_result(&result, "eval-1");
    assert!(store.create_top_candidate(&record).await.unwrap().is_some());
    assert!(store.create_top_candidate(&record).await.unwrap().is_none());
    assert_eq!(store.top_candidates(0.0).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_missing_files_read_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path().join("never-created"));

    assert!(store.evaluations().await.unwrap().is_empty());
    assert!(!store
        .top_candidate_exists("Grace Hopper", "Systems Engineer")
        .await
        .unwrap());
}

#[tokio::test]
async fn test_low_score_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());

    let result = hire_result().await;
    let mut record = hiring_pipeline::TopCandidateRecord::from_result(&result, "eval-1");
    record.overall_score = 60.0;

    let err = store.create_top_candidate(&record).await.unwrap_err();
    assert!(matches!(err, PersistenceError::Rejected(_)));
    assert!(!dir.path().join("top_candidates.jsonl").exists());
}

#[tokio::test]
async fn test_corrupt_line_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::new(dir.path());

    let result = hire_result().await;
    persist(&store, &result).await.unwrap();

    let path = dir.path().join("evaluations.jsonl");
    let mut text = std::fs::read_to_string(&path).unwrap();
    text.push_str("{\"id\": \"torn\n");
    std::fs::write(&path, text).unwrap();

    assert_eq!(store.evaluations().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_unwritable_dir_is_persistence_error() {
    let dir = tempfile::tempdir().unwrap();
    let blocker = dir.path().join("file");
    std::fs::write(&blocker, "not a directory").unwrap();
    let store = FileStore::new(blocker.join("records"));

    let result = hire_result().await;
    assert!(persist(&store, &result).await.is_err());
}
