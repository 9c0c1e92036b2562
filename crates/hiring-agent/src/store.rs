//! JSON-lines evaluation store.
//!
//! Two append-only files under the data directory, one JSON object per line:
//! `evaluations.jsonl` and `top_candidates.jsonl`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hiring_pipeline::{
    EvaluationRecord, EvaluationStore, PersistenceError, RecordId, TopCandidateRecord,
    TOP_CANDIDATE_MIN_SCORE,
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use uuid::Uuid;

const EVALUATIONS_FILE: &str = "evaluations.jsonl";
const TOP_CANDIDATES_FILE: &str = "top_candidates.jsonl";

/// One stored line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Row<T> {
    pub id: RecordId,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub record: T,
}

pub struct FileStore {
    dir: PathBuf,
    // Held across the leaderboard existence check and its append.
    write_lock: Mutex<()>,
}

fn io_err(path: &Path, e: std::io::Error) -> PersistenceError {
    PersistenceError::Io(format!("{}: {}", path.display(), e))
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            write_lock: Mutex::new(()),
        }
    }

    async fn append<T: Serialize>(&self, file: &str, record: T) -> Result<RecordId, PersistenceError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PersistenceError::Unavailable(format!("{}: {}", self.dir.display(), e)))?;

        let row = Row {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            record,
        };
        let mut line =
            serde_json::to_string(&row).map_err(|e| PersistenceError::Serialization(e.to_string()))?;
        line.push('\n');

        let path = self.dir.join(file);
        let mut handle = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| io_err(&path, e))?;
        handle
            .write_all(line.as_bytes())
            .await
            .map_err(|e| io_err(&path, e))?;
        handle.flush().await.map_err(|e| io_err(&path, e))?;

        debug!(file = %path.display(), id = %row.id, "Record appended");
        Ok(row.id)
    }

    async fn read_rows<T: DeserializeOwned>(&self, file: &str) -> Result<Vec<Row<T>>, PersistenceError> {
        let path = self.dir.join(file);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_err(&path, e)),
        };

        let mut rows = Vec::new();
        for (n, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(row) => rows.push(row),
                // A torn trailing line must not take the whole table down.
                Err(e) => warn!(file = %path.display(), line = n + 1, error = %e, "Skipping corrupt row"),
            }
        }
        Ok(rows)
    }

    async fn is_listed(&self, candidate_name: &str, job_title: &str) -> Result<bool, PersistenceError> {
        let rows = self.read_rows::<TopCandidateRecord>(TOP_CANDIDATES_FILE).await?;
        Ok(rows
            .iter()
            .any(|r| r.record.candidate_name == candidate_name && r.record.job_title == job_title))
    }

    pub async fn evaluations(&self) -> Result<Vec<Row<EvaluationRecord>>, PersistenceError> {
        self.read_rows(EVALUATIONS_FILE).await
    }

    /// Leaderboard entries at or above `min_score`, best first.
    pub async fn top_candidates(
        &self,
        min_score: f64,
    ) -> Result<Vec<Row<TopCandidateRecord>>, PersistenceError> {
        let mut rows: Vec<Row<TopCandidateRecord>> = self
            .read_rows::<TopCandidateRecord>(TOP_CANDIDATES_FILE)
            .await?
            .into_iter()
            .filter(|r| r.record.overall_score >= min_score)
            .collect();
        rows.sort_by(|a, b| b.record.overall_score.total_cmp(&a.record.overall_score));
        Ok(rows)
    }
}

#[async_trait]
impl EvaluationStore for FileStore {
    async fn create_evaluation(&self, record: &EvaluationRecord) -> Result<RecordId, PersistenceError> {
        let _guard = self.write_lock.lock().await;
        self.append(EVALUATIONS_FILE, record).await
    }

    async fn top_candidate_exists(
        &self,
        candidate_name: &str,
        job_title: &str,
    ) -> Result<bool, PersistenceError> {
        self.is_listed(candidate_name, job_title).await
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
        let _guard = self.write_lock.lock().await;
        if self.is_listed(&record.candidate_name, &record.job_title).await? {
            return Ok(None);
        }
        self.append(TOP_CANDIDATES_FILE, record).await.map(Some)
    }
}
