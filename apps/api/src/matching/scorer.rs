//! Fine rerank: one LLM judgment per pooled posting, run concurrently.
//!
//! Each candidate becomes its own task on a `JoinSet`; a `Semaphore` caps how many are
//! in flight. A candidate whose call errors, times out, or returns an unusable payload is
//! dropped and logged. Only when every candidate fails does the batch fail.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::embedding::job_posting_text;
use crate::llm_client::{extract_json_object, LlmClient, LlmError};
use crate::matching::prompts::{build_judgment_prompt, JUDGMENT_SYSTEM};
use crate::models::job::JobPosting;

/// Anything that can answer a prompt with raw text. The scorer owns prompt building
/// and payload parsing; implementations only move text.
#[async_trait]
pub trait ScoringClient: Send + Sync {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

#[async_trait]
impl ScoringClient for LlmClient {
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        self.call_text(prompt, system).await
    }
}

/// Structured compatibility judgment for one (résumé, posting) pair.
///
/// `score` is whatever integer the model produced; it is not clamped to 0..=100.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchJudgment {
    pub score: i64,
    pub pros: Vec<String>,
    pub cons: Vec<String>,
    pub summary: String,
}

#[derive(Debug, Error)]
pub enum ScoreFailure {
    #[error("scoring client error: {0}")]
    Client(#[from] LlmError),

    #[error("scoring call timed out after {0:?}")]
    Timeout(Duration),

    #[error("malformed payload: {0}")]
    Malformed(String),

    #[error("payload has no score")]
    MissingScore,

    #[error("score is not a number: {0}")]
    InvalidScore(String),

    #[error("scoring task did not complete: {0}")]
    TaskAborted(String),
}

/// Per-candidate result of a scoring task.
#[derive(Debug)]
pub enum JudgmentOutcome {
    Success(MatchJudgment),
    Failure(ScoreFailure),
}

impl From<Result<MatchJudgment, ScoreFailure>> for JudgmentOutcome {
    fn from(result: Result<MatchJudgment, ScoreFailure>) -> Self {
        match result {
            Ok(judgment) => JudgmentOutcome::Success(judgment),
            Err(failure) => JudgmentOutcome::Failure(failure),
        }
    }
}

/// A pooled posting handed to the scorer.
#[derive(Debug, Clone)]
pub struct ScoringCandidate {
    /// 0-based rank in the similarity pool. Unique within a batch.
    pub pool_rank: usize,
    pub similarity: f32,
    pub job: JobPosting,
}

#[derive(Debug, Clone)]
pub struct JudgedCandidate {
    pub pool_rank: usize,
    pub similarity: f32,
    pub job: JobPosting,
    pub judgment: MatchJudgment,
}

#[derive(Debug)]
pub struct CandidateFailure {
    pub job_id: String,
    pub reason: ScoreFailure,
}

/// Outcome of a batch with at least one success. `judged` is in completion order.
#[derive(Debug, Default)]
pub struct ScoringBatch {
    pub judged: Vec<JudgedCandidate>,
    pub failures: Vec<CandidateFailure>,
    pub dispatched: usize,
}

/// Every dispatched candidate failed.
#[derive(Debug, Error)]
#[error("all {dispatched} scoring calls failed")]
pub struct TotalScoringFailure {
    pub dispatched: usize,
    pub failures: Vec<CandidateFailure>,
}

#[derive(Clone)]
pub struct ParallelScorer {
    client: Arc<dyn ScoringClient>,
    max_concurrency: usize,
    timeout: Duration,
}

impl ParallelScorer {
    pub fn new(client: Arc<dyn ScoringClient>, max_concurrency: usize, timeout: Duration) -> Self {
        Self {
            client,
            max_concurrency: max_concurrency.max(1),
            timeout,
        }
    }

    /// Scores every candidate and waits for all of them before returning.
    ///
    /// An empty candidate list yields an empty batch.
    pub async fn score_all(
        &self,
        resume_text: &str,
        candidates: Vec<ScoringCandidate>,
    ) -> Result<ScoringBatch, TotalScoringFailure> {
        let dispatched = candidates.len();
        if dispatched == 0 {
            return Ok(ScoringBatch::default());
        }

        let permits = self.max_concurrency.min(dispatched);
        let semaphore = Arc::new(Semaphore::new(permits));
        let resume: Arc<str> = Arc::from(resume_text);
        let mut pending: BTreeMap<usize, String> = BTreeMap::new();
        let mut tasks = JoinSet::new();

        debug!(dispatched, permits, "dispatching scoring tasks");

        for candidate in candidates {
            pending.insert(candidate.pool_rank, candidate.job.id.clone());

            let client = Arc::clone(&self.client);
            let semaphore = Arc::clone(&semaphore);
            let resume = Arc::clone(&resume);
            let limit = self.timeout;

            tasks.spawn(async move {
                let outcome: JudgmentOutcome = match semaphore.acquire_owned().await {
                    Ok(_permit) => {
                        judge_one(client.as_ref(), &resume, &candidate.job, limit)
                            .await
                            .into()
                    }
                    Err(e) => JudgmentOutcome::Failure(ScoreFailure::TaskAborted(e.to_string())),
                };
                (candidate, outcome)
            });
        }

        let mut batch = ScoringBatch {
            dispatched,
            ..ScoringBatch::default()
        };
        let mut completed = 0usize;

        while let Some(joined) = tasks.join_next().await {
            let (candidate, outcome) = match joined {
                Ok(done) => done,
                Err(e) => {
                    warn!("scoring task failed to join: {e}");
                    continue;
                }
            };

            pending.remove(&candidate.pool_rank);
            completed += 1;
            debug!(completed, total = dispatched, "scoring progress");

            match outcome {
                JudgmentOutcome::Success(judgment) => batch.judged.push(JudgedCandidate {
                    pool_rank: candidate.pool_rank,
                    similarity: candidate.similarity,
                    job: candidate.job,
                    judgment,
                }),
                JudgmentOutcome::Failure(reason) => {
                    warn!(job_id = %candidate.job.id, %reason, "candidate dropped from results");
                    batch.failures.push(CandidateFailure {
                        job_id: candidate.job.id,
                        reason,
                    });
                }
            }
        }

        // Tasks that panicked never reported back.
        for (_, job_id) in pending {
            warn!(job_id = %job_id, "candidate dropped: scoring task panicked");
            batch.failures.push(CandidateFailure {
                job_id,
                reason: ScoreFailure::TaskAborted("task panicked".to_string()),
            });
        }

        info!(
            dispatched,
            succeeded = batch.judged.len(),
            failed = batch.failures.len(),
            "scoring complete"
        );

        if batch.judged.is_empty() {
            return Err(TotalScoringFailure {
                dispatched,
                failures: batch.failures,
            });
        }

        Ok(batch)
    }
}

async fn judge_one(
    client: &dyn ScoringClient,
    resume_text: &str,
    job: &JobPosting,
    limit: Duration,
) -> Result<MatchJudgment, ScoreFailure> {
    let prompt = build_judgment_prompt(
        resume_text,
        &job_posting_text(&job.title, &job.description),
    );

    let raw = tokio::time::timeout(limit, client.complete(JUDGMENT_SYSTEM, &prompt))
        .await
        .map_err(|_| ScoreFailure::Timeout(limit))??;

    parse_judgment(&raw)
}

/// Parses a judgment payload. Code fences and prose around the JSON object are tolerated;
/// a missing or null `score` is a failure. `score` may be an integer, a float (truncated)
/// or a numeric string.
pub fn parse_judgment(raw: &str) -> Result<MatchJudgment, ScoreFailure> {
    let payload = extract_json_object(raw);
    let value: Value =
        serde_json::from_str(payload).map_err(|e| ScoreFailure::Malformed(e.to_string()))?;

    let Value::Object(fields) = value else {
        return Err(ScoreFailure::Malformed("expected a JSON object".to_string()));
    };

    let score = match fields.get("score") {
        None | Some(Value::Null) => return Err(ScoreFailure::MissingScore),
        Some(value) => coerce_score(value)?,
    };

    Ok(MatchJudgment {
        score,
        pros: string_list(fields.get("pros")),
        cons: string_list(fields.get("cons")),
        summary: fields.get("summary").map(text_of).unwrap_or_default(),
    })
}

fn coerce_score(value: &Value) -> Result<i64, ScoreFailure> {
    let from_float = |f: f64| f.is_finite().then(|| f.trunc() as i64);

    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(from_float))
            .ok_or_else(|| ScoreFailure::InvalidScore(n.to_string())),
        Value::String(s) => {
            let trimmed = s.trim().trim_end_matches('%').trim();
            trimmed
                .parse::<i64>()
                .ok()
                .or_else(|| trimmed.parse::<f64>().ok().and_then(from_float))
                .ok_or_else(|| ScoreFailure::InvalidScore(s.clone()))
        }
        other => Err(ScoreFailure::InvalidScore(other.to_string())),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(text_of)
            .filter(|s| !s.is_empty())
            .collect(),
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.trim().to_string()],
        _ => Vec::new(),
    }
}

fn text_of(value: &Value) -> String {
    match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
