//! Matching orchestrator: embeds the résumé, filters postings by similarity, scores the
//! pool with the LLM and ranks the judgments.
//!
//! Stages run in order `Embedding → Filtering → Scoring → Ranking`. A request aborts at
//! Embedding when no query vector can be produced, at Filtering when the pool is empty,
//! and at Scoring when every judgment fails. Nothing is retried here and nothing is
//! written to the store.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::MatchSettings;
use crate::embedding::{check_dimensions, Embedder, EmbeddingError};
use crate::matching::ranker::{rank, MatchResult};
use crate::matching::scorer::{
    ParallelScorer, ScoringCandidate, ScoringClient, TotalScoringFailure,
};
use crate::matching::similarity::{BruteForceIndex, SimilarityIndex};
use crate::store::{CandidateStore, StoreError};

/// Lifecycle of one match request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStage {
    Idle,
    Embedding,
    Filtering,
    Scoring,
    Ranking,
    Done,
    Aborted,
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("could not embed résumé: {0}")]
    Embedding(#[source] EmbeddingError),

    #[error("no eligible job postings")]
    EmptyPool,

    #[error(transparent)]
    TotalScoringFailure(#[from] TotalScoringFailure),

    #[error("candidate store error: {0}")]
    Store(#[from] StoreError),
}

impl MatchError {
    /// Stage the request was in when it aborted.
    pub fn stage(&self) -> MatchStage {
        match self {
            MatchError::Embedding(_) => MatchStage::Embedding,
            MatchError::EmptyPool | MatchError::Store(_) => MatchStage::Filtering,
            MatchError::TotalScoringFailure(_) => MatchStage::Scoring,
        }
    }
}

/// What to match. A saved embedding of the right dimension with only finite values skips
/// the embedding call.
#[derive(Debug, Clone)]
pub struct MatchInput {
    pub resume_text: String,
    pub embedding: Option<Vec<f32>>,
}

impl MatchInput {
    pub fn from_text(resume_text: impl Into<String>) -> Self {
        Self {
            resume_text: resume_text.into(),
            embedding: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MatchStats {
    pub eligible_postings: usize,
    pub pool_size: usize,
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub embedding_ms: u64,
    pub filtering_ms: u64,
    pub scoring_ms: u64,
    pub ranking_ms: u64,
    pub total_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MatchReport {
    pub results: Vec<MatchResult>,
    pub stats: MatchStats,
}

pub struct MatchPipeline {
    store: Arc<dyn CandidateStore>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn SimilarityIndex>,
    scorer: ParallelScorer,
    settings: MatchSettings,
}

impl MatchPipeline {
    pub fn new(
        store: Arc<dyn CandidateStore>,
        embedder: Arc<dyn Embedder>,
        scoring_client: Arc<dyn ScoringClient>,
        settings: MatchSettings,
    ) -> Self {
        let scorer = ParallelScorer::new(
            scoring_client,
            settings.concurrency_for(settings.pool_size),
            settings.scoring_timeout,
        );
        Self {
            store,
            embedder,
            index: Arc::new(BruteForceIndex::new(settings.metric)),
            scorer,
            settings,
        }
    }

    /// Substitution point for an approximate nearest-neighbour index in place of the
    /// brute-force scan. Callers of `run` are unaffected.
    #[allow(dead_code)]
    pub fn with_index(mut self, index: Arc<dyn SimilarityIndex>) -> Self {
        self.index = index;
        self
    }

    pub fn settings(&self) -> &MatchSettings {
        &self.settings
    }

    pub async fn run(&self, input: MatchInput) -> Result<MatchReport, MatchError> {
        let started = Instant::now();
        debug!(stage = ?MatchStage::Idle, "match request received");

        let outcome = self.run_stages(&input, started).await;

        match &outcome {
            Ok(report) => info!(
                stage = ?MatchStage::Done,
                results = report.results.len(),
                total_ms = report.stats.total_ms,
                "match request complete"
            ),
            Err(err) => warn!(
                stage = ?MatchStage::Aborted,
                aborted_in = ?err.stage(),
                elapsed_ms = elapsed_ms(started),
                "match request aborted: {err}"
            ),
        }

        outcome
    }

    async fn run_stages(
        &self,
        input: &MatchInput,
        started: Instant,
    ) -> Result<MatchReport, MatchError> {
        let mut stats = MatchStats::default();

        debug!(stage = ?MatchStage::Embedding, "embedding résumé");
        let clock = Instant::now();
        let query = self
            .query_vector(input)
            .await
            .map_err(MatchError::Embedding)?;
        stats.embedding_ms = elapsed_ms(clock);

        debug!(stage = ?MatchStage::Filtering, "filtering postings");
        let clock = Instant::now();
        let postings = self.store.list_jobs_with_vectors().await?;
        let pool = self.index.top_k(&query, &postings, self.settings.pool_size);
        stats.eligible_postings = pool.eligible;
        stats.pool_size = pool.entries.len();
        stats.filtering_ms = elapsed_ms(clock);
        info!(
            stored = postings.len(),
            eligible = pool.eligible,
            pool = pool.entries.len(),
            "similarity filter done"
        );

        if pool.is_empty() {
            return Err(MatchError::EmptyPool);
        }

        let candidates: Vec<ScoringCandidate> = pool
            .entries
            .iter()
            .enumerate()
            .filter_map(|(pool_rank, entry)| {
                postings.get(entry.position).map(|job| ScoringCandidate {
                    pool_rank,
                    similarity: entry.similarity,
                    job: job.clone(),
                })
            })
            .collect();

        debug!(stage = ?MatchStage::Scoring, candidates = candidates.len(), "scoring pool");
        let clock = Instant::now();
        let batch = self.scorer.score_all(&input.resume_text, candidates).await?;
        stats.dispatched = batch.dispatched;
        stats.succeeded = batch.judged.len();
        stats.failed = batch.failures.len();
        stats.scoring_ms = elapsed_ms(clock);

        debug!(stage = ?MatchStage::Ranking, "ranking judgments");
        let clock = Instant::now();
        // Completion order is arbitrary; restore pool order so equal scores fall back
        // to similarity rank.
        let mut judged = batch.judged;
        judged.sort_by_key(|candidate| candidate.pool_rank);
        let results = rank(judged, self.settings.top_n);
        stats.ranking_ms = elapsed_ms(clock);
        stats.total_ms = elapsed_ms(started);

        Ok(MatchReport { results, stats })
    }

    async fn query_vector(&self, input: &MatchInput) -> Result<Vec<f32>, EmbeddingError> {
        if input.resume_text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        let expected = self.settings.embedding_dimensions;
        if let Some(saved) = input.embedding.as_ref() {
            match check_dimensions(saved.clone(), expected) {
                Ok(vector) => {
                    debug!("reusing saved résumé vector");
                    return Ok(vector);
                }
                Err(reason) => warn!(
                    saved_dims = saved.len(),
                    expected_dims = expected,
                    "saved résumé vector is unusable ({reason}); re-embedding"
                ),
            }
        }

        let vector = self.embedder.embed(&input.resume_text).await?;
        check_dimensions(vector, expected)
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis().try_into().unwrap_or(u64::MAX)
}
