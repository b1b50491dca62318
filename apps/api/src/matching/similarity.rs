//! Coarse filter: ranks every stored posting against the résumé vector and keeps the top K.
//!
//! Brute force is O(N·D); N is a few thousand postings at most, so no ANN index is used.
//! Callers only see the `SimilarityIndex` trait, which is where an ANN backend would plug in.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use tracing::{debug, warn};

use crate::models::job::JobPosting;

/// How a posting vector is compared to the query vector.
///
/// `Dot` is the raw dot product. It equals cosine similarity only when both vectors are
/// unit length, and otherwise favours long vectors. `Cosine` divides out both magnitudes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMetric {
    Dot,
    Cosine,
}

impl SimilarityMetric {
    /// Caller guarantees `a.len() == b.len()`.
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
        match self {
            SimilarityMetric::Dot => dot,
            SimilarityMetric::Cosine => {
                let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
                let norm_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
                if norm_a == 0.0 || norm_b == 0.0 {
                    return 0.0;
                }
                dot / (norm_a * norm_b)
            }
        }
    }
}

impl FromStr for SimilarityMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dot" | "dot_product" => Ok(SimilarityMetric::Dot),
            "cosine" | "cos" => Ok(SimilarityMetric::Cosine),
            other => Err(format!("unknown similarity metric '{other}'")),
        }
    }
}

impl fmt::Display for SimilarityMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimilarityMetric::Dot => f.write_str("dot"),
            SimilarityMetric::Cosine => f.write_str("cosine"),
        }
    }
}

/// One member of the candidate pool.
#[derive(Debug, Clone, PartialEq)]
pub struct PoolEntry {
    pub job_id: String,
    /// Index into the postings slice the pool was built from.
    pub position: usize,
    pub similarity: f32,
}

/// Result of a filter pass: the pool plus how many postings were comparable at all.
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    pub entries: Vec<PoolEntry>,
    pub eligible: usize,
}

impl CandidatePool {
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub fn job_ids(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.job_id.as_str()).collect()
    }
}

pub trait SimilarityIndex: Send + Sync {
    /// Returns at most `k` postings, highest similarity first. Equal scores keep the order
    /// of `postings`. Postings whose vector dimension differs from `query` are skipped.
    fn top_k(&self, query: &[f32], postings: &[JobPosting], k: usize) -> CandidatePool;
}

/// Exhaustive scan over every posting.
#[derive(Debug, Clone, Copy)]
pub struct BruteForceIndex {
    metric: SimilarityMetric,
}

impl BruteForceIndex {
    pub fn new(metric: SimilarityMetric) -> Self {
        Self { metric }
    }
}

impl SimilarityIndex for BruteForceIndex {
    fn top_k(&self, query: &[f32], postings: &[JobPosting], k: usize) -> CandidatePool {
        if query.is_empty() || k == 0 {
            return CandidatePool::default();
        }

        let mut skipped = 0usize;
        let mut scored: Vec<PoolEntry> = postings
            .iter()
            .enumerate()
            .filter_map(|(position, job)| {
                if job.embedding.len() != query.len() {
                    skipped += 1;
                    return None;
                }
                let similarity = self.metric.score(query, &job.embedding);
                if !similarity.is_finite() {
                    skipped += 1;
                    return None;
                }
                Some(PoolEntry {
                    job_id: job.id.clone(),
                    position,
                    similarity,
                })
            })
            .collect();

        if skipped > 0 {
            warn!(
                skipped,
                expected_dims = query.len(),
                "postings skipped: vector dimension mismatch or non-finite similarity"
            );
        }

        let eligible = scored.len();
        // sort_by is stable: ties keep store order
        scored.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        scored.truncate(k);

        debug!(
            eligible,
            pool = scored.len(),
            metric = %self.metric,
            "similarity filter complete"
        );

        CandidatePool {
            entries: scored,
            eligible,
        }
    }
}
