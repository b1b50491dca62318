//! Orders judged candidates by score and cuts the list to `top_n`.

use std::cmp::Reverse;

use serde::Serialize;

use crate::matching::scorer::{JudgedCandidate, MatchJudgment};
use crate::models::job::JobSummary;

/// One ranked entry in a match response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    /// 1-based position in the response.
    pub rank: usize,
    pub job: JobSummary,
    pub score: i64,
    pub judgment: MatchJudgment,
    pub similarity: f32,
}

/// Sorts by score, highest first, and keeps at most `top_n`.
///
/// The sort is stable: equal scores stay in the order they were passed in. Scores are
/// ranked as given, out-of-range values included. Nothing is padded when fewer than
/// `top_n` judgments exist.
pub fn rank(mut judged: Vec<JudgedCandidate>, top_n: usize) -> Vec<MatchResult> {
    judged.sort_by_key(|candidate| Reverse(candidate.judgment.score));
    judged.truncate(top_n);

    judged
        .into_iter()
        .enumerate()
        .map(|(i, candidate)| MatchResult {
            rank: i + 1,
            job: JobSummary::from(&candidate.job),
            score: candidate.judgment.score,
            judgment: candidate.judgment,
            similarity: candidate.similarity,
        })
        .collect()
}
