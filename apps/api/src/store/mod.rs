//! Candidate store: job postings with vectors and user profiles.
//!
//! The matching pipeline only reads (`list_jobs_with_vectors`, `get_profile`); the
//! write paths feed the index from the jobs and profiles handlers.

use async_trait::async_trait;
use thiserror::Error;

use crate::models::job::JobPosting;
use crate::models::profile::CandidateProfile;

pub mod memory;
pub mod postgres;

pub use memory::InMemoryCandidateStore;
pub use postgres::PgCandidateStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[async_trait]
pub trait CandidateStore: Send + Sync {
    /// All postings that carry a non-empty vector, in stable store order (oldest first).
    async fn list_jobs_with_vectors(&self) -> Result<Vec<JobPosting>, StoreError>;

    async fn get_profile(&self, user_id: &str) -> Result<Option<CandidateProfile>, StoreError>;

    /// Inserts the posting, or replaces title/description/vector/owner of an existing id.
    async fn upsert_job_posting(&self, job: &JobPosting) -> Result<(), StoreError>;

    /// Merges `profile` into any stored profile for the same user and returns the result.
    async fn upsert_profile(
        &self,
        profile: &CandidateProfile,
    ) -> Result<CandidateProfile, StoreError>;
}
