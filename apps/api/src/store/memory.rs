//! In-process `CandidateStore` for local runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::models::job::JobPosting;
use crate::models::profile::CandidateProfile;
use crate::store::{CandidateStore, StoreError};

/// Postings are kept in insertion order; re-upserting an id replaces it in place.
#[derive(Debug, Default)]
pub struct InMemoryCandidateStore {
    jobs: RwLock<Vec<JobPosting>>,
    profiles: RwLock<HashMap<String, CandidateProfile>>,
}

impl InMemoryCandidateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CandidateStore for InMemoryCandidateStore {
    async fn list_jobs_with_vectors(&self) -> Result<Vec<JobPosting>, StoreError> {
        let jobs = self.jobs.read().await;
        Ok(jobs
            .iter()
            .filter(|job| !job.embedding.is_empty())
            .cloned()
            .collect())
    }

    async fn get_profile(&self, user_id: &str) -> Result<Option<CandidateProfile>, StoreError> {
        Ok(self.profiles.read().await.get(user_id).cloned())
    }

    async fn upsert_job_posting(&self, job: &JobPosting) -> Result<(), StoreError> {
        let mut jobs = self.jobs.write().await;
        match jobs.iter_mut().find(|existing| existing.id == job.id) {
            Some(existing) => {
                let created_at = existing.created_at;
                *existing = JobPosting {
                    created_at,
                    ..job.clone()
                };
            }
            None => jobs.push(job.clone()),
        }
        Ok(())
    }

    async fn upsert_profile(
        &self,
        profile: &CandidateProfile,
    ) -> Result<CandidateProfile, StoreError> {
        let mut profiles = self.profiles.write().await;
        let saved = match profiles.get(&profile.user_id) {
            Some(existing) => existing.merged_with(profile),
            None => profile.clone(),
        };
        profiles.insert(saved.user_id.clone(), saved.clone());
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn job(id: &str, embedding: Vec<f32>) -> JobPosting {
        JobPosting {
            id: id.to_string(),
            title: format!("Title {id}"),
            description: format!("Description for {id}"),
            embedding,
            owner_id: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_job_round_trip_preserves_fields() {
        let store = InMemoryCandidateStore::new();
        let posting = JobPosting {
            id: "job-1".to_string(),
            title: "Senior Rust Engineer".to_string(),
            description: "Own the matching pipeline.".to_string(),
            embedding: vec![0.12, -0.5, 0.33],
            owner_id: Some("recruiter-7".to_string()),
            created_at: Utc::now(),
        };

        store.upsert_job_posting(&posting).await.unwrap();
        let listed = store.list_jobs_with_vectors().await.unwrap();

        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].title, posting.title);
        assert_eq!(listed[0].description, posting.description);
        for (a, b) in listed[0].embedding.iter().zip(&posting.embedding) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[tokio::test]
    async fn test_postings_without_vectors_are_not_listed() {
        let store = InMemoryCandidateStore::new();
        store.upsert_job_posting(&job("a", vec![1.0])).await.unwrap();
        store.upsert_job_posting(&job("b", vec![])).await.unwrap();

        let listed = store.list_jobs_with_vectors().await.unwrap();
        let ids: Vec<&str> = listed.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["a"]);
    }

    #[tokio::test]
    async fn test_upsert_replaces_in_place_and_keeps_order() {
        let store = InMemoryCandidateStore::new();
        store.upsert_job_posting(&job("a", vec![1.0])).await.unwrap();
        store.upsert_job_posting(&job("b", vec![1.0])).await.unwrap();

        let mut updated = job("a", vec![0.5]);
        updated.title = "Renamed".to_string();
        store.upsert_job_posting(&updated).await.unwrap();

        let listed = store.list_jobs_with_vectors().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, "a");
        assert_eq!(listed[0].title, "Renamed");
        assert_eq!(listed[1].id, "b");
    }

    #[tokio::test]
    async fn test_profile_upsert_merges() {
        let store = InMemoryCandidateStore::new();
        let first = CandidateProfile {
            user_id: "u1".to_string(),
            email: Some("u1@example.com".to_string()),
            full_name: Some("Grace".to_string()),
            headline: None,
            resume_text: Some("COBOL, compilers".to_string()),
            embedding: Some(vec![1.0, 0.0]),
            updated_at: Utc::now(),
        };
        store.upsert_profile(&first).await.unwrap();

        let second = CandidateProfile {
            email: None,
            full_name: None,
            headline: Some("Rear admiral".to_string()),
            ..first.clone()
        };
        let saved = store.upsert_profile(&second).await.unwrap();

        assert_eq!(saved.email.as_deref(), Some("u1@example.com"));
        assert_eq!(saved.full_name.as_deref(), Some("Grace"));
        assert_eq!(saved.headline.as_deref(), Some("Rear admiral"));
        assert_eq!(store.get_profile("u1").await.unwrap(), Some(saved));
    }

    #[tokio::test]
    async fn test_missing_profile_is_none() {
        let store = InMemoryCandidateStore::new();
        assert!(store.get_profile("nobody").await.unwrap().is_none());
    }
}
