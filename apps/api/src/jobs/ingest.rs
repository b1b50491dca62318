//! Write path for job postings: embed, then upsert.

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::embedding::{check_dimensions, job_posting_text, Embedder};
use crate::errors::AppError;
use crate::models::job::{JobPosting, JobSummary, NewJobPosting};
use crate::store::CandidateStore;

/// Upper bound on postings accepted by one bulk import.
pub const MAX_BULK_POSTINGS: usize = 500;

#[derive(Debug, Serialize)]
pub struct BulkFailure {
    pub index: usize,
    pub title: String,
    pub error: String,
}

#[derive(Debug, Serialize)]
pub struct BulkImportResponse {
    pub created: Vec<JobSummary>,
    pub failed: Vec<BulkFailure>,
}

fn validate(new: &NewJobPosting) -> Result<(), AppError> {
    if new.title.trim().is_empty() {
        return Err(AppError::Validation("title cannot be empty".to_string()));
    }
    if new.description.trim().is_empty() {
        return Err(AppError::Validation(
            "description cannot be empty".to_string(),
        ));
    }
    Ok(())
}

/// Embeds `title + description` and stores the posting. Nothing is stored if embedding fails.
pub async fn create_posting(
    store: &dyn CandidateStore,
    embedder: &dyn Embedder,
    dimensions: usize,
    new: NewJobPosting,
) -> Result<JobPosting, AppError> {
    validate(&new)?;

    let embedding = embedder
        .embed(&job_posting_text(&new.title, &new.description))
        .await
        .and_then(|vector| check_dimensions(vector, dimensions))
        .map_err(AppError::PostingEmbedding)?;

    let id = new
        .id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let job = JobPosting {
        id,
        title: new.title.trim().to_string(),
        description: new.description.trim().to_string(),
        embedding,
        owner_id: new.owner_id,
        created_at: Utc::now(),
    };

    store.upsert_job_posting(&job).await?;
    info!("Created job posting {} ({})", job.id, job.title);
    Ok(job)
}

/// Imports postings one by one. Validation and embedding failures are collected per item;
/// a store failure aborts the import.
pub async fn import_postings(
    store: &dyn CandidateStore,
    embedder: &dyn Embedder,
    dimensions: usize,
    postings: Vec<NewJobPosting>,
) -> Result<BulkImportResponse, AppError> {
    if postings.is_empty() {
        return Err(AppError::Validation("no postings to import".to_string()));
    }
    if postings.len() > MAX_BULK_POSTINGS {
        return Err(AppError::Validation(format!(
            "at most {MAX_BULK_POSTINGS} postings per import, got {}",
            postings.len()
        )));
    }

    let total = postings.len();
    let mut created = Vec::new();
    let mut failed = Vec::new();

    for (index, new) in postings.into_iter().enumerate() {
        let title = new.title.clone();
        match create_posting(store, embedder, dimensions, new).await {
            Ok(job) => created.push(JobSummary::from(&job)),
            Err(err @ (AppError::Validation(_) | AppError::PostingEmbedding(_))) => {
                warn!(index, title = %title, "bulk import item skipped: {err}");
                failed.push(BulkFailure {
                    index,
                    title,
                    error: err.to_string(),
                });
            }
            Err(other) => return Err(other),
        }
    }

    info!(
        total,
        created = created.len(),
        failed = failed.len(),
        "bulk import finished"
    );

    Ok(BulkImportResponse { created, failed })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EmbeddingError;
    use crate::matching::testing::FixedEmbedder;
    use crate::store::InMemoryCandidateStore;

    fn new_posting(title: &str, description: &str) -> NewJobPosting {
        NewJobPosting {
            id: None,
            title: title.to_string(),
            description: description.to_string(),
            owner_id: Some("ops".to_string()),
        }
    }

    #[tokio::test]
    async fn test_create_posting_stores_vector() {
        let store = InMemoryCandidateStore::new();
        let embedder = FixedEmbedder::returning(vec![0.6, 0.8]);

        let job = create_posting(&store, &embedder, 2, new_posting("SRE", "Keep it up"))
            .await
            .unwrap();

        assert!(!job.id.is_empty());
        let listed = store.list_jobs_with_vectors().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].embedding, vec![0.6, 0.8]);
        assert_eq!(listed[0].owner_id.as_deref(), Some("ops"));
    }

    #[tokio::test]
    async fn test_create_posting_keeps_supplied_id() {
        let store = InMemoryCandidateStore::new();
        let embedder = FixedEmbedder::returning(vec![1.0]);
        let mut new = new_posting("SRE", "Pager duty");
        new.id = Some("ext-42".to_string());

        let job = create_posting(&store, &embedder, 1, new).await.unwrap();
        assert_eq!(job.id, "ext-42");
    }

    #[tokio::test]
    async fn test_embedding_failure_stores_nothing() {
        let store = InMemoryCandidateStore::new();
        let embedder = FixedEmbedder::failing();

        let err = create_posting(&store, &embedder, 2, new_posting("SRE", "x"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::PostingEmbedding(_)));
        assert!(store.list_jobs_with_vectors().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_wrong_dimension_is_rejected() {
        let store = InMemoryCandidateStore::new();
        let embedder = FixedEmbedder::returning(vec![1.0, 0.0, 0.0]);

        let err = create_posting(&store, &embedder, 2, new_posting("SRE", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::PostingEmbedding(_)));
    }

    #[tokio::test]
    async fn test_non_finite_vector_is_rejected() {
        let store = InMemoryCandidateStore::new();
        let embedder = FixedEmbedder::returning(vec![1.0, f32::INFINITY]);

        let err = create_posting(&store, &embedder, 2, new_posting("SRE", "x"))
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            AppError::PostingEmbedding(EmbeddingError::NonFinite { index: 1 })
        ));
        assert!(store.list_jobs_with_vectors().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bulk_import_reports_invalid_items() {
        let store = InMemoryCandidateStore::new();
        let embedder = FixedEmbedder::returning(vec![1.0, 0.0]);
        let postings = vec![
            new_posting("Backend", "APIs"),
            new_posting("", "Missing title"),
            new_posting("Frontend", "UIs"),
        ];

        let response = import_postings(&store, &embedder, 2, postings).await.unwrap();

        assert_eq!(response.created.len(), 2);
        assert_eq!(response.failed.len(), 1);
        assert_eq!(response.failed[0].index, 1);
        assert_eq!(store.list_jobs_with_vectors().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_bulk_import_rejects_empty_batch() {
        let store = InMemoryCandidateStore::new();
        let embedder = FixedEmbedder::returning(vec![1.0]);
        let err = import_postings(&store, &embedder, 1, vec![]).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }
}
