//! Axum route handlers for the Jobs API.

use axum::{extract::State, http::StatusCode, Json};

use crate::errors::AppError;
use crate::jobs::ingest::{create_posting, import_postings, BulkImportResponse};
use crate::models::job::{JobSummary, NewJobPosting};
use crate::state::AppState;

/// POST /api/v1/jobs
///
/// Embeds and stores a single posting.
pub async fn handle_create_job(
    State(state): State<AppState>,
    Json(request): Json<NewJobPosting>,
) -> Result<(StatusCode, Json<JobSummary>), AppError> {
    let job = create_posting(
        state.store.as_ref(),
        state.embedder.as_ref(),
        state.settings().embedding_dimensions,
        request,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(JobSummary::from(&job))))
}

/// POST /api/v1/jobs/bulk
///
/// Imports an array of postings; per-item failures are listed in the response.
pub async fn handle_bulk_import(
    State(state): State<AppState>,
    Json(request): Json<Vec<NewJobPosting>>,
) -> Result<Json<BulkImportResponse>, AppError> {
    let response = import_postings(
        state.store.as_ref(),
        state.embedder.as_ref(),
        state.settings().embedding_dimensions,
        request,
    )
    .await?;

    Ok(Json(response))
}

/// GET /api/v1/jobs
pub async fn handle_list_jobs(
    State(state): State<AppState>,
) -> Result<Json<Vec<JobSummary>>, AppError> {
    let jobs = state.store.list_jobs_with_vectors().await?;
    Ok(Json(jobs.iter().map(JobSummary::from).collect()))
}
