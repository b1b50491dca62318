//! Axum route handlers for the Profiles API.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use crate::embedding::check_dimensions;
use crate::errors::AppError;
use crate::models::profile::{CandidateProfile, ProfileUpdateRequest};
use crate::state::AppState;

/// GET /api/v1/profiles/:user_id
pub async fn handle_get_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<CandidateProfile>, AppError> {
    let profile = state
        .store
        .get_profile(&user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {user_id} not found")))?;

    Ok(Json(profile))
}

/// PUT /api/v1/profiles/:user_id
///
/// Embeds the submitted résumé and merges it into the saved profile. Fields omitted from
/// the request keep their stored values.
pub async fn handle_save_profile(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<ProfileUpdateRequest>,
) -> Result<Json<CandidateProfile>, AppError> {
    let resume_text = request.resume_text.trim();
    if resume_text.is_empty() {
        return Err(AppError::Validation(
            "resume_text cannot be empty".to_string(),
        ));
    }

    let vector = state.embedder.embed(resume_text).await?;
    let embedding = check_dimensions(vector, state.settings().embedding_dimensions)?;

    let update = CandidateProfile {
        user_id,
        email: request.email,
        full_name: request.full_name,
        headline: request.headline,
        resume_text: Some(resume_text.to_string()),
        embedding: Some(embedding),
        updated_at: Utc::now(),
    };

    let saved = state.store.upsert_profile(&update).await?;
    tracing::info!("Saved profile for user {}", saved.user_id);
    Ok(Json(saved))
}
