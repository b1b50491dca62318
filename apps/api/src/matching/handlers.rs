//! Axum route handlers for the Matching API.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;

use crate::errors::AppError;
use crate::matching::{MatchInput, MatchReport};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MatchTextRequest {
    pub resume_text: String,
}

/// GET /api/v1/matches/:user_id
///
/// Matches the user's saved résumé against every stored posting.
pub async fn handle_auto_match(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Json<MatchReport>, AppError> {
    let profile = state.store.get_profile(&user_id).await?;

    let Some(resume_text) = profile.as_ref().and_then(|p| p.resume()) else {
        return Err(AppError::Validation(
            "Add a résumé to your profile before matching".to_string(),
        ));
    };

    let input = MatchInput {
        resume_text: resume_text.to_string(),
        embedding: profile.as_ref().and_then(|p| p.embedding.clone()),
    };

    let report = state.pipeline.run(input).await?;
    Ok(Json(report))
}

/// POST /api/v1/matches
///
/// Matches a résumé supplied in the request body without saving it.
pub async fn handle_match_text(
    State(state): State<AppState>,
    Json(request): Json<MatchTextRequest>,
) -> Result<Json<MatchReport>, AppError> {
    if request.resume_text.trim().is_empty() {
        return Err(AppError::Validation(
            "resume_text cannot be empty".to_string(),
        ));
    }

    let report = state
        .pipeline
        .run(MatchInput::from_text(request.resume_text))
        .await?;
    Ok(Json(report))
}
