use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::embedding::EmbeddingError;
use crate::matching::MatchError;
use crate::store::StoreError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    /// A résumé could not be embedded (profile save).
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    /// A job posting could not be embedded (single or bulk ingest).
    #[error("Posting embedding error: {0}")]
    PostingEmbedding(EmbeddingError),

    #[error("Match failed: {0}")]
    Match(#[from] MatchError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

const EMBEDDING_FAILED_MESSAGE: &str = "Could not process your résumé, please try again.";
const POSTING_EMBEDDING_FAILED_MESSAGE: &str =
    "Could not process this job posting, please try again.";
const NO_POSTINGS_MESSAGE: &str = "No job postings are available for matching yet.";
const SCORING_FAILED_MESSAGE: &str = "Analysis failed, please try again.";

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Embedding(e) => {
                tracing::error!("Embedding error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "EMBEDDING_FAILED",
                    EMBEDDING_FAILED_MESSAGE.to_string(),
                )
            }
            AppError::PostingEmbedding(e) => {
                tracing::error!("Posting embedding error: {e}");
                (
                    StatusCode::BAD_GATEWAY,
                    "EMBEDDING_FAILED",
                    POSTING_EMBEDDING_FAILED_MESSAGE.to_string(),
                )
            }
            AppError::Match(e) => match e {
                MatchError::Embedding(inner) => {
                    tracing::error!("Match aborted while embedding: {inner}");
                    (
                        StatusCode::BAD_GATEWAY,
                        "EMBEDDING_FAILED",
                        EMBEDDING_FAILED_MESSAGE.to_string(),
                    )
                }
                MatchError::EmptyPool => (
                    StatusCode::NOT_FOUND,
                    "NO_ELIGIBLE_POSTINGS",
                    NO_POSTINGS_MESSAGE.to_string(),
                ),
                MatchError::TotalScoringFailure(total) => {
                    tracing::error!("Match aborted while scoring: {total}");
                    (
                        StatusCode::BAD_GATEWAY,
                        "SCORING_FAILED",
                        SCORING_FAILED_MESSAGE.to_string(),
                    )
                }
                MatchError::Store(inner) => {
                    tracing::error!("Match aborted reading the store: {inner}");
                    (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "DATABASE_ERROR",
                        "A database error occurred".to_string(),
                    )
                }
            },
            AppError::Store(e) => {
                tracing::error!("Store error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "DATABASE_ERROR",
                    "A database error occurred".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
