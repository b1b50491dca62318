pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::jobs::handlers as jobs;
use crate::matching::handlers as matching;
use crate::profiles::handlers as profiles;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Jobs API
        .route(
            "/api/v1/jobs",
            get(jobs::handle_list_jobs).post(jobs::handle_create_job),
        )
        .route("/api/v1/jobs/bulk", post(jobs::handle_bulk_import))
        // Profiles API
        .route(
            "/api/v1/profiles/:user_id",
            get(profiles::handle_get_profile).put(profiles::handle_save_profile),
        )
        // Matching API
        .route("/api/v1/matches", post(matching::handle_match_text))
        .route("/api/v1/matches/:user_id", get(matching::handle_auto_match))
        .with_state(state)
}
