use std::sync::Arc;

use crate::config::MatchSettings;
use crate::embedding::Embedder;
use crate::matching::scorer::ScoringClient;
use crate::matching::MatchPipeline;
use crate::store::CandidateStore;

/// Shared application state injected into all route handlers via Axum extractors.
///
/// Holds clients and settings only. No results or postings are cached between requests;
/// every match reads a fresh snapshot from the store.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn CandidateStore>,
    /// Used on the write paths (postings, profiles) and inside the pipeline.
    pub embedder: Arc<dyn Embedder>,
    pub pipeline: Arc<MatchPipeline>,
}

impl AppState {
    pub fn new(
        store: Arc<dyn CandidateStore>,
        embedder: Arc<dyn Embedder>,
        scoring_client: Arc<dyn ScoringClient>,
        settings: MatchSettings,
    ) -> Self {
        let pipeline = MatchPipeline::new(
            Arc::clone(&store),
            Arc::clone(&embedder),
            scoring_client,
            settings,
        );
        Self {
            store,
            embedder,
            pipeline: Arc::new(pipeline),
        }
    }

    pub fn settings(&self) -> &MatchSettings {
        self.pipeline.settings()
    }
}
