mod config;
mod db;
mod embedding;
mod errors;
mod jobs;
mod llm_client;
mod matching;
mod models;
mod profiles;
mod routes;
mod state;
mod store;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, StoreBackend};
use crate::db::{create_pool, run_migrations};
use crate::embedding::{Embedder, GeminiEmbedder};
use crate::llm_client::LlmClient;
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{CandidateStore, InMemoryCandidateStore, PgCandidateStore};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Matcher API v{}", env!("CARGO_PKG_VERSION"));

    let store = build_store(&config).await?;

    // Initialize embedding client
    let settings = config.matching.clone();
    let embedder = GeminiEmbedder::new(
        config.gemini_api_key.clone(),
        settings.embedding_dimensions,
        settings.retry,
    )?;
    info!(
        "Embedding client initialized (model: {}, {} dims)",
        embedding::gemini::EMBEDDING_MODEL,
        embedder.dimensions()
    );

    // Initialize LLM client
    let llm = LlmClient::new(config.anthropic_api_key.clone(), settings.retry)?;
    info!("LLM client initialized (model: {})", llm_client::MODEL);

    info!(
        pool_size = settings.pool_size,
        top_n = settings.top_n,
        max_concurrency = settings.max_concurrency,
        timeout_secs = settings.scoring_timeout.as_secs(),
        metric = %settings.metric,
        "Matching configured"
    );

    let state = AppState::new(store, Arc::new(embedder), Arc::new(llm), settings);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: restrict origins once the frontend host is fixed

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Connects the configured store backend. Postgres runs pending migrations first.
async fn build_store(config: &Config) -> Result<Arc<dyn CandidateStore>> {
    match config.store_backend {
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is required for the postgres store")?;
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            Ok(Arc::new(PgCandidateStore::new(pool)))
        }
        StoreBackend::Memory => {
            info!("Using in-memory store; postings and profiles are lost on restart");
            Ok(Arc::new(InMemoryCandidateStore::new()))
        }
    }
}
