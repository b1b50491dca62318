use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::llm_client::RetryPolicy;
use crate::matching::similarity::SimilarityMetric;

/// Hard ceiling on simultaneous scoring calls for a single match request.
pub const MAX_SCORING_CONCURRENCY: usize = 10;

/// Which `CandidateStore` backend the service runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreBackend::Postgres),
            "memory" | "mem" => Ok(StoreBackend::Memory),
            other => bail!("unknown store backend '{other}' (expected 'postgres' or 'memory')"),
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub store_backend: StoreBackend,
    /// Required when `store_backend` is Postgres.
    pub database_url: Option<String>,
    pub anthropic_api_key: String,
    pub gemini_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub matching: MatchSettings,
}

/// Knobs for the retrieval-then-rerank pipeline. Built per process, passed by value
/// into each request so nothing in the pipeline reads global state.
#[derive(Debug, Clone)]
pub struct MatchSettings {
    /// K: how many postings survive the similarity filter.
    pub pool_size: usize,
    /// How many ranked results are returned.
    pub top_n: usize,
    /// Upper bound on in-flight scoring calls (further capped by `pool_size`).
    pub max_concurrency: usize,
    pub scoring_timeout: Duration,
    pub embedding_dimensions: usize,
    pub metric: SimilarityMetric,
    pub retry: RetryPolicy,
}

impl Default for MatchSettings {
    fn default() -> Self {
        Self {
            pool_size: 10,
            top_n: 5,
            max_concurrency: MAX_SCORING_CONCURRENCY,
            scoring_timeout: Duration::from_secs(60),
            embedding_dimensions: 768,
            metric: SimilarityMetric::Dot,
            retry: RetryPolicy::none(),
        }
    }
}

impl MatchSettings {
    /// Reads the matching knobs through `lookup`, falling back to defaults for unset keys.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let pool_size: usize = parse_or(&lookup, "CANDIDATE_POOL_SIZE", defaults.pool_size)?;
        let top_n: usize = parse_or(&lookup, "MATCH_TOP_N", defaults.top_n)?;
        let timeout_secs: u64 = parse_or(
            &lookup,
            "SCORING_TIMEOUT_SECS",
            defaults.scoring_timeout.as_secs(),
        )?;
        let embedding_dimensions: usize =
            parse_or(&lookup, "EMBEDDING_DIMENSIONS", defaults.embedding_dimensions)?;
        let metric: SimilarityMetric = parse_or(&lookup, "SIMILARITY_METRIC", defaults.metric)?;
        let max_retries: u32 = parse_or(&lookup, "LLM_MAX_RETRIES", 0)?;

        if pool_size == 0 {
            bail!("CANDIDATE_POOL_SIZE must be at least 1");
        }
        if top_n == 0 {
            bail!("MATCH_TOP_N must be at least 1");
        }
        if embedding_dimensions == 0 {
            bail!("EMBEDDING_DIMENSIONS must be at least 1");
        }
        if timeout_secs == 0 {
            bail!("SCORING_TIMEOUT_SECS must be at least 1");
        }

        let retry = if max_retries == 0 {
            RetryPolicy::none()
        } else {
            RetryPolicy::with_retries(max_retries, Duration::from_millis(1000))
        };

        Ok(Self {
            pool_size,
            top_n,
            max_concurrency: MAX_SCORING_CONCURRENCY,
            scoring_timeout: Duration::from_secs(timeout_secs),
            embedding_dimensions,
            metric,
            retry,
        })
    }

    /// Effective number of simultaneous scoring tasks for `candidates` postings.
    pub fn concurrency_for(&self, candidates: usize) -> usize {
        candidates
            .min(self.pool_size)
            .min(self.max_concurrency)
            .max(1)
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let store_backend: StoreBackend = std::env::var("STORE_BACKEND")
            .unwrap_or_else(|_| "postgres".to_string())
            .parse()?;

        let database_url = match store_backend {
            StoreBackend::Postgres => Some(require_env("DATABASE_URL")?),
            StoreBackend::Memory => std::env::var("DATABASE_URL").ok(),
        };

        Ok(Config {
            store_backend,
            database_url,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            gemini_api_key: require_env("GEMINI_API_KEY")?,
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            matching: MatchSettings::from_lookup(|key| std::env::var(key).ok())?,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map_err(|e| anyhow::anyhow!("{key} has an invalid value '{raw}': {e}")),
        _ => Ok(default),
    }
}
