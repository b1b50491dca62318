//! Embedding client: turns résumé and job-posting text into fixed-length vectors.
//!
//! Both sides of the similarity search (postings at write time, résumés at match time)
//! go through the same `Embedder`, so the dimension check here is what keeps the two
//! vector spaces compatible.

use async_trait::async_trait;
use thiserror::Error;

pub mod gemini;

pub use gemini::GeminiEmbedder;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("cannot embed empty text")]
    EmptyInput,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("embedding API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("embedding API returned no vector")]
    EmptyVector,

    #[error("embedding has dimension {actual}, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding has a non-finite value at index {index}")]
    NonFinite { index: usize },
}

/// Produces embedding vectors for arbitrary text.
///
/// Held in `AppState` as `Arc<dyn Embedder>` so tests can swap in a fixed table of vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Dimension every vector returned by `embed` must have.
    fn dimensions(&self) -> usize;
}

/// Rejects empty vectors, vectors of the wrong dimension, and NaN or infinite components.
pub fn check_dimensions(vector: Vec<f32>, expected: usize) -> Result<Vec<f32>, EmbeddingError> {
    if vector.is_empty() {
        return Err(EmbeddingError::EmptyVector);
    }
    if vector.len() != expected {
        return Err(EmbeddingError::DimensionMismatch {
            expected,
            actual: vector.len(),
        });
    }
    if let Some(index) = vector.iter().position(|v| !v.is_finite()) {
        return Err(EmbeddingError::NonFinite { index });
    }
    Ok(vector)
}

/// Text embedded for a job posting: title on its own line, then the description.
pub fn job_posting_text(title: &str, description: &str) -> String {
    format!("{}\n\n{}", title.trim(), description.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_dimensions_accepts_matching_vector() {
        let v = check_dimensions(vec![0.1, 0.2, 0.3], 3).unwrap();
        assert_eq!(v.len(), 3);
    }

    #[test]
    fn test_check_dimensions_rejects_empty() {
        assert!(matches!(
            check_dimensions(vec![], 3),
            Err(EmbeddingError::EmptyVector)
        ));
    }

    #[test]
    fn test_check_dimensions_rejects_wrong_length() {
        match check_dimensions(vec![1.0, 0.0], 768) {
            Err(EmbeddingError::DimensionMismatch { expected, actual }) => {
                assert_eq!(expected, 768);
                assert_eq!(actual, 2);
            }
            other => panic!("expected DimensionMismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_check_dimensions_rejects_non_finite_values() {
        assert!(matches!(
            check_dimensions(vec![0.5, f32::NAN], 2),
            Err(EmbeddingError::NonFinite { index: 1 })
        ));
        assert!(matches!(
            check_dimensions(vec![f32::INFINITY, 0.0], 2),
            Err(EmbeddingError::NonFinite { index: 0 })
        ));
    }

    #[test]
    fn test_job_posting_text_joins_title_and_description() {
        let text = job_posting_text("  Rust Engineer ", "Build services.\n");
        assert_eq!(text, "Rust Engineer\n\nBuild services.");
    }
}
