//! Gemini `text-embedding-004` client over the public REST API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::embedding::{check_dimensions, Embedder, EmbeddingError};
use crate::llm_client::RetryPolicy;

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const EMBEDDING_MODEL: &str = "models/text-embedding-004";
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct EmbedContentRequest<'a> {
    model: &'a str,
    content: Content<'a>,
    task_type: &'a str,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedContentResponse {
    embedding: Option<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    #[serde(default)]
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorBody,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorBody {
    message: String,
}

/// `Embedder` backed by Gemini. Uses the `RETRIEVAL_DOCUMENT` task type for both
/// résumés and postings so the two sides share one vector space.
///
/// 429, 5xx and transport failures are retried only as far as the `RetryPolicy` allows.
#[derive(Clone)]
pub struct GeminiEmbedder {
    client: Client,
    api_key: String,
    dimensions: usize,
    retry: RetryPolicy,
    base_url: String,
}

impl GeminiEmbedder {
    pub fn new(
        api_key: String,
        dimensions: usize,
        retry: RetryPolicy,
    ) -> Result<Self, EmbeddingError> {
        Ok(Self {
            client: Client::builder().timeout(HTTP_TIMEOUT).build()?,
            api_key,
            dimensions,
            retry,
            base_url: GEMINI_API_BASE.to_string(),
        })
    }

    #[cfg(test)]
    fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl Embedder for GeminiEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        debug!(text_len = text.len(), "embedding text with Gemini");

        let body = EmbedContentRequest {
            model: EMBEDDING_MODEL,
            content: Content {
                parts: [Part { text }],
            },
            task_type: "RETRIEVAL_DOCUMENT",
        };
        let url = format!("{}/{EMBEDDING_MODEL}:embedContent", self.base_url);

        let attempts = self.retry.max_attempts.max(1);
        let mut last_error: Option<EmbeddingError> = None;

        for attempt in 0..attempts {
            if attempt > 0 {
                let delay = self.retry.delay_before(attempt);
                warn!(
                    "Embedding attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(&url)
                .query(&[("key", self.api_key.as_str())])
                .json(&body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(EmbeddingError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<GeminiError>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                error!(status = status.as_u16(), "Gemini embedding request failed: {message}");
                let failure = EmbeddingError::Api {
                    status: status.as_u16(),
                    message,
                };
                if status.as_u16() == 429 || status.is_server_error() {
                    last_error = Some(failure);
                    continue;
                }
                return Err(failure);
            }

            let parsed: EmbedContentResponse = response.json().await?;
            let values = parsed
                .embedding
                .map(|e| e.values)
                .ok_or(EmbeddingError::EmptyVector)?;

            return check_dimensions(values, self.dimensions);
        }

        Err(last_error.unwrap_or(EmbeddingError::EmptyVector))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};

    #[test]
    fn test_request_body_uses_camel_case_task_type() {
        let body = EmbedContentRequest {
            model: EMBEDDING_MODEL,
            content: Content {
                parts: [Part { text: "hello" }],
            },
            task_type: "RETRIEVAL_DOCUMENT",
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["taskType"], "RETRIEVAL_DOCUMENT");
        assert_eq!(json["content"]["parts"][0]["text"], "hello");
        assert_eq!(json["model"], "models/text-embedding-004");
    }

    #[test]
    fn test_response_without_embedding_deserializes() {
        let parsed: EmbedContentResponse = serde_json::from_str("{}").unwrap();
        assert!(parsed.embedding.is_none());
    }

    #[test]
    fn test_response_values_deserialize() {
        let parsed: EmbedContentResponse =
            serde_json::from_str(r#"{"embedding": {"values": [0.5, -0.25]}}"#).unwrap();
        assert_eq!(parsed.embedding.unwrap().values, vec![0.5, -0.25]);
    }

    #[tokio::test]
    async fn test_empty_text_is_rejected_without_network() {
        let embedder =
            GeminiEmbedder::new("test-key".to_string(), 768, RetryPolicy::none()).unwrap();
        let err = embedder.embed("   ").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::EmptyInput));
    }

    /// Serves `statuses` in order, one per connection, and counts the requests seen.
    async fn scripted_server(statuses: Vec<(u16, &'static str)>) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);

        tokio::spawn(async move {
            for (status, body) in statuses {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };
                read_request(&mut socket).await;
                counter.fetch_add(1, Ordering::SeqCst);
                let response = format!(
                    "HTTP/1.1 {status} Scripted\r\ncontent-type: application/json\r\n\
                     content-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        (format!("http://{addr}"), hits)
    }

    async fn read_request(socket: &mut TcpStream) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let Ok(n) = socket.read(&mut chunk).await else {
                return;
            };
            if n == 0 {
                return;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buf.len() >= header_end + 4 + content_length {
                    return;
                }
            }
        }
    }

    const UNAVAILABLE: &str = r#"{"error": {"message": "backend unavailable"}}"#;
    const EMBEDDED: &str = r#"{"embedding": {"values": [0.6, 0.8]}}"#;

    #[tokio::test]
    async fn test_no_retry_policy_makes_single_attempt() {
        let (base, hits) = scripted_server(vec![(503, UNAVAILABLE), (200, EMBEDDED)]).await;
        let embedder = GeminiEmbedder::new("k".to_string(), 2, RetryPolicy::none())
            .unwrap()
            .with_base_url(base);

        let err = embedder.embed("Rust engineer").await.unwrap_err();

        match err {
            EmbeddingError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "backend unavailable");
            }
            other => panic!("expected Api error, got {other:?}"),
        }
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_policy_retries_server_errors() {
        let (base, hits) = scripted_server(vec![(503, UNAVAILABLE), (200, EMBEDDED)]).await;
        let retry = RetryPolicy::with_retries(2, Duration::from_millis(1));
        let embedder = GeminiEmbedder::new("k".to_string(), 2, retry)
            .unwrap()
            .with_base_url(base);

        let vector = embedder.embed("Rust engineer").await.unwrap();

        assert_eq!(vector, vec![0.6, 0.8]);
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_errors_are_not_retried() {
        let (base, hits) = scripted_server(vec![(400, UNAVAILABLE), (200, EMBEDDED)]).await;
        let retry = RetryPolicy::with_retries(2, Duration::from_millis(1));
        let embedder = GeminiEmbedder::new("k".to_string(), 2, retry)
            .unwrap()
            .with_base_url(base);

        let err = embedder.embed("Rust engineer").await.unwrap_err();

        assert!(matches!(err, EmbeddingError::Api { status: 400, .. }));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
