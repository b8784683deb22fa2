//! Query embedders.
//!
//! [`HttpEmbedder`] talks to any OpenAI-compatible `/v1/embeddings` endpoint
//! (OpenAI, text-embeddings-inference, vLLM, Ollama). [`HashingEmbedder`] is a
//! deterministic offline stand-in used by the in-memory roster and tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::semantic::VectorIndexError;

#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("embedding endpoint unreachable: {0}")]
    Unreachable(String),
    #[error("embedding endpoint returned {status}: {detail}")]
    Rejected { status: u16, detail: String },
    #[error("malformed embedding response: {0}")]
    Malformed(String),
    #[error("text has no embeddable tokens")]
    NoTokens,
    #[error("invalid embedder configuration: {0}")]
    Config(String),
}

impl From<EmbeddingError> for VectorIndexError {
    fn from(value: EmbeddingError) -> Self {
        match value {
            EmbeddingError::Unreachable(detail) => VectorIndexError::Unavailable(detail),
            other => VectorIndexError::Embedding(other.to_string()),
        }
    }
}

/// Settings for [`HttpEmbedder`].
#[derive(Debug, Clone)]
pub struct HttpEmbedderConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
}

impl Default for HttpEmbedderConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8080/v1/embeddings".to_string(),
            api_key: None,
            model: "all-mpnet-base-v2".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: Client,
    config: HttpEmbedderConfig,
}

impl HttpEmbedder {
    pub fn new(config: HttpEmbedderConfig) -> Result<Self, EmbeddingError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        match &config.api_key {
            Some(key) => {
                let value = HeaderValue::from_str(&format!("Bearer {key}"))
                    .map_err(|err| EmbeddingError::Config(format!("invalid api key: {err}")))?;
                headers.insert(AUTHORIZATION, value);
            }
            None if config.endpoint.contains("openai.com") => {
                warn!(endpoint = %config.endpoint, "no api key configured for embedding endpoint");
            }
            None => {}
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|err| EmbeddingError::Config(format!("failed to build client: {err}")))?;

        info!(endpoint = %config.endpoint, model = %config.model, "http embedder initialized");

        Ok(Self { client, config })
    }
}

#[async_trait]
impl QueryEmbedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let request = EmbeddingRequest {
            model: &self.config.model,
            input: [text],
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|err| EmbeddingError::Unreachable(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorResponse>(&body)
                .map(|parsed| parsed.error.message)
                .unwrap_or(body);
            return Err(EmbeddingError::Rejected {
                status: status.as_u16(),
                detail,
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|err| EmbeddingError::Malformed(err.to_string()))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|data| data.embedding)
            .filter(|embedding| !embedding.is_empty())
            .ok_or_else(|| EmbeddingError::Malformed("no embedding returned".to_string()))?;

        debug!(dimensions = embedding.len(), "query embedded");
        Ok(embedding)
    }
}

/// Feature-hashing bag-of-words embedder. Same text, same vector, on every
/// platform and release.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self { dimensions: 256 }
    }
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    pub fn embed_text(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vector = vec![0.0f32; self.dimensions];
        let mut tokens = 0usize;

        for token in text
            .split(|c: char| !c.is_alphanumeric() && c != '+' && c != '#')
            .filter(|token| !token.is_empty())
        {
            let hash = fnv1a(token.to_lowercase().as_bytes());
            let bucket = (hash % self.dimensions as u64) as usize;
            let sign = if hash & (1 << 63) == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
            tokens += 1;
        }

        if tokens == 0 {
            return Err(EmbeddingError::NoTokens);
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|v| *v /= norm);
        }
        Ok(vector)
    }
}

#[async_trait]
impl QueryEmbedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_text(text)
    }
}

/// Cosine similarity of two vectors; zero when either is all zeros.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b = b.iter().map(|y| y * y).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    bytes
        .iter()
        .fold(OFFSET, |hash, byte| (hash ^ u64::from(*byte)).wrapping_mul(PRIME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashing_embedder_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(64);
        let first = embedder.embed_text("Rust systems engineer").expect("embeds");
        let second = embedder.embed_text("rust SYSTEMS engineer").expect("embeds");
        assert_eq!(first, second);

        let norm = first.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn hashing_embedder_rejects_text_without_tokens() {
        let embedder = HashingEmbedder::default();
        assert!(matches!(
            embedder.embed_text(" ,;- "),
            Err(EmbeddingError::NoTokens)
        ));
    }

    #[test]
    fn shared_vocabulary_scores_higher() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed_text("backend rust developer").expect("embeds");
        let close = embedder
            .embed_text("rust developer building backend services")
            .expect("embeds");
        let far = embedder.embed_text("watercolor painting").expect("embeds");
        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[test]
    fn unreachable_embedder_maps_to_unavailable_index() {
        let error: VectorIndexError = EmbeddingError::Unreachable("refused".to_string()).into();
        assert!(matches!(error, VectorIndexError::Unavailable(_)));

        let error: VectorIndexError = EmbeddingError::NoTokens.into();
        assert!(matches!(error, VectorIndexError::Embedding(_)));
    }
}
