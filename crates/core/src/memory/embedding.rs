//! # Embedders
//!
//! Two [`Embedder`] implementations:
//!
//! - `HttpEmbedder` - any OpenAI-compatible `/embeddings` endpoint (OpenAI,
//!   Ollama, vLLM, text-embeddings-inference)
//! - `HashingEmbedder` - deterministic bag-of-words hashing, no network. Used
//!   for offline runs and tests; similarity is lexical, not semantic.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::error::MemoryError;
use super::facts::Embedder;

/// Deterministic token-hashing embedder
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }

    /// Embed synchronously
    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimensions];
        for token in text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let token = token.to_lowercase();
            let bucket = (fnv1a(token.as_bytes()) % self.dimensions as u64) as usize;
            vec[bucket] += 1.0;
        }

        let norm: f32 = vec.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vec.iter_mut().for_each(|x| *x /= norm);
        }
        vec
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        Ok(self.embed_text(text))
    }
}

/// Stable 64-bit FNV-1a, so stored vectors survive toolchain upgrades
fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= u64::from(*byte);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

/// OpenAI-compatible embeddings client
#[derive(Debug, Clone)]
pub struct HttpEmbedder {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
}

impl HttpEmbedder {
    /// `base_url` is the API root, e.g. `http://localhost:11434/v1`
    pub fn new(
        base_url: &str,
        model: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, MemoryError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MemoryError::Embedding(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.into(),
            api_key,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn first_embedding(response: EmbeddingResponse) -> Result<Vec<f32>, MemoryError> {
    response
        .data
        .into_iter()
        .next()
        .map(|d| d.embedding)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| MemoryError::Embedding("response contained no embedding".into()))
}

#[async_trait]
impl Embedder for HttpEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, MemoryError> {
        let mut request = self.client.post(&self.endpoint).json(&EmbeddingRequest {
            model: &self.model,
            input: text,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MemoryError::Embedding(format!("request failed: {}", e)))?
            .error_for_status()
            .map_err(|e| MemoryError::Embedding(format!("embedding API error: {}", e)))?;

        let body: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| MemoryError::Embedding(format!("invalid response: {}", e)))?;

        first_embedding(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::vector_index::cosine_similarity;

    #[tokio::test]
    async fn test_hashing_embedder_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new(64);
        let a = embedder.embed("Rescue dogs").await.unwrap();
        let b = embedder.embed("rescue DOGS").await.unwrap();

        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_hashing_embedder_prefers_shared_words() {
        let embedder = HashingEmbedder::default();
        let query = embedder.embed_text("good rescue dog");
        let close = embedder.embed_text("St. Bernards are historically used for rescue.");
        let far = embedder.embed_text("Poodles need regular grooming.");

        assert!(cosine_similarity(&query, &close) > cosine_similarity(&query, &far));
    }

    #[test]
    fn test_empty_text_embeds_to_zero_vector() {
        let vec = HashingEmbedder::new(8).embed_text("  ");
        assert!(vec.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn test_http_embedder_endpoint_and_response_parsing() {
        let embedder = HttpEmbedder::new(
            "http://localhost:11434/v1/",
            "nomic-embed-text",
            None,
            Duration::from_secs(5),
        )
        .unwrap();
        assert_eq!(embedder.endpoint(), "http://localhost:11434/v1/embeddings");

        let ok: EmbeddingResponse =
            serde_json::from_str(r#"{"data":[{"embedding":[0.1,0.2]}]}"#).unwrap();
        assert_eq!(first_embedding(ok).unwrap(), vec![0.1, 0.2]);

        let empty: EmbeddingResponse = serde_json::from_str(r#"{"data":[]}"#).unwrap();
        assert!(matches!(
            first_embedding(empty),
            Err(MemoryError::Embedding(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_embedding_error() {
        let embedder = HttpEmbedder::new(
            "http://127.0.0.1:9",
            "nomic-embed-text",
            None,
            Duration::from_millis(500),
        )
        .unwrap();
        assert!(matches!(
            embedder.embed("hello").await,
            Err(MemoryError::Embedding(_))
        ));
    }
}
