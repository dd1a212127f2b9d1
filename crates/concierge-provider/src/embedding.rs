//! Embedding provider trait and implementations.
//!
//! - `HttpEmbeddingProvider` calls an OpenAI-compatible embeddings endpoint.
//! - `MockEmbedding` produces deterministic hash-based unit vectors so tests
//!   get similarity 1.0 for identical texts and near-zero for unrelated ones.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::warn;

use concierge_core::config::ProviderConfig;
use concierge_core::error::ConciergeError;

/// Service for generating text embeddings.
///
/// The same provider must be used at cache-build time and at query time so
/// similarity scores are meaningful.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ConciergeError>;

    /// Embed a batch of texts, preserving order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ConciergeError>;

    /// Dimensionality of the produced vectors.
    fn dimensions(&self) -> usize;
}

// ---------------------------------------------------------------------------
// HttpEmbeddingProvider
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingDatum>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingDatum {
    index: usize,
    embedding: Vec<f32>,
}

/// reqwest-backed embeddings client.
pub struct HttpEmbeddingProvider {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    dimensions: usize,
}

impl HttpEmbeddingProvider {
    /// Build the client from a tenant's provider section.
    ///
    /// `dimensions` must match what the configured model actually returns;
    /// 1536 covers the default ada-002 model.
    pub fn new(config: &ProviderConfig, dimensions: usize) -> Result<Self, ConciergeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                ConciergeError::Embedding(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            model: config.embed_model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ConciergeError> {
        let batch = [text.to_string()];
        let mut vectors = self.embed_batch(&batch).await?;
        vectors
            .pop()
            .ok_or_else(|| ConciergeError::Embedding("Empty embedding response".to_string()))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ConciergeError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&EmbeddingRequest {
                model: &self.model,
                input: texts,
            })
            .send()
            .await
            .map_err(|e| ConciergeError::Embedding(format!("Embedding request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Embedding endpoint returned an error");
            return Err(ConciergeError::Embedding(format!(
                "Embedding endpoint returned {}: {}",
                status, body
            )));
        }

        let parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            ConciergeError::Embedding(format!("Malformed embedding response: {}", e))
        })?;

        // The API may reorder; restore input order by index.
        let mut data = parsed.data;
        data.sort_by_key(|d| d.index);
        if data.len() != texts.len() {
            return Err(ConciergeError::Embedding(format!(
                "Expected {} embeddings, got {}",
                texts.len(),
                data.len()
            )));
        }

        Ok(data.into_iter().map(|d| d.embedding).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

// ---------------------------------------------------------------------------
// MockEmbedding - deterministic hash-based vectors for testing
// ---------------------------------------------------------------------------

/// Mock embedding provider returning deterministic 384-dimensional unit
/// vectors derived from a hash of the input text.
///
/// Identical inputs embed identically (cosine 1.0); unrelated inputs land
/// near orthogonal, which is enough to exercise threshold logic.
#[derive(Debug, Clone, Default)]
pub struct MockEmbedding;

impl MockEmbedding {
    pub fn new() -> Self {
        Self
    }

    fn hash_to_vector(text: &str) -> Vec<f32> {
        let mut result = Vec::with_capacity(384);
        for i in 0..384 {
            let mut hasher = DefaultHasher::new();
            text.hash(&mut hasher);
            i.hash(&mut hasher);
            let h = hasher.finish();
            let val = ((h as f64) / (u64::MAX as f64)) * 2.0 - 1.0;
            result.push(val as f32);
        }

        // L2-normalize to unit length so cosine against itself is exactly 1.
        let norm: f32 = result.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for val in &mut result {
                *val /= norm;
            }
        }

        result
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ConciergeError> {
        if text.is_empty() {
            return Err(ConciergeError::Embedding(
                "Cannot embed empty text".to_string(),
            ));
        }
        Ok(Self::hash_to_vector(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ConciergeError> {
        let mut vectors = Vec::with_capacity(texts.len());
        for text in texts {
            vectors.push(self.embed(text).await?);
        }
        Ok(vectors)
    }

    fn dimensions(&self) -> usize {
        384
    }
}
