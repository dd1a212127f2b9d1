//! FAQ embedding cache with incremental updates and JSON persistence.
//!
//! Entries and their question embeddings live in two parallel vectors.
//! When new source content arrives, only the new questions are embedded and
//! the vectors appended, so re-indexing cost stays proportional to the
//! delta.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use concierge_core::error::ConciergeError;
use concierge_provider::EmbeddingProvider;

use crate::parser::parse_faqs;

/// One cached knowledge unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FaqEntry {
    pub question: String,
    pub answer: String,
}

/// Immutable-at-query-time cache of FAQ entries and question embeddings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FaqCache {
    entries: Vec<FaqEntry>,
    embeddings: Vec<Vec<f32>>,
}

impl FaqCache {
    /// Build a cache from extracted page text, embedding every question.
    pub async fn build(
        pages: &[String],
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Self, ConciergeError> {
        let mut cache = Self::default();
        cache.extend_from_pages(pages, embedder).await?;
        Ok(cache)
    }

    /// Parse new source content and append it to the cache.
    ///
    /// Existing entries and their embeddings are left untouched; only the
    /// newly parsed questions go through the embedding provider. Returns
    /// the number of entries added.
    pub async fn extend_from_pages(
        &mut self,
        pages: &[String],
        embedder: &dyn EmbeddingProvider,
    ) -> Result<usize, ConciergeError> {
        let new_entries = parse_faqs(pages);
        if new_entries.is_empty() {
            return Ok(0);
        }

        let questions: Vec<String> = new_entries.iter().map(|e| e.question.clone()).collect();
        let new_embeddings = embedder.embed_batch(&questions).await?;
        if new_embeddings.len() != new_entries.len() {
            return Err(ConciergeError::Embedding(format!(
                "Expected {} embeddings, got {}",
                new_entries.len(),
                new_embeddings.len()
            )));
        }

        let added = new_entries.len();
        self.entries.extend(new_entries);
        self.embeddings.extend(new_embeddings);
        info!(added, total = self.entries.len(), "FAQ cache extended");
        Ok(added)
    }

    /// Load a previously saved cache.
    pub fn load(path: &Path) -> Result<Self, ConciergeError> {
        let content = std::fs::read_to_string(path)?;
        let cache: FaqCache = serde_json::from_str(&content)?;
        if cache.entries.len() != cache.embeddings.len() {
            return Err(ConciergeError::Serialization(format!(
                "FAQ cache corrupt: {} entries but {} embeddings",
                cache.entries.len(),
                cache.embeddings.len()
            )));
        }
        Ok(cache)
    }

    /// Persist the cache as JSON.
    pub fn save(&self, path: &Path) -> Result<(), ConciergeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(self)?;
        std::fs::write(path, content)?;
        info!(entries = self.entries.len(), "FAQ cache saved to {}", path.display());
        Ok(())
    }

    pub fn entries(&self) -> &[FaqEntry] {
        &self.entries
    }

    pub fn embeddings(&self) -> &[Vec<f32>] {
        &self.embeddings
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
