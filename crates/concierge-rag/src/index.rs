//! In-memory vector index with brute-force cosine similarity search.
//!
//! All operations are O(n) for search, which is acceptable for the
//! per-tenant corpus sizes this serves. Supports plain top-k retrieval
//! and maximal-marginal-relevance re-ranking for diversity.

use serde::{Deserialize, Serialize};

use concierge_core::error::ConciergeError;
use concierge_provider::EmbeddingProvider;

/// A chunk of tenant document text, tagged with the file it came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub text: String,
    pub source: String,
}

/// A retrieval hit with its cosine similarity score.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

/// Brute-force cosine index over document chunks.
#[derive(Debug, Default)]
pub struct VectorIndex {
    chunks: Vec<DocumentChunk>,
    embeddings: Vec<Vec<f32>>,
}

impl VectorIndex {
    /// Embed every chunk and build the index in one pass.
    pub async fn build(
        chunks: Vec<DocumentChunk>,
        embedder: &dyn EmbeddingProvider,
    ) -> Result<Self, ConciergeError> {
        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = if texts.is_empty() {
            Vec::new()
        } else {
            embedder.embed_batch(&texts).await?
        };

        if embeddings.len() != chunks.len() {
            return Err(ConciergeError::Embedding(format!(
                "embedded {} chunks but expected {}",
                embeddings.len(),
                chunks.len()
            )));
        }

        Ok(Self { chunks, embeddings })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Distinct source names, in first-seen order.
    pub fn sources(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for chunk in &self.chunks {
            if !seen.contains(&chunk.source) {
                seen.push(chunk.source.clone());
            }
        }
        seen
    }

    /// Top-k chunks by descending cosine similarity, optionally restricted
    /// to a single source.
    pub fn search(&self, query: &[f32], k: usize, source: Option<&str>) -> Vec<ScoredChunk> {
        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .zip(self.embeddings.iter())
            .filter(|(chunk, _)| source.map_or(true, |s| chunk.source == s))
            .map(|(chunk, emb)| ScoredChunk {
                chunk: chunk.clone(),
                score: cosine_similarity(query, emb),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);
        scored
    }

    /// Top-k chunks re-ranked by maximal marginal relevance.
    ///
    /// `lambda` trades relevance against diversity: 1.0 is plain similarity
    /// ordering, 0.0 picks maximally dissimilar chunks. Candidates are drawn
    /// from a pool wider than k so diversity has something to choose from.
    pub fn search_mmr(
        &self,
        query: &[f32],
        k: usize,
        lambda: f32,
        source: Option<&str>,
    ) -> Vec<ScoredChunk> {
        let pool_size = (k * 4).max(20);
        let indexed: Vec<(usize, f32)> = {
            let mut scored: Vec<(usize, f32)> = self
                .chunks
                .iter()
                .enumerate()
                .filter(|(_, chunk)| source.map_or(true, |s| chunk.source == s))
                .map(|(i, _)| (i, cosine_similarity(query, &self.embeddings[i])))
                .collect();
            scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
            scored.truncate(pool_size);
            scored
        };

        let mut selected: Vec<(usize, f32)> = Vec::with_capacity(k);
        let mut remaining = indexed;

        while selected.len() < k && !remaining.is_empty() {
            let mut best_pos = 0;
            let mut best_mmr = f32::NEG_INFINITY;

            for (pos, &(idx, relevance)) in remaining.iter().enumerate() {
                let max_sim_to_selected = selected
                    .iter()
                    .map(|&(sel, _)| {
                        cosine_similarity(&self.embeddings[idx], &self.embeddings[sel])
                    })
                    .fold(0.0f32, f32::max);
                let mmr = lambda * relevance - (1.0 - lambda) * max_sim_to_selected;
                if mmr > best_mmr {
                    best_mmr = mmr;
                    best_pos = pos;
                }
            }

            selected.push(remaining.remove(best_pos));
        }

        selected
            .into_iter()
            .map(|(idx, score)| ScoredChunk {
                chunk: self.chunks[idx].clone(),
                score,
            })
            .collect()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot: f64 = a
        .iter()
        .zip(b.iter())
        .map(|(x, y)| (*x as f64) * (*y as f64))
        .sum();
    let mag_a: f64 = a.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();
    let mag_b: f64 = b.iter().map(|x| (*x as f64).powi(2)).sum::<f64>().sqrt();

    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }

    (dot / (mag_a * mag_b)) as f32
}
