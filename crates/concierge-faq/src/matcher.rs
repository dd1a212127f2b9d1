//! FAQ short-circuit matcher.
//!
//! Embeds the user's question, compares against every cached question
//! embedding by cosine similarity, and decides whether the best match is
//! strong enough to answer without invoking the RAG path.

use std::sync::Arc;

use tracing::debug;

use concierge_core::error::ConciergeError;
use concierge_provider::EmbeddingProvider;

use crate::cache::FaqCache;

/// Outcome of a matcher pass.
#[derive(Debug, Clone, PartialEq)]
pub enum FaqDecision {
    /// Top match cleared the threshold: answer verbatim from the cache.
    /// `options` holds the remaining top questions as follow-up prompts.
    Answer {
        answer: String,
        score: f32,
        options: Vec<String>,
    },
    /// Top match fell short: the caller should fall through to RAG.
    /// `options` holds the nearest questions as suggestions regardless.
    Defer { score: f32, options: Vec<String> },
}

impl FaqDecision {
    pub fn score(&self) -> f32 {
        match self {
            FaqDecision::Answer { score, .. } => *score,
            FaqDecision::Defer { score, .. } => *score,
        }
    }

    pub fn options(&self) -> &[String] {
        match self {
            FaqDecision::Answer { options, .. } => options,
            FaqDecision::Defer { options, .. } => options,
        }
    }
}

/// Cosine-similarity matcher over a shared, read-only cache.
pub struct FaqMatcher {
    cache: Arc<FaqCache>,
    embedder: Arc<dyn EmbeddingProvider>,
    threshold: f32,
    top_n: usize,
}

impl FaqMatcher {
    pub fn new(
        cache: Arc<FaqCache>,
        embedder: Arc<dyn EmbeddingProvider>,
        threshold: f32,
        top_n: usize,
    ) -> Self {
        Self {
            cache,
            embedder,
            threshold,
            top_n,
        }
    }

    /// Match a query against the cache and decide answer vs. defer.
    pub async fn match_query(&self, question: &str) -> Result<FaqDecision, ConciergeError> {
        if self.cache.is_empty() {
            return Ok(FaqDecision::Defer {
                score: 0.0,
                options: Vec::new(),
            });
        }

        let query_vec = self.embedder.embed(question).await?;

        let mut scored: Vec<(usize, f32)> = self
            .cache
            .embeddings()
            .iter()
            .enumerate()
            .map(|(i, emb)| (i, cosine_similarity(&query_vec, emb)))
            .collect();
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

        let top_n = self.top_n.min(scored.len());
        let top = &scored[..top_n];
        let top_score = top[0].1;
        let questions: Vec<String> = top
            .iter()
            .map(|(i, _)| self.cache.entries()[*i].question.clone())
            .collect();

        debug!(top_score, threshold = self.threshold, "FAQ match scored");

        if top_score < self.threshold {
            // Below threshold: surface the nearest N-1 questions and defer.
            let keep = top_n.saturating_sub(1);
            return Ok(FaqDecision::Defer {
                score: top_score,
                options: questions[..keep].to_vec(),
            });
        }

        // At or above threshold: answer with the cached text verbatim and
        // offer the rest as follow-ups.
        Ok(FaqDecision::Answer {
            answer: self.cache.entries()[top[0].0].answer.clone(),
            score: top_score,
            options: questions[1..].to_vec(),
        })
    }
}

/// Cosine similarity; 0.0 for mismatched lengths or zero magnitude.
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
