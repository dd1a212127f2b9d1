//! Two-stage retrieval-augmented answer engine.
//!
//! Stage one rewrites the latest user message into a standalone query
//! using the conversation history; stage two retrieves the closest chunks
//! and generates an answer grounded only in that context. Project queries
//! additionally route through a source-selection step so the answer draws
//! on a single project document.

use std::sync::Arc;

use tracing::debug;

use concierge_core::config::RagConfig;
use concierge_core::error::ConciergeError;
use concierge_core::types::Message;
use concierge_provider::{EmbeddingProvider, LlmProvider};

use crate::index::VectorIndex;

const CONTEXTUALIZE_PROMPT: &str = "Given the chat history and the latest user question, \
    rewrite the question as a standalone question that can be understood without the \
    history. Do NOT answer the question. If it is already standalone, return it unchanged.";

const ANSWER_PROMPT: &str = "You are a friendly customer-support assistant. Answer the \
    user's question using ONLY the context below. Keep the answer concise, at most three \
    sentences. If the context does not contain the answer, say you don't know.";

/// A generated answer together with the chunk texts it was grounded in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RagAnswer {
    pub answer: String,
    pub context: Vec<String>,
}

/// Retrieval plus grounded generation over a tenant's document index.
pub struct AnswerEngine {
    index: Arc<VectorIndex>,
    llm: Arc<dyn LlmProvider>,
    embedder: Arc<dyn EmbeddingProvider>,
    config: RagConfig,
}

impl AnswerEngine {
    pub fn new(
        index: Arc<VectorIndex>,
        llm: Arc<dyn LlmProvider>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: RagConfig,
    ) -> Self {
        Self {
            index,
            llm,
            embedder,
            config,
        }
    }

    /// Answer a general question against the whole index.
    pub async fn answer(
        &self,
        question: &str,
        history: &[Message],
    ) -> Result<RagAnswer, ConciergeError> {
        self.answer_inner(question, history, None).await
    }

    /// Answer a project question against a single project document.
    ///
    /// The model picks which source file the question refers to; retrieval
    /// is then restricted to that file. If the pick cannot be resolved to a
    /// known source the whole index is used instead.
    pub async fn answer_project(
        &self,
        question: &str,
        history: &[Message],
    ) -> Result<RagAnswer, ConciergeError> {
        let sources = self.index.sources();
        let source = if sources.len() > 1 {
            self.select_source(question, &sources).await
        } else {
            sources.first().cloned()
        };
        self.answer_inner(question, history, source.as_deref()).await
    }

    async fn answer_inner(
        &self,
        question: &str,
        history: &[Message],
        source: Option<&str>,
    ) -> Result<RagAnswer, ConciergeError> {
        let query = if history.is_empty() {
            question.to_string()
        } else {
            self.contextualize(question, history).await?
        };

        let query_vec = self.embedder.embed(&query).await?;
        let hits = if self.config.use_mmr {
            self.index
                .search_mmr(&query_vec, self.config.top_k, self.config.mmr_lambda, source)
        } else {
            self.index.search(&query_vec, self.config.top_k, source)
        };

        debug!(query = %query, hits = hits.len(), ?source, "retrieved context");

        let context: Vec<String> = hits.into_iter().map(|h| h.chunk.text).collect();
        let system = format!("{}\n\nContext:\n{}", ANSWER_PROMPT, context.join("\n\n"));
        let answer = self.llm.complete(&system, history, question).await?;

        Ok(RagAnswer { answer, context })
    }

    /// Rewrite the question into a standalone query using the history.
    /// A failed or empty rewrite falls back to the original text.
    async fn contextualize(
        &self,
        question: &str,
        history: &[Message],
    ) -> Result<String, ConciergeError> {
        let rewritten = self
            .llm
            .complete(CONTEXTUALIZE_PROMPT, history, question)
            .await?;
        let rewritten = rewritten.trim();
        if rewritten.is_empty() {
            Ok(question.to_string())
        } else {
            Ok(rewritten.to_string())
        }
    }

    /// Ask the model which source file a project question refers to.
    /// Returns None when the reply is unusable so retrieval stays global.
    async fn select_source(&self, question: &str, sources: &[String]) -> Option<String> {
        let prompt = format!(
            "A user asked about one of our projects. Pick the single document the \
             question refers to from this list: {:?}. Question: {:?}. Reply with a JSON \
             object of the form {{\"source\": \"<document name>\"}}.",
            sources, question
        );

        let value = match self.llm.complete_json(&prompt).await {
            Ok(v) => v,
            Err(err) => {
                debug!(%err, "source selection failed; searching all documents");
                return None;
            }
        };

        value
            .get("source")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .filter(|s| sources.iter().any(|known| known == s))
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::DocumentChunk;
    use concierge_provider::{FailingLlm, MockEmbedding, MockLlm};
    use serde_json::json;

    fn chunk(text: &str, source: &str) -> DocumentChunk {
        DocumentChunk {
            text: text.to_string(),
            source: source.to_string(),
        }
    }

    async fn engine_with(llm: Arc<dyn LlmProvider>, config: RagConfig) -> AnswerEngine {
        let index = VectorIndex::build(
            vec![
                chunk("We build web applications.", "services.pdf"),
                chunk("Pricing depends on scope.", "services.pdf"),
                chunk("Project Apollo shipped in 2023.", "apollo.pdf"),
                chunk("Project Zephyr is a mobile app.", "zephyr.pdf"),
            ],
            &MockEmbedding::new(),
        )
        .await
        .unwrap();
        AnswerEngine::new(
            Arc::new(index),
            llm,
            Arc::new(MockEmbedding::new()),
            config,
        )
    }

    #[tokio::test]
    async fn test_answer_returns_reply_and_context() {
        let llm = Arc::new(MockLlm::new().with_completions(vec!["We build web apps.".to_string()]));
        let engine = engine_with(llm.clone(), RagConfig::default()).await;

        let result = engine.answer("What do you build?", &[]).await.unwrap();
        assert_eq!(result.answer, "We build web apps.");
        assert!(!result.context.is_empty());
        // No history means no rewrite call.
        assert_eq!(llm.complete_calls(), 1);
    }

    #[tokio::test]
    async fn test_history_triggers_rewrite_before_generation() {
        let llm = Arc::new(MockLlm::new().with_completions(vec![
            "What does the pricing depend on?".to_string(),
            "It depends on scope.".to_string(),
        ]));
        let engine = engine_with(llm.clone(), RagConfig::default()).await;

        let history = vec![
            Message::user("Tell me about pricing"),
            Message::assistant("Pricing depends on scope."),
        ];
        let result = engine.answer("what does it depend on?", &history).await.unwrap();

        assert_eq!(result.answer, "It depends on scope.");
        assert_eq!(llm.complete_calls(), 2);
    }

    #[tokio::test]
    async fn test_project_answer_restricts_to_selected_source() {
        let llm = Arc::new(
            MockLlm::new()
                .with_json(vec![json!({"source": "apollo.pdf"})])
                .with_completions(vec!["Apollo shipped in 2023.".to_string()]),
        );
        let engine = engine_with(llm.clone(), RagConfig::default()).await;

        let result = engine
            .answer_project("When did Apollo ship?", &[])
            .await
            .unwrap();

        assert_eq!(result.answer, "Apollo shipped in 2023.");
        assert_eq!(result.context, vec!["Project Apollo shipped in 2023."]);
        assert_eq!(llm.json_calls(), 1);
    }

    #[tokio::test]
    async fn test_project_answer_unknown_source_searches_everything() {
        let llm = Arc::new(
            MockLlm::new()
                .with_json(vec![json!({"source": "nonexistent.pdf"})])
                .with_completions(vec!["Here is what I found.".to_string()]),
        );
        let engine = engine_with(llm, RagConfig::default()).await;

        let result = engine
            .answer_project("Tell me about your projects", &[])
            .await
            .unwrap();

        // Fell back to the full index, so context is not limited to one file.
        assert_eq!(result.context.len(), 4);
    }

    #[tokio::test]
    async fn test_context_populated_even_without_mmr() {
        let config = RagConfig {
            top_k: 2,
            mmr_lambda: 0.25,
            use_mmr: false,
        };
        let llm = Arc::new(MockLlm::new());
        let engine = engine_with(llm, config).await;

        let result = engine.answer("pricing?", &[]).await.unwrap();
        assert_eq!(result.context.len(), 2);
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let engine = engine_with(Arc::new(FailingLlm), RagConfig::default()).await;
        let err = engine.answer("anything", &[]).await.unwrap_err();
        assert!(matches!(err, ConciergeError::Provider(_)));
    }
}
