//! Conversation orchestrator: central coordinator wiring routing, lead
//! capture, FAQ short-circuit, retrieval, and career search.
//!
//! One call per inbound message. The per-session lock serializes turns
//! for the same session; different sessions proceed independently.

use std::sync::Arc;

use tracing::{debug, error, info};

use concierge_career::{CareerAdvisor, JobListing};
use concierge_core::config::ChatConfig;
use concierge_core::error::ConciergeError;
use concierge_core::types::{Branch, Message, Session};
use concierge_faq::{FaqDecision, FaqMatcher};
use concierge_rag::AnswerEngine;
use concierge_store::{SessionLocks, SessionStore};

use crate::error::EngineError;
use crate::intro::LeadCapture;
use crate::supervisor::Supervisor;

/// Everything one turn produces for the caller.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TurnOutput {
    /// Assistant reply text.
    pub answer: String,
    /// Suggested follow-up questions from the FAQ matcher.
    pub options: Vec<String>,
    /// Menu options, populated when lead capture completes.
    pub quick_replies: Vec<String>,
    /// Structured job listings mentioned in a career reply.
    pub jobs: Vec<JobListing>,
    /// Grounding text behind a retrieval-based answer.
    pub context: Vec<String>,
}

/// Per-tenant conversation engine.
pub struct ChatEngine {
    store: Arc<dyn SessionStore>,
    locks: SessionLocks,
    supervisor: Supervisor,
    lead: LeadCapture,
    faq: FaqMatcher,
    rag: AnswerEngine,
    career: CareerAdvisor,
    config: ChatConfig,
}

impl ChatEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn SessionStore>,
        supervisor: Supervisor,
        lead: LeadCapture,
        faq: FaqMatcher,
        rag: AnswerEngine,
        career: CareerAdvisor,
        config: ChatConfig,
    ) -> Self {
        Self {
            store,
            locks: SessionLocks::new(),
            supervisor,
            lead,
            faq,
            rag,
            career,
            config,
        }
    }

    /// Process one inbound message for a session.
    ///
    /// Sub-flow failures are absorbed: the configured error message is
    /// substituted and the turn, including the user's message, is still
    /// persisted. Validation and storage failures are returned.
    pub async fn handle_turn(
        &self,
        session_id: &str,
        user_text: &str,
    ) -> Result<TurnOutput, EngineError> {
        let user_text = user_text.trim();
        if user_text.is_empty() {
            return Err(EngineError::EmptyMessage);
        }
        if user_text.len() > self.config.max_message_length {
            return Err(EngineError::MessageTooLong(self.config.max_message_length));
        }

        let _guard = self.locks.acquire(session_id).await;

        let mut session = self
            .store
            .load(session_id)?
            .unwrap_or_else(|| Session::new(session_id));
        session.clear_transient();

        // History as it stood before this turn, for query rewriting.
        let history = session.messages.clone();
        session.push(Message::user(user_text));

        let branch = self.supervisor.classify(&session, user_text).await;
        session.next_branch = Some(branch);
        debug!(session_id, ?branch, "routed turn");

        let mut jobs = Vec::new();
        let mut context = Vec::new();

        let answer = match self.dispatch(branch, &mut session, user_text, &history).await {
            Ok(turn) => {
                jobs = turn.jobs;
                context = turn.context;
                turn.answer
            }
            Err(err) => {
                error!(session_id, ?branch, %err, "turn failed; substituting error reply");
                self.config.error_message.clone()
            }
        };

        session.push(Message::assistant(answer.clone()));
        self.store.save(&session)?;
        info!(session_id, ?branch, messages = session.messages.len(), "turn persisted");

        Ok(TurnOutput {
            answer,
            options: session.options.clone(),
            quick_replies: session.quick_replies.clone(),
            jobs,
            context,
        })
    }

    async fn dispatch(
        &self,
        branch: Branch,
        session: &mut Session,
        user_text: &str,
        history: &[Message],
    ) -> Result<TurnOutput, ConciergeError> {
        match branch {
            Branch::Introduction => {
                let answer = self.lead.handle(session, user_text).await?;
                Ok(TurnOutput {
                    answer,
                    ..TurnOutput::default()
                })
            }
            Branch::Services => {
                match self.faq.match_query(user_text).await? {
                    FaqDecision::Answer {
                        answer,
                        score,
                        options,
                    } => {
                        session.score = score;
                        session.options = options;
                        Ok(TurnOutput {
                            answer,
                            ..TurnOutput::default()
                        })
                    }
                    FaqDecision::Defer { score, options } => {
                        session.score = score;
                        session.options = options;
                        let result = self.rag.answer(user_text, history).await?;
                        Ok(TurnOutput {
                            answer: result.answer,
                            context: result.context,
                            ..TurnOutput::default()
                        })
                    }
                }
            }
            Branch::Projects => {
                let result = self.rag.answer_project(user_text, history).await?;
                Ok(TurnOutput {
                    answer: result.answer,
                    context: result.context,
                    ..TurnOutput::default()
                })
            }
            Branch::Career => {
                let reply = self.career.respond(user_text).await;
                Ok(TurnOutput {
                    answer: reply.answer,
                    jobs: reply.jobs,
                    ..TurnOutput::default()
                })
            }
            Branch::Fallback => Ok(TurnOutput {
                answer: self.supervisor.fallback().to_string(),
                ..TurnOutput::default()
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use concierge_core::config::{RagConfig, ValidationConfig};
    use concierge_core::types::Mode;
    use concierge_faq::FaqCache;
    use concierge_provider::{EmbeddingProvider, FailingLlm, LlmProvider, MockEmbedding, MockLlm};
    use concierge_rag::{DocumentChunk, VectorIndex};
    use concierge_store::SqliteSessionStore;
    use concierge_career::MockJobSource;
    use serde_json::json;

    use crate::supervisor::Classifier;

    async fn build_engine(llm: Arc<dyn LlmProvider>) -> (ChatEngine, Arc<SqliteSessionStore>) {
        let store = Arc::new(SqliteSessionStore::in_memory().unwrap());
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbedding::new());
        let config = ChatConfig::default();

        let faq_cache = Arc::new(
            FaqCache::build(
                &["What services do you offer?\nDesign and engineering.\n\
                   How much does it cost?\nDepends on scope.\n"
                    .to_string()],
                embedder.as_ref(),
            )
            .await
            .unwrap(),
        );
        let faq = FaqMatcher::new(faq_cache, embedder.clone(), 0.85, 7);

        let index = Arc::new(
            VectorIndex::build(
                vec![
                    DocumentChunk {
                        text: "We build web applications.".into(),
                        source: "services.pdf".into(),
                    },
                    DocumentChunk {
                        text: "Project Apollo shipped in 2023.".into(),
                        source: "apollo.pdf".into(),
                    },
                ],
                embedder.as_ref(),
            )
            .await
            .unwrap(),
        );
        let rag = AnswerEngine::new(index, llm.clone(), embedder.clone(), RagConfig::default());

        let career = CareerAdvisor::new(
            Arc::new(MockJobSource::new(vec![JobListing {
                title: "Rust Engineer".into(),
                location: "Remote".into(),
                link: "https://example.com/careers/rust".into(),
            }])),
            llm.clone(),
        );

        let supervisor = Supervisor::new(
            Classifier::Menu,
            llm.clone(),
            config.fallback_message.clone(),
        );
        let lead = LeadCapture::new(
            llm,
            ValidationConfig {
                check_domain_resolves: false,
            },
            config.quick_replies.clone(),
        );

        let engine = ChatEngine::new(
            store.clone(),
            supervisor,
            lead,
            faq,
            rag,
            career,
            config,
        );
        (engine, store)
    }

    /// Drive a session through lead capture into answering mode. The
    /// caller must have queued the extraction JSON on the mock.
    async fn complete_lead(engine: &ChatEngine, session_id: &str) {
        engine
            .handle_turn(session_id, "Hi, I'm Jane, jane@example.com")
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_empty_and_overlong_messages_rejected() {
        let (engine, _) = build_engine(Arc::new(MockLlm::new())).await;

        assert!(matches!(
            engine.handle_turn("s1", "   ").await,
            Err(EngineError::EmptyMessage)
        ));
        let long = "x".repeat(2001);
        assert!(matches!(
            engine.handle_turn("s1", &long).await,
            Err(EngineError::MessageTooLong(2000))
        ));
    }

    #[tokio::test]
    async fn test_cold_start_runs_lead_capture() {
        let llm = Arc::new(MockLlm::new().with_json(vec![json!({"name": "", "email": ""})]));
        let (engine, store) = build_engine(llm).await;

        let out = engine.handle_turn("s1", "hello").await.unwrap();
        assert!(out.answer.contains("name and email"));
        assert!(out.quick_replies.is_empty());

        let session = store.load("s1").unwrap().unwrap();
        assert_eq!(session.mode, Mode::Introducing);
        assert_eq!(session.messages.len(), 2);
    }

    #[tokio::test]
    async fn test_lead_completion_emits_quick_replies() {
        let llm = Arc::new(MockLlm::new().with_json(vec![
            json!({"name": "Jane", "email": "jane@example.com"}),
        ]));
        let (engine, store) = build_engine(llm).await;

        let out = engine
            .handle_turn("s1", "Jane, jane@example.com")
            .await
            .unwrap();

        assert_eq!(out.quick_replies, ChatConfig::default().quick_replies);
        let session = store.load("s1").unwrap().unwrap();
        assert_eq!(session.mode, Mode::Answering);
    }

    #[tokio::test]
    async fn test_faq_hit_answers_verbatim_without_rag() {
        let mock = MockLlm::new().with_json(vec![
            json!({"name": "Jane", "email": "jane@example.com"}),
        ]);
        let llm = Arc::new(mock);
        let (engine, _) = build_engine(llm.clone()).await;
        complete_lead(&engine, "s1").await;

        let out = engine
            .handle_turn("s1", "What services do you offer?")
            .await
            .unwrap();

        assert_eq!(out.answer, "Design and engineering.");
        assert_eq!(out.options, vec!["How much does it cost?".to_string()]);
        assert!(out.context.is_empty());
        // Verbatim path makes no generation call.
        assert_eq!(llm.complete_calls(), 0);
    }

    #[tokio::test]
    async fn test_faq_miss_falls_through_to_rag() {
        let mock = MockLlm::new()
            .with_json(vec![json!({"name": "Jane", "email": "jane@example.com"})])
            .with_completions(vec![
                "standalone question".to_string(),
                "We build web applications for clients.".to_string(),
            ]);
        let llm = Arc::new(mock);
        let (engine, _) = build_engine(llm.clone()).await;
        complete_lead(&engine, "s1").await;

        let out = engine
            .handle_turn("s1", "do you folks build custom software?")
            .await
            .unwrap();

        assert_eq!(out.answer, "We build web applications for clients.");
        assert!(!out.context.is_empty());
        assert!(!out.options.is_empty());
        assert!(llm.complete_calls() >= 1);
    }

    #[tokio::test]
    async fn test_career_quick_reply_returns_listings() {
        let mock = MockLlm::new()
            .with_json(vec![
                json!({"name": "Jane", "email": "jane@example.com"}),
                json!({"jobrole": "", "location": ""}),
            ]);
        let llm = Arc::new(mock);
        let (engine, _) = build_engine(llm.clone()).await;
        complete_lead(&engine, "s1").await;

        let out = engine.handle_turn("s1", "Looking for a job").await.unwrap();
        assert_eq!(out.jobs.len(), 1);
        assert_eq!(out.jobs[0].title, "Rust Engineer");
        assert!(out.answer.contains("https://example.com/careers/rust"));
    }

    #[tokio::test]
    async fn test_provider_failure_substitutes_error_message_and_persists() {
        let (engine, store) = build_engine(Arc::new(FailingLlm)).await;

        // Lead capture extraction fails outright.
        let out = engine.handle_turn("s1", "hello there").await.unwrap();
        assert_eq!(out.answer, ChatConfig::default().error_message);

        let session = store.load("s1").unwrap().unwrap();
        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].content, "hello there");
        assert_eq!(session.messages[1].content, ChatConfig::default().error_message);
    }

    #[tokio::test]
    async fn test_sticky_fields_survive_interleaved_turns() {
        let llm = Arc::new(MockLlm::new().with_json(vec![
            json!({"name": "Jane", "email": ""}),
            json!({"name": "", "email": "jane@example.com"}),
        ]));
        let (engine, store) = build_engine(llm).await;
        let engine = Arc::new(engine);

        // Two tasks race on the same session; the per-session lock
        // serializes them so neither write is lost.
        let e1 = engine.clone();
        let e2 = engine.clone();
        let t1 = tokio::spawn(async move { e1.handle_turn("s1", "I'm Jane").await });
        let t2 = tokio::spawn(async move { e2.handle_turn("s1", "jane@example.com").await });
        t1.await.unwrap().unwrap();
        t2.await.unwrap().unwrap();

        let session = store.load("s1").unwrap().unwrap();
        assert_eq!(session.name.as_deref(), Some("Jane"));
        assert_eq!(session.email.as_deref(), Some("jane@example.com"));
        assert_eq!(session.messages.len(), 4);
    }

    #[tokio::test]
    async fn test_disabled_tenant_does_not_affect_others() {
        use crate::registry::TenantRegistry;
        use concierge_core::config::TenantConfig;

        let llm = Arc::new(MockLlm::new().with_json(vec![json!({"name": "", "email": ""})]));
        let (engine, _) = build_engine(llm).await;

        let mut good = TenantConfig::default();
        good.tenant.client_id = "acme".to_string();
        good.provider.api_key = "sk-test".to_string();
        let mut bad = TenantConfig::default();
        bad.tenant.client_id = "broken".to_string();

        let mut registry = TenantRegistry::new();
        registry.register(&good, || engine);
        registry.register(&bad, || unreachable!());

        let err = registry.handle_turn("broken", "s1", "hi").await.unwrap_err();
        assert!(matches!(err, EngineError::NotConfigured(_)));

        let out = registry.handle_turn("acme", "s1", "hi").await.unwrap();
        assert!(out.answer.contains("name and email"));
    }

    #[tokio::test]
    async fn test_sessions_are_isolated() {
        let llm = Arc::new(MockLlm::new().with_json(vec![
            json!({"name": "Jane", "email": "jane@example.com"}),
            json!({"name": "", "email": ""}),
        ]));
        let (engine, store) = build_engine(llm).await;

        engine.handle_turn("s1", "Jane, jane@example.com").await.unwrap();
        engine.handle_turn("s2", "hello").await.unwrap();

        assert_eq!(store.load("s1").unwrap().unwrap().mode, Mode::Answering);
        assert_eq!(store.load("s2").unwrap().unwrap().mode, Mode::Introducing);
    }
}
