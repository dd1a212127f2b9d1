//! External-service boundary for the Concierge core.
//!
//! Defines the `LlmProvider` and `EmbeddingProvider` traits the rest of the
//! workspace programs against, an OpenAI-compatible HTTP implementation of
//! each, and deterministic mocks for tests.

pub mod embedding;
pub mod llm;

pub use embedding::{EmbeddingProvider, HttpEmbeddingProvider, MockEmbedding};
pub use llm::{FailingLlm, HttpLlmProvider, LlmProvider, MockLlm};
