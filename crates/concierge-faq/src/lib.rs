//! FAQ short-circuit layer.
//!
//! Parses extracted document text into question/answer entries, caches their
//! embeddings, and answers near-duplicate queries directly by cosine
//! similarity so the expensive RAG path is only taken for novel questions.

pub mod cache;
pub mod matcher;
pub mod parser;

pub use cache::{FaqCache, FaqEntry};
pub use matcher::{FaqDecision, FaqMatcher};
pub use parser::parse_faqs;
