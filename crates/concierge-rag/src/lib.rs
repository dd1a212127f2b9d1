//! Retrieval-augmented answering.
//!
//! Holds the in-memory chunk index and the two-stage answer engine:
//! a history-aware query rewrite followed by retrieval and grounded
//! generation against the retrieved context.

pub mod engine;
pub mod index;

pub use engine::{AnswerEngine, RagAnswer};
pub use index::{DocumentChunk, ScoredChunk, VectorIndex};
