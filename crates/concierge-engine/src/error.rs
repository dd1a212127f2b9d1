//! Error types for the conversation engine.

use concierge_core::error::ConciergeError;

/// Errors surfaced by the engine's public entry points.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("tenant is not configured: {0}")]
    NotConfigured(String),
    #[error("unknown tenant: {0}")]
    UnknownTenant(String),
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("provider error: {0}")]
    Provider(String),
}

impl From<ConciergeError> for EngineError {
    fn from(err: ConciergeError) -> Self {
        match err {
            ConciergeError::NotConfigured(msg) => EngineError::NotConfigured(msg),
            ConciergeError::Provider(msg) | ConciergeError::Embedding(msg) => {
                EngineError::Provider(msg)
            }
            other => EngineError::Storage(other.to_string()),
        }
    }
}
