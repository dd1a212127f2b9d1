//! Conversation engine: routing, lead capture, and turn orchestration
//! for the multi-tenant support chatbot.
//!
//! `ChatEngine::handle_turn` is the single entry point per tenant;
//! `TenantRegistry` maps client ids to engines and isolates
//! misconfigured tenants.

pub mod error;
pub mod intro;
pub mod orchestrator;
pub mod registry;
pub mod supervisor;
pub mod validate;

pub use error::EngineError;
pub use intro::LeadCapture;
pub use orchestrator::{ChatEngine, TurnOutput};
pub use registry::TenantRegistry;
pub use supervisor::{Classifier, Supervisor};
