//! Shared types, configuration, and errors for the Concierge chatbot core.
//!
//! Every other crate in the workspace depends on this one. It defines the
//! session data model, the per-tenant configuration loaded from TOML, and
//! the top-level error type.

pub mod config;
pub mod error;
pub mod logging;
pub mod types;

pub use config::TenantConfig;
pub use error::{ConciergeError, Result};
pub use types::{Branch, Message, Mode, Role, Session};
