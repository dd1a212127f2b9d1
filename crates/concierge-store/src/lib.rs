//! Durable session persistence for the Concierge core.
//!
//! `SessionStore` is the narrow boundary the orchestrator uses to load and
//! save sessions; `SqliteSessionStore` is the shipped implementation.
//! `SessionLocks` provides the single-writer-per-session guarantee.

pub mod db;
pub mod locks;
pub mod migrations;
pub mod store;

pub use db::Database;
pub use locks::SessionLocks;
pub use store::{SessionStore, SqliteSessionStore};
