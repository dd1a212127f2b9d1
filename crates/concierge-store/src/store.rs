//! Session store trait and the SQLite-backed implementation.
//!
//! The durable columns are the message history (JSON), the sticky lead
//! fields, and the mode. Transient per-turn state (score, options,
//! next_branch) is deliberately not persisted; it is recomputed each turn.

use std::path::Path;
use std::sync::Arc;

use rusqlite::OptionalExtension;

use concierge_core::error::ConciergeError;
use concierge_core::types::{Message, Mode, Session};

use crate::db::Database;

/// Narrow persistence boundary used by the orchestrator.
///
/// `save` must be atomic per key; callers serialize writes per session via
/// [`crate::SessionLocks`].
pub trait SessionStore: Send + Sync {
    /// Load a session by id. `None` if it has never been saved.
    fn load(&self, session_id: &str) -> Result<Option<Session>, ConciergeError>;

    /// Persist the durable parts of a session (upsert).
    fn save(&self, session: &Session) -> Result<(), ConciergeError>;
}

/// SQLite-backed session store.
pub struct SqliteSessionStore {
    db: Arc<Database>,
}

impl SqliteSessionStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Open a store backed by a database file at `path`.
    pub fn open(path: &Path) -> Result<Self, ConciergeError> {
        Ok(Self::new(Arc::new(Database::new(path)?)))
    }

    /// Open an in-memory store (for testing).
    pub fn in_memory() -> Result<Self, ConciergeError> {
        Ok(Self::new(Arc::new(Database::in_memory()?)))
    }

    /// Count stored sessions.
    pub fn count(&self) -> Result<u64, ConciergeError> {
        self.db.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
                .map_err(|e| ConciergeError::Storage(e.to_string()))?;
            Ok(count as u64)
        })
    }
}

impl SessionStore for SqliteSessionStore {
    fn load(&self, session_id: &str) -> Result<Option<Session>, ConciergeError> {
        self.db.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT session_id, name, email, mode, messages
                     FROM sessions WHERE session_id = ?1",
                    rusqlite::params![session_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, Option<String>>(1)?,
                            row.get::<_, Option<String>>(2)?,
                            row.get::<_, String>(3)?,
                            row.get::<_, String>(4)?,
                        ))
                    },
                )
                .optional()
                .map_err(|e| ConciergeError::Storage(e.to_string()))?;

            let Some((id, name, email, mode, messages_json)) = row else {
                return Ok(None);
            };

            let messages: Vec<Message> = serde_json::from_str(&messages_json)?;
            let mode = match mode.as_str() {
                "answering" => Mode::Answering,
                _ => Mode::Introducing,
            };

            let mut session = Session::new(id);
            session.messages = messages;
            session.name = name;
            session.email = email;
            session.mode = mode;
            Ok(Some(session))
        })
    }

    fn save(&self, session: &Session) -> Result<(), ConciergeError> {
        let messages_json = serde_json::to_string(&session.messages)?;
        let mode = match session.mode {
            Mode::Introducing => "introducing",
            Mode::Answering => "answering",
        };

        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (session_id, name, email, mode, messages, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, strftime('%s', 'now'))
                 ON CONFLICT(session_id) DO UPDATE SET
                     name = excluded.name,
                     email = excluded.email,
                     mode = excluded.mode,
                     messages = excluded.messages,
                     updated_at = excluded.updated_at",
                rusqlite::params![
                    session.session_id,
                    session.name,
                    session.email,
                    mode,
                    messages_json,
                ],
            )
            .map_err(|e| ConciergeError::Storage(format!("Failed to save session: {}", e)))?;
            Ok(())
        })
    }
}
