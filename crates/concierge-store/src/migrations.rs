//! Database schema migrations.

use rusqlite::Connection;
use tracing::info;

use concierge_core::error::ConciergeError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), ConciergeError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| ConciergeError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| ConciergeError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: sessions_schema");
    }

    Ok(())
}

/// Version 1: sessions table.
///
/// Message history is stored as a JSON array; the sticky fields and mode
/// get their own columns so lead reports can query them directly.
fn apply_v1(conn: &Connection) -> Result<(), ConciergeError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS sessions (
            session_id  TEXT PRIMARY KEY NOT NULL,
            name        TEXT,
            email       TEXT,
            mode        TEXT NOT NULL DEFAULT 'introducing'
                        CHECK (mode IN ('introducing', 'answering')),
            messages    TEXT NOT NULL DEFAULT '[]',
            created_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now')),
            updated_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_updated_at
            ON sessions (updated_at DESC);

        INSERT INTO schema_migrations (version, name) VALUES (1, 'sessions_schema');
        ",
    )
    .map_err(|e| ConciergeError::Storage(format!("Migration v1 failed: {}", e)))?;
    Ok(())
}
