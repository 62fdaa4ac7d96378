//! Extension schema for agent tracking
//!
//! The tables are namespaced with an `agent_` prefix so they never collide
//! with the host issue tracker's own tables. Every statement is
//! `IF NOT EXISTS`, so initialization is safe to repeat. There is no
//! migration step yet; [`SCHEMA_VERSION`] exists so a future one can gate on it.

use crate::error::{Error, Result};
use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Extension release version
pub const EXTENSION_VERSION: &str = "1.0.0";

/// Tables owned by this extension
pub const TABLES: [&str; 3] = ["agent_sessions", "agent_issue_work", "agent_skill_usage"];

const SCHEMA: &str = r#"
-- ============================================
-- Sessions
-- ============================================

CREATE TABLE IF NOT EXISTS agent_sessions (
    session_id       TEXT PRIMARY KEY,
    agent_name       TEXT NOT NULL,
    workspace_path   TEXT NOT NULL,
    started_at       TEXT NOT NULL,
    ended_at         TEXT,
    exit_reason      TEXT,
    issues_claimed   TEXT DEFAULT '[]',
    skills_used      TEXT DEFAULT '[]',
    model_tier       TEXT,
    context_tokens   INTEGER DEFAULT 0,
    created_at       TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_agent_sessions_agent ON agent_sessions(agent_name);
CREATE INDEX IF NOT EXISTS idx_agent_sessions_started ON agent_sessions(started_at);

-- ============================================
-- Issue work
-- ============================================

CREATE TABLE IF NOT EXISTS agent_issue_work (
    work_id            TEXT PRIMARY KEY,
    issue_id           TEXT NOT NULL,
    session_id         TEXT NOT NULL,
    agent_name         TEXT NOT NULL,
    started_at         TEXT NOT NULL,
    ended_at           TEXT,
    status_changes     TEXT DEFAULT '[]',
    decision_rationale TEXT,
    work_notes         TEXT,
    completed          BOOLEAN DEFAULT 0,
    FOREIGN KEY (session_id) REFERENCES agent_sessions(session_id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_agent_work_issue ON agent_issue_work(issue_id);
CREATE INDEX IF NOT EXISTS idx_agent_work_session ON agent_issue_work(session_id);

-- ============================================
-- Skill usage
-- ============================================

CREATE TABLE IF NOT EXISTS agent_skill_usage (
    usage_id          TEXT PRIMARY KEY,
    session_id        TEXT NOT NULL,
    skill_name        TEXT NOT NULL,
    loaded_at         TEXT NOT NULL,
    used_for_issue_id TEXT,
    context_added     INTEGER DEFAULT 0,
    FOREIGN KEY (session_id) REFERENCES agent_sessions(session_id) ON DELETE CASCADE
);

CREATE INDEX IF NOT EXISTS idx_agent_skill_session ON agent_skill_usage(session_id);
"#;

/// Create the agent tracking tables and indexes if they don't exist.
///
/// The connection is owned by the caller; this only issues DDL on it.
/// Cascading deletes additionally need `PRAGMA foreign_keys = ON`, which is
/// left to the caller since it is a per-connection setting of the host.
pub fn initialize(conn: &Connection) -> Result<()> {
    conn.execute_batch(SCHEMA).map_err(Error::Initialization)?;

    tracing::info!(
        schema_version = SCHEMA_VERSION,
        extension_version = EXTENSION_VERSION,
        "Agent tracking schema ready"
    );

    Ok(())
}

/// Check whether a table exists in the database.
pub fn table_exists(conn: &Connection, table_name: &str) -> Result<bool> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?",
        [table_name],
        |r| r.get(0),
    )?;
    Ok(count > 0)
}

/// True when every table in [`TABLES`] exists.
pub fn is_initialized(conn: &Connection) -> Result<bool> {
    for table in TABLES {
        if !table_exists(conn, table)? {
            return Ok(false);
        }
    }
    Ok(true)
}

/// Extension release version, for future migration gating.
pub fn version() -> &'static str {
    EXTENSION_VERSION
}

/// Schema version, for future migration gating.
pub fn schema_version() -> i32 {
    SCHEMA_VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initialize_idempotent() {
        let conn = Connection::open_in_memory().unwrap();

        // Run twice - second run must be a no-op
        initialize(&conn).unwrap();
        initialize(&conn).unwrap();

        assert!(is_initialized(&conn).unwrap());
    }

    #[test]
    fn test_tables_created() {
        let conn = Connection::open_in_memory().unwrap();
        assert!(!is_initialized(&conn).unwrap());

        initialize(&conn).unwrap();

        for table in TABLES {
            assert!(
                table_exists(&conn, table).unwrap(),
                "Table {} should exist",
                table
            );
        }
        assert!(!table_exists(&conn, "issues").unwrap());
    }

    #[test]
    fn test_indexes_created() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT name FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_agent_%' ORDER BY name",
            )
            .unwrap();
        let indexes: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert_eq!(
            indexes,
            vec![
                "idx_agent_sessions_agent",
                "idx_agent_sessions_started",
                "idx_agent_skill_session",
                "idx_agent_work_issue",
                "idx_agent_work_session",
            ]
        );
    }

    #[test]
    fn test_foreign_keys() {
        let conn = Connection::open_in_memory().unwrap();
        initialize(&conn).unwrap();

        for table in ["agent_issue_work", "agent_skill_usage"] {
            let fk_list: Vec<(String, String)> = conn
                .prepare(&format!("PRAGMA foreign_key_list({})", table))
                .unwrap()
                .query_map([], |row| {
                    Ok((row.get::<_, String>(2)?, row.get::<_, String>(6)?))
                })
                .unwrap()
                .filter_map(|r| r.ok())
                .collect();

            assert_eq!(
                fk_list,
                vec![("agent_sessions".to_string(), "CASCADE".to_string())],
                "{} should cascade from agent_sessions",
                table
            );
        }
    }

    #[test]
    fn test_coexists_with_host_tables() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE issues (id TEXT PRIMARY KEY, title TEXT);")
            .unwrap();

        initialize(&conn).unwrap();

        assert!(table_exists(&conn, "issues").unwrap());
        assert!(is_initialized(&conn).unwrap());
    }

    #[test]
    fn test_initialize_rejected_by_engine() {
        let conn = Connection::open_in_memory().unwrap();
        // A view squatting on a table name makes CREATE INDEX fail.
        conn.execute_batch("CREATE VIEW agent_sessions AS SELECT 1 AS session_id;")
            .unwrap();

        let err = initialize(&conn).unwrap_err();
        assert!(matches!(err, Error::Initialization(_)));
    }

    #[test]
    fn test_versions() {
        assert_eq!(version(), "1.0.0");
        assert_eq!(schema_version(), 1);
    }
}
