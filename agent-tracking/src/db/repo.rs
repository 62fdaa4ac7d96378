//! Record store for sessions, work entries, and skill usage
//!
//! [`Tracker`] borrows a connection owned by the host issue tracker and runs
//! every operation as a single independent statement against it. There is no
//! transaction spanning more than one write: a crash between `record_work`
//! and `complete_work` leaves the first write durable.

use super::time::{format_ts, get_opt_ts, get_ts, now_ts};
use crate::config::QueryLimits;
use crate::error::{Error, Result};
use crate::types::{decode_string_list, encode_string_list, Session, SkillUsage, Work};
use rusqlite::{params, Connection, OptionalExtension, Row};

const SESSION_COLUMNS: &str = "session_id, agent_name, workspace_path, started_at, ended_at, \
     exit_reason, issues_claimed, skills_used, model_tier, context_tokens, created_at";

const WORK_COLUMNS: &str = "work_id, issue_id, session_id, agent_name, started_at, ended_at, \
     status_changes, decision_rationale, work_notes, completed";

const SKILL_USAGE_COLUMNS: &str =
    "usage_id, session_id, skill_name, loaded_at, used_for_issue_id, context_added";

/// Access layer over the agent tracking tables.
///
/// The tracker never opens or closes the connection. Call
/// [`schema::initialize`](super::schema::initialize) once before use.
#[derive(Debug, Clone, Copy)]
pub struct Tracker<'conn> {
    pub(crate) conn: &'conn Connection,
    pub(crate) limits: QueryLimits,
}

/// Fail with a validation error when a required argument is empty.
pub(crate) fn require(value: &str, what: &'static str) -> Result<()> {
    if value.is_empty() {
        return Err(Error::Validation(what));
    }
    Ok(())
}

fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Empty optional text is stored as NULL.
fn non_empty(value: &str) -> Option<&str> {
    (!value.is_empty()).then_some(value)
}

/// Map zero affected rows to a not-found error.
fn expect_row(rows: usize, entity: &'static str, id: &str) -> Result<()> {
    if rows == 0 {
        return Err(Error::not_found(entity, id));
    }
    Ok(())
}

impl<'conn> Tracker<'conn> {
    /// Create a tracker with the default query limits.
    pub fn new(conn: &'conn Connection) -> Self {
        Self::with_limits(conn, QueryLimits::default())
    }

    /// Create a tracker with limits from configuration.
    pub fn with_limits(conn: &'conn Connection, limits: QueryLimits) -> Self {
        Self { conn, limits }
    }

    /// The borrowed connection.
    pub fn connection(&self) -> &'conn Connection {
        self.conn
    }

    /// Limits applied when callers pass a non-positive limit.
    pub fn limits(&self) -> &QueryLimits {
        &self.limits
    }

    // ============================================
    // Session operations
    // ============================================

    /// Start a new session and return its ID.
    ///
    /// `model_tier` is optional; pass `""` when unknown.
    pub fn start_session(
        &self,
        agent_name: &str,
        workspace_path: &str,
        model_tier: &str,
    ) -> Result<String> {
        require(agent_name, "agent name")?;
        require(workspace_path, "workspace path")?;

        let session_id = generate_id();
        let now = now_ts();

        self.conn.execute(
            r#"
            INSERT INTO agent_sessions (session_id, agent_name, workspace_path, started_at,
                                        model_tier, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?4)
            "#,
            params![
                session_id,
                agent_name,
                workspace_path,
                now,
                non_empty(model_tier)
            ],
        )?;

        tracing::info!(%session_id, agent_name, workspace_path, "Session started");
        Ok(session_id)
    }

    /// Mark a session as ended.
    ///
    /// Calling this again on an ended session re-stamps the end time and
    /// reason; it only fails when the session does not exist.
    pub fn end_session(&self, session_id: &str, exit_reason: &str) -> Result<()> {
        require(session_id, "session ID")?;

        let rows = self.conn.execute(
            "UPDATE agent_sessions SET ended_at = ?1, exit_reason = ?2 WHERE session_id = ?3",
            params![now_ts(), non_empty(exit_reason), session_id],
        )?;
        expect_row(rows, "session", session_id)?;

        tracing::info!(session_id, exit_reason, "Session ended");
        Ok(())
    }

    /// Get a session by ID.
    pub fn get_session(&self, session_id: &str) -> Result<Session> {
        require(session_id, "session ID")?;

        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM agent_sessions WHERE session_id = ?",
                    SESSION_COLUMNS
                ),
                [session_id],
                Self::row_to_session,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("session", session_id))
    }

    /// Replace the list of issues claimed during a session.
    pub fn update_session_issues(&self, session_id: &str, issues: &[String]) -> Result<()> {
        self.replace_session_list(session_id, "issues_claimed", issues)
    }

    /// Replace the list of skills used during a session.
    pub fn update_session_skills(&self, session_id: &str, skills: &[String]) -> Result<()> {
        self.replace_session_list(session_id, "skills_used", skills)
    }

    fn replace_session_list(&self, session_id: &str, column: &str, items: &[String]) -> Result<()> {
        require(session_id, "session ID")?;

        let encoded = encode_string_list(items)?;
        let rows = self.conn.execute(
            &format!(
                "UPDATE agent_sessions SET {} = ?1 WHERE session_id = ?2",
                column
            ),
            params![encoded, session_id],
        )?;
        expect_row(rows, "session", session_id)?;

        tracing::debug!(session_id, column, count = items.len(), "Session list replaced");
        Ok(())
    }

    /// Overwrite the context token count for a session.
    pub fn update_session_tokens(&self, session_id: &str, tokens: i64) -> Result<()> {
        require(session_id, "session ID")?;

        let rows = self.conn.execute(
            "UPDATE agent_sessions SET context_tokens = ?1 WHERE session_id = ?2",
            params![tokens, session_id],
        )?;
        expect_row(rows, "session", session_id)?;

        tracing::debug!(session_id, tokens, "Session tokens updated");
        Ok(())
    }

    /// List sessions that have not ended, most recently started first.
    pub fn list_active_sessions(&self) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM agent_sessions WHERE NULLIF(ended_at, '') IS NULL \
             ORDER BY julianday(started_at) DESC",
            SESSION_COLUMNS
        ))?;

        let sessions = stmt
            .query_map([], Self::row_to_session)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    /// List sessions for one agent, most recently started first.
    ///
    /// A non-positive `limit` falls back to the configured session list limit.
    pub fn list_sessions_by_agent(&self, agent_name: &str, limit: i64) -> Result<Vec<Session>> {
        require(agent_name, "agent name")?;
        let limit = if limit > 0 {
            limit
        } else {
            self.limits.session_list_limit
        };

        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {} FROM agent_sessions
            WHERE agent_name = ?1
            ORDER BY julianday(started_at) DESC
            LIMIT ?2
            "#,
            SESSION_COLUMNS
        ))?;

        let sessions = stmt
            .query_map(params![agent_name, limit], Self::row_to_session)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(sessions)
    }

    fn row_to_session(row: &Row) -> rusqlite::Result<Session> {
        let issues_claimed: Option<String> = row.get("issues_claimed")?;
        let skills_used: Option<String> = row.get("skills_used")?;

        Ok(Session {
            session_id: row.get("session_id")?,
            agent_name: row.get("agent_name")?,
            workspace_path: row.get("workspace_path")?,
            started_at: get_ts(row, "started_at")?,
            ended_at: get_opt_ts(row, "ended_at")?,
            exit_reason: row.get("exit_reason")?,
            issues_claimed: decode_string_list(issues_claimed.as_deref()),
            skills_used: decode_string_list(skills_used.as_deref()),
            model_tier: row.get("model_tier")?,
            context_tokens: row.get::<_, Option<i64>>("context_tokens")?.unwrap_or(0),
            created_at: get_ts(row, "created_at")?,
        })
    }

    // ============================================
    // Work operations
    // ============================================

    /// Record the start of work on an issue and return the work ID.
    pub fn record_work(
        &self,
        session_id: &str,
        issue_id: &str,
        agent_name: &str,
        rationale: &str,
    ) -> Result<String> {
        require(session_id, "session ID")?;
        require(issue_id, "issue ID")?;
        require(agent_name, "agent name")?;

        let work_id = generate_id();

        self.conn.execute(
            r#"
            INSERT INTO agent_issue_work (work_id, issue_id, session_id, agent_name,
                                          started_at, decision_rationale)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                work_id,
                issue_id,
                session_id,
                agent_name,
                now_ts(),
                non_empty(rationale)
            ],
        )?;

        tracing::debug!(%work_id, session_id, issue_id, agent_name, "Work recorded");
        Ok(work_id)
    }

    /// Mark a work entry as completed, with optional notes.
    pub fn complete_work(&self, work_id: &str, notes: &str) -> Result<()> {
        require(work_id, "work ID")?;

        let rows = self.conn.execute(
            r#"
            UPDATE agent_issue_work
            SET ended_at = ?1, work_notes = ?2, completed = 1
            WHERE work_id = ?3
            "#,
            params![now_ts(), non_empty(notes), work_id],
        )?;
        expect_row(rows, "work", work_id)?;

        tracing::debug!(work_id, "Work completed");
        Ok(())
    }

    /// Append one entry to a work row's status change history.
    ///
    /// The append happens inside a single UPDATE using SQLite's JSON functions,
    /// so concurrent appends on the same row do not lose entries. A history
    /// that does not hold a valid JSON array is restarted from empty.
    pub fn record_status_change(&self, work_id: &str, change: &str) -> Result<()> {
        require(work_id, "work ID")?;
        require(change, "status change")?;

        let rows = self.conn.execute(
            r#"
            UPDATE agent_issue_work
            SET status_changes = json_insert(
                CASE WHEN json_valid(status_changes)
                     THEN CASE WHEN json_type(status_changes) = 'array'
                               THEN status_changes ELSE '[]' END
                     ELSE '[]' END,
                '$[#]', ?1)
            WHERE work_id = ?2
            "#,
            params![change, work_id],
        )?;
        expect_row(rows, "work", work_id)?;

        tracing::debug!(work_id, change, "Status change recorded");
        Ok(())
    }

    /// Get a work entry by ID.
    pub fn get_work(&self, work_id: &str) -> Result<Work> {
        require(work_id, "work ID")?;

        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM agent_issue_work WHERE work_id = ?",
                    WORK_COLUMNS
                ),
                [work_id],
                Self::row_to_work,
            )
            .optional()?
            .ok_or_else(|| Error::not_found("work", work_id))
    }

    /// List all work on an issue, most recent first.
    pub fn list_work_by_issue(&self, issue_id: &str) -> Result<Vec<Work>> {
        require(issue_id, "issue ID")?;
        self.query_work("issue_id = ?1 ORDER BY julianday(started_at) DESC", issue_id)
    }

    /// List all work in a session, in the order it happened.
    pub fn list_work_by_session(&self, session_id: &str) -> Result<Vec<Work>> {
        require(session_id, "session ID")?;
        self.query_work("session_id = ?1 ORDER BY julianday(started_at) ASC", session_id)
    }

    fn query_work(&self, clause: &str, key: &str) -> Result<Vec<Work>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM agent_issue_work WHERE {}",
            WORK_COLUMNS, clause
        ))?;

        let work = stmt
            .query_map([key], Self::row_to_work)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(work)
    }

    fn row_to_work(row: &Row) -> rusqlite::Result<Work> {
        let status_changes: Option<String> = row.get("status_changes")?;

        Ok(Work {
            work_id: row.get("work_id")?,
            issue_id: row.get("issue_id")?,
            session_id: row.get("session_id")?,
            agent_name: row.get("agent_name")?,
            started_at: get_ts(row, "started_at")?,
            ended_at: get_opt_ts(row, "ended_at")?,
            status_changes: decode_string_list(status_changes.as_deref()),
            decision_rationale: row.get("decision_rationale")?,
            work_notes: row.get("work_notes")?,
            completed: row.get::<_, Option<bool>>("completed")?.unwrap_or(false),
        })
    }

    // ============================================
    // Skill usage operations
    // ============================================

    /// Record that a skill was loaded during a session and return the usage ID.
    ///
    /// Every load is recorded; loading the same skill twice yields two rows.
    pub fn record_skill_usage(
        &self,
        session_id: &str,
        skill_name: &str,
        issue_id: &str,
        context_added: i64,
    ) -> Result<String> {
        require(session_id, "session ID")?;
        require(skill_name, "skill name")?;

        let usage_id = generate_id();

        self.conn.execute(
            r#"
            INSERT INTO agent_skill_usage (usage_id, session_id, skill_name, loaded_at,
                                           used_for_issue_id, context_added)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                usage_id,
                session_id,
                skill_name,
                now_ts(),
                non_empty(issue_id),
                context_added
            ],
        )?;

        tracing::debug!(%usage_id, session_id, skill_name, context_added, "Skill usage recorded");
        Ok(usage_id)
    }

    /// List skill loads in a session, oldest first.
    pub fn list_skill_usage_by_session(&self, session_id: &str) -> Result<Vec<SkillUsage>> {
        require(session_id, "session ID")?;

        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM agent_skill_usage WHERE session_id = ?1 \
             ORDER BY julianday(loaded_at) ASC",
            SKILL_USAGE_COLUMNS
        ))?;

        let usage = stmt
            .query_map([session_id], |row| {
                Ok(SkillUsage {
                    usage_id: row.get("usage_id")?,
                    session_id: row.get("session_id")?,
                    skill_name: row.get("skill_name")?,
                    loaded_at: get_ts(row, "loaded_at")?,
                    used_for_issue_id: row.get("used_for_issue_id")?,
                    context_added: row.get::<_, Option<i64>>("context_added")?.unwrap_or(0),
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(usage)
    }
}

/// Format a `since` bound the same way stored timestamps are formatted.
pub(crate) fn since_param(since: chrono::DateTime<chrono::Utc>) -> String {
    format_ts(since)
}
