//! Statistics queries over the tracking tables.

use super::{
    secs_to_duration, AgentCount, AgentStats, AgentWork, IssueStats, OverallStats,
    SessionDuration, SkillCount, SkillStats,
};
use crate::db::repo::{require, since_param, Tracker};
use crate::db::time::{get_ts, now_ts};
use crate::error::Result;
use chrono::{DateTime, Utc};
use rusqlite::params;

impl Tracker<'_> {
    /// Aggregate statistics for one agent over sessions started since `since`.
    pub fn agent_stats(&self, agent_name: &str, since: DateTime<Utc>) -> Result<AgentStats> {
        require(agent_name, "agent name")?;
        let since_str = since_param(since);

        // 1. Session counts and tokens
        let (total_sessions, active_sessions, total_tokens): (i64, i64, i64) =
            self.conn.query_row(
                r#"
                SELECT
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN NULLIF(ended_at, '') IS NULL THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(context_tokens), 0)
                FROM agent_sessions
                WHERE agent_name = ?1 AND julianday(started_at) >= julianday(?2)
                "#,
                params![agent_name, since_str],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )?;

        // 2. Average duration of ended sessions
        let avg_secs: Option<f64> = self.conn.query_row(
            r#"
            SELECT AVG(julianday(ended_at) - julianday(started_at)) * 86400
            FROM agent_sessions
            WHERE agent_name = ?1
              AND julianday(started_at) >= julianday(?2)
              AND NULLIF(ended_at, '') IS NOT NULL
            "#,
            params![agent_name, since_str],
            |r| r.get(0),
        )?;

        // 3. Distinct issues touched and completed
        let (total_issues, completed_issues): (i64, i64) = self.conn.query_row(
            r#"
            SELECT
                COUNT(DISTINCT w.issue_id),
                COUNT(DISTINCT CASE WHEN w.completed = 1 THEN w.issue_id END)
            FROM agent_issue_work w
            JOIN agent_sessions s ON w.session_id = s.session_id
            WHERE w.agent_name = ?1 AND julianday(s.started_at) >= julianday(?2)
            "#,
            params![agent_name, since_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        // 4. Skill loads
        let total_skill_uses: i64 = self.conn.query_row(
            r#"
            SELECT COUNT(*)
            FROM agent_skill_usage u
            JOIN agent_sessions s ON u.session_id = s.session_id
            WHERE s.agent_name = ?1 AND julianday(s.started_at) >= julianday(?2)
            "#,
            params![agent_name, since_str],
            |r| r.get(0),
        )?;

        // 5. Most used skills
        let mut stmt = self.conn.prepare(
            r#"
            SELECT u.skill_name, COUNT(*) AS cnt
            FROM agent_skill_usage u
            JOIN agent_sessions s ON u.session_id = s.session_id
            WHERE s.agent_name = ?1 AND julianday(s.started_at) >= julianday(?2)
            GROUP BY u.skill_name
            ORDER BY cnt DESC, u.skill_name ASC
            LIMIT ?3
            "#,
        )?;
        let most_used_skills = stmt
            .query_map(params![agent_name, since_str, self.limits.top_n], |row| {
                Ok(SkillCount {
                    skill_name: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(AgentStats {
            agent_name: agent_name.to_string(),
            total_sessions,
            active_sessions,
            total_issues,
            completed_issues,
            total_skill_uses,
            avg_session_time: secs_to_duration(avg_secs),
            total_tokens,
            most_used_skills,
            since,
        })
    }

    /// Aggregate statistics for one issue across all time.
    pub fn issue_stats(&self, issue_id: &str) -> Result<IssueStats> {
        require(issue_id, "issue ID")?;
        // Open work rows are measured up to this instant
        let now = now_ts();

        let (total_work_sessions, total_agents, completed, total_secs): (
            i64,
            i64,
            i64,
            Option<f64>,
        ) = self.conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COUNT(DISTINCT agent_name),
                COALESCE(MAX(completed), 0),
                SUM(MAX(0, julianday(COALESCE(NULLIF(ended_at, ''), ?2)) - julianday(started_at))) * 86400
            FROM agent_issue_work
            WHERE issue_id = ?1
            "#,
            params![issue_id, now],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
        )?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                agent_name,
                COUNT(*) AS work_sessions,
                SUM(MAX(0, julianday(COALESCE(NULLIF(ended_at, ''), ?2)) - julianday(started_at))) * 86400,
                COALESCE(SUM(completed), 0)
            FROM agent_issue_work
            WHERE issue_id = ?1
            GROUP BY agent_name
            ORDER BY work_sessions DESC, agent_name ASC
            "#,
        )?;
        let agent_breakdown = stmt
            .query_map(params![issue_id, now], |row| {
                Ok(AgentWork {
                    agent_name: row.get(0)?,
                    work_sessions: row.get(1)?,
                    total_time: secs_to_duration(row.get(2)?),
                    completed: row.get(3)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(IssueStats {
            issue_id: issue_id.to_string(),
            total_work_sessions,
            total_agents,
            total_time: secs_to_duration(total_secs),
            is_completed: completed != 0,
            agent_breakdown,
        })
    }

    /// Aggregate statistics for one skill over loads since `since`.
    pub fn skill_stats(&self, skill_name: &str, since: DateTime<Utc>) -> Result<SkillStats> {
        require(skill_name, "skill name")?;
        let since_str = since_param(since);

        let (total_uses, unique_sessions, unique_agents, total_context, avg_context): (
            i64,
            i64,
            i64,
            i64,
            Option<f64>,
        ) = self.conn.query_row(
            r#"
            SELECT
                COUNT(*),
                COUNT(DISTINCT u.session_id),
                COUNT(DISTINCT s.agent_name),
                COALESCE(SUM(u.context_added), 0),
                AVG(u.context_added)
            FROM agent_skill_usage u
            JOIN agent_sessions s ON u.session_id = s.session_id
            WHERE u.skill_name = ?1 AND julianday(u.loaded_at) >= julianday(?2)
            "#,
            params![skill_name, since_str],
            |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?, r.get(4)?)),
        )?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.agent_name, COUNT(*) AS cnt
            FROM agent_skill_usage u
            JOIN agent_sessions s ON u.session_id = s.session_id
            WHERE u.skill_name = ?1 AND julianday(u.loaded_at) >= julianday(?2)
            GROUP BY s.agent_name
            ORDER BY cnt DESC, s.agent_name ASC
            LIMIT ?3
            "#,
        )?;
        let top_agents = stmt
            .query_map(params![skill_name, since_str, self.limits.top_n], |row| {
                Ok(AgentCount {
                    agent_name: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(SkillStats {
            skill_name: skill_name.to_string(),
            total_uses,
            unique_sessions,
            unique_agents,
            total_context,
            avg_context: avg_context.unwrap_or(0.0),
            top_agents,
            since,
        })
    }

    /// Aggregate statistics across all agents since `since`.
    pub fn overall_stats(&self, since: DateTime<Utc>) -> Result<OverallStats> {
        let since_str = since_param(since);

        let (total_sessions, active_sessions, unique_agents, total_tokens): (i64, i64, i64, i64) =
            self.conn.query_row(
                r#"
                SELECT
                    COUNT(*),
                    COALESCE(SUM(CASE WHEN NULLIF(ended_at, '') IS NULL THEN 1 ELSE 0 END), 0),
                    COUNT(DISTINCT agent_name),
                    COALESCE(SUM(context_tokens), 0)
                FROM agent_sessions
                WHERE julianday(started_at) >= julianday(?1)
                "#,
                [&since_str],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?, r.get(3)?)),
            )?;

        let (total_issues, completed_issues): (i64, i64) = self.conn.query_row(
            r#"
            SELECT
                COUNT(DISTINCT w.issue_id),
                COUNT(DISTINCT CASE WHEN w.completed = 1 THEN w.issue_id END)
            FROM agent_issue_work w
            JOIN agent_sessions s ON w.session_id = s.session_id
            WHERE julianday(s.started_at) >= julianday(?1)
            "#,
            [&since_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        let (unique_skills, total_skill_uses): (i64, i64) = self.conn.query_row(
            r#"
            SELECT COUNT(DISTINCT skill_name), COUNT(*)
            FROM agent_skill_usage
            WHERE julianday(loaded_at) >= julianday(?1)
            "#,
            [&since_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
        )?;

        let mut stmt = self.conn.prepare(
            r#"
            SELECT agent_name, COUNT(*) AS cnt
            FROM agent_sessions
            WHERE julianday(started_at) >= julianday(?1)
            GROUP BY agent_name
            ORDER BY cnt DESC, agent_name ASC
            LIMIT ?2
            "#,
        )?;
        let top_agents = stmt
            .query_map(params![since_str, self.limits.top_n], |row| {
                Ok(AgentCount {
                    agent_name: row.get(0)?,
                    count: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(OverallStats {
            total_sessions,
            active_sessions,
            unique_agents,
            total_issues,
            completed_issues,
            unique_skills,
            total_skill_uses,
            total_tokens,
            top_agents,
            since,
        })
    }

    /// Per-session durations, most recently started first.
    ///
    /// `agent_name` of `None` (or `Some("")`) covers all agents. A non-positive
    /// `limit` falls back to the configured duration list limit.
    pub fn session_durations(
        &self,
        agent_name: Option<&str>,
        since: DateTime<Utc>,
        limit: i64,
    ) -> Result<Vec<SessionDuration>> {
        let agent_name = agent_name.filter(|name| !name.is_empty());
        let limit = if limit > 0 {
            limit
        } else {
            self.limits.duration_list_limit
        };

        let mut stmt = self.conn.prepare(
            r#"
            SELECT
                session_id,
                agent_name,
                started_at,
                MAX(0, julianday(COALESCE(NULLIF(ended_at, ''), ?3)) - julianday(started_at)) * 86400
                    AS duration_secs,
                NULLIF(ended_at, '') IS NOT NULL AS is_completed
            FROM agent_sessions
            WHERE (?1 IS NULL OR agent_name = ?1) AND julianday(started_at) >= julianday(?2)
            ORDER BY julianday(started_at) DESC
            LIMIT ?4
            "#,
        )?;

        let durations = stmt
            .query_map(
                params![agent_name, since_param(since), now_ts(), limit],
                |row| {
                    Ok(SessionDuration {
                        session_id: row.get("session_id")?,
                        agent_name: row.get("agent_name")?,
                        started_at: get_ts(row, "started_at")?,
                        duration: secs_to_duration(row.get("duration_secs")?),
                        is_completed: row.get("is_completed")?,
                    })
                },
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        tracing::debug!(
            agent = agent_name.unwrap_or("*"),
            count = durations.len(),
            "Session durations computed"
        );
        Ok(durations)
    }
}
