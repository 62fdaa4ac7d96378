//! Analytics module for agent tracking
//!
//! Read-only aggregate statistics computed directly over the tracking tables:
//! - Per-agent activity ([`AgentStats`])
//! - Per-issue effort ([`IssueStats`])
//! - Per-skill adoption ([`SkillStats`])
//! - Global totals ([`OverallStats`])
//! - Session durations for charting ([`SessionDuration`])
//!
//! Every query that takes a `since` bound applies it inclusively. Aggregates
//! over no rows come back as zeros, never as errors.
//!
//! Durations are computed in SQL as `(julianday(end) - julianday(start)) * 86400`
//! seconds. Rows that are still open measure up to the time of the query.

mod stats;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Aggregate statistics for one agent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStats {
    pub agent_name: String,
    /// Sessions started since the bound
    pub total_sessions: i64,
    /// Of those, sessions with no end timestamp
    pub active_sessions: i64,
    /// Distinct issues the agent worked on
    pub total_issues: i64,
    /// Distinct issues with at least one completed work row
    pub completed_issues: i64,
    pub total_skill_uses: i64,
    /// Mean duration of ended sessions only
    ///
    /// Open sessions are left out of the average entirely rather than
    /// counted as zero or as time-so-far.
    pub avg_session_time: Duration,
    pub total_tokens: i64,
    /// Top skills by load count, most used first
    pub most_used_skills: Vec<SkillCount>,
    pub since: DateTime<Utc>,
}

/// Aggregate statistics for one issue, across all time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssueStats {
    pub issue_id: String,
    /// Number of work rows for the issue
    pub total_work_sessions: i64,
    /// Distinct agents that worked on it
    pub total_agents: i64,
    /// Summed work time; open rows contribute time elapsed so far
    pub total_time: Duration,
    /// True if any work row is completed
    pub is_completed: bool,
    /// Per-agent effort, most work rows first
    pub agent_breakdown: Vec<AgentWork>,
}

/// Aggregate statistics for one skill.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillStats {
    pub skill_name: String,
    pub total_uses: i64,
    pub unique_sessions: i64,
    pub unique_agents: i64,
    /// Summed context contribution
    pub total_context: i64,
    /// Mean context contribution per load
    pub avg_context: f64,
    /// Top agents by load count
    pub top_agents: Vec<AgentCount>,
    pub since: DateTime<Utc>,
}

/// Aggregate statistics across all agents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallStats {
    pub total_sessions: i64,
    pub active_sessions: i64,
    pub unique_agents: i64,
    pub total_issues: i64,
    pub completed_issues: i64,
    pub unique_skills: i64,
    pub total_skill_uses: i64,
    pub total_tokens: i64,
    /// Top agents by session count
    pub top_agents: Vec<AgentCount>,
    pub since: DateTime<Utc>,
}

/// A skill and how many times it was loaded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillCount {
    pub skill_name: String,
    pub count: i64,
}

/// An agent and a count (sessions or skill loads, depending on context).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentCount {
    pub agent_name: String,
    pub count: i64,
}

/// One agent's effort on an issue.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentWork {
    pub agent_name: String,
    pub work_sessions: i64,
    pub total_time: Duration,
    /// Completed work rows
    pub completed: i64,
}

/// A session and its duration, for visualization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionDuration {
    pub session_id: String,
    pub agent_name: String,
    pub started_at: DateTime<Utc>,
    /// End (or now, if still open) minus start
    pub duration: Duration,
    /// True once the session has an end timestamp
    pub is_completed: bool,
}

/// Convert SQL-computed seconds to a duration.
///
/// Values are rounded to the millisecond, the precision timestamps are stored
/// at. NULL, negative and non-finite values read as zero.
pub(crate) fn secs_to_duration(secs: Option<f64>) -> Duration {
    match secs {
        Some(s) if s.is_finite() && s > 0.0 => Duration::from_millis((s * 1000.0).round() as u64),
        _ => Duration::ZERO,
    }
}
