//! Core record types for agent tracking
//!
//! These types mirror the three extension tables that sit alongside the
//! issue tracker's own schema.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Session** | One continuous period an agent operates in a workspace |
//! | **Work** | One agent's engagement with one issue within a session |
//! | **Skill** | A named, loadable context/prompt module an agent can use |
//! | **Model tier** | Label for the model capability class the agent ran on |
//!
//! List-valued columns (claimed issues, skills used, status changes) are stored
//! as JSON arrays of strings. Decoding is lenient: a value that does not parse
//! as an array of strings reads back as an empty list.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================
// Session
// ============================================

/// One period of an agent operating in a workspace.
///
/// A session with no `ended_at` is considered active.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Opaque unique identifier (UUID v4)
    pub session_id: String,
    /// Name of the agent running the session
    pub agent_name: String,
    /// Workspace the agent operated in
    pub workspace_path: String,
    /// When the session started
    pub started_at: DateTime<Utc>,
    /// When the session ended (None while active)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Why the session ended (see [`ExitReason`] for well-known values)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_reason: Option<String>,
    /// Issue identifiers claimed during the session, in claim order
    pub issues_claimed: Vec<String>,
    /// Skill names used during the session, in load order
    pub skills_used: Vec<String>,
    /// Model tier label (e.g. "sonnet")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_tier: Option<String>,
    /// Accumulated context tokens
    pub context_tokens: i64,
    /// When the row was created
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// True while the session has no end timestamp.
    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// Well-known session exit reasons.
///
/// The column itself is free text; these are the values agents are expected
/// to report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    Completed,
    Interrupted,
    Error,
    Timeout,
}

impl ExitReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitReason::Completed => "completed",
            ExitReason::Interrupted => "interrupted",
            ExitReason::Error => "error",
            ExitReason::Timeout => "timeout",
        }
    }
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ExitReason {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(ExitReason::Completed),
            "interrupted" => Ok(ExitReason::Interrupted),
            "error" => Ok(ExitReason::Error),
            "timeout" => Ok(ExitReason::Timeout),
            _ => Err(format!("unknown exit reason: {}", s)),
        }
    }
}

// ============================================
// Work
// ============================================

/// One agent's engagement with one issue, scoped to a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Work {
    /// Unique identifier (UUID v4)
    pub work_id: String,
    /// Issue in the host tracker
    pub issue_id: String,
    /// Owning session (cascade-deleted with it)
    pub session_id: String,
    /// Agent doing the work
    pub agent_name: String,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
    /// Status transitions recorded while the work was open, oldest first
    pub status_changes: Vec<String>,
    /// Why the agent picked this issue
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decision_rationale: Option<String>,
    /// Free-text notes written on completion
    #[serde(skip_serializing_if = "Option::is_none")]
    pub work_notes: Option<String>,
    pub completed: bool,
}

// ============================================
// Skill usage
// ============================================

/// One instance of an agent loading a skill module during a session.
///
/// Append-only: rows are never updated, and only disappear when their session
/// is deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkillUsage {
    pub usage_id: String,
    pub session_id: String,
    pub skill_name: String,
    pub loaded_at: DateTime<Utc>,
    /// Issue the skill was loaded for, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub used_for_issue_id: Option<String>,
    /// Context size the skill contributed
    pub context_added: i64,
}

// ============================================
// JSON list columns
// ============================================

/// Encode an ordered list of strings for storage in a JSON text column.
pub fn encode_string_list(items: &[String]) -> serde_json::Result<String> {
    serde_json::to_string(items)
}

/// Decode a JSON text column into an ordered list of strings.
///
/// Missing or malformed values decode as an empty list. This is a deliberate
/// availability-over-strictness choice: a corrupt list is informational loss,
/// not a failed read.
pub fn decode_string_list(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return Vec::new();
    };
    match serde_json::from_str::<Vec<String>>(raw) {
        Ok(items) => items,
        Err(e) => {
            tracing::debug!(error = %e, raw, "Discarding undecodable list column");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_string_list_preserves_order() {
        let items = decode_string_list(Some(r#"["b","a","b"]"#));
        assert_eq!(items, vec!["b", "a", "b"]);
    }

    #[test]
    fn test_decode_string_list_is_lenient() {
        assert!(decode_string_list(None).is_empty());
        assert!(decode_string_list(Some("")).is_empty());
        assert!(decode_string_list(Some("not json")).is_empty());
        assert!(decode_string_list(Some(r#"{"a":1}"#)).is_empty());
        assert!(decode_string_list(Some("[1,2,3]")).is_empty());
        assert!(decode_string_list(Some("null")).is_empty());
    }

    #[test]
    fn test_encode_empty_list() {
        assert_eq!(encode_string_list(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_exit_reason_round_trip() {
        for reason in [
            ExitReason::Completed,
            ExitReason::Interrupted,
            ExitReason::Error,
            ExitReason::Timeout,
        ] {
            assert_eq!(reason.as_str().parse::<ExitReason>().unwrap(), reason);
        }
        assert!("crashed".parse::<ExitReason>().is_err());
    }

    #[test]
    fn test_session_serializes_snake_case() {
        let now = Utc::now();
        let session = Session {
            session_id: "s1".to_string(),
            agent_name: "agent".to_string(),
            workspace_path: "/ws".to_string(),
            started_at: now,
            ended_at: None,
            exit_reason: None,
            issues_claimed: vec![],
            skills_used: vec!["dep-thinking".to_string()],
            model_tier: Some("sonnet".to_string()),
            context_tokens: 0,
            created_at: now,
        };
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["session_id"], "s1");
        assert_eq!(json["skills_used"][0], "dep-thinking");
        assert!(json.get("ended_at").is_none());
        assert!(session.is_active());
    }
}
