//! Integration tests for agent-tracking
//!
//! These tests drive the public API end to end against both in-memory and
//! on-disk databases, the way a host issue tracker would.

use agent_tracking::{schema, Config, Error, ExitReason, QueryLimits, Tracker};
use chrono::{TimeZone, Utc};
use rusqlite::Connection;
use tempfile::TempDir;

fn open_host_db() -> Connection {
    agent_tracking::logging::init_test();
    let conn = Connection::open_in_memory().unwrap();
    conn.execute("PRAGMA foreign_keys = ON", []).unwrap();
    schema::initialize(&conn).unwrap();
    conn
}

// ============================================
// Full session scenario
// ============================================

#[test]
fn test_full_session_flow() {
    let conn = open_host_db();
    let tracker = Tracker::new(&conn);

    let sid = tracker.start_session("agentX", "/ws", "sonnet").unwrap();
    let wid = tracker
        .record_work(&sid, "issue-1", "agentX", "because P1")
        .unwrap();
    tracker
        .record_skill_usage(&sid, "dep-thinking", "issue-1", 500)
        .unwrap();
    tracker.complete_work(&wid, "done").unwrap();
    tracker
        .end_session(&sid, ExitReason::Completed.as_str())
        .unwrap();

    let issue = tracker.issue_stats("issue-1").unwrap();
    assert!(issue.is_completed);
    assert_eq!(issue.total_agents, 1);
    assert_eq!(issue.total_work_sessions, 1);

    let session = tracker.get_session(&sid).unwrap();
    assert!(!session.is_active());
    assert_eq!(session.exit_reason.as_deref(), Some("completed"));
    assert!(tracker.list_active_sessions().unwrap().is_empty());

    let since = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
    let agent = tracker.agent_stats("agentX", since).unwrap();
    assert_eq!(agent.total_sessions, 1);
    assert_eq!(agent.active_sessions, 0);
    assert_eq!(agent.total_issues, 1);
    assert_eq!(agent.completed_issues, 1);
    assert_eq!(agent.total_skill_uses, 1);
    assert_eq!(agent.most_used_skills[0].skill_name, "dep-thinking");

    let skill = tracker.skill_stats("dep-thinking", since).unwrap();
    assert_eq!(skill.total_uses, 1);
    assert_eq!(skill.total_context, 500);
    assert_eq!(skill.top_agents[0].agent_name, "agentX");

    let durations = tracker.session_durations(Some("agentX"), since, 0).unwrap();
    assert_eq!(durations.len(), 1);
    assert!(durations[0].is_completed);
}

#[test]
fn test_session_lists_round_trip() {
    let conn = open_host_db();
    let tracker = Tracker::new(&conn);
    let sid = tracker.start_session("agentX", "/ws", "").unwrap();

    let issues = vec!["agents-42".to_string(), "agents-43".to_string()];
    let skills = vec![
        "dependency-thinking".to_string(),
        "session-rituals".to_string(),
    ];
    tracker.update_session_issues(&sid, &issues).unwrap();
    tracker.update_session_skills(&sid, &skills).unwrap();
    tracker.update_session_tokens(&sid, 15000).unwrap();

    let session = tracker.get_session(&sid).unwrap();
    assert_eq!(session.issues_claimed, issues);
    assert_eq!(session.skills_used, skills);
    assert_eq!(session.context_tokens, 15000);

    // Records serialize for callers that emit JSON
    let json = serde_json::to_value(&session).unwrap();
    assert_eq!(json["issues_claimed"][1], "agents-43");
}

// ============================================
// Host database integration
// ============================================

#[test]
fn test_persists_across_connections() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("beads.db");

    let sid = {
        let conn = Connection::open(&path).unwrap();
        schema::initialize(&conn).unwrap();
        Tracker::new(&conn)
            .start_session("agentX", "/ws", "opus")
            .unwrap()
    };

    let conn = Connection::open(&path).unwrap();
    // Re-initializing an existing database leaves data alone
    schema::initialize(&conn).unwrap();
    assert!(schema::is_initialized(&conn).unwrap());

    let session = Tracker::new(&conn).get_session(&sid).unwrap();
    assert_eq!(session.model_tier.as_deref(), Some("opus"));
    assert!(session.is_active());
}

#[test]
fn test_cascade_delete_from_host() {
    let conn = open_host_db();
    let tracker = Tracker::new(&conn);

    let sid = tracker.start_session("agentX", "/ws", "").unwrap();
    tracker.record_work(&sid, "issue-1", "agentX", "").unwrap();
    tracker.record_skill_usage(&sid, "dep-thinking", "", 10).unwrap();

    tracker
        .connection()
        .execute("DELETE FROM agent_sessions WHERE session_id = ?", [&sid])
        .unwrap();

    assert!(tracker.list_work_by_issue("issue-1").unwrap().is_empty());
    assert!(tracker.list_skill_usage_by_session(&sid).unwrap().is_empty());
    assert_eq!(tracker.issue_stats("issue-1").unwrap().total_work_sessions, 0);
}

#[test]
fn test_errors_are_distinguishable() {
    let conn = open_host_db();
    let tracker = Tracker::new(&conn);

    match tracker.end_session("missing", "completed") {
        Err(Error::NotFound { entity, id }) => {
            assert_eq!(entity, "session");
            assert_eq!(id, "missing");
        }
        other => panic!("expected NotFound, got {:?}", other),
    }

    match tracker.record_work("", "issue-1", "agentX", "") {
        Err(Error::Validation(what)) => assert_eq!(what, "session ID"),
        other => panic!("expected Validation, got {:?}", other),
    }

    // Writes against an uninitialized database surface the engine error
    let bare = Connection::open_in_memory().unwrap();
    let err = Tracker::new(&bare)
        .start_session("agentX", "/ws", "")
        .unwrap_err();
    assert!(matches!(err, Error::Database(_)));
}

// ============================================
// Configuration
// ============================================

#[test]
fn test_configured_limits_flow_into_queries() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        "[queries]\nsession_list_limit = 1\nduration_list_limit = 2\ntop_n = 1\n",
    )
    .unwrap();
    let config = Config::load_from(&path).unwrap();
    assert_eq!(
        config.queries,
        QueryLimits {
            session_list_limit: 1,
            duration_list_limit: 2,
            top_n: 1,
        }
    );

    let conn = open_host_db();
    let tracker = Tracker::with_limits(&conn, config.queries);
    for _ in 0..3 {
        let sid = tracker.start_session("agentX", "/ws", "").unwrap();
        tracker.record_skill_usage(&sid, "a", "", 0).unwrap();
        tracker.record_skill_usage(&sid, "b", "", 0).unwrap();
    }

    let since = Utc.with_ymd_and_hms(2000, 1, 1, 0, 0, 0).unwrap();
    assert_eq!(tracker.list_sessions_by_agent("agentX", 0).unwrap().len(), 1);
    assert_eq!(tracker.session_durations(None, since, 0).unwrap().len(), 2);
    assert_eq!(
        tracker
            .agent_stats("agentX", since)
            .unwrap()
            .most_used_skills
            .len(),
        1
    );
}
