//! # agent-tracking
//!
//! Extension tables for an issue tracker's SQLite database that record which
//! agent worked on which issue, during which session, and which skills it
//! loaded along the way.
//!
//! This library provides:
//! - Record types for sessions, work entries, and skill usage
//! - Idempotent schema initialization over a caller-owned connection
//! - A record store ([`Tracker`]) for creating and updating rows
//! - Read-only statistics per agent, issue, skill, and overall
//! - Configuration and logging infrastructure
//!
//! ## Layers
//!
//! - **Schema:** three `agent_*` tables plus indexes, created if absent
//! - **Record store:** single-statement CRUD with validation and not-found checks
//! - **Statistics:** joins and aggregates read directly from the tables
//!
//! ## Example
//!
//! ```rust,no_run
//! use agent_tracking::{schema, ExitReason, Tracker};
//! use rusqlite::Connection;
//!
//! // The connection belongs to the host issue tracker
//! let conn = Connection::open("beads.db").expect("failed to open database");
//! schema::initialize(&conn).expect("failed to initialize schema");
//!
//! let tracker = Tracker::new(&conn);
//! let session_id = tracker
//!     .start_session("beads-workflow-orchestrator", "/myStuff/project", "sonnet")
//!     .expect("failed to start session");
//! let work_id = tracker
//!     .record_work(&session_id, "agents-42", "beads-workflow-orchestrator", "Highest priority P1 task")
//!     .expect("failed to record work");
//! tracker.complete_work(&work_id, "Implemented user model").unwrap();
//! tracker.end_session(&session_id, ExitReason::Completed.as_str()).unwrap();
//!
//! let stats = tracker.issue_stats("agents-42").unwrap();
//! assert!(stats.is_completed);
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{
    AgentCount, AgentStats, AgentWork, IssueStats, OverallStats, SessionDuration, SkillCount,
    SkillStats,
};
pub use config::{Config, QueryLimits};
pub use db::{schema, Tracker};
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod logging;
pub mod types;
