//! Database layer for agent tracking
//!
//! This module provides the storage layer over a caller-owned SQLite
//! connection with:
//! - Idempotent schema initialization
//! - Repository operations for sessions, work, and skill usage
//! - A lexically sortable timestamp codec

pub mod repo;
pub mod schema;
pub mod time;

pub use repo::Tracker;
