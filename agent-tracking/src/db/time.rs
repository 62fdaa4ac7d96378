//! Timestamp codec for text columns.
//!
//! Timestamps are written as UTC RFC 3339 with fixed millisecond precision
//! (`2026-01-02T03:04:05.678Z`). Fixed width keeps lexical order equal to
//! chronological order among rows this crate writes. Older rows may carry
//! whole-second RFC 3339 or SQLite's `datetime('now')` text
//! (`2026-01-02 03:04:05`), so queries order and filter on `julianday()` of
//! the column rather than on its raw text.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use rusqlite::types::Type;
use rusqlite::Row;

/// Format a timestamp for storage.
pub fn format_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time, formatted for storage.
pub fn now_ts() -> String {
    format_ts(Utc::now())
}

/// SQLite `datetime()` output, which carries no offset and is UTC.
const SQLITE_DATETIME: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Parse a stored timestamp.
///
/// Any RFC 3339 offset is normalized to UTC. SQLite `datetime()` text is
/// read as UTC.
pub fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, SQLITE_DATETIME)
        .ok()
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Read a required timestamp column, failing the row on a bad value.
pub(crate) fn get_ts(row: &Row, column: &str) -> rusqlite::Result<DateTime<Utc>> {
    let raw: String = row.get(column)?;
    parse_column(row, column, &raw)
}

/// Read a nullable timestamp column. NULL and empty text both read as None.
pub(crate) fn get_opt_ts(row: &Row, column: &str) -> rusqlite::Result<Option<DateTime<Utc>>> {
    let raw: Option<String> = row.get(column)?;
    match raw.as_deref() {
        None | Some("") => Ok(None),
        Some(s) => parse_column(row, column, s).map(Some),
    }
}

fn parse_column(row: &Row, column: &str, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    parse_ts(raw).ok_or_else(|| {
        let idx = row.as_ref().column_index(column).unwrap_or(0);
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("invalid timestamp in {}: {:?}", column, raw).into(),
        )
    })
}
