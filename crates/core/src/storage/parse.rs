//! Database value parsing utilities
//!
//! Provides error-safe parsing of stored values.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::types::Type;
use rusqlite::Error as SqlError;
use uuid::Uuid;

use crate::models::{Role, ScheduleStatus};
use crate::time::SlotTime;

fn conversion_error(column: usize, message: String) -> SqlError {
    SqlError::FromSqlConversionFailure(column, Type::Text, message.into())
}

/// Parse a UUID from a database string column
pub fn parse_uuid(s: &str) -> Result<Uuid, SqlError> {
    Uuid::parse_str(s)
        .map_err(|e| SqlError::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

/// Parse a DateTime from an RFC3339 string
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, SqlError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| SqlError::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

/// Parse an optional DateTime from an RFC3339 string
pub fn parse_datetime_opt(s: Option<String>) -> Result<Option<DateTime<Utc>>, SqlError> {
    s.map(|s| parse_datetime(&s)).transpose()
}

/// Parse a `YYYY-MM-DD` date column
pub fn parse_date(s: &str) -> Result<NaiveDate, SqlError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| SqlError::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
}

/// Convert a stored minute-of-day integer
pub fn slot_time_from_i64(minutes: i64) -> Result<SlotTime, SqlError> {
    u16::try_from(minutes)
        .ok()
        .and_then(|m| SlotTime::from_minutes(m).ok())
        .ok_or_else(|| conversion_error(0, format!("invalid minute of day: {}", minutes)))
}

pub fn parse_role(s: &str) -> Result<Role, SqlError> {
    Role::from_str(s).ok_or_else(|| conversion_error(0, format!("unknown role: {}", s)))
}

pub fn parse_status(s: &str) -> Result<ScheduleStatus, SqlError> {
    ScheduleStatus::from_str(s)
        .ok_or_else(|| conversion_error(0, format!("unknown schedule status: {}", s)))
}

/// Parse an optional JSON detail payload
pub fn parse_json_opt(s: Option<String>) -> Result<Option<serde_json::Value>, SqlError> {
    s.map(|s| {
        serde_json::from_str(&s)
            .map_err(|e| SqlError::FromSqlConversionFailure(0, Type::Text, Box::new(e)))
    })
    .transpose()
}

/// Is this a UNIQUE constraint violation?
pub fn is_unique_violation(e: &SqlError) -> bool {
    matches!(
        e,
        SqlError::SqliteFailure(err, _) if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
    )
}

/// Extension trait for converting rusqlite Results to Option
pub trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>, SqlError>;
}

impl<T> OptionalExt<T> for Result<T, SqlError> {
    fn optional(self) -> Result<Option<T>, SqlError> {
        match self {
            Ok(v) => Ok(Some(v)),
            Err(SqlError::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }
}
