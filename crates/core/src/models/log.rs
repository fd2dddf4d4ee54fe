//! Audit log entry model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserSummary;
use crate::pagination::SortOrder;

/// An immutable record of a state-changing action
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub user_id: Uuid,
    pub action: String,
    pub module: String,
    pub details: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(
        user_id: Uuid,
        action: impl Into<String>,
        module: impl Into<String>,
        details: Option<serde_json::Value>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            action: action.into(),
            module: module.into(),
            details,
            created_at: Utc::now(),
        }
    }
}

/// A log entry joined with its actor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntryDetails {
    #[serde(flatten)]
    pub entry: LogEntry,
    pub user: UserSummary,
}

/// Listing filters for audit entries
#[derive(Debug, Clone)]
pub struct LogFilter {
    /// Restrict to one actor; `None` lists everyone
    pub user_id: Option<Uuid>,
    pub page: u32,
    pub limit: u32,
    /// Substring match against action or module
    pub query: Option<String>,
    /// Entries created on this UTC day
    pub date: Option<NaiveDate>,
    pub order: SortOrder,
}

impl Default for LogFilter {
    fn default() -> Self {
        Self {
            user_id: None,
            page: 1,
            limit: 10,
            query: None,
            date: None,
            order: SortOrder::Desc,
        }
    }
}
