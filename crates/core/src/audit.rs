//! Audit trail
//!
//! Services write entries through [`AuditSink`]. Writes are fire-and-forget:
//! a failed write is reported with `warn!` and never undoes the action that
//! triggered it.

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{LogEntry, LogEntryDetails, LogFilter, User};
use crate::pagination::Page;
use crate::storage::{AuditLogRepository, Database};

/// Module labels attached to entries
pub mod modules {
    pub const SCHEDULING: &str = "scheduling";
    pub const ROOMS: &str = "rooms";
    pub const ACCOUNT: &str = "account";
}

/// Action labels attached to entries
pub mod actions {
    pub const SCHEDULE_CREATED: &str = "schedule created";
    pub const ROOM_CREATED: &str = "room created";
    pub const ROOM_UPDATED: &str = "room updated";
    pub const ROOM_DEACTIVATED: &str = "room deactivated";
    pub const USER_REGISTERED: &str = "user registered";
    pub const EMAIL_UPDATED: &str = "email updated";
    pub const PROFILE_UPDATED: &str = "profile updated";
    pub const USER_DELETED: &str = "user deleted";

    /// "schedule cancelled", "schedule completed", ...
    pub fn schedule_status(label: &str) -> String {
        format!("schedule {}", label)
    }
}

/// Destination for audit entries
pub trait AuditSink {
    fn create_log(&self, entry: &LogEntry) -> Result<()>;
}

impl AuditSink for Database {
    fn create_log(&self, entry: &LogEntry) -> Result<()> {
        self.insert_log(entry)
    }
}

/// Write an entry, logging instead of failing when the sink errors
pub fn record<A: AuditSink + ?Sized>(
    sink: &A,
    actor: Uuid,
    action: &str,
    module: &str,
    details: Option<Value>,
) {
    let entry = LogEntry::new(actor, action, module, details);
    if let Err(e) = sink.create_log(&entry) {
        warn!(
            actor = %actor,
            action,
            module,
            error = %e,
            "Failed to write audit entry"
        );
    }
}

/// Read side of the audit trail
pub struct AuditTrail<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: AuditLogRepository + ?Sized> AuditTrail<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// List entries visible to `requester`
    ///
    /// Admins see every actor; anyone else is pinned to their own entries
    /// whatever `filter.user_id` says.
    pub fn list(&self, requester: &User, mut filter: LogFilter) -> Result<Page<LogEntryDetails>> {
        if !requester.is_admin() {
            filter.user_id = Some(requester.id);
        }
        let (data, total) = self.store.list_logs(&filter)?;
        Ok(Page::new(data, total, filter.page, filter.limit))
    }
}
