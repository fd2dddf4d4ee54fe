//! Schedule (booking) model

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::UserSummary;
use crate::pagination::SortOrder;
use crate::time::SlotTime;

/// Booking status
///
/// Every status is reachable from every other; only `Cancelled` frees the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ScheduleStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl ScheduleStatus {
    pub const ALL: [ScheduleStatus; 4] = [
        ScheduleStatus::Pending,
        ScheduleStatus::Confirmed,
        ScheduleStatus::Cancelled,
        ScheduleStatus::Completed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Pending => "PENDING",
            ScheduleStatus::Confirmed => "CONFIRMED",
            ScheduleStatus::Cancelled => "CANCELLED",
            ScheduleStatus::Completed => "COMPLETED",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "PENDING" => Some(ScheduleStatus::Pending),
            "CONFIRMED" => Some(ScheduleStatus::Confirmed),
            "CANCELLED" => Some(ScheduleStatus::Cancelled),
            "COMPLETED" => Some(ScheduleStatus::Completed),
            _ => None,
        }
    }

    /// Human-readable label used in audit entries
    pub fn label(&self) -> &'static str {
        match self {
            ScheduleStatus::Pending => "pending",
            ScheduleStatus::Confirmed => "confirmed",
            ScheduleStatus::Cancelled => "cancelled",
            ScheduleStatus::Completed => "completed",
        }
    }

    /// Does a booking in this status occupy its slot?
    pub fn occupies_slot(&self) -> bool {
        *self != ScheduleStatus::Cancelled
    }
}

/// A booking of one slot in one room on one date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    pub id: Uuid,
    pub user_id: Uuid,
    pub room_id: Uuid,
    pub date: NaiveDate,
    pub start_time: SlotTime,
    /// Fixed at creation from the room's slot duration
    pub end_time: SlotTime,
    pub status: ScheduleStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Schedule {
    pub fn new(
        user_id: Uuid,
        room_id: Uuid,
        date: NaiveDate,
        start_time: SlotTime,
        end_time: SlotTime,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            room_id,
            date,
            start_time,
            end_time,
            status: ScheduleStatus::Pending,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_notes(mut self, notes: String) -> Self {
        self.notes = Some(notes);
        self
    }
}

/// A booking joined with its owner and room name
///
/// Carries enough to notify the owner without a second lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleDetails {
    #[serde(flatten)]
    pub schedule: Schedule,
    pub user: UserSummary,
    pub room_name: String,
}

/// Listing filters for bookings
#[derive(Debug, Clone)]
pub struct ScheduleFilter {
    /// The requesting user
    pub user_id: Option<Uuid>,
    /// Admins see every booking; everyone else only their own
    pub is_admin: bool,
    pub page: u32,
    pub limit: u32,
    /// Substring match against the owner's name, last name or email
    pub query: Option<String>,
    pub room_id: Option<Uuid>,
    pub date: Option<NaiveDate>,
    /// Applied to the compound key (date, start time)
    pub order: SortOrder,
}

impl Default for ScheduleFilter {
    fn default() -> Self {
        Self {
            user_id: None,
            is_admin: false,
            page: 1,
            limit: 10,
            query: None,
            room_id: None,
            date: None,
            order: SortOrder::Desc,
        }
    }
}

impl ScheduleFilter {
    /// The owner restriction actually applied to the query
    pub fn owner_scope(&self) -> Option<Uuid> {
        if self.is_admin {
            None
        } else {
            self.user_id
        }
    }
}
