//! Storage repository traits
//!
//! These traits are the persistence port the services depend on, allowing
//! for different implementations (SQLite, test doubles).

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    LogEntry, LogEntryDetails, LogFilter, Room, Schedule, ScheduleDetails, ScheduleFilter,
    ScheduleStatus, Session, User, UserFilter,
};
use crate::time::SlotTime;

/// User repository operations
pub trait UserRepository {
    /// Create a new user; a taken email is a validation error
    fn create_user(&self, user: &User) -> Result<()>;

    /// Find user by ID
    fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>>;

    /// Find user by email
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Overwrite a user's mutable fields
    fn update_user(&self, user: &User) -> Result<()>;

    /// Delete a user and everything they own; false when absent
    fn delete_user(&self, id: Uuid) -> Result<bool>;

    /// One page of `USER` accounts plus the unpaged total
    fn list_users(&self, filter: &UserFilter) -> Result<(Vec<User>, u64)>;

    /// Revoke every session of a user
    fn delete_user_sessions(&self, user_id: Uuid) -> Result<u64>;

    /// Update user's last login time
    fn update_last_login(&self, user_id: Uuid) -> Result<()>;

    /// Create a session
    fn create_session(&self, session: &Session) -> Result<()>;

    /// Find a valid (non-expired) session
    fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>>;

    /// Delete a session
    fn delete_session(&self, session_id: Uuid) -> Result<()>;

    /// Clean up expired sessions
    fn cleanup_expired_sessions(&self) -> Result<u64>;
}

/// Room repository operations
pub trait RoomRepository {
    /// Insert a batch of rooms atomically
    fn create_rooms(&self, rooms: &[Room]) -> Result<()>;

    /// Find room by ID, active or not
    fn find_room_by_id(&self, id: Uuid) -> Result<Option<Room>>;

    /// Overwrite a room's mutable fields
    fn update_room(&self, room: &Room) -> Result<()>;

    /// Active rooms ordered by name
    fn list_active_rooms(&self) -> Result<Vec<Room>>;
}

/// Schedule ledger operations
pub trait ScheduleRepository {
    /// Find schedule by ID
    fn find_schedule_by_id(&self, id: Uuid) -> Result<Option<Schedule>>;

    /// Find schedule by ID joined with owner and room name
    fn find_schedule_details(&self, id: Uuid) -> Result<Option<ScheduleDetails>>;

    /// Find a booking at `(room, date, start)` whose status is not `exclude_status`
    fn find_conflicting(
        &self,
        room_id: Uuid,
        date: NaiveDate,
        start_time: SlotTime,
        exclude_status: ScheduleStatus,
    ) -> Result<Option<Schedule>>;

    /// Start times of every slot-occupying booking for a room on a date
    fn list_occupied_starts(&self, room_id: Uuid, date: NaiveDate) -> Result<Vec<SlotTime>>;

    /// Insert a booking
    ///
    /// Must fail with `SlotUnavailable` when another slot-occupying booking
    /// already holds `(room, date, start)`, whatever the caller checked first.
    fn insert_schedule(&self, schedule: &Schedule) -> Result<()>;

    /// Set a booking's status; same uniqueness guarantee as insert
    fn update_schedule_status(&self, id: Uuid, status: ScheduleStatus) -> Result<()>;

    /// One page of bookings plus the unpaged total
    fn list_schedules(&self, filter: &ScheduleFilter) -> Result<(Vec<ScheduleDetails>, u64)>;
}

/// Audit log repository operations
pub trait AuditLogRepository {
    /// Append an entry
    fn insert_log(&self, entry: &LogEntry) -> Result<()>;

    /// One page of entries plus the unpaged total
    fn list_logs(&self, filter: &LogFilter) -> Result<(Vec<LogEntryDetails>, u64)>;
}
