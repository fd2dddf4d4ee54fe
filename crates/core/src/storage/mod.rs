//! SQLite storage layer for Roombook

mod logs;
mod migrations;
mod parse;
mod rooms;
mod schedules;
mod traits;
mod users;

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::instrument;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{
    LogEntry, LogEntryDetails, LogFilter, Room, Schedule, ScheduleDetails, ScheduleFilter,
    ScheduleStatus, Session, User, UserFilter,
};
use crate::time::SlotTime;

pub use logs::LogStore;
pub use rooms::RoomStore;
pub use schedules::ScheduleStore;
pub use traits::{AuditLogRepository, RoomRepository, ScheduleRepository, UserRepository};
pub use users::UserStore;

/// How long a writer waits on a locked database before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Main database handle
///
/// One handle wraps one SQLite connection. Concurrent request handlers each
/// open their own handle on the same file; the schema's unique indexes keep
/// them consistent.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path and apply migrations
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = Self::connect(path)?;
        db.init()?;
        Ok(db)
    }

    /// Open an additional connection to an already migrated database
    pub fn connect<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        configure(&conn)?;
        Ok(Self { conn })
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        configure(&conn)?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> Result<u32> {
        migrations::get_current_version(&self.conn)
    }

    #[cfg(test)]
    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Get user store
    pub fn users(&self) -> UserStore<'_> {
        UserStore::new(&self.conn)
    }

    /// Get room store
    pub fn rooms(&self) -> RoomStore<'_> {
        RoomStore::new(&self.conn)
    }

    /// Get schedule ledger
    pub fn schedules(&self) -> ScheduleStore<'_> {
        ScheduleStore::new(&self.conn)
    }

    /// Get audit log store
    pub fn logs(&self) -> LogStore<'_> {
        LogStore::new(&self.conn)
    }
}

fn configure(conn: &Connection) -> Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch("PRAGMA foreign_keys = ON")?;
    // journal_mode answers with the resulting mode, so it has to be queried
    let _mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
    Ok(())
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl UserRepository for Database {
    fn create_user(&self, user: &User) -> Result<()> {
        self.users().create(user)
    }

    fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>> {
        self.users().find_by_id(id)
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.users().find_by_email(email)
    }

    fn update_user(&self, user: &User) -> Result<()> {
        self.users().update(user)
    }

    fn delete_user(&self, id: Uuid) -> Result<bool> {
        self.users().delete(id)
    }

    fn list_users(&self, filter: &UserFilter) -> Result<(Vec<User>, u64)> {
        self.users().list(filter)
    }

    fn delete_user_sessions(&self, user_id: Uuid) -> Result<u64> {
        self.users().delete_sessions_for(user_id)
    }

    fn update_last_login(&self, user_id: Uuid) -> Result<()> {
        self.users().update_last_login(user_id)
    }

    fn create_session(&self, session: &Session) -> Result<()> {
        self.users().create_session(session)
    }

    fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>> {
        self.users().find_valid_session(session_id)
    }

    fn delete_session(&self, session_id: Uuid) -> Result<()> {
        self.users().delete_session(session_id)
    }

    fn cleanup_expired_sessions(&self) -> Result<u64> {
        self.users().cleanup_expired_sessions()
    }
}

impl RoomRepository for Database {
    fn create_rooms(&self, rooms: &[Room]) -> Result<()> {
        self.rooms().create_batch(rooms)
    }

    fn find_room_by_id(&self, id: Uuid) -> Result<Option<Room>> {
        self.rooms().find_by_id(id)
    }

    fn update_room(&self, room: &Room) -> Result<()> {
        self.rooms().update(room)
    }

    fn list_active_rooms(&self) -> Result<Vec<Room>> {
        self.rooms().list_active()
    }
}

impl ScheduleRepository for Database {
    fn find_schedule_by_id(&self, id: Uuid) -> Result<Option<Schedule>> {
        self.schedules().find_by_id(id)
    }

    fn find_schedule_details(&self, id: Uuid) -> Result<Option<ScheduleDetails>> {
        self.schedules().find_details(id)
    }

    fn find_conflicting(
        &self,
        room_id: Uuid,
        date: NaiveDate,
        start_time: SlotTime,
        exclude_status: ScheduleStatus,
    ) -> Result<Option<Schedule>> {
        self.schedules()
            .find_conflicting(room_id, date, start_time, exclude_status)
    }

    fn list_occupied_starts(&self, room_id: Uuid, date: NaiveDate) -> Result<Vec<SlotTime>> {
        self.schedules().occupied_starts(room_id, date)
    }

    fn insert_schedule(&self, schedule: &Schedule) -> Result<()> {
        self.schedules().insert(schedule)
    }

    fn update_schedule_status(&self, id: Uuid, status: ScheduleStatus) -> Result<()> {
        self.schedules().update_status(id, status)
    }

    fn list_schedules(&self, filter: &ScheduleFilter) -> Result<(Vec<ScheduleDetails>, u64)> {
        self.schedules().list(filter)
    }
}

impl AuditLogRepository for Database {
    fn insert_log(&self, entry: &LogEntry) -> Result<()> {
        self.logs().insert(entry)
    }

    fn list_logs(&self, filter: &LogFilter) -> Result<(Vec<LogEntryDetails>, u64)> {
        self.logs().list(filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_database_reopens_at_same_version() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roombook.db");

        let first = Database::open(&path).unwrap();
        let version = first.schema_version().unwrap();
        assert!(version > 0);

        let second = Database::connect(&path).unwrap();
        assert_eq!(second.schema_version().unwrap(), version);
    }
}
