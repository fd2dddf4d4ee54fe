//! Schedule ledger storage
//!
//! The partial unique index `idx_schedules_active_slot` is the authority on
//! double booking. Both insert and status updates translate a violation of
//! it into `Error::SlotUnavailable`.

use chrono::{NaiveDate, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use tracing::{instrument, warn};
use uuid::Uuid;

use super::parse::{
    is_unique_violation, parse_date, parse_datetime, parse_role, parse_status, parse_uuid,
    slot_time_from_i64, OptionalExt,
};
use crate::error::{Error, Result};
use crate::models::{Schedule, ScheduleDetails, ScheduleFilter, ScheduleStatus, UserSummary};
use crate::pagination::{like_pattern, offset};
use crate::time::{format_date, SlotTime};

const SCHEDULE_COLUMNS: &str = "s.id, s.user_id, s.room_id, s.date, s.start_time, s.end_time, \
     s.status, s.notes, s.created_at, s.updated_at";

const DETAIL_COLUMNS: &str = "s.id, s.user_id, s.room_id, s.date, s.start_time, s.end_time, \
     s.status, s.notes, s.created_at, s.updated_at, \
     u.name, u.last_name, u.email, u.role, r.name";

pub struct ScheduleStore<'a> {
    conn: &'a Connection,
}

impl<'a> ScheduleStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert a booking, enforcing one active booking per slot
    #[instrument(skip(self, schedule), fields(room_id = %schedule.room_id, date = %schedule.date, start = %schedule.start_time))]
    pub fn insert(&self, schedule: &Schedule) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO schedules (id, user_id, room_id, date, start_time, end_time, status, notes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    schedule.id.to_string(),
                    schedule.user_id.to_string(),
                    schedule.room_id.to_string(),
                    format_date(schedule.date),
                    schedule.start_time.minutes(),
                    schedule.end_time.minutes(),
                    schedule.status.as_str(),
                    schedule.notes,
                    schedule.created_at.to_rfc3339(),
                    schedule.updated_at.to_rfc3339(),
                ],
            )
            .map_err(slot_conflict)?;
        Ok(())
    }

    /// Find booking by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Schedule>> {
        let sql = format!("SELECT {} FROM schedules s WHERE s.id = ?1", SCHEDULE_COLUMNS);
        let schedule = self
            .conn
            .query_row(&sql, params![id.to_string()], map_schedule)
            .optional()?;
        Ok(schedule)
    }

    /// Find booking by ID with owner and room name
    #[instrument(skip(self))]
    pub fn find_details(&self, id: Uuid) -> Result<Option<ScheduleDetails>> {
        let sql = format!(
            "SELECT {} FROM schedules s
             INNER JOIN users u ON u.id = s.user_id
             INNER JOIN rooms r ON r.id = s.room_id
             WHERE s.id = ?1",
            DETAIL_COLUMNS
        );
        let details = self
            .conn
            .query_row(&sql, params![id.to_string()], map_details)
            .optional()?;
        Ok(details)
    }

    /// Find a booking holding the slot, ignoring `exclude_status`
    pub fn find_conflicting(
        &self,
        room_id: Uuid,
        date: NaiveDate,
        start_time: SlotTime,
        exclude_status: ScheduleStatus,
    ) -> Result<Option<Schedule>> {
        let sql = format!(
            "SELECT {} FROM schedules s
             WHERE s.room_id = ?1 AND s.date = ?2 AND s.start_time = ?3 AND s.status <> ?4
             LIMIT 1",
            SCHEDULE_COLUMNS
        );
        let schedule = self
            .conn
            .query_row(
                &sql,
                params![
                    room_id.to_string(),
                    format_date(date),
                    start_time.minutes(),
                    exclude_status.as_str(),
                ],
                map_schedule,
            )
            .optional()?;
        Ok(schedule)
    }

    /// Start times of slot-occupying bookings for a room on a date
    pub fn occupied_starts(&self, room_id: Uuid, date: NaiveDate) -> Result<Vec<SlotTime>> {
        let mut stmt = self.conn.prepare(
            "SELECT start_time FROM schedules
             WHERE room_id = ?1 AND date = ?2 AND status <> ?3
             ORDER BY start_time ASC",
        )?;
        let starts = stmt
            .query_map(
                params![
                    room_id.to_string(),
                    format_date(date),
                    ScheduleStatus::Cancelled.as_str()
                ],
                |row| slot_time_from_i64(row.get(0)?),
            )?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(starts)
    }

    /// Set booking status
    #[instrument(skip(self))]
    pub fn update_status(&self, id: Uuid, status: ScheduleStatus) -> Result<()> {
        let updated = self
            .conn
            .execute(
                "UPDATE schedules SET status = ?1, updated_at = ?2 WHERE id = ?3",
                params![status.as_str(), Utc::now().to_rfc3339(), id.to_string()],
            )
            .map_err(slot_conflict)?;

        if updated == 0 {
            return Err(Error::ScheduleNotFound);
        }
        Ok(())
    }

    /// One page of bookings and the total count for the filter
    #[instrument(skip(self, filter), fields(page = filter.page, limit = filter.limit))]
    pub fn list(&self, filter: &ScheduleFilter) -> Result<(Vec<ScheduleDetails>, u64)> {
        let skip = offset(filter.page, filter.limit)?;

        let mut clauses: Vec<&str> = Vec::new();
        let mut args: Vec<Value> = Vec::new();

        if let Some(owner) = filter.owner_scope() {
            clauses.push("s.user_id = ?");
            args.push(Value::Text(owner.to_string()));
        }
        if let Some(room_id) = filter.room_id {
            clauses.push("s.room_id = ?");
            args.push(Value::Text(room_id.to_string()));
        }
        if let Some(date) = filter.date {
            clauses.push("s.date = ?");
            args.push(Value::Text(format_date(date)));
        }
        if let Some(query) = filter.query.as_deref().filter(|q| !q.trim().is_empty()) {
            clauses.push(
                "(u.name LIKE ? ESCAPE '\\' OR u.last_name LIKE ? ESCAPE '\\' OR u.email LIKE ? ESCAPE '\\')",
            );
            let pattern = like_pattern(query.trim());
            for _ in 0..3 {
                args.push(Value::Text(pattern.clone()));
            }
        }

        let where_sql = if clauses.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", clauses.join(" AND "))
        };
        let from_sql = "FROM schedules s
             INNER JOIN users u ON u.id = s.user_id
             INNER JOIN rooms r ON r.id = s.room_id";

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) {} {}", from_sql, where_sql),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        let order = filter.order.as_sql();
        let sql = format!(
            "SELECT {} {} {} ORDER BY s.date {order}, s.start_time {order}, s.created_at {order} LIMIT ? OFFSET ?",
            DETAIL_COLUMNS,
            from_sql,
            where_sql,
            order = order
        );
        args.push(Value::Integer(filter.limit as i64));
        args.push(Value::Integer(skip as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params_from_iter(args.iter()), map_details)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok((rows, total as u64))
    }
}

/// Translate a violation of the active-slot index into the domain error
fn slot_conflict(e: rusqlite::Error) -> Error {
    if is_unique_violation(&e) {
        warn!("Active-slot uniqueness rejected a booking write");
        Error::SlotUnavailable
    } else {
        Error::Database(e)
    }
}

fn map_schedule(row: &Row<'_>) -> rusqlite::Result<Schedule> {
    Ok(Schedule {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        user_id: parse_uuid(&row.get::<_, String>(1)?)?,
        room_id: parse_uuid(&row.get::<_, String>(2)?)?,
        date: parse_date(&row.get::<_, String>(3)?)?,
        start_time: slot_time_from_i64(row.get(4)?)?,
        end_time: slot_time_from_i64(row.get(5)?)?,
        status: parse_status(&row.get::<_, String>(6)?)?,
        notes: row.get(7)?,
        created_at: parse_datetime(&row.get::<_, String>(8)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(9)?)?,
    })
}

fn map_details(row: &Row<'_>) -> rusqlite::Result<ScheduleDetails> {
    let schedule = map_schedule(row)?;
    let user = UserSummary {
        id: schedule.user_id,
        name: row.get(10)?,
        last_name: row.get(11)?,
        email: row.get(12)?,
        role: parse_role(&row.get::<_, String>(13)?)?,
    };
    Ok(ScheduleDetails {
        schedule,
        user,
        room_name: row.get(14)?,
    })
}
