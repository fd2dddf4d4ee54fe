//! Room storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_uuid, slot_time_from_i64, OptionalExt};
use crate::error::Result;
use crate::models::Room;

const ROOM_COLUMNS: &str =
    "id, name, start_time, end_time, slot_duration, is_active, created_at, updated_at";

pub struct RoomStore<'a> {
    conn: &'a Connection,
}

impl<'a> RoomStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Insert rooms in a single transaction
    #[instrument(skip(self, rooms), fields(count = rooms.len()))]
    pub fn create_batch(&self, rooms: &[Room]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO rooms (id, name, start_time, end_time, slot_duration, is_active, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for room in rooms {
                stmt.execute(params![
                    room.id.to_string(),
                    room.name,
                    room.start_time.minutes(),
                    room.end_time.minutes(),
                    room.slot_duration,
                    room.is_active as i32,
                    room.created_at.to_rfc3339(),
                    room.updated_at.to_rfc3339(),
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Find room by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Room>> {
        let sql = format!("SELECT {} FROM rooms WHERE id = ?1", ROOM_COLUMNS);
        let room = self
            .conn
            .query_row(&sql, params![id.to_string()], map_room)
            .optional()?;
        Ok(room)
    }

    /// Update room in place
    #[instrument(skip(self, room), fields(room_id = %room.id))]
    pub fn update(&self, room: &Room) -> Result<()> {
        self.conn.execute(
            "UPDATE rooms SET name = ?1, start_time = ?2, end_time = ?3, slot_duration = ?4, is_active = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                room.name,
                room.start_time.minutes(),
                room.end_time.minutes(),
                room.slot_duration,
                room.is_active as i32,
                room.updated_at.to_rfc3339(),
                room.id.to_string(),
            ],
        )?;
        Ok(())
    }

    /// List active rooms by name
    pub fn list_active(&self) -> Result<Vec<Room>> {
        let sql = format!(
            "SELECT {} FROM rooms WHERE is_active = 1 ORDER BY name ASC",
            ROOM_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rooms = stmt
            .query_map([], map_room)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(rooms)
    }
}

fn map_room(row: &Row<'_>) -> rusqlite::Result<Room> {
    Ok(Room {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        start_time: slot_time_from_i64(row.get(2)?)?,
        end_time: slot_time_from_i64(row.get(3)?)?,
        slot_duration: row.get(4)?,
        is_active: row.get::<_, i32>(5)? != 0,
        created_at: parse_datetime(&row.get::<_, String>(6)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(7)?)?,
    })
}
