//! Free-slot computation

use std::collections::HashSet;

use chrono::NaiveDate;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::Room;
use crate::storage::{RoomRepository, ScheduleRepository};
use crate::time::SlotTime;

/// Subtract occupied start times from a room's grid, keeping grid order
///
/// Slots are atomic; nothing is merged.
pub fn free_slots(room: &Room, occupied: &HashSet<SlotTime>) -> Vec<SlotTime> {
    room.slot_grid()
        .filter(|start| !occupied.contains(start))
        .collect()
}

pub struct AvailabilityCalculator<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S: RoomRepository + ScheduleRepository + ?Sized> AvailabilityCalculator<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Free slot starts for a room on a date, ascending
    ///
    /// Missing and inactive rooms both fail with `RoomNotFound`.
    pub fn compute_availability(&self, room_id: Uuid, date: NaiveDate) -> Result<Vec<SlotTime>> {
        let room = self
            .store
            .find_room_by_id(room_id)?
            .filter(|r| r.is_active)
            .ok_or(Error::RoomNotFound)?;

        let occupied: HashSet<SlotTime> = self
            .store
            .list_occupied_starts(room_id, date)?
            .into_iter()
            .collect();

        Ok(free_slots(&room, &occupied))
    }
}
