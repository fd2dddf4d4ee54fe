//! Room model - the bookable resource and its slot grid

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::time::SlotTime;

/// Shortest slot a room may be configured with, in minutes
pub const MIN_SLOT_MINUTES: u16 = 15;

/// Slot length used when an admin does not specify one
pub const DEFAULT_SLOT_MINUTES: u16 = 30;

/// A shared room with a daily operating window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: Uuid,
    pub name: String,
    /// Opening time; first slot starts here
    pub start_time: SlotTime,
    /// Closing time; no slot may start at or after it
    pub end_time: SlotTime,
    /// Fixed slot length in minutes
    pub slot_duration: u16,
    /// Soft-delete flag
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn new(input: NewRoom) -> Result<Self> {
        input.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: input.name,
            start_time: input.start_time,
            end_time: input.end_time,
            slot_duration: input.slot_duration,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Check the operating window and slot length
    pub fn validate(&self) -> Result<()> {
        validate_window(&self.name, self.start_time, self.end_time, self.slot_duration)
    }

    /// Every slot start the room offers in a day, ascending
    ///
    /// Walks from `start_time` in `slot_duration` steps and keeps each offset
    /// strictly before `end_time`. A trailing partial slot is still emitted as
    /// long as it starts before closing.
    pub fn slot_grid(&self) -> impl Iterator<Item = SlotTime> + '_ {
        let step = self.slot_duration.max(1);
        let end = self.end_time.minutes();
        (self.start_time.minutes()..end)
            .step_by(step as usize)
            .filter_map(|m| SlotTime::from_minutes(m).ok())
    }

    /// True when `start` is one of the starts in `slot_grid`
    pub fn offers_slot(&self, start: SlotTime) -> bool {
        let (open, close) = (self.start_time.minutes(), self.end_time.minutes());
        let m = start.minutes();
        m >= open && m < close && (m - open) % self.slot_duration.max(1) == 0
    }

    /// Apply a partial update and re-validate
    pub fn apply(&mut self, patch: RoomPatch) -> Result<()> {
        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = name;
        }
        if let Some(start) = patch.start_time {
            next.start_time = start;
        }
        if let Some(end) = patch.end_time {
            next.end_time = end;
        }
        if let Some(slot) = patch.slot_duration {
            next.slot_duration = slot;
        }
        if let Some(active) = patch.is_active {
            next.is_active = active;
        }
        next.validate()?;
        next.updated_at = Utc::now();
        *self = next;
        Ok(())
    }
}

/// Admin input for creating a room
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRoom {
    pub name: String,
    pub start_time: SlotTime,
    pub end_time: SlotTime,
    #[serde(default = "default_slot_duration")]
    pub slot_duration: u16,
}

impl NewRoom {
    pub fn validate(&self) -> Result<()> {
        validate_window(&self.name, self.start_time, self.end_time, self.slot_duration)
    }
}

fn default_slot_duration() -> u16 {
    DEFAULT_SLOT_MINUTES
}

/// Admin input for updating a room in place
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RoomPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub start_time: Option<SlotTime>,
    #[serde(default)]
    pub end_time: Option<SlotTime>,
    #[serde(default)]
    pub slot_duration: Option<u16>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

fn validate_window(name: &str, start: SlotTime, end: SlotTime, slot: u16) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation("room name must not be empty".into()));
    }
    if start >= end {
        return Err(Error::Validation(format!(
            "room opens at {} but closes at {}",
            start, end
        )));
    }
    if slot < MIN_SLOT_MINUTES {
        return Err(Error::Validation(format!(
            "slot duration must be at least {} minutes, got {}",
            MIN_SLOT_MINUTES, slot
        )));
    }
    Ok(())
}
