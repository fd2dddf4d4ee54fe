//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use uuid::Uuid;

use crate::models::{Room, Schedule, MIN_SLOT_MINUTES};

/// Validate that a Room's window and slot length are consistent
pub fn assert_room_invariants(room: &Room) {
    debug_assert!(
        room.start_time < room.end_time,
        "Room {} opens at {} but closes at {}",
        room.id,
        room.start_time,
        room.end_time
    );

    debug_assert!(
        room.slot_duration >= MIN_SLOT_MINUTES,
        "Room {} has slot duration {} below minimum",
        room.id,
        room.slot_duration
    );

    debug_assert!(
        !room.name.trim().is_empty(),
        "Room {} has empty name",
        room.id
    );
}

/// Validate a freshly built booking against the room it targets
pub fn assert_schedule_invariants(schedule: &Schedule, room: &Room) {
    debug_assert!(
        schedule.room_id == room.id,
        "Schedule {} built for room {} but checked against {}",
        schedule.id,
        schedule.room_id,
        room.id
    );

    // End is fixed at creation from the room's slot length
    debug_assert!(
        schedule.start_time.checked_add(room.slot_duration) == Some(schedule.end_time),
        "Schedule {} spans {}-{} but room {} has {} minute slots",
        schedule.id,
        schedule.start_time,
        schedule.end_time,
        room.id,
        room.slot_duration
    );

    assert_user_id_valid(schedule.user_id, "schedule owner");
}

/// Validate that a user ID is not nil
pub fn assert_user_id_valid(user_id: Uuid, context: &str) {
    debug_assert!(
        user_id != Uuid::nil(),
        "Nil user_id in context: {}",
        context
    );
}
