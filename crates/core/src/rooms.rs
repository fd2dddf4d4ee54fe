//! Room administration
//!
//! Rooms are never hard-deleted; deactivation hides them from listings and
//! booking while existing schedules keep pointing at them.

use serde_json::json;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::audit::{self, actions, modules, AuditSink};
use crate::error::{Error, Result};
use crate::invariants::assert_room_invariants;
use crate::models::{NewRoom, Room, RoomPatch};
use crate::storage::RoomRepository;

pub struct RoomAdmin<'a, S: ?Sized, A: ?Sized> {
    store: &'a S,
    audit: &'a A,
}

impl<'a, S, A> RoomAdmin<'a, S, A>
where
    S: RoomRepository + ?Sized,
    A: AuditSink + ?Sized,
{
    pub fn new(store: &'a S, audit: &'a A) -> Self {
        Self { store, audit }
    }

    pub fn list_active(&self) -> Result<Vec<Room>> {
        self.store.list_active_rooms()
    }

    /// Fetch a room, active or not
    pub fn get_room(&self, room_id: Uuid) -> Result<Room> {
        self.store
            .find_room_by_id(room_id)?
            .ok_or(Error::RoomNotFound)
    }

    /// Create several rooms at once
    ///
    /// Every room is validated before anything is written; the batch is then
    /// inserted all-or-nothing.
    #[instrument(skip(self, batch), fields(count = batch.len()))]
    pub fn create_rooms(&self, batch: Vec<NewRoom>, admin_id: Uuid) -> Result<Vec<Room>> {
        if batch.is_empty() {
            return Err(Error::Validation("no rooms given".into()));
        }

        let rooms = batch
            .into_iter()
            .map(Room::new)
            .collect::<Result<Vec<_>>>()?;
        rooms.iter().for_each(assert_room_invariants);

        self.store.create_rooms(&rooms)?;
        info!(count = rooms.len(), "Rooms created");

        for room in &rooms {
            audit::record(
                self.audit,
                admin_id,
                actions::ROOM_CREATED,
                modules::ROOMS,
                Some(json!({ "roomId": room.id, "roomName": room.name })),
            );
        }

        Ok(rooms)
    }

    /// Apply a partial update
    #[instrument(skip(self, patch))]
    pub fn update_room(&self, room_id: Uuid, patch: RoomPatch, admin_id: Uuid) -> Result<Room> {
        let mut room = self.get_room(room_id)?;
        let old_name = room.name.clone();

        room.apply(patch)?;
        assert_room_invariants(&room);
        self.store.update_room(&room)?;
        info!(room_id = %room.id, "Room updated");

        audit::record(
            self.audit,
            admin_id,
            actions::ROOM_UPDATED,
            modules::ROOMS,
            Some(json!({
                "roomId": room.id,
                "oldName": old_name,
                "newName": room.name,
            })),
        );

        Ok(room)
    }

    /// Soft delete
    #[instrument(skip(self))]
    pub fn deactivate_room(&self, room_id: Uuid, admin_id: Uuid) -> Result<Room> {
        let mut room = self.get_room(room_id)?;
        room.apply(RoomPatch {
            is_active: Some(false),
            ..Default::default()
        })?;
        self.store.update_room(&room)?;
        info!(room_id = %room.id, "Room deactivated");

        audit::record(
            self.audit,
            admin_id,
            actions::ROOM_DEACTIVATED,
            modules::ROOMS,
            Some(json!({ "roomId": room.id, "roomName": room.name })),
        );

        Ok(room)
    }
}
