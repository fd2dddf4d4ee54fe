//! Booking creation and status transitions

use chrono::NaiveDate;
use serde_json::json;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use crate::audit::{self, actions, modules, AuditSink};
use crate::error::{Error, Result};
use crate::invariants::assert_schedule_invariants;
use crate::models::{Schedule, ScheduleDetails, ScheduleFilter, ScheduleStatus};
use crate::pagination::Page;
use crate::storage::{RoomRepository, ScheduleRepository};
use crate::time::{format_date, SlotTime};

/// Input for a new booking
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub user_id: Uuid,
    pub room_id: Uuid,
    pub date: NaiveDate,
    pub start_time: SlotTime,
    pub notes: Option<String>,
}

impl BookingRequest {
    pub fn new(user_id: Uuid, room_id: Uuid, date: NaiveDate, start_time: SlotTime) -> Self {
        Self {
            user_id,
            room_id,
            date,
            start_time,
            notes: None,
        }
    }
}

/// Orchestrates the booking ledger
///
/// The pre-insert conflict lookup only gives a friendly fast path. The store's
/// insert is what actually refuses a second active booking for a slot, so two
/// racing requests still end with exactly one winner.
pub struct ScheduleLifecycle<'a, S: ?Sized, A: ?Sized> {
    store: &'a S,
    audit: &'a A,
}

impl<'a, S, A> ScheduleLifecycle<'a, S, A>
where
    S: RoomRepository + ScheduleRepository + ?Sized,
    A: AuditSink + ?Sized,
{
    pub fn new(store: &'a S, audit: &'a A) -> Self {
        Self { store, audit }
    }

    /// Book a slot; the new booking starts `Pending`
    #[instrument(skip(self, request), fields(user_id = %request.user_id, room_id = %request.room_id, date = %request.date, start = %request.start_time))]
    pub fn create(&self, request: BookingRequest) -> Result<Schedule> {
        let room = self
            .store
            .find_room_by_id(request.room_id)?
            .filter(|r| r.is_active)
            .ok_or(Error::RoomNotFound)?;

        if !request.start_time.can_start_slot() {
            return Err(Error::Validation(format!(
                "start time {} is not within the day",
                request.start_time
            )));
        }
        // The active-slot index keys on the start time, so only grid starts
        // keep bookings from overlapping
        if !room.offers_slot(request.start_time) {
            return Err(Error::Validation(format!(
                "{} is not a slot of {} ({}-{} every {} minutes)",
                request.start_time, room.name, room.start_time, room.end_time, room.slot_duration
            )));
        }

        if self
            .store
            .find_conflicting(
                request.room_id,
                request.date,
                request.start_time,
                ScheduleStatus::Cancelled,
            )?
            .is_some()
        {
            debug!("Slot already held, rejecting before insert");
            return Err(Error::SlotUnavailable);
        }

        let end_time = request
            .start_time
            .checked_add(room.slot_duration)
            .ok_or_else(|| {
                Error::Validation(format!(
                    "a {} minute booking at {} would end after midnight",
                    room.slot_duration, request.start_time
                ))
            })?;

        let mut schedule = Schedule::new(
            request.user_id,
            request.room_id,
            request.date,
            request.start_time,
            end_time,
        );
        if let Some(notes) = request.notes {
            schedule = schedule.with_notes(notes);
        }
        assert_schedule_invariants(&schedule, &room);

        // Authoritative check: the active-slot index rejects a lost race here
        self.store.insert_schedule(&schedule)?;

        info!(schedule_id = %schedule.id, "Schedule created");
        audit::record(
            self.audit,
            schedule.user_id,
            actions::SCHEDULE_CREATED,
            modules::SCHEDULING,
            Some(json!({
                "scheduleId": schedule.id,
                "date": format_date(schedule.date),
                "startTime": schedule.start_time.to_string(),
            })),
        );

        Ok(schedule)
    }

    /// Set a booking's status
    ///
    /// Any status may follow any other. Cancelling or completing writes one
    /// audit entry per call, attributed to the booking's owner.
    #[instrument(skip(self))]
    pub fn update_status(&self, schedule_id: Uuid, status: ScheduleStatus) -> Result<ScheduleDetails> {
        let current = self
            .store
            .find_schedule_by_id(schedule_id)?
            .ok_or(Error::ScheduleNotFound)?;

        self.store.update_schedule_status(schedule_id, status)?;
        info!(from = current.status.as_str(), to = status.as_str(), "Schedule status updated");

        if matches!(status, ScheduleStatus::Cancelled | ScheduleStatus::Completed) {
            audit::record(
                self.audit,
                current.user_id,
                &actions::schedule_status(status.label()),
                modules::SCHEDULING,
                Some(json!({
                    "scheduleId": schedule_id,
                    "status": status.label(),
                })),
            );
        }

        self.get(schedule_id)
    }

    /// One booking with owner and room name
    pub fn get(&self, schedule_id: Uuid) -> Result<ScheduleDetails> {
        self.store
            .find_schedule_details(schedule_id)?
            .ok_or(Error::ScheduleNotFound)
    }

    /// Filtered, paginated listing
    pub fn get_all(&self, filter: &ScheduleFilter) -> Result<Page<ScheduleDetails>> {
        let (data, total) = self.store.list_schedules(filter)?;
        Ok(Page::new(data, total, filter.page, filter.limit))
    }
}
