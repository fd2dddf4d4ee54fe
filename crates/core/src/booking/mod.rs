//! Slot availability and the booking lifecycle
//!
//! Both services borrow their collaborators for the duration of one request:
//! a store implementing the repository traits and, for writes, an audit sink.

mod availability;
mod lifecycle;

pub use availability::{free_slots, AvailabilityCalculator};
pub use lifecycle::{BookingRequest, ScheduleLifecycle};
