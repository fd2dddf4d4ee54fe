//! Roombook Core Library
//!
//! Models, storage, slot availability and the booking lifecycle for the
//! Roombook room-booking service.

pub mod accounts;
pub mod audit;
pub mod booking;
pub mod config;
pub mod error;
pub mod invariants;
pub mod models;
pub mod pagination;
pub mod permissions;
pub mod rooms;
pub mod storage;
pub mod time;

pub use accounts::{Accounts, NewUser};
pub use audit::{AuditSink, AuditTrail};
pub use booking::{free_slots, AvailabilityCalculator, BookingRequest, ScheduleLifecycle};
pub use config::Config;
pub use error::{Error, Result};
pub use models::*;
pub use pagination::{Page, SortOrder};
pub use permissions::*;
pub use rooms::RoomAdmin;
pub use storage::{
    AuditLogRepository, Database, RoomRepository, ScheduleRepository, UserRepository,
};
pub use time::{format_date, parse_date, SlotTime};
