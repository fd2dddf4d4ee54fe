//! Data models for Roombook

mod log;
mod room;
mod schedule;
mod user;

pub use log::*;
pub use room::*;
pub use schedule::*;
pub use user::*;
