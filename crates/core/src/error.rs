//! Error types for Roombook Core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Room not found")]
    RoomNotFound,

    #[error("Schedule not found")]
    ScheduleNotFound,

    #[error("User not found")]
    UserNotFound,

    #[error("Not found: {0}")]
    NotFound(String),

    /// An active booking already holds the requested slot
    #[error("Slot already booked")]
    SlotUnavailable,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),
}

impl Error {
    /// True for domain errors whose message is safe to hand back to a caller
    pub fn is_domain(&self) -> bool {
        matches!(
            self,
            Error::RoomNotFound
                | Error::ScheduleNotFound
                | Error::UserNotFound
                | Error::NotFound(_)
                | Error::SlotUnavailable
                | Error::Validation(_)
                | Error::Authentication(_)
                | Error::PermissionDenied(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
