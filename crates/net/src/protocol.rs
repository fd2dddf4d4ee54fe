//! Network protocol message types
//!
//! Every frame from a client is one `Request`; the server answers each with
//! exactly one `Response`, in order. Dates travel as `YYYY-MM-DD` and slot
//! times as `HH:mm`.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use roombook_core::{
    Error as CoreError, LogEntryDetails, NewRoom, Page, Role, Room, RoomPatch, Schedule,
    ScheduleDetails, SlotTime, SortOrder, User, UserPatch, UserSummary,
};

/// Client requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Create an account; an admin connection may create admins
    Register {
        name: String,
        last_name: String,
        email: String,
        password: String,
        #[serde(default)]
        role: Option<Role>,
    },

    Login { email: String, password: String },

    /// Resume a session from an earlier login
    Authenticate { token: Uuid },

    Logout,

    Ping,

    /// Plain user accounts; admins only
    ListUsers {
        #[serde(default)]
        query: ListQuery,
        #[serde(default)]
        date: Option<String>,
    },

    GetUser { user_id: Uuid },

    /// Users may edit themselves; admins may edit anyone
    UpdateUser { user_id: Uuid, patch: UserPatch },

    /// Removes the account with its bookings and audit entries
    DeleteUser { user_id: Uuid },

    ListRooms,

    GetRoom { room_id: Uuid },

    CreateRooms { rooms: Vec<NewRoom> },

    UpdateRoom { room_id: Uuid, patch: RoomPatch },

    DeactivateRoom { room_id: Uuid },

    /// Free slot starts for a room on a day
    GetAvailability { room_id: Uuid, date: String },

    CreateSchedule {
        room_id: Uuid,
        date: String,
        start_time: String,
        #[serde(default)]
        notes: Option<String>,
    },

    UpdateScheduleStatus { schedule_id: Uuid, status: String },

    GetSchedule { schedule_id: Uuid },

    ListSchedules {
        #[serde(default)]
        query: ListQuery,
        #[serde(default)]
        room_id: Option<Uuid>,
        #[serde(default)]
        date: Option<String>,
    },

    ListLogs {
        #[serde(default)]
        query: ListQuery,
        #[serde(default)]
        date: Option<String>,
    },
}

/// Paging and search shared by the listing requests
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListQuery {
    pub page: u32,
    pub limit: u32,
    pub search: Option<String>,
    pub order: SortOrder,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self {
            page: 1,
            limit: 10,
            search: None,
            order: SortOrder::Desc,
        }
    }
}

/// Server responses
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Response {
    Pong,

    /// The connection now acts as `user`
    Authenticated { user: UserSummary, token: Uuid },

    /// An account was created without switching the connection's user
    Registered { user: UserSummary },

    LoggedOut,

    Users { page: Page<User> },

    User { user: User },

    UserDeleted { user_id: Uuid },

    Rooms { rooms: Vec<Room> },

    Room { room: Room },

    Availability {
        room_id: Uuid,
        date: String,
        slots: Vec<SlotTime>,
    },

    ScheduleCreated { schedule: Schedule },

    Schedule { schedule: ScheduleDetails },

    Schedules { page: Page<ScheduleDetails> },

    Logs { page: Page<LogEntryDetails> },

    Error { kind: ErrorKind, message: String },
}

impl Response {
    /// Build the wire error for a core failure
    ///
    /// Infrastructure failures are reported without detail.
    pub fn from_error(err: &CoreError) -> Self {
        let kind = ErrorKind::from(err);
        let message = if kind == ErrorKind::Internal {
            "internal error".to_string()
        } else {
            err.to_string()
        };
        Response::Error { kind, message }
    }
}

/// Stable error categories on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Validation,
    Unauthorized,
    Forbidden,
    Internal,
}

impl ErrorKind {
    /// Matching HTTP status code
    pub fn status(self) -> u16 {
        match self {
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::Validation => 400,
            ErrorKind::Unauthorized => 401,
            ErrorKind::Forbidden => 403,
            ErrorKind::Internal => 500,
        }
    }
}

impl From<&CoreError> for ErrorKind {
    fn from(err: &CoreError) -> Self {
        match err {
            CoreError::RoomNotFound
            | CoreError::ScheduleNotFound
            | CoreError::UserNotFound
            | CoreError::NotFound(_) => ErrorKind::NotFound,
            CoreError::SlotUnavailable => ErrorKind::Conflict,
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::Authentication(_) => ErrorKind::Unauthorized,
            CoreError::PermissionDenied(_) => ErrorKind::Forbidden,
            CoreError::Database(_)
            | CoreError::Io(_)
            | CoreError::Serialization(_)
            | CoreError::Config(_) => ErrorKind::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let json = r#"{"type":"CreateSchedule","room_id":"6f1c1a4e-2f4b-4c8e-9a53-1f0d2f5b7c11","date":"2026-01-08","start_time":"09:00"}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        match req {
            Request::CreateSchedule { date, start_time, notes, .. } => {
                assert_eq!(date, "2026-01-08");
                assert_eq!(start_time, "09:00");
                assert!(notes.is_none());
            }
            other => panic!("Wrong request type: {:?}", other),
        }

        let req: Request = serde_json::from_str(r#"{"type":"ListSchedules"}"#).unwrap();
        match req {
            Request::ListSchedules { query, room_id, date } => {
                assert_eq!(query.page, 1);
                assert_eq!(query.limit, 10);
                assert!(room_id.is_none() && date.is_none());
            }
            other => panic!("Wrong request type: {:?}", other),
        }
    }

    #[test]
    fn test_user_wire_shape_hides_password() {
        let user = User::new(
            "Ana".into(),
            "Lima".into(),
            "ana@example.com".into(),
            "$argon2id$secret".into(),
            Role::User,
        );
        let json = serde_json::to_string(&Response::User { user }).unwrap();
        assert!(!json.contains("password"));
        assert!(!json.contains("argon2"));

        match serde_json::from_str::<Response>(&json).unwrap() {
            Response::User { user } => {
                assert_eq!(user.email, "ana@example.com");
                assert!(user.password_hash.is_empty());
            }
            other => panic!("Wrong response: {:?}", other),
        }

        let req: Request = serde_json::from_str(
            r#"{"type":"UpdateUser","user_id":"6f1c1a4e-2f4b-4c8e-9a53-1f0d2f5b7c11","patch":{"email":"new@example.com"}}"#,
        )
        .unwrap();
        match req {
            Request::UpdateUser { patch, .. } => {
                assert_eq!(patch.email.as_deref(), Some("new@example.com"));
                assert!(patch.password.is_none() && patch.is_active.is_none());
            }
            other => panic!("Wrong request type: {:?}", other),
        }
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(ErrorKind::from(&CoreError::SlotUnavailable).status(), 409);
        assert_eq!(ErrorKind::from(&CoreError::RoomNotFound), ErrorKind::NotFound);
        assert_eq!(
            ErrorKind::from(&CoreError::Validation("bad".into())),
            ErrorKind::Validation
        );
        assert_eq!(
            ErrorKind::from(&CoreError::PermissionDenied("no".into())).status(),
            403
        );
    }

    #[test]
    fn test_internal_errors_are_opaque() {
        let err = CoreError::Io(std::io::Error::other("disk on fire"));
        match Response::from_error(&err) {
            Response::Error { kind, message } => {
                assert_eq!(kind, ErrorKind::Internal);
                assert_eq!(message, "internal error");
            }
            other => panic!("Wrong response: {:?}", other),
        }

        match Response::from_error(&CoreError::SlotUnavailable) {
            Response::Error { kind, message } => {
                assert_eq!(kind, ErrorKind::Conflict);
                assert_eq!(message, "Slot already booked");
            }
            other => panic!("Wrong response: {:?}", other),
        }
    }

    #[test]
    fn test_error_kind_wire_name() {
        let json = serde_json::to_string(&ErrorKind::NotFound).unwrap();
        assert_eq!(json, "\"NOT_FOUND\"");
    }
}
