//! TCP client for the booking service
//!
//! One request in flight at a time; each call writes a request frame and
//! waits for its response.

use std::net::SocketAddr;

use tokio::net::TcpStream;
use tracing::{debug, info};
use uuid::Uuid;

use roombook_core::{
    LogEntryDetails, NewRoom, Page, Room, RoomPatch, Schedule, ScheduleDetails, SlotTime, User,
    UserPatch, UserSummary,
};

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{ListQuery, Request, Response};

/// Client handle for network operations
pub struct Client {
    stream: TcpStream,
    user: Option<UserSummary>,
    token: Option<Uuid>,
}

impl Client {
    /// Connect to a server
    pub async fn connect(addr: SocketAddr) -> Result<Self> {
        info!(addr = %addr, "Connecting to server");
        let stream = TcpStream::connect(addr).await?;
        Ok(Client {
            stream,
            user: None,
            token: None,
        })
    }

    /// User the connection is signed in as
    pub fn user(&self) -> Option<&UserSummary> {
        self.user.as_ref()
    }

    /// Session token from the last login, for `authenticate` on a later connection
    pub fn token(&self) -> Option<Uuid> {
        self.token
    }

    /// Send one request and wait for the answer
    ///
    /// An error response is returned as `Error::Remote`.
    pub async fn call(&mut self, request: &Request) -> Result<Response> {
        write_frame(&mut self.stream, request).await?;
        match read_frame(&mut self.stream).await? {
            Response::Error { kind, message } => {
                debug!(?kind, %message, "Server returned error");
                Err(Error::Remote { kind, message })
            }
            response => Ok(response),
        }
    }

    pub async fn ping(&mut self) -> Result<()> {
        match self.call(&Request::Ping).await? {
            Response::Pong => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    /// Create a plain user account and sign in as it
    pub async fn register(
        &mut self,
        name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserSummary> {
        let response = self
            .call(&Request::Register {
                name: name.to_string(),
                last_name: last_name.to_string(),
                email: email.to_string(),
                password: password.to_string(),
                role: None,
            })
            .await?;
        self.signed_in(response)
    }

    pub async fn login(&mut self, email: &str, password: &str) -> Result<UserSummary> {
        let response = self
            .call(&Request::Login {
                email: email.to_string(),
                password: password.to_string(),
            })
            .await?;
        self.signed_in(response)
    }

    pub async fn authenticate(&mut self, token: Uuid) -> Result<UserSummary> {
        let response = self.call(&Request::Authenticate { token }).await?;
        self.signed_in(response)
    }

    pub async fn logout(&mut self) -> Result<()> {
        match self.call(&Request::Logout).await? {
            Response::LoggedOut => {
                self.user = None;
                self.token = None;
                Ok(())
            }
            other => Err(unexpected(other)),
        }
    }

    /// Plain user accounts; needs an admin connection
    pub async fn list_users(&mut self, query: ListQuery, date: Option<&str>) -> Result<Page<User>> {
        let request = Request::ListUsers {
            query,
            date: date.map(str::to_string),
        };
        match self.call(&request).await? {
            Response::Users { page } => Ok(page),
            other => Err(unexpected(other)),
        }
    }

    pub async fn get_user(&mut self, user_id: Uuid) -> Result<User> {
        match self.call(&Request::GetUser { user_id }).await? {
            Response::User { user } => Ok(user),
            other => Err(unexpected(other)),
        }
    }

    pub async fn update_user(&mut self, user_id: Uuid, patch: UserPatch) -> Result<User> {
        match self.call(&Request::UpdateUser { user_id, patch }).await? {
            Response::User { user } => Ok(user),
            other => Err(unexpected(other)),
        }
    }

    pub async fn delete_user(&mut self, user_id: Uuid) -> Result<()> {
        match self.call(&Request::DeleteUser { user_id }).await? {
            Response::UserDeleted { .. } => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    pub async fn list_rooms(&mut self) -> Result<Vec<Room>> {
        match self.call(&Request::ListRooms).await? {
            Response::Rooms { rooms } => Ok(rooms),
            other => Err(unexpected(other)),
        }
    }

    pub async fn create_rooms(&mut self, rooms: Vec<NewRoom>) -> Result<Vec<Room>> {
        match self.call(&Request::CreateRooms { rooms }).await? {
            Response::Rooms { rooms } => Ok(rooms),
            other => Err(unexpected(other)),
        }
    }

    pub async fn update_room(&mut self, room_id: Uuid, patch: RoomPatch) -> Result<Room> {
        match self.call(&Request::UpdateRoom { room_id, patch }).await? {
            Response::Room { room } => Ok(room),
            other => Err(unexpected(other)),
        }
    }

    /// Free slot starts for `room_id` on `date` (`YYYY-MM-DD`)
    pub async fn availability(&mut self, room_id: Uuid, date: &str) -> Result<Vec<SlotTime>> {
        let request = Request::GetAvailability {
            room_id,
            date: date.to_string(),
        };
        match self.call(&request).await? {
            Response::Availability { slots, .. } => Ok(slots),
            other => Err(unexpected(other)),
        }
    }

    pub async fn create_schedule(
        &mut self,
        room_id: Uuid,
        date: &str,
        start_time: &str,
        notes: Option<String>,
    ) -> Result<Schedule> {
        let request = Request::CreateSchedule {
            room_id,
            date: date.to_string(),
            start_time: start_time.to_string(),
            notes,
        };
        match self.call(&request).await? {
            Response::ScheduleCreated { schedule } => Ok(schedule),
            other => Err(unexpected(other)),
        }
    }

    pub async fn set_schedule_status(
        &mut self,
        schedule_id: Uuid,
        status: &str,
    ) -> Result<ScheduleDetails> {
        let request = Request::UpdateScheduleStatus {
            schedule_id,
            status: status.to_string(),
        };
        match self.call(&request).await? {
            Response::Schedule { schedule } => Ok(schedule),
            other => Err(unexpected(other)),
        }
    }

    pub async fn list_schedules(
        &mut self,
        query: ListQuery,
        room_id: Option<Uuid>,
        date: Option<&str>,
    ) -> Result<Page<ScheduleDetails>> {
        let request = Request::ListSchedules {
            query,
            room_id,
            date: date.map(str::to_string),
        };
        match self.call(&request).await? {
            Response::Schedules { page } => Ok(page),
            other => Err(unexpected(other)),
        }
    }

    pub async fn list_logs(&mut self, query: ListQuery, date: Option<&str>) -> Result<Page<LogEntryDetails>> {
        let request = Request::ListLogs {
            query,
            date: date.map(str::to_string),
        };
        match self.call(&request).await? {
            Response::Logs { page } => Ok(page),
            other => Err(unexpected(other)),
        }
    }

    fn signed_in(&mut self, response: Response) -> Result<UserSummary> {
        match response {
            Response::Authenticated { user, token } => {
                self.user = Some(user.clone());
                self.token = Some(token);
                Ok(user)
            }
            other => Err(unexpected(other)),
        }
    }
}

fn unexpected(response: Response) -> Error {
    Error::UnexpectedResponse(format!("{:?}", response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ErrorKind;
    use crate::server::{Server, ServerOptions};
    use roombook_core::{Accounts, Database, SortOrder};

    async fn start() -> (Server, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("client.db");
        let db = Database::open(&db_path).unwrap();
        Accounts::new(&db, &db)
            .ensure_default_admin("Admin", "Root", "admin@example.com", "adminpass")
            .unwrap();
        let server = Server::start(
            "127.0.0.1:0",
            ServerOptions {
                db_path,
                session_hours: 24,
            },
        )
        .await
        .unwrap();
        (server, dir)
    }

    fn sala() -> NewRoom {
        NewRoom {
            name: "Sala".into(),
            start_time: "08:00".parse().unwrap(),
            end_time: "10:00".parse().unwrap(),
            slot_duration: 60,
        }
    }

    #[tokio::test]
    async fn test_ping_without_login() {
        let (server, _dir) = start().await;
        let mut client = Client::connect(server.addr()).await.unwrap();
        client.ping().await.unwrap();

        let err = client.list_rooms().await.unwrap_err();
        assert_eq!(err.remote_kind(), Some(ErrorKind::Unauthorized));
        server.shutdown();
    }

    #[tokio::test]
    async fn test_book_and_list() {
        let (server, _dir) = start().await;
        let mut admin = Client::connect(server.addr()).await.unwrap();
        admin.login("admin@example.com", "adminpass").await.unwrap();
        let room = admin.create_rooms(vec![sala()]).await.unwrap().remove(0);

        let mut ana = Client::connect(server.addr()).await.unwrap();
        let me = ana
            .register("Ana", "Lima", "ana@example.com", "secret123")
            .await
            .unwrap();
        assert_eq!(ana.user().map(|u| u.id), Some(me.id));

        let rooms = ana.list_rooms().await.unwrap();
        assert_eq!(rooms.len(), 1);

        let booked = ana
            .create_schedule(room.id, "2026-01-08", "08:00", Some("standup".into()))
            .await
            .unwrap();
        assert_eq!(booked.end_time.to_string(), "09:00");
        assert_eq!(booked.notes.as_deref(), Some("standup"));

        let page = ana
            .list_schedules(
                ListQuery {
                    order: SortOrder::Asc,
                    ..Default::default()
                },
                None,
                Some("2026-01-08"),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.total_pages, 1);
        assert_eq!(page.data[0].room_name, "Sala");

        let err = ana
            .set_schedule_status(booked.id, "COMPLETED")
            .await
            .unwrap_err();
        assert_eq!(err.remote_kind(), Some(ErrorKind::Forbidden));

        let done = admin.set_schedule_status(booked.id, "COMPLETED").await.unwrap();
        assert_eq!(done.schedule.id, booked.id);

        let logs = ana.list_logs(ListQuery::default(), None).await.unwrap();
        let actions: Vec<_> = logs.data.iter().map(|l| l.entry.action.as_str()).collect();
        assert!(actions.contains(&"schedule completed"));
        assert!(logs.data.iter().all(|l| l.entry.user_id == me.id));

        server.shutdown();
    }

    #[tokio::test]
    async fn test_user_directory_round_trip() {
        let (server, _dir) = start().await;
        let mut ana = Client::connect(server.addr()).await.unwrap();
        let me = ana
            .register("Ana", "Lima", "ana@example.com", "secret123")
            .await
            .unwrap();
        let token = ana.token().unwrap();

        let updated = ana
            .update_user(
                me.id,
                UserPatch {
                    email: Some("ana.lima@example.com".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.email, "ana.lima@example.com");
        assert_eq!(ana.get_user(me.id).await.unwrap().email, "ana.lima@example.com");

        let mut admin = Client::connect(server.addr()).await.unwrap();
        admin.login("admin@example.com", "adminpass").await.unwrap();
        let page = admin.list_users(ListQuery::default(), None).await.unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].email, "ana.lima@example.com");

        admin.delete_user(me.id).await.unwrap();
        let err = admin.get_user(me.id).await.unwrap_err();
        assert_eq!(err.remote_kind(), Some(ErrorKind::NotFound));

        let mut again = Client::connect(server.addr()).await.unwrap();
        let err = again.authenticate(token).await.unwrap_err();
        assert_eq!(err.remote_kind(), Some(ErrorKind::Unauthorized));

        server.shutdown();
    }

    #[tokio::test]
    async fn test_token_resumes_on_new_connection() {
        let (server, _dir) = start().await;
        let mut first = Client::connect(server.addr()).await.unwrap();
        first.login("admin@example.com", "adminpass").await.unwrap();
        let token = first.token().unwrap();

        let mut second = Client::connect(server.addr()).await.unwrap();
        let user = second.authenticate(token).await.unwrap();
        assert_eq!(user.email, "admin@example.com");
        let created = second.create_rooms(vec![sala()]).await.unwrap();
        let room = second
            .update_room(
                created[0].id,
                RoomPatch {
                    name: Some("Sala Grande".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(room.name, "Sala Grande");

        first.logout().await.unwrap();
        assert!(first.user().is_none());
        second.logout().await.unwrap();

        server.shutdown();
    }
}
