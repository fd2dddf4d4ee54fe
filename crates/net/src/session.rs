//! Per-connection request handling
//!
//! A `ConnectionSession` owns one database connection and the user the
//! connection has signed in as. Everything here is synchronous; the server
//! runs it on the blocking pool.

use tracing::{debug, error, instrument};
use uuid::Uuid;

use roombook_core::{
    parse_date, Accounts, Action, AuditTrail, AvailabilityCalculator, BookingRequest, Database,
    Error, LogFilter, NewUser, PermissionMatrix, Result, Role, RoomAdmin, ScheduleFilter,
    ScheduleLifecycle, ScheduleStatus, SlotTime, User, UserFilter,
};

use crate::protocol::{ListQuery, Request, Response};

pub struct ConnectionSession {
    db: Database,
    session_hours: i64,
    user: Option<User>,
    token: Option<Uuid>,
}

impl ConnectionSession {
    pub fn new(db: Database, session_hours: i64) -> Self {
        Self {
            db,
            session_hours,
            user: None,
            token: None,
        }
    }

    /// The signed-in user, if any
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Answer one request; failures become `Response::Error`
    pub fn handle(&mut self, request: Request) -> Response {
        match self.dispatch(request) {
            Ok(response) => response,
            Err(e) => {
                if e.is_domain() {
                    debug!(error = %e, "Request rejected");
                } else {
                    error!(error = %e, "Request failed");
                }
                Response::from_error(&e)
            }
        }
    }

    #[instrument(skip_all, fields(user_id = ?self.user.as_ref().map(|u| u.id)))]
    fn dispatch(&mut self, request: Request) -> Result<Response> {
        match request {
            Request::Ping => Ok(Response::Pong),

            Request::Register {
                name,
                last_name,
                email,
                password,
                role,
            } => {
                let role = role.unwrap_or(Role::User);
                // Signed-in connections register on behalf of others, which only admins may do
                if role == Role::Admin || self.user.is_some() {
                    self.authorize(Action::RegisterAdmin)?;
                }
                let accounts = self.accounts();
                let user = accounts.register(NewUser {
                    name,
                    last_name,
                    email,
                    password,
                    role,
                })?;
                if self.user.is_some() {
                    return Ok(Response::Registered {
                        user: user.summary(),
                    });
                }
                let session = accounts.start_session(&user)?;
                Ok(self.bind(user, session.id))
            }

            Request::Login { email, password } => {
                let (user, session) = self.accounts().login(&email, &password)?;
                Ok(self.bind(user, session.id))
            }

            Request::Authenticate { token } => {
                let user = self.accounts().resolve_session(token)?;
                Ok(self.bind(user, token))
            }

            Request::Logout => {
                if let Some(token) = self.token.take() {
                    self.accounts().logout(token)?;
                }
                self.user = None;
                Ok(Response::LoggedOut)
            }

            Request::ListUsers { query, date } => {
                self.authorize(Action::ManageUsers)?;
                let filter = UserFilter {
                    page: query.page,
                    limit: query.limit,
                    query: search_term(&query),
                    date: date.as_deref().map(parse_date).transpose()?,
                    order: query.order,
                };
                let page = self.accounts().list_users(&filter)?;
                Ok(Response::Users { page })
            }

            Request::GetUser { user_id } => {
                self.authorize_account(user_id)?;
                let user = self.accounts().get_user(user_id)?;
                Ok(Response::User { user })
            }

            Request::UpdateUser { user_id, patch } => {
                let caller = self.authorize_account(user_id)?;
                let (is_admin, is_self) = (
                    PermissionMatrix::can_perform(caller.role, Action::ManageUsers),
                    caller.id == user_id,
                );
                if patch.is_active.is_some() && !is_admin {
                    return Err(Error::PermissionDenied(
                        "only admins may enable or disable accounts".into(),
                    ));
                }
                if patch.is_active == Some(false) && is_self {
                    return Err(Error::Validation("cannot disable your own account".into()));
                }

                let user = self.accounts().update_user(user_id, patch)?;
                if is_self {
                    self.user = Some(user.clone());
                }
                Ok(Response::User { user })
            }

            Request::DeleteUser { user_id } => {
                let admin = self.authorize(Action::ManageUsers)?.id;
                if admin == user_id {
                    return Err(Error::Validation("cannot delete your own account".into()));
                }
                self.accounts().delete_user(user_id, admin)?;
                Ok(Response::UserDeleted { user_id })
            }

            Request::ListRooms => {
                self.authorize(Action::ViewRooms)?;
                let rooms = RoomAdmin::new(&self.db, &self.db).list_active()?;
                Ok(Response::Rooms { rooms })
            }

            Request::GetRoom { room_id } => {
                let user = self.authorize(Action::ViewRooms)?;
                let room = RoomAdmin::new(&self.db, &self.db).get_room(room_id)?;
                if !room.is_active && !PermissionMatrix::can_perform(user.role, Action::ManageRooms) {
                    return Err(Error::RoomNotFound);
                }
                Ok(Response::Room { room })
            }

            Request::CreateRooms { rooms } => {
                let admin = self.authorize(Action::ManageRooms)?.id;
                let mut created = RoomAdmin::new(&self.db, &self.db).create_rooms(rooms, admin)?;
                created.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(Response::Rooms { rooms: created })
            }

            Request::UpdateRoom { room_id, patch } => {
                let admin = self.authorize(Action::ManageRooms)?.id;
                let room = RoomAdmin::new(&self.db, &self.db).update_room(room_id, patch, admin)?;
                Ok(Response::Room { room })
            }

            Request::DeactivateRoom { room_id } => {
                let admin = self.authorize(Action::ManageRooms)?.id;
                let room = RoomAdmin::new(&self.db, &self.db).deactivate_room(room_id, admin)?;
                Ok(Response::Room { room })
            }

            Request::GetAvailability { room_id, date } => {
                self.authorize(Action::ViewAvailability)?;
                let day = parse_date(&date)?;
                let slots = AvailabilityCalculator::new(&self.db).compute_availability(room_id, day)?;
                Ok(Response::Availability {
                    room_id,
                    date,
                    slots,
                })
            }

            Request::CreateSchedule {
                room_id,
                date,
                start_time,
                notes,
            } => {
                let user_id = self.authorize(Action::CreateSchedule)?.id;
                let mut request = BookingRequest::new(
                    user_id,
                    room_id,
                    parse_date(&date)?,
                    start_time.parse::<SlotTime>()?,
                );
                request.notes = notes.filter(|n| !n.trim().is_empty());
                let schedule = ScheduleLifecycle::new(&self.db, &self.db).create(request)?;
                Ok(Response::ScheduleCreated { schedule })
            }

            Request::UpdateScheduleStatus {
                schedule_id,
                status,
            } => {
                let user = self.authorize(Action::ViewOwnSchedules)?;
                let (role, user_id) = (user.role, user.id);
                let status = ScheduleStatus::from_str(&status.trim().to_ascii_uppercase())
                    .ok_or_else(|| Error::Validation(format!("unknown status: {}", status)))?;

                let lifecycle = ScheduleLifecycle::new(&self.db, &self.db);
                let current = lifecycle.get(schedule_id)?;
                let is_owner = current.schedule.user_id == user_id;
                if !is_owner && !PermissionMatrix::can_perform(role, Action::ViewAllSchedules) {
                    // Foreign bookings are invisible to their non-owners
                    return Err(Error::ScheduleNotFound);
                }
                if !PermissionMatrix::can_set_status(role, is_owner, status) {
                    return Err(Error::PermissionDenied(format!(
                        "cannot set a booking to {}",
                        status.as_str()
                    )));
                }

                let schedule = lifecycle.update_status(schedule_id, status)?;
                Ok(Response::Schedule { schedule })
            }

            Request::GetSchedule { schedule_id } => {
                let user = self.authorize(Action::ViewOwnSchedules)?;
                let schedule = ScheduleLifecycle::new(&self.db, &self.db).get(schedule_id)?;
                if schedule.schedule.user_id != user.id
                    && !PermissionMatrix::can_perform(user.role, Action::ViewAllSchedules)
                {
                    return Err(Error::ScheduleNotFound);
                }
                Ok(Response::Schedule { schedule })
            }

            Request::ListSchedules {
                query,
                room_id,
                date,
            } => {
                let user = self.authorize(Action::ViewOwnSchedules)?;
                let filter = ScheduleFilter {
                    user_id: Some(user.id),
                    is_admin: PermissionMatrix::can_perform(user.role, Action::ViewAllSchedules),
                    page: query.page,
                    limit: query.limit,
                    query: search_term(&query),
                    room_id,
                    date: date.as_deref().map(parse_date).transpose()?,
                    order: query.order,
                };
                let page = ScheduleLifecycle::new(&self.db, &self.db).get_all(&filter)?;
                Ok(Response::Schedules { page })
            }

            Request::ListLogs { query, date } => {
                let user = self.authorize(Action::ViewOwnLogs)?;
                let filter = LogFilter {
                    user_id: None,
                    page: query.page,
                    limit: query.limit,
                    query: search_term(&query),
                    date: date.as_deref().map(parse_date).transpose()?,
                    order: query.order,
                };
                let page = AuditTrail::new(&self.db).list(user, filter)?;
                Ok(Response::Logs { page })
            }
        }
    }

    fn accounts(&self) -> Accounts<'_, Database, Database> {
        Accounts::new(&self.db, &self.db).with_session_hours(self.session_hours)
    }

    fn bind(&mut self, user: User, token: Uuid) -> Response {
        let response = Response::Authenticated {
            user: user.summary(),
            token,
        };
        self.user = Some(user);
        self.token = Some(token);
        response
    }

    /// The signed-in user, if they may read or edit account `user_id`
    ///
    /// Other accounts are invisible to non-admins.
    fn authorize_account(&self, user_id: Uuid) -> Result<&User> {
        let user = self.authorize(Action::UpdateOwnAccount)?;
        if user.id != user_id && !PermissionMatrix::can_perform(user.role, Action::ManageUsers) {
            return Err(Error::UserNotFound);
        }
        Ok(user)
    }

    /// The signed-in user, if they may perform `action`
    fn authorize(&self, action: Action) -> Result<&User> {
        let user = self
            .user
            .as_ref()
            .ok_or_else(|| Error::Authentication("sign in first".into()))?;
        if !PermissionMatrix::can_perform(user.role, action) {
            return Err(Error::PermissionDenied(format!("{:?} requires an admin", action)));
        }
        Ok(user)
    }
}

fn search_term(query: &ListQuery) -> Option<String> {
    query
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::ErrorKind;
    use roombook_core::{NewRoom, Room, UserPatch};

    fn admin_session() -> (ConnectionSession, Room) {
        let db = Database::open_in_memory().unwrap();
        Accounts::new(&db, &db)
            .ensure_default_admin("Admin", "Root", "admin@example.com", "adminpass")
            .unwrap();
        let mut session = ConnectionSession::new(db, 24);
        expect_auth(session.handle(Request::Login {
            email: "admin@example.com".into(),
            password: "adminpass".into(),
        }));

        let rooms = match session.handle(Request::CreateRooms {
            rooms: vec![NewRoom {
                name: "Sala".into(),
                start_time: "08:00".parse().unwrap(),
                end_time: "10:00".parse().unwrap(),
                slot_duration: 60,
            }],
        }) {
            Response::Rooms { rooms } => rooms,
            other => panic!("Wrong response: {:?}", other),
        };
        (session, rooms[0].clone())
    }

    fn expect_auth(response: Response) -> Uuid {
        match response {
            Response::Authenticated { token, .. } => token,
            other => panic!("Expected Authenticated, got {:?}", other),
        }
    }

    fn expect_error(response: Response) -> ErrorKind {
        match response {
            Response::Error { kind, .. } => kind,
            other => panic!("Expected Error, got {:?}", other),
        }
    }

    fn register(session: &mut ConnectionSession, email: &str) {
        session.handle(Request::Logout);
        expect_auth(session.handle(Request::Register {
            name: "Ana".into(),
            last_name: "Lima".into(),
            email: email.into(),
            password: "secret123".into(),
            role: None,
        }));
    }

    fn book(session: &mut ConnectionSession, room: &Room, start: &str) -> Response {
        session.handle(Request::CreateSchedule {
            room_id: room.id,
            date: "2026-01-08".into(),
            start_time: start.into(),
            notes: None,
        })
    }

    #[test]
    fn test_requests_need_a_session() {
        let db = Database::open_in_memory().unwrap();
        let mut session = ConnectionSession::new(db, 24);
        assert!(matches!(session.handle(Request::Ping), Response::Pong));
        assert_eq!(expect_error(session.handle(Request::ListRooms)), ErrorKind::Unauthorized);
    }

    #[test]
    fn test_booking_flow() {
        let (mut session, room) = admin_session();
        register(&mut session, "ana@example.com");

        let slots = |s: &mut ConnectionSession| match s.handle(Request::GetAvailability {
            room_id: room.id,
            date: "2026-01-08".into(),
        }) {
            Response::Availability { slots, .. } => {
                slots.iter().map(|t| t.to_string()).collect::<Vec<_>>()
            }
            other => panic!("Wrong response: {:?}", other),
        };
        assert_eq!(slots(&mut session), vec!["08:00", "09:00"]);

        let schedule = match book(&mut session, &room, "09:00") {
            Response::ScheduleCreated { schedule } => schedule,
            other => panic!("Wrong response: {:?}", other),
        };
        assert_eq!(schedule.end_time.to_string(), "10:00");
        assert_eq!(slots(&mut session), vec!["08:00"]);

        // Second booking of the same slot
        assert_eq!(expect_error(book(&mut session, &room, "09:00")), ErrorKind::Conflict);

        // Owners may cancel but not confirm
        let set = |s: &mut ConnectionSession, status: &str| {
            s.handle(Request::UpdateScheduleStatus {
                schedule_id: schedule.id,
                status: status.into(),
            })
        };
        assert_eq!(expect_error(set(&mut session, "CONFIRMED")), ErrorKind::Forbidden);
        assert!(matches!(set(&mut session, "CANCELLED"), Response::Schedule { .. }));
        assert_eq!(slots(&mut session), vec!["08:00", "09:00"]);
        assert_eq!(expect_error(set(&mut session, "LOST")), ErrorKind::Validation);
    }

    #[test]
    fn test_boundary_validation() {
        let (mut session, room) = admin_session();
        register(&mut session, "ana@example.com");

        assert_eq!(expect_error(book(&mut session, &room, "9am")), ErrorKind::Validation);
        assert_eq!(expect_error(book(&mut session, &room, "08:30")), ErrorKind::Validation);
        assert_eq!(expect_error(book(&mut session, &room, "03:00")), ErrorKind::Validation);
        assert_eq!(expect_error(book(&mut session, &room, "10:00")), ErrorKind::Validation);
        let response = session.handle(Request::GetAvailability {
            room_id: room.id,
            date: "08/01/2026".into(),
        });
        assert_eq!(expect_error(response), ErrorKind::Validation);
        let response = session.handle(Request::GetAvailability {
            room_id: Uuid::new_v4(),
            date: "2026-01-08".into(),
        });
        assert_eq!(expect_error(response), ErrorKind::NotFound);
    }

    #[test]
    fn test_users_cannot_manage_rooms() {
        let (mut session, room) = admin_session();
        register(&mut session, "ana@example.com");

        let response = session.handle(Request::DeactivateRoom { room_id: room.id });
        assert_eq!(expect_error(response), ErrorKind::Forbidden);

        let response = session.handle(Request::Register {
            name: "Eve".into(),
            last_name: "Root".into(),
            email: "eve@example.com".into(),
            password: "secret123".into(),
            role: Some(Role::Admin),
        });
        assert_eq!(expect_error(response), ErrorKind::Forbidden);
    }

    #[test]
    fn test_signed_in_user_cannot_register_others() {
        let (mut session, _) = admin_session();
        register(&mut session, "ana@example.com");

        let response = session.handle(Request::Register {
            name: "Beto".into(),
            last_name: "Reis".into(),
            email: "beto@example.com".into(),
            password: "secret123".into(),
            role: None,
        });
        assert_eq!(expect_error(response), ErrorKind::Forbidden);
        assert_eq!(session.user().map(|u| u.email.as_str()), Some("ana@example.com"));

        // Admins still register accounts without losing their own session
        session.handle(Request::Logout);
        expect_auth(session.handle(Request::Login {
            email: "admin@example.com".into(),
            password: "adminpass".into(),
        }));
        let response = session.handle(Request::Register {
            name: "Beto".into(),
            last_name: "Reis".into(),
            email: "beto@example.com".into(),
            password: "secret123".into(),
            role: None,
        });
        assert!(matches!(response, Response::Registered { .. }));
        assert_eq!(session.user().map(|u| u.role), Some(Role::Admin));
    }

    #[test]
    fn test_users_only_see_their_own_bookings() {
        let (mut session, room) = admin_session();
        register(&mut session, "ana@example.com");
        let ana_booking = match book(&mut session, &room, "08:00") {
            Response::ScheduleCreated { schedule } => schedule,
            other => panic!("Wrong response: {:?}", other),
        };

        register(&mut session, "beto@example.com");
        book(&mut session, &room, "09:00");

        let page = match session.handle(Request::ListSchedules {
            query: ListQuery::default(),
            room_id: Some(room.id),
            date: Some("2026-01-08".into()),
        }) {
            Response::Schedules { page } => page,
            other => panic!("Wrong response: {:?}", other),
        };
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].schedule.start_time.to_string(), "09:00");

        let response = session.handle(Request::GetSchedule {
            schedule_id: ana_booking.id,
        });
        assert_eq!(expect_error(response), ErrorKind::NotFound);
        let response = session.handle(Request::UpdateScheduleStatus {
            schedule_id: ana_booking.id,
            status: "CANCELLED".into(),
        });
        assert_eq!(expect_error(response), ErrorKind::NotFound);
    }

    #[test]
    fn test_admin_sees_everything() {
        let (mut session, room) = admin_session();
        register(&mut session, "ana@example.com");
        let booking = match book(&mut session, &room, "08:00") {
            Response::ScheduleCreated { schedule } => schedule,
            other => panic!("Wrong response: {:?}", other),
        };

        session.handle(Request::Logout);
        expect_auth(session.handle(Request::Login {
            email: "admin@example.com".into(),
            password: "adminpass".into(),
        }));

        let response = session.handle(Request::UpdateScheduleStatus {
            schedule_id: booking.id,
            status: "confirmed".into(),
        });
        match response {
            Response::Schedule { schedule } => {
                assert_eq!(schedule.schedule.status, ScheduleStatus::Confirmed);
                assert_eq!(schedule.user.email, "ana@example.com");
            }
            other => panic!("Wrong response: {:?}", other),
        }

        let logs = match session.handle(Request::ListLogs {
            query: ListQuery::default(),
            date: None,
        }) {
            Response::Logs { page } => page,
            other => panic!("Wrong response: {:?}", other),
        };
        // admin + ana registered, room created, booking created
        assert_eq!(logs.total, 4);
    }

    fn own_id(session: &ConnectionSession) -> Uuid {
        session.user().map(|u| u.id).unwrap()
    }

    #[test]
    fn test_users_manage_only_themselves() {
        let (mut session, _) = admin_session();
        register(&mut session, "beto@example.com");
        let beto = own_id(&session);
        register(&mut session, "ana@example.com");
        let ana = own_id(&session);

        let response = session.handle(Request::UpdateUser {
            user_id: ana,
            patch: UserPatch {
                name: Some("Ana Maria".into()),
                ..Default::default()
            },
        });
        assert!(matches!(response, Response::User { ref user } if user.name == "Ana Maria"));
        assert_eq!(session.user().map(|u| u.name.as_str()), Some("Ana Maria"));

        let response = session.handle(Request::GetUser { user_id: beto });
        assert_eq!(expect_error(response), ErrorKind::NotFound);
        let response = session.handle(Request::UpdateUser {
            user_id: beto,
            patch: UserPatch::default(),
        });
        assert_eq!(expect_error(response), ErrorKind::NotFound);

        let response = session.handle(Request::UpdateUser {
            user_id: ana,
            patch: UserPatch {
                is_active: Some(true),
                ..Default::default()
            },
        });
        assert_eq!(expect_error(response), ErrorKind::Forbidden);

        let response = session.handle(Request::ListUsers {
            query: ListQuery::default(),
            date: None,
        });
        assert_eq!(expect_error(response), ErrorKind::Forbidden);
        let response = session.handle(Request::DeleteUser { user_id: beto });
        assert_eq!(expect_error(response), ErrorKind::Forbidden);
    }

    #[test]
    fn test_admin_user_directory() {
        let (mut session, room) = admin_session();
        register(&mut session, "ana@example.com");
        let ana = own_id(&session);
        let booking = match book(&mut session, &room, "08:00") {
            Response::ScheduleCreated { schedule } => schedule,
            other => panic!("Wrong response: {:?}", other),
        };

        session.handle(Request::Logout);
        expect_auth(session.handle(Request::Login {
            email: "admin@example.com".into(),
            password: "adminpass".into(),
        }));
        let admin = own_id(&session);

        let page = match session.handle(Request::ListUsers {
            query: ListQuery {
                search: Some("ana".into()),
                ..Default::default()
            },
            date: None,
        }) {
            Response::Users { page } => page,
            other => panic!("Wrong response: {:?}", other),
        };
        assert_eq!(page.total, 1);
        assert_eq!(page.data[0].id, ana);

        let response = session.handle(Request::UpdateUser {
            user_id: ana,
            patch: UserPatch {
                is_active: Some(false),
                ..Default::default()
            },
        });
        assert!(matches!(response, Response::User { ref user } if !user.is_active));

        let response = session.handle(Request::DeleteUser { user_id: admin });
        assert_eq!(expect_error(response), ErrorKind::Validation);

        let response = session.handle(Request::DeleteUser { user_id: ana });
        assert!(matches!(response, Response::UserDeleted { user_id } if user_id == ana));
        let response = session.handle(Request::GetSchedule {
            schedule_id: booking.id,
        });
        assert_eq!(expect_error(response), ErrorKind::NotFound);
        let response = session.handle(Request::GetUser { user_id: ana });
        assert_eq!(expect_error(response), ErrorKind::NotFound);
    }

    #[test]
    fn test_disabled_user_cannot_sign_in() {
        let (mut session, _) = admin_session();
        register(&mut session, "ana@example.com");
        let ana = own_id(&session);

        session.handle(Request::Logout);
        expect_auth(session.handle(Request::Login {
            email: "admin@example.com".into(),
            password: "adminpass".into(),
        }));
        session.handle(Request::UpdateUser {
            user_id: ana,
            patch: UserPatch {
                is_active: Some(false),
                ..Default::default()
            },
        });

        session.handle(Request::Logout);
        let response = session.handle(Request::Login {
            email: "ana@example.com".into(),
            password: "secret123".into(),
        });
        assert_eq!(expect_error(response), ErrorKind::Unauthorized);
    }

    #[test]
    fn test_authenticate_resumes_session() {
        let (mut session, _) = admin_session();
        session.handle(Request::Logout);
        let token = expect_auth(session.handle(Request::Login {
            email: "admin@example.com".into(),
            password: "adminpass".into(),
        }));

        // Drop the binding without deleting the session
        session.user = None;
        session.token = None;
        expect_auth(session.handle(Request::Authenticate { token }));
        assert!(session.user().is_some());

        session.handle(Request::Logout);
        let response = session.handle(Request::Authenticate { token });
        assert_eq!(expect_error(response), ErrorKind::Unauthorized);
    }
}
