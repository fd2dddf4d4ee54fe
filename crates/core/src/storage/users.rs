//! User storage operations

use chrono::Utc;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{
    is_unique_violation, parse_datetime, parse_datetime_opt, parse_role, parse_uuid, OptionalExt,
};
use crate::error::{Error, Result};
use crate::models::{Role, Session, User, UserFilter};
use crate::pagination::{like_pattern, offset};
use crate::time::format_date;

const USER_COLUMNS: &str =
    "id, name, last_name, email, password_hash, role, is_active, created_at, last_login";

pub struct UserStore<'a> {
    conn: &'a Connection,
}

impl<'a> UserStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new user
    #[instrument(skip(self, user), fields(email = %user.email))]
    pub fn create(&self, user: &User) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO users (id, name, last_name, email, password_hash, role, is_active, created_at, last_login)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    user.id.to_string(),
                    user.name,
                    user.last_name,
                    user.email,
                    user.password_hash,
                    user.role.as_str(),
                    user.is_active as i32,
                    user.created_at.to_rfc3339(),
                    user.last_login.map(|t| t.to_rfc3339()),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::Validation(format!("email already registered: {}", user.email))
                } else {
                    Error::Database(e)
                }
            })?;
        Ok(())
    }

    /// Find user by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
        let user = self
            .conn
            .query_row(&sql, params![id.to_string()], map_user)
            .optional()?;
        Ok(user)
    }

    /// Find user by email
    #[instrument(skip(self))]
    pub fn find_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE email = ?1", USER_COLUMNS);
        let user = self.conn.query_row(&sql, params![email], map_user).optional()?;
        Ok(user)
    }

    /// Overwrite a user's profile, credentials and active flag
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub fn update(&self, user: &User) -> Result<()> {
        let changed = self
            .conn
            .execute(
                "UPDATE users SET name = ?1, last_name = ?2, email = ?3, password_hash = ?4, is_active = ?5
                 WHERE id = ?6",
                params![
                    user.name,
                    user.last_name,
                    user.email,
                    user.password_hash,
                    user.is_active as i32,
                    user.id.to_string(),
                ],
            )
            .map_err(|e| {
                if is_unique_violation(&e) {
                    Error::Validation(format!("email already registered: {}", user.email))
                } else {
                    Error::Database(e)
                }
            })?;
        if changed == 0 {
            return Err(Error::UserNotFound);
        }
        Ok(())
    }

    /// Remove a user with their sessions, bookings and audit entries
    ///
    /// Returns false when no such user existed.
    #[instrument(skip(self))]
    pub fn delete(&self, id: Uuid) -> Result<bool> {
        let id = id.to_string();
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM logs WHERE user_id = ?1", params![id])?;
        tx.execute("DELETE FROM schedules WHERE user_id = ?1", params![id])?;
        tx.execute("DELETE FROM sessions WHERE user_id = ?1", params![id])?;
        let removed = tx.execute("DELETE FROM users WHERE id = ?1", params![id])?;
        tx.commit()?;
        Ok(removed > 0)
    }

    /// Drop every session a user holds
    pub fn delete_sessions_for(&self, user_id: Uuid) -> Result<u64> {
        let count = self.conn.execute(
            "DELETE FROM sessions WHERE user_id = ?1",
            params![user_id.to_string()],
        )?;
        Ok(count as u64)
    }

    /// One page of `USER` accounts and the total count for the filter
    pub fn list(&self, filter: &UserFilter) -> Result<(Vec<User>, u64)> {
        let skip = offset(filter.page, filter.limit)?;

        let mut clauses: Vec<&str> = vec!["role = ?"];
        let mut args: Vec<Value> = vec![Value::Text(Role::User.as_str().to_string())];

        if let Some(query) = filter.query.as_deref().filter(|q| !q.trim().is_empty()) {
            clauses.push("(name LIKE ? ESCAPE '\\' OR email LIKE ? ESCAPE '\\')");
            let pattern = like_pattern(query.trim());
            args.push(Value::Text(pattern.clone()));
            args.push(Value::Text(pattern));
        }
        if let Some(date) = filter.date {
            clauses.push("substr(created_at, 1, 10) = ?");
            args.push(Value::Text(format_date(date)));
        }
        let where_sql = format!("WHERE {}", clauses.join(" AND "));

        let total: i64 = self.conn.query_row(
            &format!("SELECT COUNT(*) FROM users {}", where_sql),
            params_from_iter(args.iter()),
            |row| row.get(0),
        )?;

        let sql = format!(
            "SELECT {} FROM users {} ORDER BY created_at {} LIMIT ? OFFSET ?",
            USER_COLUMNS,
            where_sql,
            filter.order.as_sql()
        );
        args.push(Value::Integer(filter.limit as i64));
        args.push(Value::Integer(skip as i64));

        let mut stmt = self.conn.prepare(&sql)?;
        let users = stmt
            .query_map(params_from_iter(args.iter()), map_user)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok((users, total as u64))
    }

    /// Update last login time
    pub fn update_last_login(&self, user_id: Uuid) -> Result<()> {
        self.conn.execute(
            "UPDATE users SET last_login = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), user_id.to_string()],
        )?;
        Ok(())
    }

    /// Create a session
    #[instrument(skip(self, session), fields(user_id = %session.user_id))]
    pub fn create_session(&self, session: &Session) -> Result<()> {
        self.conn.execute(
            "INSERT INTO sessions (id, user_id, created_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                session.id.to_string(),
                session.user_id.to_string(),
                session.created_at.to_rfc3339(),
                session.expires_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find valid session
    #[instrument(skip(self))]
    pub fn find_valid_session(&self, session_id: Uuid) -> Result<Option<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, user_id, created_at, expires_at FROM sessions WHERE id = ?1 AND expires_at > ?2",
        )?;

        let now = Utc::now().to_rfc3339();
        let session = stmt
            .query_row(params![session_id.to_string(), now], |row| {
                Ok(Session {
                    id: parse_uuid(&row.get::<_, String>(0)?)?,
                    user_id: parse_uuid(&row.get::<_, String>(1)?)?,
                    created_at: parse_datetime(&row.get::<_, String>(2)?)?,
                    expires_at: parse_datetime(&row.get::<_, String>(3)?)?,
                })
            })
            .optional()?;

        Ok(session)
    }

    /// Delete session
    pub fn delete_session(&self, session_id: Uuid) -> Result<()> {
        self.conn.execute(
            "DELETE FROM sessions WHERE id = ?1",
            params![session_id.to_string()],
        )?;
        Ok(())
    }

    /// Clean up expired sessions
    pub fn cleanup_expired_sessions(&self) -> Result<u64> {
        let count = self.conn.execute(
            "DELETE FROM sessions WHERE expires_at < ?1",
            params![Utc::now().to_rfc3339()],
        )?;
        Ok(count as u64)
    }
}

fn map_user(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        last_name: row.get(2)?,
        email: row.get(3)?,
        password_hash: row.get(4)?,
        role: parse_role(&row.get::<_, String>(5)?)?,
        is_active: row.get::<_, i32>(6)? != 0,
        created_at: parse_datetime(&row.get::<_, String>(7)?)?,
        last_login: parse_datetime_opt(row.get::<_, Option<String>>(8)?)?,
    })
}
