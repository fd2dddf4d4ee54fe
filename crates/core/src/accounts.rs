//! Account registration, login, sessions and the user directory

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use serde::Deserialize;
use serde_json::json;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::audit::{self, actions, modules, AuditSink};
use crate::error::{Error, Result};
use crate::models::{Role, Session, User, UserFilter, UserPatch};
use crate::pagination::Page;
use crate::storage::UserRepository;

/// Shortest accepted password
pub const MIN_PASSWORD_LEN: usize = 6;

/// Default session lifetime: one week
pub const DEFAULT_SESSION_HOURS: i64 = 24 * 7;

/// Registration input
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub last_name: String,
    pub email: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::User
}

pub struct Accounts<'a, S: ?Sized, A: ?Sized> {
    store: &'a S,
    audit: &'a A,
    session_hours: i64,
}

impl<'a, S, A> Accounts<'a, S, A>
where
    S: UserRepository + ?Sized,
    A: AuditSink + ?Sized,
{
    pub fn new(store: &'a S, audit: &'a A) -> Self {
        Self {
            store,
            audit,
            session_hours: DEFAULT_SESSION_HOURS,
        }
    }

    pub fn with_session_hours(mut self, hours: i64) -> Self {
        self.session_hours = hours;
        self
    }

    /// Create an account
    #[instrument(skip(self, input), fields(email = %input.email))]
    pub fn register(&self, input: NewUser) -> Result<User> {
        let email = normalize_email(&input.email);
        if input.name.trim().is_empty() || input.last_name.trim().is_empty() {
            return Err(Error::Validation("name and last name are required".into()));
        }
        check_email(&email)?;
        check_password(&input.password)?;
        if self.store.find_user_by_email(&email)?.is_some() {
            return Err(Error::Validation(format!("email already registered: {}", email)));
        }

        let user = User::new(
            input.name.trim().to_string(),
            input.last_name.trim().to_string(),
            email,
            hash_password(&input.password)?,
            input.role,
        );
        self.store.create_user(&user)?;
        info!(user_id = %user.id, role = user.role.as_str(), "User registered");

        audit::record(
            self.audit,
            user.id,
            actions::USER_REGISTERED,
            modules::ACCOUNT,
            Some(json!({ "email": user.email, "role": user.role.as_str() })),
        );

        Ok(user)
    }

    /// Check credentials and open a session
    #[instrument(skip(self, password))]
    pub fn login(&self, email: &str, password: &str) -> Result<(User, Session)> {
        let user = self
            .store
            .find_user_by_email(&normalize_email(email))?
            .ok_or_else(|| Error::Authentication("invalid email or password".into()))?;

        if !verify_password(password, &user.password_hash)? {
            return Err(Error::Authentication("invalid email or password".into()));
        }
        if !user.is_active {
            return Err(Error::Authentication("account is disabled".into()));
        }

        self.store.update_last_login(user.id)?;
        let session = self.start_session(&user)?;
        info!(user_id = %user.id, "User logged in");
        Ok((user, session))
    }

    /// Open a session for an already verified user
    pub fn start_session(&self, user: &User) -> Result<Session> {
        let session = Session::new(user.id, self.session_hours);
        self.store.create_session(&session)?;
        Ok(session)
    }

    /// Look up the user behind a session token
    pub fn resolve_session(&self, token: Uuid) -> Result<User> {
        let session = self
            .store
            .find_valid_session(token)?
            .ok_or_else(|| Error::Authentication("session expired or unknown".into()))?;
        let user = self
            .store
            .find_user_by_id(session.user_id)?
            .ok_or(Error::UserNotFound)?;
        if !user.is_active {
            return Err(Error::Authentication("account is disabled".into()));
        }
        Ok(user)
    }

    pub fn logout(&self, token: Uuid) -> Result<()> {
        self.store.delete_session(token)
    }

    /// Drop expired sessions, returning how many went
    pub fn purge_expired_sessions(&self) -> Result<u64> {
        let removed = self.store.cleanup_expired_sessions()?;
        if removed > 0 {
            info!(removed, "Expired sessions removed");
        }
        Ok(removed)
    }

    /// One page of plain user accounts
    pub fn list_users(&self, filter: &UserFilter) -> Result<Page<User>> {
        let (data, total) = self.store.list_users(filter)?;
        Ok(Page::new(data, total, filter.page, filter.limit))
    }

    pub fn get_user(&self, user_id: Uuid) -> Result<User> {
        self.store
            .find_user_by_id(user_id)?
            .ok_or(Error::UserNotFound)
    }

    /// Apply a partial update to an account
    ///
    /// A new password is hashed before storage. Changing the email is audited
    /// as its own action; any other change is a profile update. Disabling an
    /// account revokes its sessions.
    #[instrument(skip(self, patch))]
    pub fn update_user(&self, user_id: Uuid, patch: UserPatch) -> Result<User> {
        let mut user = self.get_user(user_id)?;

        if let Some(name) = patch.name {
            user.name = required(name, "name")?;
        }
        if let Some(last_name) = patch.last_name {
            user.last_name = required(last_name, "last name")?;
        }

        let mut email_changed = false;
        if let Some(email) = patch.email {
            let email = normalize_email(&email);
            if email != user.email {
                check_email(&email)?;
                if self.store.find_user_by_email(&email)?.is_some() {
                    return Err(Error::Validation(format!("email already registered: {}", email)));
                }
                user.email = email;
                email_changed = true;
            }
        }
        if let Some(password) = patch.password {
            check_password(&password)?;
            user.password_hash = hash_password(&password)?;
        }
        let disabled = patch.is_active == Some(false) && user.is_active;
        if let Some(active) = patch.is_active {
            user.is_active = active;
        }

        self.store.update_user(&user)?;
        if disabled {
            let revoked = self.store.delete_user_sessions(user.id)?;
            info!(user_id = %user.id, revoked, "User disabled");
        }
        info!(user_id = %user.id, email_changed, "User updated");

        let action = if email_changed {
            actions::EMAIL_UPDATED
        } else {
            actions::PROFILE_UPDATED
        };
        audit::record(self.audit, user.id, action, modules::ACCOUNT, None);

        Ok(user)
    }

    /// Delete an account with its bookings and audit history
    #[instrument(skip(self))]
    pub fn delete_user(&self, user_id: Uuid, admin_id: Uuid) -> Result<()> {
        let user = self.get_user(user_id)?;
        if !self.store.delete_user(user_id)? {
            return Err(Error::UserNotFound);
        }
        info!(user_id = %user_id, "User deleted");

        audit::record(
            self.audit,
            admin_id,
            actions::USER_DELETED,
            modules::ACCOUNT,
            Some(json!({ "userId": user_id, "email": user.email })),
        );
        Ok(())
    }

    /// Make sure an administrator exists for `email`
    ///
    /// Returns the existing account untouched when one is already registered.
    pub fn ensure_default_admin(
        &self,
        name: &str,
        last_name: &str,
        email: &str,
        password: &str,
    ) -> Result<User> {
        if let Some(existing) = self.store.find_user_by_email(&normalize_email(email))? {
            if !existing.is_admin() {
                warn!(email, "Bootstrap admin email belongs to a non-admin account");
            }
            return Ok(existing);
        }

        self.register(NewUser {
            name: name.to_string(),
            last_name: last_name.to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role: Role::Admin,
        })
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn required(value: String, field: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(Error::Validation(format!("{} must not be empty", field)));
    }
    Ok(trimmed.to_string())
}

fn check_email(email: &str) -> Result<()> {
    if !email.contains('@') {
        return Err(Error::Validation(format!("invalid email: {}", email)));
    }
    Ok(())
}

fn check_password(password: &str) -> Result<()> {
    if password.len() < MIN_PASSWORD_LEN {
        return Err(Error::Validation(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| Error::Authentication(format!("failed to hash password: {}", e)))
}

fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| Error::Authentication(format!("invalid stored password: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
