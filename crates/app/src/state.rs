//! Startup state: database location, schema, bootstrap admin

use std::path::PathBuf;

use roombook_core::{Accounts, Config, Database, Result};
use roombook_net::ServerOptions;
use tracing::info;

/// Everything the server needs once startup has finished
pub struct AppState {
    pub db_path: PathBuf,
    pub listen_addr: String,
    pub session_hours: i64,
}

impl AppState {
    /// Prepare the database and make sure an admin can sign in
    pub fn bootstrap(config: &Config) -> Result<Self> {
        let db_path = config.database_path()?;

        // Ensure parent directory exists
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let db = Database::open(&db_path)?;
        info!(path = %db_path.display(), version = db.schema_version()?, "Database ready");

        let accounts = Accounts::new(&db, &db).with_session_hours(config.auth.session_hours);
        let admin = &config.admin;
        let admin_user =
            accounts.ensure_default_admin(&admin.name, &admin.last_name, &admin.email, &admin.password)?;
        info!(email = %admin_user.email, "Administrator available");
        accounts.purge_expired_sessions()?;

        Ok(Self {
            db_path,
            listen_addr: config.listen_addr(),
            session_hours: config.auth.session_hours,
        })
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            db_path: self.db_path.clone(),
            session_hours: self.session_hours,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roombook_core::{AuditLogRepository, LogFilter, UserRepository};

    fn config_in(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.database.path = Some(dir.join("nested").join("roombook.db"));
        config.server.port = 0;
        config
    }

    #[test]
    fn test_bootstrap_creates_database_and_admin() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        let state = AppState::bootstrap(&config).unwrap();
        assert!(state.db_path.exists());
        assert_eq!(state.listen_addr, "127.0.0.1:0");

        let db = Database::connect(&state.db_path).unwrap();
        let admin = db.find_user_by_email(&config.admin.email).unwrap().unwrap();
        assert!(admin.is_admin());
    }

    #[test]
    fn test_bootstrap_twice_keeps_one_admin() {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());

        AppState::bootstrap(&config).unwrap();
        let state = AppState::bootstrap(&config).unwrap();

        let db = Database::connect(&state.db_path).unwrap();
        // A second registration would have left a second audit entry
        let (_, registrations) = db.list_logs(&LogFilter::default()).unwrap();
        assert_eq!(registrations, 1);
        assert_eq!(state.server_options().session_hours, config.auth.session_hours);
    }
}
