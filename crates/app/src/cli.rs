use std::path::PathBuf;

use clap::Parser;

use roombook_core::{Config, Result};

#[derive(Debug, Parser)]
#[command(name = "roombook", about = "Room booking server", version)]
pub struct Cli {
    /// TOML config file; defaults apply when omitted or missing
    #[arg(long, env = "ROOMBOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Listen port, overriding the config file
    #[arg(long, env = "ROOMBOOK_PORT")]
    pub port: Option<u16>,
}

impl Cli {
    /// Config file contents with command line overrides applied
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::resolve(self.config.as_deref())?;
        if let Some(port) = self.port {
            config.server.port = port;
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_flag_forms() {
        let cli = Cli::try_parse_from(["roombook", "--config", "a.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("a.toml")));

        let cli = Cli::try_parse_from(["roombook", "--config=c.toml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("c.toml")));
    }

    #[test]
    fn test_port_overrides_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roombook.toml");
        std::fs::write(&path, "[server]\nhost = \"0.0.0.0\"\nport = 9000\n").unwrap();

        let cli = Cli {
            config: Some(path),
            port: Some(8080),
        };
        let config = cli.load_config().unwrap();
        assert_eq!(config.listen_addr(), "0.0.0.0:8080");
    }

    #[test]
    fn test_no_file_uses_defaults() {
        let cli = Cli {
            config: None,
            port: None,
        };
        assert_eq!(cli.load_config().unwrap(), Config::default());
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Cli::try_parse_from(["roombook", "--port", "eighty"]).is_err());
    }
}
