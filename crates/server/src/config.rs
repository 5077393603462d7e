//! Server configuration
//!
//! Layered as: built-in defaults, then the TOML file, then `BALLOTBOX_*`
//! environment variables, then command line flags.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ballotbox_core::{ElectionConfig, Error, Result};
use ballotbox_net::{ServerOptions, DEFAULT_PORT};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

pub const ENV_PORT: &str = "BALLOTBOX_PORT";
pub const ENV_DATABASE: &str = "BALLOTBOX_DATABASE";
pub const ENV_ADMIN_HASH: &str = "BALLOTBOX_ADMIN_PASSWORD_HASH";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub port: u16,
    /// Defaults to the platform data directory
    pub database_path: Option<PathBuf>,
    /// `tracing` filter used when `RUST_LOG` is unset
    pub log_filter: String,
    pub max_peers: usize,
    pub rate_limit_sweep_secs: u64,
    pub require_admin_auth: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            database_path: None,
            log_filter: "info".to_string(),
            max_peers: 64,
            rate_limit_sweep_secs: 60,
            require_admin_auth: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub election: ElectionConfig,
}

impl AppConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.server.max_peers == 0 {
            return Err(Error::Config("max_peers must be positive".into()));
        }
        if self.server.rate_limit_sweep_secs == 0 {
            return Err(Error::Config("rate_limit_sweep_secs must be positive".into()));
        }
        self.election.validate()
    }

    /// Apply `BALLOTBOX_*` overrides from the given lookup
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port
                .trim()
                .parse()
                .map_err(|_| Error::Config(format!("{} is not a valid port: '{}'", ENV_PORT, port)))?;
        }
        if let Some(path) = lookup(ENV_DATABASE) {
            self.server.database_path = Some(PathBuf::from(path));
        }
        if let Some(hash) = lookup(ENV_ADMIN_HASH) {
            self.election.admin_password_hash = Some(hash);
        }
        Ok(())
    }

    /// Configured database file, or `ballotbox.db` in the platform data dir
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.server.database_path {
            return Ok(path.clone());
        }

        let dirs = ProjectDirs::from("dev", "onyx", "ballotbox").ok_or_else(|| {
            Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "Could not determine data directory",
            ))
        })?;
        Ok(dirs.data_dir().join("ballotbox.db"))
    }

    pub fn server_options(&self) -> ServerOptions {
        ServerOptions {
            port: self.server.port,
            max_peers: self.server.max_peers,
            require_admin_auth: self.server.require_admin_auth,
            sweep_interval: Duration::from_secs(self.server.rate_limit_sweep_secs),
        }
    }
}
