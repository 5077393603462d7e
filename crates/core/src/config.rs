//! Election configuration
//!
//! Rooms and booth accounts are static: they are read once at startup
//! (TOML) and never edited at runtime.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::audit::AUDIT_VIEW_LIMIT;
use crate::error::{Error, Result};
use crate::models::Room;
use crate::rate_limit::RateLimitPolicy;

/// A booth as declared in configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomConfig {
    pub id: String,
    pub name: String,
}

/// Booth login account bound to one room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoothAccount {
    pub username: String,
    pub room_id: String,
    /// Argon2 PHC string, or legacy plaintext (deprecated)
    pub password: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimits {
    pub login: RateLimitPolicy,
    pub vote: RateLimitPolicy,
    pub admin: RateLimitPolicy,
}

impl Default for RateLimits {
    fn default() -> Self {
        Self {
            login: RateLimitPolicy::new(5, 15 * 60),
            vote: RateLimitPolicy::new(3, 5 * 60),
            admin: RateLimitPolicy::new(3, 15 * 60),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ElectionConfig {
    pub rooms: Vec<RoomConfig>,
    pub booths: Vec<BoothAccount>,
    /// Preferred admin credential
    pub admin_password_hash: Option<String>,
    /// Deprecated plaintext fallback, used only without a hash
    pub legacy_admin_password: Option<String>,
    pub audit_view_limit: usize,
    pub rate_limits: RateLimits,
}

impl Default for ElectionConfig {
    fn default() -> Self {
        let rooms = (1..=6)
            .map(|n| RoomConfig {
                id: format!("room{}", n),
                name: format!("Voting Booth {}", n),
            })
            .collect();
        let booths = (1..=6)
            .map(|n| BoothAccount {
                username: format!("booth{}", n),
                room_id: format!("room{}", n),
                password: format!("booth{}MITC", n),
            })
            .collect();

        Self {
            rooms,
            booths,
            admin_password_hash: None,
            legacy_admin_password: Some("masterkey2024".to_string()),
            audit_view_limit: AUDIT_VIEW_LIMIT,
            rate_limits: RateLimits::default(),
        }
    }
}

impl ElectionConfig {
    /// Parse and validate from TOML text
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
        let mut room_ids = HashSet::new();
        for room in &self.rooms {
            if !room_ids.insert(room.id.as_str()) {
                return Err(Error::Config(format!("duplicate room id '{}'", room.id)));
            }
        }

        let mut usernames = HashSet::new();
        for booth in &self.booths {
            if !usernames.insert(booth.username.to_lowercase()) {
                return Err(Error::Config(format!(
                    "duplicate booth username '{}'",
                    booth.username
                )));
            }
            if !room_ids.contains(booth.room_id.as_str()) {
                return Err(Error::Config(format!(
                    "booth '{}' references unknown room '{}'",
                    booth.username, booth.room_id
                )));
            }
        }

        if self.audit_view_limit == 0 {
            return Err(Error::Config("audit_view_limit must be positive".into()));
        }

        let limits = &self.rate_limits;
        for (name, policy) in [("login", limits.login), ("vote", limits.vote), ("admin", limits.admin)] {
            if policy.max_attempts == 0 || policy.window_secs == 0 {
                return Err(Error::Config(format!(
                    "rate limit '{}' needs a positive attempt count and window",
                    name
                )));
            }
        }

        Ok(())
    }

    /// Fresh room records, all offline
    pub fn build_rooms(&self) -> Vec<Room> {
        self.rooms
            .iter()
            .map(|r| Room::new(r.id.clone(), r.name.clone()))
            .collect()
    }

    /// Case-insensitive account lookup
    pub fn find_booth(&self, username: &str) -> Option<&BoothAccount> {
        self.booths
            .iter()
            .find(|b| b.username.eq_ignore_ascii_case(username))
    }
}
