//! Audit log entry model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One administrative or voting action, as stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditLogEntry {
    #[serde(rename = "_id")]
    pub id: i64,
    pub action: String,
    pub details: String,
    pub timestamp: DateTime<Utc>,
}

/// Action tags written by the election service
pub mod actions {
    pub const SYSTEM_INIT: &str = "SYSTEM_INIT";
    pub const LOGIN_SUCCESS: &str = "LOGIN_SUCCESS";
    pub const LOGIN_FAILED: &str = "LOGIN_FAILED";
    pub const LOGIN_RATE_LIMITED: &str = "LOGIN_RATE_LIMITED";
    pub const VOTE_CAST: &str = "VOTE_CAST";
    pub const VOTE_RATE_LIMITED: &str = "VOTE_RATE_LIMITED";
    pub const ADMIN_LOGIN_SUCCESS: &str = "ADMIN_LOGIN_SUCCESS";
    pub const ADMIN_LOGIN_FAILED: &str = "ADMIN_LOGIN_FAILED";
    pub const ADMIN_RATE_LIMITED: &str = "ADMIN_RATE_LIMITED";
    pub const BOOTH_DISABLED: &str = "BOOTH DISABLED";
    pub const BOOTH_ENABLED: &str = "BOOTH ENABLED";
    pub const ELECTION_PAUSED: &str = "ELECTION PAUSED";
    pub const ELECTION_RESUMED: &str = "ELECTION RESUMED";
    pub const ELECTION_CLOSED: &str = "ELECTION CLOSED";
}
