//! Room model - one physical voting booth

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::SessionId;

/// Booth status as seen by the admin panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomStatus {
    /// No terminal connected
    Offline,
    /// Terminal logged in, waiting for the admin to authorize a voter
    Waiting,
    /// One vote may be cast
    VotingAllowed,
    Paused,
    /// Logins refused until re-enabled
    Disabled,
}

impl RoomStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RoomStatus::Offline => "OFFLINE",
            RoomStatus::Waiting => "WAITING",
            RoomStatus::VotingAllowed => "VOTING_ALLOWED",
            RoomStatus::Paused => "PAUSED",
            RoomStatus::Disabled => "DISABLED",
        }
    }
}

impl fmt::Display for RoomStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Public identity returned to a booth after login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomIdentity {
    pub id: String,
    pub name: String,
}

/// A voting booth.
///
/// `vote_start_time` is set exactly while the status is `VotingAllowed`;
/// all status writes go through [`Room::set_status`] to keep it that way.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub name: String,
    status: RoomStatus,
    /// Bound session; never published in snapshots
    #[serde(skip)]
    session: Option<SessionId>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "chrono::serde::ts_milliseconds_option"
    )]
    vote_start_time: Option<DateTime<Utc>>,
}

impl Room {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: RoomStatus::Offline,
            session: None,
            vote_start_time: None,
        }
    }

    pub fn status(&self) -> RoomStatus {
        self.status
    }

    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    pub fn vote_start_time(&self) -> Option<DateTime<Utc>> {
        self.vote_start_time
    }

    pub fn identity(&self) -> RoomIdentity {
        RoomIdentity {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    /// Overwrite the status, stamping or clearing the vote start time.
    /// Returns the previous status.
    pub fn set_status(&mut self, status: RoomStatus, now: DateTime<Utc>) -> RoomStatus {
        let previous = self.status;
        self.status = status;
        self.vote_start_time = match status {
            RoomStatus::VotingAllowed => Some(now),
            _ => None,
        };
        previous
    }

    /// Bind a session, returning the one it replaced
    pub fn bind_session(&mut self, session: SessionId) -> Option<SessionId> {
        self.session.replace(session)
    }

    pub fn release_session(&mut self) -> Option<SessionId> {
        self.session.take()
    }
}
