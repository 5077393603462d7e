//! Election-wide status, state snapshot and action replies

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{AuditLogEntry, Candidate, Room, RoomIdentity};

/// Global election status.
///
/// `Running` and `Paused` switch back and forth; `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ElectionStatus {
    #[default]
    Running,
    Paused,
    Closed,
}

impl ElectionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ElectionStatus::Running => "RUNNING",
            ElectionStatus::Paused => "PAUSED",
            ElectionStatus::Closed => "CLOSED",
        }
    }

    pub fn is_terminal(self) -> bool {
        self == ElectionStatus::Closed
    }
}

impl fmt::Display for ElectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full public state pushed to every observer
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
    pub election_status: ElectionStatus,
    pub rooms: Vec<Room>,
    pub candidates: Vec<Candidate>,
    /// Most recent first
    pub audit_log: Vec<AuditLogEntry>,
}

impl StateSnapshot {
    pub fn room(&self, room_id: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == room_id)
    }

    pub fn candidate(&self, candidate_id: i64) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == candidate_id)
    }

    pub fn total_votes(&self) -> u64 {
        self.candidates.iter().map(|c| c.votes).sum()
    }
}

/// Reply to a booth login
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<RoomIdentity>,
}

impl LoginReply {
    pub fn accepted(room: RoomIdentity) -> Self {
        Self {
            success: true,
            message: None,
            room: Some(room),
        }
    }

    pub fn declined(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            room: None,
        }
    }
}

/// Reply to a vote
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReply {
    pub success: bool,
    pub message: String,
}

impl VoteReply {
    pub fn accepted() -> Self {
        Self {
            success: true,
            message: "Vote cast successfully!".to_string(),
        }
    }

    pub fn declined(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Reply to an admin password check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl AdminReply {
    pub fn accepted() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    pub fn declined(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}
