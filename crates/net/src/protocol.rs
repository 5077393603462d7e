//! Network protocol message types
//!
//! All messages are JSON-serialized and length-prefixed on the wire. The
//! `type` field carries the event name (`login`, `stateUpdate`, ...).

use ballotbox_core::{AdminReply, LoginReply, StateSnapshot, VoteReply};
use serde::{Deserialize, Serialize};

/// Network protocol messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum Message {
    // Booth requests
    Login {
        username: Option<String>,
        password: Option<String>,
    },
    CastVote {
        candidate_id: String,
        room_id: String,
    },

    // Admin requests
    VerifyAdminPassword {
        password: Option<String>,
    },
    PauseElection,
    ResumeElection,
    CloseElection,
    DisableRoom {
        room_id: String,
    },
    EnableRoom {
        room_id: String,
    },
    AllowVote {
        room_id: String,
    },

    /// One-shot state query, answered only to the asker
    RequestInitialState,

    /// Ping to keep connection alive
    Ping,

    // Replies
    LoginResult(LoginReply),
    VoteResult(VoteReply),
    AdminAuthResult(AdminReply),
    InitialState(StateSnapshot),

    // Pushes
    /// Full state, sent to every connection after each change
    StateUpdate(StateSnapshot),
    /// Sent to the one booth whose vote was just authorized
    VoteAllowed,

    /// A request could not be carried out
    Error {
        message: String,
    },

    /// Pong response to ping
    Pong,

    /// Server is shutting down
    ServerShutdown,
}

impl Message {
    /// Serialize message to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize message from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Whether this request needs an authenticated admin connection
    pub fn is_admin_command(&self) -> bool {
        matches!(
            self,
            Message::PauseElection
                | Message::ResumeElection
                | Message::CloseElection
                | Message::DisableRoom { .. }
                | Message::EnableRoom { .. }
                | Message::AllowVote { .. }
        )
    }
}
