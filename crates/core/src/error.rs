//! Error types for Ballotbox Core

use thiserror::Error;

use crate::models::RoomStatus;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("{0}")]
    Declined(#[from] Decline),

    #[error("Password hashing failed: {0}")]
    PasswordHash(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to parse configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// The user-facing message if this is a domain rejection
    pub fn decline_message(&self) -> Option<String> {
        match self {
            Error::Declined(decline) => Some(decline.to_string()),
            _ => None,
        }
    }
}

/// Which guarded action tripped a rate limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitedAction {
    Login,
    Vote,
    Admin,
}

/// Domain rejections. These never propagate as faults; every action
/// boundary turns them into a `{success: false, message}` reply.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Decline {
    #[error("{}", rate_limit_message(.0))]
    RateLimited(LimitedAction),

    #[error("{0}")]
    InvalidInput(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid admin password.")]
    InvalidAdminPassword,

    #[error("Room with ID '{0}' not found")]
    RoomNotFound(String),

    #[error("Candidate with ID '{0}' not found")]
    CandidateNotFound(String),

    #[error("Unauthorized vote attempt.")]
    Unauthorized,

    #[error("The election is closed")]
    ElectionClosed,

    #[error("The election is temporarily paused")]
    ElectionPaused,

    #[error("This voting booth has been disabled by an administrator")]
    RoomDisabled,

    #[error("Room is not in voting mode. Current status: {0}")]
    NotVoting(RoomStatus),
}

fn rate_limit_message(action: &LimitedAction) -> &'static str {
    match action {
        LimitedAction::Login => "Too many login attempts. Please try again later.",
        LimitedAction::Vote => "Too many vote attempts. Please wait before trying again.",
        LimitedAction::Admin => "Too many admin attempts. Please try again later.",
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decline_messages() {
        assert_eq!(
            Decline::RoomNotFound("room9".into()).to_string(),
            "Room with ID 'room9' not found"
        );
        assert_eq!(
            Decline::NotVoting(RoomStatus::Waiting).to_string(),
            "Room is not in voting mode. Current status: WAITING"
        );
        assert_eq!(
            Decline::RateLimited(LimitedAction::Vote).to_string(),
            "Too many vote attempts. Please wait before trying again."
        );
    }

    #[test]
    fn test_only_declines_carry_user_message() {
        let declined: Error = Decline::ElectionPaused.into();
        assert_eq!(
            declined.decline_message().as_deref(),
            Some("The election is temporarily paused")
        );

        let internal = Error::Config("bad".into());
        assert!(internal.decline_message().is_none());
    }
}
