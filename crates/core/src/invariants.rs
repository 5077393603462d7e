//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use std::collections::HashSet;

use crate::models::{AuditLogEntry, Room, RoomStatus};

/// A room carries a vote start time exactly while voting is allowed
pub fn assert_room_invariants(room: &Room) {
    debug_assert!(
        room.vote_start_time().is_some() == (room.status() == RoomStatus::VotingAllowed),
        "Room {} has status {} but vote start time {:?}",
        room.id,
        room.status(),
        room.vote_start_time()
    );

    debug_assert!(
        !room.name.trim().is_empty(),
        "Room {} has empty name",
        room.id
    );
}

/// No session may be bound to two rooms
pub fn assert_room_list_invariants(rooms: &[Room]) {
    let mut seen = HashSet::new();
    for room in rooms {
        assert_room_invariants(room);
        if let Some(session) = room.session() {
            debug_assert!(
                seen.insert(session),
                "Session {} is bound to more than one room",
                session
            );
        }
    }
}

/// The audit view stays within its limit and newest first
pub fn assert_audit_view_invariants(entries: &[AuditLogEntry], limit: usize) {
    debug_assert!(
        entries.len() <= limit,
        "Audit view holds {} entries, limit is {}",
        entries.len(),
        limit
    );

    debug_assert!(
        entries.windows(2).all(|w| w[0].id > w[1].id),
        "Audit view is not ordered most recent first"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SessionId;
    use chrono::Utc;

    fn entry(id: i64) -> AuditLogEntry {
        AuditLogEntry {
            id,
            action: "TEST".into(),
            details: String::new(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_valid_room() {
        let mut room = Room::new("room1", "Voting Booth 1");
        assert_room_invariants(&room);

        room.set_status(RoomStatus::VotingAllowed, Utc::now());
        assert_room_invariants(&room);
    }

    #[test]
    fn test_valid_room_list() {
        let mut a = Room::new("room1", "A");
        let mut b = Room::new("room2", "B");
        a.bind_session(SessionId::new());
        b.bind_session(SessionId::new());
        assert_room_list_invariants(&[a, b]);
    }

    #[test]
    #[should_panic(expected = "more than one room")]
    fn test_shared_session_detected() {
        let session = SessionId::new();
        let mut a = Room::new("room1", "A");
        let mut b = Room::new("room2", "B");
        a.bind_session(session);
        b.bind_session(session);
        assert_room_list_invariants(&[a, b]);
    }

    #[test]
    fn test_valid_audit_view() {
        assert_audit_view_invariants(&[entry(3), entry(2), entry(1)], 3);
    }

    #[test]
    #[should_panic(expected = "most recent first")]
    fn test_unordered_audit_view_detected() {
        assert_audit_view_invariants(&[entry(1), entry(2)], 10);
    }
}
