//! Room and candidate registries
//!
//! Rooms are a fixed set built from configuration at startup; candidates
//! are loaded from storage. Neither grows or shrinks while running.

use chrono::{DateTime, Utc};

use crate::models::{Candidate, Room, RoomStatus, SessionId};

#[derive(Debug, Clone, Default)]
pub struct RoomRegistry {
    rooms: Vec<Room>,
}

impl RoomRegistry {
    pub fn new(rooms: Vec<Room>) -> Self {
        Self { rooms }
    }

    pub fn get(&self, room_id: &str) -> Option<&Room> {
        self.rooms.iter().find(|r| r.id == room_id)
    }

    pub fn get_mut(&mut self, room_id: &str) -> Option<&mut Room> {
        self.rooms.iter_mut().find(|r| r.id == room_id)
    }

    /// The room currently bound to a session
    pub fn find_by_session(&self, session: SessionId) -> Option<&Room> {
        self.rooms.iter().find(|r| r.session() == Some(session))
    }

    pub fn find_by_session_mut(&mut self, session: SessionId) -> Option<&mut Room> {
        self.rooms.iter_mut().find(|r| r.session() == Some(session))
    }

    /// Set a room's status, returning the previous one
    pub fn set_status(
        &mut self,
        room_id: &str,
        status: RoomStatus,
        now: DateTime<Utc>,
    ) -> Option<RoomStatus> {
        self.get_mut(room_id).map(|room| room.set_status(status, now))
    }

    pub fn all(&self) -> &[Room] {
        &self.rooms
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CandidateRegistry {
    candidates: Vec<Candidate>,
}

impl CandidateRegistry {
    /// Build from candidates, ordering them by ballot number
    pub fn new(mut candidates: Vec<Candidate>) -> Self {
        candidates.sort_by(|a, b| a.candidate_number.cmp(&b.candidate_number));
        Self { candidates }
    }

    /// Look up a candidate by the id as received on the wire
    pub fn find(&self, candidate_id: &str) -> Option<&Candidate> {
        self.candidates
            .iter()
            .find(|c| c.id.to_string() == candidate_id)
    }

    /// Add one vote, returning the new count
    pub fn record_vote(&mut self, id: i64) -> Option<u64> {
        let candidate = self.candidates.iter_mut().find(|c| c.id == id)?;
        candidate.votes += 1;
        Some(candidate.votes)
    }

    pub fn all(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn total_votes(&self) -> u64 {
        self.candidates.iter().map(|c| c.votes).sum()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}
