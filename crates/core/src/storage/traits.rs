//! Storage repository traits
//!
//! These traits define the storage interface the election service
//! consumes, allowing for different implementations (SQLite, mock).

use crate::error::Result;
use crate::models::{AuditLogEntry, Candidate, NewCandidate};

/// Candidate repository operations
pub trait CandidateRepository {
    /// Store a new candidate, returning it with its assigned id
    fn create_candidate(&self, candidate: &NewCandidate) -> Result<Candidate>;

    /// Find candidate by id
    fn find_candidate(&self, id: i64) -> Result<Option<Candidate>>;

    /// List all candidates ordered by ballot number
    fn list_candidates(&self) -> Result<Vec<Candidate>>;

    /// Add one vote; returns false if the candidate does not exist
    fn increment_votes(&self, id: i64) -> Result<bool>;

    /// Add one vote and append its audit entry as a single unit of work.
    /// Nothing is stored if either write fails.
    fn record_vote(&self, id: i64, action: &str, details: &str) -> Result<(bool, AuditLogEntry)>;
}

/// Audit repository operations
pub trait AuditRepository {
    /// Append an entry, returning it as stored
    fn append_audit(&self, action: &str, details: &str) -> Result<AuditLogEntry>;

    /// Most recent entries first
    fn recent_audit(&self, limit: usize) -> Result<Vec<AuditLogEntry>>;

    /// Total stored entries
    fn count_audit(&self) -> Result<u64>;
}

/// Combined storage interface
///
/// Implementations may be backed by SQLite or mocks.
pub trait Storage: CandidateRepository + AuditRepository {}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where T: CandidateRepository + AuditRepository {}
