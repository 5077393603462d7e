//! SQLite storage layer for Ballotbox

mod audit_log;
mod candidates;
mod migrations;
mod parse;
mod traits;

use rusqlite::Connection;
use std::path::Path;
use tracing::instrument;

use crate::error::Result;
use crate::models::{AuditLogEntry, Candidate, NewCandidate};

pub use audit_log::AuditLogStore;
pub use candidates::CandidateStore;
pub use traits::{AuditRepository, CandidateRepository, Storage};

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Get candidate store
    pub fn candidates(&self) -> CandidateStore<'_> {
        CandidateStore::new(&self.conn)
    }

    /// Get audit log store
    pub fn audit_log(&self) -> AuditLogStore<'_> {
        AuditLogStore::new(&self.conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("schema_version", &self.schema_version())
            .finish()
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl CandidateRepository for Database {
    fn create_candidate(&self, candidate: &NewCandidate) -> Result<Candidate> {
        self.candidates().create(candidate)
    }

    fn find_candidate(&self, id: i64) -> Result<Option<Candidate>> {
        self.candidates().find_by_id(id)
    }

    fn list_candidates(&self) -> Result<Vec<Candidate>> {
        self.candidates().list()
    }

    fn increment_votes(&self, id: i64) -> Result<bool> {
        self.candidates().increment_votes(id)
    }

    #[instrument(skip(self, details))]
    fn record_vote(&self, id: i64, action: &str, details: &str) -> Result<(bool, AuditLogEntry)> {
        let tx = self.conn.unchecked_transaction()?;
        let counted = CandidateStore::new(&tx).increment_votes(id)?;
        let entry = AuditLogStore::new(&tx).append(action, details)?;
        tx.commit()?;
        Ok((counted, entry))
    }
}

impl AuditRepository for Database {
    fn append_audit(&self, action: &str, details: &str) -> Result<AuditLogEntry> {
        self.audit_log().append(action, details)
    }

    fn recent_audit(&self, limit: usize) -> Result<Vec<AuditLogEntry>> {
        self.audit_log().recent(limit)
    }

    fn count_audit(&self) -> Result<u64> {
        self.audit_log().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_on_disk_is_persistent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ballotbox.db");

        {
            let db = Database::open(&path).unwrap();
            let id = db.list_candidates().unwrap()[0].id;
            db.increment_votes(id).unwrap();
        }

        let db = Database::open(&path).unwrap();
        assert_eq!(db.schema_version(), 3);
        assert_eq!(db.list_candidates().unwrap()[0].votes, 1);
        // Reopening must not re-seed
        assert_eq!(db.list_candidates().unwrap().len(), 3);
    }

    #[test]
    fn test_record_vote_writes_both_rows() {
        let db = Database::open_in_memory().unwrap();
        let id = db.list_candidates().unwrap()[0].id;
        let before = db.count_audit().unwrap();

        let (counted, entry) = db.record_vote(id, "VOTE_CAST", "Room \"Ruang 1\" voted").unwrap();
        assert!(counted);
        assert_eq!(entry.action, "VOTE_CAST");
        assert_eq!(db.find_candidate(id).unwrap().unwrap().votes, 1);
        assert_eq!(db.count_audit().unwrap(), before + 1);
        assert_eq!(db.recent_audit(1).unwrap()[0].id, entry.id);
    }

    #[test]
    fn test_record_vote_for_missing_candidate() {
        let db = Database::open_in_memory().unwrap();
        let (counted, _) = db.record_vote(9_999, "VOTE_CAST", "ghost").unwrap();
        assert!(!counted);
        assert!(db.list_candidates().unwrap().iter().all(|c| c.votes == 0));
    }
}
