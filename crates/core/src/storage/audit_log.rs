//! Audit log storage operations

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::instrument;

use super::parse::parse_datetime;
use crate::error::Result;
use crate::models::AuditLogEntry;

pub struct AuditLogStore<'a> {
    conn: &'a Connection,
}

impl<'a> AuditLogStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Append an entry stamped with the current time
    #[instrument(skip(self, details))]
    pub fn append(&self, action: &str, details: &str) -> Result<AuditLogEntry> {
        let timestamp = Utc::now();
        self.conn.execute(
            "INSERT INTO audit_logs (action, details, timestamp) VALUES (?1, ?2, ?3)",
            params![action, details, timestamp.to_rfc3339()],
        )?;

        Ok(AuditLogEntry {
            id: self.conn.last_insert_rowid(),
            action: action.to_string(),
            details: details.to_string(),
            timestamp,
        })
    }

    /// Newest entries first (ids grow with insertion order)
    pub fn recent(&self, limit: usize) -> Result<Vec<AuditLogEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, action, details, timestamp FROM audit_logs
             ORDER BY id DESC LIMIT ?1",
        )?;

        let entries = stmt
            .query_map(params![limit as i64], |row| {
                Ok(AuditLogEntry {
                    id: row.get(0)?,
                    action: row.get(1)?,
                    details: row.get(2)?,
                    timestamp: parse_datetime(&row.get::<_, String>(3)?)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM audit_logs", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use crate::storage::Database;

    #[test]
    fn test_append_and_recent() {
        let db = Database::open_in_memory().unwrap();
        let audit = db.audit_log();

        let first = audit.append("ONE", "first").unwrap();
        let second = audit.append("TWO", "second").unwrap();
        assert!(second.id > first.id);

        let recent = audit.recent(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].action, "TWO");
        assert_eq!(recent[1].action, "ONE");
    }

    #[test]
    fn test_store_keeps_everything() {
        let db = Database::open_in_memory().unwrap();
        for i in 0..120 {
            db.audit_log().append("BULK", &format!("entry {}", i)).unwrap();
        }

        // 120 plus the seeded SYSTEM_INIT entry
        assert_eq!(db.audit_log().count().unwrap(), 121);
        assert_eq!(db.audit_log().recent(100).unwrap().len(), 100);
    }
}
