//! In-memory view of the audit trail
//!
//! Holds the newest entries only, most recent first. The database keeps
//! every entry; this view is what goes out in state snapshots.

use std::collections::VecDeque;

use crate::models::AuditLogEntry;

/// Default number of entries kept in memory
pub const AUDIT_VIEW_LIMIT: usize = 100;

#[derive(Debug, Clone)]
pub struct AuditRecorder {
    entries: VecDeque<AuditLogEntry>,
    limit: usize,
}

impl AuditRecorder {
    pub fn new(limit: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Seed from stored entries, which must already be newest first
    pub fn load(&mut self, newest_first: Vec<AuditLogEntry>) {
        self.entries = newest_first.into_iter().take(self.limit).collect();
    }

    /// Record a freshly stored entry, evicting the oldest past the limit
    pub fn record(&mut self, entry: AuditLogEntry) {
        self.entries.push_front(entry);
        self.entries.truncate(self.limit);
    }

    pub fn entries(&self) -> Vec<AuditLogEntry> {
        self.entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<&AuditLogEntry> {
        self.entries.front()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}

impl Default for AuditRecorder {
    fn default() -> Self {
        Self::new(AUDIT_VIEW_LIMIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn entry(id: i64) -> AuditLogEntry {
        AuditLogEntry {
            id,
            action: "TEST".into(),
            details: format!("entry {}", id),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_newest_first() {
        let mut recorder = AuditRecorder::new(10);
        recorder.record(entry(1));
        recorder.record(entry(2));

        let ids: Vec<i64> = recorder.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(recorder.latest().map(|e| e.id), Some(2));
    }

    #[test]
    fn test_evicts_oldest_past_limit() {
        let mut recorder = AuditRecorder::default();
        for id in 1..=150 {
            recorder.record(entry(id));
        }

        assert_eq!(recorder.len(), AUDIT_VIEW_LIMIT);
        let entries = recorder.entries();
        assert_eq!(entries.first().map(|e| e.id), Some(150));
        assert_eq!(entries.last().map(|e| e.id), Some(51));
    }

    #[test]
    fn test_load_truncates() {
        let mut recorder = AuditRecorder::new(3);
        recorder.load((1..=5).rev().map(entry).collect());

        let ids: Vec<i64> = recorder.entries().iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![5, 4, 3]);
    }
}
