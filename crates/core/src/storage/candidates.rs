//! Candidate storage operations

use rusqlite::{params, Connection, Row};
use tracing::instrument;

use super::parse::{parse_string_list, parse_votes, OptionalExt};
use crate::error::Result;
use crate::models::{Candidate, NewCandidate, Person};

const SELECT_COLUMNS: &str =
    "SELECT id, candidate_number, image_url, ketua_name, wakil_name, visi, misi, votes FROM candidates";

pub struct CandidateStore<'a> {
    conn: &'a Connection,
}

impl<'a> CandidateStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new candidate
    #[instrument(skip(self, candidate), fields(number = %candidate.candidate_number))]
    pub fn create(&self, candidate: &NewCandidate) -> Result<Candidate> {
        self.conn.execute(
            "INSERT INTO candidates (candidate_number, image_url, ketua_name, wakil_name, visi, misi, votes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 0)",
            params![
                candidate.candidate_number,
                candidate.image_url,
                candidate.ketua.name,
                candidate.wakil.name,
                serde_json::to_string(&candidate.visi)?,
                serde_json::to_string(&candidate.misi)?,
            ],
        )?;

        Ok(Candidate {
            id: self.conn.last_insert_rowid(),
            candidate_number: candidate.candidate_number.clone(),
            image_url: candidate.image_url.clone(),
            ketua: candidate.ketua.clone(),
            wakil: candidate.wakil.clone(),
            visi: candidate.visi.clone(),
            misi: candidate.misi.clone(),
            votes: 0,
        })
    }

    /// Find candidate by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: i64) -> Result<Option<Candidate>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} WHERE id = ?1", SELECT_COLUMNS))?;

        let candidate = stmt.query_row(params![id], read_candidate).optional()?;
        Ok(candidate)
    }

    /// List all candidates by ballot number
    pub fn list(&self) -> Result<Vec<Candidate>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY candidate_number ASC", SELECT_COLUMNS))?;

        let candidates = stmt
            .query_map([], read_candidate)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(candidates)
    }

    /// Add one vote to a candidate
    #[instrument(skip(self))]
    pub fn increment_votes(&self, id: i64) -> Result<bool> {
        let updated = self.conn.execute(
            "UPDATE candidates SET votes = votes + 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(updated == 1)
    }
}

fn read_candidate(row: &Row<'_>) -> rusqlite::Result<Candidate> {
    Ok(Candidate {
        id: row.get(0)?,
        candidate_number: row.get(1)?,
        image_url: row.get(2)?,
        ketua: Person { name: row.get(3)? },
        wakil: Person { name: row.get(4)? },
        visi: parse_string_list(&row.get::<_, String>(5)?)?,
        misi: parse_string_list(&row.get::<_, String>(6)?)?,
        votes: parse_votes(row.get(7)?)?,
    })
}

#[cfg(test)]
mod tests {
    use crate::models::NewCandidate;
    use crate::storage::Database;

    #[test]
    fn test_seeded_candidates_in_ballot_order() {
        let db = Database::open_in_memory().unwrap();
        let candidates = db.candidates().list().unwrap();

        let numbers: Vec<&str> = candidates
            .iter()
            .map(|c| c.candidate_number.as_str())
            .collect();
        assert_eq!(numbers, vec!["01", "02", "03"]);
        assert!(candidates.iter().all(|c| c.votes == 0));
        assert_eq!(candidates[0].misi.len(), 5);
    }

    #[test]
    fn test_create_and_find() {
        let db = Database::open_in_memory().unwrap();
        let created = db
            .candidates()
            .create(
                &NewCandidate::new(4, "Ada", "Grace")
                    .with_image("/images/4.jpg")
                    .with_visi(&["Open books"]),
            )
            .unwrap();

        let found = db.candidates().find_by_id(created.id).unwrap().unwrap();
        assert_eq!(found, created);
        assert_eq!(found.candidate_number, "04");
        assert_eq!(found.visi, vec!["Open books".to_string()]);
    }

    #[test]
    fn test_candidate_number_is_unique() {
        let db = Database::open_in_memory().unwrap();
        let result = db.candidates().create(&NewCandidate::new(1, "Dup", "Dup"));
        assert!(result.is_err());
    }

    #[test]
    fn test_increment_votes() {
        let db = Database::open_in_memory().unwrap();
        let id = db.candidates().list().unwrap()[1].id;

        assert!(db.candidates().increment_votes(id).unwrap());
        assert!(db.candidates().increment_votes(id).unwrap());
        assert!(!db.candidates().increment_votes(9999).unwrap());

        let found = db.candidates().find_by_id(id).unwrap().unwrap();
        assert_eq!(found.votes, 2);
    }
}
