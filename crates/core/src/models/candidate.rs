//! Candidate model

use serde::{Deserialize, Serialize};

/// A named person on a ticket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub name: String,
}

/// A ticket on the ballot: chair (`ketua`) and deputy (`wakil`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    pub id: i64,
    /// Zero-padded ballot number, unique ("01", "02", ...)
    pub candidate_number: String,
    pub image_url: String,
    pub ketua: Person,
    pub wakil: Person,
    pub visi: Vec<String>,
    pub misi: Vec<String>,
    pub votes: u64,
}

impl Candidate {
    /// Display label used in audit entries
    pub fn label(&self) -> String {
        format!(
            "{} ({} & {})",
            self.candidate_number, self.ketua.name, self.wakil.name
        )
    }
}

/// A candidate not yet stored
#[derive(Debug, Clone)]
pub struct NewCandidate {
    pub candidate_number: String,
    pub image_url: String,
    pub ketua: Person,
    pub wakil: Person,
    pub visi: Vec<String>,
    pub misi: Vec<String>,
}

impl NewCandidate {
    pub fn new(number: u32, ketua: &str, wakil: &str) -> Self {
        Self {
            candidate_number: format_candidate_number(number),
            image_url: String::new(),
            ketua: Person { name: ketua.to_string() },
            wakil: Person { name: wakil.to_string() },
            visi: Vec::new(),
            misi: Vec::new(),
        }
    }

    pub fn with_image(mut self, image_url: &str) -> Self {
        self.image_url = image_url.to_string();
        self
    }

    pub fn with_visi(mut self, visi: &[&str]) -> Self {
        self.visi = visi.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_misi(mut self, misi: &[&str]) -> Self {
        self.misi = misi.iter().map(|s| s.to_string()).collect();
        self
    }
}

/// Zero-pad a ballot number to two digits
pub fn format_candidate_number(number: u32) -> String {
    format!("{:02}", number)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_number_padding() {
        assert_eq!(format_candidate_number(1), "01");
        assert_eq!(format_candidate_number(12), "12");
        assert_eq!(format_candidate_number(123), "123");
    }

    #[test]
    fn test_snapshot_field_names() {
        let candidate = Candidate {
            id: 7,
            candidate_number: "01".into(),
            image_url: "/images/1.jpg".into(),
            ketua: Person { name: "A".into() },
            wakil: Person { name: "B".into() },
            visi: vec!["v".into()],
            misi: vec!["m".into()],
            votes: 3,
        };

        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["candidateNumber"], "01");
        assert_eq!(json["imageUrl"], "/images/1.jpg");
        assert_eq!(json["ketua"]["name"], "A");
        assert_eq!(json["votes"], 3);
    }
}
