use crate::model::Id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Taxonomic classification a pet belongs to.
///
/// `scientific_name` is the natural key and is matched case-insensitively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub id: Id,
    pub scientific_name: String,
    pub created_at: DateTime<Utc>,
}

/// Group reference as submitted in a pet payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewGroup {
    pub scientific_name: String,
}

impl NewGroup {
    pub fn new(scientific_name: impl Into<String>) -> Self {
        Self {
            scientific_name: scientific_name.into(),
        }
    }

    pub fn into_group(self, id: Id) -> Group {
        Group {
            id,
            scientific_name: self.scientific_name,
            created_at: Utc::now(),
        }
    }
}
