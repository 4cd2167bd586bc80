use crate::model::Id;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Descriptive tag attached to pets; `name` is matched case-insensitively on upsert
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trait {
    pub id: Id,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTrait {
    pub name: String,
}

impl NewTrait {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn into_trait(self, id: Id) -> Trait {
        Trait {
            id,
            name: self.name,
            created_at: Utc::now(),
        }
    }
}
