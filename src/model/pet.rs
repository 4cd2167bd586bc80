use crate::model::{Group, Id, NewGroup, NewTrait, Trait};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sex {
    Male,
    Female,
    #[default]
    #[serde(rename = "Not Informed")]
    NotInformed,
}

impl Sex {
    pub const CHOICES: [Sex; 3] = [Sex::Male, Sex::Female, Sex::NotInformed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Sex::Male => "Male",
            Sex::Female => "Female",
            Sex::NotInformed => "Not Informed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::CHOICES
            .into_iter()
            .find(|choice| choice.as_str() == value)
    }
}

/// Fully expanded pet as returned by every pet endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pet {
    pub id: Id,
    pub name: String,
    pub age: i32,
    pub weight: f64,
    pub sex: Sex,
    pub group: Group,
    pub traits: Vec<Trait>, // attachment order
}

impl Pet {
    pub fn fields(&self) -> PetFields {
        PetFields {
            name: self.name.clone(),
            age: self.age,
            weight: self.weight,
            sex: self.sex,
        }
    }
}

/// Scalar columns of a pet row
#[derive(Debug, Clone, PartialEq)]
pub struct PetFields {
    pub name: String,
    pub age: i32,
    pub weight: f64,
    pub sex: Sex,
}

impl PetFields {
    /// Overwrite every scalar the patch carries, leaving the rest untouched.
    pub fn merge(&mut self, patch: &PetPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(age) = patch.age {
            self.age = age;
        }
        if let Some(weight) = patch.weight {
            self.weight = weight;
        }
        if let Some(sex) = patch.sex {
            self.sex = sex;
        }
    }
}

/// Validated create payload
#[derive(Debug, Clone, PartialEq)]
pub struct NewPet {
    pub fields: PetFields,
    pub group: NewGroup,
    pub traits: Vec<NewTrait>,
}

/// Validated partial update.
///
/// `traits: None` means the key was absent and the trait set is left alone;
/// `Some(vec![])` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PetPatch {
    pub name: Option<String>,
    pub age: Option<i32>,
    pub weight: Option<f64>,
    pub sex: Option<Sex>,
    pub group: Option<NewGroup>,
    pub traits: Option<Vec<NewTrait>>,
}
