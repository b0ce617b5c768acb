//! Pet records, one distinct type per API version
//!
//! | Version | Change |
//! |---------|--------|
//! | 1.0 | `name`, `species` (dog/cat/bird), `age` in years |
//! | 2.0 | adds `birth_date`; species gains fish and reptile |
//! | 3.0 | `age` becomes `age_months`; adds `size` and `tags`; species gains rabbit and hamster |
//! | 3.1 | adds `health_status` |
//!
//! [`Pet`] and [`PetCreate`] are the 3.1 shapes the handlers and the
//! repository work with.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------- 1.0 ----------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeciesV1 {
    Dog,
    Cat,
    Bird,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetV1 {
    pub id: Uuid,
    pub name: String,
    pub species: SpeciesV1,
    /// Age in years
    pub age: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetCreateV1 {
    pub name: String,
    pub species: SpeciesV1,
    pub age: u32,
}

// ---------------- 2.0 ----------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpeciesV2 {
    Dog,
    Cat,
    Bird,
    Fish,
    Reptile,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetV2 {
    pub id: Uuid,
    pub name: String,
    pub species: SpeciesV2,
    /// Age in years
    pub age: u32,
    #[serde(default)]
    pub birth_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetCreateV2 {
    pub name: String,
    pub species: SpeciesV2,
    pub age: u32,
    #[serde(default)]
    pub birth_date: Option<DateTime<Utc>>,
}

// ---------------- 3.0 ----------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Species {
    Dog,
    Cat,
    Bird,
    Fish,
    Reptile,
    Rabbit,
    Hamster,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Size {
    Small,
    #[default]
    Medium,
    Large,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetV3 {
    pub id: Uuid,
    pub name: String,
    pub species: Species,
    pub age_months: u32,
    #[serde(default)]
    pub birth_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub size: Size,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetCreateV3 {
    pub name: String,
    pub species: Species,
    pub age_months: u32,
    #[serde(default)]
    pub birth_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub size: Size,
    #[serde(default)]
    pub tags: Vec<String>,
}

// ---------------- 3.1 ----------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Excellent,
    #[default]
    Good,
    Fair,
    Poor,
}

/// A pet as of 3.1, the latest version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pet {
    pub id: Uuid,
    pub name: String,
    pub species: Species,
    pub age_months: u32,
    #[serde(default)]
    pub birth_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub size: Size,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub health_status: HealthStatus,
}

/// Input for creating or replacing a pet as of 3.1
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PetCreate {
    pub name: String,
    pub species: Species,
    pub age_months: u32,
    #[serde(default)]
    pub birth_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub size: Size,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub health_status: HealthStatus,
}

impl Pet {
    /// Build a stored record from creation input
    pub fn from_create(id: Uuid, data: PetCreate) -> Self {
        Self {
            id,
            name: data.name,
            species: data.species,
            age_months: data.age_months,
            birth_date: data.birth_date,
            size: data.size,
            tags: data.tags,
            health_status: data.health_status,
        }
    }
}

/// A shelter; only exposed from 3.0 on and unchanged since
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shelter {
    pub id: String,
    pub name: String,
    pub location: String,
}

// Species widen losslessly and narrow to dog when the older enum lacks a variant.

impl From<SpeciesV1> for SpeciesV2 {
    fn from(species: SpeciesV1) -> Self {
        match species {
            SpeciesV1::Dog => SpeciesV2::Dog,
            SpeciesV1::Cat => SpeciesV2::Cat,
            SpeciesV1::Bird => SpeciesV2::Bird,
        }
    }
}

impl From<SpeciesV2> for Species {
    fn from(species: SpeciesV2) -> Self {
        match species {
            SpeciesV2::Dog => Species::Dog,
            SpeciesV2::Cat => Species::Cat,
            SpeciesV2::Bird => Species::Bird,
            SpeciesV2::Fish => Species::Fish,
            SpeciesV2::Reptile => Species::Reptile,
        }
    }
}

impl From<SpeciesV2> for SpeciesV1 {
    fn from(species: SpeciesV2) -> Self {
        match species {
            SpeciesV2::Cat => SpeciesV1::Cat,
            SpeciesV2::Bird => SpeciesV1::Bird,
            SpeciesV2::Dog | SpeciesV2::Fish | SpeciesV2::Reptile => SpeciesV1::Dog,
        }
    }
}

impl From<Species> for SpeciesV2 {
    fn from(species: Species) -> Self {
        match species {
            Species::Cat => SpeciesV2::Cat,
            Species::Bird => SpeciesV2::Bird,
            Species::Fish => SpeciesV2::Fish,
            Species::Reptile => SpeciesV2::Reptile,
            Species::Dog | Species::Rabbit | Species::Hamster => SpeciesV2::Dog,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_later_fields_default() {
        let create: PetCreate = serde_json::from_value(json!({
            "name": "Fluffy",
            "species": "rabbit",
            "age_months": 5
        }))
        .unwrap();
        assert_eq!(create.size, Size::Medium);
        assert!(create.tags.is_empty());
        assert_eq!(create.health_status, HealthStatus::Good);
        assert_eq!(create.birth_date, None);
    }

    #[test]
    fn test_older_species_rejects_newer_variants() {
        assert!(serde_json::from_value::<PetCreateV1>(json!({
            "name": "Nemo",
            "species": "fish",
            "age": 1
        }))
        .is_err());
    }

    #[test]
    fn test_species_narrowing() {
        assert_eq!(SpeciesV2::from(Species::Hamster), SpeciesV2::Dog);
        assert_eq!(SpeciesV2::from(Species::Fish), SpeciesV2::Fish);
        assert_eq!(SpeciesV1::from(SpeciesV2::Reptile), SpeciesV1::Dog);
        assert_eq!(SpeciesV1::from(SpeciesV2::Cat), SpeciesV1::Cat);
    }
}
