//! Adjacent-version conversions for the pet and shelter endpoints
//!
//! Request shims lift creation input one version up; response shims lower a
//! stored record one version down. Each is a pure function over the typed
//! records in [`super::models`].

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

use super::models::{
    HealthStatus, Pet, PetCreate, PetCreateV1, PetCreateV2, PetCreateV3, PetV1, PetV2, PetV3, Size,
};
use super::routes::{PET, PETS, SHELTER, SHELTERS};
use crate::shim::ShimRegistry;
use crate::version::ApiVersion;

const V1_0: ApiVersion = ApiVersion::new(1, 0);
const V2_0: ApiVersion = ApiVersion::new(2, 0);
const V3_0: ApiVersion = ApiVersion::new(3, 0);
const V3_1: ApiVersion = ApiVersion::new(3, 1);

/// Register every pet and shelter shim
pub fn register_shims(shims: &mut ShimRegistry) {
    for path in [PETS, PET] {
        shims.register_fallible_request_shim(path, V1_0, V2_0, create_v1_to_v2);
        shims.register_fallible_request_shim(path, V2_0, V3_0, create_v2_to_v3);
        shims.register_request_shim(path, V3_0, V3_1, create_v3_to_v3_1);

        shims.register_response_shim(path, V3_1, V3_0, pet_v3_1_to_v3);
        shims.register_response_shim(path, V3_0, V2_0, pet_v3_to_v2);
        shims.register_response_shim(path, V2_0, V1_0, pet_v2_to_v1);
    }

    for path in [SHELTERS, SHELTER] {
        shims.register_identity(path, V3_0, V3_1);
    }
}

/// Input an older version accepts but the next one cannot represent
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversionError {
    #[error("age of {0} years is too large to estimate a birth date")]
    BirthDateOutOfRange(u32),

    #[error("age of {0} years cannot be expressed in months")]
    AgeOutOfRange(u32),
}

/// Approximate a birth date `years` before now
fn estimate_birth_date(years: u32, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    Duration::try_days(i64::from(years) * 365).and_then(|age| now.checked_sub_signed(age))
}

pub fn create_v1_to_v2(data: PetCreateV1) -> Result<PetCreateV2, ConversionError> {
    let birth_date = estimate_birth_date(data.age, Utc::now())
        .ok_or(ConversionError::BirthDateOutOfRange(data.age))?;
    Ok(PetCreateV2 {
        birth_date: Some(birth_date),
        name: data.name,
        species: data.species.into(),
        age: data.age,
    })
}

pub fn create_v2_to_v3(data: PetCreateV2) -> Result<PetCreateV3, ConversionError> {
    let age_months = data
        .age
        .checked_mul(12)
        .ok_or(ConversionError::AgeOutOfRange(data.age))?;
    Ok(PetCreateV3 {
        name: data.name,
        species: data.species.into(),
        age_months,
        birth_date: data.birth_date,
        size: Size::Medium,
        tags: Vec::new(),
    })
}

pub fn create_v3_to_v3_1(data: PetCreateV3) -> PetCreate {
    PetCreate {
        name: data.name,
        species: data.species,
        age_months: data.age_months,
        birth_date: data.birth_date,
        size: data.size,
        tags: data.tags,
        health_status: HealthStatus::Good,
    }
}

pub fn pet_v3_1_to_v3(pet: Pet) -> PetV3 {
    PetV3 {
        id: pet.id,
        name: pet.name,
        species: pet.species,
        age_months: pet.age_months,
        birth_date: pet.birth_date,
        size: pet.size,
        tags: pet.tags,
    }
}

pub fn pet_v3_to_v2(pet: PetV3) -> PetV2 {
    PetV2 {
        id: pet.id,
        name: pet.name,
        species: pet.species.into(),
        age: pet.age_months / 12,
        birth_date: pet.birth_date,
    }
}

pub fn pet_v2_to_v1(pet: PetV2) -> PetV1 {
    PetV1 {
        id: pet.id,
        name: pet.name,
        species: pet.species.into(),
        age: pet.age,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pets::models::{Species, SpeciesV1, SpeciesV2};
    use crate::registry::VersionRegistry;
    use crate::shim::Direction;
    use serde_json::json;
    use uuid::Uuid;

    fn sample_pet() -> Pet {
        Pet {
            id: Uuid::new_v4(),
            name: "Nibbles".into(),
            species: Species::Hamster,
            age_months: 30,
            birth_date: None,
            size: Size::Small,
            tags: vec!["nocturnal".into()],
            health_status: HealthStatus::Fair,
        }
    }

    #[test]
    fn test_v1_create_lifts_to_latest() {
        let v2 = create_v1_to_v2(PetCreateV1 {
            name: "Fluffy".into(),
            species: SpeciesV1::Cat,
            age: 3,
        })
        .unwrap();
        let lifted = create_v3_to_v3_1(create_v2_to_v3(v2).unwrap());
        assert_eq!(lifted.species, Species::Cat);
        assert_eq!(lifted.age_months, 36);
        assert_eq!(lifted.size, Size::Medium);
        assert!(lifted.tags.is_empty());
        assert_eq!(lifted.health_status, HealthStatus::Good);

        let birth = lifted.birth_date.unwrap();
        let days = (Utc::now() - birth).num_days();
        assert!((3 * 365 - 1..=3 * 365).contains(&days));
    }

    #[test]
    fn test_estimate_birth_date_out_of_range() {
        assert_eq!(estimate_birth_date(u32::MAX, Utc::now()), None);
    }

    #[test]
    fn test_unrepresentable_ages_rejected() {
        let err = create_v1_to_v2(PetCreateV1 {
            name: "Methuselah".into(),
            species: SpeciesV1::Bird,
            age: u32::MAX,
        })
        .unwrap_err();
        assert_eq!(err, ConversionError::BirthDateOutOfRange(u32::MAX));

        let age = u32::MAX / 12 + 1;
        let err = create_v2_to_v3(PetCreateV2 {
            name: "Methuselah".into(),
            species: SpeciesV2::Bird,
            age,
            birth_date: None,
        })
        .unwrap_err();
        assert_eq!(err, ConversionError::AgeOutOfRange(age));

        let largest = create_v2_to_v3(PetCreateV2 {
            name: "Old".into(),
            species: SpeciesV2::Bird,
            age: u32::MAX / 12,
            birth_date: None,
        })
        .unwrap();
        assert_eq!(largest.age_months / 12, u32::MAX / 12);
    }

    #[test]
    fn test_v2_birth_date_kept() {
        let birth = "2020-01-01T00:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let lifted = create_v2_to_v3(PetCreateV2 {
            name: "Scales".into(),
            species: SpeciesV2::Reptile,
            age: 4,
            birth_date: Some(birth),
        })
        .unwrap();
        assert_eq!(lifted.birth_date, Some(birth));
        assert_eq!(lifted.species, Species::Reptile);
    }

    #[test]
    fn test_latest_pet_lowers_to_v1() {
        let pet = sample_pet();
        let v1 = pet_v2_to_v1(pet_v3_to_v2(pet_v3_1_to_v3(pet.clone())));
        assert_eq!(v1.id, pet.id);
        assert_eq!(v1.species, SpeciesV1::Dog);
        assert_eq!(v1.age, 2);
    }

    #[test]
    fn test_registered_chain_is_complete() {
        let mut versions = VersionRegistry::new();
        crate::pets::routes::register_versions(&mut versions);
        let mut shims = ShimRegistry::new();
        register_shims(&mut shims);
        assert!(shims.audit(&versions).is_empty());
    }

    #[test]
    fn test_erased_shim_converts_lists() {
        let mut shims = ShimRegistry::new();
        register_shims(&mut shims);
        let shim = shims.get(Direction::Response, PETS, V3_0, V2_0).unwrap();
        let out = shim
            .apply(json!([{
                "id": Uuid::nil(),
                "name": "Goldie",
                "species": "fish",
                "age_months": 13,
                "birth_date": null,
                "size": "small",
                "tags": []
            }]))
            .unwrap();
        assert_eq!(
            out,
            json!([{
                "id": Uuid::nil(),
                "name": "Goldie",
                "species": "fish",
                "age": 1,
                "birth_date": null
            }])
        );
    }
}
