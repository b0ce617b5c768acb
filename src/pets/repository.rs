//! Pet storage port and its in-memory adapter

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use super::models::{HealthStatus, Pet, PetCreate, Size, Species};
use crate::error::ApiError;

/// Storage for latest-version pet records
#[async_trait]
pub trait PetRepository: Send + Sync {
    async fn list(&self) -> Result<Vec<Pet>, ApiError>;

    async fn get(&self, id: Uuid) -> Result<Option<Pet>, ApiError>;

    async fn create(&self, data: PetCreate) -> Result<Pet, ApiError>;

    /// Replace a pet's fields; `None` when it does not exist
    async fn update(&self, id: Uuid, data: PetCreate) -> Result<Option<Pet>, ApiError>;

    /// `false` when there was nothing to delete
    async fn delete(&self, id: Uuid) -> Result<bool, ApiError>;
}

/// Process-local store, kept in insertion order
#[derive(Debug, Default)]
pub struct InMemoryPetRepository {
    pets: RwLock<Vec<Pet>>,
}

impl InMemoryPetRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store holding the three sample pets
    pub fn with_sample_data() -> Self {
        let repository = Self::new();
        repository.seed_sample_data();
        repository
    }

    /// Add Buddy, Whiskers and Rex
    pub fn seed_sample_data(&self) {
        let samples = [
            sample(
                "Buddy",
                Species::Dog,
                24,
                "2023-05-15T00:00:00Z",
                Size::Medium,
                &["friendly", "trained"],
                HealthStatus::Excellent,
            ),
            sample(
                "Whiskers",
                Species::Cat,
                36,
                "2022-05-10T00:00:00Z",
                Size::Small,
                &["indoor", "playful"],
                HealthStatus::Good,
            ),
            sample(
                "Rex",
                Species::Dog,
                48,
                "2021-05-10T00:00:00Z",
                Size::Large,
                &["guard dog", "trained"],
                HealthStatus::Good,
            ),
        ];
        let mut pets = self.pets.write();
        for data in samples {
            pets.push(Pet::from_create(Uuid::new_v4(), data));
        }
        tracing::info!(count = pets.len(), "seeded sample pets");
    }

    pub fn len(&self) -> usize {
        self.pets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pets.read().is_empty()
    }
}

fn sample(
    name: &str,
    species: Species,
    age_months: u32,
    born: &str,
    size: Size,
    tags: &[&str],
    health_status: HealthStatus,
) -> PetCreate {
    PetCreate {
        name: name.to_string(),
        species,
        age_months,
        birth_date: born.parse::<DateTime<Utc>>().ok(),
        size,
        tags: tags.iter().map(|t| t.to_string()).collect(),
        health_status,
    }
}

#[async_trait]
impl PetRepository for InMemoryPetRepository {
    async fn list(&self) -> Result<Vec<Pet>, ApiError> {
        Ok(self.pets.read().clone())
    }

    async fn get(&self, id: Uuid) -> Result<Option<Pet>, ApiError> {
        Ok(self.pets.read().iter().find(|pet| pet.id == id).cloned())
    }

    async fn create(&self, data: PetCreate) -> Result<Pet, ApiError> {
        let pet = Pet::from_create(Uuid::new_v4(), data);
        self.pets.write().push(pet.clone());
        tracing::debug!(id = %pet.id, name = %pet.name, "created pet");
        Ok(pet)
    }

    async fn update(&self, id: Uuid, data: PetCreate) -> Result<Option<Pet>, ApiError> {
        let mut pets = self.pets.write();
        Ok(pets.iter_mut().find(|pet| pet.id == id).map(|pet| {
            *pet = Pet::from_create(id, data);
            pet.clone()
        }))
    }

    async fn delete(&self, id: Uuid) -> Result<bool, ApiError> {
        let mut pets = self.pets.write();
        let before = pets.len();
        pets.retain(|pet| pet.id != id);
        Ok(pets.len() < before)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create(name: &str) -> PetCreate {
        PetCreate {
            name: name.into(),
            species: Species::Rabbit,
            age_months: 6,
            birth_date: None,
            size: Size::Small,
            tags: vec![],
            health_status: HealthStatus::Good,
        }
    }

    #[tokio::test]
    async fn test_sample_data() {
        let repository = InMemoryPetRepository::with_sample_data();
        let names: Vec<_> = repository.list().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, ["Buddy", "Whiskers", "Rex"]);
    }

    #[tokio::test]
    async fn test_crud() {
        let repository = InMemoryPetRepository::new();
        let pet = repository.create(create("Thumper")).await.unwrap();
        assert_eq!(repository.get(pet.id).await.unwrap(), Some(pet.clone()));

        let updated = repository.update(pet.id, create("Hopper")).await.unwrap().unwrap();
        assert_eq!(updated.id, pet.id);
        assert_eq!(updated.name, "Hopper");

        assert!(repository.delete(pet.id).await.unwrap());
        assert!(!repository.delete(pet.id).await.unwrap());
        assert!(repository.get(pet.id).await.unwrap().is_none());
        assert!(repository.update(pet.id, create("Ghost")).await.unwrap().is_none());
        assert!(repository.is_empty());
    }
}
