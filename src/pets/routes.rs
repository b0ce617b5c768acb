//! Pet and shelter handlers
//!
//! Every handler here works only with the latest (3.1) records; older callers
//! reach them through the shim chains in [`super::shims`].

use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use once_cell::sync::Lazy;
use uuid::Uuid;

use super::models::{PetCreate, Shelter};
use crate::app::AppState;
use crate::dispatch::{versioned, HandlerRequest, Reply};
use crate::error::ApiError;
use crate::path::router_template;
use crate::registry::VersionRegistry;
use crate::version::ApiVersion;

pub const PETS: &str = "/pets";
pub const PET: &str = "/pets/{id}";
pub const SHELTERS: &str = "/shelters";
pub const SHELTER: &str = "/shelters/{id}";

const PET_VERSIONS: [ApiVersion; 4] = [
    ApiVersion::new(1, 0),
    ApiVersion::new(2, 0),
    ApiVersion::new(3, 0),
    ApiVersion::new(3, 1),
];
const SHELTER_VERSIONS: [ApiVersion; 2] = [ApiVersion::new(3, 0), ApiVersion::new(3, 1)];

static SHELTER_DATA: Lazy<Vec<Shelter>> = Lazy::new(|| {
    [
        ("1", "Happy Paws Shelter", "New York"),
        ("2", "Furry Friends Rescue", "Los Angeles"),
        ("3", "Whisker Haven", "Chicago"),
    ]
    .into_iter()
    .map(|(id, name, location)| Shelter {
        id: id.to_string(),
        name: name.to_string(),
        location: location.to_string(),
    })
    .collect()
});

/// Declare which versions each endpoint serves
pub fn register_versions(versions: &mut VersionRegistry) {
    versions.register_all(PETS, &PET_VERSIONS);
    versions.register_all(PET, &PET_VERSIONS);
    versions.register_all(SHELTERS, &SHELTER_VERSIONS);
    versions.register_all(SHELTER, &SHELTER_VERSIONS);
}

/// Route table; state is supplied by the caller
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            &router_template(PETS),
            get(versioned(list_pets)).post(versioned(create_pet)),
        )
        .route(
            &router_template(PET),
            get(versioned(get_pet))
                .put(versioned(update_pet))
                .delete(versioned(delete_pet)),
        )
        .route(&router_template(SHELTERS), get(versioned(list_shelters)))
        .route(&router_template(SHELTER), get(versioned(get_shelter)))
}

fn pet_not_found() -> ApiError {
    ApiError::NotFound("Pet not found".to_string())
}

async fn list_pets(state: AppState, _request: HandlerRequest) -> Result<Reply, ApiError> {
    Reply::ok(&state.pets.list().await?)
}

async fn get_pet(state: AppState, request: HandlerRequest) -> Result<Reply, ApiError> {
    let id: Uuid = request.param("id")?;
    let pet = state.pets.get(id).await?.ok_or_else(pet_not_found)?;
    Reply::ok(&pet)
}

async fn create_pet(state: AppState, request: HandlerRequest) -> Result<Reply, ApiError> {
    let data: PetCreate = request.json()?;
    let pet = state.pets.create(data).await?;
    Reply::json(StatusCode::CREATED, &pet)
}

async fn update_pet(state: AppState, request: HandlerRequest) -> Result<Reply, ApiError> {
    let id: Uuid = request.param("id")?;
    let data: PetCreate = request.json()?;
    let pet = state.pets.update(id, data).await?.ok_or_else(pet_not_found)?;
    Reply::ok(&pet)
}

async fn delete_pet(state: AppState, request: HandlerRequest) -> Result<Reply, ApiError> {
    let id: Uuid = request.param("id")?;
    if state.pets.delete(id).await? {
        Ok(Reply::no_content())
    } else {
        Err(pet_not_found())
    }
}

async fn list_shelters(_state: AppState, _request: HandlerRequest) -> Result<Reply, ApiError> {
    Reply::ok(&*SHELTER_DATA)
}

async fn get_shelter(_state: AppState, request: HandlerRequest) -> Result<Reply, ApiError> {
    let id: String = request.param("id")?;
    let shelter = SHELTER_DATA
        .iter()
        .find(|shelter| shelter.id == id)
        .ok_or_else(|| ApiError::NotFound("Shelter not found".to_string()))?;
    Reply::ok(shelter)
}
