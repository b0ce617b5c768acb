//! The pet store domain served through the versioning layer

pub mod models;
pub mod repository;
pub mod routes;
pub mod shims;

pub use models::{Pet, PetCreate, Shelter};
pub use repository::{InMemoryPetRepository, PetRepository};

use crate::registry::VersionRegistry;
use crate::shim::ShimRegistry;

/// Register the pet store's endpoint versions and shims
pub fn register(versions: &mut VersionRegistry, shims: &mut ShimRegistry) {
    routes::register_versions(versions);
    shims::register_shims(shims);
}
