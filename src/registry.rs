//! Version Registry
//!
//! Records, per canonical endpoint path, which API versions are supported.
//! The registry is populated during startup and frozen behind an `Arc`
//! before the server accepts traffic; every method that mutates it takes
//! `&mut self`, so nothing can register a version while requests are read.

use std::collections::BTreeMap;

use crate::endpoint::VersionedEndpoint;
use crate::error::{Result, VersioningError};
use crate::path::canonical_template;
use crate::version::ApiVersion;

/// Catalogue of versioned endpoints
#[derive(Debug, Default, Clone)]
pub struct VersionRegistry {
    /// Canonical path -> endpoint
    endpoints: BTreeMap<String, VersionedEndpoint>,
}

impl VersionRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `version` to the path's version set
    ///
    /// Re-registering an existing version is a no-op.
    pub fn register(&mut self, path: &str, version: ApiVersion) {
        let key = canonical_template(path);
        let added = self
            .endpoints
            .entry(key.clone())
            .or_insert_with(|| VersionedEndpoint::new(key.clone()))
            .add(version);

        if added {
            tracing::debug!(path = %key, %version, "registered endpoint version");
        }
    }

    /// Register several versions at once
    pub fn register_all(&mut self, path: &str, versions: &[ApiVersion]) {
        for version in versions {
            self.register(path, *version);
        }
    }

    /// Look up the endpoint for a path template
    pub fn endpoint(&self, path: &str) -> Option<&VersionedEndpoint> {
        self.endpoints.get(&canonical_template(path))
    }

    /// All registered endpoints, ordered by path
    pub fn endpoints(&self) -> impl Iterator<Item = &VersionedEndpoint> {
        self.endpoints.values()
    }

    /// Supported versions for a path, ascending; empty if the path is unknown
    pub fn supported_versions(&self, path: &str) -> Vec<ApiVersion> {
        self.endpoint(path)
            .map(VersionedEndpoint::versions)
            .unwrap_or_default()
    }

    /// Whether `version` is registered for `path`
    pub fn is_supported(&self, path: &str, version: ApiVersion) -> bool {
        self.endpoint(path).is_some_and(|ep| ep.supports(version))
    }

    /// The latest version registered for `path`
    pub fn latest(&self, path: &str) -> Result<ApiVersion> {
        self.endpoint(path)
            .ok_or_else(|| VersioningError::NoVersions {
                path: path.to_string(),
            })?
            .latest()
    }

    /// Ascending chain from `from` through the latest version of `path`
    pub fn chain_from(&self, path: &str, from: ApiVersion) -> Result<Vec<ApiVersion>> {
        self.endpoint(path)
            .ok_or_else(|| VersioningError::NoVersions {
                path: path.to_string(),
            })?
            .chain_from(from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ApiVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_create_registry() {
        let registry = VersionRegistry::new();
        assert_eq!(registry.endpoints().count(), 0);
        assert!(registry.supported_versions("/pets").is_empty());
        assert!(!registry.is_supported("/pets", v("1.0")));
    }

    #[test]
    fn test_register_is_idempotent_and_sorted() {
        let mut registry = VersionRegistry::new();
        registry.register("/pets", v("3.1"));
        registry.register("/pets", v("1.0"));
        registry.register("/pets", v("3.0"));
        registry.register("/pets", v("1.0"));
        registry.register("/pets", v("2.0"));

        assert_eq!(
            registry.supported_versions("/pets"),
            vec![v("1.0"), v("2.0"), v("3.0"), v("3.1")]
        );
        assert_eq!(registry.latest("/pets").unwrap(), v("3.1"));
    }

    #[test]
    fn test_templates_share_canonical_key() {
        let mut registry = VersionRegistry::new();
        registry.register("/pets/{pet_id}", v("1.0"));
        registry.register("/pets/:id", v("2.0"));

        assert_eq!(registry.endpoints().count(), 1);
        assert!(registry.is_supported("/pets/{id}", v("1.0")));
        assert!(registry.is_supported("/pets/{id}", v("2.0")));
    }

    #[test]
    fn test_latest_unknown_path() {
        let registry = VersionRegistry::new();
        assert!(matches!(
            registry.latest("/nowhere"),
            Err(VersioningError::NoVersions { path }) if path == "/nowhere"
        ));
    }

    #[test]
    fn test_chain_from() {
        let mut registry = VersionRegistry::new();
        registry.register_all("/pets", &[v("1.0"), v("2.0"), v("3.0"), v("3.1")]);

        assert_eq!(
            registry.chain_from("/pets", v("2.0")).unwrap(),
            vec![v("2.0"), v("3.0"), v("3.1")]
        );
        assert_eq!(
            registry.chain_from("/pets", v("1.0")).unwrap().last().copied(),
            Some(registry.latest("/pets").unwrap())
        );
        assert!(registry.chain_from("/pets", v("9.9")).is_err());
    }
}
