//! Per-path version catalogue

use std::collections::BTreeSet;

use crate::error::{Result, VersioningError};
use crate::version::ApiVersion;

/// The set of versions one endpoint path supports
///
/// Versions are kept de-duplicated and in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionedEndpoint {
    path: String,
    versions: BTreeSet<ApiVersion>,
}

impl VersionedEndpoint {
    /// Create an endpoint with no versions yet
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            versions: BTreeSet::new(),
        }
    }

    /// The canonical path this endpoint is registered under
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Add a version; returns false if it was already present
    pub fn add(&mut self, version: ApiVersion) -> bool {
        self.versions.insert(version)
    }

    /// Whether `version` is registered here
    pub fn supports(&self, version: ApiVersion) -> bool {
        self.versions.contains(&version)
    }

    /// All versions, ascending
    pub fn versions(&self) -> Vec<ApiVersion> {
        self.versions.iter().copied().collect()
    }

    /// The highest registered version
    pub fn latest(&self) -> Result<ApiVersion> {
        self.versions
            .last()
            .copied()
            .ok_or_else(|| VersioningError::NoVersions {
                path: self.path.clone(),
            })
    }

    /// The ascending run of versions from `from` through the latest
    ///
    /// Fails if `from` is not registered for this endpoint.
    pub fn chain_from(&self, from: ApiVersion) -> Result<Vec<ApiVersion>> {
        if !self.supports(from) {
            return Err(VersioningError::UnsupportedVersion {
                requested: from,
                path: self.path.clone(),
                supported: self.versions(),
            });
        }
        Ok(self.versions.range(from..).copied().collect())
    }
}
