//! API version identifiers
//!
//! An [`ApiVersion`] is a strict `major.minor` pair. There are no ranges, no
//! patch component and no prefixes: `"3.1"` parses, `"v3.1"`, `"3"` and
//! `"3.1.0"` do not.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::VersioningError;

static VERSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([0-9]+)\.([0-9]+)$").expect("version pattern is valid"));

/// A `major.minor` API contract revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ApiVersion {
    /// Major component
    pub major: u32,
    /// Minor component
    pub minor: u32,
}

impl ApiVersion {
    /// Create a version from its components
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Parse a strict `major.minor` string
    pub fn parse(version_str: &str) -> Result<Self, VersioningError> {
        let invalid = || VersioningError::InvalidVersion(version_str.to_string());

        let caps = VERSION_PATTERN.captures(version_str).ok_or_else(invalid)?;
        // Components that overflow u32 are malformed, not clamped.
        let major = caps[1].parse().map_err(|_| invalid())?;
        let minor = caps[2].parse().map_err(|_| invalid())?;

        Ok(Self { major, minor })
    }

    /// Join versions for a header value (`"3.0,3.1"`)
    pub fn join_header(versions: &[ApiVersion]) -> String {
        versions.iter().map(ToString::to_string).collect::<Vec<_>>().join(",")
    }

    /// Join versions for a human-readable message (`"3.0, 3.1"`)
    pub fn join_readable(versions: &[ApiVersion]) -> String {
        versions.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

impl FromStr for ApiVersion {
    type Err = VersioningError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ApiVersion {
    type Error = VersioningError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ApiVersion> for String {
    fn from(version: ApiVersion) -> Self {
        version.to_string()
    }
}

impl PartialOrd for ApiVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ApiVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.major
            .cmp(&other.major)
            .then(self.minor.cmp(&other.minor))
    }
}
