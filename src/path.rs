//! Path normalization
//!
//! Registries are keyed by a canonical route template in which every
//! parameter segment is collapsed to [`PLACEHOLDER`]. Live request paths are
//! mapped onto the same key either from the route template the router matched
//! or, failing that, by a segment pattern that guesses which segments are
//! identifiers.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Token that replaces every parameter segment in a canonical path
pub const PLACEHOLDER: &str = "{id}";

/// Segments made only of lowercase hex digits and dashes look like identifiers
pub const DEFAULT_SEGMENT_PATTERN: &str = "^[0-9a-f-]+$";

static DEFAULT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(DEFAULT_SEGMENT_PATTERN).expect("default segment pattern is valid"));

/// How live request paths are mapped to registry keys
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NormalizationStrategy {
    /// Use the router's matched template, falling back to the segment pattern
    #[default]
    RouteTemplate,
    /// Always classify segments with the segment pattern
    SegmentPattern,
}

/// Collapse the parameter segments of a route template to [`PLACEHOLDER`]
///
/// Accepts both `{name}` and `:name` parameter syntax, plus wildcards.
pub fn canonical_template(template: &str) -> String {
    template
        .split('/')
        .map(|segment| {
            if is_parameter(segment) {
                PLACEHOLDER
            } else {
                segment
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}

/// Translate a `{name}` template into the router's `:name` syntax
pub fn router_template(template: &str) -> String {
    template
        .split('/')
        .map(|segment| match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
            Some(name) => match name.strip_prefix('*') {
                Some(rest) => format!("*{}", rest),
                None => format!(":{}", name),
            },
            None => segment.to_string(),
        })
        .collect::<Vec<_>>()
        .join("/")
}

fn is_parameter(segment: &str) -> bool {
    segment.starts_with(':')
        || segment.starts_with('*')
        || (segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}'))
}

/// Maps request paths to canonical registry keys
#[derive(Debug, Clone)]
pub struct PathNormalizer {
    strategy: NormalizationStrategy,
    segment_pattern: Regex,
}

impl Default for PathNormalizer {
    fn default() -> Self {
        Self {
            strategy: NormalizationStrategy::default(),
            segment_pattern: DEFAULT_PATTERN.clone(),
        }
    }
}

impl PathNormalizer {
    /// Create a normalizer with a custom identifier pattern
    pub fn new(strategy: NormalizationStrategy, segment_pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            strategy,
            segment_pattern: Regex::new(segment_pattern)?,
        })
    }

    /// Canonical key for a request
    ///
    /// `matched_route` is the template the router selected, if any.
    pub fn normalize(&self, raw_path: &str, matched_route: Option<&str>) -> String {
        match (self.strategy, matched_route) {
            (NormalizationStrategy::RouteTemplate, Some(template)) => canonical_template(template),
            _ => self.normalize_segments(raw_path),
        }
    }

    /// Canonical key using only the segment pattern
    pub fn normalize_segments(&self, raw_path: &str) -> String {
        raw_path
            .split('/')
            .map(|segment| {
                if self.segment_pattern.is_match(segment) {
                    PLACEHOLDER
                } else {
                    segment
                }
            })
            .collect::<Vec<_>>()
            .join("/")
    }
}
