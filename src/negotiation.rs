//! Version negotiation
//!
//! Runs before routing hands a request to its handler. A `HEAD` request is a
//! capability probe and is answered directly with the endpoint's supported
//! versions. Every other request must declare its version in the version
//! header; a missing, malformed or unsupported declaration ends the request
//! here. Accepted requests carry a [`NegotiatedVersion`] extension onward and
//! have the version stamped on their response.

use std::sync::Arc;

use axum::extract::{MatchedPath, Request, State};
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::{Result, VersioningError};
use crate::path::PathNormalizer;
use crate::registry::VersionRegistry;
use crate::version::ApiVersion;

/// Default name of the declared-version header
pub const DEFAULT_VERSION_HEADER: &str = "API-Version";

/// The version a request was validated against, scoped to that request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiatedVersion {
    pub version: ApiVersion,
    /// Canonical endpoint path the version was checked for
    pub path: String,
}

/// Outcome of a successful negotiation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Negotiation {
    /// Capability probe: answer with these versions and stop
    Probe(Vec<ApiVersion>),
    /// Continue to the handler with this version
    Accepted(NegotiatedVersion),
}

/// Validates declared versions against the registry
#[derive(Debug, Clone)]
pub struct Negotiator {
    versions: Arc<VersionRegistry>,
    header: HeaderName,
    normalizer: PathNormalizer,
}

impl Negotiator {
    pub fn new(versions: Arc<VersionRegistry>, header: HeaderName, normalizer: PathNormalizer) -> Self {
        Self {
            versions,
            header,
            normalizer,
        }
    }

    /// Decide what to do with a request
    pub fn negotiate(
        &self,
        method: &Method,
        raw_path: &str,
        matched_route: Option<&str>,
        headers: &HeaderMap,
    ) -> Result<Negotiation> {
        let path = self.normalizer.normalize(raw_path, matched_route);

        if *method == Method::HEAD {
            return Ok(Negotiation::Probe(self.versions.supported_versions(&path)));
        }

        let declared = match headers.get(&self.header) {
            Some(value) if !value.is_empty() => value,
            _ => return Err(VersioningError::MissingHeader(self.header.to_string())),
        };
        let declared = declared
            .to_str()
            .map_err(|_| VersioningError::InvalidVersion(String::from_utf8_lossy(declared.as_bytes()).into_owned()))?;
        let version = ApiVersion::parse(declared)?;

        if !self.versions.is_supported(&path, version) {
            return Err(VersioningError::UnsupportedVersion {
                requested: version,
                supported: self.versions.supported_versions(&path),
                path,
            });
        }

        tracing::trace!(%path, %version, "negotiated version");
        Ok(Negotiation::Accepted(NegotiatedVersion { version, path }))
    }

    /// Empty 200 carrying the supported versions, if there are any
    pub fn probe_response(&self, versions: &[ApiVersion]) -> Response {
        let mut response = StatusCode::OK.into_response();
        if !versions.is_empty() {
            if let Ok(value) = HeaderValue::from_str(&ApiVersion::join_header(versions)) {
                response.headers_mut().insert(self.header.clone(), value);
            }
        }
        response
    }

    /// Add the version header to a response that lacks it
    pub fn stamp(&self, response: &mut Response, version: ApiVersion) {
        if response.headers().contains_key(&self.header) {
            return;
        }
        if let Ok(value) = HeaderValue::from_str(&version.to_string()) {
            response.headers_mut().insert(self.header.clone(), value);
        }
    }
}

/// Router middleware wrapping [`Negotiator`]
///
/// Install with `axum::middleware::from_fn_with_state(negotiator, negotiate_version)`
/// via `Router::layer` so the matched route template is visible here.
pub async fn negotiate_version(
    State(negotiator): State<Arc<Negotiator>>,
    mut request: Request,
    next: Next,
) -> Response {
    let matched = request
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string());

    let outcome = negotiator.negotiate(
        request.method(),
        request.uri().path(),
        matched.as_deref(),
        request.headers(),
    );

    match outcome {
        Ok(Negotiation::Probe(versions)) => negotiator.probe_response(&versions),
        Ok(Negotiation::Accepted(negotiated)) => {
            let version = negotiated.version;
            request.extensions_mut().insert(negotiated);
            let mut response = next.run(request).await;
            negotiator.stamp(&mut response, version);
            response
        }
        Err(err) => {
            tracing::debug!(
                method = %request.method(),
                path = %request.uri().path(),
                error = %err,
                "version negotiation rejected request"
            );
            err.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(s: &str) -> ApiVersion {
        s.parse().unwrap()
    }

    fn negotiator() -> Negotiator {
        let mut versions = VersionRegistry::new();
        versions.register_all("/pets", &[v("1.0"), v("2.0"), v("3.0"), v("3.1")]);
        versions.register_all("/pets/{id}", &[v("1.0"), v("2.0"), v("3.0"), v("3.1")]);
        versions.register_all("/shelters", &[v("3.0"), v("3.1")]);
        Negotiator::new(
            Arc::new(versions),
            HeaderName::from_static("api-version"),
            PathNormalizer::default(),
        )
    }

    fn headers(version: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("api-version", HeaderValue::from_str(version).unwrap());
        headers
    }

    #[test]
    fn test_probe_lists_versions() {
        let outcome = negotiator()
            .negotiate(&Method::HEAD, "/shelters", Some("/shelters"), &HeaderMap::new())
            .unwrap();
        assert_eq!(outcome, Negotiation::Probe(vec![v("3.0"), v("3.1")]));
    }

    #[test]
    fn test_probe_unknown_path_is_empty() {
        let outcome = negotiator()
            .negotiate(&Method::HEAD, "/unknown", None, &HeaderMap::new())
            .unwrap();
        assert_eq!(outcome, Negotiation::Probe(vec![]));
    }

    #[test]
    fn test_missing_header() {
        let err = negotiator()
            .negotiate(&Method::GET, "/pets", Some("/pets"), &HeaderMap::new())
            .unwrap_err();
        assert!(matches!(err, VersioningError::MissingHeader(ref h) if h == "api-version"));

        let err = negotiator()
            .negotiate(&Method::GET, "/pets", Some("/pets"), &headers(""))
            .unwrap_err();
        assert!(matches!(err, VersioningError::MissingHeader(_)));
    }

    #[test]
    fn test_malformed_header() {
        let err = negotiator()
            .negotiate(&Method::GET, "/pets", Some("/pets"), &headers("latest"))
            .unwrap_err();
        assert!(matches!(err, VersioningError::InvalidVersion(ref raw) if raw == "latest"));
    }

    #[test]
    fn test_unsupported_version_lists_supported() {
        let err = negotiator()
            .negotiate(&Method::POST, "/pets", Some("/pets"), &headers("9.9"))
            .unwrap_err();
        match err {
            VersioningError::UnsupportedVersion { requested, supported, path } => {
                assert_eq!(requested, v("9.9"));
                assert_eq!(path, "/pets");
                assert_eq!(supported, vec![v("1.0"), v("2.0"), v("3.0"), v("3.1")]);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_version_unsupported_on_newer_endpoint() {
        let err = negotiator()
            .negotiate(&Method::GET, "/shelters", Some("/shelters"), &headers("1.0"))
            .unwrap_err();
        assert!(matches!(err, VersioningError::UnsupportedVersion { .. }));
    }

    #[test]
    fn test_accepts_and_normalizes_path() {
        let outcome = negotiator()
            .negotiate(&Method::GET, "/pets/abc123", Some("/pets/:id"), &headers("2.0"))
            .unwrap();
        assert_eq!(
            outcome,
            Negotiation::Accepted(NegotiatedVersion {
                version: v("2.0"),
                path: "/pets/{id}".into(),
            })
        );

        let outcome = negotiator()
            .negotiate(&Method::DELETE, "/pets/def456", None, &headers("1.0"))
            .unwrap();
        assert!(matches!(outcome, Negotiation::Accepted(n) if n.path == "/pets/{id}"));
    }

    #[test]
    fn test_probe_response_header() {
        let negotiator = negotiator();
        let response = negotiator.probe_response(&[v("3.0"), v("3.1")]);
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["api-version"], "3.0,3.1");

        let response = negotiator.probe_response(&[]);
        assert!(response.headers().get("api-version").is_none());
    }

    #[test]
    fn test_stamp_keeps_existing_header() {
        let negotiator = negotiator();
        let mut response = StatusCode::OK.into_response();
        negotiator.stamp(&mut response, v("2.0"));
        assert_eq!(response.headers()["api-version"], "2.0");

        negotiator.stamp(&mut response, v("3.1"));
        assert_eq!(response.headers()["api-version"], "2.0");
    }
}
