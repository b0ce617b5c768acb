//! Shim Registry
//!
//! A shim converts a payload between two adjacent versions of one endpoint.
//! Request shims move a caller's payload one step toward the latest version
//! (`from < to`); response shims move a handler's output one step away from
//! it (`from > to`). The two tables are independent: a request shim is not
//! the inverse of the response shim for the same hop.
//!
//! Shims are written against concrete record types (`Fn(PetV1) -> PetV2`) and
//! erased at registration into a value-level transform over
//! [`serde_json::Value`], so a chain of hops can be driven without knowing
//! the types involved.

use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::VersioningError;
use crate::path::canonical_template;
use crate::registry::VersionRegistry;
use crate::version::ApiVersion;

/// Which way a shim moves a payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// Older request schema to the next newer one
    Request,
    /// Newer response schema to the next older one
    Response,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Request => write!(f, "request"),
            Direction::Response => write!(f, "response"),
        }
    }
}

type Transform = dyn Fn(Value) -> Result<Value, String> + Send + Sync;

/// A type-erased, pure payload transformation
#[derive(Clone)]
pub struct Shim {
    transform: Arc<Transform>,
}

impl Shim {
    /// Erase a typed record conversion
    ///
    /// The erased shim is total over the shapes an endpoint produces: `null`
    /// passes through untouched and arrays are converted element by element.
    pub fn typed<A, B, F>(convert: F) -> Self
    where
        A: DeserializeOwned + 'static,
        B: Serialize + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        Self::try_typed(move |source: A| Ok::<B, Infallible>(convert(source)))
    }

    /// Erase a typed conversion that can refuse its input
    ///
    /// A refusal fails the hop with the error's message; nothing is coerced.
    pub fn try_typed<A, B, E, F>(convert: F) -> Self
    where
        A: DeserializeOwned + 'static,
        B: Serialize + 'static,
        E: fmt::Display,
        F: Fn(A) -> Result<B, E> + Send + Sync + 'static,
    {
        let convert_one = move |value: Value| -> Result<Value, String> {
            let source: A = serde_json::from_value(value).map_err(|e| e.to_string())?;
            let target = convert(source).map_err(|e| e.to_string())?;
            serde_json::to_value(target).map_err(|e| e.to_string())
        };

        Self::from_fn(move |payload| match payload {
            Value::Null => Ok(Value::Null),
            Value::Array(items) => items
                .into_iter()
                .map(&convert_one)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            record => convert_one(record),
        })
    }

    /// A shim for hops where the payload shape does not change
    pub fn identity() -> Self {
        Self::from_fn(Ok)
    }

    /// Wrap a value-level transformation directly
    pub fn from_fn<F>(transform: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        Self {
            transform: Arc::new(transform),
        }
    }

    /// Run the transformation
    pub fn apply(&self, payload: Value) -> Result<Value, String> {
        (self.transform)(payload)
    }
}

impl fmt::Debug for Shim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Shim")
    }
}

/// Instrumentation hook called once per applied shim
pub trait ShimObserver: Send + Sync {
    fn shim_applied(&self, path: &str, direction: Direction, from: ApiVersion, to: ApiVersion);
}

/// Observer that counts applied shims per direction
#[derive(Debug, Default)]
pub struct ShimCounter {
    request: AtomicUsize,
    response: AtomicUsize,
}

impl ShimCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> usize {
        self.request.load(Ordering::SeqCst)
    }

    pub fn responses(&self) -> usize {
        self.response.load(Ordering::SeqCst)
    }

    pub fn total(&self) -> usize {
        self.requests() + self.responses()
    }
}

impl ShimObserver for ShimCounter {
    fn shim_applied(&self, _path: &str, direction: Direction, _from: ApiVersion, _to: ApiVersion) {
        let counter = match direction {
            Direction::Request => &self.request,
            Direction::Response => &self.response,
        };
        counter.fetch_add(1, Ordering::SeqCst);
    }
}

/// An adjacent hop with no registered shim
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MissingLink {
    pub path: String,
    pub direction: Direction,
    pub from: ApiVersion,
    pub to: ApiVersion,
}

impl fmt::Display for MissingLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} -> {}", self.path, self.direction, self.from, self.to)
    }
}

type ShimKey = (String, ApiVersion, ApiVersion);

/// Directional lookup table of shims, keyed by `(path, from, to)`
#[derive(Default)]
pub struct ShimRegistry {
    request: HashMap<ShimKey, Shim>,
    response: HashMap<ShimKey, Shim>,
    observer: Option<Arc<dyn ShimObserver>>,
}

impl fmt::Debug for ShimRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShimRegistry")
            .field("request_shims", &self.request.len())
            .field("response_shims", &self.response.len())
            .field("observed", &self.observer.is_some())
            .finish()
    }
}

impl ShimRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an instrumentation hook
    pub fn set_observer(&mut self, observer: Arc<dyn ShimObserver>) {
        self.observer = Some(observer);
    }

    /// Register a typed request shim; the last registration for a key wins
    pub fn register_request_shim<A, B, F>(&mut self, path: &str, from: ApiVersion, to: ApiVersion, convert: F)
    where
        A: DeserializeOwned + 'static,
        B: Serialize + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        self.register(Direction::Request, path, from, to, Shim::typed(convert));
    }

    /// Register a typed request shim that may reject its input
    pub fn register_fallible_request_shim<A, B, E, F>(
        &mut self,
        path: &str,
        from: ApiVersion,
        to: ApiVersion,
        convert: F,
    ) where
        A: DeserializeOwned + 'static,
        B: Serialize + 'static,
        E: fmt::Display,
        F: Fn(A) -> Result<B, E> + Send + Sync + 'static,
    {
        self.register(Direction::Request, path, from, to, Shim::try_typed(convert));
    }

    /// Register a typed response shim; the last registration for a key wins
    pub fn register_response_shim<A, B, F>(&mut self, path: &str, from: ApiVersion, to: ApiVersion, convert: F)
    where
        A: DeserializeOwned + 'static,
        B: Serialize + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        self.register(Direction::Response, path, from, to, Shim::typed(convert));
    }

    /// Declare that `older -> newer` does not change the payload either way
    pub fn register_identity(&mut self, path: &str, older: ApiVersion, newer: ApiVersion) {
        self.register(Direction::Request, path, older, newer, Shim::identity());
        self.register(Direction::Response, path, newer, older, Shim::identity());
    }

    /// Register an already-erased shim
    pub fn register(&mut self, direction: Direction, path: &str, from: ApiVersion, to: ApiVersion, shim: Shim) {
        let key = (canonical_template(path), from, to);
        let table = match direction {
            Direction::Request => &mut self.request,
            Direction::Response => &mut self.response,
        };
        if table.insert(key, shim).is_some() {
            tracing::debug!(path, %direction, %from, %to, "replaced existing shim");
        }
    }

    /// Request shim for an exact `(path, from, to)` key
    pub fn request_shim(&self, path: &str, from: ApiVersion, to: ApiVersion) -> Option<&Shim> {
        self.get(Direction::Request, path, from, to)
    }

    /// Response shim for an exact `(path, from, to)` key
    pub fn response_shim(&self, path: &str, from: ApiVersion, to: ApiVersion) -> Option<&Shim> {
        self.get(Direction::Response, path, from, to)
    }

    /// Lookup by direction
    pub fn get(&self, direction: Direction, path: &str, from: ApiVersion, to: ApiVersion) -> Option<&Shim> {
        let key = (canonical_template(path), from, to);
        match direction {
            Direction::Request => self.request.get(&key),
            Direction::Response => self.response.get(&key),
        }
    }

    /// Apply one hop, reporting it to the observer
    pub fn apply(
        &self,
        shim: &Shim,
        path: &str,
        direction: Direction,
        from: ApiVersion,
        to: ApiVersion,
        payload: Value,
    ) -> Result<Value, VersioningError> {
        tracing::debug!(path, %direction, %from, %to, "applying shim");
        let shaped = shim.apply(payload).map_err(|reason| VersioningError::ShimFailed {
            path: path.to_string(),
            direction,
            from,
            to,
            reason,
        })?;
        if let Some(observer) = &self.observer {
            observer.shim_applied(path, direction, from, to);
        }
        Ok(shaped)
    }

    /// Every adjacent hop of every endpoint that lacks a shim
    pub fn audit(&self, versions: &VersionRegistry) -> Vec<MissingLink> {
        let mut missing = Vec::new();
        for endpoint in versions.endpoints() {
            let path = endpoint.path();
            for pair in endpoint.versions().windows(2) {
                let (older, newer) = (pair[0], pair[1]);
                if self.request_shim(path, older, newer).is_none() {
                    missing.push(MissingLink {
                        path: path.to_string(),
                        direction: Direction::Request,
                        from: older,
                        to: newer,
                    });
                }
                if self.response_shim(path, newer, older).is_none() {
                    missing.push(MissingLink {
                        path: path.to_string(),
                        direction: Direction::Response,
                        from: newer,
                        to: older,
                    });
                }
            }
        }
        missing
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Old {
        years: u32,
    }

    #[derive(Serialize)]
    struct New {
        months: u32,
    }

    fn v(s: &str) -> ApiVersion {
        s.parse().unwrap()
    }

    #[test]
    fn test_typed_shim_converts_records_and_lists() {
        let shim = Shim::typed(|old: Old| New { months: old.years * 12 });

        assert_eq!(shim.apply(json!({"years": 2})).unwrap(), json!({"months": 24}));
        assert_eq!(
            shim.apply(json!([{"years": 1}, {"years": 3}])).unwrap(),
            json!([{"months": 12}, {"months": 36}])
        );
        assert_eq!(shim.apply(Value::Null).unwrap(), Value::Null);
        assert!(shim.apply(json!({"months": 2})).is_err());
    }

    #[test]
    fn test_fallible_shim_reports_refusal() {
        let shim = Shim::try_typed(|old: Old| {
            old.years
                .checked_mul(12)
                .map(|months| New { months })
                .ok_or_else(|| format!("{} years is out of range", old.years))
        });
        assert_eq!(shim.apply(json!({"years": 2})).unwrap(), json!({"months": 24}));
        assert_eq!(shim.apply(Value::Null).unwrap(), Value::Null);

        let err = shim.apply(json!([{"years": 1}, {"years": u32::MAX}])).unwrap_err();
        assert!(err.contains("out of range"), "{}", err);
    }

    #[test]
    fn test_lookup_is_exact_and_directional() {
        let mut shims = ShimRegistry::new();
        shims.register_request_shim("/pets", v("1.0"), v("2.0"), |old: Old| New { months: old.years });

        assert!(shims.request_shim("/pets", v("1.0"), v("2.0")).is_some());
        assert!(shims.response_shim("/pets", v("1.0"), v("2.0")).is_none());
        assert!(shims.request_shim("/pets", v("2.0"), v("1.0")).is_none());
        assert!(shims.request_shim("/pets/{id}", v("1.0"), v("2.0")).is_none());
    }

    #[test]
    fn test_last_registration_wins() {
        let mut shims = ShimRegistry::new();
        shims.register(Direction::Request, "/x", v("1.0"), v("2.0"), Shim::from_fn(|_| Ok(json!(1))));
        shims.register(Direction::Request, "/x", v("1.0"), v("2.0"), Shim::from_fn(|_| Ok(json!(2))));

        let shim = shims.request_shim("/x", v("1.0"), v("2.0")).unwrap();
        assert_eq!(shim.apply(Value::Null).unwrap(), json!(2));
    }

    #[test]
    fn test_keys_are_canonical() {
        let mut shims = ShimRegistry::new();
        shims.register_identity("/pets/{pet_id}", v("1.0"), v("2.0"));
        assert!(shims.request_shim("/pets/{id}", v("1.0"), v("2.0")).is_some());
        assert!(shims.response_shim("/pets/:id", v("2.0"), v("1.0")).is_some());
    }

    #[test]
    fn test_apply_reports_to_observer() {
        let counter = Arc::new(ShimCounter::new());
        let mut shims = ShimRegistry::new();
        shims.set_observer(counter.clone());
        shims.register_identity("/x", v("1.0"), v("2.0"));

        let shim = shims.response_shim("/x", v("2.0"), v("1.0")).unwrap().clone();
        shims
            .apply(&shim, "/x", Direction::Response, v("2.0"), v("1.0"), json!({}))
            .unwrap();
        assert_eq!(counter.responses(), 1);
        assert_eq!(counter.requests(), 0);
    }

    #[test]
    fn test_apply_failure_names_the_hop() {
        let shims = ShimRegistry::new();
        let shim = Shim::typed(|old: Old| New { months: old.years });
        let err = shims
            .apply(&shim, "/x", Direction::Request, v("1.0"), v("2.0"), json!({"oops": true}))
            .unwrap_err();
        assert!(matches!(
            err,
            VersioningError::ShimFailed { direction: Direction::Request, from, to, .. }
                if from == v("1.0") && to == v("2.0")
        ));
    }

    #[test]
    fn test_audit_finds_missing_links() {
        let mut versions = VersionRegistry::new();
        versions.register_all("/pets", &[v("1.0"), v("2.0"), v("3.0")]);

        let mut shims = ShimRegistry::new();
        shims.register_identity("/pets", v("1.0"), v("2.0"));
        shims.register(Direction::Request, "/pets", v("2.0"), v("3.0"), Shim::identity());

        let missing = shims.audit(&versions);
        assert_eq!(
            missing,
            vec![MissingLink {
                path: "/pets".into(),
                direction: Direction::Response,
                from: v("3.0"),
                to: v("2.0"),
            }]
        );
    }
}
