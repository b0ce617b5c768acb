//! Versioned Pet Store
//!
//! Header-negotiated API versioning for an HTTP service. Clients declare the
//! version they speak in a request header; handlers only ever see the latest
//! schema, and chains of adjacent-version shims translate request bodies up
//! and response bodies back down.
//!
//! ## Features
//!
//! - **Negotiation**: `API-Version` header validated per endpoint, `HEAD` as a capability probe
//! - **Shim Chains**: Pure, typed request/response conversions between adjacent versions
//! - **Path Normalization**: Concrete paths map onto their route template for lookups
//! - **Startup Audit**: Missing hops are reported before any request is served
//!
//! ## Architecture
//!
//! ```text
//! request ──► negotiation ──► router ──► dispatch ──► handler (latest schema)
//!               │                         │  ▲
//!               │ VersionRegistry         │  │ ShimRegistry
//!               ▼                         ▼  │
//!            406/400/probe          upgrade  downgrade
//!                                   1.0 → 2.0 → 3.0 → 3.1
//! ```

pub mod app;
pub mod config;
pub mod dispatch;
pub mod endpoint;
pub mod error;
pub mod logging;
pub mod negotiation;
pub mod path;
pub mod pets;
pub mod registry;
pub mod shim;
pub mod version;

pub use app::{AppBuilder, AppState, Registries};
pub use config::ServiceConfig;
pub use dispatch::{versioned, HandlerRequest, MissingShimPolicy, Reply, VersionedDispatcher};
pub use endpoint::VersionedEndpoint;
pub use error::{ApiError, DispatchError, Result, VersioningError};
pub use negotiation::{NegotiatedVersion, Negotiator};
pub use path::{NormalizationStrategy, PathNormalizer};
pub use registry::VersionRegistry;
pub use shim::{Direction, Shim, ShimCounter, ShimObserver, ShimRegistry};
pub use version::ApiVersion;
