//! Versioned dispatch
//!
//! Business handlers are written once, against the latest schema of their
//! endpoint. The dispatcher sits between them and the caller: it works out
//! the chain of adjacent versions from the caller's version to the latest,
//! pushes the request payload forward through the request shims, runs the
//! handler, and walks the handler's output back through the response shims.
//!
//! ```text
//! caller 1.0 ──req 1.0→2.0──req 2.0→3.0──req 3.0→3.1──▶ handler (3.1)
//! caller 1.0 ◀──resp 2.0→1.0──resp 3.0→2.0──resp 3.1→3.0── handler (3.1)
//! ```
//!
//! Every hop of both directions is resolved before the handler runs, so a
//! request either gets a fully shaped response or is rejected untouched.

use std::collections::HashMap;
use std::convert::Infallible;
use std::future::Future;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRef, FromRequestParts, MatchedPath, Path, State};
use axum::http::request::Parts;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::future::{BoxFuture, FutureExt};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, DispatchError, Result, VersioningError};
use crate::negotiation::NegotiatedVersion;
use crate::path::canonical_template;
use crate::registry::VersionRegistry;
use crate::shim::{Direction, Shim, ShimRegistry};
use crate::version::ApiVersion;

/// What to do when a hop in the chain has no shim
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MissingShimPolicy {
    /// Fail the request before the handler runs
    #[default]
    Reject,
    /// Hand the payload to the next hop unchanged
    Passthrough,
}

/// One adjacent step of a version chain
#[derive(Debug, Clone)]
pub struct Hop {
    pub from: ApiVersion,
    pub to: ApiVersion,
    shim: Option<Shim>,
}

impl Hop {
    /// Whether a shim will actually run for this hop
    pub fn is_shimmed(&self) -> bool {
        self.shim.is_some()
    }
}

/// The resolved shim chain for one request
#[derive(Debug)]
pub struct DispatchPlan<'a> {
    shims: &'a ShimRegistry,
    path: String,
    requested: ApiVersion,
    latest: ApiVersion,
    forward: Vec<Hop>,
    backward: Vec<Hop>,
}

impl<'a> DispatchPlan<'a> {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn requested(&self) -> ApiVersion {
        self.requested
    }

    pub fn latest(&self) -> ApiVersion {
        self.latest
    }

    /// Request hops, oldest first
    pub fn forward(&self) -> &[Hop] {
        &self.forward
    }

    /// Response hops, newest first
    pub fn backward(&self) -> &[Hop] {
        &self.backward
    }

    /// True when the caller already speaks the latest version
    pub fn is_passthrough(&self) -> bool {
        self.forward.is_empty() && self.backward.is_empty()
    }

    /// Shape a caller's payload for the latest version
    pub fn upgrade(&self, payload: Value) -> Result<Value> {
        self.run(Direction::Request, &self.forward, payload)
    }

    /// Shape a latest-version payload for the caller's version
    pub fn downgrade(&self, payload: Value) -> Result<Value> {
        self.run(Direction::Response, &self.backward, payload)
    }

    fn run(&self, direction: Direction, hops: &[Hop], mut payload: Value) -> Result<Value> {
        for hop in hops {
            if let Some(shim) = &hop.shim {
                payload = self
                    .shims
                    .apply(shim, &self.path, direction, hop.from, hop.to, payload)?;
            }
        }
        Ok(payload)
    }
}

/// Latest-schema input handed to a business handler
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Path parameters by name
    pub params: HashMap<String, String>,
    /// Body shaped for the latest version (`null` when there is none)
    pub body: Value,
}

impl HandlerRequest {
    /// Decode the body as the latest record type
    pub fn json<T: DeserializeOwned>(&self) -> std::result::Result<T, ApiError> {
        T::deserialize(&self.body).map_err(|e| ApiError::BadRequest(format!("Invalid body: {}", e)))
    }

    /// Parse a named path parameter
    pub fn param<T: FromStr>(&self, name: &str) -> std::result::Result<T, ApiError> {
        let raw = self
            .params
            .get(name)
            .ok_or_else(|| ApiError::BadRequest(format!("Missing path parameter: {}", name)))?;
        raw.parse()
            .map_err(|_| ApiError::BadRequest(format!("Invalid path parameter {}: {}", name, raw)))
    }
}

/// Latest-schema output of a business handler
#[derive(Debug, Clone)]
pub struct Reply {
    pub status: StatusCode,
    pub body: Option<Value>,
}

impl Reply {
    /// A JSON body with the given status
    pub fn json<T: Serialize>(status: StatusCode, body: &T) -> std::result::Result<Self, ApiError> {
        Ok(Self {
            status,
            body: Some(serde_json::to_value(body)?),
        })
    }

    /// A 200 JSON body
    pub fn ok<T: Serialize>(body: &T) -> std::result::Result<Self, ApiError> {
        Self::json(StatusCode::OK, body)
    }

    /// 204 without a body
    pub fn no_content() -> Self {
        Self {
            status: StatusCode::NO_CONTENT,
            body: None,
        }
    }
}

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self.body {
            Some(body) => (self.status, Json(body)).into_response(),
            None => self.status.into_response(),
        }
    }
}

/// Where and as which version a request arrived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Canonical endpoint path
    pub path: String,
    /// Negotiated version, if negotiation ran
    pub version: Option<ApiVersion>,
    /// Path parameters by name
    pub params: HashMap<String, String>,
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> std::result::Result<Self, Self::Rejection> {
        let negotiated = parts.extensions.get::<NegotiatedVersion>().cloned();
        let path = match &negotiated {
            Some(negotiated) => negotiated.path.clone(),
            None => parts
                .extensions
                .get::<MatchedPath>()
                .map(|matched| canonical_template(matched.as_str()))
                .unwrap_or_else(|| parts.uri.path().to_string()),
        };
        let params = Option::<Path<HashMap<String, String>>>::from_request_parts(parts, state)
            .await?
            .map(|Path(params)| params)
            .unwrap_or_default();

        Ok(Self {
            path,
            version: negotiated.map(|n| n.version),
            params,
        })
    }
}

/// Drives handlers through the shim chain for the caller's version
#[derive(Debug, Clone)]
pub struct VersionedDispatcher {
    versions: Arc<VersionRegistry>,
    shims: Arc<ShimRegistry>,
    policy: MissingShimPolicy,
}

impl VersionedDispatcher {
    pub fn new(versions: Arc<VersionRegistry>, shims: Arc<ShimRegistry>, policy: MissingShimPolicy) -> Self {
        Self {
            versions,
            shims,
            policy,
        }
    }

    /// Resolve the full chain for `path` as seen by a `requested` caller
    ///
    /// Without a negotiated version the caller is treated as speaking the
    /// latest version.
    pub fn plan(&self, path: &str, requested: Option<ApiVersion>) -> Result<DispatchPlan<'_>> {
        let latest = self.versions.latest(path)?;
        let requested = requested.unwrap_or(latest);

        let mut plan = DispatchPlan {
            shims: &self.shims,
            path: path.to_string(),
            requested,
            latest,
            forward: Vec::new(),
            backward: Vec::new(),
        };
        if requested == latest {
            return Ok(plan);
        }

        let chain = self.versions.chain_from(path, requested)?;
        for pair in chain.windows(2) {
            plan.forward.push(self.hop(path, Direction::Request, pair[0], pair[1])?);
        }
        for pair in chain.windows(2).rev() {
            plan.backward.push(self.hop(path, Direction::Response, pair[1], pair[0])?);
        }
        Ok(plan)
    }

    fn hop(&self, path: &str, direction: Direction, from: ApiVersion, to: ApiVersion) -> Result<Hop> {
        let shim = self.shims.get(direction, path, from, to).cloned();
        if shim.is_none() {
            match self.policy {
                MissingShimPolicy::Reject => {
                    return Err(VersioningError::MissingChainLink {
                        path: path.to_string(),
                        direction,
                        from,
                        to,
                    });
                }
                MissingShimPolicy::Passthrough => {
                    tracing::warn!(path, %direction, %from, %to, "no shim registered, passing payload through");
                }
            }
        }
        Ok(Hop { from, to, shim })
    }

    /// Run `handler` for a request, shaping input and output for its version
    pub async fn dispatch<F, Fut>(
        &self,
        context: RequestContext,
        body: Value,
        handler: F,
    ) -> std::result::Result<Reply, DispatchError>
    where
        F: FnOnce(HandlerRequest) -> Fut,
        Fut: Future<Output = std::result::Result<Reply, ApiError>>,
    {
        let plan = self.plan(&context.path, context.version)?;
        tracing::trace!(
            path = %plan.path(),
            requested = %plan.requested(),
            latest = %plan.latest(),
            hops = plan.forward().len(),
            shimmed = plan
                .forward()
                .iter()
                .chain(plan.backward())
                .filter(|hop| hop.is_shimmed())
                .count(),
            "dispatching"
        );

        let body = plan.upgrade(body)?;
        let mut reply = handler(HandlerRequest {
            params: context.params,
            body,
        })
        .await?;

        if let Some(body) = reply.body.take() {
            reply.body = Some(plan.downgrade(body)?);
        }
        Ok(reply)
    }
}

fn decode_body(body: &[u8]) -> Result<Value> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(Value::Null);
    }
    serde_json::from_slice(body).map_err(|e| VersioningError::InvalidBody(e.to_string()))
}

/// Adapt a latest-schema handler into a router handler
///
/// The application state must expose the dispatcher through [`FromRef`].
/// ```ignore
/// Router::new()
///     .route("/pets", get(versioned(list_pets)).post(versioned(create_pet)))
///     .with_state(state)
/// ```
pub fn versioned<S, F, Fut>(
    handler: F,
) -> impl Fn(State<S>, RequestContext, Bytes) -> BoxFuture<'static, Response> + Clone + Send + Sync + 'static
where
    S: Clone + Send + Sync + 'static,
    Arc<VersionedDispatcher>: FromRef<S>,
    F: Fn(S, HandlerRequest) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<Reply, ApiError>> + Send + 'static,
{
    move |State(state): State<S>, context: RequestContext, body: Bytes| {
        let handler = handler.clone();
        async move {
            let dispatcher = Arc::<VersionedDispatcher>::from_ref(&state);
            let payload = match decode_body(&body) {
                Ok(payload) => payload,
                Err(err) => return err.into_response(),
            };
            match dispatcher
                .dispatch(context, payload, move |request| handler(state, request))
                .await
            {
                Ok(reply) => reply.into_response(),
                Err(err) => err.into_response(),
            }
        }
        .boxed()
    }
}
