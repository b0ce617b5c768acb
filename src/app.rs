//! Service assembly: registries, middleware and routes
//!
//! Registries are filled once here and frozen behind `Arc` before the router
//! is built; nothing mutates them while requests are served.

use std::sync::Arc;

use anyhow::Context;
use axum::extract::FromRef;
use axum::http::HeaderName;
use axum::middleware;
use axum::Router;

use crate::config::ServiceConfig;
use crate::dispatch::VersionedDispatcher;
use crate::negotiation::{negotiate_version, Negotiator};
use crate::path::PathNormalizer;
use crate::pets::{self, InMemoryPetRepository, PetRepository};
use crate::registry::VersionRegistry;
use crate::shim::{MissingLink, ShimObserver, ShimRegistry};

/// Shared handler state
#[derive(Clone, FromRef)]
pub struct AppState {
    pub dispatcher: Arc<VersionedDispatcher>,
    pub pets: Arc<dyn PetRepository>,
}

/// Every endpoint version and shim the service knows about
#[derive(Debug, Default)]
pub struct Registries {
    pub versions: VersionRegistry,
    pub shims: ShimRegistry,
}

impl Registries {
    /// Registries populated with the pet store endpoints
    pub fn populated() -> Self {
        let mut registries = Self::default();
        pets::register(&mut registries.versions, &mut registries.shims);
        registries
    }

    /// Adjacent version pairs that have no shim
    pub fn audit(&self) -> Vec<MissingLink> {
        self.shims.audit(&self.versions)
    }
}

/// Builder for the service router
pub struct AppBuilder {
    config: ServiceConfig,
    observer: Option<Arc<dyn ShimObserver>>,
    repository: Option<Arc<dyn PetRepository>>,
}

impl AppBuilder {
    pub fn new(config: ServiceConfig) -> Self {
        Self {
            config,
            observer: None,
            repository: None,
        }
    }

    /// Notify `observer` whenever a shim runs
    pub fn observer(mut self, observer: Arc<dyn ShimObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Use `repository` instead of a fresh in-memory store
    pub fn repository(mut self, repository: Arc<dyn PetRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Check the settings `build` would reject, without building anything
    pub fn validate(&self) -> anyhow::Result<()> {
        self.header()?;
        self.normalizer()?;
        Ok(())
    }

    fn header(&self) -> anyhow::Result<HeaderName> {
        HeaderName::try_from(self.config.versioning.header.as_str())
            .with_context(|| format!("invalid version header name: {}", self.config.versioning.header))
    }

    fn normalizer(&self) -> anyhow::Result<PathNormalizer> {
        PathNormalizer::new(
            self.config.normalization.strategy,
            &self.config.normalization.segment_pattern,
        )
        .context("invalid normalization segment pattern")
    }

    pub fn build(self) -> anyhow::Result<Router> {
        let header = self.header()?;
        let normalizer = self.normalizer()?;

        let mut registries = Registries::populated();
        if let Some(observer) = self.observer {
            registries.shims.set_observer(observer);
        }

        for link in registries.audit() {
            tracing::warn!(%link, "version chain has no shim for this hop");
        }

        let versions = Arc::new(registries.versions);
        let shims = Arc::new(registries.shims);

        let negotiator = Arc::new(Negotiator::new(versions.clone(), header, normalizer));
        let dispatcher = Arc::new(VersionedDispatcher::new(
            versions,
            shims,
            self.config.versioning.missing_shim,
        ));

        let pets = match self.repository {
            Some(repository) => repository,
            None => {
                let repository = InMemoryPetRepository::new();
                if self.config.server.seed_sample_data {
                    repository.seed_sample_data();
                }
                Arc::new(repository) as Arc<dyn PetRepository>
            }
        };

        let state = AppState { dispatcher, pets };

        Ok(pets::routes::router()
            .layer(middleware::from_fn_with_state(negotiator, negotiate_version))
            .with_state(state))
    }
}

/// Bind and serve until Ctrl-C
pub async fn serve(config: ServiceConfig) -> anyhow::Result<()> {
    let bind = config.server.bind;
    let router = AppBuilder::new(config).build()?;

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("failed to bind {}", bind))?;
    tracing::info!(address = %bind, "pet store listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("pet store stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}
