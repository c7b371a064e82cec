//! Startup orchestration.
//!
//! # Responsibilities
//! - Register named backends and the models attached to them
//! - Connect every backend before any route is bound (the ready barrier)
//! - Hand out the route table builder only once the barrier has passed
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Backends connect concurrently; models attach after all connections succeed
//! - `Startup` → `Ready` → `RouteTable`: each phase consumes the previous one,
//!   so routes cannot be registered before the barrier or after serving begins

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use futures_util::future::try_join_all;
use thiserror::Error;

use crate::routing::{RouteError, RouteTable, RouteTableBuilder};
use crate::view::{ContentError, HandlerSet};

/// Failure reported by a backend.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct BackendError(pub String);

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("models {models:?} registered against unknown backend {backend:?}")]
    UnknownBackend { backend: String, models: Vec<String> },

    #[error("backend {name:?} failed to connect: {source}")]
    Connect {
        name: String,
        #[source]
        source: BackendError,
    },

    #[error("backend {name:?} rejected model {model:?}: {source}")]
    Model {
        name: String,
        model: String,
        #[source]
        source: BackendError,
    },

    #[error(transparent)]
    Route(#[from] RouteError),

    #[error(transparent)]
    Content(#[from] ContentError),
}

/// A named persistence (or other) backend that must be ready before serving.
#[async_trait]
pub trait Backend: Send + Sync {
    fn name(&self) -> &str;

    async fn connect(&self) -> Result<(), BackendError>;

    /// Called once per registered model after every backend has connected.
    async fn attach_model(&self, model: &str) -> Result<(), BackendError> {
        tracing::debug!(backend = %self.name(), model = %model, "Model attached");
        Ok(())
    }
}

/// Build phase before the ready barrier.
#[derive(Default)]
pub struct Startup {
    backends: Vec<Arc<dyn Backend>>,
    models: Vec<(String, String)>,
}

impl Startup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn backend(mut self, backend: Arc<dyn Backend>) -> Self {
        self.backends.push(backend);
        self
    }

    /// Register `model` against the backend named `backend`.
    pub fn model(mut self, backend: impl Into<String>, model: impl Into<String>) -> Self {
        self.models.push((backend.into(), model.into()));
        self
    }

    /// Connect all backends, attach their models and pass the barrier.
    pub async fn connect_all(self) -> Result<Ready, StartupError> {
        let mut by_backend: HashMap<&str, Vec<String>> = HashMap::new();
        for (backend, model) in &self.models {
            by_backend.entry(backend.as_str()).or_default().push(model.clone());
        }

        let mut unknown: Vec<&str> = by_backend
            .keys()
            .filter(|name| !self.backends.iter().any(|b| b.name() == **name))
            .copied()
            .collect();
        unknown.sort_unstable();
        if let Some(backend) = unknown.first() {
            return Err(StartupError::UnknownBackend {
                backend: backend.to_string(),
                models: by_backend[backend].clone(),
            });
        }

        for backend in &self.backends {
            if !by_backend.contains_key(backend.name()) {
                tracing::warn!(backend = %backend.name(), "Backend has no models");
            }
        }

        try_join_all(self.backends.iter().map(|backend| async move {
            tracing::info!(backend = %backend.name(), "Connecting backend");
            backend.connect().await.map_err(|source| StartupError::Connect {
                name: backend.name().to_string(),
                source,
            })
        }))
        .await?;

        for backend in &self.backends {
            for model in by_backend.get(backend.name()).into_iter().flatten() {
                backend
                    .attach_model(model)
                    .await
                    .map_err(|source| StartupError::Model {
                        name: backend.name().to_string(),
                        model: model.clone(),
                        source,
                    })?;
            }
        }

        tracing::info!(backends = self.backends.len(), models = self.models.len(), "All backends ready");
        Ok(Ready {
            backends: self.backends,
            routes: RouteTableBuilder::new(),
        })
    }
}

/// Bind phase: backends are connected, routes may be registered.
pub struct Ready {
    backends: Vec<Arc<dyn Backend>>,
    routes: RouteTableBuilder<HandlerSet>,
}

impl Ready {
    pub fn backend(&self, name: &str) -> Option<Arc<dyn Backend>> {
        self.backends.iter().find(|b| b.name() == name).cloned()
    }

    /// Register a handler set for `pattern` and `method`.
    pub fn register(&mut self, pattern: &str, method: Method, handlers: HandlerSet) -> Result<&mut Self, StartupError> {
        self.routes.register(pattern, method, handlers)?;
        Ok(self)
    }

    /// Freeze the route table for serving.
    pub fn into_route_table(self) -> RouteTable<HandlerSet> {
        self.routes.build()
    }
}
