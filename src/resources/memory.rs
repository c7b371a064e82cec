//! In-memory static assets.
//!
//! Assets are registered explicitly (or listed in `[resources]`) and held in
//! memory. Conditional GETs are answered with 304 when the client's validators
//! are still current.

use std::collections::hash_map::DefaultHasher;
use std::collections::HashMap;
use std::hash::{Hash, Hasher};
use std::path::Path;

use axum::http::{Method, StatusCode};
use bytes::Bytes;

use crate::config::ResourcesConfig;
use crate::http::{HttpRequest, HttpResponse};
use crate::negotiation::{MediaRange, NegotiationList};
use crate::resources::ResourceInterceptor;
use crate::view::{media_type_for, ContentError};

#[derive(Debug, Clone)]
pub struct Asset {
    pub media_type: String,
    pub body: Bytes,
    pub etag: String,
    pub last_modified: Option<String>,
}

impl Asset {
    /// Build an asset with a weak ETag derived from its bytes.
    pub fn new(media_type: impl Into<String>, body: impl Into<Bytes>) -> Self {
        let body = body.into();
        let mut hasher = DefaultHasher::new();
        body.hash(&mut hasher);
        Self {
            media_type: media_type.into(),
            etag: format!("W/\"{:x}-{:x}\"", body.len(), hasher.finish()),
            body,
            last_modified: None,
        }
    }

    pub fn last_modified(mut self, http_date: impl Into<String>) -> Self {
        self.last_modified = Some(http_date.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct MemoryResources {
    prefix: String,
    max_age: u64,
    assets: HashMap<String, Asset>,
}

impl MemoryResources {
    pub fn new(prefix: impl Into<String>, max_age: u64) -> Self {
        Self {
            prefix: prefix.into(),
            max_age,
            assets: HashMap::new(),
        }
    }

    /// Register `asset` at `path`, relative to the prefix.
    pub fn insert(mut self, path: &str, asset: Asset) -> Self {
        let full = format!(
            "{}/{}",
            self.prefix.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        tracing::debug!(path = %full, media_type = %asset.media_type, bytes = asset.body.len(), "Asset registered");
        self.assets.insert(full, asset);
        self
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    /// Load the assets listed in configuration. Relative files resolve against
    /// `base_dir`.
    pub fn from_config(config: &ResourcesConfig, base_dir: &Path) -> Result<Self, ContentError> {
        let mut resources = Self::new(config.prefix.clone(), config.max_age_secs);
        for entry in &config.assets {
            let path = if entry.file.is_absolute() {
                entry.file.clone()
            } else {
                base_dir.join(&entry.file)
            };
            let bytes = std::fs::read(&path).map_err(|source| ContentError::Io {
                path: path.clone(),
                source,
            })?;
            let media_type = entry
                .media_type
                .clone()
                .unwrap_or_else(|| media_type_for(&path).to_string());
            resources = resources.insert(&entry.path, Asset::new(media_type, bytes));
        }
        tracing::info!(prefix = %resources.prefix, assets = resources.len(), "Resources loaded");
        Ok(resources)
    }
}

impl ResourceInterceptor for MemoryResources {
    fn intercept(&self, request: &HttpRequest, accept: &NegotiationList) -> Option<HttpResponse> {
        let method = request.method();
        if *method != Method::GET && *method != Method::HEAD {
            return None;
        }
        if !request.path().starts_with(&self.prefix) {
            return None;
        }
        let asset = self.assets.get(request.path())?;

        let acceptable = accept
            .values()
            .filter_map(MediaRange::parse)
            .any(|range| range.matches(&asset.media_type));
        if !acceptable {
            tracing::debug!(path = %request.path(), media_type = %asset.media_type, "Asset not acceptable to client");
            return None;
        }

        let last_modified = asset.last_modified.as_deref();
        if !request.is_modified(Some(&asset.etag), last_modified) {
            return Some(HttpResponse::new().not_modified(Some(&asset.etag), last_modified));
        }

        Some(
            HttpResponse::new()
                .status(StatusCode::OK)
                .content_type(&asset.media_type)
                .cache_for(self.max_age, Some(&asset.etag), last_modified)
                .body(asset.body.clone()),
        )
    }
}
