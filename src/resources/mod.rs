//! Resource interception ahead of dispatch.
//!
//! An interceptor sees every request before route matching and may answer it
//! outright (static assets, health checks). Returning `None` hands the request
//! to the dispatcher.

pub mod memory;

use crate::http::{HttpRequest, HttpResponse};
use crate::negotiation::NegotiationList;

pub use memory::{Asset, MemoryResources};

pub trait ResourceInterceptor: Send + Sync {
    fn intercept(&self, request: &HttpRequest, accept: &NegotiationList) -> Option<HttpResponse>;
}

/// Interceptor that never answers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResources;

impl ResourceInterceptor for NoResources {
    fn intercept(&self, _request: &HttpRequest, _accept: &NegotiationList) -> Option<HttpResponse> {
        None
    }
}
