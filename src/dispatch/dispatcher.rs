//! The dispatch state machine.
//!
//! # Responsibilities
//! - Give the resource interceptor first refusal
//! - Enforce declared lengths and bodies on POST/PUT/PATCH
//! - Route, negotiate a variant, run the pre-request hook and the producer
//! - Follow internal redirects up to a hop limit
//!
//! # Design Decisions
//! - One immutable `Dispatcher` shared behind an `Arc` by every connection
//! - The response locale is negotiated before routing so producers and error
//!   paths see the same value

use std::sync::Arc;
use std::time::Instant;

use axum::http::{header, Method, StatusCode};

use crate::config::DispatchConfig;
use crate::dispatch::{rmi, run_pre_request, DispatchError};
use crate::http::request::carries_body;
use crate::http::{HttpRequest, HttpResponse};
use crate::negotiation::{MediaRange, NegotiationError, NegotiationList, ANY_MEDIA_TYPE};
use crate::observability::metrics;
use crate::resources::{NoResources, ResourceInterceptor};
use crate::routing::{RouteMatch, RouteTable};
use crate::view::{Exchange, HandlerSet, Producer, PROXY_MEDIA_TYPE};

pub struct Dispatcher {
    routes: RouteTable<HandlerSet>,
    resources: Arc<dyn ResourceInterceptor>,
    config: DispatchConfig,
    default_locales: Vec<String>,
}

impl Dispatcher {
    /// `default_locales` is the response locale list used when a request
    /// carries no `Accept-Language`.
    pub fn new(routes: RouteTable<HandlerSet>, config: DispatchConfig, default_locales: Vec<String>) -> Self {
        Self {
            routes,
            resources: Arc::new(NoResources),
            config,
            default_locales,
        }
    }

    pub fn with_resources(mut self, resources: Arc<dyn ResourceInterceptor>) -> Self {
        self.resources = resources;
        self
    }

    pub fn routes(&self) -> &RouteTable<HandlerSet> {
        &self.routes
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Dispatch one request to completion.
    pub async fn dispatch(&self, request: HttpRequest) -> HttpResponse {
        let start = Instant::now();
        let mut request = request;
        let mut hops: u32 = 0;

        loop {
            if let Some(response) = self.intercept(&request) {
                record(&response, "resource", start);
                return response;
            }

            let method = request.method().clone();
            let path = request.path().to_string();
            let (mut response, outcome) = match self.dispatch_once(request).await {
                Ok(response) => (response, "dispatched"),
                Err(err) => {
                    tracing::debug!(method = %method, path = %path, error = %err, "Dispatch failed");
                    let outcome = err.outcome();
                    (err.into_response(), outcome)
                }
            };

            let Some(next) = response.take_redirect() else {
                record(&response, outcome, start);
                return response;
            };

            hops += 1;
            if hops > self.config.max_redirects {
                tracing::error!(path = %path, hops, "Internal redirect loop");
                let err = DispatchError::RedirectLimit(self.config.max_redirects);
                let outcome = err.outcome();
                let response = err.into_response();
                record(&response, outcome, start);
                return response;
            }
            tracing::debug!(from = %path, to = %next.path(), hops, "Following internal redirect");
            request = next;
        }
    }

    /// Serve `target` as a GET carrying the headers of `request`.
    pub async fn redirect(&self, request: &HttpRequest, target: &str) -> HttpResponse {
        self.dispatch(request.clone().rewrite(Method::GET, target)).await
    }

    fn intercept(&self, request: &HttpRequest) -> Option<HttpResponse> {
        let accept = request.accept().ok()?;
        let response = self.resources.intercept(request, &accept)?;
        tracing::debug!(path = %request.path(), "Request served by resource interceptor");
        Some(response)
    }

    async fn dispatch_once(&self, mut request: HttpRequest) -> Result<HttpResponse, DispatchError> {
        let mut response = HttpResponse::new();
        response.set_locale(self.response_locale(&request));

        if carries_body(request.method()) {
            self.check_body(&request)?;
        }

        let accept = if self.is_proxy_request(&request) {
            tracing::debug!(path = %request.path(), "Client proxy requested");
            Ok(NegotiationList::from_values([PROXY_MEDIA_TYPE]))
        } else {
            request.accept()
        };

        if *request.method() == Method::POST {
            if let Some((method_name, selector)) = rmi::envelope(&request, &self.config) {
                return rmi::dispatch(&self.routes, request, response, method_name, selector).await;
            }
        }

        let path = request.path().to_string();
        let (handlers, pattern) = match self.routes.match_route(&path, request.method()) {
            RouteMatch::Found { handlers, pattern } => (Arc::clone(handlers), pattern),
            RouteMatch::MethodNotAllowed { allowed } => {
                return Err(DispatchError::MethodMiss {
                    method: request.method().clone(),
                    path,
                    allowed,
                })
            }
            RouteMatch::NotFound => return Err(DispatchError::RoutingMiss { path }),
        };
        request.set_params(pattern.captures(&path));

        let producer = select_variant(&handlers, accept)?;
        response.set_content(handlers.content().cloned());

        let prelude = match run_pre_request(&handlers, &request).await {
            Ok(prelude) => prelude,
            Err(response) => return Ok(response),
        };

        tracing::debug!(handler = %handlers.name(), path = %path, "Invoking producer");
        let response = producer(Exchange {
            request,
            response,
            prelude,
        })
        .await;
        Ok(response)
    }

    /// Locale list the response renders for. `None` when the header is
    /// unparseable, leaving the content matrix default in charge.
    fn response_locale(&self, request: &HttpRequest) -> Option<Vec<String>> {
        if request.header(header::ACCEPT_LANGUAGE).is_none() {
            return Some(self.default_locales.clone());
        }
        match request.locale() {
            Ok(list) => Some(list.to_vec()),
            Err(e) => {
                tracing::debug!(error = %e, "Ignoring malformed Accept-Language");
                None
            }
        }
    }

    fn check_body(&self, request: &HttpRequest) -> Result<(), DispatchError> {
        let raw = request
            .header(header::CONTENT_LENGTH)
            .ok_or(DispatchError::LengthMissing)?;
        let length: u64 = raw
            .trim()
            .parse()
            .map_err(|_| DispatchError::LengthInvalid(raw.to_string()))?;

        if length > 0 && request.body().is_none() {
            return Err(DispatchError::BodyRequiredMissing {
                supported: self.config.body_content_types.clone(),
            });
        }
        Ok(())
    }

    fn is_proxy_request(&self, request: &HttpRequest) -> bool {
        let method = request.method();
        if *method != Method::GET && *method != Method::HEAD {
            return false;
        }
        request
            .query(&self.config.proxy_query_key)
            .is_some_and(|value| self.config.proxy_query_values.iter().any(|v| v == value))
    }
}

/// Pick the producer for the client's Accept list.
///
/// Exact keys win in Accept order; partial wildcards (`text/*`) match the
/// registered concrete types. `*/*` anywhere falls back to the first
/// registered concrete type. An explicit `*/*` producer catches the rest.
fn select_variant(
    handlers: &HandlerSet,
    accept: Result<NegotiationList, NegotiationError>,
) -> Result<Producer, DispatchError> {
    let acceptable = || {
        handlers
            .negotiable_media_types()
            .map(String::from)
            .collect::<Vec<_>>()
    };

    let accept = match accept {
        Ok(accept) => accept,
        Err(e) => {
            tracing::debug!(handler = %handlers.name(), error = %e, "Cannot negotiate");
            return Err(DispatchError::NegotiationMiss {
                acceptable: acceptable(),
            });
        }
    };

    let mut accept_any = false;
    for candidate in accept.values() {
        if let Some(producer) = handlers.producer(candidate) {
            return Ok(Arc::clone(producer));
        }
        if candidate == ANY_MEDIA_TYPE {
            accept_any = true;
            continue;
        }
        let Some(range) = MediaRange::parse(candidate).filter(MediaRange::is_wildcard) else {
            continue;
        };
        let matched = handlers
            .negotiable_media_types()
            .find(|media_type| range.matches(media_type))
            .and_then(|media_type| handlers.producer(media_type));
        if let Some(producer) = matched {
            return Ok(Arc::clone(producer));
        }
    }

    if accept_any {
        let first = handlers
            .negotiable_media_types()
            .next()
            .and_then(|media_type| handlers.producer(media_type));
        if let Some(producer) = first {
            return Ok(Arc::clone(producer));
        }
    }

    if let Some(producer) = handlers.producer(ANY_MEDIA_TYPE) {
        return Ok(Arc::clone(producer));
    }

    let acceptable = acceptable();
    tracing::debug!(
        handler = %handlers.name(),
        accept = ?accept.to_vec(),
        acceptable = ?acceptable,
        "No acceptable variant"
    );
    Err(DispatchError::NegotiationMiss { acceptable })
}

fn record(response: &HttpResponse, outcome: &'static str, start: Instant) {
    let status = response
        .status_code()
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    metrics::record_dispatch(outcome, status.as_u16(), start);
}
