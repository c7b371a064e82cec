//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the axum Router whose fallback feeds every request to the dispatcher
//! - Wire up middleware (timeout, request ID, tracing)
//! - Buffer request bodies up to the configured limit
//! - Bind server to listener and shut down gracefully

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::ServerConfig;
use crate::dispatch::Dispatcher;
use crate::http::request::{RequestUuid, X_REQUEST_ID};
use crate::http::{HttpRequest, HttpResponse};
use crate::lifecycle::shutdown::wait_for;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub max_body_bytes: usize,
    pub log_exchanges: bool,
}

/// HTTP server in front of the dispatcher.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(config: &ServerConfig, dispatcher: Arc<Dispatcher>) -> Self {
        let state = AppState {
            dispatcher,
            max_body_bytes: config.listener.max_body_bytes,
            log_exchanges: config.observability.log_exchanges,
        };
        Self {
            router: Self::build_router(config, state),
        }
    }

    /// Build the axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ServerConfig, state: AppState) -> Router {
        let request_id = HeaderName::from_static(X_REQUEST_ID);
        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::new(request_id.clone()))
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::new(request_id, RequestUuid))
    }

    /// The router, for driving the server in-process.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: broadcast::Receiver<()>) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(wait_for(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Buffer the body, build an `HttpRequest` and dispatch it.
async fn dispatch_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();
    let request_id = parts
        .headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let declared = parts
        .headers
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    if declared.is_some_and(|len| len > state.max_body_bytes as u64) {
        tracing::warn!(request_id = %request_id, declared = ?declared, "Request body too large");
        return HttpResponse::new()
            .status(StatusCode::PAYLOAD_TOO_LARGE)
            .text("Payload Too Large")
            .into_response();
    }

    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(request_id = %request_id, error = %e, "Failed to read request body");
            return HttpResponse::new()
                .status(StatusCode::PAYLOAD_TOO_LARGE)
                .text("Payload Too Large")
                .into_response();
        }
    };

    let request = HttpRequest::from_parts(parts, bytes);
    if state.log_exchanges {
        tracing::debug!(
            request_id = %request_id,
            method = %request.method(),
            path = %request.path(),
            headers = request.headers().len(),
            "Request received"
        );
    }

    let response = state.dispatcher.dispatch(request).await;
    if state.log_exchanges {
        tracing::debug!(
            request_id = %request_id,
            status = ?response.status_code(),
            bytes = response.body_bytes().map(|b| b.len()).unwrap_or(0),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Response committed"
        );
    }
    response.into_response()
}
