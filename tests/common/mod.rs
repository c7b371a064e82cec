//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{header, Method};
use concierge::config::{DispatchConfig, ServerConfig};
use concierge::dispatch::Dispatcher;
use concierge::http::{HttpRequest, HttpResponse, HttpServer};
use concierge::lifecycle::Shutdown;
use concierge::routing::RouteTableBuilder;
use concierge::view::{ContentMatrix, Exchange, HandlerSet};
use serde_json::Value;
use tokio::net::TcpListener;

/// Build a dispatcher with default protocol settings from registered routes.
pub fn dispatcher<F>(register: F) -> Dispatcher
where
    F: FnOnce(&mut RouteTableBuilder<HandlerSet>),
{
    let mut routes = RouteTableBuilder::new();
    register(&mut routes);
    Dispatcher::new(
        routes.build(),
        DispatchConfig::default(),
        vec!["en-us".to_string(), "*".to_string()],
    )
}

/// A handler set answering `media_type` with a fixed text body.
pub fn text_view(name: &str, media_type: &str, body: &'static str) -> HandlerSet {
    HandlerSet::builder(name)
        .on(media_type, move |ex: Exchange| async move { ex.response.ok().body(body) })
        .build()
        .unwrap()
}

/// The greeting matrix: en-us → A, en → B, fr-fr → C.
pub fn greeting_view() -> HandlerSet {
    HandlerSet::builder("greeting")
        .content(
            ContentMatrix::builder()
                .block("greeting", "en-us", "text/plain", "A")
                .block("greeting", "en", "text/plain", "B")
                .block("greeting", "fr-fr", "text/plain", "C"),
        )
        .render_on("text/plain")
        .build()
        .unwrap()
}

pub fn get(path: &str) -> HttpRequest {
    HttpRequest::new(Method::GET, path)
}

pub fn get_accepting(path: &str, accept: &str) -> HttpRequest {
    get(path).with_header(header::ACCEPT, accept)
}

/// A POST with a JSON body and a matching Content-Length.
pub fn post_json(path: &str, body: Value) -> HttpRequest {
    let length = serde_json::to_vec(&body).unwrap().len();
    HttpRequest::new(Method::POST, path)
        .with_header(header::CONTENT_TYPE, "application/json")
        .with_header(header::CONTENT_LENGTH, &length.to_string())
        .with_body(body)
}

pub fn body_text(response: &HttpResponse) -> String {
    response
        .body_bytes()
        .map(|b| String::from_utf8(b.to_vec()).unwrap())
        .unwrap_or_default()
}

pub fn body_json(response: &HttpResponse) -> Value {
    serde_json::from_slice(response.body_bytes().expect("response has no body")).unwrap()
}

/// Serve `dispatcher` on an ephemeral port. Dropping the returned
/// `Shutdown` does not stop the server; call `trigger()`.
pub async fn start_server(config: &ServerConfig, dispatcher: Dispatcher) -> (SocketAddr, Arc<Shutdown>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Arc::new(Shutdown::new());
    let server = HttpServer::new(config, Arc::new(dispatcher));
    let rx = shutdown.subscribe();
    tokio::spawn(async move {
        server.run(listener, rx).await.unwrap();
    });
    (addr, shutdown)
}
