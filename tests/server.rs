//! End-to-end tests through the HTTP server.

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use concierge::config::ServerConfig;
use concierge::http::HttpServer;
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

mod common;

use common::{dispatcher, greeting_view, start_server, text_view};

fn app_dispatcher() -> concierge::Dispatcher {
    dispatcher(|routes| {
        routes.register("^/greeting$", Method::GET, greeting_view()).unwrap();
        routes.register("^/items$", Method::POST, text_view("items", "*/*", "stored")).unwrap();
    })
}

#[tokio::test]
async fn test_localized_content_over_http() {
    let config = ServerConfig::default();
    let (addr, shutdown) = start_server(&config, app_dispatcher()).await;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("http://{}/greeting", addr))
        .header("accept-language", "en-GB")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert!(response.headers().contains_key("x-request-id"));
    assert_eq!(response.headers()["content-type"], "text/plain; charset=UTF-8");
    assert_eq!(response.text().await.unwrap(), "B");

    let response = client
        .post(format!("http://{}/items", addr))
        .json(&json!({"name": "kettle"}))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await.unwrap(), "stored");

    let response = client.get(format!("http://{}/nowhere", addr)).send().await.unwrap();
    assert_eq!(response.status(), 404);

    shutdown.trigger();
}

#[tokio::test]
async fn test_form_body_is_parsed() {
    let config = ServerConfig::default();
    let d = dispatcher(|routes| {
        let echo = concierge::HandlerSet::builder("echo")
            .on("application/json", |ex: concierge::Exchange| async move {
                let body = ex.request.body().cloned().unwrap_or_default();
                ex.response.ok().json(&body)
            })
            .build()
            .unwrap();
        routes.register("^/echo$", Method::POST, echo).unwrap();
    });
    let (addr, shutdown) = start_server(&config, d).await;

    let response = reqwest::Client::new()
        .post(format!("http://{}/echo", addr))
        .header("content-type", "application/x-www-form-urlencoded")
        .header("accept", "application/json")
        .body("name=kettle&size=2")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), 200);
    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body, json!({"name": "kettle", "size": "2"}));

    shutdown.trigger();
}

#[tokio::test]
async fn test_oversized_body_closes_connection() {
    let mut config = ServerConfig::default();
    config.listener.max_body_bytes = 16;
    let router = HttpServer::new(&config, Arc::new(app_dispatcher())).router();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/items")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, "40")
        .body(Body::from(r#"{"name": "a much longer kettle name"}"#.to_string() + "   "))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.headers()[header::CONNECTION], "close");
}

#[tokio::test]
async fn test_request_id_is_propagated() {
    let config = ServerConfig::default();
    let router = HttpServer::new(&config, Arc::new(app_dispatcher())).router();

    let request = Request::builder()
        .uri("/greeting")
        .header("x-request-id", "req-123")
        .body(Body::empty())
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-request-id"], "req-123");

    let request = Request::builder().uri("/greeting").body(Body::empty()).unwrap();
    let response = router.oneshot(request).await.unwrap();
    let generated = response.headers()["x-request-id"].to_str().unwrap();
    assert_eq!(generated.len(), 36);
}

#[tokio::test]
async fn test_missing_length_is_rejected() {
    let config = ServerConfig::default();
    let router = HttpServer::new(&config, Arc::new(app_dispatcher())).router();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/items")
        .body(Body::empty())
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::LENGTH_REQUIRED);
}
