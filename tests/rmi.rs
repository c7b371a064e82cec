//! Remote method invocation through the dispatcher.

use axum::http::{HeaderName, Method, StatusCode};
use concierge::dispatch::RmiCall;
use concierge::http::HttpRequest;
use concierge::view::{Exchange, HandlerSet, PreRequest};
use serde_json::{json, Value};

mod common;

use common::{body_json, body_text, dispatcher, post_json};

fn rmi(path: &str, method: &str, selector: &str, args: Value) -> HttpRequest {
    post_json(path, args)
        .with_header(HeaderName::from_static("x-rmi-method"), method)
        .with_header(HeaderName::from_static("x-rmi-route-method"), selector)
}

fn model_view() -> HandlerSet {
    HandlerSet::builder("model")
        .on("application/json", |ex: Exchange| async move { ex.response.ok().body("plain") })
        .on_rmi("save", |call: RmiCall| async move {
            let first = call.request.arg(0).cloned().unwrap_or_default();
            let id = call.request.param("id").unwrap_or("none").to_string();
            call.reply.send(vec![json!("saved"), first, json!(id)])
        })
        .on_rmi("remove", |call: RmiCall| async move { call.reply.fail(StatusCode::CONFLICT) })
        .on_rmi("update", |call: RmiCall| async move { call.reply.send(vec![]) })
        .rmi_accept(["save", "remove"])
        .build()
        .unwrap()
}

#[tokio::test]
async fn test_accepted_method_is_invoked() {
    let d = dispatcher(|routes| {
        routes.register("^/models/(?P<id>[0-9]+)$", Method::GET, model_view()).unwrap();
    });

    let response = d.dispatch(rmi("/models/9", "save", "get", json!([{"a": 1}]))).await;
    assert_eq!(response.status_code(), Some(StatusCode::OK));
    assert_eq!(body_json(&response), json!(["saved", {"a": 1}, "9"]));

    let response = d.dispatch(rmi("/models/9", "remove", "GET", json!([]))).await;
    assert_eq!(response.status_code(), Some(StatusCode::CONFLICT));
}

#[tokio::test]
async fn test_method_off_the_accept_list_is_unknown() {
    let d = dispatcher(|routes| {
        routes.register("^/models/(?P<id>[0-9]+)$", Method::GET, model_view()).unwrap();
    });

    let response = d.dispatch(rmi("/models/9", "update", "GET", json!([]))).await;
    assert_eq!(response.status_code(), Some(StatusCode::NOT_FOUND));

    let response = d.dispatch(rmi("/models/9", "destroy", "GET", json!([]))).await;
    assert_eq!(response.status_code(), Some(StatusCode::NOT_FOUND));
}

#[tokio::test]
async fn test_arguments_must_be_an_array() {
    let d = dispatcher(|routes| {
        routes.register("^/models/(?P<id>[0-9]+)$", Method::GET, model_view()).unwrap();
    });

    let response = d.dispatch(rmi("/models/9", "save", "GET", json!({"a": 1}))).await;
    assert_eq!(response.status_code(), Some(StatusCode::BAD_REQUEST));
}

#[tokio::test]
async fn test_selector_picks_the_route() {
    let reader = HandlerSet::builder("reader")
        .on_rmi("which", |call: RmiCall| async move { call.reply.send(vec![json!("get")]) })
        .rmi_accept(["which"])
        .build()
        .unwrap();
    let writer = HandlerSet::builder("writer")
        .on_rmi("which", |call: RmiCall| async move { call.reply.send(vec![json!("put")]) })
        .rmi_accept(["which"])
        .build()
        .unwrap();
    let d = dispatcher(|routes| {
        routes.register("^/thing$", Method::GET, reader).unwrap();
        routes.register("^/thing$", Method::PUT, writer).unwrap();
    });

    let response = d.dispatch(rmi("/thing", "which", "PUT", json!([]))).await;
    assert_eq!(body_json(&response), json!(["put"]));

    let response = d.dispatch(rmi("/thing", "which", "GET", json!([]))).await;
    assert_eq!(body_json(&response), json!(["get"]));

    let response = d.dispatch(rmi("/thing", "which", "DELETE", json!([]))).await;
    assert_eq!(response.status_code(), Some(StatusCode::METHOD_NOT_ALLOWED));
}

#[tokio::test]
async fn test_only_post_carries_rmi() {
    let d = dispatcher(|routes| {
        routes.register("^/models/(?P<id>[0-9]+)$", Method::GET, model_view()).unwrap();
    });

    let request = HttpRequest::new(Method::GET, "/models/9")
        .with_header(HeaderName::from_static("x-rmi-method"), "save")
        .with_header(HeaderName::from_static("x-rmi-route-method"), "GET");
    let response = d.dispatch(request).await;
    assert_eq!(body_text(&response), "plain");

    // Only one of the two headers: an ordinary POST.
    let request = post_json("/models/9", json!([]))
        .with_header(HeaderName::from_static("x-rmi-method"), "save");
    let response = d.dispatch(request).await;
    assert_eq!(response.status_code(), Some(StatusCode::METHOD_NOT_ALLOWED));
}

#[tokio::test]
async fn test_pre_request_hook_runs_for_rmi() {
    let guarded = HandlerSet::builder("guarded")
        .pre_request(|request: &HttpRequest| {
            let allowed = request.cookie("session").is_some();
            async move {
                if allowed {
                    PreRequest::Continue(json!("session"))
                } else {
                    PreRequest::Respond(concierge::HttpResponse::new().status(StatusCode::FORBIDDEN))
                }
            }
        })
        .on_rmi("whoami", |call: RmiCall| async move {
            let prelude = call.prelude.unwrap_or_default();
            call.reply.send(vec![prelude])
        })
        .rmi_accept(["whoami"])
        .build()
        .unwrap();
    let d = dispatcher(|routes| {
        routes.register("^/me$", Method::GET, guarded).unwrap();
    });

    let response = d.dispatch(rmi("/me", "whoami", "GET", json!([]))).await;
    assert_eq!(response.status_code(), Some(StatusCode::FORBIDDEN));

    let request = rmi("/me", "whoami", "GET", json!([]))
        .with_header(axum::http::header::COOKIE, "session=abc");
    let response = d.dispatch(request).await;
    assert_eq!(body_json(&response), json!(["session"]));
}
