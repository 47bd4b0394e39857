#![allow(missing_docs)]

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use serde_json::{Value, json};
use toolbridge_server::{AppState, McpService, SESSION_ID_HEADER, create_router};
use toolbridge_session::{RoutingPolicy, SessionRouter};
use toolbridge_tools::{MemoryRecordStore, builtin_tools};
use tower::ServiceExt;

fn app(policy: RoutingPolicy) -> Router {
    let session = Arc::new(SessionRouter::new(policy));
    let store = Arc::new(MemoryRecordStore::new());
    let registry = builtin_tools(Arc::clone(&session), store, None, None);
    let service = Arc::new(McpService::new(Arc::new(registry)));
    create_router(AppState { session, service })
}

fn rpc(id: i64, method: &str, params: Value) -> Value {
    json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params})
}

async fn post(app: &Router, session_id: Option<&str>, body: &Value) -> (StatusCode, Option<String>, Value) {
    let mut request = Request::post("/mcp").header(header::CONTENT_TYPE, "application/json");
    if let Some(id) = session_id {
        request = request.header(SESSION_ID_HEADER, id);
    }
    let response = app
        .clone()
        .oneshot(request.body(Body::from(body.to_string())).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let session = response
        .headers()
        .get(SESSION_ID_HEADER)
        .map(|v| v.to_str().unwrap().to_string());
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, session, body)
}

async fn initialize(app: &Router) -> String {
    let (status, session, body) = post(app, None, &rpc(1, "initialize", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["serverInfo"]["name"], "toolbridge");
    session.expect("initialize must assign a session id")
}

#[tokio::test]
async fn initialize_assigns_session_and_reports_protocol() {
    let app = app(RoutingPolicy::ExplicitOnly);
    let (status, session, body) = post(&app, None, &rpc(1, "initialize", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(session.is_some());
    assert_eq!(body["result"]["protocolVersion"], "2024-11-05");
}

#[tokio::test]
async fn non_initialize_without_session_is_rejected() {
    let app = app(RoutingPolicy::ExplicitOnly);
    let (status, _, body) = post(&app, None, &rpc(1, "tools/list", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], -32000);
}

#[tokio::test]
async fn unknown_session_is_rejected() {
    let app = app(RoutingPolicy::ExplicitOnly);
    let (status, _, body) = post(&app, Some("nope"), &rpc(1, "tools/list", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Unknown session"));
}

#[tokio::test]
async fn full_handshake_and_tool_call() {
    let app = app(RoutingPolicy::ExplicitOnly);
    let session = initialize(&app).await;

    let notification = json!({
        "jsonrpc": "2.0",
        "method": "notifications/initialized",
    });
    let (status, _, body) = post(&app, Some(&session), &notification).await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body, Value::Null);

    let call = rpc(
        2,
        "tools/call",
        json!({"name": "calculator", "arguments": {"expression": "2 + 2"}}),
    );
    let (status, _, body) = post(&app, Some(&session), &call).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["content"][0]["text"], "2 + 2 = 4");
}

#[tokio::test]
async fn fallback_policy_routes_headerless_messages() {
    let app = app(RoutingPolicy::SingleTenantFallback);
    initialize(&app).await;

    let (status, _, body) = post(&app, None, &rpc(2, "tools/list", json!({}))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["result"]["tools"].as_array().is_some_and(|t| !t.is_empty()));
}

#[tokio::test]
async fn delete_closes_session() {
    let app = app(RoutingPolicy::ExplicitOnly);
    let session = initialize(&app).await;

    let response = app
        .clone()
        .oneshot(
            Request::delete("/mcp")
                .header(SESSION_ID_HEADER, session.as_str())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let (status, _, _) = post(&app, Some(&session), &rpc(2, "ping", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_without_known_session_is_rejected() {
    let app = app(RoutingPolicy::ExplicitOnly);
    let response = app
        .oneshot(Request::delete("/mcp").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn event_stream_claims_once() {
    let app = app(RoutingPolicy::ExplicitOnly);
    let session = initialize(&app).await;

    let get = |app: &Router| {
        app.clone().oneshot(
            Request::get("/mcp")
                .header(SESSION_ID_HEADER, session.as_str())
                .body(Body::empty())
                .unwrap(),
        )
    };

    let first = get(&app).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let content_type = first.headers().get(header::CONTENT_TYPE).unwrap();
    assert!(content_type.to_str().unwrap().starts_with("text/event-stream"));

    let second = get(&app).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn malformed_body_is_a_parse_error() {
    let app = app(RoutingPolicy::ExplicitOnly);
    let response = app
        .oneshot(
            Request::post("/mcp")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"]["code"], -32700);
}

#[tokio::test]
async fn index_reports_server_identity() {
    let app = app(RoutingPolicy::ExplicitOnly);
    let response = app
        .oneshot(Request::get("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["name"], "toolbridge");
    assert_eq!(body["status"], "ready");
}
