use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use dmchannel::api::AppState;
use dmchannel::server::route_builder::build_router;
use dmchannel::store::{MemoryDocumentStore, MemoryRealtimeStore};
use dmchannel::utils::jwt::JwtService;
use dmchannel::websocket::connection::ConnectionManager;

const SECRET: &str = "test-secret";

fn app() -> Router {
    let state = Arc::new(AppState {
        realtime: Arc::new(MemoryRealtimeStore::new()),
        documents: Arc::new(MemoryDocumentStore::new()),
        jwt_service: Arc::new(JwtService::new(SECRET)),
        ws_manager: Arc::new(ConnectionManager::new()),
    });
    build_router(state)
}

fn bearer(user_id: &str) -> String {
    let token = JwtService::new(SECRET)
        .generate_token(user_id, chrono::Duration::hours(1))
        .unwrap();
    format!("Bearer {}", token)
}

async fn call(app: &Router, method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(header::AUTHORIZATION, bearer(user));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn health_is_public() {
    let app = app();
    let response = app
        .oneshot(Request::builder().uri("/api/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn dm_routes_require_a_token() {
    let app = app();
    let (status, _) = call(&app, "GET", "/api/dms", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn forged_user_header_is_ignored() {
    let app = app();
    let request = Request::builder()
        .uri("/api/dms")
        .header("x-user-id", "u1")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn conversation_over_http() {
    let app = app();

    let (status, _) = call(
        &app,
        "PUT",
        "/api/users/me",
        Some("u1"),
        Some(json!({"name": "Ana", "email": "ana@example.com"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, opened) = call(&app, "POST", "/api/dms", Some("u2"), Some(json!({"otherUserId": "u1"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(opened["channelId"], json!("u1_u2"));
    assert_eq!(opened["otherUser"]["name"], json!("Ana"));

    let (status, sent) = call(&app, "POST", "/api/dms/u2/messages", Some("u1"), Some(json!({"text": "hello"}))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(sent["sender"], json!("u1"));
    assert_eq!(sent["seen"], json!(false));

    let (status, _) = call(&app, "POST", "/api/dms/u2/messages", Some("u1"), Some(json!({"text": "  "}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, list) = call(&app, "GET", "/api/dms", Some("u2"), None).await;
    assert_eq!(list[0]["id"], json!("u1_u2"));
    assert_eq!(list[0]["unreadCount"], json!(1));
    assert_eq!(list[0]["otherUserId"], json!("u1"));

    let (_, marked) = call(&app, "POST", "/api/dms/u1/seen", Some("u2"), None).await;
    assert_eq!(marked["marked"], json!(1));

    let (_, messages) = call(&app, "GET", "/api/dms/u1/messages", Some("u2"), None).await;
    assert_eq!(messages[0]["text"], json!("hello"));
    assert_eq!(messages[0]["seen"], json!(true));

    let (_, found) = call(&app, "GET", "/api/users?email=ana@example.com", Some("u2"), None).await;
    assert_eq!(found[0]["id"], json!("u1"));
}

#[tokio::test]
async fn self_conversation_is_refused() {
    let app = app();
    let (status, _) = call(&app, "POST", "/api/dms", Some("u1"), Some(json!({"otherUserId": "u1"}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_user_is_not_found() {
    let app = app();
    let (status, _) = call(&app, "GET", "/api/users/nobody", Some("u1"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
