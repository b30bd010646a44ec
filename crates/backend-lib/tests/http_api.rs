//! Router-level tests driven with `tower::ServiceExt::oneshot`

mod test_utils;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use inkwell_backend_lib::create_router;
use inkwell_common::{TokenPair, UserStatus, UserView};
use serde_json::{json, Value};
use test_utils::*;
use tower::ServiceExt;

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    bearer: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut request = Request::builder().method(method).uri(uri);
    if let Some(token) = bearer {
        request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let body = match body {
        Some(value) => {
            request = request.header(header::CONTENT_TYPE, "application/json");
            Body::from(value.to_string())
        },
        None => Body::empty(),
    };

    let response = app.clone().oneshot(request.body(body).unwrap()).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn login(app: &Router, identifier: &str, password: &str) -> TokenPair {
    let (status, body) = send(
        app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "identifier": identifier, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {body}");
    serde_json::from_value(body).unwrap()
}

#[tokio::test]
async fn test_register_activate_login() {
    let h = harness();
    let app = create_router(h.state.clone());

    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": "alice", "email": "alice@x.com", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let user: UserView = serde_json::from_value(body.clone()).unwrap();
    assert_eq!(user.status, UserStatus::Inactive);
    assert!(body.get("password_digest").is_none());

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "identifier": "alice", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_002");

    let link = h.outbox.messages()[0].body.clone();
    let path = link.trim_start_matches("http://localhost:8080");
    let (status, _) = send(&app, "GET", path, None, None).await;
    assert_eq!(status, StatusCode::OK);

    let pair = login(&app, "alice@x.com", PASSWORD).await;
    assert!(!pair.access.is_empty());
}

#[tokio::test]
async fn test_error_bodies() {
    let h = harness();
    let app = create_router(h.state.clone());
    register_active(&h.state, "alice").await;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": "alice", "email": "new@x.com", "password": PASSWORD })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT_001");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/register",
        None,
        Some(json!({ "username": "bob", "email": "bob@x.com", "password": "weak" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VAL_004");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/login",
        None,
        Some(json!({ "identifier": "alice", "password": "Wr0ngPass!" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["message"], "invalid credentials");

    let (status, _) = send(&app, "GET", "/user/99/activate", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_refresh_and_logout() {
    let h = harness();
    let app = create_router(h.state.clone());
    register_active(&h.state, "alice").await;
    let pair = login(&app, "alice", PASSWORD).await;

    let (status, body) = send(&app, "POST", "/auth/refresh", Some(&pair.refresh), None).await;
    assert_eq!(status, StatusCode::OK);
    let rotated: TokenPair = serde_json::from_value(body).unwrap();

    // Consumed refresh token cannot be replayed
    let (status, _) = send(&app, "POST", "/auth/refresh", Some(&pair.refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Access tokens are not refresh tokens
    let (status, _) = send(&app, "POST", "/auth/refresh", Some(&rotated.access), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        "POST",
        "/auth/logout",
        Some(&rotated.access),
        Some(json!({ "refresh": rotated.refresh })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(&app, "POST", "/auth/refresh", Some(&rotated.refresh), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, "POST", "/user/1/password", Some(&rotated.access), Some(json!({
        "old_password": PASSWORD,
        "new_password": "NewPass1!",
    })))
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_owner_only_password_change() {
    let h = harness();
    let app = create_router(h.state.clone());
    register_active(&h.state, "alice").await;
    register_active(&h.state, "bob").await;
    let alice = login(&app, "alice", PASSWORD).await;

    let change = json!({ "old_password": PASSWORD, "new_password": "NewPass1!" });

    let (status, _) = send(&app, "POST", "/user/2/password", Some(&alice.access), Some(change.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(&app, "POST", "/user/1/password", None, Some(change.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, "POST", "/user/1/password", Some(&alice.access), Some(change)).await;
    assert_eq!(status, StatusCode::OK);
    login(&app, "alice", "NewPass1!").await;
}

#[tokio::test]
async fn test_admin_routes() {
    let h = harness();
    let app = create_router(h.state.clone());
    let root = register_active(&h.state, "root").await;
    register_active(&h.state, "alice").await;
    h.state.sessions.promote(&root.id.to_string()).await.unwrap();

    let admin = login(&app, "root", PASSWORD).await;
    let user = login(&app, "alice", PASSWORD).await;

    let (status, body) = send(&app, "POST", "/user/2/promote", Some(&user.access), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "AUTHZ_002");

    let (status, _) = send(&app, "POST", "/user/2/promote", Some(&admin.access), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "POST", "/user/2/demote", Some(&admin.access), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = send(&app, "POST", "/user/abc/demote", Some(&admin.access), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_forgot_password_link_flow() {
    let h = harness();
    let app = create_router(h.state.clone());
    register_active(&h.state, "alice").await;

    let (status, _) = send(
        &app,
        "POST",
        "/password/forgot",
        None,
        Some(json!({ "email": "nobody@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        "POST",
        "/password/forgot",
        None,
        Some(json!({ "email": "alice@x.com" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let link = h.outbox.messages().last().unwrap().body.clone();
    let path = link.trim_start_matches("http://localhost:8080").to_string();
    let update = json!({ "new_password": "NewPass1!" });

    let (status, body) = send(&app, "POST", "/password/1/update", None, Some(update.clone())).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VAL_007");

    let (status, _) = send(&app, "POST", &path, None, Some(update.clone())).await;
    assert_eq!(status, StatusCode::OK);
    login(&app, "alice", "NewPass1!").await;

    // Links work once
    let (status, body) = send(&app, "POST", &path, None, Some(update)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_004");
}

#[tokio::test]
async fn test_profile_routes_are_owner_only() {
    let h = harness();
    let app = create_router(h.state.clone());
    register_active(&h.state, "alice").await;
    register_active(&h.state, "bob").await;
    let alice = login(&app, "alice", PASSWORD).await;

    let (status, _) = send(&app, "GET", "/user/1", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    let (status, _) = send(&app, "GET", "/user/2", Some(&alice.access), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = send(&app, "PATCH", "/user/2", Some(&alice.access), Some(json!({ "bio": "x" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = send(&app, "GET", "/user/1", Some(&alice.access), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "alice");
    assert!(body.get("password_digest").is_none());

    let (status, body) = send(
        &app,
        "PATCH",
        "/user/1",
        Some(&alice.access),
        Some(json!({ "bio": "writes things", "phone": "+61 400 000 000" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let view: UserView = serde_json::from_value(body).unwrap();
    assert_eq!(view.profile.bio, "writes things");
    assert_eq!(view.profile.phone, "+61 400 000 000");

    let (_, body) = send(&app, "GET", "/user/1", Some(&alice.access), None).await;
    assert_eq!(body["bio"], "writes things");
}

#[tokio::test]
async fn test_profile_update_rejects_other_fields() {
    let h = harness();
    let app = create_router(h.state.clone());
    register_active(&h.state, "alice").await;
    let alice = login(&app, "alice", PASSWORD).await;

    let (status, _) = send(&app, "PATCH", "/user/1", Some(&alice.access), Some(json!({ "role": "admin" }))).await;
    assert!(status.is_client_error());
    let (status, _) = send(&app, "PATCH", "/user/1", Some(&alice.access), Some(json!({ "status": "inactive" }))).await;
    assert!(status.is_client_error());

    let (status, body) = send(
        &app,
        "PATCH",
        "/user/1",
        Some(&alice.access),
        Some(json!({ "profile_picture": "p".repeat(501) })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VAL_008");

    let (_, body) = send(&app, "GET", "/user/1", Some(&alice.access), None).await;
    assert_eq!(body["role"], "user");
    assert_eq!(body["status"], "active");
    assert_eq!(body["profile_picture"], "");
}

