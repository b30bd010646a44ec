// ============================
// inkwell-backend-lib/src/routes.rs
// ============================
//! HTTP surface over the session and recovery services.
use axum::{
    extract::{Path, Query, State},
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    middleware::{from_fn, from_fn_with_state},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use inkwell_common::{
    ForgotPasswordRequest, LoginRequest, LogoutRequest, MessageResponse, ProfileUpdate,
    RegisterRequest, ResetLinkQuery, ResetPasswordRequest, TokenPair, UpdatePasswordRequest,
    UserView,
};
use std::sync::Arc;

use crate::auth::signer::TokenError;
use crate::error::AppError;
use crate::middleware::{authenticate, require_account_owner, require_admin};
use crate::AppState;

/// Build the application router
pub fn create_router(state: Arc<AppState>) -> Router {
    // route_layer: the layer added last runs first
    let owner_routes = Router::new()
        .route("/user/{id}", get(profile).patch(update_profile))
        .route("/user/{id}/password", post(reset_password))
        .route_layer(from_fn(require_account_owner))
        .route_layer(from_fn_with_state(state.clone(), authenticate));

    let admin_routes = Router::new()
        .route("/user/{id}/promote", post(promote))
        .route("/user/{id}/demote", post(demote))
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), authenticate));

    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/logout", post(logout))
        .route("/user/{id}/activate", get(activate))
        .route("/password/forgot", post(forgot_password))
        .route("/password/{id}/update", post(update_password))
        .merge(owner_routes)
        .merge(admin_routes)
        .with_state(state)
}

fn authorization(headers: &HeaderMap) -> Result<&str, AppError> {
    match headers.get(AUTHORIZATION) {
        Some(value) => Ok(value.to_str().map_err(|_| TokenError::MalformedCredential)?),
        None => Ok(""),
    }
}

async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user = state
        .sessions
        .register(&body.username, &body.email, &body.password)
        .await?;
    Ok((StatusCode::CREATED, Json::<UserView>(user.view())))
}

async fn activate(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.sessions.activate_account(&id).await?;
    Ok(Json(MessageResponse::new("account activated")))
}

async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenPair>, AppError> {
    let pair = state.sessions.login(&body.identifier, &body.password).await?;
    Ok(Json(pair))
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<TokenPair>, AppError> {
    let pair = state.sessions.refresh(authorization(&headers)?).await?;
    Ok(Json(pair))
}

async fn logout(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<LogoutRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .sessions
        .logout(authorization(&headers)?, body.refresh.as_deref())
        .await?;
    Ok(Json(MessageResponse::new("logged out")))
}

async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state.recovery.forgot_password(&body.email).await?;
    Ok(Json(MessageResponse::new("password reset link sent")))
}

async fn update_password(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<ResetLinkQuery>,
    Json(body): Json<UpdatePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .recovery
        .update_password_direct(&id, &body.new_password, &query.token)
        .await?;
    Ok(Json(MessageResponse::new("password updated")))
}

async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .recovery
        .reset_password(&id, &body.old_password, &body.new_password)
        .await?;
    Ok(Json(MessageResponse::new("password changed")))
}

async fn profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<UserView>, AppError> {
    Ok(Json(state.sessions.profile(&id).await?))
}

async fn update_profile(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<ProfileUpdate>,
) -> Result<Json<UserView>, AppError> {
    Ok(Json(state.sessions.update_profile(&id, &body).await?))
}

async fn promote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.sessions.promote(&id).await?;
    Ok(Json(MessageResponse::new("user promoted")))
}

async fn demote(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.sessions.demote(&id).await?;
    Ok(Json(MessageResponse::new("user demoted")))
}
