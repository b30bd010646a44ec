// crates/backend-lib/src/middleware/auth.rs

//! Request gates: bearer authentication, role and ownership checks.
//!
//! The checks are plain functions over plain values; the axum middleware
//! below only moves headers, path ids and the resulting [`Identity`] in and
//! out of the request.
use axum::{
    extract::{Path, Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use inkwell_common::{Role, TokenKind};
use std::sync::Arc;

use crate::auth::signer::{TokenError, TokenSigner};
use crate::error::AppError;
use crate::AppState;

/// Authenticated subject attached to a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

/// Validates access tokens presented on requests
#[derive(Clone)]
pub struct AuthorizationGate {
    signer: Arc<TokenSigner>,
}

impl AuthorizationGate {
    pub fn new(signer: Arc<TokenSigner>) -> Self {
        Self { signer }
    }

    /// Validate an `Authorization` value as an access token
    pub async fn authenticate(&self, header: Option<&str>) -> Result<Identity, AppError> {
        let claims = self
            .signer
            .validate(header.unwrap_or_default(), TokenKind::Access)
            .await?;
        let role = claims.role.parse::<Role>().map_err(|_| TokenError::InvalidClaims)?;
        Ok(Identity {
            user_id: claims.sub,
            role,
        })
    }
}

/// Allow only identities holding `required`. No identity means no access.
pub fn require_role(identity: Option<&Identity>, required: Role) -> Result<(), AppError> {
    match identity {
        Some(identity) if identity.role == required => Ok(()),
        Some(_) => Err(AppError::Forbidden("insufficient role")),
        None => Err(AppError::Forbidden("no authenticated identity")),
    }
}

/// Allow only the identity whose id equals `resource_id`, compared as strings
pub fn require_owner(identity: Option<&Identity>, resource_id: &str) -> Result<(), AppError> {
    match identity {
        Some(identity) if identity.user_id == resource_id => Ok(()),
        Some(_) => Err(AppError::Forbidden("not the account owner")),
        None => Err(AppError::Forbidden("no authenticated identity")),
    }
}

/// Reject requests without a valid access token, otherwise attach the
/// [`Identity`] for later layers and handlers.
pub async fn authenticate(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let header = match request.headers().get(AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| TokenError::MalformedCredential)?),
        None => None,
    };

    let identity = state.gate.authenticate(header).await?;
    tracing::debug!(user_id = %identity.user_id, role = %identity.role, "request authenticated");

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Admin-only routes. Must run after [`authenticate`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, AppError> {
    require_role(request.extensions().get::<Identity>(), Role::Admin)?;
    Ok(next.run(request).await)
}

/// Routes on `/user/{id}/..` reserved for that user. Must run after
/// [`authenticate`].
pub async fn require_account_owner(
    Path(id): Path<String>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    require_owner(request.extensions().get::<Identity>(), &id)?;
    Ok(next.run(request).await)
}
