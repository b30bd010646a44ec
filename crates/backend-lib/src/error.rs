// crates/backend-lib/src/error.rs

//! Central error type + Axum integration.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use std::fmt;
use thiserror::Error;

use crate::auth::password::HashError;
use crate::auth::signer::TokenError;
use crate::notify::NotifyError;
use crate::storage::StoreError;

/// Boundary error classes. Every [`AppError`] belongs to exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed input or a password policy violation
    Validation,
    /// Username or email already in use
    Conflict,
    /// Bad credentials or an unusable token
    Authentication,
    /// Role or ownership denial
    Authorization,
    /// Unknown user or resource
    NotFound,
    /// Hashing, signing, persistence, delivery or configuration failure
    Dependency,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Authentication => "authentication",
            ErrorKind::Authorization => "authorization",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Dependency => "dependency",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Application error types with error codes and context
#[derive(Error, Debug)]
pub enum AppError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("invalid email format")]
    InvalidEmail,

    #[error("invalid username: {0}")]
    InvalidUsername(&'static str),

    #[error("password must be at least {min_length} characters and contain an uppercase letter, a lowercase letter, a digit and a symbol")]
    WeakPassword { min_length: usize },

    #[error("invalid user id")]
    InvalidUserId,

    #[error("email required")]
    EmailRequired,

    #[error("token required")]
    TokenRequired,

    #[error("invalid profile: {0}")]
    InvalidProfile(&'static str),

    #[error("this username is already in use")]
    UsernameTaken,

    #[error("this email is already in use")]
    EmailTaken,

    // Identifier misses and password mismatches render identically.
    #[error("invalid credentials")]
    InvalidIdentifier,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("account is not activated")]
    AccountInactive,

    #[error("invalid old password")]
    InvalidOldPassword,

    #[error("invalid or expired token")]
    InvalidOrExpiredToken,

    #[error(transparent)]
    Token(#[from] TokenError),

    #[error("token does not match user")]
    TokenSubjectMismatch,

    #[error("forbidden: {0}")]
    Forbidden(&'static str),

    #[error("user not found")]
    UserNotFound,

    #[error("could not generate token")]
    TokenGenerationFailed,

    #[error("could not persist token")]
    TokenPersistFailed,

    #[error("could not send email")]
    EmailDeliveryFailed,

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Boundary class of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::MissingField(_)
            | AppError::InvalidEmail
            | AppError::InvalidUsername(_)
            | AppError::WeakPassword { .. }
            | AppError::InvalidUserId
            | AppError::EmailRequired
            | AppError::TokenRequired
            | AppError::InvalidProfile(_) => ErrorKind::Validation,
            AppError::UsernameTaken | AppError::EmailTaken => ErrorKind::Conflict,
            AppError::InvalidIdentifier
            | AppError::InvalidCredentials
            | AppError::AccountInactive
            | AppError::InvalidOldPassword
            | AppError::InvalidOrExpiredToken => ErrorKind::Authentication,
            AppError::Token(err) => err.kind(),
            AppError::TokenSubjectMismatch | AppError::Forbidden(_) => ErrorKind::Authorization,
            AppError::UserNotFound => ErrorKind::NotFound,
            AppError::TokenGenerationFailed
            | AppError::TokenPersistFailed
            | AppError::EmailDeliveryFailed
            | AppError::Hashing(_)
            | AppError::Storage(_)
            | AppError::Configuration(_)
            | AppError::Internal(_) => ErrorKind::Dependency,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Authentication => StatusCode::UNAUTHORIZED,
            ErrorKind::Authorization => StatusCode::FORBIDDEN,
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Dependency => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            AppError::MissingField(_) => "VAL_001",
            AppError::InvalidEmail => "VAL_002",
            AppError::InvalidUsername(_) => "VAL_003",
            AppError::WeakPassword { .. } => "VAL_004",
            AppError::InvalidUserId => "VAL_005",
            AppError::EmailRequired => "VAL_006",
            AppError::TokenRequired => "VAL_007",
            AppError::InvalidProfile(_) => "VAL_008",
            AppError::UsernameTaken => "CONFLICT_001",
            AppError::EmailTaken => "CONFLICT_002",
            AppError::InvalidIdentifier | AppError::InvalidCredentials => "AUTH_001",
            AppError::AccountInactive => "AUTH_002",
            AppError::InvalidOldPassword => "AUTH_003",
            AppError::InvalidOrExpiredToken => "AUTH_004",
            AppError::Token(err) => err.error_code(),
            AppError::TokenSubjectMismatch => "AUTHZ_001",
            AppError::Forbidden(_) => "AUTHZ_002",
            AppError::UserNotFound => "NF_001",
            AppError::TokenGenerationFailed => "DEP_001",
            AppError::TokenPersistFailed => "DEP_002",
            AppError::EmailDeliveryFailed => "DEP_003",
            AppError::Hashing(_) => "DEP_004",
            AppError::Storage(_) => "DEP_005",
            AppError::Configuration(_) => "CFG_001",
            AppError::Internal(_) => "INT_001",
        }
    }

    /// Get a sanitized message suitable for production use
    pub fn sanitized_message(&self) -> String {
        match self {
            AppError::Token(err) => err.sanitized_message().to_string(),
            AppError::Hashing(_) | AppError::Storage(_) | AppError::Internal(_) => {
                "An internal server error occurred".to_string()
            },
            AppError::Configuration(_) => "Server misconfigured".to_string(),
            // Every other variant already renders without lower-layer detail.
            other => other.to_string(),
        }
    }
}

impl From<HashError> for AppError {
    fn from(err: HashError) -> Self {
        AppError::Hashing(err.to_string())
    }
}

impl From<NotifyError> for AppError {
    fn from(_: NotifyError) -> Self {
        AppError::EmailDeliveryFailed
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("background task failed: {err}"))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        if status.is_server_error() {
            tracing::error!(code = error_code, error = %self, "request failed");
        } else {
            tracing::debug!(code = error_code, kind = %self.kind(), "request rejected");
        }

        let body = serde_json::json!({
            "error": {
                "code": error_code,
                "message": self.sanitized_message(),
            }
        });

        (status, axum::Json(body)).into_response()
    }
}
