// ============================
// inkwell-backend-lib/src/auth/recovery.rs
// ============================
//! Forgot-password links and password changes.
use inkwell_common::{TokenKind, UserId};
use metrics::counter;
use std::sync::Arc;
use tracing::instrument;

use super::password::HashError;
use super::session::SessionService;
use super::signer::{bearer, TokenError};
use crate::error::AppError;
use crate::metrics::{PASSWORD_RESET_REQUESTED, PASSWORD_UPDATED};
use crate::storage::{StoreError, Token};
use crate::validation::normalize_email;

/// Subject of the password reset email
pub const RESET_SUBJECT: &str = "Reset Password";

/// Password lifecycle built on the session token primitives
pub struct PasswordRecoveryService {
    sessions: Arc<SessionService>,
}

impl PasswordRecoveryService {
    pub fn new(sessions: Arc<SessionService>) -> Self {
        Self { sessions }
    }

    /// Email a link carrying a fresh access-class token for the account.
    ///
    /// Nothing is sent unless the token was signed and persisted. A delivery
    /// failure leaves that token stored and usable.
    #[instrument(skip_all)]
    pub async fn forgot_password(&self, email: &str) -> Result<(), AppError> {
        let email = normalize_email(email);
        if email.is_empty() {
            return Err(AppError::EmailRequired);
        }

        let user = match self.sessions.users().find_by_email(&email).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => return Err(AppError::UserNotFound),
            Err(err) => return Err(AppError::Storage(err)),
        };

        let token = self
            .sessions
            .signer()
            .issue_access(&user.id.to_string(), user.role.as_str())
            .map_err(|err| {
                tracing::error!(user_id = %user.id, error = %err, "reset token signing failed");
                AppError::TokenGenerationFailed
            })?;

        self.sessions
            .persist(vec![Token::active(TokenKind::Access, token.clone(), user.id)])
            .await?;

        let link = self.sessions.links().password_update(user.id, &token);
        if let Err(err) = self
            .sessions
            .notifier()
            .send(std::slice::from_ref(&user.email), RESET_SUBJECT, &link)
            .await
        {
            tracing::error!(user_id = %user.id, error = %err, "reset email failed");
            return Err(AppError::EmailDeliveryFailed);
        }

        counter!(PASSWORD_RESET_REQUESTED).increment(1);
        tracing::info!(user_id = %user.id, "password reset link sent");
        Ok(())
    }

    /// Set a new password using the raw token from a reset link.
    ///
    /// The token must belong to `user_id`. It is consumed before the new
    /// digest is stored, so each link works once even under concurrent use.
    #[instrument(skip(self, new_password, token))]
    pub async fn update_password_direct(
        &self,
        user_id: &str,
        new_password: &str,
        token: &str,
    ) -> Result<(), AppError> {
        if token.is_empty() {
            return Err(AppError::TokenRequired);
        }

        let claims = self
            .sessions
            .signer()
            .validate(&bearer(token), TokenKind::Access)
            .await
            .map_err(|err| {
                tracing::debug!(error = %err, "reset token rejected");
                AppError::InvalidOrExpiredToken
            })?;
        if claims.sub != user_id {
            return Err(AppError::TokenSubjectMismatch);
        }

        self.sessions.check_policy(new_password)?;
        let id: UserId = claims.sub.parse().map_err(|_| AppError::InvalidUserId)?;

        self.sessions.consume(token).await.map_err(|err| match err {
            AppError::Token(TokenError::RevokedToken) => AppError::InvalidOrExpiredToken,
            other => other,
        })?;
        self.store_password(id, new_password).await?;

        tracing::info!(user_id = %id, "password updated from reset link");
        Ok(())
    }

    /// Change the password of a signed-in user who proves the current one
    #[instrument(skip(self, old_password, new_password))]
    pub async fn reset_password(
        &self,
        user_id: &str,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AppError> {
        let user = self.sessions.find_user(user_id).await?;

        match self.sessions.verify_password(&user.password_digest, old_password).await {
            Ok(()) => {},
            Err(HashError::CredentialMismatch) | Err(HashError::MalformedDigest) => {
                return Err(AppError::InvalidOldPassword);
            },
            Err(err) => return Err(err.into()),
        }

        self.sessions.check_policy(new_password)?;
        self.store_password(user.id, new_password).await?;

        tracing::info!(user_id = %user.id, "password changed");
        Ok(())
    }

    async fn store_password(&self, id: UserId, plain: &str) -> Result<(), AppError> {
        let digest = self.sessions.hash_password(plain).await?;
        match self.sessions.users().set_password_digest(id, &digest).await {
            Ok(()) => {},
            Err(StoreError::NotFound) => return Err(AppError::UserNotFound),
            Err(err) => return Err(AppError::Storage(err)),
        }
        counter!(PASSWORD_UPDATED).increment(1);
        Ok(())
    }
}
