// ============================
// inkwell-backend-lib/src/auth/session.rs
// ============================
//! Login, refresh rotation, logout and the account lifecycle.
//!
//! [`SessionService`] owns the token primitives the rest of the crate builds
//! on: issuing and persisting a signed pair, hashing off the async runtime,
//! and blocking tokens in the [`TokenStore`].
use inkwell_common::{ProfileUpdate, Role, TokenKind, TokenPair, UserId, UserStatus, UserView};
use metrics::counter;
use std::sync::Arc;
use tracing::instrument;
use zeroize::Zeroizing;

use super::password::{CredentialHasher, HashError, PasswordPolicy};
use super::signer::{bearer, parse_bearer, TokenError, TokenSigner};
use crate::error::AppError;
use crate::metrics::{
    LOGIN_FAILED, LOGIN_SUCCEEDED, TOKEN_REFRESHED, TOKEN_REVOKED, USER_REGISTERED,
};
use crate::notify::{LinkBuilder, Notifier};
use crate::storage::{NewUser, StoreError, Token, TokenStore, User, UserStore};
use crate::validation::{
    is_email_shaped, normalize_email, parse_user_id, validate_email, validate_profile_update,
    validate_username,
};

/// Subject of the activation email
pub const ACTIVATION_SUBJECT: &str = "Activate Account";

/// Orchestrates credentials, tokens and account state
pub struct SessionService {
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenStore>,
    signer: Arc<TokenSigner>,
    hasher: Arc<dyn CredentialHasher>,
    policy: PasswordPolicy,
    notifier: Arc<dyn Notifier>,
    links: LinkBuilder,
    require_activation: bool,
}

impl SessionService {
    /// Create a service with the default password policy and activation
    /// required before login.
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenStore>,
        signer: Arc<TokenSigner>,
        hasher: Arc<dyn CredentialHasher>,
        notifier: Arc<dyn Notifier>,
        links: LinkBuilder,
    ) -> Self {
        Self {
            users,
            tokens,
            signer,
            hasher,
            policy: PasswordPolicy::default(),
            notifier,
            links,
            require_activation: true,
        }
    }

    pub fn with_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_activation_required(mut self, required: bool) -> Self {
        self.require_activation = required;
        self
    }

    pub fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    pub fn signer(&self) -> &Arc<TokenSigner> {
        &self.signer
    }

    pub fn notifier(&self) -> &Arc<dyn Notifier> {
        &self.notifier
    }

    pub fn links(&self) -> &LinkBuilder {
        &self.links
    }

    /// Register a new inactive account and email its activation link.
    ///
    /// The account row exists once hashing and storage succeed; a later
    /// delivery failure still reports the registration as failed.
    #[instrument(skip_all, fields(username = %username))]
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User, AppError> {
        if username.is_empty() {
            return Err(AppError::MissingField("username"));
        }
        if email.trim().is_empty() {
            return Err(AppError::MissingField("email"));
        }
        if password.is_empty() {
            return Err(AppError::MissingField("password"));
        }

        let username = validate_username(username)?;
        let email = validate_email(email)?;
        self.check_policy(password)?;

        // Only NotFound means "available". Any other error aborts.
        match self.users.find_by_username(username).await {
            Ok(_) => return Err(AppError::UsernameTaken),
            Err(StoreError::NotFound) => {},
            Err(err) => return Err(AppError::Storage(err)),
        }
        match self.users.find_by_email(&email).await {
            Ok(_) => return Err(AppError::EmailTaken),
            Err(StoreError::NotFound) => {},
            Err(err) => return Err(AppError::Storage(err)),
        }

        let password_digest = self.hash_password(password).await?;
        let user = self
            .users
            .register(NewUser {
                username: username.to_string(),
                email,
                password_digest,
                role: Role::User,
                status: UserStatus::Inactive,
            })
            .await
            .map_err(|err| match err {
                StoreError::Conflict("username") => AppError::UsernameTaken,
                StoreError::Conflict("email") => AppError::EmailTaken,
                other => AppError::Storage(other),
            })?;

        let link = self.links.activation(user.id);
        if let Err(err) = self
            .notifier
            .send(std::slice::from_ref(&user.email), ACTIVATION_SUBJECT, &link)
            .await
        {
            tracing::error!(user_id = %user.id, error = %err, "activation email failed");
            return Err(AppError::EmailDeliveryFailed);
        }

        counter!(USER_REGISTERED).increment(1);
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Move an account from `inactive` to `active`
    #[instrument(skip(self))]
    pub async fn activate_account(&self, user_id: &str) -> Result<(), AppError> {
        let user = self.find_user(user_id).await?;
        self.users.set_status(user.id, UserStatus::Active).await?;
        tracing::info!(user_id = %user.id, "account activated");
        Ok(())
    }

    /// Grant the admin role
    #[instrument(skip(self))]
    pub async fn promote(&self, user_id: &str) -> Result<(), AppError> {
        self.change_role(user_id, Role::Admin).await
    }

    /// Revoke the admin role
    #[instrument(skip(self))]
    pub async fn demote(&self, user_id: &str) -> Result<(), AppError> {
        self.change_role(user_id, Role::User).await
    }

    async fn change_role(&self, user_id: &str, role: Role) -> Result<(), AppError> {
        let user = self.find_user(user_id).await?;
        self.users.set_role(user.id, role).await?;
        tracing::info!(user_id = %user.id, role = %role, "role changed");
        Ok(())
    }

    /// Authenticate by username or email and open a session.
    #[instrument(skip_all, fields(identifier = %identifier))]
    pub async fn login(&self, identifier: &str, password: &str) -> Result<TokenPair, AppError> {
        let result = self.authenticate_credentials(identifier, password).await;
        let user = match result {
            Ok(user) => user,
            Err(err) => {
                counter!(LOGIN_FAILED, "code" => err.error_code()).increment(1);
                tracing::info!(code = err.error_code(), "login rejected");
                return Err(err);
            },
        };

        let pair = self.issue_session(user.id, user.role).await?;
        counter!(LOGIN_SUCCEEDED).increment(1);
        tracing::info!(user_id = %user.id, "login succeeded");
        Ok(pair)
    }

    async fn authenticate_credentials(&self, identifier: &str, password: &str) -> Result<User, AppError> {
        let user = match self.users.find_by_username(identifier).await {
            Ok(user) => user,
            Err(StoreError::NotFound) => {
                let email = normalize_email(identifier);
                if !is_email_shaped(&email) {
                    return Err(AppError::InvalidIdentifier);
                }
                match self.users.find_by_email(&email).await {
                    Ok(user) => user,
                    Err(StoreError::NotFound) => return Err(AppError::InvalidCredentials),
                    Err(err) => return Err(AppError::Storage(err)),
                }
            },
            Err(err) => return Err(AppError::Storage(err)),
        };

        // A password that could never have been set is not worth hashing.
        if !self.policy.validate(password) {
            return Err(AppError::InvalidCredentials);
        }

        match self.verify_password(&user.password_digest, password).await {
            Ok(()) => {},
            Err(HashError::CredentialMismatch) => return Err(AppError::InvalidCredentials),
            Err(HashError::MalformedDigest) => {
                tracing::error!(user_id = %user.id, "stored password digest is malformed");
                return Err(AppError::InvalidCredentials);
            },
            Err(err) => return Err(err.into()),
        }

        if self.require_activation && user.status != UserStatus::Active {
            return Err(AppError::AccountInactive);
        }

        Ok(user)
    }

    /// Rotate a refresh token into a fresh pair.
    ///
    /// The subject comes from the validated claims, not from storage. The
    /// presented token is consumed before the new pair is signed, so of two
    /// concurrent rotations of one token only one succeeds. A failure after
    /// that point leaves the caller signed out.
    #[instrument(skip_all)]
    pub async fn refresh(&self, presented: &str) -> Result<TokenPair, AppError> {
        let claims = self.signer.validate(presented, TokenKind::Refresh).await?;
        let user_id: UserId = claims.sub.parse().map_err(|_| TokenError::InvalidClaims)?;
        let role: Role = claims.role.parse().map_err(|_| TokenError::InvalidClaims)?;

        self.consume(parse_bearer(presented)?).await?;
        let pair = self.issue_session(user_id, role).await?;

        counter!(TOKEN_REFRESHED).increment(1);
        tracing::info!(user_id = %user_id, "session refreshed");
        Ok(pair)
    }

    /// Block the presented access token and, when given, the raw refresh
    /// token of the same session.
    #[instrument(skip_all)]
    pub async fn logout(&self, access_bearer: &str, refresh: Option<&str>) -> Result<(), AppError> {
        let access_claims = self.signer.validate(access_bearer, TokenKind::Access).await?;
        let access = parse_bearer(access_bearer)?;

        let refresh = refresh.filter(|raw| !raw.is_empty());
        if let Some(raw) = refresh {
            let refresh_claims = self.signer.validate(&bearer(raw), TokenKind::Refresh).await?;
            if refresh_claims.sub != access_claims.sub {
                return Err(AppError::TokenSubjectMismatch);
            }
        }

        self.revoke(access).await?;
        if let Some(raw) = refresh {
            self.revoke(raw).await?;
        }

        tracing::info!(user_id = %access_claims.sub, "logged out");
        Ok(())
    }

    /// Block a raw token
    pub async fn revoke(&self, raw: &str) -> Result<(), AppError> {
        self.tokens.block(raw).await?;
        counter!(TOKEN_REVOKED).increment(1);
        Ok(())
    }

    /// Block a raw token that must still be active. Fails with
    /// [`TokenError::RevokedToken`] when another caller got there first.
    pub async fn consume(&self, raw: &str) -> Result<(), AppError> {
        match self.tokens.block_if_active(raw).await {
            Ok(true) => {
                counter!(TOKEN_REVOKED).increment(1);
                Ok(())
            },
            Ok(false) | Err(StoreError::NotFound) => Err(TokenError::RevokedToken.into()),
            Err(err) => Err(TokenError::Lookup(err).into()),
        }
    }

    /// Public view of an account
    #[instrument(skip(self))]
    pub async fn profile(&self, user_id: &str) -> Result<UserView, AppError> {
        Ok(self.find_user(user_id).await?.view())
    }

    /// Update the self-maintained profile fields of an account.
    ///
    /// An update naming no field leaves the account untouched.
    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, user_id: &str, update: &ProfileUpdate) -> Result<UserView, AppError> {
        let user = self.find_user(user_id).await?;
        if update.is_empty() {
            return Ok(user.view());
        }
        validate_profile_update(update)?;

        let updated = match self.users.update_profile(user.id, update).await {
            Ok(updated) => updated,
            Err(StoreError::NotFound) => return Err(AppError::UserNotFound),
            Err(err) => return Err(AppError::Storage(err)),
        };
        tracing::info!(user_id = %user.id, "profile updated");
        Ok(updated.view())
    }

    /// Sign an access and refresh pair and persist both, access first.
    ///
    /// A failure saving the refresh half leaves the access half stored; it is
    /// neither retried nor rolled back.
    pub async fn issue_session(&self, user_id: UserId, role: Role) -> Result<TokenPair, AppError> {
        let subject = user_id.to_string();
        let sign = |kind: TokenKind| {
            self.signer.issue(kind, &subject, role.as_str()).map_err(|err| {
                tracing::error!(error = %err, kind = %kind, "token signing failed");
                AppError::TokenGenerationFailed
            })
        };
        let access = sign(TokenKind::Access)?;
        let refresh = sign(TokenKind::Refresh)?;

        self.persist(vec![
            Token::active(TokenKind::Access, access.clone(), user_id),
            Token::active(TokenKind::Refresh, refresh.clone(), user_id),
        ])
        .await?;

        Ok(TokenPair { access, refresh })
    }

    /// Save token records in order on a detached task, so that dropping the
    /// caller does not interrupt a write. Stops at the first failure.
    pub async fn persist(&self, records: Vec<Token>) -> Result<(), AppError> {
        let tokens = Arc::clone(&self.tokens);
        let write = tokio::spawn(async move {
            for record in &records {
                tokens.save(record).await?;
            }
            Ok::<(), StoreError>(())
        });

        match write.await? {
            Ok(()) => Ok(()),
            Err(err) => {
                tracing::error!(error = %err, "token persistence failed");
                Err(AppError::TokenPersistFailed)
            },
        }
    }

    /// Hash on the blocking pool
    pub async fn hash_password(&self, plain: &str) -> Result<String, AppError> {
        let hasher = Arc::clone(&self.hasher);
        let plain = Zeroizing::new(plain.to_string());
        let digest = tokio::task::spawn_blocking(move || hasher.hash(&plain)).await??;
        Ok(digest)
    }

    /// Verify on the blocking pool
    pub async fn verify_password(&self, digest: &str, plain: &str) -> Result<(), HashError> {
        let hasher = Arc::clone(&self.hasher);
        let digest = digest.to_string();
        let plain = Zeroizing::new(plain.to_string());
        tokio::task::spawn_blocking(move || hasher.verify(&digest, &plain))
            .await
            .map_err(|err| HashError::Hashing(err.to_string()))?
    }

    /// Apply the password policy
    pub fn check_policy(&self, password: &str) -> Result<(), AppError> {
        if self.policy.validate(password) {
            Ok(())
        } else {
            Err(AppError::WeakPassword {
                min_length: self.policy.min_length(),
            })
        }
    }

    /// Resolve a path-supplied id to an existing user
    pub async fn find_user(&self, user_id: &str) -> Result<User, AppError> {
        let id = parse_user_id(user_id)?;
        match self.users.find_by_id(id).await {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound) => Err(AppError::UserNotFound),
            Err(err) => Err(AppError::Storage(err)),
        }
    }
}
