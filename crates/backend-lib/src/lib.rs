// ============================
// inkwell-backend-lib/src/lib.rs
// ============================
//! Core of the inkwell identity service: credentials, signed tokens with
//! server-side revocation, password recovery and request authorization.

pub mod auth;
pub mod config;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod notify;
pub mod routes;
pub mod storage;
pub mod validation;

use std::sync::Arc;

use crate::auth::{PasswordPolicy, PasswordRecoveryService, SessionService, TokenSigner};
use crate::config::Settings;
use crate::error::AppError;
use crate::middleware::AuthorizationGate;
use crate::notify::{LinkBuilder, Notifier};
use crate::storage::{InMemoryTokenStore, InMemoryUserStore, TokenStore, UserStore};

pub use crate::routes::create_router;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    /// Login, refresh, logout and account lifecycle
    pub sessions: Arc<SessionService>,
    /// Forgot-password and password changes
    pub recovery: Arc<PasswordRecoveryService>,
    /// Access token validation for protected routes
    pub gate: AuthorizationGate,
    /// Settings the state was built from
    pub settings: Arc<Settings>,
}

impl AppState {
    /// Wire the services over the given collaborators
    pub fn new(
        settings: Settings,
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self, AppError> {
        let signer = TokenSigner::new(
            settings.tokens.access_secret.expose().as_bytes(),
            settings.tokens.refresh_secret.expose().as_bytes(),
            Arc::clone(&tokens),
        )
        .map_err(|e| AppError::Configuration(e.to_string()))?
        .with_lifetimes(settings.token_lifetimes());
        let signer = Arc::new(signer);

        let sessions = SessionService::new(
            users,
            tokens,
            Arc::clone(&signer),
            Arc::new(settings.hasher()?),
            notifier,
            LinkBuilder::new(&settings.public_base_url),
        )
        .with_policy(PasswordPolicy::new(settings.password_requirements.clone()))
        .with_activation_required(settings.require_activation);
        let sessions = Arc::new(sessions);

        Ok(Self {
            recovery: Arc::new(PasswordRecoveryService::new(Arc::clone(&sessions))),
            sessions,
            gate: AuthorizationGate::new(signer),
            settings: Arc::new(settings),
        })
    }

    /// State backed by fresh in-memory stores
    pub fn in_memory(settings: Settings, notifier: Arc<dyn Notifier>) -> Result<Self, AppError> {
        Self::new(
            settings,
            Arc::new(InMemoryUserStore::new()),
            Arc::new(InMemoryTokenStore::new()),
            notifier,
        )
    }
}
