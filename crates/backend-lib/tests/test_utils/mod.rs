//! Test utilities for the identity service
//!
//! Cheap scrypt settings, in-memory state and collaborators that fail on
//! demand, so that every failure branch can be driven from a test.
#![allow(dead_code)]

use async_trait::async_trait;
use inkwell_backend_lib::{
    auth::{CredentialHasher, HashError, ScryptHasher},
    config::{Secret, Settings},
    notify::{MemoryOutbox, Notifier, NotifyError},
    storage::{
        InMemoryTokenStore, InMemoryUserStore, NewUser, StoreError, Token, TokenStore, User,
        UserStore,
    },
    AppState,
};
use inkwell_common::{ProfileUpdate, Role, UserId, UserStatus};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

pub const PASSWORD: &str = "Passw0rd!";

/// Valid settings with a low scrypt cost
pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.tokens.access_secret = Secret::new("test-access-secret");
    settings.tokens.refresh_secret = Secret::new("test-refresh-secret");
    settings.hashing.log_n = 4;
    settings
}

/// Application state plus handles on its collaborators
pub struct Harness {
    pub state: Arc<AppState>,
    pub users: Arc<InMemoryUserStore>,
    pub tokens: Arc<InMemoryTokenStore>,
    pub outbox: Arc<MemoryOutbox>,
}

/// Sets up a state over fresh in-memory stores and a recording outbox
///
/// # Example
///
/// ```ignore
/// let h = harness();
/// h.state.sessions.register("alice", "alice@x.com", PASSWORD).await?;
/// assert_eq!(h.outbox.len(), 1);
/// ```
pub fn harness() -> Harness {
    let users = Arc::new(InMemoryUserStore::new());
    let tokens = Arc::new(InMemoryTokenStore::new());
    let outbox = Arc::new(MemoryOutbox::new());
    let state = AppState::new(test_settings(), users.clone(), tokens.clone(), outbox.clone())
        .expect("test settings are valid");

    Harness {
        state: Arc::new(state),
        users,
        tokens,
        outbox,
    }
}

/// Sets up a state over arbitrary collaborators
pub fn state_with(
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenStore>,
    notifier: Arc<dyn Notifier>,
) -> Arc<AppState> {
    Arc::new(AppState::new(test_settings(), users, tokens, notifier).expect("test settings are valid"))
}

/// Register and activate `username` with [`PASSWORD`]
pub async fn register_active(state: &AppState, username: &str) -> User {
    let email = format!("{username}@x.com");
    let user = state
        .sessions
        .register(username, &email, PASSWORD)
        .await
        .expect("registration succeeds");
    state
        .sessions
        .activate_account(&user.id.to_string())
        .await
        .expect("activation succeeds");
    user
}

/// Raw token carried by a password update link
pub fn token_from_link(link: &str) -> String {
    link.split_once("token=")
        .map(|(_, token)| token.to_string())
        .expect("link carries a token")
}

/// Notifier whose every send fails
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn send(&self, _: &[String], _: &str, _: &str) -> Result<(), NotifyError> {
        Err(NotifyError::Unavailable("smtp relay down".to_string()))
    }
}

/// Token store that accepts only the first `allowed` saves
pub struct FlakyTokenStore {
    pub inner: InMemoryTokenStore,
    allowed: usize,
    saves: AtomicUsize,
}

impl FlakyTokenStore {
    pub fn new(allowed: usize) -> Self {
        Self {
            inner: InMemoryTokenStore::new(),
            allowed,
            saves: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl TokenStore for FlakyTokenStore {
    async fn save(&self, token: &Token) -> Result<(), StoreError> {
        if self.saves.fetch_add(1, Ordering::SeqCst) >= self.allowed {
            return Err(StoreError::Unavailable("write timeout".to_string()));
        }
        self.inner.save(token).await
    }

    async fn find_by_content(&self, content: &str) -> Result<Token, StoreError> {
        self.inner.find_by_content(content).await
    }

    async fn block(&self, content: &str) -> Result<(), StoreError> {
        self.inner.block(content).await
    }

    async fn block_if_active(&self, content: &str) -> Result<bool, StoreError> {
        self.inner.block_if_active(content).await
    }
}

/// User store whose lookups by username fail with a transient error
pub struct UnreachableUserStore {
    pub inner: InMemoryUserStore,
}

#[async_trait]
impl UserStore for UnreachableUserStore {
    async fn register(&self, user: NewUser) -> Result<User, StoreError> {
        self.inner.register(user).await
    }

    async fn find_by_id(&self, id: UserId) -> Result<User, StoreError> {
        self.inner.find_by_id(id).await
    }

    async fn find_by_username(&self, _: &str) -> Result<User, StoreError> {
        Err(StoreError::Unavailable("connection reset".to_string()))
    }

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        self.inner.find_by_email(email).await
    }

    async fn set_status(&self, id: UserId, status: UserStatus) -> Result<(), StoreError> {
        self.inner.set_status(id, status).await
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<(), StoreError> {
        self.inner.set_role(id, role).await
    }

    async fn set_password_digest(&self, id: UserId, digest: &str) -> Result<(), StoreError> {
        self.inner.set_password_digest(id, digest).await
    }

    async fn update_profile(&self, id: UserId, update: &ProfileUpdate) -> Result<User, StoreError> {
        self.inner.update_profile(id, update).await
    }
}

/// Hasher that counts how often it is invoked
pub struct CountingHasher {
    inner: ScryptHasher,
    calls: AtomicUsize,
}

impl CountingHasher {
    pub fn new() -> Self {
        Self {
            inner: ScryptHasher::new(4, 8, 1).expect("cheap scrypt parameters are valid"),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CredentialHasher for CountingHasher {
    fn hash(&self, plain: &str) -> Result<String, HashError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.hash(plain)
    }

    fn verify(&self, digest: &str, plain: &str) -> Result<(), HashError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.verify(digest, plain)
    }
}
