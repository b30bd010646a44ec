// ============================
// inkwell-backend-lib/src/storage.rs
// ============================
//! Storage abstraction for user accounts and issued tokens.
//!
//! The identity core only talks to these traits; the persistence technology
//! behind them is chosen at bootstrap. [`memory`] provides the in-process
//! implementations used by the binary and the tests.
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inkwell_common::{Profile, ProfileUpdate, Role, TokenKind, TokenStatus, UserId, UserStatus, UserView};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

pub mod memory;

pub use memory::{InMemoryTokenStore, InMemoryUserStore};

/// Errors reported by a storage backend
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No record matches the key
    #[error("record not found")]
    NotFound,

    /// A uniqueness constraint on the named field was violated
    #[error("duplicate value for {0}")]
    Conflict(&'static str),

    /// The backend could not serve the request
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// A stored user account
#[derive(Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_digest: String,
    pub role: Role,
    pub status: UserStatus,
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Public projection without the password digest
    pub fn view(&self) -> UserView {
        UserView {
            id: self.id,
            username: self.username.clone(),
            email: self.email.clone(),
            role: self.role,
            status: self.status,
            profile: self.profile.clone(),
        }
    }
}

// Hand-written so the digest never reaches logs.
impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("username", &self.username)
            .field("email", &self.email)
            .field("password_digest", &"<redacted>")
            .field("role", &self.role)
            .field("status", &self.status)
            .field("profile", &self.profile)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// A user account that has not been assigned an id yet
#[derive(Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_digest: String,
    pub role: Role,
    pub status: UserStatus,
}

/// One issued signed credential
#[derive(Debug, Clone)]
pub struct Token {
    pub id: Uuid,
    pub kind: TokenKind,
    /// Raw signed value, unique system-wide
    pub content: String,
    pub status: TokenStatus,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

impl Token {
    /// A freshly issued, active token record
    pub fn active(kind: TokenKind, content: impl Into<String>, user_id: UserId) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            content: content.into(),
            status: TokenStatus::Active,
            user_id,
            created_at: Utc::now(),
        }
    }

    pub fn is_blocked(&self) -> bool {
        self.status == TokenStatus::Blocked
    }
}

/// Trait for user account backends
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Persist a new account, assigning its id. Fails with
    /// [`StoreError::Conflict`] when the username or email is taken.
    async fn register(&self, user: NewUser) -> Result<User, StoreError>;

    /// Fetch an account by id
    async fn find_by_id(&self, id: UserId) -> Result<User, StoreError>;

    /// Fetch an account by exact username
    async fn find_by_username(&self, username: &str) -> Result<User, StoreError>;

    /// Fetch an account by email address
    async fn find_by_email(&self, email: &str) -> Result<User, StoreError>;

    /// Update the lifecycle status of an existing account
    async fn set_status(&self, id: UserId, status: UserStatus) -> Result<(), StoreError>;

    /// Update the role of an existing account
    async fn set_role(&self, id: UserId, role: Role) -> Result<(), StoreError>;

    /// Replace the password digest of an existing account
    async fn set_password_digest(&self, id: UserId, digest: &str) -> Result<(), StoreError>;

    /// Apply a profile update and return the account as stored afterwards
    async fn update_profile(&self, id: UserId, update: &ProfileUpdate) -> Result<User, StoreError>;
}

/// Trait for issued-token backends
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a newly issued token
    async fn save(&self, token: &Token) -> Result<(), StoreError>;

    /// Look a token up by its raw signed content
    async fn find_by_content(&self, content: &str) -> Result<Token, StoreError>;

    /// Move a token to `blocked`. Blocking an already blocked token is a no-op.
    async fn block(&self, content: &str) -> Result<(), StoreError>;

    /// Atomically move an `active` token to `blocked`.
    ///
    /// Returns `false` when the token was already blocked, so of any number of
    /// concurrent callers exactly one sees `true`.
    async fn block_if_active(&self, content: &str) -> Result<bool, StoreError>;
}
