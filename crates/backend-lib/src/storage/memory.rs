//! In-process storage backends.
use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use inkwell_common::{Profile, ProfileUpdate, Role, TokenStatus, UserId, UserStatus};
use parking_lot::RwLock;
use std::collections::HashMap;

use super::{NewUser, StoreError, Token, TokenStore, User, UserStore};

#[derive(Default)]
struct UserTable {
    next_id: i64,
    by_id: HashMap<UserId, User>,
    by_username: HashMap<String, UserId>,
    by_email: HashMap<String, UserId>,
}

/// User accounts held in memory, with sequential ids starting at 1
#[derive(Default)]
pub struct InMemoryUserStore {
    table: RwLock<UserTable>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered accounts
    pub fn len(&self) -> usize {
        self.table.read().by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn update<F>(&self, id: UserId, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut User),
    {
        let mut table = self.table.write();
        let user = table.by_id.get_mut(&id).ok_or(StoreError::NotFound)?;
        apply(user);
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn register(&self, user: NewUser) -> Result<User, StoreError> {
        let mut table = self.table.write();
        if table.by_username.contains_key(&user.username) {
            return Err(StoreError::Conflict("username"));
        }
        if table.by_email.contains_key(&user.email) {
            return Err(StoreError::Conflict("email"));
        }

        table.next_id += 1;
        let id = UserId(table.next_id);
        let stored = User {
            id,
            username: user.username,
            email: user.email,
            password_digest: user.password_digest,
            role: user.role,
            status: user.status,
            profile: Profile::default(),
            created_at: Utc::now(),
        };

        table.by_username.insert(stored.username.clone(), id);
        table.by_email.insert(stored.email.clone(), id);
        table.by_id.insert(id, stored.clone());
        Ok(stored)
    }

    async fn find_by_id(&self, id: UserId) -> Result<User, StoreError> {
        self.table
            .read()
            .by_id
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_username(&self, username: &str) -> Result<User, StoreError> {
        let table = self.table.read();
        table
            .by_username
            .get(username)
            .and_then(|id| table.by_id.get(id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_email(&self, email: &str) -> Result<User, StoreError> {
        let table = self.table.read();
        table
            .by_email
            .get(email)
            .and_then(|id| table.by_id.get(id))
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn set_status(&self, id: UserId, status: UserStatus) -> Result<(), StoreError> {
        self.update(id, |user| user.status = status)
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<(), StoreError> {
        self.update(id, |user| user.role = role)
    }

    async fn set_password_digest(&self, id: UserId, digest: &str) -> Result<(), StoreError> {
        self.update(id, |user| user.password_digest = digest.to_string())
    }

    async fn update_profile(&self, id: UserId, update: &ProfileUpdate) -> Result<User, StoreError> {
        let mut table = self.table.write();
        let user = table.by_id.get_mut(&id).ok_or(StoreError::NotFound)?;
        update.apply_to(&mut user.profile);
        Ok(user.clone())
    }
}

/// Issued tokens held in memory, keyed by their raw content
#[derive(Default)]
pub struct InMemoryTokenStore {
    tokens: DashMap<String, Token>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tokens
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// All tokens issued to `user_id`, oldest first
    pub fn tokens_for(&self, user_id: UserId) -> Vec<Token> {
        let mut tokens: Vec<Token> = self
            .tokens
            .iter()
            .filter(|entry| entry.value().user_id == user_id)
            .map(|entry| entry.value().clone())
            .collect();
        tokens.sort_by_key(|token| token.created_at);
        tokens
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn save(&self, token: &Token) -> Result<(), StoreError> {
        let mut inserted = false;
        self.tokens
            .entry(token.content.clone())
            .or_insert_with(|| {
                inserted = true;
                token.clone()
            });

        if inserted {
            Ok(())
        } else {
            Err(StoreError::Conflict("content"))
        }
    }

    async fn find_by_content(&self, content: &str) -> Result<Token, StoreError> {
        self.tokens
            .get(content)
            .map(|entry| entry.value().clone())
            .ok_or(StoreError::NotFound)
    }

    async fn block(&self, content: &str) -> Result<(), StoreError> {
        let mut entry = self.tokens.get_mut(content).ok_or(StoreError::NotFound)?;
        entry.status = TokenStatus::Blocked;
        Ok(())
    }

    async fn block_if_active(&self, content: &str) -> Result<bool, StoreError> {
        // The shard stays write-locked between the check and the update.
        let mut entry = self.tokens.get_mut(content).ok_or(StoreError::NotFound)?;
        if entry.status != TokenStatus::Active {
            return Ok(false);
        }
        entry.status = TokenStatus::Blocked;
        Ok(true)
    }
}
