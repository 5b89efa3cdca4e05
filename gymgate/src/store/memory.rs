//! In-process store used by tests and database-less development runs.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use super::{CredentialRecord, CredentialStore, Result, TokenRecord, TokenStore};
use crate::api::models::users::Role;

#[derive(Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, CredentialRecord>>,
    tokens: RwLock<HashMap<String, TokenRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an account with an already-hashed password. Returns the new
    /// account id, or the existing id when the username is already present.
    pub fn add_account(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
        is_active: bool,
    ) -> Uuid {
        let mut users = self.users.write().expect("users lock poisoned");
        if let Some(existing) = users.values().find(|u| u.username == username) {
            return existing.id;
        }
        let id = Uuid::new_v4();
        users.insert(
            id,
            CredentialRecord {
                id,
                username: username.to_string(),
                password_hash: password_hash.to_string(),
                role,
                is_active,
            },
        );
        id
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<CredentialRecord>> {
        let users = self.users.read().expect("users lock poisoned");
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<CredentialRecord>> {
        let users = self.users.read().expect("users lock poisoned");
        Ok(users.get(&id).cloned())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn insert(&self, record: TokenRecord) -> Result<()> {
        let mut tokens = self.tokens.write().expect("tokens lock poisoned");
        tokens.insert(record.token.clone(), record);
        Ok(())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<TokenRecord>> {
        let tokens = self.tokens.read().expect("tokens lock poisoned");
        Ok(tokens.get(token).cloned())
    }

    async fn find_valid_by_account(&self, account_id: Uuid) -> Result<Vec<TokenRecord>> {
        let tokens = self.tokens.read().expect("tokens lock poisoned");
        Ok(tokens
            .values()
            .filter(|t| t.account_id == account_id && !t.revoked)
            .cloned()
            .collect())
    }

    async fn revoke(&self, token: &str) -> Result<()> {
        let mut tokens = self.tokens.write().expect("tokens lock poisoned");
        if let Some(record) = tokens.get_mut(token) {
            record.revoked = true;
        }
        Ok(())
    }
}
