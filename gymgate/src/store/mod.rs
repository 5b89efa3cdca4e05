//! Credential and session-token storage.
//!
//! The wider gym platform owns the user accounts; this service only needs two
//! lookups from that store, expressed by [`CredentialStore`]. Session tokens
//! are owned here and go through [`TokenStore`]. Both traits have a Postgres
//! implementation ([`postgres::PgStore`]) for production and an in-process
//! implementation ([`memory::MemoryStore`]) used by tests and when no
//! database is configured.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::api::models::users::Role;

/// Unified error type for store operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database operation failed
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A row held data the application cannot interpret
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A stored account credential, read-only to this service.
#[derive(Debug, Clone)]
pub struct CredentialRecord {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub is_active: bool,
}

/// Kind of the issued artifact. A single variant today; stored as text so new
/// kinds can be introduced without a schema change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Bearer,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Bearer => "bearer",
        }
    }
}

/// A persisted session-token record. Mutated only by flipping `revoked`.
#[derive(Debug, Clone)]
pub struct TokenRecord {
    pub token: String,
    pub account_id: Uuid,
    pub kind: TokenKind,
    pub revoked: bool,
    pub created_at: DateTime<Utc>,
}

impl TokenRecord {
    pub fn new(token: String, account_id: Uuid) -> Self {
        Self {
            token,
            account_id,
            kind: TokenKind::Bearer,
            revoked: false,
            created_at: Utc::now(),
        }
    }
}

/// Lookup contract the token core needs from the platform's user store.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_by_username(&self, username: &str) -> Result<Option<CredentialRecord>>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CredentialRecord>>;
}

/// Persistence contract for issued session tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist a freshly issued token record.
    async fn insert(&self, record: TokenRecord) -> Result<()>;

    /// Look up a token record by its token string.
    async fn find_by_token(&self, token: &str) -> Result<Option<TokenRecord>>;

    /// All non-revoked tokens belonging to an account.
    async fn find_valid_by_account(&self, account_id: Uuid) -> Result<Vec<TokenRecord>>;

    /// Flip the revoked flag for a single token. Idempotent.
    async fn revoke(&self, token: &str) -> Result<()>;
}
