//! PostgreSQL-backed credential and token store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, FromRow, PgPool};
use std::str::FromStr;
use std::time::Duration;
use tracing::instrument;
use uuid::Uuid;

use super::{
    CredentialRecord, CredentialStore, Result, StoreError, TokenKind, TokenRecord, TokenStore,
};
use crate::api::models::users::Role;

#[derive(Debug, Clone, FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    password_hash: String,
    role: String,
    is_active: bool,
}

impl TryFrom<UserRow> for CredentialRecord {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self> {
        let role = Role::from_str(&row.role)
            .map_err(|e| StoreError::Corrupt(format!("user {}: {e}", row.id)))?;
        Ok(CredentialRecord {
            id: row.id,
            username: row.username,
            password_hash: row.password_hash,
            role,
            is_active: row.is_active,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
struct TokenRow {
    token: String,
    account_id: Uuid,
    kind: String,
    revoked: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<TokenRow> for TokenRecord {
    type Error = StoreError;

    fn try_from(row: TokenRow) -> Result<Self> {
        let kind = match row.kind.as_str() {
            "bearer" => TokenKind::Bearer,
            other => {
                return Err(StoreError::Corrupt(format!(
                    "session token has unknown kind: {other}"
                )))
            }
        };
        Ok(TokenRecord {
            token: row.token,
            account_id: row.account_id,
            kind,
            revoked: row.revoked,
            created_at: row.created_at,
        })
    }
}

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connect to the database and run pending migrations.
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Create an account if the username is not yet taken. Used for the
    /// initial trainer account on startup; the wider platform owns regular
    /// registration.
    #[instrument(skip(self, password_hash))]
    pub async fn ensure_account(
        &self,
        username: &str,
        password_hash: &str,
        role: Role,
    ) -> Result<Uuid> {
        if let Some(existing) = self.find_by_username(username).await? {
            return Ok(existing.id);
        }

        let id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO users (id, username, password_hash, role, is_active)
             VALUES ($1, $2, $3, $4, TRUE)
             ON CONFLICT (username) DO NOTHING",
        )
        .bind(id)
        .bind(username)
        .bind(password_hash)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;

        // A concurrent insert may have won the conflict; read back the row.
        let record = self
            .find_by_username(username)
            .await?
            .ok_or_else(|| StoreError::Corrupt(format!("account {username} vanished after insert")))?;
        Ok(record.id)
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    #[instrument(skip(self), err)]
    async fn find_by_username(&self, username: &str) -> Result<Option<CredentialRecord>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, role, is_active FROM users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CredentialRecord::try_from).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_by_id(&self, id: Uuid) -> Result<Option<CredentialRecord>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, password_hash, role, is_active FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(CredentialRecord::try_from).transpose()
    }
}

#[async_trait]
impl TokenStore for PgStore {
    #[instrument(skip(self, record), fields(account_id = %record.account_id), err)]
    async fn insert(&self, record: TokenRecord) -> Result<()> {
        sqlx::query(
            "INSERT INTO session_tokens (token, account_id, kind, revoked, created_at)
             VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(&record.token)
        .bind(record.account_id)
        .bind(record.kind.as_str())
        .bind(record.revoked)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    #[instrument(skip_all, err)]
    async fn find_by_token(&self, token: &str) -> Result<Option<TokenRecord>> {
        let row = sqlx::query_as::<_, TokenRow>(
            "SELECT token, account_id, kind, revoked, created_at
             FROM session_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TokenRecord::try_from).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_valid_by_account(&self, account_id: Uuid) -> Result<Vec<TokenRecord>> {
        let rows = sqlx::query_as::<_, TokenRow>(
            "SELECT token, account_id, kind, revoked, created_at
             FROM session_tokens WHERE account_id = $1 AND NOT revoked",
        )
        .bind(account_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TokenRecord::try_from).collect()
    }

    #[instrument(skip_all, err)]
    async fn revoke(&self, token: &str) -> Result<()> {
        sqlx::query("UPDATE session_tokens SET revoked = TRUE WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
