//! Token issuing, persistence and revocation.
//!
//! The registry owns the single-active-session policy: issuing a token for
//! an account first revokes every still-valid record of that account, and
//! the whole revoke-then-issue sequence runs under a per-account lock so two
//! racing logins cannot leave both tokens valid (or revoke each other's
//! fresh token out of order).

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::{
    auth::revocation::{RevocationLedger, RevocationStatus},
    auth::token::{self, SessionClaims},
    config::SecurityConfig,
    errors::{Error, Result},
    store::{CredentialRecord, TokenRecord, TokenStore},
};

pub struct TokenRegistry {
    tokens: Arc<dyn TokenStore>,
    ledger: Arc<RevocationLedger>,
    // Per-account critical section for revoke-all + issue-new.
    account_locks: DashMap<Uuid, Arc<Mutex<()>>>,
    secret_key: String,
    token_lifetime: Duration,
}

impl TokenRegistry {
    pub fn new(
        tokens: Arc<dyn TokenStore>,
        ledger: Arc<RevocationLedger>,
        secret_key: &str,
        security: &SecurityConfig,
    ) -> Self {
        Self {
            tokens,
            ledger,
            account_locks: DashMap::new(),
            secret_key: secret_key.to_string(),
            token_lifetime: security.token_lifetime,
        }
    }

    pub fn ledger(&self) -> &Arc<RevocationLedger> {
        &self.ledger
    }

    fn account_lock(&self, account_id: Uuid) -> Arc<Mutex<()>> {
        self.account_locks
            .entry(account_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Issue a fresh signed token for the account.
    ///
    /// Every previously valid token of the account is revoked (write-through
    /// to the token store) before the new record is persisted and the token
    /// string returned, so the new token is the account's only usable one.
    #[instrument(skip_all, fields(username = %user.username))]
    pub async fn issue(&self, user: &CredentialRecord) -> Result<String> {
        let lock = self.account_lock(user.id);
        let _guard = lock.lock().await;

        let prior = self.tokens.find_valid_by_account(user.id).await?;
        for record in &prior {
            self.tokens.revoke(&record.token).await?;
        }
        if !prior.is_empty() {
            debug!(
                count = prior.len(),
                "revoked prior tokens before issuing a new one"
            );
        }

        let claims = SessionClaims::new(&user.username, user.role, self.token_lifetime);
        let token = token::sign(&claims, &self.secret_key)?;
        self.tokens
            .insert(TokenRecord::new(token.clone(), user.id))
            .await?;

        Ok(token)
    }

    /// Revoke every still-valid token of the account. Returns the number of
    /// records revoked. Used by logout.
    #[instrument(skip(self))]
    pub async fn revoke_all_tokens_of(&self, account_id: Uuid) -> Result<usize> {
        let lock = self.account_lock(account_id);
        let _guard = lock.lock().await;

        let valid = self.tokens.find_valid_by_account(account_id).await?;
        for record in &valid {
            self.tokens.revoke(&record.token).await?;
        }
        debug!(count = valid.len(), "revoked all tokens of account");
        Ok(valid.len())
    }

    /// Put a single token string onto the in-process revocation ledger so
    /// the hot path rejects it without a store lookup. The ledger entry
    /// lives until the token's own expiry.
    pub fn invalidate_token(&self, token: &str, expires_at: i64) {
        self.ledger.record(token, expires_at);
    }

    /// Combined revocation answer for a token string: revoked if the ledger
    /// knows it, or if the persistent record is flagged revoked, or if no
    /// record exists at all (a signed token we never issued is not honored).
    pub async fn revocation_status(&self, token: &str) -> Result<RevocationStatus> {
        if self.ledger.status(token) == RevocationStatus::Revoked {
            return Ok(RevocationStatus::Revoked);
        }

        match self.tokens.find_by_token(token).await? {
            Some(record) if !record.revoked => Ok(RevocationStatus::Active),
            _ => Ok(RevocationStatus::Revoked),
        }
    }

    /// Composite usability check: the token parses and carries a valid
    /// signature, its subject matches `expected_subject`, it has not
    /// expired, and it is not revoked. Any failure, including store errors,
    /// answers `false` - the caller treats the request as unauthenticated
    /// rather than crashing the pipeline.
    pub async fn is_usable(&self, token: &str, expected_subject: &str) -> bool {
        let Ok(claims) = token::decode_claims(token, &self.secret_key) else {
            return false;
        };
        if claims.sub != expected_subject || claims.is_expired() {
            return false;
        }
        matches!(
            self.revocation_status(token).await,
            Ok(RevocationStatus::Active)
        )
    }

    /// Verify signature and structure, returning the claims. Fails closed.
    pub fn decode(&self, token: &str) -> Result<SessionClaims> {
        token::decode_claims(token, &self.secret_key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::models::users::Role;
    use crate::store::MemoryStore;

    fn registry_with_store() -> (Arc<MemoryStore>, TokenRegistry) {
        let store = Arc::new(MemoryStore::new());
        let registry = TokenRegistry::new(
            Arc::clone(&store) as Arc<dyn TokenStore>,
            Arc::new(RevocationLedger::new()),
            "test-secret",
            &SecurityConfig::default(),
        );
        (store, registry)
    }

    fn trainee(username: &str) -> CredentialRecord {
        CredentialRecord {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: String::new(),
            role: Role::Trainee,
            is_active: true,
        }
    }

    #[tokio::test]
    async fn issued_token_is_usable_for_its_subject_only() {
        let (_, registry) = registry_with_store();
        let user = trainee("bob");

        let token = registry.issue(&user).await.unwrap();
        assert!(registry.is_usable(&token, "bob").await);
        assert!(!registry.is_usable(&token, "mallory").await);
    }

    #[tokio::test]
    async fn new_login_revokes_prior_token() {
        let (_, registry) = registry_with_store();
        let user = trainee("bob");

        let first = registry.issue(&user).await.unwrap();
        assert!(registry.is_usable(&first, "bob").await);

        let second = registry.issue(&user).await.unwrap();
        assert!(!registry.is_usable(&first, "bob").await);
        assert!(registry.is_usable(&second, "bob").await);
    }

    #[tokio::test]
    async fn single_active_session_under_concurrent_logins() {
        let (store, registry) = registry_with_store();
        let registry = Arc::new(registry);
        let user = trainee("bob");

        let mut handles = Vec::new();
        for _ in 0..4 {
            let registry = Arc::clone(&registry);
            let user = user.clone();
            handles.push(tokio::spawn(async move { registry.issue(&user).await }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // All logins done: exactly one unrevoked record remains.
        let valid = store.find_valid_by_account(user.id).await.unwrap();
        assert_eq!(valid.len(), 1);
    }

    #[tokio::test]
    async fn revoke_all_leaves_no_usable_token() {
        let (_, registry) = registry_with_store();
        let user = trainee("bob");

        let token = registry.issue(&user).await.unwrap();
        let revoked = registry.revoke_all_tokens_of(user.id).await.unwrap();
        assert_eq!(revoked, 1);

        // Signature is still valid, usability is not.
        assert!(registry.decode(&token).is_ok());
        assert!(!registry.is_usable(&token, "bob").await);

        // Irreversible: repeated checks stay revoked.
        assert_eq!(
            registry.revocation_status(&token).await.unwrap(),
            RevocationStatus::Revoked
        );
    }

    #[tokio::test]
    async fn unregistered_token_is_not_honored() {
        let (_, registry) = registry_with_store();

        // Correctly signed, but never went through issue().
        let claims = SessionClaims::new("bob", Role::Trainee, Duration::from_secs(3600));
        let forged = token::sign(&claims, "test-secret").unwrap();

        assert_eq!(
            registry.revocation_status(&forged).await.unwrap(),
            RevocationStatus::Revoked
        );
        assert!(!registry.is_usable(&forged, "bob").await);
    }

    #[tokio::test]
    async fn ledger_entry_rejects_before_store_lookup() {
        let (_, registry) = registry_with_store();
        let user = trainee("bob");

        let token = registry.issue(&user).await.unwrap();
        let claims = registry.decode(&token).unwrap();
        registry.invalidate_token(&token, claims.exp);

        assert_eq!(
            registry.revocation_status(&token).await.unwrap(),
            RevocationStatus::Revoked
        );
        assert!(!registry.is_usable(&token, "bob").await);
    }

    #[tokio::test]
    async fn expired_claim_is_unusable_regardless_of_ledger() {
        let (store, registry) = registry_with_store();
        let user = trainee("bob");

        // Craft an already-expired token and register it as a valid record.
        let mut claims = SessionClaims::new("bob", Role::Trainee, Duration::from_secs(3600));
        claims.exp = chrono::Utc::now().timestamp() - 60;
        let token = token::sign(&claims, "test-secret").unwrap();
        store
            .insert(TokenRecord::new(token.clone(), user.id))
            .await
            .unwrap();

        assert!(registry.decode(&token).unwrap().is_expired());
        // Not on the ledger and the record is unrevoked, yet unusable.
        assert_eq!(registry.ledger().status(&token), RevocationStatus::Active);
        assert!(!registry.is_usable(&token, "bob").await);
    }
}
