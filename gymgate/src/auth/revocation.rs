//! In-process revocation ledger.
//!
//! The ledger is the fast path for rejecting tokens that were explicitly
//! invalidated (logout) before their natural expiry. It is read on every
//! authenticated request, so it is a sharded lock-free map rather than a
//! mutex-guarded one. Entries carry the token's expiry timestamp and a
//! background sweeper drops them once the token would have expired anyway,
//! keeping the map from growing without bound.

use chrono::Utc;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

/// Whether a token is still honored or has been revoked.
///
/// Deliberately a two-state tag instead of a boolean: call sites read as
/// `status == Revoked`, leaving no room for inverted-polarity mistakes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevocationStatus {
    Active,
    Revoked,
}

#[derive(Default)]
pub struct RevocationLedger {
    // token string -> expiry (unix seconds)
    entries: DashMap<String, i64>,
}

impl RevocationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a token as revoked until `expires_at` (unix seconds).
    pub fn record(&self, token: &str, expires_at: i64) {
        self.entries.insert(token.to_string(), expires_at);
    }

    /// Ledger-only membership check. The registry combines this with the
    /// persistent token records for the full revocation answer.
    pub fn status(&self, token: &str) -> RevocationStatus {
        if self.entries.contains_key(token) {
            RevocationStatus::Revoked
        } else {
            RevocationStatus::Active
        }
    }

    /// Drop entries whose token has expired on its own. Returns the number
    /// of entries removed.
    pub fn purge_expired(&self, now: i64) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, expires_at| *expires_at > now);
        before - self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Periodically purge expired ledger entries.
pub fn spawn_sweeper(ledger: Arc<RevocationLedger>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        // First tick fires immediately; skip it so a fresh ledger is not
        // swept before anything is in it.
        interval.tick().await;
        loop {
            interval.tick().await;
            let removed = ledger.purge_expired(Utc::now().timestamp());
            if removed > 0 {
                debug!(removed, "swept expired revocation ledger entries");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_tokens_are_revoked() {
        let ledger = RevocationLedger::new();
        let future = Utc::now().timestamp() + 3600;

        assert_eq!(ledger.status("tok"), RevocationStatus::Active);
        ledger.record("tok", future);
        assert_eq!(ledger.status("tok"), RevocationStatus::Revoked);
        // revocation is not undone by a repeated lookup
        assert_eq!(ledger.status("tok"), RevocationStatus::Revoked);
    }

    #[test]
    fn purge_drops_only_expired_entries() {
        let ledger = RevocationLedger::new();
        let now = Utc::now().timestamp();

        ledger.record("old", now - 10);
        ledger.record("fresh", now + 3600);
        assert_eq!(ledger.len(), 2);

        let removed = ledger.purge_expired(now);
        assert_eq!(removed, 1);
        assert_eq!(ledger.status("old"), RevocationStatus::Active);
        assert_eq!(ledger.status("fresh"), RevocationStatus::Revoked);
    }

    #[tokio::test]
    async fn sweeper_purges_in_the_background() {
        let ledger = Arc::new(RevocationLedger::new());
        ledger.record("stale", Utc::now().timestamp() - 5);

        let handle = spawn_sweeper(Arc::clone(&ledger), Duration::from_millis(10));
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.abort();

        assert!(ledger.is_empty());
    }
}
