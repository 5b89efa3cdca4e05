//! Shared helpers for unit and integration tests.

use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use crate::{
    api,
    api::models::users::Role,
    auth::password,
    config::Config,
    store::{CredentialStore, MemoryStore, TokenStore},
    AppState,
};

pub const TRAINER_USERNAME: &str = "anna.trainer";
pub const TRAINER_PASSWORD: &str = "trainer-pass";
pub const TRAINEE_USERNAME: &str = "bob.trainee";
pub const TRAINEE_PASSWORD: &str = "trainee-pass";
pub const INACTIVE_USERNAME: &str = "ivy.inactive";
pub const INACTIVE_PASSWORD: &str = "inactive-pass";

/// Config for in-process tests: in-memory store, a fixed signing key and a
/// lockout short enough to wait out in a test.
pub fn test_config() -> Config {
    let mut config = Config {
        secret_key: Some("test-secret-key".to_string()),
        ..Config::default()
    };
    config.auth.throttle.lockout_duration = Duration::from_millis(250);
    config.auth.security.token_lifetime = Duration::from_secs(3600);
    config
}

/// A memory store seeded with one trainer, one trainee and one deactivated
/// account, all with properly hashed passwords.
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for (username, pass, role, active) in [
        (TRAINER_USERNAME, TRAINER_PASSWORD, Role::Trainer, true),
        (TRAINEE_USERNAME, TRAINEE_PASSWORD, Role::Trainee, true),
        (INACTIVE_USERNAME, INACTIVE_PASSWORD, Role::Trainee, false),
    ] {
        let hash = password::hash_string(pass).expect("hashing test password");
        store.add_account(username, &hash, role, active);
    }
    store
}

pub fn test_state() -> AppState {
    let store = seeded_store();
    AppState::new(
        test_config(),
        Arc::clone(&store) as Arc<dyn CredentialStore>,
        store as Arc<dyn TokenStore>,
    )
}

/// A full router over seeded in-memory state, ready for `oneshot` calls.
pub fn test_router() -> (Router, AppState) {
    let state = test_state();
    (api::router(state.clone()), state)
}
