//! gymgate - authentication and session-token lifecycle for the gym platform.
//!
//! The wider platform is a CRUD backend for trainees, trainers and training
//! sessions; this service is its security edge. It owns login throttling,
//! token issuing with a single-active-session policy, token validation and
//! revocation, and the request gate that turns bearer headers into
//! authenticated identities for downstream authorization.
//!
//! # Architecture
//!
//! - [`config`]: figment-based configuration with env overrides
//! - [`errors`]: the service error taxonomy and HTTP mapping
//! - [`store`]: credential/token storage contracts, Postgres and in-memory
//! - [`auth`]: the token core (throttle, registry, validator, gate)
//! - [`api`]: HTTP models, handlers and the router

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub mod api;
pub mod auth;
pub mod config;
pub mod errors;
pub mod store;
pub mod telemetry;
pub mod test_utils;

pub use config::Config;

use crate::{
    api::models::users::Role,
    auth::{
        password,
        registry::TokenRegistry,
        revocation::{self, RevocationLedger},
        throttle::LoginThrottle,
    },
    store::{CredentialStore, MemoryStore, PgStore, TokenStore},
};

/// Application state shared across all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub credentials: Arc<dyn CredentialStore>,
    pub throttle: Arc<LoginThrottle>,
    pub registry: Arc<TokenRegistry>,
}

impl AppState {
    /// Assemble the state from a config and a pair of store handles.
    pub fn new(
        config: Config,
        credentials: Arc<dyn CredentialStore>,
        tokens: Arc<dyn TokenStore>,
    ) -> Self {
        let ledger = Arc::new(RevocationLedger::new());
        let registry = Arc::new(TokenRegistry::new(
            tokens,
            ledger,
            config.secret_key(),
            &config.auth.security,
        ));
        let throttle = Arc::new(LoginThrottle::new(&config.auth.throttle));

        Self {
            config,
            credentials,
            throttle,
            registry,
        }
    }
}

pub struct Application {
    router: axum::Router,
    config: Config,
    sweeper: JoinHandle<()>,
}

impl Application {
    /// Create a new application instance with all resources initialized.
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        let (credentials, tokens) = setup_stores(&config).await?;
        let state = AppState::new(config.clone(), credentials, tokens);

        let sweeper = revocation::spawn_sweeper(
            Arc::clone(state.registry.ledger()),
            config.auth.security.revocation_sweep_interval,
        );

        let router = api::router(state);

        Ok(Self {
            router,
            config,
            sweeper,
        })
    }

    /// Start serving the application.
    pub async fn serve<F>(self, shutdown: F) -> anyhow::Result<()>
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let bind_addr = self.config.bind_address();
        let listener = TcpListener::bind(&bind_addr).await?;
        info!("gymgate listening on http://{bind_addr}");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown)
            .await?;

        // The sweeper has no state worth flushing; stop it outright.
        self.sweeper.abort();
        info!("Gracefully shut down");

        Ok(())
    }
}

/// Build the configured stores and make sure the initial trainer account
/// exists when one is configured.
async fn setup_stores(
    config: &Config,
) -> anyhow::Result<(Arc<dyn CredentialStore>, Arc<dyn TokenStore>)> {
    let admin = match (&config.admin_username, &config.admin_password) {
        (Some(username), Some(pass)) => {
            let pass = pass.clone();
            let hash = tokio::task::spawn_blocking(move || password::hash_string(&pass))
                .await
                .context("password hashing task panicked")?
                .map_err(|e| anyhow::anyhow!("failed to hash admin password: {e}"))?;
            Some((username.clone(), hash))
        }
        _ => None,
    };

    match &config.database_url {
        Some(url) => {
            let store = PgStore::connect(url)
                .await
                .context("Failed to connect to database")?;
            if let Some((username, hash)) = admin {
                let id = store.ensure_account(&username, &hash, Role::Trainer).await?;
                info!(%username, %id, "initial trainer account present");
            }
            let store = Arc::new(store);
            Ok((
                Arc::clone(&store) as Arc<dyn CredentialStore>,
                store as Arc<dyn TokenStore>,
            ))
        }
        None => {
            warn!("no database_url configured; using in-memory stores (state is lost on restart)");
            let store = Arc::new(MemoryStore::new());
            if let Some((username, hash)) = admin {
                let id = store.add_account(&username, &hash, Role::Trainer, true);
                info!(%username, %id, "initial trainer account present");
            }
            Ok((
                Arc::clone(&store) as Arc<dyn CredentialStore>,
                store as Arc<dyn TokenStore>,
            ))
        }
    }
}
