//! HTTP API surface: models, handlers and the router.

pub mod handlers;
pub mod models;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{auth::middleware::request_gate, AppState};

/// Build the application router with the request gate applied to every
/// route. Login and health are public by virtue of not requiring an
/// authenticated identity; everything else rejects through the
/// `CurrentUser` extractor.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/user/login", post(handlers::auth::login))
        .route("/user/logout", post(handlers::auth::logout))
        .route("/user/me", get(handlers::users::me))
        .route("/trainer/overview", get(handlers::users::trainer_overview))
        .layer(from_fn_with_state(state.clone(), request_gate))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
