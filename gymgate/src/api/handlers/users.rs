//! Handlers for the authenticated principal.

use axum::Json;
use serde_json::{json, Value};

use crate::{
    api::models::{auth::MeResponse, users::Role},
    auth::current_user::{require_role, CurrentUser},
    errors::Error,
};

/// Identity and authority of the caller, as resolved by the request gate.
#[tracing::instrument(skip_all)]
pub async fn me(CurrentUser(user): CurrentUser) -> Result<Json<MeResponse>, Error> {
    Ok(Json(MeResponse::from(&user)))
}

/// Trainer-only landing route; the downstream CRUD surface hangs off the
/// same authority check.
#[tracing::instrument(skip_all)]
pub async fn trainer_overview(CurrentUser(user): CurrentUser) -> Result<Json<Value>, Error> {
    require_role(&user, Role::Trainer)?;
    let authority = user.authority();
    Ok(Json(json!({
        "username": user.username,
        "authorities": [authority],
    })))
}
