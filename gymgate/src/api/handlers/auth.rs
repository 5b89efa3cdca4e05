//! Login and logout handlers.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::HeaderMap,
    Json,
};

use crate::{
    api::models::auth::{LoginRequest, TokenResponse},
    auth::{middleware::bearer_token, password, revocation::RevocationStatus},
    errors::Error,
    AppState,
};

/// Login with username and password.
///
/// The attempt runs as a straight-line state machine: unparseable payload is
/// fatal for the request (400, no throttle interaction), a locked-out
/// username answers 403 before any credential work, a credential mismatch
/// records a failed attempt and answers 401, and success resets the counter
/// and issues a fresh token.
#[tracing::instrument(skip_all)]
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<TokenResponse>, Error> {
    let Json(request) = payload.map_err(|e| Error::BadRequest {
        message: format!("Invalid login payload: {e}"),
    })?;

    if request.username.is_empty() || request.password.is_empty() {
        return Err(Error::BadRequest {
            message: "Username and password are required".to_string(),
        });
    }

    if state.throttle.is_blocked(&request.username) {
        return Err(Error::Blocked);
    }

    let user = match state.credentials.find_by_username(&request.username).await? {
        Some(user) if user.is_active => user,
        // Unknown and inactive accounts count as failed attempts too;
        // both answer with the same message to avoid enumeration.
        _ => {
            state.throttle.register_failed_attempt(&request.username);
            return Err(invalid_credentials());
        }
    };

    // Verify the password on a blocking thread to avoid stalling the runtime
    let password = request.password.clone();
    let hash = user.password_hash.clone();
    let is_valid = tokio::task::spawn_blocking(move || password::verify_string(&password, &hash))
        .await
        .map_err(|e| Error::Internal {
            operation: format!("spawn password verification task: {e}"),
        })??;

    if !is_valid {
        state.throttle.register_failed_attempt(&request.username);
        return Err(invalid_credentials());
    }

    state.throttle.reset_attempts(&request.username);
    let token = state.registry.issue(&user).await?;

    Ok(Json(TokenResponse { token }))
}

/// Logout, revoking every session of the authenticated account.
///
/// The bearer token must be present, decodable and not already revoked;
/// anything else is an authentication failure. On success all of the
/// account's tokens are revoked, not just the presented one.
#[tracing::instrument(skip_all)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Result<String, Error> {
    let security = &state.config.auth.security;
    let token = bearer_token(&headers, &security.header_name, &security.token_prefix)
        .ok_or_else(authentication_failed)?;

    let claims = state
        .registry
        .decode(token)
        .map_err(|_| authentication_failed())?;

    if state.registry.revocation_status(token).await? == RevocationStatus::Revoked {
        return Err(authentication_failed());
    }

    let user = state
        .credentials
        .find_by_username(&claims.sub)
        .await?
        .ok_or_else(authentication_failed)?;

    state.registry.revoke_all_tokens_of(user.id).await?;
    state.registry.invalidate_token(token, claims.exp);

    Ok("Successfully logged out.".to_string())
}

fn invalid_credentials() -> Error {
    Error::Unauthenticated {
        message: Some("Invalid username or password".to_string()),
    }
}

fn authentication_failed() -> Error {
    Error::Unauthenticated {
        message: Some("Authentication failed".to_string()),
    }
}
