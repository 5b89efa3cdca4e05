//! The request gate.
//!
//! Runs on every inbound request: extracts a bearer token when one is
//! present, applies the composite validation check and attaches the resolved
//! [`AuthenticatedUser`] to the request extensions. Requests without a
//! usable token simply continue unauthenticated - public routes (login,
//! health) work, and protected handlers reject via the
//! [`crate::auth::current_user::CurrentUser`] extractor.

use axum::{
    extract::{Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use tracing::{debug, trace};

use crate::{api::models::users::AuthenticatedUser, AppState};

/// Extract the token string from the configured header, honoring the
/// configured prefix (`Bearer ` by default).
pub fn bearer_token<'h>(
    headers: &'h HeaderMap,
    header_name: &str,
    prefix: &str,
) -> Option<&'h str> {
    let value = headers.get(header_name)?.to_str().ok()?;
    let token = value.strip_prefix(prefix)?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Middleware that authenticates bearer tokens and never rejects: failure
/// just means no identity gets attached.
pub async fn request_gate(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let security = &state.config.auth.security;
    let token = bearer_token(
        request.headers(),
        &security.header_name,
        &security.token_prefix,
    );
    if let Some(token) = token {
        match authenticate(&state, token).await {
            Some(user) => {
                trace!(
                    username = %user.username,
                    authority = user.authority(),
                    "request authenticated"
                );
                request.extensions_mut().insert(user);
            }
            None => debug!("bearer token present but not usable"),
        }
    }

    next.run(request).await
}

/// Resolve a token string into an authenticated identity.
///
/// All three legs of the composite check must hold (subject resolves, not
/// expired, not revoked) and the subject must still map to an active
/// account. Every failure mode, including store errors, collapses to `None`.
async fn authenticate(state: &AppState, token: &str) -> Option<AuthenticatedUser> {
    let claims = state.registry.decode(token).ok()?;

    let record = state
        .credentials
        .find_by_username(&claims.sub)
        .await
        .ok()
        .flatten()?;
    if !record.is_active {
        return None;
    }

    if !state.registry.is_usable(token, &record.username).await {
        return None;
    }

    Some(AuthenticatedUser {
        account_id: record.id,
        username: record.username,
        role: record.role,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("Authorization", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[test]
    fn extracts_token_behind_prefix() {
        let headers = headers_with("Bearer abc.def.ghi");
        assert_eq!(
            bearer_token(&headers, "Authorization", "Bearer "),
            Some("abc.def.ghi")
        );
    }

    #[test]
    fn rejects_missing_header_wrong_prefix_and_empty_token() {
        assert_eq!(
            bearer_token(&HeaderMap::new(), "Authorization", "Bearer "),
            None
        );
        assert_eq!(
            bearer_token(&headers_with("Basic abc"), "Authorization", "Bearer "),
            None
        );
        assert_eq!(
            bearer_token(&headers_with("Bearer "), "Authorization", "Bearer "),
            None
        );
        assert_eq!(
            bearer_token(&headers_with("Bearer    "), "Authorization", "Bearer "),
            None
        );
    }
}
