//! Session token encoding and claim checks.
//!
//! Tokens are HS256-signed JWTs carrying the username as subject, the
//! account's role and the expiry claim. Signature verification and expiry
//! checking are deliberately separate: logout must still be able to read the
//! subject of an expired (but correctly signed) token, and the composite
//! usability check wants an explicit `is_expired` answer rather than a
//! decode failure.

use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{api::models::users::Role, errors::Error};

/// Claims embedded in a session token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject (username)
    pub sub: String,
    /// Account role
    pub role: Role,
    /// Issued at (unix seconds)
    pub iat: i64,
    /// Expiration time (unix seconds)
    pub exp: i64,
}

impl SessionClaims {
    /// Claims for a freshly issued token: `exp = now + lifetime`.
    pub fn new(username: &str, role: Role, lifetime: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: username.to_string(),
            role,
            iat: now.timestamp(),
            exp: now.timestamp() + lifetime.as_secs() as i64,
        }
    }

    /// Whether the embedded expiry claim lies in the past.
    pub fn is_expired(&self) -> bool {
        self.exp <= Utc::now().timestamp()
    }
}

/// Sign claims into a compact token string.
pub fn sign(claims: &SessionClaims, secret_key: &str) -> Result<String, Error> {
    let key = EncodingKey::from_secret(secret_key.as_bytes());
    encode(&Header::default(), claims, &key).map_err(|e| Error::Internal {
        operation: format!("create session token: {e}"),
    })
}

/// Verify the signature and structure of a token and return its claims.
///
/// Expiry is *not* validated here; callers combine this with
/// [`SessionClaims::is_expired`]. A malformed or mis-signed token fails
/// closed with `Error::Unauthenticated`.
pub fn decode_claims(token: &str, secret_key: &str) -> Result<SessionClaims, Error> {
    let key = DecodingKey::from_secret(secret_key.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = false;
    validation.required_spec_claims.clear();

    let token_data =
        decode::<SessionClaims>(token, &key, &validation).map_err(|e| match e.kind() {
            // Client errors - malformed tokens, bad signatures, invalid claims
            jsonwebtoken::errors::ErrorKind::InvalidToken
            | jsonwebtoken::errors::ErrorKind::InvalidSignature
            | jsonwebtoken::errors::ErrorKind::ExpiredSignature
            | jsonwebtoken::errors::ErrorKind::MissingRequiredClaim(_)
            | jsonwebtoken::errors::ErrorKind::InvalidIssuer
            | jsonwebtoken::errors::ErrorKind::InvalidAudience
            | jsonwebtoken::errors::ErrorKind::InvalidSubject
            | jsonwebtoken::errors::ErrorKind::ImmatureSignature
            | jsonwebtoken::errors::ErrorKind::Base64(_)
            | jsonwebtoken::errors::ErrorKind::Json(_)
            | jsonwebtoken::errors::ErrorKind::Utf8(_)
            | jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => {
                Error::Unauthenticated { message: None }
            }

            // Everything else is a key/configuration problem on our side
            _ => Error::Internal {
                operation: format!("session token verification: {e}"),
            },
        })?;

    Ok(token_data.claims)
}

/// Extract the subject (username) from a signed token.
///
/// Works for expired tokens; fails for anything that does not carry a valid
/// signature.
pub fn extract_username(token: &str, secret_key: &str) -> Result<String, Error> {
    Ok(decode_claims(token, secret_key)?.sub)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "test-secret-key-for-jwt";

    #[test]
    fn test_sign_and_decode_round_trip() {
        let claims = SessionClaims::new("anna.trainer", Role::Trainer, Duration::from_secs(3600));
        let token = sign(&claims, SECRET).unwrap();
        assert!(!token.is_empty());

        let decoded = decode_claims(&token, SECRET).unwrap();
        assert_eq!(decoded.sub, "anna.trainer");
        assert_eq!(decoded.role, Role::Trainer);
        assert_eq!(decoded.exp, claims.exp);
        assert!(!decoded.is_expired());
    }

    #[test]
    fn test_decode_wrong_secret() {
        let claims = SessionClaims::new("anna", Role::Trainer, Duration::from_secs(3600));
        let token = sign(&claims, SECRET).unwrap();

        let result = decode_claims(&token, "different-secret");
        assert!(matches!(
            result.unwrap_err(),
            Error::Unauthenticated { .. }
        ));
    }

    #[test]
    fn test_decode_malformed_tokens() {
        for token in ["not.a.token", "invalid", "", "too.many.parts.in.this.token"] {
            let result = decode_claims(token, SECRET);
            assert!(
                matches!(result, Err(Error::Unauthenticated { .. })),
                "expected Unauthenticated for token: {token}"
            );
        }
    }

    #[test]
    fn test_expired_token_still_decodes() {
        // Expired tokens keep a readable subject, which logout relies on.
        let mut claims = SessionClaims::new("anna", Role::Trainee, Duration::from_secs(3600));
        claims.exp = Utc::now().timestamp() - 3600;
        let token = sign(&claims, SECRET).unwrap();

        let decoded = decode_claims(&token, SECRET).unwrap();
        assert!(decoded.is_expired());
        assert_eq!(extract_username(&token, SECRET).unwrap(), "anna");
    }
}
