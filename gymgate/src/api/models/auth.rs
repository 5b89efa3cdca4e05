//! Login and logout request/response models.

use serde::{Deserialize, Serialize};

use super::users::AuthenticatedUser;

/// Credentials submitted to `POST /user/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login response carrying the signed session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub token: String,
}

/// Identity echo for `GET /user/me`.
#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub username: String,
    pub role: String,
    pub authority: String,
}

impl From<&AuthenticatedUser> for MeResponse {
    fn from(user: &AuthenticatedUser) -> Self {
        Self {
            username: user.username.clone(),
            role: user.role.to_string(),
            authority: user.authority().to_string(),
        }
    }
}
