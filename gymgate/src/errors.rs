use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error as ThisError;

use crate::{api::models::users::Role, store::StoreError};

#[derive(ThisError, Debug)]
pub enum Error {
    /// Authentication required but not provided, or credentials rejected
    #[error("Not authenticated")]
    Unauthenticated { message: Option<String> },

    /// Username is temporarily locked out after repeated failed logins
    #[error("Account temporarily blocked")]
    Blocked,

    /// User lacks the role required for the route
    #[error("Insufficient permissions: {required:?} role required")]
    InsufficientRole { required: Role },

    /// Invalid request data
    #[error("{message}")]
    BadRequest { message: String },

    /// Generic internal service error
    #[error("Failed to {operation}")]
    Internal { operation: String },

    /// Credential or token store error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthenticated { .. } => StatusCode::UNAUTHORIZED,
            Error::Blocked | Error::InsufficientRole { .. } => StatusCode::FORBIDDEN,
            Error::BadRequest { .. } => StatusCode::BAD_REQUEST,
            Error::Internal { .. } | Error::Store(_) | Error::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Returns a user-safe error message, without leaking internal details
    pub fn user_message(&self) -> String {
        match self {
            Error::Unauthenticated { message } => message
                .clone()
                .unwrap_or_else(|| "Authentication required".to_string()),
            Error::Blocked => "User is temporarily blocked due to failed login attempts".to_string(),
            Error::InsufficientRole { required } => {
                format!("Access restricted to {} accounts", required.authority())
            }
            Error::BadRequest { message } => message.clone(),
            Error::Internal { .. } | Error::Store(_) | Error::Other(_) => {
                "Internal server error".to_string()
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - level depends on severity
        match &self {
            Error::Internal { .. } | Error::Store(_) | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Unauthenticated { .. } | Error::Blocked | Error::InsufficientRole { .. } => {
                tracing::info!("Authorization error: {}", self);
            }
            Error::BadRequest { .. } => {
                tracing::debug!("Client error: {}", self);
            }
        }

        let status = self.status_code();

        match &self {
            // Login failures surface as structured JSON so the frontend can
            // show the message verbatim
            Error::Unauthenticated { .. } | Error::Blocked | Error::InsufficientRole { .. } => {
                let body = json!({ "message": self.user_message() });
                (status, axum::response::Json(body)).into_response()
            }
            _ => (status, self.user_message()).into_response(),
        }
    }
}

/// Type alias for service operation results
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_the_taxonomy() {
        assert_eq!(
            Error::Unauthenticated { message: None }.status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(Error::Blocked.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(
            Error::InsufficientRole {
                required: Role::Trainer
            }
            .status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            Error::BadRequest {
                message: "nope".to_string()
            }
            .status_code(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = Error::Internal {
            operation: "connect to secret backend at 10.0.0.1".to_string(),
        };
        assert_eq!(err.user_message(), "Internal server error");
    }
}
