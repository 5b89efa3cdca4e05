//! Extractors for getting the authenticated user in handlers.

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    api::models::users::{AuthenticatedUser, Role},
    errors::Error,
};

/// Extractor that requires an authenticated identity on the request.
///
/// The request gate attaches the identity; when nothing is attached the
/// handler never runs and the client gets a 401.
pub struct CurrentUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or(Error::Unauthenticated { message: None })
    }
}

/// Role check for route groups restricted to one account type.
pub fn require_role(user: &AuthenticatedUser, required: Role) -> Result<(), Error> {
    if user.role == required {
        Ok(())
    } else {
        Err(Error::InsufficientRole { required })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn user(role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            account_id: Uuid::new_v4(),
            username: "anna".to_string(),
            role,
        }
    }

    #[test]
    fn require_role_matches_on_role() {
        assert!(require_role(&user(Role::Trainer), Role::Trainer).is_ok());
        let err = require_role(&user(Role::Trainee), Role::Trainer).unwrap_err();
        assert!(matches!(
            err,
            Error::InsufficientRole {
                required: Role::Trainer
            }
        ));
    }
}
