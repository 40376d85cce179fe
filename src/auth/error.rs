use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::error;

use crate::auth::repo::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Username already exists.")]
    DuplicateUsername,
    #[error("Email already registered.")]
    DuplicateEmail,
    // Same text for unknown user and wrong password.
    #[error("Invalid username or password.")]
    InvalidCredentials,
    #[error("Please log in to access this page.")]
    Unauthenticated,
    #[error("Passwords do not match.")]
    PasswordMismatch,
    #[error("{0} is required.")]
    MissingField(&'static str),
    #[error("{0} is too long.")]
    TooLong(&'static str),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::DuplicateUsername | AuthError::DuplicateEmail => StatusCode::CONFLICT,
            AuthError::InvalidCredentials | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::PasswordMismatch | AuthError::MissingField(_) | AuthError::TooLong(_) => {
                StatusCode::BAD_REQUEST
            }
            AuthError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the end user.
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Internal(_) => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateUsername => AuthError::DuplicateUsername,
            StoreError::DuplicateEmail => AuthError::DuplicateEmail,
            StoreError::Database(e) => AuthError::Internal(anyhow::Error::new(e).context("credential store")),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Unauthenticated => Redirect::to("/login").into_response(),
            AuthError::Internal(e) => {
                error!(error = ?e, "request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            }
            other => (other.status(), other.to_string()).into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_duplicates_map_to_auth_duplicates() {
        assert!(matches!(
            AuthError::from(StoreError::DuplicateUsername),
            AuthError::DuplicateUsername
        ));
        assert!(matches!(
            AuthError::from(StoreError::DuplicateEmail),
            AuthError::DuplicateEmail
        ));
    }

    #[test]
    fn internal_errors_do_not_leak_details() {
        let err = AuthError::from(StoreError::Database(sqlx::Error::PoolTimedOut));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.user_message(), "Internal server error");

        let res = err.into_response();
        assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn too_long_is_a_client_error() {
        let err = AuthError::TooLong("Username");
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.user_message(), "Username is too long.");
    }

    #[test]
    fn unauthenticated_redirects_to_login() {
        let res = AuthError::Unauthenticated.into_response();
        assert_eq!(res.status(), StatusCode::SEE_OTHER);
        assert_eq!(res.headers()[axum::http::header::LOCATION], "/login");
    }
}
