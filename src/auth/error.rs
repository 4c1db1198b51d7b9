use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::auth::{store::StoreError, token::TokenError, validate::FieldErrors};

/// Closed set of failures the auth flows can produce. Everything a handler
/// returns goes through this type; internal detail stays in the logs.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("validation failed")]
    Validation(FieldErrors),
    #[error("email already registered")]
    DuplicateEmail,
    /// Same wording whether the email is unknown or the password is wrong,
    /// so responses cannot be used to enumerate registered emails.
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("{0}")]
    Unauthorized(&'static str),
    #[error("storage unavailable")]
    StorageUnavailable,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateEmail => AuthError::DuplicateEmail,
            StoreError::Unavailable => AuthError::StorageUnavailable,
            StoreError::NotFound => AuthError::Internal(anyhow::anyhow!("user row missing")),
            StoreError::Database(e) => AuthError::Internal(e.into()),
        }
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AuthError::Unauthorized("token expired"),
            TokenError::Invalid => AuthError::Unauthorized("invalid token"),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        match self {
            AuthError::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "errors": errors })),
            )
                .into_response(),
            AuthError::DuplicateEmail => (
                StatusCode::CONFLICT,
                Json(json!({ "error": "email already registered" })),
            )
                .into_response(),
            AuthError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "invalid email or password" })),
            )
                .into_response(),
            AuthError::Unauthorized(msg) => {
                (StatusCode::UNAUTHORIZED, Json(json!({ "error": msg }))).into_response()
            }
            AuthError::StorageUnavailable => (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({ "error": "service temporarily unavailable" })),
            )
                .into_response(),
            AuthError::Internal(e) => {
                error!(error = %e, "internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal server error" })),
                )
                    .into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_match_the_taxonomy() {
        let cases = [
            (AuthError::Validation(FieldErrors::new()), StatusCode::BAD_REQUEST),
            (AuthError::DuplicateEmail, StatusCode::CONFLICT),
            (AuthError::InvalidCredentials, StatusCode::UNAUTHORIZED),
            (AuthError::Unauthorized("token expired"), StatusCode::UNAUTHORIZED),
            (AuthError::StorageUnavailable, StatusCode::SERVICE_UNAVAILABLE),
            (
                AuthError::Internal(anyhow::anyhow!("boom")),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (err, expected) in cases {
            assert_eq!(err.into_response().status(), expected);
        }
    }

    #[test]
    fn token_errors_map_to_unauthorized_with_distinct_messages() {
        let expired: AuthError = TokenError::Expired.into();
        let invalid: AuthError = TokenError::Invalid.into();
        assert_eq!(expired.to_string(), "token expired");
        assert_eq!(invalid.to_string(), "invalid token");
    }

    #[test]
    fn internal_body_never_echoes_detail() {
        let response = AuthError::Internal(anyhow::anyhow!("connection refused to 10.0.0.3"))
            .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
