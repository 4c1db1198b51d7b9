use axum::extract::FromRef;
use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::dto::{LoginRequest, PublicUser, RegisterRequest};
use crate::auth::error::AuthError;
use crate::auth::store::{NewUser, UserStore};
use crate::auth::token::TokenKeys;
use crate::auth::validate::{validate_login, validate_register};
use crate::state::AppState;

/// Register flow: validate, hash off the request loop, create. The store's
/// unique index is what rejects a duplicate email, so two concurrent
/// registrations cannot both win.
pub async fn register(state: &AppState, req: RegisterRequest) -> Result<PublicUser, AuthError> {
    let valid = validate_register(&req).map_err(AuthError::Validation)?;

    let password_hash = state.hasher.hash(valid.password).await?;
    let user = state
        .store
        .create(NewUser {
            email: valid.email,
            password_hash,
            first_name: valid.first_name,
            last_name: valid.last_name,
        })
        .await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user.into())
}

/// Login flow. Unknown email and wrong password produce the same error so
/// the response cannot be used to probe which emails are registered.
pub async fn login(state: &AppState, req: LoginRequest) -> Result<(String, PublicUser), AuthError> {
    let valid = validate_login(&req).map_err(AuthError::Validation)?;

    let user = match state.store.get_by_email(&valid.email).await? {
        Some(user) => user,
        None => {
            warn!(email = %valid.email, "login unknown email");
            return Err(AuthError::InvalidCredentials);
        }
    };

    let ok = state
        .hasher
        .verify(valid.password, user.password_hash.clone())
        .await?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AuthError::InvalidCredentials);
    }

    // Best-effort stamp; a failure is logged and the login still succeeds.
    if let Err(e) = state.store.update_last_login(user.id).await {
        warn!(error = %e, user_id = %user.id, "last_login update failed");
    }

    let keys = TokenKeys::from_ref(state);
    let token = keys.issue(user.id)?;

    info!(user_id = %user.id, email = %user.email, "user logged in");
    Ok((token, user.into()))
}

/// Resolves a verified token subject back to a live user record. A token
/// can outlive its user, so a missing row is Unauthorized here.
pub async fn current_user(state: &AppState, user_id: Uuid) -> Result<PublicUser, AuthError> {
    let user = state
        .store
        .get_by_id(user_id)
        .await?
        .ok_or(AuthError::Unauthorized("user no longer exists"))?;
    Ok(user.into())
}
