/// Request authentication
///
/// Resolves an `Authorization: Bearer <access-token>` header into an
/// [`AuthContext`]. Tokens carry only the user id; the role is read from the
/// store on every request so a role change or a deletion takes effect
/// immediately.
///
/// The axum layer wrapping this lives in the API crate, which inserts the
/// resulting `AuthContext` into request extensions:
///
/// ```ignore
/// async fn handler(Extension(auth): Extension<AuthContext>) -> String {
///     format!("{} ({})", auth.user_id, auth.role)
/// }
/// ```

use axum::http::{header, HeaderMap};
use uuid::Uuid;

use super::jwt::TokenService;
use crate::models::user::Role;
use crate::store::IdentityStore;

/// Authentication context added to request extensions
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthContext {
    /// Authenticated user ID
    pub user_id: Uuid,

    /// Role as currently stored
    pub role: Role,
}

/// Error type for request authentication
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Missing authorization header
    #[error("token manquant")]
    MissingCredentials,

    /// Header present but not a Bearer credential
    #[error("token invalide")]
    InvalidFormat,

    /// Signature, expiry or token type check failed
    #[error("token invalide")]
    InvalidToken,

    /// Token subject no longer exists
    #[error("token invalide")]
    UnknownUser,

    /// Store lookup failed
    #[error("Store error: {0}")]
    Store(String),
}

/// Extracts the token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidFormat)?;

    match value.strip_prefix("Bearer ") {
        Some(token) if !token.trim().is_empty() => Ok(token.trim()),
        _ => Err(AuthError::InvalidFormat),
    }
}

/// Validates the bearer access token and loads the caller's current role
pub async fn authenticate(
    headers: &HeaderMap,
    tokens: &TokenService,
    store: &dyn IdentityStore,
) -> Result<AuthContext, AuthError> {
    let token = bearer_token(headers)?;

    let claims = tokens.validate_access_token(token).map_err(|e| {
        tracing::debug!(error = %e, "Rejected access token");
        AuthError::InvalidToken
    })?;

    let user = store
        .find_user_by_id(claims.uid)
        .await
        .map_err(|e| AuthError::Store(e.to_string()))?
        .ok_or(AuthError::UnknownUser)?;

    Ok(AuthContext {
        user_id: user.id,
        role: user.role,
    })
}
