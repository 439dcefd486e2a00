/// Workflow error taxonomy
///
/// Every workflow in [`crate::services`] returns [`ServiceError`]. The HTTP
/// layer maps each variant onto exactly one status code:
///
/// | Variant        | Status |
/// |----------------|--------|
/// | `Validation`   | 400    |
/// | `InvalidRole`  | 400    |
/// | `Unauthorized` | 401    |
/// | `Forbidden`    | 403    |
/// | `NotFound`     | 404    |
/// | `Conflict`     | 409    |
/// | `Internal`     | 500    |

use crate::auth::authorization::AuthzError;
use crate::auth::jwt::JwtError;
use crate::auth::password::PasswordError;
use crate::store::StoreError;

/// Workflow result type alias
pub type ServiceResult<T> = Result<T, ServiceError>;

/// Error type for workflow operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Malformed or missing input
    #[error("{0}")]
    Validation(String),

    /// Requested role is not one of employee, manager, admin
    #[error("rôle invalide")]
    InvalidRole,

    /// Missing, invalid or expired credentials
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated but not allowed
    #[error("{0}")]
    Forbidden(String),

    /// Entity absent or soft-deleted
    #[error("{0}")]
    NotFound(String),

    /// Unique constraint violation
    #[error("{0}")]
    Conflict(String),

    /// Hashing, signing or store failure
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(msg) => ServiceError::Conflict(msg),
            other => ServiceError::Internal(other.to_string()),
        }
    }
}

impl From<PasswordError> for ServiceError {
    fn from(err: PasswordError) -> Self {
        ServiceError::Internal(format!("password operation failed: {}", err))
    }
}

impl From<JwtError> for ServiceError {
    fn from(err: JwtError) -> Self {
        match err {
            JwtError::CreateError(msg) => ServiceError::Internal(msg),
            _ => ServiceError::Unauthorized("token invalide".to_string()),
        }
    }
}

impl From<AuthzError> for ServiceError {
    fn from(err: AuthzError) -> Self {
        match err {
            AuthzError::InvalidRole => ServiceError::InvalidRole,
            AuthzError::AdminRequired(action) => ServiceError::Forbidden(action.denial().to_string()),
            AuthzError::AccessDenied => ServiceError::Forbidden(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::authorization::AdminAction;

    #[test]
    fn test_store_conflict_maps_to_conflict() {
        let err: ServiceError = StoreError::Conflict("email déjà utilisé".to_string()).into();
        assert!(matches!(err, ServiceError::Conflict(ref m) if m == "email déjà utilisé"));
    }

    #[test]
    fn test_store_failure_maps_to_internal() {
        let err: ServiceError = StoreError::Unavailable("connection reset".to_string()).into();
        assert!(matches!(err, ServiceError::Internal(_)));
    }

    #[test]
    fn test_authz_mapping() {
        let err: ServiceError = AuthzError::AdminRequired(AdminAction::CreateTeam).into();
        assert_eq!(err.to_string(), "seul un admin peut créer des teams");

        let err: ServiceError = AuthzError::InvalidRole.into();
        assert!(matches!(err, ServiceError::InvalidRole));

        let err: ServiceError = AuthzError::AccessDenied.into();
        assert!(matches!(err, ServiceError::Forbidden(_)));
    }

    #[test]
    fn test_jwt_errors_are_unauthorized() {
        let err: ServiceError = JwtError::Expired.into();
        assert!(matches!(err, ServiceError::Unauthorized(_)));
    }
}
