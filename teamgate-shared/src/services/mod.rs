/// Registration, login and administration workflows
///
/// Each service holds an injected `Arc<dyn IdentityStore>`; nothing here
/// keeps state between calls. Every operation on behalf of a caller starts
/// by resolving an [`Actor`] from the store, so authorization decisions use
/// the caller's current role and team links.

pub mod auth;
pub mod teams;
pub mod users;

use uuid::Uuid;

use crate::auth::authorization::Actor;
use crate::error::{ServiceError, ServiceResult};
use crate::models::user::Role;
use crate::store::IdentityStore;

pub use auth::AuthService;
pub use teams::TeamService;
pub use users::UserService;

pub(crate) const USER_NOT_FOUND: &str = "utilisateur non trouvé";
pub(crate) const TEAM_NOT_FOUND: &str = "team non trouvée";
pub(crate) const TEAM_REQUIRES_EMPLOYEE: &str = "seul un employé peut être affecté à une team";

/// Loads the caller and its team affiliation
///
/// Soft-deleted teams are left out: an employee of a deleted team has no
/// team scope, and a manager's scope holds live teams only.
pub async fn resolve_actor(store: &dyn IdentityStore, user_id: Uuid) -> ServiceResult<Actor> {
    let user = store
        .find_user_by_id(user_id)
        .await?
        .ok_or_else(|| ServiceError::Unauthorized("token invalide".to_string()))?;

    let team_id = match user.team_id {
        Some(team_id) if user.role == Role::Employee => store
            .find_team_by_id(team_id)
            .await?
            .map(|team| team.id),
        _ => None,
    };

    let managed_team_ids = if user.role == Role::Manager {
        store.managed_team_ids(user.id).await?
    } else {
        Vec::new()
    };

    Ok(Actor {
        id: user.id,
        role: user.role,
        team_id,
        managed_team_ids,
    })
}

/// Rejects a present-but-blank value for a required text field
pub(crate) fn required_text(value: Option<String>, field: &str) -> ServiceResult<Option<String>> {
    match value {
        Some(v) if v.trim().is_empty() => {
            Err(ServiceError::Validation(format!("le champ {} ne peut pas être vide", field)))
        }
        other => Ok(other),
    }
}

/// Maps a present empty string to "clear the value"
pub(crate) fn clearable_text(value: Option<String>) -> Option<Option<String>> {
    value.map(|v| if v.trim().is_empty() { None } else { Some(v) })
}
