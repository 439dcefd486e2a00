/// User administration workflow
///
/// Reads are filtered through the caller's visibility; every write is
/// admin-only and passes the write gate before touching the store.

use std::sync::Arc;

use uuid::Uuid;

use super::{
    clearable_text, required_text, resolve_actor, TEAM_NOT_FOUND, TEAM_REQUIRES_EMPLOYEE,
    USER_NOT_FOUND,
};
use crate::auth::authorization::{can_read_user, require_admin, user_visibility, AdminAction};
use crate::auth::password::CredentialHasher;
use crate::error::{ServiceError, ServiceResult};
use crate::models::user::{PublicUser, Role, UpdateUser};
use crate::store::IdentityStore;

const MIN_PASSWORD_LEN: usize = 8;

/// Partial update of a user
///
/// `None` leaves a field untouched. An empty `phone_number` clears it; an
/// empty value for any other text field is rejected.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub email: Option<String>,
    pub password: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_number: Option<String>,
    pub role: Option<String>,

    /// `Some(None)` detaches the user from its team
    pub team_id: Option<Option<Uuid>>,
}

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn IdentityStore>,
    hasher: Arc<dyn CredentialHasher>,
}

impl UserService {
    pub fn new(store: Arc<dyn IdentityStore>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { store, hasher }
    }

    /// Users visible to the caller
    pub async fn list(&self, actor_id: Uuid) -> ServiceResult<Vec<PublicUser>> {
        let actor = resolve_actor(self.store.as_ref(), actor_id).await?;
        let users = self.store.list_users(&user_visibility(&actor)).await?;

        Ok(users.iter().map(PublicUser::from).collect())
    }

    pub async fn get(&self, actor_id: Uuid, user_id: Uuid) -> ServiceResult<PublicUser> {
        let actor = resolve_actor(self.store.as_ref(), actor_id).await?;
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(USER_NOT_FOUND.to_string()))?;

        can_read_user(&actor, &user)?;

        Ok(PublicUser::from(user))
    }

    pub async fn update(
        &self,
        actor_id: Uuid,
        user_id: Uuid,
        patch: UserPatch,
    ) -> ServiceResult<PublicUser> {
        let actor = resolve_actor(self.store.as_ref(), actor_id).await?;
        require_admin(&actor, AdminAction::UpdateUser)?;

        let target = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(USER_NOT_FOUND.to_string()))?;

        let role = match patch.role.as_deref() {
            Some(name) => Some(Role::parse(name).ok_or(ServiceError::InvalidRole)?),
            None => None,
        };
        let effective_role = role.unwrap_or(target.role);

        let mut team_id = patch.team_id;
        if let Some(Some(new_team)) = team_id {
            if effective_role != Role::Employee {
                return Err(ServiceError::Validation(TEAM_REQUIRES_EMPLOYEE.to_string()));
            }
            self.store
                .find_team_by_id(new_team)
                .await?
                .ok_or_else(|| ServiceError::NotFound(TEAM_NOT_FOUND.to_string()))?;
        }
        if effective_role != Role::Employee && target.team_id.is_some() {
            team_id = Some(None);
        }

        let password_hash = match required_text(patch.password, "password")? {
            Some(password) if password.chars().count() < MIN_PASSWORD_LEN => {
                return Err(ServiceError::Validation(format!(
                    "le mot de passe doit contenir au moins {} caractères",
                    MIN_PASSWORD_LEN
                )));
            }
            Some(password) => Some(self.hasher.hash(&password)?),
            None => None,
        };

        let changes = UpdateUser {
            email: required_text(patch.email, "email")?,
            password_hash,
            first_name: required_text(patch.first_name, "first_name")?,
            last_name: required_text(patch.last_name, "last_name")?,
            phone_number: clearable_text(patch.phone_number),
            role,
            team_id,
        };

        if changes.is_empty() {
            return Ok(PublicUser::from(target));
        }

        let updated = self
            .store
            .update_user(user_id, changes)
            .await?
            .ok_or_else(|| ServiceError::NotFound(USER_NOT_FOUND.to_string()))?;

        tracing::info!(user_id = %updated.id, role = %updated.role, by = %actor.id, "User updated");

        Ok(PublicUser::from(updated))
    }

    /// Soft-deletes a user; deleting twice is `NotFound`
    pub async fn delete(&self, actor_id: Uuid, user_id: Uuid) -> ServiceResult<()> {
        let actor = resolve_actor(self.store.as_ref(), actor_id).await?;
        require_admin(&actor, AdminAction::DeleteUser)?;

        if !self.store.soft_delete_user(user_id).await? {
            return Err(ServiceError::NotFound(USER_NOT_FOUND.to_string()));
        }

        tracing::info!(user_id = %user_id, by = %actor.id, "User deleted");
        Ok(())
    }
}
