/// Team administration workflow
///
/// Team listings carry their employees and managers, each filtered through
/// the caller's user visibility. Manager links are idempotent: adding a
/// present link or removing an absent one succeeds.

use std::sync::Arc;

use uuid::Uuid;

use super::{clearable_text, required_text, resolve_actor, TEAM_NOT_FOUND};
use crate::auth::authorization::{
    can_read_team, require_admin, team_visibility, user_visibility, Actor, AdminAction,
};
use crate::error::{ServiceError, ServiceResult};
use crate::models::team::{CreateTeam, Team, TeamDetails, UpdateTeam};
use crate::models::user::{PublicUser, Role};
use crate::store::IdentityStore;

const MANAGER_NOT_FOUND: &str = "manager non trouvé";
const NOT_A_MANAGER: &str = "l'utilisateur n'est pas un manager";

/// Team creation input
#[derive(Debug, Clone, Default)]
pub struct NewTeam {
    pub name: String,
    pub description: Option<String>,
}

/// Partial update of a team; an empty description clears it
#[derive(Debug, Clone, Default)]
pub struct TeamPatch {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Clone)]
pub struct TeamService {
    store: Arc<dyn IdentityStore>,
}

impl TeamService {
    pub fn new(store: Arc<dyn IdentityStore>) -> Self {
        Self { store }
    }

    async fn details(&self, actor: &Actor, team: Team) -> ServiceResult<TeamDetails> {
        let visibility = user_visibility(actor);

        let employees: Vec<PublicUser> = self
            .store
            .list_team_employees(team.id)
            .await?
            .iter()
            .filter(|u| visibility.permits(u))
            .map(PublicUser::from)
            .collect();
        let managers: Vec<PublicUser> = self
            .store
            .list_team_managers(team.id)
            .await?
            .iter()
            .filter(|u| visibility.permits(u))
            .map(PublicUser::from)
            .collect();

        Ok(TeamDetails {
            team,
            employees,
            managers,
        })
    }

    async fn live_team(&self, team_id: Uuid) -> ServiceResult<Team> {
        self.store
            .find_team_by_id(team_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(TEAM_NOT_FOUND.to_string()))
    }

    /// Teams visible to the caller
    pub async fn list(&self, actor_id: Uuid) -> ServiceResult<Vec<TeamDetails>> {
        let actor = resolve_actor(self.store.as_ref(), actor_id).await?;
        let teams = self.store.list_teams(&team_visibility(&actor)).await?;

        let mut details = Vec::with_capacity(teams.len());
        for team in teams {
            details.push(self.details(&actor, team).await?);
        }
        Ok(details)
    }

    pub async fn get(&self, actor_id: Uuid, team_id: Uuid) -> ServiceResult<TeamDetails> {
        let actor = resolve_actor(self.store.as_ref(), actor_id).await?;
        let team = self.live_team(team_id).await?;

        can_read_team(&actor, team.id)?;

        self.details(&actor, team).await
    }

    pub async fn create(&self, actor_id: Uuid, input: NewTeam) -> ServiceResult<Team> {
        let actor = resolve_actor(self.store.as_ref(), actor_id).await?;
        require_admin(&actor, AdminAction::CreateTeam)?;

        if input.name.trim().is_empty() {
            return Err(ServiceError::Validation(
                "le champ name ne peut pas être vide".to_string(),
            ));
        }

        let team = self
            .store
            .create_team(CreateTeam {
                name: input.name,
                description: input.description.filter(|d| !d.trim().is_empty()),
                created_by: actor.id,
            })
            .await?;

        tracing::info!(team_id = %team.id, by = %actor.id, "Team created");
        Ok(team)
    }

    pub async fn update(&self, actor_id: Uuid, team_id: Uuid, patch: TeamPatch) -> ServiceResult<Team> {
        let actor = resolve_actor(self.store.as_ref(), actor_id).await?;
        require_admin(&actor, AdminAction::UpdateTeam)?;

        let changes = UpdateTeam {
            name: required_text(patch.name, "name")?,
            description: clearable_text(patch.description),
        };

        let team = self
            .store
            .update_team(team_id, changes)
            .await?
            .ok_or_else(|| ServiceError::NotFound(TEAM_NOT_FOUND.to_string()))?;

        tracing::info!(team_id = %team.id, by = %actor.id, "Team updated");
        Ok(team)
    }

    /// Soft-deletes a team; deleting twice is `NotFound`
    pub async fn delete(&self, actor_id: Uuid, team_id: Uuid) -> ServiceResult<()> {
        let actor = resolve_actor(self.store.as_ref(), actor_id).await?;
        require_admin(&actor, AdminAction::DeleteTeam)?;

        if !self.store.soft_delete_team(team_id).await? {
            return Err(ServiceError::NotFound(TEAM_NOT_FOUND.to_string()));
        }

        tracing::info!(team_id = %team_id, by = %actor.id, "Team deleted");
        Ok(())
    }

    async fn manager(&self, manager_id: Uuid) -> ServiceResult<()> {
        let manager = self
            .store
            .find_user_by_id(manager_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(MANAGER_NOT_FOUND.to_string()))?;

        if manager.role != Role::Manager {
            return Err(ServiceError::Validation(NOT_A_MANAGER.to_string()));
        }
        Ok(())
    }

    /// Links a manager to a team
    pub async fn add_manager(&self, actor_id: Uuid, team_id: Uuid, manager_id: Uuid) -> ServiceResult<()> {
        let actor = resolve_actor(self.store.as_ref(), actor_id).await?;
        require_admin(&actor, AdminAction::AddManager)?;

        self.manager(manager_id).await?;
        self.live_team(team_id).await?;

        self.store.add_team_manager(team_id, manager_id).await?;

        tracing::info!(team_id = %team_id, manager_id = %manager_id, "Manager linked to team");
        Ok(())
    }

    /// Unlinks a manager from a team
    pub async fn remove_manager(
        &self,
        actor_id: Uuid,
        team_id: Uuid,
        manager_id: Uuid,
    ) -> ServiceResult<()> {
        let actor = resolve_actor(self.store.as_ref(), actor_id).await?;
        require_admin(&actor, AdminAction::RemoveManager)?;

        // Any role: a demoted manager may still need detaching
        self.store
            .find_user_by_id(manager_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(MANAGER_NOT_FOUND.to_string()))?;
        self.live_team(team_id).await?;

        self.store.remove_team_manager(team_id, manager_id).await?;

        tracing::info!(team_id = %team_id, manager_id = %manager_id, "Manager unlinked from team");
        Ok(())
    }
}
