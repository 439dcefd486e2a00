/// In-memory identity store
///
/// Users and teams live in insertion-ordered vectors behind a single
/// `tokio::sync::RwLock`; manager links are `(team_id, user_id)` pairs. Each
/// trait call takes the lock once, so compare-and-swap rotation is atomic
/// with respect to concurrent callers.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{IdentityStore, StoreError, EMAIL_TAKEN};
use crate::auth::authorization::{TeamVisibility, UserVisibility};
use crate::models::team::{CreateTeam, Team, UpdateTeam};
use crate::models::user::{CreateUser, Role, UpdateUser, User};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<User>,
    teams: Vec<Team>,
    manager_teams: HashSet<(Uuid, Uuid)>,
}

impl Tables {
    fn live_user(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id && u.deleted_at.is_none())
    }

    fn live_user_mut(&mut self, id: Uuid) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.id == id && u.deleted_at.is_none())
    }

    fn live_team(&self, id: Uuid) -> Option<&Team> {
        self.teams.iter().find(|t| t.id == id && t.deleted_at.is_none())
    }

    fn live_team_mut(&mut self, id: Uuid) -> Option<&mut Team> {
        self.teams.iter_mut().find(|t| t.id == id && t.deleted_at.is_none())
    }

    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .iter()
            .any(|u| u.deleted_at.is_none() && u.email == email && Some(u.id) != except)
    }
}

/// Identity store backed by process memory
#[derive(Debug, Clone, Default)]
pub struct MemoryIdentityStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn admin_exists(&self) -> Result<bool, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .any(|u| u.deleted_at.is_none() && u.role == Role::Admin))
    }

    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        let mut tables = self.tables.write().await;
        if tables.email_taken(&data.email, None) {
            return Err(StoreError::Conflict(EMAIL_TAKEN.to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            password_hash: data.password_hash,
            first_name: data.first_name,
            last_name: data.last_name,
            phone_number: data.phone_number,
            role: data.role,
            created_by: data.created_by,
            team_id: data.team_id,
            refresh_token: None,
            refresh_expires_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        tables.users.push(user.clone());

        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.live_user(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .find(|u| u.deleted_at.is_none() && u.email == email)
            .cloned())
    }

    async fn list_users(&self, visibility: &UserVisibility) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| u.deleted_at.is_none() && visibility.permits(u))
            .cloned()
            .collect())
    }

    async fn update_user(&self, id: Uuid, changes: UpdateUser) -> Result<Option<User>, StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(email) = &changes.email {
            if tables.email_taken(email, Some(id)) {
                return Err(StoreError::Conflict(EMAIL_TAKEN.to_string()));
            }
        }

        let leaves_manager_role = matches!(changes.role, Some(role) if role != Role::Manager);

        let Some(user) = tables.live_user_mut(id) else {
            return Ok(None);
        };

        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(password_hash) = changes.password_hash {
            user.password_hash = password_hash;
        }
        if let Some(first_name) = changes.first_name {
            user.first_name = first_name;
        }
        if let Some(last_name) = changes.last_name {
            user.last_name = last_name;
        }
        if let Some(phone_number) = changes.phone_number {
            user.phone_number = phone_number;
        }
        if let Some(role) = changes.role {
            user.role = role;
        }
        if let Some(team_id) = changes.team_id {
            user.team_id = team_id;
        }
        user.updated_at = Utc::now();
        let updated = user.clone();

        if leaves_manager_role {
            tables.manager_teams.retain(|(_, manager_id)| *manager_id != id);
        }

        Ok(Some(updated))
    }

    async fn soft_delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.live_user_mut(id) {
            Some(user) => {
                user.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn store_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.live_user_mut(user_id) {
            Some(user) => {
                user.refresh_token = Some(token.to_string());
                user.refresh_expires_at = Some(expires_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        old: &str,
        new: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(user) = tables.live_user_mut(user_id) else {
            return Ok(false);
        };

        if !user.refresh_token_matches(old, Utc::now()) {
            return Ok(false);
        }

        user.refresh_token = Some(new.to_string());
        user.refresh_expires_at = Some(expires_at);
        Ok(true)
    }

    async fn revoke_refresh_token(&self, user_id: Uuid) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if let Some(user) = tables.live_user_mut(user_id) {
            user.refresh_token = None;
            user.refresh_expires_at = None;
        }
        Ok(())
    }

    async fn create_team(&self, data: CreateTeam) -> Result<Team, StoreError> {
        let now = Utc::now();
        let team = Team {
            id: Uuid::new_v4(),
            name: data.name,
            description: data.description,
            created_by: data.created_by,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.tables.write().await.teams.push(team.clone());
        Ok(team)
    }

    async fn find_team_by_id(&self, id: Uuid) -> Result<Option<Team>, StoreError> {
        Ok(self.tables.read().await.live_team(id).cloned())
    }

    async fn list_teams(&self, visibility: &TeamVisibility) -> Result<Vec<Team>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .teams
            .iter()
            .filter(|t| t.deleted_at.is_none() && visibility.permits(t.id))
            .cloned()
            .collect())
    }

    async fn update_team(&self, id: Uuid, changes: UpdateTeam) -> Result<Option<Team>, StoreError> {
        let mut tables = self.tables.write().await;
        let Some(team) = tables.live_team_mut(id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            team.name = name;
        }
        if let Some(description) = changes.description {
            team.description = description;
        }
        team.updated_at = Utc::now();

        Ok(Some(team.clone()))
    }

    async fn soft_delete_team(&self, id: Uuid) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.live_team_mut(id) {
            Some(team) => {
                team.deleted_at = Some(Utc::now());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn managed_team_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .teams
            .iter()
            .filter(|t| t.deleted_at.is_none() && tables.manager_teams.contains(&(t.id, user_id)))
            .map(|t| t.id)
            .collect())
    }

    async fn list_team_employees(&self, team_id: Uuid) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| {
                u.deleted_at.is_none() && u.role == Role::Employee && u.team_id == Some(team_id)
            })
            .cloned()
            .collect())
    }

    async fn list_team_managers(&self, team_id: Uuid) -> Result<Vec<User>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .users
            .iter()
            .filter(|u| {
                u.deleted_at.is_none()
                    && u.role == Role::Manager
                    && tables.manager_teams.contains(&(team_id, u.id))
            })
            .cloned()
            .collect())
    }

    async fn add_team_manager(&self, team_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        self.tables.write().await.manager_teams.insert((team_id, user_id));
        Ok(())
    }

    async fn remove_team_manager(&self, team_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        self.tables.write().await.manager_teams.remove(&(team_id, user_id));
        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
