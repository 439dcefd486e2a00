/// Registration, login and session workflows
///
/// Orchestrates the credential hasher, the identity store and the token
/// service. Refresh tokens are single-use: every successful refresh swaps
/// the stored token for a new one, and the swap is a compare-and-swap in
/// the store so concurrent refreshes with the same token cannot both win.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{resolve_actor, TEAM_NOT_FOUND, TEAM_REQUIRES_EMPLOYEE, USER_NOT_FOUND};
use crate::auth::authorization::{require_role_assignment, resolve_requested_role, AdminAction};
use crate::auth::jwt::TokenService;
use crate::auth::password::CredentialHasher;
use crate::error::{ServiceError, ServiceResult};
use crate::models::team::Team;
use crate::models::user::{CreateUser, PublicUser, Role};
use crate::store::IdentityStore;

/// Same message for an unknown email and a wrong password
pub const INVALID_CREDENTIALS: &str = "identifiants invalides";

const REFRESH_UNPARSEABLE: &str = "refresh token invalide ou expiré";
const REFRESH_REJECTED: &str = "refresh token invalide ou révoqué";

/// Account creation input
#[derive(Debug, Clone, Default)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,

    /// Requested role name; employee when absent
    pub role: Option<String>,

    pub team_id: Option<Uuid>,
}

/// Successful login
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: PublicUser,
}

/// Successful refresh
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub token: String,
    pub refresh_token: String,
}

/// Current user with its team affiliation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    #[serde(flatten)]
    pub user: PublicUser,

    /// Team of an employee
    pub team: Option<Team>,

    /// Teams linked to a manager
    pub teams: Vec<Team>,
}

#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn IdentityStore>,
    hasher: Arc<dyn CredentialHasher>,
    tokens: TokenService,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn IdentityStore>,
        hasher: Arc<dyn CredentialHasher>,
        tokens: TokenService,
    ) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Creates an account
    ///
    /// Once an admin exists, `created_by` must name an existing admin. While
    /// no admin exists, an anonymous registration bootstraps the first admin
    /// whatever role was requested.
    pub async fn register(
        &self,
        created_by: Option<Uuid>,
        input: Registration,
    ) -> ServiceResult<PublicUser> {
        let admin_exists = self.store.admin_exists().await?;

        if admin_exists && created_by.is_none() {
            return Err(ServiceError::Forbidden(
                AdminAction::CreateUser.denial().to_string(),
            ));
        }

        let creator = match created_by {
            Some(id) => Some(
                self.store
                    .find_user_by_id(id)
                    .await?
                    .ok_or_else(|| ServiceError::NotFound("créateur non trouvé".to_string()))?,
            ),
            None => None,
        };

        if admin_exists && !creator.as_ref().map_or(false, |c| c.is_admin()) {
            return Err(ServiceError::Forbidden(
                AdminAction::CreateUser.denial().to_string(),
            ));
        }

        let mut role = resolve_requested_role(input.role.as_deref())?;

        if !admin_exists && creator.is_none() {
            if role != Role::Admin {
                tracing::info!(requested = %role, "No admin exists yet, bootstrapping first admin");
            }
            role = Role::Admin;
        } else {
            require_role_assignment(creator.as_ref().map(|c| c.role), role)?;
        }

        if let Some(team_id) = input.team_id {
            if role != Role::Employee {
                return Err(ServiceError::Validation(TEAM_REQUIRES_EMPLOYEE.to_string()));
            }
            self.store
                .find_team_by_id(team_id)
                .await?
                .ok_or_else(|| ServiceError::NotFound(TEAM_NOT_FOUND.to_string()))?;
        }

        let password_hash = self.hasher.hash(&input.password)?;

        let user = self
            .store
            .create_user(CreateUser {
                email: input.email,
                password_hash,
                first_name: input.first_name,
                last_name: input.last_name,
                phone_number: input.phone_number.filter(|p| !p.trim().is_empty()),
                role,
                created_by: creator.map(|c| c.id),
                team_id: input.team_id,
            })
            .await?;

        tracing::info!(user_id = %user.id, role = %user.role, "User registered");

        Ok(PublicUser::from(user))
    }

    /// Checks credentials and opens a session
    pub async fn login(&self, email: &str, password: &str) -> ServiceResult<LoginResponse> {
        let user = match self.store.find_user_by_email(email).await? {
            Some(user) => user,
            None => {
                tracing::debug!("Login attempt for unknown email");
                return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
            }
        };

        if !self.hasher.verify(&user.password_hash, password)? {
            tracing::debug!(user_id = %user.id, "Login attempt with wrong password");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        let pair = self.tokens.issue_pair(user.id)?;
        let stored = self
            .store
            .store_refresh_token(user.id, &pair.refresh_token, pair.refresh_expires_at)
            .await?;
        if !stored {
            // Deleted between the lookup and the write
            tracing::debug!(user_id = %user.id, "Login raced with account deletion");
            return Err(ServiceError::Unauthorized(INVALID_CREDENTIALS.to_string()));
        }

        tracing::info!(user_id = %user.id, "User logged in");

        Ok(LoginResponse {
            token: pair.access_token,
            refresh_token: pair.refresh_token,
            user: PublicUser::from(user),
        })
    }

    /// Exchanges a live refresh token for a new access/refresh pair
    ///
    /// The presented token stops working as soon as this returns.
    pub async fn refresh(&self, refresh_token: &str) -> ServiceResult<RefreshResponse> {
        let claims = self.tokens.validate_refresh_token(refresh_token).map_err(|e| {
            tracing::debug!(error = %e, "Unparseable refresh token");
            ServiceError::Unauthorized(REFRESH_UNPARSEABLE.to_string())
        })?;

        let pair = self.tokens.issue_pair(claims.uid)?;

        let rotated = self
            .store
            .rotate_refresh_token(
                claims.uid,
                refresh_token,
                &pair.refresh_token,
                pair.refresh_expires_at,
            )
            .await?;

        if !rotated {
            tracing::warn!(user_id = %claims.uid, "Refresh token mismatch, expired or revoked");
            return Err(ServiceError::Unauthorized(REFRESH_REJECTED.to_string()));
        }

        tracing::debug!(user_id = %claims.uid, "Refresh token rotated");

        Ok(RefreshResponse {
            token: pair.access_token,
            refresh_token: pair.refresh_token,
        })
    }

    /// Whether `token` is the user's current, unexpired refresh token
    pub async fn validate_refresh_token(&self, user_id: Uuid, token: &str) -> ServiceResult<bool> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(USER_NOT_FOUND.to_string()))?;

        Ok(user.refresh_token_matches(token, chrono::Utc::now()))
    }

    /// Revokes the caller's refresh token
    pub async fn logout(&self, user_id: Uuid) -> ServiceResult<()> {
        self.store.revoke_refresh_token(user_id).await?;
        tracing::info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    /// The caller's own record with its team and managed teams
    pub async fn profile(&self, user_id: Uuid) -> ServiceResult<Profile> {
        let user = self
            .store
            .find_user_by_id(user_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(USER_NOT_FOUND.to_string()))?;
        let actor = resolve_actor(self.store.as_ref(), user_id).await?;

        let team = match actor.team_id {
            Some(team_id) => self.store.find_team_by_id(team_id).await?,
            None => None,
        };

        let mut teams = Vec::with_capacity(actor.managed_team_ids.len());
        for team_id in &actor.managed_team_ids {
            if let Some(team) = self.store.find_team_by_id(*team_id).await? {
                teams.push(team);
            }
        }

        Ok(Profile {
            user: PublicUser::from(user),
            team,
            teams,
        })
    }
}
