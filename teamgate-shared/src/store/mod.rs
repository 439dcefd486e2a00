/// Identity store port
///
/// Workflows depend on [`IdentityStore`] only; the store handle is injected
/// at startup and is the only state shared between requests.
///
/// # Adapters
///
/// - [`postgres::PgIdentityStore`]: sqlx queries against the bundled schema
/// - [`memory::MemoryIdentityStore`]: in-process maps, used by tests
///
/// Every read excludes soft-deleted rows. Writes against a missing or
/// soft-deleted row report "not found" through `Option`/`bool` returns
/// rather than an error.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::auth::authorization::{TeamVisibility, UserVisibility};
use crate::models::team::{CreateTeam, Team, UpdateTeam};
use crate::models::user::{CreateUser, UpdateUser, User};

pub use memory::MemoryIdentityStore;
pub use postgres::PgIdentityStore;

/// Message reported when an email is already taken by a live user
pub const EMAIL_TAKEN: &str = "email déjà utilisé";

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Unique constraint violation
    #[error("{0}")]
    Conflict(String),

    /// Backend unreachable (pool timeout, closed pool, I/O)
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// Any other database failure
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence port for users, teams and manager links
#[async_trait]
pub trait IdentityStore: Send + Sync {
    /// Whether at least one live admin exists
    async fn admin_exists(&self) -> Result<bool, StoreError>;

    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError>;

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Exact, case-sensitive email lookup
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Live users matching `visibility`, oldest first
    async fn list_users(&self, visibility: &UserVisibility) -> Result<Vec<User>, StoreError>;

    /// Applies a partial update; `None` when the user does not exist
    ///
    /// A role change away from manager drops the user's manager links in the
    /// same write.
    async fn update_user(&self, id: Uuid, changes: UpdateUser) -> Result<Option<User>, StoreError>;

    /// Tombstones a user; `false` when already deleted or absent
    async fn soft_delete_user(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Replaces the user's refresh token unconditionally
    ///
    /// Returns `false` when the user does not exist or is deleted.
    async fn store_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Compare-and-swap rotation
    ///
    /// Writes `new` only if the stored token still equals `old` and has not
    /// expired. Returns whether the swap happened.
    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        old: &str,
        new: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    /// Clears the refresh token and its expiry
    async fn revoke_refresh_token(&self, user_id: Uuid) -> Result<(), StoreError>;

    async fn create_team(&self, data: CreateTeam) -> Result<Team, StoreError>;

    async fn find_team_by_id(&self, id: Uuid) -> Result<Option<Team>, StoreError>;

    /// Live teams matching `visibility`, oldest first
    async fn list_teams(&self, visibility: &TeamVisibility) -> Result<Vec<Team>, StoreError>;

    async fn update_team(&self, id: Uuid, changes: UpdateTeam) -> Result<Option<Team>, StoreError>;

    async fn soft_delete_team(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Live teams linked to `user_id` as manager
    async fn managed_team_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, StoreError>;

    /// Live employees whose `team_id` is `team_id`
    async fn list_team_employees(&self, team_id: Uuid) -> Result<Vec<User>, StoreError>;

    /// Live managers linked to `team_id`
    async fn list_team_managers(&self, team_id: Uuid) -> Result<Vec<User>, StoreError>;

    /// Links a manager to a team; linking twice is a no-op
    async fn add_team_manager(&self, team_id: Uuid, user_id: Uuid) -> Result<(), StoreError>;

    /// Unlinks a manager from a team; unlinking an absent link is a no-op
    async fn remove_team_manager(&self, team_id: Uuid, user_id: Uuid) -> Result<(), StoreError>;

    /// Connectivity check for health reporting
    async fn ping(&self) -> Result<(), StoreError>;
}
