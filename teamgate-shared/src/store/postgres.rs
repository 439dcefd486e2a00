/// PostgreSQL identity store
///
/// Queries run against the schema in `migrations/`. Soft-deleted rows carry a
/// `deleted_at` tombstone and are filtered out of every statement; email
/// uniqueness among live users is enforced by a partial unique index, and
/// manager links live in the `manager_teams` join table.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{IdentityStore, StoreError, EMAIL_TAKEN};
use crate::auth::authorization::{TeamVisibility, UserVisibility};
use crate::models::team::{CreateTeam, Team, UpdateTeam};
use crate::models::user::{CreateUser, Role, UpdateUser, User};

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone_number, role, \
     created_by, team_id, refresh_token, refresh_expires_at, created_at, updated_at, deleted_at";

const TEAM_COLUMNS: &str = "id, name, description, created_by, created_at, updated_at, deleted_at";

fn map_err(err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            StoreError::Conflict(EMAIL_TAKEN.to_string())
        }
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            StoreError::Unavailable(err.to_string())
        }
        other => StoreError::Database(other),
    }
}

/// Identity store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn admin_exists(&self) -> Result<bool, StoreError> {
        sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM users WHERE role = 'admin' AND deleted_at IS NULL)",
        )
        .fetch_one(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn create_user(&self, data: CreateUser) -> Result<User, StoreError> {
        let query = format!(
            r#"
            INSERT INTO users (email, password_hash, first_name, last_name, phone_number, role, created_by, team_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let user = sqlx::query_as::<_, User>(&query)
            .bind(&data.email)
            .bind(&data.password_hash)
            .bind(&data.first_name)
            .bind(&data.last_name)
            .bind(&data.phone_number)
            .bind(data.role)
            .bind(data.created_by)
            .bind(data.team_id)
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;

        tracing::debug!(user_id = %user.id, role = %user.role, "Inserted user");
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {} FROM users WHERE id = $1 AND deleted_at IS NULL", USER_COLUMNS);

        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!(
            "SELECT {} FROM users WHERE email = $1 AND deleted_at IS NULL",
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)
    }

    async fn list_users(&self, visibility: &UserVisibility) -> Result<Vec<User>, StoreError> {
        match visibility {
            UserVisibility::All => {
                let query = format!(
                    "SELECT {} FROM users WHERE deleted_at IS NULL ORDER BY created_at ASC, id ASC",
                    USER_COLUMNS
                );
                sqlx::query_as::<_, User>(&query)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_err)
            }
            UserVisibility::Scoped { actor_id, team_ids } => {
                let query = format!(
                    r#"
                    SELECT {} FROM users
                    WHERE deleted_at IS NULL
                      AND (id = $1 OR (role = $2 AND team_id = ANY($3)))
                    ORDER BY created_at ASC, id ASC
                    "#,
                    USER_COLUMNS
                );
                sqlx::query_as::<_, User>(&query)
                    .bind(actor_id)
                    .bind(Role::Employee)
                    .bind(team_ids)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_err)
            }
        }
    }

    async fn update_user(&self, id: Uuid, changes: UpdateUser) -> Result<Option<User>, StoreError> {
        let leaves_manager_role = matches!(changes.role, Some(role) if role != Role::Manager);

        // Build dynamic update query based on which fields are present
        let mut query = String::from("UPDATE users SET updated_at = NOW()");
        let mut bind_count = 1;

        if changes.email.is_some() {
            bind_count += 1;
            query.push_str(&format!(", email = ${}", bind_count));
        }
        if changes.password_hash.is_some() {
            bind_count += 1;
            query.push_str(&format!(", password_hash = ${}", bind_count));
        }
        if changes.first_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", first_name = ${}", bind_count));
        }
        if changes.last_name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", last_name = ${}", bind_count));
        }
        if changes.phone_number.is_some() {
            bind_count += 1;
            query.push_str(&format!(", phone_number = ${}", bind_count));
        }
        if changes.role.is_some() {
            bind_count += 1;
            query.push_str(&format!(", role = ${}", bind_count));
        }
        if changes.team_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", team_id = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
            USER_COLUMNS
        ));

        let mut q = sqlx::query_as::<_, User>(&query).bind(id);

        if let Some(email) = changes.email {
            q = q.bind(email);
        }
        if let Some(password_hash) = changes.password_hash {
            q = q.bind(password_hash);
        }
        if let Some(first_name) = changes.first_name {
            q = q.bind(first_name);
        }
        if let Some(last_name) = changes.last_name {
            q = q.bind(last_name);
        }
        if let Some(phone_number) = changes.phone_number {
            q = q.bind(phone_number);
        }
        if let Some(role) = changes.role {
            q = q.bind(role);
        }
        if let Some(team_id) = changes.team_id {
            q = q.bind(team_id);
        }

        let mut tx = self.pool.begin().await.map_err(map_err)?;

        let updated = q.fetch_optional(&mut *tx).await.map_err(map_err)?;

        if updated.is_some() && leaves_manager_role {
            sqlx::query("DELETE FROM manager_teams WHERE user_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await
                .map_err(map_err)?;
        }

        tx.commit().await.map_err(map_err)?;

        Ok(updated)
    }

    async fn soft_delete_user(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET deleted_at = NOW(), refresh_token = NULL, refresh_expires_at = NULL
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn store_refresh_token(
        &self,
        user_id: Uuid,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = $2, refresh_expires_at = $3
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn rotate_refresh_token(
        &self,
        user_id: Uuid,
        old: &str,
        new: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET refresh_token = $3, refresh_expires_at = $4
            WHERE id = $1
              AND deleted_at IS NULL
              AND refresh_token = $2
              AND refresh_expires_at > NOW()
            "#,
        )
        .bind(user_id)
        .bind(old)
        .bind(new)
        .bind(expires_at)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        Ok(result.rows_affected() == 1)
    }

    async fn revoke_refresh_token(&self, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET refresh_token = NULL, refresh_expires_at = NULL WHERE id = $1")
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;

        Ok(())
    }

    async fn create_team(&self, data: CreateTeam) -> Result<Team, StoreError> {
        let query = format!(
            "INSERT INTO teams (name, description, created_by) VALUES ($1, $2, $3) RETURNING {}",
            TEAM_COLUMNS
        );

        let team = sqlx::query_as::<_, Team>(&query)
            .bind(&data.name)
            .bind(&data.description)
            .bind(data.created_by)
            .fetch_one(&self.pool)
            .await
            .map_err(map_err)?;

        tracing::debug!(team_id = %team.id, "Inserted team");
        Ok(team)
    }

    async fn find_team_by_id(&self, id: Uuid) -> Result<Option<Team>, StoreError> {
        let query = format!("SELECT {} FROM teams WHERE id = $1 AND deleted_at IS NULL", TEAM_COLUMNS);

        sqlx::query_as::<_, Team>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_err)
    }

    async fn list_teams(&self, visibility: &TeamVisibility) -> Result<Vec<Team>, StoreError> {
        match visibility {
            TeamVisibility::All => {
                let query = format!(
                    "SELECT {} FROM teams WHERE deleted_at IS NULL ORDER BY created_at ASC, id ASC",
                    TEAM_COLUMNS
                );
                sqlx::query_as::<_, Team>(&query)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_err)
            }
            TeamVisibility::Only(ids) => {
                let query = format!(
                    "SELECT {} FROM teams WHERE deleted_at IS NULL AND id = ANY($1) ORDER BY created_at ASC, id ASC",
                    TEAM_COLUMNS
                );
                sqlx::query_as::<_, Team>(&query)
                    .bind(ids)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(map_err)
            }
        }
    }

    async fn update_team(&self, id: Uuid, changes: UpdateTeam) -> Result<Option<Team>, StoreError> {
        let mut query = String::from("UPDATE teams SET updated_at = NOW()");
        let mut bind_count = 1;

        if changes.name.is_some() {
            bind_count += 1;
            query.push_str(&format!(", name = ${}", bind_count));
        }
        if changes.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }

        query.push_str(&format!(
            " WHERE id = $1 AND deleted_at IS NULL RETURNING {}",
            TEAM_COLUMNS
        ));

        let mut q = sqlx::query_as::<_, Team>(&query).bind(id);

        if let Some(name) = changes.name {
            q = q.bind(name);
        }
        if let Some(description) = changes.description {
            q = q.bind(description);
        }

        q.fetch_optional(&self.pool).await.map_err(map_err)
    }

    async fn soft_delete_team(&self, id: Uuid) -> Result<bool, StoreError> {
        let result = sqlx::query("UPDATE teams SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;

        Ok(result.rows_affected() > 0)
    }

    async fn managed_team_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>, StoreError> {
        sqlx::query_scalar(
            r#"
            SELECT t.id
            FROM manager_teams mt
            JOIN teams t ON t.id = mt.team_id
            WHERE mt.user_id = $1 AND t.deleted_at IS NULL
            ORDER BY t.created_at ASC, t.id ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_err)
    }

    async fn list_team_employees(&self, team_id: Uuid) -> Result<Vec<User>, StoreError> {
        let query = format!(
            r#"
            SELECT {} FROM users
            WHERE team_id = $1 AND role = $2 AND deleted_at IS NULL
            ORDER BY created_at ASC, id ASC
            "#,
            USER_COLUMNS
        );

        sqlx::query_as::<_, User>(&query)
            .bind(team_id)
            .bind(Role::Employee)
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)
    }

    async fn list_team_managers(&self, team_id: Uuid) -> Result<Vec<User>, StoreError> {
        let columns = USER_COLUMNS
            .split(", ")
            .map(|c| format!("u.{}", c.trim()))
            .collect::<Vec<_>>()
            .join(", ");
        let query = format!(
            r#"
            SELECT {} FROM users u
            JOIN manager_teams mt ON mt.user_id = u.id
            WHERE mt.team_id = $1 AND u.role = $2 AND u.deleted_at IS NULL
            ORDER BY u.created_at ASC, u.id ASC
            "#,
            columns
        );

        sqlx::query_as::<_, User>(&query)
            .bind(team_id)
            .bind(Role::Manager)
            .fetch_all(&self.pool)
            .await
            .map_err(map_err)
    }

    async fn add_team_manager(&self, team_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO manager_teams (team_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(team_id)
        .bind(user_id)
        .execute(&self.pool)
        .await
        .map_err(map_err)?;

        Ok(())
    }

    async fn remove_team_manager(&self, team_id: Uuid, user_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM manager_teams WHERE team_id = $1 AND user_id = $2")
            .bind(team_id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(map_err)?;

        Ok(())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        crate::db::pool::health_check(&self.pool).await.map_err(map_err)
    }
}
