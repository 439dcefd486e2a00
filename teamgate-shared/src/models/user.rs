/// User model and role hierarchy
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM ('employee', 'manager', 'admin');
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL,
///     password_hash VARCHAR(255) NOT NULL,
///     first_name VARCHAR(100) NOT NULL,
///     last_name VARCHAR(100) NOT NULL,
///     phone_number VARCHAR(20),
///     role user_role NOT NULL DEFAULT 'employee',
///     created_by UUID REFERENCES users(id),
///     team_id UUID REFERENCES teams(id),
///     refresh_token TEXT,
///     refresh_expires_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
/// ```
///
/// `User` deliberately does not implement `Serialize`: anything leaving the
/// process goes through [`PublicUser`], which has no password hash or
/// refresh token material.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Organisation roles
///
/// Hierarchy: Admin > Manager > Employee. A role never sees roles above it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Belongs to at most one team, read-only access
    #[default]
    Employee,

    /// Linked to zero or more teams, read-only access to them
    Manager,

    /// Full control over users and teams
    Admin,
}

impl Role {
    /// Converts role to string for display
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Employee => "employee",
            Role::Manager => "manager",
            Role::Admin => "admin",
        }
    }

    /// Parses a role from its lowercase name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "employee" => Some(Role::Employee),
            "manager" => Some(Role::Manager),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }

    /// Returns numeric level for hierarchy comparisons
    pub fn level(&self) -> u8 {
        match self {
            Role::Admin => 3,
            Role::Manager => 2,
            Role::Employee => 1,
        }
    }

    /// Whether this role may be granted only by an admin creator
    pub fn requires_admin_creator(&self) -> bool {
        matches!(self, Role::Admin | Role::Manager)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored user account
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address, unique among live users
    pub email: String,

    /// Argon2id password hash
    pub password_hash: String,

    pub first_name: String,

    pub last_name: String,

    pub phone_number: Option<String>,

    pub role: Role,

    /// Admin who created this account (weak back-reference)
    pub created_by: Option<Uuid>,

    /// The single team of an employee
    pub team_id: Option<Uuid>,

    /// Current refresh token, overwritten on every login and refresh
    pub refresh_token: Option<String>,

    pub refresh_expires_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    /// Tombstone; soft-deleted users are excluded from every query
    pub deleted_at: Option<DateTime<Utc>>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Checks the stored refresh token against a presented one
    ///
    /// Returns false when no token is stored, when the tokens differ, or
    /// when the stored token has expired.
    pub fn refresh_token_matches(&self, token: &str, now: DateTime<Utc>) -> bool {
        match (&self.refresh_token, self.refresh_expires_at) {
            (Some(stored), Some(expires_at)) => {
                !stored.is_empty() && stored.as_bytes() == token.as_bytes() && now < expires_at
            }
            _ => false,
        }
    }
}

/// Outward projection of a user (no credentials)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub team_id: Option<Uuid>,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone_number: user.phone_number.clone(),
            role: user.role,
            team_id: user.team_id,
            created_by: user.created_by,
            created_at: user.created_at,
        }
    }
}

impl From<User> for PublicUser {
    fn from(user: User) -> Self {
        PublicUser::from(&user)
    }
}

/// Input for creating a new user
#[derive(Debug, Clone)]
pub struct CreateUser {
    pub email: String,

    /// Argon2id password hash (NOT plaintext password!)
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,
    pub phone_number: Option<String>,
    pub role: Role,
    pub created_by: Option<Uuid>,
    pub team_id: Option<Uuid>,
}

/// Input for updating an existing user
///
/// All fields are optional. Only non-None fields will be updated.
#[derive(Debug, Clone, Default)]
pub struct UpdateUser {
    pub email: Option<String>,

    pub password_hash: Option<String>,

    pub first_name: Option<String>,

    pub last_name: Option<String>,

    /// New phone number (use Some(None) to clear)
    pub phone_number: Option<Option<String>>,

    pub role: Option<Role>,

    /// New team (use Some(None) to clear)
    pub team_id: Option<Option<Uuid>>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.email.is_none()
            && self.password_hash.is_none()
            && self.first_name.is_none()
            && self.last_name.is_none()
            && self.phone_number.is_none()
            && self.role.is_none()
            && self.team_id.is_none()
    }
}

#[cfg(test)]
pub(crate) fn sample_user(role: Role, team_id: Option<Uuid>) -> User {
    let now = Utc::now();
    User {
        id: Uuid::new_v4(),
        email: format!("{}@example.com", Uuid::new_v4()),
        password_hash: "hash".to_string(),
        first_name: "Test".to_string(),
        last_name: "User".to_string(),
        phone_number: None,
        role,
        created_by: None,
        team_id,
        refresh_token: None,
        refresh_expires_at: None,
        created_at: now,
        updated_at: now,
        deleted_at: None,
    }
}
