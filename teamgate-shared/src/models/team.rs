/// Team model
///
/// Employees belong to a team through `users.team_id`; managers are linked
/// through the `manager_teams` join table.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE teams (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     name VARCHAR(100) NOT NULL,
///     description VARCHAR(500),
///     created_by UUID NOT NULL REFERENCES users(id),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     deleted_at TIMESTAMPTZ
/// );
///
/// CREATE TABLE manager_teams (
///     team_id UUID NOT NULL REFERENCES teams(id),
///     user_id UUID NOT NULL REFERENCES users(id),
///     PRIMARY KEY (team_id, user_id)
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::PublicUser;

/// Stored team
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Team {
    pub id: Uuid,

    pub name: String,

    pub description: Option<String>,

    /// Admin who created the team
    pub created_by: Uuid,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Team together with the members the caller is allowed to see
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamDetails {
    #[serde(flatten)]
    pub team: Team,

    pub employees: Vec<PublicUser>,

    pub managers: Vec<PublicUser>,
}

/// Input for creating a new team
#[derive(Debug, Clone)]
pub struct CreateTeam {
    pub name: String,
    pub description: Option<String>,
    pub created_by: Uuid,
}

/// Input for updating an existing team
#[derive(Debug, Clone, Default)]
pub struct UpdateTeam {
    pub name: Option<String>,

    /// New description (use Some(None) to clear)
    pub description: Option<Option<String>>,
}
