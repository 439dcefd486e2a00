/// Visibility and authorization engine
///
/// Pure decision logic: nothing in here touches the store. Callers resolve
/// an [`Actor`] (id, role and team affiliation) once per request, then ask
/// the engine what it may see and do.
///
/// # Permission Model
///
/// | Role     | Users visible                               | Teams visible | Writes |
/// |----------|---------------------------------------------|---------------|--------|
/// | admin    | all                                         | all           | all    |
/// | manager  | self + employees of the managed teams       | managed teams | none   |
/// | employee | self + employees of the same team           | own team      | none   |
///
/// Single-record reads are slightly looser for managers: a manager is
/// refused only admin records.

use uuid::Uuid;

use crate::models::user::{Role, User};

/// Error type for authorization checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthzError {
    /// Requested role is not one of the three known roles
    #[error("rôle invalide")]
    InvalidRole,

    /// Operation is reserved to admins
    #[error("{}", .0.denial())]
    AdminRequired(AdminAction),

    /// Target is outside the actor's visibility
    #[error("accès refusé")]
    AccessDenied,
}

/// Admin-only operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdminAction {
    CreateUser,
    AssignPrivilegedRole,
    UpdateUser,
    DeleteUser,
    CreateTeam,
    UpdateTeam,
    DeleteTeam,
    AddManager,
    RemoveManager,
}

impl AdminAction {
    /// User-facing refusal message
    pub fn denial(&self) -> &'static str {
        match self {
            AdminAction::CreateUser => "seul un admin peut créer des utilisateurs",
            AdminAction::AssignPrivilegedRole => "seul un admin peut créer des admins ou managers",
            AdminAction::UpdateUser => "seul un admin peut modifier des utilisateurs",
            AdminAction::DeleteUser => "seul un admin peut supprimer des utilisateurs",
            AdminAction::CreateTeam => "seul un admin peut créer des teams",
            AdminAction::UpdateTeam => "seul un admin peut modifier des teams",
            AdminAction::DeleteTeam => "seul un admin peut supprimer des teams",
            AdminAction::AddManager => "seul un admin peut affecter des managers",
            AdminAction::RemoveManager => "seul un admin peut retirer des managers",
        }
    }
}

/// Authenticated caller with its team affiliation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,

    /// Team of an employee
    pub team_id: Option<Uuid>,

    /// Live teams linked to a manager
    pub managed_team_ids: Vec<Uuid>,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Teams whose employees this actor may see
    ///
    /// Empty for admins, who are not scoped by team at all.
    pub fn team_scope(&self) -> Vec<Uuid> {
        match self.role {
            Role::Admin => Vec::new(),
            Role::Manager => self.managed_team_ids.clone(),
            Role::Employee => self.team_id.into_iter().collect(),
        }
    }
}

/// Which users a listing may return
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserVisibility {
    All,

    /// The actor itself plus employees of `team_ids`
    Scoped { actor_id: Uuid, team_ids: Vec<Uuid> },
}

impl UserVisibility {
    pub fn permits(&self, user: &User) -> bool {
        match self {
            UserVisibility::All => true,
            UserVisibility::Scoped { actor_id, team_ids } => {
                user.id == *actor_id
                    || (user.role == Role::Employee
                        && user.team_id.map_or(false, |team| team_ids.contains(&team)))
            }
        }
    }
}

/// Which teams a listing may return
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeamVisibility {
    All,
    Only(Vec<Uuid>),
}

impl TeamVisibility {
    pub fn permits(&self, team_id: Uuid) -> bool {
        match self {
            TeamVisibility::All => true,
            TeamVisibility::Only(ids) => ids.contains(&team_id),
        }
    }
}

pub fn user_visibility(actor: &Actor) -> UserVisibility {
    if actor.is_admin() {
        UserVisibility::All
    } else {
        UserVisibility::Scoped {
            actor_id: actor.id,
            team_ids: actor.team_scope(),
        }
    }
}

pub fn team_visibility(actor: &Actor) -> TeamVisibility {
    if actor.is_admin() {
        TeamVisibility::All
    } else {
        TeamVisibility::Only(actor.team_scope())
    }
}

/// Single-record read check for users
///
/// - admin: any user
/// - manager: anyone but an admin
/// - employee: self, or an employee of the same team
pub fn can_read_user(actor: &Actor, target: &User) -> Result<(), AuthzError> {
    let allowed = match actor.role {
        Role::Admin => true,
        Role::Manager => target.role != Role::Admin,
        Role::Employee => {
            target.id == actor.id
                || (target.role == Role::Employee
                    && actor.team_id.is_some()
                    && target.team_id == actor.team_id)
        }
    };

    if allowed {
        Ok(())
    } else {
        Err(AuthzError::AccessDenied)
    }
}

/// Single-record read check for teams
pub fn can_read_team(actor: &Actor, team_id: Uuid) -> Result<(), AuthzError> {
    if team_visibility(actor).permits(team_id) {
        Ok(())
    } else {
        Err(AuthzError::AccessDenied)
    }
}

/// Write gate shared by every user and team mutation
pub fn require_admin(actor: &Actor, action: AdminAction) -> Result<(), AuthzError> {
    if actor.is_admin() {
        Ok(())
    } else {
        Err(AuthzError::AdminRequired(action))
    }
}

/// Role requested at creation; defaults to employee when unspecified
pub fn resolve_requested_role(requested: Option<&str>) -> Result<Role, AuthzError> {
    match requested {
        None | Some("") => Ok(Role::Employee),
        Some(name) => Role::parse(name).ok_or(AuthzError::InvalidRole),
    }
}

/// Admin and manager roles may be granted only by an admin creator
pub fn require_role_assignment(creator_role: Option<Role>, requested: Role) -> Result<(), AuthzError> {
    if requested.requires_admin_creator() && creator_role != Some(Role::Admin) {
        return Err(AuthzError::AdminRequired(AdminAction::AssignPrivilegedRole));
    }
    Ok(())
}
