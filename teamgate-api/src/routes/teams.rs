/// Team administration endpoints
///
/// # Endpoints
///
/// - `GET /teams` - Teams visible to the caller, with employees and managers
/// - `POST /teams` - Create a team (admin)
/// - `GET /teams/:id` - One team with employees and managers
/// - `PUT /teams/:id` - Partial update (admin)
/// - `DELETE /teams/:id` - Soft delete (admin)
/// - `POST /teams/:id/managers` - Link a manager (admin)
/// - `DELETE /teams/:id/managers/:manager_id` - Unlink a manager (admin)

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{parse_id, validated, MessageResponse},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;
use teamgate_shared::{
    auth::middleware::AuthContext,
    models::team::{Team, TeamDetails},
    services::teams::{NewTeam, TeamPatch},
};
use uuid::Uuid;
use validator::Validate;

const INVALID_ID: &str = "ID invalide";
const INVALID_MANAGER_ID: &str = "ID manager invalide";

/// Create team request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTeamRequest {
    #[validate(length(min = 1, max = 100, message = "le nom doit contenir entre 1 et 100 caractères"))]
    pub name: String,

    #[validate(length(max = 500, message = "la description doit contenir au plus 500 caractères"))]
    pub description: Option<String>,
}

/// Update team request; an empty `description` clears it
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTeamRequest {
    #[validate(length(max = 100, message = "le nom doit contenir au plus 100 caractères"))]
    pub name: Option<String>,

    #[validate(length(max = 500, message = "la description doit contenir au plus 500 caractères"))]
    pub description: Option<String>,
}

/// Add manager request
#[derive(Debug, Deserialize, Validate)]
pub struct AddManagerRequest {
    pub manager_id: Uuid,
}

pub async fn list_teams(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<TeamDetails>>> {
    Ok(Json(state.teams.list(auth.user_id).await?))
}

/// Creates a team (admin only)
///
/// # Response
///
/// `201 Created` with the team.
pub async fn create_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<CreateTeamRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Team>)> {
    let req = validated(payload)?;

    let team = state
        .teams
        .create(
            auth.user_id,
            NewTeam {
                name: req.name,
                description: req.description,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(team)))
}

pub async fn get_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<TeamDetails>> {
    let team_id = parse_id(&id, INVALID_ID)?;

    Ok(Json(state.teams.get(auth.user_id, team_id).await?))
}

pub async fn update_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateTeamRequest>, JsonRejection>,
) -> ApiResult<Json<Team>> {
    let team_id = parse_id(&id, INVALID_ID)?;
    let req = validated(payload)?;

    let team = state
        .teams
        .update(
            auth.user_id,
            team_id,
            TeamPatch {
                name: req.name,
                description: req.description,
            },
        )
        .await?;

    Ok(Json(team))
}

/// Soft-deletes a team (admin only)
///
/// The team drops out of every caller's visibility scope; its
/// employees and manager links are kept.
pub async fn delete_team(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let team_id = parse_id(&id, INVALID_ID)?;

    state.teams.delete(auth.user_id, team_id).await?;

    Ok(MessageResponse::new("team supprimée avec succès"))
}

/// Links a manager to a team (admin only)
///
/// Linking an already linked manager succeeds.
///
/// # Errors
///
/// - `400 Bad Request`: Target user is not a manager
/// - `404 Not Found`: Unknown team or user
pub async fn add_manager(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    payload: Result<Json<AddManagerRequest>, JsonRejection>,
) -> ApiResult<Json<MessageResponse>> {
    let team_id = parse_id(&id, INVALID_ID)?;
    let req = validated(payload)?;

    state
        .teams
        .add_manager(auth.user_id, team_id, req.manager_id)
        .await?;

    Ok(MessageResponse::new("manager ajouté à la team"))
}

/// Unlinks a manager from a team (admin only)
///
/// Unlinking a manager that is not linked succeeds.
pub async fn remove_manager(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path((id, manager_id)): Path<(String, String)>,
) -> ApiResult<Json<MessageResponse>> {
    let team_id = parse_id(&id, INVALID_ID)?;
    let manager_id = parse_id(&manager_id, INVALID_MANAGER_ID)?;

    state
        .teams
        .remove_manager(auth.user_id, team_id, manager_id)
        .await?;

    Ok(MessageResponse::new("manager retiré de la team"))
}
