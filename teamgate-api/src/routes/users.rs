/// User administration endpoints
///
/// Reads are filtered through the caller's visibility; writes are admin only.
///
/// # Endpoints
///
/// - `GET /users` - Users visible to the caller
/// - `GET /users/:id` - One user
/// - `PUT /users/:id` - Partial update (admin)
/// - `DELETE /users/:id` - Soft delete (admin)

use crate::{
    app::AppState,
    error::ApiResult,
    routes::{deserialize_some, parse_id, validated, MessageResponse},
};
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    Extension, Json,
};
use serde::Deserialize;
use teamgate_shared::{
    auth::middleware::AuthContext, models::user::PublicUser, services::users::UserPatch,
};
use uuid::Uuid;
use validator::Validate;

const INVALID_ID: &str = "ID invalide";

/// Update user request
///
/// Absent fields are left untouched. An empty `phone_number` clears it and
/// `"team_id": null` detaches the user from its team.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateUserRequest {
    #[validate(
        email(message = "email invalide"),
        length(max = 255, message = "l'email doit contenir au plus 255 caractères")
    )]
    pub email: Option<String>,

    #[validate(length(min = 8, message = "le mot de passe doit contenir au moins 8 caractères"))]
    pub password: Option<String>,

    #[validate(length(max = 100, message = "le prénom doit contenir au plus 100 caractères"))]
    pub first_name: Option<String>,

    #[validate(length(max = 100, message = "le nom doit contenir au plus 100 caractères"))]
    pub last_name: Option<String>,

    #[validate(length(max = 20, message = "le téléphone doit contenir au plus 20 caractères"))]
    pub phone_number: Option<String>,

    pub role: Option<String>,

    #[serde(default, deserialize_with = "deserialize_some")]
    pub team_id: Option<Option<Uuid>>,
}

impl From<UpdateUserRequest> for UserPatch {
    fn from(req: UpdateUserRequest) -> Self {
        UserPatch {
            email: req.email,
            password: req.password,
            first_name: req.first_name,
            last_name: req.last_name,
            phone_number: req.phone_number,
            role: req.role,
            team_id: req.team_id,
        }
    }
}

/// Lists users visible to the caller
///
/// - admin: every live user
/// - manager: self plus employees of the managed teams
/// - employee: self plus employees of the same team
pub async fn list_users(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<PublicUser>>> {
    Ok(Json(state.users.list(auth.user_id).await?))
}

/// Gets one user
///
/// # Errors
///
/// - `403 Forbidden`: Target outside the caller's visibility
/// - `404 Not Found`: Unknown or deleted user
pub async fn get_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<PublicUser>> {
    let user_id = parse_id(&id, INVALID_ID)?;

    Ok(Json(state.users.get(auth.user_id, user_id).await?))
}

/// Updates a user (admin only)
pub async fn update_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> ApiResult<Json<PublicUser>> {
    let user_id = parse_id(&id, INVALID_ID)?;
    let req = validated(payload)?;

    let user = state.users.update(auth.user_id, user_id, req.into()).await?;

    Ok(Json(user))
}

/// Soft-deletes a user (admin only)
pub async fn delete_user(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<String>,
) -> ApiResult<Json<MessageResponse>> {
    let user_id = parse_id(&id, INVALID_ID)?;

    state.users.delete(auth.user_id, user_id).await?;

    Ok(MessageResponse::new("utilisateur supprimé avec succès"))
}
