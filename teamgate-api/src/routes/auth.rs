/// Authentication endpoints
///
/// # Endpoints
///
/// - `POST /register` - Create an account (anonymous bootstrap, then admin only)
/// - `POST /login` - Exchange credentials for an access/refresh pair
/// - `POST /refresh` - Rotate the refresh token and get a new access token
/// - `POST /logout` - Revoke the caller's refresh token
/// - `GET /me` - Caller profile with team affiliation

use crate::{app::AppState, error::ApiResult, routes::{validated, MessageResponse}};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use teamgate_shared::{
    auth::middleware::AuthContext,
    models::user::PublicUser,
    services::auth::{LoginResponse, Profile, RefreshResponse, Registration},
};
use uuid::Uuid;
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(
        email(message = "email invalide"),
        length(max = 255, message = "l'email doit contenir au plus 255 caractères")
    )]
    pub email: String,

    #[validate(length(min = 8, message = "le mot de passe doit contenir au moins 8 caractères"))]
    pub password: String,

    #[validate(length(min = 1, max = 100, message = "le prénom doit contenir entre 1 et 100 caractères"))]
    pub first_name: String,

    #[validate(length(min = 1, max = 100, message = "le nom doit contenir entre 1 et 100 caractères"))]
    pub last_name: String,

    #[validate(length(max = 20, message = "le téléphone doit contenir au plus 20 caractères"))]
    pub phone_number: Option<String>,

    /// `employee`, `manager` or `admin`; employee when omitted
    pub role: Option<String>,

    pub team_id: Option<Uuid>,
}

/// Register response
#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResponse {
    pub user: PublicUser,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(
        email(message = "email invalide"),
        length(max = 255, message = "l'email doit contenir au plus 255 caractères")
    )]
    pub email: String,

    #[validate(length(min = 1, message = "mot de passe requis"))]
    pub password: String,
}

/// Refresh token request
#[derive(Debug, Deserialize, Validate)]
pub struct RefreshRequest {
    #[validate(length(min = 1, message = "refresh token requis"))]
    pub refresh_token: String,
}

/// Register a new user
///
/// While no admin exists, an anonymous call creates the first admin. After
/// that, the caller must be an admin, identified by its bearer token.
///
/// # Endpoint
///
/// ```text
/// POST /register
/// Authorization: Bearer <access-token>   (once an admin exists)
/// Content-Type: application/json
///
/// {
///   "email": "jane@example.com",
///   "password": "SecureP@ss123",
///   "first_name": "Jane",
///   "last_name": "Doe",
///   "role": "employee",
///   "team_id": "uuid"
/// }
/// ```
///
/// # Response
///
/// `201 Created`
///
/// ```json
/// { "user": { "id": "uuid", "email": "jane@example.com", "role": "employee", ... } }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed or unknown role
/// - `401 Unauthorized`: Authorization header present but invalid
/// - `403 Forbidden`: Caller is not an admin
/// - `409 Conflict`: Email already exists
pub async fn register(
    State(state): State<AppState>,
    auth: Option<Extension<AuthContext>>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let req = validated(payload)?;
    let created_by = auth.map(|Extension(ctx)| ctx.user_id);

    let user = state
        .auth
        .register(
            created_by,
            Registration {
                email: req.email,
                password: req.password,
                first_name: req.first_name,
                last_name: req.last_name,
                phone_number: req.phone_number,
                role: req.role,
                team_id: req.team_id,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(RegisterResponse { user })))
}

/// Login endpoint
///
/// # Endpoint
///
/// ```text
/// POST /login
/// Content-Type: application/json
///
/// {
///   "email": "jane@example.com",
///   "password": "SecureP@ss123"
/// }
/// ```
///
/// # Response
///
/// ```json
/// {
///   "token": "eyJ...",
///   "refresh_token": "eyJ...",
///   "user": { "id": "uuid", "email": "jane@example.com", "role": "employee", ... }
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Invalid credentials (same body for unknown email and wrong password)
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<LoginResponse>> {
    let req = validated(payload)?;

    let response = state.auth.login(&req.email, &req.password).await?;

    Ok(Json(response))
}

/// Refresh token endpoint
///
/// The presented refresh token is consumed: the response carries a new
/// access token and a new refresh token, and the old one stops working.
///
/// # Endpoint
///
/// ```text
/// POST /refresh
/// Content-Type: application/json
///
/// { "refresh_token": "eyJ..." }
/// ```
///
/// # Errors
///
/// - `401 Unauthorized`: Token malformed, expired, revoked or already rotated
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<RefreshResponse>> {
    let req = validated(payload)?;

    let response = state.auth.refresh(&req.refresh_token).await?;

    Ok(Json(response))
}

/// Logout endpoint
///
/// Revokes the caller's refresh token. Access tokens already issued stay
/// valid until they expire.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<MessageResponse>> {
    state.auth.logout(auth.user_id).await?;

    Ok(MessageResponse::new("déconnexion réussie"))
}

/// Current user profile
pub async fn me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Profile>> {
    Ok(Json(state.auth.profile(auth.user_id).await?))
}
