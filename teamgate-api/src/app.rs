/// Application state and router builder
///
/// This module defines the shared application state and provides
/// a function to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use teamgate_api::{app::{build_router, AppState}, config::Config};
/// use teamgate_shared::{auth::password::Argon2Hasher, store::PgIdentityStore};
///
/// let config = Config::from_env()?;
/// let pool = teamgate_shared::db::pool::create_pool(db_config).await?;
/// let state = AppState::new(
///     config,
///     Arc::new(PgIdentityStore::new(pool)),
///     Arc::new(Argon2Hasher::new()?),
/// )?;
/// let app = build_router(state);
/// ```

use crate::{config::Config, error::ApiError};
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{delete, get, post},
    Router,
};
use std::sync::Arc;
use teamgate_shared::{
    auth::{jwt::TokenService, middleware::authenticate, password::CredentialHasher},
    services::{AuthService, TeamService, UserService},
    store::IdentityStore,
};
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; every
/// field is reference-counted.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,

    /// Identity store backing every workflow
    pub store: Arc<dyn IdentityStore>,

    /// Registration, login and token workflows
    pub auth: AuthService,

    /// User administration
    pub users: UserService,

    /// Team administration
    pub teams: TeamService,
}

impl AppState {
    /// Wires the workflows over a store and a credential hasher
    ///
    /// # Errors
    ///
    /// Fails if a configured token lifetime does not fit a signed duration.
    pub fn new(
        config: Config,
        store: Arc<dyn IdentityStore>,
        hasher: Arc<dyn CredentialHasher>,
    ) -> anyhow::Result<Self> {
        let access_ttl = token_lifetime("JWT_TTL", config.jwt.access_ttl)?;
        let refresh_ttl = token_lifetime("REFRESH_TOKEN_TTL", config.jwt.refresh_ttl)?;

        let tokens = TokenService::new(config.jwt.secret.clone(), access_ttl, refresh_ttl);

        Ok(Self {
            auth: AuthService::new(store.clone(), hasher.clone(), tokens),
            users: UserService::new(store.clone(), hasher),
            teams: TeamService::new(store.clone()),
            store,
            config: Arc::new(config),
        })
    }
}

/// Converts a configured lifetime, rejecting one whose expiry would overflow a timestamp
fn token_lifetime(key: &str, ttl: std::time::Duration) -> anyhow::Result<chrono::Duration> {
    let ttl = chrono::Duration::from_std(ttl)
        .map_err(|e| anyhow::anyhow!("{} out of range: {}", key, e))?;
    if chrono::Utc::now().checked_add_signed(ttl).is_none() {
        anyhow::bail!("{} out of range: expiry overflows", key);
    }
    Ok(ttl)
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET    /health                           # public
/// ├── POST   /login                            # public
/// ├── POST   /refresh                          # public
/// ├── POST   /register                         # anonymous bootstrap, then admin bearer
/// ├── POST   /logout                           # bearer
/// ├── GET    /me                               # bearer
/// ├── GET    /users                            # bearer, filtered by visibility
/// ├── GET    /users/:id                        # bearer
/// ├── PUT    /users/:id                        # bearer, admin
/// ├── DELETE /users/:id                        # bearer, admin
/// ├── GET    /teams                            # bearer, filtered by visibility
/// ├── POST   /teams                            # bearer, admin
/// ├── GET    /teams/:id                        # bearer
/// ├── PUT    /teams/:id                        # bearer, admin
/// ├── DELETE /teams/:id                        # bearer, admin
/// ├── POST   /teams/:id/managers               # bearer, admin
/// └── DELETE /teams/:id/managers/:manager_id   # bearer, admin
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (per-route basis)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check and credential exchange (public, no auth)
    let public_routes = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    // Registration is anonymous only until the first admin exists
    let registration_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            optional_auth_layer,
        ));

    // Everything else requires a valid access token
    let protected_routes = Router::new()
        .route("/logout", post(routes::auth::logout))
        .route("/me", get(routes::auth::me))
        .route("/users", get(routes::users::list_users))
        .route(
            "/users/:id",
            get(routes::users::get_user)
                .put(routes::users::update_user)
                .delete(routes::users::delete_user),
        )
        .route(
            "/teams",
            get(routes::teams::list_teams).post(routes::teams::create_team),
        )
        .route(
            "/teams/:id",
            get(routes::teams::get_team)
                .put(routes::teams::update_team)
                .delete(routes::teams::delete_team),
        )
        .route("/teams/:id/managers", post(routes::teams::add_manager))
        .route(
            "/teams/:id/managers/:manager_id",
            delete(routes::teams::remove_manager),
        )
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.iter().any(|origin| origin == "*") {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: configure allowed origins
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    // Combine all routes with middleware stack
    Router::new()
        .merge(public_routes)
        .merge(registration_routes)
        .merge(protected_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Validates the bearer access token, reloads the caller's role from the
/// store and injects an `AuthContext` into request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let auth_context = authenticate(req.headers(), state.auth.tokens(), state.store.as_ref()).await?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}

/// Like [`jwt_auth_layer`], but lets requests without an Authorization header through
///
/// A header that is present must still carry a valid token.
async fn optional_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if req.headers().contains_key(header::AUTHORIZATION) {
        let auth_context =
            authenticate(req.headers(), state.auth.tokens(), state.store.as_ref()).await?;
        req.extensions_mut().insert(auth_context);
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{parse_duration, ApiConfig, DatabaseConfig, JwtConfig};
    use std::time::Duration;
    use teamgate_shared::{auth::password::Argon2Hasher, store::MemoryIdentityStore};

    fn config(access_ttl: Duration, refresh_ttl: Duration) -> Config {
        Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url: "postgresql://localhost/teamgate".to_string(),
                max_connections: 1,
            },
            jwt: JwtConfig {
                secret: "app-test-secret-at-least-32-bytes-long".to_string(),
                access_ttl,
                refresh_ttl,
            },
        }
    }

    fn state(config: Config) -> anyhow::Result<AppState> {
        AppState::new(
            config,
            Arc::new(MemoryIdentityStore::new()),
            Arc::new(Argon2Hasher::with_params(8, 1, 1).unwrap()),
        )
    }

    #[test]
    fn test_accepts_ordinary_lifetimes() {
        let config = config(Duration::from_secs(86400), Duration::from_secs(7 * 86400));
        assert!(state(config).is_ok());
    }

    #[test]
    fn test_rejects_lifetime_past_timestamp_range() {
        let huge = parse_duration("100000000d").unwrap();

        let err = state(config(Duration::from_secs(3600), huge)).err().unwrap();
        assert!(err.to_string().contains("REFRESH_TOKEN_TTL"));

        let err = state(config(huge, Duration::from_secs(3600))).err().unwrap();
        assert!(err.to_string().contains("JWT_TTL"));
    }
}
