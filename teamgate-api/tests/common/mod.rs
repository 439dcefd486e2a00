/// Common test utilities for HTTP tests
///
/// Builds the full router over an in-memory identity store with a cheap
/// Argon2 parameter set, and provides request/response helpers.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use teamgate_api::app::{build_router, AppState};
use teamgate_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig};
use teamgate_shared::auth::password::Argon2Hasher;
use teamgate_shared::store::MemoryIdentityStore;
use tower::Service as _;

pub const PASSWORD: &str = "password123";

/// Test context containing the router and its backing store
pub struct TestContext {
    pub app: axum::Router,
    pub store: Arc<MemoryIdentityStore>,
}

impl TestContext {
    pub fn new() -> Self {
        let config = Config {
            api: ApiConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors_origins: vec!["*".to_string()],
            },
            database: DatabaseConfig {
                url: "postgresql://unused".to_string(),
                max_connections: 1,
            },
            jwt: JwtConfig {
                secret: "api-test-secret-key-at-least-32-bytes".to_string(),
                access_ttl: Duration::from_secs(24 * 3600),
                refresh_ttl: Duration::from_secs(168 * 3600),
            },
        };

        let store = Arc::new(MemoryIdentityStore::new());
        let hasher = Arc::new(Argon2Hasher::with_params(8, 1, 1).unwrap());
        let state = AppState::new(config, store.clone(), hasher).unwrap();

        Self {
            app: build_router(state),
            store,
        }
    }

    /// Sends a request and returns the status with the parsed JSON body
    ///
    /// An empty body parses as `Value::Null`.
    pub async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Bearer {}", token));
        }

        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().call(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();

        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, value)
    }

    /// Registers a user; `token` must be an admin's once an admin exists
    pub async fn register(
        &self,
        token: Option<&str>,
        email: &str,
        role: Option<&str>,
        team_id: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut body = json!({
            "email": email,
            "password": PASSWORD,
            "first_name": "Alex",
            "last_name": "Martin",
        });
        if let Some(role) = role {
            body["role"] = json!(role);
        }
        if let Some(team_id) = team_id {
            body["team_id"] = json!(team_id);
        }

        self.send("POST", "/register", token, Some(body)).await
    }

    /// Logs in with the shared test password and returns the login body
    pub async fn login(&self, email: &str) -> Value {
        let (status, body) = self
            .send(
                "POST",
                "/login",
                None,
                Some(json!({ "email": email, "password": PASSWORD })),
            )
            .await;
        assert_eq!(status, StatusCode::OK, "login failed: {}", body);
        body
    }

    /// Bootstraps the first admin and returns its access token
    pub async fn admin_token(&self) -> String {
        let (status, body) = self.register(None, "admin@example.com", None, None).await;
        assert_eq!(status, StatusCode::CREATED, "bootstrap failed: {}", body);

        token_of(&self.login("admin@example.com").await)
    }

    /// Creates a team as `admin` and returns its id
    pub async fn create_team(&self, admin: &str, name: &str) -> String {
        let (status, body) = self
            .send("POST", "/teams", Some(admin), Some(json!({ "name": name })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "team creation failed: {}", body);
        body["id"].as_str().unwrap().to_string()
    }

    /// Creates a user as `admin`, logs it in and returns (id, access token)
    pub async fn user_with_token(
        &self,
        admin: &str,
        email: &str,
        role: &str,
        team_id: Option<&str>,
    ) -> (String, String) {
        let (status, body) = self.register(Some(admin), email, Some(role), team_id).await;
        assert_eq!(status, StatusCode::CREATED, "registration failed: {}", body);

        let id = body["user"]["id"].as_str().unwrap().to_string();
        (id, token_of(&self.login(email).await))
    }
}

pub fn token_of(login: &Value) -> String {
    login["token"].as_str().unwrap().to_string()
}

/// Emails of a JSON array of users, sorted
pub fn emails(users: &Value) -> Vec<String> {
    let mut emails: Vec<String> = users
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["email"].as_str().unwrap().to_string())
        .collect();
    emails.sort();
    emails
}
