//! # TeamGate API Server
//!
//! Role-based access control for admins, managers and employees organized
//! in teams, served over HTTP/JSON.
//!
//! ## Usage
//!
//! ```bash
//! DATABASE_URL=postgresql://localhost/teamgate \
//! JWT_SECRET=$(openssl rand -hex 32) \
//! cargo run -p teamgate-api
//! ```

use std::sync::Arc;
use teamgate_api::{
    app::{build_router, AppState},
    config::Config,
};
use teamgate_shared::{
    auth::password::Argon2Hasher,
    db::{
        migrations::run_migrations,
        pool::{close_pool, create_pool, DatabaseConfig},
    },
    store::PgIdentityStore,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "teamgate_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        "TeamGate API Server v{} starting...",
        env!("CARGO_PKG_VERSION")
    );

    let config = Config::from_env()?;

    let pool = create_pool(DatabaseConfig::new(
        config.database.url.clone(),
        config.database.max_connections,
    ))
    .await?;

    run_migrations(&pool).await?;
    tracing::info!("Database migrations applied");

    let bind_address = config.bind_address();
    let store = Arc::new(PgIdentityStore::new(pool.clone()));
    let hasher = Arc::new(Argon2Hasher::new()?);
    let state = AppState::new(config, store, hasher)?;
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address).await?;
    tracing::info!("Server listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutdown signal received, closing database pool...");
    close_pool(pool).await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
