/// Embedded schema migrations
///
/// The SQL files under `teamgate-shared/migrations/` are compiled into the
/// binary and applied at startup. Applied versions are tracked by sqlx in
/// `_sqlx_migrations`, so running them again is a no-op.

use sqlx::postgres::PgPool;
use tracing::{info, warn};

/// Applies every pending migration
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Starting database migrations");

    let migrator = sqlx::migrate!("./migrations");
    info!(bundled = migrator.iter().count(), "Loaded bundled migrations");

    match migrator.run(pool).await {
        Ok(()) => {
            info!("All database migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            warn!("Migration failed: {}", e);
            Err(e)
        }
    }
}
