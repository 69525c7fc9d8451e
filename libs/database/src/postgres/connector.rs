use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use super::PostgresConfig;
use crate::common::{DatabaseError, DatabaseResult};

/// Open the underlying SeaORM/sqlx pool described by `config`.
///
/// Unless `lazy_connect` is set, this opens `min_connections` up front and
/// fails when the server is unreachable.
pub async fn connect_from_config(config: &PostgresConfig) -> DatabaseResult<DatabaseConnection> {
    config.validate()?;

    let db = Database::connect(config.connect_options())
        .await
        .map_err(|e| DatabaseError::ConnectionFailed(e.to_string()))?;

    info!(
        url = %config.redacted_url(),
        lazy = config.lazy_connect,
        "Connected to PostgreSQL"
    );

    Ok(db)
}

/// Apply every pending migration of `M`.
///
/// ```ignore
/// use database::postgres::run_migrations;
/// use migration::Migrator;
///
/// run_migrations::<Migrator>(pool.connection(), "users_api").await?;
/// ```
pub async fn run_migrations<M: MigratorTrait>(
    db: &DatabaseConnection,
    app_name: &str,
) -> DatabaseResult<()> {
    info!("Running {} database migrations...", app_name);
    M::up(db, None)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;
    info!("Migrations completed successfully for {}", app_name);
    Ok(())
}
