use axum_helpers::{errors::set_expose_internal_errors, server::create_production_app};
use core_config::tracing::{init_tracing, install_color_eyre};
use database::postgres::{run_migrations, Pool};
use migration::Migrator;
use std::time::Duration;
use tracing::info;

mod api;
mod config;
mod openapi;
mod state;

use config::Config;
use state::AppState;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    // Install color-eyre first for colored error output (before any fallible operations)
    install_color_eyre();

    // A local .env is optional; real environment variables win
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    init_tracing(&config.environment);
    set_expose_internal_errors(config.environment.is_development());
    info!(storage = ?config.storage, "Starting {} v{}", config.app.name, config.app.version);

    let pool = match &config.database {
        Some(db_config) => {
            info!("Connecting to PostgreSQL at {}", db_config.redacted_url());
            let pool = Pool::initialize(db_config.clone())
                .await
                .map_err(|e| eyre::eyre!("PostgreSQL connection failed: {}", e))?;

            if config.run_migrations {
                run_migrations::<Migrator>(pool.connection(), config.app.name)
                    .await
                    .map_err(|e| eyre::eyre!("Migrations failed: {}", e))?;
            }
            Some(pool)
        }
        None => {
            info!("USERS_STORAGE=memory, data will not survive a restart");
            None
        }
    };

    let state = AppState {
        config: config.clone(),
        pool,
    };

    let router = api::build_app(&state)?;

    let cleanup_pool = state.pool.clone();
    let grace = config
        .database
        .as_ref()
        .map(|db| db.shutdown_grace())
        .unwrap_or_default();

    create_production_app(router, &config.server, Duration::from_secs(30), async move {
        if let Some(pool) = cleanup_pool {
            info!("Closing database pool");
            if let Err(e) = pool.close(grace).await {
                tracing::error!("Error closing database pool: {}", e);
            }
        }
    })
    .await
    .map_err(|e| eyre::eyre!("Server error: {}", e))?;

    info!("Shutdown complete");
    Ok(())
}
