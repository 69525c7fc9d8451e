//! PostgreSQL connection pool, configuration, migrations and health probes.

mod config;
mod connector;
mod health;
mod pool;

pub use config::PostgresConfig;
pub use connector::{connect_from_config, run_migrations};
pub use health::check_health;
pub use pool::{ExecOptions, ExecOutcome, Pool, PoolStatus, PooledConnection};

// Re-export SeaORM types for convenience
pub use sea_orm::{DatabaseConnection, DbErr, QueryResult, Statement};
pub use sea_orm_migration::MigratorTrait;
