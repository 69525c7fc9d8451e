use core_config::{app_info, env_flag, env_or_default, server::ServerConfig, AppInfo, ConfigError, FromEnv};
use database::postgres::PostgresConfig;
use std::path::PathBuf;
use std::str::FromStr;

// Re-export Environment for use in other modules
pub use core_config::Environment;

/// Where users are stored, from `USERS_STORAGE`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Storage {
    Postgres,
    /// Process memory; nothing survives a restart
    Memory,
}

impl FromStr for Storage {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(Storage::Postgres),
            "memory" => Ok(Storage::Memory),
            other => Err(ConfigError::Invalid(format!(
                "USERS_STORAGE must be 'postgres' or 'memory', got '{}'",
                other
            ))),
        }
    }
}

/// Application-specific configuration
/// Composes shared config components from the `config` library
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub environment: Environment,
    pub server: ServerConfig,
    pub storage: Storage,
    /// Present exactly when `storage` is Postgres
    pub database: Option<PostgresConfig>,
    pub run_migrations: bool,
    pub public_dir: PathBuf,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let server = ServerConfig::from_env()?; // HOST=0.0.0.0, PORT=3000
        let storage: Storage = env_or_default("USERS_STORAGE", "postgres").parse()?;

        let database = match storage {
            Storage::Postgres => Some(PostgresConfig::from_env()?), // Required - fails if not set
            Storage::Memory => None,
        };

        Ok(Self {
            app: app_info!(),
            environment,
            server,
            storage,
            database,
            run_migrations: env_flag("RUN_MIGRATIONS", true)?,
            public_dir: PathBuf::from(env_or_default("PUBLIC_DIR", "apps/users-api/public")),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_storage_needs_no_database() {
        temp_env::with_vars(
            [
                ("USERS_STORAGE", Some("memory")),
                ("DATABASE_URL", None::<&str>),
                ("DB_USER", None),
                ("PORT", None),
            ],
            || {
                let config = Config::from_env().unwrap();
                assert_eq!(config.storage, Storage::Memory);
                assert!(config.database.is_none());
                assert_eq!(config.server.port, 3000);
                assert_eq!(config.app.name, "users_api");
            },
        );
    }

    #[test]
    fn test_postgres_storage_requires_url() {
        temp_env::with_vars(
            [
                ("USERS_STORAGE", None::<&str>),
                ("DATABASE_URL", None),
                ("DB_USER", None),
                ("DB_PASSWORD", None),
                ("DB_CONNECTION_STRING", None),
            ],
            || {
                assert!(Config::from_env().is_err());
            },
        );
    }

    #[test]
    fn test_postgres_storage_reads_pool_settings() {
        temp_env::with_vars(
            [
                ("USERS_STORAGE", Some("postgres")),
                ("DATABASE_URL", Some("postgres://app:pw@localhost:5432/users")),
                ("POOL_MIN", Some("1")),
                ("POOL_MAX", Some("4")),
                ("RUN_MIGRATIONS", Some("false")),
            ],
            || {
                let config = Config::from_env().unwrap();
                let database = config.database.unwrap();
                assert_eq!(database.min_connections, 1);
                assert_eq!(database.max_connections, 4);
                assert!(!config.run_migrations);
            },
        );
    }

    #[test]
    fn test_unknown_storage_is_rejected() {
        assert!("redis".parse::<Storage>().is_err());
        assert_eq!("Memory".parse::<Storage>().unwrap(), Storage::Memory);
    }
}
