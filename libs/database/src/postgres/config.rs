use sea_orm::ConnectOptions;
use std::time::Duration;
use tracing::log::LevelFilter;

use crate::common::DatabaseError;

#[cfg(feature = "config")]
use core_config::{env_flag, env_parse, ConfigError, FromEnv};

/// Connection pool settings for PostgreSQL.
///
/// Defaults mirror a small service: two warm connections, at most ten, and
/// a generous one minute wait for a free connection before failing the
/// request.
///
/// ```ignore
/// use database::postgres::PostgresConfig;
/// use core_config::FromEnv;
///
/// let config = PostgresConfig::from_env()?;
/// let pool = database::postgres::Pool::initialize(config).await?;
/// ```
#[derive(Clone, Debug)]
pub struct PostgresConfig {
    /// Database connection URL
    pub url: String,

    /// Connections kept open even when idle
    pub min_connections: u32,

    /// Upper bound on concurrently open connections
    pub max_connections: u32,

    /// Connections opened per growth step when demand exceeds the open set
    pub increment: u32,

    pub connect_timeout_secs: u64,

    /// How long an acquisition may queue before failing
    pub acquire_timeout_secs: u64,

    /// Idle connections above `min_connections` are closed after this long
    pub idle_timeout_secs: u64,

    pub max_lifetime_secs: u64,

    /// Defer opening connections until the first acquisition
    pub lazy_connect: bool,

    /// Log every SQL statement
    pub sqlx_logging: bool,

    /// How long `Pool::close` waits for in-flight work
    pub shutdown_grace_secs: u64,
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    pub fn with_pool_size(url: impl Into<String>, max_connections: u32, min_connections: u32) -> Self {
        Self {
            url: url.into(),
            max_connections,
            min_connections,
            ..Self::default()
        }
    }

    /// Rejects sizing the pool could never satisfy.
    pub fn validate(&self) -> Result<(), DatabaseError> {
        if self.url.is_empty() {
            return Err(DatabaseError::ConfigError("database url is empty".to_string()));
        }
        if self.max_connections == 0 {
            return Err(DatabaseError::ConfigError(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(DatabaseError::ConfigError(format!(
                "min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        if self.increment == 0 {
            return Err(DatabaseError::ConfigError(
                "increment must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_secs)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }

    /// SeaORM options for the underlying sqlx pool.
    pub fn connect_options(&self) -> ConnectOptions {
        let mut opt = ConnectOptions::new(&self.url);
        opt.max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .acquire_timeout(self.acquire_timeout())
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(self.max_lifetime_secs))
            .connect_lazy(self.lazy_connect)
            .sqlx_logging(self.sqlx_logging)
            .sqlx_logging_level(LevelFilter::Debug);
        opt
    }

    /// The URL with its password masked, for logs.
    pub fn redacted_url(&self) -> String {
        redact_password(&self.url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            min_connections: 2,
            max_connections: 10,
            increment: 1,
            connect_timeout_secs: 8,
            acquire_timeout_secs: 60,
            idle_timeout_secs: 60,
            max_lifetime_secs: 1800,
            lazy_connect: false,
            sqlx_logging: false,
            shutdown_grace_secs: 10,
        }
    }
}

fn redact_password(url: &str) -> String {
    let Some(scheme_end) = url.find("://").map(|i| i + 3) else {
        return url.to_string();
    };
    let Some(at) = url[scheme_end..].find('@').map(|i| i + scheme_end) else {
        return url.to_string();
    };
    match url[scheme_end..at].find(':') {
        Some(colon) => format!("{}:***{}", &url[..scheme_end + colon], &url[at..]),
        None => url.to_string(),
    }
}

/// Resolve the connection URL. `DATABASE_URL` wins; otherwise the URL is
/// assembled from `DB_USER`, `DB_PASSWORD` and `DB_CONNECTION_STRING`
/// (`host:port/dbname`).
#[cfg(feature = "config")]
fn url_from_env() -> Result<String, ConfigError> {
    if let Ok(url) = std::env::var("DATABASE_URL") {
        return Ok(url);
    }

    let parts = (
        std::env::var("DB_USER"),
        std::env::var("DB_PASSWORD"),
        std::env::var("DB_CONNECTION_STRING"),
    );
    match parts {
        (Ok(user), Ok(password), Ok(target)) => Ok(format!(
            "postgres://{}:{}@{}",
            urlencoding::encode(&user),
            urlencoding::encode(&password),
            target
        )),
        _ => Err(ConfigError::MissingEnvVar("DATABASE_URL".to_string())),
    }
}

/// Environment variables (defaults in parentheses):
/// - `DATABASE_URL`, or `DB_USER` + `DB_PASSWORD` + `DB_CONNECTION_STRING`
/// - `POOL_MIN` (2), `POOL_MAX` (10), `POOL_INCREMENT` (1)
/// - `DB_CONNECT_TIMEOUT_SECS` (8), `DB_ACQUIRE_TIMEOUT_SECS` (60)
/// - `DB_IDLE_TIMEOUT_SECS` (60), `DB_MAX_LIFETIME_SECS` (1800)
/// - `DB_LAZY_CONNECT` (false), `DB_SQLX_LOGGING` (false)
/// - `DB_SHUTDOWN_GRACE_SECS` (10)
#[cfg(feature = "config")]
impl FromEnv for PostgresConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            url: url_from_env()?,
            min_connections: env_parse("POOL_MIN", defaults.min_connections)?,
            max_connections: env_parse("POOL_MAX", defaults.max_connections)?,
            increment: env_parse("POOL_INCREMENT", defaults.increment)?,
            connect_timeout_secs: env_parse("DB_CONNECT_TIMEOUT_SECS", defaults.connect_timeout_secs)?,
            acquire_timeout_secs: env_parse("DB_ACQUIRE_TIMEOUT_SECS", defaults.acquire_timeout_secs)?,
            idle_timeout_secs: env_parse("DB_IDLE_TIMEOUT_SECS", defaults.idle_timeout_secs)?,
            max_lifetime_secs: env_parse("DB_MAX_LIFETIME_SECS", defaults.max_lifetime_secs)?,
            lazy_connect: env_flag("DB_LAZY_CONNECT", defaults.lazy_connect)?,
            sqlx_logging: env_flag("DB_SQLX_LOGGING", defaults.sqlx_logging)?,
            shutdown_grace_secs: env_parse("DB_SHUTDOWN_GRACE_SECS", defaults.shutdown_grace_secs)?,
        };

        config
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;

        Ok(config)
    }
}
