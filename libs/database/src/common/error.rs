#[cfg(feature = "postgres")]
use sea_orm::{ConnAcquireErr, DbErr, SqlErr};

/// Database error type shared by every caller of the pool.
///
/// Driver errors are classified exactly once, when they cross the pool
/// boundary (`From<DbErr>`). Callers branch on the variant instead of
/// inspecting messages.
#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    /// A unique constraint rejected the write. Carries the driver detail.
    #[error("Unique constraint violated: {0}")]
    UniqueViolation(String),

    /// No connection became available within the acquire timeout.
    #[error("Timed out waiting for a pooled connection")]
    AcquireTimeout,

    /// The pool has been closed; no further work is accepted.
    #[error("Connection pool is closed")]
    PoolClosed,

    /// Connectivity to the server failed or was lost.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Migration error: {0}")]
    MigrationError(String),

    /// Any other statement failure.
    #[cfg(feature = "postgres")]
    #[error("Query failed: {0}")]
    Query(#[source] DbErr),
}

impl DatabaseError {
    pub fn is_unique_violation(&self) -> bool {
        matches!(self, Self::UniqueViolation(_))
    }

    /// True when the failure is about pool capacity or reachability rather
    /// than the statement itself.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            Self::AcquireTimeout | Self::PoolClosed | Self::ConnectionFailed(_)
        )
    }
}

#[cfg(feature = "postgres")]
impl From<DbErr> for DatabaseError {
    fn from(err: DbErr) -> Self {
        if let Some(SqlErr::UniqueConstraintViolation(detail)) = err.sql_err() {
            return Self::UniqueViolation(detail);
        }

        match err {
            DbErr::ConnectionAcquire(ConnAcquireErr::Timeout) => Self::AcquireTimeout,
            DbErr::ConnectionAcquire(_) => Self::PoolClosed,
            DbErr::Conn(e) => Self::ConnectionFailed(e.to_string()),
            other => Self::Query(other),
        }
    }
}

/// Result type alias for database operations
pub type DatabaseResult<T> = Result<T, DatabaseError>;
