//! Bounded connection pool with scoped acquisition and graceful close.
//!
//! Every unit of work runs on a [`PooledConnection`]: a dedicated connection
//! held inside a transaction. Releasing it commits or rolls back; dropping it
//! (error, panic, cancelled future) rolls back and returns the connection to
//! the pool. A connection is therefore never leaked, whatever path the caller
//! takes.

use sea_orm::{
    ConnectionTrait, DatabaseConnection, DatabaseTransaction, QueryResult, Statement,
    TransactionTrait,
};
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tracing::{debug, info, instrument, warn};

use super::{check_health, connect_from_config, PostgresConfig};
use crate::common::{DatabaseError, DatabaseResult};

/// Per-statement execution options.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecOptions {
    /// Commit as soon as the statement succeeds. When false the statement's
    /// effects are rolled back on release.
    pub autocommit: bool,
}

impl ExecOptions {
    pub const AUTOCOMMIT: Self = Self { autocommit: true };
}

impl Default for ExecOptions {
    fn default() -> Self {
        Self::AUTOCOMMIT
    }
}

/// Result of a data-modifying statement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExecOutcome {
    pub rows_affected: u64,
}

/// Point-in-time view of pool usage.
#[derive(Clone, Debug, Serialize)]
pub struct PoolStatus {
    pub min_connections: u32,
    pub max_connections: u32,
    pub increment: u32,
    pub in_flight: usize,
    pub closed: bool,
}

#[derive(Clone, Copy, Debug)]
struct PoolLimits {
    min: u32,
    max: u32,
    increment: u32,
}

struct PoolInner {
    db: DatabaseConnection,
    acquire_timeout: Duration,
    limits: PoolLimits,
    closed: AtomicBool,
    in_flight: AtomicUsize,
    drained: Notify,
}

/// Shared handle to the connection pool. Cheap to clone.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl std::fmt::Debug for Pool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pool").field("status", &self.status()).finish()
    }
}

impl Pool {
    /// Create the pool from `config`.
    ///
    /// Fails when the configuration is inconsistent or, in eager mode, when
    /// the database cannot be reached. Callers treat this as fatal.
    pub async fn initialize(config: PostgresConfig) -> DatabaseResult<Self> {
        let db = connect_from_config(&config).await?;

        // sqlx opens connections one at a time as demand grows, which matches
        // an increment of 1. Larger values are accepted and reported only.
        if config.increment > 1 {
            warn!(
                increment = config.increment,
                "Pool grows one connection at a time; POOL_INCREMENT is advisory"
            );
        }

        info!(
            min = config.min_connections,
            max = config.max_connections,
            increment = config.increment,
            acquire_timeout_secs = config.acquire_timeout_secs,
            idle_timeout_secs = config.idle_timeout_secs,
            "Connection pool initialized"
        );

        Ok(Self::build(
            db,
            config.acquire_timeout(),
            PoolLimits {
                min: config.min_connections,
                max: config.max_connections,
                increment: config.increment,
            },
        ))
    }

    /// Wrap an already-open connection, e.g. a `MockDatabase` in tests.
    pub fn from_connection(db: DatabaseConnection, acquire_timeout: Duration) -> Self {
        let defaults = PostgresConfig::default();
        Self::build(
            db,
            acquire_timeout,
            PoolLimits {
                min: defaults.min_connections,
                max: defaults.max_connections,
                increment: defaults.increment,
            },
        )
    }

    fn build(db: DatabaseConnection, acquire_timeout: Duration, limits: PoolLimits) -> Self {
        Self {
            inner: Arc::new(PoolInner {
                db,
                acquire_timeout,
                limits,
                closed: AtomicBool::new(false),
                in_flight: AtomicUsize::new(0),
                drained: Notify::new(),
            }),
        }
    }

    /// The underlying SeaORM connection, for migrations and tooling.
    pub fn connection(&self) -> &DatabaseConnection {
        &self.inner.db
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus {
            min_connections: self.inner.limits.min,
            max_connections: self.inner.limits.max,
            increment: self.inner.limits.increment,
            in_flight: self.inner.in_flight.load(Ordering::Acquire),
            closed: self.is_closed(),
        }
    }

    /// Obtain a dedicated connection.
    ///
    /// Waits up to the configured acquire timeout when every connection is
    /// busy. Fails with [`DatabaseError::PoolClosed`] once [`Pool::close`]
    /// has started.
    pub async fn acquire(&self) -> DatabaseResult<PooledConnection> {
        if self.is_closed() {
            return Err(DatabaseError::PoolClosed);
        }

        let lease = Lease::new(self.inner.clone());

        // close() may have started between the check and the lease
        if self.is_closed() {
            return Err(DatabaseError::PoolClosed);
        }

        let txn = match tokio::time::timeout(self.inner.acquire_timeout, self.inner.db.begin()).await
        {
            Ok(result) => result?,
            Err(_) => {
                warn!(
                    timeout_secs = self.inner.acquire_timeout.as_secs(),
                    in_flight = self.inner.in_flight.load(Ordering::Acquire),
                    "Timed out waiting for a pooled connection"
                );
                return Err(DatabaseError::AcquireTimeout);
            }
        };

        Ok(PooledConnection { txn, _lease: lease })
    }

    /// Run a query on a scoped connection and return every row.
    pub async fn fetch_all(&self, stmt: Statement) -> DatabaseResult<Vec<QueryResult>> {
        let conn = self.acquire().await?;
        let rows = conn.fetch_all(stmt).await?;
        conn.release(false).await?;
        Ok(rows)
    }

    /// Run a query on a scoped connection and return the first row, if any.
    pub async fn fetch_one(&self, stmt: Statement) -> DatabaseResult<Option<QueryResult>> {
        let conn = self.acquire().await?;
        let row = conn.fetch_one(stmt).await?;
        conn.release(false).await?;
        Ok(row)
    }

    /// Acquire, run one data-modifying statement, release.
    #[instrument(skip_all, fields(autocommit = opts.autocommit))]
    pub async fn execute(&self, stmt: Statement, opts: ExecOptions) -> DatabaseResult<ExecOutcome> {
        let conn = self.acquire().await?;
        let outcome = conn.execute(stmt).await?;
        conn.release(opts.autocommit).await?;
        debug!(rows_affected = outcome.rows_affected, "Statement executed");
        Ok(outcome)
    }

    /// Like [`Pool::execute`] for statements with a `RETURNING` clause.
    #[instrument(skip_all, fields(autocommit = opts.autocommit))]
    pub async fn execute_returning(
        &self,
        stmt: Statement,
        opts: ExecOptions,
    ) -> DatabaseResult<Vec<QueryResult>> {
        let conn = self.acquire().await?;
        let rows = conn.fetch_all(stmt).await?;
        conn.release(opts.autocommit).await?;
        Ok(rows)
    }

    /// `SELECT 1` through the pool.
    pub async fn ping(&self) -> DatabaseResult<()> {
        if self.is_closed() {
            return Err(DatabaseError::PoolClosed);
        }
        check_health(&self.inner.db).await
    }

    /// Stop accepting work, wait up to `grace` for in-flight connections,
    /// then close every pooled connection. Later calls are no-ops.
    ///
    /// Returns within roughly `grace` even when connections are still held:
    /// those are abandoned and closed by a background task as they come back.
    pub async fn close(&self, grace: Duration) -> DatabaseResult<()> {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            debug!("Connection pool already closed");
            return Ok(());
        }

        info!(
            in_flight = self.inner.in_flight.load(Ordering::Acquire),
            grace_ms = grace.as_millis() as u64,
            "Closing connection pool"
        );

        let db = self.inner.db.clone();

        if tokio::time::timeout(grace, self.drained()).await.is_ok() {
            db.close().await?;
            info!("Connection pool closed");
            return Ok(());
        }

        // The driver's close waits for every checked-out connection, so it
        // must not be awaited here.
        warn!(
            abandoned = self.inner.in_flight.load(Ordering::Acquire),
            "Grace period elapsed with connections still in use, closing the rest in the background"
        );
        tokio::spawn(async move {
            match db.close().await {
                Ok(()) => info!("Connection pool closed after abandoned connections returned"),
                Err(e) => warn!(error = %e, "Closing abandoned connections failed"),
            }
        });

        Ok(())
    }

    async fn drained(&self) {
        loop {
            let notified = self.inner.drained.notified();
            if self.inner.in_flight.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }
}

/// Counts a connection as in flight until dropped.
struct Lease {
    pool: Arc<PoolInner>,
}

impl Lease {
    fn new(pool: Arc<PoolInner>) -> Self {
        pool.in_flight.fetch_add(1, Ordering::AcqRel);
        Self { pool }
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        if self.pool.in_flight.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.pool.drained.notify_waiters();
        }
    }
}

/// A connection checked out of the [`Pool`].
///
/// Dropping it without [`PooledConnection::release`] rolls back.
pub struct PooledConnection {
    txn: DatabaseTransaction,
    _lease: Lease,
}

impl PooledConnection {
    pub async fn fetch_all(&self, stmt: Statement) -> DatabaseResult<Vec<QueryResult>> {
        Ok(self.txn.query_all_raw(stmt).await?)
    }

    pub async fn fetch_one(&self, stmt: Statement) -> DatabaseResult<Option<QueryResult>> {
        Ok(self.txn.query_one_raw(stmt).await?)
    }

    pub async fn execute(&self, stmt: Statement) -> DatabaseResult<ExecOutcome> {
        let result = self.txn.execute_raw(stmt).await?;
        Ok(ExecOutcome {
            rows_affected: result.rows_affected(),
        })
    }

    /// Return the connection, committing first when `commit` is true.
    pub async fn release(self, commit: bool) -> DatabaseResult<()> {
        let Self { txn, _lease } = self;
        if commit {
            txn.commit().await?;
        } else {
            txn.rollback().await?;
        }
        Ok(())
    }
}
