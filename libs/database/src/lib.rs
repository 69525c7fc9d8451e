//! Database access shared by the service crates.
//!
//! # Features
//!
//! - `postgres` (default) - pooled PostgreSQL access through SeaORM
//! - `config` (default) - `core_config::FromEnv` for [`postgres::PostgresConfig`]
//!
//! ```ignore
//! use core_config::FromEnv;
//! use database::postgres::{ExecOptions, Pool, PostgresConfig, Statement};
//!
//! let pool = Pool::initialize(PostgresConfig::from_env()?).await?;
//! let outcome = pool.execute(stmt, ExecOptions::AUTOCOMMIT).await?;
//! pool.close(std::time::Duration::from_secs(10)).await?;
//! ```

pub mod common;

#[cfg(feature = "postgres")]
pub mod postgres;

pub use common::{DatabaseError, DatabaseResult};
