//! Shared application state handed to routers at startup.

use database::postgres::Pool;

#[derive(Clone)]
pub struct AppState {
    pub config: crate::config::Config,
    /// `None` when users live in memory
    pub pool: Option<Pool>,
}
