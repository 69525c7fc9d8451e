use axum::Router;
use domain_users::{handlers, InMemoryUserRepository, PgUserRepository, UserService};

use crate::state::AppState;

/// Users routes over whichever store the state carries.
pub fn router(state: &AppState) -> Router {
    match &state.pool {
        Some(pool) => handlers::router(UserService::new(PgUserRepository::new(pool.clone()))),
        None => handlers::router(UserService::new(InMemoryUserRepository::new())),
    }
}
