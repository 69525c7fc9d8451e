use axum::{routing::get, Router};
use axum_helpers::server::{create_router, health_router};
use std::io;

use crate::openapi::ApiDoc;
use crate::state::AppState;

pub mod health;
pub mod users;

/// Everything served under `/api`.
pub fn routes(state: &AppState) -> Router {
    Router::new().nest("/users", users::router(state))
}

pub fn ready_router(state: AppState) -> Router {
    Router::new()
        .route("/ready", get(health::ready_handler))
        .with_state(state)
}

/// Full application: API, docs, static front end, health and readiness.
pub fn build_app(state: &AppState) -> io::Result<Router> {
    let router = create_router::<ApiDoc>(routes(state), Some(&state.config.public_dir))?;

    Ok(router
        .merge(health_router(state.config.app.clone()))
        .merge(ready_router(state.clone())))
}
