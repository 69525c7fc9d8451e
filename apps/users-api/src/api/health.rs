//! Readiness probe backed by a real round trip to the database.

use crate::state::AppState;
use axum::{
    extract::State,
    response::{IntoResponse, Response},
    Json,
};
use axum_helpers::server::{run_health_checks, HealthCheckFuture};
use serde_json::json;

/// `GET /ready`: 200 when storage answers, 503 otherwise.
///
/// With a pool the body also carries its sizing and in-flight count.
pub async fn ready_handler(State(state): State<AppState>) -> Response {
    let Some(pool) = &state.pool else {
        return Json(json!({ "status": "ready", "storage": "memory" })).into_response();
    };

    let checks: Vec<(&str, HealthCheckFuture<'_>)> = vec![(
        "database",
        Box::pin(async {
            pool.ping()
                .await
                .map_err(|e| format!("Database ping failed: {}", e))
        }),
    )];

    let (status, Json(mut body)) = run_health_checks(checks).await;
    if let Some(fields) = body.as_object_mut() {
        fields.insert("pool".to_string(), json!(pool.status()));
    }
    (status, Json(body)).into_response()
}
