//! Handler tests for the users domain
//!
//! These drive `handlers::router` over the in-memory repository and check:
//! - Request deserialization and validation
//! - The JSON envelopes and status codes
//! - Error responses
//!
//! The full application (static files, `/health`, CORS) is covered by the
//! users-api crate.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use domain_users::*;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt; // For oneshot()

fn app() -> Router {
    handlers::router(UserService::new(InMemoryUserRepository::new()))
}

// Helper to parse JSON response body
async fn json_body(body: Body) -> Value {
    let bytes = body.collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn delete(uri: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

fn with_json(method: &str, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn create(app: &Router, body: Value) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(with_json("POST", "/", body))
        .await
        .unwrap();
    let status = response.status();
    (status, json_body(response.into_body()).await)
}

#[tokio::test]
async fn test_create_returns_201_with_envelope() {
    let app = app();

    let (status, body) = create(
        &app,
        json!({"name": "João Silva", "email": "joao@example.com", "age": 30}),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "User created successfully");
    assert_eq!(body["data"]["id"], 1);
    assert_eq!(body["data"]["name"], "João Silva");
    assert_eq!(body["data"]["email"], "joao@example.com");
    assert_eq!(body["data"]["age"], 30);
}

#[tokio::test]
async fn test_create_requires_name_and_email() {
    let (status, body) = create(&app(), json!({"email": "joao@example.com"})).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Name and email are required");
}

#[tokio::test]
async fn test_create_rejects_bad_email_and_age() {
    let app = app();

    let (status, body) = create(&app, json!({"name": "A", "email": "not-an-email"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid email");

    let (status, body) = create(&app, json!({"name": "A", "email": "a@b.co", "age": 151})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid age");

    let (status, _) = create(&app, json!({"name": "A", "email": "a@b.co", "age": -1})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = create(&app, json!({"name": "A", "email": "a@b.co", "age": 0})).await;
    assert_eq!(status, StatusCode::CREATED);
}

#[tokio::test]
async fn test_create_with_malformed_json_is_bad_request() {
    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from("{\"name\": "))
        .unwrap();

    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = json_body(response.into_body()).await;
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_duplicate_email_is_conflict() {
    let app = app();
    let user = json!({"name": "Maria Santos", "email": "maria@example.com"});

    let (status, _) = create(&app, user.clone()).await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = create(&app, user).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "Email already registered");
}

#[tokio::test]
async fn test_list_is_newest_first_with_count() {
    let app = app();
    for (name, email) in [("A", "a@x.io"), ("B", "b@x.io"), ("C", "c@x.io")] {
        create(&app, json!({"name": name, "email": email})).await;
    }

    let response = app.oneshot(get("/")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["count"], 3);
    let names: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|u| u["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(names, vec!["C", "B", "A"]);
}

#[tokio::test]
async fn test_get_by_id_and_email() {
    let app = app();
    create(
        &app,
        json!({"name": "Pedro Oliveira", "email": "pedro@example.com", "age": 35}),
    )
    .await;

    let response = app.clone().oneshot(get("/1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["email"], "pedro@example.com");
    assert!(body["data"]["created_at"].as_str().unwrap().contains('/'));

    let response = app.oneshot(get("/email/pedro@example.com")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["data"]["name"], "Pedro Oliveira");
}

#[tokio::test]
async fn test_unknown_user_is_404() {
    let app = app();

    let response = app.clone().oneshot(get("/42")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["message"], "User not found");

    let response = app.oneshot(get("/email/nobody@example.com")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_non_numeric_id_is_400() {
    let app = app();

    for request in [
        get("/abc"),
        delete("/abc"),
        with_json("PUT", "/abc", json!({"name": "X"})),
    ] {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response.into_body()).await;
        assert_eq!(body["message"], "Invalid id");
    }
}

#[tokio::test]
async fn test_update_flow() {
    let app = app();
    create(&app, json!({"name": "Ana", "email": "ana@example.com", "age": 28})).await;

    let response = app
        .clone()
        .oneshot(with_json("PUT", "/1", json!({"name": "Ana Costa"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "User updated successfully");
    assert_eq!(body["rowsAffected"], 1);

    let body = json_body(app.clone().oneshot(get("/1")).await.unwrap().into_body()).await;
    assert_eq!(body["data"]["name"], "Ana Costa");
    assert_eq!(body["data"]["email"], "ana@example.com");
    assert_eq!(body["data"]["age"], 28);

    // Empty body: nothing to update
    let response = app
        .clone()
        .oneshot(with_json("PUT", "/1", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["message"], "No fields to update");

    let response = app
        .clone()
        .oneshot(with_json("PUT", "/99", json!({"name": "Ghost"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(with_json("PUT", "/1", json!({"email": "broken"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_to_taken_email_is_conflict() {
    let app = app();
    create(&app, json!({"name": "A", "email": "a@x.io"})).await;
    create(&app, json!({"name": "B", "email": "b@x.io"})).await;

    let response = app
        .oneshot(with_json("PUT", "/2", json!({"email": "a@x.io"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_create_get_delete_scenario() {
    let app = app();

    let (status, body) = create(
        &app,
        json!({"name": "João Silva", "email": "joao.silva@example.com", "age": 30}),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_i64().unwrap();

    let body = json_body(
        app.clone()
            .oneshot(get(&format!("/{}", id)))
            .await
            .unwrap()
            .into_body(),
    )
    .await;
    assert_eq!(body["data"]["name"], "João Silva");
    assert_eq!(body["data"]["age"], 30);

    let response = app
        .clone()
        .oneshot(delete(&format!("/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.into_body()).await;
    assert_eq!(body["message"], "User deleted successfully");
    assert_eq!(body["rowsAffected"], 1);

    let response = app
        .clone()
        .oneshot(get(&format!("/{}", id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.oneshot(delete(&format!("/{}", id))).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_count() {
    let app = app();
    create(&app, json!({"name": "A", "email": "a@x.io"})).await;
    create(&app, json!({"name": "B", "email": "b@x.io"})).await;

    let response = app.oneshot(get("/count")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response.into_body()).await;
    assert_eq!(body, json!({"success": true, "total": 2}));
}
