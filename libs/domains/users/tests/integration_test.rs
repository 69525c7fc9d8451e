//! Integration tests for the users domain
//!
//! These use real PostgreSQL via testcontainers to check:
//! - The SQL issued by `PgUserRepository` against the migrated schema
//! - Unique and check constraints surfacing as typed errors
//! - Pool behaviour around real transactions
//!
//! Run with `cargo test -p domain_users -- --ignored` (requires Docker).

use database::postgres::{ExecOptions, Pool, PostgresConfig, Statement};
use domain_users::*;
use sea_orm::DbBackend;
use std::time::{Duration, Instant};
use test_utils::{assertions::*, TestDataBuilder, TestDatabase};

fn repository(db: &TestDatabase) -> PgUserRepository {
    PgUserRepository::new(Pool::from_connection(db.connection(), Duration::from_secs(5)))
}

fn new_user(name: &str, email: &str, age: Option<i32>) -> CreateUser {
    CreateUser {
        name: name.to_string(),
        email: email.to_string(),
        age,
    }
}

// ============================================================================
// Repository Tests
// ============================================================================

#[tokio::test]
#[ignore] // Requires Docker
async fn test_create_and_find_round_trip() {
    let db = TestDatabase::empty().await;
    let repo = repository(&db);
    let builder = TestDataBuilder::from_test_name("create_and_find");
    let email = builder.email("joao");

    let id = repo
        .create(new_user("João Silva", &email, Some(30)))
        .await
        .unwrap();

    let user = assert_some(repo.find_by_id(id).await.unwrap(), "created user");
    assert_eq!(user.name, "João Silva");
    assert_eq!(user.email, email);
    assert_eq!(user.age, Some(30));

    let by_email = assert_some(repo.find_by_email(&email).await.unwrap(), "by email");
    assert_eq!(by_email.id, id);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_duplicate_email_is_classified() {
    let db = TestDatabase::empty().await;
    let repo = repository(&db);

    repo.create(new_user("A", "dup@example.com", None)).await.unwrap();
    let result = repo.create(new_user("B", "dup@example.com", None)).await;

    assert!(matches!(result, Err(UserError::DuplicateEmail(_))));
    assert_eq!(repo.count().await.unwrap(), 1);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_find_all_orders_by_id_desc() {
    let db = TestDatabase::empty().await;
    let repo = repository(&db);

    for (name, email) in [("A", "a@x.io"), ("B", "b@x.io"), ("C", "c@x.io")] {
        repo.create(new_user(name, email, None)).await.unwrap();
    }

    let names: Vec<_> = repo
        .find_all()
        .await
        .unwrap()
        .into_iter()
        .map(|u| u.name)
        .collect();
    assert_eq!(names, vec!["C", "B", "A"]);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_partial_update_and_clear_age() {
    let db = TestDatabase::empty().await;
    let repo = repository(&db);
    let id = repo
        .create(new_user("Ana", "ana@example.com", Some(28)))
        .await
        .unwrap();

    let outcome = repo
        .update(
            id,
            UpdateUser {
                name: Some("Ana Costa".to_string()),
                age: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(outcome, UpdateOutcome::Updated { rows_affected: 1 });

    let user = assert_some(repo.find_by_id(id).await.unwrap(), "updated user");
    assert_eq!(user.name, "Ana Costa");
    assert_eq!(user.email, "ana@example.com");
    assert_eq!(user.age, None);

    assert_eq!(
        repo.update(id, UpdateUser::default()).await.unwrap(),
        UpdateOutcome::NoOp
    );
    assert_eq!(
        repo.update(
            id + 1000,
            UpdateUser {
                name: Some("Ghost".to_string()),
                ..Default::default()
            }
        )
        .await
        .unwrap(),
        UpdateOutcome::NotFound
    );
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_delete_then_missing() {
    let db = TestDatabase::empty().await;
    let repo = repository(&db);
    let id = repo.create(new_user("A", "a@x.io", None)).await.unwrap();

    assert_eq!(
        repo.delete(id).await.unwrap(),
        DeleteOutcome::Deleted { rows_affected: 1 }
    );
    assert_eq!(repo.delete(id).await.unwrap(), DeleteOutcome::NotFound);
    assert_none(repo.find_by_id(id).await.unwrap(), "deleted user");
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_age_check_constraint_backs_validation() {
    let db = TestDatabase::empty().await;
    let repo = repository(&db);

    let result = repo.create(new_user("Old", "old@example.com", Some(151))).await;
    assert!(matches!(result, Err(UserError::Database(_))));
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_seed_data_is_present() {
    let db = TestDatabase::new().await;
    let repo = repository(&db);

    assert_eq!(repo.count().await.unwrap(), 4);
    let joao = assert_some(
        repo.find_by_email("joao.silva@example.com").await.unwrap(),
        "seeded user",
    );
    assert_eq!(joao.age, Some(30));
}

// ============================================================================
// Pool Tests
// ============================================================================

#[tokio::test]
#[ignore] // Requires Docker
async fn test_execute_without_autocommit_rolls_back() {
    let db = TestDatabase::empty().await;
    let pool = Pool::from_connection(db.connection(), Duration::from_secs(5));

    let insert = Statement::from_string(
        DbBackend::Postgres,
        "INSERT INTO users (name, email) VALUES ('Temp', 'temp@example.com')",
    );
    let outcome = pool
        .execute(insert, ExecOptions { autocommit: false })
        .await
        .unwrap();
    assert_eq!(outcome.rows_affected, 1);

    let repo = PgUserRepository::new(pool);
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_closed_pool_reports_unavailable() {
    let db = TestDatabase::empty().await;
    let pool = Pool::from_connection(db.connection(), Duration::from_secs(5));
    let repo = PgUserRepository::new(pool.clone());

    pool.close(Duration::from_secs(1)).await.unwrap();
    assert!(matches!(repo.count().await, Err(UserError::Unavailable(_))));
}

async fn bounded_pool(db: &TestDatabase, max_connections: u32) -> Pool {
    let mut config = PostgresConfig::with_pool_size(db.connection_string.clone(), max_connections, 1);
    config.acquire_timeout_secs = 1;
    Pool::initialize(config).await.unwrap()
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_exhausted_pool_times_out_as_unavailable() {
    let db = TestDatabase::empty().await;
    let pool = bounded_pool(&db, 1).await;
    let repo = PgUserRepository::new(pool.clone());

    let _held = pool.acquire().await.unwrap();

    let started = Instant::now();
    let result = repo.count().await;
    assert!(matches!(result, Err(UserError::Unavailable(_))));
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_close_returns_after_grace_with_connection_held() {
    let db = TestDatabase::empty().await;
    let pool = bounded_pool(&db, 2).await;

    let _held = pool.acquire().await.unwrap();

    let started = Instant::now();
    let closed = tokio::time::timeout(Duration::from_secs(5), pool.close(Duration::from_millis(300))).await;
    assert!(matches!(closed, Ok(Ok(()))));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(pool.is_closed());
}
