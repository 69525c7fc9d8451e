use async_trait::async_trait;
use chrono::{Timelike, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::error::{UserError, UserResult};
use crate::models::{CreateUser, DeleteOutcome, UpdateOutcome, UpdateUser, User};

/// Repository trait for User persistence
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user and return the generated id
    async fn create(&self, input: CreateUser) -> UserResult<i32>;

    /// Every user, newest id first
    async fn find_all(&self) -> UserResult<Vec<User>>;

    async fn find_by_id(&self, id: i32) -> UserResult<Option<User>>;

    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>>;

    /// Apply the fields present in `patch`
    async fn update(&self, id: i32, patch: UpdateUser) -> UserResult<UpdateOutcome>;

    async fn delete(&self, id: i32) -> UserResult<DeleteOutcome>;

    async fn count(&self) -> UserResult<i64>;
}

#[derive(Debug, Default)]
struct MemoryState {
    users: BTreeMap<i32, User>,
    last_id: i32,
}

/// In-memory implementation of UserRepository (for development/testing)
///
/// Ids come from a counter and are never reused. Emails are unique, matched
/// exactly as the database constraint does.
#[derive(Debug, Default, Clone)]
pub struct InMemoryUserRepository {
    state: Arc<RwLock<MemoryState>>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn create(&self, input: CreateUser) -> UserResult<i32> {
        let mut state = self.state.write().await;

        if state.users.values().any(|u| u.email == input.email) {
            return Err(UserError::DuplicateEmail(input.email));
        }

        state.last_id += 1;
        let id = state.last_id;
        let now = Utc::now().naive_utc();
        let created_at = now.with_nanosecond(0).unwrap_or(now);

        state.users.insert(
            id,
            User {
                id,
                name: input.name,
                email: input.email,
                age: input.age,
                created_at,
            },
        );

        tracing::info!(user_id = id, "Created user");
        Ok(id)
    }

    async fn find_all(&self) -> UserResult<Vec<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().rev().cloned().collect())
    }

    async fn find_by_id(&self, id: i32) -> UserResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn update(&self, id: i32, patch: UpdateUser) -> UserResult<UpdateOutcome> {
        if patch.is_empty() {
            return Ok(UpdateOutcome::NoOp);
        }

        let mut state = self.state.write().await;

        if !state.users.contains_key(&id) {
            return Ok(UpdateOutcome::NotFound);
        }

        if let Some(email) = &patch.email {
            if state.users.values().any(|u| u.id != id && &u.email == email) {
                return Err(UserError::DuplicateEmail(email.clone()));
            }
        }

        let Some(user) = state.users.get_mut(&id) else {
            return Ok(UpdateOutcome::NotFound);
        };
        if let Some(name) = patch.name {
            user.name = name;
        }
        if let Some(email) = patch.email {
            user.email = email;
        }
        if let Some(age) = patch.age {
            user.age = age;
        }

        tracing::info!(user_id = id, "Updated user");
        Ok(UpdateOutcome::Updated { rows_affected: 1 })
    }

    async fn delete(&self, id: i32) -> UserResult<DeleteOutcome> {
        let mut state = self.state.write().await;

        if state.users.remove(&id).is_some() {
            tracing::info!(user_id = id, "Deleted user");
            Ok(DeleteOutcome::Deleted { rows_affected: 1 })
        } else {
            Ok(DeleteOutcome::NotFound)
        }
    }

    async fn count(&self) -> UserResult<i64> {
        let state = self.state.read().await;
        Ok(state.users.len() as i64)
    }
}
