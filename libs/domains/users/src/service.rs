use axum_helpers::errors::validation_summary;
use std::sync::Arc;
use validator::Validate;

use crate::error::{UserError, UserResult};
use crate::models::{CreateUser, CreatedUser, DeleteOutcome, UpdateOutcome, UpdateUser, User};
use crate::repository::UserRepository;

/// Service layer for User business logic
///
/// Input is validated here before anything reaches storage; the repository
/// only sees well-formed values.
#[derive(Clone)]
pub struct UserService<R: UserRepository> {
    repository: Arc<R>,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repository: R) -> Self {
        Self {
            repository: Arc::new(repository),
        }
    }

    pub async fn create_user(&self, input: CreateUser) -> UserResult<CreatedUser> {
        input
            .validate()
            .map_err(|e| UserError::Validation(validation_summary(&e)))?;

        let input = input.normalized();
        let id = self.repository.create(input.clone()).await?;

        Ok(CreatedUser {
            id,
            name: input.name,
            email: input.email,
            age: input.age,
        })
    }

    pub async fn list_users(&self) -> UserResult<Vec<User>> {
        self.repository.find_all().await
    }

    pub async fn get_user(&self, id: i32) -> UserResult<User> {
        self.repository
            .find_by_id(id)
            .await?
            .ok_or(UserError::NotFound)
    }

    pub async fn get_user_by_email(&self, email: &str) -> UserResult<User> {
        self.repository
            .find_by_email(email.trim())
            .await?
            .ok_or(UserError::NotFound)
    }

    /// Apply a partial update and return the number of rows changed.
    pub async fn update_user(&self, id: i32, input: UpdateUser) -> UserResult<u64> {
        input
            .validate()
            .map_err(|e| UserError::Validation(validation_summary(&e)))?;

        match self.repository.update(id, input.normalized()).await? {
            UpdateOutcome::Updated { rows_affected } => Ok(rows_affected),
            UpdateOutcome::NoOp => Err(UserError::NoFieldsToUpdate),
            UpdateOutcome::NotFound => Err(UserError::NotFound),
        }
    }

    /// Delete a user and return the number of rows removed.
    pub async fn delete_user(&self, id: i32) -> UserResult<u64> {
        match self.repository.delete(id).await? {
            DeleteOutcome::Deleted { rows_affected } => Ok(rows_affected),
            DeleteOutcome::NotFound => Err(UserError::NotFound),
        }
    }

    pub async fn count_users(&self) -> UserResult<i64> {
        self.repository.count().await
    }
}
