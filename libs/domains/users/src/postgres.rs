use async_trait::async_trait;
use chrono::NaiveDateTime;
use database::postgres::{ExecOptions, Pool, QueryResult, Statement};
use database::DatabaseError;
use sea_orm::{DbBackend, FromQueryResult, Value};

use crate::{
    error::{UserError, UserResult},
    models::{CreateUser, DeleteOutcome, UpdateOutcome, UpdateUser, User},
    repository::UserRepository,
};

const SELECT_USERS: &str = "SELECT id, name, email, age, created_at FROM users";

/// Folds optional column assignments into a positional `UPDATE`.
///
/// ```ignore
/// let stmt = UpdateStatement::new("users")
///     .set_opt("name", Some("Ana"))
///     .set_opt("age", Some(Some(30)))
///     .build("id", 7);
/// // UPDATE users SET name = $1, age = $2 WHERE id = $3
/// ```
#[derive(Debug, Clone)]
pub struct UpdateStatement {
    table: &'static str,
    assignments: Vec<(&'static str, Value)>,
}

impl UpdateStatement {
    pub fn new(table: &'static str) -> Self {
        Self {
            table,
            assignments: Vec::new(),
        }
    }

    pub fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.assignments.push((column, value.into()));
        self
    }

    /// Adds the assignment only when `value` is present.
    pub fn set_opt<T: Into<Value>>(self, column: &'static str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.set(column, value),
            None => self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// `None` when nothing was assigned.
    pub fn build(self, key_column: &'static str, key: impl Into<Value>) -> Option<Statement> {
        if self.is_empty() {
            return None;
        }

        let mut values = Vec::with_capacity(self.assignments.len() + 1);
        let mut fragments = Vec::with_capacity(self.assignments.len());
        for (column, value) in self.assignments {
            values.push(value);
            fragments.push(format!("{} = ${}", column, values.len()));
        }
        values.push(key.into());

        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ${}",
            self.table,
            fragments.join(", "),
            key_column,
            values.len()
        );

        Some(Statement::from_sql_and_values(DbBackend::Postgres, sql, values))
    }
}

impl From<&UpdateUser> for UpdateStatement {
    fn from(patch: &UpdateUser) -> Self {
        UpdateStatement::new("users")
            .set_opt("name", patch.name.clone())
            .set_opt("email", patch.email.clone())
            .set_opt("age", patch.age)
    }
}

#[derive(Debug, FromQueryResult)]
struct UserRow {
    id: i32,
    name: String,
    email: String,
    age: Option<i32>,
    created_at: NaiveDateTime,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            name: row.name,
            email: row.email,
            age: row.age,
            created_at: row.created_at,
        }
    }
}

fn to_user(row: &QueryResult) -> UserResult<User> {
    UserRow::from_query_result(row, "")
        .map(User::from)
        .map_err(|e| UserError::Database(DatabaseError::from(e)))
}

fn statement(sql: &str, values: impl IntoIterator<Item = Value>) -> Statement {
    Statement::from_sql_and_values(DbBackend::Postgres, sql, values)
}

/// PostgreSQL implementation of UserRepository.
///
/// Every call is a single parameterized statement run through the [`Pool`];
/// writes are autocommitted.
#[derive(Clone)]
pub struct PgUserRepository {
    pool: Pool,
}

impl PgUserRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, input: CreateUser) -> UserResult<i32> {
        let stmt = statement(
            "INSERT INTO users (name, email, age) VALUES ($1, $2, $3) RETURNING id",
            [input.name.into(), input.email.into(), input.age.into()],
        );

        let rows = self
            .pool
            .execute_returning(stmt, ExecOptions::AUTOCOMMIT)
            .await?;

        let row = rows
            .first()
            .ok_or_else(|| UserError::Internal("INSERT returned no id".to_string()))?;
        let id = row
            .try_get::<i32>("", "id")
            .map_err(|e| UserError::Database(e.into()))?;

        tracing::info!(user_id = id, "Created user");
        Ok(id)
    }

    async fn find_all(&self) -> UserResult<Vec<User>> {
        let stmt = Statement::from_string(
            DbBackend::Postgres,
            format!("{} ORDER BY id DESC", SELECT_USERS),
        );
        let rows = self.pool.fetch_all(stmt).await?;
        rows.iter().map(to_user).collect()
    }

    async fn find_by_id(&self, id: i32) -> UserResult<Option<User>> {
        let stmt = statement(&format!("{} WHERE id = $1", SELECT_USERS), [id.into()]);
        self.pool.fetch_one(stmt).await?.as_ref().map(to_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> UserResult<Option<User>> {
        let stmt = statement(&format!("{} WHERE email = $1", SELECT_USERS), [email.into()]);
        self.pool.fetch_one(stmt).await?.as_ref().map(to_user).transpose()
    }

    async fn update(&self, id: i32, patch: UpdateUser) -> UserResult<UpdateOutcome> {
        let Some(stmt) = UpdateStatement::from(&patch).build("id", id) else {
            return Ok(UpdateOutcome::NoOp);
        };

        let outcome = self.pool.execute(stmt, ExecOptions::AUTOCOMMIT).await?;
        if outcome.rows_affected == 0 {
            return Ok(UpdateOutcome::NotFound);
        }

        tracing::info!(user_id = id, rows_affected = outcome.rows_affected, "Updated user");
        Ok(UpdateOutcome::Updated {
            rows_affected: outcome.rows_affected,
        })
    }

    async fn delete(&self, id: i32) -> UserResult<DeleteOutcome> {
        let stmt = statement("DELETE FROM users WHERE id = $1", [id.into()]);

        let outcome = self.pool.execute(stmt, ExecOptions::AUTOCOMMIT).await?;
        if outcome.rows_affected == 0 {
            return Ok(DeleteOutcome::NotFound);
        }

        tracing::info!(user_id = id, "Deleted user");
        Ok(DeleteOutcome::Deleted {
            rows_affected: outcome.rows_affected,
        })
    }

    async fn count(&self) -> UserResult<i64> {
        let stmt = Statement::from_string(DbBackend::Postgres, "SELECT COUNT(*) AS total FROM users");
        match self.pool.fetch_one(stmt).await? {
            Some(row) => row
                .try_get::<i64>("", "total")
                .map_err(|e| UserError::Database(e.into())),
            None => Ok(0),
        }
    }
}
