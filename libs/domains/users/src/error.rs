use axum::response::{IntoResponse, Response};
use axum_helpers::AppError;
use database::DatabaseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("Email already registered: {0}")]
    DuplicateEmail(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("No fields to update")]
    NoFieldsToUpdate,

    /// The pool could not hand out a connection in time, or is shut down.
    #[error("Database unavailable: {0}")]
    Unavailable(#[source] DatabaseError),

    #[error("Database error: {0}")]
    Database(#[source] DatabaseError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type UserResult<T> = Result<T, UserError>;

impl From<DatabaseError> for UserError {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::UniqueViolation(detail) => UserError::DuplicateEmail(detail),
            err if err.is_unavailable() => UserError::Unavailable(err),
            err => UserError::Database(err),
        }
    }
}

/// Convert UserError to AppError for the shared error envelope
impl From<UserError> for AppError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => AppError::NotFound("User not found".to_string()),
            UserError::DuplicateEmail(_) => AppError::Conflict("Email already registered".to_string()),
            UserError::Validation(msg) => AppError::BadRequest(msg),
            UserError::NoFieldsToUpdate => AppError::BadRequest("No fields to update".to_string()),
            UserError::Unavailable(e) => AppError::ServiceUnavailable(e.to_string()),
            UserError::Database(e) => AppError::Internal(e.to_string()),
            UserError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

impl IntoResponse for UserError {
    fn into_response(self) -> Response {
        AppError::from(self).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn test_database_errors_are_classified() {
        assert!(matches!(
            UserError::from(DatabaseError::UniqueViolation("users_email_key".into())),
            UserError::DuplicateEmail(_)
        ));
        assert!(matches!(
            UserError::from(DatabaseError::AcquireTimeout),
            UserError::Unavailable(_)
        ));
        assert!(matches!(
            UserError::from(DatabaseError::PoolClosed),
            UserError::Unavailable(_)
        ));
        assert!(matches!(
            UserError::from(DatabaseError::MigrationError("x".into())),
            UserError::Database(_)
        ));
    }

    #[test]
    fn test_status_mapping() {
        let cases = [
            (UserError::NotFound, StatusCode::NOT_FOUND),
            (UserError::DuplicateEmail("a@b.co".into()), StatusCode::CONFLICT),
            (UserError::Validation("Invalid email".into()), StatusCode::BAD_REQUEST),
            (UserError::NoFieldsToUpdate, StatusCode::BAD_REQUEST),
            (UserError::Unavailable(DatabaseError::AcquireTimeout), StatusCode::SERVICE_UNAVAILABLE),
            (UserError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(err.into_response().status(), status);
        }
    }
}
