use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};
use std::borrow::Cow;
use std::sync::LazyLock;
use utoipa::ToSchema;
use validator::{Validate, ValidationError, ValidationErrors};

/// Longest name or email the `users` table accepts.
pub const MAX_FIELD_LEN: usize = 100;

pub const MIN_AGE: i32 = 0;
pub const MAX_AGE: i32 = 150;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap());

/// `created_at` is exchanged as `DD/MM/YYYY HH:MM:SS`.
pub mod display_timestamp {
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%d/%m/%Y %H:%M:%S";

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&ts.format(FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, FORMAT).map_err(serde::de::Error::custom)
    }
}

/// A stored user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Generated by the database, never reused
    pub id: i32,
    pub name: String,
    /// Unique across all users
    pub email: String,
    pub age: Option<i32>,
    #[serde(with = "display_timestamp")]
    #[schema(value_type = String, example = "18/10/2026 14:03:27")]
    pub created_at: NaiveDateTime,
}

/// Body of `POST /api/users`.
///
/// `name` and `email` default to empty so a missing field is reported as a
/// validation failure rather than a JSON error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreateUser {
    #[serde(default)]
    #[schema(example = "João Silva")]
    pub name: String,
    #[serde(default)]
    #[schema(example = "joao@example.com")]
    pub email: String,
    #[serde(default)]
    #[schema(example = 30, minimum = 0, maximum = 150)]
    pub age: Option<i32>,
}

impl CreateUser {
    /// Copy with surrounding whitespace removed from `name` and `email`.
    pub fn normalized(self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            age: self.age,
        }
    }
}

/// Body of `PUT /api/users/{id}`. Absent fields are left untouched.
///
/// `age` distinguishes absent (`None`) from an explicit `null`
/// (`Some(None)`), which clears the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpdateUser {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    #[schema(value_type = Option<i32>, nullable, minimum = 0, maximum = 150)]
    pub age: Option<Option<i32>>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.age.is_none()
    }

    pub fn normalized(self) -> Self {
        Self {
            name: self.name.map(|name| name.trim().to_string()),
            email: self.email.map(|email| email.trim().to_string()),
            age: self.age,
        }
    }
}

fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn field_error(code: &'static str, message: &'static str) -> ValidationError {
    ValidationError::new(code).with_message(Cow::Borrowed(message))
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(field_error("required", "Name cannot be empty"));
    }
    if name.trim().chars().count() > MAX_FIELD_LEN {
        return Err(field_error("length", "Name must be at most 100 characters"));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), ValidationError> {
    let email = email.trim();
    if !EMAIL_PATTERN.is_match(email) {
        return Err(field_error("email", "Invalid email"));
    }
    if email.chars().count() > MAX_FIELD_LEN {
        return Err(field_error("length", "Email must be at most 100 characters"));
    }
    Ok(())
}

fn validate_age(age: i32) -> Result<(), ValidationError> {
    if !(MIN_AGE..=MAX_AGE).contains(&age) {
        return Err(field_error("range", "Invalid age"));
    }
    Ok(())
}

impl Validate for CreateUser {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        // Missing required fields are reported on their own.
        let required = field_error("required", "Name and email are required");
        if self.name.trim().is_empty() {
            errors.add("name", required.clone());
        }
        if self.email.trim().is_empty() {
            errors.add("email", required);
        }
        if !errors.is_empty() {
            return Err(errors);
        }

        if let Err(e) = validate_name(&self.name) {
            errors.add("name", e);
        }
        if let Err(e) = validate_email(&self.email) {
            errors.add("email", e);
        }
        if let Some(Err(e)) = self.age.map(validate_age) {
            errors.add("age", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

impl Validate for UpdateUser {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Some(Err(e)) = self.name.as_deref().map(validate_name) {
            errors.add("name", e);
        }
        if let Some(Err(e)) = self.email.as_deref().map(validate_email) {
            errors.add("email", e);
        }
        if let Some(Some(Err(e))) = self.age.map(|age| age.map(validate_age)) {
            errors.add("age", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// What the repository reports for an update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    Updated { rows_affected: u64 },
    /// The patch named no fields; storage was not touched.
    NoOp,
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted { rows_affected: u64 },
    NotFound,
}

/// `data` of a successful create: the stored fields and the new id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreatedUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub age: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserListResponse {
    pub success: bool,
    pub count: usize,
    pub data: Vec<User>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub success: bool,
    pub data: User,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CreateUserResponse {
    pub success: bool,
    #[schema(example = "User created successfully")]
    pub message: String,
    pub data: CreatedUser,
}

/// Envelope for update and delete.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MutationResponse {
    pub success: bool,
    pub message: String,
    #[serde(rename = "rowsAffected")]
    pub rows_affected: u64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CountResponse {
    pub success: bool,
    pub total: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_helpers::errors::validation_summary;
    use chrono::NaiveDate;

    fn create(name: &str, email: &str, age: Option<i32>) -> CreateUser {
        CreateUser {
            name: name.to_string(),
            email: email.to_string(),
            age,
        }
    }

    #[test]
    fn test_missing_name_or_email_is_required_error() {
        let errors = create("", "joao@example.com", None).validate().unwrap_err();
        assert_eq!(validation_summary(&errors), "Name and email are required");

        let errors = create("João", "  ", Some(500)).validate().unwrap_err();
        assert_eq!(validation_summary(&errors), "Name and email are required");
        assert!(!errors.field_errors().contains_key("age"));
    }

    #[test]
    fn test_email_pattern() {
        assert!(create("João", "joao@example.com", None).validate().is_ok());
        for bad in ["joao", "joao@example", "jo ao@example.com", "@example.com", "joao@.com"] {
            let errors = create("João", bad, None).validate().unwrap_err();
            assert_eq!(validation_summary(&errors), "Invalid email", "{bad}");
        }
    }

    #[test]
    fn test_age_bounds() {
        assert!(create("A", "a@b.co", Some(0)).validate().is_ok());
        assert!(create("A", "a@b.co", Some(150)).validate().is_ok());
        assert!(create("A", "a@b.co", Some(-1)).validate().is_err());
        assert!(create("A", "a@b.co", Some(151)).validate().is_err());
    }

    #[test]
    fn test_name_length_limit() {
        let long = "x".repeat(MAX_FIELD_LEN + 1);
        assert!(create(&long, "a@b.co", None).validate().is_err());
        assert!(create(&long[1..], "a@b.co", None).validate().is_ok());
    }

    #[test]
    fn test_update_age_tri_state() {
        let absent: UpdateUser = serde_json::from_str(r#"{"name": "Ana"}"#).unwrap();
        assert_eq!(absent.age, None);

        let cleared: UpdateUser = serde_json::from_str(r#"{"age": null}"#).unwrap();
        assert_eq!(cleared.age, Some(None));
        assert!(!cleared.is_empty());

        let set: UpdateUser = serde_json::from_str(r#"{"age": 41}"#).unwrap();
        assert_eq!(set.age, Some(Some(41)));
    }

    #[test]
    fn test_update_validates_present_fields_only() {
        assert!(UpdateUser::default().validate().is_ok());
        assert!(UpdateUser::default().is_empty());

        let patch = UpdateUser {
            email: Some("not-an-email".to_string()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());

        let patch = UpdateUser {
            age: Some(Some(151)),
            ..Default::default()
        };
        assert!(patch.validate().is_err());

        let patch = UpdateUser {
            name: Some(" ".to_string()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
    }

    #[test]
    fn test_created_at_display_format() {
        let user = User {
            id: 7,
            name: "Ana Costa".to_string(),
            email: "ana@example.com".to_string(),
            age: None,
            created_at: NaiveDate::from_ymd_opt(2025, 3, 9)
                .unwrap()
                .and_hms_opt(8, 5, 1)
                .unwrap(),
        };

        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["created_at"], "09/03/2025 08:05:01");
        assert!(json["age"].is_null());

        let back: User = serde_json::from_value(json).unwrap();
        assert_eq!(back, user);
    }

    #[test]
    fn test_mutation_response_uses_camel_case_count() {
        let json = serde_json::to_value(MutationResponse {
            success: true,
            message: "User deleted successfully".to_string(),
            rows_affected: 1,
        })
        .unwrap();
        assert_eq!(json["rowsAffected"], 1);
    }
}
