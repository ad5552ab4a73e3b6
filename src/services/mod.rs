pub mod access;
pub mod children;
pub mod indsatstrappe;
pub mod invitations;
pub mod notifications;
pub mod tools;
pub mod users;

pub use access::AccessService;
pub use children::ChildService;
pub use indsatstrappe::IndsatstrappeService;
pub use invitations::InvitationService;
pub use notifications::NotificationService;
pub use tools::ToolService;
pub use users::UserService;

use std::collections::HashMap;
use thiserror::Error;

use crate::database::DatabaseError;

/// Errors raised by the domain services
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(HashMap<String, String>),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        ServiceError::Database(DatabaseError::from(err))
    }
}

impl ServiceError {
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut errors = HashMap::new();
        errors.insert(field.to_string(), message.into());
        ServiceError::Validation(errors)
    }
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Trimmed, non-empty text no longer than `max` characters
pub fn required_text(field: &str, value: &str, max: usize) -> ServiceResult<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::field(field, "This field is required"));
    }
    if trimmed.chars().count() > max {
        return Err(ServiceError::field(field, format!("Must be at most {} characters", max)));
    }
    Ok(trimmed.to_string())
}

/// Optional text; blank values collapse to `None`
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> ServiceResult<Option<String>> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) if v.chars().count() > max => Err(ServiceError::field(
            field,
            format!("Must be at most {} characters", max),
        )),
        Some(v) => Ok(Some(v.to_string())),
        None => Ok(None),
    }
}

/// Lower-cased email address after a basic shape check
pub fn normalize_email(value: &str) -> ServiceResult<String> {
    let email = value.trim().to_lowercase();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if valid && email.len() <= 254 {
        Ok(email)
    } else {
        Err(ServiceError::field("email", "Invalid email address"))
    }
}
