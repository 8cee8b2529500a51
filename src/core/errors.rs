use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Serialize)]
pub struct FieldError {
    pub field: String,
    pub title: String,
    pub description: String,
}

impl FieldError {
    pub fn new(field: &str, title: impl Into<String>, description: impl Into<String>) -> Self {
        FieldError {
            field: field.to_string(),
            title: title.into(),
            description: description.into(),
        }
    }
}

#[derive(Error, Debug, Serialize)]
pub enum ForumError {
    #[error("Username is required")]
    MissingUsername,
    #[error("Username {0} already registered")]
    UsernameTaken(String),
    #[error("Thread {0} not found")]
    ThreadNotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("Unauthorized: {0}")]
    Unauthorized(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Invalid parameter `{0}`: {1:?}")]
    InvalidParameter(String, FieldError),
    #[error("Invalid input for field `{0}`: {1:?}")]
    InvalidInput(String, FieldError),
    #[error("Content did not pass review: {0}")]
    CensorNotPassed(String),
    #[error("Internal server error: {0}")]
    InternalServerError(String),
    #[error("Logging error: {0}")]
    LoggingError(String),
    #[error("Cache error: {0}")]
    CacheError(String),
}

impl ForumError {
    pub fn invalid_parameter(name: &str, description: impl Into<String>) -> Self {
        ForumError::InvalidParameter(
            name.to_string(),
            FieldError::new(name, format!("Invalid {}", name), description),
        )
    }

    pub fn invalid_input(field: &str, description: impl Into<String>) -> Self {
        ForumError::InvalidInput(
            field.to_string(),
            FieldError::new(field, format!("Invalid {}", field), description),
        )
    }
}
