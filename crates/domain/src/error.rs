//! Domain error types.

use thiserror::Error;

use crate::services::timer::TimerError;

/// Failure reported by a backend port.
///
/// A write that returns an error may or may not have been applied; callers
/// report it and never retry automatically.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Already exists: {0}")]
    Duplicate(String),

    #[error("Referenced record not found: {0}")]
    MissingReference(String),

    #[error("Invalid credentials")]
    InvalidCredentials,
}

/// Errors surfaced by domain services.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Backend error: {0}")]
    Backend(String),

    #[error(transparent)]
    Timer(#[from] TimerError),
}

impl From<BackendError> for DomainError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::Duplicate(what) => DomainError::Conflict(format!("{} already exists", what)),
            BackendError::MissingReference(what) => DomainError::NotFound(what),
            BackendError::InvalidCredentials => DomainError::InvalidCredentials,
            BackendError::Unavailable(msg) => DomainError::Backend(msg),
        }
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut messages: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| match &e.message {
                    Some(message) => format!("{}: {}", field, message),
                    None => format!("{}: {}", field, e.code),
                })
            })
            .collect();
        messages.sort();
        DomainError::Validation(messages.join(", "))
    }
}
