//! Structured error types for engine and API responses.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,

    // Not found errors
    TaskNotFound,

    // Identity errors
    Unauthorized,
    AlreadyExists,

    // Store errors
    StoreUnavailable,
    DatabaseError,
    InternalError,
}

impl ErrorCode {
    /// Whether the code belongs to the validation family.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ErrorCode::MissingRequiredField | ErrorCode::InvalidFieldValue
        )
    }
}

/// Structured error returned to the immediate caller of any engine operation.
#[derive(Debug, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn task_not_found(task_id: i64) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn unauthorized(reason: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unauthorized, reason)
    }

    pub fn already_exists(what: &str) -> Self {
        Self::new(ErrorCode::AlreadyExists, format!("{} already exists", what))
    }

    pub fn store_unavailable(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::StoreUnavailable, "Task store is unavailable")
            .with_details(err.to_string())
    }

    pub fn database(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::DatabaseError, err.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

/// SQLite failures that mean the store cannot be reached right now,
/// as opposed to a bad statement or constraint violation.
fn is_unavailable(err: &rusqlite::Error) -> bool {
    use rusqlite::ErrorCode as Sqlite;
    match err {
        rusqlite::Error::SqliteFailure(e, _) => matches!(
            e.code,
            Sqlite::CannotOpen
                | Sqlite::DatabaseBusy
                | Sqlite::DatabaseLocked
                | Sqlite::NotADatabase
                | Sqlite::SystemIoFailure
        ),
        _ => false,
    }
}

// Allow using ? with anyhow errors from the store layer
impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        let err = match err.downcast::<ApiError>() {
            Ok(api_err) => return api_err,
            Err(err) => err,
        };
        match err.downcast_ref::<rusqlite::Error>() {
            Some(sqlite) if is_unavailable(sqlite) => ApiError::store_unavailable(sqlite),
            Some(sqlite) => ApiError::database(sqlite),
            None => ApiError::internal(err),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        if is_unavailable(&err) {
            ApiError::store_unavailable(err)
        } else {
            ApiError::database(err)
        }
    }
}

/// Result type for engine and API operations.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
