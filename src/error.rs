use crate::database::DatabaseError;
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error;

/// Closed set of failure classes exposed to the boundary layer.
///
/// Every [`AppError`] maps to exactly one kind; the transport layer decides
/// how each kind is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Malformed input or a reference to something that does not exist
    Validation,
    /// Idempotency key already used
    DuplicateReward,
    /// Unknown stock symbol
    StockNotFound,
    /// Transaction, connection or deadline failure; safe to retry with the same key
    Storage,
}

/// Application-level error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Database-related errors
    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database errors
    #[error("SQL error: {0}")]
    Sqlx(#[from] SqlxError),

    /// Storage backend unavailable
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    /// Deadline exceeded before the operation completed
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Reward id already recorded
    #[error("Duplicate reward: {0}")]
    DuplicateReward(String),

    /// Stock symbol has no price
    #[error("Stock not found: {0}")]
    StockNotFound(String),

    /// Generic error with message
    #[error("{0}")]
    Message(String),
}

/// Result type alias for application errors
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Classify the error into the closed [`ErrorKind`] set
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::Validation(_) | AppError::NotFound(_) => ErrorKind::Validation,
            AppError::DuplicateReward(_) => ErrorKind::DuplicateReward,
            AppError::StockNotFound(_) => ErrorKind::StockNotFound,
            AppError::Database(_)
            | AppError::Sqlx(_)
            | AppError::Unavailable(_)
            | AppError::Timeout(_)
            | AppError::Config(_)
            | AppError::Message(_) => ErrorKind::Storage,
        }
    }

    /// Check if error is a database connection error
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            AppError::Database(DatabaseError::PoolCreation(_))
                | AppError::Database(DatabaseError::ConnectionTimeout)
                | AppError::Sqlx(SqlxError::PoolTimedOut)
                | AppError::Sqlx(SqlxError::PoolClosed)
                | AppError::Unavailable(_)
        )
    }

    /// Check if error is a duplicate reward submission
    pub fn is_duplicate(&self) -> bool {
        self.kind() == ErrorKind::DuplicateReward
    }

    /// Whether the caller may retry the same request (with the same reward id)
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Storage && !matches!(self, AppError::Config(_))
    }

    /// Get HTTP status code for the error
    pub fn status_code(&self) -> u16 {
        match self {
            AppError::NotFound(_) | AppError::StockNotFound(_) => 404,
            AppError::Validation(_) => 400,
            AppError::DuplicateReward(_) => 409,
            AppError::Timeout(_) => 504,
            AppError::Unavailable(_) => 503,
            AppError::Config(_) => 500,
            AppError::Database(_) | AppError::Sqlx(_) => 500,
            AppError::Message(_) => 500,
        }
    }
}

/// Repository-specific error types
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// Database query error
    #[error("Query error: {0}")]
    Query(SqlxError),

    /// Record not found
    #[error("Record not found: {0}")]
    NotFound(String),

    /// Duplicate record
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Constraint violation
    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Backend cannot be reached
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

impl From<RepositoryError> for AppError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(msg) => AppError::NotFound(msg),
            RepositoryError::Query(e) => AppError::Sqlx(e),
            RepositoryError::Duplicate(msg) => AppError::DuplicateReward(msg),
            RepositoryError::ConstraintViolation(msg) => AppError::Validation(msg),
            RepositoryError::InvalidInput(msg) => AppError::Validation(msg),
            RepositoryError::Unavailable(msg) => AppError::Unavailable(msg),
        }
    }
}

impl From<SqlxError> for RepositoryError {
    fn from(err: SqlxError) -> Self {
        match &err {
            SqlxError::RowNotFound => RepositoryError::NotFound("Record not found".to_string()),
            SqlxError::PoolTimedOut | SqlxError::PoolClosed => {
                RepositoryError::Unavailable(err.to_string())
            }
            SqlxError::Database(db_err) => {
                // Check for common PostgreSQL error codes
                let code = db_err.code().map(|c| c.to_string());
                if code.as_deref() == Some("23505") {
                    // Unique violation
                    RepositoryError::Duplicate(db_err.message().to_string())
                } else if code.as_deref() == Some("23503") {
                    // Foreign key violation
                    RepositoryError::ConstraintViolation(db_err.message().to_string())
                } else if code.as_deref() == Some("23514") {
                    // Check constraint violation
                    RepositoryError::ConstraintViolation(db_err.message().to_string())
                } else {
                    RepositoryError::Query(err)
                }
            }
            _ => RepositoryError::Query(err),
        }
    }
}
