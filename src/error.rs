//! Error types for the demonstrations.
//!
//! Every fallible step returns `AppError`. Errors travel up to the
//! demonstration that issued the statement, where the driver prints them
//! and moves on to the next demonstration.

/// SQLSTATE MySQL reports for `ER_LOCK_DEADLOCK` (error 1213).
const DEADLOCK_SQLSTATE: &str = "40001";

/// Application-wide error type.
///
/// # Error Categories
///
/// - **Database Errors**: connection failures, query failures, commit conflicts
/// - **Schema Errors**: the embedded migration could not be applied
/// - **Configuration Errors**: missing or malformed environment variables
/// - **Data Errors**: the `accounts` table does not hold what a demonstration expects
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Database operation failed (e.g., connection error, query error).
    ///
    /// This wraps any sqlx::Error using the `#[from]` attribute, which
    /// automatically implements `From<sqlx::Error> for AppError`.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Applying the embedded `accounts` migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Environment variables are missing or cannot be parsed.
    #[error("Configuration error: {0}")]
    Config(#[from] envy::Error),

    /// No row in `accounts` carries the requested name.
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Adding to a balance left the range of its column type.
    #[error("Balance overflow for {0}")]
    BalanceOverflow(String),
}

impl AppError {
    /// Whether the server aborted the statement to break a deadlock.
    pub fn is_deadlock(&self) -> bool {
        match self {
            AppError::Database(sqlx::Error::Database(db_error)) => {
                db_error.code().as_deref() == Some(DEADLOCK_SQLSTATE)
            }
            _ => false,
        }
    }
}
