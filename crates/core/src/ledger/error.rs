//! Ledger error types.
//!
//! Every failure a ledger, journal, or report operation can surface. All of
//! them are recoverable; none leaves a partial write behind.

use rust_decimal::Decimal;
use tally_shared::types::{CashSessionId, UserId};
use thiserror::Error;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Entry amount cannot be negative.
    #[error("Entry amount cannot be negative: {0}")]
    InvalidAmount(Decimal),

    /// Input failed a shape check (blank username, empty password, ...).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========== Lookup Errors ==========
    /// Session not found.
    #[error("Session not found: {0}")]
    SessionNotFound(CashSessionId),

    /// User not found.
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    // ========== State Errors ==========
    /// The user already has an open session.
    #[error("User {0} already has an open session")]
    SessionConflict(UserId),

    /// The session has already been closed.
    #[error("Session {0} is already closed")]
    AlreadyClosed(CashSessionId),

    /// Another user already has this username.
    #[error("Username already taken: {0}")]
    UsernameTaken(String),

    // ========== Infrastructure Errors ==========
    /// Opaque storage failure.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl LedgerError {
    /// Returns the error code for API responses.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidAmount(_) => "INVALID_AMOUNT",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::SessionConflict(_) => "SESSION_CONFLICT",
            Self::AlreadyClosed(_) => "ALREADY_CLOSED",
            Self::UsernameTaken(_) => "USERNAME_TAKEN",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidAmount(_) | Self::InvalidInput(_) => 400,
            Self::SessionNotFound(_) | Self::UserNotFound(_) => 404,
            Self::SessionConflict(_) | Self::AlreadyClosed(_) | Self::UsernameTaken(_) => 409,
            Self::Storage(_) => 500,
        }
    }
}

impl From<LedgerError> for tally_shared::AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::InvalidAmount(_) | LedgerError::InvalidInput(_) => {
                Self::Validation(message)
            }
            LedgerError::SessionNotFound(_) | LedgerError::UserNotFound(_) => {
                Self::NotFound(message)
            }
            LedgerError::SessionConflict(_)
            | LedgerError::AlreadyClosed(_)
            | LedgerError::UsernameTaken(_) => Self::Conflict(message),
            LedgerError::Storage(_) => Self::Database(message),
        }
    }
}
