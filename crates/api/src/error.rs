//! JSON error responses.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tally_core::ledger::LedgerError;
use tally_shared::AppError;
use tracing::error;

/// Result type for handlers.
pub type ApiResult<T> = Result<T, ApiError>;

/// An error rendered as `{"error": code, "message": text}`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct ErrorBody<'a> {
    error: &'a str,
    message: &'a str,
}

impl ApiError {
    /// Builds an error from its parts.
    #[must_use]
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    /// 401 with a fixed code.
    #[must_use]
    pub fn unauthorized(code: &'static str, message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, code, message)
    }

    /// 403 for role or ownership failures.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        AppError::Forbidden(message.into()).into()
    }

    /// 400 for malformed request input.
    #[must_use]
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "VALIDATION_ERROR", message)
    }

    /// The HTTP status.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        self.status
    }

    /// The machine-readable code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        self.code
    }
}

impl From<AppError> for ApiError {
    fn from(err: AppError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        Self::new(status, err.error_code(), err.to_string())
    }
}

impl From<LedgerError> for ApiError {
    fn from(err: LedgerError) -> Self {
        let code = err.error_code();
        let app: AppError = err.into();
        Self {
            code,
            ..Self::from(app)
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = if self.status.is_server_error() {
            error!(code = self.code, error = %self.message, "Request failed");
            "An internal error occurred"
        } else {
            self.message.as_str()
        };

        (
            self.status,
            Json(ErrorBody {
                error: self.code,
                message,
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use rust_decimal_macros::dec;
    use tally_shared::types::{CashSessionId, UserId};

    #[rstest]
    #[case(LedgerError::InvalidAmount(dec!(-1)), StatusCode::BAD_REQUEST, "INVALID_AMOUNT")]
    #[case(
        LedgerError::SessionNotFound(CashSessionId::new()),
        StatusCode::NOT_FOUND,
        "SESSION_NOT_FOUND"
    )]
    #[case(LedgerError::SessionConflict(UserId::new()), StatusCode::CONFLICT, "SESSION_CONFLICT")]
    #[case(
        LedgerError::AlreadyClosed(CashSessionId::new()),
        StatusCode::CONFLICT,
        "ALREADY_CLOSED"
    )]
    #[case(LedgerError::Storage("boom".into()), StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR")]
    fn test_ledger_error_mapping(
        #[case] err: LedgerError,
        #[case] status: StatusCode,
        #[case] code: &str,
    ) {
        let api = ApiError::from(err);
        assert_eq!(api.status(), status);
        assert_eq!(api.code(), code);
    }

    #[test]
    fn test_into_response_keeps_status() {
        let res = ApiError::forbidden("supervisors only").into_response();
        assert_eq!(res.status(), StatusCode::FORBIDDEN);
    }
}
