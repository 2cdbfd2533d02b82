//! Authentication middleware for protected routes.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tally_core::auth::UserRole;
use tally_core::ledger::LedgerError;
use tally_shared::auth::Claims;
use tally_shared::jwt::JwtError;
use tally_shared::types::UserId;
use tracing::debug;

use crate::AppState;
use crate::error::ApiError;

/// Extracts the bearer token from the Authorization header.
fn extract_bearer_token(header: &str) -> Option<&str> {
    header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
}

/// Authentication middleware that validates JWT tokens.
///
/// This middleware:
/// 1. Extracts the Bearer token from the Authorization header
/// 2. Validates the token using the JWT service
/// 3. Reloads the user so deactivation and role changes apply before the
///    token expires; the stored role replaces the one in the token
/// 4. Stores the claims in request extensions for handlers to access
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(token) = auth_header.and_then(extract_bearer_token) else {
        return ApiError::unauthorized(
            "MISSING_TOKEN",
            "Authorization header with Bearer token is required",
        )
        .into_response();
    };

    let mut claims = match state.jwt_service.validate_token(token) {
        Ok(claims) => claims,
        Err(JwtError::Expired) => {
            return ApiError::unauthorized("TOKEN_EXPIRED", "Token has expired").into_response();
        }
        Err(e) => {
            debug!(error = %e, "Rejected bearer token");
            return ApiError::unauthorized("INVALID_TOKEN", "Invalid or malformed token")
                .into_response();
        }
    };

    let user_id = UserId::from_uuid(claims.user_id());
    match state.directory().user(user_id).await {
        Ok(user) if user.is_active => {
            claims.role = user.role.as_str().to_string();
        }
        Ok(_) | Err(LedgerError::UserNotFound(_)) => {
            debug!(%user_id, "Token for inactive or deleted user");
            return ApiError::unauthorized(
                "ACCOUNT_DISABLED",
                "Account is inactive or no longer exists",
            )
            .into_response();
        }
        Err(e) => return ApiError::from(e).into_response(),
    }

    request.extensions_mut().insert(claims);
    next.run(request).await
}

fn require_role(request: Request, allowed: fn(&UserRole) -> bool) -> Result<Request, Response> {
    let role = request
        .extensions()
        .get::<Claims>()
        .and_then(|claims| claims.role.parse::<UserRole>().ok());

    match role {
        Some(role) if allowed(&role) => Ok(request),
        _ => Err(ApiError::forbidden("Supervisor role required").into_response()),
    }
}

/// Gates the cross-user report routes. Must run inside `auth_middleware`.
pub async fn report_access_middleware(request: Request, next: Next) -> Response {
    match require_role(request, UserRole::can_view_all_reports) {
        Ok(request) => next.run(request).await,
        Err(response) => response,
    }
}

/// Gates user management. Must run inside `auth_middleware`.
pub async fn user_admin_middleware(request: Request, next: Next) -> Response {
    match require_role(request, UserRole::can_manage_users) {
        Ok(request) => next.run(request).await,
        Err(response) => response,
    }
}

/// Extractor for authenticated user claims.
///
/// ```ignore
/// async fn handler(auth: AuthUser) -> impl IntoResponse {
///     let user_id = auth.user_id();
///     // ...
/// }
/// ```
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    /// Returns the user ID from the claims.
    #[must_use]
    pub const fn user_id(&self) -> UserId {
        UserId::from_uuid(self.0.user_id())
    }

    /// Returns the user's role. Unknown role strings are treated as operators.
    #[must_use]
    pub fn role(&self) -> UserRole {
        self.0.role.parse().unwrap_or(UserRole::Operator)
    }

    /// Returns true if the caller may see every user's sessions.
    #[must_use]
    pub fn is_supervisor(&self) -> bool {
        self.role().can_view_all_reports()
    }

    /// Fails with 403 unless the caller is `owner` or a supervisor.
    pub fn ensure_can_access(&self, owner: UserId) -> Result<(), ApiError> {
        if self.is_supervisor() || self.user_id() == owner {
            Ok(())
        } else {
            Err(ApiError::forbidden("Session belongs to another user"))
        }
    }

    /// Returns the inner claims.
    #[must_use]
    pub const fn claims(&self) -> &Claims {
        &self.0
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthUser)
            .ok_or_else(|| ApiError::unauthorized("UNAUTHORIZED", "Authentication required"))
    }
}
