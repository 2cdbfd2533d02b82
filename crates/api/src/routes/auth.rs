//! Login route.

use axum::{Json, Router, extract::State, routing::post};
use tally_core::auth::Authenticator;
use tally_shared::auth::{LoginRequest, LoginResponse, UserInfo};
use tracing::info;

use crate::AppState;
use crate::error::{ApiError, ApiResult};

/// Creates the auth router.
pub fn routes() -> Router<AppState> {
    Router::new().route("/auth/login", post(login))
}

/// POST /auth/login - Check credentials and issue an access token.
async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    let Some(user) = state
        .directory()
        .authenticate(&payload.username, &payload.password)
        .await?
    else {
        info!(username = %payload.username.trim(), "Failed login attempt");
        return Err(ApiError::unauthorized(
            "INVALID_CREDENTIALS",
            "Invalid username or password",
        ));
    };

    let access_token = state
        .jwt_service
        .generate_access_token(user.id.into_inner(), user.role.as_str())
        .map_err(|e| ApiError::from(tally_shared::AppError::Internal(e.to_string())))?;

    info!(user_id = %user.id, role = %user.role, "User logged in");

    Ok(Json(LoginResponse {
        user: UserInfo {
            id: user.id.into_inner(),
            username: user.username.clone(),
            display_name: user.effective_display_name().to_string(),
            role: user.role.as_str().to_string(),
        },
        access_token,
        expires_in: state.jwt_service.access_token_expires_in(),
    }))
}
