//! User management routes (supervisor-only).

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, patch},
};
use tally_core::auth::{CreateUserInput, UpdateUserInput, User};
use tally_core::ledger::LedgerError;
use tally_shared::types::UserId;
use uuid::Uuid;

use crate::AppState;
use crate::error::{ApiError, ApiResult};
use crate::middleware::auth::AuthUser;

/// Creates the user router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/{user_id}", patch(update_user).delete(delete_user))
}

/// GET /users - All users ordered by username.
async fn list_users(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.directory().list_users().await?))
}

/// POST /users - Create a user.
async fn create_user(
    State(state): State<AppState>,
    Json(payload): Json<CreateUserInput>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.directory().create_user(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// PATCH /users/{id} - Change password, role, display name, or active flag.
async fn update_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
    Json(payload): Json<UpdateUserInput>,
) -> ApiResult<Json<User>> {
    let user_id = UserId::from_uuid(user_id);
    if user_id == auth.user_id() && payload.is_active == Some(false) {
        return Err(ApiError::bad_request("You cannot deactivate your own account"));
    }
    Ok(Json(state.directory().update_user(user_id, payload).await?))
}

/// DELETE /users/{id} - Delete a user with their sessions and entries.
async fn delete_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let user_id = UserId::from_uuid(user_id);
    if user_id == auth.user_id() {
        return Err(ApiError::bad_request("You cannot delete your own account"));
    }
    if state.directory().delete_user(user_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(LedgerError::UserNotFound(user_id).into())
    }
}
