//! Cash session and journal routes.
//!
//! Operators act on their own sessions only; supervisors may act on any.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tally_core::ledger::{
    CashSession, CloseSessionInput, Expense, FlexiEntry, OpenSessionInput, SessionDetail,
    SessionFilter,
};
use tally_shared::types::{CashSessionId, DateWindow, UserId};
use uuid::Uuid;

use super::WindowQuery;
use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::auth::AuthUser;

/// Creates the session router.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", get(list_sessions).post(open_session))
        .route("/sessions/active", get(active_session))
        .route("/sessions/{session_id}", get(get_session))
        .route("/sessions/{session_id}/close", post(close_session))
        .route(
            "/sessions/{session_id}/expenses",
            get(list_expenses).post(record_expense),
        )
        .route(
            "/sessions/{session_id}/flexi",
            get(list_flexi).post(record_flexi),
        )
}

/// Body of `POST /sessions`.
#[derive(Debug, Deserialize)]
pub struct OpenSessionRequest {
    /// Cash counted at open.
    pub opening_cash: Decimal,
    /// Flexi balance at open.
    pub opening_flexi_balance: Decimal,
    /// Optional notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body of `POST /sessions/{id}/close`.
#[derive(Debug, Deserialize)]
pub struct CloseSessionRequest {
    /// Cash counted at close.
    pub closing_cash: Decimal,
    /// Flexi balance at close.
    pub closing_flexi_balance: Decimal,
    /// Replaces the stored notes when non-blank.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Body of `POST /sessions/{id}/expenses`.
#[derive(Debug, Deserialize)]
pub struct ExpenseRequest {
    /// Non-negative amount.
    pub amount: Decimal,
    /// What was bought.
    #[serde(default)]
    pub description: String,
}

/// Body of `POST /sessions/{id}/flexi`.
#[derive(Debug, Deserialize)]
pub struct FlexiRequest {
    /// Non-negative amount.
    pub amount: Decimal,
    /// Whether the credit has been paid back.
    #[serde(default)]
    pub is_settled: bool,
    /// Optional notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Query of `GET /sessions`.
#[derive(Debug, Default, Deserialize)]
pub struct ListSessionsQuery {
    /// Lower `opened_at` bound.
    pub from: Option<chrono::DateTime<chrono::Utc>>,
    /// Upper `opened_at` bound.
    pub to: Option<chrono::DateTime<chrono::Utc>>,
    /// Owner filter; only honoured for supervisors.
    pub user_id: Option<Uuid>,
}

/// GET /sessions/active - The caller's open session, or `null`.
async fn active_session(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<Json<Option<CashSession>>> {
    let session = state.ledger().active_session_for(auth.user_id()).await?;
    Ok(Json(session))
}

/// POST /sessions - Open a session for the caller.
async fn open_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<OpenSessionRequest>,
) -> ApiResult<(StatusCode, Json<CashSession>)> {
    let session = state
        .ledger()
        .open(OpenSessionInput {
            user_id: auth.user_id(),
            opening_cash: payload.opening_cash,
            opening_flexi_balance: payload.opening_flexi_balance,
            notes: payload.notes,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /sessions - Sessions in a window, newest first.
///
/// Operators always see only their own sessions.
async fn list_sessions(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ListSessionsQuery>,
) -> ApiResult<Json<Vec<CashSession>>> {
    let window: DateWindow = WindowQuery {
        from: query.from,
        to: query.to,
    }
    .into();
    let owner = if auth.is_supervisor() {
        query.user_id.map(UserId::from_uuid)
    } else {
        Some(auth.user_id())
    };

    let sessions = state
        .ledger()
        .sessions(SessionFilter {
            user_id: owner,
            window,
        })
        .await?;
    Ok(Json(sessions))
}

/// GET /sessions/{id} - A session with entries and balance.
async fn get_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionDetail>> {
    let session_id = CashSessionId::from_uuid(session_id);
    let detail = state.ledger().session_detail(session_id).await?;
    auth.ensure_can_access(detail.session.user_id)?;
    Ok(Json(detail))
}

/// POST /sessions/{id}/close - Record closing figures.
async fn close_session(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<CloseSessionRequest>,
) -> ApiResult<Json<CashSession>> {
    let session_id = authorize(&state, &auth, session_id).await?;
    let session = state
        .ledger()
        .close(
            session_id,
            CloseSessionInput {
                closing_cash: payload.closing_cash,
                closing_flexi_balance: payload.closing_flexi_balance,
                notes: payload.notes,
            },
        )
        .await?;
    Ok(Json(session))
}

/// POST /sessions/{id}/expenses - Record an expense.
async fn record_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<ExpenseRequest>,
) -> ApiResult<(StatusCode, Json<Expense>)> {
    let session_id = authorize(&state, &auth, session_id).await?;
    let expense = state
        .journal()
        .record_expense(session_id, payload.amount, payload.description)
        .await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// GET /sessions/{id}/expenses - Expenses in creation order.
async fn list_expenses(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<Vec<Expense>>> {
    let session_id = authorize(&state, &auth, session_id).await?;
    Ok(Json(state.journal().expenses_for(session_id).await?))
}

/// POST /sessions/{id}/flexi - Record a flexi addition.
async fn record_flexi(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
    Json(payload): Json<FlexiRequest>,
) -> ApiResult<(StatusCode, Json<FlexiEntry>)> {
    let session_id = authorize(&state, &auth, session_id).await?;
    let entry = state
        .journal()
        .record_flexi(session_id, payload.amount, payload.is_settled, payload.notes)
        .await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET /sessions/{id}/flexi - Flexi entries in creation order.
async fn list_flexi(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<Vec<FlexiEntry>>> {
    let session_id = authorize(&state, &auth, session_id).await?;
    Ok(Json(state.journal().flexi_entries_for(session_id).await?))
}

/// Loads the session and checks the caller may act on it.
async fn authorize(
    state: &AppState,
    auth: &AuthUser,
    session_id: Uuid,
) -> ApiResult<CashSessionId> {
    let session_id = CashSessionId::from_uuid(session_id);
    let session = state.ledger().session(session_id).await?;
    auth.ensure_can_access(session.user_id)?;
    Ok(session_id)
}
