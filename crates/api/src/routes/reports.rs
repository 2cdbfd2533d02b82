//! Report routes.
//!
//! `/reports/me/*` is open to every authenticated user and always scoped to
//! the caller. Everything else is supervisor-only.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::{IntoResponse, Response},
    routing::get,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tally_core::ledger::{Expense, FlexiEntry, FlexiFilter, SessionFilter};
use tally_core::reports::{DailyTrend, DashboardSummary, SessionReport, UserActivity};
use tally_shared::types::{DateWindow, UserId};
use uuid::Uuid;

use super::WindowQuery;
use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::auth::AuthUser;

const DEFAULT_RECENT_LIMIT: u64 = 20;
const MAX_RECENT_LIMIT: u64 = 500;

/// Routes for every authenticated user.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/reports/me/summary", get(my_summary))
        .route("/reports/me/trend", get(my_trend))
}

/// Routes that must sit behind the supervisor check.
pub fn supervisor_routes() -> Router<AppState> {
    Router::new()
        .route("/reports/summary", get(admin_summary))
        .route("/reports/sessions", get(session_reports))
        .route("/reports/flexi", get(flexi_entries))
        .route("/reports/flexi-consumption", get(flexi_consumption))
        .route("/reports/user-activity", get(user_activity))
        .route("/reports/trend", get(daily_trend))
        .route("/reports/expenses", get(recent_expenses))
}

/// Window plus an optional owner.
#[derive(Debug, Default, Deserialize)]
pub struct UserWindowQuery {
    /// Lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Upper bound.
    pub to: Option<DateTime<Utc>>,
    /// Owner filter.
    pub user_id: Option<Uuid>,
}

impl UserWindowQuery {
    fn filter(&self) -> SessionFilter {
        SessionFilter {
            user_id: self.user_id.map(UserId::from_uuid),
            window: DateWindow::new(self.from, self.to),
        }
    }
}

/// Query of `GET /reports/flexi`.
#[derive(Debug, Default, Deserialize)]
pub struct FlexiQuery {
    /// Lower `created_at` bound.
    pub from: Option<DateTime<Utc>>,
    /// Upper `created_at` bound.
    pub to: Option<DateTime<Utc>>,
    /// Settled flag filter.
    pub is_settled: Option<bool>,
}

/// How `GET /reports/flexi-consumption` groups rows.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupBy {
    /// One row per user ID.
    #[default]
    User,
    /// One row per display name; users sharing a name are merged.
    Name,
}

/// Query of `GET /reports/flexi-consumption`.
#[derive(Debug, Default, Deserialize)]
pub struct ConsumptionQuery {
    /// Lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Upper bound.
    pub to: Option<DateTime<Utc>>,
    /// Grouping key.
    #[serde(default)]
    pub group_by: GroupBy,
}

/// Query of `GET /reports/expenses`.
#[derive(Debug, Default, Deserialize)]
pub struct RecentExpensesQuery {
    /// Owner filter.
    pub user_id: Option<Uuid>,
    /// Maximum rows. Larger values are capped at 500.
    pub limit: Option<u64>,
}

/// GET /reports/me/summary - The caller's totals.
async fn my_summary(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(window): Query<WindowQuery>,
) -> ApiResult<Json<DashboardSummary>> {
    let summary = state
        .reports()
        .user_summary(auth.user_id(), window.into())
        .await?;
    Ok(Json(summary))
}

/// GET /reports/me/trend - The caller's per-day totals.
async fn my_trend(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(window): Query<WindowQuery>,
) -> ApiResult<Json<Vec<DailyTrend>>> {
    let trend = state
        .reports()
        .daily_trend(SessionFilter::for_user(auth.user_id(), window.into()))
        .await?;
    Ok(Json(trend))
}

/// GET /reports/summary - Totals across every user.
async fn admin_summary(
    State(state): State<AppState>,
    Query(window): Query<WindowQuery>,
) -> ApiResult<Json<DashboardSummary>> {
    Ok(Json(state.reports().admin_summary(window.into()).await?))
}

/// GET /reports/sessions - One row per session.
async fn session_reports(
    State(state): State<AppState>,
    Query(query): Query<UserWindowQuery>,
) -> ApiResult<Json<Vec<SessionReport>>> {
    Ok(Json(state.reports().session_reports(query.filter()).await?))
}

/// GET /reports/flexi - Flexi entries by settled flag, newest first.
async fn flexi_entries(
    State(state): State<AppState>,
    Query(query): Query<FlexiQuery>,
) -> ApiResult<Json<Vec<FlexiEntry>>> {
    let entries = state
        .reports()
        .flexi_entries(FlexiFilter {
            is_settled: query.is_settled,
            window: DateWindow::new(query.from, query.to),
        })
        .await?;
    Ok(Json(entries))
}

/// GET /reports/flexi-consumption - Flexi consumed per user or display name.
async fn flexi_consumption(
    State(state): State<AppState>,
    Query(query): Query<ConsumptionQuery>,
) -> ApiResult<Response> {
    let window = DateWindow::new(query.from, query.to);
    let reports = state.reports();
    let response = match query.group_by {
        GroupBy::User => Json(reports.flexi_consumed_by_user(window).await?).into_response(),
        GroupBy::Name => Json(reports.flexi_consumed_by_name(window).await?).into_response(),
    };
    Ok(response)
}

/// GET /reports/user-activity - Per-user session counts and totals.
async fn user_activity(
    State(state): State<AppState>,
    Query(window): Query<WindowQuery>,
) -> ApiResult<Json<Vec<UserActivity>>> {
    Ok(Json(state.reports().user_activity(window.into()).await?))
}

/// GET /reports/trend - Per-day totals, optionally for one user.
async fn daily_trend(
    State(state): State<AppState>,
    Query(query): Query<UserWindowQuery>,
) -> ApiResult<Json<Vec<DailyTrend>>> {
    Ok(Json(state.reports().daily_trend(query.filter()).await?))
}

/// GET /reports/expenses - Most recent expenses.
async fn recent_expenses(
    State(state): State<AppState>,
    Query(query): Query<RecentExpensesQuery>,
) -> ApiResult<Json<Vec<Expense>>> {
    let limit = query.limit.unwrap_or(DEFAULT_RECENT_LIMIT).min(MAX_RECENT_LIMIT);

    let expenses = state
        .reports()
        .recent_expenses(query.user_id.map(UserId::from_uuid), limit)
        .await?;
    Ok(Json(expenses))
}
