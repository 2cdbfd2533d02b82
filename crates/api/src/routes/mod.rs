//! API route definitions.

use axum::{Router, middleware};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tally_shared::types::DateWindow;

use crate::{
    AppState,
    middleware::auth::{auth_middleware, report_access_middleware, user_admin_middleware},
};

pub mod auth;
pub mod health;
pub mod reports;
pub mod sessions;
pub mod users;

/// Optional inclusive `from`/`to` bounds (RFC 3339) from the query string.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct WindowQuery {
    /// Lower bound.
    pub from: Option<DateTime<Utc>>,
    /// Upper bound.
    pub to: Option<DateTime<Utc>>,
}

impl From<WindowQuery> for DateWindow {
    fn from(query: WindowQuery) -> Self {
        Self::new(query.from, query.to)
    }
}

/// Creates the API router with protected routes that need state for middleware.
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let supervisor_routes = Router::new()
        .merge(reports::supervisor_routes().layer(middleware::from_fn(report_access_middleware)))
        .merge(users::routes().layer(middleware::from_fn(user_admin_middleware)));

    let protected_routes = Router::new()
        .merge(sessions::routes())
        .merge(reports::routes())
        .merge(supervisor_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(protected_routes)
}
