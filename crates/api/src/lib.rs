//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for sessions, entries, reports, and users
//! - Authentication and role middleware
//! - JSON error responses

pub mod error;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use tally_core::auth::UserDirectory;
use tally_core::ledger::{ReclosePolicy, SessionLedger, TransactionJournal};
use tally_core::reports::ReportAggregator;
use tally_db::SeaOrmStore;
use tally_shared::jwt::JwtService;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database-backed store.
    pub store: Arc<SeaOrmStore>,
    /// JWT service for token operations.
    pub jwt_service: Arc<JwtService>,
    /// What closing an already-closed session does.
    pub reclose_policy: ReclosePolicy,
}

impl AppState {
    /// Creates state over a store and token service.
    #[must_use]
    pub fn new(store: SeaOrmStore, jwt_service: JwtService, reclose_policy: ReclosePolicy) -> Self {
        Self {
            store: Arc::new(store),
            jwt_service: Arc::new(jwt_service),
            reclose_policy,
        }
    }

    /// Session lifecycle service.
    #[must_use]
    pub fn ledger(&self) -> SessionLedger<SeaOrmStore> {
        SessionLedger::with_policy(Arc::clone(&self.store), self.reclose_policy)
    }

    /// Expense and flexi journal.
    #[must_use]
    pub fn journal(&self) -> TransactionJournal<SeaOrmStore> {
        TransactionJournal::new(Arc::clone(&self.store))
    }

    /// Report aggregation.
    #[must_use]
    pub fn reports(&self) -> ReportAggregator<SeaOrmStore> {
        ReportAggregator::new(Arc::clone(&self.store))
    }

    /// User management and login.
    #[must_use]
    pub fn directory(&self) -> UserDirectory<SeaOrmStore> {
        UserDirectory::new(Arc::clone(&self.store))
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
