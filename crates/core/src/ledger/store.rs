//! Persistence contract for users, sessions, and entries.
//!
//! The db crate implements this trait with SeaORM. `InMemoryStore` implements
//! it for tests and embedding.

use std::future::Future;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tally_shared::types::{CashSessionId, ExpenseId, FlexiEntryId, UserId};

use super::error::LedgerError;
use super::types::{
    CashSession, Expense, FlexiEntry, FlexiFilter, ReclosePolicy, SessionClosing, SessionFilter,
    SessionSnapshot,
};
use crate::auth::{User, UserCredentials, UserRole};

/// A user row to insert.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// Pre-generated ID.
    pub id: UserId,
    /// Trimmed, unique login name.
    pub username: String,
    /// Argon2id PHC string.
    pub password_hash: String,
    /// Optional display name.
    pub display_name: Option<String>,
    /// Role.
    pub role: UserRole,
}

/// Partial update of a user row. `None` leaves a column unchanged.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    /// New password hash.
    pub password_hash: Option<String>,
    /// New role.
    pub role: Option<UserRole>,
    /// New display name; `Some(None)` clears it.
    pub display_name: Option<Option<String>>,
    /// New active flag.
    pub is_active: Option<bool>,
}

/// A session row to insert.
#[derive(Debug, Clone)]
pub struct NewCashSession {
    /// Pre-generated ID.
    pub id: CashSessionId,
    /// Owner.
    pub user_id: UserId,
    /// Open timestamp.
    pub opened_at: DateTime<Utc>,
    /// Cash at open; also written as closing cash.
    pub opening_cash: Decimal,
    /// Flexi at open; also written as closing flexi.
    pub opening_flexi_balance: Decimal,
    /// Notes.
    pub notes: Option<String>,
}

/// An expense row to insert.
#[derive(Debug, Clone)]
pub struct NewExpense {
    /// Pre-generated ID.
    pub id: ExpenseId,
    /// Target session.
    pub session_id: CashSessionId,
    /// Non-negative amount.
    pub amount: Decimal,
    /// Description.
    pub description: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// A flexi row to insert.
#[derive(Debug, Clone)]
pub struct NewFlexiEntry {
    /// Pre-generated ID.
    pub id: FlexiEntryId,
    /// Target session.
    pub session_id: CashSessionId,
    /// Non-negative amount.
    pub amount: Decimal,
    /// Settled flag.
    pub is_settled: bool,
    /// Notes.
    pub notes: Option<String>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

/// Durable storage behind the ledger, journal, reports, and user directory.
///
/// Implementations must make `insert_session_if_none_open` atomic with
/// respect to other opens for the same user, and must make `close_session`
/// conditional on the session still being open under `ReclosePolicy::Reject`.
pub trait CashRegisterStore: Send + Sync {
    // ========== Users ==========

    /// Find a user by ID.
    fn find_user(
        &self,
        id: UserId,
    ) -> impl Future<Output = Result<Option<User>, LedgerError>> + Send;

    /// Find a user and password hash by username.
    fn find_credentials(
        &self,
        username: &str,
    ) -> impl Future<Output = Result<Option<UserCredentials>, LedgerError>> + Send;

    /// List all users ordered by username.
    fn list_users(&self) -> impl Future<Output = Result<Vec<User>, LedgerError>> + Send;

    /// Insert a user. Fails with `UsernameTaken` on a duplicate username.
    fn insert_user(
        &self,
        user: NewUser,
    ) -> impl Future<Output = Result<User, LedgerError>> + Send;

    /// Apply changes to a user. Returns `None` if the user does not exist.
    fn update_user(
        &self,
        id: UserId,
        changes: UserChanges,
    ) -> impl Future<Output = Result<Option<User>, LedgerError>> + Send;

    /// Delete a user with all their sessions and entries.
    /// Returns false if the user did not exist.
    fn delete_user(&self, id: UserId) -> impl Future<Output = Result<bool, LedgerError>> + Send;

    // ========== Sessions ==========

    /// Find a session by ID, open or closed.
    fn find_session(
        &self,
        id: CashSessionId,
    ) -> impl Future<Output = Result<Option<CashSession>, LedgerError>> + Send;

    /// Open sessions of a user, most recently opened first.
    fn open_sessions_for(
        &self,
        user_id: UserId,
    ) -> impl Future<Output = Result<Vec<CashSession>, LedgerError>> + Send;

    /// Insert a session unless the user already has an open one.
    /// Fails with `SessionConflict` otherwise.
    fn insert_session_if_none_open(
        &self,
        session: NewCashSession,
    ) -> impl Future<Output = Result<CashSession, LedgerError>> + Send;

    /// Write closing fields. Fails with `SessionNotFound`, or with
    /// `AlreadyClosed` when the session is closed and the policy is `Reject`.
    fn close_session(
        &self,
        id: CashSessionId,
        closing: SessionClosing,
        policy: ReclosePolicy,
    ) -> impl Future<Output = Result<CashSession, LedgerError>> + Send;

    /// Sessions matching `filter`, most recently opened first.
    fn sessions(
        &self,
        filter: SessionFilter,
    ) -> impl Future<Output = Result<Vec<CashSession>, LedgerError>> + Send;

    /// Sessions matching `filter` with owner and entries, most recently opened first.
    fn session_snapshots(
        &self,
        filter: SessionFilter,
    ) -> impl Future<Output = Result<Vec<SessionSnapshot>, LedgerError>> + Send;

    // ========== Entries ==========

    /// Append an expense. Fails with `SessionNotFound` if the session is gone.
    fn insert_expense(
        &self,
        expense: NewExpense,
    ) -> impl Future<Output = Result<Expense, LedgerError>> + Send;

    /// Append a flexi entry. Fails with `SessionNotFound` if the session is gone.
    fn insert_flexi(
        &self,
        entry: NewFlexiEntry,
    ) -> impl Future<Output = Result<FlexiEntry, LedgerError>> + Send;

    /// Expenses of a session in creation order.
    fn expenses_for(
        &self,
        session_id: CashSessionId,
    ) -> impl Future<Output = Result<Vec<Expense>, LedgerError>> + Send;

    /// Flexi entries of a session in creation order.
    fn flexi_entries_for(
        &self,
        session_id: CashSessionId,
    ) -> impl Future<Output = Result<Vec<FlexiEntry>, LedgerError>> + Send;

    /// Flexi entries matching `filter`, newest first.
    fn flexi_entries(
        &self,
        filter: FlexiFilter,
    ) -> impl Future<Output = Result<Vec<FlexiEntry>, LedgerError>> + Send;

    /// The `limit` most recent expenses, optionally only from one user's sessions.
    fn recent_expenses(
        &self,
        user_id: Option<UserId>,
        limit: u64,
    ) -> impl Future<Output = Result<Vec<Expense>, LedgerError>> + Send;
}
