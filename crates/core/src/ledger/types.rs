//! Domain types for cash sessions and their entries.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tally_shared::types::{CashSessionId, DateWindow, ExpenseId, FlexiEntryId, UserId};

use super::balance::SessionBalance;
use crate::auth::User;

/// One cashier shift on a register.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CashSession {
    /// Session ID.
    pub id: CashSessionId,
    /// Operator who owns the session.
    pub user_id: UserId,
    /// When the session was opened.
    pub opened_at: DateTime<Utc>,
    /// When the session was closed; `None` while open.
    pub closed_at: Option<DateTime<Utc>>,
    /// Cash in the drawer at open.
    pub opening_cash: Decimal,
    /// Cash in the drawer at close (equals `opening_cash` while open).
    pub closing_cash: Decimal,
    /// Flexi balance at open.
    pub opening_flexi_balance: Decimal,
    /// Flexi balance at close (equals `opening_flexi_balance` while open).
    pub closing_flexi_balance: Decimal,
    /// Free-text notes.
    pub notes: Option<String>,
}

impl CashSession {
    /// Returns true while the session has not been closed.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.closed_at.is_none()
    }
}

/// An expense paid out of the drawer during a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    /// Expense ID.
    pub id: ExpenseId,
    /// Session the expense belongs to.
    pub session_id: CashSessionId,
    /// Amount (never negative).
    pub amount: Decimal,
    /// What the money was spent on.
    pub description: String,
    /// When the expense was recorded.
    pub created_at: DateTime<Utc>,
}

/// A flexi (customer credit) addition recorded during a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlexiEntry {
    /// Entry ID.
    pub id: FlexiEntryId,
    /// Session the entry belongs to.
    pub session_id: CashSessionId,
    /// Amount (never negative).
    pub amount: Decimal,
    /// Whether the addition has since been paid back.
    pub is_settled: bool,
    /// Free-text notes.
    pub notes: Option<String>,
    /// When the entry was recorded.
    pub created_at: DateTime<Utc>,
}

/// Input for opening a session.
#[derive(Debug, Clone)]
pub struct OpenSessionInput {
    /// Operator opening the session.
    pub user_id: UserId,
    /// Cash counted at open.
    pub opening_cash: Decimal,
    /// Flexi balance at open.
    pub opening_flexi_balance: Decimal,
    /// Optional notes.
    pub notes: Option<String>,
}

/// Input for closing a session.
#[derive(Debug, Clone)]
pub struct CloseSessionInput {
    /// Cash counted at close.
    pub closing_cash: Decimal,
    /// Flexi balance at close.
    pub closing_flexi_balance: Decimal,
    /// Replaces the stored notes when non-blank.
    pub notes: Option<String>,
}

/// Fields written when a session is closed.
#[derive(Debug, Clone)]
pub struct SessionClosing {
    /// Close timestamp, never earlier than `opened_at`.
    pub closed_at: DateTime<Utc>,
    /// Cash counted at close.
    pub closing_cash: Decimal,
    /// Flexi balance at close.
    pub closing_flexi_balance: Decimal,
    /// New notes; `None` keeps the stored notes.
    pub notes: Option<String>,
}

/// What happens when `close` targets a session that is already closed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReclosePolicy {
    /// Fail with `AlreadyClosed`.
    #[default]
    Reject,
    /// Overwrite the closing figures and timestamp.
    Overwrite,
}

impl ReclosePolicy {
    /// Maps the `ledger.reject_reclose` config flag to a policy.
    #[must_use]
    pub const fn from_reject_flag(reject_reclose: bool) -> Self {
        if reject_reclose {
            Self::Reject
        } else {
            Self::Overwrite
        }
    }
}

/// Selects sessions by owner and `opened_at` window.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionFilter {
    /// Restrict to one owner.
    pub user_id: Option<UserId>,
    /// Inclusive `opened_at` window.
    pub window: DateWindow,
}

impl SessionFilter {
    /// Sessions of every user opened inside `window`.
    #[must_use]
    pub const fn all(window: DateWindow) -> Self {
        Self {
            user_id: None,
            window,
        }
    }

    /// Sessions of one user opened inside `window`.
    #[must_use]
    pub const fn for_user(user_id: UserId, window: DateWindow) -> Self {
        Self {
            user_id: Some(user_id),
            window,
        }
    }

    /// Returns true if `session` passes the filter.
    #[must_use]
    pub fn matches(&self, session: &CashSession) -> bool {
        self.user_id.is_none_or(|id| id == session.user_id)
            && self.window.contains(session.opened_at)
    }
}

/// Selects flexi entries by settled flag and `created_at` window.
#[derive(Debug, Clone, Copy, Default)]
pub struct FlexiFilter {
    /// Restrict to settled (`true`) or unsettled (`false`) entries.
    pub is_settled: Option<bool>,
    /// Inclusive `created_at` window.
    pub window: DateWindow,
}

impl FlexiFilter {
    /// Returns true if `entry` passes the filter.
    #[must_use]
    pub fn matches(&self, entry: &FlexiEntry) -> bool {
        self.is_settled.is_none_or(|settled| settled == entry.is_settled)
            && self.window.contains(entry.created_at)
    }
}

/// A session with its owner and every entry, as read for reporting.
#[derive(Debug, Clone)]
pub struct SessionSnapshot {
    /// The session.
    pub session: CashSession,
    /// Owner of the session.
    pub owner: User,
    /// Expenses in creation order.
    pub expenses: Vec<Expense>,
    /// Flexi entries in creation order.
    pub flexi_entries: Vec<FlexiEntry>,
}

impl SessionSnapshot {
    /// Derived metrics for this session.
    #[must_use]
    pub fn balance(&self) -> SessionBalance {
        SessionBalance::compute(&self.session, &self.expenses, &self.flexi_entries)
    }
}

/// A session with its entries and derived metrics.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetail {
    /// The session.
    pub session: CashSession,
    /// Expenses in creation order.
    pub expenses: Vec<Expense>,
    /// Flexi entries in creation order.
    pub flexi_entries: Vec<FlexiEntry>,
    /// Derived metrics.
    pub balance: SessionBalance,
}

/// Trims optional free text, mapping blank to `None`.
pub(crate) fn non_blank(text: Option<String>) -> Option<String> {
    text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}
