//! Report output types.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use tally_shared::types::{CashSessionId, UserId};

use crate::auth::UserRole;
use crate::ledger::SessionBalance;

/// Totals over a set of sessions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    /// Σ expense amounts.
    pub total_expense: Decimal,
    /// Σ flexi additions.
    pub total_flexi_additions: Decimal,
    /// Σ settled flexi.
    pub total_flexi_settled: Decimal,
    /// Σ per-session net cash difference.
    pub net_cash_difference: Decimal,
    /// Σ per-session flexi consumed.
    pub flexi_consumed: Decimal,
    /// `net_cash_difference + total_flexi_settled − total_expense`.
    ///
    /// Settled flexi and expenses are already inside the net difference, so
    /// they count twice here. Dashboards have always shown this figure.
    pub profit: Decimal,
    /// Number of sessions summed.
    pub session_count: u64,
    /// How many of them are still open.
    pub open_session_count: u64,
}

/// One row of the session report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    /// Session ID.
    pub session_id: CashSessionId,
    /// Owner ID.
    pub user_id: UserId,
    /// Owner's effective display name.
    pub display_name: String,
    /// Open timestamp.
    pub opened_at: DateTime<Utc>,
    /// Close timestamp.
    pub closed_at: Option<DateTime<Utc>>,
    /// Cash at open.
    pub opening_cash: Decimal,
    /// Cash at close.
    pub closing_cash: Decimal,
    /// Flexi at open.
    pub opening_flexi_balance: Decimal,
    /// Flexi at close.
    pub closing_flexi_balance: Decimal,
    /// Notes.
    pub notes: Option<String>,
    /// Derived metrics.
    #[serde(flatten)]
    pub balance: SessionBalance,
}

/// Flexi consumed, grouped by display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NamedFlexiConsumption {
    /// Effective display name. Users sharing a name share a row.
    pub display_name: String,
    /// Σ flexi consumed.
    pub flexi_consumed: Decimal,
}

/// Flexi consumed, grouped by user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserFlexiConsumption {
    /// User ID.
    pub user_id: UserId,
    /// Effective display name (label only).
    pub display_name: String,
    /// Σ flexi consumed.
    pub flexi_consumed: Decimal,
}

/// Per-user activity over a window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserActivity {
    /// User ID.
    pub user_id: UserId,
    /// Username.
    pub username: String,
    /// Effective display name.
    pub display_name: String,
    /// Role.
    pub role: UserRole,
    /// Active flag.
    pub is_active: bool,
    /// Sessions opened in the window.
    pub session_count: u64,
    /// Of those, still open.
    pub open_session_count: u64,
    /// Latest open or close timestamp among those sessions.
    pub last_activity: Option<DateTime<Utc>>,
    /// Σ net cash difference.
    pub net_cash_difference: Decimal,
    /// Σ flexi consumed.
    pub flexi_consumed: Decimal,
}

/// Totals for one UTC calendar day of session openings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DailyTrend {
    /// Day (UTC) the sessions were opened.
    pub day: NaiveDate,
    /// Sessions opened that day.
    pub session_count: u64,
    /// Σ expenses of those sessions.
    pub total_expense: Decimal,
    /// Σ net cash difference of those sessions.
    pub net_cash_difference: Decimal,
}
