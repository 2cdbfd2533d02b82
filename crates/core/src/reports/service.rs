//! Report aggregation.
//!
//! `ReportService` holds the pure folds over session snapshots.
//! `ReportAggregator` pulls snapshots from a store and applies them.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use tally_shared::types::{DateWindow, UserId};

use super::types::{
    DailyTrend, DashboardSummary, NamedFlexiConsumption, SessionReport, UserActivity,
    UserFlexiConsumption,
};
use crate::auth::User;
use crate::ledger::{
    CashRegisterStore, Expense, FlexiEntry, FlexiFilter, LedgerError, SessionFilter,
    SessionSnapshot,
};

/// Pure report computations.
pub struct ReportService;

impl ReportService {
    /// Sum per-session metrics into a dashboard summary.
    #[must_use]
    pub fn summarize(snapshots: &[SessionSnapshot]) -> DashboardSummary {
        let mut summary = snapshots
            .iter()
            .fold(DashboardSummary::default(), |mut acc, snapshot| {
                let balance = snapshot.balance();
                acc.total_expense += balance.total_expense;
                acc.total_flexi_additions += balance.total_flexi_additions;
                acc.total_flexi_settled += balance.total_flexi_settled;
                acc.net_cash_difference += balance.net_cash_difference;
                acc.flexi_consumed += balance.flexi_consumed;
                acc.session_count += 1;
                if snapshot.session.is_open() {
                    acc.open_session_count += 1;
                }
                acc
            });

        summary.profit = Self::profit(
            summary.net_cash_difference,
            summary.total_flexi_settled,
            summary.total_expense,
        );
        summary
    }

    /// `net + settled − expenses`, as the dashboards have always computed it.
    #[must_use]
    pub fn profit(
        net_cash_difference: Decimal,
        total_flexi_settled: Decimal,
        total_expense: Decimal,
    ) -> Decimal {
        net_cash_difference + total_flexi_settled - total_expense
    }

    /// One report row for a snapshot.
    #[must_use]
    pub fn session_report(snapshot: &SessionSnapshot) -> SessionReport {
        let session = &snapshot.session;
        SessionReport {
            session_id: session.id,
            user_id: session.user_id,
            display_name: snapshot.owner.effective_display_name().to_string(),
            opened_at: session.opened_at,
            closed_at: session.closed_at,
            opening_cash: session.opening_cash,
            closing_cash: session.closing_cash,
            opening_flexi_balance: session.opening_flexi_balance,
            closing_flexi_balance: session.closing_flexi_balance,
            notes: session.notes.clone(),
            balance: snapshot.balance(),
        }
    }

    /// Flexi consumed per display name, ordered by name.
    ///
    /// Two users with the same display name land in the same row.
    #[must_use]
    pub fn flexi_consumed_by_name(snapshots: &[SessionSnapshot]) -> Vec<NamedFlexiConsumption> {
        let mut totals: BTreeMap<String, Decimal> = BTreeMap::new();
        for snapshot in snapshots {
            *totals
                .entry(snapshot.owner.effective_display_name().to_string())
                .or_default() += snapshot.balance().flexi_consumed;
        }

        totals
            .into_iter()
            .map(|(display_name, flexi_consumed)| NamedFlexiConsumption {
                display_name,
                flexi_consumed,
            })
            .collect()
    }

    /// Flexi consumed per user, ordered by display name then user ID.
    #[must_use]
    pub fn flexi_consumed_by_user(snapshots: &[SessionSnapshot]) -> Vec<UserFlexiConsumption> {
        let mut totals: HashMap<UserId, UserFlexiConsumption> = HashMap::new();
        for snapshot in snapshots {
            let row = totals
                .entry(snapshot.owner.id)
                .or_insert_with(|| UserFlexiConsumption {
                    user_id: snapshot.owner.id,
                    display_name: snapshot.owner.effective_display_name().to_string(),
                    flexi_consumed: Decimal::ZERO,
                });
            row.flexi_consumed += snapshot.balance().flexi_consumed;
        }

        let mut rows: Vec<_> = totals.into_values().collect();
        rows.sort_by(|a, b| {
            a.display_name
                .cmp(&b.display_name)
                .then_with(|| a.user_id.0.cmp(&b.user_id.0))
        });
        rows
    }

    /// Activity of every user over the snapshots, ordered by username.
    ///
    /// Users without sessions get a zero row.
    #[must_use]
    pub fn user_activity(users: &[User], snapshots: &[SessionSnapshot]) -> Vec<UserActivity> {
        let mut rows: Vec<UserActivity> = users
            .iter()
            .map(|user| UserActivity {
                user_id: user.id,
                username: user.username.clone(),
                display_name: user.effective_display_name().to_string(),
                role: user.role,
                is_active: user.is_active,
                session_count: 0,
                open_session_count: 0,
                last_activity: None,
                net_cash_difference: Decimal::ZERO,
                flexi_consumed: Decimal::ZERO,
            })
            .collect();
        rows.sort_by(|a, b| a.username.cmp(&b.username));

        let index: HashMap<UserId, usize> = rows
            .iter()
            .enumerate()
            .map(|(i, row)| (row.user_id, i))
            .collect();

        for snapshot in snapshots {
            let Some(&i) = index.get(&snapshot.session.user_id) else {
                continue;
            };
            let row = &mut rows[i];
            let balance = snapshot.balance();
            let touched = last_touch(snapshot);

            row.session_count += 1;
            if snapshot.session.is_open() {
                row.open_session_count += 1;
            }
            row.last_activity = row.last_activity.max(Some(touched));
            row.net_cash_difference += balance.net_cash_difference;
            row.flexi_consumed += balance.flexi_consumed;
        }
        rows
    }

    /// Per-day totals by UTC day of `opened_at`, oldest day first.
    #[must_use]
    pub fn daily_trend(snapshots: &[SessionSnapshot]) -> Vec<DailyTrend> {
        let mut days: BTreeMap<NaiveDate, DailyTrend> = BTreeMap::new();
        for snapshot in snapshots {
            let day = snapshot.session.opened_at.date_naive();
            let balance = snapshot.balance();
            let row = days.entry(day).or_insert_with(|| DailyTrend {
                day,
                session_count: 0,
                total_expense: Decimal::ZERO,
                net_cash_difference: Decimal::ZERO,
            });
            row.session_count += 1;
            row.total_expense += balance.total_expense;
            row.net_cash_difference += balance.net_cash_difference;
        }
        days.into_values().collect()
    }
}

fn last_touch(snapshot: &SessionSnapshot) -> DateTime<Utc> {
    snapshot
        .session
        .closed_at
        .map_or(snapshot.session.opened_at, |closed| closed.max(snapshot.session.opened_at))
}

/// Cross-session reporting over a store.
pub struct ReportAggregator<S: CashRegisterStore> {
    store: Arc<S>,
}

impl<S: CashRegisterStore> ReportAggregator<S> {
    /// Create an aggregator over a store.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Summary of one user's sessions opened inside `window`.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` for an unknown user.
    pub async fn user_summary(
        &self,
        user_id: UserId,
        window: DateWindow,
    ) -> Result<DashboardSummary, LedgerError> {
        self.require_user(user_id).await?;
        let snapshots = self.snapshots(SessionFilter::for_user(user_id, window)).await?;
        Ok(ReportService::summarize(&snapshots))
    }

    /// Summary of every session opened inside `window`.
    pub async fn admin_summary(&self, window: DateWindow) -> Result<DashboardSummary, LedgerError> {
        let snapshots = self.snapshots(SessionFilter::all(window)).await?;
        Ok(ReportService::summarize(&snapshots))
    }

    /// One row per session, most recently opened first.
    pub async fn session_reports(
        &self,
        filter: SessionFilter,
    ) -> Result<Vec<SessionReport>, LedgerError> {
        let snapshots = self.snapshots(filter).await?;
        Ok(snapshots.iter().map(ReportService::session_report).collect())
    }

    /// Flexi entries by settled flag and `created_at` window, newest first.
    pub async fn flexi_entries(&self, filter: FlexiFilter) -> Result<Vec<FlexiEntry>, LedgerError> {
        if filter.window.is_inverted() {
            return Ok(Vec::new());
        }
        self.store.flexi_entries(filter).await
    }

    /// Flexi consumed grouped by display name.
    pub async fn flexi_consumed_by_name(
        &self,
        window: DateWindow,
    ) -> Result<Vec<NamedFlexiConsumption>, LedgerError> {
        let snapshots = self.snapshots(SessionFilter::all(window)).await?;
        Ok(ReportService::flexi_consumed_by_name(&snapshots))
    }

    /// Flexi consumed grouped by user ID.
    pub async fn flexi_consumed_by_user(
        &self,
        window: DateWindow,
    ) -> Result<Vec<UserFlexiConsumption>, LedgerError> {
        let snapshots = self.snapshots(SessionFilter::all(window)).await?;
        Ok(ReportService::flexi_consumed_by_user(&snapshots))
    }

    /// Activity of every user for sessions opened inside `window`.
    pub async fn user_activity(
        &self,
        window: DateWindow,
    ) -> Result<Vec<UserActivity>, LedgerError> {
        let users = self.store.list_users().await?;
        let snapshots = self.snapshots(SessionFilter::all(window)).await?;
        Ok(ReportService::user_activity(&users, &snapshots))
    }

    /// Per-day totals, optionally for one user.
    pub async fn daily_trend(&self, filter: SessionFilter) -> Result<Vec<DailyTrend>, LedgerError> {
        let snapshots = self.snapshots(filter).await?;
        Ok(ReportService::daily_trend(&snapshots))
    }

    /// The `limit` most recent expenses, optionally from one user's sessions.
    pub async fn recent_expenses(
        &self,
        user_id: Option<UserId>,
        limit: u64,
    ) -> Result<Vec<Expense>, LedgerError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.store.recent_expenses(user_id, limit).await
    }

    async fn snapshots(&self, filter: SessionFilter) -> Result<Vec<SessionSnapshot>, LedgerError> {
        if filter.window.is_inverted() {
            return Ok(Vec::new());
        }
        self.store.session_snapshots(filter).await
    }

    async fn require_user(&self, user_id: UserId) -> Result<(), LedgerError> {
        match self.store.find_user(user_id).await? {
            Some(_) => Ok(()),
            None => Err(LedgerError::UserNotFound(user_id)),
        }
    }
}
