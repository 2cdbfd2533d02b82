//! Derived session metrics.
//!
//! Nothing here is stored. Every figure is recomputed from a session and its
//! entries with exact decimal arithmetic.
//!
//! - total expense = Σ expense amounts
//! - flexi additions = Σ flexi amounts
//! - flexi settled = Σ flexi amounts where settled
//! - net cash difference = (closing cash − opening cash) − total expense + flexi settled
//! - flexi consumed = flexi additions − closing flexi balance

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{CashSession, Expense, FlexiEntry};

/// Pure calculator over a session and its entries.
pub struct BalanceCalculator;

impl BalanceCalculator {
    /// Sum of all expense amounts.
    #[must_use]
    pub fn total_expense(expenses: &[Expense]) -> Decimal {
        expenses.iter().map(|e| e.amount).sum()
    }

    /// Sum of all flexi amounts, settled or not.
    #[must_use]
    pub fn total_flexi_additions(entries: &[FlexiEntry]) -> Decimal {
        entries.iter().map(|f| f.amount).sum()
    }

    /// Sum of settled flexi amounts.
    #[must_use]
    pub fn total_flexi_settled(entries: &[FlexiEntry]) -> Decimal {
        entries.iter().filter(|f| f.is_settled).map(|f| f.amount).sum()
    }

    /// `(closing_cash − opening_cash) − total_expense + total_flexi_settled`.
    #[must_use]
    pub fn net_cash_difference(
        session: &CashSession,
        expenses: &[Expense],
        entries: &[FlexiEntry],
    ) -> Decimal {
        Self::net_from_totals(
            session,
            Self::total_expense(expenses),
            Self::total_flexi_settled(entries),
        )
    }

    /// `total_flexi_additions − closing_flexi_balance`.
    ///
    /// The opening flexi balance does not take part.
    #[must_use]
    pub fn flexi_consumed(session: &CashSession, entries: &[FlexiEntry]) -> Decimal {
        Self::consumed_from_additions(session, Self::total_flexi_additions(entries))
    }

    fn net_from_totals(session: &CashSession, total_expense: Decimal, settled: Decimal) -> Decimal {
        (session.closing_cash - session.opening_cash) - total_expense + settled
    }

    fn consumed_from_additions(session: &CashSession, additions: Decimal) -> Decimal {
        additions - session.closing_flexi_balance
    }
}

/// All derived metrics for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionBalance {
    /// Σ expense amounts.
    pub total_expense: Decimal,
    /// Σ flexi amounts.
    pub total_flexi_additions: Decimal,
    /// Σ settled flexi amounts.
    pub total_flexi_settled: Decimal,
    /// Cash movement net of expenses and settled flexi.
    pub net_cash_difference: Decimal,
    /// Flexi added minus flexi left at close.
    pub flexi_consumed: Decimal,
}

impl SessionBalance {
    /// Computes every metric, summing each entry list once.
    #[must_use]
    pub fn compute(session: &CashSession, expenses: &[Expense], entries: &[FlexiEntry]) -> Self {
        let total_expense = BalanceCalculator::total_expense(expenses);
        let total_flexi_additions = BalanceCalculator::total_flexi_additions(entries);
        let total_flexi_settled = BalanceCalculator::total_flexi_settled(entries);

        Self {
            total_expense,
            total_flexi_additions,
            total_flexi_settled,
            net_cash_difference: BalanceCalculator::net_from_totals(
                session,
                total_expense,
                total_flexi_settled,
            ),
            flexi_consumed: BalanceCalculator::consumed_from_additions(
                session,
                total_flexi_additions,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use rust_decimal_macros::dec;
    use tally_shared::types::{CashSessionId, ExpenseId, FlexiEntryId, UserId};

    fn session(
        opening: Decimal,
        closing: Decimal,
        opening_flexi: Decimal,
        closing_flexi: Decimal,
    ) -> CashSession {
        CashSession {
            id: CashSessionId::new(),
            user_id: UserId::new(),
            opened_at: Utc::now(),
            closed_at: Some(Utc::now()),
            opening_cash: opening,
            closing_cash: closing,
            opening_flexi_balance: opening_flexi,
            closing_flexi_balance: closing_flexi,
            notes: None,
        }
    }

    fn expense(session_id: CashSessionId, amount: Decimal) -> Expense {
        Expense {
            id: ExpenseId::new(),
            session_id,
            amount,
            description: "supplies".to_string(),
            created_at: Utc::now(),
        }
    }

    fn flexi(session_id: CashSessionId, amount: Decimal, is_settled: bool) -> FlexiEntry {
        FlexiEntry {
            id: FlexiEntryId::new(),
            session_id,
            amount,
            is_settled,
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_worked_shift() {
        let s = session(dec!(100), dec!(80), dec!(50), dec!(10));
        let expenses = vec![expense(s.id, dec!(15))];
        let entries = vec![flexi(s.id, dec!(20), true), flexi(s.id, dec!(30), false)];

        let balance = SessionBalance::compute(&s, &expenses, &entries);

        assert_eq!(balance.total_expense, dec!(15));
        assert_eq!(balance.total_flexi_additions, dec!(50));
        assert_eq!(balance.total_flexi_settled, dec!(20));
        assert_eq!(balance.net_cash_difference, dec!(-15));
        assert_eq!(balance.flexi_consumed, dec!(40));
    }

    #[test]
    fn test_session_without_entries() {
        let s = session(dec!(100.25), dec!(130.75), dec!(40), dec!(12.5));
        let balance = SessionBalance::compute(&s, &[], &[]);

        assert_eq!(balance.total_expense, Decimal::ZERO);
        assert_eq!(balance.net_cash_difference, dec!(30.50));
        // Opening flexi is ignored by the formula.
        assert_eq!(balance.flexi_consumed, dec!(-12.5));
    }

    #[test]
    fn test_unsettled_flexi_does_not_move_cash() {
        let s = session(dec!(0), dec!(0), dec!(0), dec!(0));
        let entries = vec![flexi(s.id, dec!(99.99), false)];

        assert_eq!(BalanceCalculator::net_cash_difference(&s, &[], &entries), Decimal::ZERO);
        assert_eq!(BalanceCalculator::flexi_consumed(&s, &entries), dec!(99.99));
    }

    #[test]
    fn test_decimal_precision_is_exact() {
        let s = session(dec!(0), dec!(0.3), dec!(0), dec!(0));
        let expenses = vec![expense(s.id, dec!(0.1)), expense(s.id, dec!(0.2))];

        assert_eq!(BalanceCalculator::total_expense(&expenses), dec!(0.3));
        assert_eq!(BalanceCalculator::net_cash_difference(&s, &expenses, &[]), Decimal::ZERO);
    }

    fn amount() -> impl Strategy<Value = Decimal> {
        (0i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    fn signed_amount() -> impl Strategy<Value = Decimal> {
        (-10_000_000i64..10_000_000).prop_map(|cents| Decimal::new(cents, 2))
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The combined computation agrees with the individual formulas.
        #[test]
        fn prop_compute_matches_individual_formulas(
            opening in signed_amount(),
            closing in signed_amount(),
            closing_flexi in signed_amount(),
            expense_amounts in prop::collection::vec(amount(), 0..10),
            flexi_amounts in prop::collection::vec((amount(), any::<bool>()), 0..10),
        ) {
            let s = session(opening, closing, Decimal::ZERO, closing_flexi);
            let expenses: Vec<_> = expense_amounts.iter().map(|a| expense(s.id, *a)).collect();
            let entries: Vec<_> = flexi_amounts
                .iter()
                .map(|(a, settled)| flexi(s.id, *a, *settled))
                .collect();

            let balance = SessionBalance::compute(&s, &expenses, &entries);

            prop_assert_eq!(balance.total_expense, BalanceCalculator::total_expense(&expenses));
            prop_assert_eq!(
                balance.net_cash_difference,
                BalanceCalculator::net_cash_difference(&s, &expenses, &entries)
            );
            prop_assert_eq!(
                balance.flexi_consumed,
                BalanceCalculator::flexi_consumed(&s, &entries)
            );
        }

        /// Settled flexi is a subset of all flexi additions.
        #[test]
        fn prop_settled_never_exceeds_additions(
            flexi_amounts in prop::collection::vec((amount(), any::<bool>()), 0..20),
        ) {
            let id = CashSessionId::new();
            let entries: Vec<_> = flexi_amounts
                .iter()
                .map(|(a, settled)| flexi(id, *a, *settled))
                .collect();
            let settled = BalanceCalculator::total_flexi_settled(&entries);

            prop_assert!(settled <= BalanceCalculator::total_flexi_additions(&entries));
            prop_assert!(settled >= Decimal::ZERO);
        }

        /// With no entries the net difference is the drawer delta.
        #[test]
        fn prop_empty_session_net_is_drawer_delta(
            opening in signed_amount(),
            closing in signed_amount(),
            closing_flexi in signed_amount(),
        ) {
            let s = session(opening, closing, Decimal::ZERO, closing_flexi);
            let balance = SessionBalance::compute(&s, &[], &[]);

            prop_assert_eq!(balance.net_cash_difference, closing - opening);
            prop_assert_eq!(balance.flexi_consumed, -closing_flexi);
        }
    }
}
