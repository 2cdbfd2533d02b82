//! Appends expense and flexi entries to sessions.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tally_shared::types::{CashSessionId, ExpenseId, FlexiEntryId};
use tracing::info;

use super::error::LedgerError;
use super::store::{CashRegisterStore, NewExpense, NewFlexiEntry};
use super::types::{Expense, FlexiEntry, non_blank};

/// Validates and records journal entries.
///
/// Entries are accepted on closed sessions too; the journal only checks that
/// the amount is non-negative and the session exists.
pub struct TransactionJournal<S: CashRegisterStore> {
    store: Arc<S>,
}

impl<S: CashRegisterStore> TransactionJournal<S> {
    /// Create a journal over a store.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Record an expense paid out of the drawer.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount` is negative (nothing is written)
    /// - `SessionNotFound` if the session does not exist
    pub async fn record_expense(
        &self,
        session_id: CashSessionId,
        amount: Decimal,
        description: impl Into<String>,
    ) -> Result<Expense, LedgerError> {
        validate_amount(amount)?;
        self.ensure_session(session_id).await?;

        let expense = self
            .store
            .insert_expense(NewExpense {
                id: ExpenseId::new(),
                session_id,
                amount,
                description: description.into().trim().to_string(),
                created_at: Utc::now(),
            })
            .await?;

        info!(
            session_id = %session_id,
            expense_id = %expense.id,
            amount = %expense.amount,
            "Expense recorded"
        );
        Ok(expense)
    }

    /// Record a flexi (customer credit) addition.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if `amount` is negative (nothing is written)
    /// - `SessionNotFound` if the session does not exist
    pub async fn record_flexi(
        &self,
        session_id: CashSessionId,
        amount: Decimal,
        is_settled: bool,
        notes: Option<String>,
    ) -> Result<FlexiEntry, LedgerError> {
        validate_amount(amount)?;
        self.ensure_session(session_id).await?;

        let entry = self
            .store
            .insert_flexi(NewFlexiEntry {
                id: FlexiEntryId::new(),
                session_id,
                amount,
                is_settled,
                notes: non_blank(notes),
                created_at: Utc::now(),
            })
            .await?;

        info!(
            session_id = %session_id,
            flexi_id = %entry.id,
            amount = %entry.amount,
            is_settled,
            "Flexi entry recorded"
        );
        Ok(entry)
    }

    /// Expenses of a session in creation order.
    pub async fn expenses_for(
        &self,
        session_id: CashSessionId,
    ) -> Result<Vec<Expense>, LedgerError> {
        self.ensure_session(session_id).await?;
        self.store.expenses_for(session_id).await
    }

    /// Flexi entries of a session in creation order.
    pub async fn flexi_entries_for(
        &self,
        session_id: CashSessionId,
    ) -> Result<Vec<FlexiEntry>, LedgerError> {
        self.ensure_session(session_id).await?;
        self.store.flexi_entries_for(session_id).await
    }

    async fn ensure_session(&self, session_id: CashSessionId) -> Result<(), LedgerError> {
        match self.store.find_session(session_id).await? {
            Some(_) => Ok(()),
            None => Err(LedgerError::SessionNotFound(session_id)),
        }
    }
}

fn validate_amount(amount: Decimal) -> Result<(), LedgerError> {
    if amount < Decimal::ZERO {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}
