//! Session lifecycle: open, close, and lookup.

use std::sync::Arc;

use chrono::Utc;
use tally_shared::types::{CashSessionId, UserId};
use tracing::{info, warn};

use super::balance::SessionBalance;
use super::error::LedgerError;
use super::store::{CashRegisterStore, NewCashSession};
use super::types::{
    CashSession, CloseSessionInput, OpenSessionInput, ReclosePolicy, SessionClosing, SessionDetail,
    SessionFilter, non_blank,
};

/// Owns the Open → Closed state machine of cash sessions.
///
/// A user has at most one open session. The guarantee comes from the store
/// (transactional check plus a partial unique index), not from locks held here.
pub struct SessionLedger<S: CashRegisterStore> {
    store: Arc<S>,
    policy: ReclosePolicy,
}

impl<S: CashRegisterStore> SessionLedger<S> {
    /// Create a ledger that rejects re-closing.
    #[must_use]
    pub fn new(store: Arc<S>) -> Self {
        Self::with_policy(store, ReclosePolicy::Reject)
    }

    /// Create a ledger with an explicit re-close policy.
    #[must_use]
    pub fn with_policy(store: Arc<S>, policy: ReclosePolicy) -> Self {
        Self { store, policy }
    }

    /// Open a new session for a user.
    ///
    /// Closing figures start equal to the opening figures.
    ///
    /// # Errors
    ///
    /// - `UserNotFound` if the user does not exist
    /// - `SessionConflict` if the user already has an open session
    pub async fn open(&self, input: OpenSessionInput) -> Result<CashSession, LedgerError> {
        if self.store.find_user(input.user_id).await?.is_none() {
            return Err(LedgerError::UserNotFound(input.user_id));
        }

        let result = self
            .store
            .insert_session_if_none_open(NewCashSession {
                id: CashSessionId::new(),
                user_id: input.user_id,
                opened_at: Utc::now(),
                opening_cash: input.opening_cash,
                opening_flexi_balance: input.opening_flexi_balance,
                notes: non_blank(input.notes),
            })
            .await;

        match &result {
            Ok(session) => info!(
                session_id = %session.id,
                user_id = %session.user_id,
                opening_cash = %session.opening_cash,
                "Cash session opened"
            ),
            Err(LedgerError::SessionConflict(user_id)) => {
                info!(user_id = %user_id, "Open rejected, session already open");
            }
            Err(_) => {}
        }

        result
    }

    /// Close a session, recording the closing figures.
    ///
    /// `closed_at` is set to now, or to `opened_at` if the clock is behind it.
    /// Notes are replaced only when a non-blank value is supplied.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session does not exist
    /// - `AlreadyClosed` if the session is closed and the policy is `Reject`
    pub async fn close(
        &self,
        session_id: CashSessionId,
        input: CloseSessionInput,
    ) -> Result<CashSession, LedgerError> {
        let session = self
            .store
            .find_session(session_id)
            .await?
            .ok_or(LedgerError::SessionNotFound(session_id))?;

        if !session.is_open() && self.policy == ReclosePolicy::Reject {
            return Err(LedgerError::AlreadyClosed(session_id));
        }

        let closing = SessionClosing {
            closed_at: Utc::now().max(session.opened_at),
            closing_cash: input.closing_cash,
            closing_flexi_balance: input.closing_flexi_balance,
            notes: non_blank(input.notes),
        };

        let closed = self.store.close_session(session_id, closing, self.policy).await?;

        info!(
            session_id = %closed.id,
            user_id = %closed.user_id,
            closing_cash = %closed.closing_cash,
            reclosed = !session.is_open(),
            "Cash session closed"
        );

        Ok(closed)
    }

    /// The user's open session, if any.
    ///
    /// Storage should never hold more than one; if it does, the most recently
    /// opened wins and a warning is logged.
    pub async fn active_session_for(
        &self,
        user_id: UserId,
    ) -> Result<Option<CashSession>, LedgerError> {
        let open = self.store.open_sessions_for(user_id).await?;

        if open.len() > 1 {
            warn!(
                user_id = %user_id,
                open_sessions = open.len(),
                "User has more than one open session"
            );
        }

        Ok(open.into_iter().next())
    }

    /// Look up a session by ID, open or closed.
    pub async fn session(&self, session_id: CashSessionId) -> Result<CashSession, LedgerError> {
        self.store
            .find_session(session_id)
            .await?
            .ok_or(LedgerError::SessionNotFound(session_id))
    }

    /// A session with its entries and derived metrics.
    pub async fn session_detail(
        &self,
        session_id: CashSessionId,
    ) -> Result<SessionDetail, LedgerError> {
        let session = self.session(session_id).await?;
        let expenses = self.store.expenses_for(session_id).await?;
        let flexi_entries = self.store.flexi_entries_for(session_id).await?;
        let balance = SessionBalance::compute(&session, &expenses, &flexi_entries);

        Ok(SessionDetail {
            session,
            expenses,
            flexi_entries,
            balance,
        })
    }

    /// Sessions matching `filter`, most recently opened first.
    pub async fn sessions(&self, filter: SessionFilter) -> Result<Vec<CashSession>, LedgerError> {
        if filter.window.is_inverted() {
            return Ok(Vec::new());
        }
        self.store.sessions(filter).await
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
