//! In-memory `CashRegisterStore`.
//!
//! Everything lives behind one `RwLock`, so each operation is atomic. Used by
//! the core test-suite and for embedding the ledger without a database.

use std::collections::HashMap;

use tally_shared::types::{CashSessionId, UserId};
use tokio::sync::RwLock;

use super::error::LedgerError;
use super::store::{
    CashRegisterStore, NewCashSession, NewExpense, NewFlexiEntry, NewUser, UserChanges,
};
use super::types::{
    CashSession, Expense, FlexiEntry, FlexiFilter, ReclosePolicy, SessionClosing, SessionFilter,
    SessionSnapshot,
};
use crate::auth::{User, UserCredentials, UserRole};

#[derive(Debug, Default)]
struct State {
    users: HashMap<UserId, UserCredentials>,
    sessions: Vec<CashSession>,
    expenses: Vec<Expense>,
    flexi: Vec<FlexiEntry>,
}

impl State {
    fn snapshot(&self, session: &CashSession) -> Option<SessionSnapshot> {
        let owner = self.users.get(&session.user_id)?.user.clone();
        Some(SessionSnapshot {
            session: session.clone(),
            owner,
            expenses: self
                .expenses
                .iter()
                .filter(|e| e.session_id == session.id)
                .cloned()
                .collect(),
            flexi_entries: self
                .flexi
                .iter()
                .filter(|f| f.session_id == session.id)
                .cloned()
                .collect(),
        })
    }

    fn has_session(&self, id: CashSessionId) -> bool {
        self.sessions.iter().any(|s| s.id == id)
    }

    /// Sessions matching `filter`, most recently opened first.
    fn matching_sessions(&self, filter: &SessionFilter) -> Vec<&CashSession> {
        let mut sessions: Vec<_> = self.sessions.iter().filter(|s| filter.matches(s)).collect();
        sessions.sort_by(|a, b| (b.opened_at, b.id.0).cmp(&(a.opened_at, a.id.0)));
        sessions
    }
}

/// A `CashRegisterStore` held entirely in memory.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an active user that cannot log in (no usable password hash).
    pub async fn seed_user(&self, username: &str, role: UserRole) -> User {
        let user = User {
            id: UserId::new(),
            username: username.to_string(),
            display_name: None,
            role,
            is_active: true,
        };
        self.state.write().await.users.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                password_hash: "!".to_string(),
            },
        );
        user
    }

    /// Insert a session row as-is, bypassing the open-session check.
    ///
    /// Lets tests reproduce storage states the ledger itself never creates.
    pub async fn insert_session_unchecked(&self, session: CashSession) {
        self.state.write().await.sessions.push(session);
    }
}

impl CashRegisterStore for InMemoryStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, LedgerError> {
        Ok(self.state.read().await.users.get(&id).map(|c| c.user.clone()))
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<UserCredentials>, LedgerError> {
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|c| c.user.username == username)
            .cloned())
    }

    async fn list_users(&self) -> Result<Vec<User>, LedgerError> {
        let state = self.state.read().await;
        let mut users: Vec<_> = state.users.values().map(|c| c.user.clone()).collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        Ok(users)
    }

    async fn insert_user(&self, new: NewUser) -> Result<User, LedgerError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|c| c.user.username == new.username) {
            return Err(LedgerError::UsernameTaken(new.username));
        }

        let user = User {
            id: new.id,
            username: new.username,
            display_name: new.display_name,
            role: new.role,
            is_active: true,
        };
        state.users.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                password_hash: new.password_hash,
            },
        );
        Ok(user)
    }

    async fn update_user(
        &self,
        id: UserId,
        changes: UserChanges,
    ) -> Result<Option<User>, LedgerError> {
        let mut state = self.state.write().await;
        let Some(stored) = state.users.get_mut(&id) else {
            return Ok(None);
        };

        if let Some(hash) = changes.password_hash {
            stored.password_hash = hash;
        }
        if let Some(role) = changes.role {
            stored.user.role = role;
        }
        if let Some(display_name) = changes.display_name {
            stored.user.display_name = display_name;
        }
        if let Some(is_active) = changes.is_active {
            stored.user.is_active = is_active;
        }
        Ok(Some(stored.user.clone()))
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, LedgerError> {
        let mut state = self.state.write().await;
        if state.users.remove(&id).is_none() {
            return Ok(false);
        }

        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut state.sessions)
            .into_iter()
            .partition(|s| s.user_id == id);
        state.sessions = kept;
        let removed: Vec<_> = removed.into_iter().map(|s| s.id).collect();
        state.expenses.retain(|e| !removed.contains(&e.session_id));
        state.flexi.retain(|f| !removed.contains(&f.session_id));
        Ok(true)
    }

    async fn find_session(&self, id: CashSessionId) -> Result<Option<CashSession>, LedgerError> {
        Ok(self
            .state
            .read()
            .await
            .sessions
            .iter()
            .find(|s| s.id == id)
            .cloned())
    }

    async fn open_sessions_for(&self, user_id: UserId) -> Result<Vec<CashSession>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .matching_sessions(&SessionFilter::for_user(user_id, Default::default()))
            .into_iter()
            .filter(|s| s.is_open())
            .cloned()
            .collect())
    }

    async fn insert_session_if_none_open(
        &self,
        new: NewCashSession,
    ) -> Result<CashSession, LedgerError> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&new.user_id) {
            return Err(LedgerError::UserNotFound(new.user_id));
        }
        if state
            .sessions
            .iter()
            .any(|s| s.user_id == new.user_id && s.is_open())
        {
            return Err(LedgerError::SessionConflict(new.user_id));
        }

        let session = CashSession {
            id: new.id,
            user_id: new.user_id,
            opened_at: new.opened_at,
            closed_at: None,
            opening_cash: new.opening_cash,
            closing_cash: new.opening_cash,
            opening_flexi_balance: new.opening_flexi_balance,
            closing_flexi_balance: new.opening_flexi_balance,
            notes: new.notes,
        };
        state.sessions.push(session.clone());
        Ok(session)
    }

    async fn close_session(
        &self,
        id: CashSessionId,
        closing: SessionClosing,
        policy: ReclosePolicy,
    ) -> Result<CashSession, LedgerError> {
        let mut state = self.state.write().await;
        let session = state
            .sessions
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(LedgerError::SessionNotFound(id))?;

        if !session.is_open() && policy == ReclosePolicy::Reject {
            return Err(LedgerError::AlreadyClosed(id));
        }

        session.closed_at = Some(closing.closed_at);
        session.closing_cash = closing.closing_cash;
        session.closing_flexi_balance = closing.closing_flexi_balance;
        if closing.notes.is_some() {
            session.notes = closing.notes;
        }
        Ok(session.clone())
    }

    async fn sessions(&self, filter: SessionFilter) -> Result<Vec<CashSession>, LedgerError> {
        let state = self.state.read().await;
        Ok(state.matching_sessions(&filter).into_iter().cloned().collect())
    }

    async fn session_snapshots(
        &self,
        filter: SessionFilter,
    ) -> Result<Vec<SessionSnapshot>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .matching_sessions(&filter)
            .into_iter()
            .filter_map(|s| state.snapshot(s))
            .collect())
    }

    async fn insert_expense(&self, new: NewExpense) -> Result<Expense, LedgerError> {
        let mut state = self.state.write().await;
        if !state.has_session(new.session_id) {
            return Err(LedgerError::SessionNotFound(new.session_id));
        }

        let expense = Expense {
            id: new.id,
            session_id: new.session_id,
            amount: new.amount,
            description: new.description,
            created_at: new.created_at,
        };
        state.expenses.push(expense.clone());
        Ok(expense)
    }

    async fn insert_flexi(&self, new: NewFlexiEntry) -> Result<FlexiEntry, LedgerError> {
        let mut state = self.state.write().await;
        if !state.has_session(new.session_id) {
            return Err(LedgerError::SessionNotFound(new.session_id));
        }

        let entry = FlexiEntry {
            id: new.id,
            session_id: new.session_id,
            amount: new.amount,
            is_settled: new.is_settled,
            notes: new.notes,
            created_at: new.created_at,
        };
        state.flexi.push(entry.clone());
        Ok(entry)
    }

    async fn expenses_for(&self, session_id: CashSessionId) -> Result<Vec<Expense>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .expenses
            .iter()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn flexi_entries_for(
        &self,
        session_id: CashSessionId,
    ) -> Result<Vec<FlexiEntry>, LedgerError> {
        let state = self.state.read().await;
        Ok(state
            .flexi
            .iter()
            .filter(|f| f.session_id == session_id)
            .cloned()
            .collect())
    }

    async fn flexi_entries(&self, filter: FlexiFilter) -> Result<Vec<FlexiEntry>, LedgerError> {
        let state = self.state.read().await;
        let mut entries: Vec<_> = state
            .flexi
            .iter()
            .filter(|f| filter.matches(f))
            .cloned()
            .collect();
        entries.sort_by(|a, b| (b.created_at, b.id.0).cmp(&(a.created_at, a.id.0)));
        Ok(entries)
    }

    async fn recent_expenses(
        &self,
        user_id: Option<UserId>,
        limit: u64,
    ) -> Result<Vec<Expense>, LedgerError> {
        let state = self.state.read().await;
        let owned: Vec<CashSessionId> = state
            .sessions
            .iter()
            .filter(|s| user_id.is_none_or(|id| id == s.user_id))
            .map(|s| s.id)
            .collect();

        let mut expenses: Vec<_> = state
            .expenses
            .iter()
            .filter(|e| owned.contains(&e.session_id))
            .cloned()
            .collect();
        expenses.sort_by(|a, b| (b.created_at, b.id.0).cmp(&(a.created_at, a.id.0)));
        expenses.truncate(usize::try_from(limit).unwrap_or(usize::MAX));
        Ok(expenses)
    }
}
