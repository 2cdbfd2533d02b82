//! `CashRegisterStore` backed by SeaORM.
//!
//! Wraps the repositories and maps rows and `DbErr`s into domain types and
//! `LedgerError`s.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::{DatabaseConnection, DbErr, SqlErr};
use tally_core::auth::{User, UserCredentials};
use tally_core::ledger::{
    CashRegisterStore, CashSession, Expense, FlexiEntry, FlexiFilter, LedgerError, NewCashSession,
    NewExpense, NewFlexiEntry, NewUser, ReclosePolicy, SessionClosing, SessionFilter,
    SessionSnapshot, UserChanges,
};
use tally_shared::types::{CashSessionId, ExpenseId, FlexiEntryId, UserId};
use tracing::debug;
use uuid::Uuid;

use crate::entities::{cash_sessions, expenses, flexi_entries, users};
use crate::repositories::{CashSessionRepository, EntryRepository, UserRepository};

/// Database-backed store for users, sessions, and entries.
#[derive(Debug, Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
    users: UserRepository,
    sessions: CashSessionRepository,
    entries: EntryRepository,
}

impl SeaOrmStore {
    /// Creates a store over a connection pool.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            users: UserRepository::new(db.clone()),
            sessions: CashSessionRepository::new(db.clone()),
            entries: EntryRepository::new(db.clone()),
            db,
        }
    }

    /// Checks that the database answers.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection is unusable.
    pub async fn ping(&self) -> Result<(), DbErr> {
        self.db.ping().await
    }

    async fn require_session(&self, id: CashSessionId) -> Result<CashSession, LedgerError> {
        self.sessions
            .find_by_id(id.into_inner())
            .await
            .map_err(storage)?
            .map(session_to_domain)
            .ok_or(LedgerError::SessionNotFound(id))
    }
}

impl CashRegisterStore for SeaOrmStore {
    async fn find_user(&self, id: UserId) -> Result<Option<User>, LedgerError> {
        let user = self.users.find_by_id(id.into_inner()).await.map_err(storage)?;
        Ok(user.map(user_to_domain))
    }

    async fn find_credentials(
        &self,
        username: &str,
    ) -> Result<Option<UserCredentials>, LedgerError> {
        let user = self.users.find_by_username(username).await.map_err(storage)?;
        Ok(user.map(|m| {
            let password_hash = m.password_hash.clone();
            UserCredentials {
                user: user_to_domain(m),
                password_hash,
            }
        }))
    }

    async fn list_users(&self) -> Result<Vec<User>, LedgerError> {
        let users = self.users.list().await.map_err(storage)?;
        Ok(users.into_iter().map(user_to_domain).collect())
    }

    async fn insert_user(&self, user: NewUser) -> Result<User, LedgerError> {
        let username = user.username.clone();
        match self.users.create(user).await {
            Ok(model) => Ok(user_to_domain(model)),
            Err(e) if is_unique_violation(&e) => Err(LedgerError::UsernameTaken(username)),
            Err(e) => Err(storage(e)),
        }
    }

    async fn update_user(
        &self,
        id: UserId,
        changes: UserChanges,
    ) -> Result<Option<User>, LedgerError> {
        let user = self
            .users
            .update(id.into_inner(), changes)
            .await
            .map_err(storage)?;
        Ok(user.map(user_to_domain))
    }

    async fn delete_user(&self, id: UserId) -> Result<bool, LedgerError> {
        self.users.delete(id.into_inner()).await.map_err(storage)
    }

    async fn find_session(&self, id: CashSessionId) -> Result<Option<CashSession>, LedgerError> {
        let session = self.sessions.find_by_id(id.into_inner()).await.map_err(storage)?;
        Ok(session.map(session_to_domain))
    }

    async fn open_sessions_for(&self, user_id: UserId) -> Result<Vec<CashSession>, LedgerError> {
        let sessions = self
            .sessions
            .find_open_for_user(user_id.into_inner())
            .await
            .map_err(storage)?;
        Ok(sessions.into_iter().map(session_to_domain).collect())
    }

    async fn insert_session_if_none_open(
        &self,
        session: NewCashSession,
    ) -> Result<CashSession, LedgerError> {
        let user_id = session.user_id;
        match self.sessions.insert_if_none_open(session).await {
            Ok(Some(model)) => Ok(session_to_domain(model)),
            Ok(None) => Err(LedgerError::SessionConflict(user_id)),
            Err(e) if is_unique_violation(&e) => {
                debug!(user_id = %user_id, "Open-session index rejected concurrent open");
                Err(LedgerError::SessionConflict(user_id))
            }
            Err(e) if is_foreign_key_violation(&e) => Err(LedgerError::UserNotFound(user_id)),
            Err(e) => Err(storage(e)),
        }
    }

    async fn close_session(
        &self,
        id: CashSessionId,
        closing: SessionClosing,
        policy: ReclosePolicy,
    ) -> Result<CashSession, LedgerError> {
        let only_if_open = policy == ReclosePolicy::Reject;
        let updated = self
            .sessions
            .close(id.into_inner(), closing, only_if_open)
            .await
            .map_err(storage)?;

        let session = self.require_session(id).await?;
        if updated == 0 {
            // The row exists, so the conditional update lost to an earlier close.
            return Err(LedgerError::AlreadyClosed(id));
        }
        Ok(session)
    }

    async fn sessions(&self, filter: SessionFilter) -> Result<Vec<CashSession>, LedgerError> {
        let sessions = self.sessions.list(filter).await.map_err(storage)?;
        Ok(sessions.into_iter().map(session_to_domain).collect())
    }

    async fn session_snapshots(
        &self,
        filter: SessionFilter,
    ) -> Result<Vec<SessionSnapshot>, LedgerError> {
        let sessions = self.sessions.list(filter).await.map_err(storage)?;
        if sessions.is_empty() {
            return Ok(Vec::new());
        }

        let mut owner_ids: Vec<Uuid> = sessions.iter().map(|s| s.user_id).collect();
        owner_ids.sort_unstable();
        owner_ids.dedup();
        let session_ids: Vec<Uuid> = sessions.iter().map(|s| s.id).collect();

        let owners: HashMap<Uuid, User> = self
            .users
            .find_many(owner_ids)
            .await
            .map_err(storage)?
            .into_iter()
            .map(|m| (m.id, user_to_domain(m)))
            .collect();

        let mut expenses_by_session: HashMap<Uuid, Vec<Expense>> = HashMap::new();
        for model in self
            .entries
            .expenses_for_sessions(session_ids.clone())
            .await
            .map_err(storage)?
        {
            expenses_by_session
                .entry(model.session_id)
                .or_default()
                .push(expense_to_domain(model));
        }

        let mut flexi_by_session: HashMap<Uuid, Vec<FlexiEntry>> = HashMap::new();
        for model in self
            .entries
            .flexi_for_sessions(session_ids)
            .await
            .map_err(storage)?
        {
            flexi_by_session
                .entry(model.session_id)
                .or_default()
                .push(flexi_to_domain(model));
        }

        Ok(sessions
            .into_iter()
            .filter_map(|model| {
                let owner = owners.get(&model.user_id)?.clone();
                Some(SessionSnapshot {
                    expenses: expenses_by_session.remove(&model.id).unwrap_or_default(),
                    flexi_entries: flexi_by_session.remove(&model.id).unwrap_or_default(),
                    owner,
                    session: session_to_domain(model),
                })
            })
            .collect())
    }

    async fn insert_expense(&self, expense: NewExpense) -> Result<Expense, LedgerError> {
        let session_id = expense.session_id;
        match self.entries.insert_expense(expense).await {
            Ok(model) => Ok(expense_to_domain(model)),
            Err(e) if is_foreign_key_violation(&e) => Err(LedgerError::SessionNotFound(session_id)),
            Err(e) => Err(storage(e)),
        }
    }

    async fn insert_flexi(&self, entry: NewFlexiEntry) -> Result<FlexiEntry, LedgerError> {
        let session_id = entry.session_id;
        match self.entries.insert_flexi(entry).await {
            Ok(model) => Ok(flexi_to_domain(model)),
            Err(e) if is_foreign_key_violation(&e) => Err(LedgerError::SessionNotFound(session_id)),
            Err(e) => Err(storage(e)),
        }
    }

    async fn expenses_for(&self, session_id: CashSessionId) -> Result<Vec<Expense>, LedgerError> {
        let models = self
            .entries
            .expenses_for_sessions(vec![session_id.into_inner()])
            .await
            .map_err(storage)?;
        Ok(models.into_iter().map(expense_to_domain).collect())
    }

    async fn flexi_entries_for(
        &self,
        session_id: CashSessionId,
    ) -> Result<Vec<FlexiEntry>, LedgerError> {
        let models = self
            .entries
            .flexi_for_sessions(vec![session_id.into_inner()])
            .await
            .map_err(storage)?;
        Ok(models.into_iter().map(flexi_to_domain).collect())
    }

    async fn flexi_entries(&self, filter: FlexiFilter) -> Result<Vec<FlexiEntry>, LedgerError> {
        let models = self.entries.flexi_filtered(filter).await.map_err(storage)?;
        Ok(models.into_iter().map(flexi_to_domain).collect())
    }

    async fn recent_expenses(
        &self,
        user_id: Option<UserId>,
        limit: u64,
    ) -> Result<Vec<Expense>, LedgerError> {
        let models = self
            .entries
            .recent_expenses(user_id.map(UserId::into_inner), limit)
            .await
            .map_err(storage)?;
        Ok(models.into_iter().map(expense_to_domain).collect())
    }
}

fn storage(err: DbErr) -> LedgerError {
    LedgerError::Storage(err.to_string())
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

fn is_foreign_key_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::ForeignKeyConstraintViolation(_)))
}

fn user_to_domain(model: users::Model) -> User {
    User {
        id: UserId::from_uuid(model.id),
        username: model.username,
        display_name: model.display_name,
        role: model.role.into(),
        is_active: model.is_active,
    }
}

fn session_to_domain(model: cash_sessions::Model) -> CashSession {
    CashSession {
        id: CashSessionId::from_uuid(model.id),
        user_id: UserId::from_uuid(model.user_id),
        opened_at: model.opened_at.with_timezone(&Utc),
        closed_at: model.closed_at.map(|at| at.with_timezone(&Utc)),
        opening_cash: model.opening_cash,
        closing_cash: model.closing_cash,
        opening_flexi_balance: model.opening_flexi_balance,
        closing_flexi_balance: model.closing_flexi_balance,
        notes: model.notes,
    }
}

fn expense_to_domain(model: expenses::Model) -> Expense {
    Expense {
        id: ExpenseId::from_uuid(model.id),
        session_id: CashSessionId::from_uuid(model.session_id),
        amount: model.amount,
        description: model.description,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

fn flexi_to_domain(model: flexi_entries::Model) -> FlexiEntry {
    FlexiEntry {
        id: FlexiEntryId::from_uuid(model.id),
        session_id: CashSessionId::from_uuid(model.session_id),
        amount: model.amount,
        is_settled: model.is_settled,
        notes: model.notes,
        created_at: model.created_at.with_timezone(&Utc),
    }
}
