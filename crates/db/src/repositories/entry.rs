//! Expense and flexi entry repository.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, RelationTrait, Set,
};
use sea_orm::JoinType;
use uuid::Uuid;

use super::cash_session::timestamp;
use crate::entities::{cash_sessions, expenses, flexi_entries};
use tally_core::ledger::{FlexiFilter, NewExpense, NewFlexiEntry};

/// Journal entry repository.
#[derive(Debug, Clone)]
pub struct EntryRepository {
    db: DatabaseConnection,
}

impl EntryRepository {
    /// Creates a new entry repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Inserts an expense.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails, including a foreign-key violation
    /// when the session is gone.
    pub async fn insert_expense(&self, new: NewExpense) -> Result<expenses::Model, DbErr> {
        expenses::ActiveModel {
            id: Set(new.id.into_inner()),
            session_id: Set(new.session_id.into_inner()),
            amount: Set(new.amount),
            description: Set(new.description),
            created_at: Set(new.created_at.into()),
        }
        .insert(&self.db)
        .await
    }

    /// Inserts a flexi entry.
    ///
    /// # Errors
    ///
    /// Returns an error if the insert fails.
    pub async fn insert_flexi(&self, new: NewFlexiEntry) -> Result<flexi_entries::Model, DbErr> {
        flexi_entries::ActiveModel {
            id: Set(new.id.into_inner()),
            session_id: Set(new.session_id.into_inner()),
            amount: Set(new.amount),
            is_settled: Set(new.is_settled),
            notes: Set(new.notes),
            created_at: Set(new.created_at.into()),
        }
        .insert(&self.db)
        .await
    }

    /// Expenses of the given sessions in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn expenses_for_sessions(
        &self,
        session_ids: Vec<Uuid>,
    ) -> Result<Vec<expenses::Model>, DbErr> {
        if session_ids.is_empty() {
            return Ok(Vec::new());
        }
        expenses::Entity::find()
            .filter(expenses::Column::SessionId.is_in(session_ids))
            .order_by_asc(expenses::Column::CreatedAt)
            .order_by_asc(expenses::Column::Id)
            .all(&self.db)
            .await
    }

    /// Flexi entries of the given sessions in creation order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn flexi_for_sessions(
        &self,
        session_ids: Vec<Uuid>,
    ) -> Result<Vec<flexi_entries::Model>, DbErr> {
        if session_ids.is_empty() {
            return Ok(Vec::new());
        }
        flexi_entries::Entity::find()
            .filter(flexi_entries::Column::SessionId.is_in(session_ids))
            .order_by_asc(flexi_entries::Column::CreatedAt)
            .order_by_asc(flexi_entries::Column::Id)
            .all(&self.db)
            .await
    }

    /// Flexi entries by settled flag and `created_at` window, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn flexi_filtered(
        &self,
        filter: FlexiFilter,
    ) -> Result<Vec<flexi_entries::Model>, DbErr> {
        let mut query = flexi_entries::Entity::find();
        if let Some(is_settled) = filter.is_settled {
            query = query.filter(flexi_entries::Column::IsSettled.eq(is_settled));
        }
        if let Some(from) = filter.window.from {
            query = query.filter(flexi_entries::Column::CreatedAt.gte(timestamp(from)));
        }
        if let Some(to) = filter.window.to {
            query = query.filter(flexi_entries::Column::CreatedAt.lte(timestamp(to)));
        }

        query
            .order_by_desc(flexi_entries::Column::CreatedAt)
            .order_by_desc(flexi_entries::Column::Id)
            .all(&self.db)
            .await
    }

    /// Most recent expenses, optionally only from one user's sessions.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn recent_expenses(
        &self,
        user_id: Option<Uuid>,
        limit: u64,
    ) -> Result<Vec<expenses::Model>, DbErr> {
        let mut query = expenses::Entity::find();
        if let Some(user_id) = user_id {
            query = query
                .join(JoinType::InnerJoin, expenses::Relation::CashSessions.def())
                .filter(cash_sessions::Column::UserId.eq(user_id));
        }

        query
            .order_by_desc(expenses::Column::CreatedAt)
            .order_by_desc(expenses::Column::Id)
            .limit(limit)
            .all(&self.db)
            .await
    }
}
