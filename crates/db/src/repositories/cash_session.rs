//! Cash session repository for database operations.

use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Select, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::cash_sessions;
use tally_core::ledger::{NewCashSession, SessionClosing, SessionFilter};

/// Cash session repository.
#[derive(Debug, Clone)]
pub struct CashSessionRepository {
    db: DatabaseConnection,
}

impl CashSessionRepository {
    /// Creates a new cash session repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a session by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<cash_sessions::Model>, DbErr> {
        cash_sessions::Entity::find_by_id(id).one(&self.db).await
    }

    /// Open sessions of a user, most recently opened first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_open_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<cash_sessions::Model>, DbErr> {
        cash_sessions::Entity::find()
            .filter(cash_sessions::Column::UserId.eq(user_id))
            .filter(cash_sessions::Column::ClosedAt.is_null())
            .order_by_desc(cash_sessions::Column::OpenedAt)
            .order_by_desc(cash_sessions::Column::Id)
            .all(&self.db)
            .await
    }

    /// Inserts a session inside a transaction unless the user already has an
    /// open one. Returns `None` when an open session exists.
    ///
    /// A concurrent insert that slips past the check trips the partial unique
    /// index instead and surfaces as a unique-violation `DbErr`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub async fn insert_if_none_open(
        &self,
        new: NewCashSession,
    ) -> Result<Option<cash_sessions::Model>, DbErr> {
        let txn = self.db.begin().await?;

        let open = cash_sessions::Entity::find()
            .filter(cash_sessions::Column::UserId.eq(new.user_id.into_inner()))
            .filter(cash_sessions::Column::ClosedAt.is_null())
            .count(&txn)
            .await?;

        if open > 0 {
            txn.rollback().await?;
            return Ok(None);
        }

        let session = cash_sessions::ActiveModel {
            id: Set(new.id.into_inner()),
            user_id: Set(new.user_id.into_inner()),
            opened_at: Set(new.opened_at.into()),
            closed_at: Set(None),
            opening_cash: Set(new.opening_cash),
            closing_cash: Set(new.opening_cash),
            opening_flexi_balance: Set(new.opening_flexi_balance),
            closing_flexi_balance: Set(new.opening_flexi_balance),
            notes: Set(new.notes),
        }
        .insert(&txn)
        .await?;

        txn.commit().await?;
        Ok(Some(session))
    }

    /// Writes closing fields. With `only_if_open` the update is conditional on
    /// `closed_at IS NULL`. Returns the number of rows changed.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn close(
        &self,
        id: Uuid,
        closing: SessionClosing,
        only_if_open: bool,
    ) -> Result<u64, DbErr> {
        let closed_at: sea_orm::prelude::DateTimeWithTimeZone = closing.closed_at.into();

        let mut update = cash_sessions::Entity::update_many()
            .col_expr(cash_sessions::Column::ClosedAt, Expr::value(closed_at))
            .col_expr(cash_sessions::Column::ClosingCash, Expr::value(closing.closing_cash))
            .col_expr(
                cash_sessions::Column::ClosingFlexiBalance,
                Expr::value(closing.closing_flexi_balance),
            );
        if let Some(notes) = closing.notes {
            update = update.col_expr(cash_sessions::Column::Notes, Expr::value(notes));
        }

        let mut update = update.filter(cash_sessions::Column::Id.eq(id));
        if only_if_open {
            update = update.filter(cash_sessions::Column::ClosedAt.is_null());
        }

        Ok(update.exec(&self.db).await?.rows_affected)
    }

    /// Sessions matching the filter, most recently opened first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self, filter: SessionFilter) -> Result<Vec<cash_sessions::Model>, DbErr> {
        filtered(filter)
            .order_by_desc(cash_sessions::Column::OpenedAt)
            .order_by_desc(cash_sessions::Column::Id)
            .all(&self.db)
            .await
    }
}

fn filtered(filter: SessionFilter) -> Select<cash_sessions::Entity> {
    let mut query = cash_sessions::Entity::find();
    if let Some(user_id) = filter.user_id {
        query = query.filter(cash_sessions::Column::UserId.eq(user_id.into_inner()));
    }
    if let Some(from) = filter.window.from {
        query = query.filter(cash_sessions::Column::OpenedAt.gte(timestamp(from)));
    }
    if let Some(to) = filter.window.to {
        query = query.filter(cash_sessions::Column::OpenedAt.lte(timestamp(to)));
    }
    query
}

/// Converts to the column type so comparisons bind the same representation
/// the rows were written with.
pub(crate) fn timestamp(at: DateTime<Utc>) -> sea_orm::prelude::DateTimeWithTimeZone {
    at.into()
}
