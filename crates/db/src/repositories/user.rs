//! User repository for database operations.

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use uuid::Uuid;

use crate::entities::{cash_sessions, expenses, flexi_entries, users};
use tally_core::ledger::{NewUser, UserChanges};

/// User repository for CRUD operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    /// Creates a new user repository.
    #[must_use]
    pub const fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    /// Finds a user by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_username(&self, username: &str) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find()
            .filter(users::Column::Username.eq(username))
            .one(&self.db)
            .await
    }

    /// Finds a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<users::Model>, DbErr> {
        users::Entity::find_by_id(id).one(&self.db).await
    }

    /// Finds several users by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn find_many(&self, ids: Vec<Uuid>) -> Result<Vec<users::Model>, DbErr> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        users::Entity::find()
            .filter(users::Column::Id.is_in(ids))
            .all(&self.db)
            .await
    }

    /// Lists all users ordered by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database query fails.
    pub async fn list(&self) -> Result<Vec<users::Model>, DbErr> {
        users::Entity::find()
            .order_by_asc(users::Column::Username)
            .all(&self.db)
            .await
    }

    /// Creates a new active user.
    ///
    /// # Errors
    ///
    /// Returns an error if the database insert fails, including a unique
    /// violation on `username`.
    pub async fn create(&self, new: NewUser) -> Result<users::Model, DbErr> {
        let now = Utc::now().into();
        let user = users::ActiveModel {
            id: Set(new.id.into_inner()),
            username: Set(new.username),
            password_hash: Set(new.password_hash),
            display_name: Set(new.display_name),
            role: Set(new.role.into()),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };

        user.insert(&self.db).await
    }

    /// Applies a partial update. Returns `None` if the user does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the database update fails.
    pub async fn update(
        &self,
        id: Uuid,
        changes: UserChanges,
    ) -> Result<Option<users::Model>, DbErr> {
        let Some(existing) = self.find_by_id(id).await? else {
            return Ok(None);
        };

        let mut user: users::ActiveModel = existing.into();
        if let Some(hash) = changes.password_hash {
            user.password_hash = Set(hash);
        }
        if let Some(role) = changes.role {
            user.role = Set(role.into());
        }
        if let Some(display_name) = changes.display_name {
            user.display_name = Set(display_name);
        }
        if let Some(is_active) = changes.is_active {
            user.is_active = Set(is_active);
        }
        user.updated_at = Set(Utc::now().into());

        user.update(&self.db).await.map(Some)
    }

    /// Deletes a user together with their sessions and entries.
    ///
    /// The foreign keys cascade as well; deleting explicitly keeps the
    /// behaviour identical on backends with foreign keys switched off.
    ///
    /// # Errors
    ///
    /// Returns an error if any delete fails; nothing is removed in that case.
    pub async fn delete(&self, id: Uuid) -> Result<bool, DbErr> {
        let txn = self.db.begin().await?;

        let session_ids: Vec<Uuid> = cash_sessions::Entity::find()
            .filter(cash_sessions::Column::UserId.eq(id))
            .all(&txn)
            .await?
            .into_iter()
            .map(|s| s.id)
            .collect();

        if !session_ids.is_empty() {
            expenses::Entity::delete_many()
                .filter(expenses::Column::SessionId.is_in(session_ids.clone()))
                .exec(&txn)
                .await?;
            flexi_entries::Entity::delete_many()
                .filter(flexi_entries::Column::SessionId.is_in(session_ids))
                .exec(&txn)
                .await?;
            cash_sessions::Entity::delete_many()
                .filter(cash_sessions::Column::UserId.eq(id))
                .exec(&txn)
                .await?;
        }

        let result = users::Entity::delete_by_id(id).exec(&txn).await?;
        txn.commit().await?;

        Ok(result.rows_affected > 0)
    }
}
