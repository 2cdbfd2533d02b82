//! `SeaORM` Entity for cash_sessions table.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq, Serialize, Deserialize)]
#[sea_orm(table_name = "cash_sessions")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub opened_at: DateTimeWithTimeZone,
    pub closed_at: Option<DateTimeWithTimeZone>,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub opening_cash: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub closing_cash: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub opening_flexi_balance: Decimal,
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub closing_flexi_balance: Decimal,
    pub notes: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    Users,
    #[sea_orm(has_many = "super::expenses::Entity")]
    Expenses,
    #[sea_orm(has_many = "super::flexi_entries::Entity")]
    FlexiEntries,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Users.def()
    }
}

impl Related<super::expenses::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Expenses.def()
    }
}

impl Related<super::flexi_entries::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::FlexiEntries.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
