//! Expense and flexi entry tables.

use sea_orm_migration::prelude::*;

use super::m20260301_000002_cash_sessions::CashSessions;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Expenses::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Expenses::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Expenses::SessionId).uuid().not_null())
                    .col(ColumnDef::new(Expenses::Amount).decimal_len(19, 4).not_null())
                    .col(ColumnDef::new(Expenses::Description).text().not_null())
                    .col(
                        ColumnDef::new(Expenses::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(Expr::col(Expenses::Amount).gte(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_expenses_session")
                            .from(Expenses::Table, Expenses::SessionId)
                            .to(CashSessions::Table, CashSessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(FlexiEntries::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(FlexiEntries::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(FlexiEntries::SessionId).uuid().not_null())
                    .col(
                        ColumnDef::new(FlexiEntries::Amount)
                            .decimal_len(19, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(FlexiEntries::IsSettled)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(FlexiEntries::Notes).text())
                    .col(
                        ColumnDef::new(FlexiEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .check(Expr::col(FlexiEntries::Amount).gte(0))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_flexi_entries_session")
                            .from(FlexiEntries::Table, FlexiEntries::SessionId)
                            .to(CashSessions::Table, CashSessions::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_expenses_session")
                    .table(Expenses::Table)
                    .col(Expenses::SessionId)
                    .col(Expenses::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_expenses_created_at")
                    .table(Expenses::Table)
                    .col(Expenses::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_flexi_entries_session")
                    .table(FlexiEntries::Table)
                    .col(FlexiEntries::SessionId)
                    .col(FlexiEntries::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_flexi_entries_created_at")
                    .table(FlexiEntries::Table)
                    .col(FlexiEntries::CreatedAt)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(FlexiEntries::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Expenses::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum Expenses {
    Table,
    Id,
    SessionId,
    Amount,
    Description,
    CreatedAt,
}

#[derive(DeriveIden)]
enum FlexiEntries {
    Table,
    Id,
    SessionId,
    Amount,
    IsSettled,
    Notes,
    CreatedAt,
}
