//! Cash sessions table.
//!
//! The partial unique index allows at most one open session per user; a
//! racing second open fails with a unique violation.

use sea_orm_migration::prelude::*;

use super::m20260301_000001_users::Users;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CashSessions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(CashSessions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(CashSessions::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(CashSessions::OpenedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(CashSessions::ClosedAt).timestamp_with_time_zone())
                    .col(money(CashSessions::OpeningCash))
                    .col(money(CashSessions::ClosingCash))
                    .col(money(CashSessions::OpeningFlexiBalance))
                    .col(money(CashSessions::ClosingFlexiBalance))
                    .col(ColumnDef::new(CashSessions::Notes).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_cash_sessions_user")
                            .from(CashSessions::Table, CashSessions::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cash_sessions_opened_at")
                    .table(CashSessions::Table)
                    .col(CashSessions::OpenedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_cash_sessions_user")
                    .table(CashSessions::Table)
                    .col(CashSessions::UserId)
                    .col(CashSessions::OpenedAt)
                    .to_owned(),
            )
            .await?;

        // sea-query has no partial-index builder.
        manager
            .get_connection()
            .execute_unprepared(
                "CREATE UNIQUE INDEX uq_cash_sessions_one_open \
                 ON cash_sessions (user_id) WHERE closed_at IS NULL",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CashSessions::Table).to_owned())
            .await
    }
}

fn money(col: CashSessions) -> ColumnDef {
    ColumnDef::new(col).decimal_len(19, 4).not_null().to_owned()
}

#[derive(DeriveIden, Clone, Copy)]
pub(super) enum CashSessions {
    Table,
    Id,
    UserId,
    OpenedAt,
    ClosedAt,
    OpeningCash,
    ClosingCash,
    OpeningFlexiBalance,
    ClosingFlexiBalance,
    Notes,
}
