//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration and target Postgres.
//! Money columns are `NUMERIC(19, 4)` so amounts round-trip exactly.

pub use sea_orm_migration::prelude::*;

mod m20260301_000001_users;
mod m20260301_000002_cash_sessions;
mod m20260301_000003_entries;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_users::Migration),
            Box::new(m20260301_000002_cash_sessions::Migration),
            Box::new(m20260301_000003_entries::Migration),
        ]
    }
}
