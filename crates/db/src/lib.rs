//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repository abstractions for data access
//! - `SeaOrmStore`, the database implementation of `CashRegisterStore`
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod repositories;
pub mod store;

pub use repositories::{CashSessionRepository, EntryRepository, UserRepository};
pub use store::SeaOrmStore;

use std::time::Duration;

use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr};
use sea_orm_migration::MigratorTrait;
use tally_shared::config::DatabaseConfig;

/// Establishes a pooled connection with explicit pool bounds.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_with(
    database_url: &str,
    max_connections: u32,
    min_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    Database::connect(pool_options(database_url, max_connections, min_connections)).await
}

fn pool_options(database_url: &str, max_connections: u32, min_connections: u32) -> ConnectOptions {
    let mut options = ConnectOptions::new(database_url.to_owned());
    options
        .max_connections(max_connections)
        .min_connections(min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    options
}

/// Connects with the `search_path` pinned to `schema`, creating the schema
/// if it does not exist yet.
///
/// Lets several ledgers share one Postgres database, one schema each.
/// Migrations are not applied here; call [`migrate`] afterwards.
///
/// # Errors
///
/// Returns an error if the schema name is not a plain identifier, or if
/// connecting or creating the schema fails.
pub async fn connect_to_schema(
    database_url: &str,
    schema: &str,
    max_connections: u32,
    min_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    if schema.is_empty() || !schema.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(DbErr::Custom(format!("invalid schema name: {schema}")));
    }

    let bootstrap = Database::connect(database_url).await?;
    bootstrap
        .execute_unprepared(&format!("CREATE SCHEMA IF NOT EXISTS {schema}"))
        .await?;
    bootstrap.close().await?;

    let mut options = pool_options(database_url, max_connections, min_connections);
    options.set_schema_search_path(schema.to_owned());
    Database::connect(options).await
}

/// Connects using the pool bounds and optional schema from configuration.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect_configured(config: &DatabaseConfig) -> Result<DatabaseConnection, DbErr> {
    match config.schema.as_deref() {
        Some(schema) => {
            connect_to_schema(&config.url, schema, config.max_connections, config.min_connections)
                .await
        }
        None => connect_with(&config.url, config.max_connections, config.min_connections).await,
    }
}

/// Applies every pending migration.
///
/// # Errors
///
/// Returns an error if a migration fails.
pub async fn migrate(db: &DatabaseConnection) -> Result<(), DbErr> {
    migration::Migrator::up(db, None).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_connect_to_schema_rejects_unsafe_names() {
        for schema in ["", "tally; DROP TABLE users", "\"quoted\"", "with space"] {
            let err = connect_to_schema("postgres://localhost/unused", schema, 1, 1)
                .await
                .unwrap_err();
            assert!(matches!(err, DbErr::Custom(_)), "{schema}");
        }
    }
}
