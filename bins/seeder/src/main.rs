//! Seeds the initial supervisor account.
//!
//! Creates `admin` (password from `TALLY_ADMIN_PASSWORD`, default `admin`)
//! unless a user with that name already exists. Safe to run repeatedly.
//!
//! Usage: cargo run --bin seeder

use std::sync::Arc;

use anyhow::Context;
use tally_core::auth::{CreateUserInput, UserDirectory, UserRole};
use tally_core::ledger::CashRegisterStore;
use tally_db::{SeaOrmStore, connect_configured, migrate};
use tally_shared::AppConfig;
use tracing::{info, warn};

const ADMIN_USERNAME: &str = "admin";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=info,seeder=info".into()),
        )
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let db = connect_configured(&config.database)
        .await
        .context("Failed to connect to database")?;
    migrate(&db).await.context("Failed to apply migrations")?;

    let store = Arc::new(SeaOrmStore::new(db));
    if store.find_credentials(ADMIN_USERNAME).await?.is_some() {
        info!(username = ADMIN_USERNAME, "Supervisor already exists, skipping");
        return Ok(());
    }

    let password = std::env::var("TALLY_ADMIN_PASSWORD").unwrap_or_else(|_| {
        warn!("TALLY_ADMIN_PASSWORD not set, using the default password");
        "admin".to_string()
    });

    let user = UserDirectory::new(store)
        .create_user(CreateUserInput {
            username: ADMIN_USERNAME.to_string(),
            password,
            role: UserRole::Supervisor,
            display_name: Some("Administrator".to_string()),
        })
        .await?;

    info!(user_id = %user.id, "Seeded supervisor account");
    Ok(())
}
