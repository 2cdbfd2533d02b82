//! Tally API Server
//!
//! Main entry point for the cash register ledger service.

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tally_api::{AppState, create_router};
use tally_core::ledger::ReclosePolicy;
use tally_db::{SeaOrmStore, connect_configured, migrate};
use tally_shared::AppConfig;
use tally_shared::jwt::{JwtConfig, JwtService};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect_configured(&config.database)
        .await
        .context("Failed to connect to database")?;
    let schema = config.database.schema.as_deref().unwrap_or("public");
    info!(schema, "Connected to database");

    migrate(&db).await.context("Failed to apply migrations")?;
    info!("Migrations applied");

    let jwt_service = JwtService::new(JwtConfig::from(&config.jwt));
    let reclose_policy = ReclosePolicy::from_reject_flag(config.ledger.reject_reclose);
    info!(?reclose_policy, "Ledger configured");

    let state = AppState::new(SeaOrmStore::new(db), jwt_service, reclose_policy);
    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
