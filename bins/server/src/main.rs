//! Remit API Server
//!
//! Serves gateway notifications for the ledger and health checks.

use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use remit_api::{AppState, create_router};
use remit_core::deposit::NotificationVerifier;
use remit_core::ledger::LedgerSettings;
use remit_db::{DepositRepository, ReportRepository, connect};
use remit_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "remit=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = connect(&config.database).await?;
    info!("Connected to database");

    let settings = LedgerSettings::from(&config.ledger);
    info!(
        fee_rate = %settings.fee_rate,
        min_transfer_amount = %settings.min_transfer_amount,
        max_conflict_retries = settings.max_conflict_retries,
        admins = config.admin.ids.len(),
        "Ledger configured"
    );

    if config.gateway.ipn_secret.is_empty() {
        warn!("gateway.ipn_secret is not set, every notification will be rejected");
    }

    let state = AppState {
        deposits: Arc::new(DepositRepository::new(db.clone(), settings)),
        reports: Arc::new(ReportRepository::new(db)),
        verifier: Arc::new(NotificationVerifier::from_config(&config.gateway)),
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
