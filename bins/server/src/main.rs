//! Tally API Server
//!
//! Main entry point for the ledger and reconciliation service.

use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tally_api::{AppState, create_router};
use tally_db::connect;
use tally_shared::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tally=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::load()?;

    let db = connect(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;

    let state = AppState::new(db, &config)?;
    info!(
        short_over_account = %config.ledger.short_over_account_code,
        oversell_policy = %config.costing.default_oversell_policy,
        variance_threshold_cents = config.reconciliation.default_variance_threshold_cents,
        "Application state ready"
    );

    // Holds left without an approval request by an earlier gateway failure
    if let Err(err) = state.reconciliations.request_missing_approvals().await {
        warn!(error = %err, "Could not re-raise missing approval requests");
    }

    let app = create_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
