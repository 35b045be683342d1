//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes for the ledger, costing, session and reconciliation operations
//! - Actor middleware reading the gateway's identity headers
//! - Domain error to JSON response mapping

pub mod error;
pub mod middleware;
pub mod routes;

#[cfg(test)]
mod test_support;

use std::sync::Arc;

use axum::Router;
use sea_orm::DatabaseConnection;
use tally_core::channel::ChannelSettings;
use tally_core::costing::OversellPolicy;
use tally_core::ledger::AccountCode;
use tally_db::{
    AccountRepository, ApprovalOutbox, ApprovalRoute, ChannelSettingsRepository, InventoryOptions,
    InventoryRepository, LedgerRepository, ReconciliationRepository, SessionRepository,
};
use tally_shared::types::Cents;
use tally_shared::{AppConfig, AppError};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: Arc<DatabaseConnection>,
    /// Chart of accounts.
    pub accounts: AccountRepository,
    /// Journal posting and balances.
    pub ledger: LedgerRepository,
    /// Per-channel policy settings.
    pub settings: ChannelSettingsRepository,
    /// FIFO costing.
    pub inventory: InventoryRepository,
    /// Cashier sessions.
    pub sessions: SessionRepository,
    /// Reconciliation snapshots and decisions.
    pub reconciliations: ReconciliationRepository,
    /// Approval request outbox.
    pub outbox: ApprovalOutbox,
}

impl AppState {
    /// Wires the repositories from configuration.
    ///
    /// # Errors
    ///
    /// Returns `Validation` if a configured account code or oversell policy
    /// is malformed.
    pub fn new(db: DatabaseConnection, config: &AppConfig) -> Result<Self, AppError> {
        let short_over = config_code(
            "ledger.short_over_account_code",
            &config.ledger.short_over_account_code,
        )?;
        let cogs = config_code("costing.cogs_account_code", &config.costing.cogs_account_code)?;
        let inventory_account = config_code(
            "costing.inventory_account_code",
            &config.costing.inventory_account_code,
        )?;
        let oversell = OversellPolicy::parse(&config.costing.default_oversell_policy).ok_or_else(|| {
            AppError::Validation(format!(
                "costing.default_oversell_policy: unknown policy {:?}",
                config.costing.default_oversell_policy
            ))
        })?;

        let defaults = ChannelSettings::defaults(
            Cents::new(config.reconciliation.default_variance_threshold_cents),
            oversell,
        );

        let accounts = AccountRepository::new(db.clone());
        let settings = ChannelSettingsRepository::new(db.clone(), defaults);
        let outbox = ApprovalOutbox::new(db.clone());
        let ledger = LedgerRepository::new(db.clone(), accounts.clone());
        let inventory = InventoryRepository::new(
            db.clone(),
            accounts.clone(),
            settings.clone(),
            InventoryOptions {
                max_allocation_retries: config.costing.max_allocation_retries,
                post_cogs_entries: config.costing.post_cogs_entries,
                cogs_account: cogs,
                inventory_account,
            },
        );
        let reconciliations = ReconciliationRepository::new(
            db.clone(),
            accounts.clone(),
            settings.clone(),
            ApprovalRoute::Outbox,
            short_over,
        );
        let sessions = SessionRepository::new(db.clone(), accounts.clone(), reconciliations.clone());

        Ok(Self {
            db: Arc::new(db),
            accounts,
            ledger,
            settings,
            inventory,
            sessions,
            reconciliations,
            outbox,
        })
    }
}

fn config_code(key: &str, value: &str) -> Result<AccountCode, AppError> {
    AccountCode::parse(value).map_err(|e| AppError::Validation(format!("{key}: {e}")))
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
