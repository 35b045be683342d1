//! Database layer with `SeaORM` entities and repositories.
//!
//! This crate provides:
//! - `SeaORM` entity definitions
//! - Repository implementations of the ledger, costing, session and
//!   reconciliation operations
//! - Database migrations

pub mod entities;
pub mod migration;
pub mod repositories;

mod error;

pub use repositories::{
    AccountRepository, ApprovalOutbox, ApprovalRoute, ChannelSettingsRepository, InventoryOptions,
    InventoryRepository, LedgerRepository, ReconciliationRepository, ResolutionOutcome,
    SessionRepository, StoredApprovalRequest,
};

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use tracing::info;

/// Establishes a connection pool to the database.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn connect(
    database_url: &str,
    max_connections: u32,
    min_connections: u32,
) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url);
    options
        .max_connections(max_connections)
        .min_connections(min_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);

    let db = Database::connect(options).await?;
    info!(max_connections, "Database connected");
    Ok(db)
}
