//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the application.
//! Every ledger-affecting operation runs in one database transaction.

pub mod account;
pub mod approval;
pub mod channel_settings;
pub mod inventory;
pub mod ledger;
pub mod reconciliation;
pub mod session;

pub use account::AccountRepository;
pub use approval::{ApprovalOutbox, ApprovalRoute, StoredApprovalRequest};
pub use channel_settings::ChannelSettingsRepository;
pub use inventory::{InventoryOptions, InventoryRepository};
pub use ledger::LedgerRepository;
pub use reconciliation::{ReconciliationRepository, ResolutionOutcome};
pub use session::SessionRepository;

use sea_orm::{
    AccessMode, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbBackend, DbErr, IsolationLevel,
    TransactionTrait,
};

/// Begins a transaction whose reads all see one snapshot.
///
/// Repeatable read on PostgreSQL. SQLite transactions are already serialized.
pub(crate) async fn begin_consistent(db: &DatabaseConnection) -> Result<DatabaseTransaction, DbErr> {
    match db.get_database_backend() {
        DbBackend::Postgres => {
            db.begin_with_config(Some(IsolationLevel::RepeatableRead), Some(AccessMode::ReadWrite))
                .await
        }
        _ => db.begin().await,
    }
}
