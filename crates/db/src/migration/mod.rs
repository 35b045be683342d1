//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration and written with the
//! schema builder so they run on both PostgreSQL and SQLite.

pub use sea_orm_migration::prelude::*;

mod m20261014_000001_ledger;
mod m20261014_000002_inventory;
mod m20261014_000003_reconciliation;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261014_000001_ledger::Migration),
            Box::new(m20261014_000002_inventory::Migration),
            Box::new(m20261014_000003_reconciliation::Migration),
        ]
    }
}
