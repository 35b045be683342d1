//! `SeaORM` entity definitions.

pub mod accounts;
pub mod approval_requests;
pub mod cashier_sessions;
pub mod channel_settings;
pub mod inventory_batches;
pub mod inventory_movements;
pub mod journal_entries;
pub mod journal_line_tags;
pub mod journal_lines;
pub mod reconciliation_accounts;
pub mod reconciliations;
pub mod sale_cogs;
pub mod sea_orm_active_enums;
