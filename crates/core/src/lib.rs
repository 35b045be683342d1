//! Core business logic for Tally.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! All domain types, validation rules, and calculations live here.
//!
//! # Modules
//!
//! - `ledger` - Channel-scoped double-entry posting rules and line metadata
//! - `costing` - FIFO allocation and cost-of-goods-sold computation
//! - `session` - Cashier session lifecycle per till
//! - `reconciliation` - Declared vs. expected snapshots and short/over adjustments
//! - `approval` - Outbound variance approval requests and inbound decisions
//! - `channel` - Per-channel policy settings

pub mod approval;
pub mod channel;
pub mod costing;
pub mod ledger;
pub mod reconciliation;
pub mod session;
