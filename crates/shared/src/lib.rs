//! Shared types, errors, and configuration for Tally.
//!
//! This crate provides common types used across all other crates:
//! - Integer-cents money and fixed-point quantities
//! - Typed IDs for type-safe entity references
//! - Pagination types for list endpoints
//! - Pre-authenticated actor identity and capabilities
//! - Application-wide error types
//! - Configuration management

pub mod actor;
pub mod config;
pub mod error;
pub mod types;

pub use actor::{Actor, Capability};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
