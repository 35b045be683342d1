//! Common types used across the application.

pub mod id;
pub mod money;
pub mod pagination;
pub mod quantity;

pub use id::*;
pub use money::{Cents, MoneyError};
pub use pagination::{PageMeta, PageRequest, PageResponse};
pub use quantity::{Quantity, QuantityError};
