//! HTTP middleware.

pub mod actor;

pub use actor::{CurrentActor, actor_middleware};
