//! API route definitions.

use axum::{Router, middleware};

use crate::{AppState, middleware::actor_middleware};

pub mod accounts;
pub mod approvals;
pub mod entries;
pub mod health;
pub mod inventory;
pub mod reconciliations;
pub mod sessions;
pub mod settings;

/// Creates the API router.
///
/// Everything except the health check requires an actor identity.
pub fn api_routes() -> Router<AppState> {
    let protected_routes = Router::new()
        .merge(accounts::routes())
        .merge(entries::routes())
        .merge(inventory::routes())
        .merge(sessions::routes())
        .merge(reconciliations::routes())
        .merge(settings::routes())
        .merge(approvals::routes())
        .layer(middleware::from_fn(actor_middleware));

    Router::new()
        .merge(health::routes())
        .merge(protected_routes)
}
