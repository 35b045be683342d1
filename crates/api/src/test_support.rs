//! Router test harness over an in-memory database.

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode},
};
use http_body_util::BodyExt;
use serde_json::Value;
use tally_db::migration::{Migrator, MigratorTrait};
use tally_shared::config::{
    CostingConfig, DatabaseConfig, LedgerConfig, ReconciliationConfig, ServerConfig,
};
use tally_shared::types::{ActorId, ChannelId};
use tally_shared::AppConfig;
use tower::ServiceExt;

use crate::middleware::actor::{ACTOR_CAPABILITIES_HEADER, ACTOR_ID_HEADER};
use crate::{AppState, create_router};

/// Every capability the API checks.
pub const ALL_CAPABILITIES: &str =
    "manage_reconciliation,approve_variance,post_entries,manage_inventory";

pub fn test_config() -> AppConfig {
    AppConfig {
        server: ServerConfig::default(),
        database: DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
        },
        ledger: LedgerConfig::default(),
        reconciliation: ReconciliationConfig::default(),
        costing: CostingConfig::default(),
    }
}

/// A router over a migrated database with one seeded channel.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub channel: ChannelId,
    pub actor: ActorId,
}

impl TestApp {
    pub async fn new() -> Self {
        let config = test_config();
        let db = tally_db::connect(&config.database.url, 1, 1).await.unwrap();
        Migrator::up(&db, None).await.unwrap();

        let state = AppState::new(db, &config).unwrap();
        let channel = ChannelId::new();
        state.accounts.seed_defaults(channel).await.unwrap();

        Self {
            router: create_router(state.clone()),
            state,
            channel,
            actor: ActorId::new(),
        }
    }

    /// Sends a request as the test actor holding every capability.
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        self.send_as(method, uri, body, Some(ALL_CAPABILITIES)).await
    }

    /// Sends a request without any actor headers.
    pub async fn send_anonymous(&self, method: &str, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();
        let response = self.router.clone().oneshot(request).await.unwrap();
        read_json(response).await
    }

    /// Sends a request with the given capability header, if any.
    pub async fn send_as(
        &self,
        method: &str,
        uri: &str,
        body: Option<Value>,
        capabilities: Option<&str>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(ACTOR_ID_HEADER, self.actor.to_string());
        if let Some(capabilities) = capabilities {
            builder = builder.header(ACTOR_CAPABILITIES_HEADER, capabilities);
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        read_json(response).await
    }
}

pub async fn read_json(response: Response<Body>) -> (StatusCode, Value) {
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
