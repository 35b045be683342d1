//! Database seeder for Tally development and testing.
//!
//! Seeds a demo channel with the default chart of accounts, the configured
//! channel settings and one opening-stock batch.
//!
//! Usage: cargo run --bin seeder [channel-uuid]

use anyhow::Context;
use tally_api::AppState;
use tally_core::channel::ChannelSettings;
use tally_core::costing::{BatchMeta, BatchSource, RecordPurchaseInput};
use tally_shared::AppConfig;
use tally_shared::types::{Cents, ChannelId, Quantity, StockLocationId, VariantId};
use uuid::Uuid;

/// Demo channel id (consistent for all seeds)
const DEMO_CHANNEL_ID: Uuid = Uuid::from_u128(1);
/// Demo stock location id
const DEMO_LOCATION_ID: Uuid = Uuid::from_u128(2);
/// Demo product variant id
const DEMO_VARIANT_ID: Uuid = Uuid::from_u128(3);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load().context("loading configuration")?;
    let channel_id = match std::env::args().nth(1) {
        Some(raw) => raw.parse::<ChannelId>().context("channel id must be a UUID")?,
        None => ChannelId::from(DEMO_CHANNEL_ID),
    };

    println!("Connecting to database...");
    let db = tally_db::connect(
        &config.database.url,
        config.database.max_connections,
        config.database.min_connections,
    )
    .await?;
    let state = AppState::new(db, &config)?;

    println!("Seeding chart of accounts for channel {channel_id}...");
    let accounts = state.accounts.seed_defaults(channel_id).await?;
    for account in &accounts {
        let marker = if account.is_system_account { " (system)" } else { "" };
        println!("  {} - {}{marker}", account.code, account.name);
    }

    println!("Seeding channel settings...");
    let defaults: ChannelSettings = state.settings.defaults();
    state.settings.upsert(channel_id, defaults).await?;

    println!("Seeding opening stock...");
    seed_opening_stock(&state, channel_id).await?;

    println!("Seeding complete!");
    Ok(())
}

/// Receives ten units of the demo variant unless the shelf already has stock.
async fn seed_opening_stock(state: &AppState, channel_id: ChannelId) -> anyhow::Result<()> {
    let location = StockLocationId::from(DEMO_LOCATION_ID);
    let variant = VariantId::from(DEMO_VARIANT_ID);

    let existing = state
        .inventory
        .list_batches(channel_id, location, variant)
        .await?;
    if !existing.is_empty() {
        println!("  Opening stock already exists, skipping...");
        return Ok(());
    }

    let batch = state
        .inventory
        .record_purchase(RecordPurchaseInput {
            channel_id,
            variant_id: variant,
            stock_location_id: location,
            quantity: Quantity::units(10),
            unit_cost: Cents::new(450),
            batch: BatchMeta {
                source: BatchSource::OpeningStock,
                source_id: "seed".to_string(),
                expires_at: None,
            },
        })
        .await?;
    println!("  Batch {} at {} per unit", batch.id, batch.unit_cost);
    Ok(())
}
