//! Inventory purchase, sale and write-off routes.
//!
//! Quantities travel as decimals with at most one fractional digit; money is
//! always integer cents.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use tally_core::costing::service::MAX_REFERENCE_LEN;
use tally_core::costing::{
    BatchMeta, BatchSource, CostingError, InventoryBatch, RecordPurchaseInput, RecordSaleInput,
    RecordWriteOffInput, SaleCogs, SaleOutcome, WriteOffOutcome,
};
use tally_shared::types::{Cents, ChannelId, Quantity, StockLocationId, VariantId};

/// `MAX_REFERENCE_LEN` as the `u64` the validator length bound expects.
const MAX_REFERENCE_LEN_U64: u64 = MAX_REFERENCE_LEN as u64;
use tally_shared::{AppError, Capability};
use validator::Validate;

use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::CurrentActor;

/// Creates the inventory routes (requires the actor middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/channels/{channel_id}/purchases", post(record_purchase))
        .route("/channels/{channel_id}/sales", post(record_sale))
        .route("/channels/{channel_id}/write-offs", post(record_write_off))
        .route("/channels/{channel_id}/batches", get(list_batches))
        .route(
            "/channels/{channel_id}/sales/{order_id}/lines/{order_line_id}",
            get(get_sale_cogs),
        )
}

/// Request body for received stock.
#[derive(Debug, Deserialize, Validate)]
pub struct PurchaseRequest {
    /// Product variant.
    pub variant_id: VariantId,
    /// Where the stock is held.
    pub stock_location_id: StockLocationId,
    /// Units received.
    pub quantity: Decimal,
    /// Cost per unit in cents.
    pub unit_cost_cents: i64,
    /// What created the batch. Defaults to a purchase.
    pub source: Option<BatchSource>,
    /// Id of the receiving document.
    #[validate(length(min = 1, max = MAX_REFERENCE_LEN_U64))]
    pub source_id: String,
    /// Expiry of the stock, if perishable.
    pub expires_at: Option<DateTime<Utc>>,
}

/// Request body for a sold order line.
#[derive(Debug, Deserialize)]
pub struct SaleRequest {
    /// Product variant.
    pub variant_id: VariantId,
    /// Where the stock is taken from.
    pub stock_location_id: StockLocationId,
    /// Units sold.
    pub quantity: Decimal,
    /// Order id.
    pub order_id: String,
    /// Order line id.
    pub order_line_id: String,
    /// Business time of the sale. Defaults to now.
    pub sale_date: Option<DateTime<Utc>>,
    /// Catalog wholesale price per unit, used to estimate oversold units.
    pub wholesale_price_cents: Option<i64>,
}

/// Request body for a stock write-off.
#[derive(Debug, Deserialize, Validate)]
pub struct WriteOffRequest {
    /// Product variant.
    pub variant_id: VariantId,
    /// Where the stock is removed from.
    pub stock_location_id: StockLocationId,
    /// Units removed.
    pub quantity: Decimal,
    /// Why the stock is removed.
    #[validate(length(min = 1, max = MAX_REFERENCE_LEN_U64))]
    pub reason: String,
}

/// Query parameters for a batch listing.
#[derive(Debug, Deserialize)]
pub struct BatchQuery {
    /// Product variant.
    pub variant_id: VariantId,
    /// Stock location.
    pub stock_location_id: StockLocationId,
}

fn quantity(value: Decimal) -> Result<Quantity, CostingError> {
    Ok(Quantity::from_decimal(value)?)
}

/// POST `/channels/{channel_id}/purchases` - Receive stock as a new batch.
async fn record_purchase(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(channel_id): Path<ChannelId>,
    Json(body): Json<PurchaseRequest>,
) -> ApiResult<(StatusCode, Json<InventoryBatch>)> {
    actor.require(Capability::ManageInventory)?;
    body.validate()?;

    let batch = state
        .inventory
        .record_purchase(RecordPurchaseInput {
            channel_id,
            variant_id: body.variant_id,
            stock_location_id: body.stock_location_id,
            quantity: quantity(body.quantity)?,
            unit_cost: Cents::new(body.unit_cost_cents),
            batch: BatchMeta {
                source: body.source.unwrap_or(BatchSource::Purchase),
                source_id: body.source_id,
                expires_at: body.expires_at,
            },
        })
        .await?;

    Ok((StatusCode::CREATED, Json(batch)))
}

/// POST `/channels/{channel_id}/sales` - Cost a sold order line.
///
/// Replays of an already-costed line answer 200 with the stored result.
async fn record_sale(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(channel_id): Path<ChannelId>,
    Json(body): Json<SaleRequest>,
) -> ApiResult<(StatusCode, Json<SaleOutcome>)> {
    actor.require(Capability::ManageInventory)?;

    let outcome = state
        .inventory
        .record_sale(RecordSaleInput {
            channel_id,
            variant_id: body.variant_id,
            stock_location_id: body.stock_location_id,
            quantity: quantity(body.quantity)?,
            order_id: body.order_id,
            order_line_id: body.order_line_id,
            sale_date: body.sale_date,
            wholesale_price: body.wholesale_price_cents.map(Cents::new),
        })
        .await?;

    let status = if outcome.replayed {
        StatusCode::OK
    } else {
        StatusCode::CREATED
    };
    Ok((status, Json(outcome)))
}

/// POST `/channels/{channel_id}/write-offs` - Remove damaged or lost stock.
async fn record_write_off(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(channel_id): Path<ChannelId>,
    Json(body): Json<WriteOffRequest>,
) -> ApiResult<(StatusCode, Json<WriteOffOutcome>)> {
    actor.require(Capability::ManageInventory)?;
    body.validate()?;

    let outcome = state
        .inventory
        .record_write_off(RecordWriteOffInput {
            channel_id,
            variant_id: body.variant_id,
            stock_location_id: body.stock_location_id,
            quantity: quantity(body.quantity)?,
            reason: body.reason,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET `/channels/{channel_id}/batches` - Batches of a variant at a location.
async fn list_batches(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(channel_id): Path<ChannelId>,
    Query(query): Query<BatchQuery>,
) -> ApiResult<Json<Vec<InventoryBatch>>> {
    Ok(Json(
        state
            .inventory
            .list_batches(channel_id, query.stock_location_id, query.variant_id)
            .await?,
    ))
}

/// GET `/channels/{channel_id}/sales/{order_id}/lines/{order_line_id}` - Stored COGS.
async fn get_sale_cogs(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path((channel_id, order_id, order_line_id)): Path<(ChannelId, String, String)>,
) -> ApiResult<Json<SaleCogs>> {
    let sale = state
        .inventory
        .get_sale_cogs(channel_id, &order_id, &order_line_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("sale {order_id}/{order_line_id}")))?;

    Ok(Json(sale))
}
