//! Journal entry, transfer and tag lookup routes.

use std::collections::BTreeMap;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tally_core::ledger::{
    AccountCode, AccountRef, JournalEntry, JournalLine, LineMetadata, MetadataKey,
    PostEntryInput, PostLineInput, SourceType, TransferInput,
};
use tally_shared::types::{AccountId, Cents, ChannelId, JournalEntryId};
use tally_shared::{AppError, Capability};
use validator::Validate;

use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::CurrentActor;

/// Creates the ledger entry routes (requires the actor middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/channels/{channel_id}/entries", post(post_entry))
        .route("/channels/{channel_id}/transfers", post(create_transfer))
        .route("/channels/{channel_id}/lines", get(lines_by_tag))
        .route("/entries/{entry_id}", get(get_entry))
}

/// Request body for posting an entry.
#[derive(Debug, Deserialize, Validate)]
pub struct PostEntryRequest {
    /// What caused the entry.
    pub source_type: SourceType,
    /// Id of the causing record.
    #[validate(length(min = 1, max = 255))]
    pub source_id: String,
    /// Business time of the entry. Defaults to now.
    pub occurred_at: Option<DateTime<Utc>>,
    /// Free-text memo.
    #[validate(length(max = 1000))]
    pub memo: Option<String>,
    /// Schema version the line metadata was written with.
    pub metadata_version: Option<u16>,
    /// Entry lines.
    pub lines: Vec<LineRequest>,
}

/// One line of a posted entry. Exactly one of `account_code` and
/// `account_id` must be given.
#[derive(Debug, Deserialize)]
pub struct LineRequest {
    /// Account code within the entry's channel.
    pub account_code: Option<String>,
    /// Account primary key.
    pub account_id: Option<AccountId>,
    /// Signed amount: positive debits, negative credits.
    pub amount_cents: i64,
    /// Tags keyed by metadata name.
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

/// Request body for a transfer.
#[derive(Debug, Deserialize, Validate)]
pub struct TransferRequest {
    /// Account code to move money out of.
    pub from_account_code: String,
    /// Account code to move money into.
    pub to_account_code: String,
    /// Positive amount to move.
    pub amount_cents: i64,
    /// Free-text memo.
    #[validate(length(max = 1000))]
    pub memo: Option<String>,
}

/// Query parameters for a tag lookup.
#[derive(Debug, Deserialize)]
pub struct TagQuery {
    /// Metadata key name, e.g. `openSessionId`.
    pub key: String,
    /// Tag value to match.
    pub value: String,
}

fn account_ref(line: &LineRequest) -> ApiResult<AccountRef> {
    match (&line.account_code, line.account_id) {
        (Some(code), None) => Ok(AccountRef::Code(AccountCode::parse(code)?)),
        (None, Some(id)) => Ok(AccountRef::Id(id)),
        _ => Err(AppError::Validation(
            "each line needs exactly one of account_code or account_id".to_string(),
        )
        .into()),
    }
}

/// POST `/channels/{channel_id}/entries` - Post a balanced entry.
async fn post_entry(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(channel_id): Path<ChannelId>,
    Json(body): Json<PostEntryRequest>,
) -> ApiResult<(StatusCode, Json<JournalEntry>)> {
    actor.require(Capability::PostEntries)?;
    body.validate()?;

    let version = body.metadata_version.unwrap_or(LineMetadata::CURRENT_VERSION);
    let lines = body
        .lines
        .iter()
        .map(|line| -> ApiResult<PostLineInput> {
            let metadata = LineMetadata::from_versioned(version, line.metadata.clone())?;
            Ok(PostLineInput::new(account_ref(line)?, Cents::new(line.amount_cents))
                .with_metadata(metadata))
        })
        .collect::<ApiResult<Vec<_>>>()?;

    let entry = state
        .ledger
        .post(PostEntryInput {
            channel_id,
            source_type: body.source_type,
            source_id: body.source_id,
            occurred_at: body.occurred_at,
            memo: body.memo,
            posted_by: Some(actor.id()),
            lines,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// POST `/channels/{channel_id}/transfers` - Move money between two accounts.
async fn create_transfer(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(channel_id): Path<ChannelId>,
    Json(body): Json<TransferRequest>,
) -> ApiResult<(StatusCode, Json<JournalEntry>)> {
    actor.require(Capability::PostEntries)?;
    body.validate()?;

    let entry = state
        .ledger
        .transfer(TransferInput {
            channel_id,
            from: AccountCode::parse(&body.from_account_code)?.into(),
            to: AccountCode::parse(&body.to_account_code)?.into(),
            amount: Cents::new(body.amount_cents),
            memo: body.memo,
            posted_by: Some(actor.id()),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(entry)))
}

/// GET `/entries/{entry_id}` - Get an entry with its lines.
async fn get_entry(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(entry_id): Path<JournalEntryId>,
) -> ApiResult<Json<JournalEntry>> {
    Ok(Json(state.ledger.get_entry(entry_id).await?))
}

/// GET `/channels/{channel_id}/lines?key=..&value=..` - Lines carrying a tag.
async fn lines_by_tag(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(channel_id): Path<ChannelId>,
    Query(query): Query<TagQuery>,
) -> ApiResult<Json<Vec<JournalLine>>> {
    let key = MetadataKey::parse(&query.key)
        .ok_or_else(|| AppError::Validation(format!("unknown metadata key {:?}", query.key)))?;

    Ok(Json(
        state
            .ledger
            .lines_by_tag(channel_id, key, &query.value)
            .await?,
    ))
}

#[cfg(test)]
mod integration_tests {
    use serde_json::{Value, json};

    use crate::test_support::TestApp;

    fn sale_body(amount: i64) -> Value {
        json!({
            "source_type": "sale",
            "source_id": "order-1",
            "lines": [
                { "account_code": "CASH", "amount_cents": amount },
                { "account_code": "SALES", "amount_cents": -amount }
            ]
        })
    }

    #[tokio::test]
    async fn test_post_and_get_entry() {
        let app = TestApp::new().await;

        let (status, posted) = app
            .send(
                "POST",
                &format!("/api/v1/channels/{}/entries", app.channel),
                Some(sale_body(9_700)),
            )
            .await;
        assert_eq!(status, 201);
        assert_eq!(posted["lines"].as_array().unwrap().len(), 2);
        assert_eq!(posted["posted_by"], app.actor.to_string());

        let entry_id = posted["id"].as_str().unwrap();
        let (status, fetched) = app
            .send("GET", &format!("/api/v1/entries/{entry_id}"), None)
            .await;
        assert_eq!(status, 200);
        assert_eq!(fetched["source_id"], "order-1");
        assert_eq!(fetched["lines"][0]["amount"], 9_700);
    }

    #[tokio::test]
    async fn test_unbalanced_entry_is_unprocessable() {
        let app = TestApp::new().await;
        let mut body = sale_body(100);
        body["lines"][1]["amount_cents"] = json!(-99);

        let (status, body) = app
            .send(
                "POST",
                &format!("/api/v1/channels/{}/entries", app.channel),
                Some(body),
            )
            .await;

        assert_eq!(status, 422);
        assert_eq!(body["error"], "UNBALANCED_ENTRY");
    }

    #[tokio::test]
    async fn test_line_needs_one_account_reference() {
        let app = TestApp::new().await;
        let mut body = sale_body(100);
        body["lines"][0] = json!({ "amount_cents": 100 });

        let (status, body) = app
            .send(
                "POST",
                &format!("/api/v1/channels/{}/entries", app.channel),
                Some(body),
            )
            .await;

        assert_eq!(status, 400);
        assert_eq!(body["error"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_legacy_session_tag_is_upgraded() {
        let app = TestApp::new().await;
        let mut body = sale_body(2_500);
        body["metadata_version"] = json!(1);
        body["lines"][0]["metadata"] = json!({ "cashierSessionId": "s-1" });

        let (status, _) = app
            .send(
                "POST",
                &format!("/api/v1/channels/{}/entries", app.channel),
                Some(body),
            )
            .await;
        assert_eq!(status, 201);

        let (status, lines) = app
            .send(
                "GET",
                &format!(
                    "/api/v1/channels/{}/lines?key=openSessionId&value=s-1",
                    app.channel
                ),
                None,
            )
            .await;
        assert_eq!(status, 200);
        assert_eq!(lines.as_array().unwrap().len(), 1);
        assert_eq!(lines[0]["amount"], 2_500);
    }

    #[tokio::test]
    async fn test_unknown_tag_key_is_rejected() {
        let app = TestApp::new().await;

        let (status, _) = app
            .send(
                "GET",
                &format!("/api/v1/channels/{}/lines?key=customerId&value=1", app.channel),
                None,
            )
            .await;

        assert_eq!(status, 400);
    }

    #[tokio::test]
    async fn test_transfer() {
        let app = TestApp::new().await;

        let (status, entry) = app
            .send(
                "POST",
                &format!("/api/v1/channels/{}/transfers", app.channel),
                Some(json!({
                    "from_account_code": "CASH",
                    "to_account_code": "BANK",
                    "amount_cents": 4_000
                })),
            )
            .await;

        assert_eq!(status, 201);
        assert_eq!(entry["source_type"], "inter_account_transfer");
    }

    #[tokio::test]
    async fn test_posting_needs_capability() {
        let app = TestApp::new().await;

        let (status, _) = app
            .send_as(
                "POST",
                &format!("/api/v1/channels/{}/entries", app.channel),
                Some(sale_body(100)),
                Some("approve_variance"),
            )
            .await;

        assert_eq!(status, 403);
    }
}
