//! Chart of accounts and balance routes.

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tally_core::ledger::{AccountBalance, AccountCode, AccountInfo, BalanceScope, JournalLine};
use tally_shared::Capability;
use tally_shared::types::{AccountId, ChannelId, PageRequest, PageResponse, SessionId};
use validator::Validate;

use crate::AppState;
use crate::error::ApiResult;
use crate::middleware::CurrentActor;

/// Creates the account routes (requires the actor middleware to be applied externally).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/channels/{channel_id}/accounts",
            get(list_accounts).post(create_account),
        )
        .route("/channels/{channel_id}/accounts/seed", post(seed_accounts))
        .route("/accounts/{account_id}/balance", get(get_balance))
        .route("/accounts/{account_id}/lines", get(list_lines))
}

/// Request body for creating an account.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAccountRequest {
    /// Channel-scoped account code.
    pub code: String,
    /// Display name.
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Whether the account is settled by an external processor.
    #[serde(default)]
    pub is_system_account: bool,
}

/// Query parameters for an account balance.
#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    /// Inclusive upper bound on line time. Defaults to now.
    pub as_of: Option<DateTime<Utc>>,
    /// Restrict the balance to lines posted under one session.
    pub session_id: Option<SessionId>,
}

/// GET `/channels/{channel_id}/accounts` - List a channel's accounts.
async fn list_accounts(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(channel_id): Path<ChannelId>,
) -> ApiResult<Json<Vec<AccountInfo>>> {
    Ok(Json(state.accounts.list(channel_id).await?))
}

/// POST `/channels/{channel_id}/accounts` - Create an account.
async fn create_account(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(channel_id): Path<ChannelId>,
    Json(body): Json<CreateAccountRequest>,
) -> ApiResult<(StatusCode, Json<AccountInfo>)> {
    actor.require(Capability::PostEntries)?;
    body.validate()?;

    let code = AccountCode::parse(&body.code)?;
    let account = state
        .accounts
        .create(channel_id, code, body.name.trim(), body.is_system_account)
        .await?;

    Ok((StatusCode::CREATED, Json(account)))
}

/// POST `/channels/{channel_id}/accounts/seed` - Seed the default chart.
async fn seed_accounts(
    State(state): State<AppState>,
    actor: CurrentActor,
    Path(channel_id): Path<ChannelId>,
) -> ApiResult<Json<Vec<AccountInfo>>> {
    actor.require(Capability::PostEntries)?;
    Ok(Json(state.accounts.seed_defaults(channel_id).await?))
}

/// GET `/accounts/{account_id}/balance` - Balance as of an instant.
async fn get_balance(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(account_id): Path<AccountId>,
    Query(query): Query<BalanceQuery>,
) -> ApiResult<Json<AccountBalance>> {
    let scope = query
        .session_id
        .map_or(BalanceScope::All, BalanceScope::session);
    let as_of = query.as_of.unwrap_or_else(Utc::now);

    Ok(Json(state.ledger.balance_as_of(account_id, as_of, scope).await?))
}

/// GET `/accounts/{account_id}/lines` - Paginated account lines.
async fn list_lines(
    State(state): State<AppState>,
    _actor: CurrentActor,
    Path(account_id): Path<AccountId>,
    Query(page): Query<PageRequest>,
) -> ApiResult<Json<PageResponse<JournalLine>>> {
    Ok(Json(state.ledger.list_account_lines(account_id, &page).await?))
}
