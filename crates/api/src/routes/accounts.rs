//! Account routes.

use axum::{
    Router,
    extract::State,
    response::IntoResponse,
    routing::get,
};
use serde_json::json;
use tally_core::ledger::{AccountPatch, NewAccount};
use tally_shared::types::AccountId;

use crate::AppState;
use crate::extract::{ApiJson, ApiPath};
use crate::middleware::AuthUser;
use crate::response::{ApiError, ApiResult, created, ok};

/// Creates the account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/accounts", get(list_accounts).post(create_account))
        .route("/accounts/overview", get(overview))
        .route(
            "/accounts/{account_id}",
            get(get_account).patch(update_account).delete(delete_account),
        )
}

/// GET /accounts - List the user's accounts, default first.
async fn list_accounts(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.accounts().list(auth.user_id()).await?))
}

/// GET /accounts/overview - Accounts plus their combined balance.
async fn overview(State(state): State<AppState>, auth: AuthUser) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.accounts().overview(auth.user_id()).await?))
}

/// POST /accounts - Create an account.
async fn create_account(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<NewAccount>,
) -> ApiResult<impl IntoResponse> {
    Ok(created(state.accounts().create(auth.user_id(), payload).await?))
}

/// GET /accounts/{account_id} - Get one account.
async fn get_account(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(account_id): ApiPath<AccountId>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.accounts().get(auth.user_id(), account_id).await?))
}

/// PATCH /accounts/{account_id} - Edit an account.
async fn update_account(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(account_id): ApiPath<AccountId>,
    ApiJson(payload): ApiJson<AccountPatch>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state
        .accounts()
        .update(auth.user_id(), account_id, payload)
        .await?))
}

/// DELETE /accounts/{account_id} - Delete an account without transactions.
async fn delete_account(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(account_id): ApiPath<AccountId>,
) -> ApiResult<impl IntoResponse> {
    if !state.accounts().delete(auth.user_id(), account_id).await? {
        return Err(ApiError::not_found(format!("Account not found: {account_id}")));
    }
    Ok(ok(json!({ "deleted": true })))
}
