//! Transaction routes, including the period summary and CSV export.

use axum::{
    Router,
    extract::State,
    http::header,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tally_core::export::transactions_csv;
use tally_core::ledger::{NewTransaction, TransactionFilter, TransactionKind, TransactionPatch};
use tally_core::reports::ReportService;
use tally_shared::types::{AccountId, CategoryId, PageRequest, TransactionId};

use crate::AppState;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::AuthUser;
use crate::response::{ApiError, ApiResult, created, ok};

/// Most ids accepted by one batch delete.
pub const MAX_BATCH_DELETE: usize = 100;

/// Creates the transaction routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/transactions", get(list_transactions).post(create_transaction))
        .route("/transactions/batch-delete", post(batch_delete))
        .route("/transactions/summary", get(summary))
        .route("/transactions/export", get(export_csv))
        .route(
            "/transactions/{transaction_id}",
            get(get_transaction)
                .patch(update_transaction)
                .delete(delete_transaction),
        )
}

// ============================================================================
// Request/Response Types
// ============================================================================

/// Query parameters for listing and exporting transactions.
#[derive(Debug, Default, Deserialize)]
pub struct ListTransactionsQuery {
    /// Only this account.
    pub account_id: Option<AccountId>,
    /// Only this category.
    pub category_id: Option<CategoryId>,
    /// Only this kind.
    #[serde(rename = "type")]
    pub kind: Option<TransactionKind>,
    /// Date range start (YYYY-MM-DD), inclusive.
    pub from: Option<NaiveDate>,
    /// Date range end (YYYY-MM-DD), inclusive.
    pub to: Option<NaiveDate>,
    /// Substring of the note.
    pub keyword: Option<String>,
    /// Page number (1-indexed).
    pub page: Option<u32>,
    /// Page size (default 20, max 100).
    pub per_page: Option<u32>,
}

impl ListTransactionsQuery {
    fn filter(&self) -> Result<TransactionFilter, ApiError> {
        if let (Some(from), Some(to)) = (self.from, self.to)
            && from > to
        {
            return Err(ApiError::validation("'from' must not be after 'to'"));
        }
        Ok(TransactionFilter {
            account_id: self.account_id,
            category_id: self.category_id,
            kind: self.kind,
            from: self.from,
            to: self.to,
            keyword: self
                .keyword
                .as_deref()
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(ToString::to_string),
        })
    }

    fn page(&self) -> PageRequest {
        let defaults = PageRequest::default();
        PageRequest {
            page: self.page.unwrap_or(defaults.page),
            per_page: self.per_page.unwrap_or(defaults.per_page),
        }
    }
}

/// Query parameters for the summary report.
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    /// Range start; defaults to the first day of the current month.
    pub from: Option<NaiveDate>,
    /// Range end; defaults to the last day of the current month.
    pub to: Option<NaiveDate>,
}

/// Request body for batch delete.
#[derive(Debug, Deserialize)]
pub struct BatchDeleteRequest {
    /// Transactions to delete.
    pub ids: Vec<TransactionId>,
}

/// Response for batch delete.
#[derive(Debug, Serialize)]
pub struct BatchDeleteResponse {
    /// How many were deleted.
    pub deleted: usize,
    /// How many were asked for.
    pub requested: usize,
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /transactions - List with filters and paging, newest first.
async fn list_transactions(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ListTransactionsQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = query.filter()?;
    let page = state
        .transactions()
        .list(auth.user_id(), &filter, &query.page())
        .await?;
    Ok(ok(page))
}

/// POST /transactions - Record a transaction and update the account balance.
async fn create_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<NewTransaction>,
) -> ApiResult<impl IntoResponse> {
    Ok(created(state.transactions().create(auth.user_id(), payload).await?))
}

/// GET /transactions/{transaction_id} - Get one transaction.
async fn get_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(transaction_id): ApiPath<TransactionId>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state
        .transactions()
        .get(auth.user_id(), transaction_id)
        .await?))
}

/// PATCH /transactions/{transaction_id} - Edit a transaction; balances follow.
async fn update_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(transaction_id): ApiPath<TransactionId>,
    ApiJson(payload): ApiJson<TransactionPatch>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state
        .transactions()
        .update(auth.user_id(), transaction_id, payload)
        .await?))
}

/// DELETE /transactions/{transaction_id} - Delete and reverse its effect.
async fn delete_transaction(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(transaction_id): ApiPath<TransactionId>,
) -> ApiResult<impl IntoResponse> {
    if !state
        .transactions()
        .delete(auth.user_id(), transaction_id)
        .await?
    {
        return Err(ApiError::not_found(format!(
            "Transaction not found: {transaction_id}"
        )));
    }
    Ok(ok(json!({ "deleted": true })))
}

/// POST /transactions/batch-delete - Delete several; failures are skipped.
async fn batch_delete(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<BatchDeleteRequest>,
) -> ApiResult<impl IntoResponse> {
    if payload.ids.is_empty() {
        return Err(ApiError::validation("ids must not be empty"));
    }
    if payload.ids.len() > MAX_BATCH_DELETE {
        return Err(ApiError::validation(format!(
            "At most {MAX_BATCH_DELETE} ids per request"
        )));
    }
    let deleted = state
        .transactions()
        .batch_delete(auth.user_id(), &payload.ids)
        .await;
    Ok(ok(BatchDeleteResponse {
        deleted,
        requested: payload.ids.len(),
    }))
}

/// GET /transactions/summary - Income, expense and per-category totals.
async fn summary(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<SummaryQuery>,
) -> ApiResult<impl IntoResponse> {
    let service = state.transactions();
    let (month_start, month_end) = ReportService::month_bounds(service.today());
    let from = query.from.unwrap_or(month_start);
    let to = query.to.unwrap_or(month_end);
    if from > to {
        return Err(ApiError::validation("'from' must not be after 'to'"));
    }

    let filter = TransactionFilter {
        from: Some(from),
        to: Some(to),
        ..TransactionFilter::default()
    };
    let transactions = service.list_all(auth.user_id(), &filter).await?;
    let categories = state.categories().list(auth.user_id(), None).await?;

    Ok(ok(ReportService::generate_summary(
        from,
        to,
        &transactions,
        &categories,
    )))
}

/// GET /transactions/export - Download matching transactions as CSV.
async fn export_csv(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ListTransactionsQuery>,
) -> ApiResult<impl IntoResponse> {
    let filter = query.filter()?;
    let service = state.transactions();
    let transactions = service.list_all(auth.user_id(), &filter).await?;
    let accounts = state.accounts().list(auth.user_id()).await?;
    let categories = state.categories().list(auth.user_id(), None).await?;

    let body = transactions_csv(&transactions, &accounts, &categories)?;
    let disposition = format!(
        "attachment; filename=\"transactions-{}.csv\"",
        service.today().format("%Y%m%d")
    );

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverted_range_is_rejected() {
        let query = ListTransactionsQuery {
            from: NaiveDate::from_ymd_opt(2026, 3, 2),
            to: NaiveDate::from_ymd_opt(2026, 3, 1),
            ..ListTransactionsQuery::default()
        };
        assert!(query.filter().is_err());
    }

    #[test]
    fn test_blank_keyword_is_dropped_and_paging_defaults() {
        let query = ListTransactionsQuery {
            keyword: Some("   ".to_string()),
            per_page: Some(50),
            ..ListTransactionsQuery::default()
        };
        assert!(query.filter().unwrap().keyword.is_none());
        let page = query.page();
        assert_eq!((page.page, page.per_page), (1, 50));
    }
}
