//! Category routes.

use axum::{Router, extract::State, response::IntoResponse, routing::get};
use serde::Deserialize;
use serde_json::json;
use tally_core::ledger::{CategoryPatch, NewCategory, TransactionKind};
use tally_shared::types::CategoryId;

use crate::AppState;
use crate::extract::{ApiJson, ApiPath, ApiQuery};
use crate::middleware::AuthUser;
use crate::response::{ApiError, ApiResult, created, ok};

/// Creates the category routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/{category_id}",
            get(get_category).patch(update_category).delete(delete_category),
        )
}

/// Query parameters for listing categories.
#[derive(Debug, Deserialize)]
pub struct ListCategoriesQuery {
    /// Only this kind.
    #[serde(rename = "type")]
    pub kind: Option<TransactionKind>,
}

/// GET /categories - List categories, optionally of one kind.
async fn list_categories(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiQuery(query): ApiQuery<ListCategoriesQuery>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.categories().list(auth.user_id(), query.kind).await?))
}

/// POST /categories - Create a category.
async fn create_category(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<NewCategory>,
) -> ApiResult<impl IntoResponse> {
    Ok(created(state.categories().create(auth.user_id(), payload).await?))
}

/// GET /categories/{category_id} - Get one category.
async fn get_category(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(category_id): ApiPath<CategoryId>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state.categories().get(auth.user_id(), category_id).await?))
}

/// PATCH /categories/{category_id} - Edit a category; the kind is fixed.
async fn update_category(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(category_id): ApiPath<CategoryId>,
    ApiJson(payload): ApiJson<CategoryPatch>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state
        .categories()
        .update(auth.user_id(), category_id, payload)
        .await?))
}

/// DELETE /categories/{category_id} - Delete an unused category.
async fn delete_category(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiPath(category_id): ApiPath<CategoryId>,
) -> ApiResult<impl IntoResponse> {
    if !state.categories().delete(auth.user_id(), category_id).await? {
        return Err(ApiError::not_found(format!("Category not found: {category_id}")));
    }
    Ok(ok(json!({ "deleted": true })))
}
