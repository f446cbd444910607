//! Smart booking routes.
//!
//! AI failures never surface here: the service returns its fallback record
//! (or an empty suggestion list) and the client lets the user fill it in.

use axum::{Router, extract::State, response::IntoResponse, routing::post};
use serde::Deserialize;
use tally_core::ledger::TransactionKind;

use crate::AppState;
use crate::extract::ApiJson;
use crate::middleware::AuthUser;
use crate::response::{ApiResult, ok};

/// Creates the smart booking routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/smart/parse-text", post(parse_text))
        .route("/smart/recognize-image", post(recognize_image))
        .route("/smart/suggest-categories", post(suggest_categories))
}

/// Request body for `POST /smart/parse-text`.
#[derive(Debug, Deserialize)]
pub struct ParseTextRequest {
    /// Free text such as "午饭 35".
    pub text: String,
}

/// Request body for `POST /smart/recognize-image`.
#[derive(Debug, Deserialize)]
pub struct RecognizeImageRequest {
    /// `data:image/...;base64,...` URI.
    pub image: String,
    /// Optional hint for the model.
    pub hint: Option<String>,
}

/// Request body for `POST /smart/suggest-categories`.
#[derive(Debug, Deserialize)]
pub struct SuggestCategoriesRequest {
    /// What the money was for.
    pub description: String,
    /// Income or expense; expense when omitted.
    #[serde(rename = "type", default = "default_kind")]
    pub kind: TransactionKind,
}

const fn default_kind() -> TransactionKind {
    TransactionKind::Expense
}

/// POST /smart/parse-text - Pre-fill a transaction from text.
async fn parse_text(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<ParseTextRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state
        .smart_booking()
        .parse_text(auth.user_id(), &payload.text)
        .await?))
}

/// POST /smart/recognize-image - Pre-fill a transaction from a receipt.
async fn recognize_image(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<RecognizeImageRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state
        .smart_booking()
        .recognize_image(auth.user_id(), &payload.image, payload.hint.as_deref())
        .await?))
}

/// POST /smart/suggest-categories - Rank categories for a description.
async fn suggest_categories(
    State(state): State<AppState>,
    auth: AuthUser,
    ApiJson(payload): ApiJson<SuggestCategoriesRequest>,
) -> ApiResult<impl IntoResponse> {
    Ok(ok(state
        .smart_booking()
        .suggest_categories(auth.user_id(), &payload.description, payload.kind)
        .await?))
}
