//! First-run provisioning.

use axum::{Router, extract::State, response::IntoResponse, routing::post};
use tally_core::ledger::initialize_defaults;

use crate::AppState;
use crate::middleware::AuthUser;
use crate::response::{ApiResult, ok};

/// Creates the setup routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/setup/defaults", post(create_defaults))
}

/// POST /setup/defaults - Create default categories and accounts if the
/// user has none. Returns only what this call created.
async fn create_defaults(
    State(state): State<AppState>,
    auth: AuthUser,
) -> ApiResult<impl IntoResponse> {
    let report = initialize_defaults(&state.store, auth.user_id()).await?;
    Ok(ok(report))
}
