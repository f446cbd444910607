//! `/api/v1` routes.

use axum::{Router, middleware};

use crate::{AppState, middleware::auth_middleware};

pub mod accounts;
pub mod auth;
pub mod categories;
pub mod health;
pub mod setup;
pub mod smart;
pub mod transactions;

/// Health and sign-in are public; every ledger route sits behind
/// [`auth_middleware`].
#[allow(clippy::needless_pass_by_value)]
pub fn api_routes_with_state(state: AppState) -> Router<AppState> {
    let ledger = Router::new()
        .merge(setup::routes())
        .merge(accounts::routes())
        .merge(categories::routes())
        .merge(transactions::routes())
        .merge(smart::routes())
        .route_layer(middleware::from_fn_with_state(state, auth_middleware));

    Router::new()
        .merge(health::routes())
        .merge(auth::routes())
        .merge(ledger)
}
