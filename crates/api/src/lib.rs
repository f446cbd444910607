//! HTTP API layer with Axum routes and middleware.
//!
//! This crate provides:
//! - REST API routes under `/api/v1`
//! - Bearer-token authentication middleware
//! - Extractors and the `{success, data | error}` response envelope

pub mod extract;
pub mod middleware;
pub mod response;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use chrono_tz::Tz;
use tally_core::auth::VerificationCodes;
use tally_core::ledger::{AccountService, CategoryService, TransactionService};
use tally_core::smart_booking::{ChatCompletion, SmartBookingService};
use tally_db::{SqlStore, UserRepository};
use tally_shared::{EmailService, JwtService};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Ledger store over the connection pool.
    pub store: SqlStore,
    /// JWT service for token operations.
    pub jwt_service: Arc<JwtService>,
    /// Login verification codes.
    pub verification: Arc<VerificationCodes>,
    /// SMTP delivery; codes are logged instead when absent.
    pub email_service: Option<Arc<EmailService>>,
    /// Chat-completion backend for smart booking.
    pub ai: Arc<dyn ChatCompletion>,
    /// Timezone that decides what "today" is.
    pub timezone: Tz,
}

impl AppState {
    /// User lookups and sign-up.
    #[must_use]
    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.store.connection().clone())
    }

    /// Account service over the shared store.
    #[must_use]
    pub fn accounts(&self) -> AccountService<SqlStore> {
        AccountService::new(self.store.clone())
    }

    /// Category service over the shared store.
    #[must_use]
    pub fn categories(&self) -> CategoryService<SqlStore> {
        CategoryService::new(self.store.clone())
    }

    /// Transaction service over the shared store.
    #[must_use]
    pub fn transactions(&self) -> TransactionService<SqlStore> {
        TransactionService::new(self.store.clone(), self.timezone)
    }

    /// Smart booking over the shared store and AI backend.
    #[must_use]
    pub fn smart_booking(&self) -> SmartBookingService<SqlStore> {
        SmartBookingService::new(self.store.clone(), Arc::clone(&self.ai), self.timezone)
    }
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes::api_routes_with_state(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
