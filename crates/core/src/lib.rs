//! Core business logic for Tally.
//!
//! This crate contains the ledger rules and services with ZERO web or
//! database dependencies. Persistence goes through the store traits in
//! [`store`]; the AI backend goes through [`smart_booking::ChatCompletion`].
//!
//! # Modules
//!
//! - `ledger` - Accounts, categories, transactions and balance upkeep
//! - `store` - Unit-of-work store traits and the in-memory store
//! - `reports` - Period summaries and category breakdowns
//! - `export` - CSV export
//! - `smart_booking` - AI pre-fill of transactions
//! - `auth` - Email verification codes

pub mod auth;
pub mod export;
pub mod ledger;
pub mod reports;
pub mod smart_booking;
pub mod store;
