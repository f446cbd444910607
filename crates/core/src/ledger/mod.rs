//! Personal ledger: accounts, categories and transactions.
//!
//! - Domain types and inputs
//! - Balance adjustment
//! - Transaction lifecycle service
//! - Account and category management
//! - Default provisioning for new users
//! - Bounded retry of conflicting units of work

pub mod accounts;
pub mod balance;
pub mod categories;
pub mod error;
pub mod provisioning;
mod retry;
pub mod service;
pub mod types;

#[cfg(test)]
mod service_props;

pub use accounts::{AccountOverview, AccountService};
pub use balance::{NetDeltas, adjust, reversal_delta, signed_delta};
pub use categories::CategoryService;
pub use error::LedgerError;
pub use provisioning::{ProvisionReport, initialize_defaults};
pub use service::TransactionService;
pub use types::{
    Account, AccountPatch, Category, CategoryPatch, NewAccount, NewCategory, NewTransaction,
    PaymentMethod, Transaction, TransactionFilter, TransactionKind, TransactionPatch, Window,
};
