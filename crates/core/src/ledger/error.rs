//! Ledger error types for validation and state errors.

use tally_shared::AppError;
use tally_shared::types::{AccountId, CategoryId, TransactionId};
use thiserror::Error;

use super::types::TransactionKind;
use crate::store::StoreError;

/// Maximum note length in characters.
pub const MAX_NOTE_CHARS: usize = 500;

/// Maximum account/category name length in characters.
pub const MAX_NAME_CHARS: usize = 32;

/// Errors that can occur during ledger operations.
#[derive(Debug, Error)]
pub enum LedgerError {
    // ========== Validation Errors ==========
    /// Amount must be strictly positive.
    #[error("Amount must be a positive number of minor units, got {0}")]
    InvalidAmount(i64),

    /// Note exceeds the length limit.
    #[error("Note must be at most {MAX_NOTE_CHARS} characters")]
    NoteTooLong,

    /// Name is blank or too long.
    #[error("Name must be 1 to {MAX_NAME_CHARS} characters")]
    InvalidName,

    /// Color is not `#RRGGBB`.
    #[error("Color must look like #RRGGBB, got '{0}'")]
    InvalidColor(String),

    /// Category kind differs from the transaction kind.
    #[error("Category is for {category} but the transaction is {transaction}")]
    KindMismatch {
        /// Kind of the category.
        category: TransactionKind,
        /// Kind of the transaction.
        transaction: TransactionKind,
    },

    /// Applying a delta would overflow the balance.
    #[error("Balance of account {0} would overflow")]
    BalanceOverflow(AccountId),

    // ========== Not Found ==========
    /// Account not found or owned by another user.
    #[error("Account not found: {0}")]
    AccountNotFound(AccountId),

    /// Category not found or owned by another user.
    #[error("Category not found: {0}")]
    CategoryNotFound(CategoryId),

    /// Transaction not found or owned by another user.
    #[error("Transaction not found: {0}")]
    TransactionNotFound(TransactionId),

    // ========== Conflicts ==========
    /// Account still has transactions.
    #[error("Account is used by {0} transactions")]
    AccountInUse(u64),

    /// Category still has transactions.
    #[error("Category is used by {0} transactions")]
    CategoryInUse(u64),

    /// A uniqueness rule was violated.
    #[error("Duplicate: {0}")]
    Duplicate(String),

    /// Concurrent modification detected.
    #[error("Concurrent modification detected, please retry")]
    ConcurrentModification,

    // ========== Store Errors ==========
    /// The store failed.
    #[error("Store error: {0}")]
    Store(String),
}

impl From<StoreError> for LedgerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(what) => Self::Duplicate(what),
            StoreError::Concurrent => Self::ConcurrentModification,
            StoreError::Backend(msg) => Self::Store(msg),
        }
    }
}

impl LedgerError {
    /// Returns true if this error is retryable.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ConcurrentModification)
    }
}

impl From<LedgerError> for AppError {
    fn from(err: LedgerError) -> Self {
        let message = err.to_string();
        match err {
            LedgerError::InvalidAmount(_)
            | LedgerError::NoteTooLong
            | LedgerError::InvalidName
            | LedgerError::InvalidColor(_)
            | LedgerError::KindMismatch { .. }
            | LedgerError::BalanceOverflow(_) => Self::Validation(message),
            LedgerError::AccountNotFound(_)
            | LedgerError::CategoryNotFound(_)
            | LedgerError::TransactionNotFound(_) => Self::NotFound(message),
            LedgerError::AccountInUse(_)
            | LedgerError::CategoryInUse(_)
            | LedgerError::Duplicate(_)
            | LedgerError::ConcurrentModification => Self::Conflict(message),
            LedgerError::Store(_) => Self::Store(message),
        }
    }
}
