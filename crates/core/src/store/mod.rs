//! Record store abstraction.
//!
//! The ledger services never talk to a database directly. They open a
//! [`UnitOfWork`] scope, read and write through the [`LedgerStore`] methods
//! of that scope, and commit. Dropping a scope without committing discards
//! every write made through it, so a transaction row and the balance change
//! it causes land together or not at all.
//!
//! Every method is scoped by the owning user: a record that belongs to
//! somebody else behaves exactly like a missing one.

pub mod memory;

use async_trait::async_trait;
use tally_shared::types::{AccountId, CategoryId, TransactionId, UserId};
use thiserror::Error;

use crate::ledger::types::{
    Account, Category, Transaction, TransactionFilter, TransactionKind, Window,
};

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by a store implementation.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("duplicate record: {0}")]
    Conflict(String),

    /// Another unit of work committed conflicting changes first.
    #[error("concurrent modification")]
    Concurrent,

    /// Any other backend failure (I/O, driver, SQL).
    #[error("store backend error: {0}")]
    Backend(String),
}

/// Opens and commits store scopes.
#[async_trait]
pub trait UnitOfWork: Send + Sync {
    /// Scope type; dropping it uncommitted rolls back.
    type Scope: LedgerStore;

    /// Starts a new scope.
    async fn begin(&self) -> StoreResult<Self::Scope>;

    /// Makes every write of the scope durable.
    async fn commit(&self, scope: Self::Scope) -> StoreResult<()>;
}

/// Typed record operations available inside a scope.
#[async_trait]
pub trait LedgerStore: Send {
    // ---- accounts ----------------------------------------------------

    /// Loads one account.
    async fn get_account(&mut self, user: UserId, id: AccountId) -> StoreResult<Option<Account>>;

    /// Lists a user's accounts, default first, then by creation time.
    async fn list_accounts(&mut self, user: UserId) -> StoreResult<Vec<Account>>;

    /// Number of accounts the user owns.
    async fn count_accounts(&mut self, user: UserId) -> StoreResult<u64>;

    /// Inserts accounts in one batch.
    async fn insert_accounts(&mut self, accounts: Vec<Account>) -> StoreResult<Vec<Account>>;

    /// Overwrites an account's name, icon, default flag, opening balance and
    /// `updated_at`. `current_balance` is left alone; it only moves through
    /// [`increment_balance`](Self::increment_balance). Returns `false` when
    /// the account does not exist.
    async fn update_account(&mut self, account: &Account) -> StoreResult<bool>;

    /// Adds `delta` to `current_balance` in a single atomic write and bumps
    /// `updated_at`. Returns the updated account, or `None` when missing.
    async fn increment_balance(
        &mut self,
        user: UserId,
        id: AccountId,
        delta: i64,
    ) -> StoreResult<Option<Account>>;

    /// Clears the default flag on every account of the user except `keep`.
    async fn clear_default_accounts(&mut self, user: UserId, keep: AccountId) -> StoreResult<()>;

    /// Deletes an account. Returns `false` when it does not exist.
    async fn delete_account(&mut self, user: UserId, id: AccountId) -> StoreResult<bool>;

    // ---- categories --------------------------------------------------

    /// Loads one category.
    async fn get_category(&mut self, user: UserId, id: CategoryId) -> StoreResult<Option<Category>>;

    /// Lists categories ordered by kind, sort order, then name.
    async fn list_categories(
        &mut self,
        user: UserId,
        kind: Option<TransactionKind>,
    ) -> StoreResult<Vec<Category>>;

    /// Number of categories the user owns.
    async fn count_categories(&mut self, user: UserId) -> StoreResult<u64>;

    /// Inserts categories in one batch.
    async fn insert_categories(&mut self, categories: Vec<Category>) -> StoreResult<Vec<Category>>;

    /// Overwrites a category. Returns `false` when it does not exist.
    async fn update_category(&mut self, category: &Category) -> StoreResult<bool>;

    /// Deletes a category. Returns `false` when it does not exist.
    async fn delete_category(&mut self, user: UserId, id: CategoryId) -> StoreResult<bool>;

    // ---- transactions ------------------------------------------------

    /// Loads one transaction.
    async fn get_transaction(
        &mut self,
        user: UserId,
        id: TransactionId,
    ) -> StoreResult<Option<Transaction>>;

    /// Lists matching transactions, newest date first, then newest created.
    async fn list_transactions(
        &mut self,
        user: UserId,
        filter: &TransactionFilter,
        window: Option<Window>,
    ) -> StoreResult<Vec<Transaction>>;

    /// Number of matching transactions.
    async fn count_transactions(
        &mut self,
        user: UserId,
        filter: &TransactionFilter,
    ) -> StoreResult<u64>;

    /// Inserts a transaction.
    async fn insert_transaction(&mut self, tx: Transaction) -> StoreResult<Transaction>;

    /// Overwrites a transaction. Returns `false` when it does not exist.
    async fn update_transaction(&mut self, tx: &Transaction) -> StoreResult<bool>;

    /// Deletes a transaction. Returns `false` when it does not exist.
    async fn delete_transaction(&mut self, user: UserId, id: TransactionId) -> StoreResult<bool>;
}
