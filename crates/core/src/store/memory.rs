//! In-memory store.
//!
//! Each scope works on a private copy of the state and swaps it in on
//! commit. Commits are optimistic: if another scope committed after this one
//! began, the commit fails with [`StoreError::Concurrent`] instead of
//! silently overwriting the other scope's balance changes.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use tally_shared::types::{AccountId, CategoryId, TransactionId, UserId};

use super::{LedgerStore, StoreError, StoreResult, UnitOfWork};
use crate::ledger::types::{
    Account, Category, Transaction, TransactionFilter, TransactionKind, Window,
};

#[derive(Debug, Clone, Default)]
struct State {
    version: u64,
    accounts: HashMap<AccountId, Account>,
    categories: HashMap<CategoryId, Category>,
    transactions: HashMap<TransactionId, Transaction>,
}

#[derive(Debug, Default)]
struct Shared {
    state: Mutex<State>,
    fail_balance_writes: AtomicBool,
}

/// Thread-safe in-memory store, cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    shared: Arc<Shared>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent `increment_balance` fail with a backend error.
    /// Used to exercise rollback paths.
    pub fn fail_balance_writes(&self, fail: bool) {
        self.shared.fail_balance_writes.store(fail, Ordering::SeqCst);
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, State>> {
        self.shared
            .state
            .lock()
            .map_err(|_| StoreError::Backend("memory store poisoned".to_string()))
    }

    /// Committed balance of an account, bypassing ownership checks.
    #[must_use]
    pub fn balance_of(&self, id: AccountId) -> Option<i64> {
        self.lock()
            .ok()
            .and_then(|state| state.accounts.get(&id).map(|a| a.current_balance))
    }

    /// Number of committed transactions across all users.
    #[must_use]
    pub fn transaction_count(&self) -> usize {
        self.lock().map(|state| state.transactions.len()).unwrap_or_default()
    }
}

/// A scope over a private snapshot of a [`MemoryStore`].
#[derive(Debug)]
pub struct MemoryScope {
    base_version: u64,
    working: State,
    fail_balance_writes: bool,
}

#[async_trait]
impl UnitOfWork for MemoryStore {
    type Scope = MemoryScope;

    async fn begin(&self) -> StoreResult<MemoryScope> {
        let state = self.lock()?;
        Ok(MemoryScope {
            base_version: state.version,
            working: state.clone(),
            fail_balance_writes: self.shared.fail_balance_writes.load(Ordering::SeqCst),
        })
    }

    async fn commit(&self, scope: MemoryScope) -> StoreResult<()> {
        let mut state = self.lock()?;
        if state.version != scope.base_version {
            return Err(StoreError::Concurrent);
        }
        let mut working = scope.working;
        working.version = scope.base_version + 1;
        *state = working;
        Ok(())
    }
}

fn to_u64(n: usize) -> u64 {
    u64::try_from(n).unwrap_or(u64::MAX)
}

fn to_usize(n: u64) -> usize {
    usize::try_from(n).unwrap_or(usize::MAX)
}

impl MemoryScope {
    fn ensure_unique_category(&self, candidate: &Category) -> StoreResult<()> {
        let clash = self.working.categories.values().any(|c| {
            c.id != candidate.id
                && c.user_id == candidate.user_id
                && c.kind == candidate.kind
                && c.name == candidate.name
        });
        if clash {
            return Err(StoreError::Conflict(format!(
                "category '{}' already exists",
                candidate.name
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LedgerStore for MemoryScope {
    async fn get_account(&mut self, user: UserId, id: AccountId) -> StoreResult<Option<Account>> {
        Ok(self
            .working
            .accounts
            .get(&id)
            .filter(|a| a.user_id == user)
            .cloned())
    }

    async fn list_accounts(&mut self, user: UserId) -> StoreResult<Vec<Account>> {
        let mut accounts: Vec<Account> = self
            .working
            .accounts
            .values()
            .filter(|a| a.user_id == user)
            .cloned()
            .collect();
        accounts.sort_by(|a, b| {
            b.is_default
                .cmp(&a.is_default)
                .then(a.created_at.cmp(&b.created_at))
                .then(a.name.cmp(&b.name))
        });
        Ok(accounts)
    }

    async fn count_accounts(&mut self, user: UserId) -> StoreResult<u64> {
        Ok(to_u64(
            self.working.accounts.values().filter(|a| a.user_id == user).count(),
        ))
    }

    async fn insert_accounts(&mut self, accounts: Vec<Account>) -> StoreResult<Vec<Account>> {
        for account in &accounts {
            self.working.accounts.insert(account.id, account.clone());
        }
        Ok(accounts)
    }

    async fn update_account(&mut self, account: &Account) -> StoreResult<bool> {
        match self.working.accounts.get_mut(&account.id) {
            Some(existing) if existing.user_id == account.user_id => {
                *existing = Account {
                    current_balance: existing.current_balance,
                    ..account.clone()
                };
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn increment_balance(
        &mut self,
        user: UserId,
        id: AccountId,
        delta: i64,
    ) -> StoreResult<Option<Account>> {
        if self.fail_balance_writes {
            return Err(StoreError::Backend("balance write rejected".to_string()));
        }
        match self.working.accounts.get_mut(&id) {
            Some(account) if account.user_id == user => {
                account.current_balance = account
                    .current_balance
                    .checked_add(delta)
                    .ok_or_else(|| StoreError::Backend("balance overflow".to_string()))?;
                account.updated_at = Utc::now();
                Ok(Some(account.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn clear_default_accounts(&mut self, user: UserId, keep: AccountId) -> StoreResult<()> {
        for account in self.working.accounts.values_mut() {
            if account.user_id == user && account.id != keep {
                account.is_default = false;
            }
        }
        Ok(())
    }

    async fn delete_account(&mut self, user: UserId, id: AccountId) -> StoreResult<bool> {
        if self.get_account(user, id).await?.is_none() {
            return Ok(false);
        }
        Ok(self.working.accounts.remove(&id).is_some())
    }

    async fn get_category(
        &mut self,
        user: UserId,
        id: CategoryId,
    ) -> StoreResult<Option<Category>> {
        Ok(self
            .working
            .categories
            .get(&id)
            .filter(|c| c.user_id == user)
            .cloned())
    }

    async fn list_categories(
        &mut self,
        user: UserId,
        kind: Option<TransactionKind>,
    ) -> StoreResult<Vec<Category>> {
        let mut categories: Vec<Category> = self
            .working
            .categories
            .values()
            .filter(|c| c.user_id == user && kind.is_none_or(|k| c.kind == k))
            .cloned()
            .collect();
        categories.sort_by(|a, b| {
            a.kind
                .as_str()
                .cmp(b.kind.as_str())
                .then(a.sort_order.cmp(&b.sort_order))
                .then(a.name.cmp(&b.name))
        });
        Ok(categories)
    }

    async fn count_categories(&mut self, user: UserId) -> StoreResult<u64> {
        Ok(to_u64(
            self.working.categories.values().filter(|c| c.user_id == user).count(),
        ))
    }

    async fn insert_categories(&mut self, categories: Vec<Category>) -> StoreResult<Vec<Category>> {
        for category in &categories {
            self.ensure_unique_category(category)?;
            self.working.categories.insert(category.id, category.clone());
        }
        Ok(categories)
    }

    async fn update_category(&mut self, category: &Category) -> StoreResult<bool> {
        if self.get_category(category.user_id, category.id).await?.is_none() {
            return Ok(false);
        }
        self.ensure_unique_category(category)?;
        self.working.categories.insert(category.id, category.clone());
        Ok(true)
    }

    async fn delete_category(&mut self, user: UserId, id: CategoryId) -> StoreResult<bool> {
        if self.get_category(user, id).await?.is_none() {
            return Ok(false);
        }
        Ok(self.working.categories.remove(&id).is_some())
    }

    async fn get_transaction(
        &mut self,
        user: UserId,
        id: TransactionId,
    ) -> StoreResult<Option<Transaction>> {
        Ok(self
            .working
            .transactions
            .get(&id)
            .filter(|t| t.user_id == user)
            .cloned())
    }

    async fn list_transactions(
        &mut self,
        user: UserId,
        filter: &TransactionFilter,
        window: Option<Window>,
    ) -> StoreResult<Vec<Transaction>> {
        let mut rows: Vec<Transaction> = self
            .working
            .transactions
            .values()
            .filter(|t| t.user_id == user && filter.matches(t))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(b.created_at.cmp(&a.created_at)));

        Ok(match window {
            Some(w) => rows
                .into_iter()
                .skip(to_usize(w.offset))
                .take(to_usize(w.limit))
                .collect(),
            None => rows,
        })
    }

    async fn count_transactions(
        &mut self,
        user: UserId,
        filter: &TransactionFilter,
    ) -> StoreResult<u64> {
        Ok(to_u64(
            self.working
                .transactions
                .values()
                .filter(|t| t.user_id == user && filter.matches(t))
                .count(),
        ))
    }

    async fn insert_transaction(&mut self, tx: Transaction) -> StoreResult<Transaction> {
        self.working.transactions.insert(tx.id, tx.clone());
        Ok(tx)
    }

    async fn update_transaction(&mut self, tx: &Transaction) -> StoreResult<bool> {
        match self.working.transactions.get_mut(&tx.id) {
            Some(existing) if existing.user_id == tx.user_id => {
                *existing = tx.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_transaction(&mut self, user: UserId, id: TransactionId) -> StoreResult<bool> {
        if self.get_transaction(user, id).await?.is_none() {
            return Ok(false);
        }
        Ok(self.working.transactions.remove(&id).is_some())
    }
}
