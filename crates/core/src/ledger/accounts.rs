//! Account management.

use chrono::Utc;
use serde::Serialize;
use tally_shared::types::{AccountId, UserId};
use tracing::info;

use super::balance::adjust;
use super::error::{LedgerError, MAX_NAME_CHARS};
use super::retry::with_retry;
use super::types::{Account, AccountPatch, NewAccount, TransactionFilter};
use crate::store::{LedgerStore, UnitOfWork};

/// Icon used when a new account does not name one.
pub const DEFAULT_ACCOUNT_ICON: &str = "wallet";

/// All accounts of a user together with their combined balance.
#[derive(Debug, Clone, Serialize)]
pub struct AccountOverview {
    /// Sum of every account's current balance.
    pub total_balance: i64,
    /// Accounts, default first.
    pub accounts: Vec<Account>,
}

/// Creates, edits and deletes accounts.
#[derive(Debug, Clone)]
pub struct AccountService<U> {
    store: U,
}

impl<U: UnitOfWork> AccountService<U> {
    /// Creates the service.
    #[must_use]
    pub const fn new(store: U) -> Self {
        Self { store }
    }

    /// Creates an account whose running balance starts at its opening balance.
    ///
    /// # Errors
    ///
    /// `InvalidName` or a store error.
    pub async fn create(&self, user: UserId, input: NewAccount) -> Result<Account, LedgerError> {
        let name = validate_name(&input.name)?;
        let now = Utc::now();
        let account = Account {
            id: AccountId::new(),
            user_id: user,
            name,
            initial_balance: input.initial_balance,
            current_balance: input.initial_balance,
            icon: input.icon.unwrap_or_else(|| DEFAULT_ACCOUNT_ICON.to_string()),
            is_default: input.is_default,
            created_at: now,
            updated_at: now,
        };

        let mut scope = self.store.begin().await?;
        let mut inserted = scope.insert_accounts(vec![account]).await?;
        let account = inserted
            .pop()
            .ok_or_else(|| LedgerError::Store("account insert returned nothing".to_string()))?;
        if account.is_default {
            scope.clear_default_accounts(user, account.id).await?;
        }
        self.store.commit(scope).await?;

        info!(user_id = %user, account_id = %account.id, "Account created");
        Ok(account)
    }

    /// Loads one account.
    ///
    /// # Errors
    ///
    /// `AccountNotFound` or a store error.
    pub async fn get(&self, user: UserId, id: AccountId) -> Result<Account, LedgerError> {
        let mut scope = self.store.begin().await?;
        scope
            .get_account(user, id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))
    }

    /// Lists the user's accounts, default first.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub async fn list(&self, user: UserId) -> Result<Vec<Account>, LedgerError> {
        let mut scope = self.store.begin().await?;
        Ok(scope.list_accounts(user).await?)
    }

    /// Accounts plus their combined balance.
    ///
    /// # Errors
    ///
    /// `BalanceOverflow` if the total does not fit, or a store error.
    pub async fn overview(&self, user: UserId) -> Result<AccountOverview, LedgerError> {
        let accounts = self.list(user).await?;
        let mut total_balance: i64 = 0;
        for account in &accounts {
            total_balance = total_balance
                .checked_add(account.current_balance)
                .ok_or(LedgerError::BalanceOverflow(account.id))?;
        }
        Ok(AccountOverview {
            total_balance,
            accounts,
        })
    }

    /// Applies a partial update.
    ///
    /// Changing the opening balance shifts the running balance by the same
    /// difference through an atomic increment, so the sum of transactions
    /// on top of it is preserved. The running balance is never written from
    /// the value read here. Marking an account default clears the flag
    /// everywhere else.
    ///
    /// # Errors
    ///
    /// `AccountNotFound`, `InvalidName`, `BalanceOverflow` or a store error.
    pub async fn update(
        &self,
        user: UserId,
        id: AccountId,
        patch: AccountPatch,
    ) -> Result<Account, LedgerError> {
        with_retry("update account", move || self.try_update(user, id, patch.clone())).await
    }

    async fn try_update(
        &self,
        user: UserId,
        id: AccountId,
        patch: AccountPatch,
    ) -> Result<Account, LedgerError> {
        let mut scope = self.store.begin().await?;
        let mut account = scope
            .get_account(user, id)
            .await?
            .ok_or(LedgerError::AccountNotFound(id))?;

        if let Some(name) = patch.name.as_deref() {
            account.name = validate_name(name)?;
        }
        if let Some(icon) = patch.icon {
            account.icon = icon;
        }
        let mut shift = 0;
        if let Some(initial) = patch.initial_balance {
            shift = initial
                .checked_sub(account.initial_balance)
                .ok_or(LedgerError::BalanceOverflow(id))?;
            account.initial_balance = initial;
        }
        if let Some(is_default) = patch.is_default {
            account.is_default = is_default;
        }
        account.updated_at = Utc::now();

        if !scope.update_account(&account).await? {
            return Err(LedgerError::AccountNotFound(id));
        }
        if shift != 0 {
            account.current_balance = adjust(&mut scope, user, id, shift).await?.current_balance;
        }
        if patch.is_default == Some(true) {
            scope.clear_default_accounts(user, id).await?;
        }
        self.store.commit(scope).await?;

        info!(user_id = %user, account_id = %id, "Account updated");
        Ok(account)
    }

    /// Deletes an account that no transaction references.
    ///
    /// Returns `false` when the account does not exist.
    ///
    /// # Errors
    ///
    /// `AccountInUse` when transactions still point at it, or a store error.
    pub async fn delete(&self, user: UserId, id: AccountId) -> Result<bool, LedgerError> {
        let mut scope = self.store.begin().await?;
        let filter = TransactionFilter {
            account_id: Some(id),
            ..TransactionFilter::default()
        };
        let references = scope.count_transactions(user, &filter).await?;
        if references > 0 {
            return Err(LedgerError::AccountInUse(references));
        }
        if !scope.delete_account(user, id).await? {
            return Ok(false);
        }
        self.store.commit(scope).await?;

        info!(user_id = %user, account_id = %id, "Account deleted");
        Ok(true)
    }
}

/// Trims a display name and checks its length.
pub(crate) fn validate_name(name: &str) -> Result<String, LedgerError> {
    let trimmed = name.trim();
    let len = trimmed.chars().count();
    if len == 0 || len > MAX_NAME_CHARS {
        return Err(LedgerError::InvalidName);
    }
    Ok(trimmed.to_string())
}
