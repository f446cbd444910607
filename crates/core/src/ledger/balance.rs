//! Account balance adjustment.
//!
//! An account's running balance always equals its opening balance plus the
//! signed sum of its transactions: income adds the amount, expense subtracts
//! it. Every mutation of a transaction is paired with exactly one call into
//! this module per affected account.

use tally_shared::types::{AccountId, UserId};
use tracing::debug;

use super::error::LedgerError;
use super::types::{Account, TransactionKind};
use crate::store::LedgerStore;

/// The delta a transaction contributes to its account.
#[must_use]
pub const fn signed_delta(kind: TransactionKind, amount: i64) -> i64 {
    match kind {
        TransactionKind::Income => amount,
        TransactionKind::Expense => -amount,
    }
}

/// The delta that removes a transaction's contribution again.
#[must_use]
pub const fn reversal_delta(kind: TransactionKind, amount: i64) -> i64 {
    -signed_delta(kind, amount)
}

/// Adds `delta` to `balance`, or `None` on overflow.
#[must_use]
pub const fn apply_delta(balance: i64, delta: i64) -> Option<i64> {
    balance.checked_add(delta)
}

/// Applies a signed delta to an account inside the caller's scope.
///
/// The write goes through the store's atomic increment, so two scopes
/// adjusting the same account never overwrite each other's result.
///
/// # Errors
///
/// `AccountNotFound` when the account is missing or owned by someone else,
/// `BalanceOverflow` when the result would not fit, or a store error.
pub async fn adjust<S>(
    store: &mut S,
    user: UserId,
    account_id: AccountId,
    delta: i64,
) -> Result<Account, LedgerError>
where
    S: LedgerStore + ?Sized,
{
    let account = store
        .get_account(user, account_id)
        .await?
        .ok_or(LedgerError::AccountNotFound(account_id))?;

    apply_delta(account.current_balance, delta).ok_or(LedgerError::BalanceOverflow(account_id))?;

    let updated = store
        .increment_balance(user, account_id, delta)
        .await?
        .ok_or(LedgerError::AccountNotFound(account_id))?;

    debug!(
        account_id = %account_id,
        delta,
        balance = updated.current_balance,
        "Adjusted account balance"
    );
    Ok(updated)
}

/// Net balance change per account, accumulated before writing.
///
/// Insertion order is preserved so writes happen in a stable order (the
/// account a transaction leaves before the one it joins).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetDeltas {
    entries: Vec<(AccountId, i64)>,
}

impl NetDeltas {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Folds `delta` into the running total for `account`.
    ///
    /// # Errors
    ///
    /// `BalanceOverflow` if the running total overflows.
    pub fn add(&mut self, account: AccountId, delta: i64) -> Result<(), LedgerError> {
        if let Some((_, total)) = self.entries.iter_mut().find(|(id, _)| *id == account) {
            *total = total
                .checked_add(delta)
                .ok_or(LedgerError::BalanceOverflow(account))?;
        } else {
            self.entries.push((account, delta));
        }
        Ok(())
    }

    /// Non-zero net changes, in insertion order.
    pub fn changes(&self) -> impl Iterator<Item = (AccountId, i64)> + '_ {
        self.entries.iter().copied().filter(|(_, delta)| *delta != 0)
    }

    /// Applies every non-zero change through [`adjust`].
    ///
    /// # Errors
    ///
    /// Stops at the first failing adjustment; the caller's scope must then
    /// be dropped so nothing partial is committed.
    pub async fn apply<S>(&self, store: &mut S, user: UserId) -> Result<(), LedgerError>
    where
        S: LedgerStore + ?Sized,
    {
        for (account, delta) in self.changes() {
            adjust(store, user, account, delta).await?;
        }
        Ok(())
    }
}
