//! Transaction lifecycle service.
//!
//! Keeps transaction rows and the balances of the accounts they reference
//! consistent. Each operation runs in a single store scope: the row write
//! and the balance write(s) commit together, and any failure drops the
//! scope so neither lands. A scope that loses a race with another writer
//! is re-run a bounded number of times.

use chrono::{NaiveDate, Utc};
use chrono_tz::Tz;
use tally_shared::types::{AccountId, CategoryId, PageRequest, PageResponse, TransactionId, UserId};
use tracing::{debug, info, warn};

use super::balance::{NetDeltas, reversal_delta, signed_delta};
use super::error::{LedgerError, MAX_NOTE_CHARS};
use super::retry::with_retry;
use super::types::{
    NewTransaction, Transaction, TransactionFilter, TransactionKind, TransactionPatch, Window,
};
use crate::store::{LedgerStore, UnitOfWork};

/// Creates, edits and deletes transactions while maintaining balances.
#[derive(Debug, Clone)]
pub struct TransactionService<U> {
    store: U,
    timezone: Tz,
}

impl<U: UnitOfWork> TransactionService<U> {
    /// Creates the service. `timezone` decides which calendar day "today" is.
    #[must_use]
    pub const fn new(store: U, timezone: Tz) -> Self {
        Self { store, timezone }
    }

    /// Today's date in the configured timezone.
    #[must_use]
    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    /// Records a transaction and applies its effect to the account.
    ///
    /// # Errors
    ///
    /// Validation errors before any write; `AccountNotFound` /
    /// `CategoryNotFound` when a reference is missing or foreign;
    /// `KindMismatch` when the category's kind differs; store errors.
    pub async fn create(
        &self,
        user: UserId,
        input: NewTransaction,
    ) -> Result<Transaction, LedgerError> {
        with_retry("create transaction", move || self.try_create(user, input.clone())).await
    }

    async fn try_create(
        &self,
        user: UserId,
        input: NewTransaction,
    ) -> Result<Transaction, LedgerError> {
        validate_amount(input.amount)?;
        let note = normalize_note(input.note)?;

        let mut scope = self.store.begin().await?;
        ensure_references(&mut scope, user, input.account_id, input.category_id, input.kind).await?;

        let now = Utc::now();
        let tx = Transaction {
            id: TransactionId::new(),
            user_id: user,
            account_id: input.account_id,
            category_id: input.category_id,
            kind: input.kind,
            amount: input.amount,
            date: input.date.unwrap_or_else(|| self.today()),
            note,
            payment_method: input.payment_method.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        };

        let tx = scope.insert_transaction(tx).await?;
        let mut deltas = NetDeltas::new();
        deltas.add(tx.account_id, signed_delta(tx.kind, tx.amount))?;
        deltas.apply(&mut scope, user).await?;
        self.store.commit(scope).await?;

        info!(
            user_id = %user,
            transaction_id = %tx.id,
            account_id = %tx.account_id,
            kind = %tx.kind,
            amount = tx.amount,
            "Transaction created"
        );
        Ok(tx)
    }

    /// Loads one transaction.
    ///
    /// # Errors
    ///
    /// `TransactionNotFound` or a store error.
    pub async fn get(&self, user: UserId, id: TransactionId) -> Result<Transaction, LedgerError> {
        let mut scope = self.store.begin().await?;
        scope
            .get_transaction(user, id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(id))
    }

    /// Lists one page of matching transactions, newest first.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub async fn list(
        &self,
        user: UserId,
        filter: &TransactionFilter,
        page: &PageRequest,
    ) -> Result<PageResponse<Transaction>, LedgerError> {
        let mut scope = self.store.begin().await?;
        let total = scope.count_transactions(user, filter).await?;
        let window = Window {
            limit: page.limit(),
            offset: page.offset(),
        };
        let rows = scope.list_transactions(user, filter, Some(window)).await?;
        debug!(user_id = %user, total, returned = rows.len(), "Listed transactions");

        Ok(page.respond(rows, total))
    }

    /// Every matching transaction, newest first. Used by reports and export.
    ///
    /// # Errors
    ///
    /// Store errors.
    pub async fn list_all(
        &self,
        user: UserId,
        filter: &TransactionFilter,
    ) -> Result<Vec<Transaction>, LedgerError> {
        let mut scope = self.store.begin().await?;
        Ok(scope.list_transactions(user, filter, None).await?)
    }

    /// Applies a partial update.
    ///
    /// The old contribution is reversed on the old account and the new
    /// contribution applied on the (possibly different) new account. Both
    /// are folded per account first, so an unchanged account sees at most
    /// one write carrying the net difference, while a moved transaction
    /// takes its money out of the old account and into the new one.
    ///
    /// # Errors
    ///
    /// `TransactionNotFound`, validation and reference errors as for
    /// [`create`](Self::create), or store errors.
    pub async fn update(
        &self,
        user: UserId,
        id: TransactionId,
        patch: TransactionPatch,
    ) -> Result<Transaction, LedgerError> {
        with_retry("update transaction", move || self.try_update(user, id, patch.clone())).await
    }

    async fn try_update(
        &self,
        user: UserId,
        id: TransactionId,
        patch: TransactionPatch,
    ) -> Result<Transaction, LedgerError> {
        if let Some(amount) = patch.amount {
            validate_amount(amount)?;
        }
        let note = patch.note.map(|n| normalize_note(Some(n))).transpose()?;

        let mut scope = self.store.begin().await?;
        let old = scope
            .get_transaction(user, id)
            .await?
            .ok_or(LedgerError::TransactionNotFound(id))?;

        let mut deltas = NetDeltas::new();
        deltas.add(old.account_id, reversal_delta(old.kind, old.amount))?;

        let mut updated = old.clone();
        if let Some(account_id) = patch.account_id {
            updated.account_id = account_id;
        }
        if let Some(category_id) = patch.category_id {
            updated.category_id = category_id;
        }
        if let Some(kind) = patch.kind {
            updated.kind = kind;
        }
        if let Some(amount) = patch.amount {
            updated.amount = amount;
        }
        if let Some(date) = patch.date {
            updated.date = date;
        }
        if let Some(note) = note {
            updated.note = note;
        }
        if let Some(method) = patch.payment_method {
            updated.payment_method = method;
        }

        let references_changed = updated.account_id != old.account_id
            || updated.category_id != old.category_id
            || updated.kind != old.kind;
        if references_changed {
            ensure_references(
                &mut scope,
                user,
                updated.account_id,
                updated.category_id,
                updated.kind,
            )
            .await?;
        }
        updated.updated_at = Utc::now();

        if !scope.update_transaction(&updated).await? {
            return Err(LedgerError::TransactionNotFound(id));
        }
        deltas.add(updated.account_id, signed_delta(updated.kind, updated.amount))?;
        deltas.apply(&mut scope, user).await?;
        self.store.commit(scope).await?;

        info!(
            user_id = %user,
            transaction_id = %id,
            moved = updated.account_id != old.account_id,
            "Transaction updated"
        );
        Ok(updated)
    }

    /// Deletes a transaction and reverses its effect.
    ///
    /// Returns `false` when the transaction does not exist.
    ///
    /// # Errors
    ///
    /// Store errors, or `AccountNotFound` if the account vanished.
    pub async fn delete(&self, user: UserId, id: TransactionId) -> Result<bool, LedgerError> {
        with_retry("delete transaction", move || self.try_delete(user, id)).await
    }

    async fn try_delete(&self, user: UserId, id: TransactionId) -> Result<bool, LedgerError> {
        let mut scope = self.store.begin().await?;
        let Some(existing) = scope.get_transaction(user, id).await? else {
            return Ok(false);
        };

        let mut deltas = NetDeltas::new();
        deltas.add(existing.account_id, reversal_delta(existing.kind, existing.amount))?;
        deltas.apply(&mut scope, user).await?;
        if !scope.delete_transaction(user, id).await? {
            return Ok(false);
        }
        self.store.commit(scope).await?;

        info!(user_id = %user, transaction_id = %id, "Transaction deleted");
        Ok(true)
    }

    /// Deletes several transactions one by one.
    ///
    /// Each delete commits on its own; a failure is logged and skipped, and
    /// earlier deletes stay in place. Returns how many were deleted.
    pub async fn batch_delete(&self, user: UserId, ids: &[TransactionId]) -> usize {
        let mut deleted = 0;
        for id in ids {
            match self.delete(user, *id).await {
                Ok(true) => deleted += 1,
                Ok(false) => {
                    debug!(transaction_id = %id, "Batch delete skipped missing transaction");
                }
                Err(e) => {
                    warn!(transaction_id = %id, error = %e, "Batch delete failed for transaction");
                }
            }
        }
        info!(user_id = %user, requested = ids.len(), deleted, "Batch delete finished");
        deleted
    }
}

fn validate_amount(amount: i64) -> Result<(), LedgerError> {
    if amount <= 0 {
        return Err(LedgerError::InvalidAmount(amount));
    }
    Ok(())
}

fn normalize_note(note: Option<String>) -> Result<String, LedgerError> {
    let note = note.map(|n| n.trim().to_string()).unwrap_or_default();
    if note.chars().count() > MAX_NOTE_CHARS {
        return Err(LedgerError::NoteTooLong);
    }
    Ok(note)
}

/// Checks that the account and category belong to `user` and that the
/// category accepts transactions of `kind`.
async fn ensure_references<S: LedgerStore + ?Sized>(
    scope: &mut S,
    user: UserId,
    account_id: AccountId,
    category_id: CategoryId,
    kind: TransactionKind,
) -> Result<(), LedgerError> {
    scope
        .get_account(user, account_id)
        .await?
        .ok_or(LedgerError::AccountNotFound(account_id))?;
    let category = scope
        .get_category(user, category_id)
        .await?
        .ok_or(LedgerError::CategoryNotFound(category_id))?;
    if category.kind != kind {
        return Err(LedgerError::KindMismatch {
            category: category.kind,
            transaction: kind,
        });
    }
    Ok(())
}
