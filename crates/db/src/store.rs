//! SQL implementation of the ledger store traits.
//!
//! A scope is one database transaction. Dropping a [`SqlScope`] without
//! committing rolls the transaction back. Balance changes are issued as
//! `current_balance = current_balance + delta`, so concurrent scopes never
//! lose each other's increments.
//!
//! SQLite allows one writer per database file, and two deferred
//! transactions that both read before writing fail with `SQLITE_BUSY`
//! instead of waiting. Scopes opened from one [`SqlStore`] therefore take
//! turns; busy or locked errors from other processes surface as
//! [`StoreError::Concurrent`] so the caller can re-run the scope.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveValue::{NotSet, Set},
    ColumnTrait, Condition, DatabaseConnection, DatabaseTransaction, DbErr, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RuntimeErr, SqlErr, TransactionTrait,
    sqlx,
};
use tally_core::ledger::{
    Account, Category, Transaction, TransactionFilter, TransactionKind, Window,
};
use tally_core::store::{LedgerStore, StoreError, StoreResult, UnitOfWork};
use tally_shared::types::{AccountId, CategoryId, TransactionId, UserId};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::entities::{accounts, categories, transactions};

/// Store backed by a SeaORM connection pool.
#[derive(Debug, Clone)]
pub struct SqlStore {
    db: DatabaseConnection,
    writer: Arc<Mutex<()>>,
}

impl SqlStore {
    /// Wraps a connection. Clones share one writer turn.
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            db,
            writer: Arc::new(Mutex::new(())),
        }
    }

    /// The underlying connection.
    #[must_use]
    pub const fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

/// One open database transaction, holding the store's writer turn.
pub struct SqlScope {
    // Declared first so the transaction rolls back before the turn is released.
    txn: DatabaseTransaction,
    _turn: OwnedMutexGuard<()>,
}

#[async_trait]
impl UnitOfWork for SqlStore {
    type Scope = SqlScope;

    async fn begin(&self) -> StoreResult<SqlScope> {
        let turn = Arc::clone(&self.writer).lock_owned().await;
        let txn = self.db.begin().await.map_err(store_error)?;
        Ok(SqlScope { txn, _turn: turn })
    }

    async fn commit(&self, scope: SqlScope) -> StoreResult<()> {
        let SqlScope { txn, _turn } = scope;
        txn.commit().await.map_err(store_error)
    }
}

/// Maps a driver error, keeping uniqueness violations and lock contention
/// distinguishable.
fn store_error(err: DbErr) -> StoreError {
    if is_lock_contention(&err) {
        return StoreError::Concurrent;
    }
    match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(detail)) => StoreError::Conflict(detail),
        _ => StoreError::Backend(err.to_string()),
    }
}

/// `SQLITE_BUSY` (5) or `SQLITE_LOCKED` (6), including their extended codes.
fn is_lock_contention(err: &DbErr) -> bool {
    let (DbErr::Conn(RuntimeErr::SqlxError(sqlx::Error::Database(db)))
    | DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(db)))
    | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(db)))) = err
    else {
        return false;
    };
    db.code()
        .and_then(|code| code.parse::<i32>().ok())
        .is_some_and(|code| matches!(code & 0xff, 5 | 6))
}

fn parse_kind(raw: &str) -> StoreResult<TransactionKind> {
    raw.parse()
        .map_err(|e: String| StoreError::Backend(format!("corrupt row: {e}")))
}

fn account_from_model(m: accounts::Model) -> Account {
    Account {
        id: AccountId::from_uuid(m.id),
        user_id: UserId::from_uuid(m.user_id),
        name: m.name,
        initial_balance: m.initial_balance,
        current_balance: m.current_balance,
        icon: m.icon,
        is_default: m.is_default,
        created_at: m.created_at,
        updated_at: m.updated_at,
    }
}

fn account_to_active(a: &Account) -> accounts::ActiveModel {
    accounts::ActiveModel {
        id: Set(a.id.0),
        user_id: Set(a.user_id.0),
        name: Set(a.name.clone()),
        initial_balance: Set(a.initial_balance),
        current_balance: Set(a.current_balance),
        icon: Set(a.icon.clone()),
        is_default: Set(a.is_default),
        created_at: Set(a.created_at),
        updated_at: Set(a.updated_at),
    }
}

fn category_from_model(m: categories::Model) -> StoreResult<Category> {
    Ok(Category {
        id: CategoryId::from_uuid(m.id),
        user_id: UserId::from_uuid(m.user_id),
        kind: parse_kind(&m.kind)?,
        name: m.name,
        icon: m.icon,
        color: m.color,
        is_default: m.is_default,
        sort_order: m.sort_order,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn category_to_active(c: &Category) -> categories::ActiveModel {
    categories::ActiveModel {
        id: Set(c.id.0),
        user_id: Set(c.user_id.0),
        name: Set(c.name.clone()),
        kind: Set(c.kind.as_str().to_string()),
        icon: Set(c.icon.clone()),
        color: Set(c.color.clone()),
        is_default: Set(c.is_default),
        sort_order: Set(c.sort_order),
        created_at: Set(c.created_at),
        updated_at: Set(c.updated_at),
    }
}

fn transaction_from_model(m: transactions::Model) -> StoreResult<Transaction> {
    Ok(Transaction {
        id: TransactionId::from_uuid(m.id),
        user_id: UserId::from_uuid(m.user_id),
        account_id: AccountId::from_uuid(m.account_id),
        category_id: CategoryId::from_uuid(m.category_id),
        kind: parse_kind(&m.kind)?,
        amount: m.amount,
        date: m.date,
        note: m.note,
        payment_method: m
            .payment_method
            .parse()
            .map_err(|e: String| StoreError::Backend(format!("corrupt row: {e}")))?,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn transaction_to_active(t: &Transaction) -> transactions::ActiveModel {
    transactions::ActiveModel {
        id: Set(t.id.0),
        user_id: Set(t.user_id.0),
        account_id: Set(t.account_id.0),
        category_id: Set(t.category_id.0),
        kind: Set(t.kind.as_str().to_string()),
        amount: Set(t.amount),
        date: Set(t.date),
        note: Set(t.note.clone()),
        payment_method: Set(t.payment_method.as_str().to_string()),
        created_at: Set(t.created_at),
        updated_at: Set(t.updated_at),
    }
}

fn transaction_condition(user: UserId, filter: &TransactionFilter) -> Condition {
    let mut cond = Condition::all().add(transactions::Column::UserId.eq(user.0));
    if let Some(account) = filter.account_id {
        cond = cond.add(transactions::Column::AccountId.eq(account.0));
    }
    if let Some(category) = filter.category_id {
        cond = cond.add(transactions::Column::CategoryId.eq(category.0));
    }
    if let Some(kind) = filter.kind {
        cond = cond.add(transactions::Column::Kind.eq(kind.as_str()));
    }
    if let Some(from) = filter.from {
        cond = cond.add(transactions::Column::Date.gte(from));
    }
    if let Some(to) = filter.to {
        cond = cond.add(transactions::Column::Date.lte(to));
    }
    if let Some(keyword) = filter.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
        cond = cond.add(transactions::Column::Note.contains(keyword));
    }
    cond
}

#[async_trait]
impl LedgerStore for SqlScope {
    async fn get_account(&mut self, user: UserId, id: AccountId) -> StoreResult<Option<Account>> {
        let row = accounts::Entity::find_by_id(id.0)
            .filter(accounts::Column::UserId.eq(user.0))
            .one(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(row.map(account_from_model))
    }

    async fn list_accounts(&mut self, user: UserId) -> StoreResult<Vec<Account>> {
        let rows = accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user.0))
            .order_by_desc(accounts::Column::IsDefault)
            .order_by_asc(accounts::Column::CreatedAt)
            .order_by_asc(accounts::Column::Id)
            .all(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(rows.into_iter().map(account_from_model).collect())
    }

    async fn count_accounts(&mut self, user: UserId) -> StoreResult<u64> {
        accounts::Entity::find()
            .filter(accounts::Column::UserId.eq(user.0))
            .count(&self.txn)
            .await
            .map_err(store_error)
    }

    async fn insert_accounts(&mut self, rows: Vec<Account>) -> StoreResult<Vec<Account>> {
        let mut inserted = Vec::with_capacity(rows.len());
        for account in rows {
            accounts::Entity::insert(account_to_active(&account))
                .exec_without_returning(&self.txn)
                .await
                .map_err(store_error)?;
            inserted.push(account);
        }
        Ok(inserted)
    }

    async fn update_account(&mut self, account: &Account) -> StoreResult<bool> {
        let changes = accounts::ActiveModel {
            id: NotSet,
            user_id: NotSet,
            current_balance: NotSet,
            created_at: NotSet,
            ..account_to_active(account)
        };
        let result = accounts::Entity::update_many()
            .set(changes)
            .filter(accounts::Column::Id.eq(account.id.0))
            .filter(accounts::Column::UserId.eq(account.user_id.0))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected > 0)
    }

    async fn increment_balance(
        &mut self,
        user: UserId,
        id: AccountId,
        delta: i64,
    ) -> StoreResult<Option<Account>> {
        let result = accounts::Entity::update_many()
            .col_expr(
                accounts::Column::CurrentBalance,
                Expr::col(accounts::Column::CurrentBalance).add(delta),
            )
            .col_expr(accounts::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(accounts::Column::Id.eq(id.0))
            .filter(accounts::Column::UserId.eq(user.0))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        if result.rows_affected == 0 {
            return Ok(None);
        }
        self.get_account(user, id).await
    }

    async fn clear_default_accounts(&mut self, user: UserId, keep: AccountId) -> StoreResult<()> {
        accounts::Entity::update_many()
            .col_expr(accounts::Column::IsDefault, Expr::value(false))
            .filter(accounts::Column::UserId.eq(user.0))
            .filter(accounts::Column::Id.ne(keep.0))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(())
    }

    async fn delete_account(&mut self, user: UserId, id: AccountId) -> StoreResult<bool> {
        let result = accounts::Entity::delete_many()
            .filter(accounts::Column::Id.eq(id.0))
            .filter(accounts::Column::UserId.eq(user.0))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected > 0)
    }

    async fn get_category(
        &mut self,
        user: UserId,
        id: CategoryId,
    ) -> StoreResult<Option<Category>> {
        categories::Entity::find_by_id(id.0)
            .filter(categories::Column::UserId.eq(user.0))
            .one(&self.txn)
            .await
            .map_err(store_error)?
            .map(category_from_model)
            .transpose()
    }

    async fn list_categories(
        &mut self,
        user: UserId,
        kind: Option<TransactionKind>,
    ) -> StoreResult<Vec<Category>> {
        let mut query = categories::Entity::find().filter(categories::Column::UserId.eq(user.0));
        if let Some(kind) = kind {
            query = query.filter(categories::Column::Kind.eq(kind.as_str()));
        }
        query
            .order_by_asc(categories::Column::Kind)
            .order_by_asc(categories::Column::SortOrder)
            .order_by_asc(categories::Column::Name)
            .all(&self.txn)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(category_from_model)
            .collect()
    }

    async fn count_categories(&mut self, user: UserId) -> StoreResult<u64> {
        categories::Entity::find()
            .filter(categories::Column::UserId.eq(user.0))
            .count(&self.txn)
            .await
            .map_err(store_error)
    }

    async fn insert_categories(&mut self, rows: Vec<Category>) -> StoreResult<Vec<Category>> {
        let mut inserted = Vec::with_capacity(rows.len());
        for category in rows {
            categories::Entity::insert(category_to_active(&category))
                .exec_without_returning(&self.txn)
                .await
                .map_err(store_error)?;
            inserted.push(category);
        }
        Ok(inserted)
    }

    async fn update_category(&mut self, category: &Category) -> StoreResult<bool> {
        let result = categories::Entity::update_many()
            .set(category_to_active(category))
            .filter(categories::Column::Id.eq(category.id.0))
            .filter(categories::Column::UserId.eq(category.user_id.0))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_category(&mut self, user: UserId, id: CategoryId) -> StoreResult<bool> {
        let result = categories::Entity::delete_many()
            .filter(categories::Column::Id.eq(id.0))
            .filter(categories::Column::UserId.eq(user.0))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected > 0)
    }

    async fn get_transaction(
        &mut self,
        user: UserId,
        id: TransactionId,
    ) -> StoreResult<Option<Transaction>> {
        transactions::Entity::find_by_id(id.0)
            .filter(transactions::Column::UserId.eq(user.0))
            .one(&self.txn)
            .await
            .map_err(store_error)?
            .map(transaction_from_model)
            .transpose()
    }

    async fn list_transactions(
        &mut self,
        user: UserId,
        filter: &TransactionFilter,
        window: Option<Window>,
    ) -> StoreResult<Vec<Transaction>> {
        let mut query = transactions::Entity::find()
            .filter(transaction_condition(user, filter))
            .order_by_desc(transactions::Column::Date)
            .order_by_desc(transactions::Column::CreatedAt)
            .order_by_desc(transactions::Column::Id);
        if let Some(window) = window {
            query = query.limit(window.limit).offset(window.offset);
        }
        query
            .all(&self.txn)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(transaction_from_model)
            .collect()
    }

    async fn count_transactions(
        &mut self,
        user: UserId,
        filter: &TransactionFilter,
    ) -> StoreResult<u64> {
        transactions::Entity::find()
            .filter(transaction_condition(user, filter))
            .count(&self.txn)
            .await
            .map_err(store_error)
    }

    async fn insert_transaction(&mut self, tx: Transaction) -> StoreResult<Transaction> {
        transactions::Entity::insert(transaction_to_active(&tx))
            .exec_without_returning(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(tx)
    }

    async fn update_transaction(&mut self, tx: &Transaction) -> StoreResult<bool> {
        let result = transactions::Entity::update_many()
            .set(transaction_to_active(tx))
            .filter(transactions::Column::Id.eq(tx.id.0))
            .filter(transactions::Column::UserId.eq(tx.user_id.0))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected > 0)
    }

    async fn delete_transaction(&mut self, user: UserId, id: TransactionId) -> StoreResult<bool> {
        let result = transactions::Entity::delete_many()
            .filter(transactions::Column::Id.eq(id.0))
            .filter(transactions::Column::UserId.eq(user.0))
            .exec(&self.txn)
            .await
            .map_err(store_error)?;
        Ok(result.rows_affected > 0)
    }
}
