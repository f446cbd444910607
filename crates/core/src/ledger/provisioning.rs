//! Default categories and accounts for new users.

use chrono::Utc;
use serde::Serialize;
use tally_shared::types::{AccountId, CategoryId, UserId};
use tracing::info;

use super::error::LedgerError;
use super::retry::with_retry;
use super::types::{Account, Category, TransactionKind};
use crate::store::{LedgerStore, UnitOfWork};

/// A default category: name, icon, color.
type CategorySeed = (&'static str, &'static str, &'static str);

/// Expense categories every user starts with.
pub const DEFAULT_EXPENSE_CATEGORIES: [CategorySeed; 8] = [
    ("餐饮", "food", "#FF6B6B"),
    ("交通", "transport", "#4ECDC4"),
    ("购物", "shopping", "#FFB347"),
    ("娱乐", "entertainment", "#9B59B6"),
    ("居住", "home", "#3498DB"),
    ("医疗", "medical", "#E74C3C"),
    ("教育", "education", "#2ECC71"),
    ("其他", "other", "#95A5A6"),
];

/// Income categories every user starts with.
pub const DEFAULT_INCOME_CATEGORIES: [CategorySeed; 4] = [
    ("工资", "salary", "#27AE60"),
    ("奖金", "bonus", "#F1C40F"),
    ("理财", "investment", "#16A085"),
    ("其他收入", "other", "#7F8C8D"),
];

/// Accounts every user starts with: name, icon. The first is the default.
pub const DEFAULT_ACCOUNTS: [(&str, &str); 4] = [
    ("现金", "cash"),
    ("微信", "wechat"),
    ("支付宝", "alipay"),
    ("银行卡", "bank"),
];

/// What [`initialize_defaults`] created.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ProvisionReport {
    /// Newly created categories; empty if the user already had some.
    pub categories: Vec<Category>,
    /// Newly created accounts; empty if the user already had some.
    pub accounts: Vec<Account>,
}

impl ProvisionReport {
    /// True when nothing was created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.accounts.is_empty()
    }
}

/// Gives a user the default categories and accounts.
///
/// Categories and accounts are checked independently: a user who already
/// owns at least one record of a kind gets none of the defaults for it, so
/// repeated calls are harmless.
///
/// # Errors
///
/// Store errors; nothing is committed in that case.
pub async fn initialize_defaults<U: UnitOfWork>(
    store: &U,
    user: UserId,
) -> Result<ProvisionReport, LedgerError> {
    with_retry("provision defaults", move || provision_once(store, user)).await
}

async fn provision_once<U: UnitOfWork>(
    store: &U,
    user: UserId,
) -> Result<ProvisionReport, LedgerError> {
    let mut scope = store.begin().await?;
    let mut report = ProvisionReport::default();

    if scope.count_categories(user).await? == 0 {
        report.categories = scope.insert_categories(default_categories(user)).await?;
    }
    if scope.count_accounts(user).await? == 0 {
        report.accounts = scope.insert_accounts(default_accounts(user)).await?;
    }

    if report.is_empty() {
        return Ok(report);
    }
    store.commit(scope).await?;

    info!(
        user_id = %user,
        categories = report.categories.len(),
        accounts = report.accounts.len(),
        "Provisioned defaults"
    );
    Ok(report)
}

fn default_categories(user: UserId) -> Vec<Category> {
    let now = Utc::now();
    let expense = DEFAULT_EXPENSE_CATEGORIES
        .iter()
        .map(|seed| (TransactionKind::Expense, seed));
    let income = DEFAULT_INCOME_CATEGORIES
        .iter()
        .map(|seed| (TransactionKind::Income, seed));

    expense
        .chain(income)
        .scan((None, 0), |(last_kind, order), (kind, (name, icon, color))| {
            if *last_kind != Some(kind) {
                *last_kind = Some(kind);
                *order = 0;
            }
            *order += 1;
            Some(Category {
                id: CategoryId::new(),
                user_id: user,
                name: (*name).to_string(),
                kind,
                icon: (*icon).to_string(),
                color: (*color).to_string(),
                is_default: true,
                sort_order: *order,
                created_at: now,
                updated_at: now,
            })
        })
        .collect()
}

fn default_accounts(user: UserId) -> Vec<Account> {
    let now = Utc::now();
    DEFAULT_ACCOUNTS
        .iter()
        .enumerate()
        .map(|(i, (name, icon))| Account {
            id: AccountId::new(),
            user_id: user,
            name: (*name).to_string(),
            initial_balance: 0,
            current_balance: 0,
            icon: (*icon).to_string(),
            is_default: i == 0,
            created_at: now,
            updated_at: now,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;

    #[tokio::test]
    async fn test_fresh_user_gets_all_defaults() {
        let store = MemoryStore::new();
        let user = UserId::new();

        let report = initialize_defaults(&store, user).await.unwrap();

        assert_eq!(report.categories.len(), 12);
        assert_eq!(report.accounts.len(), 4);
        let expense = report
            .categories
            .iter()
            .filter(|c| c.kind == TransactionKind::Expense)
            .count();
        assert_eq!(expense, 8);
        assert!(report.categories.iter().all(|c| c.is_default));

        let defaults: Vec<_> = report.accounts.iter().filter(|a| a.is_default).collect();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].name, "现金");
    }

    #[tokio::test]
    async fn test_second_call_creates_nothing() {
        let store = MemoryStore::new();
        let user = UserId::new();
        initialize_defaults(&store, user).await.unwrap();

        let again = initialize_defaults(&store, user).await.unwrap();
        assert!(again.is_empty());

        let mut scope = store.begin().await.unwrap();
        assert_eq!(scope.count_categories(user).await.unwrap(), 12);
        assert_eq!(scope.count_accounts(user).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_kinds_are_provisioned_independently() {
        let store = MemoryStore::new();
        let user = UserId::new();
        let mut scope = store.begin().await.unwrap();
        scope
            .insert_accounts(default_accounts(user).into_iter().take(1).collect())
            .await
            .unwrap();
        store.commit(scope).await.unwrap();

        let report = initialize_defaults(&store, user).await.unwrap();
        assert_eq!(report.categories.len(), 12);
        assert!(report.accounts.is_empty());
    }

    #[test]
    fn test_sort_order_restarts_per_kind() {
        let categories = default_categories(UserId::new());
        let income_first = categories
            .iter()
            .find(|c| c.kind == TransactionKind::Income)
            .map(|c| (c.name.as_str(), c.sort_order));
        assert_eq!(income_first, Some(("工资", 1)));
        assert_eq!(categories[7].sort_order, 8);
    }
}
