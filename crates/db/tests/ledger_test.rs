//! Ledger services running against SQLite.

mod common;

use chrono::NaiveDate;
use chrono_tz::Asia::Shanghai;
use tally_core::ledger::{
    Account, AccountPatch, AccountService, CategoryService, LedgerError, NewAccount, NewCategory,
    NewTransaction, ProvisionReport, TransactionFilter, TransactionKind, TransactionPatch,
    TransactionService, initialize_defaults,
};
use tally_core::store::{LedgerStore, UnitOfWork};
use tally_db::{SqlStore, UserRepository};
use tally_shared::types::{AccountId, UserId};

struct Fixture {
    store: SqlStore,
    user: UserId,
    defaults: ProvisionReport,
}

impl Fixture {
    fn account(&self, name: &str) -> AccountId {
        self.defaults
            .accounts
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.id)
            .expect("default account")
    }

    fn expense(&self, account: &str, amount: i64) -> NewTransaction {
        let food = self
            .defaults
            .categories
            .iter()
            .find(|c| c.name == "餐饮")
            .expect("default category");
        NewTransaction {
            account_id: self.account(account),
            category_id: food.id,
            kind: TransactionKind::Expense,
            amount,
            date: NaiveDate::from_ymd_opt(2026, 3, 14),
            note: Some("午饭".to_string()),
            payment_method: None,
        }
    }

    async fn balance(&self, name: &str) -> i64 {
        let mut scope = self.store.begin().await.unwrap();
        scope
            .get_account(self.user, self.account(name))
            .await
            .unwrap()
            .expect("account exists")
            .current_balance
    }
}

async fn fixture() -> Fixture {
    let db = common::setup_db().await;
    let (user, _) = UserRepository::new(db.clone())
        .find_or_create_by_email("ledger@example.com")
        .await
        .unwrap();
    let user = UserId::from_uuid(user.id);
    let store = SqlStore::new(db);
    let defaults = initialize_defaults(&store, user).await.unwrap();
    Fixture {
        store,
        user,
        defaults,
    }
}

#[tokio::test]
async fn test_provisioning_runs_once() {
    let f = fixture().await;
    assert_eq!(f.defaults.accounts.len(), 4);
    assert_eq!(f.defaults.categories.len(), 12);

    let again = initialize_defaults(&f.store, f.user).await.unwrap();
    assert!(again.is_empty());
}

#[tokio::test]
async fn test_balance_follows_lifecycle() {
    let f = fixture().await;
    let service = TransactionService::new(f.store.clone(), Shanghai);

    let tx = service.create(f.user, f.expense("现金", 3500)).await.unwrap();
    assert_eq!(f.balance("现金").await, -3500);

    let patch = TransactionPatch {
        amount: Some(5000),
        ..TransactionPatch::default()
    };
    service.update(f.user, tx.id, patch).await.unwrap();
    assert_eq!(f.balance("现金").await, -5000);

    let moved = TransactionPatch {
        account_id: Some(f.account("微信")),
        ..TransactionPatch::default()
    };
    service.update(f.user, tx.id, moved).await.unwrap();
    assert_eq!(f.balance("现金").await, 0);
    assert_eq!(f.balance("微信").await, -5000);

    assert!(service.delete(f.user, tx.id).await.unwrap());
    assert_eq!(f.balance("微信").await, 0);
    assert!(!service.delete(f.user, tx.id).await.unwrap());
}

#[tokio::test]
async fn test_dropped_scope_rolls_back() {
    let f = fixture().await;
    let cash = f.account("现金");
    {
        let mut scope = f.store.begin().await.unwrap();
        scope.increment_balance(f.user, cash, -999).await.unwrap();
    }
    assert_eq!(f.balance("现金").await, 0);
}

#[tokio::test]
async fn test_list_filters_and_counts() {
    let f = fixture().await;
    let service = TransactionService::new(f.store.clone(), Shanghai);
    service.create(f.user, f.expense("现金", 100)).await.unwrap();
    service.create(f.user, f.expense("现金", 200)).await.unwrap();
    service.create(f.user, f.expense("微信", 300)).await.unwrap();

    let filter = TransactionFilter {
        account_id: Some(f.account("现金")),
        ..TransactionFilter::default()
    };
    let cash_only = service.list_all(f.user, &filter).await.unwrap();
    assert_eq!(cash_only.len(), 2);

    let none = TransactionFilter {
        keyword: Some("晚饭".to_string()),
        ..TransactionFilter::default()
    };
    assert!(service.list_all(f.user, &none).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_duplicate_category_is_rejected() {
    let f = fixture().await;
    let categories = CategoryService::new(f.store.clone());
    let input = NewCategory {
        name: "餐饮".to_string(),
        kind: TransactionKind::Expense,
        icon: None,
        color: None,
        sort_order: None,
    };

    let result = categories.create(f.user, input).await;
    assert!(matches!(result, Err(LedgerError::Duplicate(_))));
}

#[tokio::test]
async fn test_account_in_use_cannot_be_deleted() {
    let f = fixture().await;
    let service = TransactionService::new(f.store.clone(), Shanghai);
    let accounts = AccountService::new(f.store.clone());
    service.create(f.user, f.expense("现金", 100)).await.unwrap();

    let result = accounts.delete(f.user, f.account("现金")).await;
    assert!(matches!(result, Err(LedgerError::AccountInUse(1))));

    let spare = accounts
        .create(
            f.user,
            NewAccount {
                name: "储蓄卡".to_string(),
                initial_balance: 10_000,
                icon: None,
                is_default: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(spare.current_balance, 10_000);
    assert!(accounts.delete(f.user, spare.id).await.unwrap());
}

#[tokio::test]
async fn test_account_write_does_not_touch_running_balance() {
    let f = fixture().await;
    let stale = f
        .defaults
        .accounts
        .iter()
        .find(|a| a.name == "现金")
        .cloned()
        .expect("default account");

    let service = TransactionService::new(f.store.clone(), Shanghai);
    service.create(f.user, f.expense("现金", 1200)).await.unwrap();

    let mut scope = f.store.begin().await.unwrap();
    let renamed = Account {
        name: "零钱".to_string(),
        ..stale
    };
    assert!(scope.update_account(&renamed).await.unwrap());
    f.store.commit(scope).await.unwrap();

    assert_eq!(f.balance("现金").await, -1200);

    let accounts = AccountService::new(f.store.clone());
    let patch = AccountPatch {
        initial_balance: Some(500),
        ..AccountPatch::default()
    };
    let updated = accounts.update(f.user, renamed.id, patch).await.unwrap();
    assert_eq!(updated.name, "零钱");
    assert_eq!(updated.current_balance, -700);
}
