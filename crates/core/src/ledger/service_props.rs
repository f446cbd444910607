//! Property-based tests for the transaction lifecycle.
//!
//! After any sequence of creates, updates and deletes, each account's
//! running balance equals its opening balance plus the signed sum of the
//! transactions that still reference it.

use chrono::NaiveDate;
use chrono_tz::Asia::Shanghai;
use proptest::prelude::*;
use tally_shared::types::UserId;

use super::balance::signed_delta;
use super::provisioning::initialize_defaults;
use super::service::TransactionService;
use super::types::{NewTransaction, TransactionFilter, TransactionKind, TransactionPatch};
use crate::store::memory::MemoryStore;

#[derive(Debug, Clone)]
enum Op {
    Create { account: usize, income: bool, amount: i64 },
    Update { target: usize, account: Option<usize>, amount: Option<i64> },
    Delete { target: usize },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0usize..4, any::<bool>(), 1i64..1_000_000)
            .prop_map(|(account, income, amount)| Op::Create { account, income, amount }),
        (0usize..16, prop::option::of(0usize..4), prop::option::of(1i64..1_000_000))
            .prop_map(|(target, account, amount)| Op::Update { target, account, amount }),
        (0usize..16).prop_map(|target| Op::Delete { target }),
    ]
}

fn run(ops: Vec<Op>) -> Result<(), TestCaseError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .map_err(|e| TestCaseError::fail(e.to_string()))?;

    runtime.block_on(async move {
        let store = MemoryStore::new();
        let user = UserId::new();
        let defaults = initialize_defaults(&store, user).await.unwrap();
        let service = TransactionService::new(store.clone(), Shanghai);
        let category_for = |kind: TransactionKind| {
            defaults
                .categories
                .iter()
                .find(|c| c.kind == kind)
                .map(|c| c.id)
                .unwrap()
        };

        let mut live = Vec::new();
        for op in ops {
            match op {
                Op::Create { account, income, amount } => {
                    let kind = if income {
                        TransactionKind::Income
                    } else {
                        TransactionKind::Expense
                    };
                    let input = NewTransaction {
                        account_id: defaults.accounts[account].id,
                        category_id: category_for(kind),
                        kind,
                        amount,
                        date: NaiveDate::from_ymd_opt(2026, 1, 1),
                        note: None,
                        payment_method: None,
                    };
                    live.push(service.create(user, input).await.unwrap().id);
                }
                Op::Update { target, account, amount } => {
                    if let Some(id) = live.get(target % live.len().max(1)).copied() {
                        let patch = TransactionPatch {
                            account_id: account.map(|i| defaults.accounts[i].id),
                            amount,
                            ..TransactionPatch::default()
                        };
                        service.update(user, id, patch).await.unwrap();
                    }
                }
                Op::Delete { target } => {
                    if !live.is_empty() {
                        let id = live.remove(target % live.len());
                        prop_assert!(service.delete(user, id).await.unwrap());
                    }
                }
            }
        }

        let remaining = service.list_all(user, &TransactionFilter::default()).await.unwrap();
        for account in &defaults.accounts {
            let expected: i64 = account.initial_balance
                + remaining
                    .iter()
                    .filter(|t| t.account_id == account.id)
                    .map(|t| signed_delta(t.kind, t.amount))
                    .sum::<i64>();
            prop_assert_eq!(store.balance_of(account.id), Some(expected));
        }
        Ok(())
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Balances stay consistent with the surviving transactions.
    #[test]
    fn prop_balances_match_transactions(ops in prop::collection::vec(op_strategy(), 1..30)) {
        run(ops)?;
    }
}
