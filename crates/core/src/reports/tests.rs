//! Tests for the reports module.

use chrono::{NaiveDate, Utc};
use proptest::prelude::*;
use rstest::rstest;
use tally_shared::types::{AccountId, CategoryId, TransactionId, UserId};

use super::service::{FULL_SHARE_BP, ReportService};
use crate::ledger::{Category, PaymentMethod, Transaction, TransactionKind};

fn tx(category: CategoryId, kind: TransactionKind, amount: i64) -> Transaction {
    let now = Utc::now();
    Transaction {
        id: TransactionId::new(),
        user_id: UserId::new(),
        account_id: AccountId::new(),
        category_id: category,
        kind,
        amount,
        date: NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        note: String::new(),
        payment_method: PaymentMethod::Cash,
        created_at: now,
        updated_at: now,
    }
}

fn category(name: &str, kind: TransactionKind) -> Category {
    let now = Utc::now();
    Category {
        id: CategoryId::new(),
        user_id: UserId::new(),
        name: name.to_string(),
        kind,
        icon: "tag".to_string(),
        color: "#999999".to_string(),
        is_default: true,
        sort_order: 1,
        created_at: now,
        updated_at: now,
    }
}

#[test]
fn test_summarize_totals() {
    let food = CategoryId::new();
    let salary = CategoryId::new();
    let txs = vec![
        tx(food, TransactionKind::Expense, 3500),
        tx(food, TransactionKind::Expense, 1500),
        tx(salary, TransactionKind::Income, 20_000),
    ];

    let summary = ReportService::summarize(&txs);

    assert_eq!(summary.income, 20_000);
    assert_eq!(summary.expense, 5000);
    assert_eq!(summary.net, 15_000);
    assert_eq!(summary.count, 3);
}

#[test]
fn test_breakdown_sorted_with_shares() {
    let food = category("餐饮", TransactionKind::Expense);
    let transport = category("交通", TransactionKind::Expense);
    let txs = vec![
        tx(transport.id, TransactionKind::Expense, 2500),
        tx(food.id, TransactionKind::Expense, 5000),
        tx(food.id, TransactionKind::Expense, 2500),
    ];

    let rows = ReportService::breakdown(&txs, &[food.clone(), transport.clone()]);

    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].name, "餐饮");
    assert_eq!(rows[0].total, 7500);
    assert_eq!(rows[0].count, 2);
    assert_eq!(rows[0].share_bp, 7500);
    assert_eq!(rows[1].share_bp, 2500);
}

#[test]
fn test_thirds_hand_leftover_point_to_first_row() {
    let txs: Vec<_> = ["房租", "水电", "网费"]
        .iter()
        .map(|name| {
            let cat = category(name, TransactionKind::Expense);
            tx(cat.id, TransactionKind::Expense, 100)
        })
        .collect();

    let rows = ReportService::breakdown(&txs, &[]);

    let shares: Vec<u32> = rows.iter().map(|r| r.share_bp).collect();
    assert_eq!(shares.iter().sum::<u32>(), FULL_SHARE_BP);
    assert_eq!(shares[0], 3334);
    assert_eq!(&shares[1..], &[3333, 3333]);
}

#[test]
fn test_income_and_expense_split_separately() {
    let salary = category("工资", TransactionKind::Income);
    let food = category("餐饮", TransactionKind::Expense);
    let transport = category("交通", TransactionKind::Expense);
    let txs = vec![
        tx(salary.id, TransactionKind::Income, 900),
        tx(food.id, TransactionKind::Expense, 200),
        tx(transport.id, TransactionKind::Expense, 100),
    ];

    let rows = ReportService::breakdown(&txs, &[salary, food, transport]);

    let share = |name: &str| rows.iter().find(|r| r.name == name).unwrap().share_bp;
    assert_eq!(share("工资"), FULL_SHARE_BP);
    assert_eq!(share("餐饮"), 6667);
    assert_eq!(share("交通"), 3333);
}

#[test]
fn test_breakdown_unknown_category_has_empty_name() {
    let txs = [tx(CategoryId::new(), TransactionKind::Income, 100)];
    let rows = ReportService::breakdown(&txs, &[]);
    assert_eq!(rows[0].name, "");
    assert_eq!(rows[0].share_bp, FULL_SHARE_BP);
}

#[rstest]
#[case((2026, 2, 14), (2026, 2, 1), (2026, 2, 28))]
#[case((2024, 2, 29), (2024, 2, 1), (2024, 2, 29))]
#[case((2026, 12, 31), (2026, 12, 1), (2026, 12, 31))]
fn test_month_bounds(
    #[case] date: (i32, u32, u32),
    #[case] first: (i32, u32, u32),
    #[case] last: (i32, u32, u32),
) {
    let d = |(y, m, day): (i32, u32, u32)| NaiveDate::from_ymd_opt(y, m, day).unwrap();
    assert_eq!(ReportService::month_bounds(d(date)), (d(first), d(last)));
}

proptest! {
    /// Shares of one kind add up to exactly one whole.
    #[test]
    fn prop_expense_shares_sum_to_whole(amounts in prop::collection::vec(1i64..1_000_000, 1..12)) {
        let txs: Vec<_> = amounts
            .iter()
            .map(|a| tx(CategoryId::new(), TransactionKind::Expense, *a))
            .collect();
        let rows = ReportService::breakdown(&txs, &[]);
        let total_bp: u32 = rows.iter().map(|r| r.share_bp).sum();
        prop_assert_eq!(total_bp, FULL_SHARE_BP);
    }

    /// Net is income minus expense.
    #[test]
    fn prop_net_is_income_minus_expense(
        incomes in prop::collection::vec(1i64..1_000_000, 0..8),
        expenses in prop::collection::vec(1i64..1_000_000, 0..8),
    ) {
        let cat = CategoryId::new();
        let txs: Vec<_> = incomes
            .iter()
            .map(|a| tx(cat, TransactionKind::Income, *a))
            .chain(expenses.iter().map(|a| tx(cat, TransactionKind::Expense, *a)))
            .collect();
        let summary = ReportService::summarize(&txs);
        prop_assert_eq!(summary.net, incomes.iter().sum::<i64>() - expenses.iter().sum::<i64>());
        prop_assert_eq!(summary.count, u64::try_from(txs.len()).unwrap());
    }
}
