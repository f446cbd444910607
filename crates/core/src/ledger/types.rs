//! Ledger domain types for accounts, categories and transactions.
//!
//! Amounts are `i64` minor units. A transaction's amount is always stored
//! positive; its sign is derived from [`TransactionKind`] only when it is
//! folded into an account balance.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tally_shared::types::{AccountId, CategoryId, TransactionId, UserId};

/// Whether money flows into or out of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money received; adds to the account balance.
    Income,
    /// Money spent; subtracts from the account balance.
    Expense,
}

impl TransactionKind {
    /// Stable lowercase name used in storage and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(format!("unknown transaction type: {s}")),
        }
    }
}

/// How a transaction was paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash.
    #[default]
    Cash,
    /// WeChat Pay.
    Wechat,
    /// Alipay.
    Alipay,
    /// Bank card or transfer.
    Bank,
}

impl PaymentMethod {
    /// Stable lowercase name used in storage and on the wire.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cash => "cash",
            Self::Wechat => "wechat",
            Self::Alipay => "alipay",
            Self::Bank => "bank",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cash" => Ok(Self::Cash),
            "wechat" => Ok(Self::Wechat),
            "alipay" => Ok(Self::Alipay),
            "bank" => Ok(Self::Bank),
            _ => Err(format!("unknown payment method: {s}")),
        }
    }
}

/// A money account (cash, a card, a wallet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Account ID.
    pub id: AccountId,
    /// Owning user.
    pub user_id: UserId,
    /// Display name.
    pub name: String,
    /// Opening balance in minor units.
    pub initial_balance: i64,
    /// Running balance in minor units.
    pub current_balance: i64,
    /// Icon tag understood by the clients.
    pub icon: String,
    /// Whether new transactions default to this account.
    pub is_default: bool,
    /// Created at.
    pub created_at: DateTime<Utc>,
    /// Updated at.
    pub updated_at: DateTime<Utc>,
}

/// An income or expense category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    /// Category ID.
    pub id: CategoryId,
    /// Owning user.
    pub user_id: UserId,
    /// Name, unique per (user, kind).
    pub name: String,
    /// Which kind of transaction may use this category.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Icon tag.
    pub icon: String,
    /// Color as `#RRGGBB`.
    pub color: String,
    /// Created by provisioning.
    pub is_default: bool,
    /// Position in pickers, ascending.
    pub sort_order: i32,
    /// Created at.
    pub created_at: DateTime<Utc>,
    /// Updated at.
    pub updated_at: DateTime<Utc>,
}

/// A single income or expense record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Transaction ID.
    pub id: TransactionId,
    /// Owning user.
    pub user_id: UserId,
    /// Account whose balance this transaction moves.
    pub account_id: AccountId,
    /// Category.
    pub category_id: CategoryId,
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Positive amount in minor units.
    pub amount: i64,
    /// Calendar date, no time-of-day.
    pub date: NaiveDate,
    /// Free-text note.
    pub note: String,
    /// Payment method.
    pub payment_method: PaymentMethod,
    /// Created at.
    pub created_at: DateTime<Utc>,
    /// Updated at.
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a transaction.
#[derive(Debug, Clone, Deserialize)]
pub struct NewTransaction {
    /// Account to charge or credit.
    pub account_id: AccountId,
    /// Category.
    pub category_id: CategoryId,
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Positive amount in minor units.
    pub amount: i64,
    /// Defaults to today in the configured timezone.
    pub date: Option<NaiveDate>,
    /// Optional note.
    pub note: Option<String>,
    /// Defaults to cash.
    pub payment_method: Option<PaymentMethod>,
}

/// Partial update of a transaction. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionPatch {
    /// New account.
    pub account_id: Option<AccountId>,
    /// New category.
    pub category_id: Option<CategoryId>,
    /// New kind.
    #[serde(rename = "type")]
    pub kind: Option<TransactionKind>,
    /// New amount.
    pub amount: Option<i64>,
    /// New date.
    pub date: Option<NaiveDate>,
    /// New note.
    pub note: Option<String>,
    /// New payment method.
    pub payment_method: Option<PaymentMethod>,
}

/// Filter for listing transactions. All conditions are ANDed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionFilter {
    /// Only this account.
    pub account_id: Option<AccountId>,
    /// Only this category.
    pub category_id: Option<CategoryId>,
    /// Only this kind.
    #[serde(rename = "type")]
    pub kind: Option<TransactionKind>,
    /// On or after this date.
    pub from: Option<NaiveDate>,
    /// On or before this date.
    pub to: Option<NaiveDate>,
    /// Case-insensitive substring of the note.
    pub keyword: Option<String>,
}

impl TransactionFilter {
    /// Whether a transaction passes the filter.
    #[must_use]
    pub fn matches(&self, tx: &Transaction) -> bool {
        self.account_id.is_none_or(|id| tx.account_id == id)
            && self.category_id.is_none_or(|id| tx.category_id == id)
            && self.kind.is_none_or(|kind| tx.kind == kind)
            && self.from.is_none_or(|from| tx.date >= from)
            && self.to.is_none_or(|to| tx.date <= to)
            && self.keyword.as_deref().is_none_or(|kw| {
                tx.note.to_lowercase().contains(&kw.to_lowercase())
            })
    }
}

/// Limit/offset window for list queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    /// Maximum rows returned.
    pub limit: u64,
    /// Rows skipped.
    pub offset: u64,
}

/// Input for creating an account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    /// Display name.
    pub name: String,
    /// Opening balance in minor units; may be negative (credit cards).
    #[serde(default)]
    pub initial_balance: i64,
    /// Icon tag.
    pub icon: Option<String>,
    /// Make this the default account.
    #[serde(default)]
    pub is_default: bool,
}

/// Partial update of an account.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountPatch {
    /// New name.
    pub name: Option<String>,
    /// New icon.
    pub icon: Option<String>,
    /// Set or clear the default flag.
    pub is_default: Option<bool>,
    /// New opening balance; the running balance shifts by the difference.
    pub initial_balance: Option<i64>,
}

/// Input for creating a category.
#[derive(Debug, Clone, Deserialize)]
pub struct NewCategory {
    /// Name.
    pub name: String,
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Icon tag.
    pub icon: Option<String>,
    /// Color as `#RRGGBB`.
    pub color: Option<String>,
    /// Position in pickers.
    pub sort_order: Option<i32>,
}

/// Partial update of a category. The kind cannot change.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryPatch {
    /// New name.
    pub name: Option<String>,
    /// New icon.
    pub icon: Option<String>,
    /// New color.
    pub color: Option<String>,
    /// New position.
    pub sort_order: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("income", TransactionKind::Income)]
    #[case("EXPENSE", TransactionKind::Expense)]
    #[case(" expense ", TransactionKind::Expense)]
    fn test_kind_from_str(#[case] input: &str, #[case] expected: TransactionKind) {
        assert_eq!(input.parse::<TransactionKind>().unwrap(), expected);
    }

    #[test]
    fn test_kind_round_trips_through_str() {
        for kind in [TransactionKind::Income, TransactionKind::Expense] {
            assert_eq!(kind.as_str().parse::<TransactionKind>().unwrap(), kind);
        }
        assert!("transfer".parse::<TransactionKind>().is_err());
    }

    #[test]
    fn test_payment_method_parse_and_default() {
        assert_eq!(PaymentMethod::default(), PaymentMethod::Cash);
        assert_eq!("Alipay".parse::<PaymentMethod>().unwrap(), PaymentMethod::Alipay);
        assert!("paypal".parse::<PaymentMethod>().is_err());
    }

    #[test]
    fn test_filter_matches() {
        let now = Utc::now();
        let tx = Transaction {
            id: TransactionId::new(),
            user_id: UserId::new(),
            account_id: AccountId::new(),
            category_id: CategoryId::new(),
            kind: TransactionKind::Expense,
            amount: 1200,
            date: NaiveDate::from_ymd_opt(2026, 3, 15).unwrap(),
            note: "Lunch with Team".to_string(),
            payment_method: PaymentMethod::Wechat,
            created_at: now,
            updated_at: now,
        };

        assert!(TransactionFilter::default().matches(&tx));
        assert!(
            TransactionFilter {
                keyword: Some("team".into()),
                from: NaiveDate::from_ymd_opt(2026, 3, 15),
                to: NaiveDate::from_ymd_opt(2026, 3, 15),
                ..Default::default()
            }
            .matches(&tx)
        );
        assert!(
            !TransactionFilter {
                kind: Some(TransactionKind::Income),
                ..Default::default()
            }
            .matches(&tx)
        );
        assert!(
            !TransactionFilter {
                to: NaiveDate::from_ymd_opt(2026, 3, 14),
                ..Default::default()
            }
            .matches(&tx)
        );
    }

    #[test]
    fn test_transaction_serializes_kind_as_type() {
        let json = serde_json::json!({
            "account_id": AccountId::new(),
            "category_id": CategoryId::new(),
            "type": "income",
            "amount": 500
        });
        let input: NewTransaction = serde_json::from_value(json).unwrap();
        assert_eq!(input.kind, TransactionKind::Income);
        assert!(input.date.is_none());
    }
}
