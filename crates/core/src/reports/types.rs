//! Report data types.

use chrono::NaiveDate;
use serde::Serialize;
use tally_shared::types::CategoryId;

use crate::ledger::TransactionKind;

/// Totals for a period. Amounts are minor units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PeriodSummary {
    /// Sum of income amounts.
    pub income: i64,
    /// Sum of expense amounts, positive.
    pub expense: i64,
    /// `income - expense`.
    pub net: i64,
    /// Number of transactions.
    pub count: u64,
}

/// One category's slice of a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryBreakdown {
    /// Category ID.
    pub category_id: CategoryId,
    /// Category name; empty if the category is gone.
    pub name: String,
    /// Income or expense.
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    /// Sum of amounts.
    pub total: i64,
    /// Number of transactions.
    pub count: u64,
    /// Share of all same-kind amounts in basis points (10000 = 100%).
    pub share_bp: u32,
}

/// Summary report for a date range.
#[derive(Debug, Clone, Serialize)]
pub struct SummaryReport {
    /// First day, inclusive.
    pub from: NaiveDate,
    /// Last day, inclusive.
    pub to: NaiveDate,
    /// Totals.
    pub summary: PeriodSummary,
    /// Categories sorted by total, largest first.
    pub categories: Vec<CategoryBreakdown>,
}
