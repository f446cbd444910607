//! Report generation service.

use std::collections::HashMap;

use chrono::{Datelike, NaiveDate};
use tally_shared::types::CategoryId;

use super::types::{CategoryBreakdown, PeriodSummary, SummaryReport};
use crate::ledger::{Category, Transaction, TransactionKind};

/// Basis points in a whole.
pub const FULL_SHARE_BP: u32 = 10_000;

/// Service for generating period reports.
pub struct ReportService;

impl ReportService {
    /// Totals income, expense, net and count.
    ///
    /// Saturates instead of overflowing.
    #[must_use]
    pub fn summarize(transactions: &[Transaction]) -> PeriodSummary {
        let mut summary = PeriodSummary::default();
        for tx in transactions {
            match tx.kind {
                TransactionKind::Income => {
                    summary.income = summary.income.saturating_add(tx.amount);
                }
                TransactionKind::Expense => {
                    summary.expense = summary.expense.saturating_add(tx.amount);
                }
            }
            summary.count += 1;
        }
        summary.net = summary.income.saturating_sub(summary.expense);
        summary
    }

    /// Groups transactions by category, largest total first.
    ///
    /// Ties are broken by name so the order is stable.
    #[must_use]
    pub fn breakdown(
        transactions: &[Transaction],
        categories: &[Category],
    ) -> Vec<CategoryBreakdown> {
        let names: HashMap<CategoryId, &str> =
            categories.iter().map(|c| (c.id, c.name.as_str())).collect();

        let mut groups: HashMap<CategoryId, CategoryBreakdown> = HashMap::new();
        for tx in transactions {
            let entry = groups.entry(tx.category_id).or_insert_with(|| CategoryBreakdown {
                category_id: tx.category_id,
                name: names.get(&tx.category_id).copied().unwrap_or_default().to_string(),
                kind: tx.kind,
                total: 0,
                count: 0,
                share_bp: 0,
            });
            entry.total = entry.total.saturating_add(tx.amount);
            entry.count += 1;
        }

        let summary = Self::summarize(transactions);
        let mut rows: Vec<CategoryBreakdown> = groups.into_values().collect();
        rows.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.name.cmp(&b.name)));
        apportion(&mut rows, TransactionKind::Income, summary.income);
        apportion(&mut rows, TransactionKind::Expense, summary.expense);
        rows
    }

    /// Builds the full report for `[from, to]`.
    ///
    /// The caller passes the transactions already restricted to the range.
    #[must_use]
    pub fn generate_summary(
        from: NaiveDate,
        to: NaiveDate,
        transactions: &[Transaction],
        categories: &[Category],
    ) -> SummaryReport {
        SummaryReport {
            from,
            to,
            summary: Self::summarize(transactions),
            categories: Self::breakdown(transactions, categories),
        }
    }

    /// First and last day of the month containing `date`.
    #[must_use]
    pub fn month_bounds(date: NaiveDate) -> (NaiveDate, NaiveDate) {
        let first = date.with_day(1).unwrap_or(date);
        let last = first
            .checked_add_months(chrono::Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(date);
        (first, last)
    }
}

/// Splits [`FULL_SHARE_BP`] across the rows of one kind in proportion to
/// their totals. Each row gets its rounded-down share, then the leftover
/// points go to the largest remainders, earlier rows first on ties, so the
/// shares of a non-empty kind add up to exactly one whole.
fn apportion(rows: &mut [CategoryBreakdown], kind: TransactionKind, whole: i64) {
    if whole <= 0 {
        return;
    }
    let whole = i128::from(whole);
    let full = i128::from(FULL_SHARE_BP);
    let mut assigned = 0;
    let mut remainders = Vec::new();
    for (index, row) in rows.iter_mut().enumerate().filter(|(_, row)| row.kind == kind) {
        let scaled = i128::from(row.total.max(0)) * full;
        let bp = (scaled / whole).min(full);
        row.share_bp = u32::try_from(bp).unwrap_or(FULL_SHARE_BP);
        assigned += bp;
        remainders.push((scaled % whole, index));
    }
    remainders.sort_by(|a, b| b.0.cmp(&a.0));
    let leftover = usize::try_from(full - assigned).unwrap_or(0);
    for &(_, index) in remainders.iter().take(leftover) {
        rows[index].share_bp += 1;
    }
}
