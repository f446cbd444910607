//! CSV export of transactions.
//!
//! The file opens with a UTF-8 BOM so spreadsheet tools pick the right
//! encoding for Chinese text. Commas in notes become the full-width `，`
//! so the note column survives naive comma splitting.

use std::collections::HashMap;

use tally_shared::AppError;
use tally_shared::types::{AccountId, CategoryId, Money};
use thiserror::Error;

use crate::ledger::{Account, Category, Transaction};

/// UTF-8 byte order mark.
pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Header row, in column order.
pub const CSV_HEADER: [&str; 6] = ["date", "type", "amount", "category", "account", "note"];

/// Errors from writing the CSV body.
#[derive(Debug, Error)]
pub enum ExportError {
    /// The CSV writer failed.
    #[error("CSV write failed: {0}")]
    Csv(#[from] csv::Error),

    /// Flushing the buffer failed.
    #[error("CSV flush failed: {0}")]
    Flush(String),
}

impl From<ExportError> for AppError {
    fn from(err: ExportError) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Renders transactions as CSV bytes, BOM first.
///
/// Category and account names are looked up in the given records; an
/// unknown id renders as an empty cell.
///
/// # Errors
///
/// Returns [`ExportError`] if the writer fails.
pub fn transactions_csv(
    transactions: &[Transaction],
    accounts: &[Account],
    categories: &[Category],
) -> Result<Vec<u8>, ExportError> {
    let account_names: HashMap<AccountId, &str> =
        accounts.iter().map(|a| (a.id, a.name.as_str())).collect();
    let category_names: HashMap<CategoryId, &str> =
        categories.iter().map(|c| (c.id, c.name.as_str())).collect();

    let mut wtr = csv::Writer::from_writer(UTF8_BOM.to_vec());
    wtr.write_record(CSV_HEADER)?;
    for tx in transactions {
        let note = sanitize_note(&tx.note);
        wtr.write_record([
            tx.date.to_string().as_str(),
            tx.kind.as_str(),
            Money::from_minor(tx.amount).to_string().as_str(),
            category_names.get(&tx.category_id).copied().unwrap_or_default(),
            account_names.get(&tx.account_id).copied().unwrap_or_default(),
            note.as_str(),
        ])?;
    }
    wtr.into_inner().map_err(|e| ExportError::Flush(e.to_string()))
}

/// Replaces ASCII commas with the full-width comma.
#[must_use]
pub fn sanitize_note(note: &str) -> String {
    note.replace(',', "，")
}
