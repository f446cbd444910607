//! Period summaries over a user's transactions.
//!
//! - Income, expense and net totals
//! - Per-category breakdown with shares
//! - Month boundaries for the default period

pub mod service;
pub mod types;

#[cfg(test)]
mod tests;

pub use service::ReportService;
pub use types::*;
