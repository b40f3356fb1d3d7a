//! Grocer Core Library
//!
//! Shared functionality for the Grocer grocery budget tracker:
//! - Database access and migrations
//! - Spend aggregation, limit enforcement and threshold alerts
//! - Budget lifecycle and the item write path
//! - Period comparison and spending trends
//! - Money-saving tips from a TOML catalog and spending patterns
//! - CSV import, CSV export and a printable PDF budget report

pub mod aggregate;
pub mod db;
pub mod error;
pub mod export;
pub mod history;
pub mod import;
pub mod ledger;
pub mod lifecycle;
pub mod limits;
pub mod models;
pub mod signal;
pub mod tips;
pub mod tracker;

pub use db::{
    ActivityFilter, ActivityPage, ActivitySummary, AuditAction, AuditEntry, Database, TipQuery,
};
pub use error::{Error, Result};
pub use export::{
    export_filename, CsvExporter, ExportKind, ItemExportOptions, PdfExporter, ReportOptions,
};
pub use history::{
    compare_periods, analyze_spending_trends, ComparisonOutcome, PeriodComparison, SpendingTrends,
    TrendDirection,
};
pub use ledger::{CategoryCatalog, ItemFilter, LedgerStore};
pub use limits::{LimitCheck, LimitViolation};
pub use signal::{signal, SpendingAlert, ThresholdSignal};
pub use tips::{TipCatalog, TipGenerator, TipSuggestion};
pub use tracker::{BatchOutcome, BudgetTracker, ItemPage, ItemWriteOutcome, RunningTotals};
