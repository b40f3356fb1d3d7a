//! HTTP request handlers organized by domain
//!
//! Each submodule contains handlers for a specific API area.

pub mod budgets;
pub mod categories;
pub mod export;
pub mod history;
pub mod items;
pub mod tips;

// Re-export all handlers for use in router
pub use budgets::*;
pub use categories::*;
pub use export::*;
pub use history::*;
pub use items::*;
pub use tips::*;

use chrono::NaiveDate;

use crate::AppError;

/// Parse an optional YYYY-MM-DD query parameter
pub(crate) fn parse_date(value: Option<&str>, field: &str) -> Result<Option<NaiveDate>, AppError> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .map_err(|_| {
            AppError::bad_request(&format!("Invalid '{}' date format (use YYYY-MM-DD)", field))
        })
}
