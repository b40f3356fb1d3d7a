//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `core` - Init and shared utilities (open_db, argument resolution)
//! - `budgets` - Budget commands (list, create, show, update, allocate, delete, active)
//! - `items` - Item commands (list, add, update, delete, CSV import)
//! - `categories` - Category commands (list, add, delete)
//! - `tips` - Money-saving tips
//! - `history` - Period comparison, trends and activity log
//! - `export` - CSV exports
//! - `serve` - Web server command

pub mod budgets;
pub mod categories;
pub mod core;
pub mod export;
pub mod history;
pub mod items;
pub mod serve;
pub mod tips;

// Re-export command functions for main.rs
pub use budgets::*;
pub use categories::*;
pub use core::*;
pub use export::*;
pub use history::*;
pub use items::*;
pub use serve::*;
pub use tips::*;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}
