//! Money-saving tips
//!
//! - `catalog` - read-only tip content loaded from TOML
//! - `patterns` - spending pattern detection over a budget's items
//! - `generator` - tip selection for a user's budget

mod catalog;
mod generator;
mod patterns;

pub use catalog::{category_key, default_catalog_path, CatalogTip, Season, TipCatalog, TipPriority};
pub use generator::{
    dedup_tips, seasonal_tips, threshold_tips, TipGenerator, TipSource, TipSuggestion,
    FALLBACK_GENERAL_TIPS, MAX_USER_TIPS,
};
pub use patterns::{
    analyze_category_spending, detect_price_increases, find_duplicate_purchases,
    find_frequent_items, CategoryOverspend, CategoryShare, CategorySpending, DuplicatePurchase,
    FrequentItem, PriceIncrease, SpendingPatterns,
};
