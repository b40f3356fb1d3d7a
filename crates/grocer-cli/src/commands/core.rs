//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` - Shared utility to open the database
//! - `cmd_init` - Initialize the database
//! - Resolution of budget, category and date arguments

use std::path::Path;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use grocer_core::db::Database;
use grocer_core::lifecycle;
use grocer_core::models::{Budget, Category};
use grocer_core::{AuditAction, BudgetTracker, TipCatalog};
use tracing::{error, warn};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path
        .to_str()
        .context("Database path must be valid UTF-8")?;
    if no_encrypt {
        Database::new_unencrypted(path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(path_str).context("Failed to open database")
    }
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;
    println!("   Seeded system categories");

    let catalog = TipCatalog::load().context("Failed to load tip catalog")?;
    let seeded = seed_tips(&db, &catalog)?;
    println!("   Seeded {} stored tip(s)", seeded);

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Create a budget: grocer budgets create Weekly --limit 150 --start 2024-06-01 --end 2024-06-07");
    println!("  2. Record a purchase: grocer items add Apples --price 3.50 --category Produce");
    println!("  3. Start web UI: grocer serve");

    Ok(())
}

/// Insert the catalog's stored tips (idempotent)
pub fn seed_tips(db: &Database, catalog: &TipCatalog) -> Result<usize> {
    db.seed_tips(catalog.stored_tips())
        .context("Failed to seed stored tips")
}

/// The configured tip catalog, or the built-in one if it cannot be read
pub fn load_catalog() -> TipCatalog {
    TipCatalog::load()
        .or_else(|e| {
            warn!(error = %e, "Failed to load tip catalog, using built-in tips");
            TipCatalog::embedded()
        })
        .unwrap_or_else(|e| {
            error!(error = %e, "Built-in tip catalog is invalid, serving no tips");
            TipCatalog::default()
        })
}

/// Record a completed command in the audit log. The command's own work is
/// already done, so a failed insert is only logged.
pub fn audit(
    db: &Database,
    user: &str,
    action: AuditAction,
    entity_type: &str,
    entity_id: Option<i64>,
    details: Option<&str>,
) {
    if let Err(e) = db.log_audit(user, action, Some(entity_type), entity_id, details) {
        warn!(error = %e, action = %action, "Failed to record audit entry");
    }
}

/// Today's date on the local calendar
pub fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Parse a YYYY-MM-DD argument
pub fn parse_date(value: &str, flag: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .with_context(|| format!("Invalid --{} date '{}' (use YYYY-MM-DD)", flag, value))
}

/// Resolve a category by ID or case-insensitive name
pub fn resolve_category(db: &Database, user: &str, arg: &str) -> Result<Category> {
    let found = match arg.trim().parse::<i64>() {
        Ok(id) => db.get_visible_category(id, user)?,
        Err(_) => db.find_category_by_name(arg, user)?,
    };
    found.ok_or_else(|| {
        anyhow::anyhow!(
            "Category not found: {}. Run 'grocer categories' to see available categories.",
            arg
        )
    })
}

/// The given budget, or the active budget when none is given
pub fn resolve_budget(db: &Database, user: &str, id: Option<i64>) -> Result<Budget> {
    match id {
        Some(id) => Ok(BudgetTracker::new(db).get_budget(user, id)?),
        None => lifecycle::active_budget(db, user, today())?.ok_or_else(|| {
            anyhow::anyhow!(
                "No active budget. Create one with 'grocer budgets create' or pass --budget."
            )
        }),
    }
}
