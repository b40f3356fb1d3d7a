//! Category command implementations

use anyhow::Result;
use grocer_core::db::Database;
use grocer_core::models::NewCategory;
use grocer_core::AuditAction;

use super::{audit, resolve_category, truncate};

pub fn cmd_categories_list(db: &Database, user: &str) -> Result<()> {
    let categories = db.list_categories(user)?;

    println!();
    println!("🏷️  Categories");
    println!("   ─────────────────────────────────────────────");
    for category in &categories {
        let parent = category
            .parent_id
            .and_then(|pid| categories.iter().find(|c| c.id == pid))
            .map(|p| format!("  (in {})", p.name))
            .unwrap_or_default();
        println!(
            "   {:>4}  {} {:<20} {}{}{}",
            category.id,
            category.icon,
            truncate(&category.name, 20),
            category.color,
            if category.is_system { "" } else { "  custom" },
            parent
        );
    }

    Ok(())
}

pub fn cmd_categories_add(
    db: &Database,
    user: &str,
    name: &str,
    icon: Option<&str>,
    color: Option<&str>,
    parent: Option<&str>,
) -> Result<()> {
    let parent_id = match parent {
        Some(parent) => Some(resolve_category(db, user, parent)?.id),
        None => None,
    };

    let category = db.create_category(
        user,
        &NewCategory {
            name: name.to_string(),
            icon: icon.map(str::to_string),
            color: color.map(str::to_string),
            parent_id,
        },
    )?;
    audit(
        db,
        user,
        AuditAction::CategoryCreate,
        "category",
        Some(category.id),
        Some(&format!("name={}", category.name)),
    );

    println!(
        "✅ Added category {} '{}' (id: {})",
        category.icon, category.name, category.id
    );

    Ok(())
}

pub fn cmd_categories_delete(db: &Database, user: &str, name_or_id: &str) -> Result<()> {
    let category = resolve_category(db, user, name_or_id)?;
    if category.is_system {
        anyhow::bail!("'{}' is a built-in category and cannot be deleted", category.name);
    }

    db.delete_category(category.id, user)?;
    audit(
        db,
        user,
        AuditAction::CategoryDelete,
        "category",
        Some(category.id),
        None,
    );

    println!("✅ Deleted category '{}'", category.name);

    Ok(())
}
