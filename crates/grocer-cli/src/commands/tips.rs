//! Tips command implementation

use anyhow::Result;
use grocer_core::db::Database;
use grocer_core::{lifecycle, AuditAction, TipGenerator};

use super::{audit, load_catalog, today};

pub fn cmd_tips(db: &Database, user: &str, budget: Option<i64>) -> Result<()> {
    let budget_id = match budget {
        Some(id) => Some(id),
        None => lifecycle::active_budget(db, user, today())?.map(|b| b.id),
    };

    let catalog = load_catalog();
    let tips = TipGenerator::new(db, &catalog).tips_for_user(user, budget_id, today())?;
    audit(db, user, AuditAction::TipView, "budget", budget_id, None);

    if tips.is_empty() {
        println!("No tips right now.");
        return Ok(());
    }

    println!();
    match budget_id {
        Some(id) => println!("💡 Tips for budget {}", id),
        None => println!("💡 Tips"),
    }
    println!("   ─────────────────────────────────────────────");
    for tip in &tips {
        let title = tip.title.as_deref().unwrap_or(&tip.category);
        println!("   • {}", title);
        println!("     {}", tip.content);
    }

    Ok(())
}
