//! Item command implementations

use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use grocer_core::db::Database;
use grocer_core::models::{ItemUpdate, NewItem};
use grocer_core::{import, AuditAction, BudgetTracker, ItemFilter, TipSuggestion};
use grocer_core::{SpendingAlert, ThresholdSignal};
use tracing::warn;

use super::{audit, load_catalog, parse_date, resolve_budget, resolve_category, today, truncate};

/// Arguments for `grocer items add`
pub struct ItemArgs {
    pub name: String,
    pub price: f64,
    pub category: String,
    pub quantity: i64,
    pub budget: Option<i64>,
    pub essential: bool,
    pub date: Option<String>,
    pub notes: Option<String>,
}

/// Arguments for `grocer items update`
#[derive(Default)]
pub struct ItemChanges {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    pub category: Option<String>,
    pub essential: Option<bool>,
    pub date: Option<String>,
    pub notes: Option<String>,
}

impl ItemChanges {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.price.is_none()
            && self.quantity.is_none()
            && self.category.is_none()
            && self.essential.is_none()
            && self.date.is_none()
            && self.notes.is_none()
    }
}

fn print_feedback(signal: ThresholdSignal, alerts: &[SpendingAlert], tips: &[TipSuggestion]) {
    if signal != ThresholdSignal::None {
        println!("   Signal: {}", signal);
    }
    for alert in alerts {
        println!("   ⚠️  {}", alert.message);
    }
    if !tips.is_empty() {
        println!();
        println!("   💡 Tips:");
        for tip in tips {
            match &tip.title {
                Some(title) => println!("      • {}: {}", title, tip.content),
                None => println!("      • {}", tip.content),
            }
        }
    }
}

pub fn cmd_items_list(
    db: &Database,
    user: &str,
    budget: Option<i64>,
    category: Option<&str>,
    essential: Option<bool>,
    limit: i64,
) -> Result<()> {
    let mut filter = ItemFilter::for_user(user)
        .essential(essential)
        .paginate(limit.max(1), 0);
    filter.budget_id = budget;
    if let Some(category) = category {
        filter.category_id = Some(resolve_category(db, user, category)?.id);
    }

    let page = BudgetTracker::new(db).list_items(&filter)?;

    if page.items.is_empty() {
        println!("No items found.");
        return Ok(());
    }

    let categories = db.list_categories(user)?;
    let category_name = |id: i64| {
        categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
            .unwrap_or("?")
    };

    println!();
    println!(
        "🛒 Items (showing {} of {})",
        page.items.len(),
        page.total_count
    );
    println!("   ───────────────────────────────────────────────────────────────────────");
    for item in &page.items {
        println!(
            "   {:>5}  {}  {:<24} {:<14} {:>3} × ${:<7.2} ${:>8.2} {}",
            item.id,
            item.purchase_date,
            truncate(&item.name, 24),
            truncate(category_name(item.category_id), 14),
            item.quantity,
            item.price,
            item.total_price(),
            if item.is_essential { "★" } else { "" }
        );
    }
    println!();
    println!(
        "   Total ${:.2}, essential ${:.2}",
        page.total_spent, page.essential_spent
    );

    Ok(())
}

pub fn cmd_items_add(db: &Database, user: &str, args: ItemArgs) -> Result<()> {
    let budget = resolve_budget(db, user, args.budget)?;
    let category = resolve_category(db, user, &args.category)?;

    let mut item = NewItem::new(&args.name, args.price, args.quantity, category.id)
        .essential(args.essential);
    if let Some(date) = &args.date {
        item = item.purchased_on(parse_date(date, "date")?);
    }
    item.notes = args.notes;

    let catalog = load_catalog();
    let tracker = BudgetTracker::with_tips(db, &catalog);
    let outcome = match tracker.create_item(user, budget.id, &item, today()) {
        Ok(outcome) => outcome,
        Err(e) => {
            if let Err(log_err) = db.log_audit_failure(
                user,
                AuditAction::ItemCreate,
                Some("item"),
                None,
                Some(&e.to_string()),
            ) {
                warn!(error = %log_err, "Failed to record audit entry");
            }
            return Err(e.into());
        }
    };

    audit(
        db,
        user,
        AuditAction::ItemCreate,
        "item",
        Some(outcome.item.id),
        Some(&format!(
            "budget_id={}, name={}, total={:.2}",
            budget.id,
            outcome.item.name,
            outcome.item.total_price()
        )),
    );

    println!(
        "✅ Added '{}' ({} × ${:.2} = ${:.2}) to '{}'",
        outcome.item.name,
        outcome.item.quantity,
        outcome.item.price,
        outcome.item.total_price(),
        outcome.budget.name
    );
    println!(
        "   Spent ${:.2} of ${:.2} ({:.1}%), ${:.2} left",
        outcome.budget.current_spent,
        outcome.budget.total_limit,
        outcome.budget.percentage_spent,
        outcome.budget.remaining
    );
    print_feedback(outcome.signal, &outcome.alerts, &outcome.tips);

    Ok(())
}

pub fn cmd_items_update(db: &Database, user: &str, id: i64, changes: ItemChanges) -> Result<()> {
    if changes.is_empty() {
        anyhow::bail!("Nothing to update. Pass at least one of --name, --price, --quantity, --category, --essential, --date or --notes.");
    }

    let category_id = match &changes.category {
        Some(category) => Some(resolve_category(db, user, category)?.id),
        None => None,
    };
    let purchase_date = match &changes.date {
        Some(date) => Some(parse_date(date, "date")?),
        None => None,
    };

    let update = ItemUpdate {
        name: changes.name,
        price: changes.price,
        quantity: changes.quantity,
        category_id,
        is_essential: changes.essential,
        purchase_date,
        notes: changes.notes,
    };

    let catalog = load_catalog();
    let outcome = BudgetTracker::with_tips(db, &catalog).update_item(user, id, &update)?;
    audit(
        db,
        user,
        AuditAction::ItemUpdate,
        "item",
        Some(id),
        Some(&format!("total={:.2}", outcome.item.total_price())),
    );

    println!(
        "✅ Updated '{}' (id: {}), now ${:.2}",
        outcome.item.name,
        id,
        outcome.item.total_price()
    );
    println!(
        "   '{}' spent ${:.2} of ${:.2}",
        outcome.budget.name, outcome.budget.current_spent, outcome.budget.total_limit
    );
    print_feedback(outcome.signal, &outcome.alerts, &outcome.tips);

    Ok(())
}

pub fn cmd_items_delete(db: &Database, user: &str, id: i64) -> Result<()> {
    let budget = BudgetTracker::new(db).delete_item(user, id)?;
    audit(db, user, AuditAction::ItemDelete, "item", Some(id), None);

    println!("✅ Deleted item {}", id);
    if let Some(budget) = budget {
        println!(
            "   '{}' spent ${:.2} of ${:.2}",
            budget.name, budget.current_spent, budget.total_limit
        );
    }

    Ok(())
}

pub fn cmd_items_import(db: &Database, user: &str, file: &Path, budget: Option<i64>) -> Result<()> {
    let budget = resolve_budget(db, user, budget)?;
    let reader =
        File::open(file).with_context(|| format!("Failed to open {}", file.display()))?;
    let items = import::parse_items(reader, &db.list_categories(user)?)
        .with_context(|| format!("Failed to read items from {}", file.display()))?;

    if items.is_empty() {
        println!("No items found in {}", file.display());
        return Ok(());
    }

    let outcome = BudgetTracker::new(db).batch_create_items(user, budget.id, &items, today())?;
    audit(
        db,
        user,
        AuditAction::ItemBatchCreate,
        "budget",
        Some(budget.id),
        Some(&format!(
            "created={}, failed={}",
            outcome.summary.created, outcome.summary.failed
        )),
    );

    println!(
        "✅ Imported {} of {} item(s) into '{}'",
        outcome.summary.created, outcome.summary.total, outcome.budget.name
    );
    for error in &outcome.errors {
        println!("   ✗ row {} '{}': {}", error.index + 1, error.name, error.error);
    }
    println!(
        "   Spent ${:.2} of ${:.2} ({:.1}%)",
        outcome.budget.current_spent, outcome.budget.total_limit, outcome.budget.percentage_spent
    );

    Ok(())
}
