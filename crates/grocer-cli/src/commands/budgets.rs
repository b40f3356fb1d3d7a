//! Budget command implementations

use anyhow::{Context, Result};
use grocer_core::db::Database;
use grocer_core::lifecycle;
use grocer_core::models::{Budget, BudgetUpdate, CategoryAllocation, NewBudget};
use grocer_core::{signal, AuditAction, BudgetTracker};

use super::{audit, parse_date, resolve_category, today, truncate};

/// Parse CATEGORY=AMOUNT pairs into allocations
pub fn parse_allocations(
    db: &Database,
    user: &str,
    pairs: &[String],
) -> Result<Vec<CategoryAllocation>> {
    pairs
        .iter()
        .map(|pair| {
            let (category, amount) = pair
                .split_once('=')
                .with_context(|| format!("Invalid allocation '{}' (use CATEGORY=AMOUNT)", pair))?;
            let limit: f64 = amount
                .trim()
                .parse()
                .with_context(|| format!("Invalid amount in allocation '{}'", pair))?;
            let category = resolve_category(db, user, category)?;
            Ok(CategoryAllocation {
                category_id: category.id,
                limit,
            })
        })
        .collect()
}

fn print_budget_line(budget: &Budget) {
    let marker = if budget.is_effectively_active(today()) {
        "●"
    } else if budget.is_active {
        "○"
    } else {
        " "
    };
    println!(
        "   {} {:>4}  {:<24} {} → {}  ${:>8.2} / ${:<8.2} {:>5.1}%",
        marker,
        budget.id,
        truncate(&budget.name, 24),
        budget.period.start,
        budget.period.end,
        budget.current_spent,
        budget.total_limit,
        budget.percentage_spent()
    );
}

pub fn cmd_budgets_list(db: &Database, user: &str) -> Result<()> {
    let budgets = db.list_budgets(user)?;

    if budgets.is_empty() {
        println!("No budgets yet. Create one with 'grocer budgets create'.");
        return Ok(());
    }

    println!();
    println!("💰 Budgets ({})", user);
    println!("   ─────────────────────────────────────────────────────────────────────────");
    for budget in &budgets {
        print_budget_line(budget);
    }
    println!();
    println!("   ● active   ○ flagged active but period has ended");

    Ok(())
}

pub fn cmd_budgets_create(
    db: &Database,
    user: &str,
    name: &str,
    limit: f64,
    start: &str,
    end: &str,
    allocations: &[String],
) -> Result<()> {
    let new_budget = NewBudget {
        name: name.to_string(),
        total_limit: limit,
        start_date: parse_date(start, "start")?,
        end_date: parse_date(end, "end")?,
        categories: parse_allocations(db, user, allocations)?,
    };

    let budget = BudgetTracker::new(db).create_budget(user, &new_budget)?;
    audit(
        db,
        user,
        AuditAction::BudgetCreate,
        "budget",
        Some(budget.id),
        Some(&format!("name={}, total_limit={:.2}", budget.name, budget.total_limit)),
    );

    println!(
        "✅ Created budget '{}' (id: {}) with a ${:.2} limit",
        budget.name, budget.id, budget.total_limit
    );
    if !budget.categories.is_empty() {
        println!(
            "   {} category limit(s), ${:.2} allocated",
            budget.categories.len(),
            budget.allocated_total()
        );
    }
    println!("   This is now your active budget.");

    Ok(())
}

pub fn cmd_budgets_show(db: &Database, user: &str, id: i64) -> Result<()> {
    let tracker = BudgetTracker::new(db);
    let budget = tracker.get_budget(user, id)?;
    let totals = tracker.running_totals(user, id)?;

    println!();
    println!("💰 {} (id: {})", budget.name, budget.id);
    println!("   ─────────────────────────────────────────────────────────");
    println!("   Period:     {} → {}", budget.period.start, budget.period.end);
    println!(
        "   Status:     {}",
        if budget.is_effectively_active(today()) {
            "active"
        } else if budget.is_active {
            "ended"
        } else {
            "inactive"
        }
    );
    println!("   Limit:      ${:.2}", budget.total_limit);
    println!(
        "   Spent:      ${:.2} ({:.1}%)",
        budget.current_spent,
        budget.percentage_spent()
    );
    println!("   Remaining:  ${:.2}", budget.remaining());
    println!("   Signal:     {}", signal(budget.percentage_spent()));

    if totals.categories.is_empty() {
        println!();
        println!("   No items recorded yet.");
        return Ok(());
    }

    println!();
    println!("   {:<18} {:>10} {:>6} {:>10} {:>8}", "Category", "Spent", "Items", "Limit", "Used");
    for category in &totals.categories {
        let limit = category
            .limit
            .map(|l| format!("${:.2}", l))
            .unwrap_or_else(|| "-".to_string());
        let used = category
            .percentage_used
            .map(|p| format!("{:.1}%", p))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "   {:<18} {:>10} {:>6} {:>10} {:>8}",
            truncate(&category.name, 18),
            format!("${:.2}", category.spent),
            category.item_count,
            limit,
            used
        );
    }
    println!();
    println!(
        "   {} item(s), {} essential, average ${:.2}",
        totals.summary.total_items,
        totals.summary.essential_items,
        totals.summary.average_item_cost
    );

    Ok(())
}

pub fn cmd_budgets_update(
    db: &Database,
    user: &str,
    id: i64,
    name: Option<String>,
    limit: Option<f64>,
    is_active: Option<bool>,
) -> Result<()> {
    if name.is_none() && limit.is_none() && is_active.is_none() {
        anyhow::bail!("Nothing to update. Pass --name, --limit, --activate or --deactivate.");
    }

    let update = BudgetUpdate {
        name,
        total_limit: limit,
        categories: None,
        is_active,
    };
    let budget = BudgetTracker::new(db).update_budget(user, id, &update)?;
    audit(db, user, AuditAction::BudgetUpdate, "budget", Some(id), None);

    println!("✅ Updated budget '{}' (id: {})", budget.name, budget.id);
    print_budget_line(&budget);

    Ok(())
}

pub fn cmd_budgets_allocate(db: &Database, user: &str, id: i64, pairs: &[String]) -> Result<()> {
    let allocations = parse_allocations(db, user, pairs)?;
    let count = allocations.len();

    let budget = BudgetTracker::new(db).update_allocations(user, id, allocations)?;
    audit(
        db,
        user,
        AuditAction::BudgetUpdate,
        "budget",
        Some(id),
        Some(&format!("allocations={}", count)),
    );

    if count == 0 {
        println!("✅ Cleared category limits for '{}'", budget.name);
    } else {
        println!(
            "✅ Set {} category limit(s) for '{}' (${:.2} of ${:.2} allocated)",
            count,
            budget.name,
            budget.allocated_total(),
            budget.total_limit
        );
    }

    Ok(())
}

pub fn cmd_budgets_delete(db: &Database, user: &str, id: i64) -> Result<()> {
    let budget = BudgetTracker::new(db).get_budget(user, id)?;
    BudgetTracker::new(db).delete_budget(user, id)?;
    audit(db, user, AuditAction::BudgetDelete, "budget", Some(id), None);

    println!("✅ Deleted budget '{}' (id: {})", budget.name, id);

    Ok(())
}

pub fn cmd_budgets_active(db: &Database, user: &str) -> Result<()> {
    match lifecycle::active_budget(db, user, today())? {
        Some(budget) => cmd_budgets_show(db, user, budget.id),
        None => {
            println!("No active budget. Create one with 'grocer budgets create'.");
            Ok(())
        }
    }
}
