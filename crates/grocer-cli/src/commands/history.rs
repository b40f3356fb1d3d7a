//! Period comparison, spending trends and activity log commands

use anyhow::{Context, Result};
use grocer_core::db::Database;
use grocer_core::{
    analyze_spending_trends, compare_periods, ActivityFilter, AuditAction, ComparisonOutcome,
    TrendDirection,
};

use super::{today, truncate};

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!(
        "{}",
        serde_json::to_string_pretty(value).context("Failed to serialize output")?
    );
    Ok(())
}

fn signed(amount: f64) -> String {
    if amount >= 0.0 {
        format!("+${:.2}", amount)
    } else {
        format!("-${:.2}", amount.abs())
    }
}

pub fn cmd_compare(db: &Database, user: &str, budget: i64, json: bool) -> Result<()> {
    let outcome = compare_periods(db, user, budget)?;

    if json {
        return print_json(&outcome);
    }

    let comparison = match outcome {
        ComparisonOutcome::Compared(comparison) => comparison,
        ComparisonOutcome::NoPreviousPeriod => {
            println!("No earlier budget to compare with.");
            return Ok(());
        }
    };

    println!();
    println!(
        "📊 {} ({} → {}) vs {} ({} → {})",
        comparison.current.name,
        comparison.current.period.start,
        comparison.current.period.end,
        comparison.previous.name,
        comparison.previous.period.start,
        comparison.previous.period.end
    );
    println!("   ─────────────────────────────────────────────────────────");
    println!(
        "   Total: ${:.2} vs ${:.2}  ({}, {:+.1}%)",
        comparison.current.total_spent,
        comparison.previous.total_spent,
        signed(comparison.total_change),
        comparison.total_change_percent
    );
    println!();
    println!("   {:<18} {:>10} {:>10} {:>11} {:>8}", "Category", "Now", "Before", "Change", "%");
    for category in &comparison.categories {
        println!(
            "   {:<18} {:>10} {:>10} {:>11} {:>7.1}%",
            truncate(&category.name, 18),
            format!("${:.2}", category.current),
            format!("${:.2}", category.previous),
            signed(category.change),
            category.change_percent
        );
    }

    Ok(())
}

pub fn cmd_trends(db: &Database, user: &str, days: i64, json: bool) -> Result<()> {
    let trends = analyze_spending_trends(db, user, days, today())?;

    if json {
        return print_json(&trends);
    }

    println!();
    println!(
        "📈 Spending trends, {} → {} ({} days)",
        trends.from, trends.to, trends.window_days
    );
    println!("   ─────────────────────────────────────────────");

    if trends.weekly_spending.is_empty() {
        println!("   No purchases in this window.");
        return Ok(());
    }

    for week in &trends.weekly_spending {
        println!("   Week of {}  ${:>9.2}", week.week_start, week.total);
    }
    println!();
    println!(
        "   {} item(s), ${:.2} total, ${:.2} per week",
        trends.total_items, trends.total_spent, trends.weekly_average
    );
    let direction = match trends.trend {
        TrendDirection::Increasing => "↑ increasing",
        TrendDirection::Decreasing => "↓ decreasing",
        TrendDirection::Stable => "→ stable",
    };
    println!("   Trend: {}", direction);

    Ok(())
}

pub fn cmd_activity(db: &Database, user: &str, action: Option<&str>, limit: i64) -> Result<()> {
    let mut filter = ActivityFilter::for_user(user);
    filter.action = action
        .map(|a| a.parse::<AuditAction>())
        .transpose()
        .map_err(anyhow::Error::msg)?;
    filter.per_page = limit.clamp(1, 1000);

    let page = db.list_user_activity(&filter)?;

    if page.entries.is_empty() {
        println!("No activity recorded.");
        return Ok(());
    }

    println!();
    println!("📜 Activity (showing {} of {})", page.entries.len(), page.total);
    println!("   ─────────────────────────────────────────────────────────");
    for entry in &page.entries {
        let entity = match (&entry.entity_type, entry.entity_id) {
            (Some(kind), Some(id)) => format!("{} {}", kind, id),
            (Some(kind), None) => kind.clone(),
            _ => String::new(),
        };
        println!(
            "   {} {}  {:<18} {:<14} {}",
            if entry.success { "✓" } else { "✗" },
            entry.timestamp,
            entry.action,
            entity,
            entry.details.as_deref().map(|d| truncate(d, 40)).unwrap_or_default()
        );
    }

    Ok(())
}

pub fn cmd_activity_summary(db: &Database, user: &str, days: i64) -> Result<()> {
    if days < 1 {
        anyhow::bail!("--days must be at least 1");
    }
    let summary = db.activity_summary(user, days)?;

    println!();
    println!("📜 Activity over the last {} day(s)", summary.days);
    println!("   ─────────────────────────────────────────────");
    println!(
        "   {} action(s), {} failed",
        summary.total_actions, summary.failed_actions
    );

    if summary.by_action.is_empty() {
        return Ok(());
    }

    println!();
    for (action, count) in &summary.by_action {
        println!("   {:<18} {:>5}", action, count);
    }
    println!();
    for day in &summary.by_day {
        println!("   {}  {:>5}", day.date, day.total);
    }

    Ok(())
}
