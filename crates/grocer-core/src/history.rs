//! Cross-budget history: period comparison and weekly spending trends

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ledger::{CategoryCatalog, ItemFilter, LedgerStore};
use crate::models::{Budget, BudgetPeriod, Item};

/// Second-half average must differ from the first half by more than this ratio
const TREND_TOLERANCE: f64 = 0.10;

/// Relative change in percent. From zero, any growth reads as 100%.
pub fn change_percent(current: f64, previous: f64) -> f64 {
    if previous > 0.0 {
        (current - previous) / previous * 100.0
    } else if current > 0.0 {
        100.0
    } else {
        0.0
    }
}

/// Identifies one side of a comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodSummary {
    pub budget_id: i64,
    pub name: String,
    pub period: BudgetPeriod,
    pub total_spent: f64,
    pub item_count: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryComparison {
    pub category_id: i64,
    pub name: String,
    pub current: f64,
    pub previous: f64,
    pub change: f64,
    pub change_percent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodComparison {
    pub current: PeriodSummary,
    pub previous: PeriodSummary,
    pub categories: Vec<CategoryComparison>,
    pub total_change: f64,
    pub total_change_percent: f64,
}

/// Result of comparing a budget with the one before it
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", content = "comparison", rename_all = "snake_case")]
pub enum ComparisonOutcome {
    Compared(PeriodComparison),
    NoPreviousPeriod,
}

impl ComparisonOutcome {
    pub fn comparison(&self) -> Option<&PeriodComparison> {
        match self {
            Self::Compared(c) => Some(c),
            Self::NoPreviousPeriod => None,
        }
    }
}

fn budget_items<S: LedgerStore + ?Sized>(store: &S, budget: &Budget) -> Result<Vec<Item>> {
    store.find_items(&ItemFilter::for_user(&budget.user_id).budget(budget.id))
}

fn sum_by_category(items: &[Item]) -> BTreeMap<i64, f64> {
    let mut totals = BTreeMap::new();
    for item in items {
        *totals.entry(item.category_id).or_insert(0.0) += item.total_price();
    }
    totals
}

fn summarize(budget: &Budget, items: &[Item]) -> PeriodSummary {
    PeriodSummary {
        budget_id: budget.id,
        name: budget.name.clone(),
        period: budget.period,
        total_spent: items.iter().map(Item::total_price).sum(),
        item_count: items.len(),
    }
}

/// Compare a budget with the user's most recent earlier, inactive budget
pub fn compare_periods<S>(store: &S, user_id: &str, budget_id: i64) -> Result<ComparisonOutcome>
where
    S: LedgerStore + CategoryCatalog + ?Sized,
{
    let current = store
        .find_budget(budget_id, user_id)?
        .ok_or_else(|| Error::not_found(format!("Budget {}", budget_id)))?;

    let Some(previous) = store.find_previous_budget(&current)? else {
        return Ok(ComparisonOutcome::NoPreviousPeriod);
    };

    let current_items = budget_items(store, &current)?;
    let previous_items = budget_items(store, &previous)?;

    let current_by_category = sum_by_category(&current_items);
    let previous_by_category = sum_by_category(&previous_items);
    let category_ids: BTreeSet<i64> = current_by_category
        .keys()
        .chain(previous_by_category.keys())
        .copied()
        .collect();

    let mut categories = Vec::with_capacity(category_ids.len());
    for category_id in category_ids {
        let now = current_by_category.get(&category_id).copied().unwrap_or(0.0);
        let before = previous_by_category
            .get(&category_id)
            .copied()
            .unwrap_or(0.0);
        categories.push(CategoryComparison {
            category_id,
            name: store.category_name(category_id)?,
            current: now,
            previous: before,
            change: now - before,
            change_percent: change_percent(now, before),
        });
    }

    let current = summarize(&current, &current_items);
    let previous = summarize(&previous, &previous_items);
    let total_change = current.total_spent - previous.total_spent;
    let total_change_percent = change_percent(current.total_spent, previous.total_spent);

    Ok(ComparisonOutcome::Compared(PeriodComparison {
        current,
        previous,
        categories,
        total_change,
        total_change_percent,
    }))
}

/// Direction of weekly spending
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklySpend {
    /// Monday of the week
    pub week_start: NaiveDate,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTrend {
    pub category_id: i64,
    pub name: String,
    pub weeks: Vec<WeeklySpend>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingTrends {
    pub window_days: i64,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub weekly_spending: Vec<WeeklySpend>,
    pub weekly_average: f64,
    pub trend: TrendDirection,
    pub category_trends: Vec<CategoryTrend>,
    pub total_items: usize,
    pub total_spent: f64,
}

/// Monday of the week containing `date`
pub fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn weekly_totals<'a>(items: impl Iterator<Item = &'a Item>) -> BTreeMap<NaiveDate, f64> {
    let mut weeks = BTreeMap::new();
    for item in items {
        *weeks.entry(week_start(item.purchase_date)).or_insert(0.0) += item.total_price();
    }
    weeks
}

fn average(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Classify chronologically ordered weekly totals
///
/// The first half is the first `n / 2` weeks. Fewer than two weeks is stable.
pub fn classify_trend(weekly: &[f64]) -> TrendDirection {
    if weekly.len() < 2 {
        return TrendDirection::Stable;
    }
    let (first, second) = weekly.split_at(weekly.len() / 2);
    let first_avg = average(first);
    let second_avg = average(second);

    if second_avg > first_avg * (1.0 + TREND_TOLERANCE) {
        TrendDirection::Increasing
    } else if second_avg < first_avg * (1.0 - TREND_TOLERANCE) {
        TrendDirection::Decreasing
    } else {
        TrendDirection::Stable
    }
}

/// Weekly spending over the `window_days` days ending `today`, across all budgets
pub fn analyze_spending_trends<S>(
    store: &S,
    user_id: &str,
    window_days: i64,
    today: NaiveDate,
) -> Result<SpendingTrends>
where
    S: LedgerStore + CategoryCatalog + ?Sized,
{
    if window_days < 1 {
        return Err(Error::validation("Trend window must be at least one day"));
    }
    let from = today - Duration::days(window_days);
    let items = store.find_items(&ItemFilter::for_user(user_id).purchased_between(from, today))?;

    let weekly = weekly_totals(items.iter());
    let totals: Vec<f64> = weekly.values().copied().collect();

    let mut by_category: BTreeMap<i64, Vec<&Item>> = BTreeMap::new();
    for item in &items {
        by_category.entry(item.category_id).or_default().push(item);
    }
    let mut category_trends = Vec::with_capacity(by_category.len());
    for (category_id, category_items) in by_category {
        category_trends.push(CategoryTrend {
            category_id,
            name: store.category_name(category_id)?,
            weeks: to_weekly(weekly_totals(category_items.into_iter())),
        });
    }

    Ok(SpendingTrends {
        window_days,
        from,
        to: today,
        weekly_average: average(&totals),
        trend: classify_trend(&totals),
        weekly_spending: to_weekly(weekly),
        category_trends,
        total_items: items.len(),
        total_spent: items.iter().map(Item::total_price).sum(),
    })
}

fn to_weekly(weeks: BTreeMap<NaiveDate, f64>) -> Vec<WeeklySpend> {
    weeks
        .into_iter()
        .map(|(week_start, total)| WeeklySpend { week_start, total })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_percent_from_zero() {
        assert_eq!(change_percent(100.0, 0.0), 100.0);
        assert_eq!(change_percent(0.0, 0.0), 0.0);
        assert_eq!(change_percent(150.0, 100.0), 50.0);
        assert_eq!(change_percent(50.0, 100.0), -50.0);
    }

    #[test]
    fn test_week_start_is_monday() {
        // 2024-05-15 is a Wednesday
        let wed = NaiveDate::from_ymd_opt(2024, 5, 15).unwrap();
        assert_eq!(week_start(wed), NaiveDate::from_ymd_opt(2024, 5, 13).unwrap());
        let sun = NaiveDate::from_ymd_opt(2024, 5, 19).unwrap();
        assert_eq!(week_start(sun), NaiveDate::from_ymd_opt(2024, 5, 13).unwrap());
        let mon = NaiveDate::from_ymd_opt(2024, 5, 20).unwrap();
        assert_eq!(week_start(mon), mon);
    }

    #[test]
    fn test_classify_trend() {
        assert_eq!(classify_trend(&[]), TrendDirection::Stable);
        assert_eq!(classify_trend(&[500.0]), TrendDirection::Stable);
        assert_eq!(classify_trend(&[100.0, 120.0]), TrendDirection::Increasing);
        assert_eq!(classify_trend(&[100.0, 80.0]), TrendDirection::Decreasing);
        assert_eq!(classify_trend(&[100.0, 105.0]), TrendDirection::Stable);
        // Odd count: first half is one week, second half is two
        assert_eq!(
            classify_trend(&[100.0, 100.0, 140.0]),
            TrendDirection::Increasing
        );
    }
}
