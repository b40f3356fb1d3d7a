//! CSV and PDF exports for budgets and items
//!
//! Supports:
//! - Budget summary (one row)
//! - Items of a budget, filtered by purchase date range and category
//! - Per-category breakdown against allocations
//! - Comprehensive report across budgets, filtered by period start
//! - Printable budget report as PDF (see [`PdfExporter`])

use std::collections::BTreeMap;
use std::io;

use chrono::{DateTime, NaiveDate, Utc};
use tracing::debug;

use crate::error::{Error, Result};
use crate::ledger::{CategoryCatalog, ItemFilter, LedgerStore};
use crate::models::{percentage, Budget, Item};

mod pdf;

pub use pdf::PdfExporter;

const BUDGET_SUMMARY_HEADERS: [&str; 9] = [
    "Budget Name",
    "Total Limit",
    "Current Spent",
    "Remaining Budget",
    "Percentage Spent",
    "Start Date",
    "End Date",
    "Status",
    "Created Date",
];

const ITEM_HEADERS: [&str; 9] = [
    "Item Name",
    "Category",
    "Price",
    "Quantity",
    "Total Cost",
    "Essential",
    "Purchase Date",
    "Notes",
    "Added Date",
];

const CATEGORY_HEADERS: [&str; 6] = [
    "Category",
    "Amount Spent",
    "Category Limit",
    "Items Count",
    "Percentage of Total",
    "Status",
];

const REPORT_HEADERS: [&str; 10] = [
    "Budget Name",
    "Budget Period",
    "Item Name",
    "Category",
    "Price",
    "Quantity",
    "Total Cost",
    "Essential",
    "Purchase Date",
    "Budget Status",
];

/// Filters for the item export
#[derive(Debug, Clone, Default)]
pub struct ItemExportOptions {
    /// Start date filter (inclusive)
    pub from: Option<NaiveDate>,
    /// End date filter (inclusive)
    pub to: Option<NaiveDate>,
    pub category_id: Option<i64>,
}

/// Period-start range for the comprehensive report
#[derive(Debug, Clone, Default)]
pub struct ReportOptions {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// Which export to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    BudgetSummary,
    Items,
    CategoryBreakdown,
    Report,
    BudgetPdf,
}

impl ExportKind {
    /// Filename prefix for this export
    pub fn prefix(&self) -> &'static str {
        match self {
            Self::BudgetSummary => "budget_summary",
            Self::Items => "items",
            Self::CategoryBreakdown => "category_breakdown",
            Self::Report => "comprehensive_report",
            Self::BudgetPdf => "budget_report",
        }
    }

    /// File extension, without the dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::BudgetPdf => "pdf",
            _ => "csv",
        }
    }

    /// MIME type of the produced file
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::BudgetPdf => "application/pdf",
            _ => "text/csv; charset=utf-8",
        }
    }
}

impl std::str::FromStr for ExportKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "budget" | "summary" | "budget_summary" => Ok(Self::BudgetSummary),
            "items" => Ok(Self::Items),
            "categories" | "category_breakdown" => Ok(Self::CategoryBreakdown),
            "report" | "comprehensive_report" => Ok(Self::Report),
            "pdf" | "budget_report" => Ok(Self::BudgetPdf),
            _ => Err(format!("Unknown export kind: {}", s)),
        }
    }
}

/// `<prefix>_<timestamp>.<ext>`, with a filesystem-safe UTC timestamp
pub fn export_filename(kind: ExportKind, now: DateTime<Utc>) -> String {
    format!(
        "{}_{}.{}",
        kind.prefix(),
        now.format("%Y-%m-%dT%H-%M-%S"),
        kind.extension()
    )
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

fn day(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

fn finish(writer: csv::Writer<Vec<u8>>) -> Result<String> {
    let bytes = writer.into_inner().map_err(|e| Error::Io(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| Error::Io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

fn find_budget<S: LedgerStore + ?Sized>(
    store: &S,
    user_id: &str,
    budget_id: i64,
) -> Result<Budget> {
    store
        .find_budget(budget_id, user_id)?
        .ok_or_else(|| Error::not_found(format!("Budget {}", budget_id)))
}

fn category_names<S: CategoryCatalog + ?Sized>(
    store: &S,
    user_id: &str,
) -> Result<BTreeMap<i64, String>> {
    Ok(store
        .categories_for(user_id)?
        .into_iter()
        .map(|c| (c.id, c.name))
        .collect())
}

fn name_of(names: &BTreeMap<i64, String>, category_id: i64) -> String {
    names
        .get(&category_id)
        .cloned()
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Total and item count per category, in category-id order
fn spend_by_category(items: &[Item]) -> BTreeMap<i64, (f64, usize)> {
    let mut per_category: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for item in items {
        let entry = per_category.entry(item.category_id).or_insert((0.0, 0));
        entry.0 += item.total_price();
        entry.1 += 1;
    }
    per_category
}

/// Builds CSV exports from a ledger store
pub struct CsvExporter<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> CsvExporter<'a, S>
where
    S: LedgerStore + CategoryCatalog + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// One-row summary of a budget
    pub fn budget_summary(&self, user_id: &str, budget_id: i64) -> Result<String> {
        let budget = find_budget(self.store, user_id, budget_id)?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(BUDGET_SUMMARY_HEADERS)?;
        writer.write_record([
            budget.name.clone(),
            budget.total_limit.to_string(),
            budget.current_spent.to_string(),
            budget.remaining().to_string(),
            format!("{:.2}%", budget.percentage_spent()),
            day(budget.period.start),
            day(budget.period.end),
            if budget.is_active { "Active" } else { "Inactive" }.to_string(),
            day(budget.created_at.date_naive()),
        ])?;

        debug!(budget_id, "Exported budget summary");
        finish(writer)
    }

    /// A budget's items, newest purchase first
    pub fn items(&self, user_id: &str, budget_id: i64, options: &ItemExportOptions) -> Result<String> {
        let budget = find_budget(self.store, user_id, budget_id)?;
        let names = category_names(self.store, user_id)?;

        let mut filter = ItemFilter::for_user(user_id).budget(budget.id);
        filter.purchased_from = options.from;
        filter.purchased_to = options.to;
        filter.category_id = options.category_id;
        let items = self.store.find_items(&filter)?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(ITEM_HEADERS)?;
        for item in &items {
            writer.write_record([
                item.name.clone(),
                name_of(&names, item.category_id),
                item.price.to_string(),
                item.quantity.to_string(),
                format!("{:.2}", item.total_price()),
                yes_no(item.is_essential).to_string(),
                day(item.purchase_date),
                item.notes.clone().unwrap_or_default(),
                day(item.created_at.date_naive()),
            ])?;
        }

        debug!(budget_id, count = items.len(), "Exported items");
        finish(writer)
    }

    /// Spend per category with its allocation status
    ///
    /// Only categories with items appear. Percentages are shares of the
    /// budget's current spend.
    pub fn category_breakdown(&self, user_id: &str, budget_id: i64) -> Result<String> {
        let budget = find_budget(self.store, user_id, budget_id)?;
        let names = category_names(self.store, user_id)?;
        let items = self
            .store
            .find_items(&ItemFilter::for_user(user_id).budget(budget.id))?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(CATEGORY_HEADERS)?;
        for (category_id, (spent, count)) in spend_by_category(&items) {
            let limit = budget
                .allocation_for(category_id)
                .map(|a| a.limit)
                .filter(|l| *l > 0.0);
            let over = matches!(limit, Some(l) if spent > l);

            writer.write_record([
                name_of(&names, category_id),
                format!("{:.2}", spent),
                limit.map_or_else(|| "No limit".to_string(), |l| l.to_string()),
                count.to_string(),
                format!("{:.2}%", percentage(spent, budget.current_spent)),
                if over { "Over Limit" } else { "Within Limit" }.to_string(),
            ])?;
        }

        debug!(budget_id, "Exported category breakdown");
        finish(writer)
    }

    /// Every item across the user's budgets, newest period first
    pub fn report(&self, user_id: &str, options: &ReportOptions) -> Result<String> {
        let names = category_names(self.store, user_id)?;
        let budgets: Vec<Budget> = self
            .store
            .find_budgets(user_id)?
            .into_iter()
            .filter(|b| options.from.map_or(true, |from| b.period.start >= from))
            .filter(|b| options.to.map_or(true, |to| b.period.start <= to))
            .collect();

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(REPORT_HEADERS)?;
        for budget in &budgets {
            let period = format!("{} to {}", day(budget.period.start), day(budget.period.end));
            let status = if budget.is_active { "Active" } else { "Completed" };
            let items: Vec<Item> = self
                .store
                .find_items(&ItemFilter::for_user(user_id).budget(budget.id))?;

            for item in &items {
                writer.write_record([
                    budget.name.clone(),
                    period.clone(),
                    item.name.clone(),
                    name_of(&names, item.category_id),
                    item.price.to_string(),
                    item.quantity.to_string(),
                    format!("{:.2}", item.total_price()),
                    yes_no(item.is_essential).to_string(),
                    day(item.purchase_date),
                    status.to_string(),
                ])?;
            }
        }

        debug!(budgets = budgets.len(), "Exported comprehensive report");
        finish(writer)
    }
}
