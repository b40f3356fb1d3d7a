//! Data models for Grocer

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const MAX_BUDGET_NAME_LEN: usize = 100;
pub const MAX_ITEM_NAME_LEN: usize = 200;
pub const MAX_NOTES_LEN: usize = 500;
pub const MAX_CATEGORY_NAME_LEN: usize = 50;

/// Inclusive date range a budget covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetPeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl BudgetPeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// The period is over once `today` is past its last day
    pub fn has_ended(&self, today: NaiveDate) -> bool {
        today > self.end
    }

    /// Number of calendar days covered, both ends included
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Per-category ceiling inside a budget
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CategoryAllocation {
    pub category_id: i64,
    pub limit: f64,
}

/// Sum of allocation limits
pub fn allocated_total(allocations: &[CategoryAllocation]) -> f64 {
    allocations.iter().map(|a| a.limit).sum()
}

/// Check allocation shape: non-negative limits, one entry per category
pub fn validate_allocations(allocations: &[CategoryAllocation]) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for allocation in allocations {
        if !allocation.limit.is_finite() || allocation.limit < 0.0 {
            return Err(Error::validation(format!(
                "Category limit must be a non-negative amount (category {})",
                allocation.category_id
            )));
        }
        if !seen.insert(allocation.category_id) {
            return Err(Error::validation(format!(
                "Category {} is allocated more than once",
                allocation.category_id
            )));
        }
    }
    Ok(())
}

/// Reject allocations whose limits add up to more than the budget total
pub fn validate_allocation_sum(allocations: &[CategoryAllocation], total_limit: f64) -> Result<()> {
    let allocated = allocated_total(allocations);
    if allocated > total_limit {
        return Err(Error::InvalidAllocation {
            allocated,
            total_limit,
        });
    }
    Ok(())
}

/// A spending plan over a date range
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Budget {
    pub id: i64,
    pub user_id: String,
    pub name: String,
    pub total_limit: f64,
    pub period: BudgetPeriod,
    pub categories: Vec<CategoryAllocation>,
    /// Derived: sum of item totals, maintained by the aggregator
    pub current_spent: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Budget {
    pub fn remaining(&self) -> f64 {
        self.total_limit - self.current_spent
    }

    pub fn percentage_spent(&self) -> f64 {
        percentage(self.current_spent, self.total_limit)
    }

    pub fn allocation_for(&self, category_id: i64) -> Option<&CategoryAllocation> {
        self.categories.iter().find(|a| a.category_id == category_id)
    }

    pub fn allocated_total(&self) -> f64 {
        allocated_total(&self.categories)
    }

    /// Flagged active and its period has not ended
    pub fn is_effectively_active(&self, today: NaiveDate) -> bool {
        self.is_active && !self.period.has_ended(today)
    }

    pub fn snapshot(&self) -> BudgetSnapshot {
        BudgetSnapshot {
            id: self.id,
            name: self.name.clone(),
            total_limit: self.total_limit,
            current_spent: self.current_spent,
            remaining: self.remaining(),
            percentage_spent: self.percentage_spent(),
        }
    }
}

/// `part / whole` as a percentage; zero when `whole` is not positive
pub fn percentage(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// Budget state returned alongside item writes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetSnapshot {
    pub id: i64,
    pub name: String,
    pub total_limit: f64,
    pub current_spent: f64,
    pub remaining: f64,
    pub percentage_spent: f64,
}

/// Budget with its derived fields, for API and CLI display
#[derive(Debug, Clone, Serialize)]
pub struct BudgetDetail {
    #[serde(flatten)]
    pub budget: Budget,
    pub remaining: f64,
    pub percentage_spent: f64,
    pub effectively_active: bool,
}

impl BudgetDetail {
    pub fn new(budget: Budget, today: NaiveDate) -> Self {
        Self {
            remaining: budget.remaining(),
            percentage_spent: budget.percentage_spent(),
            effectively_active: budget.is_effectively_active(today),
            budget,
        }
    }
}

/// Input for creating a budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewBudget {
    pub name: String,
    pub total_limit: f64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub categories: Vec<CategoryAllocation>,
}

impl NewBudget {
    pub fn period(&self) -> BudgetPeriod {
        BudgetPeriod::new(self.start_date, self.end_date)
    }

    pub fn validate(&self) -> Result<()> {
        validate_budget_name(&self.name)?;
        validate_total_limit(self.total_limit)?;
        if self.end_date <= self.start_date {
            return Err(Error::validation("End date must be after start date"));
        }
        validate_allocations(&self.categories)?;
        validate_allocation_sum(&self.categories, self.total_limit)
    }
}

fn validate_budget_name(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("Budget name is required"));
    }
    if name.chars().count() > MAX_BUDGET_NAME_LEN {
        return Err(Error::validation(format!(
            "Budget name cannot exceed {} characters",
            MAX_BUDGET_NAME_LEN
        )));
    }
    Ok(())
}

fn validate_total_limit(total_limit: f64) -> Result<()> {
    if !total_limit.is_finite() || total_limit <= 0.0 {
        return Err(Error::validation("Total limit must be a positive amount"));
    }
    Ok(())
}

/// Partial update of a budget's editable fields
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BudgetUpdate {
    pub name: Option<String>,
    pub total_limit: Option<f64>,
    pub categories: Option<Vec<CategoryAllocation>>,
    pub is_active: Option<bool>,
}

impl BudgetUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_budget_name(name)?;
        }
        if let Some(limit) = self.total_limit {
            validate_total_limit(limit)?;
        }
        if let Some(categories) = &self.categories {
            validate_allocations(categories)?;
        }
        Ok(())
    }
}

/// A single purchase recorded against a budget
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: i64,
    pub user_id: String,
    pub budget_id: i64,
    pub name: String,
    pub price: f64,
    pub quantity: i64,
    pub category_id: i64,
    pub is_essential: bool,
    pub purchase_date: NaiveDate,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Item {
    pub fn total_price(&self) -> f64 {
        self.price * self.quantity as f64
    }
}

fn default_quantity() -> i64 {
    1
}

/// Input for recording an item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    pub price: f64,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    pub category_id: i64,
    #[serde(default)]
    pub is_essential: bool,
    /// Defaults to the day the item is recorded
    pub purchase_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl NewItem {
    pub fn new(name: &str, price: f64, quantity: i64, category_id: i64) -> Self {
        Self {
            name: name.to_string(),
            price,
            quantity,
            category_id,
            is_essential: false,
            purchase_date: None,
            notes: None,
        }
    }

    pub fn essential(mut self, is_essential: bool) -> Self {
        self.is_essential = is_essential;
        self
    }

    pub fn purchased_on(mut self, date: NaiveDate) -> Self {
        self.purchase_date = Some(date);
        self
    }

    pub fn total_price(&self) -> f64 {
        self.price * self.quantity as f64
    }

    pub fn validate(&self) -> Result<()> {
        validate_item_name(&self.name)?;
        validate_price(self.price)?;
        validate_quantity(self.quantity)?;
        validate_notes(self.notes.as_deref())
    }
}

fn validate_item_name(name: &str) -> Result<()> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::validation("Item name is required"));
    }
    if name.chars().count() > MAX_ITEM_NAME_LEN {
        return Err(Error::validation(format!(
            "Item name cannot exceed {} characters",
            MAX_ITEM_NAME_LEN
        )));
    }
    Ok(())
}

fn validate_price(price: f64) -> Result<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(Error::validation("Price cannot be negative"));
    }
    Ok(())
}

fn validate_quantity(quantity: i64) -> Result<()> {
    if quantity < 1 {
        return Err(Error::validation("Quantity must be at least 1"));
    }
    Ok(())
}

fn validate_notes(notes: Option<&str>) -> Result<()> {
    if notes.is_some_and(|n| n.chars().count() > MAX_NOTES_LEN) {
        return Err(Error::validation(format!(
            "Notes cannot exceed {} characters",
            MAX_NOTES_LEN
        )));
    }
    Ok(())
}

/// Partial update of an item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    pub category_id: Option<i64>,
    pub is_essential: Option<bool>,
    pub purchase_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl ItemUpdate {
    pub fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            validate_item_name(name)?;
        }
        if let Some(price) = self.price {
            validate_price(price)?;
        }
        if let Some(quantity) = self.quantity {
            validate_quantity(quantity)?;
        }
        validate_notes(self.notes.as_deref())
    }

    /// Apply the present fields to `item`
    pub fn apply_to(&self, item: &mut Item) {
        if let Some(name) = &self.name {
            item.name = name.trim().to_string();
        }
        if let Some(price) = self.price {
            item.price = price;
        }
        if let Some(quantity) = self.quantity {
            item.quantity = quantity;
        }
        if let Some(category_id) = self.category_id {
            item.category_id = category_id;
        }
        if let Some(is_essential) = self.is_essential {
            item.is_essential = is_essential;
        }
        if let Some(date) = self.purchase_date {
            item.purchase_date = date;
        }
        if let Some(notes) = &self.notes {
            item.notes = Some(notes.clone());
        }
    }
}

/// Grocery category, either system-wide or user-defined
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub name: String,
    pub icon: String,
    pub color: String,
    pub is_system: bool,
    /// None for system categories
    pub user_id: Option<String>,
    pub parent_id: Option<i64>,
    pub sort_order: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for a user-defined category
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub icon: Option<String>,
    pub color: Option<String>,
    pub parent_id: Option<i64>,
}

impl NewCategory {
    pub fn validate(&self) -> Result<()> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(Error::validation("Category name is required"));
        }
        if name.chars().count() > MAX_CATEGORY_NAME_LEN {
            return Err(Error::validation(format!(
                "Category name cannot exceed {} characters",
                MAX_CATEGORY_NAME_LEN
            )));
        }
        if let Some(color) = &self.color {
            if !is_hex_color(color) {
                return Err(Error::validation("Color must be a hex code like #28a745"));
            }
        }
        Ok(())
    }
}

fn is_hex_color(s: &str) -> bool {
    s.len() == 7 && s.starts_with('#') && s[1..].chars().all(|c| c.is_ascii_hexdigit())
}

/// Built-in categories seeded on first run: (name, icon, color)
pub const SYSTEM_CATEGORIES: &[(&str, &str, &str)] = &[
    ("Produce", "🥬", "#28a745"),
    ("Dairy", "🥛", "#17a2b8"),
    ("Meat", "🥩", "#dc3545"),
    ("Bakery", "🍞", "#ffc107"),
    ("Frozen", "🧊", "#6c757d"),
    ("Pantry", "🥫", "#fd7e14"),
    ("Beverages", "☕", "#795548"),
    ("Snacks", "🍿", "#e91e63"),
    ("Household", "🧹", "#9c27b0"),
    ("Personal Care", "🧼", "#673ab7"),
    ("Other", "📦", "#6c757d"),
];

/// What causes a stored tip to be offered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerType {
    Threshold,
    Pattern,
    Seasonal,
}

impl TriggerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Threshold => "threshold",
            Self::Pattern => "pattern",
            Self::Seasonal => "seasonal",
        }
    }
}

impl std::str::FromStr for TriggerType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "threshold" => Ok(Self::Threshold),
            "pattern" => Ok(Self::Pattern),
            "seasonal" => Ok(Self::Seasonal),
            _ => Err(format!("Unknown trigger type: {}", s)),
        }
    }
}

impl std::fmt::Display for TriggerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A stored saving tip with engagement counters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tip {
    pub id: i64,
    pub content: String,
    /// Category name this tip applies to, or "general"
    pub category: String,
    pub trigger_type: TriggerType,
    /// Threshold percentage, pattern name or season, depending on trigger type
    pub trigger_value: serde_json::Value,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub view_count: i64,
    pub helpful_count: i64,
    pub created_at: DateTime<Utc>,
}

/// Input for a stored tip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTip {
    pub content: String,
    pub category: String,
    pub trigger_type: TriggerType,
    pub trigger_value: serde_json::Value,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_period_bounds_are_inclusive() {
        let period = BudgetPeriod::new(date(2024, 3, 1), date(2024, 3, 31));
        assert!(period.contains(date(2024, 3, 1)));
        assert!(period.contains(date(2024, 3, 31)));
        assert!(!period.contains(date(2024, 4, 1)));
        assert!(!period.has_ended(date(2024, 3, 31)));
        assert!(period.has_ended(date(2024, 4, 1)));
        assert_eq!(period.days(), 31);
    }

    #[test]
    fn test_new_budget_validation() {
        let mut budget = NewBudget {
            name: "March".to_string(),
            total_limit: 400.0,
            start_date: date(2024, 3, 1),
            end_date: date(2024, 3, 31),
            categories: vec![],
        };
        assert!(budget.validate().is_ok());

        budget.end_date = date(2024, 3, 1);
        assert!(matches!(budget.validate(), Err(Error::Validation(_))));

        budget.end_date = date(2024, 3, 31);
        budget.total_limit = 0.0;
        assert!(matches!(budget.validate(), Err(Error::Validation(_))));

        budget.total_limit = 400.0;
        budget.name = "x".repeat(MAX_BUDGET_NAME_LEN + 1);
        assert!(matches!(budget.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_allocation_sum_over_total_rejected() {
        let budget = NewBudget {
            name: "March".to_string(),
            total_limit: 100.0,
            start_date: date(2024, 3, 1),
            end_date: date(2024, 3, 31),
            categories: vec![
                CategoryAllocation {
                    category_id: 1,
                    limit: 60.0,
                },
                CategoryAllocation {
                    category_id: 2,
                    limit: 50.0,
                },
            ],
        };
        match budget.validate() {
            Err(Error::InvalidAllocation {
                allocated,
                total_limit,
            }) => {
                assert_eq!(allocated, 110.0);
                assert_eq!(total_limit, 100.0);
            }
            other => panic!("expected InvalidAllocation, got {:?}", other),
        }
    }

    #[test]
    fn test_duplicate_allocation_rejected() {
        let allocations = vec![
            CategoryAllocation {
                category_id: 1,
                limit: 50.0,
            },
            CategoryAllocation {
                category_id: 1,
                limit: 20.0,
            },
        ];
        assert!(validate_allocations(&allocations).is_err());
    }

    #[test]
    fn test_new_item_validation() {
        assert!(NewItem::new("Milk", 3.5, 2, 1).validate().is_ok());
        assert!(NewItem::new("", 3.5, 2, 1).validate().is_err());
        assert!(NewItem::new("Milk", -1.0, 2, 1).validate().is_err());
        assert!(NewItem::new("Milk", 3.5, 0, 1).validate().is_err());
        assert_eq!(NewItem::new("Milk", 2.5, 4, 1).total_price(), 10.0);
    }

    #[test]
    fn test_new_item_quantity_defaults_to_one() {
        let item: NewItem =
            serde_json::from_str(r#"{"name": "Bread", "price": 2.0, "category_id": 4}"#).unwrap();
        assert_eq!(item.quantity, 1);
        assert!(!item.is_essential);
        assert!(item.purchase_date.is_none());
    }

    #[test]
    fn test_trigger_type_roundtrip() {
        for t in [
            TriggerType::Threshold,
            TriggerType::Pattern,
            TriggerType::Seasonal,
        ] {
            assert_eq!(t.as_str().parse::<TriggerType>().unwrap(), t);
        }
        assert!("weather".parse::<TriggerType>().is_err());
    }

    #[test]
    fn test_hex_color() {
        assert!(is_hex_color("#28a745"));
        assert!(!is_hex_color("28a745"));
        assert!(!is_hex_color("#28a74g"));
    }
}
