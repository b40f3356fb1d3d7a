//! Storage seams for the budget ledger
//!
//! The aggregation, enforcement, lifecycle and history logic only ever talk
//! to a [`LedgerStore`] and a [`CategoryCatalog`]. [`crate::Database`]
//! implements both; tests may substitute anything else that does.
//!
//! Every query is scoped by owner. A record owned by another user is
//! indistinguishable from a missing one.

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{Budget, Category, Item, NewBudget, NewItem};

/// Query over a user's items
#[derive(Debug, Clone, Default)]
pub struct ItemFilter {
    pub user_id: String,
    pub budget_id: Option<i64>,
    pub category_id: Option<i64>,
    pub is_essential: Option<bool>,
    pub purchased_from: Option<NaiveDate>,
    pub purchased_to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ItemFilter {
    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            ..Default::default()
        }
    }

    pub fn budget(mut self, budget_id: i64) -> Self {
        self.budget_id = Some(budget_id);
        self
    }

    pub fn category(mut self, category_id: i64) -> Self {
        self.category_id = Some(category_id);
        self
    }

    pub fn essential(mut self, is_essential: Option<bool>) -> Self {
        self.is_essential = is_essential;
        self
    }

    /// Inclusive purchase date range
    pub fn purchased_between(mut self, from: NaiveDate, to: NaiveDate) -> Self {
        self.purchased_from = Some(from);
        self.purchased_to = Some(to);
        self
    }

    pub fn paginate(mut self, limit: i64, offset: i64) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    /// Same filter without pagination, for totals and counts
    pub fn unpaginated(&self) -> Self {
        Self {
            limit: None,
            offset: None,
            ..self.clone()
        }
    }
}

/// Persistence for budgets and items
pub trait LedgerStore {
    fn find_budget(&self, id: i64, user_id: &str) -> Result<Option<Budget>>;

    /// All of a user's budgets, newest period first
    fn find_budgets(&self, user_id: &str) -> Result<Vec<Budget>>;

    /// The budget carrying the active flag, regardless of its period
    fn find_active_budget(&self, user_id: &str) -> Result<Option<Budget>>;

    /// Latest-ending inactive budget that finished before `current` started
    fn find_previous_budget(&self, current: &Budget) -> Result<Option<Budget>> {
        Ok(self
            .find_budgets(&current.user_id)?
            .into_iter()
            .filter(|b| b.id != current.id && !b.is_active && b.period.end < current.period.start)
            .max_by_key(|b| (b.period.end, b.id)))
    }

    /// Persist a new, active budget with zero spend
    fn insert_budget(&self, user_id: &str, budget: &NewBudget) -> Result<Budget>;

    /// Persist editable fields: name, limit, allocations, active flag
    fn save_budget(&self, budget: &Budget) -> Result<()>;

    /// Write the derived spend. Returns false if the budget no longer exists.
    fn set_current_spent(&self, budget_id: i64, user_id: &str, spent: f64) -> Result<bool>;

    fn delete_budget(&self, id: i64, user_id: &str) -> Result<bool>;

    fn find_item(&self, id: i64, user_id: &str) -> Result<Option<Item>>;

    fn find_items(&self, filter: &ItemFilter) -> Result<Vec<Item>>;

    fn count_items(&self, filter: &ItemFilter) -> Result<i64>;

    /// Sum of `price * quantity` over the matching items
    fn sum_item_totals(&self, filter: &ItemFilter) -> Result<f64> {
        Ok(self
            .find_items(&filter.unpaginated())?
            .iter()
            .map(Item::total_price)
            .sum())
    }

    fn insert_item(
        &self,
        user_id: &str,
        budget_id: i64,
        item: &NewItem,
        purchase_date: NaiveDate,
    ) -> Result<Item>;

    fn save_item(&self, item: &Item) -> Result<()>;

    fn delete_item(&self, id: i64, user_id: &str) -> Result<bool>;
}

/// Lookup of categories visible to a user
pub trait CategoryCatalog {
    fn find_category(&self, id: i64) -> Result<Option<Category>>;

    /// System categories plus the user's own, in display order
    fn categories_for(&self, user_id: &str) -> Result<Vec<Category>>;

    /// Category name, or "Unknown" when the category is gone
    fn category_name(&self, id: i64) -> Result<String> {
        Ok(self
            .find_category(id)?
            .map(|c| c.name)
            .unwrap_or_else(|| "Unknown".to_string()))
    }
}
