//! Ledger trait implementations backed by SQLite

use chrono::NaiveDate;

use super::Database;
use crate::error::Result;
use crate::ledger::{CategoryCatalog, ItemFilter, LedgerStore};
use crate::models::{Budget, Category, Item, NewBudget, NewItem};

impl LedgerStore for Database {
    fn find_budget(&self, id: i64, user_id: &str) -> Result<Option<Budget>> {
        self.get_budget(id, user_id)
    }

    fn find_budgets(&self, user_id: &str) -> Result<Vec<Budget>> {
        self.list_budgets(user_id)
    }

    fn find_active_budget(&self, user_id: &str) -> Result<Option<Budget>> {
        self.get_flagged_active_budget(user_id)
    }

    fn insert_budget(&self, user_id: &str, budget: &NewBudget) -> Result<Budget> {
        self.create_budget_row(user_id, budget)
    }

    fn save_budget(&self, budget: &Budget) -> Result<()> {
        self.update_budget_row(budget)
    }

    fn set_current_spent(&self, budget_id: i64, user_id: &str, spent: f64) -> Result<bool> {
        self.set_budget_spent(budget_id, user_id, spent)
    }

    fn delete_budget(&self, id: i64, user_id: &str) -> Result<bool> {
        self.delete_budget_row(id, user_id)
    }

    fn find_item(&self, id: i64, user_id: &str) -> Result<Option<Item>> {
        self.get_item(id, user_id)
    }

    fn find_items(&self, filter: &ItemFilter) -> Result<Vec<Item>> {
        self.list_items(filter)
    }

    fn count_items(&self, filter: &ItemFilter) -> Result<i64> {
        self.count_items_matching(filter)
    }

    fn sum_item_totals(&self, filter: &ItemFilter) -> Result<f64> {
        self.sum_items_matching(filter)
    }

    fn insert_item(
        &self,
        user_id: &str,
        budget_id: i64,
        item: &NewItem,
        purchase_date: NaiveDate,
    ) -> Result<Item> {
        self.create_item_row(user_id, budget_id, item, purchase_date)
    }

    fn save_item(&self, item: &Item) -> Result<()> {
        self.update_item_row(item)
    }

    fn delete_item(&self, id: i64, user_id: &str) -> Result<bool> {
        self.delete_item_row(id, user_id)
    }
}

impl CategoryCatalog for Database {
    fn find_category(&self, id: i64) -> Result<Option<Category>> {
        self.get_category(id)
    }

    fn categories_for(&self, user_id: &str) -> Result<Vec<Category>> {
        self.list_categories(user_id)
    }
}
