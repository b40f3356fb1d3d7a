//! Budget and item write orchestration
//!
//! Every item write runs the same sequence: limit check, persist, then a
//! full recompute of the owning budget's spend. A recompute failure after
//! the write has committed is logged and leaves `current_spent` stale until
//! the next write reconciles it.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use crate::aggregate;
use crate::error::{Error, Result};
use crate::ledger::{CategoryCatalog, ItemFilter, LedgerStore};
use crate::lifecycle;
use crate::limits;
use crate::models::{
    percentage, validate_allocation_sum, Budget, BudgetSnapshot, BudgetUpdate, Category,
    CategoryAllocation, Item, ItemUpdate, NewBudget, NewItem,
};
use crate::signal::{budget_alerts, signal, CategorySpend, SpendingAlert, ThresholdSignal};
use crate::tips::{threshold_tips, TipCatalog, TipSuggestion};

/// Tips attached to a single item write
pub const MAX_WRITE_TIPS: usize = 3;

/// Result of creating or updating an item
#[derive(Debug, Clone, Serialize)]
pub struct ItemWriteOutcome {
    pub item: Item,
    pub budget: BudgetSnapshot,
    pub signal: ThresholdSignal,
    pub alerts: Vec<SpendingAlert>,
    pub tips: Vec<TipSuggestion>,
}

/// Per-item failure inside a batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchItemError {
    pub index: usize,
    pub name: String,
    pub error: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub created: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchOutcome {
    pub items: Vec<Item>,
    pub errors: Vec<BatchItemError>,
    pub budget: BudgetSnapshot,
    pub summary: BatchSummary,
}

/// One page of items plus totals over the whole filter
#[derive(Debug, Clone, Serialize)]
pub struct ItemPage {
    pub items: Vec<Item>,
    pub total_count: i64,
    pub total_spent: f64,
    pub essential_spent: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTotal {
    pub category_id: i64,
    pub name: String,
    pub spent: f64,
    pub item_count: usize,
    pub essential_spent: f64,
    pub non_essential_spent: f64,
    pub limit: Option<f64>,
    pub remaining: Option<f64>,
    pub percentage_used: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TotalsSummary {
    pub total_items: usize,
    pub essential_items: usize,
    pub non_essential_items: usize,
    pub average_item_cost: f64,
}

/// Budget snapshot with a per-category breakdown
#[derive(Debug, Clone, Serialize)]
pub struct RunningTotals {
    pub budget: BudgetSnapshot,
    pub signal: ThresholdSignal,
    pub categories: Vec<CategoryTotal>,
    pub summary: TotalsSummary,
}

/// Write path over a ledger store
pub struct BudgetTracker<'a, S: ?Sized> {
    store: &'a S,
    tips: Option<&'a TipCatalog>,
}

impl<'a, S> BudgetTracker<'a, S>
where
    S: LedgerStore + CategoryCatalog + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store, tips: None }
    }

    /// Attach threshold tips to item write outcomes
    pub fn with_tips(store: &'a S, catalog: &'a TipCatalog) -> Self {
        Self {
            store,
            tips: Some(catalog),
        }
    }

    // ========== Budgets ==========

    pub fn get_budget(&self, user_id: &str, budget_id: i64) -> Result<Budget> {
        self.store
            .find_budget(budget_id, user_id)?
            .ok_or_else(|| Error::not_found(format!("Budget {}", budget_id)))
    }

    /// Create a budget and make it the user's active one
    pub fn create_budget(&self, user_id: &str, budget: &NewBudget) -> Result<Budget> {
        budget.validate()?;
        self.check_allocation_categories(user_id, &budget.categories)?;
        lifecycle::activate(self.store, user_id, budget)
    }

    /// Apply a partial update
    ///
    /// Reactivating a budget retires whichever other budget is active.
    pub fn update_budget(
        &self,
        user_id: &str,
        budget_id: i64,
        update: &BudgetUpdate,
    ) -> Result<Budget> {
        update.validate()?;
        let mut budget = self.get_budget(user_id, budget_id)?;

        if let Some(name) = &update.name {
            budget.name = name.trim().to_string();
        }
        if let Some(total_limit) = update.total_limit {
            budget.total_limit = total_limit;
        }
        if let Some(categories) = &update.categories {
            self.check_allocation_categories(user_id, categories)?;
            budget.categories = categories.clone();
        }
        validate_allocation_sum(&budget.categories, budget.total_limit)?;

        match update.is_active {
            Some(true) if !budget.is_active => {
                lifecycle::retire_active(self.store, user_id, Some(budget.id));
                budget.is_active = true;
            }
            Some(false) => budget.is_active = false,
            _ => {}
        }

        self.store.save_budget(&budget)?;
        info!(budget_id, "Updated budget");
        self.get_budget(user_id, budget_id)
    }

    /// Replace a budget's category allocations
    pub fn update_allocations(
        &self,
        user_id: &str,
        budget_id: i64,
        allocations: Vec<CategoryAllocation>,
    ) -> Result<Budget> {
        self.update_budget(
            user_id,
            budget_id,
            &BudgetUpdate {
                categories: Some(allocations),
                ..Default::default()
            },
        )
    }

    /// Delete a budget that owns no items
    pub fn delete_budget(&self, user_id: &str, budget_id: i64) -> Result<()> {
        let budget = self.get_budget(user_id, budget_id)?;

        let item_count = self
            .store
            .count_items(&ItemFilter::for_user(user_id).budget(budget.id))?;
        if item_count > 0 {
            return Err(Error::BudgetNotEmpty { item_count });
        }

        if !self.store.delete_budget(budget.id, user_id)? {
            return Err(Error::not_found(format!("Budget {}", budget_id)));
        }
        info!(budget_id, "Deleted budget");
        Ok(())
    }

    fn check_allocation_categories(
        &self,
        user_id: &str,
        allocations: &[CategoryAllocation],
    ) -> Result<()> {
        for allocation in allocations {
            self.visible_category(user_id, allocation.category_id)?;
        }
        Ok(())
    }

    fn visible_category(&self, user_id: &str, category_id: i64) -> Result<Category> {
        self.store
            .find_category(category_id)?
            .filter(|c| c.is_system || c.user_id.as_deref() == Some(user_id))
            .ok_or_else(|| Error::not_found(format!("Category {}", category_id)))
    }

    // ========== Items ==========

    /// Record an item against an active budget
    pub fn create_item(
        &self,
        user_id: &str,
        budget_id: i64,
        item: &NewItem,
        today: NaiveDate,
    ) -> Result<ItemWriteOutcome> {
        item.validate()?;
        let budget = self.get_budget(user_id, budget_id)?;
        if !budget.is_active {
            return Err(Error::InactiveBudget);
        }
        self.visible_category(user_id, item.category_id)?;

        limits::check_new_item(self.store, &budget, item.category_id, item.total_price())?
            .into_result()?;

        let created = self.store.insert_item(
            user_id,
            budget.id,
            item,
            item.purchase_date.unwrap_or(today),
        )?;
        info!(item_id = created.id, budget_id, "Created item");

        let budget = self.settle(budget);
        Ok(self.write_outcome(created, budget))
    }

    /// Edit an item in place. Its budget never changes.
    pub fn update_item(
        &self,
        user_id: &str,
        item_id: i64,
        update: &ItemUpdate,
    ) -> Result<ItemWriteOutcome> {
        update.validate()?;
        let existing = self
            .store
            .find_item(item_id, user_id)?
            .ok_or_else(|| Error::not_found(format!("Item {}", item_id)))?;
        let budget = self.get_budget(user_id, existing.budget_id)?;

        let mut item = existing.clone();
        update.apply_to(&mut item);

        let category_changed = item.category_id != existing.category_id;
        if category_changed {
            self.visible_category(user_id, item.category_id)?;
        }

        let delta = item.total_price() - existing.total_price();
        limits::check_update(self.store, &budget, &item, delta, category_changed)?.into_result()?;

        self.store.save_item(&item)?;
        info!(item_id, budget_id = budget.id, "Updated item");

        let budget = self.settle(budget);
        Ok(self.write_outcome(item, budget))
    }

    /// Remove an item. Returns the owning budget after reconciliation, if it still exists.
    pub fn delete_item(&self, user_id: &str, item_id: i64) -> Result<Option<BudgetSnapshot>> {
        let item = self
            .store
            .find_item(item_id, user_id)?
            .ok_or_else(|| Error::not_found(format!("Item {}", item_id)))?;

        if !self.store.delete_item(item.id, user_id)? {
            return Err(Error::not_found(format!("Item {}", item_id)));
        }
        info!(item_id, budget_id = item.budget_id, "Deleted item");

        match self.store.find_budget(item.budget_id, user_id) {
            Ok(Some(budget)) => Ok(Some(self.settle(budget).snapshot())),
            Ok(None) => {
                warn!(budget_id = item.budget_id, "Deleted item belonged to a missing budget");
                Ok(None)
            }
            Err(e) => {
                error!(budget_id = item.budget_id, error = %e, "Failed to reload budget");
                Ok(None)
            }
        }
    }

    /// Create several items in one request
    ///
    /// The combined cost is checked against the budget total up front.
    /// Items are then created one at a time; a failed item is recorded and
    /// the rest carry on. Nothing is rolled back.
    pub fn batch_create_items(
        &self,
        user_id: &str,
        budget_id: i64,
        items: &[NewItem],
        today: NaiveDate,
    ) -> Result<BatchOutcome> {
        if items.is_empty() {
            return Err(Error::validation("Batch must contain at least one item"));
        }
        let budget = self.get_budget(user_id, budget_id)?;

        let batch_cost: f64 = items
            .iter()
            .map(NewItem::total_price)
            .filter(|cost| cost.is_finite())
            .sum();
        limits::check_batch(&budget, batch_cost).into_result()?;

        let mut created = Vec::new();
        let mut errors = Vec::new();
        for (index, item) in items.iter().enumerate() {
            match self.create_batch_item(user_id, &budget, item, today) {
                Ok(saved) => created.push(saved),
                Err(e) => {
                    warn!(index, error = %e, "Batch item rejected");
                    errors.push(BatchItemError {
                        index,
                        name: item.name.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        let summary = BatchSummary {
            total: items.len(),
            created: created.len(),
            failed: errors.len(),
        };
        info!(budget_id, created = summary.created, failed = summary.failed, "Batch create finished");

        let budget = self.settle(budget);
        Ok(BatchOutcome {
            items: created,
            errors,
            budget: budget.snapshot(),
            summary,
        })
    }

    fn create_batch_item(
        &self,
        user_id: &str,
        budget: &Budget,
        item: &NewItem,
        today: NaiveDate,
    ) -> Result<Item> {
        item.validate()?;
        self.visible_category(user_id, item.category_id)?;
        self.store.insert_item(
            user_id,
            budget.id,
            item,
            item.purchase_date.unwrap_or(today),
        )
    }

    /// Items matching a filter with totals over the unpaginated set
    pub fn list_items(&self, filter: &ItemFilter) -> Result<ItemPage> {
        let all = filter.unpaginated();
        Ok(ItemPage {
            items: self.store.find_items(filter)?,
            total_count: self.store.count_items(&all)?,
            total_spent: self.store.sum_item_totals(&all)?,
            essential_spent: self
                .store
                .sum_item_totals(&all.clone().essential(Some(true)))?,
        })
    }

    // ========== Derived state ==========

    /// Spend per category, split by essential flag, with allocation usage
    pub fn running_totals(&self, user_id: &str, budget_id: i64) -> Result<RunningTotals> {
        let budget = self.get_budget(user_id, budget_id)?;
        let items = self
            .store
            .find_items(&ItemFilter::for_user(user_id).budget(budget_id))?;

        let mut by_category: BTreeMap<i64, Vec<&Item>> = BTreeMap::new();
        for item in &items {
            by_category.entry(item.category_id).or_default().push(item);
        }

        let mut categories = Vec::with_capacity(by_category.len());
        for (category_id, category_items) in by_category {
            let spent: f64 = category_items.iter().map(|i| i.total_price()).sum();
            let essential_spent: f64 = category_items
                .iter()
                .filter(|i| i.is_essential)
                .map(|i| i.total_price())
                .sum();
            let limit = budget.allocation_for(category_id).map(|a| a.limit);

            categories.push(CategoryTotal {
                category_id,
                name: self.store.category_name(category_id)?,
                spent,
                item_count: category_items.len(),
                essential_spent,
                non_essential_spent: spent - essential_spent,
                limit,
                remaining: limit.map(|l| l - spent),
                percentage_used: limit.map(|l| percentage(spent, l)),
            });
        }

        let essential_items = items.iter().filter(|i| i.is_essential).count();
        let total_spent: f64 = items.iter().map(Item::total_price).sum();
        let summary = TotalsSummary {
            total_items: items.len(),
            essential_items,
            non_essential_items: items.len() - essential_items,
            average_item_cost: if items.is_empty() {
                0.0
            } else {
                total_spent / items.len() as f64
            },
        };

        Ok(RunningTotals {
            signal: signal(budget.percentage_spent()),
            budget: budget.snapshot(),
            categories,
            summary,
        })
    }

    /// Recompute spend and return the budget as it now stands
    fn settle(&self, budget: Budget) -> Budget {
        match aggregate::recompute(self.store, budget.id, &budget.user_id) {
            Ok(Some(spent)) => Budget {
                current_spent: spent,
                ..budget
            },
            Ok(None) => budget,
            Err(e) => {
                error!(budget_id = budget.id, error = %e, "Spend recompute failed; total is stale");
                budget
            }
        }
    }

    fn category_spend(&self, budget: &Budget) -> Vec<CategorySpend> {
        let mut spend = Vec::with_capacity(budget.categories.len());
        for allocation in &budget.categories {
            let spent = aggregate::category_spent(
                self.store,
                budget.id,
                &budget.user_id,
                allocation.category_id,
            )
            .and_then(|spent| {
                Ok((spent, self.store.category_name(allocation.category_id)?))
            });
            match spent {
                Ok((spent, name)) => spend.push(CategorySpend {
                    category_id: allocation.category_id,
                    name,
                    spent,
                }),
                Err(e) => warn!(
                    budget_id = budget.id,
                    category_id = allocation.category_id,
                    error = %e,
                    "Skipping category alert"
                ),
            }
        }
        spend
    }

    fn write_outcome(&self, item: Item, budget: Budget) -> ItemWriteOutcome {
        let alerts = budget_alerts(&budget, &self.category_spend(&budget));
        let tips = self
            .tips
            .map(|catalog| {
                let mut tips = threshold_tips(catalog, &budget);
                tips.truncate(MAX_WRITE_TIPS);
                tips
            })
            .unwrap_or_default();

        ItemWriteOutcome {
            item,
            signal: signal(budget.percentage_spent()),
            budget: budget.snapshot(),
            alerts,
            tips,
        }
    }
}
