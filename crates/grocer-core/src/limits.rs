//! Pre-write spending limit checks
//!
//! The checks read the budget's stored spend, decide, and leave the write
//! to the caller. Two concurrent writers can both pass against the same
//! stale figure; the aggregator repairs the total afterwards but the
//! overspend stands.

use serde::Serialize;
use tracing::info;

use crate::aggregate::category_spent;
use crate::error::Result;
use crate::ledger::LedgerStore;
use crate::models::{Budget, CategoryAllocation, Item};

/// Why a write was refused
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LimitViolation {
    InactiveBudget,
    TotalLimitExceeded {
        current_spent: f64,
        total_limit: f64,
        delta: f64,
        overage: f64,
    },
    CategoryLimitExceeded {
        category_id: i64,
        category_spent: f64,
        category_limit: f64,
        delta: f64,
        overage: f64,
    },
}

/// Outcome of a limit check
#[derive(Debug, Clone, PartialEq)]
pub enum LimitCheck {
    Accept,
    Reject(LimitViolation),
}

impl LimitCheck {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accept)
    }

    /// Turn a rejection into an error
    pub fn into_result(self) -> Result<()> {
        match self {
            Self::Accept => Ok(()),
            Self::Reject(violation) => Err(violation.into()),
        }
    }
}

/// Check the budget total only. Landing exactly on the limit is allowed.
pub fn check_total(budget: &Budget, delta: f64) -> LimitCheck {
    let projected = budget.current_spent + delta;
    if projected > budget.total_limit {
        return LimitCheck::Reject(LimitViolation::TotalLimitExceeded {
            current_spent: budget.current_spent,
            total_limit: budget.total_limit,
            delta,
            overage: projected - budget.total_limit,
        });
    }
    LimitCheck::Accept
}

/// Decide a write that adds `delta` to a budget
///
/// `category_spent` is the current spend in the item's category and only
/// matters when `allocation` is present. Rules run in order, so a write
/// breaking both limits reports the total.
pub fn check_item_write(
    budget: &Budget,
    allocation: Option<&CategoryAllocation>,
    delta: f64,
    category_spent: f64,
) -> LimitCheck {
    if !budget.is_active {
        return reject(budget, LimitViolation::InactiveBudget);
    }

    if let LimitCheck::Reject(violation) = check_total(budget, delta) {
        return reject(budget, violation);
    }

    if let Some(allocation) = allocation {
        let projected = category_spent + delta;
        if projected > allocation.limit {
            return reject(
                budget,
                LimitViolation::CategoryLimitExceeded {
                    category_id: allocation.category_id,
                    category_spent,
                    category_limit: allocation.limit,
                    delta,
                    overage: projected - allocation.limit,
                },
            );
        }
    }

    LimitCheck::Accept
}

/// Check a new item of `cost` in `category_id`, loading category spend from the store
pub fn check_new_item<S: LedgerStore + ?Sized>(
    store: &S,
    budget: &Budget,
    category_id: i64,
    cost: f64,
) -> Result<LimitCheck> {
    let allocation = budget.allocation_for(category_id);
    let spent = match allocation {
        Some(_) => category_spent(store, budget.id, &budget.user_id, category_id)?,
        None => 0.0,
    };
    Ok(check_item_write(budget, allocation, cost, spent))
}

/// Check an edit that changes an item's cost by `delta`
///
/// An edit that neither raises the cost nor changes category is always
/// accepted, even on a retired or overspent budget. Otherwise the usual
/// rules apply: an item staying in its category is checked like a new
/// write of `delta`, and an item moving category is checked against the
/// destination with its full new cost.
pub fn check_update<S: LedgerStore + ?Sized>(
    store: &S,
    budget: &Budget,
    item: &Item,
    delta: f64,
    category_changed: bool,
) -> Result<LimitCheck> {
    if !category_changed {
        if delta <= 0.0 {
            return Ok(LimitCheck::Accept);
        }
        return check_new_item(store, budget, item.category_id, delta);
    }

    if !budget.is_active {
        return Ok(reject(budget, LimitViolation::InactiveBudget));
    }
    if delta > 0.0 {
        if let LimitCheck::Reject(violation) = check_total(budget, delta) {
            return Ok(reject(budget, violation));
        }
    }
    check_category_move(store, budget, item.category_id, item.total_price())
}

/// Check an item moving into `category_id` with its full new cost
pub fn check_category_move<S: LedgerStore + ?Sized>(
    store: &S,
    budget: &Budget,
    category_id: i64,
    new_cost: f64,
) -> Result<LimitCheck> {
    let Some(allocation) = budget.allocation_for(category_id) else {
        return Ok(LimitCheck::Accept);
    };
    let spent = category_spent(store, budget.id, &budget.user_id, category_id)?;
    let projected = spent + new_cost;
    if projected > allocation.limit {
        return Ok(reject(
            budget,
            LimitViolation::CategoryLimitExceeded {
                category_id,
                category_spent: spent,
                category_limit: allocation.limit,
                delta: new_cost,
                overage: projected - allocation.limit,
            },
        ));
    }
    Ok(LimitCheck::Accept)
}

/// Check a whole batch's cost against the budget total
pub fn check_batch(budget: &Budget, total_cost: f64) -> LimitCheck {
    check_item_write(budget, None, total_cost, 0.0)
}

fn reject(budget: &Budget, violation: LimitViolation) -> LimitCheck {
    info!(budget_id = budget.id, ?violation, "Spending limit check rejected write");
    LimitCheck::Reject(violation)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::BudgetPeriod;
    use chrono::{NaiveDate, Utc};

    fn budget(total_limit: f64, current_spent: f64) -> Budget {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        Budget {
            id: 1,
            user_id: "alice".to_string(),
            name: "March".to_string(),
            total_limit,
            period: BudgetPeriod::new(start, end),
            categories: vec![CategoryAllocation {
                category_id: 1,
                limit: 50.0,
            }],
            current_spent,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_total_exactly_at_limit_is_accepted() {
        assert!(check_total(&budget(100.0, 90.0), 10.0).is_accepted());
    }

    #[test]
    fn test_total_over_limit_reports_overage() {
        match check_total(&budget(100.0, 90.0), 10.01) {
            LimitCheck::Reject(LimitViolation::TotalLimitExceeded { overage, .. }) => {
                assert!((overage - 0.01).abs() < 1e-9);
            }
            other => panic!("expected total rejection, got {:?}", other),
        }
    }

    fn item(category_id: i64, price: f64) -> Item {
        Item {
            id: 1,
            user_id: "alice".to_string(),
            budget_id: 1,
            name: "Milk".to_string(),
            price,
            quantity: 1,
            category_id,
            is_essential: false,
            purchase_date: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_update_lowering_cost_always_accepted() {
        let db = Database::in_memory().unwrap();
        let mut over = budget(100.0, 150.0);
        over.is_active = false;
        assert!(check_update(&db, &over, &item(1, 5.0), 0.0, false).unwrap().is_accepted());
        assert!(check_update(&db, &over, &item(1, 5.0), -5.0, false).unwrap().is_accepted());
    }

    #[test]
    fn test_update_raising_cost_runs_every_rule() {
        let db = Database::in_memory().unwrap();
        let mut retired = budget(100.0, 10.0);
        retired.is_active = false;
        assert_eq!(
            check_update(&db, &retired, &item(1, 5.0), 0.5, false).unwrap(),
            LimitCheck::Reject(LimitViolation::InactiveBudget)
        );
        assert_eq!(
            check_update(&db, &retired, &item(2, 5.0), 0.0, true).unwrap(),
            LimitCheck::Reject(LimitViolation::InactiveBudget)
        );

        // Category 1 is allocated 50; nothing is stored yet so the raise alone counts
        let active = budget(100.0, 10.0);
        assert!(check_update(&db, &active, &item(1, 50.0), 50.0, false).unwrap().is_accepted());
        assert!(matches!(
            check_update(&db, &active, &item(1, 60.0), 50.5, false).unwrap(),
            LimitCheck::Reject(LimitViolation::CategoryLimitExceeded { .. })
        ));
    }

    #[test]
    fn test_inactive_budget_rejected_first() {
        let mut b = budget(100.0, 0.0);
        b.is_active = false;
        assert_eq!(
            check_item_write(&b, None, 1.0, 0.0),
            LimitCheck::Reject(LimitViolation::InactiveBudget)
        );
    }

    #[test]
    fn test_total_violation_reported_when_both_limits_broken() {
        let b = budget(100.0, 95.0);
        let allocation = b.categories[0];
        match check_item_write(&b, Some(&allocation), 60.0, 0.0) {
            LimitCheck::Reject(LimitViolation::TotalLimitExceeded { overage, .. }) => {
                assert!((overage - 55.0).abs() < 1e-9)
            }
            other => panic!("expected total rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_category_limit_checked_only_with_allocation() {
        let b = budget(1000.0, 40.0);
        let allocation = b.categories[0];
        assert!(check_item_write(&b, None, 20.0, 40.0).is_accepted());
        match check_item_write(&b, Some(&allocation), 20.0, 40.0) {
            LimitCheck::Reject(LimitViolation::CategoryLimitExceeded {
                category_spent,
                category_limit,
                overage,
                ..
            }) => {
                assert_eq!(category_spent, 40.0);
                assert_eq!(category_limit, 50.0);
                assert!((overage - 10.0).abs() < 1e-9);
            }
            other => panic!("expected category rejection, got {:?}", other),
        }
        assert!(check_item_write(&b, Some(&allocation), 10.0, 40.0).is_accepted());
    }

    #[test]
    fn test_violation_converts_to_error() {
        let err = check_total(&budget(100.0, 100.0), 1.0)
            .into_result()
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::Error::TotalLimitExceeded { .. }
        ));
    }
}
