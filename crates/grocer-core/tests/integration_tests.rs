//! Integration tests for grocer-core
//!
//! These tests exercise the full budget → item write → recompute → signal
//! workflow against a real database.

use chrono::NaiveDate;
use grocer_core::{
    aggregate, compare_periods,
    db::Database,
    history::analyze_spending_trends,
    import::parse_items,
    ledger::{CategoryCatalog, ItemFilter, LedgerStore},
    limits::{check_item_write, LimitCheck, LimitViolation},
    models::{BudgetUpdate, CategoryAllocation, ItemUpdate, NewBudget, NewItem},
    signal, BudgetTracker, ComparisonOutcome, Error, ThresholdSignal, TipCatalog, TipGenerator,
    TrendDirection,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn budget(name: &str, total_limit: f64, start: NaiveDate, end: NaiveDate) -> NewBudget {
    NewBudget {
        name: name.to_string(),
        total_limit,
        start_date: start,
        end_date: end,
        categories: Vec::new(),
    }
}

fn category(db: &Database, name: &str) -> i64 {
    db.find_category_by_name(name, "alice")
        .expect("Category lookup failed")
        .expect("System category missing")
        .id
}

fn item_sum(db: &Database, budget_id: i64) -> f64 {
    db.find_items(&ItemFilter::for_user("alice").budget(budget_id))
        .unwrap()
        .iter()
        .map(|i| i.total_price())
        .sum()
}

// =============================================================================
// Reconciliation
// =============================================================================

#[test]
fn test_spend_reconciles_after_every_mutation() {
    let db = Database::in_memory().expect("Failed to create database");
    let tracker = BudgetTracker::new(&db);
    let today = date(2024, 6, 10);
    let dairy = category(&db, "Dairy");
    let produce = category(&db, "Produce");

    let june = tracker
        .create_budget("alice", &budget("June", 300.0, date(2024, 6, 1), date(2024, 6, 30)))
        .unwrap();

    let milk = tracker
        .create_item("alice", june.id, &NewItem::new("Milk", 3.25, 2, dairy), today)
        .unwrap();
    assert!((milk.budget.current_spent - 6.5).abs() < 1e-9);

    let apples = tracker
        .create_item("alice", june.id, &NewItem::new("Apples", 1.1, 7, produce), today)
        .unwrap();
    tracker
        .update_item(
            "alice",
            milk.item.id,
            &ItemUpdate {
                quantity: Some(5),
                ..Default::default()
            },
        )
        .unwrap();
    tracker
        .update_item(
            "alice",
            apples.item.id,
            &ItemUpdate {
                price: Some(0.9),
                category_id: Some(dairy),
                ..Default::default()
            },
        )
        .unwrap();
    let after_delete = tracker
        .delete_item("alice", milk.item.id)
        .unwrap()
        .expect("Budget should still exist");

    let stored = db.find_budget(june.id, "alice").unwrap().unwrap();
    assert!((stored.current_spent - item_sum(&db, june.id)).abs() < 1e-9);
    assert!((after_delete.current_spent - 6.3).abs() < 1e-9);

    // Drifted totals are repaired by the next recompute
    db.set_current_spent(june.id, "alice", 999.0).unwrap();
    let repaired = grocer_core::aggregate::recompute(&db, june.id, "alice")
        .unwrap()
        .unwrap();
    assert!((repaired - 6.3).abs() < 1e-9);
    assert!(grocer_core::aggregate::recompute(&db, 4242, "alice")
        .unwrap()
        .is_none());
}

#[test]
fn test_recompute_missing_budget_is_none() {
    let db = Database::in_memory().unwrap();
    let tracker = BudgetTracker::new(&db);
    let dairy = category(&db, "Dairy");

    let june = tracker
        .create_budget("alice", &budget("June", 100.0, date(2024, 6, 1), date(2024, 6, 30)))
        .unwrap();
    tracker
        .create_item("alice", june.id, &NewItem::new("Milk", 4.0, 1, dairy), date(2024, 6, 2))
        .unwrap();

    assert_eq!(aggregate::recompute(&db, june.id + 1000, "alice").unwrap(), None);
    // Another user's budget is as good as missing
    assert_eq!(aggregate::recompute(&db, june.id, "bob").unwrap(), None);
    assert_eq!(aggregate::recompute(&db, june.id, "alice").unwrap(), Some(4.0));
}

// =============================================================================
// Limit enforcement
// =============================================================================

#[test]
fn test_total_limit_scenario() {
    let db = Database::in_memory().unwrap();
    let tracker = BudgetTracker::new(&db);
    let today = date(2024, 6, 10);
    let pantry = category(&db, "Pantry");

    let june = tracker
        .create_budget("alice", &budget("June", 100.0, date(2024, 6, 1), date(2024, 6, 30)))
        .unwrap();
    tracker
        .create_item("alice", june.id, &NewItem::new("Stock up", 90.0, 1, pantry), today)
        .unwrap();

    let rejected = tracker.create_item("alice", june.id, &NewItem::new("Beans", 5.0, 3, pantry), today);
    match rejected {
        Err(Error::TotalLimitExceeded {
            current_spent,
            total_limit,
            delta,
            overage,
        }) => {
            assert_eq!(current_spent, 90.0);
            assert_eq!(total_limit, 100.0);
            assert_eq!(delta, 15.0);
            assert_eq!(overage, 5.0);
        }
        other => panic!("Expected TotalLimitExceeded, got {:?}", other),
    }

    let accepted = tracker
        .create_item("alice", june.id, &NewItem::new("Beans", 5.0, 1, pantry), today)
        .unwrap();
    assert_eq!(accepted.budget.current_spent, 95.0);
    assert_eq!(accepted.signal, ThresholdSignal::Critical);
    assert_eq!(db.count_items(&ItemFilter::for_user("alice").budget(june.id)).unwrap(), 2);
}

#[test]
fn test_total_violation_wins_over_category() {
    let db = Database::in_memory().unwrap();
    let tracker = BudgetTracker::new(&db);
    let snacks = category(&db, "Snacks");

    let mut new_budget = budget("June", 50.0, date(2024, 6, 1), date(2024, 6, 30));
    new_budget.categories = vec![CategoryAllocation {
        category_id: snacks,
        limit: 10.0,
    }];
    let june = tracker.create_budget("alice", &new_budget).unwrap();

    // Category alone
    let err = tracker
        .create_item("alice", june.id, &NewItem::new("Chips", 12.0, 1, snacks), date(2024, 6, 2))
        .unwrap_err();
    assert!(matches!(err, Error::CategoryLimitExceeded { overage, .. } if overage == 2.0));

    // Both: total is reported
    let err = tracker
        .create_item("alice", june.id, &NewItem::new("Party pack", 60.0, 1, snacks), date(2024, 6, 2))
        .unwrap_err();
    assert!(matches!(err, Error::TotalLimitExceeded { overage, .. } if overage == 10.0));

    // The pure check agrees
    let june = db.find_budget(june.id, "alice").unwrap().unwrap();
    let verdict = check_item_write(&june, june.allocation_for(snacks), 60.0, 0.0);
    assert!(matches!(
        verdict,
        LimitCheck::Reject(LimitViolation::TotalLimitExceeded { .. })
    ));
    assert!(check_item_write(&june, june.allocation_for(snacks), 10.0, 0.0).is_accepted());
}

#[test]
fn test_inactive_budget_rejects_items() {
    let db = Database::in_memory().unwrap();
    let tracker = BudgetTracker::new(&db);
    let dairy = category(&db, "Dairy");

    let june = tracker
        .create_budget("alice", &budget("June", 100.0, date(2024, 6, 1), date(2024, 6, 30)))
        .unwrap();
    tracker
        .update_budget(
            "alice",
            june.id,
            &BudgetUpdate {
                is_active: Some(false),
                ..Default::default()
            },
        )
        .unwrap();

    let err = tracker
        .create_item("alice", june.id, &NewItem::new("Milk", 3.0, 1, dairy), date(2024, 6, 2))
        .unwrap_err();
    assert!(matches!(err, Error::InactiveBudget));
}

#[test]
fn test_allocation_sum_cannot_exceed_total() {
    let db = Database::in_memory().unwrap();
    let tracker = BudgetTracker::new(&db);
    let dairy = category(&db, "Dairy");
    let produce = category(&db, "Produce");

    let mut new_budget = budget("June", 100.0, date(2024, 6, 1), date(2024, 6, 30));
    new_budget.categories = vec![
        CategoryAllocation {
            category_id: dairy,
            limit: 60.0,
        },
        CategoryAllocation {
            category_id: produce,
            limit: 50.0,
        },
    ];
    assert!(matches!(
        tracker.create_budget("alice", &new_budget),
        Err(Error::InvalidAllocation { .. })
    ));

    new_budget.categories.pop();
    let june = tracker.create_budget("alice", &new_budget).unwrap();
    let err = tracker
        .update_budget(
            "alice",
            june.id,
            &BudgetUpdate {
                total_limit: Some(40.0),
                ..Default::default()
            },
        )
        .unwrap_err();
    assert!(matches!(err, Error::InvalidAllocation { allocated, total_limit } if allocated == 60.0 && total_limit == 40.0));
}

#[test]
fn test_update_checks_category_limit_in_place() {
    let db = Database::in_memory().unwrap();
    let tracker = BudgetTracker::new(&db);
    let dairy = category(&db, "Dairy");

    let mut new_budget = budget("June", 100.0, date(2024, 6, 1), date(2024, 6, 30));
    new_budget.categories = vec![CategoryAllocation {
        category_id: dairy,
        limit: 20.0,
    }];
    let june = tracker.create_budget("alice", &new_budget).unwrap();
    let cheese = tracker
        .create_item("alice", june.id, &NewItem::new("Cheese", 10.0, 1, dairy), date(2024, 6, 3))
        .unwrap();

    let err = tracker
        .update_item(
            "alice",
            cheese.item.id,
            &ItemUpdate {
                price: Some(50.0),
                ..Default::default()
            },
        )
        .unwrap_err();
    match err {
        Error::CategoryLimitExceeded {
            category_id,
            category_spent,
            category_limit,
            delta,
            ..
        } => {
            assert_eq!(category_id, dairy);
            assert_eq!(category_spent, 10.0);
            assert_eq!(category_limit, 20.0);
            assert_eq!(delta, 40.0);
        }
        other => panic!("expected category rejection, got {:?}", other),
    }
    assert_eq!(db.find_budget(june.id, "alice").unwrap().unwrap().current_spent, 10.0);
    assert_eq!(db.find_item(cheese.item.id, "alice").unwrap().unwrap().price, 10.0);

    // Landing exactly on the allocation is fine
    let updated = tracker
        .update_item(
            "alice",
            cheese.item.id,
            &ItemUpdate {
                price: Some(20.0),
                ..Default::default()
            },
        )
        .unwrap();
    assert_eq!(updated.budget.current_spent, 20.0);
}

#[test]
fn test_update_on_retired_budget() {
    let db = Database::in_memory().unwrap();
    let tracker = BudgetTracker::new(&db);
    let dairy = category(&db, "Dairy");
    let produce = category(&db, "Produce");

    let may = tracker
        .create_budget("alice", &budget("May", 100.0, date(2024, 5, 1), date(2024, 5, 31)))
        .unwrap();
    let milk = tracker
        .create_item("alice", may.id, &NewItem::new("Milk", 5.0, 1, dairy), date(2024, 5, 2))
        .unwrap();
    tracker
        .create_budget("alice", &budget("June", 100.0, date(2024, 6, 1), date(2024, 6, 30)))
        .unwrap();

    let raise = ItemUpdate {
        price: Some(50.0),
        ..Default::default()
    };
    let err = tracker.update_item("alice", milk.item.id, &raise).unwrap_err();
    assert!(matches!(err, Error::InactiveBudget));

    let recategorize = ItemUpdate {
        category_id: Some(produce),
        ..Default::default()
    };
    let err = tracker.update_item("alice", milk.item.id, &recategorize).unwrap_err();
    assert!(matches!(err, Error::InactiveBudget));
    assert_eq!(db.find_budget(may.id, "alice").unwrap().unwrap().current_spent, 5.0);

    // Corrections that lower the cost still go through
    let lower = ItemUpdate {
        price: Some(4.0),
        notes: Some("receipt said 4".to_string()),
        ..Default::default()
    };
    let outcome = tracker.update_item("alice", milk.item.id, &lower).unwrap();
    assert_eq!(outcome.budget.current_spent, 4.0);
}

#[test]
fn test_category_move_into_full_allocation() {
    let db = Database::in_memory().unwrap();
    let tracker = BudgetTracker::new(&db);
    let dairy = category(&db, "Dairy");
    let produce = category(&db, "Produce");

    let mut new_budget = budget("June", 100.0, date(2024, 6, 1), date(2024, 6, 30));
    new_budget.categories = vec![CategoryAllocation {
        category_id: dairy,
        limit: 20.0,
    }];
    let june = tracker.create_budget("alice", &new_budget).unwrap();
    tracker
        .create_item("alice", june.id, &NewItem::new("Cheese", 15.0, 1, dairy), date(2024, 6, 3))
        .unwrap();
    let berries = tracker
        .create_item("alice", june.id, &NewItem::new("Berries", 5.0, 2, produce), date(2024, 6, 3))
        .unwrap();

    let err = tracker
        .update_item(
            "alice",
            berries.item.id,
            &ItemUpdate {
                category_id: Some(dairy),
                ..Default::default()
            },
        )
        .unwrap_err();
    match err {
        Error::CategoryLimitExceeded {
            category_id,
            overage,
            ..
        } => {
            assert_eq!(category_id, dairy);
            assert!((overage - 5.0).abs() < 1e-9);
        }
        other => panic!("expected category rejection, got {:?}", other),
    }
    let berries = db.find_item(berries.item.id, "alice").unwrap().unwrap();
    assert_eq!(berries.category_id, produce);
    assert_eq!(db.find_budget(june.id, "alice").unwrap().unwrap().current_spent, 25.0);
}

// =============================================================================
// Signals
// =============================================================================

#[test]
fn test_signal_tiers() {
    assert_eq!(signal(49.0), ThresholdSignal::None);
    assert_eq!(signal(50.0), ThresholdSignal::Info);
    assert_eq!(signal(74.0), ThresholdSignal::Info);
    assert_eq!(signal(75.0), ThresholdSignal::Warning);
    assert_eq!(signal(89.0), ThresholdSignal::Warning);
    assert_eq!(signal(90.0), ThresholdSignal::Critical);
    assert_eq!(signal(150.0), ThresholdSignal::Critical);
}

// =============================================================================
// Lifecycle
// =============================================================================

#[test]
fn test_activation_leaves_one_active_budget() {
    let db = Database::in_memory().unwrap();
    let tracker = BudgetTracker::new(&db);
    let dairy = category(&db, "Dairy");

    let may = tracker
        .create_budget("alice", &budget("May", 100.0, date(2024, 5, 1), date(2024, 5, 31)))
        .unwrap();
    tracker
        .create_item("alice", may.id, &NewItem::new("Milk", 3.0, 2, dairy), date(2024, 5, 3))
        .unwrap();

    let june = tracker
        .create_budget("alice", &budget("June", 100.0, date(2024, 6, 1), date(2024, 6, 30)))
        .unwrap();

    let budgets = db.find_budgets("alice").unwrap();
    let active: Vec<_> = budgets.iter().filter(|b| b.is_active).collect();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, june.id);

    // The old budget keeps its items and spend
    let may = db.find_budget(may.id, "alice").unwrap().unwrap();
    assert_eq!(may.current_spent, 6.0);
    assert_eq!(item_sum(&db, may.id), 6.0);

    // Another user's active budget is untouched
    let bob = BudgetTracker::new(&db)
        .create_budget("bob", &budget("Bob June", 80.0, date(2024, 6, 1), date(2024, 6, 30)))
        .unwrap();
    assert!(db.find_budget(june.id, "alice").unwrap().unwrap().is_active);
    assert!(db.find_budget(bob.id, "bob").unwrap().unwrap().is_active);
}

#[test]
fn test_delete_budget_requires_no_items() {
    let db = Database::in_memory().unwrap();
    let tracker = BudgetTracker::new(&db);
    let dairy = category(&db, "Dairy");

    let june = tracker
        .create_budget("alice", &budget("June", 100.0, date(2024, 6, 1), date(2024, 6, 30)))
        .unwrap();
    let milk = tracker
        .create_item("alice", june.id, &NewItem::new("Milk", 3.0, 1, dairy), date(2024, 6, 3))
        .unwrap();

    assert!(matches!(
        tracker.delete_budget("alice", june.id),
        Err(Error::BudgetNotEmpty { item_count: 1 })
    ));
    assert!(matches!(
        tracker.delete_budget("bob", june.id),
        Err(Error::NotFound(_))
    ));

    tracker.delete_item("alice", milk.item.id).unwrap();
    tracker.delete_budget("alice", june.id).unwrap();
    assert!(db.find_budget(june.id, "alice").unwrap().is_none());
}

#[test]
fn test_reactivation_retires_current_budget() {
    let db = Database::in_memory().unwrap();
    let tracker = BudgetTracker::new(&db);

    let may = tracker
        .create_budget("alice", &budget("May", 100.0, date(2024, 5, 1), date(2024, 5, 31)))
        .unwrap();
    let june = tracker
        .create_budget("alice", &budget("June", 100.0, date(2024, 6, 1), date(2024, 6, 30)))
        .unwrap();
    assert!(!db.find_budget(may.id, "alice").unwrap().unwrap().is_active);

    tracker
        .update_budget(
            "alice",
            may.id,
            &BudgetUpdate {
                is_active: Some(true),
                ..Default::default()
            },
        )
        .unwrap();

    let active: Vec<_> = db
        .find_budgets("alice")
        .unwrap()
        .into_iter()
        .filter(|b| b.is_active)
        .map(|b| b.id)
        .collect();
    assert_eq!(active, vec![may.id]);
    assert!(!db.find_budget(june.id, "alice").unwrap().unwrap().is_active);
}

// =============================================================================
// History
// =============================================================================

#[test]
fn test_compare_periods() {
    let db = Database::in_memory().unwrap();
    let tracker = BudgetTracker::new(&db);
    let dairy = category(&db, "Dairy");

    let may = tracker
        .create_budget("alice", &budget("May", 200.0, date(2024, 5, 1), date(2024, 5, 31)))
        .unwrap();
    let outcome = compare_periods(&db, "alice", may.id).unwrap();
    assert!(matches!(outcome, ComparisonOutcome::NoPreviousPeriod));

    let june = tracker
        .create_budget("alice", &budget("June", 200.0, date(2024, 6, 1), date(2024, 6, 30)))
        .unwrap();
    tracker
        .create_item("alice", june.id, &NewItem::new("Cheese", 25.0, 4, dairy), date(2024, 6, 3))
        .unwrap();

    let outcome = compare_periods(&db, "alice", june.id).unwrap();
    let comparison = outcome.comparison().expect("Expected a comparison");
    assert_eq!(comparison.previous.budget_id, may.id);
    assert_eq!(comparison.previous.total_spent, 0.0);
    assert_eq!(comparison.current.total_spent, 100.0);
    assert_eq!(comparison.total_change_percent, 100.0);
    assert_eq!(comparison.categories.len(), 1);
    assert_eq!(comparison.categories[0].name, "Dairy");
    assert_eq!(comparison.categories[0].change_percent, 100.0);
}

#[test]
fn test_spending_trends_across_budgets() {
    let db = Database::in_memory().unwrap();
    let tracker = BudgetTracker::new(&db);
    let produce = category(&db, "Produce");

    let june = tracker
        .create_budget("alice", &budget("June", 500.0, date(2024, 6, 1), date(2024, 6, 30)))
        .unwrap();
    // Mondays 3, 10, 17, 24
    for (day, price) in [(3, 20.0), (10, 20.0), (17, 40.0), (24, 40.0)] {
        tracker
            .create_item(
                "alice",
                june.id,
                &NewItem::new("Veg box", price, 1, produce).purchased_on(date(2024, 6, day)),
                date(2024, 6, day),
            )
            .unwrap();
    }

    let trends = analyze_spending_trends(&db, "alice", 30, date(2024, 6, 28)).unwrap();
    assert_eq!(trends.weekly_spending.len(), 4);
    assert_eq!(trends.trend, TrendDirection::Increasing);
    assert_eq!(trends.total_items, 4);
    assert_eq!(trends.weekly_average, 30.0);
    assert_eq!(trends.category_trends[0].name, "Produce");

    assert!(matches!(
        analyze_spending_trends(&db, "alice", 0, date(2024, 6, 28)),
        Err(Error::Validation(_))
    ));
}

// =============================================================================
// Batch and import
// =============================================================================

#[test]
fn test_batch_with_invalid_middle_item() {
    let db = Database::in_memory().unwrap();
    let tracker = BudgetTracker::new(&db);
    let dairy = category(&db, "Dairy");
    let bakery = category(&db, "Bakery");

    let june = tracker
        .create_budget("alice", &budget("June", 100.0, date(2024, 6, 1), date(2024, 6, 30)))
        .unwrap();

    let items = vec![
        NewItem::new("Milk", 3.0, 2, dairy),
        NewItem::new("   ", 4.0, 1, bakery),
        NewItem::new("Bread", 2.5, 1, bakery),
    ];
    let outcome = tracker
        .batch_create_items("alice", june.id, &items, date(2024, 6, 4))
        .unwrap();

    assert_eq!(outcome.summary.total, 3);
    assert_eq!(outcome.summary.created, 2);
    assert_eq!(outcome.summary.failed, 1);
    assert_eq!(outcome.errors[0].index, 1);
    assert_eq!(outcome.budget.current_spent, 8.5);

    let names: Vec<String> = db
        .find_items(&ItemFilter::for_user("alice").budget(june.id))
        .unwrap()
        .into_iter()
        .map(|i| i.name)
        .collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"Milk".to_string()));
    assert!(names.contains(&"Bread".to_string()));
}

#[test]
fn test_batch_rejected_when_total_would_exceed() {
    let db = Database::in_memory().unwrap();
    let tracker = BudgetTracker::new(&db);
    let pantry = category(&db, "Pantry");

    let june = tracker
        .create_budget("alice", &budget("June", 20.0, date(2024, 6, 1), date(2024, 6, 30)))
        .unwrap();
    let items = vec![
        NewItem::new("Rice", 12.0, 1, pantry),
        NewItem::new("Oil", 9.0, 1, pantry),
    ];
    let err = tracker
        .batch_create_items("alice", june.id, &items, date(2024, 6, 4))
        .unwrap_err();
    assert!(matches!(err, Error::TotalLimitExceeded { overage, .. } if (overage - 1.0).abs() < 1e-9));
    assert_eq!(db.count_items(&ItemFilter::for_user("alice")).unwrap(), 0);
}

#[test]
fn test_csv_import_then_batch() {
    let db = Database::in_memory().unwrap();
    let tracker = BudgetTracker::new(&db);
    let june = tracker
        .create_budget("alice", &budget("June", 100.0, date(2024, 6, 1), date(2024, 6, 30)))
        .unwrap();

    let csv = "name,price,quantity,category,essential,purchase_date\n\
               Milk,3.00,2,Dairy,yes,2024-06-02\n\
               Apples,0.50,6,Produce,no,2024-06-03\n";
    let items = parse_items(csv.as_bytes(), &db.categories_for("alice").unwrap()).unwrap();
    let outcome = tracker
        .batch_create_items("alice", june.id, &items, date(2024, 6, 10))
        .unwrap();

    assert_eq!(outcome.summary.created, 2);
    assert_eq!(outcome.budget.current_spent, 9.0);
    assert_eq!(outcome.items[0].purchase_date, date(2024, 6, 2));
}

// =============================================================================
// Tips
// =============================================================================

#[test]
fn test_tips_for_user_follow_spend() {
    let db = Database::in_memory().unwrap();
    let catalog = TipCatalog::embedded().unwrap();
    db.seed_tips(catalog.stored_tips()).unwrap();

    let tracker = BudgetTracker::with_tips(&db, &catalog);
    let snacks = category(&db, "Snacks");
    let mut new_budget = budget("June", 100.0, date(2024, 6, 1), date(2024, 6, 30));
    new_budget.categories = vec![CategoryAllocation {
        category_id: snacks,
        limit: 20.0,
    }];
    let june = tracker.create_budget("alice", &new_budget).unwrap();

    let outcome = tracker
        .create_item("alice", june.id, &NewItem::new("Chips", 18.0, 3, snacks), date(2024, 6, 5))
        .unwrap_err();
    assert!(matches!(outcome, Error::CategoryLimitExceeded { .. }));

    let outcome = tracker
        .create_item("alice", june.id, &NewItem::new("Chips", 6.0, 3, snacks), date(2024, 6, 5))
        .unwrap();
    // 18% of the total: no budget tier, but the category is at 90% of its allocation
    assert_eq!(outcome.signal, ThresholdSignal::None);
    assert!(outcome.tips.is_empty());
    assert_eq!(outcome.alerts.len(), 1);
    assert_eq!(outcome.alerts[0].category_id, Some(snacks));

    let generator = TipGenerator::new(&db, &catalog);
    let patterns = generator.analyze_patterns("alice", june.id).unwrap();
    assert_eq!(patterns.category_overspend.overspending.len(), 1);

    let tips = generator
        .tips_for_user("alice", Some(june.id), date(2024, 6, 5))
        .unwrap();
    assert!(!tips.is_empty());
    assert!(tips.len() <= grocer_core::tips::MAX_USER_TIPS);

    let no_budget = generator.tips_for_user("alice", None, date(2024, 1, 5)).unwrap();
    assert!(!no_budget.is_empty());

    assert!(matches!(
        generator.tips_for_user("bob", Some(june.id), date(2024, 6, 5)),
        Err(Error::NotFound(_))
    ));
}
