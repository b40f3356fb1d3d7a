//! CLI command tests
//!
//! This module contains all tests for the CLI commands.

use std::io::Write;

use chrono::Duration;
use grocer_core::db::Database;
use grocer_core::{lifecycle, ActivityFilter, AuditAction, BudgetTracker, ItemFilter};

use crate::commands::{self, truncate, ItemArgs, ItemChanges};

const USER: &str = "alice";

fn setup_test_db() -> Database {
    Database::in_memory().unwrap()
}

/// Create the active budget for USER, returning its ID
fn create_test_budget(db: &Database, limit: f64, allocations: &[&str]) -> i64 {
    let today = commands::today();
    let start = (today - Duration::days(5)).to_string();
    let end = (today + Duration::days(25)).to_string();
    let allocations: Vec<String> = allocations.iter().map(|a| a.to_string()).collect();

    commands::cmd_budgets_create(db, USER, "Monthly", limit, &start, &end, &allocations).unwrap();
    lifecycle::active_budget(db, USER, today).unwrap().unwrap().id
}

fn item(name: &str, price: f64, category: &str) -> ItemArgs {
    ItemArgs {
        name: name.to_string(),
        price,
        category: category.to_string(),
        quantity: 1,
        budget: None,
        essential: false,
        date: None,
        notes: None,
    }
}

fn spent(db: &Database, budget_id: i64) -> f64 {
    BudgetTracker::new(db)
        .get_budget(USER, budget_id)
        .unwrap()
        .current_spent
}

fn audit_count(db: &Database, action: AuditAction) -> i64 {
    let mut filter = ActivityFilter::for_user(USER);
    filter.action = Some(action);
    db.list_user_activity(&filter).unwrap().total
}

// ========== Helper Tests ==========

#[test]
fn test_truncate() {
    assert_eq!(truncate("Apples", 10), "Apples");
    assert_eq!(truncate("Organic Honeycrisp Apples", 10), "Organic...");
    assert_eq!(truncate("Crème brûlée", 8), "Crème...");
}

#[test]
fn test_parse_date() {
    let date = commands::parse_date("2024-06-01", "start").unwrap();
    assert_eq!(date.to_string(), "2024-06-01");

    let err = commands::parse_date("06/01/2024", "start").unwrap_err();
    assert!(err.to_string().contains("--start"));
}

#[test]
fn test_resolve_category_by_name_and_id() {
    let db = setup_test_db();

    let produce = commands::resolve_category(&db, USER, "produce").unwrap();
    assert_eq!(produce.name, "Produce");

    let by_id = commands::resolve_category(&db, USER, &produce.id.to_string()).unwrap();
    assert_eq!(by_id.id, produce.id);

    assert!(commands::resolve_category(&db, USER, "Nonexistent").is_err());
}

#[test]
fn test_resolve_budget_without_active_budget() {
    let db = setup_test_db();
    let err = commands::resolve_budget(&db, USER, None).unwrap_err();
    assert!(err.to_string().contains("No active budget"));
}

// ========== Budget Command Tests ==========

#[test]
fn test_cmd_budgets_create_and_list() {
    let db = setup_test_db();
    let id = create_test_budget(&db, 200.0, &["Produce=50", "dairy=30"]);

    let budget = BudgetTracker::new(&db).get_budget(USER, id).unwrap();
    assert_eq!(budget.total_limit, 200.0);
    assert_eq!(budget.categories.len(), 2);
    assert_eq!(budget.allocated_total(), 80.0);

    assert!(commands::cmd_budgets_list(&db, USER).is_ok());
    assert!(commands::cmd_budgets_show(&db, USER, id).is_ok());
    assert!(commands::cmd_budgets_active(&db, USER).is_ok());
    assert_eq!(audit_count(&db, AuditAction::BudgetCreate), 1);
}

#[test]
fn test_cmd_budgets_create_rejects_bad_allocation() {
    let db = setup_test_db();
    let today = commands::today().to_string();
    let end = (commands::today() + Duration::days(7)).to_string();

    let missing_amount =
        commands::cmd_budgets_create(&db, USER, "Week", 100.0, &today, &end, &["Produce".to_string()]);
    assert!(missing_amount.is_err());

    let over_total = commands::cmd_budgets_create(
        &db,
        USER,
        "Week",
        100.0,
        &today,
        &end,
        &["Produce=80".to_string(), "Dairy=40".to_string()],
    );
    assert!(over_total.is_err());
    assert!(db.list_budgets(USER).unwrap().is_empty());
}

#[test]
fn test_cmd_budgets_active_with_none() {
    let db = setup_test_db();
    assert!(commands::cmd_budgets_active(&db, USER).is_ok());
}

#[test]
fn test_cmd_budgets_update() {
    let db = setup_test_db();
    let id = create_test_budget(&db, 100.0, &[]);

    assert!(commands::cmd_budgets_update(&db, USER, id, None, None, None).is_err());

    commands::cmd_budgets_update(&db, USER, id, Some("Groceries".to_string()), Some(150.0), None)
        .unwrap();
    let budget = BudgetTracker::new(&db).get_budget(USER, id).unwrap();
    assert_eq!(budget.name, "Groceries");
    assert_eq!(budget.total_limit, 150.0);
}

#[test]
fn test_cmd_budgets_allocate() {
    let db = setup_test_db();
    let id = create_test_budget(&db, 100.0, &["Produce=20"]);

    commands::cmd_budgets_allocate(&db, USER, id, &["Meat=40".to_string(), "Bakery=10".to_string()])
        .unwrap();
    let budget = BudgetTracker::new(&db).get_budget(USER, id).unwrap();
    assert_eq!(budget.categories.len(), 2);
    assert_eq!(budget.allocated_total(), 50.0);

    let err = commands::cmd_budgets_allocate(&db, USER, id, &["Meat=150".to_string()]);
    assert!(err.is_err());

    commands::cmd_budgets_allocate(&db, USER, id, &[]).unwrap();
    let budget = BudgetTracker::new(&db).get_budget(USER, id).unwrap();
    assert!(budget.categories.is_empty());
}

#[test]
fn test_cmd_budgets_delete() {
    let db = setup_test_db();
    let id = create_test_budget(&db, 100.0, &[]);
    commands::cmd_items_add(&db, USER, item("Milk", 4.0, "Dairy")).unwrap();

    // Budgets with items cannot be deleted
    assert!(commands::cmd_budgets_delete(&db, USER, id).is_err());

    let item_id = db.list_items(&ItemFilter::for_user(USER)).unwrap()[0].id;
    commands::cmd_items_delete(&db, USER, item_id).unwrap();
    commands::cmd_budgets_delete(&db, USER, id).unwrap();
    assert!(db.list_budgets(USER).unwrap().is_empty());
}

// ========== Item Command Tests ==========

#[test]
fn test_cmd_items_add_updates_spent() {
    let db = setup_test_db();
    let id = create_test_budget(&db, 100.0, &[]);

    let mut args = item("Apples", 2.5, "Produce");
    args.quantity = 4;
    args.essential = true;
    commands::cmd_items_add(&db, USER, args).unwrap();

    assert_eq!(spent(&db, id), 10.0);
    let items = db.list_items(&ItemFilter::for_user(USER)).unwrap();
    assert_eq!(items.len(), 1);
    assert!(items[0].is_essential);
    assert_eq!(items[0].purchase_date, commands::today());
    assert_eq!(audit_count(&db, AuditAction::ItemCreate), 1);
}

#[test]
fn test_cmd_items_add_over_limit_is_rejected_and_audited() {
    let db = setup_test_db();
    let id = create_test_budget(&db, 100.0, &[]);

    commands::cmd_items_add(&db, USER, item("Roast", 90.0, "Meat")).unwrap();
    let err = commands::cmd_items_add(&db, USER, item("Cheese", 15.0, "Dairy")).unwrap_err();
    assert!(err.to_string().to_lowercase().contains("limit"));

    assert_eq!(spent(&db, id), 90.0);
    let page = db.list_user_activity(&ActivityFilter::for_user(USER)).unwrap();
    let failures = page.entries.iter().filter(|e| !e.success).count();
    assert_eq!(failures, 1);
}

#[test]
fn test_cmd_items_add_survives_audit_log_failure() {
    let db = setup_test_db();
    let id = create_test_budget(&db, 100.0, &[]);

    db.conn()
        .unwrap()
        .execute_batch("DROP TABLE audit_log;")
        .unwrap();

    commands::cmd_items_add(&db, USER, item("Apples", 3.0, "Produce")).unwrap();
    assert_eq!(spent(&db, id), 3.0);
}

#[test]
fn test_cmd_items_add_over_category_limit() {
    let db = setup_test_db();
    create_test_budget(&db, 100.0, &["Snacks=10"]);

    commands::cmd_items_add(&db, USER, item("Chips", 6.0, "Snacks")).unwrap();
    assert!(commands::cmd_items_add(&db, USER, item("Cookies", 5.0, "Snacks")).is_err());
    // Other categories still have room
    assert!(commands::cmd_items_add(&db, USER, item("Bread", 5.0, "Bakery")).is_ok());
}

#[test]
fn test_cmd_items_add_requires_budget() {
    let db = setup_test_db();
    assert!(commands::cmd_items_add(&db, USER, item("Milk", 4.0, "Dairy")).is_err());
}

#[test]
fn test_cmd_items_add_unknown_category() {
    let db = setup_test_db();
    create_test_budget(&db, 100.0, &[]);
    assert!(commands::cmd_items_add(&db, USER, item("Milk", 4.0, "Toys")).is_err());
}

#[test]
fn test_cmd_items_add_with_date_and_notes() {
    let db = setup_test_db();
    create_test_budget(&db, 100.0, &[]);

    let yesterday = commands::today() - Duration::days(1);
    let mut args = item("Eggs", 3.0, "Dairy");
    args.date = Some(yesterday.to_string());
    args.notes = Some("free range".to_string());
    commands::cmd_items_add(&db, USER, args).unwrap();

    let items = db.list_items(&ItemFilter::for_user(USER)).unwrap();
    assert_eq!(items[0].purchase_date, yesterday);
    assert_eq!(items[0].notes.as_deref(), Some("free range"));
}

#[test]
fn test_cmd_items_update() {
    let db = setup_test_db();
    let id = create_test_budget(&db, 100.0, &[]);
    commands::cmd_items_add(&db, USER, item("Milk", 4.0, "Dairy")).unwrap();
    let item_id = db.list_items(&ItemFilter::for_user(USER)).unwrap()[0].id;

    assert!(commands::cmd_items_update(&db, USER, item_id, ItemChanges::default()).is_err());

    commands::cmd_items_update(
        &db,
        USER,
        item_id,
        ItemChanges {
            price: Some(5.0),
            quantity: Some(2),
            essential: Some(true),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(spent(&db, id), 10.0);
    let updated = db.get_item(item_id, USER).unwrap().unwrap();
    assert_eq!(updated.quantity, 2);
    assert!(updated.is_essential);
}

#[test]
fn test_cmd_items_delete() {
    let db = setup_test_db();
    let id = create_test_budget(&db, 100.0, &[]);
    commands::cmd_items_add(&db, USER, item("Milk", 4.0, "Dairy")).unwrap();
    let item_id = db.list_items(&ItemFilter::for_user(USER)).unwrap()[0].id;

    commands::cmd_items_delete(&db, USER, item_id).unwrap();
    assert_eq!(spent(&db, id), 0.0);
    assert!(commands::cmd_items_delete(&db, USER, item_id).is_err());
}

#[test]
fn test_cmd_items_list() {
    let db = setup_test_db();
    create_test_budget(&db, 100.0, &[]);
    commands::cmd_items_add(&db, USER, item("Milk", 4.0, "Dairy")).unwrap();

    assert!(commands::cmd_items_list(&db, USER, None, None, None, 20).is_ok());
    assert!(commands::cmd_items_list(&db, USER, None, Some("Dairy"), Some(false), 20).is_ok());
    assert!(commands::cmd_items_list(&db, USER, None, Some("Toys"), None, 20).is_err());
}

#[test]
fn test_cmd_items_import() {
    let db = setup_test_db();
    let id = create_test_budget(&db, 100.0, &[]);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "name,price,quantity,category,essential").unwrap();
    writeln!(file, "Bananas,0.25,6,Produce,yes").unwrap();
    writeln!(file, "Yogurt,$3.50,,dairy,no").unwrap();
    file.flush().unwrap();

    commands::cmd_items_import(&db, USER, file.path(), None).unwrap();

    assert_eq!(spent(&db, id), 5.0);
    assert_eq!(db.list_items(&ItemFilter::for_user(USER)).unwrap().len(), 2);
    assert_eq!(audit_count(&db, AuditAction::ItemBatchCreate), 1);
}

#[test]
fn test_cmd_items_import_bad_row_fails_whole_file() {
    let db = setup_test_db();
    create_test_budget(&db, 100.0, &[]);

    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "name,price,category").unwrap();
    writeln!(file, "Bananas,1.50,Produce").unwrap();
    writeln!(file, "Mystery,abc,Produce").unwrap();
    file.flush().unwrap();

    assert!(commands::cmd_items_import(&db, USER, file.path(), None).is_err());
    assert!(db.list_items(&ItemFilter::for_user(USER)).unwrap().is_empty());
}

// ========== Category Command Tests ==========

#[test]
fn test_cmd_categories_add_and_delete() {
    let db = setup_test_db();
    let before = db.list_categories(USER).unwrap().len();

    commands::cmd_categories_add(&db, USER, "Baby", Some("🍼"), Some("#ffaacc"), None).unwrap();
    commands::cmd_categories_add(&db, USER, "Formula", None, None, Some("Baby")).unwrap();
    assert_eq!(db.list_categories(USER).unwrap().len(), before + 2);

    let formula = commands::resolve_category(&db, USER, "Formula").unwrap();
    let baby = commands::resolve_category(&db, USER, "Baby").unwrap();
    assert_eq!(formula.parent_id, Some(baby.id));

    // Custom categories are private to their owner
    assert_eq!(db.list_categories("bob").unwrap().len(), before);

    commands::cmd_categories_delete(&db, USER, "Formula").unwrap();
    assert_eq!(db.list_categories(USER).unwrap().len(), before + 1);
    assert!(commands::cmd_categories_list(&db, USER).is_ok());
}

#[test]
fn test_cmd_categories_add_rejects_bad_color() {
    let db = setup_test_db();
    assert!(commands::cmd_categories_add(&db, USER, "Baby", None, Some("pink"), None).is_err());
}

#[test]
fn test_cmd_categories_delete_system_category() {
    let db = setup_test_db();
    assert!(commands::cmd_categories_delete(&db, USER, "Produce").is_err());
}

// ========== Tips, History and Activity Tests ==========

#[test]
fn test_cmd_tips() {
    let db = setup_test_db();
    assert!(commands::cmd_tips(&db, USER, None).is_ok());

    let id = create_test_budget(&db, 100.0, &[]);
    commands::cmd_items_add(&db, USER, item("Roast", 80.0, "Meat")).unwrap();
    assert!(commands::cmd_tips(&db, USER, Some(id)).is_ok());
    assert!(commands::cmd_tips(&db, USER, None).is_ok());
    assert!(commands::cmd_tips(&db, USER, Some(id + 100)).is_err());
}

#[test]
fn test_cmd_compare_without_previous_period() {
    let db = setup_test_db();
    let id = create_test_budget(&db, 100.0, &[]);
    assert!(commands::cmd_compare(&db, USER, id, false).is_ok());
    assert!(commands::cmd_compare(&db, USER, id, true).is_ok());
    assert!(commands::cmd_compare(&db, USER, id + 1, false).is_err());
}

#[test]
fn test_cmd_trends() {
    let db = setup_test_db();
    create_test_budget(&db, 100.0, &[]);
    commands::cmd_items_add(&db, USER, item("Milk", 4.0, "Dairy")).unwrap();

    assert!(commands::cmd_trends(&db, USER, 30, false).is_ok());
    assert!(commands::cmd_trends(&db, USER, 30, true).is_ok());
    assert!(commands::cmd_trends(&db, USER, 0, false).is_err());
}

#[test]
fn test_cmd_activity() {
    let db = setup_test_db();
    create_test_budget(&db, 100.0, &[]);

    assert!(commands::cmd_activity(&db, USER, None, 20).is_ok());
    assert!(commands::cmd_activity(&db, USER, Some("budget_create"), 20).is_ok());
    assert!(commands::cmd_activity(&db, USER, Some("bogus"), 20).is_err());
    assert!(commands::cmd_activity_summary(&db, USER, 7).is_ok());
    assert!(commands::cmd_activity_summary(&db, USER, 0).is_err());
}

// ========== Export Command Tests ==========

#[test]
fn test_cmd_export_items() {
    let db = setup_test_db();
    let id = create_test_budget(&db, 100.0, &[]);
    commands::cmd_items_add(&db, USER, item("Milk", 4.0, "Dairy")).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("items.csv");
    commands::cmd_export(&db, USER, "items", Some(id), Some(&path), None, None, None).unwrap();

    let csv = std::fs::read_to_string(&path).unwrap();
    assert!(csv.starts_with("Item Name,Category,Price"));
    assert!(csv.contains("Milk,Dairy"));
    assert_eq!(audit_count(&db, AuditAction::ExportData), 1);
}

#[test]
fn test_cmd_export_report_without_budget() {
    let db = setup_test_db();
    create_test_budget(&db, 100.0, &[]);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.csv");
    commands::cmd_export(&db, USER, "report", None, Some(&path), None, None, None).unwrap();
    assert!(path.exists());
}

#[test]
fn test_cmd_export_pdf() {
    let db = setup_test_db();
    let id = create_test_budget(&db, 100.0, &["Dairy=40"]);
    commands::cmd_items_add(&db, USER, item("Milk", 4.0, "Dairy")).unwrap();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("budget.pdf");
    commands::cmd_export(&db, USER, "pdf", Some(id), Some(&path), None, None, None).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert!(bytes.starts_with(b"%PDF"));
    assert_eq!(audit_count(&db, AuditAction::ExportData), 1);

    // The report is per budget
    let other = dir.path().join("none.pdf");
    assert!(commands::cmd_export(&db, USER, "pdf", None, Some(&other), None, None, None).is_err());
    assert!(!other.exists());
}

#[test]
fn test_cmd_export_errors() {
    let db = setup_test_db();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.csv");

    // Unknown kind
    assert!(commands::cmd_export(&db, USER, "xlsx", Some(1), Some(&path), None, None, None).is_err());
    // Budget-scoped exports need --budget
    assert!(commands::cmd_export(&db, USER, "budget", None, Some(&path), None, None, None).is_err());
    // Bad date
    assert!(
        commands::cmd_export(&db, USER, "report", None, Some(&path), Some("June"), None, None)
            .is_err()
    );
    assert!(!path.exists());
}
