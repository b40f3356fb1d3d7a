//! Spending pattern detection over a budget's items

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::models::{percentage, Budget, Item};

/// Purchases of the same item at least this often count as duplicates
pub const DUPLICATE_MIN_PURCHASES: usize = 3;
/// Purchases at least this often count as frequent
pub const FREQUENT_MIN_PURCHASES: usize = 2;
/// Category spend above this share of its allocation is overspend
pub const OVERSPEND_PERCENT: f64 = 80.0;
/// Price rise (first to last purchase) above this is reported
pub const PRICE_INCREASE_PERCENT: f64 = 10.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DuplicatePurchase {
    pub name: String,
    pub count: usize,
    pub total_spent: f64,
    pub average_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryShare {
    pub category_id: i64,
    pub name: String,
    pub spent: f64,
    pub count: usize,
    /// Share of the budget's total spend
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryOverspend {
    pub category_id: i64,
    pub name: String,
    pub spent: f64,
    pub limit: f64,
    /// Spend as a share of the allocation
    pub percentage: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CategorySpending {
    pub breakdown: Vec<CategoryShare>,
    pub overspending: Vec<CategoryOverspend>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrequentItem {
    pub name: String,
    pub category_id: i64,
    pub purchases: usize,
    pub total_quantity: i64,
    pub average_price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceIncrease {
    pub name: String,
    pub first_price: f64,
    pub last_price: f64,
    pub increase_percent: f64,
    pub purchases: usize,
}

/// Everything the tip generator looks at
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpendingPatterns {
    pub duplicate_purchases: Vec<DuplicatePurchase>,
    pub category_overspend: CategorySpending,
    pub frequent_items: Vec<FrequentItem>,
    pub price_increases: Vec<PriceIncrease>,
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase()
}

fn group_by_name(items: &[Item]) -> BTreeMap<String, Vec<&Item>> {
    let mut groups: BTreeMap<String, Vec<&Item>> = BTreeMap::new();
    for item in items {
        groups.entry(normalize(&item.name)).or_default().push(item);
    }
    groups
}

/// Items bought at least [`DUPLICATE_MIN_PURCHASES`] times, most frequent first
pub fn find_duplicate_purchases(items: &[Item]) -> Vec<DuplicatePurchase> {
    let mut duplicates: Vec<DuplicatePurchase> = group_by_name(items)
        .into_iter()
        .filter(|(_, purchases)| purchases.len() >= DUPLICATE_MIN_PURCHASES)
        .map(|(name, purchases)| DuplicatePurchase {
            count: purchases.len(),
            total_spent: purchases.iter().map(|i| i.total_price()).sum(),
            average_price: purchases.iter().map(|i| i.price).sum::<f64>() / purchases.len() as f64,
            name,
        })
        .collect();

    duplicates.sort_by(|a, b| b.count.cmp(&a.count));
    duplicates
}

/// Spend per category, and allocations past [`OVERSPEND_PERCENT`]
///
/// `category_names` maps category ids to display names; unknown ids read
/// as "Unknown".
pub fn analyze_category_spending(
    budget: &Budget,
    items: &[Item],
    category_names: &BTreeMap<i64, String>,
) -> CategorySpending {
    let total: f64 = items.iter().map(Item::total_price).sum();

    let mut per_category: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for item in items {
        let entry = per_category.entry(item.category_id).or_insert((0.0, 0));
        entry.0 += item.total_price();
        entry.1 += 1;
    }

    let name_of = |id: i64| {
        category_names
            .get(&id)
            .cloned()
            .unwrap_or_else(|| "Unknown".to_string())
    };

    let mut spending = CategorySpending::default();
    for (category_id, (spent, count)) in per_category {
        spending.breakdown.push(CategoryShare {
            category_id,
            name: name_of(category_id),
            spent,
            count,
            percentage: percentage(spent, total),
        });

        if let Some(allocation) = budget.allocation_for(category_id) {
            if allocation.limit > 0.0 {
                let pct = percentage(spent, allocation.limit);
                if pct > OVERSPEND_PERCENT {
                    spending.overspending.push(CategoryOverspend {
                        category_id,
                        name: name_of(category_id),
                        spent,
                        limit: allocation.limit,
                        percentage: pct,
                    });
                }
            }
        }
    }
    spending
}

/// Items bought at least [`FREQUENT_MIN_PURCHASES`] times within one category
pub fn find_frequent_items(items: &[Item]) -> Vec<FrequentItem> {
    let mut groups: BTreeMap<(String, i64), Vec<&Item>> = BTreeMap::new();
    for item in items {
        groups
            .entry((normalize(&item.name), item.category_id))
            .or_default()
            .push(item);
    }

    let mut frequent: Vec<FrequentItem> = groups
        .into_values()
        .filter(|purchases| purchases.len() >= FREQUENT_MIN_PURCHASES)
        .map(|purchases| FrequentItem {
            name: purchases[0].name.clone(),
            category_id: purchases[0].category_id,
            purchases: purchases.len(),
            total_quantity: purchases.iter().map(|i| i.quantity).sum(),
            average_price: purchases.iter().map(|i| i.price).sum::<f64>() / purchases.len() as f64,
        })
        .collect();

    frequent.sort_by(|a, b| b.purchases.cmp(&a.purchases));
    frequent
}

/// Items whose unit price rose more than [`PRICE_INCREASE_PERCENT`] from
/// their first purchase to their last, biggest rise first
pub fn detect_price_increases(items: &[Item]) -> Vec<PriceIncrease> {
    let mut increases = Vec::new();

    for (name, mut history) in group_by_name(items) {
        if history.len() < 2 {
            continue;
        }
        history.sort_by_key(|i| (i.purchase_date, i.id));

        let first_price = history[0].price;
        let last_price = history[history.len() - 1].price;
        if first_price <= 0.0 {
            continue;
        }
        let increase_percent = (last_price - first_price) / first_price * 100.0;
        if increase_percent > PRICE_INCREASE_PERCENT {
            increases.push(PriceIncrease {
                name,
                first_price,
                last_price,
                increase_percent,
                purchases: history.len(),
            });
        }
    }

    increases.sort_by(|a, b| b.increase_percent.total_cmp(&a.increase_percent));
    increases
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BudgetPeriod, CategoryAllocation};
    use chrono::{NaiveDate, Utc};

    fn item(id: i64, name: &str, price: f64, category_id: i64, day: u32) -> Item {
        Item {
            id,
            user_id: "alice".to_string(),
            budget_id: 1,
            name: name.to_string(),
            price,
            quantity: 1,
            category_id,
            is_essential: false,
            purchase_date: NaiveDate::from_ymd_opt(2024, 6, day).unwrap(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_duplicates_need_three_purchases() {
        let items = vec![
            item(1, "Milk", 3.0, 2, 1),
            item(2, "milk ", 3.5, 2, 8),
            item(3, "MILK", 4.0, 2, 15),
            item(4, "Bread", 2.0, 4, 1),
            item(5, "Bread", 2.0, 4, 8),
        ];
        let duplicates = find_duplicate_purchases(&items);
        assert_eq!(duplicates.len(), 1);
        assert_eq!(duplicates[0].name, "milk");
        assert_eq!(duplicates[0].count, 3);
        assert!((duplicates[0].total_spent - 10.5).abs() < 1e-9);
        assert!((duplicates[0].average_price - 3.5).abs() < 1e-9);

        let frequent = find_frequent_items(&items);
        assert_eq!(frequent.len(), 2);
        assert_eq!(frequent[0].purchases, 3);
    }

    #[test]
    fn test_price_increase_uses_purchase_order() {
        // Listed newest first, like the store returns them
        let items = vec![
            item(3, "Eggs", 3.5, 2, 20),
            item(2, "Eggs", 3.2, 2, 10),
            item(1, "Eggs", 3.0, 2, 1),
            item(5, "Rice", 2.1, 6, 20),
            item(4, "Rice", 2.0, 6, 1),
        ];
        let increases = detect_price_increases(&items);
        assert_eq!(increases.len(), 1);
        assert_eq!(increases[0].name, "eggs");
        assert_eq!(increases[0].first_price, 3.0);
        assert_eq!(increases[0].last_price, 3.5);
        assert_eq!(increases[0].purchases, 3);
    }

    #[test]
    fn test_category_overspend_against_allocation() {
        let budget = Budget {
            id: 1,
            user_id: "alice".to_string(),
            name: "June".to_string(),
            total_limit: 200.0,
            period: BudgetPeriod::new(
                NaiveDate::from_ymd_opt(2024, 6, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 6, 30).unwrap(),
            ),
            categories: vec![
                CategoryAllocation {
                    category_id: 8,
                    limit: 20.0,
                },
                CategoryAllocation {
                    category_id: 1,
                    limit: 100.0,
                },
            ],
            current_spent: 0.0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let items = vec![
            item(1, "Chips", 17.0, 8, 1),
            item(2, "Apples", 30.0, 1, 2),
            item(3, "Soap", 3.0, 9, 3),
        ];
        let names = BTreeMap::from([(8, "Snacks".to_string()), (1, "Produce".to_string())]);

        let spending = analyze_category_spending(&budget, &items, &names);
        assert_eq!(spending.breakdown.len(), 3);
        assert_eq!(spending.overspending.len(), 1);
        assert_eq!(spending.overspending[0].name, "Snacks");
        assert!((spending.overspending[0].percentage - 85.0).abs() < 1e-9);

        let unknown = spending
            .breakdown
            .iter()
            .find(|s| s.category_id == 9)
            .unwrap();
        assert_eq!(unknown.name, "Unknown");
        assert!((unknown.percentage - 6.0).abs() < 1e-9);
    }
}
