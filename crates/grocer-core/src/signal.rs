//! Threshold signals derived from percentage spent

use serde::{Deserialize, Serialize};

use crate::models::{percentage, Budget};

/// Single alert tier for a spending percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThresholdSignal {
    None,
    Info,
    Warning,
    Critical,
}

/// Tier table, highest threshold first
const TIERS: &[(f64, ThresholdSignal)] = &[
    (90.0, ThresholdSignal::Critical),
    (75.0, ThresholdSignal::Warning),
    (50.0, ThresholdSignal::Info),
];

/// Category spend at or above this share of its allocation gets a warning
pub const CATEGORY_WARNING_PERCENT: f64 = 80.0;

impl ThresholdSignal {
    /// Map a percentage to the highest tier it reaches. Values above 100 stay critical.
    pub fn for_percentage(percentage: f64) -> Self {
        TIERS
            .iter()
            .find(|(threshold, _)| percentage >= *threshold)
            .map(|(_, signal)| *signal)
            .unwrap_or(Self::None)
    }

    /// Lower bound of this tier, if any
    pub fn threshold(&self) -> Option<u32> {
        match self {
            Self::None => None,
            Self::Info => Some(50),
            Self::Warning => Some(75),
            Self::Critical => Some(90),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ThresholdSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Shorthand for [`ThresholdSignal::for_percentage`]
pub fn signal(percentage: f64) -> ThresholdSignal {
    ThresholdSignal::for_percentage(percentage)
}

/// A user-facing alert
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpendingAlert {
    pub level: ThresholdSignal,
    pub message: String,
    pub percentage: f64,
    /// Set for category-level alerts
    pub category_id: Option<i64>,
}

/// Spend already recorded in one category of a budget
#[derive(Debug, Clone)]
pub struct CategorySpend {
    pub category_id: i64,
    pub name: String,
    pub spent: f64,
}

/// Budget-level alert for the current tier, plus a warning per allocation
/// at or above [`CATEGORY_WARNING_PERCENT`] of its limit
pub fn budget_alerts(budget: &Budget, category_spend: &[CategorySpend]) -> Vec<SpendingAlert> {
    let mut alerts = Vec::new();
    let pct = budget.percentage_spent();

    let level = signal(pct);
    let message = match level {
        ThresholdSignal::Critical => Some(format!(
            "Budget at {:.0}%! Only ${:.2} remaining.",
            pct,
            budget.remaining()
        )),
        ThresholdSignal::Warning => Some(format!(
            "You've used {:.0}% of your budget. Consider cutting back.",
            pct
        )),
        ThresholdSignal::Info => Some(format!("Halfway there: {:.0}% of your budget used.", pct)),
        ThresholdSignal::None => None,
    };
    if let Some(message) = message {
        alerts.push(SpendingAlert {
            level,
            message,
            percentage: pct,
            category_id: None,
        });
    }

    for spend in category_spend {
        let Some(allocation) = budget.allocation_for(spend.category_id) else {
            continue;
        };
        if allocation.limit <= 0.0 {
            continue;
        }
        let category_pct = percentage(spend.spent, allocation.limit);
        if category_pct >= CATEGORY_WARNING_PERCENT {
            alerts.push(SpendingAlert {
                level: ThresholdSignal::Warning,
                message: format!(
                    "{} spending at {:.0}% of its ${:.2} limit",
                    spend.name, category_pct, allocation.limit
                ),
                percentage: category_pct,
                category_id: Some(spend.category_id),
            });
        }
    }

    alerts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BudgetPeriod, CategoryAllocation};
    use chrono::{NaiveDate, Utc};

    #[test]
    fn test_signal_tiers() {
        assert_eq!(signal(0.0), ThresholdSignal::None);
        assert_eq!(signal(49.0), ThresholdSignal::None);
        assert_eq!(signal(49.999), ThresholdSignal::None);
        assert_eq!(signal(50.0), ThresholdSignal::Info);
        assert_eq!(signal(74.0), ThresholdSignal::Info);
        assert_eq!(signal(75.0), ThresholdSignal::Warning);
        assert_eq!(signal(89.0), ThresholdSignal::Warning);
        assert_eq!(signal(90.0), ThresholdSignal::Critical);
        assert_eq!(signal(150.0), ThresholdSignal::Critical);
    }

    #[test]
    fn test_signal_ordering() {
        assert!(ThresholdSignal::Critical > ThresholdSignal::Warning);
        assert!(ThresholdSignal::Warning > ThresholdSignal::Info);
        assert!(ThresholdSignal::Info > ThresholdSignal::None);
        assert_eq!(ThresholdSignal::Warning.threshold(), Some(75));
    }

    fn budget(current_spent: f64) -> Budget {
        Budget {
            id: 7,
            user_id: "alice".to_string(),
            name: "Week".to_string(),
            total_limit: 200.0,
            period: BudgetPeriod::new(
                NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 5, 7).unwrap(),
            ),
            categories: vec![
                CategoryAllocation {
                    category_id: 1,
                    limit: 50.0,
                },
                CategoryAllocation {
                    category_id: 2,
                    limit: 100.0,
                },
            ],
            current_spent,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_budget_alerts_single_tier_plus_category_warnings() {
        let spend = vec![
            CategorySpend {
                category_id: 1,
                name: "Produce".to_string(),
                spent: 40.0,
            },
            CategorySpend {
                category_id: 2,
                name: "Dairy".to_string(),
                spent: 60.0,
            },
            CategorySpend {
                category_id: 3,
                name: "Snacks".to_string(),
                spent: 80.0,
            },
        ];
        let alerts = budget_alerts(&budget(180.0), &spend);

        let budget_level: Vec<_> = alerts.iter().filter(|a| a.category_id.is_none()).collect();
        assert_eq!(budget_level.len(), 1);
        assert_eq!(budget_level[0].level, ThresholdSignal::Critical);

        // Produce at 80% warns, Dairy at 60% does not, Snacks has no allocation
        let category_level: Vec<_> = alerts.iter().filter_map(|a| a.category_id).collect();
        assert_eq!(category_level, vec![1]);
    }

    #[test]
    fn test_no_alerts_below_half() {
        assert!(budget_alerts(&budget(20.0), &[]).is_empty());
    }
}
