//! Tip selection for a user's budget

use std::collections::{BTreeMap, HashSet};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::catalog::{category_key, CatalogTip, Season, TipCatalog, TipPriority};
use super::patterns::{
    analyze_category_spending, detect_price_increases, find_duplicate_purchases,
    find_frequent_items, SpendingPatterns,
};
use crate::db::{Database, TipQuery};
use crate::error::{Error, Result};
use crate::ledger::{CategoryCatalog, ItemFilter, LedgerStore};
use crate::models::{Budget, Tip, TriggerType};
use crate::signal::signal;

/// Most tips returned by [`TipGenerator::tips_for_user`]
pub const MAX_USER_TIPS: usize = 8;
/// General tips offered when nothing else applies
pub const FALLBACK_GENERAL_TIPS: usize = 3;

/// Where a suggestion came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TipSource {
    Threshold,
    Pattern,
    Seasonal,
    General,
    Category,
}

/// A tip ready to show a user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TipSuggestion {
    /// Set when the tip comes from the tips table
    pub tip_id: Option<i64>,
    pub title: Option<String>,
    pub content: String,
    pub category: String,
    pub priority: Option<TipPriority>,
    pub source: TipSource,
    /// What triggered a pattern tip (item names, category, price change)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl TipSuggestion {
    pub fn from_catalog(tip: &CatalogTip, source: TipSource) -> Self {
        Self {
            tip_id: None,
            title: Some(tip.title.clone()),
            content: tip.content.clone(),
            category: tip.category.clone(),
            priority: Some(tip.priority),
            source,
            context: None,
        }
    }

    fn from_stored(tip: &Tip, context: serde_json::Value) -> Self {
        Self {
            tip_id: Some(tip.id),
            title: None,
            content: tip.content.clone(),
            category: tip.category.clone(),
            priority: None,
            source: TipSource::Pattern,
            context: Some(context),
        }
    }
}

/// Catalog tips for the budget's current alert tier
pub fn threshold_tips(catalog: &TipCatalog, budget: &Budget) -> Vec<TipSuggestion> {
    catalog
        .threshold_tips(signal(budget.percentage_spent()))
        .iter()
        .map(|t| TipSuggestion::from_catalog(t, TipSource::Threshold))
        .collect()
}

/// Catalog tips for the season `today` falls in
pub fn seasonal_tips(catalog: &TipCatalog, today: NaiveDate) -> Vec<TipSuggestion> {
    catalog
        .seasonal_tips(Season::for_date(today))
        .iter()
        .map(|t| TipSuggestion::from_catalog(t, TipSource::Seasonal))
        .collect()
}

/// Drop repeats, keyed by stored tip id or by content
pub fn dedup_tips(tips: Vec<TipSuggestion>) -> Vec<TipSuggestion> {
    let mut seen = HashSet::new();
    tips.into_iter()
        .filter(|t| {
            let key = match t.tip_id {
                Some(id) => format!("#{}", id),
                None => t.content.clone(),
            };
            seen.insert(key)
        })
        .collect()
}

/// Picks tips from the catalog and the stored tips for a user's budget
pub struct TipGenerator<'a> {
    db: &'a Database,
    catalog: &'a TipCatalog,
}

impl<'a> TipGenerator<'a> {
    pub fn new(db: &'a Database, catalog: &'a TipCatalog) -> Self {
        Self { db, catalog }
    }

    fn budget(&self, user_id: &str, budget_id: i64) -> Result<Budget> {
        self.db
            .find_budget(budget_id, user_id)?
            .ok_or_else(|| Error::not_found(format!("Budget {}", budget_id)))
    }

    pub fn threshold_tips(&self, user_id: &str, budget_id: i64) -> Result<Vec<TipSuggestion>> {
        Ok(threshold_tips(self.catalog, &self.budget(user_id, budget_id)?))
    }

    pub fn seasonal_tips(&self, today: NaiveDate) -> Vec<TipSuggestion> {
        seasonal_tips(self.catalog, today)
    }

    /// Tips for one category by name
    pub fn category_tips(&self, category_name: &str) -> Vec<TipSuggestion> {
        self.catalog
            .category_tips(category_name)
            .iter()
            .map(|t| TipSuggestion::from_catalog(t, TipSource::Category))
            .collect()
    }

    /// Look for duplicates, overspent categories, frequent items and price rises
    pub fn analyze_patterns(&self, user_id: &str, budget_id: i64) -> Result<SpendingPatterns> {
        let budget = self.budget(user_id, budget_id)?;
        let items = self
            .db
            .find_items(&ItemFilter::for_user(user_id).budget(budget_id))?;

        let names: BTreeMap<i64, String> = self
            .db
            .categories_for(user_id)?
            .into_iter()
            .map(|c| (c.id, c.name))
            .collect();

        Ok(SpendingPatterns {
            duplicate_purchases: find_duplicate_purchases(&items),
            category_overspend: analyze_category_spending(&budget, &items, &names),
            frequent_items: find_frequent_items(&items),
            price_increases: detect_price_increases(&items),
        })
    }

    /// Stored pattern tips matching the detected patterns, plus a price alert
    pub fn pattern_tips(&self, patterns: &SpendingPatterns) -> Result<Vec<TipSuggestion>> {
        let mut tips = Vec::new();
        let pattern_tips = self.db.find_tips(&TipQuery {
            trigger_type: Some(TriggerType::Pattern),
            ..Default::default()
        })?;

        if !patterns.duplicate_purchases.is_empty() {
            let duplicate_tip = pattern_tips
                .iter()
                .find(|t| t.trigger_value["type"] == "duplicate_purchases");
            if let Some(tip) = duplicate_tip {
                let names: Vec<&str> = patterns
                    .duplicate_purchases
                    .iter()
                    .take(3)
                    .map(|d| d.name.as_str())
                    .collect();
                tips.push(TipSuggestion::from_stored(
                    tip,
                    serde_json::json!({ "items": names }),
                ));
            }
        }

        for overspend in &patterns.category_overspend.overspending {
            let key = category_key(&overspend.name);
            if let Some(tip) = pattern_tips.iter().find(|t| t.category == key) {
                tips.push(TipSuggestion::from_stored(
                    tip,
                    serde_json::json!({
                        "category": overspend.name,
                        "percentage": overspend.percentage.round(),
                    }),
                ));
            }
        }

        if let Some(top) = patterns.price_increases.first() {
            tips.push(TipSuggestion {
                tip_id: None,
                title: None,
                content: format!(
                    "Price alert: {} has increased by {:.2}%. Consider alternatives or buying in bulk.",
                    top.name, top.increase_percent
                ),
                category: "general".to_string(),
                priority: None,
                source: TipSource::Pattern,
                context: Some(serde_json::json!({
                    "item": top.name,
                    "increase": top.increase_percent,
                })),
            });
        }

        Ok(tips)
    }

    /// Threshold, pattern and seasonal tips for a user
    ///
    /// Falls back to the first few general tips when nothing applies.
    /// Repeats are dropped and at most [`MAX_USER_TIPS`] are returned.
    pub fn tips_for_user(
        &self,
        user_id: &str,
        budget_id: Option<i64>,
        today: NaiveDate,
    ) -> Result<Vec<TipSuggestion>> {
        let mut tips = Vec::new();

        if let Some(budget_id) = budget_id {
            let budget = self.budget(user_id, budget_id)?;
            tips.extend(threshold_tips(self.catalog, &budget));

            match self
                .analyze_patterns(user_id, budget_id)
                .and_then(|patterns| self.pattern_tips(&patterns))
            {
                Ok(pattern_tips) => tips.extend(pattern_tips),
                Err(e) => warn!(budget_id, error = %e, "Pattern analysis failed"),
            }
        }

        tips.extend(seasonal_tips(self.catalog, today));

        if tips.is_empty() {
            tips.extend(
                self.catalog
                    .general_tips()
                    .iter()
                    .take(FALLBACK_GENERAL_TIPS)
                    .map(|t| TipSuggestion::from_catalog(t, TipSource::General)),
            );
        }

        let mut tips = dedup_tips(tips);
        tips.truncate(MAX_USER_TIPS);
        Ok(tips)
    }

    /// Stored tips matching a query, counting each returned tip as viewed
    pub fn relevant_tips(&self, query: &TipQuery) -> Result<Vec<Tip>> {
        let tips = self.db.find_tips(query)?;
        let ids: Vec<i64> = tips.iter().map(|t| t.id).collect();
        if let Err(e) = self.db.record_tip_views(&ids) {
            warn!(error = %e, "Failed to record tip views");
        }
        Ok(tips)
    }

    pub fn mark_tip_helpful(&self, tip_id: i64) -> Result<()> {
        if !self.db.mark_tip_helpful(tip_id)? {
            return Err(Error::not_found(format!("Tip {}", tip_id)));
        }
        Ok(())
    }
}
