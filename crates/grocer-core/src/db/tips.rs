//! Stored tip operations

use rusqlite::{params, Row};
use tracing::warn;

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{NewTip, Tip, TriggerType};

const TIP_COLUMNS: &str = "id, content, category, trigger_type, trigger_value, tags, \
                           is_active, view_count, helpful_count, created_at";

/// Default number of tips returned by a relevance query
pub const DEFAULT_TIP_LIMIT: usize = 5;

fn tip_from_row(row: &Row<'_>) -> rusqlite::Result<Tip> {
    let trigger_type: String = row.get(3)?;
    let trigger_value: String = row.get(4)?;
    let tags: String = row.get(5)?;
    let created_at: String = row.get(9)?;

    Ok(Tip {
        id: row.get(0)?,
        content: row.get(1)?,
        category: row.get(2)?,
        trigger_type: trigger_type.parse().unwrap_or(TriggerType::Pattern),
        trigger_value: serde_json::from_str(&trigger_value).unwrap_or(serde_json::Value::Null),
        tags: serde_json::from_str(&tags).unwrap_or_default(),
        is_active: row.get(6)?,
        view_count: row.get(7)?,
        helpful_count: row.get(8)?,
        created_at: parse_datetime(&created_at),
    })
}

/// Query over stored tips
#[derive(Debug, Clone, Default)]
pub struct TipQuery {
    /// Matches tips for this category or "general"
    pub category: Option<String>,
    pub trigger_type: Option<TriggerType>,
    /// Matches tips carrying any of these tags
    pub tags: Vec<String>,
    pub limit: Option<usize>,
}

impl Database {
    /// Insert a tip unless one with the same content exists. Returns true if inserted.
    pub fn insert_tip(&self, tip: &NewTip) -> Result<bool> {
        let conn = self.conn()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO tips (content, category, trigger_type, trigger_value, tags)
             VALUES (?, ?, ?, ?, ?)",
            params![
                tip.content,
                tip.category.to_lowercase(),
                tip.trigger_type.as_str(),
                serde_json::to_string(&tip.trigger_value)?,
                serde_json::to_string(&tip.tags)?,
            ],
        )?;
        Ok(inserted > 0)
    }

    /// Seed stored tips, skipping ones already present
    pub fn seed_tips(&self, tips: &[NewTip]) -> Result<usize> {
        let mut inserted = 0;
        for tip in tips {
            if self.insert_tip(tip)? {
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    /// All active tips
    pub fn list_tips(&self) -> Result<Vec<Tip>> {
        self.find_tips(&TipQuery::default())
    }

    /// Active tips matching a query, most helpful then most viewed first
    pub fn find_tips(&self, query: &TipQuery) -> Result<Vec<Tip>> {
        let conn = self.conn()?;

        let mut conditions = vec!["is_active = 1".to_string()];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        if let Some(category) = &query.category {
            conditions.push("category IN (?, 'general')".to_string());
            params.push(Box::new(category.to_lowercase()));
        }
        if let Some(trigger_type) = query.trigger_type {
            conditions.push("trigger_type = ?".to_string());
            params.push(Box::new(trigger_type.as_str()));
        }

        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM tips WHERE {}
             ORDER BY helpful_count DESC, view_count DESC, id",
            TIP_COLUMNS,
            conditions.join(" AND ")
        ))?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let tips = stmt
            .query_map(param_refs.as_slice(), tip_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let wanted: Vec<String> = query.tags.iter().map(|t| t.to_lowercase()).collect();
        let tips = tips
            .into_iter()
            .filter(|tip| {
                wanted.is_empty()
                    || tip
                        .tags
                        .iter()
                        .any(|t| wanted.contains(&t.to_lowercase()))
            })
            .take(query.limit.unwrap_or(usize::MAX))
            .collect();

        Ok(tips)
    }

    /// Bump the view counter of every listed tip
    pub fn record_tip_views(&self, ids: &[i64]) -> Result<()> {
        let conn = self.conn()?;
        for id in ids {
            let updated = conn.execute(
                "UPDATE tips SET view_count = view_count + 1 WHERE id = ?",
                params![id],
            )?;
            if updated == 0 {
                warn!(tip_id = id, "Tip view recorded for unknown tip");
            }
        }
        Ok(())
    }

    /// Bump the helpful counter. Returns false if the tip does not exist.
    pub fn mark_tip_helpful(&self, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE tips SET helpful_count = helpful_count + 1 WHERE id = ?",
            params![id],
        )?;
        Ok(updated > 0)
    }
}
