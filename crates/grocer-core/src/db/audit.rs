//! Audit log operations

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rusqlite::params;
use serde::{Deserialize, Serialize};

use super::Database;
use crate::error::Result;

/// Entries returned by [`Database::budget_audit_trail`]
pub const BUDGET_TRAIL_LIMIT: i64 = 50;
/// Page size when an activity filter names none
pub const DEFAULT_ACTIVITY_PAGE_SIZE: i64 = 20;

/// Actions recorded in the audit log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    BudgetCreate,
    BudgetUpdate,
    BudgetDelete,
    BudgetView,
    ItemCreate,
    ItemUpdate,
    ItemDelete,
    ItemBatchCreate,
    CategoryCreate,
    CategoryUpdate,
    CategoryDelete,
    ExportData,
    TipView,
    TipHelpful,
}

impl AuditAction {
    pub const ALL: [AuditAction; 14] = [
        Self::BudgetCreate,
        Self::BudgetUpdate,
        Self::BudgetDelete,
        Self::BudgetView,
        Self::ItemCreate,
        Self::ItemUpdate,
        Self::ItemDelete,
        Self::ItemBatchCreate,
        Self::CategoryCreate,
        Self::CategoryUpdate,
        Self::CategoryDelete,
        Self::ExportData,
        Self::TipView,
        Self::TipHelpful,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BudgetCreate => "budget_create",
            Self::BudgetUpdate => "budget_update",
            Self::BudgetDelete => "budget_delete",
            Self::BudgetView => "budget_view",
            Self::ItemCreate => "item_create",
            Self::ItemUpdate => "item_update",
            Self::ItemDelete => "item_delete",
            Self::ItemBatchCreate => "item_batch_create",
            Self::CategoryCreate => "category_create",
            Self::CategoryUpdate => "category_update",
            Self::CategoryDelete => "category_delete",
            Self::ExportData => "export_data",
            Self::TipView => "tip_view",
            Self::TipHelpful => "tip_helpful",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("Unknown audit action: {}", s))
    }
}

/// Query over a user's audit entries
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub user_id: String,
    /// Inclusive day range on the entry timestamp
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub action: Option<AuditAction>,
    pub entity_type: Option<String>,
    /// 1-based
    pub page: i64,
    pub per_page: i64,
}

impl ActivityFilter {
    pub fn for_user(user_id: &str) -> Self {
        Self {
            user_id: user_id.to_string(),
            page: 1,
            per_page: DEFAULT_ACTIVITY_PAGE_SIZE,
            ..Default::default()
        }
    }

    fn conditions(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut conditions = vec!["user_id = ?".to_string()];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(self.user_id.clone())];

        if let Some(from) = self.from {
            conditions.push("date(timestamp) >= ?".to_string());
            params.push(Box::new(from.to_string()));
        }
        if let Some(to) = self.to {
            conditions.push("date(timestamp) <= ?".to_string());
            params.push(Box::new(to.to_string()));
        }
        if let Some(action) = self.action {
            conditions.push("action = ?".to_string());
            params.push(Box::new(action.as_str()));
        }
        if let Some(ref entity_type) = self.entity_type {
            conditions.push("entity_type = ?".to_string());
            params.push(Box::new(entity_type.clone()));
        }

        (format!("WHERE {}", conditions.join(" AND ")), params)
    }
}

/// Audit log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: String,
    pub user_id: String,
    pub action: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<i64>,
    pub details: Option<String>,
    pub success: bool,
}

/// One page of audit entries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityPage {
    pub entries: Vec<AuditEntry>,
    pub total: i64,
    pub page: i64,
    pub total_pages: i64,
}

/// Action counts for one day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayActivity {
    pub date: String,
    pub total: i64,
    pub by_action: BTreeMap<String, i64>,
}

/// Action counts over a time window, overall and per day (newest day first)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivitySummary {
    pub days: i64,
    pub total_actions: i64,
    pub failed_actions: i64,
    pub by_action: BTreeMap<String, i64>,
    pub by_day: Vec<DayActivity>,
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditEntry> {
    Ok(AuditEntry {
        id: row.get(0)?,
        timestamp: row.get(1)?,
        user_id: row.get(2)?,
        action: row.get(3)?,
        entity_type: row.get(4)?,
        entity_id: row.get(5)?,
        details: row.get(6)?,
        success: row.get(7)?,
    })
}

impl Database {
    /// Log a successful action
    pub fn log_audit(
        &self,
        user_id: &str,
        action: AuditAction,
        entity_type: Option<&str>,
        entity_id: Option<i64>,
        details: Option<&str>,
    ) -> Result<i64> {
        self.insert_audit(user_id, action, entity_type, entity_id, details, true)
    }

    /// Log a rejected or failed action
    pub fn log_audit_failure(
        &self,
        user_id: &str,
        action: AuditAction,
        entity_type: Option<&str>,
        entity_id: Option<i64>,
        details: Option<&str>,
    ) -> Result<i64> {
        self.insert_audit(user_id, action, entity_type, entity_id, details, false)
    }

    fn insert_audit(
        &self,
        user_id: &str,
        action: AuditAction,
        entity_type: Option<&str>,
        entity_id: Option<i64>,
        details: Option<&str>,
        success: bool,
    ) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO audit_log (user_id, action, entity_type, entity_id, details, success)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
            params![
                user_id,
                action.as_str(),
                entity_type,
                entity_id,
                details,
                success
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// A user's audit entries matching a filter, newest first
    pub fn list_user_activity(&self, filter: &ActivityFilter) -> Result<ActivityPage> {
        let conn = self.conn()?;
        let (where_clause, mut params) = filter.conditions();
        let per_page = filter.per_page.max(1);
        let page = filter.page.max(1);

        let total: i64 = {
            let refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();
            conn.query_row(
                &format!("SELECT COUNT(*) FROM audit_log {}", where_clause),
                refs.as_slice(),
                |row| row.get(0),
            )?
        };

        params.push(Box::new(per_page));
        params.push(Box::new((page - 1) * per_page));
        let refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

        let mut stmt = conn.prepare(&format!(
            r#"
            SELECT id, timestamp, user_id, action, entity_type, entity_id, details, success
            FROM audit_log
            {}
            ORDER BY timestamp DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
            where_clause
        ))?;
        let entries = stmt
            .query_map(refs.as_slice(), entry_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(ActivityPage {
            entries,
            total,
            page,
            total_pages: (total + per_page - 1) / per_page,
        })
    }

    /// The latest [`BUDGET_TRAIL_LIMIT`] entries touching one budget, newest first
    pub fn budget_audit_trail(&self, budget_id: i64, user_id: &str) -> Result<Vec<AuditEntry>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT id, timestamp, user_id, action, entity_type, entity_id, details, success
            FROM audit_log
            WHERE user_id = ? AND entity_type = 'budget' AND entity_id = ?
            ORDER BY timestamp DESC, id DESC
            LIMIT ?
            "#,
        )?;

        let entries = stmt
            .query_map(params![user_id, budget_id, BUDGET_TRAIL_LIMIT], entry_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Count a user's actions over the last `days` days
    pub fn activity_summary(&self, user_id: &str, days: i64) -> Result<ActivitySummary> {
        let conn = self.conn()?;
        let window = format!("-{} days", days.max(0));

        let mut stmt = conn.prepare(
            r#"
            SELECT date(timestamp), action, COUNT(*), SUM(CASE WHEN success THEN 0 ELSE 1 END)
            FROM audit_log
            WHERE user_id = ? AND timestamp >= datetime('now', ?)
            GROUP BY date(timestamp), action
            ORDER BY date(timestamp) DESC, action
            "#,
        )?;

        let mut summary = ActivitySummary {
            days,
            total_actions: 0,
            failed_actions: 0,
            by_action: BTreeMap::new(),
            by_day: Vec::new(),
        };
        let rows = stmt.query_map(params![user_id, window], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;
        for row in rows {
            let (date, action, count, failed) = row?;
            summary.total_actions += count;
            summary.failed_actions += failed;
            *summary.by_action.entry(action.clone()).or_insert(0) += count;

            match summary.by_day.last_mut() {
                Some(day) if day.date == date => {
                    day.total += count;
                    day.by_action.insert(action, count);
                }
                _ => summary.by_day.push(DayActivity {
                    date,
                    total: count,
                    by_action: BTreeMap::from([(action, count)]),
                }),
            }
        }

        Ok(summary)
    }

    /// Delete entries older than `days_to_keep` days. Returns the number removed.
    pub fn clean_audit_log(&self, days_to_keep: i64) -> Result<usize> {
        let conn = self.conn()?;
        let removed = conn.execute(
            "DELETE FROM audit_log WHERE timestamp < datetime('now', ?)",
            params![format!("-{} days", days_to_keep.max(0))],
        )?;
        Ok(removed)
    }
}
