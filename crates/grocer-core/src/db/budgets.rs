//! Budget and allocation operations

use rusqlite::{params, Connection, OptionalExtension, Row};

use super::{parse_date, parse_datetime, Database};
use crate::error::Result;
use crate::models::{Budget, BudgetPeriod, CategoryAllocation, NewBudget};

const BUDGET_COLUMNS: &str = "id, user_id, name, total_limit, period_start, period_end, \
                              current_spent, is_active, created_at, updated_at";

/// Map a budget row; allocations are loaded separately
fn budget_from_row(row: &Row<'_>) -> rusqlite::Result<Budget> {
    let start: String = row.get(4)?;
    let end: String = row.get(5)?;
    let created_at: String = row.get(8)?;
    let updated_at: String = row.get(9)?;

    Ok(Budget {
        id: row.get(0)?,
        user_id: row.get(1)?,
        name: row.get(2)?,
        total_limit: row.get(3)?,
        period: BudgetPeriod::new(parse_date(&start, 4)?, parse_date(&end, 5)?),
        categories: Vec::new(),
        current_spent: row.get(6)?,
        is_active: row.get(7)?,
        created_at: parse_datetime(&created_at),
        updated_at: parse_datetime(&updated_at),
    })
}

fn load_allocations(conn: &Connection, budget_id: i64) -> Result<Vec<CategoryAllocation>> {
    let mut stmt = conn.prepare(
        "SELECT category_id, limit_amount FROM budget_allocations
         WHERE budget_id = ? ORDER BY position, category_id",
    )?;
    let allocations = stmt
        .query_map(params![budget_id], |row| {
            Ok(CategoryAllocation {
                category_id: row.get(0)?,
                limit: row.get(1)?,
            })
        })?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(allocations)
}

fn replace_allocations(
    conn: &Connection,
    budget_id: i64,
    allocations: &[CategoryAllocation],
) -> Result<()> {
    conn.execute(
        "DELETE FROM budget_allocations WHERE budget_id = ?",
        params![budget_id],
    )?;
    for (position, allocation) in allocations.iter().enumerate() {
        conn.execute(
            "INSERT INTO budget_allocations (budget_id, category_id, limit_amount, position)
             VALUES (?, ?, ?, ?)",
            params![
                budget_id,
                allocation.category_id,
                allocation.limit,
                position as i64
            ],
        )?;
    }
    Ok(())
}

fn with_allocations(conn: &Connection, mut budget: Budget) -> Result<Budget> {
    budget.categories = load_allocations(conn, budget.id)?;
    Ok(budget)
}

impl Database {
    /// Insert an active budget with its allocations
    pub fn create_budget_row(&self, user_id: &str, budget: &NewBudget) -> Result<Budget> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "INSERT INTO budgets (user_id, name, total_limit, period_start, period_end, is_active)
             VALUES (?, ?, ?, ?, ?, 1)",
            params![
                user_id,
                budget.name.trim(),
                budget.total_limit,
                budget.start_date.to_string(),
                budget.end_date.to_string(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        replace_allocations(&tx, id, &budget.categories)?;
        tx.commit()?;

        let created = conn.query_row(
            &format!("SELECT {} FROM budgets WHERE id = ?", BUDGET_COLUMNS),
            params![id],
            budget_from_row,
        )?;
        with_allocations(&conn, created)
    }

    /// Get a budget owned by `user_id`
    pub fn get_budget(&self, id: i64, user_id: &str) -> Result<Option<Budget>> {
        let conn = self.conn()?;
        let budget = conn
            .query_row(
                &format!(
                    "SELECT {} FROM budgets WHERE id = ? AND user_id = ?",
                    BUDGET_COLUMNS
                ),
                params![id, user_id],
                budget_from_row,
            )
            .optional()?;

        budget.map(|b| with_allocations(&conn, b)).transpose()
    }

    /// List a user's budgets, most recent period first
    pub fn list_budgets(&self, user_id: &str) -> Result<Vec<Budget>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM budgets WHERE user_id = ?
             ORDER BY period_start DESC, id DESC",
            BUDGET_COLUMNS
        ))?;

        let budgets = stmt
            .query_map(params![user_id], budget_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        budgets
            .into_iter()
            .map(|b| with_allocations(&conn, b))
            .collect()
    }

    /// The budget whose active flag is set. Newest wins if more than one is.
    pub fn get_flagged_active_budget(&self, user_id: &str) -> Result<Option<Budget>> {
        let conn = self.conn()?;
        let budget = conn
            .query_row(
                &format!(
                    "SELECT {} FROM budgets WHERE user_id = ? AND is_active = 1
                     ORDER BY id DESC LIMIT 1",
                    BUDGET_COLUMNS
                ),
                params![user_id],
                budget_from_row,
            )
            .optional()?;

        budget.map(|b| with_allocations(&conn, b)).transpose()
    }

    /// Persist name, limit, allocations and active flag
    pub fn update_budget_row(&self, budget: &Budget) -> Result<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            "UPDATE budgets
             SET name = ?, total_limit = ?, is_active = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ? AND user_id = ?",
            params![
                budget.name.trim(),
                budget.total_limit,
                budget.is_active,
                budget.id,
                budget.user_id
            ],
        )?;
        replace_allocations(&tx, budget.id, &budget.categories)?;

        tx.commit()?;
        Ok(())
    }

    /// Store a recomputed spend total
    pub fn set_budget_spent(&self, id: i64, user_id: &str, spent: f64) -> Result<bool> {
        let conn = self.conn()?;
        let updated = conn.execute(
            "UPDATE budgets SET current_spent = ?, updated_at = CURRENT_TIMESTAMP
             WHERE id = ? AND user_id = ?",
            params![spent, id, user_id],
        )?;
        Ok(updated > 0)
    }

    /// Delete a budget and its allocations
    pub fn delete_budget_row(&self, id: i64, user_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM budgets WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(deleted > 0)
    }
}
