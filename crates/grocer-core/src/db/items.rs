//! Item operations

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_date, parse_datetime, Database};
use crate::error::Result;
use crate::ledger::ItemFilter;
use crate::models::{Item, NewItem};

const ITEM_COLUMNS: &str = "id, user_id, budget_id, name, price, quantity, category_id, \
                            is_essential, purchase_date, notes, created_at";

fn item_from_row(row: &Row<'_>) -> rusqlite::Result<Item> {
    let purchase_date: String = row.get(8)?;
    let created_at: String = row.get(10)?;

    Ok(Item {
        id: row.get(0)?,
        user_id: row.get(1)?,
        budget_id: row.get(2)?,
        name: row.get(3)?,
        price: row.get(4)?,
        quantity: row.get(5)?,
        category_id: row.get(6)?,
        is_essential: row.get(7)?,
        purchase_date: parse_date(&purchase_date, 8)?,
        notes: row.get(9)?,
        created_at: parse_datetime(&created_at),
    })
}

/// WHERE clause and parameters for an item filter
struct ItemQuery {
    where_clause: String,
    params: Vec<Box<dyn rusqlite::ToSql>>,
}

impl ItemQuery {
    fn build(filter: &ItemFilter) -> Self {
        let mut conditions = vec!["user_id = ?".to_string()];
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(filter.user_id.clone())];

        if let Some(budget_id) = filter.budget_id {
            conditions.push("budget_id = ?".to_string());
            params.push(Box::new(budget_id));
        }
        if let Some(category_id) = filter.category_id {
            conditions.push("category_id = ?".to_string());
            params.push(Box::new(category_id));
        }
        if let Some(essential) = filter.is_essential {
            conditions.push("is_essential = ?".to_string());
            params.push(Box::new(essential));
        }
        if let Some(from) = filter.purchased_from {
            conditions.push("purchase_date >= ?".to_string());
            params.push(Box::new(from.to_string()));
        }
        if let Some(to) = filter.purchased_to {
            conditions.push("purchase_date <= ?".to_string());
            params.push(Box::new(to.to_string()));
        }

        Self {
            where_clause: format!("WHERE {}", conditions.join(" AND ")),
            params,
        }
    }

    fn params_refs(&self) -> Vec<&dyn rusqlite::ToSql> {
        self.params.iter().map(|p| p.as_ref()).collect()
    }
}

impl Database {
    /// Insert an item under `budget_id`
    pub fn create_item_row(
        &self,
        user_id: &str,
        budget_id: i64,
        item: &NewItem,
        purchase_date: NaiveDate,
    ) -> Result<Item> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO items (user_id, budget_id, name, price, quantity, category_id,
                                is_essential, purchase_date, notes)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
            params![
                user_id,
                budget_id,
                item.name.trim(),
                item.price,
                item.quantity,
                item.category_id,
                item.is_essential,
                purchase_date.to_string(),
                item.notes,
            ],
        )?;
        let id = conn.last_insert_rowid();

        let created = conn.query_row(
            &format!("SELECT {} FROM items WHERE id = ?", ITEM_COLUMNS),
            params![id],
            item_from_row,
        )?;
        Ok(created)
    }

    /// Get an item owned by `user_id`
    pub fn get_item(&self, id: i64, user_id: &str) -> Result<Option<Item>> {
        let conn = self.conn()?;
        let item = conn
            .query_row(
                &format!(
                    "SELECT {} FROM items WHERE id = ? AND user_id = ?",
                    ITEM_COLUMNS
                ),
                params![id, user_id],
                item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    /// Items matching a filter, newest purchase first
    pub fn list_items(&self, filter: &ItemFilter) -> Result<Vec<Item>> {
        let conn = self.conn()?;
        let query = ItemQuery::build(filter);

        let mut sql = format!(
            "SELECT {} FROM items {} ORDER BY purchase_date DESC, id DESC",
            ITEM_COLUMNS, query.where_clause
        );
        if let Some(limit) = filter.limit {
            sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, filter.offset.unwrap_or(0)));
        }

        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(query.params_refs().as_slice(), item_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Number of items matching a filter, ignoring pagination
    pub fn count_items_matching(&self, filter: &ItemFilter) -> Result<i64> {
        let conn = self.conn()?;
        let query = ItemQuery::build(filter);
        let count = conn.query_row(
            &format!("SELECT COUNT(*) FROM items {}", query.where_clause),
            query.params_refs().as_slice(),
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Sum of `price * quantity`, ignoring pagination
    pub fn sum_items_matching(&self, filter: &ItemFilter) -> Result<f64> {
        let conn = self.conn()?;
        let query = ItemQuery::build(filter);
        let total = conn.query_row(
            &format!(
                "SELECT COALESCE(SUM(price * quantity), 0.0) FROM items {}",
                query.where_clause
            ),
            query.params_refs().as_slice(),
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Persist every editable field of an item
    pub fn update_item_row(&self, item: &Item) -> Result<()> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE items
             SET name = ?, price = ?, quantity = ?, category_id = ?, is_essential = ?,
                 purchase_date = ?, notes = ?
             WHERE id = ? AND user_id = ?",
            params![
                item.name,
                item.price,
                item.quantity,
                item.category_id,
                item.is_essential,
                item.purchase_date.to_string(),
                item.notes,
                item.id,
                item.user_id,
            ],
        )?;
        Ok(())
    }

    pub fn delete_item_row(&self, id: i64, user_id: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute(
            "DELETE FROM items WHERE id = ? AND user_id = ?",
            params![id, user_id],
        )?;
        Ok(deleted > 0)
    }
}
