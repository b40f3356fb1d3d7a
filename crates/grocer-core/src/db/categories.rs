//! Category operations

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Category, NewCategory};

const CATEGORY_COLUMNS: &str =
    "id, name, icon, color, is_system, user_id, parent_id, sort_order, created_at";

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    let created_at: String = row.get(8)?;
    Ok(Category {
        id: row.get(0)?,
        name: row.get(1)?,
        icon: row.get(2)?,
        color: row.get(3)?,
        is_system: row.get(4)?,
        user_id: row.get(5)?,
        parent_id: row.get(6)?,
        sort_order: row.get(7)?,
        created_at: parse_datetime(&created_at),
    })
}

impl Database {
    pub fn get_category(&self, id: i64) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                &format!("SELECT {} FROM categories WHERE id = ?", CATEGORY_COLUMNS),
                params![id],
                category_from_row,
            )
            .optional()?;
        Ok(category)
    }

    /// Get a category the user may use: a system one or their own
    pub fn get_visible_category(&self, id: i64, user_id: &str) -> Result<Option<Category>> {
        Ok(self
            .get_category(id)?
            .filter(|c| c.is_system || c.user_id.as_deref() == Some(user_id)))
    }

    /// System categories followed by the user's own
    pub fn list_categories(&self, user_id: &str) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM categories
             WHERE is_system = 1 OR user_id = ?
             ORDER BY is_system DESC, sort_order, name",
            CATEGORY_COLUMNS
        ))?;

        let categories = stmt
            .query_map(params![user_id], category_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    /// Find a visible category by name (case-insensitive)
    pub fn find_category_by_name(&self, name: &str, user_id: &str) -> Result<Option<Category>> {
        let conn = self.conn()?;
        let category = conn
            .query_row(
                &format!(
                    "SELECT {} FROM categories
                     WHERE name = ? COLLATE NOCASE AND (is_system = 1 OR user_id = ?)
                     ORDER BY is_system DESC LIMIT 1",
                    CATEGORY_COLUMNS
                ),
                params![name.trim(), user_id],
                category_from_row,
            )
            .optional()?;
        Ok(category)
    }

    /// Create a user-defined category
    pub fn create_category(&self, user_id: &str, category: &NewCategory) -> Result<Category> {
        category.validate()?;

        if self
            .find_category_by_name(&category.name, user_id)?
            .is_some()
        {
            return Err(Error::validation(format!(
                "Category '{}' already exists",
                category.name.trim()
            )));
        }
        if let Some(parent_id) = category.parent_id {
            if self.get_visible_category(parent_id, user_id)?.is_none() {
                return Err(Error::not_found(format!("Parent category {}", parent_id)));
            }
        }

        let conn = self.conn()?;
        let next_order: i64 = conn.query_row(
            "SELECT COALESCE(MAX(sort_order), -1) + 1 FROM categories WHERE user_id = ?",
            params![user_id],
            |row| row.get(0),
        )?;
        conn.execute(
            "INSERT INTO categories (name, icon, color, is_system, user_id, parent_id, sort_order)
             VALUES (?, ?, ?, 0, ?, ?, ?)",
            params![
                category.name.trim(),
                category.icon.as_deref().unwrap_or("📦"),
                category.color.as_deref().unwrap_or("#6c757d"),
                user_id,
                category.parent_id,
                next_order,
            ],
        )?;
        let id = conn.last_insert_rowid();
        drop(conn);

        self.get_category(id)?
            .ok_or_else(|| Error::not_found(format!("Category {}", id)))
    }

    /// Rename or restyle a user-defined category
    pub fn update_category(
        &self,
        id: i64,
        user_id: &str,
        update: &NewCategory,
    ) -> Result<Category> {
        update.validate()?;

        let existing = self
            .get_category(id)?
            .filter(|c| !c.is_system && c.user_id.as_deref() == Some(user_id))
            .ok_or_else(|| Error::not_found(format!("Category {}", id)))?;

        if let Some(clash) = self.find_category_by_name(&update.name, user_id)? {
            if clash.id != id {
                return Err(Error::validation(format!(
                    "Category '{}' already exists",
                    update.name.trim()
                )));
            }
        }
        if update.parent_id == Some(id) {
            return Err(Error::validation("A category cannot be its own parent"));
        }

        let conn = self.conn()?;
        conn.execute(
            "UPDATE categories SET name = ?, icon = ?, color = ?, parent_id = ? WHERE id = ?",
            params![
                update.name.trim(),
                update.icon.as_deref().unwrap_or(&existing.icon),
                update.color.as_deref().unwrap_or(&existing.color),
                update.parent_id,
                id,
            ],
        )?;
        drop(conn);

        self.get_category(id)?
            .ok_or_else(|| Error::not_found(format!("Category {}", id)))
    }

    /// Delete a user-defined category that no item uses
    ///
    /// Budget allocations for the category are dropped and child
    /// categories become top-level.
    pub fn delete_category(&self, id: i64, user_id: &str) -> Result<()> {
        self.get_category(id)?
            .filter(|c| !c.is_system && c.user_id.as_deref() == Some(user_id))
            .ok_or_else(|| Error::not_found(format!("Category {}", id)))?;

        let mut conn = self.conn()?;
        let in_use: i64 = conn.query_row(
            "SELECT COUNT(*) FROM items WHERE category_id = ?",
            params![id],
            |row| row.get(0),
        )?;
        if in_use > 0 {
            return Err(Error::validation(format!(
                "Category is used by {} item(s); move them first",
                in_use
            )));
        }

        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM budget_allocations WHERE category_id = ?",
            params![id],
        )?;
        tx.execute(
            "UPDATE categories SET parent_id = NULL WHERE parent_id = ?",
            params![id],
        )?;
        tx.execute("DELETE FROM categories WHERE id = ?", params![id])?;
        tx.commit()?;

        Ok(())
    }
}
