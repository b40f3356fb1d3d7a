//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `budgets` - Budgets and their category allocations
//! - `items` - Purchased items and the item filter query builder
//! - `categories` - System and user-defined categories
//! - `tips` - Stored saving tips and their engagement counters
//! - `audit` - Audit log of user actions
//!
//! `Database` implements [`LedgerStore`](crate::ledger::LedgerStore) and
//! [`CategoryCatalog`](crate::ledger::CategoryCatalog) on top of these.

use chrono::{DateTime, NaiveDate, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;
use tracing::info;

use crate::error::{Error, Result};
use crate::models::SYSTEM_CATEGORIES;

mod audit;
mod budgets;
mod categories;
mod items;
mod store;
mod tips;

pub use audit::{
    ActivityFilter, ActivityPage, ActivitySummary, AuditAction, AuditEntry, DayActivity,
    BUDGET_TRAIL_LIMIT, DEFAULT_ACTIVITY_PAGE_SIZE,
};
pub use tips::{TipQuery, DEFAULT_TIP_LIMIT};

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "GROCER_DB_KEY";

/// Derive an encryption key from a passphrase using Argon2
///
/// A fixed application salt keeps the key stable across database moves.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Changing this invalidates every existing encrypted database
    const APP_SALT: &[u8; 16] = b"grocer-salt-v1-x";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let hash = Argon2::default()
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    let output = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(output.as_bytes()))
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS"
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Parse a stored `YYYY-MM-DD` column inside a row mapper
pub(crate) fn parse_date(s: &str, column: usize) -> rusqlite::Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    db_path: String,
}

impl Database {
    /// Open an encrypted database, keyed from `GROCER_DB_KEY`
    ///
    /// Fails if the variable is unset. Use `new_unencrypted()` for
    /// development databases.
    pub fn new(path: &str) -> Result<Self> {
        match std::env::var(DB_KEY_ENV).ok() {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Open an unencrypted database. Development and tests only.
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Open a database with an explicit encryption passphrase
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        let pool = if let Some(pass) = passphrase {
            let key_pragma = format!("PRAGMA key = 'x\"{}\"';", derive_key(pass)?);
            let manager = manager.with_init(move |conn| {
                conn.execute_batch(&key_pragma)?;
                conn.execute_batch("PRAGMA foreign_keys = ON;")
            });
            Pool::builder().max_size(10).build(manager)?
        } else {
            let manager = manager.with_init(|conn| conn.execute_batch("PRAGMA foreign_keys = ON;"));
            Pool::builder().max_size(10).build(manager)?
        };

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;
        db.seed_system_categories()?;

        Ok(db)
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create a throwaway database (for testing)
    ///
    /// Uses a temporary file rather than `:memory:` since every pooled
    /// connection must see the same data.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = std::env::temp_dir().join(format!(
            "grocer_test_{}_{}.db",
            std::process::id(),
            id
        ));
        let path = path.to_string_lossy().to_string();

        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Check if the database is encrypted
    pub fn is_encrypted(&self) -> Result<bool> {
        let conn = self.conn()?;
        let result: rusqlite::Result<String> =
            conn.query_row("PRAGMA cipher_version;", [], |row| row.get(0));
        Ok(result.is_ok() && std::env::var(DB_KEY_ENV).is_ok())
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            PRAGMA foreign_keys = ON;

            -- WAL: readers don't block writers
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Categories (system rows have NULL user_id)
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                icon TEXT NOT NULL DEFAULT '📦',
                color TEXT NOT NULL DEFAULT '#6c757d',
                is_system BOOLEAN NOT NULL DEFAULT 0,
                user_id TEXT,
                parent_id INTEGER REFERENCES categories(id),
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_categories_user ON categories(user_id);

            -- Budgets
            CREATE TABLE IF NOT EXISTS budgets (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                name TEXT NOT NULL,
                total_limit REAL NOT NULL,
                period_start DATE NOT NULL,
                period_end DATE NOT NULL,
                current_spent REAL NOT NULL DEFAULT 0,   -- derived from items
                is_active BOOLEAN NOT NULL DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_budgets_user ON budgets(user_id);
            CREATE INDEX IF NOT EXISTS idx_budgets_user_active ON budgets(user_id, is_active);
            CREATE INDEX IF NOT EXISTS idx_budgets_period ON budgets(period_start, period_end);

            -- Per-category limits within a budget
            CREATE TABLE IF NOT EXISTS budget_allocations (
                budget_id INTEGER NOT NULL REFERENCES budgets(id) ON DELETE CASCADE,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                limit_amount REAL NOT NULL,
                position INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (budget_id, category_id)
            );

            -- Items
            CREATE TABLE IF NOT EXISTS items (
                id INTEGER PRIMARY KEY,
                user_id TEXT NOT NULL,
                budget_id INTEGER NOT NULL REFERENCES budgets(id),
                name TEXT NOT NULL,
                price REAL NOT NULL,
                quantity INTEGER NOT NULL DEFAULT 1,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                is_essential BOOLEAN NOT NULL DEFAULT 0,
                purchase_date DATE NOT NULL,
                notes TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_items_user_budget ON items(user_id, budget_id);
            CREATE INDEX IF NOT EXISTS idx_items_user_category ON items(user_id, category_id);
            CREATE INDEX IF NOT EXISTS idx_items_user_date ON items(user_id, purchase_date);

            -- Stored saving tips
            CREATE TABLE IF NOT EXISTS tips (
                id INTEGER PRIMARY KEY,
                content TEXT NOT NULL UNIQUE,
                category TEXT NOT NULL DEFAULT 'general',
                trigger_type TEXT NOT NULL,
                trigger_value TEXT NOT NULL,             -- JSON
                tags TEXT NOT NULL DEFAULT '[]',          -- JSON array
                is_active BOOLEAN NOT NULL DEFAULT 1,
                view_count INTEGER NOT NULL DEFAULT 0,
                helpful_count INTEGER NOT NULL DEFAULT 0,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_tips_trigger ON tips(trigger_type, is_active);

            -- Audit log
            CREATE TABLE IF NOT EXISTS audit_log (
                id INTEGER PRIMARY KEY,
                timestamp DATETIME DEFAULT CURRENT_TIMESTAMP,
                user_id TEXT NOT NULL,
                action TEXT NOT NULL,
                entity_type TEXT,
                entity_id INTEGER,
                details TEXT,
                success BOOLEAN NOT NULL DEFAULT 1
            );

            CREATE INDEX IF NOT EXISTS idx_audit_user_time ON audit_log(user_id, timestamp);
            CREATE INDEX IF NOT EXISTS idx_audit_entity ON audit_log(entity_type, entity_id);
            "#,
        )?;

        Ok(())
    }

    /// Insert any built-in category that is not present yet
    fn seed_system_categories(&self) -> Result<()> {
        let conn = self.conn()?;
        let mut inserted = 0;

        for (order, (name, icon, color)) in SYSTEM_CATEGORIES.iter().enumerate() {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM categories WHERE is_system = 1 AND name = ?)",
                params![name],
                |row| row.get(0),
            )?;
            if exists {
                continue;
            }
            conn.execute(
                "INSERT INTO categories (name, icon, color, is_system, sort_order)
                 VALUES (?, ?, ?, 1, ?)",
                params![name, icon, color, order as i64],
            )?;
            inserted += 1;
        }

        if inserted > 0 {
            info!("Seeded {} system categories", inserted);
        }
        Ok(())
    }
}
