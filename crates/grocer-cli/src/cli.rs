//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI arguments.
//! The actual command implementations are in the `commands` module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Grocer - Keep grocery spending inside a budget
#[derive(Parser)]
#[command(name = "grocer")]
#[command(about = "Self-hosted grocery budget tracker", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "grocer.db", global = true)]
    pub db: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set GROCER_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    /// User the command acts as
    #[arg(long, default_value = "local", global = true)]
    pub user: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database and seed stored tips
    Init,

    /// Start the web server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "3000")]
        port: u16,

        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Disable authentication (for local development only)
        ///
        /// WARNING: Do not use this flag when exposing the server to a network.
        /// By default, the server requires Cloudflare Access authentication headers
        /// or an API key from GROCER_API_KEYS.
        #[arg(long)]
        no_auth: bool,

        /// Directory containing static files to serve (e.g., ui/dist)
        #[arg(long)]
        static_dir: Option<PathBuf>,
    },

    /// Manage budgets (list, create, show, update, allocate, delete, active)
    Budgets {
        #[command(subcommand)]
        action: Option<BudgetsAction>,
    },

    /// Manage items (list, add, update, delete, import)
    Items {
        #[command(subcommand)]
        action: Option<ItemsAction>,
    },

    /// Manage categories (list, add, delete)
    Categories {
        #[command(subcommand)]
        action: Option<CategoriesAction>,
    },

    /// Show money-saving tips
    Tips {
        /// Budget to tailor tips to (defaults to the active budget, if any)
        #[arg(short, long)]
        budget: Option<i64>,
    },

    /// Compare a budget with the previous period
    Compare {
        /// Budget ID
        budget: i64,

        /// Print the comparison as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show weekly spending trends
    Trends {
        /// Number of days to look back
        #[arg(short, long, default_value = "30")]
        days: i64,

        /// Print the trends as JSON
        #[arg(long)]
        json: bool,
    },

    /// Export data to CSV, or a budget report to PDF
    Export {
        /// Export type: budget, items, categories, report, pdf
        kind: String,

        /// Budget ID (required for budget, items, categories and pdf)
        #[arg(short, long)]
        budget: Option<i64>,

        /// Output file (defaults to a timestamped name in the current directory)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Category name or ID (items export only)
        #[arg(long)]
        category: Option<String>,
    },

    /// Show recent activity from the audit log
    Activity {
        /// Show per-day counts instead of individual entries
        #[arg(long)]
        summary: bool,

        /// Days covered by the summary
        #[arg(short, long, default_value = "7")]
        days: i64,

        /// Only show this action (e.g. item_create)
        #[arg(short, long)]
        action: Option<String>,

        /// Maximum entries to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },
}

#[derive(Subcommand)]
pub enum BudgetsAction {
    /// List budgets
    List,

    /// Create a budget and make it the active one
    Create {
        /// Budget name
        name: String,

        /// Total spending limit
        #[arg(short, long)]
        limit: f64,

        /// First day of the period (YYYY-MM-DD)
        #[arg(long)]
        start: String,

        /// Last day of the period (YYYY-MM-DD)
        #[arg(long)]
        end: String,

        /// Category limit as CATEGORY=AMOUNT (repeatable)
        #[arg(short, long = "allocate")]
        allocations: Vec<String>,
    },

    /// Show a budget with running totals per category
    Show {
        /// Budget ID
        id: i64,
    },

    /// Update a budget's name, limit or active flag
    Update {
        /// Budget ID
        id: i64,

        /// New name
        #[arg(long)]
        name: Option<String>,

        /// New total limit
        #[arg(short, long)]
        limit: Option<f64>,

        /// Make this the active budget
        #[arg(long, conflicts_with = "deactivate")]
        activate: bool,

        /// Mark this budget inactive
        #[arg(long)]
        deactivate: bool,
    },

    /// Replace a budget's category limits
    Allocate {
        /// Budget ID
        id: i64,

        /// Category limits as CATEGORY=AMOUNT (none clears all limits)
        allocations: Vec<String>,
    },

    /// Delete a budget that has no items
    Delete {
        /// Budget ID
        id: i64,
    },

    /// Show the active budget
    Active,
}

#[derive(Subcommand)]
pub enum ItemsAction {
    /// List items
    List {
        /// Only items in this budget
        #[arg(short, long)]
        budget: Option<i64>,

        /// Only items in this category (name or ID)
        #[arg(short, long)]
        category: Option<String>,

        /// Only essential items
        #[arg(long, conflicts_with = "non_essential")]
        essential: bool,

        /// Only non-essential items
        #[arg(long)]
        non_essential: bool,

        /// Maximum number of items to show
        #[arg(short, long, default_value = "20")]
        limit: i64,
    },

    /// Record an item
    Add {
        /// Item name
        name: String,

        /// Unit price
        #[arg(short, long)]
        price: f64,

        /// Category name or ID
        #[arg(short, long)]
        category: String,

        /// Quantity
        #[arg(short, long, default_value = "1")]
        quantity: i64,

        /// Budget ID (defaults to the active budget)
        #[arg(short, long)]
        budget: Option<i64>,

        /// Mark the item as essential
        #[arg(long)]
        essential: bool,

        /// Purchase date (YYYY-MM-DD, defaults to today)
        #[arg(long)]
        date: Option<String>,

        /// Free-form notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Edit an item
    Update {
        /// Item ID
        id: i64,

        #[arg(long)]
        name: Option<String>,

        #[arg(short, long)]
        price: Option<f64>,

        #[arg(short, long)]
        quantity: Option<i64>,

        /// Category name or ID
        #[arg(short, long)]
        category: Option<String>,

        /// Essential flag (true/false)
        #[arg(long)]
        essential: Option<bool>,

        /// Purchase date (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Delete an item
    Delete {
        /// Item ID
        id: i64,
    },

    /// Create items from a CSV file in one batch
    Import {
        /// CSV file with name, price and category columns
        file: PathBuf,

        /// Budget ID (defaults to the active budget)
        #[arg(short, long)]
        budget: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// List categories
    List,

    /// Add a custom category
    Add {
        /// Category name
        name: String,

        /// Display icon (emoji)
        #[arg(long)]
        icon: Option<String>,

        /// Hex color (e.g. #28a745)
        #[arg(long)]
        color: Option<String>,

        /// Parent category name or ID
        #[arg(long)]
        parent: Option<String>,
    },

    /// Delete a custom category
    Delete {
        /// Category name or ID
        name_or_id: String,
    },
}
