//! Error types for Grocer

use thiserror::Error;

use crate::limits::LimitViolation;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Database pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("Encryption error: {0}")]
    Encryption(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("PDF error: {0}")]
    Pdf(String),

    #[error("Config error: {0}")]
    Config(String),

    /// Missing, or owned by another user. Both cases look the same to callers.
    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Cannot add items to an inactive budget")]
    InactiveBudget,

    #[error(
        "Total limit exceeded: spent {current_spent:.2} of {total_limit:.2}, \
         adding {delta:.2} would exceed it by {overage:.2}"
    )]
    TotalLimitExceeded {
        current_spent: f64,
        total_limit: f64,
        delta: f64,
        overage: f64,
    },

    #[error(
        "Category limit exceeded: spent {category_spent:.2} of {category_limit:.2}, \
         adding {delta:.2} would exceed it by {overage:.2}"
    )]
    CategoryLimitExceeded {
        category_id: i64,
        category_spent: f64,
        category_limit: f64,
        delta: f64,
        overage: f64,
    },

    #[error("Category limits ({allocated:.2}) exceed budget total ({total_limit:.2})")]
    InvalidAllocation { allocated: f64, total_limit: f64 },

    #[error("Budget still has {item_count} item(s); delete them before removing the budget")]
    BudgetNotEmpty { item_count: i64 },
}

impl Error {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// True for semantic rejections of a write (as opposed to infrastructure faults)
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::Validation(_)
                | Self::InactiveBudget
                | Self::TotalLimitExceeded { .. }
                | Self::CategoryLimitExceeded { .. }
                | Self::InvalidAllocation { .. }
                | Self::BudgetNotEmpty { .. }
        )
    }
}

impl From<LimitViolation> for Error {
    fn from(violation: LimitViolation) -> Self {
        match violation {
            LimitViolation::InactiveBudget => Self::InactiveBudget,
            LimitViolation::TotalLimitExceeded {
                current_spent,
                total_limit,
                delta,
                overage,
            } => Self::TotalLimitExceeded {
                current_spent,
                total_limit,
                delta,
                overage,
            },
            LimitViolation::CategoryLimitExceeded {
                category_id,
                category_spent,
                category_limit,
                delta,
                overage,
            } => Self::CategoryLimitExceeded {
                category_id,
                category_spent,
                category_limit,
                delta,
                overage,
            },
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
