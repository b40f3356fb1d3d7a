//! Budget spend aggregation
//!
//! `current_spent` is never adjusted incrementally. Every item write ends
//! with a full re-read of the budget's items, so the stored figure always
//! converges on the truth even after partial failures.

use tracing::{debug, warn};

use crate::error::Result;
use crate::ledger::{ItemFilter, LedgerStore};

/// Recompute a budget's spend from its items and persist it
///
/// Returns the new total, or `None` if the budget no longer exists (a
/// missing budget is logged and tolerated, not an error).
pub fn recompute<S: LedgerStore + ?Sized>(
    store: &S,
    budget_id: i64,
    user_id: &str,
) -> Result<Option<f64>> {
    let filter = ItemFilter::for_user(user_id).budget(budget_id);
    let spent = store.sum_item_totals(&filter)?;

    if !store.set_current_spent(budget_id, user_id, spent)? {
        warn!(budget_id, "Budget vanished before its spend could be recomputed");
        return Ok(None);
    }

    debug!(budget_id, spent, "Recomputed budget spend");
    Ok(Some(spent))
}

/// Spend per category within one budget
pub fn category_spent<S: LedgerStore + ?Sized>(
    store: &S,
    budget_id: i64,
    user_id: &str,
    category_id: i64,
) -> Result<f64> {
    store.sum_item_totals(
        &ItemFilter::for_user(user_id)
            .budget(budget_id)
            .category(category_id),
    )
}
