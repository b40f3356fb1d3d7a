//! Budget activation and expiry
//!
//! A user has at most one budget flagged active. Expiry is a read-time
//! filter only: a budget past its end date keeps its stored flag until
//! something explicitly deactivates it.

use chrono::NaiveDate;
use tracing::{info, warn};

use crate::error::Result;
use crate::ledger::LedgerStore;
use crate::models::{Budget, NewBudget};

/// Create a budget as the user's active one, retiring the previous active budget
///
/// Deactivation is best effort. If finding or saving the old budget fails,
/// the failure is logged and the new budget is still created.
pub fn activate<S: LedgerStore + ?Sized>(
    store: &S,
    user_id: &str,
    new_budget: &NewBudget,
) -> Result<Budget> {
    new_budget.validate()?;

    retire_active(store, user_id, None);

    let budget = store.insert_budget(user_id, new_budget)?;
    info!(budget_id = budget.id, user_id, "Activated new budget");
    Ok(budget)
}

/// Flip every other flagged budget off, logging failures. Used before a
/// budget becomes active, on create and on explicit reactivation.
pub(crate) fn retire_active<S: LedgerStore + ?Sized>(
    store: &S,
    user_id: &str,
    keep_id: Option<i64>,
) {
    match store.find_active_budget(user_id) {
        Ok(Some(mut previous)) if Some(previous.id) != keep_id => {
            previous.is_active = false;
            match store.save_budget(&previous) {
                Ok(()) => info!(budget_id = previous.id, "Deactivated previous budget"),
                Err(e) => warn!(
                    budget_id = previous.id,
                    error = %e,
                    "Failed to deactivate previous budget"
                ),
            }
        }
        Ok(_) => {}
        Err(e) => warn!(user_id, error = %e, "Failed to look up active budget"),
    }
}

/// The period has ended as of `today`
pub fn is_expired(budget: &Budget, today: NaiveDate) -> bool {
    budget.period.has_ended(today)
}

/// Whether a flagged-active budget should be read as inactive. Never writes.
pub fn deactivate_if_expired(budget: &Budget, today: NaiveDate) -> bool {
    budget.is_active && is_expired(budget, today)
}

/// The user's active budget whose period contains `today`
pub fn active_budget<S: LedgerStore + ?Sized>(
    store: &S,
    user_id: &str,
    today: NaiveDate,
) -> Result<Option<Budget>> {
    Ok(store
        .find_active_budget(user_id)?
        .filter(|b| b.period.contains(today)))
}
