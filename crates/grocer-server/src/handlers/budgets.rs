//! Budget handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;

use crate::{current_user, read_json, AppError, AppState, SuccessResponse, MAX_BODY_SIZE};
use grocer_core::lifecycle;
use grocer_core::models::{BudgetDetail, BudgetUpdate, CategoryAllocation, NewBudget};
use grocer_core::{AuditAction, BudgetTracker, RunningTotals};

/// Request body for replacing a budget's category allocations
#[derive(Debug, Deserialize)]
pub struct UpdateAllocationsRequest {
    pub categories: Vec<CategoryAllocation>,
}

/// GET /api/budgets - List the user's budgets, newest first
pub async fn list_budgets(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<BudgetDetail>>, AppError> {
    let user = current_user(&request);
    let today = state.today();

    let budgets = state
        .db
        .list_budgets(&user)?
        .into_iter()
        .map(|b| BudgetDetail::new(b, today))
        .collect();

    Ok(Json(budgets))
}

/// POST /api/budgets - Create a budget and make it the active one
pub async fn create_budget(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<BudgetDetail>), AppError> {
    let user = current_user(&request);
    let req: NewBudget = read_json(request, MAX_BODY_SIZE).await?;

    let tracker = BudgetTracker::new(&state.db);
    let budget = tracker.create_budget(&user, &req).map_err(|e| {
        state.audit_failure(&user, AuditAction::BudgetCreate, "budget", None, &e);
        e
    })?;

    state.audit(
        &user,
        AuditAction::BudgetCreate,
        "budget",
        Some(budget.id),
        Some(&format!("name={}, total_limit={:.2}", budget.name, budget.total_limit)),
    );

    Ok((
        StatusCode::CREATED,
        Json(BudgetDetail::new(budget, state.today())),
    ))
}

/// GET /api/budgets/active - The active budget whose period covers today
pub async fn get_active_budget(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<BudgetDetail>, AppError> {
    let user = current_user(&request);
    let today = state.today();

    let budget = lifecycle::active_budget(&state.db, &user, today)?
        .ok_or_else(|| AppError::not_found("No active budget"))?;

    Ok(Json(BudgetDetail::new(budget, today)))
}

/// GET /api/budgets/:id - Get a single budget
pub async fn get_budget(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<BudgetDetail>, AppError> {
    let user = current_user(&request);

    let budget = BudgetTracker::new(&state.db).get_budget(&user, id)?;

    state.audit(&user, AuditAction::BudgetView, "budget", Some(id), None);

    Ok(Json(BudgetDetail::new(budget, state.today())))
}

/// PUT /api/budgets/:id - Update name, limit, allocations or active flag
pub async fn update_budget(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<BudgetDetail>, AppError> {
    let user = current_user(&request);
    let req: BudgetUpdate = read_json(request, MAX_BODY_SIZE).await?;

    let tracker = BudgetTracker::new(&state.db);
    let budget = tracker.update_budget(&user, id, &req).map_err(|e| {
        state.audit_failure(&user, AuditAction::BudgetUpdate, "budget", Some(id), &e);
        e
    })?;

    let mut changed = Vec::new();
    if req.name.is_some() {
        changed.push("name");
    }
    if req.total_limit.is_some() {
        changed.push("total_limit");
    }
    if req.categories.is_some() {
        changed.push("categories");
    }
    if req.is_active.is_some() {
        changed.push("is_active");
    }
    state.audit(
        &user,
        AuditAction::BudgetUpdate,
        "budget",
        Some(id),
        Some(&format!("fields={}", changed.join(","))),
    );

    Ok(Json(BudgetDetail::new(budget, state.today())))
}

/// PUT /api/budgets/:id/allocations - Replace category allocations
pub async fn update_allocations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<BudgetDetail>, AppError> {
    let user = current_user(&request);
    let req: UpdateAllocationsRequest = read_json(request, MAX_BODY_SIZE).await?;
    let count = req.categories.len();

    let tracker = BudgetTracker::new(&state.db);
    let budget = tracker
        .update_allocations(&user, id, req.categories)
        .map_err(|e| {
            state.audit_failure(&user, AuditAction::BudgetUpdate, "budget", Some(id), &e);
            e
        })?;

    state.audit(
        &user,
        AuditAction::BudgetUpdate,
        "budget",
        Some(id),
        Some(&format!("allocations={}", count)),
    );

    Ok(Json(BudgetDetail::new(budget, state.today())))
}

/// DELETE /api/budgets/:id - Delete a budget with no items
pub async fn delete_budget(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user = current_user(&request);

    BudgetTracker::new(&state.db)
        .delete_budget(&user, id)
        .map_err(|e| {
            state.audit_failure(&user, AuditAction::BudgetDelete, "budget", Some(id), &e);
            e
        })?;

    state.audit(&user, AuditAction::BudgetDelete, "budget", Some(id), None);

    Ok(Json(SuccessResponse { success: true }))
}

/// GET /api/budgets/:id/totals - Running totals per category
pub async fn get_budget_totals(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<RunningTotals>, AppError> {
    let user = current_user(&request);
    let totals = BudgetTracker::new(&state.db).running_totals(&user, id)?;
    Ok(Json(totals))
}
