//! Item handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use super::parse_date;
use crate::{
    current_user, read_json, AppError, AppState, MAX_BATCH_BODY_SIZE, MAX_BODY_SIZE,
    MAX_PAGE_LIMIT,
};
use grocer_core::models::{BudgetSnapshot, Item, ItemUpdate, NewItem};
use grocer_core::{AuditAction, BatchOutcome, BudgetTracker, ItemFilter, ItemPage, ItemWriteOutcome};

/// Default page size for item listings
const DEFAULT_ITEM_LIMIT: i64 = 50;

/// Query parameters for listing items
#[derive(Debug, Deserialize)]
pub struct ItemListQuery {
    pub budget_id: Option<i64>,
    pub category_id: Option<i64>,
    pub is_essential: Option<bool>,
    /// Earliest purchase date (YYYY-MM-DD, inclusive)
    pub from: Option<String>,
    /// Latest purchase date (YYYY-MM-DD, inclusive)
    pub to: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Request body for creating an item
#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    pub budget_id: i64,
    #[serde(flatten)]
    pub item: NewItem,
}

/// Request body for creating several items at once
#[derive(Debug, Deserialize)]
pub struct BatchCreateRequest {
    pub budget_id: i64,
    pub items: Vec<NewItem>,
}

/// Response for item deletion
#[derive(Debug, Serialize)]
pub struct DeleteItemResponse {
    pub success: bool,
    /// The owning budget after reconciliation
    pub budget: Option<BudgetSnapshot>,
}

/// GET /api/items - List items with totals over the whole filter
pub async fn list_items(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ItemListQuery>,
    request: Request,
) -> Result<Json<ItemPage>, AppError> {
    let user = current_user(&request);

    let limit = params.limit.unwrap_or(DEFAULT_ITEM_LIMIT);
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(AppError::bad_request(&format!(
            "limit must be between 1 and {}",
            MAX_PAGE_LIMIT
        )));
    }
    let offset = params.offset.unwrap_or(0).max(0);

    let mut filter = ItemFilter::for_user(&user)
        .essential(params.is_essential)
        .paginate(limit, offset);
    filter.budget_id = params.budget_id;
    filter.category_id = params.category_id;
    filter.purchased_from = parse_date(params.from.as_deref(), "from")?;
    filter.purchased_to = parse_date(params.to.as_deref(), "to")?;

    let page = BudgetTracker::new(&state.db).list_items(&filter)?;
    Ok(Json(page))
}

/// POST /api/items - Record an item against an active budget
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<ItemWriteOutcome>), AppError> {
    let user = current_user(&request);
    let req: CreateItemRequest = read_json(request, MAX_BODY_SIZE).await?;

    let tracker = BudgetTracker::with_tips(&state.db, &state.tips);
    let outcome = tracker
        .create_item(&user, req.budget_id, &req.item, state.today())
        .map_err(|e| {
            state.audit_failure(&user, AuditAction::ItemCreate, "item", None, &e);
            e
        })?;

    state.audit(
        &user,
        AuditAction::ItemCreate,
        "item",
        Some(outcome.item.id),
        Some(&format!(
            "budget_id={}, name={}, total={:.2}",
            req.budget_id,
            outcome.item.name,
            outcome.item.total_price()
        )),
    );

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// POST /api/items/batch - Create several items in one request
pub async fn batch_create_items(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<BatchOutcome>), AppError> {
    let user = current_user(&request);
    let req: BatchCreateRequest = read_json(request, MAX_BATCH_BODY_SIZE).await?;

    let tracker = BudgetTracker::new(&state.db);
    let outcome = tracker
        .batch_create_items(&user, req.budget_id, &req.items, state.today())
        .map_err(|e| {
            state.audit_failure(&user, AuditAction::ItemBatchCreate, "budget", Some(req.budget_id), &e);
            e
        })?;

    state.audit(
        &user,
        AuditAction::ItemBatchCreate,
        "budget",
        Some(req.budget_id),
        Some(&format!(
            "created={}, failed={}",
            outcome.summary.created, outcome.summary.failed
        )),
    );

    Ok((StatusCode::CREATED, Json(outcome)))
}

/// GET /api/items/:id - Get a single item
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Item>, AppError> {
    let user = current_user(&request);

    let item = state
        .db
        .get_item(id, &user)?
        .ok_or_else(|| AppError::not_found(&format!("Item {} not found", id)))?;

    Ok(Json(item))
}

/// PUT /api/items/:id - Edit an item in place
pub async fn update_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<ItemWriteOutcome>, AppError> {
    let user = current_user(&request);
    let req: ItemUpdate = read_json(request, MAX_BODY_SIZE).await?;

    let tracker = BudgetTracker::with_tips(&state.db, &state.tips);
    let outcome = tracker.update_item(&user, id, &req).map_err(|e| {
        state.audit_failure(&user, AuditAction::ItemUpdate, "item", Some(id), &e);
        e
    })?;

    state.audit(
        &user,
        AuditAction::ItemUpdate,
        "item",
        Some(id),
        Some(&format!("total={:.2}", outcome.item.total_price())),
    );

    Ok(Json(outcome))
}

/// DELETE /api/items/:id - Remove an item
pub async fn delete_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<DeleteItemResponse>, AppError> {
    let user = current_user(&request);

    let budget = BudgetTracker::new(&state.db)
        .delete_item(&user, id)
        .map_err(|e| {
            state.audit_failure(&user, AuditAction::ItemDelete, "item", Some(id), &e);
            e
        })?;

    state.audit(&user, AuditAction::ItemDelete, "item", Some(id), None);

    Ok(Json(DeleteItemResponse {
        success: true,
        budget,
    }))
}
