//! Category handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    Json,
};

use crate::{current_user, read_json, AppError, AppState, SuccessResponse, MAX_BODY_SIZE};
use grocer_core::models::{Category, NewCategory};
use grocer_core::AuditAction;

/// GET /api/categories - System categories plus the user's own
pub async fn list_categories(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<Json<Vec<Category>>, AppError> {
    let user = current_user(&request);
    Ok(Json(state.db.list_categories(&user)?))
}

/// POST /api/categories - Create a user-defined category
pub async fn create_category(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Result<(StatusCode, Json<Category>), AppError> {
    let user = current_user(&request);
    let req: NewCategory = read_json(request, MAX_BODY_SIZE).await?;

    let category = state.db.create_category(&user, &req).map_err(|e| {
        state.audit_failure(&user, AuditAction::CategoryCreate, "category", None, &e);
        e
    })?;

    state.audit(
        &user,
        AuditAction::CategoryCreate,
        "category",
        Some(category.id),
        Some(&format!("name={}", category.name)),
    );

    Ok((StatusCode::CREATED, Json(category)))
}

/// PUT /api/categories/:id - Rename or restyle a user-defined category
pub async fn update_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Category>, AppError> {
    let user = current_user(&request);
    let req: NewCategory = read_json(request, MAX_BODY_SIZE).await?;

    let category = state.db.update_category(id, &user, &req).map_err(|e| {
        state.audit_failure(&user, AuditAction::CategoryUpdate, "category", Some(id), &e);
        e
    })?;

    state.audit(
        &user,
        AuditAction::CategoryUpdate,
        "category",
        Some(id),
        Some(&format!("name={}", category.name)),
    );

    Ok(Json(category))
}

/// DELETE /api/categories/:id - Delete an unused user-defined category
pub async fn delete_category(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user = current_user(&request);

    state.db.delete_category(id, &user).map_err(|e| {
        state.audit_failure(&user, AuditAction::CategoryDelete, "category", Some(id), &e);
        e
    })?;

    state.audit(&user, AuditAction::CategoryDelete, "category", Some(id), None);

    Ok(Json(SuccessResponse { success: true }))
}
