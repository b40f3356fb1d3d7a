//! Money-saving tip handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    Json,
};
use serde::Deserialize;

use crate::{current_user, AppError, AppState, SuccessResponse};
use grocer_core::db::DEFAULT_TIP_LIMIT;
use grocer_core::models::{Tip, TriggerType};
use grocer_core::tips::SpendingPatterns;
use grocer_core::{AuditAction, TipGenerator, TipQuery, TipSuggestion};

/// Largest `limit` accepted for stored tips
const MAX_TIP_LIMIT: usize = 50;

/// Query parameters for stored tips
#[derive(Debug, Deserialize)]
pub struct TipListQuery {
    pub category: Option<String>,
    pub trigger_type: Option<String>,
    /// Comma-separated; a tip matches if it has any of them
    pub tags: Option<String>,
    pub limit: Option<usize>,
}

/// GET /api/tips - Stored tips, most helpful first
pub async fn list_tips(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TipListQuery>,
    request: Request,
) -> Result<Json<Vec<Tip>>, AppError> {
    let user = current_user(&request);

    let trigger_type = params
        .trigger_type
        .as_deref()
        .map(|t| t.parse::<TriggerType>())
        .transpose()
        .map_err(|e| AppError::bad_request(&e))?;

    let tags = params
        .tags
        .as_deref()
        .map(|t| {
            t.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();

    let query = TipQuery {
        category: params.category,
        trigger_type,
        tags,
        limit: Some(params.limit.unwrap_or(DEFAULT_TIP_LIMIT).clamp(1, MAX_TIP_LIMIT)),
    };

    let tips = TipGenerator::new(&state.db, &state.tips).relevant_tips(&query)?;

    state.audit(
        &user,
        AuditAction::TipView,
        "tip",
        None,
        Some(&format!("count={}", tips.len())),
    );

    Ok(Json(tips))
}

/// GET /api/tips/generate/:budget_id - Threshold, pattern and seasonal tips
pub async fn generate_tips(
    State(state): State<Arc<AppState>>,
    Path(budget_id): Path<i64>,
    request: Request,
) -> Result<Json<Vec<TipSuggestion>>, AppError> {
    let user = current_user(&request);

    let tips = TipGenerator::new(&state.db, &state.tips).tips_for_user(
        &user,
        Some(budget_id),
        state.today(),
    )?;

    Ok(Json(tips))
}

/// GET /api/tips/threshold/:budget_id - Tips for the budget's current tier
pub async fn get_threshold_tips(
    State(state): State<Arc<AppState>>,
    Path(budget_id): Path<i64>,
    request: Request,
) -> Result<Json<Vec<TipSuggestion>>, AppError> {
    let user = current_user(&request);
    let tips = TipGenerator::new(&state.db, &state.tips).threshold_tips(&user, budget_id)?;
    Ok(Json(tips))
}

/// GET /api/tips/seasonal - Tips for the current season
pub async fn get_seasonal_tips(State(state): State<Arc<AppState>>) -> Json<Vec<TipSuggestion>> {
    Json(TipGenerator::new(&state.db, &state.tips).seasonal_tips(state.today()))
}

/// GET /api/tips/analyze/:budget_id - Spending patterns for a budget
pub async fn analyze_spending(
    State(state): State<Arc<AppState>>,
    Path(budget_id): Path<i64>,
    request: Request,
) -> Result<Json<SpendingPatterns>, AppError> {
    let user = current_user(&request);
    let patterns = TipGenerator::new(&state.db, &state.tips).analyze_patterns(&user, budget_id)?;
    Ok(Json(patterns))
}

/// POST /api/tips/:id/helpful - Count a stored tip as helpful
pub async fn mark_tip_helpful(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<SuccessResponse>, AppError> {
    let user = current_user(&request);

    TipGenerator::new(&state.db, &state.tips).mark_tip_helpful(id)?;

    state.audit(&user, AuditAction::TipHelpful, "tip", Some(id), None);

    Ok(Json(SuccessResponse { success: true }))
}
