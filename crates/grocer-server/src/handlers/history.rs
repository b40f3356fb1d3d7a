//! Activity history, period comparison and trend handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, Request, State},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::parse_date;
use crate::{current_user, AppError, AppState, MAX_PAGE_LIMIT};
use grocer_core::db::{AuditEntry, DEFAULT_ACTIVITY_PAGE_SIZE};
use grocer_core::{
    analyze_spending_trends, compare_periods, ActivityFilter, ActivityPage, ActivitySummary,
    AuditAction, BudgetTracker, ComparisonOutcome, SpendingTrends,
};

/// Default window for the activity summary
const DEFAULT_SUMMARY_DAYS: i64 = 7;

/// Default window for spending trends
const DEFAULT_TREND_DAYS: i64 = 30;

/// Default retention for audit cleanup
const DEFAULT_AUDIT_RETENTION_DAYS: i64 = 90;

/// Longest window accepted for summaries and trends
const MAX_WINDOW_DAYS: i64 = 366;

/// Query parameters for the activity log
#[derive(Debug, Deserialize)]
pub struct ActivityQuery {
    /// Start date (YYYY-MM-DD)
    pub from: Option<String>,
    /// End date (YYYY-MM-DD)
    pub to: Option<String>,
    pub action: Option<String>,
    pub entity_type: Option<String>,
    /// 1-based page number
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

/// Query parameters for windowed views
#[derive(Debug, Deserialize)]
pub struct WindowQuery {
    pub days: Option<i64>,
}

/// Query parameters for audit cleanup
#[derive(Debug, Deserialize)]
pub struct CleanAuditQuery {
    pub days_to_keep: Option<i64>,
}

/// Response for audit cleanup
#[derive(Debug, Serialize)]
pub struct CleanAuditResponse {
    pub deleted: usize,
    pub days_to_keep: i64,
}

fn window(days: Option<i64>, default: i64) -> Result<i64, AppError> {
    let days = days.unwrap_or(default);
    if !(1..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(AppError::bad_request(&format!(
            "days must be between 1 and {}",
            MAX_WINDOW_DAYS
        )));
    }
    Ok(days)
}

/// GET /api/history/activity - The user's audit entries, newest first
pub async fn list_activity(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ActivityQuery>,
    request: Request,
) -> Result<Json<ActivityPage>, AppError> {
    let user = current_user(&request);

    let action = params
        .action
        .as_deref()
        .map(|a| a.parse::<AuditAction>())
        .transpose()
        .map_err(|e| AppError::bad_request(&e))?;

    let per_page = params.per_page.unwrap_or(DEFAULT_ACTIVITY_PAGE_SIZE);
    if !(1..=MAX_PAGE_LIMIT).contains(&per_page) {
        return Err(AppError::bad_request(&format!(
            "per_page must be between 1 and {}",
            MAX_PAGE_LIMIT
        )));
    }

    let filter = ActivityFilter {
        from: parse_date(params.from.as_deref(), "from")?,
        to: parse_date(params.to.as_deref(), "to")?,
        action,
        entity_type: params.entity_type,
        page: params.page.unwrap_or(1).max(1),
        per_page,
        ..ActivityFilter::for_user(&user)
    };

    Ok(Json(state.db.list_user_activity(&filter)?))
}

/// GET /api/history/activity/summary - Action counts per day
pub async fn get_activity_summary(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
    request: Request,
) -> Result<Json<ActivitySummary>, AppError> {
    let user = current_user(&request);
    let days = window(params.days, DEFAULT_SUMMARY_DAYS)?;
    Ok(Json(state.db.activity_summary(&user, days)?))
}

/// GET /api/history/budget/:id/audit - Latest audit entries for one budget
pub async fn get_budget_audit_trail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<Vec<AuditEntry>>, AppError> {
    let user = current_user(&request);

    // 404 for budgets the user does not own
    BudgetTracker::new(&state.db).get_budget(&user, id)?;

    Ok(Json(state.db.budget_audit_trail(id, &user)?))
}

/// GET /api/history/budget/:id/compare - Compare with the previous period
pub async fn compare_budget_periods(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Json<ComparisonOutcome>, AppError> {
    let user = current_user(&request);
    Ok(Json(compare_periods(&state.db, &user, id)?))
}

/// GET /api/history/trends - Weekly spending across all budgets
pub async fn get_spending_trends(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WindowQuery>,
    request: Request,
) -> Result<Json<SpendingTrends>, AppError> {
    let user = current_user(&request);
    let days = window(params.days, DEFAULT_TREND_DAYS)?;
    Ok(Json(analyze_spending_trends(
        &state.db,
        &user,
        days,
        state.today(),
    )?))
}

/// POST /api/history/audit/clean - Drop audit entries older than the retention window
pub async fn clean_audit_log(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CleanAuditQuery>,
    request: Request,
) -> Result<Json<CleanAuditResponse>, AppError> {
    let user = current_user(&request);

    let days_to_keep = params.days_to_keep.unwrap_or(DEFAULT_AUDIT_RETENTION_DAYS);
    if days_to_keep < 1 {
        return Err(AppError::bad_request("days_to_keep must be at least 1"));
    }

    let deleted = state.db.clean_audit_log(days_to_keep)?;
    info!(user = %user, deleted, days_to_keep, "Cleaned audit log");

    Ok(Json(CleanAuditResponse {
        deleted,
        days_to_keep,
    }))
}
