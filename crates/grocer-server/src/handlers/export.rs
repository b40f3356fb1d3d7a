//! CSV and PDF export handlers

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, Query, Request, State},
    http::{header, Response, StatusCode},
};
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use super::parse_date;
use crate::{current_user, AppError, AppState};
use grocer_core::{
    export_filename, AuditAction, CsvExporter, ExportKind, ItemExportOptions, PdfExporter,
    ReportOptions,
};

/// Query parameters for item export
#[derive(Debug, Deserialize)]
pub struct ItemExportQuery {
    /// Start date (YYYY-MM-DD)
    pub from: Option<String>,
    /// End date (YYYY-MM-DD)
    pub to: Option<String>,
    pub category_id: Option<i64>,
}

/// Query parameters for the cross-budget report
#[derive(Debug, Deserialize)]
pub struct ReportExportQuery {
    /// Earliest budget start (YYYY-MM-DD)
    pub from: Option<String>,
    /// Latest budget start (YYYY-MM-DD)
    pub to: Option<String>,
}

/// Build a file download response
fn download(kind: ExportKind, body: Vec<u8>) -> Result<Response<Body>, AppError> {
    let filename = export_filename(kind, Utc::now());

    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, kind.content_type())
        .header(header::CONTENT_LENGTH, body.len())
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(body))
        .map_err(|e| AppError::internal(&e.to_string()))
}

/// Build a CSV download response
fn csv_response(kind: ExportKind, csv: String) -> Result<Response<Body>, AppError> {
    let lines = csv.lines().count().saturating_sub(1);
    info!("Exported {} {} row(s)", lines, kind.prefix());
    download(kind, csv.into_bytes())
}

fn audit_export(
    state: &AppState,
    user: &str,
    kind: ExportKind,
    budget_id: Option<i64>,
) {
    state.audit(
        user,
        AuditAction::ExportData,
        "budget",
        budget_id,
        Some(&format!("type={}", kind.prefix())),
    );
}

/// GET /api/exports/budget/:id - One-row budget summary
pub async fn export_budget_summary(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Response<Body>, AppError> {
    let user = current_user(&request);

    let csv = CsvExporter::new(&state.db).budget_summary(&user, id)?;
    audit_export(&state, &user, ExportKind::BudgetSummary, Some(id));

    csv_response(ExportKind::BudgetSummary, csv)
}

/// GET /api/exports/budget/:id/pdf - Printable budget report
pub async fn export_budget_pdf(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Response<Body>, AppError> {
    let user = current_user(&request);

    let pdf = PdfExporter::new(&state.db).budget_report(&user, id, Utc::now())?;
    audit_export(&state, &user, ExportKind::BudgetPdf, Some(id));
    info!("Exported budget {} report ({} bytes)", id, pdf.len());

    download(ExportKind::BudgetPdf, pdf)
}

/// GET /api/exports/items/:id - A budget's items
pub async fn export_items(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Query(params): Query<ItemExportQuery>,
    request: Request,
) -> Result<Response<Body>, AppError> {
    let user = current_user(&request);

    let options = ItemExportOptions {
        from: parse_date(params.from.as_deref(), "from")?,
        to: parse_date(params.to.as_deref(), "to")?,
        category_id: params.category_id,
    };

    let csv = CsvExporter::new(&state.db).items(&user, id, &options)?;
    audit_export(&state, &user, ExportKind::Items, Some(id));

    csv_response(ExportKind::Items, csv)
}

/// GET /api/exports/categories/:id - Spend per category against allocations
pub async fn export_category_breakdown(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    request: Request,
) -> Result<Response<Body>, AppError> {
    let user = current_user(&request);

    let csv = CsvExporter::new(&state.db).category_breakdown(&user, id)?;
    audit_export(&state, &user, ExportKind::CategoryBreakdown, Some(id));

    csv_response(ExportKind::CategoryBreakdown, csv)
}

/// GET /api/exports/report - One row per budget across periods
pub async fn export_report(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ReportExportQuery>,
    request: Request,
) -> Result<Response<Body>, AppError> {
    let user = current_user(&request);

    let options = ReportOptions {
        from: parse_date(params.from.as_deref(), "from")?,
        to: parse_date(params.to.as_deref(), "to")?,
    };

    let csv = CsvExporter::new(&state.db).report(&user, &options)?;
    audit_export(&state, &user, ExportKind::Report, None);

    csv_response(ExportKind::Report, csv)
}
