//! Export command implementation

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use grocer_core::db::Database;
use grocer_core::{
    export_filename, AuditAction, CsvExporter, ExportKind, ItemExportOptions, PdfExporter,
    ReportOptions,
};

use super::{audit, parse_date, resolve_category};

#[allow(clippy::too_many_arguments)]
pub fn cmd_export(
    db: &Database,
    user: &str,
    kind: &str,
    budget: Option<i64>,
    output: Option<&Path>,
    from: Option<&str>,
    to: Option<&str>,
    category: Option<&str>,
) -> Result<()> {
    let kind: ExportKind = kind.parse().map_err(anyhow::Error::msg)?;
    let from = from.map(|d| parse_date(d, "from")).transpose()?;
    let to = to.map(|d| parse_date(d, "to")).transpose()?;

    let require_budget = || {
        budget.with_context(|| format!("--budget is required for the {} export", kind.prefix()))
    };

    let exporter = CsvExporter::new(db);
    let contents: Vec<u8> = match kind {
        ExportKind::BudgetSummary => exporter.budget_summary(user, require_budget()?)?.into(),
        ExportKind::Items => {
            let category_id = match category {
                Some(category) => Some(resolve_category(db, user, category)?.id),
                None => None,
            };
            let options = ItemExportOptions {
                from,
                to,
                category_id,
            };
            exporter.items(user, require_budget()?, &options)?.into()
        }
        ExportKind::CategoryBreakdown => {
            exporter.category_breakdown(user, require_budget()?)?.into()
        }
        ExportKind::Report => exporter.report(user, &ReportOptions { from, to })?.into(),
        ExportKind::BudgetPdf => {
            PdfExporter::new(db).budget_report(user, require_budget()?, Utc::now())?
        }
    };

    let path = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(export_filename(kind, Utc::now())));
    std::fs::write(&path, &contents)
        .with_context(|| format!("Failed to write {}", path.display()))?;

    audit(
        db,
        user,
        AuditAction::ExportData,
        "budget",
        budget,
        Some(&format!("type={}", kind.prefix())),
    );

    println!("✅ Exported {} to {}", kind.prefix(), path.display());

    Ok(())
}
