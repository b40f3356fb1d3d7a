//! Printable budget report
//!
//! A4 pages set in the built-in Helvetica faces: a title block, the budget
//! summary, spend per category, then every item on the following pages.

use chrono::{DateTime, Utc};
use printpdf::{
    BuiltinFont, Color, IndirectFontRef, Line, Mm, PdfDocument, PdfDocumentReference,
    PdfLayerReference, Point, Rgb,
};
use tracing::debug;

use super::{category_names, day, find_budget, name_of, spend_by_category};
use crate::error::{Error, Result};
use crate::ledger::{CategoryCatalog, ItemFilter, LedgerStore};
use crate::models::percentage;

const PAGE_WIDTH: f32 = 210.0;
const PAGE_HEIGHT: f32 = 297.0;
const MARGIN: f32 = 20.0;
const ROW: f32 = 6.0;
const LAYER: &str = "Report";

const ITEM_COLUMNS: [(&str, f32); 6] = [
    ("Date", MARGIN),
    ("Item", 45.0),
    ("Category", 95.0),
    ("Qty", 135.0),
    ("Price", 150.0),
    ("Total", 172.0),
];

const ITEM_NAME_WIDTH: usize = 24;

fn pdf_error(e: printpdf::Error) -> Error {
    Error::Pdf(e.to_string())
}

fn money(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${:.2}", amount.abs())
    } else {
        format!("${:.2}", amount)
    }
}

fn shorten(name: &str) -> String {
    if name.chars().count() > ITEM_NAME_WIDTH {
        let head: String = name.chars().take(ITEM_NAME_WIDTH - 3).collect();
        format!("{}...", head)
    } else {
        name.to_string()
    }
}

fn rgb(r: f32, g: f32, b: f32) -> Color {
    Color::Rgb(Rgb::new(r, g, b, None))
}

/// Cursor over the document, breaking to a new page when a row would
/// fall into the bottom margin
struct Page {
    doc: PdfDocumentReference,
    layer: PdfLayerReference,
    regular: IndirectFontRef,
    bold: IndirectFontRef,
    y: f32,
}

impl Page {
    fn start(title: &str) -> Result<Self> {
        let (doc, page, layer) = PdfDocument::new(title, Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
        let regular = doc.add_builtin_font(BuiltinFont::Helvetica).map_err(pdf_error)?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(pdf_error)?;
        let layer = doc.get_page(page).get_layer(layer);
        Ok(Self {
            doc,
            layer,
            regular,
            bold,
            y: PAGE_HEIGHT - MARGIN,
        })
    }

    fn new_page(&mut self) {
        let (page, layer) = self.doc.add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), LAYER);
        self.layer = self.doc.get_page(page).get_layer(layer);
        self.y = PAGE_HEIGHT - MARGIN;
    }

    fn advance(&mut self, height: f32) {
        self.y -= height;
        if self.y < MARGIN {
            self.new_page();
        }
    }

    fn text(&self, text: &str, size: f32, x: f32, bold: bool) {
        let font = if bold { &self.bold } else { &self.regular };
        self.layer.use_text(text, size, Mm(x), Mm(self.y), font);
    }

    /// Left-aligned line of text, then move down
    fn line(&mut self, text: &str, size: f32, bold: bool) {
        self.text(text, size, MARGIN, bold);
        self.advance(size * 0.5 + 2.0);
    }

    /// Horizontal rule just under the current baseline
    fn rule(&self) {
        let y = Mm(self.y + ROW - 7.5);
        self.layer.set_outline_thickness(0.5);
        self.layer.add_line(Line {
            points: vec![
                (Point::new(Mm(MARGIN), y), false),
                (Point::new(Mm(PAGE_WIDTH - MARGIN), y), false),
            ],
            is_closed: false,
        });
    }

    fn item_header(&self) {
        for (title, x) in ITEM_COLUMNS {
            self.text(title, 9.0, x, true);
        }
        self.rule();
    }

    fn finish(self) -> Result<Vec<u8>> {
        self.doc.save_to_bytes().map_err(pdf_error)
    }
}

/// Builds the printable budget report from a ledger store
pub struct PdfExporter<'a, S: ?Sized> {
    store: &'a S,
}

impl<'a, S> PdfExporter<'a, S>
where
    S: LedgerStore + CategoryCatalog + ?Sized,
{
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Render one budget as a PDF document, stamped with `now`
    pub fn budget_report(
        &self,
        user_id: &str,
        budget_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Vec<u8>> {
        let budget = find_budget(self.store, user_id, budget_id)?;
        let names = category_names(self.store, user_id)?;
        let items = self
            .store
            .find_items(&ItemFilter::for_user(user_id).budget(budget.id))?;

        let mut page = Page::start(&format!("Budget Report: {}", budget.name))?;

        page.line("Budget Report", 24.0, true);
        page.line(&budget.name, 18.0, false);
        page.line(
            &format!(
                "Period: {} to {}",
                day(budget.period.start),
                day(budget.period.end)
            ),
            12.0,
            false,
        );
        page.line(&format!("Generated on: {}", day(now.date_naive())), 12.0, false);
        page.advance(ROW);

        page.line("Budget Summary", 16.0, true);
        page.line(&format!("Total Budget: {}", money(budget.total_limit)), 12.0, false);
        page.line(&format!("Amount Spent: {}", money(budget.current_spent)), 12.0, false);
        let remaining = budget.remaining();
        if remaining < 0.0 {
            page.layer.set_fill_color(rgb(0.94, 0.27, 0.27));
        }
        page.line(&format!("Remaining: {}", money(remaining)), 12.0, false);
        page.layer.set_fill_color(rgb(0.0, 0.0, 0.0));
        page.line(
            &format!("Budget Usage: {:.1}%", budget.percentage_spent()),
            12.0,
            false,
        );
        page.advance(ROW);

        let per_category = spend_by_category(&items);
        if !per_category.is_empty() {
            page.line("Category Breakdown", 16.0, true);
            page.text("Category", 10.0, MARGIN, true);
            page.text("Amount Spent", 10.0, 90.0, true);
            page.text("Limit", 10.0, 130.0, true);
            page.text("Percentage", 10.0, 160.0, true);
            page.rule();
            page.advance(ROW);

            for (category_id, (spent, _)) in &per_category {
                let limit = budget
                    .allocation_for(*category_id)
                    .map(|a| a.limit)
                    .filter(|l| *l > 0.0);
                page.text(&name_of(&names, *category_id), 10.0, MARGIN, false);
                page.text(&money(*spent), 10.0, 90.0, false);
                page.text(&limit.map_or_else(|| "-".to_string(), money), 10.0, 130.0, false);
                page.text(
                    &format!("{:.1}%", percentage(*spent, budget.current_spent)),
                    10.0,
                    160.0,
                    false,
                );
                page.advance(ROW);
            }
        }

        page.new_page();
        page.line("Transaction Details", 16.0, true);

        if items.is_empty() {
            page.line("No transactions recorded for this budget period.", 12.0, false);
        } else {
            page.item_header();
            page.advance(ROW);
            for item in &items {
                let cells = [
                    day(item.purchase_date),
                    shorten(&item.name),
                    name_of(&names, item.category_id),
                    item.quantity.to_string(),
                    money(item.price),
                    money(item.total_price()),
                ];
                for ((_, x), cell) in ITEM_COLUMNS.iter().zip(&cells) {
                    page.text(cell, 9.0, *x, false);
                }
                let before = page.y;
                page.advance(ROW);
                if page.y > before {
                    page.item_header();
                    page.advance(ROW);
                }
            }
        }

        let bytes = page.finish()?;
        debug!(budget_id, items = items.len(), bytes = bytes.len(), "Exported budget PDF");
        Ok(bytes)
    }
}
