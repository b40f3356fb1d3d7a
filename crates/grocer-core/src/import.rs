//! CSV import of purchased items
//!
//! Expected header (case-insensitive, any column order):
//! `name,price,quantity,category,essential,purchase_date,notes`.
//! Only `name`, `price` and `category` are required.

use std::io::Read;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord};
use tracing::debug;

use crate::error::{Error, Result};
use crate::models::{Category, NewItem};

struct Columns {
    name: usize,
    price: usize,
    category: usize,
    quantity: Option<usize>,
    essential: Option<usize>,
    purchase_date: Option<usize>,
    notes: Option<usize>,
}

impl Columns {
    fn from_headers(headers: &StringRecord) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(name))
        };
        let required = |name: &str| {
            find(name).ok_or_else(|| Error::validation(format!("CSV is missing a '{}' column", name)))
        };

        Ok(Self {
            name: required("name")?,
            price: required("price")?,
            category: required("category")?,
            quantity: find("quantity"),
            essential: find("essential"),
            purchase_date: find("purchase_date"),
            notes: find("notes"),
        })
    }
}

fn field<'r>(record: &'r StringRecord, column: Option<usize>) -> Option<&'r str> {
    column
        .and_then(|c| record.get(c))
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "yes" | "y" | "true" | "1" => Some(true),
        "no" | "n" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Parse items from CSV, resolving category names against `categories`
///
/// Any unreadable row fails the whole import with the row number (1-based,
/// header excluded). Value checks such as price ranges are left to item
/// validation at write time.
pub fn parse_items<R: Read>(reader: R, categories: &[Category]) -> Result<Vec<NewItem>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(reader);

    let columns = Columns::from_headers(rdr.headers()?)?;
    let mut items = Vec::new();

    for (index, result) in rdr.records().enumerate() {
        let record = result?;
        let row = index + 1;
        let bad_row = |msg: String| Error::validation(format!("Row {}: {}", row, msg));

        let name = field(&record, Some(columns.name))
            .ok_or_else(|| bad_row("missing name".to_string()))?;

        let price_str = field(&record, Some(columns.price))
            .ok_or_else(|| bad_row("missing price".to_string()))?;
        let price: f64 = price_str
            .trim_start_matches('$')
            .replace(',', "")
            .parse()
            .map_err(|_| bad_row(format!("invalid price '{}'", price_str)))?;

        let category_name = field(&record, Some(columns.category))
            .ok_or_else(|| bad_row("missing category".to_string()))?;
        let category = categories
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(category_name))
            .ok_or_else(|| bad_row(format!("unknown category '{}'", category_name)))?;

        let quantity = match field(&record, columns.quantity) {
            Some(q) => q
                .parse()
                .map_err(|_| bad_row(format!("invalid quantity '{}'", q)))?,
            None => 1,
        };

        let mut item = NewItem::new(name, price, quantity, category.id);

        if let Some(flag) = field(&record, columns.essential) {
            item.is_essential =
                parse_bool(flag).ok_or_else(|| bad_row(format!("invalid essential flag '{}'", flag)))?;
        }
        if let Some(date) = field(&record, columns.purchase_date) {
            let parsed = NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|_| bad_row(format!("invalid purchase_date '{}'", date)))?;
            item = item.purchased_on(parsed);
        }
        item.notes = field(&record, columns.notes).map(str::to_string);

        items.push(item);
    }

    debug!("Parsed {} items from CSV", items.len());
    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn category(id: i64, name: &str) -> Category {
        Category {
            id,
            name: name.to_string(),
            icon: "📦".to_string(),
            color: "#6c757d".to_string(),
            is_system: true,
            user_id: None,
            parent_id: None,
            sort_order: id,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_parse_items() {
        let csv = "Name,Price,Category,Quantity,Essential,Purchase_Date,Notes\n\
                   Apples,$3.50,produce,2,yes,2024-06-02,Gala\n\
                   Milk,4.25,Dairy,,,,\n";
        let items = parse_items(csv.as_bytes(), &[category(1, "Produce"), category(2, "Dairy")]).unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].name, "Apples");
        assert_eq!(items[0].price, 3.5);
        assert_eq!(items[0].quantity, 2);
        assert_eq!(items[0].category_id, 1);
        assert!(items[0].is_essential);
        assert_eq!(items[0].purchase_date, NaiveDate::from_ymd_opt(2024, 6, 2));
        assert_eq!(items[0].notes.as_deref(), Some("Gala"));

        assert_eq!(items[1].quantity, 1);
        assert!(!items[1].is_essential);
        assert!(items[1].purchase_date.is_none());
        assert!(items[1].notes.is_none());
    }

    #[test]
    fn test_unknown_category_names_row() {
        let csv = "name,price,category\nApples,3.50,Produce\nChips,2.00,Junk\n";
        let err = parse_items(csv.as_bytes(), &[category(1, "Produce")]).unwrap_err();
        assert!(err.to_string().contains("Row 2"));
        assert!(err.to_string().contains("Junk"));
    }

    #[test]
    fn test_missing_required_column() {
        let csv = "name,category\nApples,Produce\n";
        assert!(matches!(
            parse_items(csv.as_bytes(), &[category(1, "Produce")]),
            Err(Error::Validation(_))
        ));
    }
}
