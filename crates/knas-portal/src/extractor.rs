//! Detail-page extractor: parse the portal's HTML fine listing into
//! structured fine records.
//!
//! The detail page is only fetched when the search step returns the
//! ambiguous "count without amount" signal; its data rows are the
//! ground truth for whether the count was personal. Extraction never
//! raises: a field that fails to parse is skipped, a row that yields
//! nothing at all is dropped.

use knas_core::FineItem;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

// Row and field selectors for the legacy table markup. The attribute
// fallback catches tenants that decorate the row class list.
static DATA_ROW: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("tr.tableDiv.data, tr[class*='tableDiv'][class*='data']")
        .expect("valid selector")
});
static FINE_NUMBER: Lazy<Selector> = Lazy::new(|| Selector::parse("label").expect("valid selector"));
static PRICE_CHECKBOX: Lazy<Selector> =
    Lazy::new(|| Selector::parse("input[type='checkbox']").expect("valid selector"));
static PRICE_DISPLAY: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".price").expect("valid selector"));
static CELL: Lazy<Selector> = Lazy::new(|| Selector::parse("div.cell").expect("valid selector"));

static DATE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}/\d{2}/\d{4}").expect("valid regex"));
static TIME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{2}:\d{2}$").expect("valid regex"));

/// Result of extracting one detail page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractedFines {
    /// Fine rows in document order
    pub items: Vec<FineItem>,
    /// Sum of the successfully parsed decimal prices only; textual
    /// price-display fallbacks are never summed
    pub total: f64,
}

impl ExtractedFines {
    /// Render the total as the result amount string: a two-decimal sum
    /// when any price parsed, otherwise a pointer at the item list.
    #[must_use]
    pub fn amount_text(&self) -> String {
        if self.total > 0.0 {
            format!("{:.2}", self.total)
        } else {
            "see details".to_string()
        }
    }
}

/// Collect an element's text content, whitespace-trimmed.
fn element_text(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Extract every fine row from a detail-page HTML document.
#[must_use]
pub fn extract_fines(html: &str) -> ExtractedFines {
    let document = Html::parse_document(html);
    let mut extracted = ExtractedFines::default();

    for row in document.select(&DATA_ROW) {
        let mut item = FineItem::default();

        if let Some(label) = row.select(&FINE_NUMBER).next() {
            let number = element_text(&label);
            if !number.is_empty() {
                item.number = Some(number);
            }
        }

        if let Some(checkbox) = row.select(&PRICE_CHECKBOX).next() {
            if let Some(raw_price) = checkbox.value().attr("data-price") {
                // Unparseable prices are skipped; the textual display
                // below still carries the amount for the reader.
                if let Ok(price) = raw_price.trim().parse::<f64>() {
                    item.amount = Some(price);
                    extracted.total += price;
                }
            }
        }

        if let Some(price_el) = row.select(&PRICE_DISPLAY).next() {
            let display = element_text(&price_el);
            if !display.is_empty() {
                item.price_display = Some(display);
            }
        }

        for cell in row.select(&CELL) {
            let text = element_text(&cell);
            if item.date.is_none() && DATE_PATTERN.is_match(&text) {
                item.date = Some(text);
            } else if item.time.is_none() && TIME_PATTERN.is_match(&text) {
                item.time = Some(text);
            }
        }

        if !item.is_empty() {
            extracted.items.push(item);
        }
    }

    extracted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fine_row(number: &str, price: &str, date: &str, time: &str) -> String {
        format!(
            r#"<tr class="tableDiv data">
                <td><label>{number}</label></td>
                <td><input type="checkbox" data-price="{price}" /></td>
                <td><span class="price">{price} ₪</span></td>
                <td><div class="cell">{date}</div><div class="cell">{time}</div></td>
            </tr>"#
        )
    }

    #[test]
    fn test_extracts_rows_in_document_order_and_sums_prices() {
        let html = format!(
            "<table>{}{}{}</table>",
            fine_row("1001", "100.50", "01/02/2025", "09:15"),
            fine_row("1002", "250.00", "15/03/2025", "14:30"),
            fine_row("1003", "99.90", "28/06/2025", "23:05"),
        );

        let extracted = extract_fines(&html);
        assert_eq!(extracted.items.len(), 3);
        assert!((extracted.total - 450.40).abs() < 0.005);
        assert_eq!(extracted.amount_text(), "450.40");

        let numbers: Vec<_> = extracted
            .items
            .iter()
            .map(|i| i.number.as_deref().unwrap_or(""))
            .collect();
        assert_eq!(numbers, vec!["1001", "1002", "1003"]);

        assert_eq!(extracted.items[0].date.as_deref(), Some("01/02/2025"));
        assert_eq!(extracted.items[0].time.as_deref(), Some("09:15"));
    }

    #[test]
    fn test_malformed_price_is_skipped_not_fatal() {
        let html = format!(
            "<table>{}{}</table>",
            fine_row("2001", "abc", "01/02/2025", "09:15"),
            fine_row("2002", "80.00", "02/02/2025", "10:00"),
        );

        let extracted = extract_fines(&html);
        assert_eq!(extracted.items.len(), 2);

        // The malformed row keeps its other fields
        let bad = &extracted.items[0];
        assert_eq!(bad.number.as_deref(), Some("2001"));
        assert_eq!(bad.amount, None);
        assert_eq!(bad.price_display.as_deref(), Some("abc ₪"));
        assert_eq!(bad.date.as_deref(), Some("01/02/2025"));

        // And it does not contribute to the total
        assert!((extracted.total - 80.00).abs() < f64::EPSILON);
    }

    #[test]
    fn test_row_with_no_fields_is_dropped() {
        let html = r#"<table>
            <tr class="tableDiv data"><td></td><td></td></tr>
        </table>"#;

        let extracted = extract_fines(html);
        assert!(extracted.items.is_empty());
        assert_eq!(extracted.total, 0.0);
    }

    #[test]
    fn test_rows_without_marker_class_are_ignored() {
        let html = format!(
            r#"<table>
                <tr class="tableDiv header"><td><label>HEADER</label></td></tr>
                {}
            </table>"#,
            fine_row("3001", "120.00", "05/05/2025", "08:00"),
        );

        let extracted = extract_fines(&html);
        assert_eq!(extracted.items.len(), 1);
        assert_eq!(extracted.items[0].number.as_deref(), Some("3001"));
    }

    #[test]
    fn test_decorated_row_class_matches_fallback_selector() {
        let html = r#"<table>
            <tr class="x-tableDiv-wide data-selected">
                <td><label>4001</label></td>
                <td><input type="checkbox" data-price="55.00" /></td>
            </tr>
        </table>"#;

        let extracted = extract_fines(html);
        assert_eq!(extracted.items.len(), 1);
        assert_eq!(extracted.items[0].amount, Some(55.00));
    }

    #[test]
    fn test_price_display_only_row_is_kept_but_not_summed() {
        let html = r#"<table>
            <tr class="tableDiv data">
                <td><label>5001</label></td>
                <td><span class="price">ראה פרטים</span></td>
            </tr>
        </table>"#;

        let extracted = extract_fines(html);
        assert_eq!(extracted.items.len(), 1);
        assert_eq!(extracted.items[0].price_display.as_deref(), Some("ראה פרטים"));
        assert_eq!(extracted.total, 0.0);
        assert_eq!(extracted.amount_text(), "see details");
    }

    #[test]
    fn test_time_pattern_is_fully_anchored() {
        // "12:30:45" must not be read as a HH:MM time
        let html = r#"<table>
            <tr class="tableDiv data">
                <td><label>6001</label></td>
                <td><div class="cell">12:30:45</div><div class="cell">12:30</div></td>
            </tr>
        </table>"#;

        let extracted = extract_fines(html);
        assert_eq!(extracted.items[0].time.as_deref(), Some("12:30"));
    }
}
