//! Structured invoice data extracted from normalised OCR text.
//!
//! Absence is always `Option::None` or an empty `Vec` — never a sentinel
//! string such as `"N/A"` — so downstream consumers cannot mistake a
//! literal value for a missing one.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A raw date token as it appeared in the text.
///
/// No calendar validation is performed: `99/99/9999` is stored verbatim.
/// `date_like` only says the token has a date *shape* (two or three numeric
/// groups separated by `/` or `-`); consumers must not assume validity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceDate {
    /// The token exactly as matched, e.g. `"2024/01/15"`.
    pub raw: String,
    /// Whether the token matched a recognised date-like shape.
    pub date_like: bool,
}

/// Which keyword introduced the matched total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TotalKeyword {
    Total,
    Amount,
}

impl fmt::Display for TotalKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TotalKeyword::Total => f.write_str("total"),
            TotalKeyword::Amount => f.write_str("amount"),
        }
    }
}

/// The invoice total, tagged with the keyword that introduced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalAmount {
    /// Parsed value with exactly two fraction digits.
    pub value: Decimal,
    /// Which of `total` / `amount` matched first in the text.
    pub keyword: TotalKeyword,
}

/// One purchased item, as matched from a `<name> <qty> x <price>` run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    /// Always positive; zero-quantity matches are skipped as malformed.
    pub quantity: u32,
    /// Per-unit price with exactly two fraction digits.
    pub unit_price: Decimal,
}

/// The assembled invoice record.
///
/// Every optional field is `Some(value)` or `None`; `line_items` may be
/// empty but is never absent. Identical input text always produces a
/// byte-identical record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    pub invoice_number: Option<String>,
    pub date: Option<InvoiceDate>,
    pub total: Option<TotalAmount>,
    pub line_items: Vec<LineItem>,
}

impl InvoiceRecord {
    /// True when nothing at all was extracted.
    pub fn is_empty(&self) -> bool {
        self.invoice_number.is_none()
            && self.date.is_none()
            && self.total.is_none()
            && self.line_items.is_empty()
    }
}

/// Diagnostic entry for one field of the [`ExtractionReport`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldReport {
    /// Whether the field was populated in the record.
    pub found: bool,
    /// The full matched span (marker, separator, and token) for the match
    /// that populated the record; for line items, the first matched span.
    pub raw_match: Option<String>,
    /// How many pattern occurrences were seen, including occurrences that
    /// were skipped as malformed. A value greater than 1 on a scalar field
    /// means the first-wins tie-break fired.
    pub candidates: usize,
}

/// Machine-checkable account of which fields were found.
///
/// Produced alongside [`InvoiceRecord`] by the assembler; read-only after
/// creation. Field order is fixed, so serialised output is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionReport {
    pub invoice_number: FieldReport,
    pub date: FieldReport,
    pub total_amount: FieldReport,
    pub line_items: FieldReport,
}

impl ExtractionReport {
    /// Iterate the entries in their fixed order, with field names.
    pub fn fields(&self) -> [(&'static str, &FieldReport); 4] {
        [
            ("invoice_number", &self.invoice_number),
            ("date", &self.date),
            ("total_amount", &self.total_amount),
            ("line_items", &self.line_items),
        ]
    }

    /// True when no field was found at all.
    pub fn all_absent(&self) -> bool {
        self.fields().iter().all(|(_, f)| !f.found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_record_is_empty() {
        let record = InvoiceRecord::default();
        assert!(record.is_empty());
        assert!(record.line_items.is_empty());
    }

    #[test]
    fn default_report_is_all_absent() {
        let report = ExtractionReport::default();
        assert!(report.all_absent());
        for (_, field) in report.fields() {
            assert!(!field.found);
            assert!(field.raw_match.is_none());
            assert_eq!(field.candidates, 0);
        }
    }

    #[test]
    fn report_field_order_is_stable() {
        let names: Vec<&str> = ExtractionReport::default()
            .fields()
            .iter()
            .map(|(n, _)| *n)
            .collect();
        assert_eq!(
            names,
            ["invoice_number", "date", "total_amount", "line_items"]
        );
    }

    #[test]
    fn record_serialises_absence_as_null() {
        let json = serde_json::to_value(InvoiceRecord::default()).unwrap();
        assert!(json["invoice_number"].is_null());
        assert!(json["date"].is_null());
        assert!(json["total"].is_null());
        assert_eq!(json["line_items"], serde_json::json!([]));
    }

    #[test]
    fn total_keyword_display() {
        assert_eq!(TotalKeyword::Total.to_string(), "total");
        assert_eq!(TotalKeyword::Amount.to_string(), "amount");
    }
}
