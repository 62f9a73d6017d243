//! The assembler: one call per field extractor, one record, one report.

use crate::extract::fields;
use crate::extract::normalize::RawText;
use crate::extract::record::{ExtractionReport, FieldReport, InvoiceRecord};
use tracing::debug;

/// Assemble an [`InvoiceRecord`] and its [`ExtractionReport`] from
/// normalised text.
///
/// Invokes each field extractor exactly once, independently — no
/// extractor's result affects another's. Never fails: adversarial or
/// empty input yields a record with all fields absent and a report with
/// every entry `found = false`. Identical input produces byte-identical
/// output (no randomness, no locale-dependent formatting).
pub fn assemble(text: &RawText) -> (InvoiceRecord, ExtractionReport) {
    let number = fields::invoice_number(text);
    let date = fields::invoice_date(text);
    let total = fields::total_amount(text);
    let items = fields::line_items(text);

    let report = ExtractionReport {
        invoice_number: FieldReport {
            found: number.is_some(),
            raw_match: number.as_ref().map(|m| m.raw.clone()),
            candidates: number.as_ref().map_or(0, |m| m.candidates),
        },
        date: FieldReport {
            found: date.is_some(),
            raw_match: date.as_ref().map(|m| m.raw.clone()),
            candidates: date.as_ref().map_or(0, |m| m.candidates),
        },
        total_amount: FieldReport {
            found: total.is_some(),
            raw_match: total.as_ref().map(|m| m.raw.clone()),
            candidates: total.as_ref().map_or(0, |m| m.candidates),
        },
        line_items: FieldReport {
            found: !items.items.is_empty(),
            raw_match: items.raw.clone(),
            candidates: items.candidates,
        },
    };

    let record = InvoiceRecord {
        invoice_number: number.map(|m| m.value),
        date: date.map(|m| m.value),
        total: total.map(|m| m.value),
        line_items: items.items,
    };

    debug!(
        found = report.fields().iter().filter(|(_, f)| f.found).count(),
        items = record.line_items.len(),
        "assembled invoice record"
    );

    (record, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::normalize::normalize;
    use crate::extract::record::TotalKeyword;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    #[test]
    fn full_example() {
        let t = normalize(
            "Invoice No: INV-2024-001 Date: 2024/01/15 \
             Widget 3 x 10.00 Gadget 1 x 25.50 Total: 55.50",
        );
        let (record, report) = assemble(&t);

        assert_eq!(record.invoice_number.as_deref(), Some("inv-2024-001"));
        let date = record.date.unwrap();
        assert_eq!(date.raw, "2024/01/15");
        assert!(date.date_like);
        let total = record.total.unwrap();
        assert_eq!(total.value, Decimal::from_str("55.50").unwrap());
        assert_eq!(total.keyword, TotalKeyword::Total);
        assert_eq!(record.line_items.len(), 2);
        assert_eq!(record.line_items[0].name, "widget");
        assert_eq!(record.line_items[0].quantity, 3);
        assert_eq!(
            record.line_items[0].unit_price,
            Decimal::from_str("10.00").unwrap()
        );
        assert_eq!(record.line_items[1].name, "gadget");

        for (name, field) in report.fields() {
            assert!(field.found, "{name} should be found");
            assert!(field.raw_match.is_some());
        }
    }

    #[test]
    fn empty_text_yields_all_absent() {
        let (record, report) = assemble(&normalize(""));
        assert!(record.is_empty());
        assert!(report.all_absent());
    }

    #[test]
    fn unrecognisable_text_yields_all_absent() {
        let (record, report) = assemble(&normalize(
            "lorem ipsum dolor sit amet, nothing resembling a field here",
        ));
        assert!(record.is_empty());
        assert!(report.all_absent());
        for (_, field) in report.fields() {
            assert!(field.raw_match.is_none());
            assert_eq!(field.candidates, 0);
        }
    }

    #[test]
    fn deterministic_for_identical_input() {
        let t = normalize("Amount: 10.00 Total: 20.00 pen 1 x 1.00 pen 1 x 1.00");
        let (r1, p1) = assemble(&t);
        let (r2, p2) = assemble(&t);
        assert_eq!(r1, r2);
        assert_eq!(p1, p2);
        // Serialised forms must be byte-identical too.
        assert_eq!(
            serde_json::to_string(&r1).unwrap(),
            serde_json::to_string(&r2).unwrap()
        );
        assert_eq!(
            serde_json::to_string(&p1).unwrap(),
            serde_json::to_string(&p2).unwrap()
        );
    }

    #[test]
    fn ambiguous_total_flagged_in_report() {
        let t = normalize("Amount: 10.00 Total: 20.00");
        let (record, report) = assemble(&t);
        let total = record.total.unwrap();
        assert_eq!(total.value, Decimal::from_str("10.00").unwrap());
        assert_eq!(total.keyword, TotalKeyword::Amount);
        assert_eq!(report.total_amount.candidates, 2);
        assert_eq!(report.total_amount.raw_match.as_deref(), Some("amount: 10.00"));
    }

    #[test]
    fn adversarial_input_never_panics() {
        let cases = [
            "invoice",
            "invoice no:",
            "date:",
            "total:",
            "x x x x x",
            ": : : :",
            "total: .",
            "invoice no: ------",
            "𝕚𝕟𝕧𝕠𝕚𝕔𝕖 𝕟𝕠: 𝟙𝟚𝟛",
            "total: 99999999999999999999999999999999999999999999.99",
        ];
        for raw in cases {
            let (_record, _report) = assemble(&normalize(raw));
        }
    }
}
