//! Field extractors: independent pattern matchers over normalised text.
//!
//! Each extractor is a pure function of [`RawText`] — callable in any
//! order, no effect on the others, no mutation of the input. All return
//! `None` (or an empty item list) rather than failing: a missing field is
//! a normal outcome, not an error.
//!
//! ## Ambiguity policy
//!
//! When a pattern occurs more than once, the first left-to-right match
//! wins. This is a deliberate, documented tie-break, not an error; the
//! `candidates` count in each match records how many occurrences were
//! seen so downstream consumers can flag ambiguous extractions.
//!
//! ## Malformed numeric tokens
//!
//! A matched occurrence whose integer or decimal token fails to parse
//! (overflow, zero quantity) is skipped with a debug log and extraction
//! continues with the next occurrence. Nothing aborts.

use crate::extract::normalize::RawText;
use crate::extract::record::{InvoiceDate, LineItem, TotalAmount, TotalKeyword};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use tracing::debug;

/// A successful scalar-field extraction plus its diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMatch<T> {
    /// The extracted value.
    pub value: T,
    /// The full matched span (marker, separator, and token).
    pub raw: String,
    /// Pattern occurrences seen in the whole text, including any skipped
    /// as malformed. Greater than 1 means the first-wins tie-break fired.
    pub candidates: usize,
}

/// Line-item extraction result: items in text order plus diagnostics.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LineItemMatches {
    /// One entry per accepted occurrence, in text order, duplicates kept.
    pub items: Vec<LineItem>,
    /// The span of the first accepted occurrence, if any.
    pub raw: Option<String>,
    /// Pattern occurrences seen, including ones skipped as malformed.
    pub candidates: usize,
}

// The patterns keep the shape of the ad hoc expressions this engine grew
// out of: lowercase markers (the text is already normalised), a mandatory
// colon-or-space separator, no word boundaries, no currency symbols.

static RE_INVOICE_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"invoice(?:\s*(?:no|number))?\s*[:\s]\s*([a-z0-9-]+)").unwrap());

static RE_DATE: Lazy<Regex> = Lazy::new(|| Regex::new(r"date\s*[:\s]\s*([0-9/-]+)").unwrap());

static RE_TOTAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(total|amount)\s*[:\s]\s*([\d,]+\.\d{2})").unwrap());

static RE_LINE_ITEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\w+)\s*(\d+)\s*x\s*([\d,]+\.\d{2})").unwrap());

/// Date-like shape: two or three numeric groups of 1–4 digits separated by
/// `/` or `-`. Shape only — `99/99/9999` passes.
static RE_DATE_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,4}(?:[/-]\d{1,4}){1,2}$").unwrap());

/// Extract the invoice number: `invoice`, an optional `no`/`number`
/// marker, a separator, then a token of letters, digits, and hyphens.
pub fn invoice_number(text: &RawText) -> Option<FieldMatch<String>> {
    let mut first: Option<(String, String)> = None;
    let mut candidates = 0;
    for caps in RE_INVOICE_NUMBER.captures_iter(text.as_str()) {
        candidates += 1;
        if first.is_none() {
            first = Some((caps[1].to_string(), caps[0].to_string()));
        }
    }
    first.map(|(value, raw)| FieldMatch {
        value,
        raw,
        candidates,
    })
}

/// Extract the raw date token following a `date` marker.
///
/// No calendar validation: any run of digits, `/`, and `-` is accepted as
/// the raw token. The returned [`InvoiceDate::date_like`] flag says only
/// whether the token has a date shape.
pub fn invoice_date(text: &RawText) -> Option<FieldMatch<InvoiceDate>> {
    let mut first: Option<(InvoiceDate, String)> = None;
    let mut candidates = 0;
    for caps in RE_DATE.captures_iter(text.as_str()) {
        candidates += 1;
        if first.is_none() {
            let token = caps[1].to_string();
            let date_like = RE_DATE_SHAPE.is_match(&token);
            first = Some((
                InvoiceDate {
                    raw: token,
                    date_like,
                },
                caps[0].to_string(),
            ));
        }
    }
    first.map(|(value, raw)| FieldMatch {
        value,
        raw,
        candidates,
    })
}

/// Extract the total: a `total` or `amount` marker, a separator, then a
/// decimal with exactly two fraction digits (thousands separators allowed).
///
/// If both keywords occur, the first left-to-right match wins and the
/// matched keyword is recorded. An occurrence whose number fails to parse
/// is skipped and the scan continues.
pub fn total_amount(text: &RawText) -> Option<FieldMatch<TotalAmount>> {
    let mut first: Option<(TotalAmount, String)> = None;
    let mut candidates = 0;
    for caps in RE_TOTAL.captures_iter(text.as_str()) {
        candidates += 1;
        if first.is_some() {
            continue;
        }
        match parse_price(&caps[2]) {
            Some(value) => {
                let keyword = match &caps[1] {
                    "total" => TotalKeyword::Total,
                    _ => TotalKeyword::Amount,
                };
                first = Some((TotalAmount { value, keyword }, caps[0].to_string()));
            }
            None => debug!(token = &caps[2], "skipping unparsable total candidate"),
        }
    }
    first.map(|(value, raw)| FieldMatch {
        value,
        raw,
        candidates,
    })
}

/// Extract line items: every `<name> <qty> x <price>` occurrence, in text
/// order, one item per occurrence even when name and price repeat.
///
/// Occurrences with an unparsable or zero quantity, or an unparsable
/// price, are skipped individually; later occurrences still match.
pub fn line_items(text: &RawText) -> LineItemMatches {
    let mut out = LineItemMatches::default();
    for caps in RE_LINE_ITEM.captures_iter(text.as_str()) {
        out.candidates += 1;
        let quantity = match caps[2].parse::<u32>() {
            Ok(q) if q > 0 => q,
            Ok(_) => {
                debug!(span = &caps[0], "skipping line item with zero quantity");
                continue;
            }
            Err(_) => {
                debug!(span = &caps[0], "skipping line item with unparsable quantity");
                continue;
            }
        };
        let unit_price = match parse_price(&caps[3]) {
            Some(p) => p,
            None => {
                debug!(span = &caps[0], "skipping line item with unparsable price");
                continue;
            }
        };
        if out.raw.is_none() {
            out.raw = Some(caps[0].to_string());
        }
        out.items.push(LineItem {
            name: caps[1].to_string(),
            quantity,
            unit_price,
        });
    }
    out
}

/// Parse a matched decimal token, dropping thousands separators.
fn parse_price(token: &str) -> Option<Decimal> {
    Decimal::from_str(&token.replace(',', "")).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::normalize::normalize;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    // ── invoice number ───────────────────────────────────────────────────

    #[test]
    fn invoice_number_with_no_marker() {
        let t = normalize("Invoice No: INV-2024-001");
        let m = invoice_number(&t).unwrap();
        assert_eq!(m.value, "inv-2024-001");
        assert_eq!(m.raw, "invoice no: inv-2024-001");
        assert_eq!(m.candidates, 1);
    }

    #[test]
    fn invoice_number_with_number_marker() {
        let t = normalize("INVOICE NUMBER 7781");
        assert_eq!(invoice_number(&t).unwrap().value, "7781");
    }

    #[test]
    fn invoice_number_without_marker() {
        let t = normalize("invoice: abc-123");
        assert_eq!(invoice_number(&t).unwrap().value, "abc-123");
    }

    #[test]
    fn invoice_number_first_match_wins() {
        let t = normalize("invoice no: first-1 invoice no: second-2");
        let m = invoice_number(&t).unwrap();
        assert_eq!(m.value, "first-1");
        assert_eq!(m.candidates, 2);
    }

    #[test]
    fn invoice_number_absent() {
        assert!(invoice_number(&normalize("no markers here")).is_none());
        assert!(invoice_number(&normalize("")).is_none());
    }

    // ── date ─────────────────────────────────────────────────────────────

    #[test]
    fn date_slash_format() {
        let t = normalize("Date: 2024/01/15");
        let m = invoice_date(&t).unwrap();
        assert_eq!(m.value.raw, "2024/01/15");
        assert!(m.value.date_like);
    }

    #[test]
    fn date_not_calendar_validated() {
        let t = normalize("date: 99/99/9999");
        let m = invoice_date(&t).unwrap();
        assert_eq!(m.value.raw, "99/99/9999");
        assert!(m.value.date_like, "shape check only, no calendar validation");
    }

    #[test]
    fn date_bare_number_is_not_date_like() {
        let t = normalize("date: 2024");
        let m = invoice_date(&t).unwrap();
        assert_eq!(m.value.raw, "2024");
        assert!(!m.value.date_like);
    }

    #[test]
    fn date_with_spaced_colon() {
        let t = normalize("date : 01-02-2024");
        assert_eq!(invoice_date(&t).unwrap().value.raw, "01-02-2024");
    }

    #[test]
    fn date_absent() {
        assert!(invoice_date(&normalize("total: 5.00")).is_none());
    }

    // ── total ────────────────────────────────────────────────────────────

    #[test]
    fn total_keyword_recorded() {
        let t = normalize("Total: 55.50");
        let m = total_amount(&t).unwrap();
        assert_eq!(m.value.value, dec("55.50"));
        assert_eq!(m.value.keyword, TotalKeyword::Total);
    }

    #[test]
    fn amount_keyword_recorded() {
        let t = normalize("Amount 1,234.56");
        let m = total_amount(&t).unwrap();
        assert_eq!(m.value.value, dec("1234.56"));
        assert_eq!(m.value.keyword, TotalKeyword::Amount);
    }

    #[test]
    fn total_first_left_to_right_wins() {
        let t = normalize("Amount: 10.00 subtotal stuff Total: 20.00");
        let m = total_amount(&t).unwrap();
        assert_eq!(m.value.value, dec("10.00"));
        assert_eq!(m.value.keyword, TotalKeyword::Amount);
        assert!(m.candidates >= 2);
    }

    #[test]
    fn total_requires_two_fraction_digits() {
        assert!(total_amount(&normalize("total: 55")).is_none());
        assert!(total_amount(&normalize("total: 55.5")).is_none());
    }

    #[test]
    fn total_skips_unparsable_candidate() {
        // 40 digits overflow Decimal; the later candidate must still win.
        let big = "9".repeat(40);
        let t = normalize(&format!("total: {big}.00 amount: 12.00"));
        let m = total_amount(&t).unwrap();
        assert_eq!(m.value.value, dec("12.00"));
        assert_eq!(m.value.keyword, TotalKeyword::Amount);
        assert_eq!(m.candidates, 2);
    }

    // ── line items ───────────────────────────────────────────────────────

    #[test]
    fn line_items_in_text_order() {
        let t = normalize("Widget 3 x 10.00 Gadget 1 x 25.50");
        let m = line_items(&t);
        assert_eq!(m.items.len(), 2);
        assert_eq!(m.items[0].name, "widget");
        assert_eq!(m.items[0].quantity, 3);
        assert_eq!(m.items[0].unit_price, dec("10.00"));
        assert_eq!(m.items[1].name, "gadget");
        assert_eq!(m.items[1].quantity, 1);
        assert_eq!(m.items[1].unit_price, dec("25.50"));
        assert_eq!(m.raw.as_deref(), Some("widget 3 x 10.00"));
    }

    #[test]
    fn line_items_keep_duplicates() {
        let t = normalize("pen 2 x 1.00 pen 2 x 1.00");
        let m = line_items(&t);
        assert_eq!(m.items.len(), 2);
        assert_eq!(m.items[0], m.items[1]);
    }

    #[test]
    fn line_items_empty_when_none() {
        let m = line_items(&normalize("just prose, no items"));
        assert!(m.items.is_empty());
        assert!(m.raw.is_none());
        assert_eq!(m.candidates, 0);
    }

    #[test]
    fn non_numeric_quantity_is_skipped() {
        // "widget x x 10.00" never matches the pattern; the valid item after
        // it still does.
        let t = normalize("Widget x x 10.00 Gadget 2 x 5.00");
        let m = line_items(&t);
        assert_eq!(m.items.len(), 1);
        assert_eq!(m.items[0].name, "gadget");
    }

    #[test]
    fn overflowing_quantity_is_skipped_not_fatal() {
        let t = normalize("bolt 99999999999999999999 x 1.00 nut 2 x 0.50");
        let m = line_items(&t);
        assert_eq!(m.items.len(), 1);
        assert_eq!(m.items[0].name, "nut");
        assert_eq!(m.candidates, 2);
    }

    #[test]
    fn zero_quantity_is_skipped() {
        let t = normalize("ghost 0 x 9.99 real 1 x 9.99");
        let m = line_items(&t);
        assert_eq!(m.items.len(), 1);
        assert_eq!(m.items[0].name, "real");
    }

    // ── independence ─────────────────────────────────────────────────────

    #[test]
    fn extractors_do_not_interfere() {
        let t = normalize("Invoice No: INV-1 Date: 1/2/2024 Pen 1 x 2.00 Total: 2.00");
        // Any call order produces the same results.
        let items_first = line_items(&t);
        let number = invoice_number(&t).unwrap();
        let date = invoice_date(&t).unwrap();
        let total = total_amount(&t).unwrap();
        let items_again = line_items(&t);
        assert_eq!(items_first, items_again);
        assert_eq!(number.value, "inv-1");
        assert_eq!(date.value.raw, "1/2/2024");
        assert_eq!(total.value.value, dec("2.00"));
    }
}
