//! Prompts for LLM-based invoice summarisation.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth** — changing the default behaviour (e.g.
//!    tweaking how absent fields are described) requires editing exactly
//!    one place.
//!
//! 2. **Testability** — unit tests can inspect the generated request text
//!    directly without spinning up a real LLM, making prompt regressions
//!    easy to catch.
//!
//! Callers can override the system prompt via
//! [`crate::config::PipelineConfig::system_prompt`]; the constant here is
//! used only when no override is provided.

use crate::extract::InvoiceRecord;
use std::fmt::Write as _;

/// Default system prompt for summarising an extracted invoice record.
///
/// This prompt is used when `PipelineConfig::system_prompt` is `None`.
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an expert accounts assistant. Your task is to write a clear, professional summary of an invoice from its extracted fields.

Follow these rules precisely:

1. FAITHFULNESS
   - Use ONLY the field values provided
   - Never invent, correct, or estimate invoice numbers, dates, or amounts
   - Quote numbers exactly as given, including their formatting

2. MISSING FIELDS
   - Fields marked "not detected" were absent from the scanned document
   - Say so plainly ("no invoice number was detected"); do not guess a value

3. LINE ITEMS
   - Mention each item with its quantity and unit price
   - If an item list and a total are both present, do not recompute or
     dispute the total

4. OUTPUT FORMAT
   - Output plain prose, a short paragraph or two
   - Do NOT wrap the output in code fences
   - Do NOT add headings, commentary, or disclaimers
   - Start directly with the summary"#;

/// Build the user request containing the extracted fields.
///
/// Absent fields are rendered as `not detected` in the prompt text only —
/// the record itself keeps its `Option` representation. The layout mirrors
/// the block a human clerk would read: number, date, items, total.
pub fn summary_request(record: &InvoiceRecord) -> String {
    let mut out = String::from(
        "Generate a detailed invoice summary based on the following information:\n\n",
    );

    match &record.invoice_number {
        Some(n) => writeln!(out, "Invoice Number: {}", n).unwrap(),
        None => out.push_str("Invoice Number: not detected\n"),
    }

    match &record.date {
        Some(d) if d.date_like => writeln!(out, "Date: {}", d.raw).unwrap(),
        Some(d) => writeln!(out, "Date: {} (unrecognised shape)", d.raw).unwrap(),
        None => out.push_str("Date: not detected\n"),
    }

    if record.line_items.is_empty() {
        out.push_str("Items: none detected\n");
    } else {
        out.push_str("Items:\n");
        for item in &record.line_items {
            writeln!(out, "  {}: {} x {}", item.name, item.quantity, item.unit_price).unwrap();
        }
    }

    match &record.total {
        Some(t) => writeln!(out, "Total Amount: {} (matched keyword: {})", t.value, t.keyword)
            .unwrap(),
        None => out.push_str("Total Amount: not detected\n"),
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::{assemble, normalize};

    #[test]
    fn request_for_full_record() {
        let (record, _) = assemble(&normalize(
            "Invoice No: INV-2024-001 Date: 2024/01/15 Widget 3 x 10.00 Total: 30.00",
        ));
        let req = summary_request(&record);
        assert!(req.contains("Invoice Number: inv-2024-001"));
        assert!(req.contains("Date: 2024/01/15"));
        assert!(req.contains("  widget: 3 x 10.00"));
        assert!(req.contains("Total Amount: 30.00 (matched keyword: total)"));
        assert!(!req.contains("not detected"));
    }

    #[test]
    fn request_marks_absent_fields() {
        let (record, _) = assemble(&normalize("nothing useful here"));
        let req = summary_request(&record);
        assert!(req.contains("Invoice Number: not detected"));
        assert!(req.contains("Date: not detected"));
        assert!(req.contains("Items: none detected"));
        assert!(req.contains("Total Amount: not detected"));
    }

    #[test]
    fn request_flags_odd_date_shapes() {
        let (record, _) = assemble(&normalize("date: 2024"));
        let req = summary_request(&record);
        assert!(req.contains("Date: 2024 (unrecognised shape)"));
    }

    #[test]
    fn system_prompt_forbids_fences() {
        assert!(DEFAULT_SYSTEM_PROMPT.contains("code fences"));
    }
}
