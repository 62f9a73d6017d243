//! Tidy: deterministic cleanup of LLM-generated summary text.
//!
//! Even well-prompted models occasionally introduce artefacts that are
//! harmless to a chat UI but ugly in a saved text file:
//!
//! - Wrapping the whole answer in ` ``` ` fences despite the prompt
//!   saying "do not wrap in fences"
//! - Windows-style `\r\n` line endings
//! - Trailing spaces and runs of blank lines
//! - Invisible Unicode (zero-width spaces, BOM, soft hyphens)
//!
//! These rules are cheap, pure string passes applied in a fixed order:
//! fences are stripped before line handling so the fence detector sees the
//! raw shape, and the final-newline pass always runs last. Keeping the
//! cleanup here rather than in the prompt means the prompt stays focused
//! on *what to say*, not on formatting edge-cases.

use once_cell::sync::Lazy;
use regex::Regex;

/// Apply all cleanup rules to the raw model output.
///
/// Rules (applied in order):
/// 1. Strip outer code fences (models sometimes disobey the prompt)
/// 2. Normalise line endings (CRLF → LF)
/// 3. Trim trailing whitespace per line
/// 4. Collapse 2+ consecutive blank lines down to 1
/// 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens, etc.)
/// 6. Ensure the text ends with exactly one newline
pub fn clean_summary(input: &str) -> String {
    let s = strip_fences(input);
    let s = normalise_line_endings(&s);
    let s = trim_trailing_whitespace(&s);
    let s = collapse_blank_lines(&s);
    let s = remove_invisible_chars(&s);
    ensure_final_newline(&s)
}

// ── Rule 1: Strip outer code fences ──────────────────────────────────────────

static RE_OUTER_FENCES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:text|markdown)?\n(.*)\n```\s*$").unwrap());

fn strip_fences(input: &str) -> String {
    if let Some(caps) = RE_OUTER_FENCES.captures(input.trim()) {
        caps[1].to_string()
    } else {
        input.to_string()
    }
}

// ── Rule 2: Normalise line endings ───────────────────────────────────────────

fn normalise_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: Trim trailing whitespace per line ────────────────────────────────

fn trim_trailing_whitespace(input: &str) -> String {
    input
        .lines()
        .map(|line| line.trim_end())
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: Collapse excessive blank lines ───────────────────────────────────

static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_lines(input: &str) -> String {
    RE_BLANK_LINES.replace_all(input, "\n\n").to_string()
}

// ── Rule 5: Remove invisible Unicode characters ──────────────────────────────

fn remove_invisible_chars(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{FEFF}', '\u{00AD}', '\u{200C}', '\u{200D}', '\u{2060}',
        ],
        "",
    )
}

// ── Rule 6: Ensure text ends with single newline ─────────────────────────────

fn ensure_final_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{}\n", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_fences() {
        let input = "```text\nThe invoice totals 55.50.\n```";
        assert_eq!(strip_fences(input), "The invoice totals 55.50.");
    }

    #[test]
    fn test_strip_fences_no_lang() {
        let input = "```\nSummary here\n```";
        assert_eq!(strip_fences(input), "Summary here");
    }

    #[test]
    fn test_no_fences_passthrough() {
        let input = "Plain summary.";
        assert_eq!(strip_fences(input), "Plain summary.");
    }

    #[test]
    fn test_normalise_line_endings() {
        assert_eq!(normalise_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn test_trim_trailing_whitespace() {
        assert_eq!(
            trim_trailing_whitespace("  hello   \nworld  "),
            "  hello\nworld"
        );
    }

    #[test]
    fn test_collapse_blank_lines() {
        assert_eq!(collapse_blank_lines("a\n\n\n\n\nb"), "a\n\nb");
    }

    #[test]
    fn test_remove_invisible() {
        let input = "hello\u{200B}world\u{FEFF}foo\u{00AD}bar";
        assert_eq!(remove_invisible_chars(input), "helloworldfoobar");
    }

    #[test]
    fn test_ensure_final_newline() {
        assert_eq!(ensure_final_newline("hello"), "hello\n");
        assert_eq!(ensure_final_newline("hello\n\n\n"), "hello\n");
        assert_eq!(ensure_final_newline(""), "\n");
    }

    #[test]
    fn test_clean_summary_full_pipeline() {
        let input = "```text\nInvoice INV-1 totals 55.50.\r\n\r\n\r\n\r\nTwo items were listed.   \n```";
        let result = clean_summary(input);
        assert!(result.starts_with("Invoice INV-1"));
        assert!(result.ends_with(".\n"));
        assert!(!result.contains("```"));
        assert!(!result.contains("\n\n\n"));
        assert!(!result.contains("\r"));
    }

    #[test]
    fn clean_summary_is_idempotent() {
        let once = clean_summary("Some   summary\n\n\nwith gaps\n");
        assert_eq!(clean_summary(&once), once);
    }
}
