//! Text normalisation: canonicalise raw OCR output before field extraction.
//!
//! OCR engines emit text with arbitrary casing, line breaks, and runs of
//! spaces that depend on page layout rather than content. Every field
//! pattern downstream is written against one canonical form — lowercase,
//! single-space separated — so normalisation happens exactly once, here,
//! instead of being re-implemented inside each pattern.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalised OCR text: lowercase, whitespace runs collapsed to single
/// ASCII spaces, no leading or trailing whitespace.
///
/// Immutable once produced — the field extractors borrow it and cannot
/// change it. Construct via [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawText(String);

impl RawText {
    /// Borrow the normalised text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the wrapper and return the normalised string.
    pub fn into_inner(self) -> String {
        self.0
    }

    /// True when normalisation produced no text at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RawText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Normalise raw OCR output into [`RawText`].
///
/// Lower-cases all characters, splits on any whitespace run (spaces, tabs,
/// newlines) and rejoins with single ASCII spaces. Total: never fails, for
/// any input including the empty string. Idempotent: normalising already
/// normalised text is a no-op.
pub fn normalize(raw: &str) -> RawText {
    let collapsed = raw
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    RawText(collapsed)
}
