//! Invoice-field extraction: normalised text in, structured record out.
//!
//! This is the pure core of the crate. Everything else — image decoding,
//! OCR, the LLM call, the CLI — is a collaborator around these four steps:
//!
//! ```text
//! raw OCR text ──▶ normalize ──▶ field extractors ──▶ assemble
//!                  (RawText)     (independent,         (InvoiceRecord +
//!                                 order-insensitive)    ExtractionReport)
//! ```
//!
//! Every function here is synchronous, deterministic, and total: any
//! input string, including empty or adversarial text, yields a valid
//! record and report. Missing fields are `None`/empty, never a sentinel
//! string. Concurrent calls never interact — there is no shared state.

pub mod assemble;
pub mod fields;
pub mod normalize;
pub mod record;

pub use assemble::assemble;
pub use fields::{FieldMatch, LineItemMatches};
pub use normalize::{normalize, RawText};
pub use record::{
    ExtractionReport, FieldReport, InvoiceDate, InvoiceRecord, LineItem, TotalAmount, TotalKeyword,
};
