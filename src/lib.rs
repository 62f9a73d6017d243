//! # ocr2invoice
//!
//! Extract structured invoice records from scanned images and summarise
//! them with LLMs.
//!
//! ## Why this crate?
//!
//! Scanned invoices arrive as pixels. OCR gets you a wall of raggedly
//! cased, unevenly spaced text; what callers actually want is the invoice
//! number, the date, the line items, and the total — plus an honest
//! account of which of those were actually found. This crate normalises
//! the OCR output, runs independent per-field pattern matchers over it,
//! assembles an [`InvoiceRecord`] in which absence is an explicit `None`
//! (never an `"N/A"` sentinel), and optionally asks an LLM for a
//! human-readable summary of the result.
//!
//! ## Pipeline Overview
//!
//! ```text
//! image (file / URL / directory)
//!  │
//!  ├─ 1. Input      resolve local file or download from URL
//!  ├─ 2. OCR        decode + recognise text (tesseract, spawn_blocking)
//!  ├─ 3. Normalise  lowercase, collapse whitespace
//!  ├─ 4. Extract    per-field matchers → InvoiceRecord + ExtractionReport
//!  ├─ 5. Summarise  LLM call (gpt-4.1-nano / claude / gemini / …)
//!  └─ 6. Tidy       deterministic cleanup of the model output
//! ```
//!
//! Steps 3–4 are the pure core in [`extract`]: synchronous, deterministic,
//! total on any input, and exported directly for callers that already have
//! text. Everything else is a collaborator with a narrow interface.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ocr2invoice::{process, PipelineConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / …
//!     let config = PipelineConfig::default();
//!     let output = process("scans/invoice-042.png", &config).await?;
//!     println!("{}", output.summary);
//!     for (name, field) in output.report.fields() {
//!         eprintln!("{name}: found={}", field.found);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Extraction without an API key:
//!
//! ```rust
//! use ocr2invoice::extract::{assemble, normalize};
//!
//! let text = normalize("Invoice No: INV-2024-001 Total: 55.50");
//! let (record, report) = assemble(&text);
//! assert_eq!(record.invoice_number.as_deref(), Some("inv-2024-001"));
//! assert!(report.total_amount.found);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature     | Default | Description |
//! |-------------|---------|-------------|
//! | `cli`       | on      | Enables the `ocr2invoice` binary (clap + anyhow + indicatif) |
//! | `tesseract` | on      | Builds the leptess OCR backend (needs tesseract + leptonica system libraries) |
//!
//! Without `tesseract`, inject any [`OcrEngine`] — including
//! [`FixedTextEngine`] when the text is already known:
//! ```toml
//! ocr2invoice = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod error;
pub mod extract;
pub mod output;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::process_dir;
pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::{ImageError, Ocr2InvoiceError};
pub use extract::{
    ExtractionReport, FieldReport, InvoiceDate, InvoiceRecord, LineItem, RawText, TotalAmount,
    TotalKeyword,
};
pub use output::{BatchOutput, BatchStats, ExtractOutput, ImageResult, ProcessOutput, ProcessStats};
pub use pipeline::ocr::{FixedTextEngine, OcrEngine};
#[cfg(feature = "tesseract")]
pub use pipeline::ocr::TesseractEngine;
pub use process::{extract_only, process, process_from_bytes, process_sync, process_to_file};
pub use progress::{BatchProgressCallback, NoopProgressCallback, ProgressCallback};
