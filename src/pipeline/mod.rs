//! Pipeline stages around the extraction core.
//!
//! Each submodule implements exactly one transformation step. Keeping
//! stages separate makes each independently testable and lets us swap
//! implementations (e.g. a different OCR backend) without touching other
//! stages.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ ocr ──▶ extract ──▶ llm ──▶ tidy
//! (URL/path) (text)  (record)   (summary) (cleanup)
//! ```
//!
//! 1. [`input`] — canonicalise the user-supplied path or URL to a local
//!    image file and reject unsupported formats early
//! 2. [`ocr`]   — decode the image and recognise text; runs in
//!    `spawn_blocking` because recognition is CPU-bound
//! 3. [`crate::extract`] — the pure core: normalise, match fields, assemble
//! 4. [`llm`]   — drive the summary call with retry/backoff; the only
//!    stage with network I/O
//! 5. [`tidy`]  — deterministic text-cleanup rules to fix model quirks
//!    (code fences, stray blank lines, invisible characters)

pub mod input;
pub mod llm;
pub mod ocr;
pub mod tidy;
