//! Error types for the ocr2invoice library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`Ocr2InvoiceError`] — **Fatal**: the pipeline cannot proceed at all
//!   (bad input file, unsupported image format, provider not configured).
//!   Returned as `Err(Ocr2InvoiceError)` from the top-level `process*`
//!   functions.
//!
//! * [`ImageError`] — **Non-fatal**: a single image in a batch failed (OCR
//!   glitch, transient API error) but the other images are fine. Stored
//!   inside [`crate::output::ImageResult`] so callers can inspect partial
//!   success rather than losing the whole batch to one bad scan.
//!
//! Note what is *not* here: a field that was not found in the text is a
//! normal outcome (`None` in the record), and a matched substring that
//! fails numeric parsing is skipped locally by the extractor. The
//! extraction core never produces an error.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the ocr2invoice library.
///
/// Per-image failures in batch mode use [`ImageError`] and are stored in
/// [`crate::output::ImageResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum Ocr2InvoiceError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("Image file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input string is not a valid file path or URL.
    #[error("Invalid input '{input}': not a file path or a valid HTTP/HTTPS URL")]
    InvalidInput { input: String },

    /// HTTP URL was syntactically valid but download failed.
    #[error("Failed to download '{url}': {reason}\nCheck your internet connection.")]
    DownloadFailed { url: String, reason: String },

    /// Download exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'\nIncrease --download-timeout.")]
    DownloadTimeout { url: String, secs: u64 },

    /// The file exists and was read, but is not a supported image format.
    #[error(
        "File is not a supported image (PNG, JPEG, BMP, TIFF): '{path}'\nFirst bytes: {magic:?}"
    )]
    UnsupportedFormat { path: PathBuf, magic: [u8; 4] },

    // ── OCR errors ────────────────────────────────────────────────────────
    /// The image bytes could not be decoded.
    #[error("Failed to decode image '{path}': {detail}")]
    DecodeFailed { path: PathBuf, detail: String },

    /// The OCR engine failed to produce text.
    #[error("OCR failed: {detail}")]
    OcrFailed { detail: String },

    /// No OCR engine is available.
    #[error(
        "No OCR engine available.\n\
         Build with the `tesseract` feature (requires the tesseract and \
         leptonica system libraries), or inject an engine via \
         PipelineConfig::builder().ocr_engine(...)."
    )]
    OcrNotAvailable,

    // ── Batch errors ──────────────────────────────────────────────────────
    /// The directory contains no files with a supported image extension.
    #[error("No supported images (png, jpg, jpeg, bmp, tiff) found in '{dir}'")]
    NoImagesFound { dir: PathBuf },

    /// Every image in the batch failed; there is no output at all.
    #[error("All {total} images failed.\nFirst error: {first_error}")]
    AllImagesFailed { total: usize, first_error: String },

    // ── LLM errors ────────────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The summary call failed after all retries.
    #[error("Invoice summary failed after {retries} retries: {detail}")]
    SummaryFailed { retries: u32, detail: String },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write the output file.
    #[error("Failed to write output file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single image in a batch.
///
/// Stored alongside [`crate::output::ImageResult`] when an image fails.
/// The overall batch continues unless ALL images fail.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum ImageError {
    /// Reading, decoding, or recognising the image failed.
    #[error("{path}: OCR failed: {detail}")]
    Ocr { path: String, detail: String },

    /// The summary call failed after retries.
    #[error("{path}: summary failed after {retries} retries: {detail}")]
    Summary {
        path: String,
        retries: u32,
        detail: String,
    },
}
