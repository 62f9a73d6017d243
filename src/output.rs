//! Output types: what the pipeline hands back to callers.
//!
//! Everything here is serde-serialisable so `--json` output and
//! programmatic consumers (summary display, storage, further analysis)
//! work off the same structures.

use crate::error::ImageError;
use crate::extract::{ExtractionReport, InvoiceRecord};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Result of processing a single invoice image end to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessOutput {
    /// Normalised OCR text the extraction ran on.
    pub raw_text: String,
    /// The assembled invoice record.
    pub record: InvoiceRecord,
    /// Which fields were found, with raw matches and ambiguity counts.
    pub report: ExtractionReport,
    /// The LLM-generated summary, tidied.
    pub summary: String,
    /// Timing and token accounting.
    pub stats: ProcessStats,
}

/// Result of OCR + extraction without the LLM stage.
///
/// Returned by [`crate::process::extract_only`], which needs no provider
/// or API key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractOutput {
    /// Normalised OCR text the extraction ran on.
    pub raw_text: String,
    pub record: InvoiceRecord,
    pub report: ExtractionReport,
}

/// Timing and token accounting for a single image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessStats {
    /// Wall-clock time spent reading, decoding, and recognising the image.
    pub ocr_duration_ms: u64,
    /// Wall-clock time spent in the LLM call (including retries).
    pub llm_duration_ms: u64,
    /// End-to-end wall-clock time.
    pub total_duration_ms: u64,
    /// Prompt tokens consumed by the summary call.
    pub input_tokens: u64,
    /// Completion tokens produced by the summary call.
    pub output_tokens: u64,
    /// Retries the summary call needed before succeeding.
    pub retries: u32,
}

/// Per-image result in a batch run.
///
/// When `error` is `Some`, the remaining fields hold their defaults
/// (empty text, all-absent record) — check the error before reading them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResult {
    /// Path of the processed image.
    pub path: PathBuf,
    pub raw_text: String,
    pub record: InvoiceRecord,
    pub report: ExtractionReport,
    pub summary: String,
    pub stats: ProcessStats,
    /// Set when this image failed; the batch as a whole continues.
    pub error: Option<ImageError>,
}

impl ImageResult {
    /// A failed result carrying only the path and the error.
    pub(crate) fn failed(path: PathBuf, error: ImageError) -> Self {
        Self {
            path,
            raw_text: String::new(),
            record: InvoiceRecord::default(),
            report: ExtractionReport::default(),
            summary: String::new(),
            stats: ProcessStats::default(),
            error: Some(error),
        }
    }
}

/// Result of a batch run over a directory of images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    /// One entry per discovered image, sorted by path.
    pub results: Vec<ImageResult>,
    pub stats: BatchStats,
}

/// Aggregate accounting for a batch run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// Images discovered in the directory.
    pub total_images: usize,
    /// Images that produced a summary.
    pub processed_images: usize,
    /// Images that failed (see the per-image errors).
    pub failed_images: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failed_image_result_has_defaults() {
        let r = ImageResult::failed(
            PathBuf::from("a.png"),
            ImageError::Ocr {
                path: "a.png".into(),
                detail: "boom".into(),
            },
        );
        assert!(r.error.is_some());
        assert!(r.summary.is_empty());
        assert!(r.record.is_empty());
        assert!(r.report.all_absent());
    }

    #[test]
    fn process_output_round_trips_through_json() {
        let out = ProcessOutput {
            raw_text: "invoice no: x-1 total: 9.99".into(),
            record: InvoiceRecord::default(),
            report: ExtractionReport::default(),
            summary: "A short summary.\n".into(),
            stats: ProcessStats {
                ocr_duration_ms: 12,
                llm_duration_ms: 340,
                total_duration_ms: 355,
                input_tokens: 120,
                output_tokens: 80,
                retries: 0,
            },
        };
        let json = serde_json::to_string_pretty(&out).unwrap();
        let back: ProcessOutput = serde_json::from_str(&json).unwrap();
        assert_eq!(back.raw_text, out.raw_text);
        assert_eq!(back.stats.llm_duration_ms, 340);
    }
}
