//! Batch mode: process every supported image in a directory.
//!
//! ## Failure model
//!
//! One unreadable scan must not lose the other forty-nine. Each image is
//! processed independently; failures are recorded as non-fatal
//! [`ImageError`]s inside the per-image result, and the batch as a whole
//! fails only when *every* image failed. Callers decide their own
//! tolerance: abort on the first error, log and continue, or collect the
//! errors for a post-run report.
//!
//! Images run concurrently (`buffer_unordered`); results are re-sorted by
//! path so the output is deterministic regardless of completion order.

use crate::config::PipelineConfig;
use crate::error::{ImageError, Ocr2InvoiceError};
use crate::extract;
use crate::output::{BatchOutput, BatchStats, ImageResult, ProcessStats};
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::{input, llm, ocr, tidy};
use crate::process::{resolve_engine, resolve_provider};
use edgequake_llm::LLMProvider;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Process every supported image (png, jpg, jpeg, bmp, tiff) in `dir`.
///
/// # Errors
/// Fatal only: the directory is unreadable, contains no supported images,
/// no OCR engine or LLM provider could be resolved, or every single image
/// failed. Per-image failures otherwise land in
/// [`ImageResult::error`](crate::output::ImageResult).
pub async fn process_dir(
    dir: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<BatchOutput, Ocr2InvoiceError> {
    let total_start = Instant::now();
    let dir = dir.as_ref();

    let paths = discover_images(dir).await?;
    let total_images = paths.len();
    info!("Processing {} images from {}", total_images, dir.display());

    let engine = resolve_engine(config)?;
    let provider = resolve_provider(config)?;

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_start(total_images);
    }

    let mut results: Vec<ImageResult> = stream::iter(paths.into_iter().map(|path| {
        let engine = Arc::clone(&engine);
        let provider = Arc::clone(&provider);
        let config = config.clone();
        async move { process_image(path, &engine, &provider, &config, total_images).await }
    }))
    .buffer_unordered(config.concurrency)
    .collect()
    .await;

    // Completion order is nondeterministic; path order is not.
    results.sort_by(|a, b| a.path.cmp(&b.path));

    let processed = results.iter().filter(|r| r.error.is_none()).count();
    let failed = results.len() - processed;

    if processed == 0 {
        let first_error = results
            .iter()
            .find_map(|r| r.error.as_ref())
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(Ocr2InvoiceError::AllImagesFailed {
            total: results.len(),
            first_error,
        });
    }

    let stats = BatchStats {
        total_images,
        processed_images: processed,
        failed_images: failed,
        total_input_tokens: results.iter().map(|r| r.stats.input_tokens).sum(),
        total_output_tokens: results.iter().map(|r| r.stats.output_tokens).sum(),
        total_duration_ms: total_start.elapsed().as_millis() as u64,
    };

    info!(
        "Batch complete: {}/{} images in {}ms",
        processed, total_images, stats.total_duration_ms
    );

    if let Some(ref cb) = config.progress_callback {
        cb.on_batch_complete(total_images, processed);
    }

    Ok(BatchOutput { results, stats })
}

/// List the supported images in `dir`, sorted by path.
async fn discover_images(dir: &Path) -> Result<Vec<PathBuf>, Ocr2InvoiceError> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => Ocr2InvoiceError::FileNotFound {
            path: dir.to_path_buf(),
        },
        std::io::ErrorKind::PermissionDenied => Ocr2InvoiceError::PermissionDenied {
            path: dir.to_path_buf(),
        },
        _ => Ocr2InvoiceError::Internal(format!("read dir {}: {}", dir.display(), e)),
    })?;

    let mut paths = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| Ocr2InvoiceError::Internal(format!("read dir entry: {}", e)))?
    {
        let path = entry.path();
        if path.is_file() && input::has_supported_extension(&path) {
            paths.push(path);
        }
    }

    if paths.is_empty() {
        return Err(Ocr2InvoiceError::NoImagesFound {
            dir: dir.to_path_buf(),
        });
    }

    paths.sort();
    Ok(paths)
}

/// Process one image, converting failures into a non-fatal result.
async fn process_image(
    path: PathBuf,
    engine: &Arc<dyn OcrEngine>,
    provider: &Arc<dyn LLMProvider>,
    config: &PipelineConfig,
    total_images: usize,
) -> ImageResult {
    let start = Instant::now();
    if let Some(ref cb) = config.progress_callback {
        cb.on_image_start(&path, total_images);
    }

    // ── OCR ──────────────────────────────────────────────────────────────
    let ocr_start = Instant::now();
    let text = match ocr::recognize_file(Arc::clone(engine), &path).await {
        Ok(t) => t,
        Err(e) => {
            warn!("Skipping {}: {}", path.display(), e);
            let error = ImageError::Ocr {
                path: path.display().to_string(),
                detail: e.to_string(),
            };
            if let Some(ref cb) = config.progress_callback {
                cb.on_image_error(&path, total_images, error.to_string());
            }
            return ImageResult::failed(path, error);
        }
    };
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;

    // ── Extract ──────────────────────────────────────────────────────────
    let raw = extract::normalize(&text);
    let (record, report) = extract::assemble(&raw);

    // ── Summarise ────────────────────────────────────────────────────────
    let summary = match llm::summarise(provider, &record, config).await {
        Ok(s) => s,
        Err(e) => {
            warn!("Summary failed for {}: {}", path.display(), e);
            let error = ImageError::Summary {
                path: path.display().to_string(),
                retries: config.max_retries,
                detail: e.to_string(),
            };
            if let Some(ref cb) = config.progress_callback {
                cb.on_image_error(&path, total_images, error.to_string());
            }
            return ImageResult::failed(path, error);
        }
    };

    let summary_text = tidy::clean_summary(&summary.text);

    if let Some(ref cb) = config.progress_callback {
        cb.on_image_complete(&path, total_images, summary_text.len());
    }

    ImageResult {
        path,
        raw_text: raw.into_inner(),
        record,
        report,
        summary: summary_text,
        stats: ProcessStats {
            ocr_duration_ms,
            llm_duration_ms: summary.duration_ms,
            total_duration_ms: start.elapsed().as_millis() as u64,
            input_tokens: summary.input_tokens,
            output_tokens: summary.output_tokens,
            retries: summary.retries,
        },
        error: None,
    }
}
