//! Single-image entry points.
//!
//! This module provides the simplest API: one image in, one summarised
//! invoice out. Use [`crate::batch::process_dir`] for directories of
//! scans, and [`extract_only`] when only the structured record is wanted
//! (no LLM provider or API key required).

use crate::config::PipelineConfig;
use crate::error::Ocr2InvoiceError;
use crate::extract;
use crate::output::{ExtractOutput, ProcessOutput, ProcessStats};
use crate::pipeline::ocr::OcrEngine;
use crate::pipeline::{input, llm, ocr, tidy};
use edgequake_llm::{LLMProvider, ProviderFactory};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Process one invoice image (file path or HTTP/HTTPS URL) end to end.
///
/// This is the primary entry point for the library: OCR, field
/// extraction, LLM summarisation, and output cleanup in one call.
///
/// # Errors
/// Returns `Err(Ocr2InvoiceError)` for fatal conditions only:
/// - File not found / permission denied / unsupported format
/// - No OCR engine available
/// - No LLM provider configured, or the summary call exhausted retries
///
/// A scan in which no field matched is NOT an error — the record comes
/// back with every field absent, and the report says so.
pub async fn process(
    input_str: impl AsRef<str>,
    config: &PipelineConfig,
) -> Result<ProcessOutput, Ocr2InvoiceError> {
    let total_start = Instant::now();
    let input_str = input_str.as_ref();
    info!("Starting invoice processing: {}", input_str);

    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let engine = resolve_engine(config)?;
    let provider = resolve_provider(config)?;

    run_pipeline(resolved.path(), &engine, &provider, config, total_start).await
}

/// OCR + extraction without the LLM stage.
///
/// Needs no provider or API key; useful for inspecting what the pattern
/// matchers see before paying for a summary.
pub async fn extract_only(
    input_str: impl AsRef<str>,
    config: &PipelineConfig,
) -> Result<ExtractOutput, Ocr2InvoiceError> {
    let input_str = input_str.as_ref();
    let resolved = input::resolve_input(input_str, config.download_timeout_secs).await?;
    let engine = resolve_engine(config)?;

    let text = ocr::recognize_file(engine, resolved.path()).await?;
    let raw = extract::normalize(&text);
    let (record, report) = extract::assemble(&raw);

    info!(
        "Extraction only: {} of 4 fields found in {}",
        report.fields().iter().filter(|(_, f)| f.found).count(),
        input_str
    );

    Ok(ExtractOutput {
        raw_text: raw.into_inner(),
        record,
        report,
    })
}

/// Process an image and write the summary directly to a file.
///
/// Uses atomic write (temp file + rename) to prevent partial files.
pub async fn process_to_file(
    input_str: impl AsRef<str>,
    output_path: impl AsRef<Path>,
    config: &PipelineConfig,
) -> Result<ProcessStats, Ocr2InvoiceError> {
    let output = process(input_str, config).await?;
    let path = output_path.as_ref();

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Ocr2InvoiceError::OutputWriteFailed {
                path: path.to_path_buf(),
                source: e,
            })?;
    }

    let tmp_path = path.with_extension("txt.tmp");
    tokio::fs::write(&tmp_path, &output.summary)
        .await
        .map_err(|e| Ocr2InvoiceError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| Ocr2InvoiceError::OutputWriteFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(output.stats)
}

/// Synchronous wrapper around [`process`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_sync(
    input_str: impl AsRef<str>,
    config: &PipelineConfig,
) -> Result<ProcessOutput, Ocr2InvoiceError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| Ocr2InvoiceError::Internal(format!("Failed to create tokio runtime: {}", e)))?
        .block_on(process(input_str, config))
}

/// Process in-memory image bytes.
///
/// Avoids the need for the caller to create a temporary file; the library
/// writes `bytes` to a managed [`tempfile`] and cleans it up automatically
/// on return or panic. Recommended when image data comes from a database,
/// upload, or network stream rather than a file on disk.
pub async fn process_from_bytes(
    bytes: &[u8],
    config: &PipelineConfig,
) -> Result<ProcessOutput, Ocr2InvoiceError> {
    let mut tmp = tempfile::NamedTempFile::new()
        .map_err(|e| Ocr2InvoiceError::Internal(format!("tempfile: {e}")))?;
    tmp.write_all(bytes)
        .map_err(|e| Ocr2InvoiceError::Internal(format!("tempfile write: {e}")))?;
    let path = tmp.path().to_string_lossy().to_string();
    // `tmp` is dropped (and the file deleted) when `process` returns
    process(&path, config).await
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Drive the per-image stages: OCR → extract → summarise → tidy.
///
/// Shared with batch mode, which resolves the engine and provider once
/// per run instead of once per image.
pub(crate) async fn run_pipeline(
    path: &Path,
    engine: &Arc<dyn OcrEngine>,
    provider: &Arc<dyn LLMProvider>,
    config: &PipelineConfig,
    total_start: Instant,
) -> Result<ProcessOutput, Ocr2InvoiceError> {
    // ── OCR ──────────────────────────────────────────────────────────────
    let ocr_start = Instant::now();
    let text = ocr::recognize_file(Arc::clone(engine), path).await?;
    let ocr_duration_ms = ocr_start.elapsed().as_millis() as u64;

    // ── Extract ──────────────────────────────────────────────────────────
    let raw = extract::normalize(&text);
    let (record, report) = extract::assemble(&raw);
    info!(
        "Extracted {} of 4 fields, {} line items",
        report.fields().iter().filter(|(_, f)| f.found).count(),
        record.line_items.len()
    );

    // ── Summarise ────────────────────────────────────────────────────────
    let summary = llm::summarise(provider, &record, config).await?;
    let summary_text = tidy::clean_summary(&summary.text);

    let stats = ProcessStats {
        ocr_duration_ms,
        llm_duration_ms: summary.duration_ms,
        total_duration_ms: total_start.elapsed().as_millis() as u64,
        input_tokens: summary.input_tokens,
        output_tokens: summary.output_tokens,
        retries: summary.retries,
    };

    info!(
        "Processed {} in {}ms ({} tokens in / {} out)",
        path.display(),
        stats.total_duration_ms,
        stats.input_tokens,
        stats.output_tokens
    );

    Ok(ProcessOutput {
        raw_text: raw.into_inner(),
        record,
        report,
        summary: summary_text,
        stats,
    })
}

/// Resolve the OCR engine: injected engine first, then the built-in
/// tesseract backend when the feature is compiled in.
pub(crate) fn resolve_engine(
    config: &PipelineConfig,
) -> Result<Arc<dyn OcrEngine>, Ocr2InvoiceError> {
    if let Some(ref engine) = config.ocr_engine {
        return Ok(Arc::clone(engine));
    }

    #[cfg(feature = "tesseract")]
    {
        Ok(Arc::new(crate::pipeline::ocr::TesseractEngine::new(
            config.tessdata_dir.as_deref(),
            &config.ocr_lang,
        )))
    }

    #[cfg(not(feature = "tesseract"))]
    {
        Err(Ocr2InvoiceError::OcrNotAvailable)
    }
}

/// Instantiate a named provider with the given model.
fn create_provider(
    provider_name: &str,
    model: &str,
) -> Result<Arc<dyn LLMProvider>, Ocr2InvoiceError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        Ocr2InvoiceError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// The four-level fallback chain lets library users and CLI users each set
/// exactly as much or as little as they need:
///
/// 1. **Pre-built provider** (`config.provider`) — the caller constructed
///    and configured the provider entirely; we use it as-is. Useful in
///    tests or when the caller needs custom middleware.
///
/// 2. **Named provider + model** (`config.provider_name`) — we call
///    [`ProviderFactory::create_llm_provider`] which reads the
///    corresponding API key (`OPENAI_API_KEY`, etc.) from the environment.
///
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`)
///    — both set means the execution environment chose; checked before
///    full auto-detection so the model choice is honoured even when
///    multiple API keys are present.
///
/// 4. **Full auto-detection** (`ProviderFactory::from_env`) — the factory
///    scans all known API key variables and picks the first available
///    provider, with OpenAI preferred when its key is present.
pub(crate) fn resolve_provider(
    config: &PipelineConfig,
) -> Result<Arc<dyn LLMProvider>, Ocr2InvoiceError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    if let Some(ref name) = config.provider_name {
        let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !model.is_empty() {
            return create_provider(&prov, &model);
        }
    }

    // Prefer OpenAI explicitly when an OpenAI API key is present, so users
    // with multiple provider keys get a predictable default.
    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            let model = config.model.as_deref().unwrap_or("gpt-4.1-nano");
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| Ocr2InvoiceError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                 Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                 Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::ocr::FixedTextEngine;

    #[test]
    fn injected_engine_takes_precedence() {
        let config = PipelineConfig::builder()
            .ocr_engine(Arc::new(FixedTextEngine::new("total: 1.00")))
            .build()
            .unwrap();
        let engine = resolve_engine(&config).unwrap();
        assert_eq!(engine.recognize(b"").unwrap(), "total: 1.00");
    }

    #[cfg(not(feature = "tesseract"))]
    #[test]
    fn missing_engine_is_reported_without_tesseract() {
        let config = PipelineConfig::default();
        assert!(matches!(
            resolve_engine(&config),
            Err(Ocr2InvoiceError::OcrNotAvailable)
        ));
    }
}
