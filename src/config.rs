//! Configuration for the invoice pipeline.
//!
//! All behaviour is controlled through [`PipelineConfig`], built via its
//! [`PipelineConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across tasks and to diff two runs to
//! understand why their outputs differ.

use crate::error::Ocr2InvoiceError;
use crate::pipeline::ocr::OcrEngine;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for invoice extraction and summarisation.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use ocr2invoice::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .ocr_lang("eng")
///     .concurrency(4)
///     .model("gpt-4.1-nano")
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Tesseract language code for the OCR stage. Default: `"eng"`.
    pub ocr_lang: String,

    /// Directory containing tesseract `*.traineddata` files.
    /// If None, the engine uses its compiled-in default path.
    pub tessdata_dir: Option<PathBuf>,

    /// Pre-constructed OCR engine. Takes precedence over the built-in
    /// tesseract backend; required when the `tesseract` feature is off.
    pub ocr_engine: Option<Arc<dyn OcrEngine>>,

    /// Number of images processed concurrently in batch mode. Default: 4.
    ///
    /// OCR is CPU-bound and the summary call is network-bound, so a modest
    /// level of concurrency overlaps the two without starving the blocking
    /// thread pool. Raise it on wide machines; lower it if the LLM API
    /// rate-limits you.
    pub concurrency: usize,

    /// LLM model identifier, e.g. "gpt-4.1-nano", "claude-sonnet-4-20250514".
    /// If None, uses the provider default.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected from
    /// the environment.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for the summary completion. Default: 0.1.
    ///
    /// Low temperature keeps the summary faithful to the extracted fields;
    /// higher values invite the model to embellish figures it was never
    /// given.
    pub temperature: f32,

    /// Maximum tokens the LLM may generate for the summary. Default: 512.
    ///
    /// An invoice summary is a short document; 512 tokens covers even
    /// many-line-item invoices without letting a rambling model run up
    /// cost.
    pub max_tokens: usize,

    /// Maximum retry attempts on a transient LLM API failure. Default: 3.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds (exponential backoff). Default: 500.
    ///
    /// Doubles after each attempt: 500 ms → 1 s → 2 s. Backoff avoids the
    /// thundering-herd problem when several batch workers retry at once.
    pub retry_backoff_ms: u64,

    /// Custom system prompt for the summariser. If None, uses the built-in
    /// default.
    pub system_prompt: Option<String>,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Per-LLM-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Progress callback for batch processing. Default: none.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            ocr_lang: "eng".to_string(),
            tessdata_dir: None,
            ocr_engine: None,
            concurrency: 4,
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.1,
            max_tokens: 512,
            max_retries: 3,
            retry_backoff_ms: 500,
            system_prompt: None,
            download_timeout_secs: 120,
            api_timeout_secs: 60,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("ocr_lang", &self.ocr_lang)
            .field("tessdata_dir", &self.tessdata_dir)
            .field("ocr_engine", &self.ocr_engine.as_ref().map(|_| "<dyn OcrEngine>"))
            .field("concurrency", &self.concurrency)
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("download_timeout_secs", &self.download_timeout_secs)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    pub fn ocr_lang(mut self, lang: impl Into<String>) -> Self {
        self.config.ocr_lang = lang.into();
        self
    }

    pub fn tessdata_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.tessdata_dir = Some(dir.into());
        self
    }

    pub fn ocr_engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.ocr_engine = Some(engine);
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, Ocr2InvoiceError> {
        let c = &self.config;
        if c.concurrency == 0 {
            return Err(Ocr2InvoiceError::InvalidConfig(
                "Concurrency must be ≥ 1".into(),
            ));
        }
        if c.ocr_lang.is_empty() {
            return Err(Ocr2InvoiceError::InvalidConfig(
                "OCR language must not be empty".into(),
            ));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let c = PipelineConfig::default();
        assert_eq!(c.ocr_lang, "eng");
        assert_eq!(c.concurrency, 4);
        assert_eq!(c.temperature, 0.1);
        assert_eq!(c.max_tokens, 512);
        assert_eq!(c.max_retries, 3);
        assert_eq!(c.retry_backoff_ms, 500);
        assert_eq!(c.api_timeout_secs, 60);
    }

    #[test]
    fn builder_clamps_out_of_range_values() {
        let c = PipelineConfig::builder()
            .concurrency(0)
            .temperature(9.0)
            .build()
            .unwrap();
        assert_eq!(c.concurrency, 1);
        assert_eq!(c.temperature, 2.0);
    }

    #[test]
    fn empty_ocr_lang_is_rejected() {
        let result = PipelineConfig::builder().ocr_lang("").build();
        assert!(matches!(result, Err(Ocr2InvoiceError::InvalidConfig(_))));
    }

    #[test]
    fn debug_elides_trait_objects() {
        let repr = format!("{:?}", PipelineConfig::default());
        assert!(repr.contains("ocr_lang"));
        assert!(!repr.contains("progress_callback"));
    }
}
