//! LLM interaction: turn an extracted record into a human-readable summary.
//!
//! This module is intentionally thin — all prompt text lives in
//! [`crate::prompts`] so it can be changed without touching retry or
//! error-handling logic here. The record itself stays the source of
//! truth; the summary is presentation.
//!
//! ## Retry Strategy
//!
//! HTTP 429 / 503 errors from LLM APIs are transient and frequent under
//! concurrent batch load. Exponential backoff (`retry_backoff_ms *
//! 2^attempt`) avoids thundering-herd: with 500 ms base and 3 retries the
//! wait sequence is 500 ms → 1 s → 2 s, totalling < 4 s of back-off per
//! image.

use crate::config::PipelineConfig;
use crate::error::Ocr2InvoiceError;
use crate::extract::InvoiceRecord;
use crate::prompts::{summary_request, DEFAULT_SYSTEM_PROMPT};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider};
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, timeout, Duration};
use tracing::{debug, warn};

/// A completed summary call with its accounting.
#[derive(Debug, Clone)]
pub struct Summary {
    pub text: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub duration_ms: u64,
    /// Retries needed before the call succeeded.
    pub retries: u32,
}

/// Request a summary of `record` from the provider.
///
/// ## Message Layout
///
/// 1. **System message** — the 4-rule summarisation prompt (or the
///    caller's override)
/// 2. **User message** — the extracted field block built by
///    [`summary_request`]
///
/// Transient failures and per-call timeouts are retried with exponential
/// backoff up to `config.max_retries`; when every attempt fails the last
/// error is returned as [`Ocr2InvoiceError::SummaryFailed`].
pub async fn summarise(
    provider: &Arc<dyn LLMProvider>,
    record: &InvoiceRecord,
    config: &PipelineConfig,
) -> Result<Summary, Ocr2InvoiceError> {
    let start = Instant::now();
    let system_prompt = config
        .system_prompt
        .as_deref()
        .unwrap_or(DEFAULT_SYSTEM_PROMPT);

    let messages = vec![
        ChatMessage::system(system_prompt),
        ChatMessage::user(summary_request(record)),
    ];

    let options = build_options(config);
    let api_timeout = Duration::from_secs(config.api_timeout_secs);

    let mut last_err: Option<String> = None;

    for attempt in 0..=config.max_retries {
        if attempt > 0 {
            let backoff = config.retry_backoff_ms * 2u64.pow(attempt - 1);
            warn!(
                "Summary: retry {}/{} after {}ms",
                attempt, config.max_retries, backoff
            );
            sleep(Duration::from_millis(backoff)).await;
        }

        match timeout(api_timeout, provider.chat(&messages, Some(&options))).await {
            Ok(Ok(response)) => {
                let duration = start.elapsed();
                debug!(
                    "Summary: {} input tokens, {} output tokens, {:?}",
                    response.prompt_tokens, response.completion_tokens, duration
                );

                return Ok(Summary {
                    text: response.content,
                    input_tokens: response.prompt_tokens as u64,
                    output_tokens: response.completion_tokens as u64,
                    duration_ms: duration.as_millis() as u64,
                    retries: attempt,
                });
            }
            Ok(Err(e)) => {
                let err_msg = format!("{}", e);
                warn!("Summary: attempt {} failed — {}", attempt + 1, err_msg);
                last_err = Some(err_msg);
            }
            Err(_) => {
                let err_msg = format!("timed out after {}s", config.api_timeout_secs);
                warn!("Summary: attempt {} {}", attempt + 1, err_msg);
                last_err = Some(err_msg);
            }
        }
    }

    Err(Ocr2InvoiceError::SummaryFailed {
        retries: config.max_retries,
        detail: last_err.unwrap_or_else(|| "Unknown error".to_string()),
    })
}

/// Build `CompletionOptions` from the pipeline config.
fn build_options(config: &PipelineConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}
