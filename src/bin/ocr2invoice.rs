//! CLI binary for ocr2invoice.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `PipelineConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use ocr2invoice::{
    extract_only, process, process_dir, process_to_file, BatchProgressCallback, ExtractOutput,
    PipelineConfig, ProgressCallback,
};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: renders a live progress bar and per-image
/// log lines using [indicatif]. Works correctly when images complete
/// out-of-order (concurrent batch mode).
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-image wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<PathBuf, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0); // length set in on_batch_start

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(spinner_style);
        bar.set_prefix("Scanning");
        bar.set_message("Listing images…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn file_name(path: &Path) -> String {
        path.file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string())
    }
}

impl BatchProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_images: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        self.bar.set_length(total_images as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Processing");
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Processing {total_images} invoice images…"))
        ));
    }

    fn on_image_start(&self, path: &Path, _total: usize) {
        self.start_times
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), Instant::now());
        self.bar.set_message(Self::file_name(path));
    }

    fn on_image_complete(&self, path: &Path, _total: usize, summary_len: usize) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(path)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        self.bar.println(format!(
            "  {} {:<28}  {:<12}  {}",
            green("✓"),
            Self::file_name(path),
            dim(&format!("{summary_len:>5} chars")),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_image_error(&self, path: &Path, _total: usize, error: String) {
        self.start_times.lock().unwrap().remove(path);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = if error.len() > 80 {
            format!("{}\u{2026}", &error[..79])
        } else {
            error
        };

        self.bar.println(format!(
            "  {} {:<28}  {}",
            red("✗"),
            Self::file_name(path),
            red(&msg),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_images: usize, success_count: usize) {
        let failed = total_images.saturating_sub(success_count);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} invoices summarised successfully",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} invoices summarised  ({} failed)",
                if failed == total_images {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&success_count.to_string()),
                total_images,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Summarise one scanned invoice (stdout)
  ocr2invoice scan.png

  # Save the summary to a file
  ocr2invoice scan.png -o invoice.txt

  # Batch: every image in a directory, summaries written alongside
  ocr2invoice ./scans -o ./summaries

  # Structured extraction only — no API key needed
  ocr2invoice --extract-only scan.png --json

  # Use a specific model
  ocr2invoice --model gpt-4.1 --provider openai scan.png

  # Summarise from a URL
  ocr2invoice https://example.com/receipts/4711.jpg

  # German-language scan
  ocr2invoice --lang deu rechnung.png

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  TESSDATA_PREFIX         Standard tesseract traineddata location

SETUP:
  1. Install tesseract:  apt install tesseract-ocr libleptonica-dev
  2. Set an API key:     export OPENAI_API_KEY=sk-...
  3. Summarise:          ocr2invoice scan.png

  --extract-only works with no API key at all: it prints the structured
  record (invoice number, date, line items, total) and the extraction
  report showing which fields were found.
"#;

/// Summarise scanned invoices using OCR and LLMs.
#[derive(Parser, Debug)]
#[command(
    name = "ocr2invoice",
    version,
    about = "Extract and summarise invoices from scanned images using OCR and LLMs",
    long_about = "Read scanned invoice images (local files, URLs, or whole directories), \
extract structured fields (invoice number, date, line items, total) with OCR and \
pattern matching, and generate human-readable summaries with an LLM. Supports OpenAI, \
Anthropic, Google Gemini, and any OpenAI-compatible endpoint (Ollama, vLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Image file, directory of images, or HTTP/HTTPS URL.
    input: String,

    /// Write the summary to this file (single image) or directory (batch).
    #[arg(short, long, env = "OCR2INVOICE_OUTPUT")]
    output: Option<PathBuf>,

    /// LLM model ID (e.g. gpt-4.1-nano, claude-sonnet-4-20250514).
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama.
    /// Auto-detected from API key env vars if not set.
    #[arg(long, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Tesseract language code.
    #[arg(long, env = "OCR2INVOICE_LANG", default_value = "eng")]
    lang: String,

    /// Directory containing tesseract traineddata files.
    #[arg(long, env = "OCR2INVOICE_TESSDATA")]
    tessdata: Option<PathBuf>,

    /// Number of images processed concurrently in batch mode.
    #[arg(short, long, env = "OCR2INVOICE_CONCURRENCY", default_value_t = 4)]
    concurrency: usize,

    /// Extract the structured record only; skip the LLM summary.
    #[arg(long, env = "OCR2INVOICE_EXTRACT_ONLY")]
    extract_only: bool,

    /// Output structured JSON instead of the plain summary.
    #[arg(long, env = "OCR2INVOICE_JSON")]
    json: bool,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "OCR2INVOICE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Max LLM output tokens for the summary.
    #[arg(long, env = "OCR2INVOICE_MAX_TOKENS", default_value_t = 512)]
    max_tokens: usize,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "OCR2INVOICE_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Retries on LLM failure.
    #[arg(long, env = "OCR2INVOICE_MAX_RETRIES", default_value_t = 3)]
    max_retries: u32,

    /// Disable the batch progress bar.
    #[arg(long, env = "OCR2INVOICE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "OCR2INVOICE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the summary itself.
    #[arg(short, long, env = "OCR2INVOICE_QUIET")]
    quiet: bool,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "OCR2INVOICE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Per-LLM-call timeout in seconds.
    #[arg(long, env = "OCR2INVOICE_API_TIMEOUT", default_value_t = 60)]
    api_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let is_batch = Path::new(&cli.input).is_dir();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = is_batch && !cli.quiet && !cli.no_progress && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        Some(CliProgressCallback::new() as Arc<dyn BatchProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb).await?;

    // ── Extract-only mode (no API key needed) ────────────────────────────
    if cli.extract_only {
        if is_batch {
            anyhow::bail!("--extract-only works on a single image, not a directory");
        }
        let out = extract_only(&cli.input, &config)
            .await
            .context("Extraction failed")?;
        print_extraction(&out, cli.json)?;
        return Ok(());
    }

    // ── Run ──────────────────────────────────────────────────────────────
    if is_batch {
        run_batch(&cli, &config).await
    } else {
        run_single(&cli, &config).await
    }
}

async fn run_single(cli: &Cli, config: &PipelineConfig) -> Result<()> {
    if let Some(ref output_path) = cli.output {
        let stats = process_to_file(&cli.input, output_path, config)
            .await
            .context("Processing failed")?;

        if !cli.quiet {
            eprintln!(
                "{}  {}ms  →  {}",
                green("✔"),
                stats.total_duration_ms,
                bold(&output_path.display().to_string()),
            );
            eprintln!(
                "   {} tokens in  /  {} tokens out",
                dim(&stats.input_tokens.to_string()),
                dim(&stats.output_tokens.to_string()),
            );
        }
        return Ok(());
    }

    let output = process(&cli.input, config)
        .await
        .context("Processing failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
    } else {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(output.summary.as_bytes())
            .context("Failed to write to stdout")?;
        if !cli.quiet {
            eprintln!(
                "   {} tokens in  /  {} tokens out  —  {}ms total",
                dim(&output.stats.input_tokens.to_string()),
                dim(&output.stats.output_tokens.to_string()),
                output.stats.total_duration_ms,
            );
        }
    }

    Ok(())
}

async fn run_batch(cli: &Cli, config: &PipelineConfig) -> Result<()> {
    let output = process_dir(&cli.input, config)
        .await
        .context("Batch processing failed")?;

    if cli.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to serialise output")?
        );
        return Ok(());
    }

    if let Some(ref out_dir) = cli.output {
        // One summary file per image, named after the image stem.
        tokio::fs::create_dir_all(out_dir)
            .await
            .with_context(|| format!("Failed to create {}", out_dir.display()))?;
        for result in output.results.iter().filter(|r| r.error.is_none()) {
            let stem = result
                .path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| "invoice".to_string());
            let dest = out_dir.join(format!("{stem}.txt"));
            tokio::fs::write(&dest, &result.summary)
                .await
                .with_context(|| format!("Failed to write {}", dest.display()))?;
        }
        if !cli.quiet {
            eprintln!(
                "{}  {}/{} summaries  →  {}",
                green("✔"),
                output.stats.processed_images,
                output.stats.total_images,
                bold(&out_dir.display().to_string()),
            );
        }
        return Ok(());
    }

    // Print summaries to stdout, one block per image.
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    for result in &output.results {
        match &result.error {
            None => {
                writeln!(handle, "── {} ──", result.path.display())?;
                handle.write_all(result.summary.as_bytes())?;
                writeln!(handle)?;
            }
            Some(e) => eprintln!("{} {}", red("✗"), e),
        }
    }

    if !cli.quiet {
        eprintln!(
            "   {} tokens in  /  {} tokens out  —  {}ms total",
            dim(&output.stats.total_input_tokens.to_string()),
            dim(&output.stats.total_output_tokens.to_string()),
            output.stats.total_duration_ms,
        );
    }

    Ok(())
}

/// Print an extraction result, JSON or human-readable.
fn print_extraction(out: &ExtractOutput, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(out).context("Failed to serialise extraction")?
        );
        return Ok(());
    }

    match &out.record.invoice_number {
        Some(n) => println!("Invoice number:  {n}"),
        None => println!("Invoice number:  {}", dim("not found")),
    }
    match &out.record.date {
        Some(d) if d.date_like => println!("Date:            {}", d.raw),
        Some(d) => println!("Date:            {} {}", d.raw, dim("(unrecognised shape)")),
        None => println!("Date:            {}", dim("not found")),
    }
    match &out.record.total {
        Some(t) => println!("Total:           {} {}", t.value, dim(&format!("({})", t.keyword))),
        None => println!("Total:           {}", dim("not found")),
    }
    if out.record.line_items.is_empty() {
        println!("Line items:      {}", dim("none"));
    } else {
        println!("Line items:");
        for item in &out.record.line_items {
            println!("  {:<16} {} x {}", item.name, item.quantity, item.unit_price);
        }
    }

    let flags: Vec<String> = out
        .report
        .fields()
        .iter()
        .map(|(name, f)| {
            let mark = if f.found { green("✓") } else { red("✗") };
            if f.candidates > 1 {
                format!("{name} {mark} {}", dim(&format!("({} candidates)", f.candidates)))
            } else {
                format!("{name} {mark}")
            }
        })
        .collect();
    println!("\nReport: {}", flags.join("  "));

    Ok(())
}

/// Map CLI args to `PipelineConfig`.
async fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let system_prompt = if let Some(ref path) = cli.system_prompt {
        Some(
            tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read system prompt from {:?}", path))?,
        )
    } else {
        None
    };

    let mut builder = PipelineConfig::builder()
        .ocr_lang(&cli.lang)
        .concurrency(cli.concurrency)
        .max_tokens(cli.max_tokens)
        .temperature(cli.temperature)
        .max_retries(cli.max_retries)
        .download_timeout_secs(cli.download_timeout)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref dir) = cli.tessdata {
        builder = builder.tessdata_dir(dir.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    let mut config = builder.build().context("Invalid configuration")?;

    // Apply fields that are optional on the CLI side
    config.model = cli.model.clone();
    config.provider_name = cli.provider.clone();
    config.system_prompt = system_prompt;

    Ok(config)
}
