//! CLI binary for cv-analyzer.
//!
//! `serve` runs the HTTP service; `analyze` runs the same pipeline over local
//! files. Both build their configuration once here, from flags with
//! environment fallbacks (a `.env` file is loaded first), and hand it to the
//! library.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use cv_analyzer::{
    AnalysisConfig, BatchItem, BatchMode, BatchOutput, PageSeparator, Pipeline, PipelineConfig,
    PipelineError, ProgressObserver, ServerConfig, SourceFormat, UploadedDocument,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::json;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

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

// ── CLI progress observer using indicatif ────────────────────────────────────

/// Spinner plus one log line per finished file. Files finish out of order
/// when `--concurrency` > 1, so every line names its file.
struct CliObserver {
    bar: ProgressBar,
    failures: AtomicUsize,
}

impl CliObserver {
    fn new(total: usize) -> Self {
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  [{pos}/{len}]  {msg}  {elapsed:.dim}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.set_prefix("Analyzing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Self {
            bar,
            failures: AtomicUsize::new(0),
        }
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
        let total = self.bar.length().unwrap_or(0) as usize;
        let failed = self.failures.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!("{} {} file(s) processed", green("✔"), bold(&total.to_string()));
        } else {
            eprintln!(
                "{} {}/{} file(s) processed  ({} failed)",
                red("✘"),
                total - failed,
                total,
                red(&failed.to_string())
            );
        }
    }
}

impl ProgressObserver for CliObserver {
    fn on_extraction_start(&self, filename: &str, format: SourceFormat) {
        let how = match format {
            SourceFormat::Pdf => "reading PDF text",
            SourceFormat::Image => "running OCR",
        };
        self.bar.set_message(format!("{filename}: {how}"));
    }

    fn on_ocr_progress(&self, filename: &str, status: &str, progress: f32) {
        self.bar.set_message(format!(
            "{filename}: OCR {status} {:>3.0}%",
            progress * 100.0
        ));
    }

    fn on_analysis_start(&self, filename: &str) {
        self.bar.set_message(format!("{filename}: waiting for model"));
    }

    fn on_finished(&self, filename: &str, error: Option<&str>) {
        match error {
            None => self.bar.println(format!("  {} {}", green("✓"), filename)),
            Some(e) => {
                self.failures.fetch_add(1, Ordering::SeqCst);
                self.bar
                    .println(format!("  {} {}  {}", red("✗"), filename, red(e)));
            }
        }
        self.bar.inc(1);
    }
}

// ── Arguments ────────────────────────────────────────────────────────────────

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP service on port 3001
  cv-analyzer serve

  # Analyse a CV from the command line
  cv-analyzer analyze resume.pdf

  # Extract text only (no API key needed)
  cv-analyzer analyze --extract-only scan.png

  # Several files at once, JSON output
  cv-analyzer analyze --json --concurrency 4 cvs/*.pdf > reports.json

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY     Google Gemini API key (required for analysis)
  GEMINI_MODEL       Model ID (default: gemini-2.0-flash)
  PORT, HOST         Bind address for `serve`
  OCR_LANGUAGES      Tesseract languages (default: eng+ara+fra)
  TESSERACT_PATH     Path to the tesseract executable
  RUST_LOG           Overrides -v / -q log filtering

A `.env` file in the working directory is loaded before flags are parsed.
"#;

/// Extract text from CVs (PDF or image) and get structured feedback.
#[derive(Parser, Debug)]
#[command(
    name = "cv-analyzer",
    version,
    about = "Extract text from CVs (PDF or image) and get structured feedback from a language model",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve(ServeArgs),
    /// Run the pipeline over local files.
    Analyze(AnalyzeArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Interface to bind.
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// TCP port.
    #[arg(short, long, env = "PORT", default_value_t = 3001)]
    port: u16,

    /// Do not send permissive CORS headers.
    #[arg(long)]
    no_cors: bool,
}

#[derive(Args, Debug)]
struct AnalyzeArgs {
    /// CV files (.pdf, .png, .jpg, .jpeg).
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Stop after text extraction; do not call the model.
    #[arg(long)]
    extract_only: bool,

    /// Print results as JSON.
    #[arg(long)]
    json: bool,

    /// Files processed at once.
    #[arg(short, long, default_value_t = 2)]
    concurrency: usize,

    /// Disable the progress spinner.
    #[arg(long)]
    no_progress: bool,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// Google Gemini API key.
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, global = true)]
    gemini_api_key: Option<String>,

    /// Model ID.
    #[arg(long, env = "GEMINI_MODEL", default_value = cv_analyzer::config::DEFAULT_GEMINI_MODEL, global = true)]
    model: String,

    /// Model endpoint root (for proxies).
    #[arg(long, env = "GEMINI_BASE_URL", default_value = cv_analyzer::config::DEFAULT_GEMINI_BASE_URL, global = true)]
    api_base_url: String,

    /// Sampling temperature (0.0–2.0).
    #[arg(long, default_value_t = 0.4, global = true)]
    temperature: f32,

    /// Max output tokens for the analysis.
    #[arg(long, default_value_t = 4096, global = true)]
    max_tokens: u32,

    /// File holding replacement review instructions.
    #[arg(long, global = true)]
    system_prompt: Option<PathBuf>,

    /// Deadline for one model call, in seconds. Default: none.
    #[arg(long, env = "API_TIMEOUT_SECS", global = true)]
    api_timeout: Option<u64>,

    /// Retries on transient model failures (network, 429, 5xx).
    #[arg(long, default_value_t = 0, global = true)]
    max_retries: u32,

    /// Tesseract languages.
    #[arg(long, env = "OCR_LANGUAGES", default_value = cv_analyzer::config::DEFAULT_OCR_LANGUAGES, global = true)]
    ocr_languages: String,

    /// Path to the tesseract executable.
    #[arg(long, env = "TESSERACT_PATH", default_value = "tesseract", global = true)]
    tesseract_path: String,

    /// OCR jobs allowed to run at once. Default: number of CPUs.
    #[arg(long, env = "OCR_CONCURRENCY", global = true)]
    ocr_concurrency: Option<usize>,

    /// Deadline for one OCR run, in seconds. Default: none.
    #[arg(long, env = "OCR_TIMEOUT_SECS", global = true)]
    ocr_timeout: Option<u64>,

    /// Deadline for one PDF parse, in seconds. Default: none.
    #[arg(long, env = "PDF_TIMEOUT_SECS", global = true)]
    pdf_timeout: Option<u64>,

    /// Upload ceiling in MiB.
    #[arg(long, env = "MAX_FILE_SIZE_MB", default_value_t = 10, global = true)]
    max_file_size_mb: usize,

    /// Minimum characters of extracted text.
    #[arg(long, default_value_t = cv_analyzer::config::DEFAULT_MIN_CHARS, global = true)]
    min_chars: usize,

    /// PDF page separator: blank, hr, page, or a custom string.
    #[arg(long, default_value = "blank", global = true)]
    separator: String,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Emit logs as JSON lines.
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,
}

// ── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    // Before parsing, so `env = ...` fallbacks see .env values.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner carries the feedback during `analyze`; keep INFO quiet.
    let spinner = matches!(&cli.command, Command::Analyze(a) if !a.no_progress && !a.json);
    let filter = if cli.common.verbose {
        "debug"
    } else if cli.common.quiet || spinner {
        "error"
    } else {
        "info"
    };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr);
    if cli.common.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    // ── Build config ─────────────────────────────────────────────────────
    let pipeline_config = build_pipeline_config(&cli.common)?;
    let analysis_config = build_analysis_config(&cli.common)?;
    let pipeline = Pipeline::from_config(pipeline_config, analysis_config)
        .context("Failed to initialise pipeline")?;

    match cli.command {
        Command::Serve(args) => {
            let config = ServerConfig {
                host: args.host,
                port: args.port,
                enable_cors: !args.no_cors,
            };
            cv_analyzer::server::serve(config, pipeline)
                .await
                .context("HTTP server failed")
        }
        Command::Analyze(args) => run_analyze(&pipeline, args, cli.common.quiet).await,
    }
}

fn build_pipeline_config(common: &CommonArgs) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .max_file_size(common.max_file_size_mb.saturating_mul(1024 * 1024))
        .min_chars(common.min_chars)
        .page_separator(parse_separator(&common.separator))
        .ocr_languages(common.ocr_languages.clone())
        .tesseract_path(common.tesseract_path.clone());
    if let Some(n) = common.ocr_concurrency {
        builder = builder.ocr_concurrency(n);
    }
    if let Some(secs) = common.ocr_timeout {
        builder = builder.ocr_timeout_secs(secs);
    }
    if let Some(secs) = common.pdf_timeout {
        builder = builder.pdf_timeout_secs(secs);
    }
    builder.build().context("Invalid pipeline configuration")
}

fn build_analysis_config(common: &CommonArgs) -> Result<AnalysisConfig> {
    let mut builder = AnalysisConfig::builder()
        .model(common.model.clone())
        .base_url(common.api_base_url.clone())
        .temperature(common.temperature)
        .max_output_tokens(common.max_tokens)
        .max_retries(common.max_retries);
    if let Some(ref key) = common.gemini_api_key {
        builder = builder.api_key(key.clone());
    }
    if let Some(secs) = common.api_timeout {
        builder = builder.timeout_secs(secs);
    }
    if let Some(ref path) = common.system_prompt {
        let prompt = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read system prompt from {}", path.display()))?;
        builder = builder.system_prompt(prompt);
    }
    builder.build().context("Invalid analysis configuration")
}

fn parse_separator(s: &str) -> PageSeparator {
    match s {
        "blank" | "none" => PageSeparator::BlankLine,
        "hr" => PageSeparator::HorizontalRule,
        "page" => PageSeparator::PageMarker,
        other => PageSeparator::Custom(other.to_string()),
    }
}

// ── analyze ──────────────────────────────────────────────────────────────────

async fn run_analyze(pipeline: &Pipeline, args: AnalyzeArgs, quiet: bool) -> Result<()> {
    let limit = pipeline.config().max_file_size;
    let mode = if args.extract_only {
        BatchMode::ExtractOnly
    } else {
        BatchMode::Analyze
    };

    // Oversized files are rejected from metadata without reading them.
    let mut items: Vec<BatchItem> = Vec::new();
    let mut docs = Vec::new();
    for path in &args.files {
        let size = tokio::fs::metadata(path)
            .await
            .with_context(|| format!("Cannot access {}", path.display()))?
            .len() as usize;
        let filename = display_name(path);
        if size > limit {
            items.push(BatchItem {
                filename,
                outcome: Err(PipelineError::TooLarge { size, limit }),
            });
            continue;
        }
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mime = mime_guess::from_path(path)
            .first_or_octet_stream()
            .essence_str()
            .to_string();
        docs.push(UploadedDocument::new(filename, mime, bytes));
    }

    let show_progress = !quiet && !args.no_progress && !args.json;
    let observer = CliObserver::new(docs.len());
    if !show_progress {
        observer.bar.set_draw_target(indicatif::ProgressDrawTarget::hidden());
    }
    items.extend(
        pipeline
            .run_batch(docs, mode, args.concurrency, &observer)
            .await,
    );
    if show_progress {
        observer.finish();
    }

    let failed = items.iter().filter(|i| i.outcome.is_err()).count();
    if args.json {
        print_json(&items)?;
    } else {
        print_text(&items);
    }

    if failed > 0 {
        bail!("{} of {} file(s) failed", failed, items.len());
    }
    Ok(())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn print_json(items: &[BatchItem]) -> Result<()> {
    let values: Vec<serde_json::Value> = items
        .iter()
        .map(|item| match &item.outcome {
            Ok(BatchOutput::Analyzed(report)) => json!({ "success": true, "data": report }),
            Ok(BatchOutput::Extracted(text)) => json!({
                "success": true,
                "data": { "filename": item.filename, "extraction": text },
            }),
            Err(e) => json!({
                "success": false,
                "filename": item.filename,
                "kind": e.kind(),
                "error": e.to_string(),
            }),
        })
        .collect();
    println!(
        "{}",
        serde_json::to_string_pretty(&values).context("Failed to serialize results")?
    );
    Ok(())
}

fn print_text(items: &[BatchItem]) {
    for item in items {
        match &item.outcome {
            Ok(BatchOutput::Analyzed(report)) => {
                println!("{}", bold(&format!("═══ {} ═══", item.filename)));
                println!(
                    "{}",
                    dim(&format!(
                        "{} · {} bytes · {} chars extracted",
                        report.file_type, report.file_size, report.text_length
                    ))
                );
                println!("\n{}\n", report.ai_analysis);
            }
            Ok(BatchOutput::Extracted(text)) => {
                println!("{}", bold(&format!("═══ {} ═══", item.filename)));
                println!(
                    "{}",
                    dim(&format!(
                        "{} · {} chars",
                        text.source_format(),
                        text.char_count()
                    ))
                );
                println!("\n{}\n", text.text());
            }
            Err(e) => eprintln!("{} {}: {}", red("✗"), item.filename, e),
        }
    }
}
