//! CLI binary for toolhub-ocr.
//!
//! `serve` runs the HTTP API; `extract` runs the same pipeline over local
//! files and prints the result.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use toolhub_ocr::server::{self, DEFAULT_CORS_ORIGIN};
use toolhub_ocr::{
    ExtractInput, ExtractionProgressCallback, OutputShape, Pipeline, PipelineConfig,
    PipelineOutput, ProgressCallback, RawImage,
};
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Progress bar over the pages of one `extract` run.
struct CliProgressCallback {
    bar: ProgressBar,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(TICKS),
        );
        bar.set_prefix("Preparing");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self {
            bar,
            errors: AtomicUsize::new(0),
        })
    }
}

impl ExtractionProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, total_pages: usize) {
        self.bar.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {prefix:.bold}  [{bar:42.green/238}] {pos:>3}/{len} pages  \
                 ⏱ {elapsed_precise}",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏  ")
            .tick_strings(TICKS),
        );
        self.bar.set_length(total_pages as u64);
        self.bar.set_prefix("Extracting");
    }

    fn on_page_start(&self, page_num: usize, _total: usize) {
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_complete(&self, page_num: usize, total: usize, text_len: usize) {
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            green("✓"),
            page_num,
            total,
            dim(&format!("{text_len:>5} chars")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: usize, total: usize, error: &str) {
        self.errors.fetch_add(1, Ordering::SeqCst);
        let msg: String = if error.chars().count() > 80 {
            error.chars().take(79).chain(['…']).collect()
        } else {
            error.to_string()
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total,
            red(&msg)
        ));
        self.bar.inc(1);
    }

    fn on_extraction_complete(&self, total_pages: usize, success_count: usize) {
        self.bar.finish_and_clear();
        let failed = self.errors.load(Ordering::SeqCst);
        if failed == 0 {
            eprintln!(
                "{} {} pages extracted",
                green("✔"),
                bold(&success_count.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages extracted  ({} failed)",
                red("✘"),
                bold(&success_count.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Run the HTTP API on port 3000
  toolhub serve --port 3000

  # OCR a scanned page to stdout
  toolhub extract scan.jpg

  # Several pages, failing if any page fails
  toolhub extract --strict page1.png page2.png page3.png -o book.txt

  # Table rows as JSON
  toolhub extract --shape table register.jpg

  # Table straight to CSV through the vision model
  toolhub extract --shape csv invoice.pdf

ENVIRONMENT VARIABLES:
  MISTRAL_API_KEY          OCR (and default chat provider) API key
  TOOLHUB_OCR_MODEL        OCR model ID
  TOOLHUB_CHAT_PROVIDER    Chat provider (mistral, openai, anthropic, ...)
  TOOLHUB_CHAT_MODEL       Chat model for reshaping and writing
  TOOLHUB_VISION_MODEL     Vision model for image-to-CSV
  PORT                     Server port
  CORS_ORIGIN              Comma-separated allowed origins, or *

A .env file in the working directory is loaded first.
"#;

#[derive(Parser, Debug)]
#[command(
    name = "toolhub",
    version,
    about = "OCR images and PDFs, then reshape the text into HTML or tables",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    models: ModelArgs,

    #[arg(short, long, global = true, env = "TOOLHUB_VERBOSE")]
    verbose: bool,

    #[arg(short, long, global = true, env = "TOOLHUB_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API.
    Serve {
        #[arg(long, env = "HOST", default_value = "0.0.0.0")]
        host: String,

        #[arg(short, long, env = "PORT", default_value_t = 3000)]
        port: u16,

        #[arg(long, env = "CORS_ORIGIN", default_value = DEFAULT_CORS_ORIGIN)]
        cors_origin: String,
    },
    /// Run the pipeline over local files.
    Extract {
        /// Image or PDF files; several files are treated as ordered pages.
        #[arg(required = true)]
        files: Vec<PathBuf>,

        #[arg(long, value_enum, default_value = "text")]
        shape: ShapeArg,

        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Fail if any page fails instead of leaving it empty.
        #[arg(long)]
        strict: bool,

        #[arg(long)]
        no_progress: bool,
    },
}

#[derive(Args, Debug)]
struct ModelArgs {
    #[arg(long, global = true, env = "MISTRAL_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    #[arg(long, global = true, env = "TOOLHUB_OCR_ENDPOINT")]
    ocr_endpoint: Option<String>,

    #[arg(long, global = true, env = "TOOLHUB_OCR_MODEL")]
    ocr_model: Option<String>,

    #[arg(long, global = true, env = "TOOLHUB_CHAT_PROVIDER")]
    chat_provider: Option<String>,

    #[arg(long, global = true, env = "TOOLHUB_CHAT_MODEL")]
    chat_model: Option<String>,

    #[arg(long, global = true, env = "TOOLHUB_VISION_MODEL")]
    vision_model: Option<String>,

    #[arg(long, global = true, env = "TOOLHUB_MAX_ATTEMPTS", default_value_t = 3)]
    max_attempts: u32,

    #[arg(long, global = true, env = "TOOLHUB_PAGE_PAUSE_MS", default_value_t = 500)]
    page_pause_ms: u64,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum ShapeArg {
    Text,
    Html,
    Table,
    Csv,
}

#[tokio::main]
async fn main() -> Result<()> {
    // .env must be loaded before clap reads `env =` fallbacks.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    let show_progress = match &cli.command {
        Command::Extract { no_progress, .. } => !cli.quiet && !no_progress,
        Command::Serve { .. } => false,
    };
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Command::Serve {
            ref host,
            port,
            ref cors_origin,
        } => {
            let config = build_config(&cli.models, None)?;
            let pipeline = Pipeline::from_config(config).context("Failed to build pipeline")?;
            let app = server::router(Arc::new(pipeline), cors_origin);

            let addr = format!("{host}:{port}");
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .with_context(|| format!("Failed to bind {addr}"))?;
            tracing::info!("ToolHub API listening on http://{addr}");
            server::serve(listener, app).await.context("Server error")?;
        }
        Command::Extract {
            ref files,
            shape,
            ref output,
            strict,
            ..
        } => {
            let progress: Option<ProgressCallback> = if show_progress && files.len() > 1 {
                Some(CliProgressCallback::new() as Arc<dyn ExtractionProgressCallback>)
            } else {
                None
            };
            let config = build_config(&cli.models, progress)?;
            let pipeline = Pipeline::from_config(config).context("Failed to build pipeline")?;

            let images = read_images(files).await?;
            let rendered = run_extract(&pipeline, images, shape, strict).await?;
            write_output(output.as_deref(), &rendered).await?;
        }
    }

    Ok(())
}

fn build_config(args: &ModelArgs, progress: Option<ProgressCallback>) -> Result<PipelineConfig> {
    let mut builder = PipelineConfig::builder()
        .ocr_max_attempts(args.max_attempts)
        .chat_max_attempts(args.max_attempts)
        .page_pause_ms(args.page_pause_ms);

    if let Some(ref key) = args.api_key {
        builder = builder.ocr_api_key(key);
    }
    if let Some(ref url) = args.ocr_endpoint {
        builder = builder.ocr_endpoint(url);
    }
    if let Some(ref m) = args.ocr_model {
        builder = builder.ocr_model(m);
    }
    if let Some(ref p) = args.chat_provider {
        builder = builder.chat_provider(p);
    }
    if let Some(ref m) = args.chat_model {
        builder = builder.chat_model(m);
    }
    if let Some(ref m) = args.vision_model {
        builder = builder.vision_model(m);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

async fn read_images(files: &[PathBuf]) -> Result<Vec<RawImage>> {
    let mut images = Vec::with_capacity(files.len());
    for path in files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let mime = mime_guess::from_path(path).first_or_octet_stream();
        images.push(RawImage::from_bytes(&bytes, mime.essence_str()));
    }
    Ok(images)
}

/// Run the requested shape and render it as the text to print.
async fn run_extract(
    pipeline: &Pipeline,
    mut images: Vec<RawImage>,
    shape: ShapeArg,
    strict: bool,
) -> Result<String> {
    if strict && shape != ShapeArg::Text {
        anyhow::bail!("--strict only applies to --shape text");
    }
    if shape == ShapeArg::Csv {
        if images.len() != 1 {
            anyhow::bail!("--shape csv takes exactly one file");
        }
        let table = pipeline
            .extract_csv(&images[0])
            .await
            .context("CSV extraction failed")?;
        eprintln!(
            "{}",
            dim(&format!(
                "{} rows × {} columns",
                table.row_count, table.column_count
            ))
        );
        return Ok(table.csv);
    }

    if shape == ShapeArg::Text && images.len() > 1 {
        let aggregated = pipeline
            .extract_pages(&images)
            .await
            .context("Extraction failed")?;
        let aggregated = if strict {
            aggregated.into_strict()?
        } else {
            aggregated
        };
        return Ok(aggregated.text);
    }

    let input = if images.len() == 1 {
        ExtractInput::Single(images.remove(0))
    } else {
        ExtractInput::Pages { images }
    };
    let shape = match shape {
        ShapeArg::Html => OutputShape::Html,
        ShapeArg::Table => OutputShape::Table,
        _ => OutputShape::Text,
    };

    let output = pipeline
        .process(&input, shape)
        .await
        .context("Extraction failed")?;
    match output {
        PipelineOutput::Text { text, .. } => Ok(text),
        PipelineOutput::Html { html, .. } => Ok(html),
        PipelineOutput::Table { rows, ocr_length } => {
            eprintln!(
                "{}",
                dim(&format!("{} rows from {} OCR chars", rows.len(), ocr_length))
            );
            serde_json::to_string_pretty(&rows).context("Failed to serialise rows")
        }
    }
}

async fn write_output(path: Option<&Path>, rendered: &str) -> Result<()> {
    if let Some(path) = path {
        tokio::fs::write(path, rendered)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        eprintln!("{} {}", green("✔"), bold(&path.display().to_string()));
        return Ok(());
    }

    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(rendered.as_bytes())
        .context("Failed to write to stdout")?;
    if !rendered.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}
