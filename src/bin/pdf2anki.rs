//! CLI binary for edgequake-pdf2anki.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `RunConfig` and prints results.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_pdf2anki::pipeline::input::prompt_for_pdf;
use edgequake_pdf2anki::{
    convert_to_file, inspect, load_api_key, OpenAiChat, PageSelection, ProgressCallback,
    RetryPolicy, RunConfig, RunProgressCallback, RunStats, DEFAULT_API_BASE, DEFAULT_KEY_FILE,
    DEFAULT_MODEL,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::PathBuf;
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a progress bar plus one log line per page.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Start of the page currently in flight.
    page_started: Mutex<Option<Instant>>,
    /// Verdict of the page currently in flight.
    relevant: Mutex<bool>,
}

impl CliProgressCallback {
    /// Spinner only until `on_run_start` tells us the page count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);

        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Reading PDF…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            page_started: Mutex::new(None),
            relevant: Mutex::new(false),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  \
             ⏱ {elapsed_precise}  ETA {eta_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Carding");
        self.bar.reset_eta();
    }

    fn elapsed_secs(&self) -> f64 {
        self.page_started
            .lock()
            .ok()
            .and_then(|mut t| t.take())
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl RunProgressCallback for CliProgressCallback {
    fn on_run_start(&self, total_pages: usize) {
        self.activate_bar(total_pages);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Checking {total_pages} pages with text…"))
        ));
    }

    fn on_page_start(&self, page_num: u32, _total_pages: usize) {
        if let Ok(mut t) = self.page_started.lock() {
            *t = Some(Instant::now());
        }
        self.bar.set_message(format!("page {page_num}"));
    }

    fn on_page_classified(&self, _page_num: u32, relevant: bool) {
        if let Ok(mut r) = self.relevant.lock() {
            *r = relevant;
        }
    }

    fn on_page_complete(&self, page_num: u32, total_pages: usize, cards: usize) {
        let secs = self.elapsed_secs();
        let relevant = self.relevant.lock().map(|r| *r).unwrap_or(false);

        let (mark, what) = if relevant {
            (green("✓"), format!("{cards:>3} cards"))
        } else {
            (dim("·"), "skipped".to_string())
        };
        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {:<9}  {}",
            mark,
            page_num,
            total_pages,
            dim(&what),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_page_error(&self, page_num: u32, total_pages: usize, error: &str) {
        // Keep one line per page.
        let msg: String = if error.chars().count() > 80 {
            let cut: String = error.chars().take(79).collect();
            format!("{cut}\u{2026}")
        } else {
            error.to_string()
        };

        self.bar.println(format!(
            "  {} Page {:>3}/{:<3}  {}",
            red("✗"),
            page_num,
            total_pages,
            red(&msg),
        ));
    }

    fn on_run_complete(&self, stats: &RunStats) {
        self.bar.finish_and_clear();
        eprintln!(
            "{} {} relevant of {} pages  ({} failed)",
            if stats.failed_pages == 0 {
                green("✔")
            } else {
                cyan("⚠")
            },
            bold(&stats.relevant_pages.to_string()),
            stats.text_pages,
            if stats.failed_pages == 0 {
                stats.failed_pages.to_string()
            } else {
                red(&stats.failed_pages.to_string())
            },
        );
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Cards for a whole PDF (writes biology_anki_cards.txt next to it)
  pdf2anki biology.pdf

  # Prompt for the file on the terminal
  pdf2anki

  # Only chapter 2, written somewhere else
  pdf2anki --pages 12-30 --output ch2.txt biology.pdf

  # Another model or an OpenAI-compatible server
  pdf2anki --model gpt-4o-mini biology.pdf
  pdf2anki --api-base http://localhost:11434/v1 --model llama3.1 biology.pdf

  # Inspect PDF metadata (no API key needed)
  pdf2anki --inspect-only biology.pdf

IMPORTING INTO ANKI:
  File ▸ Import, pick the *_anki_cards.txt file, field separator "Semicolon",
  and tick "Allow HTML in fields" so <br> line breaks render.

ENVIRONMENT VARIABLES:
  PDF2ANKI_KEY_FILE       Path to the API key file (default: key.txt)
  PDF2ANKI_MODEL          Override model ID
  OPENAI_BASE_URL         OpenAI-compatible API base URL
  RUST_LOG                Override log filter (e.g. edgequake_pdf2anki=debug)

SETUP:
  1. Put your API key in key.txt:   echo sk-... > key.txt
  2. Run:                           pdf2anki document.pdf
"#;

/// Turn PDF documents into Anki flashcards using a chat-completion LLM.
#[derive(Parser, Debug)]
#[command(
    name = "pdf2anki",
    version,
    about = "Turn PDF documents into Anki flashcards using a chat-completion LLM",
    long_about = "Read a PDF page by page, ask an LLM whether each page is worth studying, \
and turn the relevant ones into question/answer flashcards in an Anki-importable \
semicolon-separated text file.",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path. Prompted for when omitted.
    input: Option<PathBuf>,

    /// Write cards to this file instead of <stem>_anki_cards.txt.
    #[arg(short, long, env = "PDF2ANKI_OUTPUT")]
    output: Option<PathBuf>,

    /// Chat model ID.
    #[arg(long, env = "PDF2ANKI_MODEL", default_value = DEFAULT_MODEL)]
    model: String,

    /// OpenAI-compatible API base URL.
    #[arg(long, env = "OPENAI_BASE_URL", default_value = DEFAULT_API_BASE)]
    api_base: String,

    /// File whose only content is the API key.
    #[arg(long, env = "PDF2ANKI_KEY_FILE", default_value = DEFAULT_KEY_FILE)]
    key_file: PathBuf,

    /// Retries per model call after the first attempt.
    #[arg(long, env = "PDF2ANKI_MAX_RETRIES", default_value_t = 5)]
    max_retries: u32,

    /// Wait before the first retry, in milliseconds.
    #[arg(long, env = "PDF2ANKI_INITIAL_WAIT_MS", default_value_t = 1000)]
    initial_wait_ms: u64,

    /// Multiplier applied to the wait after each retry.
    #[arg(long, env = "PDF2ANKI_BACKOFF_BASE", default_value_t = 2.0)]
    backoff_base: f64,

    /// Per-request timeout in seconds.
    #[arg(long, env = "PDF2ANKI_REQUEST_TIMEOUT", default_value_t = 60)]
    request_timeout: u64,

    /// Page selection: all, 5, 3-15, or 1,3,5,7.
    #[arg(long, env = "PDF2ANKI_PAGES", default_value = "all")]
    pages: String,

    /// PDF user password for encrypted documents.
    #[arg(long, env = "PDF2ANKI_PASSWORD")]
    password: Option<String>,

    /// Sampling temperature (provider default when unset).
    #[arg(long, env = "PDF2ANKI_TEMPERATURE")]
    temperature: Option<f32>,

    /// Disable progress bar.
    #[arg(long, env = "PDF2ANKI_NO_PROGRESS")]
    no_progress: bool,

    /// Print PDF metadata only, no model calls.
    #[arg(long)]
    inspect_only: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PDF2ANKI_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PDF2ANKI_QUIET")]
    quiet: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let show_progress = !cli.quiet && !cli.no_progress && !cli.inspect_only;
    let filter = log_filter(&cli, show_progress);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Inspect-only mode ────────────────────────────────────────────────
    if cli.inspect_only {
        let input = match cli.input {
            Some(ref p) => p.clone(),
            None => prompt_for_pdf()?,
        };
        let meta = inspect(&input, cli.password.as_deref())
            .await
            .context("Failed to inspect PDF")?;

        println!("File:         {}", input.display());
        if let Some(ref t) = meta.title {
            println!("Title:        {}", t);
        }
        if let Some(ref a) = meta.author {
            println!("Author:       {}", a);
        }
        println!("Pages:        {}", meta.page_count);
        println!("Text pages:   {}", meta.text_pages);
        println!("PDF Version:  {}", meta.pdf_version);
        println!("Encrypted:    {}", meta.is_encrypted);
        return Ok(());
    }

    // ── Credential ───────────────────────────────────────────────────────
    // Missing key is fatal before anything else happens.
    let api_key = load_api_key(&cli.key_file)?;

    let input = match cli.input {
        Some(ref p) => p.clone(),
        None => prompt_for_pdf()?,
    };

    // ── Build config ─────────────────────────────────────────────────────
    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new_dynamic();
        Some(cb as Arc<dyn RunProgressCallback>)
    } else {
        None
    };

    let config = build_config(&cli, progress_cb)?;
    let model = OpenAiChat::new(
        api_key,
        &cli.api_base,
        Duration::from_secs(cli.request_timeout),
    )?;

    // ── Run ──────────────────────────────────────────────────────────────
    let summary = convert_to_file(&input, &model, &config)
        .await
        .context("Run failed")?;

    if !cli.quiet {
        match summary.output_path {
            Some(ref path) => eprintln!(
                "{}  {} cards  {}ms  →  {}",
                green("✔"),
                summary.stats.total_cards,
                summary.stats.total_duration_ms,
                bold(&path.display().to_string()),
            ),
            None if show_progress => {
                eprintln!("No relevant content found to generate Anki cards.")
            }
            // INFO logs already said so.
            None => {}
        }
    }

    Ok(())
}

/// Default tracing filter for the flags.
///
/// The progress bar replaces INFO logs, but retry notices stay visible so a
/// backoff wait is never silent. `--verbose` always wins.
fn log_filter(cli: &Cli, show_progress: bool) -> &'static str {
    if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else if show_progress {
        "error,edgequake_pdf2anki::pipeline::retry=warn"
    } else {
        "info"
    }
}

/// Map CLI args to `RunConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<RunConfig> {
    let retry = RetryPolicy::new(
        cli.max_retries,
        Duration::from_millis(cli.initial_wait_ms),
        cli.backoff_base,
    );

    let mut builder = RunConfig::builder()
        .model(cli.model.clone())
        .retry(retry)
        .pages(parse_pages(&cli.pages)?);

    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(ref pwd) = cli.password {
        builder = builder.password(pwd.clone());
    }
    if let Some(ref out) = cli.output {
        builder = builder.output_path(out.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}

/// Parse `--pages` string into `PageSelection`.
fn parse_pages(s: &str) -> Result<PageSelection> {
    let s = s.trim().to_lowercase();

    if s == "all" {
        return Ok(PageSelection::All);
    }

    // Range: "3-15"
    if let Some((start, end)) = s.split_once('-') {
        let start: u32 = start
            .trim()
            .parse()
            .context("Invalid start page in range")?;
        let end: u32 = end.trim().parse().context("Invalid end page in range")?;

        if start < 1 {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", start);
        }
        if start > end {
            anyhow::bail!(
                "Invalid page range '{}-{}': start must be <= end",
                start,
                end
            );
        }

        return Ok(PageSelection::Range(start, end));
    }

    // Set: "1,3,5,7"
    if s.contains(',') {
        let mut pages: Vec<u32> = s
            .split(',')
            .map(|p| {
                p.trim()
                    .parse::<u32>()
                    .context(format!("Invalid page number: '{}'", p.trim()))
            })
            .collect::<Result<Vec<_>>>()?;

        if pages.contains(&0) {
            anyhow::bail!("Pages are 1-indexed, minimum is 1 (got 0)");
        }
        pages.sort_unstable();
        pages.dedup();

        return Ok(PageSelection::Set(pages));
    }

    // Single page: "5"
    let page: u32 = s.parse().context("Invalid page number")?;
    if page < 1 {
        anyhow::bail!("Pages are 1-indexed, minimum is 1 (got {})", page);
    }

    Ok(PageSelection::Single(page))
}
