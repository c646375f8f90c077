//! CLI binary for swift2md.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ConvertOptions` and prints results.

use anyhow::{Context, Result};
use clap::error::ErrorKind;
use clap::{CommandFactory, Parser};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use swift2md::convert::save_markdown;
use swift2md::{CancellationToken, ConvertOptions, Credentials, MarkdownConverter};
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert a local PDF to stdout
  swift2md report.pdf

  # Convert a remote spreadsheet and save it
  swift2md https://example.com/q3.xlsx -o q3.md

  # Full result (name, mimeType, tokens, data) as JSON
  swift2md --json ~/scans/receipt.png

SUPPORTED FORMATS:
  pdf  jpeg/jpg  png  webp  svg  html/htm  xml  csv
  docx  xlsx  xlsm  xlsb  xls  et  ods  odt  numbers

ENVIRONMENT VARIABLES:
  CLOUDFLARE_ACCOUNT_ID   Cloudflare account ID (or --account-id)
  CLOUDFLARE_API_TOKEN    API token with Workers AI access (or --api-token)
  RUST_LOG                Overrides the log filter chosen by -v / -q
"#;

#[derive(Parser, Debug)]
#[command(
    name = "swift2md",
    version,
    about = "Convert documents, spreadsheets and images to Markdown using Cloudflare Workers AI",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local file path or http(s) URL to convert.
    input: String,

    /// Cloudflare account ID.
    #[arg(long, env = "CLOUDFLARE_ACCOUNT_ID", hide_env_values = true)]
    account_id: Option<String>,

    /// Cloudflare API token.
    #[arg(long, env = "CLOUDFLARE_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Write Markdown to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Per-request timeout in seconds.
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    timeout: u64,

    /// Retries after the first attempt for 429, 5xx and transient network faults.
    #[arg(long, default_value_t = 2)]
    max_retries: u32,

    /// Base delay for exponential backoff, in milliseconds.
    #[arg(long, default_value_t = 500)]
    retry_delay_ms: u64,

    /// Print the full conversion result as JSON.
    #[arg(long)]
    json: bool,

    /// Debug logging.
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Errors only; no spinner.
    #[arg(short, long)]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    // ── Credentials ──────────────────────────────────────────────────────
    let account_id = require(cli.account_id.as_deref(), "--account-id", "CLOUDFLARE_ACCOUNT_ID");
    let api_token = require(cli.api_token.as_deref(), "--api-token", "CLOUDFLARE_API_TOKEN");

    let options = ConvertOptions::builder()
        .timeout(Duration::from_secs(cli.timeout))
        .max_retry_count(cli.max_retries)
        .retry_base_delay(Duration::from_millis(cli.retry_delay_ms))
        .build()
        .context("Invalid configuration")?;
    let converter = MarkdownConverter::new(Credentials::new(account_id, api_token), options)
        .context("Failed to initialise HTTP client")?;

    // Ctrl-C aborts the in-flight request or backoff sleep.
    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let input = expand_input(&cli.input);
    let progress = (!cli.quiet && !cli.json && io::stderr().is_terminal())
        .then(|| spinner(&input));

    let start = Instant::now();
    let outcome = converter.convert_with_cancel(&input, &cancel).await;
    if let Some(bar) = &progress {
        bar.finish_and_clear();
    }
    let result = outcome.with_context(|| format!("Conversion of {input} failed"))?;

    if !cli.quiet && !cli.json {
        eprintln!(
            "Converted {} ({} tokens) in {}ms",
            result.name,
            result.tokens,
            start.elapsed().as_millis()
        );
    }

    // ── Output ───────────────────────────────────────────────────────────
    match cli.output {
        Some(ref output) => {
            let path = expand_tilde(output);
            save_markdown(&path, &result.markdown)
                .await
                .context("Failed to write output")?;
            println!("{}", path.display());
        }
        None if cli.json => {
            let json = serde_json::to_string_pretty(&result).context("Failed to serialise output")?;
            println!("{json}");
        }
        None => {
            write_markdown(&mut io::stdout().lock(), &result.markdown)
                .context("Failed to write to stdout")?;
        }
    }

    Ok(())
}

/// Write Markdown, ensuring a trailing newline.
fn write_markdown(out: &mut impl Write, markdown: &str) -> io::Result<()> {
    out.write_all(markdown.as_bytes())?;
    if !markdown.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.flush()
}

/// Return the trimmed value or exit with a clap usage error.
fn require(value: Option<&str>, flag: &str, env: &str) -> String {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(v) => v.to_string(),
        None => Cli::command()
            .error(
                ErrorKind::MissingRequiredArgument,
                format!("{flag} is required (or set {env})"),
            )
            .exit(),
    }
}

fn spinner(input: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix("Converting");
    bar.set_message(input.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

/// URLs pass through untouched; paths get `~` expanded.
fn expand_input(input: &str) -> String {
    if swift2md::pipeline::input::is_url(input) {
        input.to_string()
    } else {
        expand_tilde(Path::new(input)).to_string_lossy().into_owned()
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    let Ok(rest) = path.strip_prefix("~") else {
        return path.to_path_buf();
    };
    match dirs::home_dir() {
        Some(home) => home.join(rest),
        None => path.to_path_buf(),
    }
}
