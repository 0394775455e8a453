//! CLI binary for gapmark.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `GradingConfig` and prints or exports the report.

use anyhow::{Context, Result};
use clap::Parser;
use gapmark::{grade, grade_to_file, GradingConfig};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
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

const AFTER_HELP: &str = r#"EXAMPLES:
  # Grade against a typed transcript (report markdown to stdout)
  gapmark work.jpg --transcript-text "1. environment
  2. pollution"

  # Transcript from a text file
  gapmark work.jpg --transcript-file answers.txt

  # Transcript as a photographed answer key
  gapmark work.jpg --transcript-image answers.jpg

  # Export a printable HTML report
  gapmark work.jpg --transcript-file answers.txt -o report.html

  # Structured JSON (markdown + html + stats)
  gapmark work.jpg --transcript-file answers.txt --json > result.json

  # Use a different model
  gapmark --model gemini-2.5-flash work.jpg --transcript-file answers.txt

GRADING BEHAVIOUR:
  Crossed-out words  only the clearest final word is graded
  Teacher tick marks ignored
  Handwriting        interpreted as charitably as possible

  The report has two sections: a short parent-facing message and a
  teacher-facing table comparing every item (✅ correct / ❌ wrong).

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY       API key for the inference endpoint (required)
  GAPMARK_MODEL        Override the model ID

SETUP:
  1. Set API key:   export GEMINI_API_KEY=AIza...
  2. Grade:         gapmark work.jpg --transcript-file answers.txt
"#;

/// Grade handwritten listening gap-fill exercises using a multimodal LLM.
#[derive(Parser, Debug)]
#[command(
    name = "gapmark",
    version,
    about = "Grade handwritten listening gap-fill exercises using a multimodal LLM",
    long_about = "Send a photo of a student's handwritten listening gap-fill exercise plus the \
reference transcript (image or text) to a multimodal model, and receive a two-section markdown \
report: a parent-facing summary and a teacher-facing per-item comparison table.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Photo of the student's handwritten work (JPG, PNG, WEBP, PDF).
    student_image: PathBuf,

    /// Photo of the reference transcript (answer key).
    #[arg(long, value_name = "IMAGE")]
    transcript_image: Option<PathBuf>,

    /// Reference transcript typed inline.
    #[arg(long, value_name = "TEXT", conflicts_with = "transcript_file")]
    transcript_text: Option<String>,

    /// Read the reference transcript from a text file.
    #[arg(long, value_name = "FILE")]
    transcript_file: Option<PathBuf>,

    /// Write a printable HTML report to this file instead of stdout.
    #[arg(short, long, env = "GAPMARK_OUTPUT")]
    output: Option<PathBuf>,

    /// Model ID sent to the endpoint.
    #[arg(long, env = "GAPMARK_MODEL")]
    model: Option<String>,

    /// API base URL (mainly for local stub servers in testing).
    #[arg(long, env = "GAPMARK_API_BASE", hide = true)]
    api_base: Option<String>,

    /// Path to a text file with a custom instruction template.
    #[arg(long, env = "GAPMARK_INSTRUCTION")]
    instruction: Option<PathBuf>,

    /// Max model output tokens for the report.
    #[arg(long, env = "GAPMARK_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Per-call timeout in seconds.
    #[arg(long, env = "GAPMARK_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Output structured JSON (markdown + html + stats) instead of markdown.
    #[arg(long, env = "GAPMARK_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "GAPMARK_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "GAPMARK_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the report itself.
    #[arg(short, long, env = "GAPMARK_QUIET")]
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

    let config = build_config(&cli).await?;
    let transcript_text = resolve_transcript_text(&cli).await?;

    let spinner = if !cli.quiet && !cli.no_progress && !cli.json {
        let bar = ProgressBar::new_spinner();
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        bar.set_prefix("Grading");
        bar.set_message(format!("{} → {}", cli.student_image.display(), config.model));
        bar.enable_steady_tick(Duration::from_millis(80));
        Some(bar)
    } else {
        None
    };

    // ── Run ──────────────────────────────────────────────────────────────
    let result = if let Some(ref output_path) = cli.output {
        grade_to_file(
            &cli.student_image,
            cli.transcript_image.as_deref(),
            &transcript_text,
            &config,
            output_path,
        )
        .await
        .map(|stats| (None, stats))
    } else {
        grade(
            &cli.student_image,
            cli.transcript_image.as_deref(),
            &transcript_text,
            &config,
        )
        .await
        .map(|output| {
            let stats = output.stats.clone();
            (Some(output), stats)
        })
    };

    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    let (output, stats) = match result {
        Ok(v) => v,
        Err(e) => {
            eprintln!("{} {}", red("✘"), e);
            std::process::exit(1);
        }
    };

    match output {
        Some(output) if cli.json => {
            let json =
                serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
            println!("{json}");
        }
        Some(output) => {
            let stdout = io::stdout();
            let mut handle = stdout.lock();
            handle
                .write_all(output.markdown.as_bytes())
                .context("Failed to write to stdout")?;
        }
        None => {
            if !cli.quiet {
                eprintln!(
                    "{} report written to {}",
                    green("✔"),
                    bold(&cli.output.as_ref().map(|p| p.display().to_string()).unwrap_or_default()),
                );
            }
        }
    }

    if !cli.quiet && !cli.json {
        eprintln!(
            "   {}",
            dim(&format!(
                "{} parts  /  {} byte report  /  {}ms total",
                stats.part_count, stats.report_bytes, stats.total_duration_ms
            )),
        );
    }

    Ok(())
}

/// Map CLI args to `GradingConfig`.
async fn build_config(cli: &Cli) -> Result<GradingConfig> {
    let mut builder = GradingConfig::builder()
        .max_output_tokens(cli.max_tokens)
        .api_timeout_secs(cli.api_timeout);

    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref base) = cli.api_base {
        builder = builder.api_base(base.clone());
    }
    if let Some(ref path) = cli.instruction {
        let template = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read instruction template from {:?}", path))?;
        builder = builder.instruction(template);
    }

    builder.build().context("Invalid configuration")
}

/// Resolve the typed transcript from `--transcript-text` or `--transcript-file`.
///
/// Returns an empty string when neither is present — the library's
/// validation then decides whether the transcript image alone satisfies
/// the submission invariant, and names the missing field if not.
async fn resolve_transcript_text(cli: &Cli) -> Result<String> {
    if let Some(ref text) = cli.transcript_text {
        return Ok(text.clone());
    }
    if let Some(ref path) = cli.transcript_file {
        return tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read transcript from {:?}", path));
    }
    Ok(String::new())
}
