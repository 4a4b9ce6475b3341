//! CLI binary for docpaste.
//!
//! A thin shim over the library crate: each subcommand maps to one library
//! operation and prints its result.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docpaste::pipeline::materialize::inline_local_images;
use docpaste::{
    project, restore, CancelFlag, ImagePublisher, ImageTable, ProgressCallback, UploadConfig,
    UploadProgressCallback,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::collections::HashMap;
use std::io::{self, IsTerminal, Read, Write};
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

const TICKS: &[&str] = &["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"];

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: a progress bar plus one log line per image.
struct CliProgressCallback {
    bar: ProgressBar,
    /// Per-image wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
    errors: AtomicUsize,
}

impl CliProgressCallback {
    /// Spinner until `on_upload_start` tells us the image count.
    fn new_dynamic() -> Arc<Self> {
        let bar = ProgressBar::new(0);
        let spinner_style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(TICKS);

        bar.set_style(spinner_style);
        bar.set_prefix("Preparing");
        bar.set_message("Scanning markup…");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
            errors: AtomicUsize::new(0),
        })
    }

    fn activate_bar(&self, total: usize) {
        let progress_style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} images  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(TICKS);

        self.bar.set_length(total as u64);
        self.bar.set_style(progress_style);
        self.bar.set_prefix("Uploading");
    }

    fn elapsed_secs(&self, index: usize) -> f64 {
        self.start_times
            .lock()
            .ok()
            .and_then(|mut m| m.remove(&index))
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0)
    }
}

impl UploadProgressCallback for CliProgressCallback {
    fn on_upload_start(&self, total: usize) {
        self.activate_bar(total);
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Publishing {total} inline images…"))
        ));
    }

    fn on_image_start(&self, index: usize, _total: usize) {
        if let Ok(mut m) = self.start_times.lock() {
            m.insert(index, Instant::now());
        }
        self.bar.set_message(format!("image {index}"));
    }

    fn on_image_complete(&self, index: usize, total: usize, url: &str) {
        let secs = self.elapsed_secs(index);
        self.bar.println(format!(
            "  {} Image {:>3}/{:<3}  {}  {}",
            green("✓"),
            index,
            total,
            dim(url),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_image_error(&self, index: usize, total: usize, error: &str) {
        let secs = self.elapsed_secs(index);
        self.errors.fetch_add(1, Ordering::SeqCst);

        let msg = match error.char_indices().nth(79) {
            Some((cut, _)) => format!("{}\u{2026}", &error[..cut]),
            None => error.to_string(),
        };

        self.bar.println(format!(
            "  {} Image {:>3}/{:<3}  {}  {}",
            red("✗"),
            index,
            total,
            red(&msg),
            dim(&format!("{secs:.1}s")),
        ));
        self.bar.inc(1);
    }

    fn on_upload_complete(&self, total: usize, succeeded: usize) {
        let failed = self.errors.load(Ordering::SeqCst);
        self.bar.finish_and_clear();

        if succeeded == total {
            eprintln!(
                "{} {} images uploaded successfully",
                green("✔"),
                bold(&succeeded.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} images uploaded  ({} failed)",
                if succeeded == 0 { red("✘") } else { cyan("⚠") },
                bold(&succeeded.to_string()),
                total,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Show the editable text of a pasted HTML fragment, keep its image table
  docpaste mask pasted.html --table images.json > pasted.txt

  # Put the images back after editing the text
  docpaste restore pasted.txt --table images.json -o edited.html

  # Inline local <img src="file:///..."> references as data: URIs
  docpaste inline pasted.html -o self-contained.html

  # Upload every inline image and print the rewritten markup
  docpaste publish edited.html -o published.html

  # Read from stdin, JSON report
  cat edited.html | docpaste publish - --json > report.json

ENVIRONMENT VARIABLES:
  STS_URL          Credentials endpoint (GET, returns temporary keys)
  OSS_UPLOAD_URL   Object-storage POST endpoint
  OSS_BASE_URL     Public base URL of uploaded objects
  OSS_KEY_PREFIX   Object key prefix (default: images)
  RUST_LOG         Log filter, overrides -v / -q

  `publish` reads api.env and .env from the working directory when present,
  or the file given with --env-file.
"#;

/// Edit pasted rich content as text and publish its images.
#[derive(Parser, Debug)]
#[command(
    name = "docpaste",
    version,
    about = "Mask pasted HTML into editable text with image placeholders, and publish its images",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "DOCPASTE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, global = true, env = "DOCPASTE_QUIET")]
    quiet: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the masked text, replacing each <img> with [Image omitted #N].
    Mask {
        /// HTML file, or `-` for stdin.
        input: String,

        /// Write the image table as JSON to this file.
        #[arg(long)]
        table: Option<PathBuf>,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Substitute placeholders with the tags of an image table.
    Restore {
        /// Masked text file, or `-` for stdin.
        input: String,

        /// Image table written by `mask --table`.
        #[arg(long)]
        table: PathBuf,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Replace readable local image sources with data: URIs.
    Inline {
        /// HTML file, or `-` for stdin.
        input: String,

        #[command(flatten)]
        out: OutputArgs,
    },

    /// Upload inline images and rewrite their sources to public URLs.
    Publish {
        /// HTML file, or `-` for stdin.
        input: String,

        /// Load endpoint variables from this file instead of api.env / .env.
        #[arg(long)]
        env_file: Option<PathBuf>,

        /// Output the structured PublishOutput as JSON instead of markup.
        #[arg(long, env = "DOCPASTE_JSON")]
        json: bool,

        /// Disable progress bar.
        #[arg(long, env = "DOCPASTE_NO_PROGRESS")]
        no_progress: bool,

        /// Per-request HTTP timeout in seconds.
        #[arg(long, env = "DOCPASTE_TIMEOUT", default_value_t = 30)]
        timeout: u64,

        #[command(flatten)]
        out: OutputArgs,
    },
}

#[derive(Args, Debug)]
struct OutputArgs {
    /// Write to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The progress bar replaces INFO logs while it is on screen.
    let bar_active = matches!(
        cli.command,
        Command::Publish { json: false, no_progress: false, .. }
    ) && !cli.quiet;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || bar_active {
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

    match cli.command {
        Command::Mask { input, table, out } => {
            let projection = project(&read_input(&input)?);
            if let Some(path) = table {
                let json = serde_json::to_string_pretty(&projection.image_table)
                    .context("Failed to serialise image table")?;
                std::fs::write(&path, json)
                    .with_context(|| format!("Failed to write image table to {:?}", path))?;
            }
            if !cli.quiet {
                eprintln!(
                    "{} {} images masked",
                    green("✔"),
                    bold(&projection.image_table.len().to_string())
                );
            }
            write_output(out.output.as_deref(), &projection.masked_text)?;
        }

        Command::Restore { input, table, out } => {
            let masked = read_input(&input)?;
            let raw = std::fs::read_to_string(&table)
                .with_context(|| format!("Failed to read image table from {:?}", table))?;
            let table: ImageTable =
                serde_json::from_str(&raw).context("Image table is not a JSON array of tags")?;
            write_output(out.output.as_deref(), &restore(&masked, &table))?;
        }

        Command::Inline { input, out } => {
            let markup = inline_local_images(&read_input(&input)?);
            write_output(out.output.as_deref(), &markup)?;
        }

        Command::Publish {
            input,
            env_file,
            json,
            no_progress,
            timeout,
            out,
        } => {
            load_env(env_file.as_deref())?;
            let markup = read_input(&input)?;

            let mut config = UploadConfig::from_env().context("Invalid configuration")?;
            config.request_timeout_secs = timeout.max(1);

            let mut publisher =
                ImagePublisher::new(config).context("Failed to set up the uploader")?;
            let show_progress = !cli.quiet && !no_progress && !json;
            if show_progress {
                let cb: ProgressCallback = CliProgressCallback::new_dynamic();
                publisher = publisher.with_progress(cb);
            }

            // Ctrl-C stops the round between images; started uploads finish.
            let cancel = CancelFlag::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_interrupt.cancel();
                }
            });

            let output = publisher
                .publish(&markup, &cancel)
                .await
                .context("Upload failed")?;

            if json {
                let report =
                    serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
                write_output(out.output.as_deref(), &report)?;
            } else {
                write_output(out.output.as_deref(), &output.markup)?;
            }

            if !cli.quiet && !show_progress {
                let (ok, total) = output.summary();
                eprintln!(
                    "Uploaded {}/{} images in {}ms",
                    ok, total, output.stats.total_duration_ms
                );
                if output.stats.failed > 0 {
                    eprintln!("  {} images failed", output.stats.failed);
                }
            }
            if output.stats.cancelled && !cli.quiet {
                eprintln!(
                    "{} cancelled, {} images left inline",
                    cyan("⚠"),
                    output.stats.skipped
                );
            }
        }
    }

    Ok(())
}

/// Read a whole file, or stdin for `-`.
fn read_input(input: &str) -> Result<String> {
    if input == "-" {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    std::fs::read_to_string(input).with_context(|| format!("Failed to read {input}"))
}

fn write_output(path: Option<&Path>, content: &str) -> Result<()> {
    if let Some(path) = path {
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        return Ok(());
    }
    let stdout = io::stdout();
    let terminal = stdout.is_terminal();
    write_content(stdout.lock(), content, terminal).context("Failed to write to stdout")
}

/// Write `content` unchanged; a closing newline is added only for a
/// terminal, so piped output round-trips byte for byte.
fn write_content(mut out: impl Write, content: &str, terminal: bool) -> io::Result<()> {
    out.write_all(content.as_bytes())?;
    if terminal && !content.ends_with('\n') {
        out.write_all(b"\n")?;
    }
    out.flush()
}

/// An explicit `--env-file` must load; the default files are optional.
fn load_env(env_file: Option<&Path>) -> Result<()> {
    if let Some(path) = env_file {
        dotenvy::from_path(path)
            .with_context(|| format!("Failed to load environment from {}", path.display()))?;
        return Ok(());
    }
    for name in ["api.env", ".env"] {
        if dotenvy::from_filename(name).is_ok() {
            tracing::debug!("Loaded environment from {}", name);
        }
    }
    Ok(())
}
