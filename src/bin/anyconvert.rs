//! CLI binary for anyfile-convert.
//!
//! A thin shim over the library crate: maps flags to a `ClientConfig` and a
//! tool, then walks one session from upload to download.

use anyhow::{bail, Context, Result};
use anyfile_convert::{
    ClientConfig, Controller, FileUpload, HttpConversionService, Phase, RequestKind, RequestSeq,
    Session, SessionObserver, ToolCatalog, ToolDefinition, View,
};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── Spinner observer using indicatif ─────────────────────────────────────────

/// Shows a spinner while a request is in flight and a one-line result
/// when it finishes.
struct SpinnerObserver {
    file_name: Mutex<Option<String>>,
    bar: Mutex<Option<ProgressBar>>,
}

impl SpinnerObserver {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            file_name: Mutex::new(None),
            bar: Mutex::new(None),
        })
    }
}

impl SessionObserver for SpinnerObserver {
    fn on_state_change(&self, session: &Session, _view: &View) {
        if let Ok(mut name) = self.file_name.lock() {
            *name = session.file_name().map(str::to_string);
        }
    }

    fn on_request_start(&self, kind: RequestKind, _seq: RequestSeq) {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner())
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
        );
        pb.set_prefix(match kind {
            RequestKind::Upload => "Uploading",
            RequestKind::Convert => "Converting",
        });
        if let Ok(name) = self.file_name.lock() {
            pb.set_message(name.clone().unwrap_or_default());
        }
        pb.enable_steady_tick(Duration::from_millis(80));
        if let Ok(mut bar) = self.bar.lock() {
            *bar = Some(pb);
        }
    }

    fn on_request_finish(&self, kind: RequestKind, _seq: RequestSeq, ok: bool) {
        let Some(pb) = self.bar.lock().ok().and_then(|mut b| b.take()) else {
            return;
        };
        let elapsed = pb.elapsed();
        pb.finish_and_clear();
        let mark = if ok { green("✓") } else { red("✗") };
        eprintln!(
            "  {mark} {kind:<8} {}",
            dim(&format!("{:.1}s", elapsed.as_secs_f64()))
        );
    }

    fn on_stale_response(&self, kind: RequestKind, seq: RequestSeq) {
        eprintln!("{}", dim(&format!("  ignored late {kind} response #{seq}")));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Convert with the universal tool, choosing the format interactively
  anyconvert photo.png

  # Word to PDF (format fixed by the tool)
  anyconvert --tool word-to-pdf report.docx -o report.pdf

  # Pick the output format up front
  anyconvert --format jpg photo.png -o out/

  # Only ask the server what a file can become
  anyconvert --formats-only slides.pptx

  # Use another server and a custom tool list
  anyconvert --server http://convert.local:3000 --tools-file tools.json --tool md-to-pdf notes.md

  # List the built-in tools
  anyconvert --list-tools

ENVIRONMENT VARIABLES:
  ANYCONVERT_SERVER       Base URL of the conversion service
  ANYCONVERT_TOOL         Default tool slug
  ANYCONVERT_TOOLS_FILE   JSON tool catalog replacing the built-in one
  ANYCONVERT_TIMEOUT      Per-request timeout in seconds
  RUST_LOG                Log filter (overrides -v / -q)
"#;

/// Convert files through a remote conversion service.
#[derive(Parser, Debug)]
#[command(
    name = "anyconvert",
    version,
    about = "Convert files through a remote conversion service",
    long_about = "Upload a file to a conversion service, choose one of the output formats it \
offers (or let the tool choose), convert, and download the result.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// File to convert.
    #[arg(required_unless_present = "list_tools")]
    input: Option<PathBuf>,

    /// Where to save the result: a file path or an existing directory.
    #[arg(short, long, env = "ANYCONVERT_OUTPUT")]
    output: Option<PathBuf>,

    /// Tool slug (see --list-tools).
    #[arg(short, long, env = "ANYCONVERT_TOOL", default_value = "universal")]
    tool: String,

    /// JSON file with tool definitions, replacing the built-in catalog.
    #[arg(long, env = "ANYCONVERT_TOOLS_FILE")]
    tools_file: Option<PathBuf>,

    /// Output format id (e.g. pdf, jpg). Ignored when the tool fixes it.
    #[arg(short, long, env = "ANYCONVERT_FORMAT")]
    format: Option<String>,

    /// Base URL of the conversion service.
    #[arg(long, env = "ANYCONVERT_SERVER", default_value = anyfile_convert::config::DEFAULT_BASE_URL)]
    server: String,

    /// Per-request timeout in seconds.
    #[arg(long, env = "ANYCONVERT_TIMEOUT", default_value_t = 120)]
    timeout: u64,

    /// Refuse files larger than this many MiB.
    #[arg(long, env = "ANYCONVERT_MAX_UPLOAD_MB", default_value_t = 50)]
    max_upload_mb: u64,

    /// Upload and print the formats the server offers, then stop.
    #[arg(long)]
    formats_only: bool,

    /// Print the available tools and exit.
    #[arg(long)]
    list_tools: bool,

    /// Print results as JSON.
    #[arg(long, env = "ANYCONVERT_JSON")]
    json: bool,

    /// Disable the spinner.
    #[arg(long, env = "ANYCONVERT_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "ANYCONVERT_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "ANYCONVERT_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner carries the user-facing feedback; library INFO logs would
    // only tear it up.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Tool catalog ─────────────────────────────────────────────────────
    let catalog = match cli.tools_file {
        Some(ref path) => ToolCatalog::load(path)
            .await
            .context("Failed to load tool catalog")?,
        None => ToolCatalog::builtin(),
    };

    if cli.list_tools {
        print_tools(&catalog, cli.json)?;
        return Ok(());
    }

    let Some(ref input) = cli.input else {
        bail!("No input file given");
    };
    let tool = catalog.find(&cli.tool)?.config.clone();

    // ── Build client ─────────────────────────────────────────────────────
    let config = ClientConfig::builder()
        .base_url(cli.server.clone())
        .request_timeout_secs(cli.timeout)
        .max_upload_bytes(cli.max_upload_mb.saturating_mul(1024 * 1024))
        .build()
        .context("Invalid configuration")?;
    let service = Arc::new(HttpConversionService::new(config.clone())?);

    let mut controller = Controller::new(service);
    if show_progress {
        controller = controller.with_observer(SpinnerObserver::new());
    }

    // ── Upload ───────────────────────────────────────────────────────────
    controller.enter_tool(tool);
    let file = FileUpload::from_path(input, config.max_upload_bytes)
        .await
        .with_context(|| format!("Cannot upload {}", input.display()))?;
    controller
        .submit_file(file)
        .await
        .context("Upload rejected")?;
    fail_if_failed(controller.session())?;

    if cli.formats_only {
        let formats = controller.session().available_formats();
        if cli.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&formats).context("Failed to serialise formats")?
            );
        } else {
            for f in formats {
                println!("{f}");
            }
        }
        return Ok(());
    }

    // ── Format choice ────────────────────────────────────────────────────
    if !controller.session().is_format_locked() {
        let format = match cli.format {
            Some(ref f) => f.clone(),
            None => choose_format(controller.session(), &controller.view())?,
        };
        controller.select_format(&format)?;
    } else if let Some(ref wanted) = cli.format {
        let forced = controller.session().forced_format().unwrap_or_default();
        if !wanted.eq_ignore_ascii_case(forced) && !cli.quiet {
            eprintln!(
                "{} this tool always produces {}; ignoring --format {}",
                cyan("⚠"),
                bold(&forced.to_uppercase()),
                wanted
            );
        }
    }

    // ── Convert ──────────────────────────────────────────────────────────
    controller
        .request_conversion()
        .await
        .context("Conversion could not start")?;
    fail_if_failed(controller.session())?;

    // ── Download ─────────────────────────────────────────────────────────
    let destination = cli.output.clone().unwrap_or_else(|| PathBuf::from("."));
    let saved = controller
        .download_to(&destination)
        .await
        .context("Failed to save converted file")?;

    let session = controller.session();
    if cli.json {
        let summary = serde_json::json!({
            "input": input,
            "tool": session.tool().map(|t| t.title.clone()),
            "format": session.selected_format(),
            "download_url": session.download_url(),
            "saved_to": saved,
            "session": session,
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialise output")?
        );
    } else if !cli.quiet {
        eprintln!(
            "{}  {} → {}  {}",
            green("✔"),
            input.display(),
            bold(
                &session
                    .selected_format()
                    .unwrap_or_default()
                    .to_uppercase()
            ),
            bold(&saved.display().to_string()),
        );
    }

    Ok(())
}

/// Turn a failed session step into a CLI error.
fn fail_if_failed(session: &Session) -> Result<()> {
    if session.phase() == Phase::Failed {
        bail!(
            "{}",
            session.error_text().unwrap_or("The conversion service failed")
        );
    }
    Ok(())
}

/// Ask on the terminal which format to convert to.
fn choose_format(session: &Session, view: &View) -> Result<String> {
    let Some(selector) = view.format_selector.as_ref() else {
        bail!("No output format can be chosen for this file");
    };
    let values: Vec<&str> = selector.options.iter().map(|o| o.value.as_str()).collect();
    let Some(first) = values.first() else {
        bail!("The server offered no output formats");
    };

    if !io::stdin().is_terminal() {
        bail!(
            "Choose an output format with --format (available: {})",
            values.join(", ")
        );
    }

    eprintln!(
        "{} {} can be converted to:",
        cyan("◆"),
        bold(session.file_name().unwrap_or("the file"))
    );
    for (i, option) in selector.options.iter().enumerate() {
        eprintln!("  {:>2}) {}", i + 1, option.label);
    }
    let default = selector.selected.clone().unwrap_or_else(|| first.to_string());
    eprint!("Format [{}]: ", default.to_uppercase());
    io::stderr().flush().ok();

    let mut line = String::new();
    tokio::task::block_in_place(|| io::stdin().lock().read_line(&mut line))
        .context("Failed to read format choice")?;
    let answer = line.trim();

    if answer.is_empty() {
        return Ok(default);
    }
    if let Ok(n) = answer.parse::<usize>() {
        if let Some(value) = values.get(n.wrapping_sub(1)) {
            return Ok(value.to_string());
        }
        bail!("Choice {n} is out of range (1–{})", values.len());
    }
    Ok(answer.to_lowercase())
}

fn print_tools(catalog: &ToolCatalog, json: bool) -> Result<()> {
    if json {
        let tools: Vec<_> = catalog.iter().collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&tools).context("Failed to serialise tools")?
        );
        return Ok(());
    }
    for t in catalog.iter() {
        println!("{}", tool_row(t));
    }
    Ok(())
}

/// One `--list-tools` line. Columns are padded before colouring so the
/// escape codes do not count toward the width.
fn tool_row(t: &ToolDefinition) -> String {
    format!(
        "{} {:<22} {}",
        bold(&format!("{:<18}", t.slug)),
        t.config.title,
        dim(&format!("{} → {}", t.config.accept, t.config.output))
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip_ansi(s: &str) -> String {
        let mut out = String::new();
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                chars.by_ref().find(|&c| c == 'm');
            } else {
                out.push(c);
            }
        }
        out
    }

    #[test]
    fn tool_rows_align_titles() {
        let catalog = ToolCatalog::builtin();
        for t in catalog.iter() {
            let row = strip_ansi(&tool_row(t));
            assert_eq!(row.find(&t.config.title), Some(19), "row: {row:?}");
        }
    }
}
