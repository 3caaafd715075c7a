//! CLI entry point for `mboxtract`.

use std::io::Write;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};

use mboxtract::config::{self, Config};
use mboxtract::export::attachment;
use mboxtract::scan::scan_mbox;

#[derive(Parser)]
#[command(
    name = "mboxtract",
    version,
    about = "Extract Gmail Takeout MBOX archives into JSON records"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// MBOX file to scan (shorthand for `scan FILE`)
    #[arg(value_name = "FILE")]
    file: Option<PathBuf>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan an MBOX file and print one JSON record per message
    Scan {
        path: PathBuf,
        /// Skip body content extraction (records carry `"payload": false`)
        #[arg(long)]
        no_content: bool,
        /// Skip body content hashing
        #[arg(long)]
        no_hash: bool,
        /// Suppress the progress bar
        #[arg(short, long)]
        quiet: bool,
    },
    /// Extract all base64 attachments to disk
    Attachments {
        path: PathBuf,
        /// Output directory (defaults to export.default_output_dir from config)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
    /// Generate a man page
    Manpage,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config = config::load_config();

    // Configure logging: stderr + optional log file
    let log_level = match cli.verbose {
        0 => config.general.log_level.as_str(),
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    setup_logging(log_level, &config);

    match cli.command {
        Some(Commands::Scan {
            path,
            no_content,
            no_hash,
            quiet,
        }) => cmd_scan(&path, &config, no_content, no_hash, quiet),
        None => {
            if let Some(path) = cli.file {
                cmd_scan(&path, &config, false, false, false)
            } else {
                Cli::command().print_help()?;
                Ok(())
            }
        }
        Some(Commands::Attachments { path, output }) => cmd_attachments(&path, output, &config),
        Some(Commands::Completions { shell }) => cmd_completions(shell),
        Some(Commands::Manpage) => cmd_manpage(),
    }
}

/// Set up tracing with stderr output and optional file logging.
fn setup_logging(level: &str, config: &Config) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

    // Try to set up file logging
    let log_dir = config::cache_dir(config);
    if std::fs::create_dir_all(&log_dir).is_ok() {
        let file_appender = tracing_appender::rolling::never(&log_dir, "mboxtract.log");
        let file_layer = tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(file_appender);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(file_layer)
            .init();
    } else {
        // Fall back to stderr only
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
    }
}

/// Scan an MBOX file, printing one `index/total JSON` line per message.
///
/// Records go to stdout; the progress bar and summary go to stderr so the
/// output stream stays machine-readable.
fn cmd_scan(
    path: &Path,
    config: &Config,
    no_content: bool,
    no_hash: bool,
    quiet: bool,
) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let mut scan_config = config.scan.clone();
    if no_content {
        scan_config.extract_content = false;
    }
    if no_hash {
        scan_config.hash_content = false;
    }

    let pb = if quiet {
        ProgressBar::hidden()
    } else {
        let bar = ProgressBar::new(std::fs::metadata(path)?.len());
        bar.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} Counting [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
                )
                .expect("valid template")
                .progress_chars("#>-"),
        );
        bar
    };

    let stdout = std::io::stdout();
    let mut out = std::io::BufWriter::new(stdout.lock());
    let mut write_error: Option<std::io::Error> = None;

    let summary = scan_mbox(
        path,
        &scan_config,
        &mut |index, total, record| {
            if index == 1 {
                pb.finish_and_clear();
            }
            let json = match serde_json::to_string(&record) {
                Ok(json) => json,
                Err(e) => {
                    tracing::warn!(index, error = %e, "Failed to serialize record");
                    return true;
                }
            };
            match writeln!(out, "{index}/{total} {json}") {
                Ok(()) => true,
                Err(e) => {
                    write_error = Some(e);
                    false
                }
            }
        },
        Some(&|current, total| {
            pb.set_length(total);
            pb.set_position(current);
        }),
    )?;

    pb.finish_and_clear();

    // Downstream consumers like `head` close the pipe early, surfacing at
    // a record write or only at the final flush
    if let Some(e) = write_error.or_else(|| out.flush().err()) {
        if e.kind() == std::io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(e.into());
    }

    use humansize::{format_size, BINARY};
    eprintln!();
    eprintln!("  {:<20} {}", "File", path.display());
    eprintln!(
        "  {:<20} {}",
        "File size",
        format_size(summary.file_size, BINARY)
    );
    eprintln!("  {:<20} {}", "Messages", summary.message_count);
    eprintln!("  {:<20} {:.2?}", "Scan time", summary.elapsed);
    eprintln!();

    Ok(())
}

/// Extract all base64 attachments from an MBOX file.
fn cmd_attachments(path: &Path, output: Option<PathBuf>, config: &Config) -> anyhow::Result<()> {
    if !path.exists() {
        anyhow::bail!("File not found: {}", path.display());
    }

    let output = match output.or_else(|| config.export.default_output_dir.clone()) {
        Some(dir) => dir,
        None => anyhow::bail!(
            "No output directory given (pass --output or set export.default_output_dir)"
        ),
    };

    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} Extracting [{bar:40.cyan/blue}] {pos}/{len}")
            .expect("valid template")
            .progress_chars("#>-"),
    );

    let paths = attachment::extract_all(path, &output, &config.scan, &|current, total| {
        pb.set_length(total as u64);
        pb.set_position(current as u64);
    })?;

    pb.finish_and_clear();
    println!(
        "  Extracted {} attachment(s) to {}",
        paths.len(),
        output.display()
    );

    Ok(())
}

/// Generate shell completions and print to stdout.
fn cmd_completions(shell: clap_complete::Shell) -> anyhow::Result<()> {
    let mut cmd = Cli::command();
    clap_complete::generate(shell, &mut cmd, "mboxtract", &mut std::io::stdout());
    Ok(())
}

/// Generate a man page and print to stdout.
fn cmd_manpage() -> anyhow::Result<()> {
    let cmd = Cli::command();
    let man = clap_mangen::Man::new(cmd);
    let mut buf = Vec::new();
    man.render(&mut buf)?;
    std::io::stdout().write_all(&buf)?;
    Ok(())
}
