//! bxfer - Bulk transfer
//!
//! Copies every file listed in a CSV job list and writes a metadata report,
//! powered by bulkxfer.

use bulkxfer::{
    Credentials, Error as TransferError, Plan, RunSummary, TransferBuilder, TransferConfig,
    create_progress_bar, progress_callback,
};
use clap::{Parser, ValueEnum};
use dialoguer::{Confirm, Input};
use indicatif::ProgressBar;
use serde_json::{Value, json};
use std::fmt;
use std::fs::File;
use std::env;
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// bxfer - CSV-driven bulk file transfer
///
/// Reads a job list whose first two columns are the origin and target of
/// each transfer, copies the files with bounded parallelism and writes
/// `<jobs>_metadata.csv` describing the outcome of every row.
///
/// Usage:
///   bxfer JOBS_CSV
///   bxfer -c site.ini --plan JOBS_CSV
///   bxfer --init-config
#[derive(Parser, Debug)]
#[command(name = "bxfer", version, about, long_about = None)]
struct Args {
    /// CSV job list (prompted for on a terminal when omitted)
    jobs: Option<PathBuf>,

    /// Configuration file
    #[arg(short = 'c', long, default_value = "config.ini")]
    config: PathBuf,

    /// Write a configuration file with default values and exit
    #[arg(long)]
    init_config: bool,

    /// Report path (default: <JOBS_CSV stem>_metadata.csv)
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Number of concurrent transfers (overrides Threads)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// Start transfers as workers free up instead of in waves
    #[arg(long)]
    streaming: bool,

    /// Account to impersonate, as DOMAIN\user (overrides Username).
    /// The password comes from BXFER_PASSWORD, the configuration or a prompt
    #[arg(long)]
    username: Option<String>,

    /// Do not call fsync after each file (faster but less safe)
    #[arg(long)]
    no_sync: bool,

    /// Print where each row would go without copying anything
    #[arg(short = 'n', long = "plan", alias = "dry-run")]
    plan: bool,

    /// Output format
    #[arg(long, value_enum, default_value = "human")]
    output: OutputMode,

    /// Disable progress bar
    #[arg(short = 'q', long)]
    quiet: bool,

    /// Verbose logging
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Write log output to a file instead of stderr
    #[arg(long, value_name = "PATH")]
    log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// Classification of CLI failures, printed as `error[<code>]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ErrorCode {
    InvalidInput,
    Config,
    IoError,
    Report,
    Internal,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            Self::InvalidInput => "invalid_input",
            Self::Config => "config",
            Self::IoError => "io_error",
            Self::Report => "report",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type CliResult<T> = std::result::Result<T, CliError>;

#[derive(Debug, Error)]
enum CliError {
    #[error("Configuration file not found: {path} (create one with --init-config)")]
    ConfigMissing { path: PathBuf },

    #[error("No job list given")]
    MissingJobList,

    #[error("Failed to read from terminal: {source}")]
    Prompt { source: dialoguer::Error },

    #[error("Failed to read password: {source}")]
    Password { source: io::Error },

    #[error("Failed to open log file: {path}: {source}")]
    LogFile { path: PathBuf, source: io::Error },

    #[error("{source}")]
    Transfer {
        #[from]
        source: TransferError,
    },

    #[error("Failed to serialize JSON output: {source}")]
    JsonSerialize { source: serde_json::Error },
}

impl CliError {
    fn code(&self) -> ErrorCode {
        match self {
            Self::ConfigMissing { .. } | Self::MissingJobList => ErrorCode::InvalidInput,
            Self::Prompt { .. } | Self::Password { .. } | Self::LogFile { .. } => {
                ErrorCode::IoError
            }
            Self::Transfer { source } => transfer_error_code(source),
            Self::JsonSerialize { .. } => ErrorCode::Internal,
        }
    }
}

fn transfer_error_code(error: &TransferError) -> ErrorCode {
    match error {
        TransferError::JobSourceNotFound(_) | TransferError::JobSource { .. } => {
            ErrorCode::InvalidInput
        }
        TransferError::ConfigNotFound(_)
        | TransferError::Config { .. }
        | TransferError::InvalidOption { .. } => ErrorCode::Config,
        TransferError::Report { .. } => ErrorCode::Report,
        TransferError::Io(_) => ErrorCode::IoError,
        _ => ErrorCode::Internal,
    }
}

fn exit_code_for(code: ErrorCode) -> i32 {
    match code {
        ErrorCode::InvalidInput | ErrorCode::Config => 2,
        _ => 1,
    }
}

fn main() {
    if let Err(error) = run() {
        eprintln!("error[{}]: {}", error.code(), error);
        std::process::exit(exit_code_for(error.code()));
    }
}

fn run() -> CliResult<()> {
    let args = Args::parse();
    init_tracing(&args)?;

    if args.init_config {
        TransferConfig::write_default(&args.config)?;
        println!("Created {} with defaults.", args.config.display());
        return Ok(());
    }

    let config = load_or_create_config(&args.config)?;
    let jobs = match args.jobs.clone() {
        Some(path) => path,
        None => prompt_for_jobs()?,
    };

    if args.plan {
        let plan = configure_builder(&args, &jobs, config, None).plan()?;
        return emit_plan_output(&plan, args.output);
    }

    let credentials = resolve_credentials(&args, &config)?;
    // Credentials are settled here, not again by the builder
    let config = TransferConfig {
        username: None,
        password: None,
        ..config
    };
    let builder = configure_builder(&args, &jobs, config, credentials);

    let show_progress =
        !args.quiet && args.output == OutputMode::Human && io::stderr().is_terminal();
    let progress: Option<ProgressBar> = show_progress.then(|| create_progress_bar(0));
    let builder = match &progress {
        Some(bar) => builder.on_progress(progress_callback(bar.clone())),
        None => builder,
    };

    let summary = builder.run();
    if let Some(bar) = progress {
        bar.finish_and_clear();
    }
    let summary = summary?;

    match args.output {
        OutputMode::Human => {
            if !args.quiet {
                print_summary(&summary, args.verbose);
            }
            Ok(())
        }
        OutputMode::Json => print_json_value(&summary_json(&summary)),
    }
}

fn init_tracing(args: &Args) -> CliResult<()> {
    let default_level = if args.verbose {
        "debug"
    } else if args.quiet {
        "error"
    } else {
        "warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);
    let result = match &args.log_file {
        Some(path) => {
            let file = File::create(path).map_err(|source| CliError::LogFile {
                path: path.clone(),
                source,
            })?;
            builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
        }
        None => builder.with_writer(io::stderr).try_init(),
    };
    // Only fails if a subscriber is already installed
    let _ = result;
    Ok(())
}

fn load_or_create_config(path: &Path) -> CliResult<TransferConfig> {
    if !path.exists() {
        if !io::stdin().is_terminal() {
            return Err(CliError::ConfigMissing {
                path: path.to_path_buf(),
            });
        }
        eprintln!("Configuration file '{}' not found.", path.display());
        let create = Confirm::new()
            .with_prompt("Create new configuration file with defaults?")
            .default(false)
            .interact()
            .map_err(|source| CliError::Prompt { source })?;
        if !create {
            return Err(CliError::ConfigMissing {
                path: path.to_path_buf(),
            });
        }
        TransferConfig::write_default(path)?;
        eprintln!("Created {} with defaults.", path.display());
    }
    Ok(TransferConfig::load(path)?)
}

fn prompt_for_jobs() -> CliResult<PathBuf> {
    if !io::stdin().is_terminal() {
        return Err(CliError::MissingJobList);
    }
    let answer: String = Input::new()
        .with_prompt("Job list CSV path")
        .allow_empty(true)
        .interact_text()
        .map_err(|source| CliError::Prompt { source })?;
    let answer = answer.trim();
    if answer.is_empty() {
        return Err(CliError::MissingJobList);
    }
    Ok(PathBuf::from(answer))
}

/// Account to run as.
///
/// The username comes from `--username`, the configuration or, on a
/// terminal, a prompt (blank keeps the current user). The password comes
/// from `BXFER_PASSWORD`, the configuration or a hidden terminal prompt.
fn resolve_credentials(args: &Args, config: &TransferConfig) -> CliResult<Option<Credentials>> {
    let interactive = io::stdin().is_terminal();

    let username = match args.username.clone().or_else(|| config.username.clone()) {
        Some(username) => username,
        None if interactive => {
            let answer: String = Input::new()
                .with_prompt("Run as (DOMAIN\\user, blank for current user)")
                .allow_empty(true)
                .interact_text()
                .map_err(|source| CliError::Prompt { source })?;
            let answer = answer.trim();
            if answer.is_empty() {
                return Ok(None);
            }
            answer.to_owned()
        }
        None => return Ok(None),
    };

    let password = env::var("BXFER_PASSWORD")
        .ok()
        .filter(|p| !p.is_empty())
        .or_else(|| config.password.clone());
    match password {
        Some(password) => Ok(Some(Credentials::new(username, password))),
        None if interactive => {
            let password = rpassword::prompt_password(format!("Password for {username}: "))
                .map_err(|source| CliError::Password { source })?;
            Ok(Some(Credentials::new(username, password)))
        }
        None => {
            tracing::warn!(
                user = %username,
                "no password given (set BXFER_PASSWORD), proceeding with current user"
            );
            Ok(None)
        }
    }
}

fn configure_builder(
    args: &Args,
    jobs: &Path,
    config: TransferConfig,
    credentials: Option<Credentials>,
) -> TransferBuilder {
    let mut builder = TransferBuilder::new(jobs).config(config);

    if let Some(threads) = args.threads {
        builder = builder.parallel(threads);
    }
    if args.streaming {
        builder = builder.streaming();
    }
    if args.no_sync {
        builder = builder.no_fsync();
    }
    if let Some(report) = &args.report {
        builder = builder.report_path(report);
    }
    if let Some(credentials) = credentials {
        builder = builder.credentials(credentials);
    }
    builder
}

fn emit_plan_output(plan: &Plan, output: OutputMode) -> CliResult<()> {
    match output {
        OutputMode::Human => {
            println!("Plan ({} jobs):", plan.entries.len());
            for entry in &plan.entries {
                match &entry.resolution {
                    Ok(resolved) => {
                        let note = if resolved.sanitized.was_altered {
                            "  [renamed]"
                        } else {
                            ""
                        };
                        println!(
                            "  row {}: {} -> {}{note}",
                            entry.row_index,
                            resolved.origin.display(),
                            resolved.target.display()
                        );
                    }
                    Err(failure) => println!("  row {}: fail: {failure}", entry.row_index),
                }
            }
            println!("Report: {}", plan.report_path.display());
            Ok(())
        }
        OutputMode::Json => {
            let items: Vec<Value> = plan
                .entries
                .iter()
                .map(|entry| match &entry.resolution {
                    Ok(resolved) => json!({
                        "row": entry.row_index,
                        "origin": display_path(&resolved.origin),
                        "target": display_path(&resolved.target),
                        "renamed": resolved.sanitized.was_altered,
                        "mask": resolved.sanitized.mask_string(),
                    }),
                    Err(failure) => json!({
                        "row": entry.row_index,
                        "error": failure.to_string(),
                    }),
                })
                .collect();
            print_json_value(&json!({
                "schema_version": "1.0",
                "mode": "plan",
                "parallel": plan.options.parallel,
                "report_path": display_path(&plan.report_path),
                "target_base": display_path(&plan.target_base),
                "header": plan.header,
                "items": items,
            }))
        }
    }
}

fn summary_json(summary: &RunSummary) -> Value {
    let stats = &summary.stats;
    json!({
        "schema_version": "1.0",
        "mode": "execute",
        "total": stats.total,
        "succeeded": stats.succeeded,
        "failed": stats.failed,
        "bytes_copied": stats.bytes_copied,
        "report_errors": stats.report_errors,
        "duration_ms": u64::try_from(stats.duration.as_millis()).unwrap_or(u64::MAX),
        "report_path": display_path(&summary.report_path),
        "target_base": display_path(&summary.target_base),
        "impersonated": summary.impersonated,
    })
}

fn print_summary(summary: &RunSummary, verbose: bool) {
    let stats = &summary.stats;
    let bytes_str = format_bytes(stats.bytes_copied);

    if verbose {
        println!("Transfer completed in {:?}", stats.duration);
        println!("  Jobs:           {}", stats.total);
        println!("  Succeeded:      {}", stats.succeeded);
        println!("  Failed:         {}", stats.failed);
        println!("  Total size:     {bytes_str}");
        if stats.report_errors > 0 {
            println!("  Report errors:  {}", stats.report_errors);
        }
        if let Some(user) = &summary.impersonated {
            println!("  Ran as:         {user}");
        }
        let secs = stats.duration.as_secs_f64();
        if secs > 0.0 {
            let speed = stats.bytes_copied as f64 / secs;
            println!("  Speed:          {}/s", format_bytes(speed as u64));
        }
    } else if stats.failed == 0 {
        println!("Transferred {} files ({bytes_str})", stats.succeeded);
    } else {
        println!(
            "Transferred {} of {} files ({bytes_str}), {} failed",
            stats.succeeded, stats.total, stats.failed
        );
    }
    println!(
        "All transfers complete. Metadata written to {}",
        summary.report_path.display()
    );
}

fn print_json_value(value: &Value) -> CliResult<()> {
    let serialized =
        serde_json::to_string(value).map_err(|source| CliError::JsonSerialize { source })?;
    println!("{serialized}");
    Ok(())
}

fn display_path(path: &Path) -> String {
    path.display().to_string()
}

fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;
    const TB: u64 = GB * 1024;

    if bytes >= TB {
        format!("{:.2} TB", bytes as f64 / TB as f64)
    } else if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} B")
    }
}
