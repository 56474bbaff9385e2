//! batrec - Background Battery Telemetry Recorder
//!
//! The main entry point for batrec, handling:
//! - The recording daemon and its stdin control protocol
//! - Configuration and storage validation (`check`)
//! - Segment inventory listing (`segments`)

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::BufRead;
use std::path::PathBuf;

use tracing::{error, info, warn};

use br_config::{
    resolve_config_path, ConfigProvider, DefaultConfigProvider, FileConfigProvider, ResolvedConfig,
};
use br_core::engine::RecorderBuilder;
use br_core::logging::{generate_run_id, init_logging, level_from_flags, LogFormat};
use br_core::source::{SysfsTelemetrySource, DEFAULT_POWER_SUPPLY_DIR};
use br_storage::{default_segment_dir, list_segments, NoopOwnership, SegmentedWriter};

/// batrec - Background battery telemetry recorder
#[derive(Parser)]
#[command(name = "batrec")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[command(flatten)]
    global: GlobalOpts,
}

/// Global options available to all commands
#[derive(Args, Debug)]
struct GlobalOpts {
    /// Path to recorder.json (bypasses the search path; BATREC_CONFIG too)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory receiving segment files
    #[arg(long, global = true, env = "BATREC_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// Output format for command payloads on stdout
    #[arg(long, short = 'f', global = true, default_value = "text")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (quiet mode)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log format on stderr
    #[arg(long, global = true, default_value = "human")]
    log_format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
enum OutputFormat {
    /// Human-readable lines
    #[default]
    Text,
    /// Pretty-printed JSON
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the recording daemon (control commands arrive on stdin)
    Run(RunArgs),

    /// Validate configuration and storage, print the effective settings
    Check,

    /// List segment files on disk
    Segments,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Sysfs power-supply directory to sample
    #[arg(long, default_value = DEFAULT_POWER_SUPPLY_DIR)]
    power_supply: PathBuf,
}

/// Process exit codes for supervising scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExitCode {
    /// Command completed
    Clean = 0,
    /// Configuration or storage failure
    Failure = 1,
}

impl ExitCode {
    fn as_i32(self) -> i32 {
        self as i32
    }
}

fn main() {
    let cli = Cli::parse();

    let level = level_from_flags(cli.global.verbose, cli.global.quiet);
    init_logging(level, cli.global.log_format);

    let exit_code = match &cli.command {
        Commands::Run(args) => run_daemon(&cli.global, args),
        Commands::Check => run_check(&cli.global),
        Commands::Segments => run_segments(&cli.global),
    };

    std::process::exit(exit_code.as_i32());
}

// ============================================================================
// Shared helpers
// ============================================================================

fn data_dir(global: &GlobalOpts) -> PathBuf {
    global.data_dir.clone().unwrap_or_else(default_segment_dir)
}

fn provider_for(resolved: &ResolvedConfig) -> Box<dyn ConfigProvider + Send> {
    match &resolved.path {
        Some(path) => Box::new(FileConfigProvider::new(path)),
        None => Box::new(DefaultConfigProvider),
    }
}

// ============================================================================
// run
// ============================================================================

fn run_daemon(global: &GlobalOpts, args: &RunArgs) -> ExitCode {
    let run_id = generate_run_id();
    let resolved = resolve_config_path(global.config.as_deref());
    let dir = data_dir(global);
    info!(
        %run_id,
        config_source = %resolved.source,
        data_dir = %dir.display(),
        power_supply = %args.power_supply.display(),
        "starting recorder"
    );

    let source = SysfsTelemetrySource::new(&args.power_supply);
    let builder =
        RecorderBuilder::new(&dir, Box::new(source)).with_config_provider(provider_for(&resolved));
    let handle = match builder.spawn() {
        Ok(handle) => handle,
        Err(error) => {
            error!(%error, "failed to start recorder");
            return ExitCode::Failure;
        }
    };

    // Control loop: one command per stdin line. EOF means the supervising
    // parent dropped the pipe; treat it as a stop request.
    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(error) => {
                warn!(%error, "control input failed; shutting down");
                break;
            }
        };
        match line.trim() {
            "stop" | "exit" => break,
            "flush" => match handle.force_flush() {
                Ok(()) => info!("flushed"),
                Err(error) => warn!(%error, "flush failed"),
            },
            "reload" => match handle.refresh_config() {
                Ok(config) => info!(
                    interval_millis = config.interval_millis,
                    batch_size = config.batch_size,
                    "configuration reloaded"
                ),
                Err(error) => {
                    warn!(%error, "reload failed; previous configuration stays active")
                }
            },
            "" => {}
            other => warn!(command = other, "unknown control command"),
        }
    }

    match handle.stop() {
        Ok(()) => ExitCode::Clean,
        Err(error) => {
            error!(%error, "shutdown reported an error");
            ExitCode::Failure
        }
    }
}

// ============================================================================
// check
// ============================================================================

fn run_check(global: &GlobalOpts) -> ExitCode {
    let resolved = resolve_config_path(global.config.as_deref());
    let config = match provider_for(&resolved).load() {
        Ok(config) => config,
        Err(error) => {
            error!(%error, "configuration check failed");
            return ExitCode::Failure;
        }
    };

    let dir = data_dir(global);
    let probe = SegmentedWriter::new(&dir, Box::new(NoopOwnership));
    let storage_error = probe.ensure_directory().err();

    match global.format {
        OutputFormat::Json => {
            let payload = serde_json::json!({
                "config_path": resolved.path.as_ref().map(|path| path.display().to_string()),
                "config_source": resolved.source.to_string(),
                "interval_millis": config.interval_millis,
                "batch_size": config.batch_size,
                "flush_after_millis": config.flush_after_millis,
                "data_dir": dir.display().to_string(),
                "storage_ok": storage_error.is_none(),
            });
            println!("{}", serde_json::to_string_pretty(&payload).unwrap());
        }
        OutputFormat::Text => {
            println!("config source:      {}", resolved.source);
            match &resolved.path {
                Some(path) => println!("config path:        {}", path.display()),
                None => println!("config path:        (builtin defaults)"),
            }
            println!("interval_millis:    {}", config.interval_millis);
            println!("batch_size:         {}", config.batch_size);
            println!("flush_after_millis: {}", config.flush_after_millis);
            println!("data dir:           {}", dir.display());
            match &storage_error {
                None => println!("storage:            ok"),
                Some(error) => println!("storage:            unavailable ({error})"),
            }
        }
    }

    if storage_error.is_none() {
        ExitCode::Clean
    } else {
        ExitCode::Failure
    }
}

// ============================================================================
// segments
// ============================================================================

fn run_segments(global: &GlobalOpts) -> ExitCode {
    let dir = data_dir(global);
    let segments = match list_segments(&dir) {
        Ok(segments) => segments,
        Err(error) => {
            error!(%error, "failed to list segments");
            return ExitCode::Failure;
        }
    };

    match global.format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&segments).unwrap());
        }
        OutputFormat::Text => {
            if segments.is_empty() {
                println!("no segments under {}", dir.display());
            }
            for segment in &segments {
                let start = segment
                    .start_time_utc()
                    .map(|start| start.to_rfc3339())
                    .unwrap_or_else(|| "?".to_string());
                println!(
                    "{start}  {}  {:>10} B  {}",
                    segment.polarity, segment.size_bytes, segment.file_name
                );
            }
        }
    }

    ExitCode::Clean
}
