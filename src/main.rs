mod models;
mod monitor;
mod pipeline;
mod settings;
mod storage;
mod transform;
mod types;

use std::io::{stderr, stdout, BufWriter, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tokio::signal;
use tokio::task::{spawn_blocking, JoinHandle};
use tokio::time::{sleep, timeout};
use tracing::level_filters::LevelFilter;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, Layer};

use crate::monitor::{MetricsLog, Monitor};
use crate::pipeline::{Orchestrator, RunMode};
use crate::settings::{PipelineConfig, DEFAULT_CONFIG_FILE};
use crate::storage::CsvStore;

const EXIT_INTERRUPTED: u8 = 130;
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);
const STATUS_PERIOD_DAYS: i64 = 7;

/// Bronze/silver/gold ETL for bank transactions with fraud detection.
#[derive(Debug, Parser)]
#[command(name = "bank-etl-pipeline", version)]
struct Cli {
    /// Layers to run.
    #[arg(long, value_enum, default_value_t = RunMode::Complete)]
    mode: RunMode,

    /// Validate the store without running the pipeline.
    #[arg(long)]
    dry_run: bool,

    /// Print the latest run and the recent history, then exit.
    #[arg(long)]
    status: bool,

    /// Print the effective configuration, then exit.
    #[arg(long)]
    show_config: bool,

    /// Re-run the pipeline every `--interval` seconds until interrupted.
    #[arg(long)]
    watch: bool,

    #[arg(long, default_value_t = 60)]
    interval: u64,

    #[arg(long, default_value = DEFAULT_CONFIG_FILE)]
    config_file: PathBuf,

    /// Store root directory, overriding `store.data_dir`.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// error, warn, info, debug or trace. Overrides `monitoring.log_level`.
    #[arg(long)]
    log_level: Option<String>,

    /// Shorthand for `--log-level debug`.
    #[arg(short, long)]
    verbose: bool
}

enum RunOutcome {
    Finished(Monitor, bool),
    Interrupted
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match PipelineConfig::load(&cli.config_file) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Failed to load configuration: {error:#}");
            return ExitCode::FAILURE;
        }
    };

    if let Some(data_dir) = &cli.data_dir {
        config.store.data_dir = data_dir.clone();
    }

    let log_level = match (&cli.log_level, cli.verbose) {
        (Some(level), _) => parse_log_level(level),
        (None, true) => LevelFilter::DEBUG,
        (None, false) => parse_log_level(&config.monitoring.log_level)
    };

    setup_logging(log_level);

    match execute(&cli, config).await {
        Ok(code) => code,
        Err(error) => {
            error!("{error:#}");
            ExitCode::FAILURE
        }
    }
}

async fn execute(cli: &Cli, config: PipelineConfig) -> Result<ExitCode> {
    if cli.show_config {
        write_to_stdout(&serde_json::to_string_pretty(&config.snapshot())?)?;
        return Ok(ExitCode::SUCCESS);
    }

    let mut monitor = Monitor::new(Some(MetricsLog::new(&config.monitoring.metrics_file)));

    //NOTE: An unreadable metrics file only costs the history, the next run rewrites it
    if let Err(error) = monitor.load_history() {
        warn!("Could not load metrics history from {}: {error}", config.monitoring.metrics_file.display());
    }

    if cli.status {
        write_to_stdout(&format_status(&monitor, &config))?;
        return Ok(ExitCode::SUCCESS);
    }

    let store = Arc::new(CsvStore::new(&config.store.data_dir));

    if cli.dry_run {
        let orchestrator = Orchestrator::new(store, config, monitor);

        return Ok(match orchestrator.validate_preconditions() {
            Ok(()) => {
                info!("Dry run: preconditions validated, nothing was written");
                ExitCode::SUCCESS
            }
            Err(error) => {
                error!("Dry run: {error}");
                ExitCode::FAILURE
            }
        });
    }

    loop {
        let orchestrator = Orchestrator::new(Arc::clone(&store), config.clone(), monitor);

        monitor = match run_once(orchestrator, cli.mode).await? {
            RunOutcome::Finished(_, success) if !cli.watch => {
                return Ok(if success { ExitCode::SUCCESS } else { ExitCode::FAILURE });
            }
            RunOutcome::Finished(monitor, _) => monitor,
            RunOutcome::Interrupted => return Ok(ExitCode::from(EXIT_INTERRUPTED))
        };

        info!("Next run in {}s", cli.interval);

        tokio::select! {
            _ = sleep(Duration::from_secs(cli.interval)) => {}
            _ = signal::ctrl_c() => {
                warn!("Interrupted, stopping watch mode");
                return Ok(ExitCode::from(EXIT_INTERRUPTED));
            }
        }
    }
}

/// Runs one pipeline on a blocking worker, cancelling it when Ctrl-C arrives.
async fn run_once(mut orchestrator: Orchestrator<CsvStore>, mode: RunMode) -> Result<RunOutcome> {
    let cancelled = orchestrator.cancellation_flag();

    let mut handle = spawn_blocking(move || {
        let result = orchestrator.run(mode);
        (orchestrator.into_monitor(), result)
    });

    tokio::select! {
        joined = &mut handle => {
            let (monitor, result) = joined?;
            let metrics = result?;

            Ok(RunOutcome::Finished(monitor, metrics.is_success()))
        }
        _ = signal::ctrl_c() => {
            warn!("Interrupted, cancelling the pipeline run");
            cancelled.store(true, Ordering::SeqCst);

            //NOTE: Give the run a chance to record itself as cancelled before the process exits
            if !wait_for_shutdown(handle, SHUTDOWN_GRACE).await {
                //NOTE: Dropping the runtime would block on the worker thread until the run ends
                error!("Pipeline run did not stop within {SHUTDOWN_GRACE:?}, exiting");
                std::process::exit(i32::from(EXIT_INTERRUPTED));
            }

            Ok(RunOutcome::Interrupted)
        }
    }
}

/// Waits up to `grace` for a cancelled run to finish. Returns `false` when it is still running.
async fn wait_for_shutdown<T>(handle: JoinHandle<T>, grace: Duration) -> bool {
    timeout(grace, handle).await.is_ok()
}

fn format_status(monitor: &Monitor, config: &PipelineConfig) -> String {
    let mut lines = vec![format!("{} v{}", config.pipeline.name, config.pipeline.version)];

    match monitor.latest() {
        Some(run) => {
            lines.push(format!("Latest run: {}", run.pipeline_id));
            lines.push(format!("  Status: {}", run.status));

            if let Some(start_time) = run.start_time {
                lines.push(format!("  Started: {}", start_time.to_rfc3339()));
            }

            lines.push(format!("  Duration: {:.2}s", run.total_duration_seconds));
            lines.push(format!("  Records: {} processed, {} failed", run.total_records_processed, run.total_records_failed));

            for layer in run.layers.values() {
                lines.push(format!(
                    "  {}: {} ({} records, {:.2}s)",
                    layer.layer_name, layer.status, layer.records_processed, layer.duration_seconds
                ));
            }

            if let Some(message) = &run.error_message {
                lines.push(format!("  Error: {message}"));
            }
        }
        None => lines.push(format!("No pipeline runs recorded in {}", config.monitoring.metrics_file.display()))
    }

    if let Some(summary) = monitor.historical_summary(STATUS_PERIOD_DAYS) {
        lines.push(format!("Last {} days:", summary.period_days));
        lines.push(format!("  Executions: {} ({} successful, {} failed)", summary.total_executions, summary.successful_executions, summary.failed_executions));
        lines.push(format!("  Success rate: {:.1}%", summary.success_rate));
        lines.push(format!("  Average duration: {:.2}s", summary.average_duration_seconds));
        lines.push(format!("  Total records: {}", summary.total_records_processed));
    }

    lines.join("\n")
}

fn parse_log_level(level: &str) -> LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => LevelFilter::TRACE,
        "debug" => LevelFilter::DEBUG,
        "info" => LevelFilter::INFO,
        "warn" | "warning" => LevelFilter::WARN,
        "error" => LevelFilter::ERROR,
        _ => {
            eprintln!("Invalid log level '{level}', defaulting to 'info'");
            LevelFilter::INFO
        }
    }
}

fn setup_logging(level: LevelFilter) {
    //NOTE: stdout is reserved for command output (status, configuration), logs go to stderr
    let terminal_log = fmt::layer()
        .with_target(false)
        .with_writer(stderr)
        .with_filter(level);

    tracing_subscriber::registry()
        .with(terminal_log)
        .init();
}

fn write_to_stdout(content: &str) -> Result<()> {
    let mut output = BufWriter::new(stdout().lock());

    writeln!(output, "{content}")?;
    output.flush()?;

    Ok(())
}
