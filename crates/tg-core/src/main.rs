//! Trend Gate Core - telemetry trend detection and regression gating
//!
//! The main entry point for tg-core, handling:
//! - Trend snapshots over the event log
//! - Regression gating against the previous window
//! - Absolute quality gating of the current window
//! - Baseline history updates and threshold suggestions

use clap::error::ErrorKind;
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tg_common::{Error, OutputFormat, Result, StructuredError, SCHEMA_VERSION};
use tg_config::{
    validate_config, validate_window_size, GateConfig, ThresholdOverrides, ValidationError,
};
use tg_core::exit_codes::ExitCode;
use tg_core::gate::{absolute_gate, regression_gate};
use tg_core::tuner::{self, Baseline};
use tg_core::trend;
use tg_telemetry::{
    load_history, read_log, read_snapshot, save_history, write_json_atomic, write_snapshot,
    TrendSnapshot,
};

/// Trend Gate Core - regression gating for pipeline telemetry
#[derive(Parser)]
#[command(name = "tg-core")]
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
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "json")]
    format: OutputFormat,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease verbosity (errors only)
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log output format on stderr
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a trend snapshot from the event log
    Snapshot(SnapshotArgs),

    /// Compare the current window against the previous one
    Gate(GateArgs),

    /// Check the current window against absolute quality floors
    Check(CheckArgs),

    /// Record a window in the baseline history and suggest thresholds
    Baseline(BaselineArgs),

    /// Print the resolved threshold configuration
    Thresholds(ThresholdsArgs),

    /// Print version information
    Version,
}

// ============================================================================
// Command argument structs
// ============================================================================

/// Where the trend snapshot comes from.
#[derive(Args, Debug)]
#[group(required = true, multiple = false)]
struct InputArgs {
    /// JSONL event log to summarize
    #[arg(long)]
    log: Option<PathBuf>,

    /// Previously written trend snapshot
    #[arg(long)]
    snapshot: Option<PathBuf>,
}

/// Overrides that take precedence over TREND_* environment variables.
#[derive(Args, Debug, Default)]
struct ConfigArgs {
    /// Threshold profile (ci, nightly, release)
    #[arg(long)]
    profile: Option<String>,

    /// Gate mode (warn, block)
    #[arg(long)]
    mode: Option<String>,

    /// Events per window
    #[arg(long)]
    window_size: Option<usize>,
}

impl ConfigArgs {
    fn overrides(&self) -> ThresholdOverrides {
        ThresholdOverrides {
            profile: self.profile.clone(),
            mode: self.mode.clone(),
            window_size: self.window_size,
            ..Default::default()
        }
    }
}

#[derive(Args, Debug)]
struct SnapshotArgs {
    /// JSONL event log to summarize
    #[arg(long)]
    log: PathBuf,

    /// Events per window
    #[arg(long)]
    window_size: Option<usize>,

    /// Also write the snapshot to this file
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct GateArgs {
    #[command(flatten)]
    input: InputArgs,

    #[command(flatten)]
    config: ConfigArgs,

    /// JSON object of provider fail-rate thresholds, e.g. '{"openai":0.05}'
    #[arg(long)]
    provider_thresholds: Option<String>,
}

#[derive(Args, Debug)]
struct CheckArgs {
    /// JSONL event log to check
    #[arg(long)]
    log: PathBuf,

    #[command(flatten)]
    config: ConfigArgs,
}

#[derive(Args, Debug)]
struct BaselineArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Baseline history file (created if missing)
    #[arg(long)]
    history: PathBuf,

    /// Also write the derived baseline to this file
    #[arg(long)]
    out: Option<PathBuf>,

    /// Events per window
    #[arg(long)]
    window_size: Option<usize>,
}

#[derive(Args, Debug)]
struct ThresholdsArgs {
    /// Threshold profile (ci, nightly, release)
    #[arg(long)]
    profile: Option<String>,
}

use tg_core::log_event;
use tg_core::logging::{
    event_names, generate_run_id, init_logging, LogConfig, LogContext, LogFormat, LogLevel, Stage,
};

// ============================================================================
// Main entry point
// ============================================================================

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::Clean,
                _ => ExitCode::ArgsError,
            };
            let _ = err.print();
            std::process::exit(code.as_i32());
        }
    };

    let cli_level = if cli.global.quiet {
        Some(LogLevel::Error)
    } else {
        match cli.global.verbose {
            0 => None,
            1 => Some(LogLevel::Debug),
            _ => Some(LogLevel::Trace),
        }
    };
    init_logging(&LogConfig::from_env(cli_level, cli.global.log_format));

    let exit_code = match &cli.command {
        Commands::Snapshot(args) => run_command(&cli.global, "snapshot", |ctx| {
            run_snapshot(&cli.global, ctx, args)
        }),
        Commands::Gate(args) => run_command(&cli.global, "gate", |ctx| {
            run_gate(&cli.global, ctx, args)
        }),
        Commands::Check(args) => run_command(&cli.global, "check", |ctx| {
            run_check(&cli.global, ctx, args)
        }),
        Commands::Baseline(args) => run_command(&cli.global, "baseline", |ctx| {
            run_baseline(&cli.global, ctx, args)
        }),
        Commands::Thresholds(args) => run_command(&cli.global, "thresholds", |_| {
            run_thresholds(&cli.global, args)
        }),
        Commands::Version => {
            print_version(&cli.global);
            ExitCode::Clean
        }
    };

    std::process::exit(exit_code.as_i32());
}

/// Run one command inside its logging context and map tooling errors.
fn run_command<F>(global: &GlobalOpts, command: &str, body: F) -> ExitCode
where
    F: FnOnce(&LogContext) -> Result<ExitCode>,
{
    let ctx = LogContext::new(generate_run_id(), command);
    let _span = ctx.span().entered();
    log_event!(
        ctx,
        DEBUG,
        event_names::RUN_STARTED,
        Stage::Init,
        "command started"
    );

    let exit_code = match body(&ctx) {
        Ok(code) => code,
        Err(err) => output_error(global, &ctx, &err),
    };

    log_event!(
        ctx,
        DEBUG,
        event_names::RUN_FINISHED,
        Stage::Init,
        "command finished",
        exit_code = exit_code.as_i32()
    );
    exit_code
}

// ============================================================================
// Command implementations
// ============================================================================

fn run_snapshot(global: &GlobalOpts, ctx: &LogContext, args: &SnapshotArgs) -> Result<ExitCode> {
    let window_size = resolve_window_size(ctx, args.window_size)?;
    let snapshot = snapshot_from_log(ctx, &args.log, window_size)?;

    if let Some(out) = &args.out {
        write_snapshot(out, &snapshot)?;
    }
    emit(global, &snapshot, || snapshot_summary(&snapshot))?;
    Ok(ExitCode::Clean)
}

fn run_gate(global: &GlobalOpts, ctx: &LogContext, args: &GateArgs) -> Result<ExitCode> {
    let config = resolve_config(
        ctx,
        args.config.overrides(),
        args.provider_thresholds.as_deref(),
    )?;
    let snapshot = load_input(ctx, &args.input, config.window_size)?;

    let report = regression_gate(&snapshot, &config);
    log_event!(
        ctx,
        INFO,
        event_names::GATE_DECISION,
        Stage::Gate,
        "regression gate evaluated",
        decision = report.decision.as_str(),
        failures = report.failures.len(),
        pipelines_evaluated = report.counters.pipelines_evaluated,
        pipelines_skipped_low_samples = report.counters.pipelines_skipped_low_samples
    );

    emit(global, &report, || report.summary_line())?;
    Ok(report.decision.exit_code())
}

fn run_check(global: &GlobalOpts, ctx: &LogContext, args: &CheckArgs) -> Result<ExitCode> {
    let config = resolve_config(ctx, args.config.overrides(), None)?;
    let snapshot = snapshot_from_log(ctx, &args.log, config.window_size)?;

    let report = absolute_gate(&snapshot, &config);
    log_event!(
        ctx,
        INFO,
        event_names::GATE_DECISION,
        Stage::Gate,
        "absolute gate evaluated",
        decision = report.decision.as_str(),
        failures = report.failures.len()
    );

    emit(global, &report, || report.summary_line())?;
    Ok(report.decision.exit_code())
}

fn run_baseline(global: &GlobalOpts, ctx: &LogContext, args: &BaselineArgs) -> Result<ExitCode> {
    let window_size = resolve_window_size(ctx, args.window_size)?;
    let snapshot = load_input(ctx, &args.input, window_size)?;

    let history = load_history(&args.history)?;
    let (history, baseline) = tuner::update(&snapshot, history);
    save_history(&args.history, &history)?;
    if let Some(out) = &args.out {
        write_json_atomic(out, &baseline)?;
    }
    log_event!(
        ctx,
        INFO,
        event_names::TUNE_UPDATED,
        Stage::Tune,
        "baseline history updated",
        samples = baseline.sample_count,
        ready = baseline.ready_for_tuning
    );

    emit(global, &baseline, || baseline_summary(&baseline))?;
    Ok(ExitCode::Clean)
}

fn run_thresholds(global: &GlobalOpts, args: &ThresholdsArgs) -> Result<ExitCode> {
    let cli = ThresholdOverrides {
        profile: args.profile.clone(),
        ..Default::default()
    };
    let config = GateConfig::resolve(&cli.layered_over(ThresholdOverrides::from_env()), None);
    validate_config(&config).map_err(|e| Error::InvalidThresholds(e.to_string()))?;

    emit(global, &config, || {
        format!(
            "profile={} mode={} window_size={} max_success_drop={} max_p95_increase_ms={} max_provider_failrate_increase={} min_pipeline_samples={} provider_overrides={}",
            config.profile,
            config.mode,
            config.window_size,
            config.thresholds.max_success_drop,
            config.thresholds.max_p95_increase_ms,
            config.thresholds.max_provider_failrate_increase,
            config.thresholds.min_pipeline_samples,
            config.thresholds.provider_overrides.len(),
        )
    })?;
    Ok(ExitCode::Clean)
}

fn print_version(global: &GlobalOpts) {
    match global.format {
        OutputFormat::Json => {
            let version_info = serde_json::json!({
                "schema_version": SCHEMA_VERSION,
                "tg_core_version": env!("CARGO_PKG_VERSION"),
                "rust_version": env!("CARGO_PKG_RUST_VERSION"),
            });
            if let Ok(text) = serde_json::to_string_pretty(&version_info) {
                println!("{}", text);
            }
        }
        OutputFormat::Summary => {
            println!(
                "tg-core {} schema_version={}",
                env!("CARGO_PKG_VERSION"),
                SCHEMA_VERSION
            );
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Layer CLI overrides over the environment, resolve, and validate.
fn resolve_config(
    ctx: &LogContext,
    cli: ThresholdOverrides,
    provider_thresholds: Option<&str>,
) -> Result<GateConfig> {
    let overrides = cli.layered_over(ThresholdOverrides::from_env());
    let config = GateConfig::resolve(&overrides, provider_thresholds);
    validate_config(&config).map_err(|err| config_invalid(ctx, err))?;
    Ok(config)
}

/// Resolve and validate only the window size. Thresholds are resolved but
/// never validated, so a bad `TREND_MAX_*` value cannot fail these commands.
fn resolve_window_size(ctx: &LogContext, cli_window: Option<usize>) -> Result<usize> {
    let cli = ThresholdOverrides {
        window_size: cli_window,
        ..Default::default()
    };
    let overrides = cli.layered_over(ThresholdOverrides::from_env());
    let window_size = GateConfig::resolve(&overrides, None).window_size;
    validate_window_size(window_size).map_err(|err| config_invalid(ctx, err))?;
    Ok(window_size)
}

fn config_invalid(ctx: &LogContext, err: ValidationError) -> Error {
    log_event!(
        ctx,
        WARN,
        event_names::CONFIG_INVALID,
        Stage::Init,
        err.to_string(),
        code = err.code()
    );
    Error::InvalidThresholds(err.to_string())
}

fn snapshot_from_log(
    ctx: &LogContext,
    path: &std::path::Path,
    window_size: usize,
) -> Result<TrendSnapshot> {
    let log = read_log(path)?;
    log_event!(
        ctx,
        INFO,
        event_names::READ_FINISHED,
        Stage::Read,
        "event log read",
        events = log.events.len(),
        dropped_lines = log.dropped_lines
    );
    let snapshot = trend::build(&log.events, window_size);
    log_event!(
        ctx,
        DEBUG,
        event_names::SUMMARIZE_WINDOW,
        Stage::Summarize,
        "windows summarized",
        current_attempts = snapshot.current.attempts,
        previous_attempts = snapshot.previous.attempts,
        success_rate = snapshot.current.overall_success_rate,
        p95_ms = snapshot.current.overall_p95_ms
    );
    Ok(snapshot)
}

fn load_input(ctx: &LogContext, input: &InputArgs, window_size: usize) -> Result<TrendSnapshot> {
    match (&input.log, &input.snapshot) {
        (_, Some(path)) => read_snapshot(path).map(trend::rederive_delta),
        (Some(path), None) => snapshot_from_log(ctx, path, window_size),
        (None, None) => Err(Error::Config(
            "one of --log or --snapshot is required".to_string(),
        )),
    }
}

/// Write a command payload to stdout.
fn emit<T, F>(global: &GlobalOpts, value: &T, summary: F) -> Result<()>
where
    T: Serialize,
    F: FnOnce() -> String,
{
    match global.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Summary => println!("{}", summary()),
    }
    Ok(())
}

/// Report a tooling error on stderr and pick its exit code.
fn output_error(global: &GlobalOpts, ctx: &LogContext, error: &Error) -> ExitCode {
    let exit_code = ExitCode::from(error);
    log_event!(
        ctx,
        ERROR,
        event_names::TOOLING_ERROR,
        Stage::Init,
        error.to_string(),
        code = error.code(),
        exit_code = exit_code.as_i32()
    );

    let structured = StructuredError::from(error);
    match global.format {
        OutputFormat::Json => eprintln!("{}", structured.to_json_pretty()),
        OutputFormat::Summary => eprintln!(
            "ERROR code={} category={} {}",
            structured.code, structured.category, structured.message
        ),
    }
    exit_code
}

fn snapshot_summary(snapshot: &TrendSnapshot) -> String {
    format!(
        "window_size={} current_events={} previous_events={} success_rate={:.4} p95_ms={:.0} delta_success_rate={:.4} delta_p95_ms={:.0}",
        snapshot.window_size,
        snapshot.current.window_events,
        snapshot.previous.window_events,
        snapshot.current.overall_success_rate,
        snapshot.current.overall_p95_ms,
        snapshot.delta.success_rate,
        snapshot.delta.p95_ms,
    )
}

fn baseline_summary(baseline: &Baseline) -> String {
    let s = &baseline.suggested_thresholds;
    format!(
        "samples={} transitions={} ready={} max_success_drop={:.4} max_p95_increase_ms={:.0} max_provider_failrate_increase={:.4} provider_overrides={}",
        baseline.sample_count,
        baseline.transition_count,
        baseline.ready_for_tuning,
        s.max_success_drop,
        s.max_p95_increase_ms,
        s.max_provider_failrate_increase,
        s.provider_overrides.len(),
    )
}
