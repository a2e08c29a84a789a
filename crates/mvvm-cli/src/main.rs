//! CLI entry point for the mvvm-bind scenario replayer.
//!
//! `mvvm-sim` drives the view-model store and binding layer through a
//! scripted render tree and prints what happened at each step: render
//! outcomes, store events, and store snapshots.
//!
//! # Usage
//!
//! ```bash
//! mvvm-sim [OPTIONS] <COMMAND>
//!
//! # Replay a scenario and print the timeline
//! mvvm-sim run demos/dashboard.json
//!
//! # Deterministic ids and a JSON report
//! mvvm-sim run demos/dashboard.json --session demo --format json --output report.json
//!
//! # Show the effective store configuration
//! mvvm-sim --config mvvm.json config
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod demo;
mod scenario;
mod sim;

use std::io::Write;

use camino::Utf8PathBuf;
use clap::{Parser, Subcommand, ValueEnum};
use mvvm_core::{Config, IdGenerator};
use mvvm_store::ViewModelStore;
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::scenario::Scenario;
use crate::sim::{SimReport, Simulator};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Replays view-model binding scenarios against an in-memory store.
#[derive(Parser)]
#[command(name = "mvvm-sim", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Path to a JSON store configuration.
    ///
    /// Built-in defaults are used if not specified.
    #[arg(short, long, global = true, env = "MVVM_SIM_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Replay a scenario file.
    Run {
        /// Scenario file.
        scenario: Utf8PathBuf,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,

        /// Output file (defaults to stdout).
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,

        /// Fixed session prefix for generated ids.
        ///
        /// A random prefix is used if not specified.
        #[arg(short, long)]
        session: Option<String>,
    },

    /// Print the effective configuration as JSON.
    Config,
}

/// Report output format.
#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable timeline.
    Text,
    /// JSON report.
    Json,
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `warn` level by default so the
/// timeline stays readable.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "warn" };
        EnvFilter::new(level)
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Loads the configuration file, or the defaults.
fn load_config(cli: &Cli) -> color_eyre::Result<Config> {
    let Some(path) = &cli.config else {
        return Ok(Config::default());
    };
    if !path.exists() {
        return Err(color_eyre::eyre::eyre!("Config file does not exist: {}", path));
    }
    let config = Config::load(path)?;
    info!(path = %path, "Loaded configuration");
    Ok(config)
}

/// Builds the store the scenario runs against.
fn build_store(config: &Config, session: Option<&str>) -> ViewModelStore {
    let ids = match session {
        Some(session) => IdGenerator::with_session_prefix(config.ids, session),
        None => IdGenerator::new(config.ids),
    };
    ViewModelStore::with_id_generator(config.store, ids)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Runs the `run` command.
async fn run_scenario(
    config: &Config,
    path: &Utf8PathBuf,
    format: OutputFormat,
    output: Option<&Utf8PathBuf>,
    session: Option<&str>,
) -> color_eyre::Result<()> {
    let scenario = Scenario::load(path)?;
    info!(
        path = %path,
        bindings = scenario.bindings.len(),
        steps = scenario.steps.len(),
        "Loaded scenario"
    );

    let store = build_store(config, session);
    let report = Simulator::new(store, &scenario).run(&scenario).await?;

    let content = match format {
        OutputFormat::Text => render_text(&report),
        OutputFormat::Json => render_json(&report)?,
    };

    if let Some(output) = output {
        std::fs::write(output, &content)?;
        info!(path = %output, "Report written");
    } else {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        write!(handle, "{content}")?;
    }

    Ok(())
}

/// Runs the `config` command.
fn run_config(config: &Config) -> color_eyre::Result<()> {
    let json = serde_json::to_string_pretty(config)
        .map_err(|e| color_eyre::eyre::eyre!("Failed to serialize JSON: {}", e))?;
    let stdout = std::io::stdout();
    let mut handle = stdout.lock();
    writeln!(handle, "{json}")?;
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Renders the timeline and final store state as text.
fn render_text(report: &SimReport) -> String {
    use std::fmt::Write;

    let mut output = String::new();
    let _ = writeln!(output, "Timeline");
    let _ = writeln!(output, "========");
    for entry in &report.timeline {
        let _ = writeln!(output, "{entry}");
    }

    let snapshot = &report.snapshot;
    let _ = writeln!(output);
    let _ = writeln!(output, "Final store");
    let _ = writeln!(output, "===========");
    let _ = writeln!(output, "Mounted views: {}", snapshot.mounted_views);
    if snapshot.instances.is_empty() {
        let _ = writeln!(output, "No live instances");
    }
    for instance in &snapshot.instances {
        let _ = writeln!(
            output,
            "  {:<16} {:<16} attached {:>2}  {}",
            instance.id, instance.kind, instance.attached, instance.lifecycle
        );
    }
    output
}

/// Renders the report as JSON.
fn render_json(report: &SimReport) -> color_eyre::Result<String> {
    serde_json::to_string_pretty(report)
        .map(|mut json| {
            json.push('\n');
            json
        })
        .map_err(|e| color_eyre::eyre::eyre!("Failed to serialize JSON: {}", e))
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main(flavor = "current_thread")]
async fn main() -> color_eyre::Result<()> {
    // Install color-eyre before anything can fail
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.no_color);

    let config = load_config(&cli)?;
    match &cli.command {
        Commands::Run {
            scenario,
            format,
            output,
            session,
        } => run_scenario(&config, scenario, *format, output.as_ref(), session.as_deref()).await,
        Commands::Config => run_config(&config),
    }
}
