//! rcusync CLI - Replays recorded paths against the synchronization model.
//!
//! # Usage
//!
//! ```bash
//! # Replay one instrumented path
//! rcusync trace reader_writer-2.json
//!
//! # Same, with a configuration file and JSON output
//! rcusync --json trace no_assign.json --config strict.json
//!
//! # Replay a labelled scenario corpus on the bounded backend
//! rcusync scenario corpus.json --backend verification
//!
//! # Show the effective function-name table
//! rcusync hooks --config custom.json
//! ```
//!
//! Exit status is 0 when every replayed path meets its expectation (clean
//! when none is declared) and 1 otherwise.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use rcusync_model::adapters::{Instrumenter, SymbolTable, TraceOutcome};
use rcusync_model::domain::lock::{ProductionBackend, VerificationBackend};
use rcusync_model::domain::{Operand, ProductionModel, ReplayOutcome, ViolationReport};
use rcusync_model::infrastructure::{load_config, load_scenarios, load_trace};
use rcusync_model::ModelConfig;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Lock-discipline and RCU protocol checker for recorded program paths
#[derive(Parser)]
#[command(name = "rcusync", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct GlobalArgs {
    /// Print results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all logging
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an instrumented call trace
    Trace {
        /// Trace file (JSON)
        file: PathBuf,

        /// Model configuration; overrides the trace's own
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Replay labelled scenarios and compare verdicts
    Scenario {
        /// Scenario file (one scenario or an array, JSON)
        file: PathBuf,

        /// Lock registry to replay on
        #[arg(short, long, value_enum, default_value_t = Backend::Production)]
        backend: Backend,
    },
    /// Print the function-name → hook table
    Hooks {
        /// Model configuration whose overrides apply
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Backend {
    /// Unbounded concurrent map
    Production,
    /// Bounded array (same registry the Kani proofs use)
    Verification,
}

/// Initialize tracing with environment-based filtering.
fn init_tracing(quiet: bool, verbose: bool) {
    let filter = if quiet {
        EnvFilter::new("off")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.global.quiet, cli.global.verbose);
    info!("rcusync v{}", env!("CARGO_PKG_VERSION"));

    let ok = match cli.command {
        Commands::Trace { file, config } => run_trace(&file, config.as_deref(), cli.global.json)?,
        Commands::Scenario { file, backend } => run_scenarios(&file, backend, cli.global.json)?,
        Commands::Hooks { config } => {
            print_hooks(config.as_deref(), cli.global.json)?;
            true
        }
    };

    Ok(if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Commands
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

fn run_trace(file: &Path, config: Option<&Path>, json: bool) -> Result<bool> {
    let trace = load_trace(file).with_context(|| format!("loading trace {}", file.display()))?;
    let config = match config {
        Some(path) => load_config(Some(path))
            .with_context(|| format!("loading config {}", path.display()))?,
        None => trace.config.clone().unwrap_or_default(),
    };

    info!(file = %file.display(), events = trace.events.len(), "replaying trace");
    let mut model = ProductionModel::with_config(config.clone());
    let mut instrumenter = Instrumenter::from_config(&config);
    let outcome = instrumenter
        .replay(&mut model, &trace)
        .with_context(|| format!("replaying {}", file.display()))?;

    let ok = match outcome.expected {
        Some(_) => outcome.matched(),
        None => outcome.verdict.is_clean(),
    };
    if !ok {
        warn!(file = %file.display(), findings = outcome.findings.len(), "trace failed its expectation");
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_trace_outcome(file, &outcome, instrumenter.symbols());
    }
    Ok(ok)
}

fn run_scenarios(file: &Path, backend: Backend, json: bool) -> Result<bool> {
    let scenarios =
        load_scenarios(file).with_context(|| format!("loading scenarios {}", file.display()))?;

    info!(file = %file.display(), count = scenarios.len(), ?backend, "replaying scenarios");
    let mut outcomes = Vec::with_capacity(scenarios.len());
    for scenario in &scenarios {
        let outcome = match backend {
            Backend::Production => scenario.replay::<ProductionBackend>(),
            Backend::Verification => scenario.replay::<VerificationBackend>(),
        }
        .with_context(|| format!("replaying scenario {}", scenario.name))?;
        if !outcome.matched() {
            warn!(scenario = %outcome.name, verdict = %outcome.verdict, expected = %outcome.expected, "scenario mismatch");
        }
        outcomes.push(outcome);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&outcomes)?);
    } else {
        print_scenario_outcomes(&outcomes);
    }
    Ok(outcomes.iter().all(ReplayOutcome::matched))
}

fn print_hooks(config: Option<&Path>, json: bool) -> Result<()> {
    let config: ModelConfig = load_config(config).context("loading config")?;
    let entries = config.hook_table().entries();

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
    } else {
        for entry in &entries {
            let mode = serde_json::to_value(entry.mode)?;
            println!(
                "{:<28} {:<9} {}",
                entry.function,
                mode.as_str().unwrap_or_default(),
                entry.hook
            );
        }
    }
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Output
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Operand by its program name where the trace gave one
fn operand_name(operand: Operand, symbols: &SymbolTable) -> String {
    let named = match operand {
        Operand::Lock(lock) => symbols.lock_name(lock).map(str::to_string),
        Operand::Slot(slot) => symbols.slot_name(slot).map(str::to_string),
        Operand::Thread(thread) => symbols.thread_name(thread).map(str::to_string),
    };
    named.unwrap_or_else(|| operand.to_string())
}

fn describe(report: &ViolationReport, symbols: Option<&SymbolTable>) -> String {
    let operand = match symbols {
        Some(symbols) => operand_name(report.operand, symbols),
        None => report.operand.to_string(),
    };
    let mut line = format!("#{} {} on {}", report.seq, report.kind, operand);
    if let Some(thread) = report.thread {
        let name = symbols
            .and_then(|s| s.thread_name(thread))
            .map_or_else(|| thread.to_string(), str::to_string);
        line.push_str(&format!(" by {}", name));
    }
    line.push_str(&format!(": {}", report.rule));
    if let Some(detail) = &report.detail {
        line.push_str(&format!(" ({})", detail));
    }
    line
}

fn print_trace_outcome(file: &Path, outcome: &TraceOutcome, symbols: &SymbolTable) {
    let status = if outcome.matched() { "ok" } else { "MISMATCH" };
    match outcome.expected {
        Some(expected) => println!(
            "{}: {} (expected {}) [{}]",
            file.display(),
            outcome.verdict,
            expected,
            status
        ),
        None => println!("{}: {}", file.display(), outcome.verdict),
    }
    println!(
        "  {} hook calls, {} other events",
        outcome.applied, outcome.ignored
    );
    for report in &outcome.findings {
        println!("  {}", describe(report, Some(symbols)));
    }
}

fn print_scenario_outcomes(outcomes: &[ReplayOutcome]) {
    for outcome in outcomes {
        let status = if outcome.matched() { "ok" } else { "MISMATCH" };
        println!(
            "{:<32} {:<40} expected {:<40} [{}]",
            outcome.name,
            outcome.verdict.to_string(),
            outcome.expected.to_string(),
            status
        );
        if !outcome.matched() {
            for report in &outcome.findings {
                println!("    {}", describe(report, None));
            }
        }
    }
    let matched = outcomes.iter().filter(|o| o.matched()).count();
    println!("{}/{} scenarios matched", matched, outcomes.len());
}
