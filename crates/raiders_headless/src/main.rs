//! Headless Idle Raiders scene runner.
//!
//! Runs scenes without graphics and prints results as JSON.
//!
//! # Usage
//!
//! ```bash
//! # Run a scenario (built-in name or RON file)
//! cargo run -p raiders_headless -- run --scenario hell_party --ticks 3600
//!
//! # Check that a seed replays identically
//! cargo run -p raiders_headless -- verify --scenario hell_party --seed 12345 --runs 5
//!
//! # Balance batch over 100 seeds
//! cargo run -p raiders_headless -- batch --scenario hell_party --count 100 --output results/batch.json
//!
//! # Check a unit catalog file
//! cargo run -p raiders_headless -- catalog --path units.ron
//! ```
//!
//! Output (stdout): JSON
//! Logs (stderr): debug information

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use raiders_core::data::UnitCatalog;
use raiders_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    runner::{run_scenario, RunOptions},
    scenario::Scenario,
};

#[derive(Parser)]
#[command(name = "raiders_headless")]
#[command(about = "Headless Idle Raiders scene runner")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single scenario
    Run {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "hell_party")]
        scenario: String,

        /// Seed (defaults to the scenario's)
        #[arg(long)]
        seed: Option<u64>,

        /// Ticks to simulate (defaults to the scenario's)
        #[arg(short, long)]
        ticks: Option<u64>,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "hell_party")]
        scenario: String,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Ticks per run (defaults to the scenario's)
        #[arg(short, long)]
        ticks: Option<u64>,
    },

    /// Run a batch of seeds in parallel
    Batch {
        /// Built-in scenario name or RON file
        #[arg(short, long, default_value = "hell_party")]
        scenario: String,

        /// Number of runs
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Starting seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Ticks per run (defaults to the scenario's)
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Worker threads (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: usize,

        /// Also write the full results to this JSON file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Validate a unit catalog
    Catalog {
        /// Catalog RON file (defaults to the built-in catalog)
        #[arg(short, long)]
        path: Option<PathBuf>,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for results)
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            seed,
            ticks,
        } => cmd_run(&scenario, RunOptions { seed, ticks }),
        Commands::Verify {
            scenario,
            seed,
            runs,
            ticks,
        } => cmd_verify(&scenario, seed, runs, ticks),
        Commands::Batch {
            scenario,
            count,
            seed,
            ticks,
            parallel,
            output,
        } => cmd_batch(&scenario, count, seed, ticks, parallel, output),
        Commands::Catalog { path } => cmd_catalog(path),
    }
}

fn fail(context: &str, err: impl std::fmt::Display) -> ! {
    tracing::error!(error = %err, "{context}");
    eprintln!("FATAL: {context}: {err}");
    std::process::exit(1);
}

fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(json) => println!("{json}"),
        Err(e) => fail("Failed to serialize output", e),
    }
}

fn load(name: &str) -> (Scenario, Arc<UnitCatalog>) {
    let scenario = Scenario::resolve(name).unwrap_or_else(|e| fail("Failed to load scenario", e));
    let catalog = scenario
        .load_catalog()
        .unwrap_or_else(|e| fail("Failed to load unit catalog", e));
    (scenario, Arc::new(catalog))
}

/// Run a single scenario
fn cmd_run(name: &str, options: RunOptions) {
    let (scenario, catalog) = load(name);
    tracing::info!(scenario = %scenario.name, "Starting run");

    match run_scenario(&scenario, options, catalog) {
        Ok(metrics) => print_json(&metrics),
        Err(e) => fail("Run failed", e),
    }
}

/// Verify determinism
fn cmd_verify(name: &str, seed: u64, runs: u32, ticks: Option<u64>) {
    let (scenario, catalog) = load(name);
    tracing::info!(
        "Verifying determinism: {} with seed {} ({} runs)",
        scenario.name,
        seed,
        runs
    );

    let report = verify_determinism(&scenario, seed, runs, ticks, &catalog)
        .unwrap_or_else(|e| fail("Verification run failed", e));
    print_json(&report);

    if report.deterministic {
        eprintln!("PASS: All {runs} runs produced identical results");
    } else {
        eprintln!("FAIL: Non-determinism detected!");
        std::process::exit(1);
    }
}

/// Run batch of seeds for balance testing
fn cmd_batch(
    name: &str,
    count: u32,
    seed: u64,
    ticks: Option<u64>,
    parallel: usize,
    output: Option<PathBuf>,
) {
    let (scenario, catalog) = load(name);
    let config = BatchConfig {
        count,
        seed_start: seed,
        ticks,
        parallel,
    };

    let results = run_batch(&scenario, config, catalog);

    if let Some(path) = output {
        if let Err(e) = results.save(&path) {
            fail("Failed to save results", e);
        }
        eprintln!("Results saved to: {}", path.display());
    }

    eprintln!("Runs: {}", results.runs.len());
    if !results.errors.is_empty() {
        eprintln!("Runs FAILED: {}", results.errors.len());
        for error in results.errors.iter().take(10) {
            eprintln!("  seed {}: {}", error.seed, error.message);
        }
    }
    eprintln!(
        "Throughput: {:.1} runs/sec",
        results.runs.len() as f64 / results.duration_seconds.max(0.001)
    );

    print_json(&results.summary);
}

/// Validate a unit catalog
fn cmd_catalog(path: Option<PathBuf>) {
    let catalog = match &path {
        Some(p) => UnitCatalog::load(p),
        None => UnitCatalog::builtin(),
    }
    .unwrap_or_else(|e| fail("Failed to load unit catalog", e));

    let problems: Vec<String> = catalog.validate().iter().map(ToString::to_string).collect();
    let keys: Vec<&str> = catalog.keys().collect();
    print_json(&serde_json::json!({
        "units": keys,
        "problems": problems,
    }));

    if !problems.is_empty() {
        std::process::exit(1);
    }
}
