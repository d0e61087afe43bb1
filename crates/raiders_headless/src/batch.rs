//! Batch runner for balance testing.
//!
//! Runs one scenario over a range of seeds in parallel using rayon, and
//! checks that a single seed replays identically.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use raiders_core::data::UnitCatalog;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::metrics::{BatchSummary, RunMetrics};
use crate::runner::{run_scenario, RunOptions};
use crate::scenario::Scenario;

/// Configuration for a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Runs to perform
    pub count: u32,
    /// Seed of the first run; run `i` uses `seed_start + i`
    pub seed_start: u64,
    /// Tick count override
    pub ticks: Option<u64>,
    /// Worker threads (0 = rayon default)
    pub parallel: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            count: 100,
            seed_start: 0,
            ticks: None,
            parallel: 0,
        }
    }
}

impl BatchConfig {
    /// `count` runs starting at seed 0.
    #[must_use]
    pub fn new(count: u32) -> Self {
        Self {
            count,
            ..Self::default()
        }
    }

    /// Set seed start
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed_start = seed;
        self
    }

    /// Set tick override
    #[must_use]
    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.ticks = Some(ticks);
        self
    }
}

/// Error during batch run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchError {
    /// Seed used
    pub seed: u64,
    /// Error message
    pub message: String,
}

/// Results from a batch run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Scenario name
    pub scenario: String,
    /// Configuration used
    pub config: BatchConfig,
    /// Individual run metrics, in seed order
    pub runs: Vec<RunMetrics>,
    /// Aggregate summary
    pub summary: BatchSummary,
    /// Wall-clock runtime
    pub duration_seconds: f64,
    /// Errors encountered
    pub errors: Vec<BatchError>,
}

impl BatchResults {
    /// Save results to JSON file
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from JSON file
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

fn run_seeds(
    scenario: &Scenario,
    config: &BatchConfig,
    catalog: &Arc<UnitCatalog>,
) -> Vec<Result<RunMetrics, BatchError>> {
    (0..config.count)
        .into_par_iter()
        .map(|i| {
            let seed = config.seed_start.wrapping_add(u64::from(i));
            let options = RunOptions {
                seed: Some(seed),
                ticks: config.ticks,
            };
            run_scenario(scenario, options, Arc::clone(catalog)).map_err(|e| {
                warn!(seed, error = %e, "run failed");
                BatchError {
                    seed,
                    message: e.to_string(),
                }
            })
        })
        .collect()
}

/// Run `scenario` once per seed in `config`.
pub fn run_batch(scenario: &Scenario, config: BatchConfig, catalog: Arc<UnitCatalog>) -> BatchResults {
    let start = Instant::now();
    info!(
        scenario = %scenario.name,
        count = config.count,
        seed_start = config.seed_start,
        parallel = config.parallel,
        "starting batch"
    );

    let pool = if config.parallel > 0 {
        rayon::ThreadPoolBuilder::new()
            .num_threads(config.parallel)
            .build()
            .map_err(|e| warn!(error = %e, "thread pool unavailable, using the global pool"))
            .ok()
    } else {
        None
    };

    let results = match &pool {
        Some(pool) => pool.install(|| run_seeds(scenario, &config, &catalog)),
        None => run_seeds(scenario, &config, &catalog),
    };

    let (runs, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let runs: Vec<RunMetrics> = runs.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();

    let summary = BatchSummary::from_runs(&runs);
    let duration_seconds = start.elapsed().as_secs_f64();
    info!(
        runs = runs.len(),
        failed = errors.len(),
        secs = format!("{duration_seconds:.2}"),
        "batch complete"
    );

    BatchResults {
        scenario: scenario.name.clone(),
        config,
        runs,
        summary,
        duration_seconds,
        errors,
    }
}

/// Outcome of replaying one seed several times.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    /// Seed replayed
    pub seed: u64,
    /// Final state hash of every run
    pub hashes: Vec<u64>,
    /// Whether every run matched
    pub deterministic: bool,
}

/// Run `scenario` with `seed` `runs` times and compare final hashes.
pub fn verify_determinism(
    scenario: &Scenario,
    seed: u64,
    runs: u32,
    ticks: Option<u64>,
    catalog: &Arc<UnitCatalog>,
) -> Result<VerifyReport, crate::scenario::ScenarioError> {
    let options = RunOptions {
        seed: Some(seed),
        ticks,
    };
    let hashes = (0..runs)
        .map(|_| run_scenario(scenario, options, Arc::clone(catalog)).map(|m| m.final_state_hash))
        .collect::<Result<Vec<_>, _>>()?;
    let deterministic = hashes.windows(2).all(|w| w[0] == w[1]);

    Ok(VerifyReport {
        seed,
        hashes,
        deterministic,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Scenario, Arc<UnitCatalog>) {
        let scenario = Scenario::resolve("hell_party").expect("builtin");
        let catalog = Arc::new(UnitCatalog::builtin().expect("catalog"));
        (scenario, catalog)
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new(500).with_seed(12345).with_ticks(60);
        assert_eq!(config.count, 500);
        assert_eq!(config.seed_start, 12345);
        assert_eq!(config.ticks, Some(60));
        assert_eq!(config.parallel, 0);
    }

    #[test]
    fn test_run_batch_small() {
        let (scenario, catalog) = setup();
        let results = run_batch(&scenario, BatchConfig::new(6).with_seed(40).with_ticks(300), catalog);

        assert_eq!(results.runs.len(), 6);
        assert!(results.errors.is_empty());
        assert_eq!(results.summary.total_runs, 6);
        let seeds: Vec<u64> = results.runs.iter().map(|r| r.seed).collect();
        assert_eq!(seeds, (40..46).collect::<Vec<_>>());
    }

    #[test]
    fn test_batch_matches_single_runs() {
        let (scenario, catalog) = setup();
        let config = BatchConfig {
            parallel: 2,
            ..BatchConfig::new(3).with_seed(7).with_ticks(400)
        };
        let results = run_batch(&scenario, config, Arc::clone(&catalog));

        for run in &results.runs {
            let options = RunOptions {
                seed: Some(run.seed),
                ticks: Some(400),
            };
            let single = run_scenario(&scenario, options, Arc::clone(&catalog)).expect("runs");
            assert_eq!(single, *run);
        }
    }

    #[test]
    fn test_verify_determinism() {
        let (scenario, catalog) = setup();
        let report = verify_determinism(&scenario, 12345, 3, Some(500), &catalog).expect("runs");
        assert!(report.deterministic);
        assert_eq!(report.hashes.len(), 3);
    }

    #[test]
    fn test_batch_results_save_load() {
        let (scenario, catalog) = setup();
        let results = run_batch(&scenario, BatchConfig::new(2).with_ticks(100), catalog);

        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("out").join("results.json");
        results.save(&path).expect("save");
        assert!(path.exists());

        let loaded = BatchResults::load(&path).expect("load");
        let hashes = |r: &BatchResults| r.runs.iter().map(|m| m.final_state_hash).collect::<Vec<_>>();
        assert_eq!(hashes(&loaded), hashes(&results));
        assert_eq!(loaded.scenario, "hell_party");
    }
}
