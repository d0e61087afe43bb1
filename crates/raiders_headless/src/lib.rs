//! Headless scene runner for balance testing and CI verification.
//!
//! Runs scenes of the unit simulation without any renderer:
//!
//! - **Balance testing**: run a scenario over many seeds and compare
//!   damage, kills and losses
//! - **CI verification**: replay a seed several times and check the final
//!   state hash never changes
//!
//! # Output
//!
//! - **stdout**: results as JSON
//! - **stderr**: logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! # Run a built-in scenario
//! cargo run -p raiders_headless -- run --scenario hell_party --seed 7
//!
//! # Verify determinism
//! cargo run -p raiders_headless -- verify --scenario hell_party --runs 5
//!
//! # Run a batch of seeds
//! cargo run -p raiders_headless -- batch --scenario hell_party --count 200
//! ```

pub mod batch;
pub mod metrics;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, verify_determinism, BatchConfig, BatchResults, VerifyReport};
pub use metrics::{BatchSummary, MetricsCollector, RunMetrics, TeamMetrics};
pub use runner::{run_scenario, RunOptions, ScenarioRunner};
pub use scenario::{Scenario, ScenarioError, SceneSetup, BUILTIN_SCENARIOS};
