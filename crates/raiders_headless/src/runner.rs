//! Drives one scenario through a [`SceneRuntime`].

use std::sync::Arc;

use raiders_core::data::UnitCatalog;
use raiders_core::math::Millis;
use raiders_core::roster::GuildRoster;
use raiders_core::scene::{FrameReport, SceneRuntime};
use tracing::{debug, info};

use crate::metrics::{MetricsCollector, RunMetrics};
use crate::scenario::{Scenario, ScenarioError};

/// Overrides applied on top of a scenario's own settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    /// Seed; the scenario's when `None`.
    pub seed: Option<u64>,
    /// Tick count; the scenario's when `None`.
    pub ticks: Option<u64>,
}

/// A scenario in progress.
#[derive(Debug)]
pub struct ScenarioRunner {
    scene: SceneRuntime,
    roster: GuildRoster,
    collector: MetricsCollector,
    dt: Millis,
    now: Millis,
    recall_dead: bool,
}

impl ScenarioRunner {
    /// Build the roster and scene for `scenario` and enter the scene at
    /// time zero.
    pub fn new(
        scenario: &Scenario,
        seed: u64,
        catalog: Arc<UnitCatalog>,
    ) -> Result<Self, ScenarioError> {
        let roster = scenario.build_roster()?;
        let mut scene = SceneRuntime::new(scenario.scene_config(), catalog, seed);
        let report = scene.enter(0.0, &roster);
        debug!(
            scenario = %scenario.name,
            seed,
            added = report.added.len(),
            skipped = report.skipped.len(),
            "scenario ready"
        );

        Ok(Self {
            scene,
            roster,
            collector: MetricsCollector::new(scenario.name.clone(), seed),
            dt: scenario.dt,
            now: 0.0,
            recall_dead: scenario.recall_dead,
        })
    }

    /// Current simulation time.
    #[must_use]
    pub fn now(&self) -> Millis {
        self.now
    }

    /// The running scene.
    #[must_use]
    pub fn scene(&self) -> &SceneRuntime {
        &self.scene
    }

    /// The guild roster as the run left it so far.
    #[must_use]
    pub fn roster(&self) -> &GuildRoster {
        &self.roster
    }

    /// Advance one frame.
    pub fn step(&mut self) -> FrameReport {
        self.now += self.dt;
        self.collector.observe(self.scene.system());
        let report = self.scene.frame(self.now, self.dt, &mut self.roster);
        self.collector.record_frame(&report, self.scene.system());

        if self.recall_dead {
            let recalled = self.roster.recall_dead_members(self.now);
            if !recalled.is_empty() {
                debug!(now = self.now, count = recalled.len(), "members recalled");
            }
            self.collector.record_recalled(recalled.len());
        }
        report
    }

    /// Run `ticks` frames and return the metrics.
    #[must_use]
    pub fn run(mut self, ticks: u64) -> RunMetrics {
        for _ in 0..ticks {
            self.step();
        }
        self.finish()
    }

    /// Stop here and return the metrics.
    #[must_use]
    pub fn finish(self) -> RunMetrics {
        self.collector.finish(self.scene.system(), self.now)
    }
}

/// Run `scenario` to completion with `options` applied.
pub fn run_scenario(
    scenario: &Scenario,
    options: RunOptions,
    catalog: Arc<UnitCatalog>,
) -> Result<RunMetrics, ScenarioError> {
    let seed = options.seed.unwrap_or(scenario.seed);
    let ticks = options.ticks.unwrap_or(scenario.ticks);

    let metrics = ScenarioRunner::new(scenario, seed, catalog)?.run(ticks);
    info!(
        scenario = %scenario.name,
        seed,
        ticks,
        hits = metrics.total_hits,
        fallen = metrics.members_fallen,
        hash = format!("{:016x}", metrics.final_state_hash),
        "run complete"
    );
    Ok(metrics)
}
