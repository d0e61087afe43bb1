//! Run metrics for balance analysis.
//!
//! [`MetricsCollector`] consumes the [`FrameReport`] of every frame and
//! keeps per-team combat totals. Unit teams are remembered across frames
//! because enemies are purged the tick they die.

use std::collections::BTreeMap;

use raiders_core::components::{Team, UnitId};
use raiders_core::math::Millis;
use raiders_core::scene::FrameReport;
use raiders_core::unit_system::UnitSystem;
use serde::{Deserialize, Serialize};

/// Combat totals for one team.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamMetrics {
    /// Hits landed.
    pub hits: u64,
    /// Damage dealt.
    pub damage_dealt: f64,
    /// Opposing units killed.
    pub kills: u64,
    /// Own units that died.
    pub deaths: u64,
    /// Units alive at the end of the run.
    pub survivors: u64,
}

/// Complete metrics for a single run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunMetrics {
    /// Scenario name.
    pub scenario: String,
    /// Seed used.
    pub seed: u64,
    /// Ticks simulated.
    pub ticks: u64,
    /// Simulated time in milliseconds.
    pub duration_ms: Millis,
    /// Hits landed by anyone.
    pub total_hits: u64,
    /// Ally totals.
    pub allies: TeamMetrics,
    /// Enemy totals.
    pub enemies: TeamMetrics,
    /// Guild members that fell.
    pub members_fallen: u64,
    /// Fallen members recalled to town.
    pub members_recalled: u64,
    /// Enemies created by the spawner.
    pub enemies_spawned: u64,
    /// Final coordinator state hash (for determinism validation).
    pub final_state_hash: u64,
}

impl RunMetrics {
    /// Totals for `team`.
    #[must_use]
    pub fn team(&self, team: Team) -> &TeamMetrics {
        match team {
            Team::Ally => &self.allies,
            Team::Enemy => &self.enemies,
        }
    }

    fn team_mut(&mut self, team: Team) -> &mut TeamMetrics {
        match team {
            Team::Ally => &mut self.allies,
            Team::Enemy => &mut self.enemies,
        }
    }
}

/// Accumulates [`RunMetrics`] frame by frame.
#[derive(Debug, Default)]
pub struct MetricsCollector {
    metrics: RunMetrics,
    teams: BTreeMap<UnitId, Team>,
}

impl MetricsCollector {
    /// Collector for `scenario` run with `seed`.
    #[must_use]
    pub fn new(scenario: impl Into<String>, seed: u64) -> Self {
        Self {
            metrics: RunMetrics {
                scenario: scenario.into(),
                seed,
                ..RunMetrics::default()
            },
            teams: BTreeMap::new(),
        }
    }

    /// Remember the team of every live unit.
    pub fn observe(&mut self, system: &UnitSystem) {
        for unit in system.units() {
            self.teams.insert(unit.id(), unit.team());
        }
    }

    /// Fold one frame in. Call [`observe`](Self::observe) before the frame
    /// so units purged during it can still be attributed.
    pub fn record_frame(&mut self, report: &FrameReport, system: &UnitSystem) {
        for id in &report.spawned {
            if let Some(unit) = system.get(*id) {
                self.teams.insert(*id, unit.team());
            }
        }

        let m = &mut self.metrics;
        m.ticks += 1;
        m.enemies_spawned += report.spawned.len() as u64;
        m.members_fallen += report.fallen.len() as u64;

        for hit in &report.events.hits {
            m.total_hits += 1;
            if let Some(&team) = self.teams.get(&hit.attacker) {
                let t = m.team_mut(team);
                t.hits += 1;
                t.damage_dealt += f64::from(hit.damage);
                if hit.killed {
                    t.kills += 1;
                }
            }
        }
        for id in &report.events.deaths {
            if let Some(&team) = self.teams.get(id) {
                m.team_mut(team).deaths += 1;
            }
        }
        for id in &report.events.removed {
            self.teams.remove(id);
        }
    }

    /// Count members brought back to town.
    pub fn record_recalled(&mut self, count: usize) {
        self.metrics.members_recalled += count as u64;
    }

    /// Final numbers, with survivors and the state hash taken from `system`.
    #[must_use]
    pub fn finish(mut self, system: &UnitSystem, duration_ms: Millis) -> RunMetrics {
        let m = &mut self.metrics;
        m.duration_ms = duration_ms;
        m.allies.survivors = system.alive_count(Team::Ally) as u64;
        m.enemies.survivors = system.alive_count(Team::Enemy) as u64;
        m.final_state_hash = system.state_hash();
        self.metrics
    }
}

/// Averages over a batch of runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Runs that completed.
    pub total_runs: usize,
    /// Mean hits per run.
    pub avg_hits: f64,
    /// Mean damage dealt by allies.
    pub avg_ally_damage: f64,
    /// Mean damage dealt by enemies.
    pub avg_enemy_damage: f64,
    /// Mean enemies killed by allies.
    pub avg_enemy_kills: f64,
    /// Mean fallen guild members.
    pub avg_members_fallen: f64,
    /// Fraction of runs where no member fell.
    pub flawless_rate: f64,
    /// Distinct final hashes; equals `total_runs` unless seeds collide.
    pub distinct_hashes: usize,
}

impl BatchSummary {
    /// Summarize `runs`.
    #[must_use]
    pub fn from_runs(runs: &[RunMetrics]) -> Self {
        if runs.is_empty() {
            return Self::default();
        }

        let n = runs.len() as f64;
        let mean = |f: &dyn Fn(&RunMetrics) -> f64| runs.iter().map(f).sum::<f64>() / n;

        let mut hashes: Vec<u64> = runs.iter().map(|r| r.final_state_hash).collect();
        hashes.sort_unstable();
        hashes.dedup();

        Self {
            total_runs: runs.len(),
            avg_hits: mean(&|r| r.total_hits as f64),
            avg_ally_damage: mean(&|r| r.allies.damage_dealt),
            avg_enemy_damage: mean(&|r| r.enemies.damage_dealt),
            avg_enemy_kills: mean(&|r| r.allies.kills as f64),
            avg_members_fallen: mean(&|r| r.members_fallen as f64),
            flawless_rate: mean(&|r| if r.members_fallen == 0 { 1.0 } else { 0.0 }),
            distinct_hashes: hashes.len(),
        }
    }
}
