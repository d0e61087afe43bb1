//! Periodic enemy spawning for combat scenes.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::{Team, UnitId};
use crate::controllers::{EnemyController, WanderWhenIdleController};
use crate::data::UnitCatalog;
use crate::math::{Millis, Vec2};
use crate::unit_system::UnitSystem;

/// Spawner tuning.
///
/// # Example RON
///
/// ```ron
/// SpawnerConfig(
///     max_enemies: 10,
///     spawn_every_ms: 500.0,
///     initial_delay_ms: 400.0,
///     margin: 200.0,
///     pool: ["slime4", "slime5", "slime6"],
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnerConfig {
    /// Live enemies above which nothing spawns.
    pub max_enemies: usize,
    /// Interval between spawn checks.
    pub spawn_every_ms: Millis,
    /// Delay before the first check.
    pub initial_delay_ms: Millis,
    /// Distance from the world edge kept free of spawns (px).
    pub margin: f32,
    /// Catalog keys to pick from, uniformly.
    pub pool: Vec<String>,
}

impl Default for SpawnerConfig {
    fn default() -> Self {
        Self {
            max_enemies: 10,
            spawn_every_ms: 500.0,
            initial_delay_ms: 400.0,
            margin: 200.0,
            pool: vec!["slime4".into(), "slime5".into(), "slime6".into()],
        }
    }
}

/// Tops up live enemies inside the world bounds.
#[derive(Debug, Clone)]
pub struct EnemySpawner {
    config: SpawnerConfig,
    next_check_at: Millis,
    spawned: u64,
}

impl EnemySpawner {
    /// Spawner whose first check happens `initial_delay_ms` after `now`.
    #[must_use]
    pub fn new(config: SpawnerConfig, now: Millis) -> Self {
        let next_check_at = now + config.initial_delay_ms;
        Self {
            config,
            next_check_at,
            spawned: 0,
        }
    }

    /// Tuning.
    #[must_use]
    pub fn config(&self) -> &SpawnerConfig {
        &self.config
    }

    /// Enemies spawned so far.
    #[must_use]
    pub fn spawned(&self) -> u64 {
        self.spawned
    }

    /// Time of the next spawn check.
    #[must_use]
    pub fn next_check_at(&self) -> Millis {
        self.next_check_at
    }

    /// Run a spawn check if one is due. Spawns at most one enemy per check,
    /// and only while fewer than `max_enemies` enemies are alive.
    pub fn update<R: Rng + ?Sized>(
        &mut self,
        now: Millis,
        system: &mut UnitSystem,
        catalog: &UnitCatalog,
        rng: &mut R,
    ) -> Vec<UnitId> {
        if now < self.next_check_at {
            return Vec::new();
        }
        self.next_check_at = now + self.config.spawn_every_ms;

        if system.alive_count(Team::Enemy) >= self.config.max_enemies {
            return Vec::new();
        }
        let Some(pos) = self.pick_position(system, rng) else {
            return Vec::new();
        };
        if self.config.pool.is_empty() {
            return Vec::new();
        }

        let key = &self.config.pool[rng.random_range(0..self.config.pool.len())];
        let Some(def) = catalog.get(key) else {
            tracing::warn!(def = %key, "enemy spawn skipped: unknown unit definition");
            return Vec::new();
        };

        let base = Box::new(EnemyController::new(rng));
        let controller = Box::new(WanderWhenIdleController::new(base, rng));
        let id = system.add(def, pos, controller).id();
        system.assign_ids();
        self.spawned += 1;

        tracing::debug!(unit = %id, def = %key, x = pos.x, y = pos.y, "enemy spawned");
        vec![id]
    }

    /// Uniform point inside the world bounds shrunk by the margin. Each
    /// axis range collapses to its lower end when the world is too small.
    fn pick_position<R: Rng + ?Sized>(&self, system: &UnitSystem, rng: &mut R) -> Option<Vec2> {
        let bounds = system.world_bounds().filter(|b| !b.is_empty())?;
        let m = self.config.margin;

        let lo_x = bounds.x + m;
        let hi_x = (bounds.x + bounds.width - m).max(lo_x);
        let lo_y = bounds.y + m;
        let hi_y = (bounds.y + bounds.height - m).max(lo_y);

        Some(Vec2::new(
            rng.random_range(lo_x..=hi_x),
            rng.random_range(lo_y..=hi_y),
        ))
    }
}
