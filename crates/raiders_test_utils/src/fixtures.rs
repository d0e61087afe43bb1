//! Test fixtures and helpers.
//!
//! Small hand-built definitions and prepared unit systems, so tests do not
//! depend on the tuning of the built-in catalog.

use std::collections::BTreeMap;
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use raiders_core::components::{BaseStats, Team, UnitId, UnitKind};
use raiders_core::controllers::{CombatController, UnitContext, UnitController};
use raiders_core::data::UnitCatalog;
use raiders_core::math::{Millis, Vec2};
use raiders_core::unit::{UnitDefinition, UnitEntity};
use raiders_core::unit_system::{TickEvents, UnitSystem, WorldBounds};
use raiders_core::visuals::{ActionClip, LayerDef, SpriteSheetVisuals};

/// Frame time used by the fixtures (~60 fps).
pub const DT: Millis = 16.0;

/// Actions every fixture definition exposes.
pub const COMBAT_ACTIONS: &[&str] = &["idle", "walk", "run", "attack"];

/// A middle-of-the-road stat block.
#[must_use]
pub fn base_stats() -> BaseStats {
    BaseStats {
        max_hp: 100.0,
        walk_speed: 100.0,
        run_speed: 200.0,
        aggro_range: 600.0,
        attack_range: 70.0,
        attack_windup_ms: 200.0,
        attack_cooldown_ms: 1000.0,
        damage: 10.0,
    }
}

/// Single-layer visuals defining `actions`, 6 frames at 12 fps each.
#[must_use]
pub fn sprite_visuals(id: &str, actions: &[&str]) -> SpriteSheetVisuals {
    let mut visuals = SpriteSheetVisuals::empty(id);
    visuals.layers.push(LayerDef {
        id: "body".to_string(),
        depth_offset: 1,
    });
    for action in actions {
        let mut files = BTreeMap::new();
        files.insert("body".to_string(), "body.png".to_string());
        visuals.actions.insert(
            (*action).to_string(),
            ActionClip {
                folder: (*action).to_string(),
                files,
                fps: Some(12),
                ..ActionClip::default()
            },
        );
    }
    visuals
}

/// Definition with radius 20 and the given stats and actions.
#[must_use]
pub fn unit_def(id: &str, team: Team, kind: UnitKind, stats: BaseStats, actions: &[&str]) -> UnitDefinition {
    UnitDefinition {
        id: id.to_string(),
        kind,
        team,
        radius: 20.0,
        base_stats: stats,
        visuals: Arc::new(sprite_visuals(id, actions)),
    }
}

/// Hostile mob fixture.
#[must_use]
pub fn mob_def() -> Arc<UnitDefinition> {
    Arc::new(unit_def("mob", Team::Enemy, UnitKind::Mob, base_stats(), COMBAT_ACTIONS))
}

/// Allied fighter fixture, sturdier and harder hitting than the mob.
#[must_use]
pub fn hero_def() -> Arc<UnitDefinition> {
    let stats = BaseStats {
        max_hp: 200.0,
        damage: 25.0,
        ..base_stats()
    };
    Arc::new(unit_def("hero", Team::Ally, UnitKind::Adventurer, stats, COMBAT_ACTIONS))
}

/// Allied worker fixture that never attacks.
#[must_use]
pub fn worker_def() -> Arc<UnitDefinition> {
    let stats = BaseStats {
        attack_range: 0.0,
        damage: 0.0,
        ..base_stats()
    };
    Arc::new(unit_def(
        "digger",
        Team::Ally,
        UnitKind::Worker,
        stats,
        &["idle", "walk", "run"],
    ))
}

/// Catalog with `mob`, `hero` and `digger`.
#[must_use]
pub fn fixture_catalog() -> UnitCatalog {
    let mut catalog = UnitCatalog::new();
    for def in [mob_def(), hero_def(), worker_def()] {
        catalog.insert((*def).clone());
    }
    catalog
}

/// Controller that never does anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct InertController;

impl UnitController for InertController {
    fn update(&mut self, _ctx: &UnitContext<'_>, _unit: &mut UnitEntity) {}

    fn name(&self) -> &'static str {
        "inert"
    }
}

/// Heroes on the left, mobs on the right, all under combat controllers
/// seeded from `seed`. Bounds are 2000 x 2000.
#[must_use]
pub fn skirmish(seed: u64, heroes: usize, mobs: usize) -> UnitSystem {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut system = UnitSystem::new();
    system.set_world_bounds(WorldBounds::new(0.0, 0.0, 2000.0, 2000.0));

    for i in 0..heroes {
        let pos = Vec2::new(200.0, 200.0 + i as f32 * 60.0);
        system.add(hero_def(), pos, Box::new(CombatController::new(&mut rng)));
    }
    for i in 0..mobs {
        let pos = Vec2::new(900.0, 200.0 + i as f32 * 60.0);
        system.add(mob_def(), pos, Box::new(CombatController::new(&mut rng)));
    }
    system
}

/// Drives a [`UnitSystem`] with a fixed timestep.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Clock {
    /// Current simulation time.
    pub now: Millis,
    /// Step size.
    pub dt: Millis,
}

impl Default for Clock {
    fn default() -> Self {
        Self { now: 0.0, dt: DT }
    }
}

impl Clock {
    /// Advance time and tick `system` once.
    pub fn step(&mut self, system: &mut UnitSystem) -> TickEvents {
        self.now += self.dt;
        system.update(self.now, self.dt)
    }

    /// Tick `system` `ticks` times, collecting every event.
    pub fn run(&mut self, system: &mut UnitSystem, ticks: u64) -> TickEvents {
        let mut all = TickEvents::default();
        for _ in 0..ticks {
            let events = self.step(system);
            all.hits.extend(events.hits);
            all.deaths.extend(events.deaths);
            all.removed.extend(events.removed);
        }
        all
    }
}

/// Id of the first unit on `team`, in processing order.
#[must_use]
pub fn first_of(system: &UnitSystem, team: Team) -> Option<UnitId> {
    system.units().find(|u| u.team() == team).map(UnitEntity::id)
}
