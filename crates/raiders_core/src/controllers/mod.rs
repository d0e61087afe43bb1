//! Per-unit behavior strategies.
//!
//! A controller is stateful and scoped to exactly one unit. Each tick the
//! coordinator hands it the unit and a read-only view of everyone else;
//! the controller may move, turn and animate its own unit and queue at
//! most one hit intent, but never touches another unit.
//!
//! - [`CombatController`]: acquire target, chase, attack (also used for
//!   enemies, bosses and adventurers)
//! - [`WorkerController`]: flee threats, otherwise wander
//! - [`TownRallyController`]: idle/wander around the scene center only
//! - [`WanderWhenIdleController`]: wraps another controller and wanders
//!   whenever it leaves the unit idle

mod combat;
mod town_rally;
mod wander;
mod worker;

use std::fmt;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::components::UnitSnapshot;
use crate::math::Millis;
use crate::unit::{UnitEntity, IDLE};

pub use combat::{CombatController, CombatState};
pub use town_rally::TownRallyController;
pub use wander::WanderWhenIdleController;
pub use worker::WorkerController;

/// Hostile creature controller.
pub type EnemyController = CombatController;
/// Large hostile creature controller.
pub type BossController = CombatController;
/// Guild fighter controller.
pub type AdventurerController = CombatController;

/// Separation look-ahead (px) used by every steering controller.
pub const SEPARATION_RANGE: f32 = 140.0;

/// Per-tick input shared by all controllers.
#[derive(Debug, Clone, Copy)]
pub struct UnitContext<'a> {
    /// Simulation time of this tick.
    pub now: Millis,
    /// Time since the previous tick.
    pub dt: Millis,
    /// Every other unit, including dead ones (`hp <= 0`).
    pub others: &'a [UnitSnapshot],
}

impl<'a> UnitContext<'a> {
    /// Snapshot of another unit by id.
    #[must_use]
    pub fn find(&self, id: crate::components::UnitId) -> Option<&'a UnitSnapshot> {
        self.others.iter().find(|o| o.id == id)
    }
}

/// Decision logic for one unit.
pub trait UnitController: fmt::Debug + Send {
    /// Decide what `unit` does this tick.
    ///
    /// Must be a no-op when `unit` is dead.
    fn update(&mut self, ctx: &UnitContext<'_>, unit: &mut UnitEntity);

    /// Short name for logs and reports.
    fn name(&self) -> &'static str;
}

/// Nearest living opposing-team unit within aggro range.
///
/// Ties keep the first one found.
#[must_use]
pub fn find_target<'a>(unit: &UnitEntity, others: &'a [UnitSnapshot]) -> Option<&'a UnitSnapshot> {
    let team = unit.team();
    let aggro = unit.stats().aggro_range;
    let pos = unit.pos();

    let mut best: Option<(&UnitSnapshot, f32)> = None;
    for o in others {
        if !o.is_alive() || o.team == team {
            continue;
        }
        let d = pos.distance(o.pos);
        if d > aggro {
            continue;
        }
        if best.map_or(true, |(_, best_d)| d < best_d) {
            best = Some((o, d));
        }
    }
    best.map(|(o, _)| o)
}

/// First action in `preferred` the unit's visuals define.
///
/// Falls back to any defined action starting with the first preferred
/// name, then to idle.
#[must_use]
pub fn pick_action(unit: &UnitEntity, preferred: &[&str]) -> String {
    let visuals = &unit.def().visuals;
    if let Some(found) = preferred.iter().find(|a| visuals.has_action(a)) {
        return (*found).to_string();
    }

    preferred
        .first()
        .and_then(|token| {
            visuals
                .action_names()
                .into_iter()
                .find(|name| name.starts_with(token))
        })
        .unwrap_or_else(|| IDLE.to_string())
}

/// Private generator for a controller, split off the injected one.
pub(crate) fn fork_rng<R: Rng + ?Sized>(rng: &mut R) -> StdRng {
    StdRng::seed_from_u64(rng.random())
}

/// Random whole-millisecond delay in `[min, max]`.
pub(crate) fn think_delay(rng: &mut StdRng, min: u32, max: u32) -> Millis {
    Millis::from(rng.random_range(min..=max))
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::components::{Team, UnitId};
    use crate::math::Vec2;

    #[test]
    fn test_find_target_nearest_opposing() {
        let me = unit(1, Team::Ally, Vec2::ZERO);
        let others = [
            snap(2, Team::Ally, Vec2::new(10.0, 0.0), 50.0),
            snap(3, Team::Enemy, Vec2::new(300.0, 0.0), 50.0),
            snap(4, Team::Enemy, Vec2::new(200.0, 0.0), 50.0),
            snap(5, Team::Enemy, Vec2::new(100.0, 0.0), 0.0),
        ];
        assert_eq!(find_target(&me, &others).map(|s| s.id), Some(UnitId(4)));
    }

    #[test]
    fn test_find_target_respects_aggro_range() {
        let me = unit(1, Team::Ally, Vec2::ZERO);
        let others = [snap(2, Team::Enemy, Vec2::new(501.0, 0.0), 50.0)];
        assert!(find_target(&me, &others).is_none());
    }

    #[test]
    fn test_find_target_tie_keeps_first() {
        let me = unit(1, Team::Ally, Vec2::ZERO);
        let others = [
            snap(7, Team::Enemy, Vec2::new(100.0, 0.0), 50.0),
            snap(3, Team::Enemy, Vec2::new(-100.0, 0.0), 50.0),
        ];
        assert_eq!(find_target(&me, &others).map(|s| s.id), Some(UnitId(7)));
    }

    #[test]
    fn test_pick_action_prefers_in_order() {
        let me = unit(1, Team::Ally, Vec2::ZERO);
        assert_eq!(pick_action(&me, &["run", "walk"]), "run");
        assert_eq!(pick_action(&me, &["sprint", "walk"]), "walk");
    }

    #[test]
    fn test_pick_action_prefix_then_idle() {
        let me = UnitEntity::new(
            UnitId(1),
            def(Team::Ally, crate::components::UnitKind::Adventurer, stats(), &["idle", "run_fast"]),
            Vec2::ZERO,
        );
        assert_eq!(pick_action(&me, &["run", "walk"]), "run_fast");
        assert_eq!(pick_action(&me, &["walk"]), "idle");
    }
}
