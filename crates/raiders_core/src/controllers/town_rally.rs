//! Non-combat milling around the scene center.

use rand::Rng;

use super::wander::{Anchor, Gait, Wander, WanderTuning};
use super::{UnitContext, UnitController};
use crate::unit::UnitEntity;

/// Idles and strolls around the world center. Never acquires targets and
/// never produces hit intents.
#[derive(Debug, Clone)]
pub struct TownRallyController {
    wander: Wander,
}

impl TownRallyController {
    const TUNING: WanderTuning = WanderTuning {
        anchor: Anchor::SceneCenter,
        gait: Gait::Rally,
        rest_bias: (0.45, 0.8),
        radius: (140.0, 320.0),
        speed_mul: (0.85, 1.15),
        arrive_within: 18.0,
        rest_delay: (600, 1400),
        walk_delay: (700, 1600),
        arrival_delay: (400, 1200),
        detect_stuck: false,
    };

    /// New controller with personality drawn from `rng`.
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            wander: Wander::new(Self::TUNING, rng),
        }
    }

    /// Probability of staying idle on each decision.
    #[must_use]
    pub fn rest_bias(&self) -> f32 {
        self.wander.rest_bias()
    }

    /// Max offset (px, per axis) from the world center.
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.wander.radius()
    }

    /// Multiplier applied to the unit's walk speed.
    #[must_use]
    pub fn walk_speed_mul(&self) -> f32 {
        self.wander.speed_mul()
    }
}

impl UnitController for TownRallyController {
    fn update(&mut self, ctx: &UnitContext<'_>, unit: &mut UnitEntity) {
        if unit.is_dead() {
            return;
        }
        self.wander.update(ctx.now, unit);
    }

    fn name(&self) -> &'static str {
        "town_rally"
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::components::{Team, UnitSnapshot};
    use crate::controllers::test_support::{snap, unit};
    use crate::math::Vec2;

    #[test]
    fn test_personality_in_range() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..50 {
            let c = TownRallyController::new(&mut rng);
            assert!((0.45..0.8).contains(&c.rest_bias()));
            assert!((140.0..320.0).contains(&c.radius()));
            assert!((0.85..1.15).contains(&c.walk_speed_mul()));
        }
    }

    #[test]
    fn test_never_attacks() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut c = TownRallyController::new(&mut rng);
        let mut me = unit(1, Team::Ally, Vec2::ZERO);
        me.set_scene_center(Vec2::new(500.0, 500.0));
        let others: Vec<UnitSnapshot> = vec![snap(2, Team::Enemy, Vec2::new(30.0, 0.0), 50.0)];

        let mut now = 0.0;
        for _ in 0..500 {
            c.update(
                &UnitContext {
                    now,
                    dt: 16.0,
                    others: &others,
                },
                &mut me,
            );
            me.apply_intent(16.0);
            assert!(me.hit_intent().is_none());
            assert!(!me.action().contains("attack"));
            now += 16.0;
        }
    }

    #[test]
    fn test_walks_around_scene_center() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut c = TownRallyController::new(&mut rng);
        let mut me = unit(1, Team::Ally, Vec2::ZERO);
        let center = Vec2::new(1000.0, 1000.0);
        me.set_scene_center(center);

        let mut now = 0.0;
        let mut seen = None;
        for _ in 0..2000 {
            c.update(
                &UnitContext {
                    now,
                    dt: 16.0,
                    others: &[],
                },
                &mut me,
            );
            if let Some(intent) = me.move_intent() {
                seen = Some(intent);
                break;
            }
            now += 16.0;
        }

        let intent = seen.expect("rally should eventually walk");
        let r = c.radius();
        assert!((intent.target.x - center.x).abs() <= r);
        assert!((intent.target.y - center.y).abs() <= r);
        let speed = me.stats().walk_speed * c.walk_speed_mul();
        assert!((intent.speed - speed).abs() < 1e-3);
    }
}
