//! Non-combat unit that runs from threats.

use rand::rngs::StdRng;
use rand::Rng;

use super::{find_target, fork_rng, think_delay, UnitContext, UnitController, SEPARATION_RANGE};
use crate::math::{Facing, Millis, Vec2};
use crate::steering::{clamp_mag, desired_velocity, separation_velocity, Neighbor};
use crate::unit::{safe_play, UnitEntity, IDLE};

const FLEE_SEPARATION: f32 = 280.0;
const WANDER_SEPARATION: f32 = 220.0;
/// Max offset (px, per axis) of a wander target.
const WANDER_RADIUS: i32 = 220;
/// Chance of standing still on each decision.
const REST_CHANCE: f64 = 0.6;
const ARRIVE_WITHIN: f32 = 18.0;

/// Flees the nearest opposing unit in aggro range; otherwise alternates
/// between standing idle and short walks.
#[derive(Debug, Clone)]
pub struct WorkerController {
    next_think_at: Millis,
    wander_target: Option<Vec2>,
    fleeing: bool,
    rng: StdRng,
}

impl WorkerController {
    /// New controller with a generator split off `rng`.
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            next_think_at: 0.0,
            wander_target: None,
            fleeing: false,
            rng: fork_rng(rng),
        }
    }

    /// Whether the unit ran from a threat on the last update.
    #[must_use]
    pub fn is_fleeing(&self) -> bool {
        self.fleeing
    }

    fn flee(&mut self, ctx: &UnitContext<'_>, unit: &mut UnitEntity, threat: Vec2) {
        let pos = unit.pos();
        let run_speed = unit.stats().run_speed;

        let away = (pos - threat).normalize_or_zero() * run_speed;
        let sep = separation_velocity(
            pos,
            unit.radius(),
            ctx.others.iter().map(Neighbor::from),
            SEPARATION_RANGE,
            FLEE_SEPARATION,
        );
        let vel = clamp_mag(away + sep, run_speed);

        unit.intent_stop();
        unit.set_pos(pos + vel * (ctx.dt / 1000.0) as f32);
        safe_play(unit, "run", Facing::from_delta(vel.x, vel.y));
    }

    fn think(&mut self, now: Millis, unit: &mut UnitEntity) {
        if self.rng.random_bool(REST_CHANCE) {
            self.wander_target = None;
            unit.intent_stop();
            let facing = unit.facing();
            safe_play(unit, IDLE, facing);
            self.next_think_at = now + think_delay(&mut self.rng, 500, 1400);
            return;
        }

        let offset = Vec2::new(
            self.rng.random_range(-WANDER_RADIUS..=WANDER_RADIUS) as f32,
            self.rng.random_range(-WANDER_RADIUS..=WANDER_RADIUS) as f32,
        );
        let target = unit.pos() + offset;
        self.wander_target = Some(target);
        safe_play(unit, "walk", Facing::from_delta(offset.x, offset.y));
        self.next_think_at = now + think_delay(&mut self.rng, 600, 1400);
    }

    /// Steer towards the wander target through the move intent: the
    /// queued point lies along the steered velocity, as far out as the
    /// target itself.
    fn walk(&mut self, ctx: &UnitContext<'_>, unit: &mut UnitEntity, target: Vec2) {
        let pos = unit.pos();
        let remaining = pos.distance(target);
        if remaining < ARRIVE_WITHIN {
            self.wander_target = None;
            unit.intent_stop();
            let facing = unit.facing();
            safe_play(unit, IDLE, facing);
            return;
        }

        let walk_speed = unit.stats().walk_speed;
        let desired = desired_velocity(pos, target, walk_speed);
        let sep = separation_velocity(
            pos,
            unit.radius(),
            ctx.others.iter().map(Neighbor::from),
            SEPARATION_RANGE,
            WANDER_SEPARATION,
        );
        let vel = clamp_mag(desired + sep, walk_speed);

        let speed = vel.length();
        unit.intent_move_to(pos + vel.normalize_or_zero() * remaining, speed);
        if vel.manhattan_length() > 0.5 {
            safe_play(unit, "walk", Facing::from_delta(vel.x, vel.y));
        }
    }
}

impl UnitController for WorkerController {
    fn update(&mut self, ctx: &UnitContext<'_>, unit: &mut UnitEntity) {
        if unit.is_dead() {
            return;
        }

        if let Some(threat) = find_target(unit, ctx.others) {
            if !self.fleeing {
                tracing::debug!(unit = %unit.id(), threat = %threat.id, "worker fleeing");
            }
            self.fleeing = true;
            self.wander_target = None;
            self.flee(ctx, unit, threat.pos);
            return;
        }
        self.fleeing = false;

        if ctx.now >= self.next_think_at {
            self.think(ctx.now, unit);
        }

        if let Some(target) = self.wander_target {
            self.walk(ctx, unit, target);
        }
    }

    fn name(&self) -> &'static str {
        "worker"
    }
}
