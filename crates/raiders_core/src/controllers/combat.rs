//! Acquire-target / chase / attack state machine.

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{find_target, pick_action, UnitContext, UnitController, SEPARATION_RANGE};
use crate::components::{UnitId, UnitSnapshot};
use crate::math::{Facing, Millis, Vec2};
use crate::steering::{clamp_mag, desired_velocity, separation_velocity, tangential_around_point, Neighbor};
use crate::unit::{safe_play, UnitEntity, IDLE};

/// Separation strength while chasing.
const CHASE_SEPARATION: f32 = 260.0;
/// Orbit strength when closer than [`ORBIT_NEAR`].
const ORBIT_NEAR_STRENGTH: f32 = 220.0;
const ORBIT_NEAR: f32 = 240.0;
/// Orbit strength when closer than [`ORBIT_FAR`].
const ORBIT_FAR_STRENGTH: f32 = 120.0;
const ORBIT_FAR: f32 = 420.0;
/// Attack lock used when the attack animation has no known duration.
const MIN_ATTACK_LOCK_MS: Millis = 350.0;
/// Velocity (manhattan) below which the run animation is not started.
const MOVING_EPSILON: f32 = 0.5;

/// Attack actions by preference.
const ATTACK_PRIORITY: [&str; 5] = ["attack", "attack2", "attack3", "walk_attack", "run_attack"];

/// Where the state machine currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombatState {
    /// No target in range.
    #[default]
    Idle,
    /// Moving towards the target.
    Chase,
    /// Target within reach.
    Attack,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct PendingHit {
    fire_at: Millis,
    target: UnitId,
}

/// Melee combat behavior shared by enemies, bosses and adventurers.
///
/// Timers are absolute simulation times. A new attack needs both the
/// cooldown to have elapsed and the previous hit to have resolved, so a
/// stat block with `attack_cooldown_ms < attack_windup_ms` attacks every
/// `attack_windup_ms` instead of silently dropping hits.
#[derive(Debug, Clone)]
pub struct CombatController {
    state: CombatState,
    target: Option<UnitId>,
    next_attack_at: Millis,
    pending_hit: Option<PendingHit>,
    attack_anim_until: Millis,
    attack_action: String,
    orbit_bias: f32,
}

impl CombatController {
    /// New controller with a random orbit direction.
    pub fn new<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let bias = if rng.random_bool(0.5) { -1.0 } else { 1.0 };
        Self::with_orbit_bias(bias)
    }

    /// New controller with a fixed orbit direction (sign of `bias`).
    #[must_use]
    pub fn with_orbit_bias(bias: f32) -> Self {
        Self {
            state: CombatState::Idle,
            target: None,
            next_attack_at: 0.0,
            pending_hit: None,
            attack_anim_until: 0.0,
            attack_action: ATTACK_PRIORITY[0].to_string(),
            orbit_bias: bias,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> CombatState {
        self.state
    }

    /// Current target, if any.
    #[must_use]
    pub fn target(&self) -> Option<UnitId> {
        self.target
    }

    /// Whether a scheduled hit has not landed yet.
    #[must_use]
    pub fn has_pending_hit(&self) -> bool {
        self.pending_hit.is_some()
    }

    /// Fire a due pending hit into the unit's hit slot. The pending hit is
    /// cleared either way; a missing or dead target just drops it.
    fn resolve_pending_hit(&mut self, ctx: &UnitContext<'_>, unit: &mut UnitEntity) {
        let Some(pending) = self.pending_hit else {
            return;
        };
        if ctx.now < pending.fire_at {
            return;
        }

        self.pending_hit = None;
        if ctx.find(pending.target).is_some_and(UnitSnapshot::is_alive) {
            unit.set_hit_intent(pending.target, unit.stats().damage);
        }
    }

    fn acquire<'a>(&mut self, ctx: &UnitContext<'a>, unit: &UnitEntity) -> Option<&'a UnitSnapshot> {
        let current = self
            .target
            .and_then(|id| ctx.find(id))
            .filter(|t| t.is_alive());
        if current.is_some() {
            return current;
        }

        let found = find_target(unit, ctx.others);
        self.target = found.map(|t| t.id);
        found
    }

    fn attack(&mut self, ctx: &UnitContext<'_>, unit: &mut UnitEntity, target: &UnitSnapshot, facing: Facing) {
        self.state = CombatState::Attack;
        let now = ctx.now;

        if now < self.attack_anim_until {
            safe_play(unit, &self.attack_action, facing);
            return;
        }

        if now >= self.next_attack_at && self.pending_hit.is_none() {
            self.attack_action = pick_attack_action(unit).to_string();
            safe_play(unit, &self.attack_action, facing);

            let stats = *unit.stats();
            let anim = unit.anim_duration_ms(&self.attack_action, facing);
            let lock = if anim > 0.0 {
                anim
            } else {
                MIN_ATTACK_LOCK_MS.max(stats.attack_windup_ms)
            };
            self.attack_anim_until = now + lock;
            self.pending_hit = Some(PendingHit {
                fire_at: now + stats.attack_windup_ms,
                target: target.id,
            });
            self.next_attack_at = now + stats.attack_cooldown_ms;

            tracing::trace!(unit = %unit.id(), target = %target.id, action = %self.attack_action, "attack started");
            return;
        }

        safe_play(unit, IDLE, facing);
    }

    fn chase(&mut self, ctx: &UnitContext<'_>, unit: &mut UnitEntity, target: &UnitSnapshot, dist: f32) {
        self.state = CombatState::Chase;

        let pos = unit.pos();
        let run_speed = unit.stats().run_speed;

        let desired = desired_velocity(pos, target.pos, run_speed);
        let sep = separation_velocity(
            pos,
            unit.radius(),
            ctx.others.iter().map(Neighbor::from),
            SEPARATION_RANGE,
            CHASE_SEPARATION,
        );
        let orbit_strength = if dist < ORBIT_NEAR {
            ORBIT_NEAR_STRENGTH
        } else if dist < ORBIT_FAR {
            ORBIT_FAR_STRENGTH
        } else {
            0.0
        };
        let orbit = if orbit_strength > 0.0 {
            tangential_around_point(pos, target.pos, orbit_strength, self.orbit_bias)
        } else {
            Vec2::ZERO
        };

        let vel = clamp_mag(desired + sep + orbit, run_speed);
        unit.set_pos(pos + vel * (ctx.dt / 1000.0) as f32);

        if vel.manhattan_length() > MOVING_EPSILON {
            let action = pick_action(unit, &["run", "walk"]);
            safe_play(unit, &action, Facing::from_delta(vel.x, vel.y));
        }
    }
}

impl UnitController for CombatController {
    fn update(&mut self, ctx: &UnitContext<'_>, unit: &mut UnitEntity) {
        if unit.is_dead() {
            return;
        }

        self.resolve_pending_hit(ctx, unit);

        let Some(target) = self.acquire(ctx, unit) else {
            self.state = CombatState::Idle;
            let facing = unit.facing();
            safe_play(unit, IDLE, facing);
            return;
        };

        let delta = target.pos - unit.pos();
        let dist = delta.length();
        if dist <= unit.stats().attack_range + target.radius {
            self.attack(ctx, unit, target, Facing::from_delta(delta.x, delta.y));
        } else {
            self.chase(ctx, unit, target, dist);
        }
    }

    fn name(&self) -> &'static str {
        "combat"
    }
}

fn pick_attack_action(unit: &UnitEntity) -> &'static str {
    ATTACK_PRIORITY
        .into_iter()
        .find(|a| unit.def().has_action(a))
        .unwrap_or(IDLE)
}
