//! Idle wandering, shared by the town rally controller and the
//! wander-when-idle decorator.

use rand::rngs::StdRng;
use rand::Rng;

use super::{fork_rng, pick_action, think_delay, UnitContext, UnitController};
use crate::math::{Facing, Millis, Vec2};
use crate::unit::{safe_play, UnitEntity, IDLE};

/// Improvement (px) that counts as progress towards the wander target.
const STUCK_PROGRESS: f32 = 0.5;
/// Window (ms) in which progress must be made.
const STUCK_WINDOW_MS: Millis = 800.0;
/// Distance under which the decorator bothers turning towards its target.
const FACE_MIN_DIST: f32 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    Walk,
}

/// Where wander targets are picked around.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Anchor {
    /// The coordinator's world center, or the unit itself when unknown.
    SceneCenter,
    /// Wherever the unit is when it decides to walk.
    Unit,
}

/// How a walking unit chooses its animation and facing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Gait {
    /// "walk", else "run", else a prefix match; always faces the target.
    Rally,
    /// "walk" if defined, else idle; only faces the target when not on top of it.
    Stroll,
}

/// Tuning for one wander flavor. Delay ranges are inclusive milliseconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WanderTuning {
    pub anchor: Anchor,
    pub gait: Gait,
    pub rest_bias: (f32, f32),
    pub radius: (f32, f32),
    pub speed_mul: (f32, f32),
    pub arrive_within: f32,
    pub rest_delay: (u32, u32),
    pub walk_delay: (u32, u32),
    pub arrival_delay: (u32, u32),
    pub detect_stuck: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct StuckWatch {
    best_dist: f32,
    until: Millis,
}

/// Randomized idle/walk loop with personality drawn at construction.
#[derive(Debug, Clone)]
pub(crate) struct Wander {
    tuning: WanderTuning,
    phase: Phase,
    next_think_at: Millis,
    target: Vec2,
    rest_bias: f32,
    radius: f32,
    speed_mul: f32,
    stuck: Option<StuckWatch>,
    rng: StdRng,
}

impl Wander {
    pub(crate) fn new<R: Rng + ?Sized>(tuning: WanderTuning, rng: &mut R) -> Self {
        let mut rng = fork_rng(rng);
        let rest_bias = rng.random_range(tuning.rest_bias.0..tuning.rest_bias.1);
        let radius = rng.random_range(tuning.radius.0..tuning.radius.1);
        let speed_mul = if tuning.speed_mul.0 < tuning.speed_mul.1 {
            rng.random_range(tuning.speed_mul.0..tuning.speed_mul.1)
        } else {
            tuning.speed_mul.0
        };

        Self {
            tuning,
            phase: Phase::Idle,
            next_think_at: 0.0,
            target: Vec2::ZERO,
            rest_bias,
            radius,
            speed_mul,
            stuck: None,
            rng,
        }
    }

    pub(crate) fn is_walking(&self) -> bool {
        self.phase == Phase::Walk
    }

    pub(crate) fn rest_bias(&self) -> f32 {
        self.rest_bias
    }

    pub(crate) fn radius(&self) -> f32 {
        self.radius
    }

    pub(crate) fn speed_mul(&self) -> f32 {
        self.speed_mul
    }

    /// Stop walking without touching the think timer.
    pub(crate) fn cancel(&mut self, unit: &mut UnitEntity) {
        if self.phase == Phase::Walk {
            self.phase = Phase::Idle;
            self.stuck = None;
            unit.intent_stop();
        }
    }

    fn delay(&mut self, range: (u32, u32)) -> Millis {
        think_delay(&mut self.rng, range.0, range.1)
    }

    fn go_idle(&mut self, unit: &mut UnitEntity, now: Millis, delay: (u32, u32)) {
        self.phase = Phase::Idle;
        self.stuck = None;
        unit.intent_stop();
        let facing = unit.facing();
        safe_play(unit, IDLE, facing);
        self.next_think_at = now + self.delay(delay);
    }

    pub(crate) fn update(&mut self, now: Millis, unit: &mut UnitEntity) {
        if now >= self.next_think_at {
            match self.phase {
                Phase::Idle => {
                    if self.rng.random::<f32>() < self.rest_bias {
                        self.go_idle(unit, now, self.tuning.rest_delay);
                        return;
                    }

                    let anchor = match self.tuning.anchor {
                        Anchor::SceneCenter => unit.scene_center().unwrap_or(unit.pos()),
                        Anchor::Unit => unit.pos(),
                    };
                    let r = self.radius;
                    self.target = anchor
                        + Vec2::new(self.rng.random_range(-r..r), self.rng.random_range(-r..r));
                    self.phase = Phase::Walk;
                    self.next_think_at = now + self.delay(self.tuning.walk_delay);
                    tracing::trace!(unit = %unit.id(), x = self.target.x, y = self.target.y, "wander target");
                }
                Phase::Walk => {
                    self.next_think_at = now + self.delay(self.tuning.walk_delay);
                }
            }
        }

        if self.phase == Phase::Walk {
            self.walk(now, unit);
        }
    }

    fn walk(&mut self, now: Millis, unit: &mut UnitEntity) {
        let delta = self.target - unit.pos();
        let dist = delta.length();

        unit.intent_move_to(self.target, unit.stats().walk_speed * self.speed_mul);

        match self.tuning.gait {
            Gait::Rally => {
                let action = pick_action(unit, &["walk", "run"]);
                safe_play(unit, &action, Facing::from_delta(delta.x, delta.y));
            }
            Gait::Stroll => {
                let facing = if dist > FACE_MIN_DIST {
                    Facing::from_delta(delta.x, delta.y)
                } else {
                    unit.facing()
                };
                let action = if unit.def().has_action("walk") { "walk" } else { IDLE };
                safe_play(unit, action, facing);
            }
        }

        if dist < self.tuning.arrive_within {
            self.go_idle(unit, now, self.tuning.arrival_delay);
            return;
        }

        if self.tuning.detect_stuck {
            self.watch_progress(now, dist, unit);
        }
    }

    /// Abandon the target if the distance has not shrunk by more than
    /// [`STUCK_PROGRESS`] within a rolling [`STUCK_WINDOW_MS`].
    fn watch_progress(&mut self, now: Millis, dist: f32, unit: &mut UnitEntity) {
        match self.stuck {
            Some(watch) if dist < watch.best_dist - STUCK_PROGRESS => {
                self.stuck = Some(StuckWatch {
                    best_dist: dist,
                    until: now + STUCK_WINDOW_MS,
                });
            }
            Some(watch) if now > watch.until => {
                tracing::trace!(unit = %unit.id(), dist, "wander target abandoned");
                self.go_idle(unit, now, (150, 450));
            }
            Some(_) => {}
            None => {
                self.stuck = Some(StuckWatch {
                    best_dist: dist,
                    until: now + STUCK_WINDOW_MS,
                });
            }
        }
    }
}

/// Decorator that wanders whenever the wrapped controller leaves the unit
/// idle.
///
/// The wrapped controller always runs first. If it left the unit attacking
/// or running, or queued a move of its own, the decorator stays out of the
/// way (and drops its own walk, if any).
#[derive(Debug)]
pub struct WanderWhenIdleController {
    base: Box<dyn UnitController>,
    wander: Wander,
}

impl WanderWhenIdleController {
    pub(crate) const TUNING: WanderTuning = WanderTuning {
        anchor: Anchor::Unit,
        gait: Gait::Stroll,
        rest_bias: (0.45, 0.75),
        radius: (120.0, 260.0),
        speed_mul: (1.0, 1.0),
        arrive_within: 22.0,
        rest_delay: (500, 1400),
        walk_delay: (700, 1600),
        arrival_delay: (400, 1200),
        detect_stuck: true,
    };

    /// Wrap `base`, drawing personality values from `rng`.
    pub fn new<R: Rng + ?Sized>(base: Box<dyn UnitController>, rng: &mut R) -> Self {
        Self {
            base,
            wander: Wander::new(Self::TUNING, rng),
        }
    }

    /// The wrapped controller.
    #[must_use]
    pub fn base(&self) -> &dyn UnitController {
        self.base.as_ref()
    }

    /// Probability of resting instead of walking on each decision.
    #[must_use]
    pub fn rest_bias(&self) -> f32 {
        self.wander.rest_bias()
    }

    /// Max offset (px, per axis) of a wander target.
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.wander.radius()
    }

    /// Whether the decorator is currently walking to a target of its own.
    #[must_use]
    pub fn is_wandering(&self) -> bool {
        self.wander.is_walking()
    }
}

impl UnitController for WanderWhenIdleController {
    fn update(&mut self, ctx: &UnitContext<'_>, unit: &mut UnitEntity) {
        if unit.is_dead() {
            return;
        }

        let walking = self.wander.is_walking().then(|| unit.clip());
        self.base.update(ctx, unit);

        // The base falling back to idle must not interrupt our walk clip.
        if let Some(clip) = walking {
            if unit.action() == IDLE {
                unit.resume_clip(clip);
            }
        }

        let action = unit.action();
        if action.contains("attack") || action.starts_with("run") {
            self.wander.cancel(unit);
            return;
        }
        if unit.has_move_intent() && !self.wander.is_walking() {
            return;
        }

        self.wander.update(ctx.now, unit);
    }

    fn name(&self) -> &'static str {
        "wander_when_idle"
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::components::{Team, UnitSnapshot};
    use crate::controllers::test_support::{snap, unit};
    use crate::controllers::CombatController;

    /// Controller that never does anything.
    #[derive(Debug)]
    struct Inert;

    impl UnitController for Inert {
        fn update(&mut self, _ctx: &UnitContext<'_>, _unit: &mut UnitEntity) {}

        fn name(&self) -> &'static str {
            "inert"
        }
    }

    fn always_walk() -> Wander {
        let tuning = WanderTuning {
            rest_bias: (0.0, 0.0001),
            radius: (1000.0, 1000.5),
            ..WanderWhenIdleController::TUNING
        };
        Wander::new(tuning, &mut StdRng::seed_from_u64(3))
    }

    fn ctx(now: Millis, others: &[UnitSnapshot]) -> UnitContext<'_> {
        UnitContext {
            now,
            dt: 16.0,
            others,
        }
    }

    #[test]
    fn test_personality_in_range() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..50 {
            let c = WanderWhenIdleController::new(Box::new(Inert), &mut rng);
            assert!((0.45..0.75).contains(&c.rest_bias()));
            assert!((120.0..260.0).contains(&c.radius()));
        }
    }

    #[test]
    fn test_walk_queues_intent_towards_target() {
        let mut w = always_walk();
        let mut me = unit(1, Team::Enemy, Vec2::ZERO);
        w.update(0.0, &mut me);
        assert!(w.is_walking());
        let intent = me.move_intent();
        assert!(intent.is_some());
        assert_eq!(intent.map(|i| i.speed), Some(100.0));
        assert_eq!(me.action(), "walk");
    }

    #[test]
    fn test_arrival_returns_to_idle() {
        let mut w = always_walk();
        let mut me = unit(1, Team::Enemy, Vec2::ZERO);
        w.update(0.0, &mut me);
        let target = me.move_intent().map(|i| i.target).unwrap_or_default();

        me.set_pos(target + Vec2::new(10.0, 0.0));
        w.update(16.0, &mut me);
        assert!(!w.is_walking());
        assert!(!me.has_move_intent());
        assert_eq!(me.action(), "idle");
    }

    #[test]
    fn test_stuck_unit_gives_up() {
        let mut w = always_walk();
        let mut me = unit(1, Team::Enemy, Vec2::ZERO);
        w.update(0.0, &mut me);
        let target = me.move_intent().map(|i| i.target).unwrap_or_default();
        // park the unit far away so it never arrives and never improves
        me.set_pos(target + Vec2::new(500.0, 0.0));

        let mut now = 16.0;
        while w.is_walking() && now < 1200.0 {
            w.update(now, &mut me);
            now += 16.0;
        }
        assert!(!w.is_walking());
        assert!(now > 800.0);
        assert!(!me.has_move_intent());
    }

    #[test]
    fn test_decorator_yields_to_combat() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut c = WanderWhenIdleController::new(Box::new(CombatController::with_orbit_bias(1.0)), &mut rng);
        let mut me = unit(1, Team::Enemy, Vec2::ZERO);
        let others = [snap(2, Team::Ally, Vec2::new(300.0, 0.0), 50.0)];

        c.update(&ctx(0.0, &others), &mut me);
        assert_eq!(me.action(), "run");
        assert!(!c.is_wandering());
        assert!(!me.has_move_intent());
    }

    #[test]
    fn test_walk_clip_survives_idle_base() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut c = WanderWhenIdleController::new(Box::new(CombatController::with_orbit_bias(1.0)), &mut rng);
        let mut me = unit(1, Team::Enemy, Vec2::ZERO);

        let mut steady_walk_ticks = 0;
        for i in 0..2000 {
            let before = (me.action().to_string(), me.facing(), me.anim_generation());
            c.update(&ctx(f64::from(i) * 16.0, &[]), &mut me);
            me.apply_intent(16.0);

            if before.0 == "walk" && me.action() == "walk" && before.1 == me.facing() {
                steady_walk_ticks += 1;
                assert_eq!(me.anim_generation(), before.2, "walk restarted on tick {i}");
            }
        }
        assert!(steady_walk_ticks > 100);
    }

    #[test]
    fn test_decorator_respects_foreign_move_intent() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut c = WanderWhenIdleController::new(Box::new(Inert), &mut rng);
        let mut me = unit(1, Team::Enemy, Vec2::ZERO);
        me.intent_move_to(Vec2::new(40.0, 40.0), 10.0);

        c.update(&ctx(0.0, &[]), &mut me);
        assert_eq!(me.move_intent().map(|i| i.target), Some(Vec2::new(40.0, 40.0)));
        assert!(!c.is_wandering());
    }

    #[test]
    fn test_decorator_inert_when_dead() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut c = WanderWhenIdleController::new(Box::new(Inert), &mut rng);
        let mut me = unit(1, Team::Enemy, Vec2::ZERO);
        me.set_hp(0.0);
        for i in 0..100 {
            c.update(&ctx(f64::from(i) * 16.0, &[]), &mut me);
        }
        assert!(!me.has_move_intent());
        assert_eq!(me.anim_generation(), 0);
    }
}
