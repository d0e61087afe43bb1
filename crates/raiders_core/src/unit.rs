//! Unit definitions and the mutable runtime entity.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::components::{
    BaseStats, DamageFlash, HitIntent, MemberId, MoveIntent, Team, UnitId, UnitKind, UnitSnapshot,
    UnitStats,
};
use crate::math::{Facing, Millis, Vec2};
use crate::visuals::AnimationSource;

/// Remaining distance (px) under which a move intent counts as arrived.
pub const ARRIVAL_EPSILON: f32 = 0.5;

/// Displacement (px) a step must exceed before facing follows it.
pub const FACING_MIN_STEP: f32 = 0.2;

/// Fallback action when the requested one is not defined.
pub const IDLE: &str = "idle";

/// Immutable catalog entry a unit is spawned from.
#[derive(Debug, Clone)]
pub struct UnitDefinition {
    /// Catalog key.
    pub id: String,
    /// Broad classification.
    pub kind: UnitKind,
    /// Side the unit fights for.
    pub team: Team,
    /// Collision circle radius (px).
    pub radius: f32,
    /// Stats every spawned unit starts from.
    pub base_stats: BaseStats,
    /// Opaque visuals handle, only queried for action capabilities.
    pub visuals: Arc<dyn AnimationSource>,
}

impl UnitDefinition {
    /// Whether this definition exposes `action`.
    #[must_use]
    pub fn has_action(&self, action: &str) -> bool {
        self.visuals.has_action(action)
    }
}

/// Read-only copy of the fields a renderer or report needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitView {
    /// Unit id.
    pub id: UnitId,
    /// Linked guild member, if any.
    pub member_id: Option<MemberId>,
    /// Catalog key.
    pub def_id: String,
    /// Position.
    pub pos: Vec2,
    /// Facing.
    pub facing: Facing,
    /// Action actually drawn (falls back to idle).
    pub action: String,
    /// Current hit points.
    pub hp: f32,
    /// Maximum hit points.
    pub max_hp: f32,
    /// Whether a damage flash is active.
    pub flashing: bool,
}

/// The animation a unit is playing, including its restart counter.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct AnimClip {
    action: String,
    facing: Facing,
    generation: u64,
}

/// One simulated actor.
///
/// Movement goes through [`UnitEntity::intent_move_to`] and
/// [`UnitEntity::apply_intent`], or is written directly with
/// [`UnitEntity::set_pos`] by controllers that integrate their own velocity.
/// Cross-unit effects only flow through the single [`HitIntent`] slot.
#[derive(Debug, Clone)]
pub struct UnitEntity {
    id: UnitId,
    member_id: Option<MemberId>,
    def: Arc<UnitDefinition>,
    pos: Vec2,
    facing: Facing,
    action: String,
    anim_generation: u64,
    stats: UnitStats,
    move_intent: Option<MoveIntent>,
    hit_intent: Option<HitIntent>,
    flash: Option<DamageFlash>,
    scene_center: Option<Vec2>,
}

impl UnitEntity {
    /// Spawn a unit at full health, idle and facing down.
    #[must_use]
    pub fn new(id: UnitId, def: Arc<UnitDefinition>, pos: Vec2) -> Self {
        let stats = UnitStats::from_base(&def.base_stats);
        Self {
            id,
            member_id: None,
            def,
            pos,
            facing: Facing::Down,
            action: IDLE.to_string(),
            anim_generation: 0,
            stats,
            move_intent: None,
            hit_intent: None,
            flash: None,
            scene_center: None,
        }
    }

    /// Link this unit to a guild member.
    #[must_use]
    pub fn with_member(mut self, member_id: impl Into<MemberId>) -> Self {
        self.member_id = Some(member_id.into());
        self
    }

    /// Link or unlink a guild member.
    pub fn set_member_id(&mut self, member_id: Option<MemberId>) {
        self.member_id = member_id;
    }

    /// Unit id.
    #[must_use]
    pub fn id(&self) -> UnitId {
        self.id
    }

    pub(crate) fn set_id(&mut self, id: UnitId) {
        self.id = id;
    }

    /// Linked guild member, if any.
    #[must_use]
    pub fn member_id(&self) -> Option<&str> {
        self.member_id.as_deref()
    }

    /// Definition this unit was spawned from.
    #[must_use]
    pub fn def(&self) -> &Arc<UnitDefinition> {
        &self.def
    }

    /// Team shorthand.
    #[must_use]
    pub fn team(&self) -> Team {
        self.def.team
    }

    /// Kind shorthand.
    #[must_use]
    pub fn kind(&self) -> UnitKind {
        self.def.kind
    }

    /// Collision radius.
    #[must_use]
    pub fn radius(&self) -> f32 {
        self.def.radius
    }

    /// Current position.
    #[must_use]
    pub fn pos(&self) -> Vec2 {
        self.pos
    }

    /// Overwrite the position.
    pub fn set_pos(&mut self, pos: Vec2) {
        self.pos = pos;
    }

    /// Current facing.
    #[must_use]
    pub fn facing(&self) -> Facing {
        self.facing
    }

    /// Turn without touching the playing action.
    pub fn set_facing(&mut self, facing: Facing) {
        self.facing = facing;
    }

    /// Action most recently requested.
    #[must_use]
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Action actually drawn: the requested one if the visuals define it,
    /// otherwise idle.
    #[must_use]
    pub fn visible_action(&self) -> &str {
        if self.def.has_action(&self.action) {
            &self.action
        } else {
            IDLE
        }
    }

    /// Bumped every time an animation (re)starts.
    #[must_use]
    pub fn anim_generation(&self) -> u64 {
        self.anim_generation
    }

    /// Start `action` facing `facing`, restarting it if already playing.
    ///
    /// Controllers should go through [`safe_play`] instead.
    pub fn play(&mut self, action: &str, facing: Facing) {
        if self.action != action {
            self.action.clear();
            self.action.push_str(action);
        }
        self.facing = facing;
        self.anim_generation += 1;
    }

    pub(crate) fn clip(&self) -> AnimClip {
        AnimClip {
            action: self.action.clone(),
            facing: self.facing,
            generation: self.anim_generation,
        }
    }

    /// Put back a clip taken with [`clip`](Self::clip) as if it never
    /// stopped playing.
    pub(crate) fn resume_clip(&mut self, clip: AnimClip) {
        self.action = clip.action;
        self.facing = clip.facing;
        self.anim_generation = clip.generation;
    }

    /// Current stats.
    #[must_use]
    pub fn stats(&self) -> &UnitStats {
        &self.stats
    }

    /// Set hit points, clamped to `[0, max_hp]`.
    pub fn set_hp(&mut self, hp: f32) {
        self.stats.hp = hp.clamp(0.0, self.stats.max_hp);
    }

    /// Lose `amount` hit points (never below zero) and start a damage flash.
    pub fn take_damage(&mut self, amount: f32, now: Millis) {
        self.stats.hp = (self.stats.hp - amount.max(0.0)).max(0.0);
        self.flash_damage(now);
    }

    fn flash_damage(&mut self, now: Millis) {
        let until = now + DamageFlash::DURATION_MS;
        self.flash = Some(match self.flash {
            Some(f) => DamageFlash {
                started_at: now,
                until: f.until.max(until),
            },
            None => DamageFlash {
                started_at: now,
                until,
            },
        });
    }

    /// Whether the unit has no hit points left.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.stats.hp <= 0.0
    }

    /// Active damage flash, if any.
    #[must_use]
    pub fn damage_flash(&self) -> Option<DamageFlash> {
        self.flash
    }

    /// Clear the damage flash once it has expired.
    pub fn update_visual_effects(&mut self, now: Millis) {
        if self.flash.is_some_and(|f| now >= f.until) {
            self.flash = None;
        }
    }

    /// Longest duration of `action` facing `facing` across all layers, or 0.
    #[must_use]
    pub fn anim_duration_ms(&self, action: &str, facing: Facing) -> Millis {
        self.def.visuals.anim_duration_ms(action, facing)
    }

    /// Queue travel towards `target` at `speed` px/s.
    pub fn intent_move_to(&mut self, target: Vec2, speed: f32) {
        self.move_intent = Some(MoveIntent { target, speed });
    }

    /// Drop any queued travel.
    pub fn intent_stop(&mut self) {
        self.move_intent = None;
    }

    /// Queued travel, if any.
    #[must_use]
    pub fn move_intent(&self) -> Option<MoveIntent> {
        self.move_intent
    }

    /// Whether travel is queued.
    #[must_use]
    pub fn has_move_intent(&self) -> bool {
        self.move_intent.is_some()
    }

    /// Integrate the queued travel over `dt` milliseconds.
    ///
    /// The intent is cleared, without moving, once the remaining distance is
    /// under [`ARRIVAL_EPSILON`]. The unit is never snapped onto the target.
    /// Facing follows the actual displacement when it exceeds
    /// [`FACING_MIN_STEP`].
    pub fn apply_intent(&mut self, dt: Millis) {
        let Some(intent) = self.move_intent else {
            return;
        };

        let delta = intent.target - self.pos;
        let d = delta.length();
        if d < ARRIVAL_EPSILON {
            self.move_intent = None;
            return;
        }

        let before = self.pos;
        let velocity = delta * (intent.speed / d);
        self.set_pos(self.pos + velocity * (dt / 1000.0) as f32);

        let moved = self.pos - before;
        if moved.length() > FACING_MIN_STEP {
            self.facing = Facing::from_delta(moved.x, moved.y);
        }
    }

    /// Put damage in the hit slot, replacing whatever was there.
    pub fn set_hit_intent(&mut self, target: UnitId, damage: f32) {
        self.hit_intent = Some(HitIntent { target, damage });
    }

    /// Pending hit, if any.
    #[must_use]
    pub fn hit_intent(&self) -> Option<HitIntent> {
        self.hit_intent
    }

    /// Drain the hit slot.
    pub fn take_hit_intent(&mut self) -> Option<HitIntent> {
        self.hit_intent.take()
    }

    /// Anchor for idle wandering, maintained by the coordinator. `None`
    /// until the coordinator knows any bounds.
    #[must_use]
    pub fn scene_center(&self) -> Option<Vec2> {
        self.scene_center
    }

    pub(crate) fn set_scene_center(&mut self, center: Vec2) {
        self.scene_center = Some(center);
    }

    /// Projection handed to other units' controllers.
    #[must_use]
    pub fn snapshot(&self) -> UnitSnapshot {
        UnitSnapshot {
            id: self.id,
            pos: self.pos,
            radius: self.def.radius,
            team: self.def.team,
            kind: self.def.kind,
            hp: self.stats.hp,
        }
    }

    /// Copy of the drawable state.
    #[must_use]
    pub fn view(&self) -> UnitView {
        UnitView {
            id: self.id,
            member_id: self.member_id.clone(),
            def_id: self.def.id.clone(),
            pos: self.pos,
            facing: self.facing,
            action: self.visible_action().to_string(),
            hp: self.stats.hp,
            max_hp: self.stats.max_hp,
            flashing: self.flash.is_some(),
        }
    }
}

/// Play `action` facing `facing` unless exactly that is already playing.
///
/// Restarting a one-shot animation (attack, hurt, death) mid-playback would
/// cut it short, so every controller goes through this.
pub fn safe_play(unit: &mut UnitEntity, action: &str, facing: Facing) {
    if unit.action == action && unit.facing == facing {
        return;
    }
    unit.play(action, facing);
}
