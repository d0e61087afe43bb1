//! Plain data shared across the simulation.
//!
//! Components are pure data with no behavior beyond small accessors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{Millis, Vec2};

/// Unique identifier of a live unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UnitId(pub u64);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "u_{}", self.0)
    }
}

/// Identifier of a persisted guild member.
pub type MemberId = String;

/// Broad classification of a unit definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    /// Regular hostile creature.
    Mob,
    /// Large hostile creature.
    Boss,
    /// Combat-capable guild member.
    Adventurer,
    /// Non-combat guild member that flees threats.
    Worker,
}

impl UnitKind {
    /// All kinds, in catalog default order.
    pub const ALL: [Self; 4] = [Self::Mob, Self::Boss, Self::Adventurer, Self::Worker];
}

/// Side a unit fights for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    /// Hostile spawns. Purged automatically once dead.
    Enemy,
    /// Guild members and their helpers.
    Ally,
}

/// Catalog stat block: every [`UnitStats`] field except current `hp`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BaseStats {
    /// Maximum hit points.
    pub max_hp: f32,
    /// Wander speed (px/s).
    pub walk_speed: f32,
    /// Chase and flee speed (px/s).
    pub run_speed: f32,
    /// Max distance at which an opposing unit is picked as a target.
    pub aggro_range: f32,
    /// Reach of an attack, measured to the target's collision edge.
    pub attack_range: f32,
    /// Delay between attack start and damage.
    pub attack_windup_ms: Millis,
    /// Minimum delay between attack starts.
    pub attack_cooldown_ms: Millis,
    /// Damage per landed hit.
    pub damage: f32,
}

/// Mutable per-unit stat block, seeded from [`BaseStats`] with `hp = max_hp`.
///
/// Invariant: `0 <= hp <= max_hp`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitStats {
    /// Maximum hit points.
    pub max_hp: f32,
    /// Current hit points.
    pub hp: f32,
    /// Wander speed (px/s).
    pub walk_speed: f32,
    /// Chase and flee speed (px/s).
    pub run_speed: f32,
    /// Max distance at which an opposing unit is picked as a target.
    pub aggro_range: f32,
    /// Reach of an attack, measured to the target's collision edge.
    pub attack_range: f32,
    /// Delay between attack start and damage.
    pub attack_windup_ms: Millis,
    /// Minimum delay between attack starts.
    pub attack_cooldown_ms: Millis,
    /// Damage per landed hit.
    pub damage: f32,
}

impl UnitStats {
    /// Fresh stats at full health.
    #[must_use]
    pub fn from_base(base: &BaseStats) -> Self {
        Self {
            max_hp: base.max_hp,
            hp: base.max_hp,
            walk_speed: base.walk_speed,
            run_speed: base.run_speed,
            aggro_range: base.aggro_range,
            attack_range: base.attack_range,
            attack_windup_ms: base.attack_windup_ms,
            attack_cooldown_ms: base.attack_cooldown_ms,
            damage: base.damage,
        }
    }
}

impl From<BaseStats> for UnitStats {
    fn from(base: BaseStats) -> Self {
        Self::from_base(&base)
    }
}

/// Queued "travel toward this point at this speed" instruction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MoveIntent {
    /// Destination.
    pub target: Vec2,
    /// Travel speed (px/s).
    pub speed: f32,
}

/// One-shot "apply this damage to this target" message, drained by the
/// coordinator once per tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitIntent {
    /// Unit receiving the damage.
    pub target: UnitId,
    /// Damage amount.
    pub damage: f32,
}

/// Damage flash state a render pass can query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DamageFlash {
    /// When the (latest) flash started.
    pub started_at: Millis,
    /// When the flash ends.
    pub until: Millis,
}

impl DamageFlash {
    /// Flash length for a single hit.
    pub const DURATION_MS: Millis = 90.0;

    /// Flash duration in milliseconds.
    #[must_use]
    pub fn duration_ms(&self) -> Millis {
        self.until - self.started_at
    }
}

/// Read-only per-tick projection of a unit, handed to controllers as "others".
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UnitSnapshot {
    /// Unit id.
    pub id: UnitId,
    /// Position at snapshot time.
    pub pos: Vec2,
    /// Collision radius.
    pub radius: f32,
    /// Team.
    pub team: Team,
    /// Kind.
    pub kind: UnitKind,
    /// Current hit points.
    pub hp: f32,
}

impl UnitSnapshot {
    /// Whether the unit was alive when the snapshot was taken.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.hp > 0.0
    }
}
