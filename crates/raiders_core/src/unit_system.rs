//! The unit coordinator.
//!
//! Owns every live unit of a scene together with its controller and
//! advances them one tick at a time.
//!
//! # Tick Order
//!
//! Each [`UnitSystem::update`] runs these steps in this order:
//! 1. **World center** - from the view bounds, else the world bounds
//! 2. **Snapshots** - one read-only projection per unit
//! 3. **Controllers** - every live unit decides, seeing all the others
//! 4. **Hits** - queued hit intents become damage; first deaths are reported
//! 5. **Movement** - queued move intents are integrated
//! 6. **Collisions** - two relaxation passes push overlapping pairs apart
//! 7. **Effects** - expired damage flashes are cleared
//! 8. **Purge** - dead enemies (and callback-requested removals) leave
//!
//! Units are processed in insertion order, so two systems fed the same
//! spawns and the same `(now, dt)` sequence stay identical.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::components::{HitIntent, Team, UnitId, UnitSnapshot};
use crate::controllers::{UnitContext, UnitController};
use crate::math::{Millis, Vec2, EPSILON};
use crate::unit::{UnitDefinition, UnitEntity};

/// Overlap relaxation passes per tick.
pub const COLLISION_PASSES: usize = 2;

/// Axis-aligned rectangle in world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WorldBounds {
    /// Left edge.
    pub x: f32,
    /// Top edge.
    pub y: f32,
    /// Width.
    pub width: f32,
    /// Height.
    pub height: f32,
}

impl WorldBounds {
    /// Create a new rectangle.
    #[must_use]
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether the rectangle has no area.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }

    /// Midpoint.
    #[must_use]
    pub fn center(&self) -> Vec2 {
        Vec2::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }
}

/// What to do with a unit after the death callback saw it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DeathDisposition {
    /// Leave it; enemies are still purged at the end of the tick.
    #[default]
    Keep,
    /// Remove it at the end of this tick.
    Remove,
}

/// Damage applied this tick.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HitEvent {
    /// Unit whose hit intent it was.
    pub attacker: UnitId,
    /// Unit that took the damage.
    pub target: UnitId,
    /// Damage amount.
    pub damage: f32,
    /// Whether this hit took the target to zero hp.
    pub killed: bool,
}

/// Events generated during a tick.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TickEvents {
    /// Damage applied.
    pub hits: Vec<HitEvent>,
    /// Units that died this tick (each reported once over its lifetime).
    pub deaths: Vec<UnitId>,
    /// Units removed at the purge step.
    pub removed: Vec<UnitId>,
}

type DeathCallback = Box<dyn FnMut(&UnitEntity) -> DeathDisposition + Send>;

struct UnitSlot {
    unit: UnitEntity,
    controller: Box<dyn UnitController>,
}

/// Live units of one scene and their controllers.
pub struct UnitSystem {
    slots: Vec<UnitSlot>,
    next_id: u64,
    tick: u64,
    on_unit_died: Option<DeathCallback>,
    death_notified: HashSet<UnitId>,
    doomed: BTreeSet<UnitId>,
    world_bounds: Option<WorldBounds>,
    view_bounds: Option<WorldBounds>,
    world_center: Option<Vec2>,
}

impl fmt::Debug for UnitSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitSystem")
            .field("units", &self.slots.len())
            .field("tick", &self.tick)
            .field("world_bounds", &self.world_bounds)
            .field("view_bounds", &self.view_bounds)
            .field("world_center", &self.world_center)
            .finish_non_exhaustive()
    }
}

impl Default for UnitSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl UnitSystem {
    /// Empty system.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            next_id: 1,
            tick: 0,
            on_unit_died: None,
            death_notified: HashSet::new(),
            doomed: BTreeSet::new(),
            world_bounds: None,
            view_bounds: None,
            world_center: None,
        }
    }

    /// Ticks run so far.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Called once per unit, the first time a hit takes it to zero hp.
    pub fn set_on_unit_died<F>(&mut self, callback: F)
    where
        F: FnMut(&UnitEntity) -> DeathDisposition + Send + 'static,
    {
        self.on_unit_died = Some(Box::new(callback));
    }

    /// Configured world rectangle. Also updates the world center right away.
    pub fn set_world_bounds(&mut self, bounds: WorldBounds) {
        self.world_bounds = Some(bounds);
        if !bounds.is_empty() {
            self.world_center = Some(bounds.center());
        }
    }

    /// Configured world rectangle, if any.
    #[must_use]
    pub fn world_bounds(&self) -> Option<WorldBounds> {
        self.world_bounds
    }

    /// Host camera view. When set and non-empty it wins over the world
    /// bounds for the world center.
    pub fn set_view_bounds(&mut self, view: Option<WorldBounds>) {
        self.view_bounds = view;
    }

    /// Current world center, once any bounds are known.
    #[must_use]
    pub fn world_center(&self) -> Option<Vec2> {
        self.world_center
    }

    /// Fresh id from the counter.
    pub fn next_unit_id(&mut self) -> UnitId {
        let id = UnitId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Spawn a unit from `def` at `pos` under `controller`.
    pub fn add(
        &mut self,
        def: Arc<UnitDefinition>,
        pos: Vec2,
        controller: Box<dyn UnitController>,
    ) -> &mut UnitEntity {
        let id = self.next_unit_id();
        let unit = UnitEntity::new(id, def, pos);
        let index = self.push(unit, controller);
        &mut self.slots[index].unit
    }

    /// Add a pre-built unit, keeping its id. Call [`UnitSystem::assign_ids`]
    /// afterwards if the id may already be taken.
    pub fn insert(&mut self, unit: UnitEntity, controller: Box<dyn UnitController>) -> UnitId {
        self.next_id = self.next_id.max(unit.id().0.saturating_add(1));
        let index = self.push(unit, controller);
        self.slots[index].unit.id()
    }

    fn push(&mut self, mut unit: UnitEntity, controller: Box<dyn UnitController>) -> usize {
        if let Some(center) = self.world_center {
            unit.set_scene_center(center);
        }
        tracing::debug!(
            unit = %unit.id(),
            def = %unit.def().id,
            controller = controller.name(),
            x = unit.pos().x,
            y = unit.pos().y,
            "unit added"
        );
        self.slots.push(UnitSlot { unit, controller });
        self.slots.len() - 1
    }

    /// Remove a unit and its controller. Returns the unit if it existed.
    pub fn remove(&mut self, id: UnitId) -> Option<UnitEntity> {
        let index = self.index_of(id)?;
        let slot = self.slots.remove(index);
        self.death_notified.remove(&id);
        self.doomed.remove(&id);
        tracing::debug!(unit = %id, "unit removed");
        Some(slot.unit)
    }

    /// Give every unit whose id is already used by an earlier unit a fresh
    /// id. Returns how many ids were changed.
    pub fn assign_ids(&mut self) -> usize {
        let mut seen = HashSet::with_capacity(self.slots.len());
        let mut repaired = 0;

        for i in 0..self.slots.len() {
            let old = self.slots[i].unit.id();
            let mut id = old;
            while seen.contains(&id) {
                id = UnitId(self.next_id);
                self.next_id += 1;
            }
            if id != old {
                tracing::warn!(old = %old, new = %id, "duplicate unit id repaired");
                self.slots[i].unit.set_id(id);
                repaired += 1;
            }
            seen.insert(id);
        }

        repaired
    }

    fn index_of(&self, id: UnitId) -> Option<usize> {
        self.slots.iter().position(|s| s.unit.id() == id)
    }

    /// Live units in processing order.
    pub fn units(&self) -> impl ExactSizeIterator<Item = &UnitEntity> + '_ {
        self.slots.iter().map(|s| &s.unit)
    }

    /// Unit by id.
    #[must_use]
    pub fn get(&self, id: UnitId) -> Option<&UnitEntity> {
        self.slots.iter().map(|s| &s.unit).find(|u| u.id() == id)
    }

    /// Mutable unit by id.
    pub fn get_mut(&mut self, id: UnitId) -> Option<&mut UnitEntity> {
        self.slots.iter_mut().map(|s| &mut s.unit).find(|u| u.id() == id)
    }

    /// Name of the controller driving a unit.
    #[must_use]
    pub fn controller_name(&self, id: UnitId) -> Option<&'static str> {
        self.slots
            .iter()
            .find(|s| s.unit.id() == id)
            .map(|s| s.controller.name())
    }

    /// Number of units.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether there are no units.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Living units on `team`.
    #[must_use]
    pub fn alive_count(&self, team: Team) -> usize {
        self.units().filter(|u| u.team() == team && !u.is_dead()).count()
    }

    /// Advance the simulation by one tick. See the module docs for the order.
    pub fn update(&mut self, now: Millis, dt: Millis) -> TickEvents {
        let mut events = TickEvents::default();

        self.update_world_center();

        let snapshots: Vec<UnitSnapshot> = self.slots.iter().map(|s| s.unit.snapshot()).collect();
        self.run_controllers(now, dt, &snapshots);

        self.apply_hits(now, &mut events);

        for slot in &mut self.slots {
            if !slot.unit.is_dead() {
                slot.unit.apply_intent(dt);
            }
        }

        self.resolve_collisions();

        for slot in &mut self.slots {
            slot.unit.update_visual_effects(now);
        }

        self.purge(&mut events);

        self.tick += 1;

        #[cfg(feature = "debug-validation")]
        self.validate();

        #[cfg(debug_assertions)]
        {
            let hash = self.state_hash();
            tracing::trace!(tick = self.tick, units = self.slots.len(), state_hash = hash, "unit system tick");
        }

        events
    }

    fn update_world_center(&mut self) {
        let bounds = self
            .view_bounds
            .filter(|b| !b.is_empty())
            .or(self.world_bounds)
            .filter(|b| !b.is_empty());
        let Some(bounds) = bounds else {
            return;
        };

        let center = bounds.center();
        self.world_center = Some(center);
        for slot in &mut self.slots {
            slot.unit.set_scene_center(center);
        }
    }

    fn run_controllers(&mut self, now: Millis, dt: Millis, snapshots: &[UnitSnapshot]) {
        let mut others = Vec::with_capacity(snapshots.len().saturating_sub(1));

        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.unit.is_dead() {
                continue;
            }

            others.clear();
            others.extend(
                snapshots
                    .iter()
                    .enumerate()
                    .filter(|&(j, _)| j != i)
                    .map(|(_, s)| *s),
            );

            let ctx = UnitContext {
                now,
                dt,
                others: &others,
            };
            slot.controller.update(&ctx, &mut slot.unit);
        }
    }

    fn apply_hits(&mut self, now: Millis, events: &mut TickEvents) {
        let intents: Vec<(UnitId, HitIntent)> = self
            .slots
            .iter_mut()
            .filter_map(|s| s.unit.take_hit_intent().map(|hit| (s.unit.id(), hit)))
            .collect();

        for (attacker, hit) in intents {
            let Some(index) = self.index_of(hit.target) else {
                continue;
            };
            let target = &mut self.slots[index].unit;
            if target.is_dead() {
                continue;
            }

            target.take_damage(hit.damage, now);
            let killed = target.is_dead();
            events.hits.push(HitEvent {
                attacker,
                target: hit.target,
                damage: hit.damage,
                killed,
            });

            if killed && self.death_notified.insert(hit.target) {
                tracing::debug!(unit = %hit.target, killer = %attacker, "unit died");
                events.deaths.push(hit.target);

                let disposition = match self.on_unit_died.as_mut() {
                    Some(callback) => callback(&self.slots[index].unit),
                    None => DeathDisposition::Keep,
                };
                if disposition == DeathDisposition::Remove {
                    self.doomed.insert(hit.target);
                }
            }
        }
    }

    fn resolve_collisions(&mut self) {
        let n = self.slots.len();
        for _ in 0..COLLISION_PASSES {
            for i in 0..n {
                let (head, tail) = self.slots.split_at_mut(i + 1);
                let a = &mut head[i].unit;
                if a.is_dead() {
                    continue;
                }

                for slot in tail.iter_mut() {
                    let b = &mut slot.unit;
                    if b.is_dead() {
                        continue;
                    }

                    let delta = b.pos() - a.pos();
                    let dist = delta.length();
                    let min = a.radius() + b.radius();
                    if dist < EPSILON || dist >= min {
                        continue;
                    }

                    let normal = delta * (1.0 / dist);
                    let push = (min - dist) * 0.5;
                    a.set_pos(a.pos() - normal * push);
                    b.set_pos(b.pos() + normal * push);
                }
            }
        }
    }

    fn purge(&mut self, events: &mut TickEvents) {
        let doomed = &self.doomed;
        let removed: Vec<UnitId> = self
            .slots
            .iter()
            .map(|s| &s.unit)
            .filter(|u| (u.is_dead() && u.team() == Team::Enemy) || doomed.contains(&u.id()))
            .map(UnitEntity::id)
            .collect();

        for id in removed {
            if self.remove(id).is_some() {
                events.removed.push(id);
            }
        }
        self.doomed.clear();
    }

    #[cfg(feature = "debug-validation")]
    fn validate(&self) {
        for unit in self.units() {
            let stats = unit.stats();
            debug_assert!(
                stats.hp >= 0.0 && stats.hp <= stats.max_hp,
                "hp out of bounds for {}: {} / {}",
                unit.id(),
                stats.hp,
                stats.max_hp
            );
        }
    }

    /// Hash of the observable state, for desync detection.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();

        self.tick.hash(&mut hasher);
        self.slots.len().hash(&mut hasher);

        for unit in self.units() {
            unit.id().hash(&mut hasher);
            unit.pos().x.to_bits().hash(&mut hasher);
            unit.pos().y.to_bits().hash(&mut hasher);
            unit.facing().hash(&mut hasher);
            unit.action().hash(&mut hasher);
            unit.stats().hp.to_bits().hash(&mut hasher);
        }

        hasher.finish()
    }
}
