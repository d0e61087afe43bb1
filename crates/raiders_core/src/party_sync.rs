//! Mirrors roster scene assignments into live units.
//!
//! The roster says which guild members stand in which scene. A
//! [`ScenePartySync`] owns the member → unit mapping for one scene and
//! reconciles the [`UnitSystem`] against the roster whenever asked:
//! members who left the scene or died lose their unit, members who
//! arrived get one on the scene's spawn grid.

use std::collections::{BTreeMap, BTreeSet};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::components::{MemberId, UnitId};
use crate::controllers::{
    AdventurerController, CombatController, TownRallyController, UnitController,
    WanderWhenIdleController, WorkerController,
};
use crate::data::UnitCatalog;
use crate::math::Vec2;
use crate::roster::{MemberRole, RosterSource, SceneId};
use crate::unit_system::UnitSystem;

/// Where party members are placed on arrival.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnGrid {
    /// Position of slot 0.
    pub origin: Vec2,
    /// Slots per row.
    pub cols: u32,
    /// Distance between neighbouring slots (px).
    pub spacing: f32,
}

impl Default for SpawnGrid {
    fn default() -> Self {
        Self {
            origin: Vec2::new(100.0, 100.0),
            cols: 4,
            spacing: 48.0,
        }
    }
}

impl SpawnGrid {
    /// Position of slot `index`, filling rows left to right.
    #[must_use]
    pub fn slot(&self, index: usize) -> Vec2 {
        let cols = self.cols.max(1) as usize;
        let col = (index % cols) as f32;
        let row = (index / cols) as f32;
        self.origin + Vec2::new(col * self.spacing, row * self.spacing)
    }
}

/// Which controller a member's unit gets in a scene.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerPolicy {
    /// Workers flee and wander, adventurers fight.
    #[default]
    ByRole,
    /// Everyone mills around the scene center and never fights.
    TownRally,
    /// Everyone fights and wanders between fights.
    WanderCombat,
}

impl ControllerPolicy {
    /// Fresh controller for a member with `role`.
    pub fn build<R: Rng + ?Sized>(self, role: MemberRole, rng: &mut R) -> Box<dyn UnitController> {
        match (self, role) {
            (Self::ByRole, MemberRole::Worker) => Box::new(WorkerController::new(rng)),
            (Self::ByRole, MemberRole::Adventurer) => Box::new(AdventurerController::new(rng)),
            (Self::TownRally, _) => Box::new(TownRallyController::new(rng)),
            (Self::WanderCombat, _) => {
                let base = Box::new(CombatController::new(rng));
                Box::new(WanderWhenIdleController::new(base, rng))
            }
        }
    }
}

/// What one reconciliation pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    /// Units spawned for arriving members.
    pub added: Vec<UnitId>,
    /// Units removed for departed or dead members.
    pub removed: Vec<UnitId>,
    /// Members that should be present but have no catalog entry.
    pub skipped: Vec<MemberId>,
}

impl SyncReport {
    /// Whether nothing changed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.skipped.is_empty()
    }
}

/// Member → unit reconciliation for one scene.
#[derive(Debug, Clone)]
pub struct ScenePartySync {
    scene_id: SceneId,
    grid: SpawnGrid,
    policy: ControllerPolicy,
    tracked: BTreeMap<MemberId, UnitId>,
}

impl ScenePartySync {
    /// Synchronizer for `scene_id`.
    #[must_use]
    pub fn new(scene_id: impl Into<SceneId>, grid: SpawnGrid, policy: ControllerPolicy) -> Self {
        Self {
            scene_id: scene_id.into(),
            grid,
            policy,
            tracked: BTreeMap::new(),
        }
    }

    /// Scene this synchronizer serves.
    #[must_use]
    pub fn scene_id(&self) -> &str {
        &self.scene_id
    }

    /// Spawn grid.
    #[must_use]
    pub fn grid(&self) -> SpawnGrid {
        self.grid
    }

    /// Controller policy.
    #[must_use]
    pub fn policy(&self) -> ControllerPolicy {
        self.policy
    }

    /// Unit currently standing in for `member_id`.
    #[must_use]
    pub fn unit_for_member(&self, member_id: &str) -> Option<UnitId> {
        self.tracked.get(member_id).copied()
    }

    /// Member a unit stands in for.
    #[must_use]
    pub fn member_for_unit(&self, unit: UnitId) -> Option<&str> {
        self.tracked
            .iter()
            .find(|(_, &u)| u == unit)
            .map(|(m, _)| m.as_str())
    }

    /// Number of tracked members.
    #[must_use]
    pub fn tracked_len(&self) -> usize {
        self.tracked.len()
    }

    /// Reconcile `system` against `roster`.
    ///
    /// Members assigned to this scene with `hp > 0` should each have one
    /// unit. Units of other tracked members are removed; missing members
    /// are spawned at the grid slot of their position in the scene's
    /// member list. Unknown catalog keys skip the member.
    pub fn sync<S, R>(
        &mut self,
        system: &mut UnitSystem,
        roster: &S,
        catalog: &UnitCatalog,
        rng: &mut R,
    ) -> SyncReport
    where
        S: RosterSource + ?Sized,
        R: Rng + ?Sized,
    {
        let mut report = SyncReport::default();
        self.refresh(system);

        let entries = roster.entries();
        let mut listed = BTreeSet::new();
        let present: Vec<_> = entries
            .iter()
            .filter(|e| e.scene_id == self.scene_id && e.hp > 0.0)
            .filter(|e| listed.insert(e.id))
            .collect();
        let should: BTreeSet<&str> = present.iter().map(|e| e.id).collect();

        let gone: Vec<MemberId> = self
            .tracked
            .keys()
            .filter(|m| !should.contains(m.as_str()))
            .cloned()
            .collect();
        for member in gone {
            if let Some(unit) = self.tracked.remove(&member) {
                if system.remove(unit).is_some() {
                    tracing::debug!(scene = %self.scene_id, member = %member, unit = %unit, "party member left");
                    report.removed.push(unit);
                }
            }
        }

        for (slot, entry) in present.iter().enumerate() {
            if self.tracked.contains_key(entry.id) {
                continue;
            }
            let Some(def) = catalog.get(entry.unit_def_id) else {
                tracing::warn!(
                    scene = %self.scene_id,
                    member = %entry.id,
                    def = %entry.unit_def_id,
                    "member skipped: unknown unit definition"
                );
                report.skipped.push(entry.id.to_string());
                continue;
            };

            let controller = self.policy.build(entry.role, rng);
            let unit = system.add(def, self.grid.slot(slot), controller);
            unit.set_member_id(Some(entry.id.to_string()));
            let id = unit.id();
            tracing::debug!(scene = %self.scene_id, member = %entry.id, unit = %id, "party member arrived");
            self.tracked.insert(entry.id.to_string(), id);
            report.added.push(id);
        }

        system.assign_ids();
        self.refresh(system);

        report
    }

    /// Rebuild the mapping from the member links on live units.
    fn refresh(&mut self, system: &UnitSystem) {
        self.tracked = system
            .units()
            .filter_map(|u| u.member_id().map(|m| (m.to_string(), u.id())))
            .collect();
    }
}
