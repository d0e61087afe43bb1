//! Scene presets and the per-scene runtime.
//!
//! A [`SceneRuntime`] glues together everything one scene needs: the unit
//! coordinator, the party synchronizer, an optional enemy spawner and a
//! seeded RNG. The host calls [`SceneRuntime::enter`] once and then
//! [`SceneRuntime::frame`] every frame with the guild roster.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use crate::components::{MemberId, Team, UnitId};
use crate::data::UnitCatalog;
use crate::math::{Millis, Vec2};
use crate::party_sync::{ControllerPolicy, ScenePartySync, SpawnGrid, SyncReport};
use crate::roster::{GuildRoster, RosterSource, SceneId, TOWN};
use crate::spawner::{EnemySpawner, SpawnerConfig};
use crate::unit::UnitEntity;
use crate::unit_system::{DeathDisposition, TickEvents, UnitSystem, WorldBounds};

/// Scene id of the hell dungeon.
pub const HELL: &str = "hell";

/// Which dead units a scene removes as soon as they die.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathPolicy {
    /// Only enemies; fallen allies stay until the roster drops them.
    #[default]
    EnemiesOnly,
    /// Everyone.
    All,
    /// Nobody (enemies are still purged at the end of the tick).
    None,
}

impl DeathPolicy {
    /// Disposition for a unit that just died.
    #[must_use]
    pub fn disposition(self, unit: &UnitEntity) -> DeathDisposition {
        match self {
            Self::All => DeathDisposition::Remove,
            Self::EnemiesOnly if unit.team() == Team::Enemy => DeathDisposition::Remove,
            Self::EnemiesOnly | Self::None => DeathDisposition::Keep,
        }
    }
}

/// Static description of a scene.
///
/// # Example RON
///
/// ```ron
/// SceneConfig(
///     scene_id: "hell",
///     bounds: (x: 0.0, y: 0.0, width: 3200.0, height: 3200.0),
///     grid: (origin: (x: 100.0, y: 100.0), cols: 4, spacing: 48.0),
///     policy: by_role,
///     death_policy: enemies_only,
///     spawner: Some((max_enemies: 10)),
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneConfig {
    /// Roster scene id served by this scene.
    pub scene_id: SceneId,
    /// World rectangle.
    pub bounds: WorldBounds,
    /// Party spawn grid.
    pub grid: SpawnGrid,
    /// Controller choice for party members.
    #[serde(default)]
    pub policy: ControllerPolicy,
    /// Removal of dead units.
    #[serde(default)]
    pub death_policy: DeathPolicy,
    /// Enemy spawning, if the scene has enemies.
    #[serde(default)]
    pub spawner: Option<SpawnerConfig>,
}

impl SceneConfig {
    /// The town: everyone rallies around the center, no enemies.
    #[must_use]
    pub fn town() -> Self {
        let bounds = WorldBounds::new(0.0, 0.0, 2048.0, 2048.0);
        Self {
            scene_id: TOWN.to_string(),
            bounds,
            grid: SpawnGrid {
                origin: bounds.center(),
                cols: 5,
                spacing: 48.0,
            },
            policy: ControllerPolicy::TownRally,
            death_policy: DeathPolicy::None,
            spawner: None,
        }
    }

    /// The hell dungeon: party by role, slimes spawning, dead enemies removed.
    #[must_use]
    pub fn hell() -> Self {
        Self {
            scene_id: HELL.to_string(),
            bounds: WorldBounds::new(0.0, 0.0, 3200.0, 3200.0),
            grid: SpawnGrid {
                origin: Vec2::new(100.0, 100.0),
                cols: 4,
                spacing: 48.0,
            },
            policy: ControllerPolicy::ByRole,
            death_policy: DeathPolicy::EnemiesOnly,
            spawner: Some(SpawnerConfig::default()),
        }
    }

    /// An open-world map: everyone fights and wanders, every corpse goes.
    #[must_use]
    pub fn open_world(scene_id: impl Into<SceneId>) -> Self {
        Self {
            scene_id: scene_id.into(),
            bounds: WorldBounds::new(0.0, 0.0, 4096.0, 4096.0),
            grid: SpawnGrid {
                origin: Vec2::new(1000.0, 1000.0),
                cols: 5,
                spacing: 48.0,
            },
            policy: ControllerPolicy::WanderCombat,
            death_policy: DeathPolicy::All,
            spawner: Some(SpawnerConfig::default()),
        }
    }

    /// Built-in preset by name: `town`, `hell`, or any other id as an open
    /// world.
    #[must_use]
    pub fn preset(scene_id: &str) -> Self {
        match scene_id {
            TOWN => Self::town(),
            HELL => Self::hell(),
            other => Self::open_world(other),
        }
    }
}

/// What happened during one frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    /// Coordinator events.
    pub events: TickEvents,
    /// Party reconciliation, when the roster changed.
    pub sync: Option<SyncReport>,
    /// Enemies spawned.
    pub spawned: Vec<UnitId>,
    /// Members whose unit died this frame.
    pub fallen: Vec<MemberId>,
}

/// One running scene.
#[derive(Debug)]
pub struct SceneRuntime {
    config: SceneConfig,
    system: UnitSystem,
    sync: ScenePartySync,
    spawner: Option<EnemySpawner>,
    catalog: Arc<UnitCatalog>,
    rng: StdRng,
    last_revision: Option<u64>,
}

impl SceneRuntime {
    /// Scene built from `config`, drawing every random choice from `seed`.
    #[must_use]
    pub fn new(config: SceneConfig, catalog: Arc<UnitCatalog>, seed: u64) -> Self {
        let mut system = UnitSystem::new();
        system.set_world_bounds(config.bounds);
        let policy = config.death_policy;
        system.set_on_unit_died(move |unit| policy.disposition(unit));

        let sync = ScenePartySync::new(config.scene_id.clone(), config.grid, config.policy);
        Self {
            config,
            system,
            sync,
            spawner: None,
            catalog,
            rng: StdRng::seed_from_u64(seed),
            last_revision: None,
        }
    }

    /// Scene configuration.
    #[must_use]
    pub fn config(&self) -> &SceneConfig {
        &self.config
    }

    /// The unit coordinator.
    #[must_use]
    pub fn system(&self) -> &UnitSystem {
        &self.system
    }

    /// Mutable access to the coordinator, e.g. to set view bounds.
    pub fn system_mut(&mut self) -> &mut UnitSystem {
        &mut self.system
    }

    /// The party synchronizer.
    #[must_use]
    pub fn party_sync(&self) -> &ScenePartySync {
        &self.sync
    }

    /// The enemy spawner, once the scene was entered.
    #[must_use]
    pub fn spawner(&self) -> Option<&EnemySpawner> {
        self.spawner.as_ref()
    }

    /// Start the scene at `now`: spawn the party and arm the spawner.
    pub fn enter<S: RosterSource + ?Sized>(&mut self, now: Millis, roster: &S) -> SyncReport {
        self.spawner = self
            .config
            .spawner
            .clone()
            .map(|cfg| EnemySpawner::new(cfg, now));
        tracing::debug!(scene = %self.config.scene_id, now, "scene entered");
        self.resync(roster)
    }

    fn resync<S: RosterSource + ?Sized>(&mut self, roster: &S) -> SyncReport {
        self.last_revision = Some(roster.revision());
        self.sync
            .sync(&mut self.system, roster, &self.catalog, &mut self.rng)
    }

    /// Advance one frame.
    ///
    /// Re-syncs the party if the roster changed, ticks the coordinator,
    /// writes fallen party members back to the roster, then lets the
    /// spawner top up enemies.
    pub fn frame(&mut self, now: Millis, dt: Millis, roster: &mut GuildRoster) -> FrameReport {
        let mut report = FrameReport::default();

        if self.last_revision != Some(roster.revision()) {
            report.sync = Some(self.resync(roster));
        }

        report.events = self.system.update(now, dt);

        for &id in &report.events.deaths {
            let Some(member) = self.sync.member_for_unit(id) else {
                continue;
            };
            if roster.mark_member_dead(member, now).is_ok() {
                report.fallen.push(member.to_string());
            }
        }

        if let Some(spawner) = self.spawner.as_mut() {
            report.spawned = spawner.update(now, &mut self.system, &self.catalog, &mut self.rng);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::{GuildMember, MemberRole};

    fn catalog() -> Arc<UnitCatalog> {
        Arc::new(UnitCatalog::builtin().expect("builtin catalog"))
    }

    fn roster_in(scene: &str) -> GuildRoster {
        let mut roster = GuildRoster::new();
        roster.add_member(GuildMember::new("a", "a", MemberRole::Adventurer, "lizardman1", 140.0));
        roster.add_member(GuildMember::new("w", "w", MemberRole::Worker, "ghost1_worker", 90.0));
        roster.set_member_scene("a", scene).expect("a exists");
        roster.set_member_scene("w", scene).expect("w exists");
        roster
    }

    #[test]
    fn test_presets() {
        let town = SceneConfig::preset("town");
        assert_eq!(town.policy, ControllerPolicy::TownRally);
        assert_eq!(town.grid.origin, Vec2::new(1024.0, 1024.0));
        assert!(town.spawner.is_none());

        let hell = SceneConfig::preset("hell");
        assert_eq!(hell.grid.cols, 4);
        assert_eq!(hell.death_policy, DeathPolicy::EnemiesOnly);

        let plains = SceneConfig::preset("plains/autumn_1");
        assert_eq!(plains.scene_id, "plains/autumn_1");
        assert_eq!(plains.grid.origin, Vec2::new(1000.0, 1000.0));
        assert_eq!(plains.policy, ControllerPolicy::WanderCombat);
    }

    #[test]
    fn test_config_ron_round_trip() {
        let text = ron::to_string(&SceneConfig::hell()).expect("serialize");
        let back: SceneConfig = ron::from_str(&text).expect("parse");
        assert_eq!(back, SceneConfig::hell());
    }

    #[test]
    fn test_enter_spawns_party() {
        let roster = roster_in(TOWN);
        let mut scene = SceneRuntime::new(SceneConfig::town(), catalog(), 1);
        let report = scene.enter(0.0, &roster);
        assert_eq!(report.added.len(), 2);
        assert_eq!(scene.system().len(), 2);
        for u in scene.system().units() {
            assert_eq!(scene.system().controller_name(u.id()), Some("town_rally"));
        }
    }

    #[test]
    fn test_frame_resyncs_on_roster_change() {
        let mut roster = roster_in(TOWN);
        let mut scene = SceneRuntime::new(SceneConfig::town(), catalog(), 1);
        scene.enter(0.0, &roster);

        let quiet = scene.frame(16.0, 16.0, &mut roster);
        assert!(quiet.sync.is_none());

        roster.set_member_scene("a", HELL).expect("a exists");
        let changed = scene.frame(32.0, 16.0, &mut roster);
        let sync = changed.sync.expect("roster changed");
        assert_eq!(sync.removed.len(), 1);
        assert_eq!(scene.system().len(), 1);
    }

    #[test]
    fn test_hell_spawns_enemies() {
        let mut roster = roster_in(HELL);
        let mut scene = SceneRuntime::new(SceneConfig::hell(), catalog(), 7);
        scene.enter(0.0, &roster);

        let mut now = 0.0;
        let mut spawned = 0;
        for _ in 0..200 {
            now += 16.0;
            spawned += scene.frame(now, 16.0, &mut roster).spawned.len();
        }
        assert!(spawned > 0);
        assert!(scene.system().alive_count(Team::Enemy) <= 10);
    }

    #[test]
    fn test_death_policy_dispositions() {
        let catalog = catalog();
        let slime = UnitEntity::new(UnitId(1), catalog.require("slime1").expect("slime1"), Vec2::ZERO);
        let hero = UnitEntity::new(UnitId(2), catalog.require("lizardman1").expect("liz"), Vec2::ZERO);

        assert_eq!(DeathPolicy::EnemiesOnly.disposition(&slime), DeathDisposition::Remove);
        assert_eq!(DeathPolicy::EnemiesOnly.disposition(&hero), DeathDisposition::Keep);
        assert_eq!(DeathPolicy::All.disposition(&hero), DeathDisposition::Remove);
        assert_eq!(DeathPolicy::None.disposition(&slime), DeathDisposition::Keep);
    }

    #[test]
    fn test_fallen_member_written_back() {
        let mut roster = GuildRoster::new();
        roster.add_member(GuildMember::new("a", "a", MemberRole::Adventurer, "lizardman1", 140.0));
        roster.set_member_scene("a", HELL).expect("a exists");

        let config = SceneConfig {
            spawner: None,
            ..SceneConfig::hell()
        };
        let mut scene = SceneRuntime::new(config, catalog(), 3);
        scene.enter(0.0, &roster);
        let hero = scene.party_sync().unit_for_member("a").expect("hero spawned");

        // A boss right next to the hero finishes it quickly.
        let boss = catalog().require("slime_boss1").expect("boss");
        let mut rng = StdRng::seed_from_u64(9);
        let controller = Box::new(crate::controllers::BossController::new(&mut rng));
        scene.system_mut().add(boss, Vec2::new(160.0, 100.0), controller);
        if let Some(u) = scene.system_mut().get_mut(hero) {
            u.set_hp(1.0);
        }

        let mut now = 0.0;
        let mut fallen = Vec::new();
        for _ in 0..600 {
            now += 16.0;
            fallen.extend(scene.frame(now, 16.0, &mut roster).fallen);
            if !fallen.is_empty() {
                break;
            }
        }

        assert_eq!(fallen, vec!["a".to_string()]);
        let member = roster.member("a").expect("a exists");
        assert!(!member.is_alive());
        assert!(member.dead_at_ms.is_some());

        // Next frame sees the roster change and drops the corpse.
        now += 16.0;
        scene.frame(now, 16.0, &mut roster);
        assert!(scene.system().get(hero).is_none());
    }
}
