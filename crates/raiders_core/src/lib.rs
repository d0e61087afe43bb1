//! # Raiders Core
//!
//! Deterministic unit simulation core for Idle Raiders.
//!
//! This crate contains the real-time simulation that drives every mob and
//! party member in a scene:
//! - No rendering (visuals are consumed through [`visuals::AnimationSource`])
//! - No wall-clock time (every tick is fed an explicit `now` and `dt`)
//! - No unseeded randomness (controllers and spawners take an injected RNG)
//!
//! This separation enables:
//! - Headless runs for balance testing
//! - Deterministic replay of a scene from a seed
//! - Testing controllers against synthetic tick sequences
//!
//! ## Crate Structure
//!
//! - [`math`] - 2D vectors and cardinal facings
//! - [`steering`] - Stateless steering forces shared by all controllers
//! - [`components`] - Plain data: stats, ids, intents, snapshots
//! - [`visuals`] - Animation capability queries and sprite-sheet data
//! - [`unit`] - Unit definitions and the mutable runtime entity
//! - [`controllers`] - Per-unit behavior strategies
//! - [`unit_system`] - The coordinator that runs a tick
//! - [`party_sync`] - Mirrors roster scene assignments into live units
//! - [`roster`] - In-memory guild roster
//! - [`data`] - Data-driven unit catalog
//! - [`spawner`] - Periodic enemy spawning
//! - [`scene`] - Scene presets and the per-scene runtime

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod components;
pub mod controllers;
pub mod data;
pub mod error;
pub mod math;
pub mod party_sync;
pub mod roster;
pub mod scene;
pub mod spawner;
pub mod steering;
pub mod unit;
pub mod unit_system;
pub mod visuals;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::components::*;
    pub use crate::controllers::{
        AdventurerController, BossController, CombatController, CombatState, EnemyController,
        TownRallyController, UnitContext, UnitController, WanderWhenIdleController,
        WorkerController,
    };
    pub use crate::data::UnitCatalog;
    pub use crate::error::{Result, SimError};
    pub use crate::math::{Facing, Vec2};
    pub use crate::party_sync::{ControllerPolicy, ScenePartySync, SpawnGrid, SyncReport};
    pub use crate::roster::{GuildMember, GuildRoster, MemberRole, Party, RosterSource, SceneId};
    pub use crate::scene::{DeathPolicy, FrameReport, SceneConfig, SceneRuntime};
    pub use crate::spawner::{EnemySpawner, SpawnerConfig};
    pub use crate::unit::{safe_play, UnitDefinition, UnitEntity};
    pub use crate::unit_system::{
        DeathDisposition, HitEvent, TickEvents, UnitSystem, WorldBounds,
    };
    pub use crate::visuals::{AnimationSource, SpriteSheetVisuals};
}
