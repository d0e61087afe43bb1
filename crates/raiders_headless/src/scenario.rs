//! Scenario loading and configuration.
//!
//! A scenario describes one headless run: which scene to simulate, who is
//! in the guild, how the parties are deployed, and for how long.
//!
//! # Example RON
//!
//! ```ron
//! Scenario(
//!     name: "hell_party",
//!     scene: Preset("hell"),
//!     seed: 1,
//!     ticks: 3600,
//!     members: [
//!         (id: "dealer", name: "damage dealer", role: adventurer, unit_def_id: "lizardman1", max_hp: 240.0),
//!     ],
//!     parties: [
//!         (name: "Party 1", members: ["dealer"], scene: "hell"),
//!     ],
//! )
//! ```

use std::path::{Path, PathBuf};

use raiders_core::data::UnitCatalog;
use raiders_core::error::SimError;
use raiders_core::math::Millis;
use raiders_core::roster::{GuildMember, GuildRoster, MemberRole};
use raiders_core::scene::SceneConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Names of the scenarios compiled into the binary.
pub const BUILTIN_SCENARIOS: &[&str] = &["hell_party", "town_idle"];

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// Neither a built-in name nor an existing file.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
    /// Catalog or roster setup failed.
    #[error("Invalid scenario setup: {0}")]
    Setup(#[from] SimError),
}

/// Which scene a scenario runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SceneSetup {
    /// A built-in preset by scene id (see [`SceneConfig::preset`]).
    Preset(String),
    /// A fully specified scene.
    Custom(SceneConfig),
}

impl SceneSetup {
    /// Resolve to a concrete scene configuration.
    #[must_use]
    pub fn config(&self) -> SceneConfig {
        match self {
            Self::Preset(id) => SceneConfig::preset(id),
            Self::Custom(config) => config.clone(),
        }
    }
}

/// A guild member present at the start of the run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemberSetup {
    /// Member id, referenced by parties.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Role, which picks the controller in role-based scenes.
    #[serde(default)]
    pub role: MemberRole,
    /// Catalog key of the member's unit.
    pub unit_def_id: String,
    /// Maximum hit points.
    pub max_hp: f32,
}

/// A party and where it is deployed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartySetup {
    /// Party name.
    pub name: String,
    /// Member ids, in order.
    pub members: Vec<String>,
    /// Scene the party is sent to.
    pub scene: String,
}

const fn default_dt() -> Millis {
    16.0
}

const fn default_true() -> bool {
    true
}

/// A complete scenario configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Scene to simulate.
    pub scene: SceneSetup,
    /// Default seed, overridable from the command line.
    #[serde(default)]
    pub seed: u64,
    /// Default number of ticks.
    pub ticks: u64,
    /// Milliseconds per tick.
    #[serde(default = "default_dt")]
    pub dt: Millis,
    /// Guild members.
    #[serde(default)]
    pub members: Vec<MemberSetup>,
    /// Parties and their deployment.
    #[serde(default)]
    pub parties: Vec<PartySetup>,
    /// Unit catalog file; the built-in catalog when absent.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
    /// Bring members that have been dead long enough back to town.
    #[serde(default = "default_true")]
    pub recall_dead: bool,
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let scenario: Scenario = ron::from_str(ron)?;
        Ok(scenario)
    }

    /// A scenario compiled into the binary, by name.
    pub fn builtin(name: &str) -> Option<Result<Self, ScenarioError>> {
        let src = match name {
            "hell_party" => include_str!("../scenarios/hell_party.ron"),
            "town_idle" => include_str!("../scenarios/town_idle.ron"),
            _ => return None,
        };
        Some(Self::from_ron_str(src))
    }

    /// A built-in scenario name or a path to a RON file.
    pub fn resolve(name_or_path: &str) -> Result<Self, ScenarioError> {
        match Self::builtin(name_or_path) {
            Some(scenario) => scenario,
            None => Self::load(name_or_path),
        }
    }

    /// Concrete scene configuration.
    #[must_use]
    pub fn scene_config(&self) -> SceneConfig {
        self.scene.config()
    }

    /// Unit catalog named by the scenario, or the built-in one.
    pub fn load_catalog(&self) -> Result<UnitCatalog, ScenarioError> {
        let catalog = match &self.catalog {
            Some(path) => UnitCatalog::load(path)?,
            None => UnitCatalog::builtin()?,
        };
        Ok(catalog)
    }

    /// Guild roster with every member added and every party deployed.
    pub fn build_roster(&self) -> Result<GuildRoster, ScenarioError> {
        let mut roster = GuildRoster::new();
        for m in &self.members {
            roster.add_member(GuildMember::new(
                m.id.clone(),
                m.name.clone(),
                m.role,
                m.unit_def_id.clone(),
                m.max_hp,
            ));
        }
        for setup in &self.parties {
            let party = roster.create_party(setup.name.clone());
            for member in &setup.members {
                roster.add_member_to_party(member, &party)?;
            }
            roster.send_party_to_scene(&party, &setup.scene)?;
        }
        Ok(roster)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use raiders_core::roster::TOWN;
    use raiders_core::scene::HELL;
    use std::io::Write;

    #[test]
    fn test_builtins_parse() {
        for name in BUILTIN_SCENARIOS {
            let scenario = Scenario::builtin(name)
                .expect("known name")
                .expect("builtin parses");
            assert_eq!(scenario.name, *name);
            assert!(scenario.ticks > 0);
            scenario.build_roster().expect("roster builds");
        }
        assert!(Scenario::builtin("nope").is_none());
    }

    #[test]
    fn test_hell_party_roster() {
        let scenario = Scenario::resolve("hell_party").expect("builtin");
        assert_eq!(scenario.scene, SceneSetup::Preset(HELL.to_string()));

        let roster = scenario.build_roster().expect("roster");
        let in_hell = roster.members().iter().filter(|m| m.scene_id == HELL).count();
        let in_town = roster.members().iter().filter(|m| m.scene_id == TOWN).count();
        assert!(in_hell >= 2);
        assert!(in_town >= 1);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"Scenario(
                name: "tiny",
                scene: Preset("plains/autumn_1"),
                ticks: 10,
                members: [(id: "a", name: "a", role: adventurer, unit_def_id: "lizardman1", max_hp: 240.0)],
                parties: [(name: "p", members: ["a"], scene: "plains/autumn_1")],
            )"#
        )
        .expect("write");

        let scenario = Scenario::load(file.path()).expect("loads");
        assert_eq!(scenario.dt, 16.0);
        assert!(scenario.recall_dead);
        assert_eq!(scenario.scene_config().scene_id, "plains/autumn_1");

        let roster = scenario.build_roster().expect("roster");
        assert_eq!(roster.member("a").map(|m| m.scene_id.as_str()), Some("plains/autumn_1"));
    }

    #[test]
    fn test_missing_file() {
        let err = Scenario::resolve("/definitely/not/here.ron").unwrap_err();
        assert!(matches!(err, ScenarioError::FileNotFound(_)));
    }

    #[test]
    fn test_bad_party_member() {
        let scenario = Scenario {
            parties: vec![PartySetup {
                name: "p".to_string(),
                members: vec!["ghost".to_string()],
                scene: HELL.to_string(),
            }],
            ..Scenario::resolve("town_idle").expect("builtin")
        };
        let err = scenario.build_roster().unwrap_err();
        assert!(matches!(err, ScenarioError::Setup(SimError::MemberNotFound(_))));
    }

    #[test]
    fn test_custom_catalog_path() {
        let scenario = Scenario {
            catalog: Some(PathBuf::from("/definitely/not/units.ron")),
            ..Scenario::resolve("town_idle").expect("builtin")
        };
        assert!(matches!(
            scenario.load_catalog(),
            Err(ScenarioError::Setup(_))
        ));
    }
}
