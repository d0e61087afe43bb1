//! Catalog document: stat defaults, visual families, per-id overrides.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::components::{BaseStats, Team, UnitKind};
use crate::visuals::{ActionClip, LayerDef, SpriteSheetVisuals};

/// Radius used when neither an override nor a name rule applies.
pub const DEFAULT_RADIUS: f32 = 34.0;

/// Stat block per unit kind.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KindDefaults {
    /// Regular mobs.
    pub mob: BaseStats,
    /// Bosses.
    pub boss: BaseStats,
    /// Guild adventurers.
    pub adventurer: BaseStats,
    /// Guild workers.
    pub worker: BaseStats,
}

impl KindDefaults {
    /// Defaults for `kind`.
    #[must_use]
    pub fn get(&self, kind: UnitKind) -> BaseStats {
        match kind {
            UnitKind::Mob => self.mob,
            UnitKind::Boss => self.boss,
            UnitKind::Adventurer => self.adventurer,
            UnitKind::Worker => self.worker,
        }
    }
}

/// One sprite family; every variant shares layers and actions.
///
/// # Example RON
///
/// ```ron
/// FamilyData(
///     family: "slime",
///     variants: ["slime1", "slime2"],
///     layers: [
///         (id: "shadow", depth_offset: 0),
///         (id: "body", depth_offset: 1),
///     ],
///     actions: {
///         "idle": (files: {"body": "body.png", "shadow": "shadow.png"}, fps: Some(8)),
///     },
/// )
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FamilyData {
    /// Family folder name.
    pub family: String,
    /// Variant ids, each becoming a catalog key.
    pub variants: Vec<String>,
    /// Frames per row.
    #[serde(default = "default_cols")]
    pub cols: u32,
    /// Default playback rate.
    #[serde(default = "default_fps")]
    pub fps_default: u32,
    /// Draw layers, back to front.
    pub layers: Vec<LayerDef>,
    /// Action clips by name.
    pub actions: BTreeMap<String, ActionClip>,
}

const fn default_cols() -> u32 {
    6
}

const fn default_fps() -> u32 {
    10
}

impl FamilyData {
    /// Visuals for one variant of this family.
    #[must_use]
    pub fn visuals_for(&self, variant: &str) -> SpriteSheetVisuals {
        let actions = self
            .actions
            .iter()
            .map(|(name, clip)| {
                let mut clip = clip.clone();
                if clip.folder.is_empty() {
                    clip.folder.clone_from(name);
                }
                (name.clone(), clip)
            })
            .collect();

        SpriteSheetVisuals {
            id: variant.to_string(),
            base_path: format!("assets/mobs/{}/{}", self.family, variant),
            cols: self.cols,
            fps_default: self.fps_default,
            layers: self.layers.clone(),
            actions,
        }
    }
}

/// Partial stat block; `None` keeps the kind default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatOverrides {
    /// Maximum hit points.
    pub max_hp: Option<f32>,
    /// Wander speed.
    pub walk_speed: Option<f32>,
    /// Chase speed.
    pub run_speed: Option<f32>,
    /// Target acquisition range.
    pub aggro_range: Option<f32>,
    /// Attack reach.
    pub attack_range: Option<f32>,
    /// Delay from swing start to damage.
    pub attack_windup_ms: Option<f64>,
    /// Delay between swing starts.
    pub attack_cooldown_ms: Option<f64>,
    /// Damage per hit.
    pub damage: Option<f32>,
}

impl StatOverrides {
    /// `base` with every present field replaced.
    #[must_use]
    pub fn apply(&self, base: BaseStats) -> BaseStats {
        BaseStats {
            max_hp: self.max_hp.unwrap_or(base.max_hp),
            walk_speed: self.walk_speed.unwrap_or(base.walk_speed),
            run_speed: self.run_speed.unwrap_or(base.run_speed),
            aggro_range: self.aggro_range.unwrap_or(base.aggro_range),
            attack_range: self.attack_range.unwrap_or(base.attack_range),
            attack_windup_ms: self.attack_windup_ms.unwrap_or(base.attack_windup_ms),
            attack_cooldown_ms: self.attack_cooldown_ms.unwrap_or(base.attack_cooldown_ms),
            damage: self.damage.unwrap_or(base.damage),
        }
    }
}

/// Per-id replacement of the inferred properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitOverride {
    /// Kind; also picks the stat defaults.
    pub kind: Option<UnitKind>,
    /// Team; inferred from the kind when absent.
    pub team: Option<Team>,
    /// Collision radius.
    pub radius: Option<f32>,
    /// Stat changes on top of the kind defaults.
    pub stats: StatOverrides,
}

/// A unit reusing another variant's visuals under its own key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtraUnit {
    /// New catalog key.
    pub id: String,
    /// Variant whose visuals are shared.
    pub visuals_from: String,
    /// Kind.
    pub kind: UnitKind,
    /// Team; inferred from the kind when absent.
    #[serde(default)]
    pub team: Option<Team>,
    /// Collision radius.
    #[serde(default)]
    pub radius: Option<f32>,
    /// Stat changes on top of the kind defaults.
    #[serde(default)]
    pub stats: StatOverrides,
}

/// Root of a catalog document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitCatalogData {
    /// Stats per kind.
    pub kind_defaults: KindDefaults,
    /// Visual families.
    pub families: Vec<FamilyData>,
    /// Per-id overrides.
    #[serde(default)]
    pub overrides: BTreeMap<String, UnitOverride>,
    /// Units added after all families.
    #[serde(default)]
    pub extras: Vec<ExtraUnit>,
}

impl UnitCatalogData {
    /// Every variant id across all families, in document order.
    pub fn variant_ids(&self) -> impl Iterator<Item = &str> + '_ {
        self.families
            .iter()
            .flat_map(|f| f.variants.iter().map(String::as_str))
    }

    /// Structural problems with the document (duplicate keys, dangling
    /// references). Stat rules are checked on the built catalog.
    #[must_use]
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        let mut seen = BTreeSet::new();

        for family in &self.families {
            if family.layers.is_empty() {
                errors.push(format!("Family '{}' has no layers", family.family));
            }
            if !family.actions.contains_key("idle") {
                errors.push(format!("Family '{}' has no idle action", family.family));
            }
            for (name, clip) in &family.actions {
                for layer in clip.files.keys() {
                    if !family.layers.iter().any(|l| &l.id == layer) {
                        errors.push(format!(
                            "Family '{}' action '{}' references unknown layer '{}'",
                            family.family, name, layer
                        ));
                    }
                }
            }
            for variant in &family.variants {
                if !seen.insert(variant.as_str()) {
                    errors.push(format!("Duplicate unit id '{variant}'"));
                }
            }
        }

        for key in self.overrides.keys() {
            if !seen.contains(key.as_str()) {
                errors.push(format!("Override for unknown unit '{key}'"));
            }
        }

        for extra in &self.extras {
            if !seen.contains(extra.visuals_from.as_str()) {
                errors.push(format!(
                    "Extra unit '{}' borrows visuals from unknown unit '{}'",
                    extra.id, extra.visuals_from
                ));
            }
            if !seen.insert(extra.id.as_str()) {
                errors.push(format!("Duplicate unit id '{}'", extra.id));
            }
        }

        errors
    }
}

/// Kind guessed from an id with no override.
#[must_use]
pub fn infer_kind(id: &str) -> UnitKind {
    if id.contains("boss") {
        UnitKind::Boss
    } else {
        UnitKind::Mob
    }
}

/// Team implied by a kind.
#[must_use]
pub fn team_for_kind(kind: UnitKind) -> Team {
    match kind {
        UnitKind::Mob | UnitKind::Boss => Team::Enemy,
        UnitKind::Adventurer | UnitKind::Worker => Team::Ally,
    }
}

/// Radius guessed from an id with no override.
#[must_use]
pub fn infer_radius(id: &str) -> f32 {
    if id.contains("boss") {
        52.0
    } else if id.starts_with("golem") {
        46.0
    } else if id.starts_with("orc") {
        42.0
    } else {
        DEFAULT_RADIUS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(max_hp: f32) -> BaseStats {
        BaseStats {
            max_hp,
            walk_speed: 100.0,
            run_speed: 200.0,
            aggro_range: 500.0,
            attack_range: 70.0,
            attack_windup_ms: 200.0,
            attack_cooldown_ms: 1000.0,
            damage: 5.0,
        }
    }

    fn family() -> FamilyData {
        let mut files = BTreeMap::new();
        files.insert("body".to_string(), "body.png".to_string());
        let mut actions = BTreeMap::new();
        actions.insert(
            "idle".to_string(),
            ActionClip {
                files,
                fps: Some(8),
                ..ActionClip::default()
            },
        );
        FamilyData {
            family: "slime".to_string(),
            variants: vec!["slime1".to_string(), "slime2".to_string()],
            cols: 6,
            fps_default: 10,
            layers: vec![LayerDef {
                id: "body".to_string(),
                depth_offset: 1,
            }],
            actions,
        }
    }

    fn document() -> UnitCatalogData {
        UnitCatalogData {
            kind_defaults: KindDefaults {
                mob: stats(75.0),
                boss: stats(400.0),
                adventurer: stats(240.0),
                worker: stats(90.0),
            },
            families: vec![family()],
            overrides: BTreeMap::new(),
            extras: Vec::new(),
        }
    }

    #[test]
    fn test_inference_rules() {
        assert_eq!(infer_kind("slime_boss1"), UnitKind::Boss);
        assert_eq!(infer_kind("slime3"), UnitKind::Mob);
        assert_eq!(infer_radius("slime_boss2"), 52.0);
        assert_eq!(infer_radius("golem1"), 46.0);
        assert_eq!(infer_radius("orc3"), 42.0);
        assert_eq!(infer_radius("ghost1"), DEFAULT_RADIUS);
        assert_eq!(team_for_kind(UnitKind::Worker), Team::Ally);
        assert_eq!(team_for_kind(UnitKind::Boss), Team::Enemy);
    }

    #[test]
    fn test_visuals_for_variant_fills_folder_and_path() {
        let v = family().visuals_for("slime2");
        assert_eq!(v.id, "slime2");
        assert_eq!(v.base_path, "assets/mobs/slime/slime2");
        assert_eq!(v.actions["idle"].folder, "idle");
    }

    #[test]
    fn test_stat_overrides_apply_only_present_fields() {
        let over = StatOverrides {
            max_hp: Some(80.0),
            damage: Some(7.0),
            ..StatOverrides::default()
        };
        let out = over.apply(stats(75.0));
        assert_eq!(out.max_hp, 80.0);
        assert_eq!(out.damage, 7.0);
        assert_eq!(out.walk_speed, 100.0);
    }

    #[test]
    fn test_validate_clean_document() {
        assert!(document().validate().is_empty());
    }

    #[test]
    fn test_validate_reports_dangling_references() {
        let mut doc = document();
        doc.overrides
            .insert("nobody".to_string(), UnitOverride::default());
        doc.extras.push(ExtraUnit {
            id: "slime1".to_string(),
            visuals_from: "missing".to_string(),
            kind: UnitKind::Worker,
            team: None,
            radius: None,
            stats: StatOverrides::default(),
        });

        let errors = doc.validate();
        assert_eq!(errors.len(), 3);
        assert!(errors.iter().any(|e| e.contains("nobody")));
        assert!(errors.iter().any(|e| e.contains("missing")));
        assert!(errors.iter().any(|e| e.contains("Duplicate")));
    }

    #[test]
    fn test_parse_ron_family() {
        let src = r#"(
            family: "ghost",
            variants: ["ghost1"],
            layers: [(id: "body", depth_offset: 2)],
            actions: {
                "idle": (files: {"body": "body.png"}, fps: Some(8)),
            },
        )"#;
        let f: FamilyData = ron::from_str(src).expect("family should parse");
        assert_eq!(f.cols, 6);
        assert_eq!(f.fps_default, 10);
        assert_eq!(f.actions["idle"].fps, Some(8));
    }
}
