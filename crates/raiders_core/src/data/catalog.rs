//! Immutable registry of unit definitions.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use super::unit_data::{infer_kind, infer_radius, team_for_kind, UnitCatalogData};
use crate::error::{Result, SimError};
use crate::unit::UnitDefinition;
use crate::visuals::AnimationSource;

const BUILTIN_RON: &str = include_str!("../../assets/units.ron");

/// Unit definitions by catalog key.
///
/// Built once from a [`UnitCatalogData`] document and then only read.
/// Definitions are shared with every unit spawned from them.
#[derive(Debug, Clone, Default)]
pub struct UnitCatalog {
    defs: BTreeMap<String, Arc<UnitDefinition>>,
}

impl UnitCatalog {
    /// Empty catalog.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The catalog shipped with the crate.
    pub fn builtin() -> Result<Self> {
        Self::from_ron_str(BUILTIN_RON, "<builtin>")
    }

    /// Parse a catalog document. `origin` names the source in errors.
    pub fn from_ron_str(src: &str, origin: &str) -> Result<Self> {
        let data: UnitCatalogData = ron::from_str(src).map_err(|e| SimError::CatalogParse {
            path: origin.to_string(),
            message: e.to_string(),
        })?;
        for problem in data.validate() {
            tracing::warn!(origin, "{problem}");
        }
        Ok(Self::from_data(&data))
    }

    /// Load a catalog document from disk.
    pub fn load(path: &Path) -> Result<Self> {
        let src = std::fs::read_to_string(path)?;
        Self::from_ron_str(&src, &path.display().to_string())
    }

    /// Build definitions: every family variant with inferred or overridden
    /// properties, then the extras.
    #[must_use]
    pub fn from_data(data: &UnitCatalogData) -> Self {
        let mut defs = BTreeMap::new();
        let mut visuals: BTreeMap<&str, Arc<dyn AnimationSource>> = BTreeMap::new();

        for family in &data.families {
            for variant in &family.variants {
                let v: Arc<dyn AnimationSource> = Arc::new(family.visuals_for(variant));
                visuals.insert(variant.as_str(), Arc::clone(&v));

                let over = data.overrides.get(variant).cloned().unwrap_or_default();
                let kind = over.kind.unwrap_or_else(|| infer_kind(variant));
                let def = UnitDefinition {
                    id: variant.clone(),
                    kind,
                    team: over.team.unwrap_or_else(|| team_for_kind(kind)),
                    radius: over.radius.unwrap_or_else(|| infer_radius(variant)),
                    base_stats: over.stats.apply(data.kind_defaults.get(kind)),
                    visuals: v,
                };
                defs.insert(variant.clone(), Arc::new(def));
            }
        }

        for extra in &data.extras {
            let Some(v) = visuals.get(extra.visuals_from.as_str()) else {
                tracing::warn!(
                    unit = %extra.id,
                    visuals_from = %extra.visuals_from,
                    "extra unit skipped: visuals not found"
                );
                continue;
            };
            let def = UnitDefinition {
                id: extra.id.clone(),
                kind: extra.kind,
                team: extra.team.unwrap_or_else(|| team_for_kind(extra.kind)),
                radius: extra.radius.unwrap_or_else(|| infer_radius(&extra.id)),
                base_stats: extra.stats.apply(data.kind_defaults.get(extra.kind)),
                visuals: Arc::clone(v),
            };
            defs.insert(extra.id.clone(), Arc::new(def));
        }

        tracing::debug!(units = defs.len(), "unit catalog built");
        Self { defs }
    }

    /// Add or replace a definition.
    pub fn insert(&mut self, def: UnitDefinition) {
        self.defs.insert(def.id.clone(), Arc::new(def));
    }

    /// Definition for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Arc<UnitDefinition>> {
        self.defs.get(key).cloned()
    }

    /// Definition for `key`, or [`SimError::UnknownUnitDef`].
    pub fn require(&self, key: &str) -> Result<Arc<UnitDefinition>> {
        self.get(key)
            .ok_or_else(|| SimError::UnknownUnitDef(key.to_string()))
    }

    /// Whether `key` is defined.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.defs.contains_key(key)
    }

    /// All keys, sorted.
    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.defs.keys().map(String::as_str)
    }

    /// Number of definitions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.defs.len()
    }

    /// Whether the catalog is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }

    /// Stat blocks breaking the catalog rules.
    #[must_use]
    pub fn validate(&self) -> Vec<SimError> {
        let mut errors = Vec::new();
        for def in self.defs.values() {
            let s = &def.base_stats;
            let fields = [
                ("max_hp", f64::from(s.max_hp)),
                ("walk_speed", f64::from(s.walk_speed)),
                ("run_speed", f64::from(s.run_speed)),
                ("aggro_range", f64::from(s.aggro_range)),
                ("attack_range", f64::from(s.attack_range)),
                ("attack_windup_ms", s.attack_windup_ms),
                ("attack_cooldown_ms", s.attack_cooldown_ms),
                ("damage", f64::from(s.damage)),
            ];
            for (name, value) in fields {
                if value < 0.0 {
                    errors.push(SimError::InvalidStats {
                        id: def.id.clone(),
                        reason: format!("{name} is negative ({value})"),
                    });
                }
            }
            if s.attack_cooldown_ms < s.attack_windup_ms {
                tracing::warn!(
                    unit = %def.id,
                    cooldown = s.attack_cooldown_ms,
                    windup = s.attack_windup_ms,
                    "attack cooldown shorter than windup"
                );
                errors.push(SimError::InvalidStats {
                    id: def.id.clone(),
                    reason: format!(
                        "attack_cooldown_ms ({}) < attack_windup_ms ({})",
                        s.attack_cooldown_ms, s.attack_windup_ms
                    ),
                });
            }
            if def.radius <= 0.0 {
                errors.push(SimError::InvalidStats {
                    id: def.id.clone(),
                    reason: format!("radius must be positive ({})", def.radius),
                });
            }
        }
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Team, UnitKind};
    use crate::math::Facing;

    fn builtin() -> UnitCatalog {
        UnitCatalog::builtin().expect("builtin catalog should parse")
    }

    #[test]
    fn test_builtin_is_valid() {
        let catalog = builtin();
        assert!(catalog.len() > 20);
        assert!(catalog.validate().is_empty());
    }

    #[test]
    fn test_builtin_document_has_no_structural_problems() {
        let data: UnitCatalogData = ron::from_str(BUILTIN_RON).expect("builtin should parse");
        assert_eq!(data.validate(), Vec::<String>::new());
    }

    #[test]
    fn test_inferred_mob() {
        let slime = builtin().require("slime1").expect("slime1");
        assert_eq!(slime.kind, UnitKind::Mob);
        assert_eq!(slime.team, Team::Enemy);
        assert_eq!(slime.radius, 34.0);
        assert_eq!(slime.base_stats.max_hp, 75.0);
        assert_eq!(slime.base_stats.damage, 3.0);
    }

    #[test]
    fn test_overridden_units() {
        let catalog = builtin();

        let slime4 = catalog.require("slime4").expect("slime4");
        assert_eq!(slime4.base_stats.max_hp, 80.0);
        assert_eq!(slime4.base_stats.damage, 7.0);
        assert_eq!(slime4.base_stats.attack_cooldown_ms, 1600.0);
        assert_eq!(slime4.base_stats.walk_speed, 120.0);
        assert_eq!(slime4.radius, 40.0);

        let boss = catalog.require("slime_boss1").expect("slime_boss1");
        assert_eq!(boss.kind, UnitKind::Boss);
        assert_eq!(boss.base_stats.max_hp, 900.0);
        assert_eq!(boss.radius, 120.0);
        assert!(boss.has_action("attack2"));

        let liz = catalog.require("lizardman1").expect("lizardman1");
        assert_eq!(liz.kind, UnitKind::Adventurer);
        assert_eq!(liz.team, Team::Ally);
        assert_eq!(liz.base_stats.attack_range, 380.0);
        assert_eq!(liz.base_stats.attack_cooldown_ms, 1400.0);
        assert_eq!(liz.base_stats.max_hp, 240.0);
        assert_eq!(liz.radius, 60.0);
    }

    #[test]
    fn test_boss_variant_without_override_uses_boss_rules() {
        let boss = builtin().require("slime_boss2").expect("slime_boss2");
        assert_eq!(boss.kind, UnitKind::Boss);
        assert_eq!(boss.radius, 52.0);
        assert_eq!(boss.base_stats.max_hp, 400.0);
    }

    #[test]
    fn test_extra_unit_shares_visuals() {
        let catalog = builtin();
        let worker = catalog.require("ghost1_worker").expect("ghost1_worker");
        let ghost = catalog.require("ghost1").expect("ghost1");
        assert_eq!(worker.kind, UnitKind::Worker);
        assert_eq!(worker.team, Team::Ally);
        assert!(Arc::ptr_eq(&worker.visuals, &ghost.visuals));
        assert_eq!(worker.base_stats.damage, 0.0);
    }

    #[test]
    fn test_attack_duration_from_catalog() {
        let liz = builtin().require("lizardman1").expect("lizardman1");
        // 6 frames at 12 fps
        assert_eq!(liz.visuals.anim_duration_ms("attack", Facing::Left), 500.0);
        assert!(liz.visuals.layer_has_action("attack", "swing"));
        assert!(!liz.visuals.layer_has_action("idle", "swing"));
    }

    #[test]
    fn test_unknown_key() {
        let catalog = builtin();
        assert!(catalog.get("dragon").is_none());
        assert!(matches!(
            catalog.require("dragon"),
            Err(SimError::UnknownUnitDef(key)) if key == "dragon"
        ));
    }

    #[test]
    fn test_parse_error_names_origin() {
        let err = UnitCatalog::from_ron_str("(kind_defaults: oops", "broken.ron")
            .expect_err("should not parse");
        assert!(matches!(err, SimError::CatalogParse { ref path, .. } if path == "broken.ron"));
    }

    #[test]
    fn test_validate_flags_cooldown_shorter_than_windup() {
        let mut catalog = UnitCatalog::new();
        let mut def = (*builtin().require("slime1").expect("slime1")).clone();
        def.id = "fast".to_string();
        def.base_stats.attack_windup_ms = 500.0;
        def.base_stats.attack_cooldown_ms = 300.0;
        catalog.insert(def);

        let errors = catalog.validate();
        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], SimError::InvalidStats { id, .. } if id == "fast"));
    }

    #[test]
    fn test_validate_flags_negative_stats() {
        let mut catalog = UnitCatalog::new();
        let mut def = (*builtin().require("slime1").expect("slime1")).clone();
        def.base_stats.damage = -1.0;
        catalog.insert(def);
        assert_eq!(catalog.validate().len(), 1);
    }
}
