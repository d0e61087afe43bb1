//! Animation capability queries.
//!
//! The simulation never draws anything. It only needs to ask the rendering
//! side two things about a unit's visuals: "does action X exist" and "how
//! long does action X last facing D". [`AnimationSource`] is that contract;
//! [`SpriteSheetVisuals`] is the data-driven implementation used by the
//! built-in catalog.
//!
//! Action names are open-ended strings ("attack2", "walk_attack", ...),
//! so lookups are capability queries against a map rather than an enum.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::{Facing, Millis};

/// What the simulation may ask about a unit's visuals.
pub trait AnimationSource: fmt::Debug + Send + Sync {
    /// Whether any layer defines this action.
    fn has_action(&self, action: &str) -> bool;

    /// Whether `layer` has a sheet for `action`.
    fn layer_has_action(&self, action: &str, layer: &str) -> bool;

    /// Playback length of `action` facing `facing`, or 0 when unknown.
    fn anim_duration_ms(&self, action: &str, facing: Facing) -> Millis;

    /// All defined action names, in a stable order.
    fn action_names(&self) -> Vec<String>;
}

/// One draw layer of a multi-layer sprite.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerDef {
    /// Layer id ("body", "shadow", "sword", ...).
    pub id: String,
    /// Draw order offset within the unit.
    pub depth_offset: i32,
}

/// Sheets for a single action.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ActionClip {
    /// Folder under the unit's asset root. Empty means the action name.
    #[serde(default)]
    pub folder: String,
    /// Sheet file per layer id. Layers without an entry are hidden.
    pub files: BTreeMap<String, String>,
    /// Frames per facing row; defaults to the visuals' column count.
    #[serde(default)]
    pub frames: Option<u32>,
    /// Playback rate; defaults to the visuals' default fps.
    #[serde(default)]
    pub fps: Option<u32>,
    /// Facing rows present in the sheet; defaults to 4.
    #[serde(default)]
    pub rows: Option<u32>,
}

/// Sprite-sheet description of a unit's visuals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpriteSheetVisuals {
    /// Visual id (usually the catalog key).
    pub id: String,
    /// Asset root.
    #[serde(default)]
    pub base_path: String,
    /// Default frames per row.
    #[serde(default = "default_cols")]
    pub cols: u32,
    /// Default playback rate.
    #[serde(default = "default_fps")]
    pub fps_default: u32,
    /// Draw layers, back to front.
    pub layers: Vec<LayerDef>,
    /// Actions by name.
    pub actions: BTreeMap<String, ActionClip>,
}

const fn default_cols() -> u32 {
    6
}

const fn default_fps() -> u32 {
    10
}

impl SpriteSheetVisuals {
    /// Visuals with no layers and no actions. Every duration query returns 0.
    #[must_use]
    pub fn empty(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            base_path: String::new(),
            cols: default_cols(),
            fps_default: default_fps(),
            layers: Vec::new(),
            actions: BTreeMap::new(),
        }
    }

    /// Duration of one facing row of `clip`.
    fn clip_duration_ms(&self, clip: &ActionClip) -> Millis {
        let frames = clip.frames.unwrap_or(self.cols);
        let fps = clip.fps.unwrap_or(self.fps_default);
        if frames == 0 || fps == 0 {
            return 0.0;
        }
        Millis::from(frames) * 1000.0 / Millis::from(fps)
    }
}

impl AnimationSource for SpriteSheetVisuals {
    fn has_action(&self, action: &str) -> bool {
        self.actions.contains_key(action)
    }

    fn layer_has_action(&self, action: &str, layer: &str) -> bool {
        self.actions
            .get(action)
            .is_some_and(|clip| clip.files.contains_key(layer))
    }

    fn anim_duration_ms(&self, action: &str, facing: Facing) -> Millis {
        let Some(clip) = self.actions.get(action) else {
            return 0.0;
        };
        if facing.row() >= clip.rows.unwrap_or(4) {
            return 0.0;
        }

        let duration = self.clip_duration_ms(clip);
        self.layers
            .iter()
            .filter(|layer| clip.files.contains_key(&layer.id))
            .map(|_| duration)
            .fold(0.0, Millis::max)
    }

    fn action_names(&self) -> Vec<String> {
        self.actions.keys().cloned().collect()
    }
}
