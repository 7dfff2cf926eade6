//! Game configuration.
//!
//! Loaded from RON (the hand-edited format) or JSON (tooling). Every section
//! has defaults, so a config file only needs the values it changes.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::constants::{CELLULAR_ITERATIONS, WANG_OPEN_THRESHOLD};
use crate::error::{CaveError, Result};
use crate::logging::TracingConfig;
use crate::player::PlayerTuning;

/// Render target size, threaded explicitly instead of read from a window global
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f32,
    pub height: f32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 720.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MapStyle {
    /// Cellular automaton cave
    Cellular,
    /// Threshold a reference bitmap (Wang-tile dungeon)
    Wang,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    pub width: usize,
    pub height: usize,
    /// Tile edge length in pixels
    pub tile_size: f32,
    pub light_count: usize,
    pub catnip_count: usize,
    pub npc_count: usize,
    pub style: MapStyle,
    pub seed: u64,
    /// Initial wall probability for the cellular strategy
    pub fill_density: f64,
    pub smoothing_iterations: u32,
    /// Reference bitmap pixels below this value are open
    pub open_threshold: u8,
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            width: 60,
            height: 40,
            tile_size: 32.0,
            light_count: 6,
            catnip_count: 3,
            npc_count: 0,
            style: MapStyle::Cellular,
            seed: 42,
            fill_density: 0.5,
            smoothing_iterations: CELLULAR_ITERATIONS,
            open_threshold: WANG_OPEN_THRESHOLD,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LightingConfig {
    pub color: [f32; 3],
    pub aux_epsilon: f32,
    pub torch_fps: f32,
    /// Feed every light the engine clock instead of a per-light random time
    pub synced_time: bool,
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            color: [1.0, 0.85, 0.6],
            aux_epsilon: crate::constants::AUX_RAY_EPSILON,
            torch_fps: 12.0,
            synced_time: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub viewport: Viewport,
    pub map: MapConfig,
    pub player: PlayerTuning,
    pub lighting: LightingConfig,
    pub logging: TracingConfig,
}

impl GameConfig {
    pub fn from_ron_str(text: &str) -> Result<Self> {
        let config: Self = ron::from_str(text).map_err(|e| CaveError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CaveError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&text)
    }

    pub fn to_ron(&self) -> Result<String> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| CaveError::ConfigParse(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CaveError::ConfigParse(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CaveError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let result = self.check();
        if let Err(e) = &result {
            error!(target: "cave_core::config", "{}", e);
        }
        result
    }

    fn check(&self) -> Result<()> {
        let invalid = |msg: &str| Err(CaveError::InvalidConfig(msg.to_string()));

        if self.viewport.width <= 0.0 || self.viewport.height <= 0.0 {
            return invalid("viewport must have positive dimensions");
        }
        if self.map.width < 3 || self.map.height < 3 {
            return invalid("map must be at least 3x3 cells");
        }
        if self.map.tile_size <= 0.0 {
            return invalid("tile_size must be positive");
        }
        if !(0.0..=1.0).contains(&self.map.fill_density) {
            return invalid("fill_density must be within 0..=1");
        }
        if self.lighting.aux_epsilon <= 0.0 {
            return invalid("aux_epsilon must be positive");
        }
        self.player.validate()
    }
}
