//! Named asset lookup.
//!
//! The core never loads files itself. Hosts hand it an [`AssetProvider`], and
//! level construction refuses to start when a required key is missing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::error;

use crate::error::{CaveError, Result};

pub const REQUIRED_TEXTURES: [&str; 4] = ["tiles", "torch", "catnip", "player"];
pub const REQUIRED_SHADERS: [&str; 1] = ["light"];
pub const REQUIRED_ANIMATIONS: [&str; 2] = ["torch", "climb"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderSource {
    pub vert: String,
    pub frag: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationClip {
    pub frames: Vec<String>,
    pub fps: f32,
}

pub trait AssetProvider {
    fn has_texture(&self, key: &str) -> bool;

    fn shader(&self, key: &str) -> Option<&ShaderSource>;

    fn animation(&self, key: &str) -> Option<&AnimationClip>;

    fn animation_frames(&self, key: &str) -> Option<usize> {
        self.animation(key).map(|clip| clip.frames.len())
    }
}

/// In-memory asset manifest, usually deserialized from RON
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssetCatalog {
    /// Key to texture path
    pub textures: BTreeMap<String, String>,
    pub shaders: BTreeMap<String, ShaderSource>,
    pub animations: BTreeMap<String, AnimationClip>,
}

impl AssetCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_ron_str(text: &str) -> Result<Self> {
        ron::from_str(text).map_err(|e| CaveError::ConfigParse(e.to_string()))
    }

    /// Catalog naming every required key with placeholder content
    pub fn stock() -> Self {
        let mut catalog = Self::new();
        for key in REQUIRED_TEXTURES {
            catalog = catalog.with_texture(key, format!("textures/{key}.png"));
        }
        catalog = catalog.with_shader(
            "light",
            ShaderSource {
                vert: "shaders/light.vert".into(),
                frag: "shaders/light.frag".into(),
            },
        );
        let frames = |name: &str, count: usize| (0..count).map(|i| format!("{name}_{i:02}")).collect();
        catalog
            .with_animation(
                "torch",
                AnimationClip {
                    frames: frames("torch", 6),
                    fps: 12.0,
                },
            )
            .with_animation(
                "climb",
                AnimationClip {
                    frames: frames("climb", 8),
                    fps: 16.0,
                },
            )
    }

    pub fn with_texture(mut self, key: impl Into<String>, path: impl Into<String>) -> Self {
        self.textures.insert(key.into(), path.into());
        self
    }

    pub fn with_shader(mut self, key: impl Into<String>, source: ShaderSource) -> Self {
        self.shaders.insert(key.into(), source);
        self
    }

    pub fn with_animation(mut self, key: impl Into<String>, clip: AnimationClip) -> Self {
        self.animations.insert(key.into(), clip);
        self
    }
}

impl AssetProvider for AssetCatalog {
    fn has_texture(&self, key: &str) -> bool {
        self.textures.contains_key(key)
    }

    fn shader(&self, key: &str) -> Option<&ShaderSource> {
        self.shaders.get(key)
    }

    fn animation(&self, key: &str) -> Option<&AnimationClip> {
        self.animations.get(key)
    }
}

/// Fail on the first required key the provider cannot supply
pub fn verify_required(provider: &dyn AssetProvider) -> Result<()> {
    let result = check_required(provider);
    if let Err(e) = &result {
        error!(error = %e, "required asset missing");
    }
    result
}

fn check_required(provider: &dyn AssetProvider) -> Result<()> {
    if let Some(key) = REQUIRED_TEXTURES.iter().find(|k| !provider.has_texture(k)) {
        return Err(CaveError::MissingTexture(key.to_string()));
    }
    if let Some(key) = REQUIRED_SHADERS.iter().find(|k| provider.shader(k).is_none()) {
        return Err(CaveError::MissingShader(key.to_string()));
    }
    if let Some(key) = REQUIRED_ANIMATIONS
        .iter()
        .find(|k| provider.animation_frames(k).map_or(true, |n| n == 0))
    {
        return Err(CaveError::MissingAnimation(key.to_string()));
    }
    Ok(())
}
