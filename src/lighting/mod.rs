//! Dynamic 2D visibility and lighting.
//!
//! Lights cast one ray per terrain corner against the level's wall segments
//! and rebuild a triangle-fan mesh every fixed tick. The renderer receives
//! the triangles plus a `LightUniforms` block per light.

pub mod caster;
pub mod point_light;
pub mod ray;

pub use caster::{silhouette_rotation, RayCaster, VisibilityMesh};
pub use point_light::{LightUniforms, PointLight, TorchAnimation};
pub use ray::Ray;

use bevy::prelude::*;

use crate::engine::plugin::{CaveEngineResource, EngineSet};

/// Per-tick copy of every light for external renderers
#[derive(Resource, Debug, Clone, Default)]
pub struct LightMeshes {
    pub lights: Vec<(VisibilityMesh, LightUniforms)>,
    /// Visibility from the player
    pub viewer: VisibilityMesh,
}

impl LightMeshes {
    pub fn triangle_count(&self) -> usize {
        self.lights.iter().map(|(mesh, _)| mesh.triangles.len()).sum()
    }
}

pub struct LightingPlugin;

impl Plugin for LightingPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<LightMeshes>()
            .add_systems(FixedUpdate, publish_light_meshes.after(EngineSet::Tick));
    }
}

fn publish_light_meshes(engine: Option<Res<CaveEngineResource>>, mut meshes: ResMut<LightMeshes>) {
    let Some(engine) = engine else {
        return;
    };
    meshes.lights.clear();
    meshes.lights.extend(
        engine
            .0
            .lights()
            .iter()
            .map(|light| (light.mesh().clone(), *light.uniforms())),
    );
    meshes.viewer = engine.0.viewer().clone();
}
