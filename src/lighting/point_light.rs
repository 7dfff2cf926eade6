//! Torch light: a visibility caster pinned to a world position.

use bevy::math::Vec2;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::caster::{RayCaster, VisibilityMesh};
use crate::config::Viewport;
use crate::geometry::LightingGeometry;

/// Shader uniform block handed to the renderer with each light mesh
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LightUniforms {
    pub viewport_dimensions: [f32; 2],
    pub light_position: [f32; 2],
    pub time: f32,
    pub color: [f32; 3],
}

/// Looping torch sprite animation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TorchAnimation {
    pub frame: usize,
    pub frame_count: usize,
    pub frame_duration: f32,
    elapsed: f32,
}

impl TorchAnimation {
    pub fn new(frame_count: usize, fps: f32) -> Self {
        Self {
            frame: 0,
            frame_count: frame_count.max(1),
            frame_duration: if fps > 0.0 { 1.0 / fps } else { f32::INFINITY },
            elapsed: 0.0,
        }
    }

    pub fn advance(&mut self, dt: f32) {
        self.elapsed += dt;
        while self.elapsed >= self.frame_duration {
            self.elapsed -= self.frame_duration;
            self.frame = (self.frame + 1) % self.frame_count;
        }
    }
}

#[derive(Debug, Clone)]
pub struct PointLight {
    pub position: Vec2,
    pub color: [f32; 3],
    pub caster: RayCaster,
    pub torch: TorchAnimation,
    mesh: VisibilityMesh,
    uniforms: LightUniforms,
}

impl PointLight {
    pub fn new(position: Vec2, color: [f32; 3], caster: RayCaster, torch: TorchAnimation) -> Self {
        Self {
            position,
            color,
            caster,
            torch,
            mesh: VisibilityMesh::empty(position),
            uniforms: LightUniforms {
                viewport_dimensions: [0.0, 0.0],
                light_position: [position.x, position.y],
                time: 0.0,
                color,
            },
        }
    }

    /// Rebuild the visibility mesh and uniforms.
    ///
    /// `time` keeps several lights in sync; when absent a fresh random value
    /// is drawn so each light shimmers independently.
    pub fn update<R: Rng>(
        &mut self,
        geometry: &LightingGeometry,
        viewport: Viewport,
        time: Option<f32>,
        dt: f32,
        rng: &mut R,
    ) {
        self.mesh = self.caster.cast(self.position, geometry);
        self.torch.advance(dt);
        self.uniforms = LightUniforms {
            viewport_dimensions: [viewport.width, viewport.height],
            light_position: [self.position.x, self.position.y],
            time: time.unwrap_or_else(|| rng.gen_range(0.0..1000.0)),
            color: self.color,
        };
    }

    /// Viewport changed: rebuild without advancing the torch
    pub fn resize<R: Rng>(&mut self, geometry: &LightingGeometry, viewport: Viewport, rng: &mut R) {
        let time = Some(self.uniforms.time);
        self.update(geometry, viewport, time, 0.0, rng);
    }

    pub fn mesh(&self) -> &VisibilityMesh {
        &self.mesh
    }

    pub fn uniforms(&self) -> &LightUniforms {
        &self.uniforms
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Boundary, Corner};
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn box_geometry() -> LightingGeometry {
        let tl = Vec2::new(0.0, 0.0);
        let tr = Vec2::new(64.0, 0.0);
        let br = Vec2::new(64.0, 64.0);
        let bl = Vec2::new(0.0, 64.0);
        LightingGeometry::new(
            vec![
                Boundary::new(tl, tr),
                Boundary::new(tr, br),
                Boundary::new(br, bl),
                Boundary::new(bl, tl),
            ],
            vec![
                Corner::from_tile_vertex(tl, tr, bl),
                Corner::from_tile_vertex(tr, br, tl),
                Corner::from_tile_vertex(br, bl, tr),
                Corner::from_tile_vertex(bl, tl, br),
            ],
        )
    }

    fn viewport() -> Viewport {
        Viewport {
            width: 800.0,
            height: 600.0,
        }
    }

    #[test]
    fn test_torch_wraps() {
        let mut torch = TorchAnimation::new(4, 10.0);
        torch.advance(0.45);
        assert_eq!(torch.frame, 0);

        let mut torch = TorchAnimation::new(4, 10.0);
        torch.advance(0.35);
        assert_eq!(torch.frame, 3);
    }

    #[test]
    fn test_update_rebuilds_mesh_and_uniforms() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(1);
        let mut light = PointLight::new(
            Vec2::new(32.0, 32.0),
            [1.0, 0.8, 0.5],
            RayCaster::default(),
            TorchAnimation::new(6, 12.0),
        );
        assert!(light.mesh().is_empty());

        light.update(&box_geometry(), viewport(), Some(2.5), 1.0 / 60.0, &mut rng);
        assert_eq!(light.mesh().triangles.len(), 4);
        assert_eq!(light.uniforms().time, 2.5);
        assert_eq!(light.uniforms().viewport_dimensions, [800.0, 600.0]);
        assert_eq!(light.uniforms().light_position, [32.0, 32.0]);
    }

    #[test]
    fn test_missing_time_draws_random_value() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
        let mut light = PointLight::new(
            Vec2::new(32.0, 32.0),
            [1.0, 1.0, 1.0],
            RayCaster::default(),
            TorchAnimation::new(1, 1.0),
        );
        light.update(&box_geometry(), viewport(), None, 0.0, &mut rng);
        let first = light.uniforms().time;
        light.update(&box_geometry(), viewport(), None, 0.0, &mut rng);
        assert!((0.0..1000.0).contains(&first));
        assert_ne!(first, light.uniforms().time);
    }

    #[test]
    fn test_resize_keeps_time() {
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let mut light = PointLight::new(
            Vec2::new(10.0, 10.0),
            [1.0, 1.0, 1.0],
            RayCaster::default(),
            TorchAnimation::new(2, 5.0),
        );
        light.update(&box_geometry(), viewport(), Some(9.0), 0.1, &mut rng);
        let frame = light.torch.frame;
        light.resize(
            &box_geometry(),
            Viewport {
                width: 1024.0,
                height: 768.0,
            },
            &mut rng,
        );
        assert_eq!(light.uniforms().time, 9.0);
        assert_eq!(light.uniforms().viewport_dimensions, [1024.0, 768.0]);
        assert_eq!(light.torch.frame, frame);
    }
}
