//! Visibility caster.
//!
//! One primary ray per terrain corner, plus an auxiliary ray beside every
//! corner the light sees in silhouette. Rays are sorted by angle and joined
//! into a triangle fan around the light position.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ray::Ray;
use crate::constants::{AUX_RAY_EPSILON, OCCLUSION_TOLERANCE};
use crate::geometry::{Corner, LightingGeometry};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RayCaster {
    /// Angular offset of auxiliary rays (radians)
    pub aux_epsilon: f32,
}

impl Default for RayCaster {
    fn default() -> Self {
        Self {
            aux_epsilon: AUX_RAY_EPSILON,
        }
    }
}

/// Triangle fan approximating the region visible from `origin`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibilityMesh {
    pub origin: Vec2,
    /// Sorted ascending by angle; every ray has a hit
    pub rays: Vec<Ray>,
    pub triangles: Vec<[Vec2; 3]>,
}

impl VisibilityMesh {
    pub fn empty(origin: Vec2) -> Self {
        Self {
            origin,
            rays: Vec::new(),
            triangles: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    pub fn auxiliary_ray_count(&self) -> usize {
        self.rays.iter().filter(|r| r.is_auxiliary()).count()
    }

    /// Flattened vertex buffer, three vertices per triangle
    pub fn vertices(&self) -> Vec<[f32; 2]> {
        self.triangles
            .iter()
            .flat_map(|tri| tri.iter().map(|v| [v.x, v.y]))
            .collect()
    }
}

/// Rotation for the auxiliary ray at `corner`, or `None` if the corner is not
/// a silhouette vertex as seen along `direction`.
///
/// Both edge vectors are projected onto the perpendicular of the ray. Opposite
/// signs (product <= 0) mean the ray grazes the corner and the region behind
/// it must be sampled by a second ray, rotated away from the solid side.
pub fn silhouette_rotation(direction: Vec2, corner: &Corner, epsilon: f32) -> Option<f32> {
    let perp = direction.perp();
    let proj1 = corner.edge1.dot(perp);
    let proj2 = corner.edge2.dot(perp);

    if proj1 * proj2 > 0.0 {
        return None;
    }

    // edge1 lying along the ray: the solid side is where edge2 came from
    let solid_side = if proj1 != 0.0 { proj1 } else { -proj2 };
    Some(if solid_side > 0.0 { -epsilon } else { epsilon })
}

impl RayCaster {
    pub fn new(aux_epsilon: f32) -> Self {
        Self { aux_epsilon }
    }

    pub fn cast(&self, origin: Vec2, geometry: &LightingGeometry) -> VisibilityMesh {
        if geometry.corners.is_empty() {
            return VisibilityMesh::empty(origin);
        }

        let mut rays = Vec::with_capacity(geometry.corners.len() * 2);

        for corner in &geometry.corners {
            let mut ray = Ray::toward(origin, *corner);

            // light sitting exactly on a vertex
            if ray.direction == Vec2::ZERO {
                ray.closest_hit = Some(corner.pos);
                rays.push(ray);
                continue;
            }

            let corner_dist = origin.distance(corner.pos);
            match ray.cast_all(&geometry.boundaries) {
                Some((hit, dist)) if dist < corner_dist - OCCLUSION_TOLERANCE => {
                    ray.closest_hit = Some(hit);
                }
                _ => {
                    ray.closest_hit = Some(corner.pos);
                    if let Some(rotation) =
                        silhouette_rotation(ray.direction, corner, self.aux_epsilon)
                    {
                        let mut aux = Ray::with_angle(origin, ray.angle + rotation);
                        aux.closest_hit = aux.cast_all(&geometry.boundaries).map(|(p, _)| p);
                        if aux.closest_hit.is_some() {
                            rays.push(aux);
                        } else {
                            debug!(
                                target: "cave_core::lighting",
                                corner_x = corner.pos.x,
                                corner_y = corner.pos.y,
                                "auxiliary ray escaped all walls, omitted"
                            );
                        }
                    }
                }
            }
            rays.push(ray);
        }

        rays.sort_by(|a, b| a.angle.total_cmp(&b.angle));

        let triangles = build_fan(origin, &rays);
        VisibilityMesh {
            origin,
            rays,
            triangles,
        }
    }
}

fn build_fan(origin: Vec2, rays: &[Ray]) -> Vec<[Vec2; 3]> {
    if rays.len() < 2 {
        return Vec::new();
    }

    let hits: Vec<Vec2> = rays.iter().filter_map(|r| r.closest_hit).collect();
    (0..hits.len())
        .map(|i| [origin, hits[i], hits[(i + 1) % hits.len()]])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Boundary;

    /// Closed square room with walls at 0 and `size`, corners pointing inward
    fn room(size: f32) -> LightingGeometry {
        let tl = Vec2::new(0.0, 0.0);
        let tr = Vec2::new(size, 0.0);
        let br = Vec2::new(size, size);
        let bl = Vec2::new(0.0, size);
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

    #[test]
    fn test_zero_corners_is_empty_mesh() {
        let mesh = RayCaster::default().cast(Vec2::ZERO, &LightingGeometry::default());
        assert!(mesh.is_empty());
        assert!(mesh.rays.is_empty());
    }

    #[test]
    fn test_silhouette_same_sign_is_none() {
        let corner = Corner::new(Vec2::ZERO, Vec2::new(32.0, 0.0), Vec2::new(0.0, -32.0));
        // seen head-on from the upper left
        let dir = Vec2::new(1.0, 1.0).normalize();
        assert!(silhouette_rotation(dir, &corner, 0.005).is_none());
    }

    #[test]
    fn test_silhouette_opposite_sign_rotates_away_from_solid() {
        let corner = Corner::new(Vec2::ZERO, Vec2::new(32.0, 0.0), Vec2::new(0.0, -32.0));
        // grazing the top edge from the upper right
        let dir = Vec2::new(-2.0, 1.0).normalize();
        let rotation = silhouette_rotation(dir, &corner, 0.005).unwrap();
        assert!((rotation - 0.005).abs() < 1e-7);

        let mirrored = Corner::new(Vec2::ZERO, Vec2::new(-32.0, 0.0), Vec2::new(0.0, 32.0));
        let rotation = silhouette_rotation(dir, &mirrored, 0.005).unwrap();
        assert!((rotation + 0.005).abs() < 1e-7);
    }

    #[test]
    fn test_inside_room_produces_closed_fan() {
        let geometry = room(100.0);
        let mesh = RayCaster::default().cast(Vec2::new(50.0, 50.0), &geometry);
        assert_eq!(mesh.rays.len(), 4);
        assert_eq!(mesh.triangles.len(), 4);
        assert_eq!(mesh.auxiliary_ray_count(), 0);
        for window in mesh.rays.windows(2) {
            assert!(window[0].angle <= window[1].angle);
        }
    }

    #[test]
    fn test_occluded_corner_stops_at_wall() {
        let mut geometry = room(100.0);
        // a wall between the light and the bottom right corner
        geometry
            .boundaries
            .push(Boundary::new(Vec2::new(60.0, 90.0), Vec2::new(90.0, 60.0)));
        let mesh = RayCaster::default().cast(Vec2::new(50.0, 50.0), &geometry);
        let blocked = mesh
            .rays
            .iter()
            .find(|r| r.target.map(|c| c.pos) == Some(Vec2::new(100.0, 100.0)))
            .unwrap();
        let hit = blocked.closest_hit.unwrap();
        assert!((hit.x - 75.0).abs() < 1e-3);
        assert!((hit.y - 75.0).abs() < 1e-3);
    }

    #[test]
    fn test_single_ray_has_no_triangles() {
        let geometry = LightingGeometry::new(
            vec![],
            vec![Corner::new(Vec2::new(10.0, 0.0), Vec2::Y, Vec2::Y)],
        );
        let mesh = RayCaster::default().cast(Vec2::ZERO, &geometry);
        assert_eq!(mesh.rays.len(), 1);
        assert!(mesh.is_empty());
        assert_eq!(mesh.rays[0].closest_hit, Some(Vec2::new(10.0, 0.0)));
    }
}
