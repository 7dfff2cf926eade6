//! Single ray against wall segments.

use bevy::math::Vec2;

use crate::geometry::{Boundary, Corner};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec2,
    /// Unit direction
    pub direction: Vec2,
    /// Corner this ray was aimed at; auxiliary rays have none
    pub target: Option<Corner>,
    /// Signed angle of `direction` against +X, in (-PI, PI]
    pub angle: f32,
    pub closest_hit: Option<Vec2>,
}

impl Ray {
    /// Primary ray aimed at a terrain corner
    pub fn toward(origin: Vec2, target: Corner) -> Self {
        let direction = (target.pos - origin).normalize_or_zero();
        Self {
            origin,
            direction,
            target: Some(target),
            angle: direction.y.atan2(direction.x),
            closest_hit: None,
        }
    }

    /// Auxiliary ray with no target corner
    pub fn with_angle(origin: Vec2, angle: f32) -> Self {
        let direction = Vec2::from_angle(angle);
        Self {
            origin,
            direction,
            target: None,
            angle: direction.y.atan2(direction.x),
            closest_hit: None,
        }
    }

    pub fn is_auxiliary(&self) -> bool {
        self.target.is_none()
    }

    /// Intersection point and distance along the ray, if the ray crosses the
    /// interior of `wall` in front of its origin
    pub fn intersect(&self, wall: &Boundary) -> Option<(Vec2, f32)> {
        let (x1, y1) = (wall.a.x, wall.a.y);
        let (x2, y2) = (wall.b.x, wall.b.y);
        let (x3, y3) = (self.origin.x, self.origin.y);
        let (x4, y4) = (self.origin.x + self.direction.x, self.origin.y + self.direction.y);

        let den = (x1 - x2) * (y3 - y4) - (y1 - y2) * (x3 - x4);
        if den == 0.0 {
            return None;
        }

        let wall_t = ((x1 - x3) * (y3 - y4) - (y1 - y3) * (x3 - x4)) / den;
        let ray_u = -((x1 - x2) * (y1 - y3) - (y1 - y2) * (x1 - x3)) / den;

        if wall_t > 0.0 && wall_t < 1.0 && ray_u > 0.0 {
            let point = wall.a + (wall.b - wall.a) * wall_t;
            Some((point, ray_u))
        } else {
            None
        }
    }

    pub fn cast(&self, wall: &Boundary) -> Option<Vec2> {
        self.intersect(wall).map(|(point, _)| point)
    }

    /// Closest hit among all walls
    pub fn cast_all(&self, walls: &[Boundary]) -> Option<(Vec2, f32)> {
        walls
            .iter()
            .filter_map(|wall| self.intersect(wall))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }
}
