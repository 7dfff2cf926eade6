//! Wall segments and terrain corners consumed by the visibility caster.
//!
//! Both are compared by value: two independently built segments with the same
//! endpoints are the same wall. Deduplication goes through quantized keys so
//! float noise in tile vertex math never produces twin entries.

use std::collections::HashSet;
use std::hash::Hash;

use bevy::math::Vec2;

use crate::constants::POINT_KEY_SCALE;

/// Quantized point used as a hash key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointKey(pub i64, pub i64);

impl PointKey {
    pub fn of(p: Vec2) -> Self {
        Self(
            (p.x * POINT_KEY_SCALE).round() as i64,
            (p.y * POINT_KEY_SCALE).round() as i64,
        )
    }
}

/// Wall segment used for ray occlusion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Boundary {
    pub a: Vec2,
    pub b: Vec2,
}

impl Boundary {
    pub fn new(a: Vec2, b: Vec2) -> Self {
        Self { a, b }
    }

    pub fn length(&self) -> f32 {
        self.a.distance(self.b)
    }
}

/// Terrain vertex plus the two edge vectors used by the silhouette test.
///
/// `edge1` points from `pos` toward the first adjacent tile vertex, `edge2`
/// points from the second adjacent vertex toward `pos`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Corner {
    pub pos: Vec2,
    pub edge1: Vec2,
    pub edge2: Vec2,
}

impl Corner {
    pub fn new(pos: Vec2, edge1: Vec2, edge2: Vec2) -> Self {
        Self { pos, edge1, edge2 }
    }

    pub fn from_tile_vertex(vertex: Vec2, adjacent_a: Vec2, adjacent_b: Vec2) -> Self {
        Self {
            pos: vertex,
            edge1: adjacent_a - vertex,
            edge2: vertex - adjacent_b,
        }
    }
}

/// Value identity for deduplicated geometry
pub trait GeometryKey {
    type Key: Eq + Hash + Copy;

    fn geometry_key(&self) -> Self::Key;
}

impl GeometryKey for Boundary {
    type Key = (PointKey, PointKey);

    /// Endpoint order does not matter
    fn geometry_key(&self) -> Self::Key {
        let (a, b) = (PointKey::of(self.a), PointKey::of(self.b));
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }
}

impl GeometryKey for Corner {
    type Key = (PointKey, PointKey, PointKey);

    fn geometry_key(&self) -> Self::Key {
        (
            PointKey::of(self.pos),
            PointKey::of(self.edge1),
            PointKey::of(self.edge2),
        )
    }
}

/// Insertion-ordered set with value equality
#[derive(Debug, Clone)]
pub struct GeometrySet<T: GeometryKey> {
    items: Vec<T>,
    seen: HashSet<T::Key>,
}

impl<T: GeometryKey> Default for GeometrySet<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
        }
    }
}

impl<T: GeometryKey> GeometrySet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false when an equal item was already present
    pub fn insert(&mut self, item: T) -> bool {
        if self.seen.insert(item.geometry_key()) {
            self.items.push(item);
            true
        } else {
            false
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: GeometryKey> Extend<T> for GeometrySet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for item in iter {
            self.insert(item);
        }
    }
}

/// Everything the visibility caster needs from a level
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightingGeometry {
    pub boundaries: Vec<Boundary>,
    pub corners: Vec<Corner>,
}

impl LightingGeometry {
    pub fn new(boundaries: Vec<Boundary>, corners: Vec<Corner>) -> Self {
        Self {
            boundaries,
            corners,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.boundaries.is_empty() && self.corners.is_empty()
    }
}
