//! Per-tile physics volumes and the lighting geometry derived from them.

use bevy::math::Vec2;
use serde::{Deserialize, Serialize};

use super::OccupancyGrid;
use crate::geometry::{Boundary, Corner, GeometrySet, LightingGeometry};

/// Axis-aligned box in screen space (y down)
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: [f32; 2],
    pub max: [f32; 2],
}

impl Aabb {
    pub fn new(min: Vec2, max: Vec2) -> Self {
        Self {
            min: min.to_array(),
            max: max.to_array(),
        }
    }

    pub fn from_center(center: Vec2, half: Vec2) -> Self {
        Self::new(center - half, center + half)
    }

    pub fn min(&self) -> Vec2 {
        Vec2::from_array(self.min)
    }

    pub fn max(&self) -> Vec2 {
        Vec2::from_array(self.max)
    }

    pub fn center(&self) -> Vec2 {
        (self.min() + self.max()) * 0.5
    }

    pub fn half_extents(&self) -> Vec2 {
        (self.max() - self.min()) * 0.5
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min[0] && p.x <= self.max[0] && p.y >= self.min[1] && p.y <= self.max[1]
    }
}

/// Ledge-grab trigger centred on a tile's top corner
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LedgeSensor {
    pub bounds: Aabb,
    pub corner: [f32; 2],
    pub is_right: bool,
}

impl LedgeSensor {
    pub fn corner(&self) -> Vec2 {
        Vec2::from_array(self.corner)
    }
}

/// Physics volumes for one solid cell
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileCollider {
    pub grid_x: usize,
    pub grid_y: usize,
    pub size: f32,
    pub solid: Aabb,
    /// Only when the cell above is open
    pub walk_sensor: Option<Aabb>,
    pub left_ledge: Option<LedgeSensor>,
    pub right_ledge: Option<LedgeSensor>,
}

/// Pixel corners of a cell
#[derive(Debug, Clone, Copy)]
struct TileVertices {
    tl: Vec2,
    tr: Vec2,
    br: Vec2,
    bl: Vec2,
}

impl TileVertices {
    fn of(x: usize, y: usize, size: f32) -> Self {
        let tl = Vec2::new(x as f32, y as f32) * size;
        Self {
            tl,
            tr: tl + Vec2::new(size, 0.0),
            br: tl + Vec2::new(size, size),
            bl: tl + Vec2::new(0.0, size),
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct OpenSides {
    north: bool,
    east: bool,
    south: bool,
    west: bool,
}

impl OpenSides {
    fn of(grid: &OccupancyGrid, x: usize, y: usize) -> Self {
        let (x, y) = (x as i32, y as i32);
        Self {
            north: grid.is_open(x, y - 1),
            east: grid.is_open(x + 1, y),
            south: grid.is_open(x, y + 1),
            west: grid.is_open(x - 1, y),
        }
    }
}

impl TileCollider {
    /// Colliders for a solid cell; `None` for open cells
    pub fn build(grid: &OccupancyGrid, x: usize, y: usize, tile_size: f32) -> Option<Self> {
        if grid.is_open(x as i32, y as i32) || grid.get(x, y).is_none() {
            return None;
        }
        let v = TileVertices::of(x, y, tile_size);
        let open = OpenSides::of(grid, x, y);

        let walk_depth = tile_size / 8.0;
        let walk_sensor = open
            .north
            .then(|| Aabb::new(v.tl - Vec2::new(0.0, walk_depth), v.tr));

        let ledge_half = Vec2::splat(tile_size / 8.0);
        let ledge = |corner: Vec2, is_right: bool| LedgeSensor {
            bounds: Aabb::from_center(corner, ledge_half),
            corner: corner.to_array(),
            is_right,
        };

        Some(Self {
            grid_x: x,
            grid_y: y,
            size: tile_size,
            solid: Aabb::new(v.tl, v.br),
            walk_sensor,
            left_ledge: (open.north && open.west).then(|| ledge(v.tl, false)),
            right_ledge: (open.north && open.east).then(|| ledge(v.tr, true)),
        })
    }
}

/// Walls and silhouette corners of one solid cell, pushed into the sets
fn emit_tile_geometry(
    grid: &OccupancyGrid,
    x: usize,
    y: usize,
    tile_size: f32,
    boundaries: &mut GeometrySet<Boundary>,
    corners: &mut GeometrySet<Corner>,
) {
    let v = TileVertices::of(x, y, tile_size);
    let open = OpenSides::of(grid, x, y);

    if open.north {
        boundaries.insert(Boundary::new(v.tl, v.tr));
    }
    if open.east {
        boundaries.insert(Boundary::new(v.tr, v.br));
    }
    if open.south {
        boundaries.insert(Boundary::new(v.br, v.bl));
    }
    if open.west {
        boundaries.insert(Boundary::new(v.bl, v.tl));
    }

    // each vertex takes its clockwise neighbour first
    if open.north || open.west {
        corners.insert(Corner::from_tile_vertex(v.tl, v.tr, v.bl));
    }
    if open.north || open.east {
        corners.insert(Corner::from_tile_vertex(v.tr, v.br, v.tl));
    }
    if open.south || open.east {
        corners.insert(Corner::from_tile_vertex(v.br, v.bl, v.tr));
    }
    if open.south || open.west {
        corners.insert(Corner::from_tile_vertex(v.bl, v.tl, v.br));
    }
}

/// Colliders for every solid cell plus the deduplicated lighting geometry
pub fn emit_geometry(grid: &OccupancyGrid, tile_size: f32) -> (Vec<TileCollider>, LightingGeometry) {
    let mut colliders = Vec::new();
    let mut boundaries = GeometrySet::new();
    let mut corners = GeometrySet::new();

    for y in 0..grid.height() {
        for x in 0..grid.width() {
            if let Some(collider) = TileCollider::build(grid, x, y, tile_size) {
                emit_tile_geometry(grid, x, y, tile_size, &mut boundaries, &mut corners);
                colliders.push(collider);
            }
        }
    }

    (
        colliders,
        LightingGeometry::new(boundaries.into_vec(), corners.into_vec()),
    )
}
