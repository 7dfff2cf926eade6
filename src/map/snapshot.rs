//! Serialized levels.
//!
//! A snapshot stores the occupancy grid and the geometry it produced. Restoring
//! rebuilds colliders and lighting geometry from the grid alone, so a restored
//! level never consumes randomness.

use serde::{Deserialize, Serialize};
use tracing::error;

use super::{MapGeometry, MapLayout, OccupancyGrid, SpawnPoints, TileCollider, TilePlacement};
use crate::error::{CaveError, Result};
use crate::geometry::{Boundary, Corner, LightingGeometry};

type Point = [f32; 2];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapSnapshot {
    pub strategy: String,
    pub tile_size: f32,
    pub grid: OccupancyGrid,
    pub spawns: SpawnPoints,
    pub boundaries: Vec<[Point; 2]>,
    /// Position, edge1, edge2
    pub corners: Vec<[Point; 3]>,
}

/// Level rebuilt from a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct RestoredMap {
    pub layout: MapLayout,
}

impl MapSnapshot {
    pub fn capture(layout: &MapLayout) -> Self {
        let (boundaries, corners) = flatten(&layout.geometry);
        Self {
            strategy: layout.strategy.clone(),
            tile_size: layout.tile_size,
            grid: layout.grid.clone(),
            spawns: layout.spawns.clone(),
            boundaries,
            corners,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| CaveError::Snapshot(e.to_string()))
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| CaveError::Snapshot(e.to_string()))
    }

    /// Rebuild the level from the stored grid
    pub fn restore(&self) -> Result<RestoredMap> {
        let grid = OccupancyGrid::from_cells(self.grid.width(), self.grid.height(), self.grid.cells().to_vec())?;
        if self.tile_size <= 0.0 {
            return Err(CaveError::Snapshot(format!("invalid tile size {}", self.tile_size)));
        }
        let geometry = MapGeometry::from_grid(&grid, self.tile_size);
        Ok(RestoredMap {
            layout: MapLayout {
                strategy: self.strategy.clone(),
                tile_size: self.tile_size,
                grid,
                colliders: geometry.colliders,
                geometry: geometry.lighting,
                placements: geometry.placements,
                spawns: self.spawns.clone(),
            },
        })
    }

    /// Restore and check the rebuilt geometry matches the stored geometry
    /// bit for bit
    pub fn verify(&self) -> Result<RestoredMap> {
        let restored = self.restore()?;
        let (boundaries, corners) = flatten(&restored.layout.geometry);
        if !same_bits(&boundaries, &self.boundaries) || !same_bits(&corners, &self.corners) {
            error!(
                stored_boundaries = self.boundaries.len(),
                rebuilt_boundaries = boundaries.len(),
                stored_corners = self.corners.len(),
                rebuilt_corners = corners.len(),
                "snapshot geometry mismatch"
            );
            return Err(CaveError::Snapshot("rebuilt geometry differs from snapshot".into()));
        }
        Ok(restored)
    }
}

impl RestoredMap {
    pub fn colliders(&self) -> &[TileCollider] {
        &self.layout.colliders
    }

    pub fn placements(&self) -> &[TilePlacement] {
        &self.layout.placements
    }

    pub fn into_layout(self) -> MapLayout {
        self.layout
    }
}

fn flatten(geometry: &LightingGeometry) -> (Vec<[Point; 2]>, Vec<[Point; 3]>) {
    let boundaries = geometry
        .boundaries
        .iter()
        .map(|b: &Boundary| [b.a.to_array(), b.b.to_array()])
        .collect();
    let corners = geometry
        .corners
        .iter()
        .map(|c: &Corner| [c.pos.to_array(), c.edge1.to_array(), c.edge2.to_array()])
        .collect();
    (boundaries, corners)
}

fn same_bits<const N: usize>(a: &[[Point; N]], b: &[[Point; N]]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(x, y)| {
            x.iter()
                .flatten()
                .zip(y.iter().flatten())
                .all(|(p, q)| p.to_bits() == q.to_bits())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapConfig;
    use crate::map::{LevelSeed, MapBuilder, WangStrategy};

    fn layout() -> MapLayout {
        let config = MapConfig {
            width: 24,
            height: 16,
            ..MapConfig::default()
        };
        let strategy = WangStrategy::perlin(48, 32, 5, 254);
        MapBuilder::new(config)
            .build(&strategy, &mut LevelSeed::new(5).rng_for(0))
            .unwrap()
    }

    #[test]
    fn test_restore_matches_built_level() {
        let layout = layout();
        let snapshot = MapSnapshot::capture(&layout);
        let json = snapshot.to_json().unwrap();
        let restored = MapSnapshot::from_json(&json).unwrap().verify().unwrap();
        assert_eq!(restored.layout, layout);
    }

    #[test]
    fn test_tampered_geometry_fails_verification() {
        let mut snapshot = MapSnapshot::capture(&layout());
        if let Some(first) = snapshot.boundaries.first_mut() {
            first[0][0] += 0.5;
        } else {
            snapshot.boundaries.push([[0.0, 0.0], [1.0, 0.0]]);
        }
        assert!(matches!(snapshot.verify(), Err(CaveError::Snapshot(_))));
    }

    #[test]
    fn test_bad_json_is_a_snapshot_error() {
        assert!(matches!(MapSnapshot::from_json("{"), Err(CaveError::Snapshot(_))));
    }
}
