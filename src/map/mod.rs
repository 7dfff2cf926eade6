//! Procedural level assembly.
//!
//! A [`GenerationStrategy`] carves an occupancy grid; [`MapBuilder`] runs the
//! shared pipeline over it: solid border, largest connected region, colliders
//! and lighting geometry, tile placements, then spawn sampling.

pub mod cellular;
pub mod collider;
pub mod connectivity;
pub mod snapshot;
pub mod tiles;
pub mod wang;

use bevy::math::Vec2;
use rand::{Rng, RngCore, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Sha3_256};
use tracing::{debug, error, info};

use crate::config::{MapConfig, MapStyle};
use crate::error::{CaveError, Result};
use crate::geometry::LightingGeometry;
use crate::logging::TimingSpan;

pub use cellular::CellularStrategy;
pub use collider::{Aabb, LedgeSensor, TileCollider};
pub use snapshot::{MapSnapshot, RestoredMap};
pub use tiles::{NeighborMask, TileKind, TilePlacement, TileVariant};
pub use wang::{BitmapSource, ReferenceBitmap, WangStrategy};

/// Contents of one grid cell
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileState {
    #[default]
    Empty,
    Wall,
    LightSpawn,
    CatnipSpawn,
    NpcSpawn,
}

impl TileState {
    pub fn is_solid(&self) -> bool {
        matches!(self, TileState::Wall)
    }

    pub fn symbol(&self) -> char {
        match self {
            TileState::Empty => '.',
            TileState::Wall => '#',
            TileState::LightSpawn => 'L',
            TileState::CatnipSpawn => 'C',
            TileState::NpcSpawn => 'N',
        }
    }
}

/// Row-major grid of tile states. Cells outside the grid read as solid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancyGrid {
    width: usize,
    height: usize,
    cells: Vec<TileState>,
}

impl OccupancyGrid {
    pub fn new(width: usize, height: usize, fill: TileState) -> Self {
        Self {
            width,
            height,
            cells: vec![fill; width * height],
        }
    }

    pub fn from_cells(width: usize, height: usize, cells: Vec<TileState>) -> Result<Self> {
        if cells.len() != width * height {
            return Err(CaveError::Snapshot(format!(
                "expected {} cells for {}x{}, found {}",
                width * height,
                width,
                height,
                cells.len()
            )));
        }
        Ok(Self { width, height, cells })
    }

    /// Parse rows of `#` (wall) and `.` (open)
    pub fn from_ascii(rows: &[&str]) -> Self {
        let height = rows.len();
        let width = rows.iter().map(|r| r.chars().count()).max().unwrap_or(0);
        let mut grid = Self::new(width, height, TileState::Wall);
        for (y, row) in rows.iter().enumerate() {
            for (x, ch) in row.chars().enumerate() {
                let state = match ch {
                    '.' => TileState::Empty,
                    'L' => TileState::LightSpawn,
                    'C' => TileState::CatnipSpawn,
                    'N' => TileState::NpcSpawn,
                    _ => TileState::Wall,
                };
                grid.set(x, y, state);
            }
        }
        grid
    }

    pub fn to_ascii(&self) -> String {
        let mut out = String::with_capacity((self.width + 1) * self.height);
        for y in 0..self.height {
            for x in 0..self.width {
                out.push(self.cells[y * self.width + x].symbol());
            }
            out.push('\n');
        }
        out
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cells(&self) -> &[TileState] {
        &self.cells
    }

    pub fn get(&self, x: usize, y: usize) -> Option<TileState> {
        if x < self.width && y < self.height {
            Some(self.cells[y * self.width + x])
        } else {
            None
        }
    }

    pub fn set(&mut self, x: usize, y: usize, state: TileState) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = state;
        }
    }

    pub fn is_solid(&self, x: i32, y: i32) -> bool {
        if x < 0 || y < 0 {
            return true;
        }
        self.get(x as usize, y as usize).map_or(true, |s| s.is_solid())
    }

    pub fn is_open(&self, x: i32, y: i32) -> bool {
        !self.is_solid(x, y)
    }

    pub fn open_cells(&self) -> Vec<(usize, usize)> {
        let mut open = Vec::new();
        for y in 0..self.height {
            for x in 0..self.width {
                if !self.cells[y * self.width + x].is_solid() {
                    open.push((x, y));
                }
            }
        }
        open
    }

    pub fn open_count(&self) -> usize {
        self.cells.iter().filter(|s| !s.is_solid()).count()
    }

    pub fn fill_border(&mut self) {
        if self.width == 0 || self.height == 0 {
            return;
        }
        for x in 0..self.width {
            self.set(x, 0, TileState::Wall);
            self.set(x, self.height - 1, TileState::Wall);
        }
        for y in 0..self.height {
            self.set(0, y, TileState::Wall);
            self.set(self.width - 1, y, TileState::Wall);
        }
    }

    pub fn neighbor_mask(&self, x: usize, y: usize) -> NeighborMask {
        NeighborMask::from_fn(|dx, dy| self.is_solid(x as i32 + dx, y as i32 + dy))
    }
}

/// Carves the raw occupancy of a level
pub trait GenerationStrategy {
    fn name(&self) -> &'static str;

    fn carve(&self, width: usize, height: usize, rng: &mut dyn RngCore) -> OccupancyGrid;
}

/// Pick the strategy a map config asks for
pub fn strategy_for(config: &MapConfig) -> Box<dyn GenerationStrategy> {
    match config.style {
        MapStyle::Cellular => Box::new(CellularStrategy {
            fill_density: config.fill_density,
            iterations: config.smoothing_iterations,
            ..CellularStrategy::default()
        }),
        MapStyle::Wang => Box::new(WangStrategy::reseeded(
            config.width * 2,
            config.height * 2,
            config.open_threshold,
        )),
    }
}

/// Root seed for a run of levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSeed {
    pub seed: u64,
}

impl Default for LevelSeed {
    fn default() -> Self {
        Self { seed: 42 }
    }
}

impl LevelSeed {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Deterministic per-level hash from the run seed and level index
    pub fn level_hash(&self, level: u32) -> u64 {
        let mut hasher = Sha3_256::new();
        hasher.update(self.seed.to_le_bytes());
        hasher.update(level.to_le_bytes());
        let digest = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&digest[..8]);
        u64::from_le_bytes(bytes)
    }

    pub fn rng_for(&self, level: u32) -> Xoshiro256PlusPlus {
        Xoshiro256PlusPlus::seed_from_u64(self.level_hash(level))
    }
}

/// Grid cells chosen for the player and every spawned object
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpawnPoints {
    pub player: (usize, usize),
    pub lights: Vec<(usize, usize)>,
    pub catnip: Vec<(usize, usize)>,
    pub npcs: Vec<(usize, usize)>,
}

/// Everything derived from an occupancy grid without randomness
#[derive(Debug, Clone, PartialEq)]
pub struct MapGeometry {
    pub colliders: Vec<TileCollider>,
    pub lighting: LightingGeometry,
    pub placements: Vec<TilePlacement>,
}

impl MapGeometry {
    pub fn from_grid(grid: &OccupancyGrid, tile_size: f32) -> Self {
        let (colliders, lighting) = collider::emit_geometry(grid, tile_size);
        let placements = tiles::placements(grid);
        Self {
            colliders,
            lighting,
            placements,
        }
    }
}

/// A fully assembled level
#[derive(Debug, Clone, PartialEq)]
pub struct MapLayout {
    pub strategy: String,
    pub tile_size: f32,
    pub grid: OccupancyGrid,
    pub colliders: Vec<TileCollider>,
    pub geometry: LightingGeometry,
    pub placements: Vec<TilePlacement>,
    pub spawns: SpawnPoints,
}

impl MapLayout {
    pub fn width(&self) -> usize {
        self.grid.width()
    }

    pub fn height(&self) -> usize {
        self.grid.height()
    }

    pub fn cell_center(&self, cell: (usize, usize)) -> Vec2 {
        cell_center(cell, self.tile_size)
    }

    pub fn player_spawn(&self) -> Vec2 {
        self.cell_center(self.spawns.player)
    }

    pub fn light_positions(&self) -> Vec<Vec2> {
        self.spawns.lights.iter().map(|&c| self.cell_center(c)).collect()
    }

    pub fn catnip_positions(&self) -> Vec<Vec2> {
        self.spawns.catnip.iter().map(|&c| self.cell_center(c)).collect()
    }

    pub fn npc_positions(&self) -> Vec<Vec2> {
        self.spawns.npcs.iter().map(|&c| self.cell_center(c)).collect()
    }

    /// Size of the level in pixels
    pub fn pixel_size(&self) -> Vec2 {
        Vec2::new(self.width() as f32, self.height() as f32) * self.tile_size
    }
}

pub fn cell_center(cell: (usize, usize), tile_size: f32) -> Vec2 {
    Vec2::new(cell.0 as f32 + 0.5, cell.1 as f32 + 0.5) * tile_size
}

/// Runs the level pipeline for one map config
#[derive(Debug, Clone)]
pub struct MapBuilder {
    config: MapConfig,
}

impl MapBuilder {
    pub fn new(config: MapConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &MapConfig {
        &self.config
    }

    pub fn build(&self, strategy: &dyn GenerationStrategy, rng: &mut dyn RngCore) -> Result<MapLayout> {
        let _span = TimingSpan::new("map_build");
        let (width, height) = (self.config.width, self.config.height);

        let mut grid = strategy.carve(width, height, rng);
        grid.fill_border();

        let open = connectivity::retain_largest_region(&mut grid);
        if open == 0 {
            error!(strategy = strategy.name(), width, height, "no open cells after connectivity pass");
            return Err(CaveError::NoOpenCells { width, height });
        }

        let tile_size = self.config.tile_size;
        let spawns = self.sample_spawns(&mut grid, rng);
        let geometry = MapGeometry::from_grid(&grid, tile_size);

        info!(
            strategy = strategy.name(),
            width,
            height,
            open_cells = open,
            boundaries = geometry.lighting.boundaries.len(),
            corners = geometry.lighting.corners.len(),
            lights = spawns.lights.len(),
            "level generated"
        );

        Ok(MapLayout {
            strategy: strategy.name().to_string(),
            tile_size,
            grid,
            colliders: geometry.colliders,
            geometry: geometry.lighting,
            placements: geometry.placements,
            spawns,
        })
    }

    /// Sample without replacement from the open cells: player first, then
    /// lights, catnip and NPCs
    fn sample_spawns(&self, grid: &mut OccupancyGrid, rng: &mut dyn RngCore) -> SpawnPoints {
        let mut free = grid.open_cells();
        let mut take = |free: &mut Vec<(usize, usize)>| {
            if free.is_empty() {
                None
            } else {
                let index = rng.gen_range(0..free.len());
                Some(free.swap_remove(index))
            }
        };

        let mut spawns = SpawnPoints::default();
        if let Some(cell) = take(&mut free) {
            spawns.player = cell;
        }

        let wanted = [
            (self.config.light_count, TileState::LightSpawn),
            (self.config.catnip_count, TileState::CatnipSpawn),
            (self.config.npc_count, TileState::NpcSpawn),
        ];
        for (count, state) in wanted {
            for _ in 0..count {
                let Some(cell) = take(&mut free) else {
                    debug!(?state, "ran out of free cells for spawns");
                    break;
                };
                grid.set(cell.0, cell.1, state);
                match state {
                    TileState::LightSpawn => spawns.lights.push(cell),
                    TileState::CatnipSpawn => spawns.catnip.push(cell),
                    _ => spawns.npcs.push(cell),
                }
            }
        }
        spawns
    }
}
