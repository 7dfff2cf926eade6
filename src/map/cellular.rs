//! Cellular automaton caves.
//!
//! Live cells are walls. After smoothing, the border is walled in and every
//! remaining open region is tunnelled into one.

use rand::{Rng, RngCore};
use tracing::debug;

use super::connectivity;
use super::{GenerationStrategy, OccupancyGrid, TileState};
use crate::constants::{CELLULAR_BIRTH, CELLULAR_ITERATIONS, CELLULAR_SURVIVE};

#[derive(Debug, Clone, PartialEq)]
pub struct CellularStrategy {
    /// Probability that a cell starts as wall
    pub fill_density: f64,
    pub iterations: u32,
    /// Wall-neighbour counts that turn an open cell into wall
    pub birth: Vec<u8>,
    /// Wall-neighbour counts that keep a wall standing
    pub survive: Vec<u8>,
}

impl Default for CellularStrategy {
    fn default() -> Self {
        Self {
            fill_density: 0.5,
            iterations: CELLULAR_ITERATIONS,
            birth: CELLULAR_BIRTH.to_vec(),
            survive: CELLULAR_SURVIVE.to_vec(),
        }
    }
}

impl CellularStrategy {
    pub fn randomize(&self, width: usize, height: usize, rng: &mut dyn RngCore) -> Vec<bool> {
        let density = self.fill_density.clamp(0.0, 1.0);
        (0..width * height).map(|_| rng.gen_bool(density)).collect()
    }

    /// One generation. Neighbours outside the grid do not count.
    pub fn step(&self, alive: &[bool], width: usize, height: usize) -> Vec<bool> {
        let mut next = vec![false; alive.len()];
        for y in 0..height {
            for x in 0..width {
                let count = live_neighbors(alive, width, height, x, y);
                let index = y * width + x;
                next[index] = if alive[index] {
                    self.survive.contains(&count)
                } else {
                    self.birth.contains(&count)
                };
            }
        }
        next
    }
}

fn live_neighbors(alive: &[bool], width: usize, height: usize, x: usize, y: usize) -> u8 {
    let mut count = 0;
    for dy in -1i32..=1 {
        for dx in -1i32..=1 {
            if dx == 0 && dy == 0 {
                continue;
            }
            let nx = x as i32 + dx;
            let ny = y as i32 + dy;
            if nx < 0 || ny < 0 || nx >= width as i32 || ny >= height as i32 {
                continue;
            }
            if alive[ny as usize * width + nx as usize] {
                count += 1;
            }
        }
    }
    count
}

impl GenerationStrategy for CellularStrategy {
    fn name(&self) -> &'static str {
        "cellular"
    }

    fn carve(&self, width: usize, height: usize, rng: &mut dyn RngCore) -> OccupancyGrid {
        let mut alive = self.randomize(width, height, rng);
        for _ in 0..self.iterations {
            alive = self.step(&alive, width, height);
        }

        let mut grid = OccupancyGrid::new(width, height, TileState::Empty);
        for y in 0..height {
            for x in 0..width {
                if alive[y * width + x] {
                    grid.set(x, y, TileState::Wall);
                }
            }
        }
        grid.fill_border();

        let tunnels = connectivity::connect_regions(&mut grid, rng);
        debug!(tunnels, open = grid.open_count(), "cellular cave carved");
        grid
    }
}
