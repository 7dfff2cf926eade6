//! Open-region labelling and repair.
//!
//! Regions are 4-connected sets of open cells, labelled with a queue-based
//! flood fill in row-major discovery order.

use std::collections::VecDeque;

use petgraph::unionfind::UnionFind;
use rand::{Rng, RngCore};
use tracing::debug;

use super::{OccupancyGrid, TileState};

const NEIGHBORS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Regions {
    width: usize,
    labels: Vec<Option<usize>>,
    sizes: Vec<usize>,
}

impl Regions {
    pub fn count(&self) -> usize {
        self.sizes.len()
    }

    pub fn label(&self, x: usize, y: usize) -> Option<usize> {
        self.labels.get(y * self.width + x).copied().flatten()
    }

    pub fn size(&self, label: usize) -> usize {
        self.sizes.get(label).copied().unwrap_or(0)
    }

    /// Largest region; ties go to the one discovered first
    pub fn largest(&self) -> Option<usize> {
        let mut best: Option<usize> = None;
        for (label, &size) in self.sizes.iter().enumerate() {
            if best.map_or(true, |b| size > self.sizes[b]) {
                best = Some(label);
            }
        }
        best
    }

    pub fn cells(&self, label: usize) -> Vec<(usize, usize)> {
        self.labels
            .iter()
            .enumerate()
            .filter(|(_, l)| **l == Some(label))
            .map(|(i, _)| (i % self.width, i / self.width))
            .collect()
    }
}

pub fn label_regions(grid: &OccupancyGrid) -> Regions {
    let (width, height) = (grid.width(), grid.height());
    let mut labels = vec![None; width * height];
    let mut sizes = Vec::new();
    let mut queue = VecDeque::new();

    for y in 0..height {
        for x in 0..width {
            if labels[y * width + x].is_some() || grid.is_solid(x as i32, y as i32) {
                continue;
            }
            let label = sizes.len();
            let mut size = 0;
            labels[y * width + x] = Some(label);
            queue.push_back((x, y));

            while let Some((cx, cy)) = queue.pop_front() {
                size += 1;
                for (dx, dy) in NEIGHBORS {
                    let nx = cx as i32 + dx;
                    let ny = cy as i32 + dy;
                    if grid.is_solid(nx, ny) {
                        continue;
                    }
                    let index = ny as usize * width + nx as usize;
                    if labels[index].is_none() {
                        labels[index] = Some(label);
                        queue.push_back((nx as usize, ny as usize));
                    }
                }
            }
            sizes.push(size);
        }
    }

    Regions { width, labels, sizes }
}

/// Wall over every open cell outside the largest region. Returns the number
/// of open cells kept.
pub fn retain_largest_region(grid: &mut OccupancyGrid) -> usize {
    let regions = label_regions(grid);
    let Some(keep) = regions.largest() else {
        return 0;
    };

    let mut removed = 0;
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            if let Some(label) = regions.label(x, y) {
                if label != keep {
                    grid.set(x, y, TileState::Wall);
                    removed += 1;
                }
            }
        }
    }
    if removed > 0 {
        debug!(removed, regions = regions.count(), "discarded unreachable pockets");
    }
    regions.size(keep)
}

/// Number of open cells reachable from `start`
pub fn reachable_from(grid: &OccupancyGrid, start: (usize, usize)) -> usize {
    let regions = label_regions(grid);
    match regions.label(start.0, start.1) {
        Some(label) => regions.size(label),
        None => 0,
    }
}

pub fn is_connected(grid: &OccupancyGrid) -> bool {
    label_regions(grid).count() <= 1
}

/// Tunnel every open region into one. Regions are joined along a minimum
/// spanning tree over their representative cells using L-shaped corridors.
/// Returns the number of tunnels carved.
pub fn connect_regions(grid: &mut OccupancyGrid, rng: &mut dyn RngCore) -> usize {
    let regions = label_regions(grid);
    let count = regions.count();
    if count <= 1 {
        return 0;
    }

    let anchors: Vec<(usize, usize)> = (0..count).map(|label| region_anchor(&regions, label)).collect();

    let mut edges = Vec::with_capacity(count * (count - 1) / 2);
    for i in 0..count {
        for j in (i + 1)..count {
            let (a, b) = (anchors[i], anchors[j]);
            let distance = a.0.abs_diff(b.0) + a.1.abs_diff(b.1);
            edges.push((distance, i, j));
        }
    }
    edges.sort_unstable();

    let mut forest = UnionFind::<usize>::new(count);
    let mut tunnels = 0;
    for (_, i, j) in edges {
        if !forest.union(i, j) {
            continue;
        }
        let (a, b) = (anchors[i], anchors[j]);
        if rng.gen_bool(0.5) {
            carve_h_corridor(grid, a.0, b.0, a.1);
            carve_v_corridor(grid, a.1, b.1, b.0);
        } else {
            carve_v_corridor(grid, a.1, b.1, a.0);
            carve_h_corridor(grid, a.0, b.0, b.1);
        }
        tunnels += 1;
        if tunnels == count - 1 {
            break;
        }
    }
    tunnels
}

/// Region cell closest to the region's centroid
fn region_anchor(regions: &Regions, label: usize) -> (usize, usize) {
    let cells = regions.cells(label);
    let n = cells.len().max(1) as f32;
    let cx = cells.iter().map(|c| c.0 as f32).sum::<f32>() / n;
    let cy = cells.iter().map(|c| c.1 as f32).sum::<f32>() / n;

    let mut best = cells.first().copied().unwrap_or((0, 0));
    let mut best_distance = f32::MAX;
    for &(x, y) in &cells {
        let d = (x as f32 - cx).powi(2) + (y as f32 - cy).powi(2);
        if d < best_distance {
            best_distance = d;
            best = (x, y);
        }
    }
    best
}

fn carve_h_corridor(grid: &mut OccupancyGrid, x1: usize, x2: usize, y: usize) {
    for x in x1.min(x2)..=x1.max(x2) {
        if grid.get(x, y) == Some(TileState::Wall) {
            grid.set(x, y, TileState::Empty);
        }
    }
}

fn carve_v_corridor(grid: &mut OccupancyGrid, y1: usize, y2: usize, x: usize) {
    for y in y1.min(y2)..=y1.max(y2) {
        if grid.get(x, y) == Some(TileState::Wall) {
            grid.set(x, y, TileState::Empty);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    fn three_pockets() -> OccupancyGrid {
        OccupancyGrid::from_ascii(&[
            "##########",
            "#..####..#",
            "#..####..#",
            "##########",
            "####.#####",
            "##########",
        ])
    }

    #[test]
    fn test_labels_four_connected_regions() {
        let regions = label_regions(&three_pockets());
        assert_eq!(regions.count(), 3);
        assert_eq!(regions.size(0), 4);
        assert_eq!(regions.size(2), 1);
        assert_eq!(regions.label(0, 0), None);
    }

    #[test]
    fn test_diagonal_cells_are_separate_regions() {
        let grid = OccupancyGrid::from_ascii(&["####", "#.##", "##.#", "####"]);
        assert_eq!(label_regions(&grid).count(), 2);
    }

    #[test]
    fn test_largest_prefers_first_on_tie() {
        let regions = label_regions(&three_pockets());
        assert_eq!(regions.largest(), Some(0));
    }

    #[test]
    fn test_retain_largest_region() {
        let mut grid = three_pockets();
        assert_eq!(retain_largest_region(&mut grid), 4);
        assert_eq!(grid.open_count(), 4);
        assert!(is_connected(&grid));
        assert_eq!(reachable_from(&grid, (1, 1)), 4);
        assert_eq!(reachable_from(&grid, (7, 1)), 0);
    }

    #[test]
    fn test_retain_on_solid_grid_reports_zero() {
        let mut grid = OccupancyGrid::new(4, 4, TileState::Wall);
        assert_eq!(retain_largest_region(&mut grid), 0);
    }

    #[test]
    fn test_connect_regions_joins_everything() {
        let mut grid = three_pockets();
        let tunnels = connect_regions(&mut grid, &mut Xoshiro256PlusPlus::seed_from_u64(3));
        assert_eq!(tunnels, 2);
        assert!(is_connected(&grid));
        assert!(grid.open_count() > 9);
    }
}
