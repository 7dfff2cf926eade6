//! Dungeon carved from a greyscale reference bitmap.
//!
//! A random window of the bitmap is thresholded: dark pixels are open. The
//! bitmap is either supplied (a baked Wang-tile image) or synthesized from
//! Perlin noise, where the zero contours of the noise field become corridors.

use noise::{NoiseFn, Perlin};
use rand::{Rng, RngCore};
use tracing::debug;

use super::{GenerationStrategy, OccupancyGrid, TileState};
use crate::constants::WANG_OPEN_THRESHOLD;
use crate::error::{CaveError, Result};

/// Noise frequency per bitmap pixel
const PERLIN_SCALE: f64 = 0.11;

/// Half-width of the open band around each noise zero contour
const CORRIDOR_BAND: f64 = 0.16;

/// 8-bit luma image, row-major
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceBitmap {
    width: usize,
    height: usize,
    pixels: Vec<u8>,
}

impl ReferenceBitmap {
    pub fn from_luma(width: usize, height: usize, pixels: Vec<u8>) -> Result<Self> {
        if width == 0 || height == 0 || pixels.len() != width * height {
            return Err(CaveError::InvalidConfig(format!(
                "reference bitmap {}x{} does not match {} pixels",
                width,
                height,
                pixels.len()
            )));
        }
        Ok(Self { width, height, pixels })
    }

    pub fn perlin(width: usize, height: usize, seed: u32) -> Self {
        let (width, height) = (width.max(1), height.max(1));
        let perlin = Perlin::new(seed);
        let mut pixels = Vec::with_capacity(width * height);
        for y in 0..height {
            for x in 0..width {
                let value = perlin.get([x as f64 * PERLIN_SCALE, y as f64 * PERLIN_SCALE]);
                let t = (value.abs() / CORRIDOR_BAND).min(1.0);
                pixels.push((t * 255.0).round() as u8);
            }
        }
        Self { width, height, pixels }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Pixel at wrapped coordinates
    pub fn sample(&self, x: usize, y: usize) -> u8 {
        self.pixels[(y % self.height) * self.width + (x % self.width)]
    }
}

/// Where a [`WangStrategy`] gets its bitmap
#[derive(Debug, Clone, PartialEq)]
pub enum BitmapSource {
    /// One bitmap shared by every carve
    Baked(ReferenceBitmap),
    /// Fresh Perlin bitmap per carve, seeded from the level RNG
    Perlin { width: usize, height: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WangStrategy {
    pub source: BitmapSource,
    /// Pixels strictly below this are open
    pub threshold: u8,
}

impl WangStrategy {
    pub fn new(bitmap: ReferenceBitmap) -> Self {
        Self {
            source: BitmapSource::Baked(bitmap),
            threshold: WANG_OPEN_THRESHOLD,
        }
    }

    /// Fixed Perlin bitmap from an explicit noise seed
    pub fn perlin(width: usize, height: usize, seed: u32, threshold: u8) -> Self {
        Self {
            source: BitmapSource::Baked(ReferenceBitmap::perlin(width, height, seed)),
            threshold,
        }
    }

    /// New Perlin bitmap for every level
    pub fn reseeded(width: usize, height: usize, threshold: u8) -> Self {
        Self {
            source: BitmapSource::Perlin { width, height },
            threshold,
        }
    }
}

impl GenerationStrategy for WangStrategy {
    fn name(&self) -> &'static str {
        "wang"
    }

    fn carve(&self, width: usize, height: usize, rng: &mut dyn RngCore) -> OccupancyGrid {
        let fresh;
        let bitmap = match &self.source {
            BitmapSource::Baked(bitmap) => bitmap,
            BitmapSource::Perlin { width: bw, height: bh } => {
                fresh = ReferenceBitmap::perlin(*bw, *bh, rng.next_u32());
                &fresh
            }
        };

        let ox = if bitmap.width() > width {
            rng.gen_range(0..=bitmap.width() - width)
        } else {
            0
        };
        let oy = if bitmap.height() > height {
            rng.gen_range(0..=bitmap.height() - height)
        } else {
            0
        };

        let mut grid = OccupancyGrid::new(width, height, TileState::Wall);
        for y in 0..height {
            for x in 0..width {
                if bitmap.sample(ox + x, oy + y) < self.threshold {
                    grid.set(x, y, TileState::Empty);
                }
            }
        }
        grid.fill_border();
        debug!(ox, oy, open = grid.open_count(), "wang window sampled");
        grid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    #[test]
    fn test_threshold_marks_dark_pixels_open() {
        #[rustfmt::skip]
        let pixels = vec![
            255, 255, 255, 255,
            255,   0, 253, 255,
            255, 254, 100, 255,
            255, 255, 255, 255,
        ];
        let strategy = WangStrategy::new(ReferenceBitmap::from_luma(4, 4, pixels).unwrap());
        let grid = strategy.carve(4, 4, &mut Xoshiro256PlusPlus::seed_from_u64(0));
        assert!(grid.is_open(1, 1));
        assert!(grid.is_open(2, 1));
        assert!(grid.is_solid(1, 2));
        assert!(grid.is_open(2, 2));
    }

    #[test]
    fn test_border_is_forced_solid() {
        let bitmap = ReferenceBitmap::from_luma(3, 3, vec![0; 9]).unwrap();
        let grid = WangStrategy::new(bitmap).carve(3, 3, &mut Xoshiro256PlusPlus::seed_from_u64(0));
        assert_eq!(grid.open_cells(), vec![(1, 1)]);
    }

    #[test]
    fn test_rejects_mismatched_pixels() {
        assert!(ReferenceBitmap::from_luma(4, 4, vec![0; 3]).is_err());
    }

    #[test]
    fn test_reseeded_levels_differ() {
        let strategy = WangStrategy::reseeded(96, 64, WANG_OPEN_THRESHOLD);
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(3);
        let first = strategy.carve(48, 32, &mut rng);
        let second = strategy.carve(48, 32, &mut rng);
        assert_ne!(first, second);

        let again = strategy.carve(48, 32, &mut Xoshiro256PlusPlus::seed_from_u64(3));
        assert_eq!(again, first);
    }

    #[test]
    fn test_perlin_bitmap_has_corridors() {
        let strategy = WangStrategy::perlin(96, 64, 9, WANG_OPEN_THRESHOLD);
        let grid = strategy.carve(48, 32, &mut Xoshiro256PlusPlus::seed_from_u64(1));
        let open = grid.open_count();
        assert!(open > 0);
        assert!(open < 48 * 32);
    }
}
