//! Visual tile selection from 8-neighbour occupancy.
//!
//! Purely cosmetic: collision never looks at a tile's kind. Every kind is
//! drawn from one canonical orientation and rotated clockwise into place.

use serde::{Deserialize, Serialize};

use super::OccupancyGrid;

/// Solid neighbours of a tile, one bit per direction clockwise from north
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NeighborMask(pub u8);

impl NeighborMask {
    pub const N: u8 = 1;
    pub const NE: u8 = 1 << 1;
    pub const E: u8 = 1 << 2;
    pub const SE: u8 = 1 << 3;
    pub const S: u8 = 1 << 4;
    pub const SW: u8 = 1 << 5;
    pub const W: u8 = 1 << 6;
    pub const NW: u8 = 1 << 7;

    /// Offsets in bit order, screen space (y down)
    pub const OFFSETS: [(i32, i32); 8] = [(0, -1), (1, -1), (1, 0), (1, 1), (0, 1), (-1, 1), (-1, 0), (-1, -1)];

    const CARDINALS: u8 = Self::N | Self::E | Self::S | Self::W;
    const DIAGONALS: u8 = Self::NE | Self::SE | Self::SW | Self::NW;

    pub fn from_fn(mut is_solid: impl FnMut(i32, i32) -> bool) -> Self {
        let mut bits = 0;
        for (i, (dx, dy)) in Self::OFFSETS.iter().enumerate() {
            if is_solid(*dx, *dy) {
                bits |= 1 << i;
            }
        }
        Self(bits)
    }

    pub fn has(&self, bits: u8) -> bool {
        self.0 & bits == bits
    }

    pub fn is_open(&self, bit: u8) -> bool {
        self.0 & bit == 0
    }

    /// Quarter turn clockwise: what was north is now east
    pub fn rotate_cw(self) -> Self {
        Self(self.0.rotate_left(2))
    }

    pub fn rotate_ccw(self) -> Self {
        Self(self.0.rotate_right(2))
    }

    pub fn solid_cardinals(&self) -> u32 {
        (self.0 & Self::CARDINALS).count_ones()
    }

    pub fn open_diagonals(&self) -> u32 {
        (!self.0 & Self::DIAGONALS).count_ones()
    }

    /// Any of the eight neighbours is open
    pub fn is_exposed(&self) -> bool {
        self.0 != u8::MAX
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// No solid cardinal neighbours
    #[default]
    Isolated,
    /// Open on three sides; canonical solid side south
    Cap,
    /// Solid north and south
    Shaft,
    /// Open north and west
    OuterCorner,
    /// Outer corner whose inner diagonal (south-east) is open too
    OuterCornerNotch,
    /// Open north only
    Edge,
    /// Edge with one open lower diagonal (south-east, or south-west when mirrored)
    EdgeNotch,
    EdgeDoubleNotch,
    Interior,
    /// Fully surrounded except north-west
    InnerCorner,
    /// North-west and north-east open
    DoubleInnerCorner,
    /// North-west and south-east open
    DiagonalInnerCorners,
    /// Only south-west solid among the diagonals
    TripleInnerCorner,
    QuadInnerCorner,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileVariant {
    pub kind: TileKind,
    /// Clockwise rotation from the canonical art
    pub rotation_degrees: u16,
    pub mirrored: bool,
}

/// Canonical-orientation match for a mask, if it is already in base pose
fn match_canonical(mask: NeighborMask) -> Option<(TileKind, bool)> {
    use NeighborMask as M;

    match mask.solid_cardinals() {
        0 => Some((TileKind::Isolated, false)),
        1 => mask.has(M::S).then_some((TileKind::Cap, false)),
        2 if mask.has(M::N | M::S) => Some((TileKind::Shaft, false)),
        2 if mask.has(M::E | M::S) => {
            let kind = if mask.is_open(M::SE) {
                TileKind::OuterCornerNotch
            } else {
                TileKind::OuterCorner
            };
            Some((kind, false))
        }
        2 => None,
        3 if mask.is_open(M::N) => match (mask.is_open(M::SE), mask.is_open(M::SW)) {
            (false, false) => Some((TileKind::Edge, false)),
            (true, false) => Some((TileKind::EdgeNotch, false)),
            (false, true) => Some((TileKind::EdgeNotch, true)),
            (true, true) => Some((TileKind::EdgeDoubleNotch, false)),
        },
        3 => None,
        _ => {
            let (nw, ne, se, sw) = (
                mask.is_open(M::NW),
                mask.is_open(M::NE),
                mask.is_open(M::SE),
                mask.is_open(M::SW),
            );
            let kind = match mask.open_diagonals() {
                0 => Some(TileKind::Interior),
                1 => nw.then_some(TileKind::InnerCorner),
                2 if nw && ne => Some(TileKind::DoubleInnerCorner),
                2 if nw && se => Some(TileKind::DiagonalInnerCorners),
                2 => None,
                3 => (!sw).then_some(TileKind::TripleInnerCorner),
                _ => Some(TileKind::QuadInnerCorner),
            };
            kind.map(|kind| (kind, false))
        }
    }
}

/// Classify a solid tile by its neighbours. Pure: the same mask always gives
/// the same variant.
pub fn classify(mask: NeighborMask) -> TileVariant {
    let mut canonical = mask;
    for quarter in 0..4u16 {
        if let Some((kind, mirrored)) = match_canonical(canonical) {
            return TileVariant {
                kind,
                rotation_degrees: quarter * 90,
                mirrored,
            };
        }
        canonical = canonical.rotate_ccw();
    }
    TileVariant::default()
}

/// Textured quad for one visible solid tile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TilePlacement {
    pub grid_x: usize,
    pub grid_y: usize,
    pub variant: TileVariant,
}

/// Placements for every solid tile that borders an open cell
pub fn placements(grid: &OccupancyGrid) -> Vec<TilePlacement> {
    let mut out = Vec::new();
    for y in 0..grid.height() {
        for x in 0..grid.width() {
            if grid.is_open(x as i32, y as i32) {
                continue;
            }
            let mask = grid.neighbor_mask(x, y);
            if mask.is_exposed() {
                out.push(TilePlacement {
                    grid_x: x,
                    grid_y: y,
                    variant: classify(mask),
                });
            }
        }
    }
    out
}
