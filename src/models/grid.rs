//! Host canvas tile grid parameters

use serde::{Deserialize, Serialize};

/// Default side length of a host canvas tile, in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 1000;

/// Default scale factor used when shredding and compositing.
pub const DEFAULT_DRAW_MULTIPLIER: u32 = 3;

/// Highest valid tile index on either axis.
pub const DEFAULT_MAX_TILE_INDEX: u32 = 2047;

/// Geometry shared by the chunker, the compositor and coordinate validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileGrid {
    /// Side length of a tile in canvas pixels
    #[serde(default = "default_tile_size")]
    pub tile_size: u32,
    /// Odd scale factor; each logical pixel becomes an M x M block
    #[serde(default = "default_draw_multiplier")]
    pub draw_multiplier: u32,
    /// Inclusive upper bound for tile indices
    #[serde(default = "default_max_tile_index")]
    pub max_tile_index: u32,
}

fn default_tile_size() -> u32 {
    DEFAULT_TILE_SIZE
}

fn default_draw_multiplier() -> u32 {
    DEFAULT_DRAW_MULTIPLIER
}

fn default_max_tile_index() -> u32 {
    DEFAULT_MAX_TILE_INDEX
}

impl Default for TileGrid {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            draw_multiplier: DEFAULT_DRAW_MULTIPLIER,
            max_tile_index: DEFAULT_MAX_TILE_INDEX,
        }
    }
}

impl TileGrid {
    /// Grid with a custom tile size and multiplier and the default index bound.
    pub fn new(tile_size: u32, draw_multiplier: u32) -> Self {
        Self { tile_size, draw_multiplier, ..Self::default() }
    }

    /// Offset of the data-carrying cell inside an M x M block.
    pub fn center(&self) -> u32 {
        (self.draw_multiplier - 1) / 2
    }

    /// Side length of a composited tile surface.
    pub fn surface_size(&self) -> u32 {
        self.tile_size * self.draw_multiplier
    }

    /// Split a global pixel coordinate into (tile index, intra-tile offset).
    pub fn split(&self, global: u64) -> (u64, u32) {
        let size = self.tile_size as u64;
        (global / size, (global % size) as u32)
    }

    /// Join a tile index and intra-tile offset into a global pixel coordinate.
    pub fn join(&self, tile: u32, offset: u32) -> u64 {
        tile as u64 * self.tile_size as u64 + offset as u64
    }
}
