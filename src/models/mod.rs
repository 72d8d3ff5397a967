//! Data models for templates, their keys and placement

mod coords;
mod grid;
mod keys;
mod template;

// Re-export all public types
pub use coords::{Coords, CoordsError};
pub use grid::{TileGrid, DEFAULT_DRAW_MULTIPLIER, DEFAULT_MAX_TILE_INDEX, DEFAULT_TILE_SIZE};
pub use keys::{tile_prefix, CompositeKey, FragmentKey, KeyError};
pub use template::{validate_name, Template, TemplateSummary, MAX_NAME_LEN};
