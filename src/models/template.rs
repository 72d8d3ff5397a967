//! The in-memory template entity

use image::RgbaImage;
use serde::Serialize;
use std::collections::BTreeMap;

use super::{CompositeKey, Coords, FragmentKey};

/// Maximum display name length, in characters, accepted at the edit boundary.
pub const MAX_NAME_LEN: usize = 100;

/// One logical artwork bound to its chunked bitmaps and placement metadata.
#[derive(Debug, Clone)]
pub struct Template {
    /// Human-readable label
    pub display_name: String,
    /// Draw priority; higher values draw on top
    pub sort_id: u32,
    /// Encoded id of the user that created the template
    pub author_id: String,
    /// Placement of the top-left corner
    pub coords: Coords,
    /// Disabled templates are kept but never drawn or counted
    pub enabled: bool,
    /// Shredded bitmaps, one per intersected tile
    pub chunked: BTreeMap<FragmentKey, RgbaImage>,
    /// Exact number of non-transparent logical pixels
    pub pixel_count: u64,
}

impl Template {
    pub fn key(&self) -> CompositeKey {
        CompositeKey::new(self.sort_id, self.author_id.clone())
    }

    pub fn matches_key(&self, key: &CompositeKey) -> bool {
        self.sort_id == key.sort_id && self.author_id == key.author_id
    }

    /// The fragment this template contributes to a tile, if any.
    ///
    /// The chunker never emits two fragments for one tile, so the first match
    /// in key order is the only one.
    pub fn fragment_on_tile(&self, tile_x: u32, tile_y: u32) -> Option<(&FragmentKey, &RgbaImage)> {
        self.chunked.iter().find(|(key, _)| key.is_on_tile(tile_x, tile_y))
    }
}

/// Check a display name before it is stored.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Template name must not be empty".to_string());
    }
    let len = name.chars().count();
    if len > MAX_NAME_LEN {
        return Err(format!("Template name must be at most {} characters, got {}", MAX_NAME_LEN, len));
    }
    Ok(())
}

/// Read-only view of a template returned by listing operations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TemplateSummary {
    pub key: String,
    pub name: String,
    pub coords: [u32; 4],
    pub enabled: bool,
    #[serde(rename = "pixelCount")]
    pub pixel_count: Option<u64>,
}
