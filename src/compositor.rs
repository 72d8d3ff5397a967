//! Tile compositing - drawing enabled template fragments over a live tile

use image::imageops::{self, FilterType};
use image::RgbaImage;

use crate::error::Result;
use crate::models::{tile_prefix, Template, TileGrid};
use crate::output::{decode_image, encode_as, scale_image};
use crate::status::{format_count, plural};

/// A composited tile ready to hand back to the caller.
#[derive(Debug, Clone)]
pub struct TileComposite {
    /// Encoded image, same container format as the live tile when possible
    pub bytes: Vec<u8>,
    /// Number of templates that contributed a fragment
    pub templates_drawn: usize,
    /// Pixel count summed over the contributing templates only
    pub pixel_count: u64,
}

impl TileComposite {
    pub fn status(&self) -> String {
        format!(
            "Displaying {}. Total pixels: {}",
            plural(self.templates_drawn, "template"),
            format_count(self.pixel_count)
        )
    }
}

/// Composite decoded images.
///
/// Returns the upscaled surface (`tile_size * M` square), the number of
/// templates drawn and their summed pixel count. Candidates are enabled
/// templates with a fragment on this tile, drawn in ascending `sort_id`
/// order so higher ids end up on top.
pub fn composite_tile(
    templates: &[Template],
    live_tile: &RgbaImage,
    tile: (u32, u32),
    grid: &TileGrid,
) -> (RgbaImage, usize, u64) {
    let (tile_x, tile_y) = tile;
    let m = grid.draw_multiplier;

    let mut candidates: Vec<_> = templates
        .iter()
        .filter(|t| t.enabled)
        .filter_map(|t| t.fragment_on_tile(tile_x, tile_y).map(|(key, bitmap)| (t, key, bitmap)))
        .collect();
    candidates.sort_by_key(|(t, _, _)| t.sort_id);

    let size = grid.surface_size();
    let mut surface = if live_tile.dimensions() == (grid.tile_size, grid.tile_size) {
        scale_image(live_tile, m)
    } else {
        imageops::resize(live_tile, size, size, FilterType::Nearest)
    };

    let mut pixel_count = 0u64;
    for (template, key, bitmap) in &candidates {
        imageops::overlay(&mut surface, *bitmap, (key.pixel_x * m) as i64, (key.pixel_y * m) as i64);
        pixel_count += template.pixel_count;
    }

    tracing::debug!(
        "Tile {}: drew {} over {}x{} live tile",
        tile_prefix(tile_x, tile_y).trim_end_matches(','),
        plural(candidates.len(), "template"),
        live_tile.width(),
        live_tile.height()
    );

    (surface, candidates.len(), pixel_count)
}

/// Decode a live tile, composite every matching template and re-encode it.
pub fn draw_templates_on_tile(
    templates: &[Template],
    tile_bytes: &[u8],
    tile: (u32, u32),
    grid: &TileGrid,
) -> Result<TileComposite> {
    let (live, format) = decode_image(tile_bytes)?;
    let (surface, templates_drawn, pixel_count) = composite_tile(templates, &live, tile, grid);
    let bytes = encode_as(&surface, format)?;
    Ok(TileComposite { bytes, templates_drawn, pixel_count })
}
