//! Recovering logical pixels from shredded fragments
//!
//! Only the center cell of each `M x M` block carries data, so sampling
//! center cells (indices congruent to `center` mod `M` on both axes) yields
//! the exact set of logical pixels the chunker wrote.

use image::{Rgba, RgbaImage};
use std::collections::BTreeMap;
use thiserror::Error;

use crate::chunker::{is_erase_marker_cell, ERASE_MARKER};
use crate::models::{Coords, FragmentKey, TileGrid};

/// A fragment that cannot have come from the chunker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconstructError {
    #[error("Fragment {key} is {width}x{height}, not a multiple of the draw multiplier {multiplier}")]
    NotShredded { key: FragmentKey, width: u32, height: u32, multiplier: u32 },
    #[error("Fragment {key} extends past the edge of its tile")]
    OutsideTile { key: FragmentKey },
    #[error("Fragment {key} has pixels above or left of the template anchor {anchor}")]
    OutsideAnchor { key: FragmentKey, anchor: Coords },
}

/// Check a fragment's shape and return its size in logical pixels.
fn logical_size(key: &FragmentKey, bitmap: &RgbaImage, grid: &TileGrid) -> Result<(u32, u32), ReconstructError> {
    let m = grid.draw_multiplier;
    let (width, height) = bitmap.dimensions();
    if width % m != 0 || height % m != 0 {
        return Err(ReconstructError::NotShredded { key: *key, width, height, multiplier: m });
    }
    let (w, h) = (width / m, height / m);
    if key.pixel_x + w > grid.tile_size || key.pixel_y + h > grid.tile_size {
        return Err(ReconstructError::OutsideTile { key: *key });
    }
    Ok((w, h))
}

/// Visit every visible center cell as (logical x, logical y, pixel).
fn for_each_center_cell<F>(bitmap: &RgbaImage, logical: (u32, u32), grid: &TileGrid, mut visit: F)
where
    F: FnMut(u32, u32, &Rgba<u8>),
{
    let m = grid.draw_multiplier;
    let center = grid.center();
    for ly in 0..logical.1 {
        for lx in 0..logical.0 {
            let pixel = bitmap.get_pixel(lx * m + center, ly * m + center);
            if pixel[3] > 0 {
                visit(lx, ly, pixel);
            }
        }
    }
}

/// Count the logical pixels stored in a template's fragments.
///
/// Equals the chunker's `total_pixel_count` for fragments it produced.
pub fn reconstruct_pixel_count(
    fragments: &BTreeMap<FragmentKey, RgbaImage>,
    grid: &TileGrid,
) -> Result<u64, ReconstructError> {
    let mut total = 0u64;
    for (key, bitmap) in fragments {
        let logical = logical_size(key, bitmap, grid)?;
        for_each_center_cell(bitmap, logical, grid, |_, _, _| total += 1);
    }
    Ok(total)
}

/// Rebuild the unshredded template image, anchored at `anchor`.
///
/// The result is as wide and tall as the furthest visible pixel, so trailing
/// fully transparent rows and columns of the original are not recovered.
/// Erase marker checker cells are turned back into opaque `#DEFACE`; real
/// pixels close to the checker colors keep the alpha the chunker gave them.
pub fn reassemble(
    fragments: &BTreeMap<FragmentKey, RgbaImage>,
    anchor: Coords,
    grid: &TileGrid,
) -> Result<RgbaImage, ReconstructError> {
    let (origin_x, origin_y) = anchor.global_origin(grid);
    let mut pixels: Vec<(u64, u64, Rgba<u8>)> = Vec::new();

    for (key, bitmap) in fragments {
        let logical = logical_size(key, bitmap, grid)?;
        let base_x = grid.join(key.tile_x, key.pixel_x);
        let base_y = grid.join(key.tile_y, key.pixel_y);
        if base_x < origin_x || base_y < origin_y {
            return Err(ReconstructError::OutsideAnchor { key: *key, anchor });
        }
        for_each_center_cell(bitmap, logical, grid, |lx, ly, pixel| {
            let gx = base_x + lx as u64;
            let gy = base_y + ly as u64;
            let restored = if is_erase_marker_cell(pixel) {
                Rgba([ERASE_MARKER[0], ERASE_MARKER[1], ERASE_MARKER[2], 255])
            } else {
                *pixel
            };
            pixels.push((gx - origin_x, gy - origin_y, restored));
        });
    }

    let width = pixels.iter().map(|(x, _, _)| x + 1).max().unwrap_or(0) as u32;
    let height = pixels.iter().map(|(_, y, _)| y + 1).max().unwrap_or(0) as u32;
    let mut image = RgbaImage::new(width, height);
    for (x, y, pixel) in pixels {
        image.put_pixel(x as u32, y as u32, pixel);
    }
    Ok(image)
}
