//! Template chunking and pixel shredding
//!
//! A template image anchored somewhere on the canvas is cut along the host
//! tile grid. Each logical pixel becomes an `M x M` block in the output
//! bitmap whose center cell carries the exact RGBA and whose other cells are
//! fully transparent. Sampling only center cells later recovers exactly
//! which pixels are real template data.
//!
//! # Erase markers
//!
//! Pixels colored exactly `#DEFACE` mark canvas pixels that should stay
//! empty. Their center cell is drawn as a faint black/white checker (by
//! global pixel parity) so the marker is visible over any background.

use image::{Rgba, RgbaImage};
use rayon::prelude::*;
use std::collections::BTreeMap;

use crate::models::{Coords, FragmentKey, TileGrid};
use crate::output::{decode_image, DecodeError};

/// RGB of the erase marker color.
pub const ERASE_MARKER: [u8; 3] = [0xDE, 0xFA, 0xCE];

/// Alpha of the checker cell written for an erase marker.
pub const ERASE_MARKER_ALPHA: u8 = 32;

/// Output of [`chunk_image`]: one bitmap per tile that received pixels.
#[derive(Debug, Clone, Default)]
pub struct ChunkedTemplate {
    pub tiles: BTreeMap<FragmentKey, RgbaImage>,
    pub total_pixel_count: u64,
}

/// Whether a source pixel is the erase marker color (any non-zero alpha).
pub fn is_erase_marker(pixel: &Rgba<u8>) -> bool {
    pixel[3] > 0 && pixel.0[..3] == ERASE_MARKER
}

/// Checker cell written in place of an erase marker at a global position.
pub fn erase_marker_cell(global_x: u64, global_y: u64) -> Rgba<u8> {
    if (global_x + global_y) % 2 == 0 {
        Rgba([0, 0, 0, ERASE_MARKER_ALPHA])
    } else {
        Rgba([255, 255, 255, ERASE_MARKER_ALPHA])
    }
}

/// Whether a shredded cell is an erase marker checker cell.
///
/// The chunker never writes these colors for real pixels, so the check is exact.
pub fn is_erase_marker_cell(cell: &Rgba<u8>) -> bool {
    cell[3] == ERASE_MARKER_ALPHA && (cell.0[..3] == [0, 0, 0] || cell.0[..3] == [255, 255, 255])
}

/// Cell written for a visible source pixel at a global position.
///
/// Real pixels that would read back as a checker cell get one more step of
/// alpha.
fn shredded_cell(pixel: &Rgba<u8>, global_x: u64, global_y: u64) -> Rgba<u8> {
    if is_erase_marker(pixel) {
        return erase_marker_cell(global_x, global_y);
    }
    let mut cell = *pixel;
    if is_erase_marker_cell(&cell) {
        cell[3] = ERASE_MARKER_ALPHA + 1;
    }
    cell
}

/// Clipped global pixel span of one tile on one axis.
#[derive(Debug, Clone, Copy)]
struct Span {
    tile: u64,
    start: u64,
    end: u64,
}

/// Intersect `[origin, origin + len)` with every tile it touches.
fn spans(origin: u64, len: u32, tile_size: u32) -> Vec<Span> {
    let size = tile_size as u64;
    let end = origin + len as u64;
    let first = origin / size;
    let last = (end - 1) / size;
    (first..=last)
        .map(|tile| Span {
            tile,
            start: origin.max(tile * size),
            end: end.min((tile + 1) * size),
        })
        .collect()
}

/// Shred the part of `image` that falls inside one tile.
///
/// Returns `None` when no pixel in the span is visible.
fn shred_tile(
    image: &RgbaImage,
    origin: (u64, u64),
    sx: Span,
    sy: Span,
    grid: &TileGrid,
) -> Option<(FragmentKey, RgbaImage, u64)> {
    let m = grid.draw_multiplier;
    let center = grid.center();
    let width = (sx.end - sx.start) as u32;
    let height = (sy.end - sy.start) as u32;

    let mut bitmap = RgbaImage::new(width * m, height * m);
    let mut count = 0u64;

    for gy in sy.start..sy.end {
        for gx in sx.start..sx.end {
            let pixel = image.get_pixel((gx - origin.0) as u32, (gy - origin.1) as u32);
            if pixel[3] == 0 {
                continue;
            }
            let cell = shredded_cell(pixel, gx, gy);
            let local_x = (gx - sx.start) as u32;
            let local_y = (gy - sy.start) as u32;
            bitmap.put_pixel(local_x * m + center, local_y * m + center, cell);
            count += 1;
        }
    }

    if count == 0 {
        return None;
    }

    let (tile_x, pixel_x) = grid.split(sx.start);
    let (tile_y, pixel_y) = grid.split(sy.start);
    let key = FragmentKey::new(tile_x as u32, tile_y as u32, pixel_x, pixel_y);
    Some((key, bitmap, count))
}

/// Cut an image anchored at `anchor` into shredded, tile-aligned fragments.
///
/// Fully transparent regions produce no fragments at all.
///
/// # Examples
///
/// ```
/// use image::{Rgba, RgbaImage};
/// use tilestamp::chunker::chunk_image;
/// use tilestamp::models::{Coords, TileGrid};
///
/// let image = RgbaImage::from_pixel(2, 2, Rgba([255, 0, 0, 255]));
/// let grid = TileGrid::new(1000, 3);
/// let chunked = chunk_image(&image, Coords::new(0, 0, 999, 999), &grid);
///
/// assert_eq!(chunked.tiles.len(), 4);
/// assert_eq!(chunked.total_pixel_count, 4);
/// ```
pub fn chunk_image(image: &RgbaImage, anchor: Coords, grid: &TileGrid) -> ChunkedTemplate {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return ChunkedTemplate::default();
    }

    let origin = anchor.global_origin(grid);
    let x_spans = spans(origin.0, width, grid.tile_size);
    let y_spans = spans(origin.1, height, grid.tile_size);

    let cells: Vec<(Span, Span)> =
        y_spans.iter().flat_map(|&sy| x_spans.iter().map(move |&sx| (sx, sy))).collect();

    let fragments: Vec<(FragmentKey, RgbaImage, u64)> = cells
        .par_iter()
        .filter_map(|&(sx, sy)| shred_tile(image, origin, sx, sy, grid))
        .collect();

    let mut chunked = ChunkedTemplate::default();
    for (key, bitmap, count) in fragments {
        chunked.total_pixel_count += count;
        chunked.tiles.insert(key, bitmap);
    }

    tracing::debug!(
        "Chunked {}x{} template at {} into {} fragments ({} pixels)",
        width,
        height,
        anchor,
        chunked.tiles.len(),
        chunked.total_pixel_count
    );
    chunked
}

/// Decode an image file's bytes and chunk it.
pub fn chunk_bytes(bytes: &[u8], anchor: Coords, grid: &TileGrid) -> Result<ChunkedTemplate, DecodeError> {
    let (image, _) = decode_image(bytes)?;
    Ok(chunk_image(&image, anchor, grid))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconstruct::reconstruct_pixel_count;

    const RED: Rgba<u8> = Rgba([255, 0, 0, 255]);

    #[test]
    fn test_single_pixel_is_centered_in_block() {
        let image = RgbaImage::from_pixel(1, 1, RED);
        let grid = TileGrid::new(10, 3);
        let chunked = chunk_image(&image, Coords::new(0, 0, 2, 4), &grid);

        let (key, bitmap) = chunked.tiles.iter().next().unwrap();
        assert_eq!(*key, FragmentKey::new(0, 0, 2, 4));
        assert_eq!(bitmap.dimensions(), (3, 3));
        assert_eq!(*bitmap.get_pixel(1, 1), RED);
        for (x, y) in [(0, 0), (1, 0), (2, 2), (0, 1)] {
            assert_eq!(bitmap.get_pixel(x, y)[3], 0, "non-center cell ({}, {}) must be empty", x, y);
        }
    }

    #[test]
    fn test_fully_transparent_yields_no_fragments() {
        let image = RgbaImage::new(25, 25);
        let grid = TileGrid::new(10, 3);
        let chunked = chunk_image(&image, Coords::new(0, 0, 5, 5), &grid);
        assert!(chunked.tiles.is_empty());
        assert_eq!(chunked.total_pixel_count, 0);
    }

    #[test]
    fn test_sparse_tiles_are_skipped() {
        // 20x1 strip across two tiles, only the left half is opaque
        let mut image = RgbaImage::new(20, 1);
        for x in 0..10 {
            image.put_pixel(x, 0, RED);
        }
        let grid = TileGrid::new(10, 3);
        let chunked = chunk_image(&image, Coords::new(0, 0, 0, 0), &grid);
        assert_eq!(chunked.tiles.len(), 1);
        assert_eq!(chunked.total_pixel_count, 10);
    }

    #[test]
    fn test_boundary_scenario_four_tiles() {
        let image = RgbaImage::from_pixel(2, 2, RED);
        let grid = TileGrid::new(1000, 3);
        let chunked = chunk_image(&image, Coords::new(0, 0, 999, 999), &grid);

        let keys: Vec<String> = chunked.tiles.keys().map(|k| k.to_string()).collect();
        assert_eq!(keys, vec!["0000,0000,999,999", "0000,0001,999,0", "0001,0000,0,999", "0001,0001,0,0"]);
        assert_eq!(chunked.total_pixel_count, 4);
        for bitmap in chunked.tiles.values() {
            assert_eq!(bitmap.dimensions(), (3, 3));
        }
    }

    #[test]
    fn test_spans_are_clipped_at_tile_edges() {
        let image = RgbaImage::from_pixel(15, 4, RED);
        let grid = TileGrid::new(10, 3);
        let chunked = chunk_image(&image, Coords::new(1, 0, 7, 0), &grid);

        let left = &chunked.tiles[&FragmentKey::new(1, 0, 7, 0)];
        let right = &chunked.tiles[&FragmentKey::new(2, 0, 0, 0)];
        assert_eq!(left.dimensions(), (3 * 3, 4 * 3));
        let tail = &chunked.tiles[&FragmentKey::new(3, 0, 0, 0)];
        assert_eq!(right.dimensions(), (10 * 3, 4 * 3));
        assert_eq!(tail.dimensions(), (2 * 3, 4 * 3));
        assert_eq!(chunked.total_pixel_count, 60);
    }

    #[test]
    fn test_partial_alpha_is_kept_exactly() {
        let pixel = Rgba([1, 2, 3, 77]);
        let image = RgbaImage::from_pixel(1, 1, pixel);
        let chunked = chunk_image(&image, Coords::default(), &TileGrid::new(10, 5));
        let bitmap = chunked.tiles.values().next().unwrap();
        assert_eq!(bitmap.dimensions(), (5, 5));
        assert_eq!(*bitmap.get_pixel(2, 2), pixel);
    }

    #[test]
    fn test_erase_marker_becomes_checker() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, Rgba([0xDE, 0xFA, 0xCE, 255]));
        image.put_pixel(1, 0, Rgba([0xDE, 0xFA, 0xCE, 255]));
        let chunked = chunk_image(&image, Coords::default(), &TileGrid::new(10, 3));
        let bitmap = chunked.tiles.values().next().unwrap();

        assert_eq!(*bitmap.get_pixel(1, 1), Rgba([0, 0, 0, ERASE_MARKER_ALPHA]));
        assert_eq!(*bitmap.get_pixel(4, 1), Rgba([255, 255, 255, ERASE_MARKER_ALPHA]));
        assert_eq!(chunked.total_pixel_count, 2);
    }

    #[test]
    fn test_real_pixel_never_encodes_as_checker() {
        let dark = Rgba([0, 0, 0, ERASE_MARKER_ALPHA]);
        let light = Rgba([255, 255, 255, ERASE_MARKER_ALPHA]);
        let image = RgbaImage::from_fn(2, 1, |x, _| if x == 0 { dark } else { light });
        let chunked = chunk_image(&image, Coords::default(), &TileGrid::new(10, 3));
        let bitmap = chunked.tiles.values().next().unwrap();

        for (x, expected) in [(1, [0u8, 0, 0]), (4, [255u8, 255, 255])] {
            let cell = bitmap.get_pixel(x, 1);
            assert!(!is_erase_marker_cell(cell), "cell {} must not read back as a marker", x);
            assert_eq!(cell.0[..3], expected);
            assert_eq!(cell[3], ERASE_MARKER_ALPHA + 1);
        }
        assert_eq!(chunked.total_pixel_count, 2);
    }

    #[test]
    fn test_reconstructed_count_matches_chunker() {
        let mut image = RgbaImage::new(23, 17);
        for (x, y, p) in image.enumerate_pixels_mut() {
            if (x * 7 + y * 3) % 5 != 0 {
                *p = Rgba([x as u8, y as u8, 9, 200]);
            }
        }
        let grid = TileGrid::new(10, 3);
        let chunked = chunk_image(&image, Coords::new(3, 4, 6, 8), &grid);
        assert_eq!(reconstruct_pixel_count(&chunked.tiles, &grid).unwrap(), chunked.total_pixel_count);
    }

    #[test]
    fn test_chunk_bytes_rejects_garbage() {
        let grid = TileGrid::default();
        assert!(chunk_bytes(b"not an image", Coords::default(), &grid).is_err());
    }
}
