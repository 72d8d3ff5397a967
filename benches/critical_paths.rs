//! Criterion benchmarks for Tilestamp critical paths
//!
//! - Chunker: shredding a template image into per-tile fragments
//! - Reconstruct: recovering pixel counts from stored fragments
//! - Compositor: drawing fragments over a live tile

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use image::{Rgba, RgbaImage};
use tilestamp::chunker::chunk_image;
use tilestamp::compositor::composite_tile;
use tilestamp::models::{Coords, Template, TileGrid};
use tilestamp::reconstruct::reconstruct_pixel_count;

// =============================================================================
// Test Data Generators
// =============================================================================

/// Checkerboard of opaque and transparent pixels.
fn make_template_image(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        if (x + y) % 2 == 0 {
            Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
        } else {
            Rgba([0, 0, 0, 0])
        }
    })
}

fn make_template(sort_id: u32, size: u32, coords: Coords, grid: &TileGrid) -> Template {
    let chunked = chunk_image(&make_template_image(size, size), coords, grid);
    Template {
        display_name: format!("bench_{}", sort_id),
        sort_id,
        author_id: "!".to_string(),
        coords,
        enabled: true,
        chunked: chunked.tiles,
        pixel_count: chunked.total_pixel_count,
    }
}

// =============================================================================
// Chunker Benchmarks
// =============================================================================

fn bench_chunker(c: &mut Criterion) {
    let mut group = c.benchmark_group("chunker");
    let grid = TileGrid::default();

    for size in [32, 128, 512].iter() {
        let image = make_template_image(*size, *size);
        group.throughput(Throughput::Elements((*size * *size) as u64));
        group.bench_with_input(BenchmarkId::new("single_tile", format!("{}x{}", size, size)), &image, |b, image| {
            b.iter(|| chunk_image(black_box(image), Coords::new(1, 1, 100, 100), &grid))
        });
    }

    // Straddles four tiles
    let image = make_template_image(128, 128);
    group.bench_function("four_tiles_128x128", |b| {
        b.iter(|| chunk_image(black_box(&image), Coords::new(1, 1, 950, 950), &grid))
    });

    group.finish();
}

// =============================================================================
// Reconstruction Benchmarks
// =============================================================================

fn bench_reconstruct(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconstruct");
    let grid = TileGrid::default();

    for size in [32, 128, 512].iter() {
        let chunked = chunk_image(&make_template_image(*size, *size), Coords::new(0, 0, 900, 900), &grid);
        group.throughput(Throughput::Elements((*size * *size) as u64));
        group.bench_with_input(
            BenchmarkId::new("pixel_count", format!("{}x{}", size, size)),
            &chunked.tiles,
            |b, tiles| b.iter(|| reconstruct_pixel_count(black_box(tiles), &grid)),
        );
    }

    group.finish();
}

// =============================================================================
// Compositor Benchmarks
// =============================================================================

fn bench_compositor(c: &mut Criterion) {
    let mut group = c.benchmark_group("compositor");
    let grid = TileGrid::default();
    let live = RgbaImage::from_pixel(grid.tile_size, grid.tile_size, Rgba([200, 200, 200, 255]));

    for count in [1, 5, 20].iter() {
        let templates: Vec<Template> =
            (0..*count).map(|i| make_template(i, 64, Coords::new(2, 3, i * 40, i * 40), &grid)).collect();
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("templates", count), &templates, |b, templates| {
            b.iter(|| composite_tile(black_box(templates), black_box(&live), (2, 3), &grid))
        });
    }

    // Nothing on this tile: upscale only
    let far = vec![make_template(0, 64, Coords::new(100, 100, 0, 0), &grid)];
    group.bench_function("no_fragments", |b| b.iter(|| composite_tile(black_box(&far), black_box(&live), (2, 3), &grid)));

    group.finish();
}

// =============================================================================
// Criterion Configuration
// =============================================================================

criterion_group!(benches, bench_chunker, bench_reconstruct, bench_compositor);

criterion_main!(benches);
