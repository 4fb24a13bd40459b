use std::hint::black_box;
use std::time::Duration;

use criterion::{Criterion, criterion_group, criterion_main};

use tilesmith_edit::{EditContext, EditSettings};
use tilesmith_geom::Vec3;
use tilesmith_io::{MapHeader, MemoryTileStore};
use tilesmith_terrain::{Brush, BrushShape, CHUNK_SIZE, TILE_SIZE, TextureName, TileIndex};
use tilesmith_world::MapIndex;

fn two_tiles() -> (MapIndex, Vec3) {
    let mut map = MapIndex::new(Box::new(MemoryTileStore::new()), MapHeader::default());
    let left = TileIndex::new(31, 31);
    let right = TileIndex::new(32, 31);
    map.create_tile(left, 0.0);
    map.create_tile(right, 0.0);
    let seam = Vec3::new(right.xbase(), 0.0, right.zbase() + TILE_SIZE / 2.0);
    (map, seam)
}

fn bench_change_terrain(c: &mut Criterion) {
    let mut group = c.benchmark_group("change_terrain");
    let settings = EditSettings::default();
    for chunks in [1.0f32, 4.0] {
        let brush = Brush::new(BrushShape::Smooth, chunks * CHUNK_SIZE, 0.25);
        group.bench_function(format!("seam_radius_{chunks}_chunks"), |b| {
            let (mut map, seam) = two_tiles();
            let mut ctx = EditContext::new(&mut map, &settings);
            b.iter(|| black_box(ctx.change_terrain(seam, 0.5, &brush)))
        });
    }
    group.finish();
}

fn bench_blur(c: &mut Criterion) {
    let mut group = c.benchmark_group("blur_terrain");
    group.measurement_time(Duration::from_secs(8));
    let settings = EditSettings::default();
    let (mut map, seam) = two_tiles();
    {
        let mut ctx = EditContext::new(&mut map, &settings);
        let spike = Brush::new(BrushShape::Linear, CHUNK_SIZE, 0.0);
        ctx.change_terrain(seam, 40.0, &spike);
    }
    let brush = Brush::new(BrushShape::Smooth, 2.0 * CHUNK_SIZE, 0.0);
    group.bench_function("seam_radius_2_chunks", |b| {
        let mut ctx = EditContext::new(&mut map, &settings);
        b.iter(|| black_box(ctx.blur_terrain(seam, 0.0, &brush)))
    });
    group.finish();
}

fn bench_paint(c: &mut Criterion) {
    let mut group = c.benchmark_group("paint_texture");
    let settings = EditSettings::default();
    let names: Vec<TextureName> = (0..3)
        .map(|i| TextureName::new(&format!("tileset/bench/t{i}.blp")))
        .collect();
    let brush = Brush::new(BrushShape::Polynomial, 1.5 * CHUNK_SIZE, 0.0);
    group.bench_function("three_textures_radius_1_5_chunks", |b| {
        let (mut map, seam) = two_tiles();
        let mut ctx = EditContext::new(&mut map, &settings);
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 1) % names.len();
            black_box(ctx.paint_texture(seam, &brush, 0.5, 0.5, &names[i]))
        })
    });
    group.finish();
}

criterion_group!(benches, bench_change_terrain, bench_blur, bench_paint);
criterion_main!(benches);
