use proptest::prelude::*;
use tilesmith_edit::{EditContext, EditSettings, VertexSelection};
use tilesmith_geom::Vec3;
use tilesmith_io::{MapHeader, MemoryTileStore};
use tilesmith_terrain::chunk::outer_index;
use tilesmith_terrain::{
    ALPHA_SIZE, Brush, BrushShape, CHUNK_SIZE, CHUNKS_PER_SIDE, FlattenMode, MAX_TEXTURE_LAYERS,
    TextureName, TileIndex,
};
use tilesmith_world::MapIndex;

const LEFT: TileIndex = TileIndex { x: 20, z: 20 };
const RIGHT: TileIndex = TileIndex { x: 21, z: 20 };
const BELOW: TileIndex = TileIndex { x: 20, z: 21 };

fn three_tiles() -> MapIndex {
    let mut map = MapIndex::new(Box::new(MemoryTileStore::new()), MapHeader::default());
    for idx in [LEFT, RIGHT, BELOW] {
        map.create_tile(idx, 0.0);
    }
    map
}

/// Shared edge vertex pairs, inside each tile and across the two tile
/// seams, whose heights differ in any bit.
fn seam_mismatches(map: &MapIndex) -> usize {
    let left = map.tile(LEFT).unwrap();
    let right = map.tile(RIGHT).unwrap();
    let below = map.tile(BELOW).unwrap();
    let last = CHUNKS_PER_SIDE - 1;
    let mut bad = 0;
    let mut check = |a: f32, b: f32| bad += (a.to_bits() != b.to_bits()) as usize;
    for i in 0..CHUNKS_PER_SIDE {
        for k in 0..9 {
            check(
                left.chunk(last, i).height(outer_index(k, 8)),
                right.chunk(0, i).height(outer_index(k, 0)),
            );
            check(
                left.chunk(i, last).height(outer_index(8, k)),
                below.chunk(i, 0).height(outer_index(0, k)),
            );
        }
    }
    for tile in [left, right, below] {
        for a in 0..CHUNKS_PER_SIDE {
            for b in 1..CHUNKS_PER_SIDE {
                for k in 0..9 {
                    check(
                        tile.chunk(b - 1, a).height(outer_index(k, 8)),
                        tile.chunk(b, a).height(outer_index(k, 0)),
                    );
                    check(
                        tile.chunk(a, b - 1).height(outer_index(8, k)),
                        tile.chunk(a, b).height(outer_index(0, k)),
                    );
                }
            }
        }
    }
    bad
}

/// A dab around the corner where the three tiles meet.
fn corner_dab() -> impl Strategy<Value = (Vec3, Brush)> {
    (
        -3.0f32..3.0,
        -3.0f32..3.0,
        0.2f32..2.5,
        0.0f32..0.9,
        prop::sample::select(BrushShape::ALL.to_vec()),
    )
        .prop_map(|(dx, dz, r, inner, shape)| {
            let pos = Vec3::new(RIGHT.xbase() + dx * CHUNK_SIZE, 0.0, BELOW.zbase() + dz * CHUNK_SIZE);
            (pos, Brush::new(shape, r * CHUNK_SIZE, inner))
        })
}

#[derive(Clone, Copy, Debug)]
enum HeightEdit {
    Raise(f32),
    Flatten { remain: f32, target: f32, angle: f32, orientation: f32 },
    Blur(f32),
    MoveSelected(f32),
}

fn height_edit() -> impl Strategy<Value = HeightEdit> {
    prop_oneof![
        (-30.0f32..30.0).prop_map(HeightEdit::Raise),
        (0.0f32..1.0, -20.0f32..20.0, 0.0f32..40.0, 0.0f32..360.0).prop_map(
            |(remain, target, angle, orientation)| HeightEdit::Flatten { remain, target, angle, orientation }
        ),
        (0.0f32..1.0).prop_map(HeightEdit::Blur),
        (-15.0f32..15.0).prop_map(HeightEdit::MoveSelected),
    ]
}

fn seam_point() -> impl Strategy<Value = (f32, f32, f32, f32)> {
    (
        -2.0f32..2.0,
        0.0f32..CHUNKS_PER_SIDE as f32,
        0.3f32..3.0,
        -20.0f32..20.0,
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn stitched_seams_match_bit_for_bit(dabs in prop::collection::vec(seam_point(), 1..8)) {
        let mut map = three_tiles();
        let settings = EditSettings::default();
        let mut ctx = EditContext::new(&mut map, &settings);
        for &(dx, dz, r, delta) in &dabs {
            let pos = Vec3::new(RIGHT.xbase() + dx * CHUNK_SIZE, 0.0, RIGHT.zbase() + dz * CHUNK_SIZE);
            let brush = Brush::new(BrushShape::Smooth, r * CHUNK_SIZE, 0.0);
            ctx.change_terrain(pos, delta, &brush);
            let below = Vec3::new(LEFT.xbase() + dz * CHUNK_SIZE, 0.0, BELOW.zbase() + dx * CHUNK_SIZE);
            ctx.change_terrain(below, -delta, &brush);
        }
        ctx.fix_all_gaps();

        let left = map.tile(LEFT).unwrap();
        let right = map.tile(RIGHT).unwrap();
        let below = map.tile(BELOW).unwrap();
        for i in 0..CHUNKS_PER_SIDE {
            let l = left.chunk(CHUNKS_PER_SIDE - 1, i);
            let r = right.chunk(0, i);
            let a = left.chunk(i, CHUNKS_PER_SIDE - 1);
            let b = below.chunk(i, 0);
            for k in 0..9 {
                prop_assert_eq!(l.height(outer_index(k, 8)).to_bits(), r.height(outer_index(k, 0)).to_bits());
                prop_assert_eq!(a.height(outer_index(8, k)).to_bits(), b.height(outer_index(0, k)).to_bits());
            }
        }
        for tile in [left, right, below] {
            for cz in 0..CHUNKS_PER_SIDE {
                for cx in 1..CHUNKS_PER_SIDE {
                    let l = tile.chunk(cx - 1, cz);
                    let r = tile.chunk(cx, cz);
                    for k in 0..9 {
                        prop_assert_eq!(l.height(outer_index(k, 8)).to_bits(), r.height(outer_index(k, 0)).to_bits());
                    }
                }
            }
        }
    }

    #[test]
    fn shared_vertices_stay_identical_after_every_height_edit(
        edits in prop::collection::vec((corner_dab(), height_edit()), 1..6),
    ) {
        let mut map = three_tiles();
        let settings = EditSettings::default();
        let mut ctx = EditContext::new(&mut map, &settings);
        for ((pos, brush), edit) in edits {
            match edit {
                HeightEdit::Raise(delta) => {
                    ctx.change_terrain(pos, delta, &brush);
                }
                HeightEdit::Flatten { remain, target, angle, orientation } => {
                    let origin = Vec3::new(pos.x, target, pos.z);
                    ctx.flatten_terrain(pos, remain, &brush, FlattenMode::Both, origin, angle, orientation);
                }
                HeightEdit::Blur(remain) => {
                    ctx.change_terrain(pos, 12.0, &brush);
                    ctx.blur_terrain(pos, remain, &brush);
                }
                HeightEdit::MoveSelected(delta) => {
                    let mut sel = VertexSelection::new();
                    ctx.select_vertices(&mut sel, pos, brush.radius);
                    prop_assert!(ctx.move_vertices(&sel, delta).is_ok());
                }
            }
            prop_assert_eq!(seam_mismatches(ctx.index()), 0, "after {:?}", edit);
        }
    }

    #[test]
    fn sprayed_layers_stay_normalized(
        textures in prop::collection::vec(0u8..7, 1..10),
        strength in 0.1f32..=1.0,
    ) {
        let mut map = three_tiles();
        let settings = EditSettings { seed: 7, spray_density: 4.0, ..EditSettings::default() };
        let brush = Brush::new(BrushShape::Polynomial, CHUNK_SIZE * 0.4, 0.2);
        let centre = Vec3::new(LEFT.xbase() + CHUNK_SIZE * 3.5, 0.0, LEFT.zbase() + CHUNK_SIZE * 3.5);
        let mut ctx = EditContext::new(&mut map, &settings);
        for t in &textures {
            let name = TextureName::new(&format!("tileset/spray/t{t}.blp"));
            ctx.spray_texture(centre, &brush, strength, 1.0, &name);
        }

        let tile = map.tile(LEFT).unwrap();
        for chunk in tile.chunks() {
            prop_assert!(chunk.textures.len() <= MAX_TEXTURE_LAYERS);
            for y in (0..ALPHA_SIZE).step_by(9) {
                for x in (0..ALPHA_SIZE).step_by(9) {
                    prop_assert!(chunk.textures.non_base_sum(x, y) <= 255);
                }
            }
        }
    }
}
