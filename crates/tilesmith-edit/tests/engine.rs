use tilesmith_edit::{EditContext, EditError, EditSettings, VertexSelection};
use tilesmith_geom::Vec3;
use tilesmith_io::{MapHeader, MemoryTileStore, TileStore};
use tilesmith_terrain::chunk::outer_index;
use tilesmith_terrain::{
    Brush, BrushShape, CHUNK_SIZE, CHUNKS_PER_SIDE, ChunkKey, FlattenMode, MAP_VERTICES,
    PaintOutcome, TILE_SIZE, TextureName, Tile, TileIndex, UNIT_SIZE,
};
use tilesmith_world::{MapIndex, UnloadPolicy};

fn map_with(tiles: &[(TileIndex, f32)]) -> MapIndex {
    let mut map = MapIndex::new(Box::new(MemoryTileStore::new()), MapHeader::default());
    for &(idx, h) in tiles {
        assert!(map.create_tile(idx, h));
    }
    map
}

fn chunk_centre(key: ChunkKey) -> Vec3 {
    Vec3::new(
        key.xbase() + CHUNK_SIZE / 2.0,
        0.0,
        key.zbase() + CHUNK_SIZE / 2.0,
    )
}

fn heights(map: &MapIndex, idx: TileIndex) -> Vec<f32> {
    map.tile(idx)
        .unwrap()
        .chunks()
        .flat_map(|c| c.heights().iter().copied())
        .collect()
}

#[test]
fn raise_peaks_at_the_centre_and_fades_to_the_rim() {
    let idx = TileIndex::new(10, 10);
    let mut map = map_with(&[(idx, 0.0)]);
    let settings = EditSettings::default();
    let key = ChunkKey::new(idx, 7, 7);
    let centre = chunk_centre(key);
    let radius = CHUNK_SIZE * core::f32::consts::FRAC_1_SQRT_2;
    let brush = Brush::new(BrushShape::Linear, radius, 0.0);

    let mut ctx = EditContext::new(&mut map, &settings);
    assert!(ctx.change_terrain(centre, 5.0, &brush));

    let chunk = map.chunk(key).unwrap();
    let mid = chunk.height(outer_index(4, 4));
    assert!((mid - 5.0).abs() < 1e-5);
    for corner in [outer_index(0, 0), outer_index(0, 8), outer_index(8, 0), outer_index(8, 8)] {
        assert!(chunk.height(corner).abs() < 1e-3);
    }
    for i in 0..MAP_VERTICES {
        let h = chunk.height(i);
        assert!((0.0..=5.0 + 1e-5).contains(&h));
        let (x, z) = chunk.vertex_xz(i);
        let d = ((x - centre.x).powi(2) + (z - centre.z).powi(2)).sqrt();
        assert!((h - 5.0 * (1.0 - d / radius).max(0.0)).abs() < 1e-3);
    }
    assert!(map.is_changed(idx));
    let n = map.chunk(key).unwrap().normals()[outer_index(4, 2)];
    assert!(n.x.abs() > 1e-3, "normals follow the slope");
}

#[test]
fn brush_outside_the_map_or_of_zero_size_is_a_noop() {
    let idx = TileIndex::new(0, 0);
    let mut map = map_with(&[(idx, 0.0)]);
    assert!(map.save_changed().is_ok());
    let settings = EditSettings::default();
    let mut ctx = EditContext::new(&mut map, &settings);
    let brush = Brush::new(BrushShape::Flat, 50.0, 0.0);
    assert!(!ctx.change_terrain(Vec3::new(-500.0, 0.0, -500.0), 3.0, &brush));
    let none = Brush::new(BrushShape::Flat, 0.0, 0.0);
    assert!(!ctx.change_terrain(Vec3::new(100.0, 0.0, 100.0), 3.0, &none));
    assert!(!ctx.is_under_map(Vec3::new(-1.0, -100.0, 0.0)));
    assert!(ctx.is_under_map(Vec3::new(10.0, -1.0, 10.0)));
    assert!(!map.is_changed(idx));
}

#[test]
fn selecting_then_moving_changes_exactly_the_selection() {
    let a = TileIndex::new(4, 4);
    let b = TileIndex::new(5, 4);
    let mut map = map_with(&[(a, 0.0), (b, 0.0)]);
    let settings = EditSettings::default();
    let pos = Vec3::new(b.xbase() + UNIT_SIZE * 0.3, 0.0, b.zbase() + CHUNK_SIZE * 3.0);
    let before_a = heights(&map, a);
    let before_b = heights(&map, b);

    let mut sel = VertexSelection::new();
    let mut ctx = EditContext::new(&mut map, &settings);
    assert!(ctx.select_vertices(&mut sel, pos, UNIT_SIZE * 2.5));
    assert!(ctx.move_vertices(&sel, 2.0).unwrap());
    let centre = ctx.vertex_center(&sel).unwrap().unwrap();
    assert!((centre.y - 2.0).abs() < 1e-5);

    for (idx, before) in [(a, before_a), (b, before_b)] {
        let tile = map.tile(idx).unwrap();
        for chunk in tile.chunks() {
            let key = tile.key(chunk);
            for i in 0..MAP_VERTICES {
                let old = before[(chunk.cz * CHUNKS_PER_SIDE + chunk.cx) * MAP_VERTICES + i];
                let expected = if sel.contains(key, i) { old + 2.0 } else { old };
                assert_eq!(chunk.height(i), expected);
            }
        }
    }
    assert!(sel.handles().iter().any(|h| h.chunk.tile == a));
    assert!(map.is_changed(a) && map.is_changed(b));
}

#[test]
fn handles_go_stale_when_their_tile_is_reloaded() {
    let idx = TileIndex::new(8, 8);
    let mut map = map_with(&[(idx, 1.0)]);
    let settings = EditSettings::default();
    let pos = chunk_centre(ChunkKey::new(idx, 2, 2));
    let mut sel = VertexSelection::new();
    EditContext::new(&mut map, &settings).select_vertices(&mut sel, pos, UNIT_SIZE);
    assert!(!sel.is_empty());

    assert!(map.save_changed().is_ok());
    assert!(map.unload_tile(idx, UnloadPolicy::KeepChanges));
    map.load_tile(idx).unwrap();

    let mut ctx = EditContext::new(&mut map, &settings);
    assert!(matches!(
        ctx.move_vertices(&sel, 1.0),
        Err(EditError::StaleHandle { .. })
    ));
    assert!(ctx.vertex_center(&sel).is_err());
    assert!(!ctx.index().is_changed(idx));

    assert!(ctx.select_vertices(&mut sel, pos, UNIT_SIZE));
    assert!(ctx.flatten_vertices(&sel, 7.0).unwrap());
    assert!(ctx.deselect_vertices(&mut sel, pos, UNIT_SIZE * 10.0));
    assert!(sel.is_empty());
}

#[test]
fn flatten_and_blur_reach_across_tiles() {
    let a = TileIndex::new(2, 2);
    let b = TileIndex::new(3, 2);
    let mut map = map_with(&[(a, 0.0), (b, 0.0)]);
    let settings = EditSettings::default();
    let seam = Vec3::new(b.xbase(), 0.0, b.zbase() + TILE_SIZE / 2.0);
    let brush = Brush::new(BrushShape::Flat, CHUNK_SIZE, 0.0);
    let mut ctx = EditContext::new(&mut map, &settings);
    let origin = Vec3::new(seam.x, 10.0, seam.z);
    assert!(ctx.flatten_terrain(seam, 0.0, &brush, FlattenMode::Both, origin, 0.0, 0.0));
    assert!(!ctx.flatten_terrain(seam, 0.0, &brush, FlattenMode::LowerOnly, Vec3::new(0.0, 20.0, 0.0), 0.0, 0.0));
    let h_left = ctx.height_at(seam.x - 1.0, seam.z).unwrap();
    let h_right = ctx.height_at(seam.x + 1.0, seam.z).unwrap();
    assert!((h_left - 10.0).abs() < 1e-4 && (h_right - 10.0).abs() < 1e-4);

    let wide = Brush::new(BrushShape::Smooth, CHUNK_SIZE * 2.0, 0.0);
    assert!(ctx.blur_terrain(seam, 0.0, &wide));
    assert!(map.is_changed(a) && map.is_changed(b));
}

#[test]
fn fifth_texture_is_refused_without_side_effects() {
    let idx = TileIndex::new(1, 1);
    let mut map = map_with(&[(idx, 0.0)]);
    let settings = EditSettings::default();
    let key = ChunkKey::new(idx, 6, 6);
    let centre = chunk_centre(key);
    let dab = Brush::new(BrushShape::Flat, UNIT_SIZE * 1.5, 0.0);
    let mut ctx = EditContext::new(&mut map, &settings);
    for (i, name) in ["a.blp", "b.blp", "c.blp", "d.blp"].iter().enumerate() {
        let at = Vec3::new(centre.x + (i as f32 - 1.5) * UNIT_SIZE, 0.0, centre.z);
        let report = ctx.paint_texture(at, &dab, 0.6, 1.0, &TextureName::new(name));
        assert_eq!(report.outcome(), PaintOutcome::Painted, "{name}");
    }
    let snapshot = ctx.index().chunk(key).unwrap().clone();
    let report = ctx.paint_texture(centre, &dab, 0.6, 1.0, &TextureName::new("e.blp"));
    assert_eq!(report.outcome(), PaintOutcome::NoFreeSlot);
    assert_eq!((report.painted, report.refused), (0, 1));
    assert_eq!(map.chunk(key).unwrap(), &snapshot);
    assert_eq!(snapshot.textures.len(), 4);
}

#[test]
fn stroke_across_a_full_chunk_reports_both_sides() {
    let idx = TileIndex::new(1, 1);
    let mut map = map_with(&[(idx, 0.0)]);
    let settings = EditSettings::default();
    let full = ChunkKey::new(idx, 6, 6);
    let open = ChunkKey::new(idx, 7, 6);
    let centre = chunk_centre(full);
    let small = Brush::new(BrushShape::Flat, UNIT_SIZE * 1.5, 0.0);
    let mut ctx = EditContext::new(&mut map, &settings);
    for (i, name) in ["a.blp", "b.blp", "c.blp", "d.blp"].iter().enumerate() {
        let at = Vec3::new(centre.x + (i as f32 - 1.5) * UNIT_SIZE, 0.0, centre.z);
        assert!(ctx.paint_texture(at, &small, 0.6, 1.0, &TextureName::new(name)).changed());
    }
    let seam = Vec3::new(open.xbase(), 0.0, chunk_centre(open).z);
    let dab = Brush::new(BrushShape::Flat, UNIT_SIZE * 3.0, 0.0);
    let report = ctx.paint_texture(seam, &dab, 0.6, 1.0, &TextureName::new("e.blp"));
    assert!(report.is_partial(), "{report:?}");
    assert_eq!(report.refused, 1);
    assert_eq!(report.outcome(), PaintOutcome::Painted);
    assert_eq!(map.chunk(full).unwrap().textures.len(), 4);
    assert!(map.chunk(open).unwrap().textures.position(&TextureName::new("e.blp")).is_some());
}

#[test]
fn tile_wide_texture_operations() {
    let idx = TileIndex::new(6, 3);
    let mut map = map_with(&[(idx, 0.0)]);
    let settings = EditSettings::default();
    let pos = chunk_centre(ChunkKey::new(idx, 0, 0));
    let grass = TextureName::new("grass.blp");
    let rock = TextureName::new("rock.blp");
    let dirt = TextureName::new("dirt.blp");
    let mut ctx = EditContext::new(&mut map, &settings);

    let dab = Brush::new(BrushShape::Flat, UNIT_SIZE * 1.5, 0.0);
    assert!(ctx.paint_texture(pos, &dab, 1.0, 1.0, &dirt).changed());
    assert!(ctx.paint_texture(pos, &dab, 0.5, 1.0, &rock).changed());
    assert!(ctx.set_base_texture(pos, &grass));
    assert!(!ctx.set_base_texture(pos, &grass));
    for chunk in ctx.index().tile(idx).unwrap().chunks() {
        assert_eq!(chunk.textures.len(), 1);
        assert_eq!(chunk.textures.position(&grass), Some(0));
    }
    assert!(ctx.swap_texture(pos, &grass, &rock));
    assert!(ctx.change_texture_flag(pos, &rock, tilesmith_terrain::LayerFlags::ANIMATE, true));
    assert!(ctx.erase_textures(pos));
    assert!(!ctx.erase_textures(pos));
    assert!(ctx.clear_textures(pos));
    assert!(!ctx.remove_texture_duplicates(pos));
    let tile = map.tile(idx).unwrap();
    assert!(tile.chunks().all(|c| c.textures.is_empty()));
}

#[test]
fn spraying_replays_with_the_same_seed() {
    let idx = TileIndex::new(3, 3);
    let run = |seed: u64| {
        let mut map = map_with(&[(idx, 0.0)]);
        let settings = EditSettings {
            seed,
            ..EditSettings::default()
        };
        let pos = chunk_centre(ChunkKey::new(idx, 8, 8));
        let brush = Brush::new(BrushShape::Smooth, UNIT_SIZE * 2.0, 0.0);
        let mut ctx = EditContext::new(&mut map, &settings);
        assert!(ctx.spray_texture(pos, &brush, 1.0, 0.8, &TextureName::new("moss.blp")));
        map.tile(idx).unwrap().clone()
    };
    assert_eq!(run(7), run(7));
    assert_ne!(run(7), run(8));
}

#[test]
fn holes_and_areas() {
    let idx = TileIndex::new(12, 30);
    let mut map = map_with(&[(idx, 0.0)]);
    let settings = EditSettings::default();
    let key = ChunkKey::new(idx, 3, 9);
    let pos = chunk_centre(key);
    let mut ctx = EditContext::new(&mut map, &settings);
    assert!(ctx.set_hole(pos, false, true));
    assert!(!ctx.set_hole(pos, false, true));
    assert!(ctx.set_hole_tile(pos, true));
    assert!(ctx.set_area_id(pos, 1519, false));
    assert_eq!(ctx.area_id_at(pos), Some(1519));
    assert!(ctx.set_area_id(pos, 12, true));
    assert_eq!(ctx.area_id_at(Vec3::new(idx.xbase() + 1.0, 0.0, idx.zbase() + 1.0)), Some(12));
    assert_eq!(ctx.area_id_at(Vec3::new(-1.0, 0.0, 0.0)), None);
    assert!(map.tile(idx).unwrap().chunks().all(|c| c.holes == 0xFFFF));
}

#[test]
fn liquid_operations_mark_the_tile() {
    let idx = TileIndex::new(20, 20);
    let mut map = map_with(&[(idx, 0.0)]);
    let settings = EditSettings::default();
    let pos = chunk_centre(ChunkKey::new(idx, 5, 5));
    let mut ctx = EditContext::new(&mut map, &settings);
    let paint = tilesmith_terrain::LiquidPaint {
        pos: Vec3::new(pos.x, 4.0, pos.z),
        radius: CHUNK_SIZE,
        liquid_id: 2,
        add: true,
        angle: 0.0,
        orientation: 0.0,
        lock: false,
        origin: Vec3::ZERO,
        override_height: false,
        override_liquid_id: false,
        opacity_factor: 0.1,
    };
    assert!(ctx.paint_liquid(&paint));
    assert_eq!(ctx.liquid_type(pos, 0), Some(2));
    assert!(ctx.set_liquid_type(pos, 0, 5));
    assert_eq!(ctx.liquid_type(pos, 0), Some(5));
    ctx.auto_gen_liquid_depth(pos);
    assert!(!ctx.crop_liquid(pos));
    assert!(map.is_changed(idx));
}

#[test]
fn gaps_between_tiles_are_closed_bit_exactly() {
    let a = TileIndex::new(30, 30);
    let b = TileIndex::new(31, 30);
    let c = TileIndex::new(30, 31);
    let mut map = map_with(&[(a, 5.0), (b, 9.0), (c, -3.0)]);
    let settings = EditSettings::default();
    let mut ctx = EditContext::new(&mut map, &settings);
    assert!(ctx.fix_all_gaps());
    assert!(!ctx.fix_all_gaps());

    for cz in 0..CHUNKS_PER_SIDE {
        let left = map.chunk(ChunkKey::new(a, 15, cz)).unwrap().right_edge();
        let right = map.chunk(ChunkKey::new(b, 0, cz)).unwrap();
        for (r, h) in left.iter().enumerate() {
            assert_eq!(right.height(outer_index(r, 0)).to_bits(), h.to_bits());
        }
    }
    for cx in 0..CHUNKS_PER_SIDE {
        let above = map.chunk(ChunkKey::new(a, cx, 15)).unwrap().bottom_edge();
        let below = map.chunk(ChunkKey::new(c, cx, 0)).unwrap();
        for (col, h) in above.iter().enumerate() {
            assert_eq!(below.height(outer_index(0, col)).to_bits(), h.to_bits());
        }
    }
}

#[test]
fn one_raise_near_a_tile_seam_keeps_shared_vertices_identical() {
    let a = TileIndex::new(30, 30);
    let b = TileIndex::new(31, 30);
    for shape in BrushShape::ALL {
        let mut map = map_with(&[(a, 0.0), (b, 0.0)]);
        let settings = EditSettings::default();
        let pos = Vec3::new(b.xbase() - 13.7, 0.0, b.zbase() + CHUNK_SIZE * 5.3);
        let mut ctx = EditContext::new(&mut map, &settings);
        assert!(ctx.change_terrain(pos, 7.3, &Brush::new(shape, 90.0, 0.2)));

        let mut mismatches = 0;
        for cz in 0..CHUNKS_PER_SIDE {
            let left = map.chunk(ChunkKey::new(a, 15, cz)).unwrap().right_edge();
            let right = map.chunk(ChunkKey::new(b, 0, cz)).unwrap();
            for (r, h) in left.iter().enumerate() {
                mismatches += (right.height(outer_index(r, 0)).to_bits() != h.to_bits()) as usize;
            }
        }
        for idx in [a, b] {
            let tile = map.tile(idx).unwrap();
            for cz in 0..CHUNKS_PER_SIDE {
                for cx in 1..CHUNKS_PER_SIDE {
                    let left = tile.chunk(cx - 1, cz).right_edge();
                    let right = tile.chunk(cx, cz);
                    let above = tile.chunk(cz, cx - 1).bottom_edge();
                    let below = tile.chunk(cz, cx);
                    for k in 0..9 {
                        mismatches += (right.height(outer_index(k, 0)).to_bits() != left[k].to_bits()) as usize;
                        mismatches += (below.height(outer_index(0, k)).to_bits() != above[k].to_bits()) as usize;
                    }
                }
            }
        }
        assert_eq!(mismatches, 0, "{shape:?}");
    }
}

#[test]
fn seams_follow_an_edit_that_missed_the_neighbour() {
    let a = TileIndex::new(8, 8);
    let b = TileIndex::new(9, 8);
    let mut map = map_with(&[(a, 0.0), (b, 0.0)]);
    let settings = EditSettings::default();
    let key = ChunkKey::new(a, 15, 4);
    let vertex = outer_index(2, 8);
    let mut sel = VertexSelection::new();
    let mut ctx = EditContext::new(&mut map, &settings);
    let at = ctx.index().chunk(key).unwrap().vertex_position(vertex);
    assert!(ctx.select_vertices(&mut sel, at, UNIT_SIZE * 0.25));
    assert_eq!(sel.len(), 2);
    sel.retain(|h| h.chunk == key);
    assert!(ctx.move_vertices(&sel, 4.0).unwrap());

    let twin = map.chunk(ChunkKey::new(b, 0, 4)).unwrap();
    assert_eq!(twin.height(outer_index(2, 0)), 4.0);
    assert!(map.is_changed(b));
}

#[test]
fn converting_alpha_format_touches_every_stored_tile() {
    let tiles = [TileIndex::new(1, 2), TileIndex::new(2, 2)];
    let mut store = MemoryTileStore::new();
    let mut header = MapHeader::default();
    for idx in tiles {
        store.save_tile(&Tile::flat(idx, 0.0, false), &[]).unwrap();
        header.set_tile_exists(idx, true);
    }
    let mut map = MapIndex::new(Box::new(store), header);
    let settings = EditSettings::default();
    let mut ctx = EditContext::new(&mut map, &settings);
    assert_eq!(ctx.convert_alphamap(true).unwrap(), 2);
    assert_eq!(ctx.convert_alphamap(true).unwrap(), 0);
    assert!(map.big_alpha());
    for idx in tiles {
        assert!(map.tile(idx).unwrap().big_alpha);
        assert!(map.is_changed(idx));
    }
    let report = map.save_changed();
    assert_eq!(report.saved, tiles.to_vec());
    assert!(report.header_saved);
}

#[test]
fn settings_fill_missing_fields_with_defaults() {
    let parsed: EditSettings = toml::from_str(
        "seed = 99\n[brush]\nshape = \"smooth\"\nradius = 20.0\n",
    )
    .unwrap();
    assert_eq!(parsed.seed, 99);
    assert_eq!(parsed.brush.shape, BrushShape::Smooth);
    assert_eq!(parsed.brush.inner_ratio, 0.0);
    assert_eq!(parsed.spray_size, EditSettings::default().spray_size);
}
