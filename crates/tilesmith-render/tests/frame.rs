use tilesmith_geom::{Mat4, Vec3};
use tilesmith_io::{MapHeader, MemoryTileStore};
use tilesmith_render::{
    AngledCursor, CursorOverlay, CursorShape, DrawCommand, FrameBuilder, FrameParams, RenderSettings,
    area_color,
};
use tilesmith_terrain::{
    AlphaMap, ChunkFlags, ChunkKey, LayerFlags, LiquidLayer, TILE_SIZE, TextureLayer, TextureName, TextureSet,
    TileIndex,
};
use tilesmith_world::MapIndex;

const TILE: TileIndex = TileIndex::new(32, 32);

fn map() -> MapIndex {
    let mut map = MapIndex::new(Box::new(MemoryTileStore::new()), MapHeader::default());
    assert!(map.create_tile(TILE, 0.0));
    map
}

fn centre() -> Vec3 {
    Vec3::new(TILE.xbase() + TILE_SIZE / 2.0, 0.0, TILE.zbase() + TILE_SIZE / 2.0)
}

fn top_down(height: f32) -> (Mat4, Vec3) {
    let eye = centre() + Vec3::new(0.0, height, 0.0);
    let view = Mat4::look_at(eye, centre(), Vec3::new(0.0, 0.0, -1.0));
    let proj = Mat4::perspective(90f32.to_radians(), 1.0, 0.1, 10_000.0);
    (proj * view, eye)
}

fn no_fog(cull: f32) -> RenderSettings {
    let mut s = RenderSettings::default();
    s.draw.fog = false;
    s.cull_distance = cull;
    s
}

fn layer(name: &str, alpha: u8) -> TextureLayer {
    TextureLayer {
        texture: TextureName::new(name),
        flags: LayerFlags::default(),
        effect_id: 0,
        alpha: Some(AlphaMap::filled(alpha)),
    }
}

#[test]
fn fog_distance_culls_whole_chunks() {
    let map = map();
    let (vp, eye) = top_down(1500.0);
    let params = FrameParams::new(vp, eye);

    let list = FrameBuilder::new(no_fog(5000.0)).build(&map, &params);
    assert_eq!(list.stats.chunks_drawn, 256);
    assert_eq!(list.stats.chunks_culled, 0);

    // Fog on: the fog end distance is the cull distance.
    let list = FrameBuilder::new(RenderSettings::default()).build(&map, &params);
    assert_eq!(list.stats.chunks_drawn, 0);
    assert_eq!(list.stats.chunks_considered, 256);
}

#[test]
fn chunks_behind_the_camera_are_skipped() {
    let map = map();
    let eye = centre() + Vec3::new(0.0, 20.0, 0.0);
    let target = eye + Vec3::new(100.0, -10.0, 0.0);
    let vp = Mat4::perspective(60f32.to_radians(), 1.5, 0.1, 10_000.0) * Mat4::look_at(eye, target, Vec3::UP);
    let list = FrameBuilder::new(no_fog(5000.0)).build(&map, &FrameParams::new(vp, eye));
    let drawn: Vec<ChunkKey> = list.terrain_chunks().collect();
    assert!(!drawn.is_empty() && drawn.len() < 256);
    assert!(drawn.iter().all(|k| k.cx >= 7));
    assert_eq!(list.stats.chunks_drawn + list.stats.chunks_culled, 256);
}

#[test]
fn draw_list_is_deterministic_and_ordered() {
    let mut map = map();
    let second = TileIndex::new(33, 32);
    assert!(map.create_tile(second, 0.0));
    {
        let chunk = map.tile_mut(TILE).unwrap().chunk_mut(3, 4);
        let mut water = LiquidLayer::new(2, 5.0);
        water.set_cell(1, 1, true);
        chunk.liquid.layers.push(water);
    }
    let eye = Vec3::new(TILE.xbase() + TILE_SIZE, 2000.0, TILE.zbase() + TILE_SIZE / 2.0);
    let vp = Mat4::perspective(120f32.to_radians(), 2.0, 1.0, 20_000.0)
        * Mat4::look_at(eye, eye - Vec3::new(0.0, 1.0, 0.0), Vec3::new(0.0, 0.0, -1.0));
    let params = FrameParams::new(vp, eye);

    let mut builder = FrameBuilder::new(no_fog(10_000.0));
    let a = builder.build(&map, &params);
    let b = builder.build(&map, &params);
    assert_eq!(a, b);

    let keys: Vec<ChunkKey> = a.terrain_chunks().collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    assert_eq!(keys.len(), 512);

    let first_water = a
        .commands
        .iter()
        .position(|c| matches!(c, DrawCommand::Water { .. }))
        .unwrap();
    assert!(a.commands[..first_water].iter().all(|c| matches!(c, DrawCommand::Terrain { .. })));
    assert!(matches!(
        a.commands[first_water],
        DrawCommand::Water { layer: 0, liquid_id: 2, .. }
    ));
    assert_eq!(a.stats.water_drawn, 1);
}

#[test]
fn chunk_uniforms_follow_the_overlay_toggles() {
    let mut map = map();
    {
        let tile = map.tile_mut(TILE).unwrap();
        let full = tile.chunk_mut(0, 0);
        full.textures = TextureSet::from_layers(vec![layer("a", 0), layer("b", 40), layer("c", 40), layer("d", 40)]);
        full.flags.set(ChunkFlags::IMPASSIBLE, true);
        full.area_id = 12;
    }
    let (vp, eye) = top_down(300.0);
    let paint = TextureName::new("e");
    let mut params = FrameParams::new(vp, eye);
    params.paint_texture = Some(&paint);

    let mut settings = no_fog(5000.0);
    let list = FrameBuilder::new(settings).build(&map, &params);
    let DrawCommand::Terrain { uniforms, .. } = &list.commands[0] else {
        panic!("terrain first");
    };
    assert_eq!(uniforms.layer_count, 4);
    assert!(!uniforms.cant_paint && !uniforms.impassible && uniforms.areaid_color.is_none());

    settings.draw.paintability_overlay = true;
    settings.draw.chunk_flag_overlay = true;
    settings.draw.area_id_overlay = true;
    let list = FrameBuilder::new(settings).build(&map, &params);
    let uniforms: Vec<_> = list
        .commands
        .iter()
        .filter_map(|c| match c {
            DrawCommand::Terrain { uniforms, .. } => Some(*uniforms),
            _ => None,
        })
        .collect();
    assert!(uniforms[0].cant_paint && uniforms[0].impassible);
    assert_eq!(uniforms[0].areaid_color, Some(area_color(12)));
    assert!(!uniforms[1].cant_paint && !uniforms[1].impassible);
    assert_eq!(uniforms[1].areaid_color, Some(area_color(0)));
    assert!(list.uniforms.draw_areaid_overlay);
}

fn overlays(list: &tilesmith_render::DrawList) -> Vec<&DrawCommand> {
    list.commands
        .iter()
        .filter(|c| !matches!(c, DrawCommand::Terrain { .. } | DrawCommand::Water { .. } | DrawCommand::Instance { .. }))
        .collect()
}

#[test]
fn disk_cursor_with_reference_and_angle() {
    let map = map();
    let (vp, eye) = top_down(300.0);
    let cursor = CursorOverlay {
        position: centre() + Vec3::new(10.0, 0.0, 0.0),
        radius: 15.0,
        inner_ratio: 0.5,
        color: [1.0, 1.0, 1.0, 1.0],
        shape: CursorShape::Disk,
        angled: Some(AngledCursor {
            angle: 45f32.to_radians(),
            orientation: 0.0,
        }),
        reference: Some(centre()),
    };
    let mut params = FrameParams::new(vp, eye);
    params.cursor = Some(cursor);
    let list = FrameBuilder::new(no_fog(5000.0)).build(&map, &params);
    let cmds = overlays(&list);

    assert!(matches!(cmds[0], DrawCommand::Sphere { radius, .. } if *radius == 1.0));
    let lines = cmds.iter().filter(|c| matches!(c, DrawCommand::Line { .. })).count();
    assert_eq!(lines, 3);
    let disks: Vec<_> = cmds
        .iter()
        .filter_map(|c| match c {
            DrawCommand::Disk { center, radius, stippled, .. } => Some((*center, *radius, *stippled)),
            _ => None,
        })
        .collect();
    assert_eq!(disks.len(), 2);
    // 10 units along a 45 degree slope.
    assert!((disks[0].0.y - 10.0).abs() < 1e-3);
    assert_eq!((disks[0].1, disks[0].2), (15.0, false));
    assert_eq!((disks[1].1, disks[1].2), (7.5, true));
    assert!(list.uniforms.cursor.is_none());
}

#[test]
fn circle_cursor_goes_to_the_shader_and_selection_is_drawn() {
    let map = map();
    let (vp, eye) = top_down(300.0);
    let selected = [centre(), centre() + Vec3::new(4.0, 1.0, 0.0)];
    let mut params = FrameParams::new(vp, eye);
    params.cursor = Some(CursorOverlay {
        position: centre(),
        radius: 20.0,
        inner_ratio: 0.3,
        color: [0.0, 1.0, 0.0, 1.0],
        shape: CursorShape::Circle,
        angled: None,
        reference: None,
    });
    params.selected_vertices = &selected;
    params.vertex_center = Some(centre() + Vec3::new(2.0, 0.5, 0.0));
    let list = FrameBuilder::new(no_fog(5000.0)).build(&map, &params);

    let circle = list.uniforms.cursor.expect("shader circle");
    assert_eq!(circle.radius, 20.0);
    assert_eq!(list.uniforms.cursor_radius, 20.0);

    let cmds = overlays(&list);
    assert_eq!(cmds.len(), 2);
    let DrawCommand::Points { points, .. } = cmds[0] else {
        panic!("points first");
    };
    assert_eq!(points.len(), 2);
    assert!((points[1].0.y - 1.1).abs() < 1e-5);
    assert!(points.iter().all(|(_, size)| *size >= 0.001 && *size <= 10.0));
    assert!(matches!(cmds[1], DrawCommand::Sphere { radius, .. } if *radius == 2.0));
}

#[test]
fn square_brush_draws_outer_and_inner_squares() {
    let map = map();
    let (vp, eye) = top_down(300.0);
    let mut params = FrameParams::new(vp, eye);
    params.cursor = Some(CursorOverlay {
        position: centre(),
        radius: 20.0,
        inner_ratio: 0.5,
        color: [1.0; 4],
        shape: CursorShape::Square,
        angled: None,
        reference: None,
    });
    let list = FrameBuilder::new(no_fog(5000.0)).build(&map, &params);
    let sizes: Vec<f32> = overlays(&list)
        .iter()
        .filter_map(|c| match c {
            DrawCommand::Square { half_size, .. } => Some(*half_size),
            _ => None,
        })
        .collect();
    assert_eq!(sizes, vec![10.0, 5.0]);
}
