use raylib::prelude::*;
use tilesmith_assets::AssetCache;
use tilesmith_edit::{EditContext, EditSettings};
use tilesmith_geom::Vec3;
use tilesmith_render::backend::TerrainRenderer;
use tilesmith_render::{CursorOverlay, CursorShape, FrameBuilder, FrameParams, RenderSettings};
use tilesmith_world::MapIndex;

use crate::camera::FlyCamera;

const RAISE_PER_SECOND: f32 = 40.0;

/// First ground hit along the view ray, marching at half a unit.
fn pick_ground(index: &MapIndex, from: Vec3, dir: Vec3, max: f32) -> Option<Vec3> {
    let step = tilesmith_terrain::UNIT_SIZE * 0.5;
    let mut t = 0.0;
    while t < max {
        let p = from + dir * t;
        if let Some(h) = index.height_at(p.x, p.z) {
            if p.y <= h {
                return Some(Vec3::new(p.x, h, p.z));
            }
        }
        t += step;
    }
    None
}

pub fn run(
    index: &mut MapIndex,
    edit: &EditSettings,
    render: RenderSettings,
    mut assets: Option<AssetCache>,
    start: Vec3,
) -> Result<(), Box<dyn std::error::Error>> {
    let (mut rl, thread) = raylib::init()
        .size(1280, 720)
        .title("tilesmith")
        .resizable()
        .build();
    rl.set_target_fps(60);
    rl.disable_cursor();

    let Some(mut renderer) = TerrainRenderer::new(&mut rl, &thread) else {
        return Err("terrain shader failed to compile".into());
    };
    let mut camera = FlyCamera::new(start);
    let mut builder = FrameBuilder::new(render);
    let brush = edit.brush;

    while !rl.window_should_close() {
        let dt = rl.get_frame_time();
        camera.update(&mut rl, dt);
        let reach = builder.settings.effective_cull_distance();
        let loaded = crate::load_tiles_near(index, camera.position, reach);
        if loaded > 0 {
            log::info!("streamed in {} tile(s)", loaded);
        }

        let cursor = pick_ground(index, camera.position, camera.forward(), reach);
        let raise = rl.is_mouse_button_down(MouseButton::MOUSE_BUTTON_LEFT);
        let lower = rl.is_mouse_button_down(MouseButton::MOUSE_BUTTON_RIGHT);
        if let (Some(pos), true) = (cursor, raise || lower) {
            let delta = (if raise { RAISE_PER_SECOND } else { -RAISE_PER_SECOND }) * dt;
            if EditContext::new(index, edit).change_terrain(pos, delta, &brush) {
                for idx in index.tiles_in_range(pos, brush.reach() + tilesmith_terrain::CHUNK_SIZE) {
                    renderer.invalidate_tile(idx);
                }
            }
        }
        if rl.is_key_pressed(KeyboardKey::KEY_G) && EditContext::new(index, edit).fix_all_gaps() {
            for idx in index.loaded_indices().collect::<Vec<_>>() {
                renderer.invalidate_tile(idx);
            }
        }
        if rl.is_key_down(KeyboardKey::KEY_LEFT_CONTROL) && rl.is_key_pressed(KeyboardKey::KEY_S) {
            let report = index.save_changed();
            if !report.is_ok() {
                log::error!("{} tile(s) failed to save", report.failed.len());
            }
        }
        if rl.is_key_pressed(KeyboardKey::KEY_L) {
            builder.settings.draw.lines = !builder.settings.draw.lines;
        }
        if rl.is_key_pressed(KeyboardKey::KEY_F) {
            builder.settings.draw.fog = !builder.settings.draw.fog;
        }

        let aspect = rl.get_screen_width() as f32 / rl.get_screen_height().max(1) as f32;
        let mut params = FrameParams::new(camera.view_proj(aspect), camera.position);
        params.cursor = cursor.map(|position| CursorOverlay {
            position,
            radius: brush.radius,
            inner_ratio: brush.inner_ratio,
            color: [1.0, 1.0, 1.0, 1.0],
            shape: CursorShape::Circle,
            angled: None,
            reference: None,
        });
        let list = builder.build(index, &params);
        renderer.prepare(&mut rl, &thread, index, &list, |name| {
            assets.as_mut().map(|cache| cache.texture(name.as_str()).clone())
        });

        let fog = builder.settings.fog.color;
        let mut d = rl.begin_drawing(&thread);
        d.clear_background(Color::new(
            (fog[0] * 255.0) as u8,
            (fog[1] * 255.0) as u8,
            (fog[2] * 255.0) as u8,
            255,
        ));
        {
            let mut d3 = d.begin_mode3D(camera.to_camera3d());
            renderer.draw(&mut d3, &list);
        }
        d.draw_text(
            &format!(
                "chunks {} / {}  water {}  uploaded {}",
                list.stats.chunks_drawn,
                list.stats.chunks_considered,
                list.stats.water_drawn,
                renderer.uploaded_chunks()
            ),
            12,
            12,
            20,
            Color::DARKGRAY,
        );
        d.draw_fps(12, 40);
    }
    Ok(())
}
