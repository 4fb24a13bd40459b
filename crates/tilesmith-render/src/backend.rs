//! Raylib GPU backend: mesh upload, terrain shader, draw-list playback.
// Unsafe is required for Raylib mesh upload and texture slot binding.

use hashbrown::HashMap;
use raylib::prelude::*;
use tilesmith_assets::DecodedTexture;
use tilesmith_terrain::{ALPHA_SIZE, Chunk, ChunkKey, TextureName, TileIndex};
use tilesmith_world::MapIndex;

use crate::frame::{DrawCommand, DrawList};
use crate::glsl::{TERRAIN_FS, TERRAIN_VS};
use crate::mesh::{MeshBuild, build_chunk_mesh, build_liquid_mesh};
use crate::uniforms::{ChunkUniforms, TerrainUniforms, WireframeMode};

pub mod conv {
    use tilesmith_geom::{Aabb, Vec3};

    pub fn vec3_to_rl(v: Vec3) -> raylib::prelude::Vector3 {
        raylib::prelude::Vector3::new(v.x, v.y, v.z)
    }

    pub fn vec3_from_rl(v: raylib::prelude::Vector3) -> Vec3 {
        Vec3::new(v.x, v.y, v.z)
    }

    pub fn aabb_to_rl(bb: Aabb) -> raylib::core::math::BoundingBox {
        raylib::core::math::BoundingBox::new(vec3_to_rl(bb.min), vec3_to_rl(bb.max))
    }

    pub fn color_to_rl(c: [f32; 4]) -> raylib::prelude::Color {
        let q = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        raylib::prelude::Color::new(q(c[0]), q(c[1]), q(c[2]), q(c[3]))
    }
}

const ALPHA_TEX_SLOT: i32 = 7;
const LAYER_TEX_SLOT: i32 = 8;

/// Uploads a built mesh as a single raylib model.
pub fn upload_chunk_mesh(rl: &mut RaylibHandle, thread: &RaylibThread, mb: &MeshBuild) -> Option<Model> {
    let v_count = mb.vertex_count();
    if v_count == 0 || mb.is_empty() {
        return None;
    }
    let mut raw: raylib::ffi::Mesh = unsafe { std::mem::zeroed() };
    raw.vertexCount = v_count as i32;
    raw.triangleCount = mb.triangle_count() as i32;
    unsafe {
        let fbytes = |n: usize| (n * std::mem::size_of::<f32>()) as u32;
        raw.vertices = raylib::ffi::MemAlloc(fbytes(mb.pos.len())) as *mut f32;
        raw.normals = raylib::ffi::MemAlloc(fbytes(mb.norm.len())) as *mut f32;
        raw.texcoords = raylib::ffi::MemAlloc(fbytes(mb.uv.len())) as *mut f32;
        raw.texcoords2 = raylib::ffi::MemAlloc(fbytes(mb.uv2.len())) as *mut f32;
        raw.colors = raylib::ffi::MemAlloc(mb.col.len() as u32) as *mut u8;
        raw.indices = raylib::ffi::MemAlloc((mb.idx.len() * std::mem::size_of::<u16>()) as u32) as *mut u16;
        std::ptr::copy_nonoverlapping(mb.pos.as_ptr(), raw.vertices, mb.pos.len());
        std::ptr::copy_nonoverlapping(mb.norm.as_ptr(), raw.normals, mb.norm.len());
        std::ptr::copy_nonoverlapping(mb.uv.as_ptr(), raw.texcoords, mb.uv.len());
        std::ptr::copy_nonoverlapping(mb.uv2.as_ptr(), raw.texcoords2, mb.uv2.len());
        std::ptr::copy_nonoverlapping(mb.col.as_ptr(), raw.colors, mb.col.len());
        std::ptr::copy_nonoverlapping(mb.idx.as_ptr(), raw.indices, mb.idx.len());
    }
    let mut mesh = unsafe { raylib::core::models::Mesh::from_raw(raw) };
    unsafe {
        mesh.upload(false);
    }
    rl.load_model_from_mesh(thread, unsafe { mesh.make_weak() }).ok()
}

/// 64x64 RGBA: layer 1..3 weights in rgb, shadow in alpha.
pub fn alpha_texture_pixels(chunk: &Chunk, shadow_strength: f32) -> Vec<u8> {
    let mut out = vec![0u8; ALPHA_SIZE * ALPHA_SIZE * 4];
    let set = &chunk.textures;
    for y in 0..ALPHA_SIZE {
        for x in 0..ALPHA_SIZE {
            let i = (y * ALPHA_SIZE + x) * 4;
            for layer in 1..set.len().min(4) {
                out[i + layer - 1] = set.weight(layer, x, y);
            }
            if chunk.shadow_at(x, y) {
                out[i + 3] = (shadow_strength * 255.0) as u8;
            }
        }
    }
    out
}

fn texture_from_rgba(
    rl: &mut RaylibHandle,
    thread: &RaylibThread,
    width: u32,
    height: u32,
    rgba: &[u8],
    filter: TextureFilter,
) -> Option<Texture2D> {
    let img = Image::gen_image_color(width as i32, height as i32, Color::BLACK);
    let tex = rl.load_texture_from_image(thread, &img).ok()?;
    tex.set_texture_filter(thread, filter);
    tex.set_texture_wrap(thread, TextureWrap::TEXTURE_WRAP_REPEAT);
    unsafe {
        raylib::ffi::UpdateTexture(*tex.as_ref(), rgba.as_ptr() as *const _);
    }
    Some(tex)
}

fn bind_slot(shader: &mut WeakShader, loc: i32, slot: i32, tex: &Texture2D) {
    unsafe {
        raylib::ffi::rlActiveTextureSlot(slot);
        raylib::ffi::rlEnableTexture(tex.as_ref().id);
        raylib::ffi::rlActiveTextureSlot(0);
    }
    if loc >= 0 {
        shader.set_shader_value(loc, slot);
    }
}

pub struct TerrainShader {
    pub shader: WeakShader,
    pub loc_alphamap: i32,
    pub loc_tex: [i32; 4],
    pub loc_layer_count: i32,
    pub loc_has_mccv: i32,
    pub loc_cant_paint: i32,
    pub loc_is_impassible: i32,
    pub loc_draw_areaid_overlay: i32,
    pub loc_areaid_color: i32,
    pub loc_camera: i32,
    pub loc_light_dir: i32,
    pub loc_diffuse_color: i32,
    pub loc_ambient_color: i32,
    pub loc_draw_lines: i32,
    pub loc_draw_hole_lines: i32,
    pub loc_draw_contour: i32,
    pub loc_draw_fog: i32,
    pub loc_fog_color: i32,
    pub loc_fogdistance: i32,
    pub loc_fog_start: i32,
    pub loc_draw_wireframe: i32,
    pub loc_rainbow_wireframe: i32,
    pub loc_wireframe_radius: i32,
    pub loc_wireframe_width: i32,
    pub loc_wireframe_color: i32,
    pub loc_draw_cursor_circle: i32,
    pub loc_cursor_position: i32,
    pub loc_outer_cursor_radius: i32,
    pub loc_inner_cursor_ratio: i32,
    pub loc_cursor_color: i32,
}

impl TerrainShader {
    pub fn load(rl: &mut RaylibHandle, thread: &RaylibThread) -> Option<Self> {
        let shader_strong = rl.load_shader_from_memory(thread, Some(TERRAIN_VS), Some(TERRAIN_FS));
        let shader = unsafe { shader_strong.make_weak() };
        let loc = |name: &str| shader.get_shader_location(name);
        Some(Self {
            loc_alphamap: loc("alphamap"),
            loc_tex: [loc("tex0"), loc("tex1"), loc("tex2"), loc("tex3")],
            loc_layer_count: loc("layer_count"),
            loc_has_mccv: loc("has_mccv"),
            loc_cant_paint: loc("cant_paint"),
            loc_is_impassible: loc("is_impassible"),
            loc_draw_areaid_overlay: loc("draw_areaid_overlay"),
            loc_areaid_color: loc("areaid_color"),
            loc_camera: loc("camera"),
            loc_light_dir: loc("light_dir"),
            loc_diffuse_color: loc("diffuse_color"),
            loc_ambient_color: loc("ambient_color"),
            loc_draw_lines: loc("draw_lines"),
            loc_draw_hole_lines: loc("draw_hole_lines"),
            loc_draw_contour: loc("draw_contour"),
            loc_draw_fog: loc("draw_fog"),
            loc_fog_color: loc("fog_color"),
            loc_fogdistance: loc("fogdistance"),
            loc_fog_start: loc("fog_start"),
            loc_draw_wireframe: loc("draw_wireframe"),
            loc_rainbow_wireframe: loc("rainbow_wireframe"),
            loc_wireframe_radius: loc("wireframe_radius"),
            loc_wireframe_width: loc("wireframe_width"),
            loc_wireframe_color: loc("wireframe_color"),
            loc_draw_cursor_circle: loc("draw_cursor_circle"),
            loc_cursor_position: loc("cursor_position"),
            loc_outer_cursor_radius: loc("outer_cursor_radius"),
            loc_inner_cursor_ratio: loc("inner_cursor_ratio"),
            loc_cursor_color: loc("cursor_color"),
            shader,
        })
    }

    fn set_i32(&mut self, loc: i32, v: i32) {
        if loc >= 0 {
            self.shader.set_shader_value(loc, v);
        }
    }

    fn set_f32(&mut self, loc: i32, v: f32) {
        if loc >= 0 {
            self.shader.set_shader_value(loc, v);
        }
    }

    fn set_vec3(&mut self, loc: i32, v: [f32; 3]) {
        if loc >= 0 {
            self.shader.set_shader_value(loc, v);
        }
    }

    fn set_vec4(&mut self, loc: i32, v: [f32; 4]) {
        if loc >= 0 {
            self.shader.set_shader_value(loc, v);
        }
    }

    pub fn update_frame_uniforms(&mut self, u: &TerrainUniforms) {
        self.set_vec3(self.loc_camera, u.camera.to_array());
        self.set_vec3(self.loc_light_dir, u.light.direction.to_array());
        self.set_vec3(self.loc_diffuse_color, u.light.diffuse);
        self.set_vec3(self.loc_ambient_color, u.light.ambient);
        self.set_i32(self.loc_draw_areaid_overlay, u.draw_areaid_overlay as i32);
        self.set_i32(self.loc_draw_lines, u.draw_lines as i32);
        self.set_i32(self.loc_draw_hole_lines, u.draw_hole_lines as i32);
        self.set_i32(self.loc_draw_contour, u.draw_contour as i32);
        self.set_i32(self.loc_draw_fog, u.draw_fog as i32);
        self.set_vec3(self.loc_fog_color, u.fog.color);
        self.set_f32(self.loc_fogdistance, u.fog.distance);
        self.set_f32(self.loc_fog_start, u.fog.start);
        let wire = match (u.draw_wireframe, u.wireframe.mode) {
            (false, _) => 0,
            (true, WireframeMode::Everywhere) => 1,
            (true, WireframeMode::AroundCursor) => 2,
        };
        self.set_i32(self.loc_draw_wireframe, wire);
        self.set_i32(self.loc_rainbow_wireframe, u.wireframe.rainbow as i32);
        self.set_f32(self.loc_wireframe_radius, u.wireframe.radius);
        self.set_f32(self.loc_wireframe_width, u.wireframe.width);
        self.set_vec4(self.loc_wireframe_color, u.wireframe.color);
        self.set_vec3(self.loc_cursor_position, u.cursor_position.to_array());
        self.set_f32(self.loc_outer_cursor_radius, u.cursor_radius);
        self.set_i32(self.loc_draw_cursor_circle, u.cursor.is_some() as i32);
        if let Some(c) = u.cursor {
            self.set_f32(self.loc_inner_cursor_ratio, c.inner_ratio);
            self.set_vec4(self.loc_cursor_color, c.color);
        }
    }

    pub fn update_chunk_uniforms(&mut self, c: &ChunkUniforms) {
        self.set_i32(self.loc_layer_count, c.layer_count as i32);
        self.set_i32(self.loc_has_mccv, c.has_mccv as i32);
        self.set_i32(self.loc_cant_paint, c.cant_paint as i32);
        self.set_i32(self.loc_is_impassible, c.impassible as i32);
        self.set_vec4(self.loc_areaid_color, c.areaid_color.unwrap_or([0.0; 4]));
    }
}

struct GpuChunk {
    model: Model,
    alpha: Option<Texture2D>,
    layers: Vec<TextureName>,
    generation: u64,
}

/// GPU copies of loaded chunks, refreshed when invalidated or reloaded.
pub struct TerrainRenderer {
    pub shader: TerrainShader,
    pub shadow_strength: f32,
    chunks: HashMap<ChunkKey, GpuChunk>,
    water: HashMap<(ChunkKey, usize), Model>,
    textures: HashMap<TextureName, Texture2D>,
}

impl TerrainRenderer {
    pub fn new(rl: &mut RaylibHandle, thread: &RaylibThread) -> Option<Self> {
        Some(Self {
            shader: TerrainShader::load(rl, thread)?,
            shadow_strength: crate::preview::SHADOW_STRENGTH,
            chunks: HashMap::new(),
            water: HashMap::new(),
            textures: HashMap::new(),
        })
    }

    pub fn invalidate(&mut self, key: ChunkKey) {
        self.chunks.remove(&key);
        self.water.retain(|(k, _), _| *k != key);
    }

    pub fn invalidate_tile(&mut self, tile: TileIndex) {
        self.chunks.retain(|k, _| k.tile != tile);
        self.water.retain(|(k, _), _| k.tile != tile);
    }

    pub fn uploaded_chunks(&self) -> usize {
        self.chunks.len()
    }

    fn ensure_chunk(
        &mut self,
        rl: &mut RaylibHandle,
        thread: &RaylibThread,
        index: &MapIndex,
        key: ChunkKey,
        load_texture: &mut impl FnMut(&TextureName) -> Option<DecodedTexture>,
    ) -> bool {
        let generation = index.generation(key.tile);
        if self.chunks.get(&key).is_some_and(|g| g.generation == generation) {
            return true;
        }
        let Some(chunk) = index.chunk(key) else {
            return false;
        };
        let Some(mut model) = upload_chunk_mesh(rl, thread, &build_chunk_mesh(chunk)) else {
            return false;
        };
        if let Some(mat) = model.materials_mut().get_mut(0) {
            let dest = mat.shader_mut();
            let dest_ptr: *mut raylib::ffi::Shader = dest.as_mut();
            let src_ptr: *const raylib::ffi::Shader = self.shader.shader.as_ref();
            unsafe { std::ptr::copy_nonoverlapping(src_ptr, dest_ptr, 1) };
        }
        let alpha_px = alpha_texture_pixels(chunk, self.shadow_strength);
        let alpha = texture_from_rgba(
            rl,
            thread,
            ALPHA_SIZE as u32,
            ALPHA_SIZE as u32,
            &alpha_px,
            TextureFilter::TEXTURE_FILTER_BILINEAR,
        );
        let layers: Vec<TextureName> = chunk.textures.layers().iter().map(|l| l.texture.clone()).collect();
        for name in &layers {
            if self.textures.contains_key(name) {
                continue;
            }
            if let Some(decoded) = load_texture(name) {
                if let Some(tex) = texture_from_rgba(
                    rl,
                    thread,
                    decoded.width,
                    decoded.height,
                    decoded.rgba(),
                    TextureFilter::TEXTURE_FILTER_BILINEAR,
                ) {
                    self.textures.insert(name.clone(), tex);
                }
            }
        }
        self.chunks.insert(
            key,
            GpuChunk {
                model,
                alpha,
                layers,
                generation,
            },
        );
        true
    }

    fn ensure_water(
        &mut self,
        rl: &mut RaylibHandle,
        thread: &RaylibThread,
        index: &MapIndex,
        key: ChunkKey,
        layer: usize,
    ) -> bool {
        if self.water.contains_key(&(key, layer)) {
            return true;
        }
        let Some(chunk) = index.chunk(key) else {
            return false;
        };
        let Some(l) = chunk.liquid.layers.get(layer) else {
            return false;
        };
        match upload_chunk_mesh(rl, thread, &build_liquid_mesh(chunk, l)) {
            Some(model) => {
                self.water.insert((key, layer), model);
                true
            }
            None => false,
        }
    }

    /// Uploads whatever the list needs. Call before entering 3D mode.
    pub fn prepare(
        &mut self,
        rl: &mut RaylibHandle,
        thread: &RaylibThread,
        index: &MapIndex,
        list: &DrawList,
        mut load_texture: impl FnMut(&TextureName) -> Option<DecodedTexture>,
    ) {
        for cmd in &list.commands {
            match cmd {
                DrawCommand::Terrain { chunk, .. } => {
                    if !self.ensure_chunk(rl, thread, index, *chunk, &mut load_texture) {
                        log::warn!("could not upload chunk {:?}", chunk);
                    }
                }
                DrawCommand::Water { chunk, layer, .. } => {
                    self.ensure_water(rl, thread, index, *chunk, *layer);
                }
                _ => {}
            }
        }
    }

    /// Plays back a prepared list inside a 3D mode.
    pub fn draw(&mut self, d3: &mut impl RaylibDraw3D, list: &DrawList) {
        use conv::{aabb_to_rl, color_to_rl, vec3_to_rl};

        self.shader.update_frame_uniforms(&list.uniforms);
        for cmd in &list.commands {
            match cmd {
                DrawCommand::Terrain { chunk, uniforms } => {
                    let Some(gpu) = self.chunks.get(chunk) else {
                        continue;
                    };
                    self.shader.update_chunk_uniforms(uniforms);
                    if let Some(alpha) = &gpu.alpha {
                        bind_slot(&mut self.shader.shader, self.shader.loc_alphamap, ALPHA_TEX_SLOT, alpha);
                    }
                    for (i, name) in gpu.layers.iter().enumerate().take(4) {
                        if let Some(tex) = self.textures.get(name) {
                            bind_slot(
                                &mut self.shader.shader,
                                self.shader.loc_tex[i],
                                LAYER_TEX_SLOT + i as i32,
                                tex,
                            );
                        }
                    }
                    d3.draw_model(&gpu.model, Vector3::zero(), 1.0, Color::WHITE);
                }
                DrawCommand::Water { chunk, layer, .. } => {
                    if let Some(model) = self.water.get(&(*chunk, *layer)) {
                        d3.draw_model(model, Vector3::zero(), 1.0, Color::new(40, 90, 160, 150));
                    }
                }
                DrawCommand::Instance {
                    extents, highlighted, ..
                } => {
                    let color = if *highlighted {
                        Color::YELLOW
                    } else {
                        Color::GRAY
                    };
                    d3.draw_bounding_box(aabb_to_rl(*extents), color);
                }
                DrawCommand::Disk {
                    center,
                    radius,
                    color,
                    stippled,
                    angled,
                } => {
                    let (axis, angle) = match angled {
                        Some(a) => (
                            Vector3::new(-a.orientation.sin(), 0.0, a.orientation.cos()),
                            90.0 - a.angle.to_degrees(),
                        ),
                        None => (Vector3::new(1.0, 0.0, 0.0), 90.0),
                    };
                    let mut c = *color;
                    if *stippled {
                        c[3] *= 0.5;
                    }
                    d3.draw_circle_3D(vec3_to_rl(*center), *radius, axis, angle, color_to_rl(c));
                }
                DrawCommand::Sphere { center, radius, color } => {
                    d3.draw_sphere_wires(vec3_to_rl(*center), *radius, 12, 12, color_to_rl(*color));
                }
                DrawCommand::Square {
                    center,
                    half_size,
                    color,
                } => {
                    let y = center.y;
                    let (x0, x1) = (center.x - half_size, center.x + half_size);
                    let (z0, z1) = (center.z - half_size, center.z + half_size);
                    let p = [
                        Vector3::new(x0, y, z0),
                        Vector3::new(x1, y, z0),
                        Vector3::new(x1, y, z1),
                        Vector3::new(x0, y, z1),
                    ];
                    for i in 0..4 {
                        d3.draw_line_3D(p[i], p[(i + 1) % 4], color_to_rl(*color));
                    }
                }
                DrawCommand::Line { from, to, color } => {
                    d3.draw_line_3D(vec3_to_rl(*from), vec3_to_rl(*to), color_to_rl(*color));
                }
                DrawCommand::Points { points, color } => {
                    for (p, size) in points {
                        d3.draw_sphere(vec3_to_rl(*p), size * 0.05, color_to_rl(*color));
                    }
                }
            }
        }
    }
}
