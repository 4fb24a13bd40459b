//! Per-frame draw submission.
//!
//! `FrameBuilder::build` walks the loaded map once and produces a flat
//! command list. Terrain comes first in tile and chunk row-major order,
//! then water, then instances by uid, then editor overlays. The same map
//! and parameters always produce the same list.

use hashbrown::HashMap;
use tilesmith_geom::{Aabb, Frustum, Mat4, Vec3};
use tilesmith_terrain::{
    CHUNK_SIZE, CHUNKS_PER_SIDE, Chunk, ChunkFlags, ChunkKey, ObjectKind, TextureName, TileIndex,
};
use tilesmith_world::MapIndex;

use crate::uniforms::{
    ChunkUniforms, CursorCircle, RenderSettings, TerrainUniforms, area_color,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorShape {
    /// Flat disk with a stippled inner disk.
    Disk,
    Sphere,
    /// Ring pair drawn by the terrain shader.
    Circle,
    /// Square brush footprint.
    Square,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AngledCursor {
    /// Radians.
    pub angle: f32,
    /// Radians.
    pub orientation: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CursorOverlay {
    pub position: Vec3,
    pub radius: f32,
    pub inner_ratio: f32,
    pub color: [f32; 4],
    pub shape: CursorShape,
    /// Tilted flatten plane.
    pub angled: Option<AngledCursor>,
    /// Fixed flatten reference point.
    pub reference: Option<Vec3>,
}

/// Camera and editor state for one frame.
#[derive(Clone, Copy, Debug)]
pub struct FrameParams<'a> {
    pub view_proj: Mat4,
    pub camera: Vec3,
    /// Texture about to be painted, for the paintability overlay.
    pub paint_texture: Option<&'a TextureName>,
    pub cursor: Option<CursorOverlay>,
    pub selected_vertices: &'a [Vec3],
    pub vertex_center: Option<Vec3>,
    pub selected_instance: Option<u32>,
}

impl<'a> FrameParams<'a> {
    pub fn new(view_proj: Mat4, camera: Vec3) -> Self {
        Self {
            view_proj,
            camera,
            paint_texture: None,
            cursor: None,
            selected_vertices: &[],
            vertex_center: None,
            selected_instance: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum DrawCommand {
    Terrain {
        chunk: ChunkKey,
        uniforms: ChunkUniforms,
    },
    Water {
        chunk: ChunkKey,
        layer: usize,
        liquid_id: u16,
    },
    Instance {
        uid: u32,
        kind: ObjectKind,
        extents: Aabb,
        highlighted: bool,
    },
    Disk {
        center: Vec3,
        radius: f32,
        color: [f32; 4],
        stippled: bool,
        /// Tilt of the disk plane, if any.
        angled: Option<AngledCursor>,
    },
    Sphere {
        center: Vec3,
        radius: f32,
        color: [f32; 4],
    },
    Square {
        center: Vec3,
        half_size: f32,
        color: [f32; 4],
    },
    Line {
        from: Vec3,
        to: Vec3,
        color: [f32; 4],
    },
    Points {
        /// Position and point size.
        points: Vec<(Vec3, f32)>,
        color: [f32; 4],
    },
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub chunks_considered: usize,
    pub chunks_drawn: usize,
    pub chunks_culled: usize,
    pub water_drawn: usize,
    pub instances_drawn: usize,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DrawList {
    pub uniforms: TerrainUniforms,
    pub commands: Vec<DrawCommand>,
    pub stats: FrameStats,
}

impl DrawList {
    pub fn terrain_chunks(&self) -> impl Iterator<Item = ChunkKey> + '_ {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Terrain { chunk, .. } => Some(*chunk),
            _ => None,
        })
    }
}

const CHUNKS_PER_TILE: usize = CHUNKS_PER_SIDE * CHUNKS_PER_SIDE;

pub const SELECTION_COLOR: [f32; 4] = [1.0, 0.0, 0.0, 1.0];
const REFERENCE_COLOR: [f32; 4] = [0.3, 0.3, 1.0, 1.0];
const CENTER_COLOR: [f32; 4] = [0.5, 0.5, 0.5, 1.0];

/// Whole-chunk visibility: inside the frustum and within `cull` of the camera.
pub fn chunk_visible(aabb: &Aabb, frustum: &Frustum, camera: Vec3, cull: f32) -> bool {
    frustum.intersects_aabb(aabb) && distance_to_box(aabb, camera) < cull
}

/// Chunk footprint spanning its visible liquid heights.
fn water_aabb(chunk: &Chunk) -> Option<Aabb> {
    let (lo, hi) = chunk.liquid.height_range()?;
    let bb = chunk.aabb();
    Some(Aabb::new(
        Vec3::new(bb.min.x, lo, bb.min.z),
        Vec3::new(bb.max.x, hi, bb.max.z),
    ))
}

fn distance_to_box(bb: &Aabb, p: Vec3) -> f32 {
    let nearest = Vec3::new(
        p.x.clamp(bb.min.x, bb.max.x),
        p.y.clamp(bb.min.y, bb.max.y),
        p.z.clamp(bb.min.z, bb.max.z),
    );
    nearest.distance(p)
}

pub struct FrameBuilder {
    pub settings: RenderSettings,
    area_colors: HashMap<u32, [f32; 4]>,
}

impl FrameBuilder {
    pub fn new(settings: RenderSettings) -> Self {
        Self {
            settings,
            area_colors: HashMap::new(),
        }
    }

    pub fn build(&mut self, index: &MapIndex, params: &FrameParams) -> DrawList {
        let frustum = Frustum::from_view_projection(&params.view_proj);
        let cull = self.settings.effective_cull_distance();
        let draw = self.settings.draw;
        let mut stats = FrameStats::default();
        let mut commands = Vec::new();

        let mut visible: Vec<(TileIndex, &Chunk)> = Vec::new();
        for tile in index.loaded_tiles() {
            if !frustum.intersects_aabb(&tile.aabb()) {
                stats.chunks_culled += CHUNKS_PER_TILE;
                stats.chunks_considered += CHUNKS_PER_TILE;
                continue;
            }
            for chunk in tile.chunks() {
                stats.chunks_considered += 1;
                if chunk_visible(&chunk.aabb(), &frustum, params.camera, cull) {
                    visible.push((tile.index, chunk));
                } else {
                    stats.chunks_culled += 1;
                }
            }
        }

        if draw.terrain {
            for (tile, chunk) in &visible {
                let uniforms = self.chunk_uniforms(chunk, params.paint_texture);
                commands.push(DrawCommand::Terrain {
                    chunk: chunk.key(*tile),
                    uniforms,
                });
                stats.chunks_drawn += 1;
            }
        }

        if draw.water {
            for tile in index.loaded_tiles() {
                for chunk in tile.chunks() {
                    let Some(bb) = water_aabb(chunk) else {
                        continue;
                    };
                    if !chunk_visible(&bb, &frustum, params.camera, cull) {
                        continue;
                    }
                    for (layer, l) in chunk.liquid.layers.iter().enumerate() {
                        if l.mask == 0 {
                            continue;
                        }
                        commands.push(DrawCommand::Water {
                            chunk: chunk.key(tile.index),
                            layer,
                            liquid_id: l.liquid_id,
                        });
                        stats.water_drawn += 1;
                    }
                }
            }
        }

        if draw.models || draw.map_objects {
            for inst in index.instances().sorted() {
                let wanted = match inst.kind {
                    ObjectKind::Model => draw.models,
                    ObjectKind::MapObject => draw.map_objects,
                };
                if !wanted || !chunk_visible(&inst.extents, &frustum, params.camera, cull) {
                    continue;
                }
                commands.push(DrawCommand::Instance {
                    uid: inst.uid,
                    kind: inst.kind,
                    extents: inst.extents,
                    highlighted: draw.models_with_box || params.selected_instance == Some(inst.uid),
                });
                stats.instances_drawn += 1;
            }
        }

        if let Some(cursor) = &params.cursor {
            push_cursor(&mut commands, cursor);
        }
        push_selection(&mut commands, params);

        log::trace!(
            "frame: {} chunk(s) drawn, {} culled, {} water, {} instance(s)",
            stats.chunks_drawn,
            stats.chunks_culled,
            stats.water_drawn,
            stats.instances_drawn
        );
        DrawList {
            uniforms: self.terrain_uniforms(params),
            commands,
            stats,
        }
    }

    pub fn terrain_uniforms(&self, params: &FrameParams) -> TerrainUniforms {
        let s = &self.settings;
        let (cursor_position, cursor_radius) = params
            .cursor
            .map(|c| (c.position, c.radius))
            .unwrap_or((Vec3::ZERO, 0.0));
        TerrainUniforms {
            camera: params.camera,
            draw_lines: s.draw.lines,
            draw_hole_lines: s.draw.lines && s.draw.hole_lines,
            draw_areaid_overlay: s.draw.area_id_overlay,
            draw_contour: s.draw.contour,
            draw_wireframe: s.draw.wireframe,
            wireframe: s.wireframe,
            draw_fog: s.draw.fog,
            fog: s.fog,
            light: s.light,
            cursor: params
                .cursor
                .filter(|c| c.shape == CursorShape::Circle)
                .map(|c| CursorCircle {
                    position: c.position,
                    radius: c.radius,
                    inner_ratio: c.inner_ratio,
                    color: c.color,
                }),
            cursor_position,
            cursor_radius,
        }
    }

    pub fn chunk_uniforms(&mut self, chunk: &Chunk, paint_texture: Option<&TextureName>) -> ChunkUniforms {
        let draw = self.settings.draw;
        let areaid_color = draw.area_id_overlay.then(|| {
            *self
                .area_colors
                .entry(chunk.area_id)
                .or_insert_with(|| area_color(chunk.area_id))
        });
        ChunkUniforms {
            layer_count: chunk.textures.len(),
            has_mccv: chunk.flags.contains(ChunkFlags::HAS_VERTEX_COLORS),
            cant_paint: draw.paintability_overlay
                && paint_texture.is_some_and(|t| !chunk.textures.can_paint_texture(t)),
            areaid_color,
            impassible: draw.chunk_flag_overlay && chunk.flags.contains(ChunkFlags::IMPASSIBLE),
        }
    }
}

fn push_cursor(commands: &mut Vec<DrawCommand>, c: &CursorOverlay) {
    match c.shape {
        CursorShape::Square => {
            let half = c.radius / 2.0;
            commands.push(DrawCommand::Square {
                center: c.position,
                half_size: half,
                color: c.color,
            });
            commands.push(DrawCommand::Square {
                center: c.position,
                half_size: half * c.inner_ratio,
                color: c.color,
            });
        }
        CursorShape::Sphere => commands.push(DrawCommand::Sphere {
            center: c.position,
            radius: c.radius,
            color: c.color,
        }),
        CursorShape::Circle => {}
        CursorShape::Disk => {
            let mut pos = c.position;
            match c.reference {
                Some(reference) => {
                    commands.push(DrawCommand::Sphere {
                        center: reference,
                        radius: 1.0,
                        color: REFERENCE_COLOR,
                    });
                    if let Some(a) = c.angled {
                        pos.y = tilesmith_geom::angled_height(reference, pos.x, pos.z, a.angle, a.orientation);
                        commands.push(DrawCommand::Line {
                            from: reference,
                            to: c.position,
                            color: c.color,
                        });
                        commands.push(DrawCommand::Line {
                            from: reference,
                            to: pos,
                            color: c.color,
                        });
                    } else {
                        pos.y = reference.y;
                    }
                    commands.push(DrawCommand::Line {
                        from: c.position,
                        to: pos,
                        color: c.color,
                    });
                }
                None => {
                    if let Some(a) = c.angled {
                        let dest1 = pos + Vec3::new(c.radius * a.orientation.cos(), 0.0, c.radius * a.orientation.sin());
                        let dest2 = dest1 + Vec3::new(0.0, c.radius * a.angle.tan(), 0.0);
                        for (from, to) in [(pos, dest1), (dest1, dest2), (pos, dest2)] {
                            commands.push(DrawCommand::Line {
                                from,
                                to,
                                color: c.color,
                            });
                        }
                    }
                }
            }
            commands.push(DrawCommand::Disk {
                center: pos,
                radius: c.radius,
                color: c.color,
                stippled: false,
                angled: c.angled,
            });
            if c.inner_ratio >= 0.01 {
                commands.push(DrawCommand::Disk {
                    center: pos,
                    radius: c.radius * c.inner_ratio,
                    color: c.color,
                    stippled: true,
                    angled: c.angled,
                });
            }
        }
    }
}

/// Point size for a selected vertex, shrinking with distance.
pub fn selection_point_size(camera: Vec3, p: Vec3) -> f32 {
    (10.0 - 1.25 * p.distance(camera) / CHUNK_SIZE).max(0.001)
}

fn push_selection(commands: &mut Vec<DrawCommand>, params: &FrameParams) {
    if params.selected_vertices.is_empty() {
        return;
    }
    let points = params
        .selected_vertices
        .iter()
        .map(|&v| {
            let p = v + Vec3::new(0.0, 0.1, 0.0);
            (p, selection_point_size(params.camera, p))
        })
        .collect();
    commands.push(DrawCommand::Points {
        points,
        color: SELECTION_COLOR,
    });
    if let Some(center) = params.vertex_center {
        commands.push(DrawCommand::Sphere {
            center,
            radius: 2.0,
            color: CENTER_COLOR,
        });
    }
}
