//! CPU version of the terrain fragment shader.
//!
//! `TERRAIN_FS` in `glsl.rs` runs the same stages in the same order; the
//! preview renderer and the tests go through this one.

use tilesmith_geom::Vec3;
use tilesmith_terrain::{CHUNK_SIZE, HOLE_SIZE, TILE_SIZE, UNIT_SIZE};

use crate::uniforms::{ChunkUniforms, TerrainUniforms, WireframeMode};

/// Height step between contour lines.
pub const CONTOUR_SPACING: f32 = 4.0;

/// Interpolated inputs for one terrain fragment.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Fragment {
    pub position: Vec3,
    pub normal: Vec3,
    /// Sampled layer colours, base first.
    pub layers: [[f32; 3]; 4],
    /// Alpha of layers 1..=3.
    pub alpha: [f32; 3],
    pub mccv: [f32; 3],
    /// 0 = lit, 1 = fully shadowed.
    pub shadow: f32,
    /// Screen-space derivative magnitude of `position`.
    pub fwidth: Vec3,
}

impl Default for Fragment {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            normal: Vec3::UP,
            layers: [[1.0; 3]; 4],
            alpha: [0.0; 3],
            mccv: [1.0; 3],
            shadow: 0.0,
            fwidth: Vec3::ZERO,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    TextureBlend,
    Lighting,
    OverlayTint,
    ImpassibleTint,
    Shadow,
    Contour,
    GridLines,
    Fog,
    Wireframe,
    CursorCircle,
}

/// Each stage composites over the result of the previous one.
pub const COMPOSITE_ORDER: [Stage; 10] = [
    Stage::TextureBlend,
    Stage::Lighting,
    Stage::OverlayTint,
    Stage::ImpassibleTint,
    Stage::Shadow,
    Stage::Contour,
    Stage::GridLines,
    Stage::Fog,
    Stage::Wireframe,
    Stage::CursorCircle,
];

struct Pixel {
    color: [f32; 4],
    lines_drawn: bool,
}

/// Shades one fragment. Output is straight (non-premultiplied) RGBA.
pub fn shade_fragment(u: &TerrainUniforms, chunk: &ChunkUniforms, frag: &Fragment) -> [f32; 4] {
    let dist = frag.position.distance(u.camera);
    if u.draw_fog && dist >= u.fog.distance {
        let [r, g, b] = u.fog.color;
        return [r, g, b, 1.0];
    }
    let mut px = Pixel {
        color: [1.0; 4],
        lines_drawn: false,
    };
    for stage in COMPOSITE_ORDER {
        stage.apply(u, chunk, frag, dist, &mut px);
    }
    px.color
}

impl Stage {
    fn apply(self, u: &TerrainUniforms, chunk: &ChunkUniforms, frag: &Fragment, dist: f32, px: &mut Pixel) {
        let c = &mut px.color;
        let p = frag.position;
        let fw = frag.fwidth;
        match self {
            Stage::TextureBlend => {
                *c = texture_blend(chunk.layer_count, &frag.layers, &frag.alpha);
                if chunk.has_mccv {
                    for i in 0..3 {
                        c[i] *= frag.mccv[i];
                    }
                }
            }
            Stage::Lighting => {
                let l = &u.light;
                let ndl = frag.normal.normalized().dot(l.direction.normalized()).max(0.0);
                for i in 0..3 {
                    c[i] *= (l.diffuse[i] * ndl).clamp(0.0, 1.0) + l.ambient[i];
                }
            }
            Stage::OverlayTint => {
                if chunk.cant_paint {
                    c[1] = 0.0;
                    c[2] = 0.0;
                }
                if let (true, Some(area)) = (u.draw_areaid_overlay, chunk.areaid_color) {
                    for i in 0..4 {
                        c[i] = c[i] * 0.3 + area[i];
                    }
                }
            }
            Stage::ImpassibleTint => {
                if chunk.impassible {
                    *c = blend_by_alpha([1.0, 1.0, 1.0, 0.5], *c);
                }
            }
            Stage::Shadow => {
                let lit = 1.0 - frag.shadow.clamp(0.0, 1.0);
                for v in c.iter_mut().take(3) {
                    *v *= lit;
                }
                c[3] = 1.0;
            }
            Stage::Contour => {
                if u.draw_contour {
                    let a = contour_alpha(CONTOUR_SPACING, p.y, fw.y);
                    for v in c.iter_mut().take(3) {
                        *v *= a;
                    }
                }
            }
            Stage::GridLines => {
                if !u.draw_lines {
                    return;
                }
                let mut line = [0.0f32; 4];
                line[3] = contour_alpha_xz(TILE_SIZE, p, fw * 1.5);
                if line[3] > 0.0 {
                    line[1] = 0.8;
                } else {
                    line[3] = contour_alpha_xz(CHUNK_SIZE, p, fw);
                    if line[3] > 0.0 {
                        line[0] = 0.8;
                    } else if u.draw_hole_lines {
                        line[3] = contour_alpha_xz(HOLE_SIZE, p, fw * 0.75);
                        line[2] = 0.8;
                    }
                }
                if line[3] > 0.0 {
                    let keep = c[3];
                    *c = blend_by_alpha(line, *c);
                    c[3] = keep;
                    px.lines_drawn = true;
                }
            }
            Stage::Fog => {
                if !u.draw_fog {
                    return;
                }
                let end = u.fog.distance;
                let start = end * u.fog.start;
                let a = if end > start {
                    ((dist - start) / (end - start)).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let [r, g, b] = u.fog.color;
                *c = blend_by_alpha([r, g, b, a], *c);
                c[3] = 1.0;
            }
            Stage::Wireframe => {
                if !u.draw_wireframe || px.lines_drawn {
                    return;
                }
                let w = &u.wireframe;
                if w.mode == WireframeMode::AroundCursor {
                    let radius = (u.cursor_radius * w.radius).max(2.0 * UNIT_SIZE);
                    if p.distance_xz(u.cursor_position) >= radius {
                        return;
                    }
                }
                let grid = contour_alpha_xz(UNIT_SIZE, p, fw * w.width);
                let xm = p.x.rem_euclid(UNIT_SIZE);
                let zm = p.z.rem_euclid(UNIT_SIZE);
                let diag = (xm - zm).abs().min((xm + zm - UNIT_SIZE).abs());
                let d = (fw.x * fw.x + fw.z * fw.z).sqrt() * w.width;
                let alpha = grid.max(1.0 - smoothstep(0.0, d, diag));
                let color = if w.rainbow {
                    let [r, g, b] = rainbow(p);
                    [r, g, b, 1.0]
                } else {
                    w.color
                };
                let keep = c[3];
                *c = blend_by_alpha([color[0], color[1], color[2], color[3] * alpha], *c);
                c[3] = keep;
            }
            Stage::CursorCircle => {
                let Some(cursor) = u.cursor else {
                    return;
                };
                let d = p.distance_xz(cursor.position);
                let diff = (d - cursor.radius)
                    .abs()
                    .min((d - cursor.radius * cursor.inner_ratio).abs());
                let width = (fw.x * fw.x + fw.z * fw.z).sqrt();
                let alpha = 1.0 - smoothstep(0.0, width, diff);
                let [r, g, b, a] = cursor.color;
                let keep = c[3];
                *c = blend_by_alpha([r, g, b, a * alpha], *c);
                c[3] = keep;
            }
        }
    }
}

/// Weighted sum of the layer colours; an untextured chunk is white.
pub fn texture_blend(layer_count: usize, layers: &[[f32; 3]; 4], alpha: &[f32; 3]) -> [f32; 4] {
    if layer_count == 0 {
        return [1.0; 4];
    }
    let mut a = *alpha;
    for (i, v) in a.iter_mut().enumerate() {
        if i + 1 >= layer_count {
            *v = 0.0;
        }
    }
    let base = (1.0 - (a[0] + a[1] + a[2])).max(0.0);
    let mut out = [0.0, 0.0, 0.0, 1.0];
    for ch in 0..3 {
        out[ch] = layers[0][ch] * base + layers[1][ch] * a[0] + layers[2][ch] * a[1] + layers[3][ch] * a[2];
    }
    out
}

/// `src` over `dst` with straight alpha, on all four channels.
pub fn blend_by_alpha(src: [f32; 4], dst: [f32; 4]) -> [f32; 4] {
    let a = src[3];
    std::array::from_fn(|i| src[i] * a + dst[i] * (1.0 - a))
}

/// Hermite step; a degenerate edge pair becomes a hard step at `e0`.
pub fn smoothstep(e0: f32, e1: f32, x: f32) -> f32 {
    if e1 <= e0 {
        return if x < e0 { 0.0 } else { 1.0 };
    }
    let t = ((x - e0) / (e1 - e0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}

/// 0 on a grid line of spacing `unit`, rising to 1 over `width`.
pub fn contour_alpha(unit: f32, pos: f32, width: f32) -> f32 {
    let f = (fract((pos + unit * 0.5) / unit) - 0.5).abs();
    let df = (width / unit).abs();
    smoothstep(0.0, df, f)
}

/// Line coverage of a square grid on the xz plane: 1 on a line, 0 between.
pub fn contour_alpha_xz(unit: f32, pos: Vec3, width: Vec3) -> f32 {
    1.0 - contour_alpha(unit, pos.x, width.x).min(contour_alpha(unit, pos.z, width.z))
}

/// GLSL `fract`: always in `[0, 1)`.
fn fract(x: f32) -> f32 {
    x - x.floor()
}

fn rainbow(p: Vec3) -> [f32; 3] {
    let h = fract((p.x + p.z) / (4.0 * CHUNK_SIZE)) * 6.0;
    let x = 1.0 - (h % 2.0 - 1.0).abs();
    match h as u32 {
        0 => [1.0, x, 0.0],
        1 => [x, 1.0, 0.0],
        2 => [0.0, 1.0, x],
        3 => [0.0, x, 1.0],
        4 => [x, 0.0, 1.0],
        _ => [1.0, 0.0, x],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniforms::{CursorCircle, LightSettings};

    fn flat_light() -> TerrainUniforms {
        TerrainUniforms {
            light: LightSettings {
                direction: Vec3::UP,
                diffuse: [0.0; 3],
                ambient: [1.0; 3],
            },
            ..TerrainUniforms::default()
        }
    }

    fn close(a: [f32; 4], b: [f32; 4]) -> bool {
        a.iter().zip(b.iter()).all(|(x, y)| (x - y).abs() < 1e-4)
    }

    #[test]
    fn order_is_fixed() {
        assert_eq!(COMPOSITE_ORDER[0], Stage::TextureBlend);
        assert_eq!(COMPOSITE_ORDER[9], Stage::CursorCircle);
        let fog = COMPOSITE_ORDER.iter().position(|s| *s == Stage::Fog).unwrap();
        let wire = COMPOSITE_ORDER.iter().position(|s| *s == Stage::Wireframe).unwrap();
        assert!(fog < wire);
    }

    #[test]
    fn blend_weights_sum_to_one() {
        let layers = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0], [1.0, 1.0, 1.0]];
        let c = texture_blend(2, &layers, &[0.25, 0.5, 0.5]);
        assert!(close(c, [0.75, 0.25, 0.0, 1.0]));
        assert_eq!(texture_blend(0, &layers, &[1.0; 3]), [1.0; 4]);
    }

    #[test]
    fn untextured_flat_fragment_is_white() {
        let c = shade_fragment(&flat_light(), &ChunkUniforms::default(), &Fragment::default());
        assert!(close(c, [1.0; 4]));
    }

    #[test]
    fn shadow_and_paint_warning_darken() {
        let u = flat_light();
        let frag = Fragment {
            shadow: 0.5,
            ..Fragment::default()
        };
        let chunk = ChunkUniforms {
            cant_paint: true,
            ..ChunkUniforms::default()
        };
        assert!(close(shade_fragment(&u, &chunk, &frag), [0.5, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn impassible_tint_is_applied_before_shadow() {
        let u = flat_light();
        let chunk = ChunkUniforms {
            layer_count: 1,
            impassible: true,
            ..ChunkUniforms::default()
        };
        let frag = Fragment {
            layers: [[0.0; 3]; 4],
            shadow: 1.0,
            ..Fragment::default()
        };
        // Tinted to half white, then fully shadowed.
        assert!(close(shade_fragment(&u, &chunk, &frag), [0.0, 0.0, 0.0, 1.0]));
        let lit = Fragment { shadow: 0.0, ..frag };
        assert!(close(shade_fragment(&u, &chunk, &lit), [0.5, 0.5, 0.5, 1.0]));
    }

    #[test]
    fn fog_covers_far_fragments() {
        let mut u = flat_light();
        u.draw_fog = true;
        let far = Fragment {
            position: Vec3::new(1000.0, 0.0, 0.0),
            ..Fragment::default()
        };
        let [r, g, b] = u.fog.color;
        assert_eq!(shade_fragment(&u, &ChunkUniforms::default(), &far), [r, g, b, 1.0]);
        let near = Fragment::default();
        assert!(close(shade_fragment(&u, &ChunkUniforms::default(), &near), [1.0; 4]));
    }

    #[test]
    fn grid_lines_suppress_the_wireframe() {
        let mut u = flat_light();
        u.draw_lines = true;
        u.draw_wireframe = true;
        u.wireframe.color = [0.0, 0.0, 0.0, 1.0];
        let on_chunk_line = Fragment {
            position: Vec3::new(CHUNK_SIZE * 3.0, 0.0, CHUNK_SIZE * 0.5 + 0.3),
            fwidth: Vec3::new(0.5, 0.0, 0.5),
            ..Fragment::default()
        };
        let c = shade_fragment(&u, &ChunkUniforms::default(), &on_chunk_line);
        assert!(close(c, [0.8, 0.0, 0.0, 1.0]));

        u.draw_lines = false;
        let c = shade_fragment(&u, &ChunkUniforms::default(), &on_chunk_line);
        assert!(close(c, [0.0, 0.0, 0.0, 1.0]));
    }

    #[test]
    fn cursor_ring_is_drawn_last() {
        let mut u = flat_light();
        u.draw_fog = true;
        u.fog.distance = 50.0;
        u.camera = Vec3::new(0.0, 0.0, 0.0);
        u.cursor = Some(CursorCircle {
            position: Vec3::ZERO,
            radius: 10.0,
            inner_ratio: 0.5,
            color: [0.0, 0.0, 1.0, 1.0],
        });
        let ring = Fragment {
            position: Vec3::new(10.0, 0.0, 0.0),
            fwidth: Vec3::new(0.5, 0.0, 0.5),
            ..Fragment::default()
        };
        assert!(close(shade_fragment(&u, &ChunkUniforms::default(), &ring), [0.0, 0.0, 1.0, 1.0]));
        let inner = Fragment {
            position: Vec3::new(0.0, 0.0, 5.0),
            ..ring
        };
        assert!(close(shade_fragment(&u, &ChunkUniforms::default(), &inner), [0.0, 0.0, 1.0, 1.0]));
        let between = Fragment {
            position: Vec3::new(7.5, 0.0, 0.0),
            ..ring
        };
        assert!(shade_fragment(&u, &ChunkUniforms::default(), &between)[0] > 0.5);
    }

    #[test]
    fn contour_is_zero_on_the_line() {
        assert_eq!(contour_alpha(4.0, 8.0, 0.5), 0.0);
        assert_eq!(contour_alpha(4.0, 10.0, 0.5), 1.0);
        assert_eq!(contour_alpha_xz(4.0, Vec3::new(8.0, 0.0, 1.0), Vec3::splat(0.5)), 1.0);
        assert_eq!(contour_alpha_xz(4.0, Vec3::new(2.0, 0.0, 1.0), Vec3::splat(0.5)), 0.0);
    }
}
