//! Top-down software render of one tile through `shade_fragment`.

use std::io::{self, Write};

use tilesmith_geom::{Mat4, Vec3};
use tilesmith_terrain::{ALPHA_SIZE, CHUNK_SIZE, Chunk, TILE_SIZE, TextureName, Tile, UNIT_SIZE};

use crate::frame::{FrameBuilder, FrameParams};
use crate::shade::{Fragment, shade_fragment};

/// Darkening applied to shadowed alpha texels.
pub const SHADOW_STRENGTH: f32 = 0.6;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PreviewImage {
    pub width: usize,
    pub height: usize,
    /// Row-major RGB8.
    pub rgb: Vec<u8>,
}

impl PreviewImage {
    pub fn pixel(&self, x: usize, y: usize) -> [u8; 3] {
        let i = (y * self.width + x) * 3;
        [self.rgb[i], self.rgb[i + 1], self.rgb[i + 2]]
    }

    /// Binary PPM.
    pub fn write_ppm(&self, mut out: impl Write) -> io::Result<()> {
        write!(out, "P6\n{} {}\n255\n", self.width, self.height)?;
        out.write_all(&self.rgb)
    }
}

/// Renders `tile` into a `size` x `size` image seen straight from above.
/// The projection is orthographic, so fog is skipped. Holes stay black.
pub fn render_tile(
    builder: &mut FrameBuilder,
    tile: &Tile,
    size: usize,
    params: &FrameParams,
    layer_color: impl Fn(&TextureName) -> [f32; 3],
) -> PreviewImage {
    let mut uniforms = builder.terrain_uniforms(params);
    uniforms.draw_fog = false;
    let step = TILE_SIZE / size.max(1) as f32;
    let mut rgb = vec![0u8; size * size * 3];

    for py in 0..size {
        for px in 0..size {
            let x = tile.xbase() + (px as f32 + 0.5) * step;
            let z = tile.zbase() + (py as f32 + 0.5) * step;
            let Some(chunk) = tile.chunk_at(x, z) else {
                continue;
            };
            if chunk.is_hole(x, z) {
                continue;
            }
            let Some(frag) = fragment_at(tile, chunk, x, z, step, &layer_color) else {
                continue;
            };
            uniforms.camera = frag.position + Vec3::new(0.0, TILE_SIZE, 0.0);
            let chunk_uniforms = builder.chunk_uniforms(chunk, params.paint_texture);
            let c = shade_fragment(&uniforms, &chunk_uniforms, &frag);
            let i = (py * size + px) * 3;
            for k in 0..3 {
                rgb[i + k] = (c[k].clamp(0.0, 1.0) * 255.0).round() as u8;
            }
        }
    }
    PreviewImage {
        width: size,
        height: size,
        rgb,
    }
}

/// Same as `render_tile` with a camera above the tile centre.
pub fn render_tile_default(
    builder: &mut FrameBuilder,
    tile: &Tile,
    size: usize,
    layer_color: impl Fn(&TextureName) -> [f32; 3],
) -> PreviewImage {
    let centre = tile.aabb().center();
    let params = FrameParams::new(Mat4::default(), centre);
    render_tile(builder, tile, size, &params, layer_color)
}

fn fragment_at(
    tile: &Tile,
    chunk: &Chunk,
    x: f32,
    z: f32,
    step: f32,
    layer_color: &impl Fn(&TextureName) -> [f32; 3],
) -> Option<Fragment> {
    let h = chunk.height_at(x, z)?;
    let e = UNIT_SIZE * 0.5;
    let sample = |sx: f32, sz: f32| tile.height_at(sx, sz).unwrap_or(h);
    let dx = (sample(x + e, z) - sample(x - e, z)) / (2.0 * e);
    let dz = (sample(x, z + e) - sample(x, z - e)) / (2.0 * e);
    let normal = Vec3::new(-dx, 1.0, -dz).normalized();

    let texel = CHUNK_SIZE / ALPHA_SIZE as f32;
    let tx = (((x - chunk.xbase) / texel) as usize).min(ALPHA_SIZE - 1);
    let ty = (((z - chunk.zbase) / texel) as usize).min(ALPHA_SIZE - 1);
    let set = &chunk.textures;
    let mut layers = [[1.0; 3]; 4];
    let mut alpha = [0.0; 3];
    for (i, layer) in set.layers().iter().enumerate().take(4) {
        layers[i] = layer_color(&layer.texture);
        if i > 0 {
            alpha[i - 1] = set.weight(i, tx, ty) as f32 / 255.0;
        }
    }

    let nearest = nearest_vertex(chunk, x, z);
    let mccv = chunk.colors()[nearest].to_rgb();
    let shadow = if chunk.shadow_at(tx, ty) {
        SHADOW_STRENGTH
    } else {
        0.0
    };
    Some(Fragment {
        position: Vec3::new(x, h, z),
        normal,
        layers,
        alpha,
        mccv,
        shadow,
        fwidth: Vec3::new(step, (dx.abs() + dz.abs()) * step, step),
    })
}

fn nearest_vertex(chunk: &Chunk, x: f32, z: f32) -> usize {
    let u = ((x - chunk.xbase) / UNIT_SIZE).clamp(0.0, 8.0);
    let v = ((z - chunk.zbase) / UNIT_SIZE).clamp(0.0, 8.0);
    let (col, row) = (u.floor().min(7.0), v.floor().min(7.0));
    let (fu, fv) = (u - col, v - row);
    let (col, row) = (col as usize, row as usize);
    let centre = (fu - 0.5).abs() + (fv - 0.5).abs() < 0.5;
    if centre {
        tilesmith_terrain::chunk::inner_index(row, col)
    } else {
        tilesmith_terrain::chunk::outer_index(row + fv.round() as usize, col + fu.round() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uniforms::{LightSettings, RenderSettings};
    use tilesmith_terrain::TileIndex;

    fn builder() -> FrameBuilder {
        let mut settings = RenderSettings::default();
        settings.light = LightSettings {
            direction: Vec3::UP,
            diffuse: [0.0; 3],
            ambient: [1.0; 3],
        };
        FrameBuilder::new(settings)
    }

    #[test]
    fn flat_untextured_tile_is_white_with_black_holes() {
        let mut tile = Tile::flat(TileIndex::new(10, 12), 5.0, false);
        tile.chunk_mut(0, 0).holes = 0xffff;
        let img = render_tile_default(&mut builder(), &tile, 64, |_| [0.0; 3]);
        assert_eq!(img.pixel(1, 1), [0, 0, 0]);
        assert_eq!(img.pixel(3, 3), [0, 0, 0]);
        assert_eq!(img.pixel(4, 0), [255, 255, 255]);
        assert_eq!(img.pixel(63, 63), [255, 255, 255]);
    }

    #[test]
    fn ppm_has_header_and_payload() {
        let tile = Tile::flat(TileIndex::new(1, 1), 0.0, false);
        let img = render_tile_default(&mut builder(), &tile, 16, |_| [0.5; 3]);
        let mut out = Vec::new();
        img.write_ppm(&mut out).unwrap();
        let header = b"P6\n16 16\n255\n";
        assert!(out.starts_with(header));
        assert_eq!(out.len(), header.len() + 16 * 16 * 3);
    }

    #[test]
    fn nearest_vertex_picks_inner_in_the_quad_centre() {
        let c = Chunk::flat(TileIndex::new(0, 0), 0, 0, 0.0);
        let x = c.xbase + UNIT_SIZE * 2.5;
        let z = c.zbase + UNIT_SIZE * 3.5;
        assert_eq!(nearest_vertex(&c, x, z), tilesmith_terrain::chunk::inner_index(3, 2));
        let x = c.xbase + UNIT_SIZE * 2.05;
        let z = c.zbase + UNIT_SIZE * 2.95;
        assert_eq!(nearest_vertex(&c, x, z), tilesmith_terrain::chunk::outer_index(3, 2));
    }
}
