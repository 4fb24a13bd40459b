//! One 1/16th-tile heightfield chunk.
//!
//! Vertices are stored as 17 interleaved rows: 9 outer vertices on the unit
//! grid, then 8 inner vertices at the cell centres, repeated, ending with an
//! outer row. Heights are absolute world heights; the relative values read
//! from a file are kept until the first edit so they can be written back
//! unchanged.

use tilesmith_geom::{Aabb, Vec3, angled_height};

use crate::brush::Brush;
use crate::coords::{ChunkKey, TileIndex};
use crate::liquid::{LiquidPaint, LiquidSurface};
use crate::texture_set::{PaintOutcome, TextureName, TextureSet};
use crate::{CHUNK_SIZE, CHUNKS_PER_SIDE, HOLE_SIZE, MAP_VERTICES, UNIT_SIZE, UNITS_PER_CHUNK};

/// Ground height lookup across chunk and tile boundaries.
pub trait HeightSampler {
    fn sample_height(&self, x: f32, z: f32) -> Option<f32>;
}

impl<F> HeightSampler for F
where
    F: Fn(f32, f32) -> Option<f32>,
{
    #[inline]
    fn sample_height(&self, x: f32, z: f32) -> Option<f32> {
        self(x, z)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct ChunkFlags(pub u32);

impl ChunkFlags {
    pub const HAS_SHADOW: u32 = 0x1;
    pub const IMPASSIBLE: u32 = 0x2;
    pub const LIQUID_RIVER: u32 = 0x4;
    pub const LIQUID_OCEAN: u32 = 0x8;
    pub const LIQUID_MAGMA: u32 = 0x10;
    pub const LIQUID_SLIME: u32 = 0x20;
    pub const HAS_VERTEX_COLORS: u32 = 0x40;
    pub const DO_NOT_FIX_ALPHA: u32 = 0x8000;

    #[inline]
    pub fn contains(self, bits: u32) -> bool {
        self.0 & bits == bits
    }

    #[inline]
    pub fn set(&mut self, bits: u32, on: bool) {
        if on {
            self.0 |= bits;
        } else {
            self.0 &= !bits;
        }
    }
}

/// Vertex tint in file order (BGRA); 127 is a neutral 1.0.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexColor {
    pub b: u8,
    pub g: u8,
    pub r: u8,
    pub a: u8,
}

impl VertexColor {
    pub const NEUTRAL: VertexColor = VertexColor {
        b: 127,
        g: 127,
        r: 127,
        a: 127,
    };

    pub fn to_rgb(self) -> [f32; 3] {
        [
            self.r as f32 / 127.0,
            self.g as f32 / 127.0,
            self.b as f32 / 127.0,
        ]
    }

    pub fn from_rgb(rgb: [f32; 3]) -> Self {
        let q = |v: f32| (v * 127.0).round().clamp(0.0, 255.0) as u8;
        Self {
            b: q(rgb[2]),
            g: q(rgb[1]),
            r: q(rgb[0]),
            a: 127,
        }
    }
}

impl Default for VertexColor {
    fn default() -> Self {
        Self::NEUTRAL
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FlattenMode {
    #[default]
    Both,
    RaiseOnly,
    LowerOnly,
}

/// Header fields carried through load/save untouched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ChunkExtras {
    pub low_quality_textures: [u8; 16],
    pub no_effect_doodad: u64,
}

#[inline]
pub const fn outer_index(row: usize, col: usize) -> usize {
    row * 17 + col
}

#[inline]
pub const fn inner_index(row: usize, col: usize) -> usize {
    row * 17 + 9 + col
}

/// Vertex offset from the chunk corner, in grid units.
#[inline]
pub fn vertex_offset(i: usize) -> (f32, f32) {
    let row = i / 17;
    let col = i % 17;
    if col < 9 {
        (col as f32, row as f32)
    } else {
        (col as f32 - 9.0 + 0.5, row as f32 + 0.5)
    }
}

/// Outer vertices shared with the chunk `(dx, dz)` steps away, as
/// `(own index, neighbour index)` pairs. Only the eight surrounding chunks
/// share any.
pub fn shared_vertices(dx: i32, dz: i32) -> impl Iterator<Item = (usize, usize)> {
    fn span(d: i32) -> core::ops::RangeInclusive<usize> {
        match d {
            -1 => 0..=0,
            0 => 0..=8,
            1 => 8..=8,
            _ => 1..=0,
        }
    }
    let (cols, rows) = if (dx, dz) == (0, 0) {
        (span(2), span(2))
    } else {
        (span(dx), span(dz))
    };
    let mirror = |own: usize, d: i32| (own as i32 - 8 * d) as usize;
    rows.flat_map(move |r| {
        cols.clone()
            .map(move |c| (outer_index(r, c), outer_index(mirror(r, dz), mirror(c, dx))))
    })
}

#[inline]
pub fn is_edge_vertex(i: usize) -> bool {
    let row = i / 17;
    let col = i % 17;
    col < 9 && (row == 0 || row == 8 || col == 0 || col == 8)
}

#[derive(Clone, Debug, PartialEq)]
pub struct Chunk {
    pub cx: usize,
    pub cz: usize,
    pub xbase: f32,
    pub zbase: f32,
    pub ybase: f32,
    heights: [f32; MAP_VERTICES],
    normals: [Vec3; MAP_VERTICES],
    colors: [VertexColor; MAP_VERTICES],
    pub holes: u16,
    pub area_id: u32,
    pub flags: ChunkFlags,
    /// 64x64 bits, row-major, LSB first.
    pub shadow: Option<Box<[u8; 512]>>,
    pub textures: TextureSet,
    pub liquid: LiquidSurface,
    pub extras: ChunkExtras,
    min_y: f32,
    max_y: f32,
    file_heights: Option<(f32, Box<[f32; MAP_VERTICES]>)>,
    /// Corner on the whole-map vertex lattice, in units.
    lattice: (f32, f32),
}

impl Chunk {
    /// Flat chunk at `height` with neutral colours and up normals.
    pub fn flat(tile: TileIndex, cx: usize, cz: usize, height: f32) -> Self {
        let key = ChunkKey::new(tile, cx, cz);
        Self {
            cx,
            cz,
            xbase: key.xbase(),
            zbase: key.zbase(),
            ybase: height,
            heights: [height; MAP_VERTICES],
            normals: [Vec3::UP; MAP_VERTICES],
            colors: [VertexColor::NEUTRAL; MAP_VERTICES],
            holes: 0,
            area_id: 0,
            flags: ChunkFlags::default(),
            shadow: None,
            textures: TextureSet::new(),
            liquid: LiquidSurface::default(),
            extras: ChunkExtras::default(),
            min_y: height,
            max_y: height,
            file_heights: None,
            lattice: key.lattice_origin(),
        }
    }

    /// Builds a chunk from decoded vertex arrays.
    pub fn from_parts(
        tile: TileIndex,
        cx: usize,
        cz: usize,
        ybase: f32,
        heights: [f32; MAP_VERTICES],
        normals: [Vec3; MAP_VERTICES],
        colors: [VertexColor; MAP_VERTICES],
    ) -> Self {
        let mut c = Self::flat(tile, cx, cz, ybase);
        c.heights = heights;
        c.normals = normals;
        c.colors = colors;
        c.update_bounds();
        c
    }

    /// Builds a chunk from heights relative to `ybase`, as stored on disk.
    pub fn from_file(
        tile: TileIndex,
        cx: usize,
        cz: usize,
        ybase: f32,
        relative: [f32; MAP_VERTICES],
        normals: [Vec3; MAP_VERTICES],
        colors: [VertexColor; MAP_VERTICES],
    ) -> Self {
        let heights = relative.map(|h| ybase + h);
        let mut c = Self::from_parts(tile, cx, cz, ybase, heights, normals, colors);
        c.file_heights = Some((ybase, Box::new(relative)));
        c
    }

    /// Heights relative to `ybase`. Untouched file data comes back verbatim.
    pub fn relative_heights(&self) -> [f32; MAP_VERTICES] {
        match &self.file_heights {
            Some((base, rel)) if base.to_bits() == self.ybase.to_bits() => **rel,
            _ => self.heights.map(|h| h - self.ybase),
        }
    }

    pub fn key(&self, tile: TileIndex) -> ChunkKey {
        ChunkKey::new(tile, self.cx, self.cz)
    }

    #[inline]
    pub fn heights(&self) -> &[f32; MAP_VERTICES] {
        &self.heights
    }

    #[inline]
    pub fn normals(&self) -> &[Vec3; MAP_VERTICES] {
        &self.normals
    }

    #[inline]
    pub fn colors(&self) -> &[VertexColor; MAP_VERTICES] {
        &self.colors
    }

    #[inline]
    pub fn height(&self, i: usize) -> f32 {
        self.heights[i]
    }

    #[inline]
    pub fn vertex_xz(&self, i: usize) -> (f32, f32) {
        let (ox, oz) = vertex_offset(i);
        ((self.lattice.0 + ox) * UNIT_SIZE, (self.lattice.1 + oz) * UNIT_SIZE)
    }

    pub fn vertex_position(&self, i: usize) -> Vec3 {
        let (x, z) = self.vertex_xz(i);
        Vec3::new(x, self.heights[i], z)
    }

    #[inline]
    pub fn min_height(&self) -> f32 {
        self.min_y
    }

    #[inline]
    pub fn max_height(&self) -> f32 {
        self.max_y
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::new(
            Vec3::new(self.xbase, self.min_y, self.zbase),
            Vec3::new(self.xbase + CHUNK_SIZE, self.max_y, self.zbase + CHUNK_SIZE),
        )
    }

    #[inline]
    pub fn contains_xz(&self, x: f32, z: f32) -> bool {
        x >= self.xbase
            && x <= self.xbase + CHUNK_SIZE
            && z >= self.zbase
            && z <= self.zbase + CHUNK_SIZE
    }

    fn update_bounds(&mut self) {
        let (lo, hi) = self
            .heights
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &h| {
                (lo.min(h), hi.max(h))
            });
        self.min_y = lo;
        self.max_y = hi;
    }

    /// Writes absolute heights; returns whether any value changed.
    pub fn apply_heights(&mut self, updates: &[(usize, f32)]) -> bool {
        let mut changed = false;
        for &(i, h) in updates {
            if i < MAP_VERTICES && self.heights[i] != h {
                self.heights[i] = h;
                changed = true;
            }
        }
        if changed {
            self.file_heights = None;
            self.update_bounds();
        }
        changed
    }

    pub fn set_vertex_height(&mut self, i: usize, h: f32) -> bool {
        self.apply_heights(&[(i, h)])
    }

    /// Interpolated ground height on the chunk's triangle mesh.
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        const EPS: f32 = 1e-3;
        let fx = (x - self.xbase) / UNIT_SIZE;
        let fz = (z - self.zbase) / UNIT_SIZE;
        if !(-EPS..=8.0 + EPS).contains(&fx) || !(-EPS..=8.0 + EPS).contains(&fz) {
            return None;
        }
        let fx = fx.clamp(0.0, 8.0);
        let fz = fz.clamp(0.0, 8.0);
        let col = (fx.floor() as usize).min(7);
        let row = (fz.floor() as usize).min(7);
        let u = fx - col as f32;
        let v = fz - row as f32;

        let tl = (0.0, 0.0, self.heights[outer_index(row, col)]);
        let tr = (1.0, 0.0, self.heights[outer_index(row, col + 1)]);
        let bl = (0.0, 1.0, self.heights[outer_index(row + 1, col)]);
        let br = (1.0, 1.0, self.heights[outer_index(row + 1, col + 1)]);
        let mid = (0.5, 0.5, self.heights[inner_index(row, col)]);

        let (a, b) = if v <= u && v <= 1.0 - u {
            (tl, tr)
        } else if v >= u && v >= 1.0 - u {
            (bl, br)
        } else if u < v {
            (tl, bl)
        } else {
            (tr, br)
        };
        Some(plane_height(a, b, mid, u, v))
    }

    pub fn is_hole(&self, x: f32, z: f32) -> bool {
        self.holes & hole_bit(self.xbase, self.zbase, x, z) != 0
    }

    /// `big` toggles the whole chunk; otherwise the hole cell under `pos`.
    pub fn set_hole(&mut self, pos: Vec3, big: bool, hole: bool) -> bool {
        let mask = if big {
            0xFFFF
        } else {
            hole_bit(self.xbase, self.zbase, pos.x, pos.z)
        };
        let before = self.holes;
        if hole {
            self.holes |= mask;
        } else {
            self.holes &= !mask;
        }
        before != self.holes
    }

    pub fn set_area_id(&mut self, id: u32) -> bool {
        let changed = self.area_id != id;
        self.area_id = id;
        changed
    }

    pub fn change_terrain(&mut self, pos: Vec3, delta: f32, brush: &Brush) -> bool {
        if brush.is_noop() || delta == 0.0 {
            return false;
        }
        let updates: Vec<(usize, f32)> = (0..MAP_VERTICES)
            .filter_map(|i| {
                let (x, z) = self.vertex_xz(i);
                let w = brush.weight_at(pos, x, z);
                (w > 0.0).then(|| (i, self.heights[i] + delta * w))
            })
            .collect();
        self.apply_heights(&updates)
    }

    #[allow(clippy::too_many_arguments)]
    pub fn flatten_terrain(
        &mut self,
        pos: Vec3,
        remain: f32,
        brush: &Brush,
        mode: FlattenMode,
        origin: Vec3,
        angle: f32,
        orientation: f32,
    ) -> bool {
        if brush.is_noop() {
            return false;
        }
        let remain = remain.clamp(0.0, 1.0);
        let mut updates = Vec::new();
        for i in 0..MAP_VERTICES {
            let (x, z) = self.vertex_xz(i);
            let w = brush.weight_at(pos, x, z);
            if w <= 0.0 {
                continue;
            }
            let h = self.heights[i];
            let target = angled_height(origin, x, z, angle, orientation);
            let keep = 1.0 - (1.0 - remain) * w;
            let new = keep * h + (1.0 - keep) * target;
            let allowed = match mode {
                FlattenMode::Both => true,
                FlattenMode::RaiseOnly => new > h,
                FlattenMode::LowerOnly => new < h,
            };
            if allowed {
                updates.push((i, new));
            }
        }
        self.apply_heights(&updates)
    }

    /// New heights for a blur dab, computed against `sampler` without mutating.
    pub fn blur_heights(
        &self,
        pos: Vec3,
        remain: f32,
        brush: &Brush,
        sampler: &impl HeightSampler,
    ) -> Vec<(usize, f32)> {
        if brush.is_noop() {
            return Vec::new();
        }
        let remain = remain.clamp(0.0, 1.0);
        let taps = blur_taps(brush.radius);
        let mut out = Vec::new();
        for i in 0..MAP_VERTICES {
            let (x, z) = self.vertex_xz(i);
            let w = brush.weight_at(pos, x, z);
            if w <= 0.0 {
                continue;
            }
            let mut total = 0.0f32;
            let mut total_weight = 0.0f32;
            for &(dx, dz, sw) in &taps {
                if let Some(h) = sampler.sample_height(x + dx, z + dz) {
                    total += h * sw;
                    total_weight += sw;
                }
            }
            if total_weight <= 0.0 {
                continue;
            }
            let average = total / total_weight;
            let keep = 1.0 - (1.0 - remain) * w;
            out.push((i, keep * self.heights[i] + (1.0 - keep) * average));
        }
        out
    }

    pub fn blur_terrain(
        &mut self,
        pos: Vec3,
        remain: f32,
        brush: &Brush,
        sampler: &impl HeightSampler,
    ) -> bool {
        let updates = self.blur_heights(pos, remain, brush, sampler);
        self.apply_heights(&updates)
    }

    /// Resets every vertex to the chunk base height.
    pub fn clear_height(&mut self) -> bool {
        let base = self.ybase;
        let updates: Vec<(usize, f32)> = (0..MAP_VERTICES).map(|i| (i, base)).collect();
        self.apply_heights(&updates)
    }

    /// Normals from diagonal finite differences; missing samples fall back
    /// to the vertex's own height.
    pub fn compute_normals(&self, sampler: &impl HeightSampler) -> [Vec3; MAP_VERTICES] {
        let half = UNIT_SIZE * 0.5;
        let mut out = [Vec3::UP; MAP_VERTICES];
        for (i, n) in out.iter_mut().enumerate() {
            let v = self.vertex_position(i);
            let sample = |dx: f32, dz: f32| {
                let h = sampler.sample_height(v.x + dx, v.z + dz).unwrap_or(v.y);
                Vec3::new(v.x + dx, h, v.z + dz) - v
            };
            let p1 = sample(-half, -half);
            let p2 = sample(half, -half);
            let p3 = sample(half, half);
            let p4 = sample(-half, half);
            let sum = p2.cross(p1) + p3.cross(p2) + p4.cross(p3) + p1.cross(p4);
            let len = sum.length();
            *n = if len > 0.0 { sum / len } else { Vec3::UP };
        }
        out
    }

    pub fn set_normals(&mut self, normals: [Vec3; MAP_VERTICES]) {
        self.normals = normals;
    }

    pub fn recalc_norms(&mut self, sampler: &impl HeightSampler) {
        self.normals = self.compute_normals(sampler);
    }

    /// Heights of the right edge column, top to bottom.
    pub fn right_edge(&self) -> [f32; 9] {
        core::array::from_fn(|r| self.heights[outer_index(r, 8)])
    }

    /// Heights of the bottom edge row, left to right.
    pub fn bottom_edge(&self) -> [f32; 9] {
        core::array::from_fn(|c| self.heights[outer_index(8, c)])
    }

    /// Snaps the left edge to a neighbour's right edge.
    pub fn apply_left_edge(&mut self, edge: &[f32; 9]) -> bool {
        let updates: Vec<(usize, f32)> =
            edge.iter().enumerate().map(|(r, &h)| (outer_index(r, 0), h)).collect();
        self.apply_heights(&updates)
    }

    /// Snaps the top edge to a neighbour's bottom edge.
    pub fn apply_top_edge(&mut self, edge: &[f32; 9]) -> bool {
        let updates: Vec<(usize, f32)> =
            edge.iter().enumerate().map(|(c, &h)| (outer_index(0, c), h)).collect();
        self.apply_heights(&updates)
    }

    pub fn fix_gap_left(&mut self, left: &Chunk) -> bool {
        self.apply_left_edge(&left.right_edge())
    }

    pub fn fix_gap_above(&mut self, above: &Chunk) -> bool {
        self.apply_top_edge(&above.bottom_edge())
    }

    /// Vertex indices within `radius` of `pos` on the ground plane.
    pub fn select_vertices(&self, pos: Vec3, radius: f32) -> Vec<usize> {
        if !(radius > 0.0) {
            return Vec::new();
        }
        (0..MAP_VERTICES)
            .filter(|&i| {
                let (x, z) = self.vertex_xz(i);
                let dx = x - pos.x;
                let dz = z - pos.z;
                (dx * dx + dz * dz).sqrt() <= radius
            })
            .collect()
    }

    pub fn paint_texture(
        &mut self,
        pos: Vec3,
        brush: &Brush,
        strength: f32,
        pressure: f32,
        texture: &TextureName,
    ) -> PaintOutcome {
        self.textures
            .paint_texture(self.xbase, self.zbase, pos, brush, strength, pressure, texture)
    }

    /// Replaces `old` with `new` when the brush circle touches the chunk.
    pub fn replace_texture(
        &mut self,
        pos: Vec3,
        radius: f32,
        old: &TextureName,
        new: &TextureName,
    ) -> bool {
        if !self.aabb().intersects_circle_xz(pos, radius) {
            return false;
        }
        self.textures.switch_texture(old, new)
    }

    /// Tints vertices toward `color` (or back to neutral when `add` is false).
    pub fn change_vertex_color(
        &mut self,
        pos: Vec3,
        color: [f32; 3],
        change: f32,
        radius: f32,
        add: bool,
    ) -> bool {
        if !(radius > 0.0) {
            return false;
        }
        let target = if add { color } else { [1.0, 1.0, 1.0] };
        let mut changed = false;
        for i in 0..MAP_VERTICES {
            let (x, z) = self.vertex_xz(i);
            let d = ((x - pos.x).powi(2) + (z - pos.z).powi(2)).sqrt();
            if d > radius {
                continue;
            }
            let k = (change * (1.0 - d / radius)).clamp(0.0, 1.0);
            let mut rgb = self.colors[i].to_rgb();
            for (c, t) in rgb.iter_mut().zip(target) {
                *c += (t - *c) * k;
            }
            let next = VertexColor::from_rgb(rgb);
            if next != self.colors[i] {
                self.colors[i] = next;
                changed = true;
            }
        }
        if changed {
            self.flags.set(ChunkFlags::HAS_VERTEX_COLORS, true);
        }
        changed
    }

    fn outer_height(&self, row: usize, col: usize) -> f32 {
        self.heights[outer_index(row, col)]
    }

    pub fn paint_liquid(&mut self, paint: &LiquidPaint) -> bool {
        let heights = self.heights;
        let changed = self.liquid.paint(self.xbase, self.zbase, paint, |r, c| {
            heights[outer_index(r, c)]
        });
        if changed {
            self.sync_liquid_flags();
        }
        changed
    }

    pub fn auto_gen_liquid_depth(&mut self, factor: f32) -> bool {
        let heights = self.heights;
        self.liquid
            .auto_gen_depth(factor, |r, c| heights[outer_index(r, c)])
    }

    pub fn crop_liquid(&mut self) -> bool {
        let heights = self.heights;
        let changed = self.liquid.crop(|r, c| heights[outer_index(r, c)]);
        if changed {
            self.sync_liquid_flags();
        }
        changed
    }

    fn sync_liquid_flags(&mut self) {
        if self.liquid.is_empty() {
            self.flags.set(
                ChunkFlags::LIQUID_RIVER
                    | ChunkFlags::LIQUID_OCEAN
                    | ChunkFlags::LIQUID_MAGMA
                    | ChunkFlags::LIQUID_SLIME,
                false,
            );
        }
    }

    /// Shadow bit for alpha texel `(x, y)`.
    pub fn shadow_at(&self, x: usize, y: usize) -> bool {
        self.shadow
            .as_ref()
            .is_some_and(|s| s[y * 8 + x / 8] & (1 << (x % 8)) != 0)
    }

    /// Terrain height at the liquid grid vertex `(row, col)`.
    pub fn ground_at_liquid_vertex(&self, row: usize, col: usize) -> f32 {
        self.outer_height(row, col)
    }
}

/// Distance of the grid tap `(j, k)` from its centre.
fn tap_distance(j: i32, k: i32) -> f32 {
    let (j, k) = (j as f32, k as f32);
    (j * j + k * k).sqrt() * UNIT_SIZE
}

/// Sample offsets and weights of the blur kernel: every grid point within
/// `radius`, weighted by `1 - d / radius`. The grid stops one tile out.
fn blur_taps(radius: f32) -> Vec<(f32, f32, f32)> {
    const MAX_STEPS: i32 = (CHUNKS_PER_SIDE * UNITS_PER_CHUNK) as i32;
    let steps = ((radius / UNIT_SIZE).floor() as i32).clamp(0, MAX_STEPS);
    let mut taps = Vec::new();
    for j in -steps..=steps {
        for k in -steps..=steps {
            let d = tap_distance(j, k);
            if d <= radius {
                taps.push((j as f32 * UNIT_SIZE, k as f32 * UNIT_SIZE, 1.0 - d / radius));
            }
        }
    }
    taps
}

fn hole_bit(xbase: f32, zbase: f32, x: f32, z: f32) -> u16 {
    let hx = (((x - xbase) / HOLE_SIZE).floor().max(0.0) as usize).min(3);
    let hz = (((z - zbase) / HOLE_SIZE).floor().max(0.0) as usize).min(3);
    1 << (hz * 4 + hx)
}

fn plane_height(p0: (f32, f32, f32), p1: (f32, f32, f32), p2: (f32, f32, f32), u: f32, v: f32) -> f32 {
    let det = (p1.1 - p2.1) * (p0.0 - p2.0) + (p2.0 - p1.0) * (p0.1 - p2.1);
    let l0 = ((p1.1 - p2.1) * (u - p2.0) + (p2.0 - p1.0) * (v - p2.1)) / det;
    let l1 = ((p2.1 - p0.1) * (u - p2.0) + (p0.0 - p2.0) * (v - p2.1)) / det;
    let l2 = 1.0 - l0 - l1;
    l0 * p0.2 + l1 * p1.2 + l2 * p2.2
}
