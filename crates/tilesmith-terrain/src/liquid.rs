//! Per-chunk liquid layers: a 9x9 height/depth grid with an 8x8 cell mask.

use tilesmith_geom::{Vec3, angled_height};

use crate::UNIT_SIZE;

pub const LIQUID_VERTS: usize = 9;
pub const LIQUID_CELLS: usize = 8;

#[derive(Clone, Debug, PartialEq)]
pub struct LiquidLayer {
    pub liquid_id: u16,
    /// Vertex format of the stored samples; 0 = heights and depths.
    pub vertex_format: u16,
    pub heights: [f32; LIQUID_VERTS * LIQUID_VERTS],
    pub depths: [u8; LIQUID_VERTS * LIQUID_VERTS],
    /// Bit `row * 8 + col` set when the cell renders.
    pub mask: u64,
}

impl LiquidLayer {
    pub fn new(liquid_id: u16, height: f32) -> Self {
        Self {
            liquid_id,
            vertex_format: 0,
            heights: [height; LIQUID_VERTS * LIQUID_VERTS],
            depths: [255; LIQUID_VERTS * LIQUID_VERTS],
            mask: 0,
        }
    }

    #[inline]
    pub fn cell(&self, row: usize, col: usize) -> bool {
        self.mask & (1u64 << (row * LIQUID_CELLS + col)) != 0
    }

    #[inline]
    pub fn set_cell(&mut self, row: usize, col: usize, on: bool) {
        let bit = 1u64 << (row * LIQUID_CELLS + col);
        if on {
            self.mask |= bit;
        } else {
            self.mask &= !bit;
        }
    }

    #[inline]
    pub fn height(&self, row: usize, col: usize) -> f32 {
        self.heights[row * LIQUID_VERTS + col]
    }

    /// Min/max over vertices touching at least one visible cell.
    pub fn height_range(&self) -> Option<(f32, f32)> {
        let mut range: Option<(f32, f32)> = None;
        for row in 0..LIQUID_VERTS {
            for col in 0..LIQUID_VERTS {
                if !self.vertex_visible(row, col) {
                    continue;
                }
                let h = self.height(row, col);
                range = Some(match range {
                    Some((lo, hi)) => (lo.min(h), hi.max(h)),
                    None => (h, h),
                });
            }
        }
        range
    }

    fn vertex_visible(&self, row: usize, col: usize) -> bool {
        let rows = row.saturating_sub(1)..=row.min(LIQUID_CELLS - 1);
        rows.into_iter().any(|r| {
            (col.saturating_sub(1)..=col.min(LIQUID_CELLS - 1)).any(|c| self.cell(r, c))
        })
    }
}

/// Parameters for one liquid brush dab.
#[derive(Clone, Copy, Debug)]
pub struct LiquidPaint {
    pub pos: Vec3,
    pub radius: f32,
    pub liquid_id: u16,
    /// `false` removes liquid under the brush.
    pub add: bool,
    /// Radians.
    pub angle: f32,
    /// Radians.
    pub orientation: f32,
    /// Place heights on the tilted plane through `origin` instead of `pos.y`.
    pub lock: bool,
    pub origin: Vec3,
    pub override_height: bool,
    pub override_liquid_id: bool,
    pub opacity_factor: f32,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LiquidSurface {
    pub layers: Vec<LiquidLayer>,
}

impl LiquidSurface {
    pub fn is_empty(&self) -> bool {
        self.layers.iter().all(|l| l.mask == 0)
    }

    pub fn liquid_type(&self, layer: usize) -> Option<u16> {
        self.layers.get(layer).map(|l| l.liquid_id)
    }

    pub fn set_liquid_type(&mut self, layer: usize, liquid_id: u16) -> bool {
        match self.layers.get_mut(layer) {
            Some(l) if l.liquid_id != liquid_id => {
                l.liquid_id = liquid_id;
                true
            }
            _ => false,
        }
    }

    pub fn height_range(&self) -> Option<(f32, f32)> {
        self.layers
            .iter()
            .filter_map(LiquidLayer::height_range)
            .reduce(|a, b| (a.0.min(b.0), a.1.max(b.1)))
    }

    /// Applies a brush dab to the first layer of the chunk at `(xbase, zbase)`.
    /// `terrain` gives the ground height under each liquid vertex.
    pub fn paint(
        &mut self,
        xbase: f32,
        zbase: f32,
        p: &LiquidPaint,
        terrain: impl Fn(usize, usize) -> f32,
    ) -> bool {
        if !(p.radius > 0.0) {
            return false;
        }
        if self.layers.is_empty() {
            if !p.add {
                return false;
            }
            self.layers.push(LiquidLayer::new(p.liquid_id, p.pos.y));
        }
        let Some(layer) = self.layers.first_mut() else {
            return false;
        };
        let was_empty = layer.mask == 0;
        let mut changed = false;
        if p.add && (was_empty || p.override_liquid_id) && layer.liquid_id != p.liquid_id {
            layer.liquid_id = p.liquid_id;
            changed = true;
        }
        for row in 0..LIQUID_CELLS {
            for col in 0..LIQUID_CELLS {
                let cx = xbase + (col as f32 + 0.5) * UNIT_SIZE;
                let cz = zbase + (row as f32 + 0.5) * UNIT_SIZE;
                let dx = cx - p.pos.x;
                let dz = cz - p.pos.z;
                if (dx * dx + dz * dz).sqrt() > p.radius {
                    continue;
                }
                if !p.add {
                    if layer.cell(row, col) {
                        layer.set_cell(row, col, false);
                        changed = true;
                    }
                    continue;
                }
                let fresh = !layer.cell(row, col);
                layer.set_cell(row, col, true);
                changed |= fresh;
                if !(fresh || p.override_height) {
                    continue;
                }
                for (vr, vc) in [(row, col), (row, col + 1), (row + 1, col), (row + 1, col + 1)] {
                    let vx = xbase + vc as f32 * UNIT_SIZE;
                    let vz = zbase + vr as f32 * UNIT_SIZE;
                    let h = if p.lock {
                        angled_height(p.origin, vx, vz, p.angle, p.orientation)
                    } else {
                        p.pos.y
                    };
                    let i = vr * LIQUID_VERTS + vc;
                    let depth = ((h - terrain(vr, vc)) * p.opacity_factor).clamp(0.0, 1.0);
                    let depth = (depth * 255.0).round() as u8;
                    if layer.heights[i] != h || layer.depths[i] != depth {
                        layer.heights[i] = h;
                        layer.depths[i] = depth;
                        changed = true;
                    }
                }
            }
        }
        if !p.add {
            self.layers.retain(|l| l.mask != 0);
        }
        changed
    }

    /// Depth/opacity from the liquid height above the ground.
    pub fn auto_gen_depth(&mut self, factor: f32, terrain: impl Fn(usize, usize) -> f32) -> bool {
        let mut changed = false;
        for layer in self.layers.iter_mut() {
            for row in 0..LIQUID_VERTS {
                for col in 0..LIQUID_VERTS {
                    let i = row * LIQUID_VERTS + col;
                    let d = ((layer.heights[i] - terrain(row, col)) * factor).clamp(0.0, 1.0);
                    let d = (d * 255.0).round() as u8;
                    if layer.depths[i] != d {
                        layer.depths[i] = d;
                        changed = true;
                    }
                }
            }
        }
        changed
    }

    /// Hides cells whose four corners are all under the ground.
    pub fn crop(&mut self, terrain: impl Fn(usize, usize) -> f32) -> bool {
        let mut changed = false;
        for layer in self.layers.iter_mut() {
            for row in 0..LIQUID_CELLS {
                for col in 0..LIQUID_CELLS {
                    if !layer.cell(row, col) {
                        continue;
                    }
                    let buried = [(row, col), (row, col + 1), (row + 1, col), (row + 1, col + 1)]
                        .into_iter()
                        .all(|(r, c)| terrain(r, c) > layer.height(r, c));
                    if buried {
                        layer.set_cell(row, col, false);
                        changed = true;
                    }
                }
            }
        }
        self.layers.retain(|l| l.mask != 0);
        changed
    }
}
