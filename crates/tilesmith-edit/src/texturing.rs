use core::f32::consts::TAU;

use rand::Rng;
use tilesmith_geom::Vec3;
use tilesmith_terrain::{Brush, PaintOutcome, TextureName};

use crate::context::EditContext;

/// What one brush stroke did across the chunks it touched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PaintReport {
    /// Chunks whose layers changed.
    pub painted: usize,
    /// Chunks with four layers and no room for the texture.
    pub refused: usize,
}

impl PaintReport {
    pub fn changed(self) -> bool {
        self.painted > 0
    }

    /// Part of the stroke landed and part was refused.
    pub fn is_partial(self) -> bool {
        self.painted > 0 && self.refused > 0
    }

    /// `Painted` if any chunk changed, else `NoFreeSlot` if any refused.
    pub fn outcome(self) -> PaintOutcome {
        if self.painted > 0 {
            PaintOutcome::Painted
        } else if self.refused > 0 {
            PaintOutcome::NoFreeSlot
        } else {
            PaintOutcome::Unchanged
        }
    }
}

impl EditContext<'_> {
    pub fn paint_texture(
        &mut self,
        pos: Vec3,
        brush: &Brush,
        strength: f32,
        pressure: f32,
        texture: &TextureName,
    ) -> PaintReport {
        let keys = self.chunks_in_range(pos, brush.reach());
        let mut refused = 0usize;
        let changed = self.apply(&keys, |c| {
            match c.paint_texture(pos, brush, strength, pressure, texture) {
                PaintOutcome::Painted => true,
                PaintOutcome::NoFreeSlot => {
                    refused += 1;
                    false
                }
                PaintOutcome::Unchanged => false,
            }
        });
        if refused > 0 {
            log::debug!(target: "edit", "{} chunk(s) have no free slot for {}", refused, texture);
        }
        self.commit(&changed, false);
        PaintReport {
            painted: changed.len(),
            refused,
        }
    }

    /// Scatters brush dabs over a disk of `spray_size` brush radii.
    pub fn spray_texture(
        &mut self,
        pos: Vec3,
        brush: &Brush,
        strength: f32,
        pressure: f32,
        texture: &TextureName,
    ) -> bool {
        if brush.is_noop() {
            return false;
        }
        let size = brush.radius * self.settings.spray_size.max(0.0);
        let ratio = size / brush.radius;
        let dabs = (self.settings.spray_density * ratio * ratio).round().max(1.0) as usize;
        let mut changed = false;
        for _ in 0..dabs {
            let r = size * self.rng.gen_range(0.0f32..1.0).sqrt();
            let a = self.rng.gen_range(0.0f32..TAU);
            let at = Vec3::new(pos.x + r * a.cos(), pos.y, pos.z + r * a.sin());
            changed |= self
                .paint_texture(at, brush, strength, pressure, texture)
                .changed();
        }
        changed
    }

    /// Swaps `old` for `new` on chunks the circle touches.
    pub fn replace_texture(
        &mut self,
        pos: Vec3,
        radius: f32,
        old: &TextureName,
        new: &TextureName,
    ) -> bool {
        let keys = self.chunks_in_range(pos, radius);
        let changed = self.apply(&keys, |c| c.replace_texture(pos, radius, old, new));
        self.commit(&changed, false)
    }

    /// Removes every layer of the chunk under `pos`.
    pub fn erase_textures(&mut self, pos: Vec3) -> bool {
        let keys: Vec<_> = self.chunk_at(pos).into_iter().collect();
        let changed = self.apply(&keys, |c| c.textures.erase_textures());
        self.commit(&changed, false)
    }

    /// Removes every layer on the tile under `pos`.
    pub fn clear_textures(&mut self, pos: Vec3) -> bool {
        let keys = self.chunks_on_tile(pos);
        let changed = self.apply(&keys, |c| c.textures.erase_textures());
        self.commit(&changed, false)
    }

    /// Leaves `texture` as the only layer on every chunk of the tile.
    pub fn set_base_texture(&mut self, pos: Vec3, texture: &TextureName) -> bool {
        let keys = self.chunks_on_tile(pos);
        let changed = self.apply(&keys, |c| {
            let already = c.textures.len() == 1 && c.textures.position(texture) == Some(0);
            if already {
                return false;
            }
            c.textures.erase_textures();
            c.textures.add_texture(texture.clone());
            true
        });
        self.commit(&changed, false)
    }

    /// Retargets `old` to `new` on every chunk of the tile.
    pub fn swap_texture(&mut self, pos: Vec3, old: &TextureName, new: &TextureName) -> bool {
        let keys = self.chunks_on_tile(pos);
        let changed = self.apply(&keys, |c| c.textures.switch_texture(old, new));
        self.commit(&changed, false)
    }

    pub fn remove_texture_duplicates(&mut self, pos: Vec3) -> bool {
        let keys = self.chunks_on_tile(pos);
        let changed = self.apply(&keys, |c| c.textures.remove_duplicate());
        self.commit(&changed, false)
    }

    /// Sets or clears a layer flag on the chunk under `pos`.
    pub fn change_texture_flag(
        &mut self,
        pos: Vec3,
        texture: &TextureName,
        flag: u32,
        add: bool,
    ) -> bool {
        let keys: Vec<_> = self.chunk_at(pos).into_iter().collect();
        let changed = self.apply(&keys, |c| c.textures.change_texture_flag(texture, flag, add));
        self.commit(&changed, false)
    }
}
