//! Up to four texture layers per chunk with 64x64 blend weights.
//!
//! Layer 0 is the base layer and carries no alpha map: its weight at a
//! texel is `255 - sum(other layers)`. Every mutation keeps that sum at or
//! below 255.

use core::fmt;

use log::debug;
use tilesmith_geom::Vec3;

use crate::brush::Brush;
use crate::{ALPHA_SIZE, CHUNK_SIZE, MAX_TEXTURE_LAYERS};

const ALPHA_TEXELS: usize = ALPHA_SIZE * ALPHA_SIZE;
const TEXEL_SIZE: f32 = CHUNK_SIZE / ALPHA_SIZE as f32;

/// Case-insensitive texture path, normalized to lowercase with `/` separators.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureName(String);

impl TextureName {
    pub fn new(name: &str) -> Self {
        Self(name.trim().replace('\\', "/").to_ascii_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TextureName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TextureName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct LayerFlags(pub u32);

impl LayerFlags {
    pub const ANIMATION_ROTATION: u32 = 0x7;
    pub const ANIMATION_SPEED: u32 = 0x38;
    pub const ANIMATE: u32 = 0x40;
    pub const OVERBRIGHT: u32 = 0x80;
    pub const USE_ALPHA: u32 = 0x100;
    pub const COMPRESSED: u32 = 0x200;
    pub const SKYBOX_REFLECTION: u32 = 0x400;

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

/// 64x64 blend weights, row-major.
#[derive(Clone, PartialEq, Eq)]
pub struct AlphaMap(Box<[u8; ALPHA_TEXELS]>);

impl AlphaMap {
    pub fn zeroed() -> Self {
        Self(Box::new([0; ALPHA_TEXELS]))
    }

    pub fn filled(value: u8) -> Self {
        Self(Box::new([value; ALPHA_TEXELS]))
    }

    pub fn from_slice(values: &[u8]) -> Option<Self> {
        let arr: [u8; ALPHA_TEXELS] = values.try_into().ok()?;
        Some(Self(Box::new(arr)))
    }

    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u8 {
        self.0[y * ALPHA_SIZE + x]
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, v: u8) {
        self.0[y * ALPHA_SIZE + x] = v;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0[..]
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0[..]
    }

    pub fn is_empty(&self) -> bool {
        self.0.iter().all(|&v| v == 0)
    }
}

impl fmt::Debug for AlphaMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sum: u64 = self.0.iter().map(|&v| v as u64).sum();
        write!(f, "AlphaMap(sum={sum})")
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct TextureLayer {
    pub texture: TextureName,
    pub flags: LayerFlags,
    pub effect_id: u32,
    /// `None` on the base layer.
    pub alpha: Option<AlphaMap>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PaintOutcome {
    Painted,
    Unchanged,
    /// Four layers are in use and none could be freed.
    NoFreeSlot,
}

impl PaintOutcome {
    #[inline]
    pub fn changed(self) -> bool {
        matches!(self, PaintOutcome::Painted)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TextureSet {
    layers: Vec<TextureLayer>,
}

impl TextureSet {
    pub fn new() -> Self {
        Self { layers: Vec::new() }
    }

    /// Rebuilds a set from decoded layers. The first layer's alpha is dropped,
    /// missing alpha maps on the others become empty, and sums are clamped.
    pub fn from_layers(mut layers: Vec<TextureLayer>) -> Self {
        layers.truncate(MAX_TEXTURE_LAYERS);
        for (i, layer) in layers.iter_mut().enumerate() {
            if i == 0 {
                layer.alpha = None;
            } else if layer.alpha.is_none() {
                layer.alpha = Some(AlphaMap::zeroed());
            }
        }
        let mut set = Self { layers };
        set.normalize();
        set
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[TextureLayer] {
        &self.layers
    }

    pub fn layer(&self, i: usize) -> Option<&TextureLayer> {
        self.layers.get(i)
    }

    pub fn position(&self, texture: &TextureName) -> Option<usize> {
        self.layers.iter().position(|l| &l.texture == texture)
    }

    /// Visible weight of layer `i` at a texel, base layer included.
    pub fn weight(&self, i: usize, x: usize, y: usize) -> u8 {
        match i {
            0 if !self.layers.is_empty() => 255 - self.non_base_sum(x, y).min(255) as u8,
            _ => self
                .layers
                .get(i)
                .and_then(|l| l.alpha.as_ref())
                .map_or(0, |a| a.get(x, y)),
        }
    }

    pub fn non_base_sum(&self, x: usize, y: usize) -> u32 {
        self.layers
            .iter()
            .skip(1)
            .filter_map(|l| l.alpha.as_ref())
            .map(|a| a.get(x, y) as u32)
            .sum()
    }

    /// `None` when all four slots are taken.
    pub fn add_texture(&mut self, texture: TextureName) -> Option<usize> {
        if self.layers.len() >= MAX_TEXTURE_LAYERS {
            return None;
        }
        let alpha = (!self.layers.is_empty()).then(AlphaMap::zeroed);
        self.layers.push(TextureLayer {
            texture,
            flags: LayerFlags(if alpha.is_some() { LayerFlags::USE_ALPHA } else { 0 }),
            effect_id: 0,
            alpha,
        });
        Some(self.layers.len() - 1)
    }

    pub fn can_paint_texture(&self, texture: &TextureName) -> bool {
        self.position(texture).is_some()
            || self.layers.len() < MAX_TEXTURE_LAYERS
            || (0..self.layers.len()).any(|i| self.layer_unused(i))
    }

    pub fn erase_textures(&mut self) -> bool {
        let had = !self.layers.is_empty();
        self.layers.clear();
        had
    }

    /// Removes layer `i`; when the base goes, the next layer takes its place.
    pub fn erase_texture(&mut self, i: usize) -> bool {
        if i >= self.layers.len() {
            return false;
        }
        self.layers.remove(i);
        if i == 0 {
            if let Some(base) = self.layers.first_mut() {
                base.alpha = None;
                base.flags.set(LayerFlags::USE_ALPHA | LayerFlags::COMPRESSED, false);
            }
        }
        true
    }

    fn layer_unused(&self, i: usize) -> bool {
        match i {
            0 => {
                self.layers.len() > 1
                    && (0..ALPHA_SIZE).all(|y| (0..ALPHA_SIZE).all(|x| self.non_base_sum(x, y) >= 255))
            }
            _ => self
                .layers
                .get(i)
                .and_then(|l| l.alpha.as_ref())
                .is_none_or(AlphaMap::is_empty),
        }
    }

    /// Drops layers that are invisible everywhere. Idempotent.
    pub fn erase_unused_textures(&mut self) -> bool {
        let mut changed = false;
        let mut i = self.layers.len();
        while i > 1 {
            i -= 1;
            if self.layer_unused(i) {
                self.layers.remove(i);
                changed = true;
            }
        }
        if self.layer_unused(0) {
            // Layer 1 becomes the base; its weight is already the remainder.
            self.erase_texture(0);
            changed = true;
        }
        changed
    }

    pub fn swap_texture(&mut self, a: usize, b: usize) -> bool {
        if a == b || a >= self.layers.len() || b >= self.layers.len() {
            return false;
        }
        let (lo, hi) = (a.min(b), a.max(b));
        if lo == 0 {
            // Swapping with the base rewrites the alpha of the promoted layer.
            let mut new_hi = AlphaMap::zeroed();
            for y in 0..ALPHA_SIZE {
                for x in 0..ALPHA_SIZE {
                    new_hi.set(x, y, self.weight(0, x, y));
                }
            }
            self.layers.swap(0, hi);
            self.layers[hi].alpha = Some(new_hi);
            self.layers[hi].flags.set(LayerFlags::USE_ALPHA, true);
            self.layers[0].alpha = None;
            self.layers[0].flags.set(LayerFlags::USE_ALPHA | LayerFlags::COMPRESSED, false);
        } else {
            self.layers.swap(lo, hi);
        }
        true
    }

    /// Retargets every layer using `old` to `new`, merging if `new` is present.
    pub fn switch_texture(&mut self, old: &TextureName, new: &TextureName) -> bool {
        if old == new {
            return false;
        }
        let mut changed = false;
        for layer in self.layers.iter_mut() {
            if &layer.texture == old {
                layer.texture = new.clone();
                changed = true;
            }
        }
        if changed {
            self.remove_duplicate();
        }
        changed
    }

    pub fn change_texture_flag(&mut self, texture: &TextureName, flag: u32, add: bool) -> bool {
        let Some(i) = self.position(texture) else {
            return false;
        };
        let before = self.layers[i].flags;
        self.layers[i].flags.set(flag, add);
        before != self.layers[i].flags
    }

    /// Folds layer `drop` into `keep` and removes `drop`.
    pub fn merge_alpha(&mut self, keep: usize, drop: usize) -> bool {
        if keep == drop || keep >= self.layers.len() || drop >= self.layers.len() {
            return false;
        }
        let (keep, drop) = (keep.min(drop), keep.max(drop));
        if keep > 0 {
            let src = self.layers[drop].alpha.clone();
            if let (Some(src), Some(dst)) = (src, self.layers[keep].alpha.as_mut()) {
                for (d, s) in dst.as_mut_slice().iter_mut().zip(src.as_slice()) {
                    *d = d.saturating_add(*s);
                }
            }
        }
        // Merging into the base needs nothing: the dropped weight becomes remainder.
        self.layers.remove(drop);
        self.normalize();
        true
    }

    /// Merges layers that reference the same texture.
    pub fn remove_duplicate(&mut self) -> bool {
        let mut changed = false;
        let mut i = 0;
        while i < self.layers.len() {
            let mut j = i + 1;
            while j < self.layers.len() {
                if self.layers[i].texture == self.layers[j].texture {
                    self.merge_alpha(i, j);
                    changed = true;
                } else {
                    j += 1;
                }
            }
            i += 1;
        }
        changed
    }

    /// Clamps the non-base sum to 255 per texel, trimming the top layers first.
    pub fn normalize(&mut self) {
        for t in 0..ALPHA_TEXELS {
            let mut sum: u32 = self
                .layers
                .iter()
                .skip(1)
                .filter_map(|l| l.alpha.as_ref())
                .map(|a| a.0[t] as u32)
                .sum();
            if sum <= 255 {
                continue;
            }
            for layer in self.layers.iter_mut().skip(1).rev() {
                let Some(a) = layer.alpha.as_mut() else {
                    continue;
                };
                let excess = (sum - 255).min(a.0[t] as u32);
                a.0[t] -= excess as u8;
                sum -= excess;
                if sum <= 255 {
                    break;
                }
            }
        }
    }

    /// Paints `texture` at `pos` over the chunk whose corner is `(xbase, zbase)`.
    ///
    /// `strength` is the target opacity (0..1) and `pressure` scales how far
    /// each texel moves toward it.
    pub fn paint_texture(
        &mut self,
        xbase: f32,
        zbase: f32,
        pos: Vec3,
        brush: &Brush,
        strength: f32,
        pressure: f32,
        texture: &TextureName,
    ) -> PaintOutcome {
        if brush.is_noop() {
            return PaintOutcome::Unchanged;
        }
        let mut added = false;
        let layer = match self.position(texture) {
            Some(i) => i,
            None => {
                if self.layers.len() >= MAX_TEXTURE_LAYERS {
                    self.erase_unused_textures();
                }
                match self.add_texture(texture.clone()) {
                    Some(i) => {
                        added = true;
                        i
                    }
                    None => {
                        debug!("no free texture slot for {}", texture);
                        return PaintOutcome::NoFreeSlot;
                    }
                }
            }
        };

        let target = (strength.clamp(0.0, 1.0) * 255.0).round();
        let mut changed = false;
        let count = self.layers.len();
        let mut weights = [0f32; MAX_TEXTURE_LAYERS];
        for y in 0..ALPHA_SIZE {
            for x in 0..ALPHA_SIZE {
                let tx = xbase + (x as f32 + 0.5) * TEXEL_SIZE;
                let tz = zbase + (y as f32 + 0.5) * TEXEL_SIZE;
                let k = brush.weight_at(pos, tx, tz) * pressure.clamp(0.0, 1.0);
                if k <= 0.0 {
                    continue;
                }
                for (i, w) in weights.iter_mut().enumerate().take(count) {
                    *w = self.weight(i, x, y) as f32;
                }
                let old = weights[layer];
                let new = (old + (target - old) * k).clamp(0.0, 255.0);
                if (new - old).abs() < 0.5 {
                    continue;
                }
                let others_old = 255.0 - old;
                let others_new = 255.0 - new;
                for (i, w) in weights.iter_mut().enumerate().take(count) {
                    if i == layer {
                        *w = new;
                    } else if others_old > 0.0 {
                        *w *= others_new / others_old;
                    } else if i == 0 {
                        *w = others_new;
                    }
                }
                for i in 1..count {
                    let v = weights[i].round().clamp(0.0, 255.0) as u8;
                    if let Some(a) = self.layers[i].alpha.as_mut() {
                        if a.get(x, y) != v {
                            a.set(x, y, v);
                            changed = true;
                        }
                    }
                }
            }
        }
        if changed {
            self.normalize();
        }
        if changed || added {
            PaintOutcome::Painted
        } else {
            PaintOutcome::Unchanged
        }
    }

    /// Alpha maps quantized to 4-bit steps (multiples of 17), sums kept <= 255.
    pub fn quantized_old_alphas(&self) -> Vec<Option<AlphaMap>> {
        let mut out: Vec<Option<AlphaMap>> = self
            .layers
            .iter()
            .map(|l| {
                l.alpha.as_ref().map(|a| {
                    let mut q = a.clone();
                    for v in q.as_mut_slice() {
                        *v = quantize_to_nibble(*v) * 17;
                    }
                    q
                })
            })
            .collect();
        for t in 0..ALPHA_TEXELS {
            loop {
                let sum: u32 = out.iter().flatten().map(|a| a.0[t] as u32).sum();
                if sum <= 255 {
                    break;
                }
                // Take one step off the heaviest layer.
                if let Some(a) = out.iter_mut().flatten().max_by_key(|a| a.0[t]) {
                    a.0[t] -= 17;
                }
            }
        }
        out
    }

    pub fn convert_to_old_alpha(&mut self) -> bool {
        let quantized = self.quantized_old_alphas();
        let mut changed = false;
        for (layer, q) in self.layers.iter_mut().zip(quantized) {
            if layer.alpha != q {
                layer.alpha = q;
                changed = true;
            }
            if layer.alpha.is_some() {
                layer.flags.set(LayerFlags::COMPRESSED, false);
            }
        }
        changed
    }

    /// 8-bit weights are a superset of 4-bit ones; only the encoding flag moves.
    pub fn convert_to_big_alpha(&mut self) -> bool {
        for layer in self.layers.iter_mut().skip(1) {
            layer.flags.set(LayerFlags::COMPRESSED, false);
        }
        false
    }
}

#[inline]
fn quantize_to_nibble(v: u8) -> u8 {
    ((v as u16 + 8) / 17).min(15) as u8
}
