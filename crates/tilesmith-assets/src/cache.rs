use hashbrown::HashMap;
use tilesmith_geom::{Aabb, Vec3};

use crate::loader::{AssetLoader, DecodedTexture, MipLevel, ModelGeometry, normalize_name};

const PLACEHOLDER_SIZE: u32 = 64;
const PLACEHOLDER_CELL: u32 = 8;

/// Magenta and black checkerboard shown in place of an unreadable texture.
pub fn placeholder_texture() -> DecodedTexture {
    let n = PLACEHOLDER_SIZE;
    let mut rgba = Vec::with_capacity((n * n * 4) as usize);
    for y in 0..n {
        for x in 0..n {
            let on = ((x / PLACEHOLDER_CELL) + (y / PLACEHOLDER_CELL)) % 2 == 0;
            rgba.extend_from_slice(if on { &[255, 0, 255, 255] } else { &[0, 0, 0, 255] });
        }
    }
    DecodedTexture {
        width: n,
        height: n,
        mips: vec![MipLevel {
            width: n,
            height: n,
            rgba,
        }],
    }
}

/// Unit cube drawn in place of an unreadable model.
pub fn placeholder_model() -> ModelGeometry {
    let bounds = Aabb::new(Vec3::splat(-0.5), Vec3::splat(0.5));
    let positions: Vec<Vec3> = (0..8)
        .map(|i| {
            Vec3::new(
                if i & 1 == 0 { -0.5 } else { 0.5 },
                if i & 2 == 0 { -0.5 } else { 0.5 },
                if i & 4 == 0 { -0.5 } else { 0.5 },
            )
        })
        .collect();
    let normals = positions.iter().map(|p| p.normalized()).collect();
    ModelGeometry {
        uvs: vec![[0.0, 0.0]; positions.len()],
        positions,
        normals,
        bounds,
    }
}

struct Slot<T> {
    value: T,
    placeholder: bool,
    refs: u32,
}

/// Reference-counted decoded assets keyed by normalized name. A failed
/// decode is logged once and cached as a placeholder until `reload`.
pub struct AssetCache {
    loader: Box<dyn AssetLoader>,
    textures: HashMap<String, Slot<DecodedTexture>>,
    models: HashMap<String, Slot<ModelGeometry>>,
}

impl AssetCache {
    pub fn new(loader: Box<dyn AssetLoader>) -> Self {
        Self {
            loader,
            textures: HashMap::new(),
            models: HashMap::new(),
        }
    }

    /// Takes a reference to a texture, decoding it on first use.
    pub fn texture(&mut self, name: &str) -> &DecodedTexture {
        let loader = &*self.loader;
        let slot = self
            .textures
            .entry(normalize_name(name))
            .or_insert_with_key(|key| load_texture(loader, key));
        slot.refs += 1;
        &slot.value
    }

    pub fn model(&mut self, name: &str) -> &ModelGeometry {
        let loader = &*self.loader;
        let slot = self
            .models
            .entry(normalize_name(name))
            .or_insert_with_key(|key| load_model(loader, key));
        slot.refs += 1;
        &slot.value
    }

    /// Cached texture without taking a reference.
    pub fn get_texture(&self, name: &str) -> Option<&DecodedTexture> {
        self.textures.get(&normalize_name(name)).map(|s| &s.value)
    }

    pub fn get_model(&self, name: &str) -> Option<&ModelGeometry> {
        self.models.get(&normalize_name(name)).map(|s| &s.value)
    }

    pub fn is_placeholder(&self, name: &str) -> bool {
        let key = normalize_name(name);
        self.textures
            .get(&key)
            .map(|s| s.placeholder)
            .or_else(|| self.models.get(&key).map(|s| s.placeholder))
            .unwrap_or(false)
    }

    /// Drops one reference; the texture is evicted with its last one.
    pub fn release_texture(&mut self, name: &str) -> bool {
        release(&mut self.textures, &normalize_name(name))
    }

    pub fn release_model(&mut self, name: &str) -> bool {
        release(&mut self.models, &normalize_name(name))
    }

    pub fn texture_count(&self) -> usize {
        self.textures.len()
    }

    pub fn model_count(&self) -> usize {
        self.models.len()
    }

    pub fn placeholder_count(&self) -> usize {
        self.textures.values().filter(|s| s.placeholder).count()
            + self.models.values().filter(|s| s.placeholder).count()
    }

    /// Decodes every cached asset again, keeping reference counts. Returns
    /// how many are still placeholders.
    pub fn reload(&mut self) -> usize {
        log::debug!("reloading {} texture(s) and {} model(s)", self.textures.len(), self.models.len());
        let keys: Vec<String> = self.textures.keys().cloned().collect();
        for key in keys {
            let fresh = load_texture(&*self.loader, &key);
            if let Some(slot) = self.textures.get_mut(&key) {
                slot.value = fresh.value;
                slot.placeholder = fresh.placeholder;
            }
        }
        let keys: Vec<String> = self.models.keys().cloned().collect();
        for key in keys {
            let fresh = load_model(&*self.loader, &key);
            if let Some(slot) = self.models.get_mut(&key) {
                slot.value = fresh.value;
                slot.placeholder = fresh.placeholder;
            }
        }
        let missing = self.placeholder_count();
        log::info!("finished reloading assets, {} placeholder(s) remain", missing);
        missing
    }
}

fn load_texture(loader: &dyn AssetLoader, key: &str) -> Slot<DecodedTexture> {
    match loader.decode_texture(key) {
        Ok(value) => Slot {
            value,
            placeholder: false,
            refs: 0,
        },
        Err(e) => {
            log::warn!("texture {} unavailable, using placeholder: {}", key, e);
            Slot {
                value: placeholder_texture(),
                placeholder: true,
                refs: 0,
            }
        }
    }
}

fn load_model(loader: &dyn AssetLoader, key: &str) -> Slot<ModelGeometry> {
    match loader.decode_model(key) {
        Ok(value) => Slot {
            value,
            placeholder: false,
            refs: 0,
        },
        Err(e) => {
            log::warn!("model {} unavailable, using placeholder: {}", key, e);
            Slot {
                value: placeholder_model(),
                placeholder: true,
                refs: 0,
            }
        }
    }
}

fn release<T>(map: &mut HashMap<String, Slot<T>>, key: &str) -> bool {
    let Some(slot) = map.get_mut(key) else {
        return false;
    };
    slot.refs = slot.refs.saturating_sub(1);
    if slot.refs == 0 {
        map.remove(key);
    }
    true
}
