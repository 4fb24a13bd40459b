use std::fs;
use std::path::{Path, PathBuf};

use tilesmith_geom::{Aabb, Vec3};

use crate::error::AssetError;

/// One mip level as tightly packed RGBA8 rows.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MipLevel {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedTexture {
    pub width: u32,
    pub height: u32,
    /// Largest first; never empty.
    pub mips: Vec<MipLevel>,
}

impl DecodedTexture {
    pub fn rgba(&self) -> &[u8] {
        &self.mips[0].rgba
    }

    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = ((y * self.width + x) * 4) as usize;
        let p = &self.mips[0].rgba[i..i + 4];
        [p[0], p[1], p[2], p[3]]
    }
}

/// Static vertex data of a model; animation is not decoded.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelGeometry {
    pub positions: Vec<Vec3>,
    pub normals: Vec<Vec3>,
    pub uvs: Vec<[f32; 2]>,
    pub bounds: Aabb,
}

/// Supplies decoded assets by their in-game name.
pub trait AssetLoader {
    fn decode_texture(&self, name: &str) -> Result<DecodedTexture, AssetError>;
    fn decode_model(&self, name: &str) -> Result<ModelGeometry, AssetError>;
}

/// Lowercases a game path and switches it to forward slashes.
pub fn normalize_name(name: &str) -> String {
    name.trim().replace('\\', "/").to_ascii_lowercase()
}

/// Reads assets from an extracted data directory.
pub struct DirectoryAssetLoader {
    root: PathBuf,
}

impl DirectoryAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Tries the lowercased path first, then the name as written.
    fn resolve(&self, name: &str) -> Option<PathBuf> {
        let lower = self.root.join(normalize_name(name));
        if lower.is_file() {
            return Some(lower);
        }
        let as_is = self.root.join(name.trim().replace('\\', "/"));
        as_is.is_file().then_some(as_is)
    }

    fn read(&self, name: &str) -> Result<Vec<u8>, AssetError> {
        let path = self
            .resolve(name)
            .ok_or_else(|| AssetError::NotFound(name.to_string()))?;
        fs::read(&path).map_err(|source| AssetError::Io { path, source })
    }
}

impl AssetLoader for DirectoryAssetLoader {
    fn decode_texture(&self, name: &str) -> Result<DecodedTexture, AssetError> {
        crate::blp::decode(&self.read(name)?)
    }

    fn decode_model(&self, name: &str) -> Result<ModelGeometry, AssetError> {
        let lower = normalize_name(name);
        let name = match lower.rsplit_once('.') {
            Some((stem, "mdx" | "mdl")) => format!("{stem}.m2"),
            _ => lower,
        };
        crate::m2::decode(&self.read(&name)?)
    }
}
