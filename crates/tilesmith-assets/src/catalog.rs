use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::AssetError;
use crate::loader::normalize_name;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u16);

#[derive(Clone, Debug)]
pub struct CatalogEntry {
    pub id: TextureId,
    /// Short name used on the command line.
    pub key: String,
    /// Normalized game path.
    pub path: String,
    pub group: Option<String>,
}

/// Named textures available for painting, loaded from TOML.
#[derive(Default, Clone, Debug)]
pub struct TextureCatalog {
    pub entries: Vec<CatalogEntry>,
    pub by_key: HashMap<String, TextureId>,
}

impl TextureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get_id(&self, key: &str) -> Option<TextureId> {
        self.by_key.get(key).copied()
    }

    pub fn get(&self, id: TextureId) -> Option<&CatalogEntry> {
        self.entries.get(id.0 as usize)
    }

    /// Catalog key first, then a raw game path.
    pub fn resolve(&self, key_or_path: &str) -> String {
        match self.get_id(key_or_path).and_then(|id| self.get(id)) {
            Some(entry) => entry.path.clone(),
            None => normalize_name(key_or_path),
        }
    }

    /// Entries of one group, in id order.
    pub fn group<'a>(&'a self, group: &'a str) -> impl Iterator<Item = &'a CatalogEntry> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.group.as_deref() == Some(group))
    }

    pub fn from_toml_str(toml_str: &str) -> Result<Self, AssetError> {
        let cfg: CatalogConfig = toml::from_str(toml_str)?;
        let mut catalog = TextureCatalog::new();
        let mut entries: Vec<(String, TextureEntry)> = cfg.textures.into_iter().collect();
        // Sorted so ids do not depend on map iteration order.
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        for (key, entry) in entries {
            let (path, group) = match entry {
                TextureEntry::Path(p) => (p, None),
                TextureEntry::Detail { path, group } => (path, group),
            };
            let id = TextureId(catalog.entries.len() as u16);
            catalog.by_key.insert(key.clone(), id);
            catalog.entries.push(CatalogEntry {
                id,
                key,
                path: normalize_name(&path),
                group,
            });
        }
        Ok(catalog)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let path = path.as_ref();
        let s = fs::read_to_string(path).map_err(|source| AssetError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&s)
    }
}

#[derive(Deserialize)]
struct CatalogConfig {
    #[serde(default)]
    textures: HashMap<String, TextureEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum TextureEntry {
    // grass = "Tileset\\Elwynn\\ElwynnGrass01.blp"
    Path(String),
    // grass = { path = "...", group = "elwynn" }
    Detail { path: String, group: Option<String> },
}
