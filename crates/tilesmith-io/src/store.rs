//! Where tile and map header bytes live.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use hashbrown::HashMap;
use log::{debug, info};
use tilesmith_terrain::{Instance, Tile, TileIndex};

use crate::adt::{TileFile, decode_tile, encode_tile};
use crate::error::StoreError;
use crate::wdt::{MapHeader, decode_map_header, encode_map_header};

/// Byte-level storage for one map. `Ok(None)` means "not stored", which is
/// not an error.
pub trait TileStore {
    fn read_tile(&self, idx: TileIndex) -> Result<Option<Vec<u8>>, StoreError>;
    fn write_tile(&mut self, idx: TileIndex, bytes: &[u8]) -> Result<(), StoreError>;
    fn read_header(&self) -> Result<Option<Vec<u8>>, StoreError>;
    fn write_header(&mut self, bytes: &[u8]) -> Result<(), StoreError>;

    fn load_tile(&self, idx: TileIndex, big_alpha: bool) -> Result<Option<TileFile>, StoreError> {
        match self.read_tile(idx)? {
            Some(bytes) => Ok(Some(decode_tile(idx, &bytes, big_alpha)?)),
            None => Ok(None),
        }
    }

    fn save_tile(&mut self, tile: &Tile, instances: &[Instance]) -> Result<(), StoreError> {
        let bytes = encode_tile(tile, instances)?;
        self.write_tile(tile.index, &bytes)
    }

    fn load_header(&self) -> Result<Option<MapHeader>, StoreError> {
        match self.read_header()? {
            Some(bytes) => Ok(Some(decode_map_header(&bytes)?)),
            None => Ok(None),
        }
    }

    fn save_header(&mut self, header: &MapHeader) -> Result<(), StoreError> {
        let bytes = encode_map_header(header)?;
        self.write_header(&bytes)
    }
}

/// `<dir>/<map>.wdt` and `<dir>/<map>_<x>_<z>.adt`.
#[derive(Clone, Debug)]
pub struct FsTileStore {
    dir: PathBuf,
    map: String,
}

impl FsTileStore {
    pub fn new(dir: impl Into<PathBuf>, map: impl Into<String>) -> Self {
        Self {
            dir: dir.into(),
            map: map.into(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn map_name(&self) -> &str {
        &self.map
    }

    pub fn tile_path(&self, idx: TileIndex) -> PathBuf {
        self.dir.join(format!("{}_{}_{}.adt", self.map, idx.x, idx.z))
    }

    pub fn header_path(&self) -> PathBuf {
        self.dir.join(format!("{}.wdt", self.map))
    }

    fn read(path: &Path) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(path) {
            Ok(bytes) => {
                debug!("read {} ({} bytes)", path.display(), bytes.len());
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn write(path: &Path, bytes: &[u8]) -> Result<(), StoreError> {
        let io = |source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io)?;
        }
        // Replace through a sibling temp file.
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, bytes).map_err(io)?;
        fs::rename(&tmp, path).map_err(io)?;
        info!("wrote {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}

impl TileStore for FsTileStore {
    fn read_tile(&self, idx: TileIndex) -> Result<Option<Vec<u8>>, StoreError> {
        Self::read(&self.tile_path(idx))
    }

    fn write_tile(&mut self, idx: TileIndex, bytes: &[u8]) -> Result<(), StoreError> {
        Self::write(&self.tile_path(idx), bytes)
    }

    fn read_header(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Self::read(&self.header_path())
    }

    fn write_header(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        Self::write(&self.header_path(), bytes)
    }
}

/// In-memory store for tests and scratch maps.
#[derive(Clone, Debug, Default)]
pub struct MemoryTileStore {
    tiles: HashMap<TileIndex, Vec<u8>>,
    header: Option<Vec<u8>>,
    writes: usize,
}

impl MemoryTileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw bytes, e.g. to corrupt a tile on purpose.
    pub fn insert_raw(&mut self, idx: TileIndex, bytes: Vec<u8>) {
        self.tiles.insert(idx, bytes);
    }

    pub fn contains(&self, idx: TileIndex) -> bool {
        self.tiles.contains_key(&idx)
    }

    /// Number of successful tile writes.
    pub fn writes(&self) -> usize {
        self.writes
    }
}

impl TileStore for MemoryTileStore {
    fn read_tile(&self, idx: TileIndex) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tiles.get(&idx).cloned())
    }

    fn write_tile(&mut self, idx: TileIndex, bytes: &[u8]) -> Result<(), StoreError> {
        self.tiles.insert(idx, bytes.to_vec());
        self.writes += 1;
        Ok(())
    }

    fn read_header(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.header.clone())
    }

    fn write_header(&mut self, bytes: &[u8]) -> Result<(), StoreError> {
        self.header = Some(bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_store_reports_missing_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FsTileStore::new(dir.path(), "azeroth");
        let idx = TileIndex::new(31, 42);
        assert!(store.read_tile(idx).unwrap().is_none());
        store.write_tile(idx, b"abc").unwrap();
        assert!(store.tile_path(idx).ends_with("azeroth_31_42.adt"));
        assert_eq!(store.read_tile(idx).unwrap().as_deref(), Some(&b"abc"[..]));
        assert!(!store.tile_path(idx).with_extension("tmp").exists());
    }

    #[test]
    fn memory_store_counts_writes() {
        let mut store = MemoryTileStore::new();
        let tile = Tile::flat(TileIndex::new(1, 1), 0.0, false);
        store.save_tile(&tile, &[]).unwrap();
        assert_eq!(store.writes(), 1);
        let back = store.load_tile(tile.index, false).unwrap().unwrap();
        assert_eq!(back.tile.index, tile.index);
        assert!(store.load_tile(TileIndex::new(2, 2), false).unwrap().is_none());
    }
}
