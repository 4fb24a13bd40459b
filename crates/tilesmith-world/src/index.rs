//! Sparse 64x64 tile grid with lazy loading and change tracking.
//!
//! Tiles are owned here and addressed by `TileIndex`; callers re-query
//! instead of holding references across edits. Each slot carries a
//! generation that moves on every load and unload so stale vertex handles
//! can be detected.

use tilesmith_geom::Vec3;
use tilesmith_io::{MapHeader, StoreError, TileStore};
use tilesmith_terrain::{
    CHUNKS_PER_SIDE, Chunk, ChunkKey, HeightSampler, Instance, TILES_PER_SIDE, Tile, TileIndex,
};

use crate::instances::InstanceRegistry;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum UnloadPolicy {
    /// Refuse to drop unsaved edits.
    #[default]
    KeepChanges,
    Discard,
}

#[derive(Debug, Default)]
struct TileEntry {
    tile: Option<Tile>,
    changed: bool,
    on_disk: bool,
    generation: u64,
}

/// Outcome of `MapIndex::save_changed`.
#[derive(Debug, Default)]
pub struct SaveReport {
    pub saved: Vec<TileIndex>,
    pub failed: Vec<(TileIndex, StoreError)>,
    pub header_saved: bool,
}

impl SaveReport {
    pub fn is_ok(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct MapIndex {
    store: Box<dyn TileStore>,
    header: MapHeader,
    header_changed: bool,
    entries: Vec<TileEntry>,
    instances: InstanceRegistry,
}

impl MapIndex {
    pub fn new(store: Box<dyn TileStore>, header: MapHeader) -> Self {
        let mut entries = Vec::with_capacity(TILES_PER_SIDE * TILES_PER_SIDE);
        entries.resize_with(TILES_PER_SIDE * TILES_PER_SIDE, TileEntry::default);
        Self {
            store,
            header,
            header_changed: false,
            entries,
            instances: InstanceRegistry::new(),
        }
    }

    /// Reads the map header from `store`; a store without one starts empty.
    pub fn open(store: Box<dyn TileStore>) -> Result<Self, StoreError> {
        let header = match store.load_header()? {
            Some(h) => h,
            None => {
                log::warn!("no map header in store; starting an empty map");
                MapHeader::default()
            }
        };
        log::info!(
            "opened map: {} tiles, big alpha {}",
            header.tile_count(),
            header.big_alpha()
        );
        Ok(Self::new(store, header))
    }

    pub fn header(&self) -> &MapHeader {
        &self.header
    }

    pub fn big_alpha(&self) -> bool {
        self.header.big_alpha()
    }

    /// Switches the map-wide alpha format flag. Tiles are not touched.
    pub fn set_big_alpha(&mut self, on: bool) -> bool {
        if self.header.big_alpha() == on {
            return false;
        }
        self.header.set_big_alpha(on);
        self.header_changed = true;
        true
    }

    /// Whether the tile exists on storage or was created this session.
    pub fn has_tile(&self, idx: TileIndex) -> bool {
        self.header.tile_exists(idx)
    }

    pub fn is_loaded(&self, idx: TileIndex) -> bool {
        idx.is_valid() && self.entries[idx.slot()].tile.is_some()
    }

    pub fn generation(&self, idx: TileIndex) -> u64 {
        if idx.is_valid() {
            self.entries[idx.slot()].generation
        } else {
            0
        }
    }

    pub fn tile_index_at(&self, pos: Vec3) -> Option<TileIndex> {
        TileIndex::from_pos(pos)
    }

    /// Tile under `pos`, loading it on first access. Load failures are
    /// logged and read as "no tile".
    pub fn get_tile(&mut self, pos: Vec3) -> Option<&mut Tile> {
        let idx = self.tile_index_at(pos)?;
        if !self.ensure_loaded(idx) {
            return None;
        }
        self.entries[idx.slot()].tile.as_mut()
    }

    /// Loads `idx` if needed; `false` when it is absent or unreadable.
    pub fn ensure_loaded(&mut self, idx: TileIndex) -> bool {
        match self.load_tile(idx) {
            Ok(_) => self.is_loaded(idx),
            Err(e) => {
                log::error!("tile {}_{} could not be loaded: {}", idx.x, idx.z, e);
                false
            }
        }
    }

    pub fn tile(&self, idx: TileIndex) -> Option<&Tile> {
        if !idx.is_valid() {
            return None;
        }
        self.entries[idx.slot()].tile.as_ref()
    }

    pub fn tile_mut(&mut self, idx: TileIndex) -> Option<&mut Tile> {
        if !idx.is_valid() {
            return None;
        }
        self.entries[idx.slot()].tile.as_mut()
    }

    /// Loaded tiles whose footprint touches the circle. Never loads.
    pub fn tiles_in_range(&self, pos: Vec3, radius: f32) -> Vec<TileIndex> {
        self.loaded_indices()
            .filter(|idx| idx.bounds().intersects_circle_xz(pos, radius))
            .collect()
    }

    /// Marks a tile as carrying unsaved edits, loading it when it exists
    /// but is not in memory yet. Returns whether the tile is now marked.
    pub fn set_changed(&mut self, idx: TileIndex) -> bool {
        if !self.ensure_loaded(idx) {
            return false;
        }
        self.entries[idx.slot()].changed = true;
        true
    }

    pub fn unset_changed(&mut self, idx: TileIndex) {
        if idx.is_valid() {
            self.entries[idx.slot()].changed = false;
        }
    }

    pub fn is_on_disk(&self, idx: TileIndex) -> bool {
        idx.is_valid() && self.entries[idx.slot()].on_disk
    }

    pub fn is_changed(&self, idx: TileIndex) -> bool {
        idx.is_valid() && self.entries[idx.slot()].changed
    }

    pub fn changed_tiles(&self) -> Vec<TileIndex> {
        self.loaded_indices().filter(|i| self.is_changed(*i)).collect()
    }

    /// Reads a tile from the store. `Ok(false)` when it is already loaded or
    /// the map has no such tile.
    pub fn load_tile(&mut self, idx: TileIndex) -> Result<bool, StoreError> {
        if !idx.is_valid() || self.is_loaded(idx) || !self.header.tile_exists(idx) {
            return Ok(false);
        }
        let file = self
            .store
            .load_tile(idx, self.header.big_alpha())?
            .ok_or(StoreError::Missing { x: idx.x, z: idx.z })?;
        let mut fresh = 0;
        for inst in file.instances {
            if self.instances.insert_loaded(inst) {
                fresh += 1;
            }
        }
        let entry = &mut self.entries[idx.slot()];
        entry.tile = Some(file.tile);
        entry.changed = false;
        entry.on_disk = true;
        entry.generation += 1;
        log::debug!("loaded tile {}_{} ({} new objects)", idx.x, idx.z, fresh);
        Ok(true)
    }

    /// Drops a tile from memory. A changed tile stays loaded unless the
    /// policy discards its edits.
    pub fn unload_tile(&mut self, idx: TileIndex, policy: UnloadPolicy) -> bool {
        if !self.is_loaded(idx) {
            return false;
        }
        let entry = &mut self.entries[idx.slot()];
        if entry.changed && policy == UnloadPolicy::KeepChanges {
            log::warn!("tile {}_{} has unsaved changes; not unloading", idx.x, idx.z);
            return false;
        }
        entry.tile = None;
        entry.changed = false;
        entry.generation += 1;
        if !entry.on_disk {
            // Created this session and never written.
            self.header.set_tile_exists(idx, false);
            self.header_changed = true;
        }
        let entries = &self.entries;
        let dropped = self
            .instances
            .retain_on(|t| entries[t.slot()].tile.is_some());
        log::debug!("unloaded tile {}_{} ({} objects dropped)", idx.x, idx.z, dropped);
        true
    }

    /// Discards in-memory state and reads the tile again.
    pub fn reload_tile(&mut self, idx: TileIndex) -> Result<bool, StoreError> {
        self.unload_tile(idx, UnloadPolicy::Discard);
        self.load_tile(idx)
    }

    /// Adds a flat tile to the map. `false` if the slot is taken.
    pub fn create_tile(&mut self, idx: TileIndex, height: f32) -> bool {
        if !idx.is_valid() || self.header.tile_exists(idx) || self.is_loaded(idx) {
            return false;
        }
        self.header.set_tile_exists(idx, true);
        self.header_changed = true;
        let entry = &mut self.entries[idx.slot()];
        entry.tile = Some(Tile::flat(idx, height, self.header.big_alpha()));
        entry.changed = true;
        entry.on_disk = false;
        entry.generation += 1;
        log::info!("created tile {}_{}", idx.x, idx.z);
        true
    }

    /// Writes every changed tile and, if needed, the map header. A failing
    /// tile keeps its changed flag and does not stop the others.
    pub fn save_changed(&mut self) -> SaveReport {
        let mut report = SaveReport::default();
        for idx in self.changed_tiles() {
            let objects = self.instances.on_tile(idx);
            let Some(tile) = self.entries[idx.slot()].tile.as_ref() else {
                continue;
            };
            match self.store.save_tile(tile, &objects) {
                Ok(()) => {
                    let entry = &mut self.entries[idx.slot()];
                    entry.changed = false;
                    entry.on_disk = true;
                    report.saved.push(idx);
                }
                Err(e) => {
                    log::error!("saving tile {}_{} failed: {}", idx.x, idx.z, e);
                    report.failed.push((idx, e));
                }
            }
        }
        if self.header_changed {
            match self.store.save_header(&self.header) {
                Ok(()) => {
                    self.header_changed = false;
                    report.header_saved = true;
                }
                Err(e) => log::error!("saving map header failed: {}", e),
            }
        }
        log::info!(
            "saved {} tile(s), {} failed",
            report.saved.len(),
            report.failed.len()
        );
        report
    }

    /// Loaded tiles ordered by z, then x.
    pub fn loaded_tiles(&self) -> impl Iterator<Item = &Tile> {
        self.entries.iter().filter_map(|e| e.tile.as_ref())
    }

    pub fn loaded_indices(&self) -> impl Iterator<Item = TileIndex> + '_ {
        self.loaded_tiles().map(|t| t.index)
    }

    pub fn chunk(&self, key: ChunkKey) -> Option<&Chunk> {
        if key.cx >= CHUNKS_PER_SIDE || key.cz >= CHUNKS_PER_SIDE {
            return None;
        }
        Some(self.tile(key.tile)?.chunk(key.cx, key.cz))
    }

    pub fn chunk_mut(&mut self, key: ChunkKey) -> Option<&mut Chunk> {
        if key.cx >= CHUNKS_PER_SIDE || key.cz >= CHUNKS_PER_SIDE {
            return None;
        }
        Some(self.tile_mut(key.tile)?.chunk_mut(key.cx, key.cz))
    }

    /// Interpolated ground height over loaded tiles.
    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        let key = ChunkKey::from_xz(x, z)?;
        self.chunk(key)?.height_at(x, z)
    }

    pub fn tile_left(&self, idx: TileIndex) -> Option<&Tile> {
        self.tile(idx.offset(-1, 0)?)
    }

    pub fn tile_above(&self, idx: TileIndex) -> Option<&Tile> {
        self.tile(idx.offset(0, -1)?)
    }

    pub fn instances(&self) -> &InstanceRegistry {
        &self.instances
    }

    fn mark_all(&mut self, tiles: &[TileIndex]) {
        for &t in tiles {
            self.set_changed(t);
        }
    }

    pub fn add_instance(&mut self, instance: Instance) -> u32 {
        let (uid, tiles) = self.instances.add(instance);
        self.mark_all(&tiles);
        uid
    }

    pub fn delete_instance(&mut self, uid: u32) -> Option<Instance> {
        let (inst, tiles) = self.instances.remove(uid)?;
        self.mark_all(&tiles);
        Some(inst)
    }

    pub fn move_instance(&mut self, uid: u32, delta: Vec3) -> bool {
        match self.instances.move_by(uid, delta) {
            Some(tiles) => {
                self.mark_all(&tiles);
                true
            }
            None => false,
        }
    }

    pub fn rotate_instance(&mut self, uid: u32, delta_degrees: Vec3) -> bool {
        match self.instances.rotate(uid, delta_degrees) {
            Some(tiles) => {
                self.mark_all(&tiles);
                true
            }
            None => false,
        }
    }

    pub fn scale_instance(&mut self, uid: u32, scale: u16) -> bool {
        match self.instances.set_scale(uid, scale) {
            Some(tiles) => {
                self.mark_all(&tiles);
                true
            }
            None => false,
        }
    }

    /// Returns the number of removed duplicates.
    pub fn delete_duplicate_instances(&mut self) -> usize {
        let (removed, tiles) = self.instances.delete_duplicates();
        self.mark_all(&tiles);
        if !removed.is_empty() {
            log::info!("removed {} duplicate object(s)", removed.len());
        }
        removed.len()
    }

    pub fn clear_instances_on(&mut self, idx: TileIndex) -> usize {
        let (removed, tiles) = self.instances.clear_tile(idx);
        self.mark_all(&tiles);
        removed.len()
    }
}

impl HeightSampler for MapIndex {
    fn sample_height(&self, x: f32, z: f32) -> Option<f32> {
        self.height_at(x, z)
    }
}
