use hashbrown::HashMap;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tilesmith_geom::Vec3;
use tilesmith_terrain::chunk::shared_vertices;
use tilesmith_terrain::{
    Brush, CHUNKS_PER_SIDE, Chunk, ChunkKey, FlattenMode, MAP_VERTICES, TileIndex,
};
use tilesmith_world::MapIndex;

use crate::error::EditError;
use crate::settings::EditSettings;

const NEIGHBOURS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

/// Heights of the gathered chunks before a height edit.
pub(crate) struct HeightSnapshot(HashMap<ChunkKey, [f32; MAP_VERTICES]>);

/// Edit operations for one batch of calls against a map.
pub struct EditContext<'a> {
    pub(crate) index: &'a mut MapIndex,
    pub(crate) settings: &'a EditSettings,
    pub(crate) rng: ChaCha8Rng,
}

impl<'a> EditContext<'a> {
    pub fn new(index: &'a mut MapIndex, settings: &'a EditSettings) -> Self {
        Self {
            index,
            settings,
            rng: ChaCha8Rng::seed_from_u64(settings.seed),
        }
    }

    pub fn index(&self) -> &MapIndex {
        &*self.index
    }

    pub fn settings(&self) -> &EditSettings {
        self.settings
    }

    /// Chunks on loaded tiles touched by the circle. The tile under `pos`
    /// is loaded first; other tiles are not.
    pub(crate) fn chunks_in_range(&mut self, pos: Vec3, radius: f32) -> Vec<ChunkKey> {
        if !(radius > 0.0) {
            return Vec::new();
        }
        if let Some(idx) = self.index.tile_index_at(pos) {
            self.index.ensure_loaded(idx);
        }
        let mut keys = Vec::new();
        for idx in self.index.tiles_in_range(pos, radius) {
            if let Some(tile) = self.index.tile(idx) {
                keys.extend(tile.chunks_in_range(pos, radius));
            }
        }
        keys
    }

    /// Every chunk of the tile under `pos`.
    pub(crate) fn chunks_on_tile(&mut self, pos: Vec3) -> Vec<ChunkKey> {
        let Some(idx) = self.index.tile_index_at(pos) else {
            return Vec::new();
        };
        if !self.index.ensure_loaded(idx) {
            return Vec::new();
        }
        (0..CHUNKS_PER_SIDE * CHUNKS_PER_SIDE)
            .map(|i| ChunkKey::new(idx, i % CHUNKS_PER_SIDE, i / CHUNKS_PER_SIDE))
            .collect()
    }

    pub(crate) fn chunk_at(&mut self, pos: Vec3) -> Option<ChunkKey> {
        let key = ChunkKey::from_pos(pos)?;
        self.index.ensure_loaded(key.tile).then_some(key)
    }

    /// Runs `f` over each chunk and returns the keys it reported as changed.
    pub(crate) fn apply(
        &mut self,
        keys: &[ChunkKey],
        mut f: impl FnMut(&mut Chunk) -> bool,
    ) -> Vec<ChunkKey> {
        keys.iter()
            .copied()
            .filter(|k| self.index.chunk_mut(*k).is_some_and(&mut f))
            .collect()
    }

    pub(crate) fn snapshot(&self, keys: &[ChunkKey]) -> HeightSnapshot {
        HeightSnapshot(
            keys.iter()
                .filter_map(|k| Some((*k, *self.index.chunk(*k)?.heights())))
                .collect(),
        )
    }

    /// Copies every shared vertex the edit moved onto the other loaded
    /// chunks that carry it. Where two edited copies disagree the first key
    /// in order wins. Returns `changed` plus every neighbour that moved.
    fn stitch_seams(&mut self, changed: &[ChunkKey], before: &HeightSnapshot) -> Vec<ChunkKey> {
        let mut keys = changed.to_vec();
        keys.sort();
        keys.dedup();
        let mut moved = keys.clone();
        for &key in &keys {
            for (dx, dz) in NEIGHBOURS {
                let Some(other) = key.neighbor(dx, dz) else {
                    continue;
                };
                let Some(chunk) = self.index.chunk(key) else {
                    continue;
                };
                let old = before.0.get(&key);
                let updates: Vec<(usize, f32)> = shared_vertices(dx, dz)
                    .filter(|&(own, _)| {
                        old.is_none_or(|h| h[own].to_bits() != chunk.height(own).to_bits())
                    })
                    .map(|(own, theirs)| (theirs, chunk.height(own)))
                    .collect();
                if updates.is_empty() {
                    continue;
                }
                if self
                    .index
                    .chunk_mut(other)
                    .is_some_and(|c| c.apply_heights(&updates))
                {
                    moved.push(other);
                }
            }
        }
        moved.sort();
        moved.dedup();
        if moved.len() > keys.len() {
            log::debug!(
                target: "edit",
                "seams pulled {} neighbouring chunk(s) along",
                moved.len() - keys.len()
            );
        }
        moved
    }

    /// Commit for edits that moved heights: seams first, then normals.
    pub(crate) fn commit_heights(&mut self, changed: &[ChunkKey], before: &HeightSnapshot) -> bool {
        if changed.is_empty() {
            return false;
        }
        let moved = self.stitch_seams(changed, before);
        self.commit(&moved, true)
    }

    /// Recomputes normals of `changed` (when heights moved) against the
    /// settled map, then marks the owning tiles changed.
    pub(crate) fn commit(&mut self, changed: &[ChunkKey], heights_moved: bool) -> bool {
        if changed.is_empty() {
            return false;
        }
        if heights_moved {
            let index: &MapIndex = self.index;
            let normals: Vec<_> = changed
                .iter()
                .filter_map(|k| Some((*k, index.chunk(*k)?.compute_normals(index))))
                .collect();
            for (key, n) in normals {
                if let Some(chunk) = self.index.chunk_mut(key) {
                    chunk.set_normals(n);
                }
            }
        }
        let mut tiles: Vec<TileIndex> = changed.iter().map(|k| k.tile).collect();
        tiles.sort();
        tiles.dedup();
        for &t in &tiles {
            self.index.set_changed(t);
        }
        log::debug!(
            target: "edit",
            "{} chunk(s) changed on {} tile(s)",
            changed.len(),
            tiles.len()
        );
        true
    }

    pub fn change_terrain(&mut self, pos: Vec3, delta: f32, brush: &Brush) -> bool {
        let keys = self.chunks_in_range(pos, brush.reach());
        let before = self.snapshot(&keys);
        let changed = self.apply(&keys, |c| c.change_terrain(pos, delta, brush));
        self.commit_heights(&changed, &before)
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
        let keys = self.chunks_in_range(pos, brush.reach());
        let before = self.snapshot(&keys);
        let changed = self.apply(&keys, |c| {
            c.flatten_terrain(pos, remain, brush, mode, origin, angle, orientation)
        });
        self.commit_heights(&changed, &before)
    }

    /// Every new height is computed from the map as it was before the dab.
    pub fn blur_terrain(&mut self, pos: Vec3, remain: f32, brush: &Brush) -> bool {
        let keys = self.chunks_in_range(pos, brush.reach());
        let before = self.snapshot(&keys);
        let index: &MapIndex = self.index;
        let plans: Vec<(ChunkKey, Vec<(usize, f32)>)> = keys
            .iter()
            .filter_map(|k| Some((*k, index.chunk(*k)?.blur_heights(pos, remain, brush, index))))
            .collect();
        let changed: Vec<ChunkKey> = plans
            .into_iter()
            .filter(|(k, updates)| {
                self.index
                    .chunk_mut(*k)
                    .is_some_and(|c| c.apply_heights(updates))
            })
            .map(|(k, _)| k)
            .collect();
        self.commit_heights(&changed, &before)
    }

    /// Levels the whole tile under `pos` to each chunk's base height.
    pub fn clear_height(&mut self, pos: Vec3) -> bool {
        let keys = self.chunks_on_tile(pos);
        let before = self.snapshot(&keys);
        let changed = self.apply(&keys, Chunk::clear_height);
        self.commit_heights(&changed, &before)
    }

    /// Paints vertex colours; `add = false` fades back to neutral.
    pub fn change_shader(
        &mut self,
        pos: Vec3,
        color: [f32; 3],
        change: f32,
        radius: f32,
        add: bool,
    ) -> bool {
        let keys = self.chunks_in_range(pos, radius);
        let changed = self.apply(&keys, |c| c.change_vertex_color(pos, color, change, radius, add));
        self.commit(&changed, false)
    }

    /// Snaps every seam between loaded chunks, walking tiles row by row so
    /// left and upper neighbours are settled first.
    pub fn fix_all_gaps(&mut self) -> bool {
        let tiles: Vec<TileIndex> = self.index.loaded_indices().collect();
        let mut moved = Vec::new();
        for idx in tiles {
            let left: Option<Vec<[f32; 9]>> = self.index.tile_left(idx).map(|t| {
                (0..CHUNKS_PER_SIDE)
                    .map(|cz| t.chunk(CHUNKS_PER_SIDE - 1, cz).right_edge())
                    .collect()
            });
            let above: Option<Vec<[f32; 9]>> = self.index.tile_above(idx).map(|t| {
                (0..CHUNKS_PER_SIDE)
                    .map(|cx| t.chunk(cx, CHUNKS_PER_SIDE - 1).bottom_edge())
                    .collect()
            });
            let Some(tile) = self.index.tile_mut(idx) else {
                continue;
            };
            for (cz, edge) in left.iter().flatten().enumerate() {
                if tile.chunk_mut(0, cz).apply_left_edge(edge) {
                    moved.push(ChunkKey::new(idx, 0, cz));
                }
            }
            for (cx, edge) in above.iter().flatten().enumerate() {
                if tile.chunk_mut(cx, 0).apply_top_edge(edge) {
                    moved.push(ChunkKey::new(idx, cx, 0));
                }
            }
            moved.extend(tile.fix_internal_gaps());
        }
        moved.sort();
        moved.dedup();
        if !moved.is_empty() {
            log::info!(target: "edit", "stitched {} chunk seam(s)", moved.len());
        }
        self.commit(&moved, true)
    }

    /// Ground height under `(x, z)`, loading the tile if needed.
    pub fn height_at(&mut self, x: f32, z: f32) -> Option<f32> {
        let idx = TileIndex::from_xz(x, z)?;
        if !self.index.ensure_loaded(idx) {
            return None;
        }
        self.index.height_at(x, z)
    }

    pub fn is_under_map(&mut self, pos: Vec3) -> bool {
        self.height_at(pos.x, pos.z).is_some_and(|h| pos.y < h)
    }

    /// Re-encodes every tile of the map in the other alpha format and flips
    /// the map flag. Tiles are left changed; nothing is written.
    pub fn convert_alphamap(&mut self, to_big: bool) -> Result<usize, EditError> {
        if self.index.big_alpha() == to_big {
            return Ok(0);
        }
        let tiles: Vec<TileIndex> = self.index.header().tiles().collect();
        let mut converted = 0;
        for idx in tiles {
            self.index.load_tile(idx)?;
            if let Some(tile) = self.index.tile_mut(idx) {
                tile.convert_alphamap(to_big);
                self.index.set_changed(idx);
                converted += 1;
            }
        }
        self.index.set_big_alpha(to_big);
        log::info!(
            target: "edit",
            "converted {} tile(s) to {} alpha",
            converted,
            if to_big { "8-bit" } else { "4-bit" }
        );
        Ok(converted)
    }
}
