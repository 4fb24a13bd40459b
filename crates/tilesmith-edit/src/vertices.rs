use hashbrown::HashMap;
use tilesmith_geom::{Vec3, angled_height};
use tilesmith_terrain::chunk::vertex_offset;
use tilesmith_terrain::{ChunkKey, MAP_VERTICES};

use crate::context::EditContext;
use crate::error::EditError;
use crate::selection::{VertexHandle, VertexSelection};

fn handle_xz(h: &VertexHandle) -> (f32, f32) {
    let (ox, oz) = vertex_offset(h.vertex);
    h.chunk.lattice_xz(ox, oz)
}

impl EditContext<'_> {
    /// Adds every vertex within `radius` of `pos` to the selection.
    pub fn select_vertices(&mut self, sel: &mut VertexSelection, pos: Vec3, radius: f32) -> bool {
        let keys = self.chunks_in_range(pos, radius);
        let mut added = false;
        for key in keys {
            let generation = self.index.generation(key.tile);
            let Some(chunk) = self.index.chunk(key) else {
                continue;
            };
            for vertex in chunk.select_vertices(pos, radius) {
                added |= sel.insert(VertexHandle {
                    chunk: key,
                    vertex,
                    generation,
                });
            }
        }
        added
    }

    pub fn deselect_vertices(&mut self, sel: &mut VertexSelection, pos: Vec3, radius: f32) -> bool {
        if !(radius > 0.0) {
            return false;
        }
        sel.retain(|h| {
            let (x, z) = handle_xz(h);
            ((x - pos.x).powi(2) + (z - pos.z).powi(2)).sqrt() > radius
        })
    }

    pub fn clear_vertex_selection(&mut self, sel: &mut VertexSelection) -> bool {
        sel.clear()
    }

    /// Fails on the first handle whose tile was unloaded or reloaded.
    fn validate(&self, sel: &VertexSelection) -> Result<(), EditError> {
        for h in sel.handles() {
            let live = self.index.is_loaded(h.chunk.tile)
                && self.index.generation(h.chunk.tile) == h.generation
                && h.vertex < MAP_VERTICES;
            if !live {
                return Err(EditError::StaleHandle {
                    chunk: h.chunk,
                    vertex: h.vertex,
                });
            }
        }
        Ok(())
    }

    /// Validates the whole selection, then writes one new height per
    /// selected vertex.
    fn update_selected(
        &mut self,
        sel: &VertexSelection,
        new_height: impl Fn(&VertexHandle, f32) -> f32,
    ) -> Result<bool, EditError> {
        self.validate(sel)?;
        let mut per_chunk: HashMap<ChunkKey, Vec<(usize, f32)>> = HashMap::new();
        for h in sel.handles() {
            if let Some(chunk) = self.index.chunk(h.chunk) {
                let y = new_height(h, chunk.height(h.vertex));
                per_chunk.entry(h.chunk).or_default().push((h.vertex, y));
            }
        }
        let mut keys: Vec<ChunkKey> = per_chunk.keys().copied().collect();
        keys.sort();
        let before = self.snapshot(&keys);
        let changed: Vec<ChunkKey> = keys
            .into_iter()
            .filter(|k| {
                let updates = &per_chunk[k];
                self.index
                    .chunk_mut(*k)
                    .is_some_and(|c| c.apply_heights(updates))
            })
            .collect();
        Ok(self.commit_heights(&changed, &before))
    }

    pub fn move_vertices(&mut self, sel: &VertexSelection, delta: f32) -> Result<bool, EditError> {
        self.update_selected(sel, |_, y| y + delta)
    }

    pub fn flatten_vertices(&mut self, sel: &VertexSelection, height: f32) -> Result<bool, EditError> {
        self.update_selected(sel, |_, _| height)
    }

    /// Puts the selection on the plane through `origin` tilted by `angle`
    /// towards `orientation` (radians).
    pub fn orient_vertices(
        &mut self,
        sel: &VertexSelection,
        origin: Vec3,
        angle: f32,
        orientation: f32,
    ) -> Result<bool, EditError> {
        self.update_selected(sel, |h, _| {
            let (x, z) = handle_xz(h);
            angled_height(origin, x, z, angle, orientation)
        })
    }

    /// Mean position of the selection; `None` when it is empty.
    pub fn vertex_center(&self, sel: &VertexSelection) -> Result<Option<Vec3>, EditError> {
        self.validate(sel)?;
        let mut sum = Vec3::ZERO;
        let mut n = 0usize;
        for h in sel.handles() {
            if let Some(chunk) = self.index.chunk(h.chunk) {
                sum += chunk.vertex_position(h.vertex);
                n += 1;
            }
        }
        Ok((n > 0).then(|| sum / n as f32))
    }
}
