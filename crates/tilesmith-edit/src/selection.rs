use hashbrown::HashMap;
use tilesmith_terrain::ChunkKey;

/// A selected vertex, valid while its tile keeps the generation it was
/// selected under.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VertexHandle {
    pub chunk: ChunkKey,
    pub vertex: usize,
    pub generation: u64,
}

/// Selected vertices in selection order, without duplicates.
#[derive(Clone, Debug, Default)]
pub struct VertexSelection {
    handles: Vec<VertexHandle>,
    slots: HashMap<(ChunkKey, usize), usize>,
}

impl VertexSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn handles(&self) -> &[VertexHandle] {
        &self.handles
    }

    pub fn contains(&self, chunk: ChunkKey, vertex: usize) -> bool {
        self.slots.contains_key(&(chunk, vertex))
    }

    /// Adds a handle; re-selecting a vertex refreshes its generation.
    /// Returns whether the selection changed.
    pub fn insert(&mut self, handle: VertexHandle) -> bool {
        match self.slots.get(&(handle.chunk, handle.vertex)) {
            Some(&i) => {
                let prev = self.handles[i];
                self.handles[i] = handle;
                prev != handle
            }
            None => {
                self.slots
                    .insert((handle.chunk, handle.vertex), self.handles.len());
                self.handles.push(handle);
                true
            }
        }
    }

    pub fn retain(&mut self, mut keep: impl FnMut(&VertexHandle) -> bool) -> bool {
        let before = self.handles.len();
        self.handles.retain(|h| keep(h));
        if self.handles.len() == before {
            return false;
        }
        self.slots = self
            .handles
            .iter()
            .enumerate()
            .map(|(i, h)| ((h.chunk, h.vertex), i))
            .collect();
        true
    }

    pub fn clear(&mut self) -> bool {
        let had = !self.handles.is_empty();
        self.handles.clear();
        self.slots.clear();
        had
    }
}
