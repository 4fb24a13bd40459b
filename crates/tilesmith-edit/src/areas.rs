use tilesmith_geom::Vec3;

use crate::context::EditContext;

impl EditContext<'_> {
    /// Toggles the hole cell under `pos`, or the whole chunk when `big`.
    pub fn set_hole(&mut self, pos: Vec3, big: bool, hole: bool) -> bool {
        let keys: Vec<_> = self.chunk_at(pos).into_iter().collect();
        let changed = self.apply(&keys, |c| c.set_hole(pos, big, hole));
        self.commit(&changed, false)
    }

    /// Opens or closes every hole on the tile under `pos`.
    pub fn set_hole_tile(&mut self, pos: Vec3, hole: bool) -> bool {
        let keys = self.chunks_on_tile(pos);
        let changed = self.apply(&keys, |c| c.set_hole(pos, true, hole));
        self.commit(&changed, false)
    }

    pub fn area_id_at(&mut self, pos: Vec3) -> Option<u32> {
        let key = self.chunk_at(pos)?;
        self.index.chunk(key).map(|c| c.area_id)
    }

    /// Assigns `id` to the chunk under `pos`, or to its whole tile.
    pub fn set_area_id(&mut self, pos: Vec3, id: u32, whole_tile: bool) -> bool {
        let keys = if whole_tile {
            self.chunks_on_tile(pos)
        } else {
            self.chunk_at(pos).into_iter().collect()
        };
        let changed = self.apply(&keys, |c| c.set_area_id(id));
        self.commit(&changed, false)
    }
}
