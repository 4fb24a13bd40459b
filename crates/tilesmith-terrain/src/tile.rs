use tilesmith_geom::{Aabb, Vec3};

use crate::chunk::Chunk;
use crate::coords::{ChunkKey, TileIndex};
use crate::{CHUNK_SIZE, CHUNKS_PER_SIDE, TILE_SIZE};

/// A map tile: 16x16 chunks stored row-major.
#[derive(Clone, Debug, PartialEq)]
pub struct Tile {
    pub index: TileIndex,
    /// Alpha maps are written with 8-bit weights.
    pub big_alpha: bool,
    chunks: Vec<Chunk>,
}

impl Tile {
    pub fn flat(index: TileIndex, height: f32, big_alpha: bool) -> Self {
        let chunks = (0..CHUNKS_PER_SIDE * CHUNKS_PER_SIDE)
            .map(|i| Chunk::flat(index, i % CHUNKS_PER_SIDE, i / CHUNKS_PER_SIDE, height))
            .collect();
        Self {
            index,
            big_alpha,
            chunks,
        }
    }

    /// `None` unless exactly 256 chunks are supplied in row-major order.
    pub fn from_chunks(index: TileIndex, big_alpha: bool, chunks: Vec<Chunk>) -> Option<Self> {
        if chunks.len() != CHUNKS_PER_SIDE * CHUNKS_PER_SIDE {
            return None;
        }
        let ordered = chunks
            .iter()
            .enumerate()
            .all(|(i, c)| c.cx == i % CHUNKS_PER_SIDE && c.cz == i / CHUNKS_PER_SIDE);
        ordered.then_some(Self {
            index,
            big_alpha,
            chunks,
        })
    }

    #[inline]
    pub fn xbase(&self) -> f32 {
        self.index.xbase()
    }

    #[inline]
    pub fn zbase(&self) -> f32 {
        self.index.zbase()
    }

    #[inline]
    pub fn chunk(&self, cx: usize, cz: usize) -> &Chunk {
        &self.chunks[cz * CHUNKS_PER_SIDE + cx]
    }

    #[inline]
    pub fn chunk_mut(&mut self, cx: usize, cz: usize) -> &mut Chunk {
        &mut self.chunks[cz * CHUNKS_PER_SIDE + cx]
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> {
        self.chunks.iter()
    }

    pub fn chunks_mut(&mut self) -> impl Iterator<Item = &mut Chunk> {
        self.chunks.iter_mut()
    }

    pub fn key(&self, chunk: &Chunk) -> ChunkKey {
        ChunkKey::new(self.index, chunk.cx, chunk.cz)
    }

    /// Chunk under a world position, if it lies on this tile.
    pub fn chunk_at(&self, x: f32, z: f32) -> Option<&Chunk> {
        let (cx, cz) = self.local_chunk(x, z)?;
        Some(self.chunk(cx, cz))
    }

    pub fn chunk_at_mut(&mut self, x: f32, z: f32) -> Option<&mut Chunk> {
        let (cx, cz) = self.local_chunk(x, z)?;
        Some(self.chunk_mut(cx, cz))
    }

    fn local_chunk(&self, x: f32, z: f32) -> Option<(usize, usize)> {
        let lx = (x - self.xbase()) / CHUNK_SIZE;
        let lz = (z - self.zbase()) / CHUNK_SIZE;
        let side = CHUNKS_PER_SIDE as f32;
        if !(0.0..side).contains(&lx) || !(0.0..side).contains(&lz) {
            return None;
        }
        Some((lx as usize, lz as usize))
    }

    /// Chunks whose box touches the circle; a superset of the brush footprint.
    pub fn chunks_in_range(&self, pos: Vec3, radius: f32) -> Vec<ChunkKey> {
        self.chunks
            .iter()
            .filter(|c| c.aabb().intersects_circle_xz(pos, radius))
            .map(|c| self.key(c))
            .collect()
    }

    pub fn height_at(&self, x: f32, z: f32) -> Option<f32> {
        self.chunk_at(x, z)?.height_at(x, z)
    }

    pub fn aabb(&self) -> Aabb {
        let (lo, hi) = self.chunks.iter().fold(
            (f32::INFINITY, f32::NEG_INFINITY),
            |(lo, hi), c| (lo.min(c.min_height()), hi.max(c.max_height())),
        );
        Aabb::new(
            Vec3::new(self.xbase(), lo, self.zbase()),
            Vec3::new(self.xbase() + TILE_SIZE, hi, self.zbase() + TILE_SIZE),
        )
    }

    /// Switches the alpha encoding. Returns whether any weight was requantized.
    pub fn convert_alphamap(&mut self, to_big: bool) -> bool {
        self.big_alpha = to_big;
        let mut changed = false;
        for chunk in self.chunks.iter_mut() {
            changed |= if to_big {
                chunk.textures.convert_to_big_alpha()
            } else {
                chunk.textures.convert_to_old_alpha()
            };
        }
        changed
    }

    /// Stitches internal chunk seams; returns the keys that moved.
    pub fn fix_internal_gaps(&mut self) -> Vec<ChunkKey> {
        let mut moved = Vec::new();
        for cz in 0..CHUNKS_PER_SIDE {
            for cx in 0..CHUNKS_PER_SIDE {
                let mut changed = false;
                if cx > 0 {
                    let edge = self.chunk(cx - 1, cz).right_edge();
                    changed |= self.chunk_mut(cx, cz).apply_left_edge(&edge);
                }
                if cz > 0 {
                    let edge = self.chunk(cx, cz - 1).bottom_edge();
                    changed |= self.chunk_mut(cx, cz).apply_top_edge(&edge);
                }
                if changed {
                    moved.push(ChunkKey::new(self.index, cx, cz));
                }
            }
        }
        moved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brush::{Brush, BrushShape};
    use crate::chunk::outer_index;

    #[test]
    fn flat_tile_is_row_major() {
        let t = Tile::flat(TileIndex::new(1, 2), 0.0, false);
        assert_eq!(t.chunks().count(), 256);
        let c = t.chunk(5, 7);
        assert_eq!((c.cx, c.cz), (5, 7));
        let x = t.xbase() + 5.5 * CHUNK_SIZE;
        let z = t.zbase() + 7.5 * CHUNK_SIZE;
        assert_eq!(t.chunk_at(x, z).map(|c| (c.cx, c.cz)), Some((5, 7)));
        assert!(t.chunk_at(t.xbase() - 1.0, z).is_none());
    }

    #[test]
    fn chunks_in_range_includes_neighbours_of_a_border_dab() {
        let t = Tile::flat(TileIndex::new(1, 2), 0.0, false);
        let pos = Vec3::new(t.xbase() + CHUNK_SIZE * 4.0, 0.0, t.zbase() + CHUNK_SIZE * 4.0);
        let keys = t.chunks_in_range(pos, 1.0);
        assert_eq!(keys.len(), 4);
        assert!(t.chunks_in_range(pos, 0.0).len() >= 1);
    }

    #[test]
    fn internal_gaps_are_stitched() {
        let mut t = Tile::flat(TileIndex::new(0, 0), 0.0, false);
        let brush = Brush::new(BrushShape::Flat, CHUNK_SIZE, 0.0);
        let c = t.chunk(2, 2);
        let pos = Vec3::new(c.xbase + CHUNK_SIZE * 0.5, 0.0, c.zbase + CHUNK_SIZE * 0.5);
        t.chunk_mut(2, 2).change_terrain(pos, 4.0, &brush);
        let moved = t.fix_internal_gaps();
        assert!(moved.contains(&ChunkKey::new(t.index, 3, 2)));
        assert!(moved.contains(&ChunkKey::new(t.index, 2, 3)));
        for r in 0..9 {
            assert_eq!(
                t.chunk(3, 2).height(outer_index(r, 0)),
                t.chunk(2, 2).height(outer_index(r, 8))
            );
        }
        assert!(t.fix_internal_gaps().is_empty());
    }
}
