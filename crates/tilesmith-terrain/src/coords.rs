use serde::{Deserialize, Serialize};
use tilesmith_geom::{Aabb, Vec3};

use crate::{CHUNK_SIZE, CHUNKS_PER_SIDE, TILE_SIZE, TILES_PER_SIDE, UNIT_SIZE, UNITS_PER_CHUNK};

/// Tile coordinate on the 64x64 map grid. Orders row-major (z, then x).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileIndex {
    pub z: usize,
    pub x: usize,
}

impl TileIndex {
    #[inline]
    pub const fn new(x: usize, z: usize) -> Self {
        Self { x, z }
    }

    /// `None` outside the map; this is a boundary, not a fault.
    pub fn from_xz(x: f32, z: f32) -> Option<Self> {
        let tx = grid_cell(x, TILE_SIZE, TILES_PER_SIDE)?;
        let tz = grid_cell(z, TILE_SIZE, TILES_PER_SIDE)?;
        Some(Self::new(tx, tz))
    }

    #[inline]
    pub fn from_pos(pos: Vec3) -> Option<Self> {
        Self::from_xz(pos.x, pos.z)
    }

    #[inline]
    pub fn is_valid(self) -> bool {
        self.x < TILES_PER_SIDE && self.z < TILES_PER_SIDE
    }

    /// Row-major slot in a 64*64 table.
    #[inline]
    pub fn slot(self) -> usize {
        self.z * TILES_PER_SIDE + self.x
    }

    #[inline]
    pub fn from_slot(slot: usize) -> Self {
        Self::new(slot % TILES_PER_SIDE, slot / TILES_PER_SIDE)
    }

    #[inline]
    pub fn xbase(self) -> f32 {
        self.x as f32 * TILE_SIZE
    }

    #[inline]
    pub fn zbase(self) -> f32 {
        self.z as f32 * TILE_SIZE
    }

    pub fn offset(self, dx: i32, dz: i32) -> Option<Self> {
        let x = self.x as i64 + dx as i64;
        let z = self.z as i64 + dz as i64;
        if x < 0 || z < 0 {
            return None;
        }
        let t = Self::new(x as usize, z as usize);
        t.is_valid().then_some(t)
    }

    /// Ground footprint with an unbounded height range.
    pub fn bounds(self) -> Aabb {
        Aabb::new(
            Vec3::new(self.xbase(), f32::MIN, self.zbase()),
            Vec3::new(self.xbase() + TILE_SIZE, f32::MAX, self.zbase() + TILE_SIZE),
        )
    }
}

impl From<(usize, usize)> for TileIndex {
    fn from(value: (usize, usize)) -> Self {
        Self::new(value.0, value.1)
    }
}

/// A chunk addressed by owning tile and position inside it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChunkKey {
    pub tile: TileIndex,
    pub cz: usize,
    pub cx: usize,
}

impl ChunkKey {
    #[inline]
    pub const fn new(tile: TileIndex, cx: usize, cz: usize) -> Self {
        Self { tile, cz, cx }
    }

    pub fn from_xz(x: f32, z: f32) -> Option<Self> {
        let gx = grid_cell(x, CHUNK_SIZE, TILES_PER_SIDE * CHUNKS_PER_SIDE)?;
        let gz = grid_cell(z, CHUNK_SIZE, TILES_PER_SIDE * CHUNKS_PER_SIDE)?;
        Some(Self::from_global(gx, gz))
    }

    #[inline]
    pub fn from_pos(pos: Vec3) -> Option<Self> {
        Self::from_xz(pos.x, pos.z)
    }

    #[inline]
    fn from_global(gx: usize, gz: usize) -> Self {
        Self::new(
            TileIndex::new(gx / CHUNKS_PER_SIDE, gz / CHUNKS_PER_SIDE),
            gx % CHUNKS_PER_SIDE,
            gz % CHUNKS_PER_SIDE,
        )
    }

    /// Chunk column/row on the whole-map chunk grid.
    #[inline]
    pub fn global(self) -> (usize, usize) {
        (
            self.tile.x * CHUNKS_PER_SIDE + self.cx,
            self.tile.z * CHUNKS_PER_SIDE + self.cz,
        )
    }

    pub fn neighbor(self, dx: i32, dz: i32) -> Option<Self> {
        let (gx, gz) = self.global();
        let nx = gx as i64 + dx as i64;
        let nz = gz as i64 + dz as i64;
        let side = (TILES_PER_SIDE * CHUNKS_PER_SIDE) as i64;
        if nx < 0 || nz < 0 || nx >= side || nz >= side {
            return None;
        }
        Some(Self::from_global(nx as usize, nz as usize))
    }

    /// Corner of the chunk on the whole-map vertex lattice, in units.
    #[inline]
    pub fn lattice_origin(self) -> (f32, f32) {
        let (gx, gz) = self.global();
        ((gx * UNITS_PER_CHUNK) as f32, (gz * UNITS_PER_CHUNK) as f32)
    }

    /// World position of the lattice point `(ox, oz)` units from the corner.
    /// Chunks sharing a vertex get the same bits for it.
    #[inline]
    pub fn lattice_xz(self, ox: f32, oz: f32) -> (f32, f32) {
        let (lx, lz) = self.lattice_origin();
        ((lx + ox) * UNIT_SIZE, (lz + oz) * UNIT_SIZE)
    }

    #[inline]
    pub fn xbase(self) -> f32 {
        self.lattice_xz(0.0, 0.0).0
    }

    #[inline]
    pub fn zbase(self) -> f32 {
        self.lattice_xz(0.0, 0.0).1
    }
}

fn grid_cell(v: f32, cell: f32, count: usize) -> Option<usize> {
    if !v.is_finite() || v < 0.0 {
        return None;
    }
    let i = (v / cell).floor() as usize;
    (i < count).then_some(i)
}
