use tilesmith_geom::{Aabb, Vec3};

use crate::coords::TileIndex;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Doodad model.
    Model,
    /// Map object (building, cave...).
    MapObject,
}

/// A placed model or map object.
#[derive(Clone, Debug, PartialEq)]
pub struct Instance {
    pub uid: u32,
    pub kind: ObjectKind,
    pub filename: String,
    pub position: Vec3,
    /// Degrees, file order.
    pub rotation: Vec3,
    /// 1024 = 1.0 for models; map objects keep whatever was loaded.
    pub scale: u16,
    pub flags: u16,
    pub doodad_set: u16,
    pub name_set: u16,
    pub extents: Aabb,
}

impl Instance {
    pub const UNIT_SCALE: u16 = 1024;

    pub fn scale_factor(&self) -> f32 {
        self.scale as f32 / Self::UNIT_SCALE as f32
    }

    /// Tiles overlapped by the extents, clamped to the map.
    pub fn covered_tiles(&self) -> Vec<TileIndex> {
        covered_tiles(&self.extents)
    }

    /// Same file at the same placement.
    pub fn is_duplicate_of(&self, other: &Instance) -> bool {
        const EPS: f32 = 1e-3;
        let close = |a: Vec3, b: Vec3| {
            (a.x - b.x).abs() < EPS && (a.y - b.y).abs() < EPS && (a.z - b.z).abs() < EPS
        };
        self.kind == other.kind
            && self.filename.eq_ignore_ascii_case(&other.filename)
            && close(self.position, other.position)
            && close(self.rotation, other.rotation)
            && self.scale == other.scale
    }
}

pub fn covered_tiles(extents: &Aabb) -> Vec<TileIndex> {
    let clamp = |v: f32| v.clamp(0.0, crate::MAP_SIZE - 1.0);
    let (Some(start), Some(end)) = (
        TileIndex::from_xz(clamp(extents.min.x), clamp(extents.min.z)),
        TileIndex::from_xz(clamp(extents.max.x), clamp(extents.max.z)),
    ) else {
        return Vec::new();
    };
    let mut out = Vec::new();
    for z in start.z.min(end.z)..=start.z.max(end.z) {
        for x in start.x.min(end.x)..=start.x.max(end.x) {
            out.push(TileIndex::new(x, z));
        }
    }
    out
}
