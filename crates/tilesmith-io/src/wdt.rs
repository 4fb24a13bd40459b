//! Map header: global flags plus the 64x64 "tile exists" table.

use tilesmith_geom::{Aabb, Vec3};
use tilesmith_terrain::{Instance, ObjectKind, TILES_PER_SIDE, TileIndex};

use crate::error::FormatError;
use crate::record::{BodyReader, RecordWriter, Records, split_names, write_names};

pub const MAP_VERSION: u32 = 18;

const MPHD_LEN: usize = 32;
const MAIN_ENTRY_LEN: usize = 8;
const TILE_SLOTS: usize = TILES_PER_SIDE * TILES_PER_SIDE;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MapFlags(pub u32);

impl MapFlags {
    pub const GLOBAL_MAP_OBJECT: u32 = 0x1;
    pub const BIG_ALPHA: u32 = 0x4;

    #[inline]
    pub fn contains(self, bits: u32) -> bool {
        self.0 & bits == bits
    }

    #[inline]
    pub fn set(&mut self, bits: u32, on: bool) {
        if on {
            self.0 |= bits;
        } else {
            self.0 &= !bits;
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MapHeader {
    pub flags: MapFlags,
    exists: Vec<bool>,
    /// Map-wide object for maps without terrain tiles.
    pub global_object: Option<Instance>,
}

impl Default for MapHeader {
    fn default() -> Self {
        Self {
            flags: MapFlags::default(),
            exists: vec![false; TILE_SLOTS],
            global_object: None,
        }
    }
}

impl MapHeader {
    pub fn big_alpha(&self) -> bool {
        self.flags.contains(MapFlags::BIG_ALPHA)
    }

    pub fn set_big_alpha(&mut self, on: bool) {
        self.flags.set(MapFlags::BIG_ALPHA, on);
    }

    #[inline]
    pub fn tile_exists(&self, idx: TileIndex) -> bool {
        idx.is_valid() && self.exists[idx.slot()]
    }

    pub fn set_tile_exists(&mut self, idx: TileIndex, on: bool) -> bool {
        if !idx.is_valid() || self.exists[idx.slot()] == on {
            return false;
        }
        self.exists[idx.slot()] = on;
        true
    }

    /// Present tiles in row-major order.
    pub fn tiles(&self) -> impl Iterator<Item = TileIndex> + '_ {
        self.exists
            .iter()
            .enumerate()
            .filter(|(_, e)| **e)
            .map(|(slot, _)| TileIndex::from_slot(slot))
    }

    pub fn tile_count(&self) -> usize {
        self.exists.iter().filter(|e| **e).count()
    }
}

pub fn decode_map_header(data: &[u8]) -> Result<MapHeader, FormatError> {
    let mut header = MapHeader::default();
    let mut version = None;
    let mut seen_main = false;
    let mut object_name = None;
    let mut object_entry = None;
    for rec in Records::new(data) {
        let rec = rec?;
        match &rec.magic {
            b"MVER" => version = Some(BodyReader::new(rec.body).u32()?),
            b"MPHD" => header.flags = MapFlags(BodyReader::new(rec.body).u32()?),
            b"MAIN" => {
                seen_main = true;
                let mut r = BodyReader::new(rec.body);
                for slot in header.exists.iter_mut() {
                    *slot = r.u32()? & 0x1 != 0;
                    r.skip(MAIN_ENTRY_LEN - 4);
                }
            }
            b"MWMO" => object_name = split_names(rec.body).into_iter().next().map(|(_, n)| n),
            b"MODF" => object_entry = Some(rec.body),
            _ => {}
        }
    }
    match version {
        None => return Err(FormatError::Missing("MVER")),
        Some(MAP_VERSION) => {}
        Some(found) => return Err(FormatError::Version { what: "map", found }),
    }
    if !seen_main {
        return Err(FormatError::Missing("MAIN"));
    }
    if let (Some(filename), Some(entry)) = (object_name, object_entry) {
        let mut r = BodyReader::new(entry);
        let _name_id = r.u32()?;
        let uid = r.u32()?;
        let mut v = || -> Result<Vec3, FormatError> {
            Ok(Vec3::new(r.f32()?, r.f32()?, r.f32()?))
        };
        let position = v()?;
        let rotation = v()?;
        let lo = v()?;
        let hi = v()?;
        let flags = r.u16()?;
        let doodad_set = r.u16()?;
        let name_set = r.u16()?;
        let scale = r.u16()?;
        header.global_object = Some(Instance {
            uid,
            kind: ObjectKind::MapObject,
            filename,
            position,
            rotation,
            scale,
            flags,
            doodad_set,
            name_set,
            extents: Aabb::new(lo, hi),
        });
    }
    Ok(header)
}

pub fn encode_map_header(header: &MapHeader) -> Result<Vec<u8>, FormatError> {
    let mut w = RecordWriter::new();
    w.record(b"MVER", &MAP_VERSION.to_le_bytes());

    let mut flags = header.flags;
    flags.set(MapFlags::GLOBAL_MAP_OBJECT, header.global_object.is_some());
    let at = w.begin(b"MPHD");
    w.u32(flags.0)?;
    w.zeros(MPHD_LEN - 4);
    w.end(at);

    let at = w.begin(b"MAIN");
    for &e in &header.exists {
        w.u32(u32::from(e))?;
        w.u32(0)?;
    }
    w.end(at);

    let at = w.begin(b"MWMO");
    if let Some(obj) = &header.global_object {
        write_names(&mut w, [obj.filename.as_str()])?;
    }
    w.end(at);

    if let Some(obj) = &header.global_object {
        let at = w.begin(b"MODF");
        w.u32(0)?;
        w.u32(obj.uid)?;
        for v in [obj.position, obj.rotation, obj.extents.min, obj.extents.max] {
            w.f32(v.x)?;
            w.f32(v.y)?;
            w.f32(v.z)?;
        }
        w.u16(obj.flags)?;
        w.u16(obj.doodad_set)?;
        w.u16(obj.name_set)?;
        w.u16(obj.scale)?;
        w.end(at);
    }
    Ok(w.into_inner())
}
