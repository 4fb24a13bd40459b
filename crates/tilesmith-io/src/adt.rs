//! Tile file layout.
//!
//! ```text
//! MVER MHDR MCIN MTEX MMDX MMID MWMO MWID MDDF MODF [MH2O] MCNK*256
//! ```
//!
//! Decoding walks the record stream and ignores the offset tables, so
//! unknown or reordered records are tolerated. Encoding is deterministic.

use hashbrown::HashMap;
use log::debug;
use tilesmith_geom::{Aabb, Vec3};
use tilesmith_terrain::{
    CHUNKS_PER_SIDE, Instance, LiquidSurface, ObjectKind, TextureName, Tile, TileIndex,
};

use crate::error::FormatError;
use crate::mcnk::{self, ChunkRefs, DecodeCtx, EncodeCtx};
use crate::record::{BodyReader, RecordWriter, Records, split_names, write_names};
use crate::liquid;

pub const TILE_VERSION: u32 = 18;

const CHUNK_COUNT: usize = CHUNKS_PER_SIDE * CHUNKS_PER_SIDE;
const MODEL_ENTRY_LEN: usize = 36;
const MAP_OBJECT_ENTRY_LEN: usize = 64;

/// Header slots, as indices into the 16 `u32` header fields.
mod mhdr {
    pub const MCIN: usize = 1;
    pub const MTEX: usize = 2;
    pub const MMDX: usize = 3;
    pub const MMID: usize = 4;
    pub const MWMO: usize = 5;
    pub const MWID: usize = 6;
    pub const MDDF: usize = 7;
    pub const MODF: usize = 8;
    pub const MH2O: usize = 10;
    pub const FIELDS: usize = 16;
}

/// A decoded tile together with the placements stored in it.
#[derive(Clone, Debug)]
pub struct TileFile {
    pub tile: Tile,
    pub instances: Vec<Instance>,
}

pub fn decode_tile(index: TileIndex, data: &[u8], big_alpha: bool) -> Result<TileFile, FormatError> {
    let mut version = None;
    let mut textures = Vec::new();
    let mut model_names: &[u8] = &[];
    let mut model_ids = Vec::new();
    let mut object_names: &[u8] = &[];
    let mut object_ids = Vec::new();
    let mut models: &[u8] = &[];
    let mut objects: &[u8] = &[];
    let mut liquid_body = None;
    let mut chunk_bodies = Vec::with_capacity(CHUNK_COUNT);

    for rec in Records::new(data) {
        let rec = rec?;
        match &rec.magic {
            b"MVER" => version = Some(BodyReader::new(rec.body).u32()?),
            b"MTEX" => {
                textures = split_names(rec.body)
                    .into_iter()
                    .map(|(_, n)| TextureName::new(&n))
                    .collect()
            }
            b"MMDX" => model_names = rec.body,
            b"MMID" => model_ids = read_u32s(rec.body)?,
            b"MWMO" => object_names = rec.body,
            b"MWID" => object_ids = read_u32s(rec.body)?,
            b"MDDF" => models = rec.body,
            b"MODF" => objects = rec.body,
            b"MH2O" => liquid_body = Some(rec.body),
            b"MCNK" => chunk_bodies.push(rec.body),
            other => debug!(
                "skipping {} record at {}",
                crate::record::magic_str(*other),
                rec.offset
            ),
        }
    }

    match version {
        None => return Err(FormatError::Missing("MVER")),
        Some(TILE_VERSION) => {}
        Some(found) => return Err(FormatError::Version { what: "tile", found }),
    }
    if chunk_bodies.len() != CHUNK_COUNT {
        return Err(FormatError::ChunkCount(chunk_bodies.len()));
    }

    let mut liquids = match liquid_body {
        Some(body) => liquid::decode(body)?,
        None => vec![LiquidSurface::default(); CHUNK_COUNT],
    };
    let mut chunks = Vec::with_capacity(CHUNK_COUNT);
    for (i, body) in chunk_bodies.into_iter().enumerate() {
        let ctx = DecodeCtx {
            tile: index,
            index: i,
            big_alpha,
            textures: &textures,
        };
        let mut chunk = mcnk::decode(&ctx, body)?;
        chunk.liquid = std::mem::take(&mut liquids[i]);
        chunks.push(chunk);
    }
    let tile = Tile::from_chunks(index, big_alpha, chunks).ok_or(FormatError::ChunkCount(CHUNK_COUNT))?;

    let mut instances = Vec::new();
    let model_names = resolve_names(model_names, &model_ids)?;
    for entry in models.chunks_exact(MODEL_ENTRY_LEN) {
        instances.push(decode_model(entry, &model_names)?);
    }
    let object_names = resolve_names(object_names, &object_ids)?;
    for entry in objects.chunks_exact(MAP_OBJECT_ENTRY_LEN) {
        instances.push(decode_map_object(entry, &object_names)?);
    }
    Ok(TileFile { tile, instances })
}

fn read_u32s(body: &[u8]) -> Result<Vec<u32>, FormatError> {
    let mut r = BodyReader::new(body);
    (0..body.len() / 4).map(|_| r.u32()).collect()
}

fn resolve_names(block: &[u8], ids: &[u32]) -> Result<Vec<String>, FormatError> {
    let names: HashMap<u32, String> = split_names(block).into_iter().collect();
    ids.iter()
        .map(|ofs| names.get(ofs).cloned().ok_or(FormatError::NameOffset(*ofs)))
        .collect()
}

fn read_vec3(r: &mut BodyReader<'_>) -> Result<Vec3, FormatError> {
    Ok(Vec3::new(r.f32()?, r.f32()?, r.f32()?))
}

fn name_for(names: &[String], id: u32) -> Result<String, FormatError> {
    names.get(id as usize).cloned().ok_or(FormatError::NameId(id))
}

/// Model bounds are not stored; they default to a unit box scaled by the
/// placement scale.
pub fn model_extents(position: Vec3, scale: u16) -> Aabb {
    let half = Vec3::splat(scale as f32 / Instance::UNIT_SCALE as f32);
    Aabb::new(position - half, position + half)
}

fn decode_model(entry: &[u8], names: &[String]) -> Result<Instance, FormatError> {
    let mut r = BodyReader::new(entry);
    let name_id = r.u32()?;
    let uid = r.u32()?;
    let position = read_vec3(&mut r)?;
    let rotation = read_vec3(&mut r)?;
    let scale = r.u16()?;
    let flags = r.u16()?;
    Ok(Instance {
        uid,
        kind: ObjectKind::Model,
        filename: name_for(names, name_id)?,
        position,
        rotation,
        scale,
        flags,
        doodad_set: 0,
        name_set: 0,
        extents: model_extents(position, scale),
    })
}

fn decode_map_object(entry: &[u8], names: &[String]) -> Result<Instance, FormatError> {
    let mut r = BodyReader::new(entry);
    let name_id = r.u32()?;
    let uid = r.u32()?;
    let position = read_vec3(&mut r)?;
    let rotation = read_vec3(&mut r)?;
    let lo = read_vec3(&mut r)?;
    let hi = read_vec3(&mut r)?;
    let flags = r.u16()?;
    let doodad_set = r.u16()?;
    let name_set = r.u16()?;
    let scale = r.u16()?;
    Ok(Instance {
        uid,
        kind: ObjectKind::MapObject,
        filename: name_for(names, name_id)?,
        position,
        rotation,
        scale,
        flags,
        doodad_set,
        name_set,
        extents: Aabb::new(lo, hi),
    })
}

/// Unique names in first-seen order, plus each instance's name id.
fn name_table<'a>(instances: impl Iterator<Item = &'a Instance>) -> (Vec<&'a str>, Vec<u32>) {
    let mut seen: HashMap<&str, u32> = HashMap::new();
    let mut names = Vec::new();
    let mut ids = Vec::new();
    for inst in instances {
        let id = *seen.entry(inst.filename.as_str()).or_insert_with(|| {
            names.push(inst.filename.as_str());
            (names.len() - 1) as u32
        });
        ids.push(id);
    }
    (names, ids)
}

pub fn encode_tile(tile: &Tile, instances: &[Instance]) -> Result<Vec<u8>, FormatError> {
    let mut textures: Vec<&TextureName> = Vec::new();
    let mut texture_ids: HashMap<&TextureName, u32> = HashMap::new();
    for chunk in tile.chunks() {
        for layer in chunk.textures.layers() {
            texture_ids.entry(&layer.texture).or_insert_with(|| {
                textures.push(&layer.texture);
                (textures.len() - 1) as u32
            });
        }
    }
    let models: Vec<&Instance> = instances.iter().filter(|i| i.kind == ObjectKind::Model).collect();
    let objects: Vec<&Instance> =
        instances.iter().filter(|i| i.kind == ObjectKind::MapObject).collect();
    let (model_names, model_ids) = name_table(models.iter().copied());
    let (object_names, object_ids) = name_table(objects.iter().copied());

    let mut w = RecordWriter::new();
    w.record(b"MVER", &TILE_VERSION.to_le_bytes());
    let mhdr_start = w.begin(b"MHDR");
    let mhdr_body = w.len();
    w.zeros(mhdr::FIELDS * 4);
    w.end(mhdr_start);
    let mut header = [0u32; mhdr::FIELDS];
    let rel = |at: usize| (at - mhdr_body) as u32;

    let mcin_start = w.begin(b"MCIN");
    let mcin_body = w.len();
    w.zeros(CHUNK_COUNT * 16);
    w.end(mcin_start);
    header[mhdr::MCIN] = rel(mcin_start);

    let at = w.begin(b"MTEX");
    write_names(&mut w, textures.iter().map(|t| t.as_str()))?;
    w.end(at);
    header[mhdr::MTEX] = rel(at);

    for (names_slot, ids_slot, names, magics) in [
        (mhdr::MMDX, mhdr::MMID, &model_names, (b"MMDX", b"MMID")),
        (mhdr::MWMO, mhdr::MWID, &object_names, (b"MWMO", b"MWID")),
    ] {
        let at = w.begin(magics.0);
        let offsets = write_names(&mut w, names.iter().copied())?;
        w.end(at);
        header[names_slot] = rel(at);
        let at = w.begin(magics.1);
        for ofs in offsets {
            w.u32(ofs)?;
        }
        w.end(at);
        header[ids_slot] = rel(at);
    }

    let at = w.begin(b"MDDF");
    for (inst, &name_id) in models.iter().zip(&model_ids) {
        w.u32(name_id)?;
        w.u32(inst.uid)?;
        write_vec3(&mut w, inst.position)?;
        write_vec3(&mut w, inst.rotation)?;
        w.u16(inst.scale)?;
        w.u16(inst.flags)?;
    }
    w.end(at);
    header[mhdr::MDDF] = rel(at);

    let at = w.begin(b"MODF");
    for (inst, &name_id) in objects.iter().zip(&object_ids) {
        w.u32(name_id)?;
        w.u32(inst.uid)?;
        write_vec3(&mut w, inst.position)?;
        write_vec3(&mut w, inst.rotation)?;
        write_vec3(&mut w, inst.extents.min)?;
        write_vec3(&mut w, inst.extents.max)?;
        w.u16(inst.flags)?;
        w.u16(inst.doodad_set)?;
        w.u16(inst.name_set)?;
        w.u16(inst.scale)?;
    }
    w.end(at);
    header[mhdr::MODF] = rel(at);

    if tile.chunks().any(|c| !c.liquid.layers.is_empty()) {
        let at = w.begin(b"MH2O");
        let surfaces: Vec<&LiquidSurface> = tile.chunks().map(|c| &c.liquid).collect();
        liquid::encode(&mut w, &surfaces)?;
        w.end(at);
        header[mhdr::MH2O] = rel(at);
    }

    let texture_id = |name: &TextureName| texture_ids.get(name).copied().unwrap_or(0);
    let ctx = EncodeCtx {
        big_alpha: tile.big_alpha,
        texture_id: &texture_id,
    };
    for (i, chunk) in tile.chunks().enumerate() {
        let bounds = chunk.aabb();
        let refs = ChunkRefs {
            models: overlapping(&models, &bounds),
            map_objects: overlapping(&objects, &bounds),
        };
        let start = w.len();
        mcnk::encode(&mut w, &ctx, chunk, &refs)?;
        let entry = mcin_body + i * 16;
        w.patch_u32(entry, start as u32);
        w.patch_u32(entry + 4, (w.len() - start) as u32);
    }

    for (slot, v) in header.iter().enumerate() {
        w.patch_u32(mhdr_body + slot * 4, *v);
    }
    Ok(w.into_inner())
}

/// Indices of the instances whose extents overlap `bounds` on the ground plane.
fn overlapping(list: &[&Instance], bounds: &Aabb) -> Vec<u32> {
    list.iter()
        .enumerate()
        .filter(|(_, inst)| {
            inst.extents.min.x <= bounds.max.x
                && inst.extents.max.x >= bounds.min.x
                && inst.extents.min.z <= bounds.max.z
                && inst.extents.max.z >= bounds.min.z
        })
        .map(|(i, _)| i as u32)
        .collect()
}

fn write_vec3(w: &mut RecordWriter, v: Vec3) -> Result<(), FormatError> {
    w.f32(v.x)?;
    w.f32(v.y)?;
    w.f32(v.z)
}
