//! Terrain chunk record: a 128-byte header followed by sub-records.

use tilesmith_geom::Vec3;
use tilesmith_terrain::chunk::ChunkExtras;
use tilesmith_terrain::{
    AlphaMap, Chunk, ChunkFlags, LayerFlags, MAP_VERTICES, TextureLayer, TextureName, TextureSet, TileIndex,
    VertexColor, ZERO_POINT,
};

use crate::alpha::{self, AlphaFormat};
use crate::error::FormatError;
use crate::record::{BodyReader, HEADER_LEN, RecordWriter, Records};

pub const CHUNK_HEADER_LEN: usize = 128;
const NORMAL_PADDING: usize = 13;
const SHADOW_LEN: usize = 512;
const LAYER_LEN: usize = 16;

/// Header fields read back on decode; the rest are recomputed on encode.
mod ofs {
    pub const AREA: usize = 52;
    pub const HOLES: usize = 60;
    pub const LOW_QUALITY: usize = 64;
    pub const NO_EFFECT_DOODAD: usize = 80;
    pub const POSITION: usize = 104;
}

/// Per-chunk placement references, as indices into the tile's model and
/// map object lists.
#[derive(Clone, Debug, Default)]
pub struct ChunkRefs {
    pub models: Vec<u32>,
    pub map_objects: Vec<u32>,
}

pub struct DecodeCtx<'a> {
    pub tile: TileIndex,
    pub index: usize,
    pub big_alpha: bool,
    pub textures: &'a [TextureName],
}

pub fn decode(ctx: &DecodeCtx<'_>, body: &[u8]) -> Result<Chunk, FormatError> {
    let mut h = BodyReader::new(body);
    let flags = ChunkFlags(h.u32()?);
    let ix = h.u32()?;
    let iy = h.u32()?;
    let cx = ctx.index % 16;
    let cz = ctx.index / 16;
    if ix as usize != cx || iy as usize != cz {
        return Err(FormatError::ChunkOrder {
            index: ctx.index,
            ix,
            iy,
        });
    }
    let mut h = BodyReader::at(body, ofs::AREA);
    let area_id = h.u32()?;
    let mut h = BodyReader::at(body, ofs::HOLES);
    let holes = h.u16()?;
    let low_quality_textures = BodyReader::at(body, ofs::LOW_QUALITY).bytes::<16>()?;
    let no_effect_doodad = BodyReader::at(body, ofs::NO_EFFECT_DOODAD).u64()?;
    let mut h = BodyReader::at(body, ofs::POSITION);
    h.skip(8);
    let ybase = h.f32()?;

    let mut relative = None;
    let mut normals = [Vec3::UP; MAP_VERTICES];
    let mut colors = [VertexColor::NEUTRAL; MAP_VERTICES];
    let mut layers = Vec::new();
    let mut alpha_block: &[u8] = &[];
    let mut shadow = None;

    for rec in Records::new(body.get(CHUNK_HEADER_LEN..).unwrap_or_default()) {
        let rec = rec?;
        let mut r = BodyReader::new(rec.body);
        match &rec.magic {
            b"MCVT" => {
                let mut hs = [0f32; MAP_VERTICES];
                for v in hs.iter_mut() {
                    *v = r.f32()?;
                }
                relative = Some(hs);
            }
            b"MCNR" => {
                for n in normals.iter_mut() {
                    let x = r.i8()? as f32 / 127.0;
                    let z = r.i8()? as f32 / 127.0;
                    let y = r.i8()? as f32 / 127.0;
                    *n = Vec3::new(x, y, z);
                }
            }
            b"MCCV" => {
                for c in colors.iter_mut() {
                    let [b, g, red, a] = r.bytes::<4>()?;
                    *c = VertexColor { b, g, r: red, a };
                }
            }
            b"MCLY" => {
                for _ in 0..rec.body.len() / LAYER_LEN {
                    let texture_id = r.u32()?;
                    let layer_flags = LayerFlags(r.u32()?);
                    let ofs_alpha = r.u32()? as usize;
                    let effect_id = r.u32()?;
                    let texture = ctx
                        .textures
                        .get(texture_id as usize)
                        .cloned()
                        .ok_or(FormatError::TextureId(texture_id))?;
                    layers.push((
                        TextureLayer {
                            texture,
                            flags: layer_flags,
                            effect_id,
                            alpha: None,
                        },
                        ofs_alpha,
                    ));
                }
            }
            b"MCSH" => {
                let mut map = Box::new([0u8; SHADOW_LEN]);
                let n = rec.body.len().min(SHADOW_LEN);
                map[..n].copy_from_slice(&rec.body[..n]);
                shadow = Some(map);
            }
            b"MCAL" => alpha_block = rec.body,
            _ => {}
        }
    }

    let relative = relative.ok_or(FormatError::Missing("MCVT"))?;
    let fix_edges = !flags.contains(ChunkFlags::DO_NOT_FIX_ALPHA);
    let mut decoded = Vec::with_capacity(layers.len());
    for (i, (mut layer, ofs_alpha)) in layers.into_iter().enumerate() {
        if i > 0 && layer.flags.contains(LayerFlags::USE_ALPHA) {
            let format = match (ctx.big_alpha, layer.flags.contains(LayerFlags::COMPRESSED)) {
                (false, _) => AlphaFormat::Packed4,
                (true, false) => AlphaFormat::Raw8,
                (true, true) => AlphaFormat::Rle8,
            };
            let (map, _) = alpha_block
                .get(ofs_alpha..)
                .and_then(|data| alpha::decode(data, format, fix_edges))
                .ok_or(FormatError::Alpha {
                    chunk: ctx.index,
                    layer: i,
                })?;
            layer.alpha = Some(map);
        }
        decoded.push(layer);
    }

    let mut chunk = Chunk::from_file(ctx.tile, cx, cz, ybase, relative, normals, colors);
    chunk.flags = flags;
    chunk.area_id = area_id;
    chunk.holes = holes;
    chunk.shadow = shadow.filter(|_| flags.contains(ChunkFlags::HAS_SHADOW));
    chunk.textures = TextureSet::from_layers(decoded);
    chunk.extras = ChunkExtras {
        low_quality_textures,
        no_effect_doodad,
    };
    Ok(chunk)
}

pub struct EncodeCtx<'a> {
    pub big_alpha: bool,
    pub texture_id: &'a dyn Fn(&TextureName) -> u32,
}

/// Writes one complete chunk record (magic included).
pub fn encode(
    w: &mut RecordWriter,
    ctx: &EncodeCtx<'_>,
    chunk: &Chunk,
    refs: &ChunkRefs,
) -> Result<(), FormatError> {
    let start = w.begin(b"MCNK");
    let header = w.len();
    w.zeros(CHUNK_HEADER_LEN);
    let rel = |at: usize| (at - start) as u32;

    let mut flags = chunk.flags;
    flags.set(ChunkFlags::HAS_SHADOW, chunk.shadow.is_some());
    if !ctx.big_alpha {
        flags.set(ChunkFlags::DO_NOT_FIX_ALPHA, true);
    }

    let mcvt = w.begin(b"MCVT");
    for h in chunk.relative_heights() {
        w.f32(h)?;
    }
    w.end(mcvt);

    let mut mccv = 0;
    if flags.contains(ChunkFlags::HAS_VERTEX_COLORS) {
        mccv = w.begin(b"MCCV");
        for c in chunk.colors() {
            w.bytes(&[c.b, c.g, c.r, c.a]);
        }
        w.end(mccv);
    }

    let mcnr = w.begin(b"MCNR");
    let q = |v: f32| (v * 127.0).round().clamp(-127.0, 127.0) as i8;
    for n in chunk.normals() {
        w.i8(q(n.x))?;
        w.i8(q(n.z))?;
        w.i8(q(n.y))?;
    }
    w.zeros(NORMAL_PADDING);
    w.end(mcnr);

    let quantized;
    let alphas: Vec<Option<&AlphaMap>> = if ctx.big_alpha {
        chunk.textures.layers().iter().map(|l| l.alpha.as_ref()).collect()
    } else {
        quantized = chunk.textures.quantized_old_alphas();
        quantized.iter().map(Option::as_ref).collect()
    };
    let mut alpha_data = Vec::new();
    let mcly = w.begin(b"MCLY");
    for (i, layer) in chunk.textures.layers().iter().enumerate() {
        let mut layer_flags = layer.flags;
        let mut ofs_alpha = 0;
        if i > 0 {
            layer_flags.set(LayerFlags::USE_ALPHA, true);
            let compressed = ctx.big_alpha && layer_flags.contains(LayerFlags::COMPRESSED);
            layer_flags.set(LayerFlags::COMPRESSED, compressed);
            let format = match (ctx.big_alpha, compressed) {
                (false, _) => AlphaFormat::Packed4,
                (true, false) => AlphaFormat::Raw8,
                (true, true) => AlphaFormat::Rle8,
            };
            ofs_alpha = alpha_data.len() as u32;
            let bytes = match alphas.get(i).copied().flatten() {
                Some(map) => alpha::encode(map, format),
                None => alpha::encode(&AlphaMap::zeroed(), format),
            };
            alpha_data.extend(bytes);
        }
        w.u32((ctx.texture_id)(&layer.texture))?;
        w.u32(layer_flags.0)?;
        w.u32(ofs_alpha)?;
        w.u32(layer.effect_id)?;
    }
    w.end(mcly);

    let mcrf = w.begin(b"MCRF");
    for &r in refs.models.iter().chain(&refs.map_objects) {
        w.u32(r)?;
    }
    w.end(mcrf);

    let mut mcsh = 0;
    if let Some(shadow) = &chunk.shadow {
        mcsh = w.record(b"MCSH", &shadow[..]);
    }

    let mcal = w.record(b"MCAL", &alpha_data);
    w.end(start);

    let mut hw = RecordWriter::new();
    hw.u32(flags.0)?;
    hw.u32(chunk.cx as u32)?;
    hw.u32(chunk.cz as u32)?;
    hw.u32(chunk.textures.len() as u32)?;
    hw.u32(refs.models.len() as u32)?;
    hw.u32(rel(mcvt))?;
    hw.u32(rel(mcnr))?;
    hw.u32(rel(mcly))?;
    hw.u32(rel(mcrf))?;
    hw.u32(rel(mcal))?;
    hw.u32((alpha_data.len() + HEADER_LEN) as u32)?;
    hw.u32(if mcsh != 0 { rel(mcsh) } else { 0 })?;
    hw.u32(if mcsh != 0 { (SHADOW_LEN + HEADER_LEN) as u32 } else { 0 })?;
    hw.u32(chunk.area_id)?;
    hw.u32(refs.map_objects.len() as u32)?;
    hw.u16(chunk.holes)?;
    hw.u16(0)?;
    hw.bytes(&chunk.extras.low_quality_textures);
    hw.u64(chunk.extras.no_effect_doodad)?;
    // Sound emitters and legacy liquid.
    hw.zeros(16);
    hw.f32(ZERO_POINT - chunk.zbase)?;
    hw.f32(ZERO_POINT - chunk.xbase)?;
    hw.f32(chunk.ybase)?;
    hw.u32(if mccv != 0 { rel(mccv) } else { 0 })?;
    hw.zeros(8);
    let bytes = hw.into_inner();
    debug_assert_eq!(bytes.len(), CHUNK_HEADER_LEN);
    w.buf[header..header + CHUNK_HEADER_LEN].copy_from_slice(&bytes);
    Ok(())
}
