//! Tile liquid record: 256 chunk headers followed by instances, visibility
//! bitmaps and vertex data. Offsets are relative to the record body.

use tilesmith_terrain::liquid::{LIQUID_CELLS, LIQUID_VERTS};
use tilesmith_terrain::{LiquidLayer, LiquidSurface};

use crate::error::FormatError;
use crate::record::{BodyReader, RecordWriter};

const CHUNKS: usize = 256;
const HEADER_LEN: usize = 12;
const INSTANCE_LEN: usize = 24;

pub fn decode(body: &[u8]) -> Result<Vec<LiquidSurface>, FormatError> {
    let mut out = Vec::with_capacity(CHUNKS);
    for chunk in 0..CHUNKS {
        let mut r = BodyReader::at(body, chunk * HEADER_LEN);
        let ofs_instances = r.u32()? as usize;
        let count = r.u32()? as usize;
        let _ofs_attributes = r.u32()?;
        let mut surface = LiquidSurface::default();
        if ofs_instances != 0 {
            for i in 0..count {
                let layer = decode_instance(body, ofs_instances + i * INSTANCE_LEN)
                    .map_err(|reason| match reason {
                        InstanceError::Format(e) => e,
                        InstanceError::Invalid(reason) => FormatError::Liquid { chunk, reason },
                    })?;
                if layer.mask != 0 {
                    surface.layers.push(layer);
                }
            }
        }
        out.push(surface);
    }
    Ok(out)
}

enum InstanceError {
    Format(FormatError),
    Invalid(&'static str),
}

impl From<FormatError> for InstanceError {
    fn from(e: FormatError) -> Self {
        InstanceError::Format(e)
    }
}

fn decode_instance(body: &[u8], at: usize) -> Result<LiquidLayer, InstanceError> {
    let mut r = BodyReader::at(body, at);
    let liquid_id = r.u16()?;
    let format = r.u16()?;
    let min_height = r.f32()?;
    let _max_height = r.f32()?;
    let x0 = r.u8()? as usize;
    let y0 = r.u8()? as usize;
    let w = r.u8()? as usize;
    let h = r.u8()? as usize;
    let ofs_exists = r.u32()? as usize;
    let ofs_vertex = r.u32()? as usize;
    if x0 + w > LIQUID_CELLS || y0 + h > LIQUID_CELLS {
        return Err(InstanceError::Invalid("instance rectangle leaves the chunk"));
    }

    let mut layer = LiquidLayer::new(liquid_id, min_height);
    let cells = w * h;
    let exists = if ofs_exists == 0 {
        None
    } else {
        Some(
            body.get(ofs_exists..ofs_exists + cells.div_ceil(8))
                .ok_or(InstanceError::Invalid("visibility bitmap out of range"))?,
        )
    };
    for k in 0..cells {
        let on = exists.is_none_or(|bits| bits[k / 8] & (1 << (k % 8)) != 0);
        layer.set_cell(y0 + k / w, x0 + k % w, on);
    }

    if ofs_vertex != 0 && cells > 0 {
        let n = (w + 1) * (h + 1);
        let (has_heights, has_uv, has_depth) = match format {
            0 => (true, false, true),
            1 => (true, true, false),
            2 => (false, false, true),
            3 => (true, true, true),
            _ => return Err(InstanceError::Invalid("unknown vertex format")),
        };
        let mut v = BodyReader::at(body, ofs_vertex);
        let vertex = |k: usize| (y0 + k / (w + 1)) * LIQUID_VERTS + x0 + k % (w + 1);
        if has_heights {
            for k in 0..n {
                layer.heights[vertex(k)] = v.f32()?;
            }
        }
        if has_uv {
            v.skip(n * 4);
        }
        if has_depth {
            for k in 0..n {
                layer.depths[vertex(k)] = v.u8()?;
            }
        }
    }
    Ok(layer)
}

/// Always writes full 8x8 instances with heights and depths.
pub fn encode(w: &mut RecordWriter, surfaces: &[&LiquidSurface]) -> Result<(), FormatError> {
    let body = w.len();
    w.zeros(CHUNKS * HEADER_LEN);
    for (chunk, surface) in surfaces.iter().enumerate().take(CHUNKS) {
        if surface.layers.is_empty() {
            continue;
        }
        let instances = w.len();
        w.patch_u32(body + chunk * HEADER_LEN, (instances - body) as u32);
        w.patch_u32(body + chunk * HEADER_LEN + 4, surface.layers.len() as u32);
        w.zeros(surface.layers.len() * INSTANCE_LEN);
        for (i, layer) in surface.layers.iter().enumerate() {
            let exists = w.len();
            w.u64(layer.mask)?;
            let vertex = w.len();
            for h in layer.heights {
                w.f32(h)?;
            }
            w.bytes(&layer.depths);

            let (lo, hi) = layer.height_range().unwrap_or((0.0, 0.0));
            let mut inst = RecordWriter::new();
            inst.u16(layer.liquid_id)?;
            inst.u16(0)?;
            inst.f32(lo)?;
            inst.f32(hi)?;
            inst.bytes(&[0, 0, LIQUID_CELLS as u8, LIQUID_CELLS as u8]);
            inst.u32((exists - body) as u32)?;
            inst.u32((vertex - body) as u32)?;
            let at = instances + i * INSTANCE_LEN;
            w.buf[at..at + INSTANCE_LEN].copy_from_slice(&inst.into_inner());
        }
    }
    Ok(())
}
