//! Static vertex data out of `MD20` model files.
//!
//! Only the vertex block is read. Model space is z-up; positions and normals
//! are returned y-up to match the terrain.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};
use tilesmith_geom::{Aabb, Vec3};

use crate::error::AssetError;
use crate::loader::ModelGeometry;

pub const MAGIC: [u8; 4] = *b"MD20";
pub const VERTEX_LEN: usize = 48;
/// First version without the playable animation lookup block.
const COMPACT_HEADER_VERSION: u32 = 264;

fn y_up(x: f32, y: f32, z: f32) -> Vec3 {
    Vec3::new(x, z, -y)
}

pub fn decode(data: &[u8]) -> Result<ModelGeometry, AssetError> {
    let mut cur = Cursor::new(data);
    let mut magic = [0u8; 4];
    std::io::Read::read_exact(&mut cur, &mut magic)?;
    if magic != MAGIC {
        return Err(AssetError::Magic {
            what: "model",
            found: magic,
        });
    }
    let version = cur.read_u32::<LittleEndian>()?;
    if !(256..=274).contains(&version) {
        return Err(AssetError::Unsupported {
            what: "model version",
            value: version,
        });
    }
    let table = if version < COMPACT_HEADER_VERSION { 68 } else { 60 };
    cur.set_position(table);
    let count = cur.read_u32::<LittleEndian>()? as usize;
    let offset = cur.read_u32::<LittleEndian>()? as usize;
    let len = count.checked_mul(VERTEX_LEN).unwrap_or(usize::MAX);
    let block = offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or(AssetError::Overrun {
            what: "model vertices",
            offset,
            len,
        })?;

    let mut positions = Vec::with_capacity(count);
    let mut normals = Vec::with_capacity(count);
    let mut uvs = Vec::with_capacity(count);
    for raw in block.chunks_exact(VERTEX_LEN) {
        let mut v = Cursor::new(raw);
        let mut f = [0f32; 3];
        v.read_f32_into::<LittleEndian>(&mut f)?;
        positions.push(y_up(f[0], f[1], f[2]));
        v.set_position(20);
        v.read_f32_into::<LittleEndian>(&mut f)?;
        normals.push(y_up(f[0], f[1], f[2]));
        let mut uv = [0f32; 2];
        v.read_f32_into::<LittleEndian>(&mut uv)?;
        uvs.push(uv);
    }
    let bounds = Aabb::from_points(positions.iter().copied())
        .unwrap_or(Aabb::new(Vec3::ZERO, Vec3::ZERO));
    Ok(ModelGeometry {
        positions,
        normals,
        uvs,
        bounds,
    })
}
