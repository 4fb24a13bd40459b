//! BLP2 texture decoding into RGBA8 mip chains.
//!
//! Palettized (1, 4 or 8 bit alpha), DXT1/3/5 and raw BGRA payloads are
//! supported. Every mip level named by the header offset table is decoded
//! until the first empty slot.

use std::io::Cursor;

use byteorder::{LittleEndian, ReadBytesExt};

use crate::error::AssetError;
use crate::loader::{DecodedTexture, MipLevel};

pub const MAGIC: [u8; 4] = *b"BLP2";
pub const HEADER_LEN: usize = 148;
pub const PALETTE_LEN: usize = 256 * 4;
pub const MAX_MIPS: usize = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Encoding {
    Palette,
    Dxt,
    Raw,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dxt {
    Dxt1,
    Dxt3,
    Dxt5,
}

impl Dxt {
    fn block_len(self) -> usize {
        match self {
            Dxt::Dxt1 => 8,
            Dxt::Dxt3 | Dxt::Dxt5 => 16,
        }
    }
}

#[derive(Clone, Debug)]
pub struct Header {
    pub encoding: Encoding,
    pub alpha_depth: u8,
    pub alpha_type: u8,
    pub width: u32,
    pub height: u32,
    pub offsets: [u32; MAX_MIPS],
    pub sizes: [u32; MAX_MIPS],
}

pub fn read_header(data: &[u8]) -> Result<Header, AssetError> {
    let mut cur = Cursor::new(data);
    let mut magic = [0u8; 4];
    std::io::Read::read_exact(&mut cur, &mut magic)?;
    if magic != MAGIC {
        return Err(AssetError::Magic {
            what: "texture",
            found: magic,
        });
    }
    let version = cur.read_u32::<LittleEndian>()?;
    if version != 1 {
        return Err(AssetError::Unsupported {
            what: "texture version",
            value: version,
        });
    }
    let compression = cur.read_u8()?;
    let encoding = match compression {
        1 => Encoding::Palette,
        2 => Encoding::Dxt,
        3 => Encoding::Raw,
        other => {
            return Err(AssetError::Unsupported {
                what: "texture compression",
                value: other as u32,
            });
        }
    };
    let alpha_depth = cur.read_u8()?;
    let alpha_type = cur.read_u8()?;
    let _has_mips = cur.read_u8()?;
    let width = cur.read_u32::<LittleEndian>()?;
    let height = cur.read_u32::<LittleEndian>()?;
    let mut offsets = [0u32; MAX_MIPS];
    let mut sizes = [0u32; MAX_MIPS];
    cur.read_u32_into::<LittleEndian>(&mut offsets)?;
    cur.read_u32_into::<LittleEndian>(&mut sizes)?;
    Ok(Header {
        encoding,
        alpha_depth,
        alpha_type,
        width,
        height,
        offsets,
        sizes,
    })
}

fn slice<'a>(data: &'a [u8], offset: usize, len: usize, what: &'static str) -> Result<&'a [u8], AssetError> {
    offset
        .checked_add(len)
        .and_then(|end| data.get(offset..end))
        .ok_or(AssetError::Overrun { what, offset, len })
}

pub fn decode(data: &[u8]) -> Result<DecodedTexture, AssetError> {
    let header = read_header(data)?;
    let dxt = match header.encoding {
        Encoding::Dxt => Some(match header.alpha_type & 3 {
            0 => Dxt::Dxt1,
            1 => Dxt::Dxt3,
            3 => Dxt::Dxt5,
            _ => {
                return Err(AssetError::Unsupported {
                    what: "texture alpha type",
                    value: header.alpha_type as u32,
                });
            }
        }),
        _ => None,
    };
    let palette = match header.encoding {
        Encoding::Palette => Some(slice(data, HEADER_LEN, PALETTE_LEN, "palette")?),
        _ => None,
    };
    if header.width == 0 || header.height == 0 {
        return Err(AssetError::Unsupported {
            what: "texture size",
            value: 0,
        });
    }

    let (mut w, mut h) = (header.width, header.height);
    let mut mips = Vec::new();
    for level in 0..MAX_MIPS {
        w = w.max(1);
        h = h.max(1);
        let (offset, size) = (header.offsets[level], header.sizes[level]);
        if offset == 0 || size == 0 {
            break;
        }
        let body = slice(data, offset as usize, size as usize, "mip level")?;
        let rgba = match (header.encoding, palette, dxt) {
            (Encoding::Palette, Some(pal), _) => decode_palette(body, pal, w, h, header.alpha_depth)?,
            (Encoding::Dxt, _, Some(kind)) => decode_dxt(body, w, h, kind, header.alpha_depth)?,
            _ => decode_raw(body, w, h)?,
        };
        mips.push(MipLevel {
            width: w,
            height: h,
            rgba,
        });
        w >>= 1;
        h >>= 1;
    }
    if mips.is_empty() {
        return Err(AssetError::Overrun {
            what: "mip level",
            offset: 0,
            len: 0,
        });
    }
    Ok(DecodedTexture {
        width: header.width,
        height: header.height,
        mips,
    })
}

fn decode_palette(body: &[u8], palette: &[u8], w: u32, h: u32, alpha_depth: u8) -> Result<Vec<u8>, AssetError> {
    let n = w as usize * h as usize;
    let alpha_len = match alpha_depth {
        0 => 0,
        1 => n.div_ceil(8),
        4 => n.div_ceil(2),
        8 => n,
        other => {
            return Err(AssetError::Unsupported {
                what: "palette alpha depth",
                value: other as u32,
            });
        }
    };
    let indices = slice(body, 0, n, "palette indices")?;
    let alpha = slice(body, n, alpha_len, "palette alpha")?;
    let mut out = Vec::with_capacity(n * 4);
    for (i, &ix) in indices.iter().enumerate() {
        let c = &palette[ix as usize * 4..ix as usize * 4 + 4];
        let a = match alpha_depth {
            1 => {
                if alpha[i / 8] & (1 << (i % 8)) != 0 {
                    0xff
                } else {
                    0
                }
            }
            4 => {
                let nibble = if i % 2 == 0 { alpha[i / 2] & 0x0f } else { alpha[i / 2] >> 4 };
                nibble * 17
            }
            8 => alpha[i],
            _ => 0xff,
        };
        out.extend_from_slice(&[c[2], c[1], c[0], a]);
    }
    Ok(out)
}

fn decode_raw(body: &[u8], w: u32, h: u32) -> Result<Vec<u8>, AssetError> {
    let bgra = slice(body, 0, w as usize * h as usize * 4, "raw pixels")?;
    Ok(bgra
        .chunks_exact(4)
        .flat_map(|p| [p[2], p[1], p[0], p[3]])
        .collect())
}

fn rgb565(c: u16) -> [u8; 3] {
    let r = ((c >> 11) & 0x1f) as u32;
    let g = ((c >> 5) & 0x3f) as u32;
    let b = (c & 0x1f) as u32;
    [
        ((r * 255 + 15) / 31) as u8,
        ((g * 255 + 31) / 63) as u8,
        ((b * 255 + 15) / 31) as u8,
    ]
}

fn mix(a: [u8; 3], b: [u8; 3], wa: u32, wb: u32) -> [u8; 3] {
    let d = wa + wb;
    core::array::from_fn(|i| ((a[i] as u32 * wa + b[i] as u32 * wb) / d) as u8)
}

/// Four colours of a block; the last is transparent black in 3-colour mode
/// when `punch_through` is set.
fn color_table(block: &[u8], four_color_always: bool, punch_through: bool) -> [[u8; 4]; 4] {
    let c0 = u16::from_le_bytes([block[0], block[1]]);
    let c1 = u16::from_le_bytes([block[2], block[3]]);
    let (a, b) = (rgb565(c0), rgb565(c1));
    let with = |c: [u8; 3], alpha: u8| [c[0], c[1], c[2], alpha];
    if c0 > c1 || four_color_always {
        [
            with(a, 255),
            with(b, 255),
            with(mix(a, b, 2, 1), 255),
            with(mix(a, b, 1, 2), 255),
        ]
    } else {
        let last = if punch_through { [0, 0, 0, 0] } else { [0, 0, 0, 255] };
        [with(a, 255), with(b, 255), with(mix(a, b, 1, 1), 255), last]
    }
}

fn dxt5_alphas(a0: u8, a1: u8) -> [u8; 8] {
    let (a0, a1) = (a0 as u32, a1 as u32);
    let mut t = [0u8; 8];
    t[0] = a0 as u8;
    t[1] = a1 as u8;
    if a0 > a1 {
        for i in 1..7 {
            t[i + 1] = (((7 - i as u32) * a0 + i as u32 * a1) / 7) as u8;
        }
    } else {
        for i in 1..5 {
            t[i + 1] = (((5 - i as u32) * a0 + i as u32 * a1) / 5) as u8;
        }
        t[6] = 0;
        t[7] = 255;
    }
    t
}

fn decode_dxt(body: &[u8], w: u32, h: u32, kind: Dxt, alpha_depth: u8) -> Result<Vec<u8>, AssetError> {
    let (bw, bh) = (w.div_ceil(4) as usize, h.div_ceil(4) as usize);
    let len = bw
        .checked_mul(bh)
        .and_then(|n| n.checked_mul(kind.block_len()))
        .unwrap_or(usize::MAX);
    let blocks = slice(body, 0, len, "compressed blocks")?;
    let (w, h) = (w as usize, h as usize);
    let mut out = vec![0u8; w * h * 4];
    for (bi, block) in blocks.chunks_exact(kind.block_len()).enumerate() {
        let (bx, by) = (bi % bw, bi / bw);
        let (alpha, color) = match kind {
            Dxt::Dxt1 => (None, block),
            Dxt::Dxt3 | Dxt::Dxt5 => (Some(&block[..8]), &block[8..]),
        };
        let colors = color_table(color, kind != Dxt::Dxt1, alpha_depth != 0);
        let bits = u32::from_le_bytes([color[4], color[5], color[6], color[7]]);
        let alpha_bits = alpha.map(|a| u64::from_le_bytes([a[0], a[1], a[2], a[3], a[4], a[5], a[6], a[7]]));
        let table = alpha.map(|a| dxt5_alphas(a[0], a[1]));
        for p in 0..16 {
            let (x, y) = (bx * 4 + p % 4, by * 4 + p / 4);
            if x >= w || y >= h {
                continue;
            }
            let mut px = colors[((bits >> (2 * p)) & 3) as usize];
            match (kind, alpha_bits, table) {
                (Dxt::Dxt3, Some(ab), _) => px[3] = ((ab >> (4 * p)) & 0xf) as u8 * 17,
                (Dxt::Dxt5, Some(ab), Some(t)) => px[3] = t[((ab >> (16 + 3 * p)) & 7) as usize],
                _ => {}
            }
            let i = (y * w + x) * 4;
            out[i..i + 4].copy_from_slice(&px);
        }
    }
    Ok(out)
}
