//! Alpha map encodings: 4-bit packed, 8-bit raw and 8-bit run-length.
//!
//! Decoders return `None` on malformed input; the tile decoder attaches the
//! chunk and layer to the error.

use tilesmith_terrain::{ALPHA_SIZE, AlphaMap};

pub const PACKED_LEN: usize = ALPHA_SIZE * ALPHA_SIZE / 2;
pub const RAW_LEN: usize = ALPHA_SIZE * ALPHA_SIZE;

const RLE_FILL: u8 = 0x80;
const RLE_COUNT: u8 = 0x7F;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlphaFormat {
    /// 2048 bytes, two texels per byte, low nibble first.
    Packed4,
    Raw8,
    Rle8,
}

/// Decodes one map from the front of `data`; returns it with the bytes consumed.
pub fn decode(data: &[u8], format: AlphaFormat, fix_edges: bool) -> Option<(AlphaMap, usize)> {
    match format {
        AlphaFormat::Packed4 => Some((decode_packed(data.get(..PACKED_LEN)?, fix_edges), PACKED_LEN)),
        AlphaFormat::Raw8 => Some((AlphaMap::from_slice(data.get(..RAW_LEN)?)?, RAW_LEN)),
        AlphaFormat::Rle8 => decode_rle(data),
    }
}

pub fn encode(map: &AlphaMap, format: AlphaFormat) -> Vec<u8> {
    match format {
        AlphaFormat::Packed4 => encode_packed(map),
        AlphaFormat::Raw8 => map.as_slice().to_vec(),
        AlphaFormat::Rle8 => encode_rle(map),
    }
}

/// Nibbles scale by 17 so 15 maps to 255. With `fix_edges` the last row
/// and column repeat their neighbours.
pub fn decode_packed(data: &[u8], fix_edges: bool) -> AlphaMap {
    let mut map = AlphaMap::zeroed();
    let out = map.as_mut_slice();
    for (i, &b) in data.iter().take(PACKED_LEN).enumerate() {
        out[i * 2] = (b & 0x0F) * 17;
        out[i * 2 + 1] = (b >> 4) * 17;
    }
    if fix_edges {
        for y in 0..ALPHA_SIZE {
            out[y * ALPHA_SIZE + ALPHA_SIZE - 1] = out[y * ALPHA_SIZE + ALPHA_SIZE - 2];
        }
        for x in 0..ALPHA_SIZE {
            out[(ALPHA_SIZE - 1) * ALPHA_SIZE + x] = out[(ALPHA_SIZE - 2) * ALPHA_SIZE + x];
        }
    }
    map
}

pub fn encode_packed(map: &AlphaMap) -> Vec<u8> {
    let nibble = |v: u8| ((v as u16 + 8) / 17).min(15) as u8;
    map.as_slice()
        .chunks_exact(2)
        .map(|p| nibble(p[0]) | (nibble(p[1]) << 4))
        .collect()
}

/// Control byte: bit 7 selects fill (repeat the next byte) or copy; the
/// low 7 bits hold the count.
pub fn decode_rle(data: &[u8]) -> Option<(AlphaMap, usize)> {
    let mut map = AlphaMap::zeroed();
    let out = map.as_mut_slice();
    let mut written = 0;
    let mut pos = 0;
    while written < RAW_LEN {
        let ctrl = *data.get(pos)?;
        pos += 1;
        let count = (ctrl & RLE_COUNT) as usize;
        if written + count > RAW_LEN {
            return None;
        }
        if ctrl & RLE_FILL != 0 {
            let v = *data.get(pos)?;
            pos += 1;
            out[written..written + count].fill(v);
        } else {
            out[written..written + count].copy_from_slice(data.get(pos..pos + count)?);
            pos += count;
        }
        written += count;
    }
    Some((map, pos))
}

/// Runs never cross a row boundary.
pub fn encode_rle(map: &AlphaMap) -> Vec<u8> {
    let mut out = Vec::new();
    for row in map.as_slice().chunks_exact(ALPHA_SIZE) {
        let mut i = 0;
        while i < row.len() {
            let run = row[i..].iter().take_while(|&&v| v == row[i]).count();
            if run >= 3 {
                let n = run.min(RLE_COUNT as usize);
                out.push(RLE_FILL | n as u8);
                out.push(row[i]);
                i += n;
                continue;
            }
            let start = i;
            while i < row.len() && i - start < RLE_COUNT as usize {
                let ahead = row[i..].iter().take_while(|&&v| v == row[i]).count();
                if ahead >= 3 {
                    break;
                }
                i += 1;
            }
            out.push((i - start) as u8);
            out.extend_from_slice(&row[start..i]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient() -> AlphaMap {
        let mut m = AlphaMap::zeroed();
        for y in 0..ALPHA_SIZE {
            for x in 0..ALPHA_SIZE {
                m.set(x, y, ((x / 8) * 34).min(255) as u8 + (y % 2) as u8);
            }
        }
        m
    }

    #[test]
    fn packed_is_low_nibble_first() {
        let mut m = AlphaMap::zeroed();
        m.set(0, 0, 17);
        m.set(1, 0, 255);
        let bytes = encode_packed(&m);
        assert_eq!(bytes.len(), PACKED_LEN);
        assert_eq!(bytes[0], 0xF1);
        let back = decode_packed(&bytes, false);
        assert_eq!(back.get(0, 0), 17);
        assert_eq!(back.get(1, 0), 255);
    }

    #[test]
    fn edge_fix_copies_neighbours() {
        let mut m = AlphaMap::zeroed();
        for i in 0..ALPHA_SIZE {
            m.set(62, i, 34);
            m.set(i, 62, 51);
        }
        let fixed = decode_packed(&encode_packed(&m), true);
        assert_eq!(fixed.get(63, 10), 34);
        assert_eq!(fixed.get(10, 63), 51);
        let raw = decode_packed(&encode_packed(&m), false);
        assert_eq!(raw.get(63, 10), 0);
    }

    #[test]
    fn rle_restores_and_reports_length() {
        let m = gradient();
        let mut bytes = encode_rle(&m);
        let len = bytes.len();
        assert!(len < RAW_LEN);
        bytes.extend_from_slice(&[9, 9, 9]);
        let (back, used) = decode_rle(&bytes).unwrap();
        assert_eq!(used, len);
        assert_eq!(back, m);
    }

    #[test]
    fn rle_rejects_overlong_runs() {
        let mut bytes = vec![];
        for _ in 0..33 {
            bytes.extend_from_slice(&[0xFF, 1]);
        }
        assert!(decode_rle(&bytes).is_none());
        assert!(decode_rle(&[0x85]).is_none());
    }

    #[test]
    fn raw_needs_full_length() {
        assert!(decode(&[0; RAW_LEN - 1], AlphaFormat::Raw8, false).is_none());
        let (m, used) = decode(&[7; RAW_LEN + 4], AlphaFormat::Raw8, false).unwrap();
        assert_eq!(used, RAW_LEN);
        assert_eq!(m.get(63, 63), 7);
    }
}
