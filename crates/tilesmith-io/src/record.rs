//! Tagged record stream: 4-byte magic (stored reversed) + `u32` size + body.

use std::io::Cursor;

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::FormatError;

pub type Magic = [u8; 4];

pub const HEADER_LEN: usize = 8;

#[derive(Clone, Copy, Debug)]
pub struct Record<'a> {
    pub magic: Magic,
    /// Offset of the magic within the scanned buffer.
    pub offset: usize,
    pub body: &'a [u8],
}

pub struct Records<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Records<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }
}

impl<'a> Iterator for Records<'a> {
    type Item = Result<Record<'a>, FormatError>;

    fn next(&mut self) -> Option<Self::Item> {
        let rest = self.data.len() - self.pos;
        if rest == 0 {
            return None;
        }
        if rest < HEADER_LEN {
            self.pos = self.data.len();
            return Some(Err(FormatError::Truncated(std::io::ErrorKind::UnexpectedEof.into())));
        }
        let offset = self.pos;
        let head = &self.data[offset..offset + HEADER_LEN];
        let magic = [head[3], head[2], head[1], head[0]];
        let size = LittleEndian::read_u32(&head[4..]) as usize;
        let start = offset + HEADER_LEN;
        if size > self.data.len() - start {
            self.pos = self.data.len();
            return Some(Err(FormatError::RecordOverrun {
                magic: magic_str(magic),
                offset,
                size,
            }));
        }
        self.pos = start + size;
        Some(Ok(Record {
            magic,
            offset,
            body: &self.data[start..start + size],
        }))
    }
}

pub fn magic_str(magic: Magic) -> String {
    String::from_utf8_lossy(&magic).into_owned()
}

/// Append-only writer that patches record sizes once bodies are complete.
#[derive(Default)]
pub struct RecordWriter {
    pub buf: Vec<u8>,
}

impl RecordWriter {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Opens a record; returns its start offset for [`RecordWriter::end`].
    pub fn begin(&mut self, magic: &Magic) -> usize {
        let start = self.buf.len();
        self.buf.extend(magic.iter().rev());
        self.buf.extend_from_slice(&[0; 4]);
        start
    }

    pub fn end(&mut self, start: usize) {
        let size = (self.buf.len() - start - HEADER_LEN) as u32;
        LittleEndian::write_u32(&mut self.buf[start + 4..start + 8], size);
    }

    pub fn record(&mut self, magic: &Magic, body: &[u8]) -> usize {
        let start = self.begin(magic);
        self.buf.extend_from_slice(body);
        self.end(start);
        start
    }

    pub fn u8(&mut self, v: u8) -> Result<(), FormatError> {
        self.buf.write_u8(v)?;
        Ok(())
    }

    pub fn i8(&mut self, v: i8) -> Result<(), FormatError> {
        self.buf.write_i8(v)?;
        Ok(())
    }

    pub fn u16(&mut self, v: u16) -> Result<(), FormatError> {
        self.buf.write_u16::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn u32(&mut self, v: u32) -> Result<(), FormatError> {
        self.buf.write_u32::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn u64(&mut self, v: u64) -> Result<(), FormatError> {
        self.buf.write_u64::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn f32(&mut self, v: f32) -> Result<(), FormatError> {
        self.buf.write_f32::<LittleEndian>(v)?;
        Ok(())
    }

    pub fn bytes(&mut self, v: &[u8]) {
        self.buf.extend_from_slice(v);
    }

    pub fn zeros(&mut self, n: usize) {
        self.buf.resize(self.buf.len() + n, 0);
    }

    pub fn patch_u32(&mut self, at: usize, v: u32) {
        LittleEndian::write_u32(&mut self.buf[at..at + 4], v);
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Little-endian reader over a record body.
pub struct BodyReader<'a> {
    cur: Cursor<&'a [u8]>,
}

impl<'a> BodyReader<'a> {
    pub fn new(body: &'a [u8]) -> Self {
        Self {
            cur: Cursor::new(body),
        }
    }

    pub fn at(body: &'a [u8], pos: usize) -> Self {
        let mut r = Self::new(body);
        r.cur.set_position(pos as u64);
        r
    }

    pub fn position(&self) -> usize {
        self.cur.position() as usize
    }

    pub fn u8(&mut self) -> Result<u8, FormatError> {
        Ok(self.cur.read_u8()?)
    }

    pub fn i8(&mut self) -> Result<i8, FormatError> {
        Ok(self.cur.read_i8()?)
    }

    pub fn u16(&mut self) -> Result<u16, FormatError> {
        Ok(self.cur.read_u16::<LittleEndian>()?)
    }

    pub fn u32(&mut self) -> Result<u32, FormatError> {
        Ok(self.cur.read_u32::<LittleEndian>()?)
    }

    pub fn u64(&mut self) -> Result<u64, FormatError> {
        Ok(self.cur.read_u64::<LittleEndian>()?)
    }

    pub fn f32(&mut self) -> Result<f32, FormatError> {
        Ok(self.cur.read_f32::<LittleEndian>()?)
    }

    pub fn bytes<const N: usize>(&mut self) -> Result<[u8; N], FormatError> {
        let mut out = [0u8; N];
        std::io::Read::read_exact(&mut self.cur, &mut out)?;
        Ok(out)
    }

    pub fn skip(&mut self, n: usize) {
        self.cur.set_position(self.cur.position() + n as u64);
    }
}

/// Null-terminated string table, as used by texture and model name lists.
pub fn split_names(block: &[u8]) -> Vec<(u32, String)> {
    let mut out = Vec::new();
    let mut start = 0;
    for (i, &b) in block.iter().enumerate() {
        if b == 0 {
            if i > start {
                out.push((start as u32, String::from_utf8_lossy(&block[start..i]).into_owned()));
            }
            start = i + 1;
        }
    }
    out
}

pub fn write_names<'n>(
    w: &mut RecordWriter,
    names: impl IntoIterator<Item = &'n str>,
) -> Result<Vec<u32>, FormatError> {
    let base = w.len();
    let mut offsets = Vec::new();
    for name in names {
        if name.is_empty() || name.as_bytes().contains(&0) {
            return Err(FormatError::BadName(name.to_string()));
        }
        offsets.push((w.len() - base) as u32);
        w.bytes(name.as_bytes());
        w.u8(0)?;
    }
    Ok(offsets)
}
