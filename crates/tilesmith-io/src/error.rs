use std::path::PathBuf;

use thiserror::Error;

/// Malformed or truncated file bytes.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("truncated data: {0}")]
    Truncated(#[from] std::io::Error),

    #[error("record {magic} at offset {offset} declares {size} bytes past the end of the buffer")]
    RecordOverrun {
        magic: String,
        offset: usize,
        size: usize,
    },

    #[error("unsupported {what} version {found}")]
    Version { what: &'static str, found: u32 },

    #[error("missing {0} record")]
    Missing(&'static str),

    #[error("expected 256 terrain chunks, found {0}")]
    ChunkCount(usize),

    #[error("terrain chunk {index} claims position ({ix}, {iy})")]
    ChunkOrder { index: usize, ix: u32, iy: u32 },

    #[error("texture id {0} is not in the texture list")]
    TextureId(u32),

    #[error("name offset {0} does not start a name")]
    NameOffset(u32),

    #[error("name id {0} is out of range")]
    NameId(u32),

    #[error("alpha map of layer {layer} in chunk {chunk} is malformed")]
    Alpha { chunk: usize, layer: usize },

    #[error("liquid data of chunk {chunk} is malformed: {reason}")]
    Liquid { chunk: usize, reason: &'static str },

    #[error("name {0:?} cannot be stored")]
    BadName(String),
}

/// Failure reading or writing through a tile store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("tile {x}_{z} is not stored")]
    Missing { x: usize, z: usize },
}
