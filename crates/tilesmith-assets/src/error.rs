use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset {0:?} not found")]
    NotFound(String),

    #[error("i/o error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("truncated asset data: {0}")]
    Truncated(#[from] std::io::Error),

    #[error("{what}: bad magic {found:?}")]
    Magic { what: &'static str, found: [u8; 4] },

    #[error("unsupported {what} {value}")]
    Unsupported { what: &'static str, value: u32 },

    #[error("{what} of {len} bytes at offset {offset} runs past the end of the data")]
    Overrun {
        what: &'static str,
        offset: usize,
        len: usize,
    },

    #[error("texture catalog: {0}")]
    Catalog(#[from] toml::de::Error),
}
