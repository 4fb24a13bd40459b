//! On-disk byte layout for map tiles and map headers, plus tile stores.
#![forbid(unsafe_code)]

mod adt;
pub mod alpha;
mod error;
mod liquid;
mod mcnk;
mod record;
mod store;
mod wdt;

pub use adt::{TILE_VERSION, TileFile, decode_tile, encode_tile, model_extents};
pub use error::{FormatError, StoreError};
pub use store::{FsTileStore, MemoryTileStore, TileStore};
pub use wdt::{MAP_VERSION, MapFlags, MapHeader, decode_map_header, encode_map_header};
