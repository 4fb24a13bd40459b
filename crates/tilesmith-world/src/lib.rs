//! The loaded world: which tiles exist, which are in memory, which carry
//! unsaved edits, and the objects placed on them.
#![forbid(unsafe_code)]

mod index;
mod instances;

pub use index::{MapIndex, SaveReport, UnloadPolicy};
pub use instances::InstanceRegistry;
pub use tilesmith_terrain::{ChunkKey, TileIndex};
