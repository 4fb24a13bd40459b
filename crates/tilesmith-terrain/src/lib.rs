//! Terrain data model: tiles, chunks, texture layers, liquids, brushes.
#![forbid(unsafe_code)]

pub mod brush;
pub mod chunk;
pub mod coords;
pub mod instance;
pub mod liquid;
pub mod texture_set;
pub mod tile;

pub use brush::{Brush, BrushShape};
pub use chunk::{Chunk, ChunkFlags, FlattenMode, HeightSampler, VertexColor};
pub use coords::{ChunkKey, TileIndex};
pub use instance::{Instance, ObjectKind};
pub use liquid::{LiquidLayer, LiquidPaint, LiquidSurface};
pub use texture_set::{AlphaMap, LayerFlags, PaintOutcome, TextureLayer, TextureName, TextureSet};
pub use tile::Tile;

pub const TILE_SIZE: f32 = 533.333_33;
pub const CHUNK_SIZE: f32 = TILE_SIZE / 16.0;
pub const UNIT_SIZE: f32 = CHUNK_SIZE / 8.0;
pub const HOLE_SIZE: f32 = CHUNK_SIZE / 4.0;
pub const ZERO_POINT: f32 = 32.0 * TILE_SIZE;
pub const MAP_SIZE: f32 = 64.0 * TILE_SIZE;

pub const TILES_PER_SIDE: usize = 64;
pub const CHUNKS_PER_SIDE: usize = 16;
/// Outer vertex spacings along a chunk side.
pub const UNITS_PER_CHUNK: usize = 8;
/// 9*9 outer + 8*8 inner.
pub const MAP_VERTICES: usize = 145;
pub const ALPHA_SIZE: usize = 64;
pub const MAX_TEXTURE_LAYERS: usize = 4;
