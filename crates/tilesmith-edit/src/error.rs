use thiserror::Error;
use tilesmith_io::StoreError;
use tilesmith_terrain::ChunkKey;

#[derive(Debug, Error)]
pub enum EditError {
    #[error(
        "vertex {vertex} of chunk ({}, {}) on tile {}_{} belongs to an unloaded tile",
        .chunk.cx, .chunk.cz, .chunk.tile.x, .chunk.tile.z
    )]
    StaleHandle { chunk: ChunkKey, vertex: usize },

    #[error(transparent)]
    Store(#[from] StoreError),
}
