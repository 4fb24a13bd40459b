//! Asset collaborators: decoded textures and models, the texture catalog
//! and a cache that never lets a missing asset stop the editor.
#![forbid(unsafe_code)]

pub mod blp;
mod cache;
mod catalog;
mod error;
mod loader;
pub mod m2;

pub use cache::{AssetCache, placeholder_model, placeholder_texture};
pub use catalog::{CatalogEntry, TextureCatalog, TextureId};
pub use error::AssetError;
pub use loader::{
    AssetLoader, DecodedTexture, DirectoryAssetLoader, MipLevel, ModelGeometry, normalize_name,
};
