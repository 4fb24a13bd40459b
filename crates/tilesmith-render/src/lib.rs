//! Terrain rendering: visibility, shader inputs, draw submission, and a
//! software compositor that mirrors the terrain shader.
#![cfg_attr(not(feature = "raylib"), forbid(unsafe_code))]

pub mod frame;
pub mod glsl;
pub mod mesh;
pub mod preview;
pub mod shade;
pub mod uniforms;

#[cfg(feature = "raylib")]
pub mod backend;

pub use frame::{
    AngledCursor, CursorOverlay, CursorShape, DrawCommand, DrawList, FrameBuilder, FrameParams,
    FrameStats, chunk_visible,
};
pub use mesh::{MeshBuild, build_chunk_mesh, build_liquid_mesh};
pub use preview::{PreviewImage, render_tile, render_tile_default};
pub use shade::{COMPOSITE_ORDER, Fragment, Stage, shade_fragment};
pub use uniforms::{
    ChunkUniforms, CursorCircle, DrawToggles, FogSettings, LightSettings, RenderSettings,
    TerrainUniforms, WireframeMode, WireframeSettings, area_color,
};
