//! Brush-driven terrain editing over a `MapIndex`.
//!
//! Range operations run in fixed phases: gather the chunks under the brush
//! across tiles, mutate each one and collect those that changed, carry moved
//! seam vertices over to neighbouring chunks, recompute normals for the
//! changed set once every mutation is in, then mark the owning tiles changed.
#![forbid(unsafe_code)]

mod areas;
mod context;
mod error;
mod liquids;
mod selection;
mod settings;
mod texturing;
mod vertices;

pub use context::EditContext;
pub use error::EditError;
pub use selection::{VertexHandle, VertexSelection};
pub use settings::EditSettings;
pub use texturing::PaintReport;
