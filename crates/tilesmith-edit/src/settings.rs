use serde::{Deserialize, Serialize};
use tilesmith_terrain::{Brush, BrushShape};

/// Options shared by a batch of edit calls.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EditSettings {
    /// Seeds the spray pattern so a batch replays identically.
    #[serde(default = "default_seed")]
    pub seed: u64,
    #[serde(default = "default_brush")]
    pub brush: Brush,
    #[serde(default = "default_paint_strength")]
    pub paint_strength: f32,
    #[serde(default = "default_paint_pressure")]
    pub paint_pressure: f32,
    /// Spray area radius as a multiple of the brush radius.
    #[serde(default = "default_spray_size")]
    pub spray_size: f32,
    /// Dabs per spray call, before scaling by area.
    #[serde(default = "default_spray_density")]
    pub spray_density: f32,
    /// Depth per world unit of liquid above the ground.
    #[serde(default = "default_liquid_depth_factor")]
    pub liquid_depth_factor: f32,
}

fn default_seed() -> u64 {
    0x5EED
}
fn default_brush() -> Brush {
    Brush::new(BrushShape::Linear, 15.0, 0.0)
}
fn default_paint_strength() -> f32 {
    1.0
}
fn default_paint_pressure() -> f32 {
    0.5
}
fn default_spray_size() -> f32 {
    2.0
}
fn default_spray_density() -> f32 {
    8.0
}
fn default_liquid_depth_factor() -> f32 {
    0.1
}

impl Default for EditSettings {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            brush: default_brush(),
            paint_strength: default_paint_strength(),
            paint_pressure: default_paint_pressure(),
            spray_size: default_spray_size(),
            spray_density: default_spray_density(),
            liquid_depth_factor: default_liquid_depth_factor(),
        }
    }
}
