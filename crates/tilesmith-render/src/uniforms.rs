//! Terrain shader inputs. Everything here is plain data so the CPU
//! compositor and the GLSL program read the same values.

use serde::{Deserialize, Serialize};
use tilesmith_geom::Vec3;

/// What a frame draws.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DrawToggles {
    #[serde(default = "default_true")]
    pub terrain: bool,
    #[serde(default = "default_true")]
    pub water: bool,
    #[serde(default = "default_true")]
    pub models: bool,
    #[serde(default = "default_true")]
    pub map_objects: bool,
    /// Outline every visible instance, not only the selected one.
    #[serde(default)]
    pub models_with_box: bool,
    #[serde(default)]
    pub wireframe: bool,
    /// Tile and chunk grid lines.
    #[serde(default)]
    pub lines: bool,
    #[serde(default)]
    pub hole_lines: bool,
    #[serde(default)]
    pub contour: bool,
    #[serde(default)]
    pub area_id_overlay: bool,
    /// Tints chunks that cannot take the current paint texture.
    #[serde(default)]
    pub paintability_overlay: bool,
    /// Tints impassible chunks.
    #[serde(default)]
    pub chunk_flag_overlay: bool,
    #[serde(default = "default_true")]
    pub fog: bool,
}

fn default_true() -> bool {
    true
}

impl Default for DrawToggles {
    fn default() -> Self {
        Self {
            terrain: true,
            water: true,
            models: true,
            map_objects: true,
            models_with_box: false,
            wireframe: false,
            lines: false,
            hole_lines: false,
            contour: false,
            area_id_overlay: false,
            paintability_overlay: false,
            chunk_flag_overlay: false,
            fog: true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WireframeMode {
    #[default]
    Everywhere,
    AroundCursor,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireframeSettings {
    #[serde(default)]
    pub mode: WireframeMode,
    /// Multiple of the cursor radius when drawn around the cursor.
    #[serde(default = "default_wireframe_radius")]
    pub radius: f32,
    /// Line width in screen-space derivatives.
    #[serde(default = "default_wireframe_width")]
    pub width: f32,
    #[serde(default = "default_wireframe_color")]
    pub color: [f32; 4],
    #[serde(default)]
    pub rainbow: bool,
}

fn default_wireframe_radius() -> f32 {
    1.5
}
fn default_wireframe_width() -> f32 {
    1.0
}
fn default_wireframe_color() -> [f32; 4] {
    [1.0, 1.0, 1.0, 1.0]
}

impl Default for WireframeSettings {
    fn default() -> Self {
        Self {
            mode: WireframeMode::default(),
            radius: default_wireframe_radius(),
            width: default_wireframe_width(),
            color: default_wireframe_color(),
            rainbow: false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FogSettings {
    #[serde(default = "default_fog_color")]
    pub color: [f32; 3],
    /// Fully fogged beyond this distance; also the cull distance while fog is on.
    #[serde(default = "default_fog_distance")]
    pub distance: f32,
    /// Fog starts at this fraction of `distance`.
    #[serde(default = "default_fog_start")]
    pub start: f32,
}

fn default_fog_color() -> [f32; 3] {
    [0.7, 0.75, 0.8]
}
fn default_fog_distance() -> f32 {
    777.0
}
fn default_fog_start() -> f32 {
    0.5
}

impl Default for FogSettings {
    fn default() -> Self {
        Self {
            color: default_fog_color(),
            distance: default_fog_distance(),
            start: default_fog_start(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct LightSettings {
    /// Direction towards the light.
    #[serde(default = "default_light_dir")]
    pub direction: Vec3,
    #[serde(default = "default_diffuse")]
    pub diffuse: [f32; 3],
    #[serde(default = "default_ambient")]
    pub ambient: [f32; 3],
}

fn default_light_dir() -> Vec3 {
    Vec3::new(0.3, 1.0, 0.2).normalized()
}
fn default_diffuse() -> [f32; 3] {
    [0.65, 0.65, 0.6]
}
fn default_ambient() -> [f32; 3] {
    [0.35, 0.35, 0.4]
}

impl Default for LightSettings {
    fn default() -> Self {
        Self {
            direction: default_light_dir(),
            diffuse: default_diffuse(),
            ambient: default_ambient(),
        }
    }
}

/// Everything the frame builder reads from configuration.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RenderSettings {
    #[serde(default)]
    pub draw: DrawToggles,
    #[serde(default)]
    pub fog: FogSettings,
    #[serde(default)]
    pub light: LightSettings,
    #[serde(default)]
    pub wireframe: WireframeSettings,
    /// Used while fog is off; with fog the fog distance culls.
    #[serde(default = "default_cull_distance")]
    pub cull_distance: f32,
}

fn default_cull_distance() -> f32 {
    2000.0
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            draw: DrawToggles::default(),
            fog: FogSettings::default(),
            light: LightSettings::default(),
            wireframe: WireframeSettings::default(),
            cull_distance: default_cull_distance(),
        }
    }
}

impl RenderSettings {
    pub fn effective_cull_distance(&self) -> f32 {
        if self.draw.fog {
            self.fog.distance
        } else {
            self.cull_distance
        }
    }
}

/// Ring pair drawn by the terrain shader itself.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CursorCircle {
    pub position: Vec3,
    pub radius: f32,
    pub inner_ratio: f32,
    pub color: [f32; 4],
}

/// Per-frame terrain shader state.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TerrainUniforms {
    pub camera: Vec3,
    pub draw_lines: bool,
    pub draw_hole_lines: bool,
    pub draw_areaid_overlay: bool,
    pub draw_contour: bool,
    pub draw_wireframe: bool,
    pub wireframe: WireframeSettings,
    pub draw_fog: bool,
    pub fog: FogSettings,
    pub light: LightSettings,
    pub cursor: Option<CursorCircle>,
    /// Brush radius, used to size the cursor wireframe even without a circle.
    pub cursor_position: Vec3,
    pub cursor_radius: f32,
}

impl Default for TerrainUniforms {
    fn default() -> Self {
        Self {
            camera: Vec3::ZERO,
            draw_lines: false,
            draw_hole_lines: false,
            draw_areaid_overlay: false,
            draw_contour: false,
            draw_wireframe: false,
            wireframe: WireframeSettings::default(),
            draw_fog: false,
            fog: FogSettings::default(),
            light: LightSettings::default(),
            cursor: None,
            cursor_position: Vec3::ZERO,
            cursor_radius: 0.0,
        }
    }
}

/// Per-chunk terrain shader state.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ChunkUniforms {
    pub layer_count: usize,
    pub has_mccv: bool,
    pub cant_paint: bool,
    pub areaid_color: Option<[f32; 4]>,
    pub impassible: bool,
}

/// Stable pseudo-random tint for an area id.
pub fn area_color(area_id: u32) -> [f32; 4] {
    let mut h = area_id as u64 ^ 0x9E37_79B9_7F4A_7C15;
    h = (h ^ (h >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    h = (h ^ (h >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    h ^= h >> 31;
    let c = |shift: u32| ((h >> shift) & 0xff) as f32 / 255.0;
    [c(0), c(8), c(16), 0.7]
}
