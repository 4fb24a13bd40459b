use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tilesmith_edit::EditSettings;
use tilesmith_render::{RenderSettings, WireframeSettings};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MapSection {
    /// Directory holding `<name>.wdt` and the tile files.
    #[serde(default = "default_map_dir")]
    pub dir: PathBuf,
    #[serde(default = "default_map_name")]
    pub name: String,
    /// Extracted game data, for textures and models.
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    /// Texture catalog TOML.
    #[serde(default)]
    pub catalog: Option<PathBuf>,
}

fn default_map_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_map_name() -> String {
    "map".to_string()
}

impl Default for MapSection {
    fn default() -> Self {
        Self {
            dir: default_map_dir(),
            name: default_map_name(),
            data_dir: None,
            catalog: None,
        }
    }
}

/// Contents of `tilesmith.toml`. Every section may be left out.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EditorConfig {
    #[serde(default)]
    pub map: MapSection,
    #[serde(default)]
    pub edit: EditSettings,
    #[serde(default)]
    pub render: RenderSettings,
    /// Top-level section; wins over `[render.wireframe]`.
    #[serde(default)]
    pub wireframe: Option<WireframeSettings>,
}

impl EditorConfig {
    pub fn from_toml_str(s: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(s).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let s = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&s, path)
    }

    /// Reads `path` when given; otherwise `tilesmith.toml` in the working
    /// directory if present, else defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(p) => Self::from_path(p),
            None => {
                let p = Path::new("tilesmith.toml");
                if p.is_file() {
                    Self::from_path(p)
                } else {
                    log::debug!("no tilesmith.toml; using defaults");
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn render_settings(&self) -> RenderSettings {
        let mut s = self.render;
        if let Some(w) = self.wireframe {
            s.wireframe = w;
        }
        s
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tilesmith_render::WireframeMode;
    use tilesmith_terrain::BrushShape;

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = EditorConfig::from_toml_str("", Path::new("t.toml")).unwrap();
        assert_eq!(cfg, EditorConfig::default());
        assert_eq!(cfg.map.name, "map");
    }

    #[test]
    fn sections_override_defaults() {
        let src = r#"
            [map]
            dir = "maps/azeroth"
            name = "Azeroth"

            [edit]
            seed = 7
            brush = { shape = "smooth", radius = 30.0 }

            [render]
            cull_distance = 900.0
            draw = { fog = false, lines = true }

            [wireframe]
            mode = "around_cursor"
            radius = 3.0
        "#;
        let cfg = EditorConfig::from_toml_str(src, Path::new("t.toml")).unwrap();
        assert_eq!(cfg.map.dir, PathBuf::from("maps/azeroth"));
        assert_eq!(cfg.edit.seed, 7);
        assert_eq!(cfg.edit.brush.shape, BrushShape::Smooth);
        assert_eq!(cfg.edit.brush.inner_ratio, 0.0);
        assert_eq!(cfg.edit.paint_pressure, EditSettings::default().paint_pressure);

        let render = cfg.render_settings();
        assert!(!render.draw.fog && render.draw.lines && render.draw.terrain);
        assert_eq!(render.effective_cull_distance(), 900.0);
        assert_eq!(render.wireframe.mode, WireframeMode::AroundCursor);
        assert_eq!(render.wireframe.radius, 3.0);
        assert_eq!(render.wireframe.width, 1.0);
    }

    #[test]
    fn bad_toml_names_the_file() {
        let err = EditorConfig::from_toml_str("[map\n", Path::new("broken.toml")).unwrap_err();
        assert!(err.to_string().starts_with("parsing broken.toml"));
    }
}
