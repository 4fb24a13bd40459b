mod camera;
mod config;
#[cfg(feature = "viewer")]
mod viewer;

use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hashbrown::HashMap;
use tilesmith_assets::{AssetCache, DecodedTexture, DirectoryAssetLoader, TextureCatalog};
use tilesmith_edit::{EditContext, EditSettings};
use tilesmith_geom::Vec3;
use tilesmith_io::FsTileStore;
use tilesmith_render::{FrameBuilder, FrameParams, render_tile_default};
use tilesmith_terrain::{Brush, BrushShape, FlattenMode, TILE_SIZE, TextureName, TileIndex};
use tilesmith_world::MapIndex;

use crate::camera::FlyCamera;
use crate::config::EditorConfig;

#[derive(Parser)]
#[command(name = "tilesmith", about = "Batch and interactive editing of terrain tile maps")]
struct Cli {
    /// Editor config (defaults to ./tilesmith.toml when present)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,
    /// Map directory, overriding [map].dir
    #[arg(long, global = true)]
    dir: Option<PathBuf>,
    /// Map name, overriding [map].name
    #[arg(long, global = true)]
    map: Option<String>,
    /// Debug logging unless RUST_LOG says otherwise
    #[arg(long, short, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the map header
    Info,
    /// Add flat tiles to the map and save them
    New {
        /// Tile coordinates (X Z)
        #[arg(long, num_args = 2, value_names = ["X", "Z"])]
        tile: Vec<usize>,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        height: f32,
    },
    /// Load every tile and summarise chunks, layers, liquids and objects
    Stats,
    /// Stitch height seams between all chunks and save
    FixGaps,
    /// Re-encode every tile's alpha maps and save
    ConvertAlpha {
        /// Convert to 8-bit alpha; 4-bit otherwise
        #[arg(long)]
        big: bool,
    },
    /// Apply a brush operation at a world position and save
    Sculpt {
        /// World position (X Z)
        #[arg(long, num_args = 2, value_names = ["X", "Z"], allow_hyphen_values = true)]
        at: Vec<f32>,
        #[command(flatten)]
        brush: BrushArgs,
        #[arg(long, default_value = "raise")]
        op: SculptOp,
        /// Height delta for raise, or how much of the old height remains for flatten/blur
        #[arg(long, default_value_t = 5.0, allow_hyphen_values = true)]
        amount: f32,
    },
    /// Paint a texture (catalog key or game path) at a world position and save
    Paint {
        #[arg(long, num_args = 2, value_names = ["X", "Z"], allow_hyphen_values = true)]
        at: Vec<f32>,
        #[arg(long)]
        texture: String,
        #[command(flatten)]
        brush: BrushArgs,
        /// Scatter dabs around the position instead of one dab
        #[arg(long)]
        spray: bool,
    },
    /// Cut or fill holes at a world position and save
    Hole {
        #[arg(long, num_args = 2, value_names = ["X", "Z"], allow_hyphen_values = true)]
        at: Vec<f32>,
        /// Whole chunk instead of one hole cell
        #[arg(long)]
        big: bool,
        #[arg(long)]
        fill: bool,
    },
    /// Report which chunks a camera would draw
    Cull {
        /// Camera position (X Y Z)
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_hyphen_values = true)]
        eye: Vec<f32>,
        #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
        yaw: f32,
        #[arg(long, default_value_t = -30.0, allow_hyphen_values = true)]
        pitch: f32,
        #[arg(long, default_value_t = 16.0 / 9.0)]
        aspect: f32,
    },
    /// Render a top-down PPM of one tile
    Preview {
        #[arg(long, num_args = 2, value_names = ["X", "Z"])]
        tile: Vec<usize>,
        #[arg(long, default_value_t = 512)]
        size: usize,
        #[arg(long, short)]
        output: PathBuf,
    },
    /// Decode every texture and model the loaded map references
    CheckAssets,
    /// Interactive fly-through editor
    #[cfg(feature = "viewer")]
    Viewer {
        #[arg(long, num_args = 3, value_names = ["X", "Y", "Z"], allow_hyphen_values = true)]
        eye: Option<Vec<f32>>,
    },
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum SculptOp {
    Raise,
    Flatten,
    Blur,
    Clear,
}

#[derive(clap::Args)]
struct BrushArgs {
    /// Brush radius, overriding [edit].brush
    #[arg(long)]
    radius: Option<f32>,
    #[arg(long)]
    inner_ratio: Option<f32>,
    /// flat, linear, smooth, polynomial, trigonometric or square
    #[arg(long, value_parser = parse_shape)]
    shape: Option<BrushShape>,
}

impl BrushArgs {
    fn apply(&self, base: Brush) -> Brush {
        Brush::new(
            self.shape.unwrap_or(base.shape),
            self.radius.unwrap_or(base.radius),
            self.inner_ratio.unwrap_or(base.inner_ratio),
        )
    }
}

fn parse_shape(s: &str) -> Result<BrushShape, String> {
    BrushShape::ALL
        .into_iter()
        .find(|b| format!("{:?}", b).eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown brush shape '{}'", s))
}

fn tile_arg(v: &[usize]) -> Result<TileIndex, Box<dyn Error>> {
    let idx = TileIndex::new(v[0], v[1]);
    if !idx.is_valid() {
        return Err(format!("tile {}_{} is outside the map", v[0], v[1]).into());
    }
    Ok(idx)
}

/// Loads every tile of the map. Corrupt tiles are logged and skipped.
fn load_all(index: &mut MapIndex) -> usize {
    let tiles: Vec<TileIndex> = index.header().tiles().collect();
    let mut loaded = 0;
    for idx in tiles {
        match index.load_tile(idx) {
            Ok(_) => loaded += 1,
            Err(e) => log::error!("tile {}_{}: {}", idx.x, idx.z, e),
        }
    }
    loaded
}

/// Loads stored tiles whose footprint touches the circle.
pub(crate) fn load_tiles_near(index: &mut MapIndex, pos: Vec3, radius: f32) -> usize {
    let near: Vec<TileIndex> = index
        .header()
        .tiles()
        .filter(|idx| !index.is_loaded(*idx) && idx.bounds().intersects_circle_xz(pos, radius))
        .collect();
    near.into_iter().filter(|idx| index.ensure_loaded(*idx)).count()
}

fn ground(ctx: &mut EditContext, at: &[f32]) -> Result<Vec3, Box<dyn Error>> {
    let (x, z) = (at[0], at[1]);
    let y = ctx
        .height_at(x, z)
        .ok_or_else(|| format!("no terrain at ({}, {})", x, z))?;
    Ok(Vec3::new(x, y, z))
}

fn save(index: &mut MapIndex) -> Result<(), Box<dyn Error>> {
    let report = index.save_changed();
    println!("saved {} tile(s)", report.saved.len());
    if let Some((idx, e)) = report.failed.first() {
        return Err(format!("{} tile(s) failed, first {}_{}: {}", report.failed.len(), idx.x, idx.z, e).into());
    }
    Ok(())
}

/// Mean colour of the smallest mip.
fn average_color(tex: &DecodedTexture) -> [f32; 3] {
    let Some(mip) = tex.mips.last() else {
        return [1.0; 3];
    };
    let mut sum = [0u64; 3];
    let mut n = 0u64;
    for px in mip.rgba.chunks_exact(4) {
        for k in 0..3 {
            sum[k] += px[k] as u64;
        }
        n += 1;
    }
    if n == 0 {
        return [1.0; 3];
    }
    sum.map(|s| s as f32 / (n as f32 * 255.0))
}

/// Stable pastel colour for textures that cannot be decoded.
fn name_color(name: &TextureName) -> [f32; 3] {
    let h = name
        .as_str()
        .bytes()
        .fold(0x811c_9dc5u32, |h, b| (h ^ b as u32).wrapping_mul(0x0100_0193));
    [h & 0xff, (h >> 8) & 0xff, (h >> 16) & 0xff].map(|c| 0.5 + c as f32 / 510.0)
}

fn asset_cache(cfg: &EditorConfig) -> Option<AssetCache> {
    cfg.map
        .data_dir
        .as_ref()
        .map(|dir| AssetCache::new(Box::new(DirectoryAssetLoader::new(dir))))
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut cfg = EditorConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.dir {
        cfg.map.dir = dir;
    }
    if let Some(name) = cli.map {
        cfg.map.name = name;
    }
    let store = FsTileStore::new(&cfg.map.dir, cfg.map.name.clone());
    let mut index = MapIndex::open(Box::new(store))?;
    let edit: EditSettings = cfg.edit.clone();

    match cli.command {
        Command::Info => {
            let h = index.header();
            println!("map {} in {}", cfg.map.name, cfg.map.dir.display());
            println!("tiles: {}", h.tile_count());
            println!("alpha: {}", if h.big_alpha() { "8-bit" } else { "4-bit" });
            for idx in h.tiles() {
                println!("  {}_{}", idx.x, idx.z);
            }
        }
        Command::New { tile, height } => {
            let idx = tile_arg(&tile)?;
            if !index.create_tile(idx, height) {
                return Err(format!("tile {}_{} already exists", idx.x, idx.z).into());
            }
            save(&mut index)?;
        }
        Command::Stats => {
            let loaded = load_all(&mut index);
            let mut chunks = 0usize;
            let mut holed = 0usize;
            let mut layers = [0usize; 5];
            let mut liquid = 0usize;
            let mut range = (f32::INFINITY, f32::NEG_INFINITY);
            for tile in index.loaded_tiles() {
                for c in tile.chunks() {
                    chunks += 1;
                    holed += usize::from(c.holes != 0);
                    layers[c.textures.len().min(4)] += 1;
                    liquid += c.liquid.layers.len();
                    range = (range.0.min(c.min_height()), range.1.max(c.max_height()));
                }
            }
            println!("tiles loaded: {}", loaded);
            println!("chunks: {} ({} with holes)", chunks, holed);
            for (n, count) in layers.iter().enumerate() {
                println!("  {} layer(s): {}", n, count);
            }
            println!("liquid layers: {}", liquid);
            if chunks > 0 {
                println!("heights: {:.2} .. {:.2}", range.0, range.1);
            }
            println!("objects: {}", index.instances().len());
        }
        Command::FixGaps => {
            load_all(&mut index);
            if EditContext::new(&mut index, &edit).fix_all_gaps() {
                save(&mut index)?;
            } else {
                println!("no seams to fix");
            }
        }
        Command::ConvertAlpha { big } => {
            let n = EditContext::new(&mut index, &edit).convert_alphamap(big)?;
            println!("converted {} tile(s)", n);
            save(&mut index)?;
        }
        Command::Sculpt { at, brush, op, amount } => {
            let brush = brush.apply(edit.brush);
            let mut ctx = EditContext::new(&mut index, &edit);
            let pos = ground(&mut ctx, &at)?;
            let changed = match op {
                SculptOp::Raise => ctx.change_terrain(pos, amount, &brush),
                SculptOp::Flatten => {
                    ctx.flatten_terrain(pos, amount, &brush, FlattenMode::default(), pos, 0.0, 0.0)
                }
                SculptOp::Blur => ctx.blur_terrain(pos, amount, &brush),
                SculptOp::Clear => ctx.clear_height(pos),
            };
            if changed {
                save(&mut index)?;
            } else {
                println!("nothing changed");
            }
        }
        Command::Paint {
            at,
            texture,
            brush,
            spray,
        } => {
            let catalog = match &cfg.map.catalog {
                Some(p) => TextureCatalog::from_path(p)?,
                None => TextureCatalog::new(),
            };
            let texture = TextureName::new(&catalog.resolve(&texture));
            let brush = brush.apply(edit.brush);
            let mut ctx = EditContext::new(&mut index, &edit);
            let pos = ground(&mut ctx, &at)?;
            let (strength, pressure) = (edit.paint_strength, edit.paint_pressure);
            let painted = if spray {
                ctx.spray_texture(pos, &brush, strength, pressure, &texture)
            } else {
                let report = ctx.paint_texture(pos, &brush, strength, pressure, &texture);
                if report.refused > 0 {
                    log::warn!("{} chunk(s) under the brush already have four textures", report.refused);
                }
                report.changed()
            };
            if painted {
                save(&mut index)?;
            } else {
                println!("nothing changed");
            }
        }
        Command::Hole { at, big, fill } => {
            let mut ctx = EditContext::new(&mut index, &edit);
            let pos = Vec3::new(at[0], 0.0, at[1]);
            if ctx.set_hole(pos, big, !fill) {
                save(&mut index)?;
            } else {
                println!("nothing changed");
            }
        }
        Command::Cull {
            eye,
            yaw,
            pitch,
            aspect,
        } => {
            let cam = FlyCamera::looking(Vec3::new(eye[0], eye[1], eye[2]), yaw, pitch);
            let mut builder = FrameBuilder::new(cfg.render_settings());
            load_tiles_near(&mut index, cam.position, builder.settings.effective_cull_distance());
            let list = builder.build(&index, &FrameParams::new(cam.view_proj(aspect), cam.position));
            let s = list.stats;
            println!(
                "considered {}  drawn {}  culled {}  water {}  objects {}",
                s.chunks_considered, s.chunks_drawn, s.chunks_culled, s.water_drawn, s.instances_drawn
            );
            for key in list.terrain_chunks() {
                log::debug!("draw {}_{} chunk ({}, {})", key.tile.x, key.tile.z, key.cx, key.cz);
            }
        }
        Command::Preview { tile, size, output } => {
            let idx = tile_arg(&tile)?;
            if !index.ensure_loaded(idx) {
                return Err(format!("map has no tile {}_{}", idx.x, idx.z).into());
            }
            let Some(t) = index.tile(idx) else {
                return Err(format!("map has no tile {}_{}", idx.x, idx.z).into());
            };
            let mut colors: HashMap<TextureName, [f32; 3]> = HashMap::new();
            if let Some(mut cache) = asset_cache(&cfg) {
                for layer in t.chunks().flat_map(|c| c.textures.layers()) {
                    if colors.contains_key(&layer.texture) {
                        continue;
                    }
                    let color = average_color(cache.texture(layer.texture.as_str()));
                    if !cache.is_placeholder(layer.texture.as_str()) {
                        colors.insert(layer.texture.clone(), color);
                    }
                }
            }
            let mut builder = FrameBuilder::new(cfg.render_settings());
            let image = render_tile_default(&mut builder, t, size, |name| {
                colors.get(name).copied().unwrap_or_else(|| name_color(name))
            });
            image.write_ppm(BufWriter::new(File::create(&output)?))?;
            println!(
                "wrote {} ({}x{}, {:.0} units per pixel)",
                output.display(),
                size,
                size,
                TILE_SIZE / size.max(1) as f32
            );
        }
        Command::CheckAssets => {
            let Some(mut assets) = asset_cache(&cfg) else {
                return Err("set [map].data_dir to check assets".into());
            };
            load_all(&mut index);
            let mut textures: Vec<TextureName> = index
                .loaded_tiles()
                .flat_map(|t| t.chunks())
                .flat_map(|c| c.textures.layers().iter().map(|l| l.texture.clone()))
                .collect();
            textures.sort();
            textures.dedup();
            let mut models: Vec<String> = index.instances().sorted().iter().map(|i| i.filename.clone()).collect();
            models.sort();
            models.dedup();
            for t in &textures {
                assets.texture(t.as_str());
            }
            for m in &models {
                assets.model(m);
            }
            let missing = assets.placeholder_count();
            println!(
                "{} texture(s), {} model(s), {} missing",
                textures.len(),
                models.len(),
                missing
            );
            if missing > 0 {
                for name in textures.iter().map(TextureName::as_str).chain(models.iter().map(String::as_str)) {
                    if assets.is_placeholder(name) {
                        println!("  missing {}", name);
                    }
                }
            }
        }
        #[cfg(feature = "viewer")]
        Command::Viewer { eye } => {
            let start = match eye {
                Some(e) => Vec3::new(e[0], e[1], e[2]),
                None => match index.header().tiles().next() {
                    Some(idx) => idx.bounds().center() + Vec3::new(0.0, 200.0, 0.0),
                    None => return Err("map has no tiles".into()),
                },
            };
            let render = cfg.render_settings();
            viewer::run(&mut index, &edit, render, asset_cache(&cfg), start)?;
        }
    }
    Ok(())
}
