use anyhow::{Context, Result};
use lumen_renderer::{render, RenderConfig, Scene, SceneBuilder, World};
use std::path::{Path, PathBuf};

mod scene;

const DEFAULT_OUTPUT: &str = "render.png";

/// Read a render config from JSON. Missing fields take their defaults.
fn load_config(path: &Path) -> Result<RenderConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: RenderConfig = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config {}", path.display()))?;
    Ok(config)
}

fn save_png(path: &Path, width: u32, height: u32, rgba: Vec<u8>) -> Result<()> {
    let image = image::RgbaImage::from_raw(width, height, rgba)
        .context("Pixel buffer does not match the image size")?;
    image
        .save(path)
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    // lumen [config.json] [output.png]
    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => load_config(Path::new(&path))?,
        None => RenderConfig::default(),
    };
    let output = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));
    config.validate().context("Invalid render config")?;

    log::info!("Starting Lumen");

    let mut builder = SceneBuilder::new().with_max_leaf_size(config.max_leaf_size);
    scene::cornell_box(&mut builder).context("Failed to build the demo scene")?;
    let scene: Scene = builder.build();

    let packed = scene.pack();
    log::debug!(
        "Packed BVH: {} nodes, {} bytes",
        packed.bvh.nodes.len(),
        packed.bvh.as_bytes().len()
    );

    let world: &dyn World = &scene;
    let image = render(world, &scene::cornell_camera(), &config, None)?;

    save_png(&output, image.width, image.height, image.to_rgba())?;
    log::info!("Saved {}", output.display());

    Ok(())
}
