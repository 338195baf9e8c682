//! Progressive multi-threaded rendering.
//!
//! Samples are traced in batches. Every batch renders all buckets in
//! parallel, then the per-bucket sums are folded into an [`Accumulator`] on
//! the calling thread. Cancellation is only observed between buckets.

use crate::bucket::{generate_buckets, render_bucket, Batch, BucketResult, TileContext};
use crate::bvh::DEFAULT_MAX_LEAF_SIZE;
use crate::{Camera, Color, IntegratorConfig, PathIntegrator, World, DEFAULT_BUCKET_SIZE};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use thiserror::Error;

/// Rejected render settings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("image resolution must be non-zero, got {width}x{height}")]
    ZeroResolution { width: u32, height: u32 },

    #[error("samples_per_pixel must be at least 1")]
    ZeroSamples,

    #[error("batch_size must be at least 1")]
    ZeroBatchSize,

    #[error("bucket_size must be at least 1")]
    ZeroBucketSize,
}

/// Render configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub width: u32,
    pub height: u32,
    /// Total samples per pixel across all batches
    pub samples_per_pixel: u32,
    /// Samples traced per pixel per batch
    pub batch_size: u32,
    /// Maximum surface interactions per path
    pub max_bounces: u32,
    /// Tile edge length in pixels
    pub bucket_size: u32,
    pub max_leaf_size: usize,
    /// Base seed; the same seed reproduces an image bit for bit
    pub seed: u64,
    pub russian_roulette: bool,
    pub roulette_start_bounce: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            samples_per_pixel: 128,
            batch_size: 16,
            max_bounces: 32,
            bucket_size: DEFAULT_BUCKET_SIZE,
            max_leaf_size: DEFAULT_MAX_LEAF_SIZE,
            seed: 0,
            russian_roulette: true,
            roulette_start_bounce: 4,
        }
    }
}

impl RenderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ZeroResolution {
                width: self.width,
                height: self.height,
            });
        }
        if self.samples_per_pixel == 0 {
            return Err(ConfigError::ZeroSamples);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if self.bucket_size == 0 {
            return Err(ConfigError::ZeroBucketSize);
        }
        Ok(())
    }

    pub fn integrator(&self) -> IntegratorConfig {
        IntegratorConfig {
            max_bounces: self.max_bounces,
            russian_roulette: self.russian_roulette,
            roulette_start_bounce: self.roulette_start_bounce,
        }
    }

    /// Split `samples_per_pixel` into batches of at most `batch_size`.
    pub fn batches(&self) -> Vec<Batch> {
        let batch_size = self.batch_size.max(1);
        let mut batches = Vec::new();
        let mut remaining = self.samples_per_pixel;
        let mut index = 0;
        while remaining > 0 {
            let samples = remaining.min(batch_size);
            batches.push(Batch { index, samples });
            remaining -= samples;
            index += 1;
        }
        batches
    }
}

/// Destination for finished pixel values.
pub trait RadianceSink {
    fn write(&mut self, x: u32, y: u32, color: Color);
}

/// Apply gamma correction (gamma = 2.2) to a clamped channel.
#[inline]
pub fn linear_to_gamma(linear: f32) -> f32 {
    linear.clamp(0.0, 1.0).powf(1.0 / 2.2)
}

/// Convert a linear color to 8-bit RGBA.
pub fn color_to_rgba(color: Color) -> [u8; 4] {
    let to_byte = |c: f32| (linear_to_gamma(c) * 255.999) as u8;
    [to_byte(color.x), to_byte(color.y), to_byte(color.z), 255]
}

/// Simple image buffer for storing render output.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageBuffer {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<Color>,
}

impl ImageBuffer {
    /// Create a new image buffer filled with black.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![Color::ZERO; width as usize * height as usize],
        }
    }

    /// Get the pixel at (x, y).
    pub fn get(&self, x: u32, y: u32) -> Color {
        self.pixels[self.offset(x, y)]
    }

    /// Set the pixel at (x, y).
    pub fn set(&mut self, x: u32, y: u32, color: Color) {
        let i = self.offset(x, y);
        self.pixels[i] = color;
    }

    /// Convert to RGBA bytes (for display or saving).
    pub fn to_rgba(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.pixels.len() * 4);
        for color in &self.pixels {
            bytes.extend_from_slice(&color_to_rgba(*color));
        }
        bytes
    }

    #[inline]
    fn offset(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }
}

impl RadianceSink for ImageBuffer {
    fn write(&mut self, x: u32, y: u32, color: Color) {
        self.set(x, y, color);
    }
}

/// Running per-pixel radiance sums and sample counts.
#[derive(Debug, Clone)]
pub struct Accumulator {
    width: u32,
    height: u32,
    sums: Vec<Color>,
    samples: Vec<u32>,
}

impl Accumulator {
    pub fn new(width: u32, height: u32) -> Self {
        let len = width as usize * height as usize;
        Self {
            width,
            height,
            sums: vec![Color::ZERO; len],
            samples: vec![0; len],
        }
    }

    /// Add a radiance sum made of `samples` paths to pixel `(x, y)`.
    pub fn add(&mut self, x: u32, y: u32, sum: Color, samples: u32) {
        debug_assert!(sum.is_finite(), "non-finite radiance at ({x}, {y}): {sum}");
        let i = y as usize * self.width as usize + x as usize;
        self.sums[i] += sum;
        self.samples[i] += samples;
    }

    /// Fold one rendered bucket in.
    pub fn add_bucket(&mut self, result: &BucketResult) {
        for ((x, y), sum) in result.bucket.pixels().zip(&result.pixels) {
            self.add(x, y, *sum, result.samples);
        }
    }

    pub fn samples(&self, x: u32, y: u32) -> u32 {
        self.samples[y as usize * self.width as usize + x as usize]
    }

    /// Write per-pixel averages into `sink`. Pixels without samples are black.
    pub fn resolve_into(&self, sink: &mut dyn RadianceSink) {
        for y in 0..self.height {
            for x in 0..self.width {
                let i = y as usize * self.width as usize + x as usize;
                let color = match self.samples[i] {
                    0 => Color::ZERO,
                    n => self.sums[i] / n as f32,
                };
                sink.write(x, y, color);
            }
        }
    }

    /// Average every pixel into a new image.
    pub fn finalize(&self) -> ImageBuffer {
        let mut image = ImageBuffer::new(self.width, self.height);
        self.resolve_into(&mut image);
        image
    }
}

/// Render `world` as seen by `camera`.
///
/// The camera is re-targeted to the configured resolution. If `cancel` is
/// raised, buckets not yet started are skipped and the partially accumulated
/// image is returned.
pub fn render(
    world: &dyn World,
    camera: &Camera,
    config: &RenderConfig,
    cancel: Option<&AtomicBool>,
) -> Result<ImageBuffer, ConfigError> {
    config.validate()?;

    let mut camera = camera.clone().with_resolution(config.width, config.height);
    camera.initialize();

    let buckets = generate_buckets(config.width, config.height, config.bucket_size);
    let batches = config.batches();
    let ctx = TileContext {
        world,
        camera: &camera,
        integrator: PathIntegrator::new(config.integrator()),
        seed: config.seed,
    };
    let cancelled = || cancel.is_some_and(|flag| flag.load(Ordering::Relaxed));

    log::info!(
        "Rendering {}x{} at {} spp ({} batches, {} buckets)",
        config.width,
        config.height,
        config.samples_per_pixel,
        batches.len(),
        buckets.len()
    );
    let start = Instant::now();
    let mut accumulator = Accumulator::new(config.width, config.height);

    for batch in &batches {
        let results: Vec<BucketResult> = buckets
            .par_iter()
            .filter_map(|bucket| {
                if cancelled() {
                    return None;
                }
                let pixels = render_bucket(bucket, &ctx, *batch);
                Some(BucketResult::new(*bucket, pixels, batch.samples))
            })
            .collect();

        for result in &results {
            accumulator.add_bucket(result);
        }

        if cancelled() {
            log::warn!("Render cancelled during batch {}", batch.index);
            break;
        }
        log::debug!(
            "Batch {}/{} done ({:.2?} elapsed)",
            batch.index + 1,
            batches.len(),
            start.elapsed()
        );
    }

    log::info!("Render finished in {:.2?}", start.elapsed());
    Ok(accumulator.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Material, Scene, SceneBuilder, Vec3};

    fn lit_scene() -> Scene {
        let mut builder = SceneBuilder::new();
        let light = builder
            .add_material(Material::emissive(Color::ONE, 3.0))
            .unwrap();
        let red = builder
            .add_material(Material::diffuse(Color::new(0.8, 0.1, 0.1)))
            .unwrap();
        builder
            .add_sphere(Vec3::new(0.0, 2.0, -3.0), 1.0, light)
            .unwrap();
        builder
            .add_sphere(Vec3::new(0.0, -0.5, -3.0), 1.0, red)
            .unwrap();
        builder.build()
    }

    fn small_config() -> RenderConfig {
        RenderConfig {
            width: 24,
            height: 16,
            samples_per_pixel: 6,
            batch_size: 4,
            bucket_size: 8,
            seed: 42,
            ..Default::default()
        }
    }

    #[test]
    fn test_linear_to_gamma() {
        assert_eq!(linear_to_gamma(0.0), 0.0);
        assert!((linear_to_gamma(1.0) - 1.0).abs() < 0.0001);
        assert!((linear_to_gamma(0.5) - 0.5f32.powf(1.0 / 2.2)).abs() < 0.0001);
        assert_eq!(linear_to_gamma(-1.0), 0.0);
        assert_eq!(linear_to_gamma(7.0), 1.0);
    }

    #[test]
    fn test_color_to_rgba() {
        assert_eq!(color_to_rgba(Color::ZERO), [0, 0, 0, 255]);
        assert_eq!(color_to_rgba(Color::ONE), [255, 255, 255, 255]);
        assert_eq!(color_to_rgba(Color::new(4.0, -1.0, 0.5)), [255, 0, 186, 255]);
    }

    #[test]
    fn test_config_validation() {
        assert!(RenderConfig::default().validate().is_ok());

        let zero_width = RenderConfig {
            width: 0,
            ..Default::default()
        };
        assert_eq!(
            zero_width.validate(),
            Err(ConfigError::ZeroResolution {
                width: 0,
                height: 480
            })
        );

        let zero_samples = RenderConfig {
            samples_per_pixel: 0,
            ..Default::default()
        };
        assert_eq!(zero_samples.validate(), Err(ConfigError::ZeroSamples));

        let zero_batch = RenderConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert_eq!(zero_batch.validate(), Err(ConfigError::ZeroBatchSize));

        let zero_bucket = RenderConfig {
            bucket_size: 0,
            ..Default::default()
        };
        assert_eq!(zero_bucket.validate(), Err(ConfigError::ZeroBucketSize));
    }

    #[test]
    fn test_config_from_partial_json() {
        let config: RenderConfig =
            serde_json::from_str(r#"{ "width": 320, "seed": 9, "russian_roulette": false }"#)
                .unwrap();
        assert_eq!(config.width, 320);
        assert_eq!(config.seed, 9);
        assert!(!config.russian_roulette);
        assert_eq!(config.height, RenderConfig::default().height);
        assert_eq!(config.roulette_start_bounce, 4);

        let round_trip: RenderConfig =
            serde_json::from_str(&serde_json::to_string(&config).unwrap()).unwrap();
        assert_eq!(round_trip, config);
    }

    #[test]
    fn test_batches_cover_samples() {
        let batches = small_config().batches();
        assert_eq!(
            batches,
            vec![
                Batch {
                    index: 0,
                    samples: 4
                },
                Batch {
                    index: 1,
                    samples: 2
                }
            ]
        );
    }

    #[test]
    fn test_accumulator_averages() {
        let mut acc = Accumulator::new(2, 1);
        acc.add(0, 0, Color::splat(3.0), 2);
        acc.add(0, 0, Color::splat(1.0), 2);
        assert_eq!(acc.samples(0, 0), 4);

        let image = acc.finalize();
        assert_eq!(image.get(0, 0), Color::splat(1.0));
        // Never sampled
        assert_eq!(image.get(1, 0), Color::ZERO);
    }

    #[test]
    fn test_image_buffer_as_sink() {
        let mut image = ImageBuffer::new(3, 2);
        let sink: &mut dyn RadianceSink = &mut image;
        sink.write(2, 1, Color::ONE);
        assert_eq!(image.get(2, 1), Color::ONE);
        assert_eq!(image.to_rgba().len(), 3 * 2 * 4);
        assert_eq!(&image.to_rgba()[20..24], &[255, 255, 255, 255]);
    }

    #[test]
    fn test_render_is_deterministic() {
        let scene = lit_scene();
        let camera = Camera::new().with_position(Vec3::ZERO, Vec3::new(0.0, 0.0, -1.0), Vec3::Y);
        let config = small_config();

        let a = render(&scene, &camera, &config, None).unwrap();
        let b = render(&scene, &camera, &config, None).unwrap();
        assert_eq!(a, b);
        assert!(a.pixels.iter().all(|c| c.is_finite() && c.min_element() >= 0.0));
        assert!(a.pixels.iter().any(|c| c.max_element() > 0.0));

        // A different seed changes the noise
        let reseeded = RenderConfig { seed: 43, ..config };
        assert_ne!(render(&scene, &camera, &reseeded, None).unwrap(), a);
    }

    #[test]
    fn test_render_sees_the_light() {
        let scene = lit_scene();
        let camera = Camera::new()
            .with_position(Vec3::ZERO, Vec3::new(0.0, 2.0, -3.0), Vec3::Y)
            .with_vfov(20.0);
        let config = RenderConfig {
            width: 9,
            height: 9,
            samples_per_pixel: 2,
            ..small_config()
        };

        let image = render(&scene, &camera, &config, None).unwrap();
        // The center pixel looks straight at the emitter.
        assert!((image.get(4, 4) - Color::splat(3.0)).abs().max_element() < 1e-4);
    }

    #[test]
    fn test_render_cancelled_before_start() {
        let scene = lit_scene();
        let cancel = AtomicBool::new(true);
        let image = render(&scene, &Camera::new(), &small_config(), Some(&cancel)).unwrap();
        assert_eq!((image.width, image.height), (24, 16));
        assert!(image.pixels.iter().all(|&c| c == Color::ZERO));
    }

    #[test]
    fn test_render_rejects_bad_config() {
        let scene = lit_scene();
        let config = RenderConfig {
            height: 0,
            ..small_config()
        };
        assert!(render(&scene, &Camera::new(), &config, None).is_err());
    }
}
