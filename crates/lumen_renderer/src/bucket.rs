//! Bucket-based tile rendering.
//!
//! Divides the image into tiles (buckets) that can be rendered
//! independently and in parallel using rayon.

use crate::sampling::path_rng;
use crate::{Camera, Color, PathIntegrator, World};

/// A rectangular region of the image to render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bucket {
    /// X coordinate of bucket's top-left corner
    pub x: u32,
    /// Y coordinate of bucket's top-left corner
    pub y: u32,
    /// Width of the bucket in pixels
    pub width: u32,
    /// Height of the bucket in pixels
    pub height: u32,
    /// Index of this bucket in the render order
    pub index: usize,
}

impl Bucket {
    /// Create a new bucket.
    pub fn new(x: u32, y: u32, width: u32, height: u32, index: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
            index,
        }
    }

    /// Global pixel coordinates in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = (u32, u32)> + '_ {
        (self.y..self.y + self.height)
            .flat_map(move |y| (self.x..self.x + self.width).map(move |x| (x, y)))
    }
}

/// Default bucket size in pixels.
pub const DEFAULT_BUCKET_SIZE: u32 = 64;

/// Generate buckets for an image, sorted in spiral order from center.
///
/// Center buckets come first so a progressive preview fills in where
/// the subject usually is.
pub fn generate_buckets(width: u32, height: u32, bucket_size: u32) -> Vec<Bucket> {
    let bucket_size = bucket_size.max(1);
    let mut buckets = Vec::new();
    let mut index = 0;

    // Generate grid of buckets
    let mut y = 0;
    while y < height {
        let mut x = 0;
        while x < width {
            let bw = bucket_size.min(width - x);
            let bh = bucket_size.min(height - y);
            buckets.push(Bucket::new(x, y, bw, bh, index));
            index += 1;
            x += bucket_size;
        }
        y += bucket_size;
    }

    sort_spiral(&mut buckets, width, height);

    // Update indices after sorting
    for (i, bucket) in buckets.iter_mut().enumerate() {
        bucket.index = i;
    }

    buckets
}

/// Sort buckets by distance from image center.
///
/// The sort is stable, so equidistant buckets keep their grid order.
fn sort_spiral(buckets: &mut [Bucket], width: u32, height: u32) {
    let center_x = width as f32 / 2.0;
    let center_y = height as f32 / 2.0;

    let distance = |b: &Bucket| {
        let bx = b.x as f32 + b.width as f32 / 2.0;
        let by = b.y as f32 + b.height as f32 / 2.0;
        (bx - center_x).powi(2) + (by - center_y).powi(2)
    };

    buckets.sort_by(|a, b| distance(a).total_cmp(&distance(b)));
}

/// One batch of samples: which RNG stream to use and how many paths to trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Batch {
    pub index: u32,
    pub samples: u32,
}

/// Everything a bucket task reads. Shared by reference across threads.
#[derive(Clone, Copy)]
pub struct TileContext<'a> {
    pub world: &'a dyn World,
    pub camera: &'a Camera,
    pub integrator: PathIntegrator,
    pub seed: u64,
}

/// Render one batch of a bucket.
///
/// Returns per-pixel radiance sums (not averages) in row-major order within
/// the bucket. Each pixel draws from its own stream keyed by the seed, its
/// coordinates and the batch index.
pub fn render_bucket(bucket: &Bucket, ctx: &TileContext<'_>, batch: Batch) -> Vec<Color> {
    bucket
        .pixels()
        .map(|(x, y)| {
            let mut rng = path_rng(ctx.seed, x, y, batch.index);
            let mut sum = Color::ZERO;
            for _ in 0..batch.samples {
                let ray = ctx.camera.get_ray(x, y, &mut rng);
                sum += ctx.integrator.trace(ctx.world, &ray, &mut rng);
            }
            sum
        })
        .collect()
}

/// Result of rendering a bucket.
#[derive(Debug, Clone)]
pub struct BucketResult {
    /// The bucket that was rendered
    pub bucket: Bucket,
    /// Radiance sums in row-major order
    pub pixels: Vec<Color>,
    /// Samples behind each sum
    pub samples: u32,
}

impl BucketResult {
    /// Create a new bucket result.
    pub fn new(bucket: Bucket, pixels: Vec<Color>, samples: u32) -> Self {
        Self {
            bucket,
            pixels,
            samples,
        }
    }
}
