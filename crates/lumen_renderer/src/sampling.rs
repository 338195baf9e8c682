//! Random number streams and sampling helpers.
//!
//! Every path owns its own generator. Nothing in the renderer touches a
//! global or thread-local RNG, so a fixed seed reproduces an image exactly
//! regardless of how rayon schedules the buckets.

use lumen_math::Vec3;
use rand::{Rng, RngCore};
use rand_pcg::Pcg32;

/// Per-pixel, per-batch random stream.
pub type PathRng = Pcg32;

/// Golden-ratio increment used to decorrelate batches of the same pixel.
const BATCH_STRIDE: u64 = 0x9E37_79B9;

/// Build the random stream for pixel `(x, y)` in `batch`.
///
/// The state depends on the pixel and the base seed, the PCG stream selector on
/// the batch, so two batches of one pixel never share a sequence.
pub fn path_rng(seed: u64, x: u32, y: u32, batch: u32) -> PathRng {
    let pixel = ((y as u64) << 32) | x as u64;
    let state = seed
        .wrapping_mul(0x5851_F42D_4C95_7F2D)
        .wrapping_add(pixel)
        .wrapping_add((batch as u64).wrapping_mul(BATCH_STRIDE));
    Pcg32::new(state, batch as u64)
}

/// Uniform float in `[0, 1)`.
#[inline]
pub fn gen_f32(rng: &mut dyn RngCore) -> f32 {
    rng.gen::<f32>()
}

/// Uniformly distributed direction on the unit sphere.
pub fn random_unit_vector(rng: &mut dyn RngCore) -> Vec3 {
    // Rejection sampling for uniform distribution on sphere
    loop {
        let v = Vec3::new(
            gen_f32(rng) * 2.0 - 1.0,
            gen_f32(rng) * 2.0 - 1.0,
            gen_f32(rng) * 2.0 - 1.0,
        );
        let len_sq = v.length_squared();
        if len_sq > 1e-6 && len_sq <= 1.0 {
            return v / len_sq.sqrt();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_path_rng_is_reproducible() {
        let mut a = path_rng(7, 3, 4, 0);
        let mut b = path_rng(7, 3, 4, 0);
        for _ in 0..16 {
            assert_eq!(a.next_u32(), b.next_u32());
        }
    }

    #[test]
    fn test_path_rng_streams_differ() {
        let first = |mut rng: PathRng| rng.next_u64();
        let base = first(path_rng(7, 3, 4, 0));
        assert_ne!(base, first(path_rng(7, 4, 3, 0)));
        assert_ne!(base, first(path_rng(7, 3, 4, 1)));
        assert_ne!(base, first(path_rng(8, 3, 4, 0)));
    }

    #[test]
    fn test_gen_f32_range() {
        let mut rng = path_rng(1, 0, 0, 0);
        for _ in 0..1000 {
            let x = gen_f32(&mut rng);
            assert!((0.0..1.0).contains(&x));
        }
    }

    #[test]
    fn test_random_unit_vector_is_unit() {
        let mut rng = path_rng(2, 0, 0, 0);
        let mut mean = Vec3::ZERO;
        for _ in 0..4000 {
            let v = random_unit_vector(&mut rng);
            assert!((v.length() - 1.0).abs() < 1e-4);
            mean += v;
        }
        // Uniform on the sphere: the average direction is close to zero.
        assert!((mean / 4000.0).length() < 0.1);
    }
}
