//! Deterministic RNG utilities for reproducible tests.

use nalgebra::{DMatrix, UnitQuaternion, Vector3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Create a deterministic `ChaCha8Rng` from a seed.
///
/// All test randomization should go through this to ensure reproducibility.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Generate a deterministic `Vec<f64>` of length `dim` in `[-1, 1)`.
pub fn deterministic_vec(dim: usize, seed: u64) -> Vec<f64> {
    let mut rng = seeded_rng(seed);
    (0..dim).map(|_| rng.gen_range(-1.0..1.0)).collect()
}

/// Vector with components uniform in `[-scale, scale)`.
pub fn random_vector3(rng: &mut impl Rng, scale: f64) -> Vector3<f64> {
    Vector3::from_fn(|_, _| rng.gen_range(-scale..scale))
}

/// Orientation from uniformly drawn roll, pitch and yaw.
pub fn random_orientation(rng: &mut impl Rng) -> UnitQuaternion<f64> {
    use std::f64::consts::PI;
    UnitQuaternion::from_euler_angles(
        rng.gen_range(-PI..PI),
        rng.gen_range(-PI / 2.0..PI / 2.0),
        rng.gen_range(-PI..PI),
    )
}

/// Dense matrix with entries uniform in `[-1, 1)`.
pub fn random_matrix(rng: &mut impl Rng, rows: usize, cols: usize) -> DMatrix<f64> {
    DMatrix::from_fn(rows, cols, |_, _| rng.gen_range(-1.0..1.0))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
