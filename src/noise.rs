//! Cheap deterministic noise.
//!
//! The primitive is a single-frequency sine product, not a gradient noise.
//! It is smooth locally but periodic along the axes, so large stretches of
//! terrain show axis-aligned banding. Fractional accumulation over a few
//! octaves hides most of it at driving scale.

use crate::config;

const BELOW_ONE: f32 = 1.0 - f32::EPSILON;

/// Deterministic scalar in `[0, 1)`.
#[inline]
pub fn hash(x: f32, z: f32) -> f32 {
    (0.5 + 0.5 * x.sin() * z.cos()).clamp(0.0, BELOW_ONE)
}

/// Fractional accumulation of [`hash`] over the configured octaves.
/// The result is normalized back into `[0, 1)`.
pub fn fbm2(x: f32, z: f32, params: &config::Noise) -> f32 {
    let mut frequency = params.base_frequency;
    let mut amplitude = 1.0;
    let mut sum = 0.0;
    let mut total = 0.0;
    for _ in 0..params.octaves {
        sum += amplitude * hash(x * frequency, z * frequency);
        total += amplitude;
        amplitude *= params.falloff;
        frequency *= 2.0;
    }
    if total > 0.0 {
        (sum / total).clamp(0.0, BELOW_ONE)
    } else {
        0.0
    }
}

/// One-dimensional variant in `[-1, 1]`, used to bend the road.
pub fn fbm1(t: f32, octaves: u32, falloff: f32) -> f32 {
    let mut frequency = 1.0;
    let mut amplitude = 1.0;
    let mut sum = 0.0;
    let mut total = 0.0;
    for _ in 0..octaves {
        // the second coordinate keeps the curve from repeating every period
        let h = hash(t * frequency, 0.37 * t * frequency);
        sum += amplitude * (2.0 * h - 1.0);
        total += amplitude;
        amplitude *= falloff;
        frequency *= 2.0;
    }
    if total > 0.0 {
        (sum / total).clamp(-1.0, 1.0)
    } else {
        0.0
    }
}
