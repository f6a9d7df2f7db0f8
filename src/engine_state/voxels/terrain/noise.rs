//! # Noise Field
//!
//! Deterministic Perlin sampling for terrain generation. Every value handed to
//! the generator is remapped into `[0, 1]`.

use ::noise::{NoiseFn, Perlin};
use serde::{Deserialize, Serialize};

/// Seed offset of the temperature field.
const TEMPERATURE_SEED_OFFSET: u32 = 3000;
/// Seed offset of the ore presence field.
const ORE_SEED_OFFSET: u32 = 5000;

/// Multi-octave sampling parameters of a 2D field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NoiseParams {
    /// Number of octaves (layers of detail)
    pub octaves: u32,
    /// Frequency multiplier between octaves
    pub lacunarity: f64,
    /// Amplitude multiplier between octaves
    pub persistence: f64,
    /// Base frequency (scale)
    pub frequency: f64,
}

impl Default for NoiseParams {
    fn default() -> Self {
        Self {
            octaves: 4,
            lacunarity: 2.0,
            persistence: 0.5,
            frequency: 0.01,
        }
    }
}

impl NoiseParams {
    /// Parameters of the temperature field that selects biomes.
    pub fn temperature() -> Self {
        Self {
            octaves: 3,
            lacunarity: 2.0,
            persistence: 0.5,
            frequency: 0.008,
        }
    }
}

/// Which noise dimensionality an ore vein samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoiseAlgorithm {
    /// Sample `(x, z)`: the vein forms vertical shafts.
    Perlin2d,
    /// Sample `(x, y, z)`: the vein forms blobs.
    Perlin3d,
}

/// Seeded noise sources shared read-only by all generation jobs.
#[derive(Clone)]
pub struct NoiseField {
    terrain: Perlin,
    temperature: Perlin,
    ore: Perlin,
}

impl NoiseField {
    /// Creates the fields of a world seed.
    pub fn new(seed: u32) -> Self {
        Self {
            terrain: Perlin::new(seed),
            temperature: Perlin::new(seed.wrapping_add(TEMPERATURE_SEED_OFFSET)),
            ore: Perlin::new(seed.wrapping_add(ORE_SEED_OFFSET)),
        }
    }

    /// Fractal terrain noise at a column, in `[0, 1]`.
    pub fn sample_2d(&self, x: f64, z: f64, params: &NoiseParams) -> f64 {
        fractal_01(&self.terrain, x, z, params)
    }

    /// Pseudo-temperature of a column, in `[0, 1]`.
    pub fn temperature(&self, x: f64, z: f64) -> f64 {
        fractal_01(&self.temperature, x, z, &NoiseParams::temperature())
    }

    /// Presence test of a 2D vein.
    ///
    /// A frequency of `0` collapses the field to a constant, so a threshold of
    /// `0` makes the vein present everywhere.
    pub fn presence_2d(&self, x: f64, z: f64, frequency: f64, offset: f64, threshold: f64) -> bool {
        let value = self.ore.get([x * frequency + offset, z * frequency + offset]);
        remap_01(value) >= threshold
    }

    /// Presence test of a 3D vein.
    pub fn presence_3d(
        &self,
        x: f64,
        y: f64,
        z: f64,
        frequency: f64,
        offset: f64,
        threshold: f64,
    ) -> bool {
        let value = self.ore.get([
            x * frequency + offset,
            y * frequency + offset,
            z * frequency + offset,
        ]);
        remap_01(value) >= threshold
    }
}

/// Sums octaves, normalises by the amplitude total and remaps into `[0, 1]`.
fn fractal_01(perlin: &Perlin, x: f64, z: f64, params: &NoiseParams) -> f64 {
    let mut value = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = params.frequency;
    let mut max_value = 0.0;

    for _ in 0..params.octaves {
        value += perlin.get([x * frequency, z * frequency]) * amplitude;
        max_value += amplitude;

        amplitude *= params.persistence;
        frequency *= params.lacunarity;
    }

    if max_value <= 0.0 {
        return 0.5;
    }
    remap_01(value / max_value)
}

#[inline]
fn remap_01(value: f64) -> f64 {
    ((value + 1.0) * 0.5).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_are_normalised_and_deterministic() {
        let field = NoiseField::new(42);
        let params = NoiseParams::default();
        for i in 0..200 {
            let (x, z) = (i as f64 * 7.3 - 500.0, i as f64 * -3.1 + 20.0);
            let value = field.sample_2d(x, z, &params);
            assert!((0.0..=1.0).contains(&value));
            assert_eq!(value, NoiseField::new(42).sample_2d(x, z, &params));

            let temperature = field.temperature(x, z);
            assert!((0.0..=1.0).contains(&temperature));
        }
    }

    #[test]
    fn zero_frequency_with_zero_threshold_is_always_present() {
        let field = NoiseField::new(7);
        for i in -20..20 {
            let p = i as f64 * 13.7;
            assert!(field.presence_2d(p, -p, 0.0, 0.0, 0.0));
            assert!(field.presence_3d(p, 3.0, -p, 0.0, 0.25, 0.0));
        }
    }

    #[test]
    fn threshold_above_one_is_never_present() {
        let field = NoiseField::new(7);
        for i in -20..20 {
            let p = i as f64 * 1.3;
            assert!(!field.presence_2d(p, p, 0.1, 0.0, 1.01));
        }
    }
}
