//! # Sampled Curves
//!
//! Piecewise-linear curves over `[0, 1]` used to remap terrain heights and ore
//! thresholds. Curves are only evaluated at load time: every consumer works on
//! a lookup pre-sampled once per chunk-height index.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A piecewise-linear curve given by `(t, value)` keys sorted by `t`.
///
/// Outside the first and last key the curve is flat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Curve {
    keys: Vec<(f64, f64)>,
}

impl Curve {
    /// Builds a curve, rejecting empty, unsorted or non-finite keys.
    pub fn new(keys: Vec<(f64, f64)>) -> Result<Self, ConfigError> {
        let curve = Self { keys };
        curve.validate()?;
        Ok(curve)
    }

    /// `value = t` over `[0, 1]`.
    pub fn linear() -> Self {
        Self {
            keys: vec![(0.0, 0.0), (1.0, 1.0)],
        }
    }

    /// The same value everywhere.
    pub fn constant(value: f64) -> Self {
        Self {
            keys: vec![(0.0, value)],
        }
    }

    /// Checks the keys. Deserialized curves must be validated before use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.keys.is_empty() {
            return Err(ConfigError::InvalidCurve("curve has no keys".into()));
        }
        if let Some((t, v)) = self
            .keys
            .iter()
            .find(|(t, v)| !t.is_finite() || !v.is_finite())
        {
            return Err(ConfigError::InvalidCurve(format!(
                "non-finite key ({t}, {v})"
            )));
        }
        if let Some(pair) = self.keys.windows(2).find(|pair| pair[1].0 < pair[0].0) {
            return Err(ConfigError::InvalidCurve(format!(
                "keys out of order: {} after {}",
                pair[1].0, pair[0].0
            )));
        }
        Ok(())
    }

    /// Evaluates the curve at `t`.
    pub fn evaluate(&self, t: f64) -> f64 {
        let Some(&(first_t, first_v)) = self.keys.first() else {
            return 0.0;
        };
        if t <= first_t {
            return first_v;
        }

        for pair in self.keys.windows(2) {
            let ((t0, v0), (t1, v1)) = (pair[0], pair[1]);
            if t <= t1 {
                let span = t1 - t0;
                if span <= f64::EPSILON {
                    return v1;
                }
                return v0 + (v1 - v0) * (t - t0) / span;
            }
        }

        self.keys.last().map_or(first_v, |&(_, v)| v)
    }

    /// Samples the curve at `i / (len - 1)` for `i` in `0..len`.
    pub fn sample(&self, len: usize) -> Vec<f64> {
        let denominator = len.saturating_sub(1).max(1) as f64;
        (0..len)
            .map(|i| self.evaluate(i as f64 / denominator))
            .collect()
    }
}

impl Default for Curve {
    fn default() -> Self {
        Self::linear()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolates_between_keys_and_clamps_outside() {
        let curve = Curve::new(vec![(0.0, 0.0), (0.5, 1.0), (1.0, 0.0)]).unwrap();
        assert_eq!(curve.evaluate(-1.0), 0.0);
        assert!((curve.evaluate(0.25) - 0.5).abs() < 1e-12);
        assert_eq!(curve.evaluate(0.5), 1.0);
        assert!((curve.evaluate(0.75) - 0.5).abs() < 1e-12);
        assert_eq!(curve.evaluate(2.0), 0.0);
    }

    #[test]
    fn rejects_malformed_keys() {
        assert!(Curve::new(Vec::new()).is_err());
        assert!(Curve::new(vec![(0.5, 0.0), (0.2, 1.0)]).is_err());
        assert!(Curve::new(vec![(0.0, f64::NAN)]).is_err());
    }

    #[test]
    fn sample_hits_both_ends() {
        let samples = Curve::linear().sample(128);
        assert_eq!(samples.len(), 128);
        assert_eq!(samples[0], 0.0);
        assert_eq!(samples[127], 1.0);
        assert_eq!(Curve::constant(0.3).sample(4), vec![0.3; 4]);
    }

    #[test]
    fn deserializes_from_key_pairs() {
        let curve: Curve = serde_json::from_str("[[0.0, 0.2], [1.0, 0.8]]").unwrap();
        assert!(curve.validate().is_ok());
        assert!((curve.evaluate(0.5) - 0.5).abs() < 1e-12);
    }
}
