//! Interpolation between two embeddings.
//!
//! Each scheme maps a weight λ to a pair of coefficients `(w1, w2)` and blends
//! the embeddings as `w1·e1 + w2·e2`:
//!
//! | scheme       | w1               | w2          | λ = 0 | λ = 1 |
//! |--------------|------------------|-------------|-------|-------|
//! | `Linear`     | λ                | 1 − λ       | e2    | e1    |
//! | `Sinusoidal` | sin(π(1 − λ)/2)  | sin(πλ/2)   | e1    | e2    |
//! | `ArcCosine`  | arccos(λ)/π      | 1 − w1      | ½·(e1 + e2) | e2 |
//!
//! `Linear` and `Sinusoidal` run between the endpoints in opposite directions.
//! Callers sweeping λ must account for it; the conventions are kept as is.
use crate::embedding::Embedding;
use crate::error::{PlmError, Result};
use std::f64::consts::PI;
use std::ops::RangeInclusive;
use strum::{Display, EnumIter, EnumString};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum InterpolationScheme {
    #[default]
    Linear,
    Sinusoidal,
    #[strum(to_string = "arccos", serialize = "arccosine")]
    ArcCosine,
}

impl InterpolationScheme {
    /// Values of λ accepted by the scheme.
    pub fn domain(&self) -> RangeInclusive<f64> {
        match self {
            InterpolationScheme::Linear | InterpolationScheme::Sinusoidal => 0.0..=1.0,
            InterpolationScheme::ArcCosine => -1.0..=1.0,
        }
    }

    /// Coefficients `(w1, w2)` applied to `(e1, e2)`.
    ///
    /// λ outside [`Self::domain`], NaN or infinite is rejected with
    /// [`PlmError::Domain`] instead of being clamped.
    pub fn weights(&self, lambda: f64) -> Result<(f64, f64)> {
        if !lambda.is_finite() || !self.domain().contains(&lambda) {
            return Err(PlmError::domain(*self, lambda));
        }
        let weights = match self {
            InterpolationScheme::Linear => (lambda, 1.0 - lambda),
            InterpolationScheme::Sinusoidal => (
                (PI * (1.0 - lambda) / 2.0).sin(),
                (PI * lambda / 2.0).sin(),
            ),
            InterpolationScheme::ArcCosine => {
                let factor = lambda.acos() / PI;
                (factor, 1.0 - factor)
            }
        };
        Ok(weights)
    }
}

/// Blend `e1` and `e2` at weight `lambda`.
///
/// Both embeddings must have identical shapes; there is no broadcasting or
/// truncation. The output keeps the inputs' shape, dtype and device.
pub fn interpolate(
    e1: &Embedding,
    e2: &Embedding,
    lambda: f64,
    scheme: InterpolationScheme,
) -> Result<Embedding> {
    if !e1.same_shape(e2) {
        return Err(PlmError::shape_mismatch(e1.dims(), e2.dims()));
    }
    let (w1, w2) = scheme.weights(lambda)?;
    let blended = e1
        .tensor()
        .affine(w1, 0.0)?
        .add(&e2.tensor().affine(w2, 0.0)?)?;
    Ok(Embedding::new(blended))
}

/// Interpolate once per λ, in order. The first invalid λ aborts the sweep.
pub fn interpolation_path(
    e1: &Embedding,
    e2: &Embedding,
    lambdas: &[f64],
    scheme: InterpolationScheme,
) -> Result<Vec<Embedding>> {
    debug!(%scheme, steps = lambdas.len(), "interpolating embeddings");
    lambdas
        .iter()
        .map(|&lambda| interpolate(e1, e2, lambda, scheme))
        .collect()
}

/// `steps` evenly spaced values from `start` to `end`, both included.
pub fn linspace(start: f64, end: f64, steps: usize) -> Vec<f64> {
    match steps {
        0 => vec![],
        1 => vec![start],
        _ => {
            let delta = (end - start) / (steps - 1) as f64;
            (0..steps)
                .map(|i| {
                    if i == steps - 1 {
                        end
                    } else {
                        start + delta * i as f64
                    }
                })
                .collect()
        }
    }
}
