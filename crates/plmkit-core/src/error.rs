//! Error types for embedding interpolation and decoding.
use crate::interpolation::InterpolationScheme;
use thiserror::Error;

/// Errors produced by the interpolation core.
#[derive(Debug, Error)]
pub enum PlmError {
    /// The two embeddings handed to an interpolation differ in shape.
    #[error("Shape mismatch: left {left:?}, right {right:?}")]
    ShapeMismatch { left: Vec<usize>, right: Vec<usize> },

    /// The interpolation weight lies outside the scheme's domain.
    #[error("Lambda {lambda} is outside the domain of the {scheme} scheme")]
    Domain {
        scheme: InterpolationScheme,
        lambda: f64,
    },

    /// The encode/decode capability failed. The inner error is passed through untouched.
    #[error("External capability failed: {0}")]
    ExternalCapability(#[source] anyhow::Error),

    #[error("Tensor error: {0}")]
    Tensor(#[from] candle_core::Error),

    /// Normalizer statistics are missing or malformed.
    #[error("Invalid normalizer: {0}")]
    Normalizer(String),
}

impl PlmError {
    pub fn shape_mismatch(left: &[usize], right: &[usize]) -> Self {
        Self::ShapeMismatch {
            left: left.to_vec(),
            right: right.to_vec(),
        }
    }

    pub fn domain(scheme: InterpolationScheme, lambda: f64) -> Self {
        Self::Domain { scheme, lambda }
    }
}

pub type Result<T> = std::result::Result<T, PlmError>;
