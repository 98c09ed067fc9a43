//! Embedding normalization.
//!
//! Normalizers sit between a model and its callers (see
//! [`crate::model::NormalizedModel`]): embeddings leave the encoder normalized
//! and are mapped back before decoding.
use crate::embedding::Embedding;
use crate::error::{PlmError, Result};
use candle_core::{DType, Device, Tensor};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Smallest standard deviation kept by [`ZScoreNormalizer::fit`].
pub const STD_FLOOR: f32 = 1e-6;

pub trait EmbeddingNormalizer {
    fn normalize(&self, embedding: &Embedding) -> Result<Embedding>;
    fn denormalize(&self, embedding: &Embedding) -> Result<Embedding>;
}

/// Per-feature standardisation `(x - mean) / std` over the trailing dimension.
#[derive(Debug, Clone)]
pub struct ZScoreNormalizer {
    mean: Tensor,
    std: Tensor,
}

impl ZScoreNormalizer {
    pub fn new(mean: Tensor, std: Tensor) -> Result<Self> {
        if mean.rank() != 1 || mean.dims() != std.dims() {
            return Err(PlmError::Normalizer(format!(
                "mean {:?} and std {:?} must be matching vectors",
                mean.dims(),
                std.dims()
            )));
        }
        let invalid_mean = mean
            .to_dtype(DType::F32)?
            .to_vec1::<f32>()?
            .into_iter()
            .position(|m| !m.is_finite());
        if let Some(idx) = invalid_mean {
            return Err(PlmError::Normalizer(format!("mean[{idx}] is not finite")));
        }
        let invalid_std = std
            .to_dtype(DType::F32)?
            .to_vec1::<f32>()?
            .into_iter()
            .enumerate()
            .find(|(_, s)| !(s.is_finite() && *s > 0.0));
        if let Some((idx, s)) = invalid_std {
            return Err(PlmError::Normalizer(format!(
                "std[{idx}] = {s} must be finite and positive"
            )));
        }
        Ok(Self { mean, std })
    }

    /// Estimate mean and std from a set of embeddings sharing a hidden size.
    pub fn fit(embeddings: &[Embedding]) -> Result<Self> {
        let Some(first) = embeddings.first() else {
            return Err(PlmError::Normalizer(
                "cannot fit on an empty set of embeddings".to_string(),
            ));
        };
        let hidden = first.hidden_size();
        let rows = embeddings
            .iter()
            .map(|emb| {
                if emb.hidden_size() != hidden {
                    return Err(PlmError::shape_mismatch(first.dims(), emb.dims()));
                }
                Ok(emb
                    .tensor()
                    .to_device(&Device::Cpu)?
                    .to_dtype(DType::F32)?
                    .reshape(((), hidden))?)
            })
            .collect::<Result<Vec<_>>>()?;
        let stacked = Tensor::cat(&rows, 0)?;
        let mean = stacked.mean(0)?;
        let variance = stacked.broadcast_sub(&mean)?.sqr()?.mean(0)?;
        let std: Vec<f32> = variance
            .sqrt()?
            .to_vec1::<f32>()?
            .into_iter()
            .map(|s| s.max(STD_FLOOR))
            .collect();
        debug!(rows = stacked.dim(0)?, hidden, "fitted z-score normalizer");
        let std = Tensor::from_vec(std, hidden, &Device::Cpu)?;
        Self::new(mean, std)
    }

    /// Load `mean` and `std` tensors from a safetensors file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut tensors = candle_core::safetensors::load(path.as_ref(), &Device::Cpu)?;
        let mut take = |name: &str| {
            tensors.remove(name).ok_or_else(|| {
                PlmError::Normalizer(format!(
                    "{} has no `{name}` tensor",
                    path.as_ref().display()
                ))
            })
        };
        let mean = take("mean")?;
        let std = take("std")?;
        Self::new(mean, std)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let tensors = HashMap::from([
            ("mean".to_string(), self.mean.clone()),
            ("std".to_string(), self.std.clone()),
        ]);
        candle_core::safetensors::save(&tensors, path)?;
        Ok(())
    }

    pub fn mean(&self) -> &Tensor {
        &self.mean
    }

    pub fn std(&self) -> &Tensor {
        &self.std
    }

    /// Statistics moved onto the embedding's device and dtype.
    fn stats_for(&self, embedding: &Embedding) -> Result<(Tensor, Tensor)> {
        let hidden = self.mean.dim(0)?;
        if embedding.hidden_size() != hidden {
            return Err(PlmError::shape_mismatch(embedding.dims(), &[hidden]));
        }
        let prepare = |t: &Tensor| -> Result<Tensor> {
            Ok(t.to_device(embedding.device())?.to_dtype(embedding.dtype())?)
        };
        Ok((prepare(&self.mean)?, prepare(&self.std)?))
    }
}

impl EmbeddingNormalizer for ZScoreNormalizer {
    fn normalize(&self, embedding: &Embedding) -> Result<Embedding> {
        let (mean, std) = self.stats_for(embedding)?;
        let out = embedding.tensor().broadcast_sub(&mean)?.broadcast_div(&std)?;
        Ok(Embedding::new(out))
    }

    fn denormalize(&self, embedding: &Embedding) -> Result<Embedding> {
        let (mean, std) = self.stats_for(embedding)?;
        let out = embedding.tensor().broadcast_mul(&std)?.broadcast_add(&mean)?;
        Ok(Embedding::new(out))
    }
}
