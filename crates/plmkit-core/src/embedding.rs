use crate::error::Result;
use candle_core::{DType, Device, Shape, Tensor};

/// Numeric representation of a sequence produced by an encoder.
///
/// Per-residue embeddings from a PLM have shape `(seq_len, hidden)`; pooled
/// embeddings are one-dimensional. The wrapped tensor is never mutated, every
/// operation returns a new `Embedding`.
#[derive(Debug, Clone)]
pub struct Embedding(Tensor);

impl Embedding {
    pub fn new(tensor: Tensor) -> Self {
        Self(tensor)
    }

    /// Build an `f32` embedding on the CPU.
    pub fn from_vec<S: Into<Shape>>(data: Vec<f32>, shape: S) -> Result<Self> {
        Ok(Self(Tensor::from_vec(data, shape, &Device::Cpu)?))
    }

    pub fn tensor(&self) -> &Tensor {
        &self.0
    }

    pub fn into_tensor(self) -> Tensor {
        self.0
    }

    pub fn dims(&self) -> &[usize] {
        self.0.dims()
    }

    pub fn dtype(&self) -> DType {
        self.0.dtype()
    }

    pub fn device(&self) -> &Device {
        self.0.device()
    }

    /// Size of the trailing (feature) dimension.
    pub fn hidden_size(&self) -> usize {
        self.dims().last().copied().unwrap_or(1)
    }

    pub fn same_shape(&self, other: &Embedding) -> bool {
        self.dims() == other.dims()
    }

    /// Flattened copy of the values as `f32`.
    pub fn to_vec(&self) -> Result<Vec<f32>> {
        Ok(self.0.flatten_all()?.to_dtype(DType::F32)?.to_vec1::<f32>()?)
    }
}

impl From<Tensor> for Embedding {
    fn from(tensor: Tensor) -> Self {
        Self(tensor)
    }
}
