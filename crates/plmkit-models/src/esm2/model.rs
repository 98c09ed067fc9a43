//! ESM2 masked language model.
//!
//! Parameter names follow the HuggingFace `EsmForMaskedLM` checkpoints
//! (`esm.encoder.layer.{i}...`, `lm_head...`) so `model.safetensors` files
//! from the hub load directly.
//!
//! Reference: https://github.com/huggingface/transformers/blob/main/src/transformers/models/esm/modeling_esm.py
use super::config::ESM2Config;
use candle_core::{DType, Device, Module, Result, Tensor, D};
use candle_nn::{embedding, layer_norm, linear, Embedding, LayerNorm, Linear, VarBuilder};

/// Fraction of tokens masked during ESM2 pre-training (15% selected, 80% of those masked).
const MASK_RATIO_TRAIN: f64 = 0.15 * 0.8;

/// Rotary position embedding with the half-split rotation used by ESM.
#[derive(Debug, Clone)]
pub struct RotaryEmbedding {
    inv_freq: Vec<f32>,
}

impl RotaryEmbedding {
    pub fn new(head_dim: usize) -> Self {
        let inv_freq = (0..head_dim)
            .step_by(2)
            .map(|i| 1.0 / 10000f32.powf(i as f32 / head_dim as f32))
            .collect();
        Self { inv_freq }
    }

    /// `cos` and `sin` tables of shape `(seq_len, head_dim)`.
    fn tables(&self, seq_len: usize, device: &Device) -> Result<(Tensor, Tensor)> {
        let half = self.inv_freq.len();
        let inv_freq = Tensor::from_vec(self.inv_freq.clone(), (1, half), device)?;
        let t = Tensor::arange(0u32, seq_len as u32, device)?
            .to_dtype(DType::F32)?
            .reshape((seq_len, 1))?;
        let freqs = t.matmul(&inv_freq)?;
        let emb = Tensor::cat(&[&freqs, &freqs], D::Minus1)?;
        Ok((emb.cos()?, emb.sin()?))
    }

    fn rotate_half(x: &Tensor) -> Result<Tensor> {
        let half = x.dim(D::Minus1)? / 2;
        let x1 = x.narrow(D::Minus1, 0, half)?;
        let x2 = x.narrow(D::Minus1, half, half)?;
        Tensor::cat(&[&x2.neg()?, &x1], D::Minus1)
    }

    /// Rotate queries and keys shaped `(batch, heads, seq_len, head_dim)`.
    pub fn apply(&self, q: &Tensor, k: &Tensor) -> Result<(Tensor, Tensor)> {
        let seq_len = q.dim(2)?;
        let (cos, sin) = self.tables(seq_len, q.device())?;
        let cos = cos.to_dtype(q.dtype())?;
        let sin = sin.to_dtype(q.dtype())?;
        let rotate = |x: &Tensor| -> Result<Tensor> {
            x.broadcast_mul(&cos)?
                .add(&Self::rotate_half(x)?.broadcast_mul(&sin)?)
        };
        Ok((rotate(q)?, rotate(k)?))
    }
}

#[derive(Debug)]
pub struct SelfAttention {
    query: Linear,
    key: Linear,
    value: Linear,
    output: Linear,
    layer_norm: LayerNorm,
    rotary: RotaryEmbedding,
    num_heads: usize,
    head_dim: usize,
}

impl SelfAttention {
    pub fn load(vb: VarBuilder, config: &ESM2Config) -> Result<Self> {
        let hidden = config.hidden_size;
        let head_dim = config.head_dim();
        let vb_self = vb.pp("self");
        Ok(Self {
            query: linear(hidden, hidden, vb_self.pp("query"))?,
            key: linear(hidden, hidden, vb_self.pp("key"))?,
            value: linear(hidden, hidden, vb_self.pp("value"))?,
            output: linear(hidden, hidden, vb.pp("output").pp("dense"))?,
            layer_norm: layer_norm(hidden, config.layer_norm_eps, vb.pp("LayerNorm"))?,
            rotary: RotaryEmbedding::new(head_dim),
            num_heads: config.num_attention_heads,
            head_dim,
        })
    }

    fn split_heads(&self, x: &Tensor) -> Result<Tensor> {
        let (b, l, _) = x.dims3()?;
        x.reshape((b, l, self.num_heads, self.head_dim))?
            .transpose(1, 2)?
            .contiguous()
    }

    /// Pre-norm attention with the residual added back.
    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let (b, l, hidden) = xs.dims3()?;
        let normed = self.layer_norm.forward(xs)?;
        let scale = (self.head_dim as f64).powf(-0.5);
        let q = self.split_heads(&(self.query.forward(&normed)? * scale)?)?;
        let k = self.split_heads(&self.key.forward(&normed)?)?;
        let v = self.split_heads(&self.value.forward(&normed)?)?;
        let (q, k) = self.rotary.apply(&q, &k)?;

        let scores = q.contiguous()?.matmul(&k.t()?.contiguous()?)?;
        let probs = candle_nn::ops::softmax_last_dim(&scores)?;
        let context = probs
            .matmul(&v)?
            .transpose(1, 2)?
            .contiguous()?
            .reshape((b, l, hidden))?;
        self.output.forward(&context)?.add(xs)
    }
}

#[derive(Debug)]
pub struct TransformerLayer {
    attention: SelfAttention,
    layer_norm: LayerNorm,
    intermediate: Linear,
    output: Linear,
}

impl TransformerLayer {
    pub fn load(vb: VarBuilder, config: &ESM2Config) -> Result<Self> {
        let hidden = config.hidden_size;
        Ok(Self {
            attention: SelfAttention::load(vb.pp("attention"), config)?,
            layer_norm: layer_norm(hidden, config.layer_norm_eps, vb.pp("LayerNorm"))?,
            intermediate: linear(
                hidden,
                config.intermediate_size,
                vb.pp("intermediate").pp("dense"),
            )?,
            output: linear(config.intermediate_size, hidden, vb.pp("output").pp("dense"))?,
        })
    }

    pub fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let xs = self.attention.forward(xs)?;
        let ff = self.layer_norm.forward(&xs)?;
        let ff = self.intermediate.forward(&ff)?.gelu_erf()?;
        self.output.forward(&ff)?.add(&xs)
    }
}

/// Projects hidden states onto vocabulary logits.
#[derive(Debug)]
pub struct LMHead {
    dense: Linear,
    layer_norm: LayerNorm,
    decoder: Linear,
}

impl LMHead {
    /// `word_embeddings` is used as decoder weight when the checkpoint ties them.
    pub fn load(vb: VarBuilder, config: &ESM2Config, word_embeddings: &Tensor) -> Result<Self> {
        let hidden = config.hidden_size;
        let decoder_weight = if vb.contains_tensor("decoder.weight") {
            vb.pp("decoder")
                .get((config.vocab_size, hidden), "weight")?
        } else {
            word_embeddings.clone()
        };
        let bias = vb.get_with_hints(config.vocab_size, "bias", candle_nn::init::ZERO)?;
        Ok(Self {
            dense: linear(hidden, hidden, vb.pp("dense"))?,
            layer_norm: layer_norm(hidden, config.layer_norm_eps, vb.pp("layer_norm"))?,
            decoder: Linear::new(decoder_weight, Some(bias)),
        })
    }
}

impl Module for LMHead {
    fn forward(&self, xs: &Tensor) -> Result<Tensor> {
        let xs = self.dense.forward(xs)?.gelu_erf()?;
        let xs = self.layer_norm.forward(&xs)?;
        self.decoder.forward(&xs)
    }
}

#[derive(Debug)]
pub struct ESM2 {
    word_embeddings: Embedding,
    layers: Vec<TransformerLayer>,
    emb_layer_norm_after: LayerNorm,
    lm_head: LMHead,
    config: ESM2Config,
    device: Device,
}

impl ESM2 {
    pub fn load(vb: VarBuilder, config: &ESM2Config) -> Result<Self> {
        let vb_esm = vb.pp("esm");
        let word_embeddings = embedding(
            config.vocab_size,
            config.hidden_size,
            vb_esm.pp("embeddings").pp("word_embeddings"),
        )?;
        let vb_encoder = vb_esm.pp("encoder");
        let layers = (0..config.num_hidden_layers)
            .map(|i| TransformerLayer::load(vb_encoder.pp("layer").pp(i), config))
            .collect::<Result<Vec<_>>>()?;
        let emb_layer_norm_after = layer_norm(
            config.hidden_size,
            config.layer_norm_eps,
            vb_encoder.pp("emb_layer_norm_after"),
        )?;
        let lm_head = LMHead::load(vb.pp("lm_head"), config, word_embeddings.embeddings())?;
        Ok(Self {
            word_embeddings,
            layers,
            emb_layer_norm_after,
            lm_head,
            config: config.clone(),
            device: vb.device().clone(),
        })
    }

    pub fn config(&self) -> &ESM2Config {
        &self.config
    }

    pub fn device(&self) -> &Device {
        &self.device
    }

    /// Token embeddings with ESM2 token-dropout rescaling.
    ///
    /// Mask tokens are zeroed and the remaining rows scaled by
    /// `(1 - MASK_RATIO_TRAIN) / (1 - observed mask ratio)`.
    fn embed(&self, token_ids: &[u32]) -> Result<Tensor> {
        let len = token_ids.len();
        let ids = Tensor::new(token_ids, &self.device)?.unsqueeze(0)?;
        let xs = self.word_embeddings.forward(&ids)?;
        if !self.config.token_dropout {
            return Ok(xs);
        }
        let keep: Vec<f32> = token_ids
            .iter()
            .map(|&id| if id == self.config.mask_token_id { 0.0 } else { 1.0 })
            .collect();
        let masked = keep.iter().filter(|&&k| k == 0.0).count();
        if masked == len {
            return xs.zeros_like();
        }
        let observed = masked as f64 / len as f64;
        let scale = (1.0 - MASK_RATIO_TRAIN) / (1.0 - observed);
        let keep = Tensor::from_vec(keep, (1, len, 1), &self.device)?.to_dtype(xs.dtype())?;
        xs.broadcast_mul(&keep)? * scale
    }

    /// Final-layer representation, shape `(1, seq_len, hidden)`.
    pub fn forward_hidden(&self, token_ids: &[u32]) -> Result<Tensor> {
        if token_ids.is_empty() {
            candle_core::bail!("cannot run ESM2 on an empty token sequence")
        }
        let mut xs = self.embed(token_ids)?;
        for layer in &self.layers {
            xs = layer.forward(&xs)?;
        }
        self.emb_layer_norm_after.forward(&xs)
    }

    /// Vocabulary logits for hidden states of shape `(batch, seq_len, hidden)`.
    pub fn logits(&self, hidden: &Tensor) -> Result<Tensor> {
        self.lm_head.forward(hidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use candle_nn::VarMap;

    fn tiny_config() -> ESM2Config {
        ESM2Config::with_dims(16, 2, 4, 32)
    }

    fn tiny_model() -> Result<ESM2> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        ESM2::load(vb, &tiny_config())
    }

    #[test]
    fn test_forward_shapes() -> Result<()> {
        let model = tiny_model()?;
        let hidden = model.forward_hidden(&[0, 20, 15, 7, 2])?;
        assert_eq!(hidden.dims(), &[1, 5, 16]);
        let logits = model.logits(&hidden)?;
        assert_eq!(logits.dims(), &[1, 5, 33]);
        Ok(())
    }

    #[test]
    fn test_empty_input_rejected() -> Result<()> {
        let model = tiny_model()?;
        assert!(model.forward_hidden(&[]).is_err());
        Ok(())
    }

    #[test]
    fn test_rotary_preserves_norm() -> Result<()> {
        let rotary = RotaryEmbedding::new(8);
        let q = Tensor::arange(0f32, 48f32, &Device::Cpu)?.reshape((1, 2, 3, 8))?;
        let (rq, _) = rotary.apply(&q, &q)?;
        let before = q.sqr()?.sum_all()?.to_scalar::<f32>()?;
        let after = rq.sqr()?.sum_all()?.to_scalar::<f32>()?;
        assert_relative_eq!(before, after, max_relative = 1e-4);

        // position 0 is not rotated
        let first = rq.narrow(2, 0, 1)?.flatten_all()?.to_vec1::<f32>()?;
        let orig = q.narrow(2, 0, 1)?.flatten_all()?.to_vec1::<f32>()?;
        for (a, b) in first.iter().zip(orig) {
            assert_relative_eq!(*a, b, epsilon = 1e-5);
        }
        Ok(())
    }

    #[test]
    fn test_token_dropout_scaling() -> Result<()> {
        let model = tiny_model()?;
        let raw = model
            .word_embeddings
            .forward(&Tensor::new(&[5u32], &Device::Cpu)?.unsqueeze(0)?)?
            .flatten_all()?
            .to_vec1::<f32>()?;
        let scaled = model.embed(&[5])?.flatten_all()?.to_vec1::<f32>()?;
        for (r, s) in raw.iter().zip(scaled) {
            assert_relative_eq!(r * 0.88, s, epsilon = 1e-5);
        }

        // a masked position is zeroed
        let with_mask = model.embed(&[5, 32])?;
        let masked_row = with_mask.narrow(1, 1, 1)?.sqr()?.sum_all()?.to_scalar::<f32>()?;
        assert_eq!(masked_row, 0.0);
        Ok(())
    }
}
