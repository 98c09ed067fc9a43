//! Encode/decode capability of a protein language model.
//!
//! Anything that can turn a sequence into an [`Embedding`] and an embedding
//! back into vocabulary tokens can be used with the interpolation utilities.
//! Model failures are reported through `anyhow` and surface from this crate as
//! [`PlmError::ExternalCapability`] without being retried.
use crate::alphabet::DecodedSequence;
use crate::embedding::Embedding;
use crate::error::{PlmError, Result};
use crate::normalize::EmbeddingNormalizer;
use tracing::debug;

pub trait ProteinModel {
    /// Embed a single sequence. Deterministic for a fixed model state.
    fn encode(&self, sequence: &str) -> anyhow::Result<Embedding>;

    /// Map an embedding back to raw vocabulary tokens, structural markers included.
    fn decode(&self, embedding: &Embedding) -> anyhow::Result<Vec<String>>;

    fn batch_encode(&self, sequences: &[&str]) -> anyhow::Result<Vec<Embedding>> {
        sequences.iter().map(|seq| self.encode(seq)).collect()
    }

    /// Decode one embedding after the other; the first failure is returned.
    fn batch_decode(&self, embeddings: &[Embedding]) -> anyhow::Result<Vec<Vec<String>>> {
        embeddings.iter().map(|emb| self.decode(emb)).collect()
    }
}

impl<M: ProteinModel + ?Sized> ProteinModel for &M {
    fn encode(&self, sequence: &str) -> anyhow::Result<Embedding> {
        (**self).encode(sequence)
    }
    fn decode(&self, embedding: &Embedding) -> anyhow::Result<Vec<String>> {
        (**self).decode(embedding)
    }
}

impl<M: ProteinModel + ?Sized> ProteinModel for Box<M> {
    fn encode(&self, sequence: &str) -> anyhow::Result<Embedding> {
        (**self).encode(sequence)
    }
    fn decode(&self, embedding: &Embedding) -> anyhow::Result<Vec<String>> {
        (**self).decode(embedding)
    }
}

/// Decode each embedding and strip structural tokens.
///
/// Results keep the input order and count. Decode calls run one after another
/// and the first failure aborts the whole batch.
pub fn decode_sequences<M: ProteinModel + ?Sized>(
    embeddings: &[Embedding],
    model: &M,
) -> Result<Vec<DecodedSequence>> {
    embeddings
        .iter()
        .enumerate()
        .map(|(idx, embedding)| {
            let tokens = model
                .decode(embedding)
                .map_err(PlmError::ExternalCapability)?;
            let sequence = DecodedSequence::from_tokens(&tokens);
            debug!(index = idx, length = sequence.len(), "decoded embedding");
            Ok(sequence)
        })
        .collect()
}

/// Wraps a model so that its embeddings are normalized.
///
/// `encode` normalizes the inner model's output and `decode` denormalizes
/// before delegating, so callers only ever see the normalized space. Without a
/// normalizer the wrapper is transparent.
#[derive(Debug, Clone)]
pub struct NormalizedModel<M, N> {
    inner: M,
    normalizer: Option<N>,
}

impl<M, N> NormalizedModel<M, N> {
    pub fn new(inner: M, normalizer: Option<N>) -> Self {
        Self { inner, normalizer }
    }

    pub fn inner(&self) -> &M {
        &self.inner
    }

    pub fn normalizer(&self) -> Option<&N> {
        self.normalizer.as_ref()
    }
}

impl<M: ProteinModel, N: EmbeddingNormalizer> ProteinModel for NormalizedModel<M, N> {
    fn encode(&self, sequence: &str) -> anyhow::Result<Embedding> {
        let embedding = self.inner.encode(sequence)?;
        match &self.normalizer {
            Some(norm) => Ok(norm.normalize(&embedding)?),
            None => Ok(embedding),
        }
    }

    fn decode(&self, embedding: &Embedding) -> anyhow::Result<Vec<String>> {
        match &self.normalizer {
            Some(norm) => self.inner.decode(&norm.denormalize(embedding)?),
            None => self.inner.decode(embedding),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::interpolation::{interpolation_path, linspace, InterpolationScheme};
    use crate::normalize::ZScoreNormalizer;
    use anyhow::{anyhow, bail};
    use std::cell::Cell;

    const VOCAB: [&str; 6] = ["<cls>", "<eos>", "<pad>", "M", "K", "A"];

    /// One-hot model over a tiny vocabulary: each residue becomes a row and
    /// decoding takes the argmax of each row.
    struct OneHotModel {
        decode_calls: Cell<usize>,
        fail_on_call: Option<usize>,
    }

    impl OneHotModel {
        fn new() -> Self {
            Self {
                decode_calls: Cell::new(0),
                fail_on_call: None,
            }
        }
    }

    impl ProteinModel for OneHotModel {
        fn encode(&self, sequence: &str) -> anyhow::Result<Embedding> {
            let mut tokens = vec!["<cls>".to_string()];
            tokens.extend(sequence.chars().map(|c| c.to_string()));
            tokens.push("<eos>".to_string());
            let mut data = vec![0f32; tokens.len() * VOCAB.len()];
            for (row, tok) in tokens.iter().enumerate() {
                let idx = VOCAB
                    .iter()
                    .position(|v| v == tok)
                    .ok_or_else(|| anyhow!("unknown residue {tok}"))?;
                data[row * VOCAB.len() + idx] = 1.0;
            }
            Ok(Embedding::from_vec(data, (tokens.len(), VOCAB.len()))?)
        }

        fn decode(&self, embedding: &Embedding) -> anyhow::Result<Vec<String>> {
            let call = self.decode_calls.get();
            self.decode_calls.set(call + 1);
            if self.fail_on_call == Some(call) {
                bail!("decoder exploded on call {call}");
            }
            let rows = embedding.tensor().to_vec2::<f32>()?;
            Ok(rows
                .iter()
                .map(|row| {
                    let best = row
                        .iter()
                        .enumerate()
                        .fold((0, f32::MIN), |acc, (i, &v)| if v > acc.1 { (i, v) } else { acc });
                    VOCAB[best.0].to_string()
                })
                .collect())
        }
    }

    #[test]
    fn test_decode_preserves_order_and_count() -> Result<()> {
        let model = OneHotModel::new();
        let seqs = ["MK", "KM", "AAA", "M", "KKA"];
        let embeddings = model.batch_encode(&seqs).map_err(PlmError::ExternalCapability)?;
        let decoded = decode_sequences(&embeddings, &model)?;
        assert_eq!(decoded.len(), 5);
        let decoded: Vec<&str> = decoded.iter().map(|d| d.as_str()).collect();
        assert_eq!(decoded, seqs);
        Ok(())
    }

    #[test]
    fn test_decode_failure_aborts_batch() -> Result<()> {
        let mut model = OneHotModel::new();
        let embeddings = model
            .batch_encode(&["MK", "KM", "AA"])
            .map_err(PlmError::ExternalCapability)?;
        model.fail_on_call = Some(1);
        let err = decode_sequences(&embeddings, &model).unwrap_err();
        match err {
            PlmError::ExternalCapability(inner) => {
                assert_eq!(inner.to_string(), "decoder exploded on call 1")
            }
            other => panic!("expected ExternalCapability, got {other:?}"),
        }
        // the third embedding is never decoded
        assert_eq!(model.decode_calls.get(), 2);
        Ok(())
    }

    #[test]
    fn test_interpolated_path_decodes() -> Result<()> {
        let model = OneHotModel::new();
        let start = model.encode("MMK").map_err(PlmError::ExternalCapability)?;
        let end = model.encode("AAK").map_err(PlmError::ExternalCapability)?;
        let lambdas = linspace(0.0, 1.0, 5);
        let path = interpolation_path(&start, &end, &lambdas, InterpolationScheme::Linear)?;
        let decoded = decode_sequences(&path, &model)?;
        // Linear runs from `end` at λ = 0 to `start` at λ = 1
        assert_eq!(decoded.first().map(|d| d.as_str()), Some("AAK"));
        assert_eq!(decoded.last().map(|d| d.as_str()), Some("MMK"));
        Ok(())
    }

    #[test]
    fn test_normalized_model_roundtrip() -> Result<()> {
        let base = OneHotModel::new();
        let fitted = ZScoreNormalizer::fit(
            &base
                .batch_encode(&["MKA", "KKM", "AMA"])
                .map_err(PlmError::ExternalCapability)?,
        )?;
        let model = NormalizedModel::new(OneHotModel::new(), Some(fitted));

        let raw = base.encode("MKA").map_err(PlmError::ExternalCapability)?;
        let normed = model.encode("MKA").map_err(PlmError::ExternalCapability)?;
        assert_eq!(raw.dims(), normed.dims());
        assert_ne!(raw.to_vec()?, normed.to_vec()?);

        let decoded = decode_sequences(&[normed], &model)?;
        assert_eq!(decoded[0].as_str(), "MKA");
        Ok(())
    }

    #[test]
    fn test_passthrough_without_normalizer() -> Result<()> {
        let model: NormalizedModel<_, ZScoreNormalizer> =
            NormalizedModel::new(OneHotModel::new(), None);
        let emb = model.encode("KM").map_err(PlmError::ExternalCapability)?;
        let boxed: Box<dyn ProteinModel> = Box::new(model);
        let decoded = decode_sequences(&[emb], &boxed)?;
        assert_eq!(decoded[0].as_str(), "KM");
        Ok(())
    }

    #[test]
    fn test_batch_decode_keeps_raw_tokens() -> anyhow::Result<()> {
        let model = OneHotModel::new();
        let embeddings = model.batch_encode(&["MK", "A"])?;
        let tokens = model.batch_decode(&embeddings)?;
        assert_eq!(tokens[0], vec!["<cls>", "M", "K", "<eos>"]);
        assert_eq!(tokens[1], vec!["<cls>", "A", "<eos>"]);
        assert_eq!(model.decode_calls.get(), 2);
        Ok(())
    }

    #[test]
    fn test_encode_failure_is_external() {
        let model = OneHotModel::new();
        let err = model.encode("MZ").unwrap_err();
        assert!(err.to_string().contains("unknown residue Z"));
    }
}
