//! ESM2 Runner
//!
//! Loads ESM2 checkpoints from the HuggingFace hub and exposes them through
//! the [`ProteinModel`] capability.
use super::config::ESM2Config;
use super::model::ESM2;
use super::vocab::EsmVocab;
use anyhow::{anyhow, bail, Context, Result};
use candle_core::{DType, Device, D};
use candle_nn::VarBuilder;
use hf_hub::{api::sync::Api, Repo, RepoType};
use plmkit_core::{Embedding, ProteinModel};
use std::path::{Path, PathBuf};
use strum::{Display, EnumIter, EnumString};
use tracing::{debug, info, warn};

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString, EnumIter)]
#[strum(ascii_case_insensitive)]
pub enum ESM2Models {
    #[default]
    #[strum(to_string = "t6-8m")]
    ESM2_T6_8M,
    #[strum(to_string = "t12-35m")]
    ESM2_T12_35M,
    #[strum(to_string = "t30-150m")]
    ESM2_T30_150M,
    #[strum(to_string = "t33-650m")]
    ESM2_T33_650M,
}

impl ESM2Models {
    pub fn repo_id(&self) -> &'static str {
        match self {
            ESM2Models::ESM2_T6_8M => "facebook/esm2_t6_8M_UR50D",
            ESM2Models::ESM2_T12_35M => "facebook/esm2_t12_35M_UR50D",
            ESM2Models::ESM2_T30_150M => "facebook/esm2_t30_150M_UR50D",
            ESM2Models::ESM2_T33_650M => "facebook/esm2_t33_650M_UR50D",
        }
    }
}

/// Local paths of a downloaded checkpoint.
#[derive(Debug, Clone)]
pub struct ESM2Files {
    pub config: PathBuf,
    pub vocab: PathBuf,
    pub weights: PathBuf,
}

impl ESM2Files {
    /// Fetch (or reuse from the local cache) the files of `model`.
    ///
    /// `model.safetensors` is preferred; repositories that only carry
    /// `pytorch_model.bin` fall back to it.
    pub fn download(model: ESM2Models) -> Result<Self> {
        info!(repo = model.repo_id(), "fetching ESM2 checkpoint");
        let api = Api::new()?;
        let repo = api.repo(Repo::with_revision(
            model.repo_id().to_string(),
            RepoType::Model,
            "main".to_string(),
        ));
        let config = repo.get("config.json")?;
        let vocab = repo.get("vocab.txt")?;
        let weights = match repo.get("model.safetensors") {
            Ok(path) => path,
            Err(err) => {
                warn!(%err, "no safetensors weights, falling back to pytorch_model.bin");
                repo.get("pytorch_model.bin")?
            }
        };
        Ok(Self {
            config,
            vocab,
            weights,
        })
    }
}

pub struct ESM2Runner {
    model: ESM2,
    vocab: EsmVocab,
    max_seq_len: Option<usize>,
}

impl ESM2Runner {
    pub fn load_model(model: ESM2Models, device: Device) -> Result<Self> {
        let files = ESM2Files::download(model)?;
        Self::from_files(&files, device)
    }

    pub fn from_files(files: &ESM2Files, device: Device) -> Result<Self> {
        let config = ESM2Config::from_file(&files.config)?;
        let vocab = EsmVocab::from_file(&files.vocab)?;
        if vocab.len() != config.vocab_size {
            bail!(
                "vocab.txt has {} tokens but the config expects {}",
                vocab.len(),
                config.vocab_size
            );
        }
        let vb = load_weights(&files.weights, &device)?;
        let model = ESM2::load(vb, &config)
            .with_context(|| format!("loading weights from {}", files.weights.display()))?;
        debug!(
            layers = config.num_hidden_layers,
            hidden = config.hidden_size,
            "ESM2 ready"
        );
        Ok(Self::new(model, vocab))
    }

    pub fn new(model: ESM2, vocab: EsmVocab) -> Self {
        Self {
            model,
            vocab,
            max_seq_len: None,
        }
    }

    /// Reject sequences longer than `max_seq_len` residues.
    pub fn with_max_seq_len(mut self, max_seq_len: usize) -> Self {
        self.max_seq_len = Some(max_seq_len);
        self
    }

    pub fn vocab(&self) -> &EsmVocab {
        &self.vocab
    }

    pub fn model(&self) -> &ESM2 {
        &self.model
    }

    fn check_length(&self, sequence: &str) -> Result<()> {
        let residues = sequence.chars().filter(|c| !c.is_whitespace()).count();
        if residues == 0 {
            bail!("cannot encode an empty sequence");
        }
        // positions available to residues once <cls> and <eos> are placed
        let position_limit = self.model.config().max_position_embeddings.saturating_sub(2);
        let limit = self
            .max_seq_len
            .map_or(position_limit, |max| max.min(position_limit));
        if residues > limit {
            bail!("sequence of {residues} residues exceeds the limit of {limit}");
        }
        Ok(())
    }
}

fn load_weights(path: &Path, device: &Device) -> Result<VarBuilder<'static>> {
    let vb = match path.extension().and_then(|ext| ext.to_str()) {
        Some("safetensors") => unsafe {
            VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device)?
        },
        Some("bin") | Some("pt") | Some("pth") => VarBuilder::from_pth(path, DType::F32, device)?,
        _ => return Err(anyhow!("unsupported weight file {}", path.display())),
    };
    Ok(vb)
}

impl ProteinModel for ESM2Runner {
    /// Last-layer representation including the `<cls>`/`<eos>` positions,
    /// shape `(seq_len + 2, hidden)`.
    fn encode(&self, sequence: &str) -> Result<Embedding> {
        self.check_length(sequence)?;
        let ids = self.vocab.tokenize(sequence);
        let hidden = self.model.forward_hidden(&ids)?.squeeze(0)?;
        Ok(Embedding::new(hidden))
    }

    /// Argmax token at every position of an `(seq_len, hidden)` or
    /// `(1, seq_len, hidden)` embedding.
    fn decode(&self, embedding: &Embedding) -> Result<Vec<String>> {
        let hidden_size = self.model.config().hidden_size;
        if embedding.hidden_size() != hidden_size {
            bail!(
                "embedding width {} does not match model hidden size {hidden_size}",
                embedding.hidden_size()
            );
        }
        let hidden = embedding
            .tensor()
            .to_device(self.model.device())?
            .to_dtype(DType::F32)?;
        let hidden = match hidden.rank() {
            2 => hidden.unsqueeze(0)?,
            3 if hidden.dim(0)? == 1 => hidden,
            _ => bail!("cannot decode an embedding of shape {:?}", embedding.dims()),
        };
        let ids = self
            .model
            .logits(&hidden)?
            .argmax(D::Minus1)?
            .squeeze(0)?
            .to_vec1::<u32>()?;
        Ok(ids
            .into_iter()
            .map(|id| self.vocab.id_to_token(id).to_string())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use candle_nn::VarMap;
    use plmkit_core::{decode_sequences, interpolation_path, linspace, InterpolationScheme};
    use std::str::FromStr;

    fn tiny_runner() -> Result<ESM2Runner> {
        let varmap = VarMap::new();
        let vb = VarBuilder::from_varmap(&varmap, DType::F32, &Device::Cpu);
        let model = ESM2::load(vb, &ESM2Config::with_dims(16, 2, 4, 32))?;
        Ok(ESM2Runner::new(model, EsmVocab::default()).with_max_seq_len(12))
    }

    #[test]
    fn test_model_names() {
        assert_eq!(
            ESM2Models::from_str("t33-650m").unwrap(),
            ESM2Models::ESM2_T33_650M
        );
        assert_eq!(ESM2Models::ESM2_T6_8M.to_string(), "t6-8m");
        assert_eq!(
            ESM2Models::ESM2_T12_35M.repo_id(),
            "facebook/esm2_t12_35M_UR50D"
        );
    }

    #[test]
    fn test_encode_decode_shapes() -> Result<()> {
        let runner = tiny_runner()?;
        let emb = runner.encode("MKTAYIAK")?;
        assert_eq!(emb.dims(), &[10, 16]);

        let tokens = runner.decode(&emb)?;
        assert_eq!(tokens.len(), 10);

        let batched = Embedding::new(emb.tensor().unsqueeze(0)?);
        assert_eq!(runner.decode(&batched)?, tokens);
        Ok(())
    }

    #[test]
    fn test_length_limits() -> Result<()> {
        let runner = tiny_runner()?;
        assert!(runner.encode("").is_err());
        assert!(runner.encode(&"A".repeat(12)).is_ok());
        let err = runner.encode(&"A".repeat(13)).unwrap_err();
        assert!(err.to_string().contains("exceeds the limit of 12"));
        Ok(())
    }

    #[test]
    fn test_decode_rejects_wrong_width() -> Result<()> {
        let runner = tiny_runner()?;
        let wrong = Embedding::from_vec(vec![0.0; 8], (2, 4))?;
        assert!(runner.decode(&wrong).is_err());
        Ok(())
    }

    #[test]
    fn test_interpolation_sweep() -> Result<()> {
        let runner = tiny_runner()?;
        let start = runner.encode("MKTAYIAK")?;
        let end = runner.encode("MKTAWIAK")?;
        let path = interpolation_path(
            &start,
            &end,
            &linspace(0.0, 1.0, 4),
            InterpolationScheme::Sinusoidal,
        )?;
        let decoded = decode_sequences(&path, &runner)?;
        assert_eq!(decoded.len(), 4);
        Ok(())
    }

    #[test]
    #[ignore]
    fn test_esm2_t6_roundtrip() -> Result<()> {
        let runner = ESM2Runner::load_model(ESM2Models::ESM2_T6_8M, Device::Cpu)?;
        let sequence = "MVHLTPEEKSAVTALWGKVNVDEVGGEALGRLLVVYPWTQRFFESFGDLSTPDAVMGNPKVKAHGKKVLGAFSDGLAHLDNLKGTFATLSELHCDKLHVDPENFRLLGNVLVCVLAHHFGKEFTPPVQAAYQKVVAGVANALAHKYH";
        let emb = runner.encode(sequence)?;
        assert_eq!(emb.dims(), &[sequence.len() + 2, 320]);
        let decoded = decode_sequences(&[emb], &runner)?;
        // the masked LM reconstructs an unmasked input almost perfectly
        let distance = plmkit_core::levenshtein_distance(decoded[0].as_str(), sequence);
        assert!(distance < 5, "distance {distance}");
        Ok(())
    }
}
