use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// ESM2 hyper-parameters as stored in the HuggingFace `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ESM2Config {
    pub hidden_size: usize,
    pub num_hidden_layers: usize,
    pub num_attention_heads: usize,
    pub intermediate_size: usize,
    #[serde(default = "default_vocab_size")]
    pub vocab_size: usize,
    #[serde(default = "default_layer_norm_eps")]
    pub layer_norm_eps: f64,
    #[serde(default = "default_token_dropout")]
    pub token_dropout: bool,
    #[serde(default = "default_mask_token_id")]
    pub mask_token_id: u32,
    #[serde(default = "default_pad_token_id")]
    pub pad_token_id: u32,
    #[serde(default = "default_max_position_embeddings")]
    pub max_position_embeddings: usize,
    #[serde(default = "default_position_embedding_type")]
    pub position_embedding_type: String,
}

fn default_vocab_size() -> usize {
    33
}
fn default_layer_norm_eps() -> f64 {
    1e-5
}
fn default_token_dropout() -> bool {
    true
}
fn default_mask_token_id() -> u32 {
    32
}
fn default_pad_token_id() -> u32 {
    1
}
fn default_max_position_embeddings() -> usize {
    1026
}
fn default_position_embedding_type() -> String {
    "rotary".to_string()
}

impl ESM2Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading {}", path.as_ref().display()))?;
        let config: ESM2Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.position_embedding_type != "rotary" {
            anyhow::bail!(
                "unsupported position embedding type `{}`",
                self.position_embedding_type
            );
        }
        if self.num_attention_heads == 0 || self.hidden_size % self.num_attention_heads != 0 {
            anyhow::bail!(
                "hidden size {} is not divisible by {} heads",
                self.hidden_size,
                self.num_attention_heads
            );
        }
        Ok(())
    }

    pub fn head_dim(&self) -> usize {
        self.hidden_size / self.num_attention_heads
    }

    /// esm2_t6_8M_UR50D
    pub fn esm2_t6_8m() -> Self {
        Self::with_dims(320, 6, 20, 1280)
    }
    /// esm2_t12_35M_UR50D
    pub fn esm2_t12_35m() -> Self {
        Self::with_dims(480, 12, 20, 1920)
    }
    /// esm2_t30_150M_UR50D
    pub fn esm2_t30_150m() -> Self {
        Self::with_dims(640, 30, 20, 2560)
    }
    /// esm2_t33_650M_UR50D
    pub fn esm2_t33_650m() -> Self {
        Self::with_dims(1280, 33, 20, 5120)
    }

    pub fn with_dims(
        hidden_size: usize,
        num_hidden_layers: usize,
        num_attention_heads: usize,
        intermediate_size: usize,
    ) -> Self {
        Self {
            hidden_size,
            num_hidden_layers,
            num_attention_heads,
            intermediate_size,
            vocab_size: default_vocab_size(),
            layer_norm_eps: default_layer_norm_eps(),
            token_dropout: default_token_dropout(),
            mask_token_id: default_mask_token_id(),
            pad_token_id: default_pad_token_id(),
            max_position_embeddings: default_max_position_embeddings(),
            position_embedding_type: default_position_embedding_type(),
        }
    }
}
