//! ESM2 token vocabulary.
//!
//! The HuggingFace ESM2 repositories ship a `vocab.txt` with one token per
//! line; the line number is the token id. Sequences are tokenized one residue
//! per token and wrapped in `<cls>` ... `<eos>`.
use anyhow::{anyhow, Context, Result};
use std::collections::HashMap;
use std::path::Path;

#[rustfmt::skip]
const ESM2_TOKENS: [&str; 33] = [
    "<cls>", "<pad>", "<eos>", "<unk>",
    "L", "A", "G", "V", "S", "E", "R", "T", "I", "D", "P", "K",
    "Q", "N", "F", "Y", "M", "H", "W", "C", "X", "B", "U", "Z",
    "O", ".", "-",
    "<null_1>", "<mask>",
];

#[derive(Debug, Clone)]
pub struct EsmVocab {
    tokens: Vec<String>,
    index: HashMap<String, u32>,
    cls_token_id: u32,
    eos_token_id: u32,
    pad_token_id: u32,
    unk_token_id: u32,
    mask_token_id: u32,
}

impl Default for EsmVocab {
    fn default() -> Self {
        let tokens: Vec<String> = ESM2_TOKENS.iter().map(|t| t.to_string()).collect();
        let index = tokens
            .iter()
            .enumerate()
            .map(|(i, tok)| (tok.clone(), i as u32))
            .collect();
        Self {
            tokens,
            index,
            cls_token_id: 0,
            eos_token_id: 2,
            pad_token_id: 1,
            unk_token_id: 3,
            mask_token_id: 32,
        }
    }
}

impl EsmVocab {
    pub fn from_tokens(tokens: Vec<String>) -> Result<Self> {
        let index: HashMap<String, u32> = tokens
            .iter()
            .enumerate()
            .map(|(i, tok)| (tok.clone(), i as u32))
            .collect();
        let lookup = |name: &str| {
            index
                .get(name)
                .copied()
                .ok_or_else(|| anyhow!("Missing {name} token"))
        };
        Ok(Self {
            cls_token_id: lookup("<cls>")?,
            eos_token_id: lookup("<eos>")?,
            pad_token_id: lookup("<pad>")?,
            unk_token_id: lookup("<unk>")?,
            mask_token_id: lookup("<mask>")?,
            tokens,
            index,
        })
    }

    /// Parse a `vocab.txt`; blank lines are ignored.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading {}", path.as_ref().display()))?;
        let tokens = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect();
        Self::from_tokens(tokens)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn token_to_id(&self, token: &str) -> u32 {
        self.index.get(token).copied().unwrap_or(self.unk_token_id)
    }

    pub fn id_to_token(&self, id: u32) -> &str {
        self.tokens
            .get(id as usize)
            .map(String::as_str)
            .unwrap_or("<unk>")
    }

    /// `<cls>` + one id per residue + `<eos>`. Lower-case residues are accepted.
    pub fn tokenize(&self, sequence: &str) -> Vec<u32> {
        let mut ids = Vec::with_capacity(sequence.len() + 2);
        ids.push(self.cls_token_id);
        ids.extend(
            sequence
                .chars()
                .filter(|c| !c.is_whitespace())
                .map(|c| self.token_to_id(&c.to_ascii_uppercase().to_string())),
        );
        ids.push(self.eos_token_id);
        ids
    }

    pub fn cls_token_id(&self) -> u32 {
        self.cls_token_id
    }
    pub fn eos_token_id(&self) -> u32 {
        self.eos_token_id
    }
    pub fn pad_token_id(&self) -> u32 {
        self.pad_token_id
    }
    pub fn unk_token_id(&self) -> u32 {
        self.unk_token_id
    }
    pub fn mask_token_id(&self) -> u32 {
        self.mask_token_id
    }
}
