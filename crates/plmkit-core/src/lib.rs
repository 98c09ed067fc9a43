//! plmkit-core
//!
//! Embedding interpolation and decoding for protein language models.
//!
//! The model itself is reached only through the [`ProteinModel`] capability.
//! Two embeddings are blended with one of the [`InterpolationScheme`]s and every
//! point along the path is decoded back into a residue sequence:
//!
//! ```ignore
//! use plmkit_core::{decode_sequences, interpolation_path, linspace, InterpolationScheme};
//!
//! let start = model.encode("MKTAYIAK")?;
//! let end = model.encode("MKTAWIAK")?;
//! let path = interpolation_path(&start, &end, &linspace(0.0, 1.0, 10), InterpolationScheme::Linear)?;
//! let sequences = decode_sequences(&path, &model)?;
//! ```
pub mod alphabet;
pub mod embedding;
pub mod error;
pub mod interpolation;
pub mod model;
pub mod normalize;
pub mod utils;

pub use alphabet::{
    is_structural_token, strip_structural_tokens, AminoAcid, DecodedSequence,
    CANONICAL_AMINO_ACIDS, STRUCTURAL_TOKENS,
};
pub use embedding::Embedding;
pub use error::{PlmError, Result};
pub use interpolation::{interpolate, interpolation_path, linspace, InterpolationScheme};
pub use model::{decode_sequences, NormalizedModel, ProteinModel};
pub use normalize::{EmbeddingNormalizer, ZScoreNormalizer};
pub use utils::{levenshtein_distance, random_sequence};
