//! ESM2 protein language model.
//!
//! Models from [ESM2](https://github.com/facebookresearch/esm) as published on
//! the HuggingFace hub:
//!
//! * ESM2_T6_8M - 6 layers, hidden size 320
//! * ESM2_T12_35M - 12 layers, hidden size 480
//! * ESM2_T30_150M - 30 layers, hidden size 640
//! * ESM2_T33_650M - 33 layers, hidden size 1280
//!
pub mod config;
pub mod model;
pub mod runner;
pub mod vocab;

pub use config::ESM2Config;
pub use model::ESM2;
pub use runner::{ESM2Files, ESM2Models, ESM2Runner};
pub use vocab::EsmVocab;
