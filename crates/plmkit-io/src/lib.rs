//! plmkit-io
//!
//! Readers for the result files produced around protein language model
//! pipelines:
//!
//! - [`asr`]: FireProt ancestral sequence reconstruction posterior tables.
//! - [`amp`]: CAMP antimicrobial peptide ranking output.
pub mod amp;
pub mod asr;

pub use amp::{count_amps_by_length, AmpReader, AmpRecord, AMP_THRESHOLD};
pub use asr::{confident_fraction, AsrPosteriors, PositionCall};
