//! Amino-acid alphabet and structural tokens.
//!
//! Protein language model vocabularies mix the 20 canonical residues with
//! control markers such as `<cls>` or `<eos>`. Those markers carry no biological
//! meaning and are stripped before a decoded sequence is handed back.
use itertools::Itertools;
use std::fmt;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// One-letter codes of the 20 canonical amino acids.
pub const CANONICAL_AMINO_ACIDS: &str = "ACDEFGHIKLMNPQRSTVWY";

/// Control markers emitted by ESM-style vocabularies.
pub const STRUCTURAL_TOKENS: [&str; 7] = [
    "<cls>", "<pad>", "<eos>", "<bos>", "<unk>", "<mask>", "<null_1>",
];

#[rustfmt::skip]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter)]
pub enum AminoAcid {
    ALA, CYS, ASP, GLU, PHE,
    GLY, HIS, ILE, LYS, LEU,
    MET, ASN, PRO, GLN, ARG,
    SER, THR, VAL, TRP, TYR,
}

impl AminoAcid {
    #[rustfmt::skip]
    pub fn to_char(&self) -> char {
        match self {
            AminoAcid::ALA => 'A', AminoAcid::CYS => 'C', AminoAcid::ASP => 'D',
            AminoAcid::GLU => 'E', AminoAcid::PHE => 'F', AminoAcid::GLY => 'G',
            AminoAcid::HIS => 'H', AminoAcid::ILE => 'I', AminoAcid::LYS => 'K',
            AminoAcid::LEU => 'L', AminoAcid::MET => 'M', AminoAcid::ASN => 'N',
            AminoAcid::PRO => 'P', AminoAcid::GLN => 'Q', AminoAcid::ARG => 'R',
            AminoAcid::SER => 'S', AminoAcid::THR => 'T', AminoAcid::VAL => 'V',
            AminoAcid::TRP => 'W', AminoAcid::TYR => 'Y',
        }
    }

    /// Case-insensitive lookup from a one-letter code.
    pub fn from_char(c: char) -> Option<Self> {
        let c = c.to_ascii_uppercase();
        AminoAcid::iter().find(|aa| aa.to_char() == c)
    }
}

/// True for vocabulary markers that are not residues.
///
/// Anything wrapped in angle brackets counts, so vocabularies with extra
/// control tokens are handled without listing every marker.
pub fn is_structural_token(token: &str) -> bool {
    STRUCTURAL_TOKENS.contains(&token)
        || (token.len() > 2 && token.starts_with('<') && token.ends_with('>'))
}

/// Drop structural tokens and join the remaining tokens in order.
pub fn strip_structural_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(AsRef::as_ref)
        .filter(|tok| !is_structural_token(tok))
        .join("")
}

/// A sequence recovered from an embedding with structural tokens removed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct DecodedSequence(String);

impl DecodedSequence {
    pub fn from_tokens<S: AsRef<str>>(tokens: &[S]) -> Self {
        Self(strip_structural_tokens(tokens))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Whether every residue belongs to the canonical 20.
    ///
    /// Decoders can emit ambiguity codes (`X`, `B`, `Z`, ...) or gap symbols,
    /// which are kept in the sequence but fail this check.
    pub fn is_canonical(&self) -> bool {
        self.0.chars().all(|c| AminoAcid::from_char(c).is_some())
    }
}

impl fmt::Display for DecodedSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for DecodedSequence {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
