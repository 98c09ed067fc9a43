//! plmkit-test-data
//!
//! Test files embedded in the crate for use in testing.
//!
//! The test files are represented as `TestFile` objects which package the raw binary data
//! and create temporary files for programs to operate on.
use std::fs;
use tempfile::{Builder, NamedTempFile};

#[derive(Debug)]
/// Test File
///
/// Example usage:
///
/// ```ignore
/// // returns (filepath, _tempfile_handle).
/// // _handle ensures the tempfile remains in scope
/// use plmkit_test_data::TestFile;
/// let (csv_file, _temp) = TestFile::asr_posteriors_01().create_temp().unwrap();
/// ```
pub struct TestFile {
    filebinary: &'static [u8],
    suffix: &'static str,
}

impl TestFile {
    /// `vocab.txt` of the facebook/esm2_t*_UR50D repositories.
    pub fn esm2_vocab() -> Self {
        Self {
            filebinary: include_bytes!("../data/esm2/vocab.txt"),
            suffix: "txt",
        }
    }
    /// FireProt ASR posterior table: nodes 101 (5 positions) and 102 (3 positions).
    /// Node 102 uses `-` for empty cells.
    pub fn asr_posteriors_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/asr/ancestral_posteriors.csv"),
            suffix: "csv",
        }
    }
    /// FireProt ASR posterior table: node 201 spans 150 positions, node 202
    /// (3 positions) follows with `-` cells in the gap and residue columns.
    pub fn asr_posteriors_long() -> Self {
        Self {
            filebinary: include_bytes!("../data/asr/ancestral_posteriors_long.csv"),
            suffix: "csv",
        }
    }
    /// CAMP ranking output with blank, malformed and non-numeric rows mixed in.
    pub fn amp_ranking_01() -> Self {
        Self {
            filebinary: include_bytes!("../data/amp/camp_ranking.txt"),
            suffix: "txt",
        }
    }

    pub fn create_temp(&self) -> std::io::Result<(String, NamedTempFile)> {
        let temp = Builder::new()
            .suffix(&format!(".{}", self.suffix))
            .tempfile()?;

        fs::write(&temp, self.filebinary)?;
        let path = temp.path().to_string_lossy().into_owned();

        Ok((path, temp))
    }

    pub fn bytes(&self) -> &'static [u8] {
        self.filebinary
    }
}
