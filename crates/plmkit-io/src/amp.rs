//! CAMP ranking files.
//!
//! Whitespace separated, one header line, then one row per peptide:
//!
//! ```text
//! Seq. ID.        Class   AMP Probability
//! LENGTH_5_SEQ_1  NAMP    0.26
//! LENGTH_5_SEQ_2  AMP     0.81
//! ```
//!
//! Lines that are blank, do not have exactly three fields, or carry a
//! non-numeric probability are skipped.
use anyhow::Result;
use std::collections::BTreeMap;
use std::io::{self, BufRead};
use tracing::trace;

/// Probability at or above which a peptide counts as antimicrobial.
pub const AMP_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, PartialEq)]
pub struct AmpRecord {
    pub seq_id: String,
    pub class: String,
    pub probability: f64,
}

impl AmpRecord {
    fn parse(line: &str) -> Option<Self> {
        let mut fields = line.split_whitespace();
        let (seq_id, class, probability) = (fields.next()?, fields.next()?, fields.next()?);
        if fields.next().is_some() {
            return None;
        }
        Some(Self {
            seq_id: seq_id.to_string(),
            class: class.to_string(),
            probability: probability.parse().ok()?,
        })
    }

    /// `X` of a `LENGTH_X_SEQ_Y` identifier.
    pub fn length(&self) -> Option<usize> {
        self.seq_id.split('_').nth(1)?.parse().ok()
    }

    pub fn is_amp(&self, threshold: f64) -> bool {
        self.probability >= threshold
    }
}

/// A CAMP ranking reader.
pub struct AmpReader<R> {
    inner: R,
    line: String,
    header_skipped: bool,
}

impl<R> AmpReader<R> {
    /// Returns a reference to the underlying reader.
    pub fn get_ref(&self) -> &R {
        &self.inner
    }
    /// Unwraps and returns the underlying reader.
    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: BufRead> AmpReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: String::new(),
            header_skipped: false,
        }
    }

    /// Reads the next well-formed record, `None` at end of input.
    pub fn read_record(&mut self) -> io::Result<Option<AmpRecord>> {
        loop {
            self.line.clear();
            if self.inner.read_line(&mut self.line)? == 0 {
                return Ok(None);
            }
            if !self.header_skipped {
                self.header_skipped = true;
                continue;
            }
            match AmpRecord::parse(&self.line) {
                Some(record) => return Ok(Some(record)),
                None => trace!(line = self.line.trim_end(), "skipping CAMP line"),
            }
        }
    }

    /// Returns an iterator over records starting from the current stream position.
    pub fn records(&mut self) -> Records<'_, R> {
        Records { reader: self }
    }
}

pub struct Records<'r, R> {
    reader: &'r mut AmpReader<R>,
}

impl<R: BufRead> Iterator for Records<'_, R> {
    type Item = io::Result<AmpRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.reader.read_record().transpose()
    }
}

/// Number of peptides with `probability >= threshold`, keyed by sequence length.
pub fn count_amps_by_length<R: BufRead>(reader: R, threshold: f64) -> Result<BTreeMap<usize, usize>> {
    let mut counts = BTreeMap::new();
    for record in AmpReader::new(reader).records() {
        let record = record?;
        if !record.is_amp(threshold) {
            continue;
        }
        if let Some(length) = record.length() {
            *counts.entry(length).or_insert(0) += 1;
        }
    }
    Ok(counts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plmkit_test_data::TestFile;
    use std::io::Cursor;

    #[test]
    fn test_parse_record() {
        let record = AmpRecord::parse("LENGTH_12_SEQ_7\tAMP\t0.91\n").unwrap();
        assert_eq!(record.seq_id, "LENGTH_12_SEQ_7");
        assert_eq!(record.class, "AMP");
        assert_eq!(record.length(), Some(12));
        assert!(record.is_amp(AMP_THRESHOLD));

        assert!(AmpRecord::parse("").is_none());
        assert!(AmpRecord::parse("LENGTH_5_SEQ_1 AMP").is_none());
        assert!(AmpRecord::parse("LENGTH_5_SEQ_1 AMP 0.5 extra").is_none());
        assert!(AmpRecord::parse("LENGTH_5_SEQ_1 AMP high").is_none());
    }

    #[test]
    fn test_reader_skips_header_and_junk() -> Result<()> {
        let bytes = TestFile::amp_ranking_01().bytes();
        let mut reader = AmpReader::new(Cursor::new(bytes));
        let records = reader.records().collect::<io::Result<Vec<_>>>()?;
        // 12 data lines: blank, non-numeric and malformed are dropped
        assert_eq!(records.len(), 9);
        assert_eq!(records[0].seq_id, "LENGTH_5_SEQ_1");
        assert_eq!(records[5].seq_id, "LENGTH_X_SEQ_2");
        assert_eq!(records[5].length(), None);
        Ok(())
    }

    #[test]
    fn test_count_amps_by_length() -> Result<()> {
        let (path, _handle) = TestFile::amp_ranking_01().create_temp()?;
        let file = io::BufReader::new(std::fs::File::open(path)?);
        let counts = count_amps_by_length(file, AMP_THRESHOLD)?;
        assert_eq!(counts, BTreeMap::from([(5, 2), (10, 1), (20, 3)]));

        let strict = count_amps_by_length(Cursor::new(TestFile::amp_ranking_01().bytes()), 0.8)?;
        assert_eq!(strict, BTreeMap::from([(5, 1), (10, 1)]));
        Ok(())
    }

    #[test]
    fn test_header_only() -> Result<()> {
        let counts = count_amps_by_length(Cursor::new("Seq. ID.\tClass\tAMP Probability\n"), 0.5)?;
        assert!(counts.is_empty());
        Ok(())
    }
}
