//! FireProt ASR posterior tables.
//!
//! FireProtASR exports the posterior probability of every residue at every
//! alignment position of every ancestral node:
//!
//! ```text
//! node,position,-,A,C,D,...,Y
//! 101,1,0.0,0.0,0.0,0.0,...,0.0
//! ```
//!
//! The third column holds the gap probability and is not considered a residue.
//! Empty cells are written as `-` and read as zero.
use anyhow::{bail, Result};
use itertools::Itertools;
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, warn};

const NODE_COLUMN: &str = "node";
const POSITION_COLUMN: &str = "position";
// node, position, gap
const LEADING_COLUMNS: usize = 3;
const EMPTY_CELL: &str = "-";

/// The most probable residue at one alignment position.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionCall {
    pub position: i64,
    pub residue: String,
    pub probability: f64,
}

#[derive(Debug, Clone)]
struct PosteriorRow {
    node: i64,
    position: i64,
    probabilities: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct AsrPosteriors {
    residues: Vec<String>,
    rows: Vec<PosteriorRow>,
}

impl AsrPosteriors {
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        // `-` may appear in any row, so it is read as null and the schema is
        // inferred from the whole file.
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(None)
            .map_parse_options(|opts| {
                opts.with_null_values(Some(NullValues::AllColumnsSingle(EMPTY_CELL.into())))
            })
            .try_into_reader_with_file_path(Some(path.as_ref().to_path_buf()))?
            .finish()?;
        Self::from_dataframe(&df)
    }

    pub fn from_dataframe(df: &DataFrame) -> Result<Self> {
        let columns = df.get_columns();
        if columns.len() <= LEADING_COLUMNS {
            bail!(
                "expected `node`, `position`, gap and residue columns, found {} columns",
                columns.len()
            );
        }
        let nodes = integer_column(df, NODE_COLUMN)?;
        let positions = integer_column(df, POSITION_COLUMN)?;

        let residues: Vec<String> = columns[LEADING_COLUMNS..]
            .iter()
            .map(|col| col.name().to_string())
            .collect();
        let probabilities = columns[LEADING_COLUMNS..]
            .iter()
            .map(|col| -> Result<Vec<f64>> {
                let values = col.as_materialized_series().cast(&DataType::Float64)?;
                Ok(values.f64()?.into_iter().map(|v| v.unwrap_or(0.0)).collect())
            })
            .collect::<Result<Vec<_>>>()?;

        let rows = nodes
            .into_iter()
            .zip(positions)
            .enumerate()
            .map(|(i, (node, position))| PosteriorRow {
                node,
                position,
                probabilities: probabilities.iter().map(|column| column[i]).collect(),
            })
            .collect::<Vec<_>>();
        debug!(rows = rows.len(), residues = residues.len(), "loaded ASR posteriors");
        Ok(Self { residues, rows })
    }

    /// Residue column names in file order.
    pub fn residues(&self) -> &[String] {
        &self.residues
    }

    /// Distinct nodes in file order.
    pub fn nodes(&self) -> Vec<i64> {
        self.rows.iter().map(|row| row.node).unique().collect()
    }

    fn node_rows(&self, node: i64) -> Vec<&PosteriorRow> {
        let rows: Vec<_> = self.rows.iter().filter(|row| row.node == node).collect();
        if rows.is_empty() {
            warn!(node, "no data for node");
        }
        rows
    }

    fn row(&self, node: i64, position: i64) -> Option<&PosteriorRow> {
        let row = self
            .rows
            .iter()
            .find(|row| row.node == node && row.position == position);
        if row.is_none() {
            warn!(node, position, "no data for node at position");
        }
        row
    }

    /// First residue with the highest probability.
    fn call(&self, row: &PosteriorRow) -> PositionCall {
        let (best, probability) = row.probabilities.iter().enumerate().fold(
            (0, f64::NEG_INFINITY),
            |(best, max), (i, &p)| if p > max { (i, p) } else { (best, max) },
        );
        PositionCall {
            position: row.position,
            residue: self.residues[best].clone(),
            probability,
        }
    }

    /// Non-zero residue probabilities at a position, most probable first.
    pub fn distribution(&self, node: i64, position: i64) -> Option<Vec<(String, f64)>> {
        let row = self.row(node, position)?;
        let mut distribution: Vec<(String, f64)> = self
            .residues
            .iter()
            .zip(&row.probabilities)
            .filter(|(_, &p)| p > 0.0)
            .map(|(residue, &p)| (residue.clone(), p))
            .collect();
        distribution.sort_by(|a, b| b.1.total_cmp(&a.1));
        Some(distribution)
    }

    pub fn most_probable(&self, node: i64, position: i64) -> Option<(String, f64)> {
        let call = self.call(self.row(node, position)?);
        Some((call.residue, call.probability))
    }

    /// Calls for every position of `node`, in file order, up to the first
    /// position past `stop`.
    pub fn most_probable_per_position(&self, node: i64, stop: Option<i64>) -> Vec<PositionCall> {
        self.node_rows(node)
            .into_iter()
            .take_while(|row| stop.map_or(true, |stop| row.position <= stop))
            .map(|row| self.call(row))
            .collect()
    }

    /// Positions of `node` whose most probable residue is at or below `threshold`.
    pub fn masked_positions(&self, node: i64, threshold: f64) -> Vec<i64> {
        self.node_rows(node)
            .into_iter()
            .map(|row| self.call(row))
            .filter(|call| call.probability <= threshold)
            .map(|call| call.position)
            .collect()
    }

    /// Most probable residue at every position; empty when the node is absent.
    pub fn node_sequence(&self, node: i64) -> String {
        self.node_rows(node)
            .into_iter()
            .map(|row| self.call(row).residue)
            .collect()
    }
}

/// Percentage of calls strictly above `threshold`; `0.0` without calls.
pub fn confident_fraction(calls: &[PositionCall], threshold: f64) -> f64 {
    if calls.is_empty() {
        return 0.0;
    }
    let confident = calls.iter().filter(|c| c.probability > threshold).count();
    confident as f64 / calls.len() as f64 * 100.0
}

fn integer_column(df: &DataFrame, name: &str) -> Result<Vec<i64>> {
    let values = df
        .column(name)?
        .as_materialized_series()
        .cast(&DataType::Int64)?;
    values
        .i64()?
        .into_iter()
        .map(|v| v.ok_or_else(|| anyhow::anyhow!("missing value in `{name}` column")))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use plmkit_test_data::TestFile;

    fn posteriors() -> Result<AsrPosteriors> {
        let (path, _handle) = TestFile::asr_posteriors_01().create_temp()?;
        AsrPosteriors::from_csv(path)
    }

    #[test]
    fn test_load() -> Result<()> {
        let asr = posteriors()?;
        assert_eq!(asr.residues().len(), 20);
        assert_eq!(asr.residues()[0], "A");
        assert_eq!(asr.nodes(), vec![101, 102]);
        Ok(())
    }

    #[test]
    fn test_distribution() -> Result<()> {
        let asr = posteriors()?;
        let dist = asr.distribution(101, 4).unwrap();
        let residues: Vec<&str> = dist.iter().map(|(r, _)| r.as_str()).collect();
        assert_eq!(residues, vec!["A", "G", "S"]);
        assert_relative_eq!(dist[0].1, 0.45);

        assert!(asr.distribution(101, 99).is_none());
        assert!(asr.distribution(7, 1).is_none());
        Ok(())
    }

    #[test]
    fn test_most_probable() -> Result<()> {
        let asr = posteriors()?;
        let (residue, p) = asr.most_probable(101, 2).unwrap();
        assert_eq!(residue, "K");
        assert_relative_eq!(p, 0.55);
        // `-` cells read as zero
        assert_eq!(asr.most_probable(102, 2).unwrap().0, "R");
        assert!(asr.most_probable(103, 1).is_none());
        Ok(())
    }

    #[test]
    fn test_per_position_calls() -> Result<()> {
        let asr = posteriors()?;
        let calls = asr.most_probable_per_position(101, None);
        assert_eq!(calls.len(), 5);
        assert_eq!(calls[4].residue, "Y");

        let calls = asr.most_probable_per_position(101, Some(3));
        let positions: Vec<i64> = calls.iter().map(|c| c.position).collect();
        assert_eq!(positions, vec![1, 2, 3]);

        let all = asr.most_probable_per_position(101, None);
        assert_relative_eq!(confident_fraction(&all, 0.9), 40.0);
        assert_relative_eq!(confident_fraction(&[], 0.9), 0.0);
        assert!(asr.most_probable_per_position(55, None).is_empty());
        Ok(())
    }

    #[test]
    fn test_masked_positions() -> Result<()> {
        let asr = posteriors()?;
        assert_eq!(asr.masked_positions(101, 0.6), vec![2, 4]);
        // the comparison is inclusive
        assert_eq!(asr.masked_positions(101, 0.55), vec![2, 4]);
        assert_eq!(asr.masked_positions(101, 0.45), vec![4]);
        assert!(asr.masked_positions(55, 0.5).is_empty());
        Ok(())
    }

    #[test]
    fn test_node_sequence() -> Result<()> {
        let asr = posteriors()?;
        assert_eq!(asr.node_sequence(101), "MKTAY");
        assert_eq!(asr.node_sequence(102), "MRS");
        assert_eq!(asr.node_sequence(55), "");
        Ok(())
    }

    #[test]
    fn test_empty_cells_past_first_rows() -> Result<()> {
        let (path, _handle) = TestFile::asr_posteriors_long().create_temp()?;
        let asr = AsrPosteriors::from_csv(path)?;
        assert_eq!(asr.nodes(), vec![201, 202]);
        assert_eq!(asr.node_sequence(201), "KM".repeat(75));
        assert_eq!(asr.node_sequence(202), "SGW");

        let (residue, p) = asr.most_probable(202, 3).unwrap();
        assert_eq!(residue, "W");
        assert_relative_eq!(p, 0.3);
        assert_eq!(asr.distribution(202, 1).unwrap(), vec![("S".to_string(), 1.0)]);
        assert_eq!(asr.masked_positions(202, 0.5), vec![3]);
        Ok(())
    }
}
