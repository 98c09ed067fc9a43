use anyhow::{anyhow, Result};
use clap::Subcommand;
use plmkit_io::{confident_fraction, AsrPosteriors};
use std::path::PathBuf;

#[derive(Subcommand)]
pub enum AsrQuery {
    /// Most probable residue at every position
    Sequence,
    /// Positions whose best residue probability is at or below the threshold
    Masked {
        #[arg(long)]
        threshold: f64,
    },
    /// Most probable residue at one position
    MostProbable {
        #[arg(long)]
        position: i64,
    },
    /// Non-zero residue probabilities at one position
    Distribution {
        #[arg(long)]
        position: i64,
    },
    /// Per-position calls, optionally up to `--stop`
    Calls {
        #[arg(long)]
        stop: Option<i64>,
        /// Report the percentage of calls above this probability
        #[arg(long)]
        threshold: Option<f64>,
    },
}

pub fn execute(input: PathBuf, node: i64, query: AsrQuery) -> Result<()> {
    let posteriors = AsrPosteriors::from_csv(&input)?;
    let missing = |position: i64| anyhow!("no data for node {node} at position {position}");

    match query {
        AsrQuery::Sequence => println!("{}", posteriors.node_sequence(node)),
        AsrQuery::Masked { threshold } => {
            for position in posteriors.masked_positions(node, threshold) {
                println!("{position}");
            }
        }
        AsrQuery::MostProbable { position } => {
            let (residue, probability) = posteriors
                .most_probable(node, position)
                .ok_or_else(|| missing(position))?;
            println!("{residue}\t{probability}");
        }
        AsrQuery::Distribution { position } => {
            let distribution = posteriors
                .distribution(node, position)
                .ok_or_else(|| missing(position))?;
            for (residue, probability) in distribution {
                println!("{residue}\t{probability}");
            }
        }
        AsrQuery::Calls { stop, threshold } => {
            let calls = posteriors.most_probable_per_position(node, stop);
            for call in &calls {
                println!("{}\t{}\t{}", call.position, call.residue, call.probability);
            }
            if let Some(threshold) = threshold {
                println!(
                    "# {:.2}% above {threshold}",
                    confident_fraction(&calls, threshold)
                );
            }
        }
    }
    Ok(())
}
